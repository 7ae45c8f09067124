use super::{find_block_mut, not_applied, CommandError, CommandOp};
use crate::events::EngineEvent;
use pagecraft_common::Page;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A property slot as it was before a [`SetBlockProperty`] ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "camelCase")]
pub enum PreviousValue {
    Absent,
    /// Held a value, possibly `null`
    Present(Value),
}

impl PreviousValue {
    fn into_option(self) -> Option<Value> {
        match self {
            PreviousValue::Absent => None,
            PreviousValue::Present(value) => Some(value),
        }
    }
}

/// Set one property value.
///
/// Revert restores the previous value, or deletes the key when it did not
/// exist before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBlockProperty {
    pub block_id: String,
    pub key: String,
    pub value: Value,

    /// Captured by `apply`, `None` until then
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<PreviousValue>,
}

impl SetBlockProperty {
    pub fn new(block_id: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            block_id: block_id.into(),
            key: key.into(),
            value,
            previous: None,
        }
    }
}

impl CommandOp for SetBlockProperty {
    fn apply(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        let block = find_block_mut(page, &self.block_id)?;

        let old_value = block.properties.insert(self.key.clone(), self.value.clone());
        self.previous = Some(match &old_value {
            Some(value) => PreviousValue::Present(value.clone()),
            None => PreviousValue::Absent,
        });

        Ok(EngineEvent::BlockPropertySet {
            block_id: self.block_id.clone(),
            key: self.key.clone(),
            value: Some(self.value.clone()),
            old_value,
        })
    }

    fn revert(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        if self.previous.is_none() {
            return Err(not_applied(self.name()));
        }
        let block = find_block_mut(page, &self.block_id)?;
        let previous = self.previous.take().and_then(PreviousValue::into_option);

        let old_value = match &previous {
            Some(value) => block.properties.insert(self.key.clone(), value.clone()),
            None => block.properties.remove(&self.key),
        };

        Ok(EngineEvent::BlockPropertySet {
            block_id: self.block_id.clone(),
            key: self.key.clone(),
            value: previous,
            old_value,
        })
    }

    fn name(&self) -> &'static str {
        "SetBlockProperty"
    }

    fn block_id(&self) -> &str {
        &self.block_id
    }
}

/// Set a block's display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBlockName {
    pub block_id: String,
    pub name: String,

    #[serde(default)]
    pub applied: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

impl SetBlockName {
    pub fn new(block_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            name: name.into(),
            applied: false,
            previous: None,
        }
    }
}

impl CommandOp for SetBlockName {
    fn apply(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        let block = find_block_mut(page, &self.block_id)?;

        let old_value = block.name.replace(self.name.clone());
        self.previous = old_value.clone();
        self.applied = true;

        Ok(EngineEvent::BlockUpdate {
            block_id: self.block_id.clone(),
            block: Box::new(block.clone()),
            property: "name".to_string(),
            value: Some(Value::String(self.name.clone())),
            old_value: old_value.map(Value::String),
        })
    }

    fn revert(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        if !self.applied {
            return Err(not_applied(self.name()));
        }
        let block = find_block_mut(page, &self.block_id)?;

        let previous = self.previous.take();
        let old_value = std::mem::replace(&mut block.name, previous.clone());
        self.applied = false;

        Ok(EngineEvent::BlockUpdate {
            block_id: self.block_id.clone(),
            block: Box::new(block.clone()),
            property: "name".to_string(),
            value: previous.map(Value::String),
            old_value: old_value.map(Value::String),
        })
    }

    fn name(&self) -> &'static str {
        "SetBlockName"
    }

    fn block_id(&self) -> &str {
        &self.block_id
    }
}
