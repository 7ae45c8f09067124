use super::{find_block_mut, not_applied, CommandError, CommandOp};
use crate::events::EngineEvent;
use pagecraft_common::Page;
use serde::{Deserialize, Serialize};

/// Flip a block's `disabled` flag, or force it to a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleBlock {
    pub block_id: String,

    /// `None` flips the current value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<bool>,
}

impl ToggleBlock {
    pub fn new(block_id: impl Into<String>, disabled: Option<bool>) -> Self {
        Self {
            block_id: block_id.into(),
            disabled,
            previous: None,
        }
    }
}

impl CommandOp for ToggleBlock {
    fn apply(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        let block = find_block_mut(page, &self.block_id)?;

        let old_value = block.disabled;
        block.disabled = self.disabled.unwrap_or(!old_value);
        self.previous = Some(old_value);

        Ok(EngineEvent::BlockToggle {
            block_id: self.block_id.clone(),
            disabled: block.disabled,
            old_value,
        })
    }

    fn revert(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        let previous = self.previous.take().ok_or_else(|| not_applied(self.name()))?;
        let block = find_block_mut(page, &self.block_id)?;

        let old_value = block.disabled;
        block.disabled = previous;

        Ok(EngineEvent::BlockToggle {
            block_id: self.block_id.clone(),
            disabled: previous,
            old_value,
        })
    }

    fn name(&self) -> &'static str {
        "ToggleBlock"
    }

    fn block_id(&self) -> &str {
        &self.block_id
    }
}
