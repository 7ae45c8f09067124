//! Operation scripts replayed against an engine.
//!
//! A script is a JSON array of operations tagged by `op`:
//!
//! ```json
//! [
//!   { "op": "insert", "type": "section", "as": "hero" },
//!   { "op": "insert", "type": "text", "parentId": "$hero", "index": 0, "as": "title" },
//!   { "op": "setProperty", "blockId": "$title", "key": "content", "value": "Welcome" },
//!   { "op": "undo" }
//! ]
//! ```
//!
//! Operations that create a block may bind its generated id with `as`; later
//! id fields refer to it as `$name`.

use anyhow::{anyhow, Context, Result};
use pagecraft_editor::{BlockStructure, Engine, InsertOptions, MoveTarget};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    #[serde(rename_all = "camelCase")]
    Insert {
        #[serde(rename = "type")]
        block_type: String,
        #[serde(default)]
        parent_id: Option<String>,
        #[serde(default)]
        region_name: Option<String>,
        #[serde(default)]
        index: Option<usize>,
        #[serde(default, rename = "as")]
        alias: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    InsertPreset {
        #[serde(rename = "type")]
        block_type: String,
        #[serde(default)]
        preset_index: usize,
        #[serde(default)]
        parent_id: Option<String>,
        #[serde(default)]
        region_name: Option<String>,
        #[serde(default)]
        index: Option<usize>,
        #[serde(default, rename = "as")]
        alias: Option<String>,
    },

    /// Paste a structure into a container, or right after `after`
    #[serde(rename_all = "camelCase")]
    Paste {
        structure: BlockStructure,
        #[serde(default)]
        after: Option<String>,
        #[serde(default)]
        parent_id: Option<String>,
        #[serde(default)]
        region_name: Option<String>,
        #[serde(default)]
        index: Option<usize>,
        #[serde(default, rename = "as")]
        alias: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    Remove { block_id: String },

    /// Move under `parentId`, or into `regionName` when no parent is given
    #[serde(rename_all = "camelCase")]
    Move {
        block_id: String,
        #[serde(default)]
        parent_id: Option<String>,
        #[serde(default)]
        region_name: Option<String>,
        #[serde(default)]
        index: Option<usize>,
    },

    #[serde(rename_all = "camelCase")]
    Toggle {
        block_id: String,
        #[serde(default)]
        disabled: Option<bool>,
    },

    #[serde(rename_all = "camelCase")]
    SetProperty { block_id: String, key: String, value: Value },

    #[serde(rename_all = "camelCase")]
    SetName { block_id: String, name: String },

    #[serde(rename_all = "camelCase")]
    Duplicate {
        block_id: String,
        #[serde(default, rename = "as")]
        alias: Option<String>,
    },

    Undo,
    Redo,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Insert { .. } => "insert",
            Operation::InsertPreset { .. } => "insertPreset",
            Operation::Paste { .. } => "paste",
            Operation::Remove { .. } => "remove",
            Operation::Move { .. } => "move",
            Operation::Toggle { .. } => "toggle",
            Operation::SetProperty { .. } => "setProperty",
            Operation::SetName { .. } => "setName",
            Operation::Duplicate { .. } => "duplicate",
            Operation::Undo => "undo",
            Operation::Redo => "redo",
        }
    }
}

pub fn parse_script(content: &str) -> Result<Vec<Operation>> {
    Ok(serde_json::from_str(content)?)
}

/// Replays operations against an engine, tracking `as` aliases
pub struct ScriptRunner<'a> {
    engine: &'a mut Engine,
    aliases: HashMap<String, String>,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(engine: &'a mut Engine) -> Self {
        Self {
            engine,
            aliases: HashMap::new(),
        }
    }

    /// Run every operation in order, stopping at the first failure
    pub fn run_all(&mut self, operations: &[Operation]) -> Result<()> {
        for (step, operation) in operations.iter().enumerate() {
            self.run(operation)
                .with_context(|| format!("Step {} ({}) failed", step + 1, operation.name()))?;
        }
        Ok(())
    }

    pub fn run(&mut self, operation: &Operation) -> Result<()> {
        debug!(op = operation.name(), "running operation");

        match operation {
            Operation::Insert {
                block_type,
                parent_id,
                region_name,
                index,
                alias,
            } => {
                let options = self.options(parent_id, region_name, *index)?;
                let id = self.engine.insert_block(block_type, options)?;
                self.bind(alias, id);
            }
            Operation::InsertPreset {
                block_type,
                preset_index,
                parent_id,
                region_name,
                index,
                alias,
            } => {
                let options = self.options(parent_id, region_name, *index)?;
                let id = self
                    .engine
                    .insert_block_from_preset(block_type, *preset_index, options)?;
                self.bind(alias, id);
            }
            Operation::Paste {
                structure,
                after,
                parent_id,
                region_name,
                index,
                alias,
            } => {
                let id = match after {
                    Some(target) => {
                        let target = self.resolve(target)?;
                        self.engine.paste_block_after(structure, &target)?
                    }
                    None => {
                        let options = self.options(parent_id, region_name, *index)?;
                        self.engine.paste_block(structure, options)?
                    }
                };
                self.bind(alias, id);
            }
            Operation::Remove { block_id } => {
                let block_id = self.resolve(block_id)?;
                self.engine.remove_block(&block_id)?;
            }
            Operation::Move {
                block_id,
                parent_id,
                region_name,
                index,
            } => {
                let block_id = self.resolve(block_id)?;
                let target = match parent_id {
                    Some(parent_id) => MoveTarget::parent(self.resolve(parent_id)?, *index),
                    None => MoveTarget::Region {
                        region_name: region_name.clone(),
                        index: *index,
                    },
                };
                self.engine.move_block(&block_id, target)?;
            }
            Operation::Toggle { block_id, disabled } => {
                let block_id = self.resolve(block_id)?;
                self.engine.toggle_block(&block_id, *disabled)?;
            }
            Operation::SetProperty { block_id, key, value } => {
                let block_id = self.resolve(block_id)?;
                self.engine.set_block_property(&block_id, key, value.clone())?;
            }
            Operation::SetName { block_id, name } => {
                let block_id = self.resolve(block_id)?;
                self.engine.set_block_name(&block_id, name)?;
            }
            Operation::Duplicate { block_id, alias } => {
                let block_id = self.resolve(block_id)?;
                let id = self.engine.duplicate_block(&block_id)?;
                self.bind(alias, id);
            }
            Operation::Undo => {
                if !self.engine.undo()? {
                    debug!("nothing to undo");
                }
            }
            Operation::Redo => {
                if !self.engine.redo()? {
                    debug!("nothing to redo");
                }
            }
        }

        Ok(())
    }

    /// Id bound to `alias`, if any
    pub fn alias(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    fn bind(&mut self, alias: &Option<String>, id: String) {
        if let Some(alias) = alias {
            self.aliases.insert(alias.clone(), id);
        }
    }

    fn resolve(&self, id: &str) -> Result<String> {
        match id.strip_prefix('$') {
            Some(alias) => self
                .aliases
                .get(alias)
                .cloned()
                .ok_or_else(|| anyhow!("Unknown alias: ${}", alias)),
            None => Ok(id.to_string()),
        }
    }

    fn options(
        &self,
        parent_id: &Option<String>,
        region_name: &Option<String>,
        index: Option<usize>,
    ) -> Result<InsertOptions> {
        Ok(InsertOptions {
            parent_id: parent_id.as_deref().map(|id| self.resolve(id)).transpose()?,
            region_name: region_name.clone(),
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_editor::{BlockSchema, EngineConfig};
    use pagecraft_editor::model::IdGenerator;
    use serde_json::json;

    fn engine() -> Engine {
        let config = EngineConfig::default()
            .with_schema(BlockSchema::new("section").accepting(["*"]))
            .with_schema(BlockSchema::new("text"));
        Engine::new(config)
            .unwrap()
            .with_id_generator(IdGenerator::from_seed("s"))
    }

    #[test]
    fn test_parse_script() {
        let script = r#"[
            { "op": "insert", "type": "section", "regionName": "main", "as": "hero" },
            { "op": "move", "blockId": "$hero", "index": 0 },
            { "op": "toggle", "blockId": "a" },
            { "op": "undo" }
        ]"#;

        let operations = parse_script(script).unwrap();
        assert_eq!(operations.len(), 4);
        assert_eq!(
            operations[0],
            Operation::Insert {
                block_type: "section".into(),
                parent_id: None,
                region_name: Some("main".into()),
                index: None,
                alias: Some("hero".into()),
            }
        );
        assert_eq!(operations[3], Operation::Undo);
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        assert!(parse_script(r#"[{ "op": "explode" }]"#).is_err());
    }

    #[test]
    fn test_aliases_resolve_generated_ids() {
        let mut engine = engine();
        let operations = parse_script(
            r#"[
                { "op": "insert", "type": "section", "as": "hero" },
                { "op": "insert", "type": "text", "parentId": "$hero", "as": "title" },
                { "op": "setProperty", "blockId": "$title", "key": "content", "value": "Welcome" },
                { "op": "duplicate", "blockId": "$hero", "as": "copy" }
            ]"#,
        )
        .unwrap();

        let mut runner = ScriptRunner::new(&mut engine);
        runner.run_all(&operations).unwrap();

        let hero = runner.alias("hero").unwrap().to_string();
        let title = runner.alias("title").unwrap().to_string();
        let copy = runner.alias("copy").unwrap().to_string();

        let page = engine.get_page();
        assert_eq!(page.blocks[&hero].children, vec![title.clone()]);
        assert_eq!(page.blocks[&title].properties["content"], json!("Welcome"));
        assert_eq!(page.regions[0].blocks, vec![hero, copy]);
    }

    #[test]
    fn test_failure_names_the_step() {
        let mut engine = engine();
        let operations = parse_script(
            r#"[
                { "op": "insert", "type": "section" },
                { "op": "remove", "blockId": "$missing" }
            ]"#,
        )
        .unwrap();

        let err = ScriptRunner::new(&mut engine).run_all(&operations).unwrap_err();
        assert!(err.to_string().contains("Step 2 (remove)"));
        assert!(format!("{:#}", err).contains("Unknown alias: $missing"));
    }

    #[test]
    fn test_undo_redo_steps() {
        let mut engine = engine();
        let operations = parse_script(
            r#"[
                { "op": "insert", "type": "section", "as": "a" },
                { "op": "toggle", "blockId": "$a" },
                { "op": "undo" },
                { "op": "undo" },
                { "op": "undo" },
                { "op": "redo" }
            ]"#,
        )
        .unwrap();

        let mut runner = ScriptRunner::new(&mut engine);
        runner.run_all(&operations).unwrap();
        let a = runner.alias("a").unwrap().to_string();

        let block = engine.get_block_by_id(&a).unwrap();
        assert!(!block.disabled);
        assert!(engine.can_redo());
    }
}
