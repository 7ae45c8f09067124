//! # Engine
//!
//! The single mutation gateway for a page. Every public mutation validates
//! its preconditions first, then builds a [`Command`], applies it, records it
//! in history and emits the resulting event. A rejected operation leaves the
//! page untouched.

use crate::commands::{
    Command, DuplicateBlock, InsertBlock, InsertBlockFromPreset, InsertOptions, MoveBlock, MoveTarget,
    RemoveBlock, SetBlockName, SetBlockProperty, ToggleBlock,
};
use crate::errors::EngineError;
use crate::events::{EngineEvent, EventBus, EventKind, ListenerId};
use crate::history::{HistoryManager, Reversible, DEFAULT_HISTORY_SIZE};
use crate::registry::SchemaRegistry;
use pagecraft_common::{Block, BlockSchema, BlockStructure, IdGenerator, Page};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

fn default_history_size() -> usize {
    DEFAULT_HISTORY_SIZE
}

/// Construction settings, loadable from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Initial page (an empty page with a `main` region otherwise)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,

    #[serde(default)]
    pub block_schemas: Vec<BlockSchema>,

    /// History bound (0 = unlimited)
    #[serde(default = "default_history_size")]
    pub max_history_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page: None,
            block_schemas: Vec::new(),
            max_history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn with_schema(mut self, schema: BlockSchema) -> Self {
        self.block_schemas.push(schema);
        self
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_history_size(mut self, max_history_size: usize) -> Self {
        self.max_history_size = max_history_size;
        self
    }
}

/// Editing engine for one page
#[derive(Debug)]
pub struct Engine {
    page: Page,
    registry: SchemaRegistry,
    history: HistoryManager<Command>,
    events: EventBus,
    ids: IdGenerator,
}

fn log_rejection(error: &EngineError) {
    warn!(error = %error, "Rejected operation");
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_registry(config, SchemaRegistry::new())
    }

    /// Build on a pre-filled registry; `config.block_schemas` are added to it
    pub fn with_registry(config: EngineConfig, mut registry: SchemaRegistry) -> Result<Self, EngineError> {
        registry.register_many(config.block_schemas)?;

        let page = config.page.map(normalize_page).unwrap_or_default();

        info!(
            schemas = registry.len(),
            blocks = page.blocks.len(),
            max_history_size = config.max_history_size,
            "Engine created"
        );

        Ok(Self {
            page,
            registry,
            history: HistoryManager::with_capacity(config.max_history_size),
            events: EventBus::new(),
            ids: IdGenerator::default(),
        })
    }

    /// Replace the id source, e.g. for deterministic ids
    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Insert a new block of `block_type` filled with schema defaults
    #[instrument(level = "debug", skip(self))]
    pub fn insert_block(&mut self, block_type: &str, options: InsertOptions) -> Result<String, EngineError> {
        self.try_insert_block(block_type, options).inspect_err(log_rejection)
    }

    fn try_insert_block(&mut self, block_type: &str, options: InsertOptions) -> Result<String, EngineError> {
        let schema = find_schema(&self.registry, block_type)?;
        self.check_parent(block_type, options.parent_id.as_deref())?;

        let id = self.ids.new_block_id(&self.page);
        let command = InsertBlock::from_schema(schema, id.clone(), options);
        self.execute(command.into())?;
        Ok(id)
    }

    /// Insert the preset at `preset_index` of `block_type`, with its children
    #[instrument(level = "debug", skip(self))]
    pub fn insert_block_from_preset(
        &mut self,
        block_type: &str,
        preset_index: usize,
        options: InsertOptions,
    ) -> Result<String, EngineError> {
        self.try_insert_block_from_preset(block_type, preset_index, options)
            .inspect_err(log_rejection)
    }

    fn try_insert_block_from_preset(
        &mut self,
        block_type: &str,
        preset_index: usize,
        options: InsertOptions,
    ) -> Result<String, EngineError> {
        let schema = self.schema(block_type)?;
        if schema.presets.get(preset_index).is_none() {
            return Err(EngineError::PresetNotFound {
                block_type: block_type.to_string(),
                index: preset_index,
            });
        }
        self.check_parent(block_type, options.parent_id.as_deref())?;

        let command =
            InsertBlockFromPreset::from_preset(&self.registry, block_type, preset_index, options, &self.page, &mut self.ids)?;
        let id = command.root.id.clone();
        self.execute(command.into())?;
        Ok(id)
    }

    /// Insert a previously exported structure as new blocks
    #[instrument(level = "debug", skip(self, structure), fields(block_type = %structure.block_type))]
    pub fn paste_block(&mut self, structure: &BlockStructure, options: InsertOptions) -> Result<String, EngineError> {
        self.try_paste_block(structure, options).inspect_err(log_rejection)
    }

    fn try_paste_block(&mut self, structure: &BlockStructure, options: InsertOptions) -> Result<String, EngineError> {
        self.schema(&structure.block_type)?;
        self.check_parent(&structure.block_type, options.parent_id.as_deref())?;

        let command = InsertBlockFromPreset::from_structure(&self.registry, structure, options, &self.page, &mut self.ids)?;
        let id = command.root.id.clone();
        self.execute(command.into())?;
        Ok(id)
    }

    /// Whether `structure` can be pasted right after `target_id`
    pub fn can_paste_after(&self, structure: &BlockStructure, target_id: &str) -> bool {
        self.paste_after_options(structure, target_id).is_ok()
    }

    /// Paste `structure` right after `target_id`, in the same container
    #[instrument(level = "debug", skip(self, structure), fields(block_type = %structure.block_type))]
    pub fn paste_block_after(&mut self, structure: &BlockStructure, target_id: &str) -> Result<String, EngineError> {
        let options = self.paste_after_options(structure, target_id).inspect_err(log_rejection)?;
        self.paste_block(structure, options)
    }

    fn paste_after_options(&self, structure: &BlockStructure, target_id: &str) -> Result<InsertOptions, EngineError> {
        self.schema(&structure.block_type)?;
        let target = self.block(target_id)?;

        if let Some(parent_id) = &target.parent_id {
            let parent = self
                .page
                .block(parent_id)
                .ok_or_else(|| EngineError::ParentNotFound(parent_id.clone()))?;

            if !self.registry.can_be_child(&structure.block_type, &parent.block_type) {
                return Err(EngineError::InvalidChildType {
                    child: structure.block_type.clone(),
                    parent: parent.block_type.clone(),
                });
            }
            if parent.is_static {
                return Err(EngineError::StaticBlock(parent_id.clone()));
            }

            let index = parent.children.iter().position(|id| id == target_id);
            return Ok(InsertOptions {
                parent_id: Some(parent_id.clone()),
                region_name: None,
                index: index.map(|i| i + 1),
            });
        }

        let region = self
            .page
            .region_containing(target_id)
            .ok_or_else(|| EngineError::BlockNotFound(target_id.to_string()))?;
        let index = region.blocks.iter().position(|id| id == target_id);

        Ok(InsertOptions {
            parent_id: None,
            region_name: Some(region.name.clone()),
            index: index.map(|i| i + 1),
        })
    }

    /// Remove a block (its subtree stays restorable through undo)
    #[instrument(level = "debug", skip(self))]
    pub fn remove_block(&mut self, block_id: &str) -> Result<(), EngineError> {
        self.try_remove_block(block_id).inspect_err(log_rejection)
    }

    fn try_remove_block(&mut self, block_id: &str) -> Result<(), EngineError> {
        let block = self.block(block_id)?;
        if block.is_static {
            return Err(EngineError::StaticBlock(block_id.to_string()));
        }

        self.execute(RemoveBlock::new(block_id).into())
    }

    /// Move a block under another block or to the top level of a region
    #[instrument(level = "debug", skip(self))]
    pub fn move_block(&mut self, block_id: &str, target: MoveTarget) -> Result<(), EngineError> {
        self.try_move_block(block_id, target).inspect_err(log_rejection)
    }

    fn try_move_block(&mut self, block_id: &str, target: MoveTarget) -> Result<(), EngineError> {
        let block = self.block(block_id)?;
        if block.is_static {
            return Err(EngineError::StaticBlock(block_id.to_string()));
        }

        if let Some(parent_id) = target.parent_id() {
            let parent = self
                .page
                .block(parent_id)
                .ok_or_else(|| EngineError::ParentNotFound(parent_id.to_string()))?;

            if self.page.is_self_or_ancestor(block_id, parent_id) {
                return Err(EngineError::CycleDetected(block_id.to_string()));
            }
            if !self.registry.can_be_child(&block.block_type, &parent.block_type) {
                return Err(EngineError::InvalidChildType {
                    child: block.block_type.clone(),
                    parent: parent.block_type.clone(),
                });
            }
        }

        self.execute(MoveBlock::new(block_id, target).into())
    }

    /// Flip `disabled`, or set it when `disabled` is given
    pub fn toggle_block(&mut self, block_id: &str, disabled: Option<bool>) -> Result<(), EngineError> {
        self.block(block_id).inspect_err(log_rejection)?;
        self.execute(ToggleBlock::new(block_id, disabled).into())
    }

    pub fn set_block_property(&mut self, block_id: &str, key: &str, value: Value) -> Result<(), EngineError> {
        self.block(block_id).inspect_err(log_rejection)?;
        self.execute(SetBlockProperty::new(block_id, key, value).into())
    }

    pub fn set_block_name(&mut self, block_id: &str, name: &str) -> Result<(), EngineError> {
        self.block(block_id).inspect_err(log_rejection)?;
        self.execute(SetBlockName::new(block_id, name).into())
    }

    /// Copy a block and its subtree right after it, returning the copy's id
    #[instrument(level = "debug", skip(self))]
    pub fn duplicate_block(&mut self, block_id: &str) -> Result<String, EngineError> {
        self.block(block_id).inspect_err(log_rejection)?;

        let command = DuplicateBlock::new(&self.page, block_id, &mut self.ids)?;
        let id = command.new_block_id().to_string();
        self.execute(command.into())?;
        Ok(id)
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    /// Revert the last command. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EngineError> {
        let Some(step) = self.history.undo(&mut self.page)? else {
            return Ok(false);
        };

        debug!(command = step.command.name(), block_id = step.command.block_id(), "Undo");
        self.events.emit(&step.output);
        self.events.emit(&EngineEvent::Undo {
            command: Box::new(step.command.clone()),
        });
        Ok(true)
    }

    /// Re-apply the last undone command. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool, EngineError> {
        let Some(step) = self.history.redo(&mut self.page)? else {
            return Ok(false);
        };

        debug!(command = step.command.name(), block_id = step.command.block_id(), "Redo");
        self.events.emit(&step.output);
        self.events.emit(&EngineEvent::Redo {
            command: Box::new(step.command.clone()),
        });
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &HistoryManager<Command> {
        &self.history
    }

    // ---------------------------------------------------------------------
    // Page
    // ---------------------------------------------------------------------

    /// Independent copy of the current page
    pub fn get_page(&self) -> Page {
        self.page.clone()
    }

    /// Replace the page. Missing parent links are healed, a region is
    /// synthesized if none exist, and history is cleared.
    pub fn set_page(&mut self, page: Page) {
        let new_page = normalize_page(page);
        let previous_page = std::mem::replace(&mut self.page, new_page.clone());
        self.history.clear();

        info!(blocks = self.page.blocks.len(), regions = self.page.regions.len(), "Page set");
        self.events.emit(&EngineEvent::PageSet {
            previous_page: Box::new(previous_page),
            new_page: Box::new(new_page),
        });
    }

    pub fn get_block_by_id(&self, block_id: &str) -> Option<Block> {
        self.page.block(block_id).cloned()
    }

    /// Serialize a block and its descendants into a pasteable structure
    pub fn export_block_as_nested_structure(&self, block_id: &str) -> Result<BlockStructure, EngineError> {
        let block = self.block(block_id)?;

        let children = block
            .children
            .iter()
            .filter(|id| self.page.contains(id))
            .map(|id| self.export_block_as_nested_structure(id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BlockStructure {
            block_type: block.block_type.clone(),
            id: Some(block.id.clone()),
            semantic_id: block.semantic_id.clone(),
            properties: block.properties.clone(),
            name: block.name.clone(),
            is_static: block.is_static,
            disabled: block.disabled,
            repeated: block.repeated,
            ghost: block.ghost,
            children,
        })
    }

    // ---------------------------------------------------------------------
    // Schemas
    // ---------------------------------------------------------------------

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn register_block_schema(&mut self, schema: BlockSchema) -> Result<(), EngineError> {
        let block_type = schema.block_type.clone();
        self.registry.register(block_type, schema)?;
        Ok(())
    }

    pub fn get_block_schema(&self, block_type: &str) -> Option<&BlockSchema> {
        self.registry.get(block_type)
    }

    pub fn get_block_schemas(&self) -> &HashMap<String, BlockSchema> {
        self.registry.get_all()
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        self.events.on(kind, listener)
    }

    pub fn once<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        self.events.once(kind, listener)
    }

    /// Listen to every event
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub fn remove_all_listeners(&mut self, kind: Option<EventKind>) {
        self.events.remove_all_listeners(kind)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn execute(&mut self, mut command: Command) -> Result<(), EngineError> {
        let event = command.apply(&mut self.page)?;
        debug!(command = command.name(), block_id = command.block_id(), "Applied command");

        self.history.add_command(command);
        self.events.emit(&event);
        Ok(())
    }

    fn schema(&self, block_type: &str) -> Result<&BlockSchema, EngineError> {
        find_schema(&self.registry, block_type)
    }

    fn block(&self, block_id: &str) -> Result<&Block, EngineError> {
        self.page
            .block(block_id)
            .ok_or_else(|| EngineError::BlockNotFound(block_id.to_string()))
    }

    /// A named parent must exist and accept `child_type`
    fn check_parent(&self, child_type: &str, parent_id: Option<&str>) -> Result<(), EngineError> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };

        let parent = self
            .page
            .block(parent_id)
            .ok_or_else(|| EngineError::ParentNotFound(parent_id.to_string()))?;

        if !self.registry.can_be_child(child_type, &parent.block_type) {
            return Err(EngineError::InvalidChildType {
                child: child_type.to_string(),
                parent: parent.block_type.clone(),
            });
        }
        Ok(())
    }
}

fn find_schema<'a>(registry: &'a SchemaRegistry, block_type: &str) -> Result<&'a BlockSchema, EngineError> {
    registry
        .get(block_type)
        .ok_or_else(|| EngineError::BlockTypeNotRegistered(block_type.to_string()))
}

/// Heal parent back-links, then guarantee a region
fn normalize_page(mut page: Page) -> Page {
    let repaired = page.repair_parent_links();
    if repaired > 0 {
        debug!(repaired, "Restored missing parent links");
    }
    if page.ensure_region() {
        debug!(roots = page.regions[0].blocks.len(), "Synthesized default region");
    }
    page
}
