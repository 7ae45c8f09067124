use super::{attach, detach, drop_created_region, not_applied, resolve_container, CommandError, CommandOp, Placement};
use crate::errors::EngineError;
use crate::events::EngineEvent;
use crate::registry::SchemaRegistry;
use pagecraft_common::{Block, BlockPosition, BlockSchema, BlockStructure, IdGenerator, Page};
use serde::{Deserialize, Serialize};

/// Where a new block should go
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOptions {
    /// Nest under this block instead of a region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Top-level target, ignored when `parent_id` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl InsertOptions {
    pub fn in_parent(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            ..Self::default()
        }
    }

    pub fn in_region(region_name: impl Into<String>) -> Self {
        Self {
            region_name: Some(region_name.into()),
            ..Self::default()
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

/// Insert a single new block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertBlock {
    pub block: Block,
    pub options: InsertOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
}

impl InsertBlock {
    pub fn new(mut block: Block, options: InsertOptions) -> Self {
        block.parent_id = options.parent_id.clone();
        Self {
            block,
            options,
            placement: None,
        }
    }

    /// New block of the schema's type with every field default filled in
    pub fn from_schema(schema: &BlockSchema, id: impl Into<String>, options: InsertOptions) -> Self {
        let block = Block::new(id, schema.block_type.clone()).with_properties(schema.default_properties());
        Self::new(block, options)
    }
}

impl CommandOp for InsertBlock {
    fn apply(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        let placement = place_tree(page, &self.block, &[], &self.options)?;
        let event = insert_event(&self.block, &placement.position);
        self.placement = Some(placement);
        Ok(event)
    }

    fn revert(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        let placement = self.placement.take().ok_or_else(|| not_applied(self.name()))?;
        unplace_tree(page, &self.block.id, std::iter::empty(), &placement)
    }

    fn name(&self) -> &'static str {
        "InsertBlock"
    }

    fn block_id(&self) -> &str {
        &self.block.id
    }
}

/// Insert a whole tree built from a schema preset or a pasted structure.
///
/// The tree is fully materialized (ids, properties, names) when the
/// command is built, so a missing nested type fails before the page is
/// touched and redo reproduces the same ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertBlockFromPreset {
    pub root: Block,
    #[serde(default)]
    pub descendants: Vec<Block>,
    pub options: InsertOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
}

impl InsertBlockFromPreset {
    /// Build from the preset at `preset_index` of `block_type`'s schema
    pub fn from_preset(
        registry: &SchemaRegistry,
        block_type: &str,
        preset_index: usize,
        options: InsertOptions,
        page: &Page,
        ids: &mut IdGenerator,
    ) -> Result<Self, EngineError> {
        let schema = registry
            .get(block_type)
            .ok_or_else(|| EngineError::BlockTypeNotRegistered(block_type.to_string()))?;

        let preset = schema
            .presets
            .get(preset_index)
            .ok_or_else(|| EngineError::PresetNotFound {
                block_type: block_type.to_string(),
                index: preset_index,
            })?;

        let structure = BlockStructure {
            properties: preset.properties.clone(),
            name: preset.name.clone(),
            children: preset.children.clone(),
            ..BlockStructure::new(block_type)
        };

        Self::from_structure(registry, &structure, options, page, ids)
    }

    /// Build from an explicit structure, e.g. one exported for copy/paste
    pub fn from_structure(
        registry: &SchemaRegistry,
        structure: &BlockStructure,
        options: InsertOptions,
        page: &Page,
        ids: &mut IdGenerator,
    ) -> Result<Self, EngineError> {
        let mut descendants = Vec::with_capacity(structure.node_count() - 1);
        let root = materialize(
            registry,
            structure,
            options.parent_id.clone(),
            page,
            ids,
            &mut descendants,
        )?;

        Ok(Self {
            root,
            descendants,
            options,
            placement: None,
        })
    }

    /// Every id this command creates, root first
    pub fn created_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.root.id.as_str()).chain(self.descendants.iter().map(|b| b.id.as_str()))
    }
}

impl CommandOp for InsertBlockFromPreset {
    fn apply(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        let placement = place_tree(page, &self.root, &self.descendants, &self.options)?;
        let event = insert_event(&self.root, &placement.position);
        self.placement = Some(placement);
        Ok(event)
    }

    fn revert(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        let placement = self.placement.take().ok_or_else(|| not_applied(self.name()))?;
        let descendants = self.descendants.iter().map(|b| b.id.as_str());
        unplace_tree(page, &self.root.id, descendants, &placement)
    }

    fn name(&self) -> &'static str {
        "InsertBlockFromPreset"
    }

    fn block_id(&self) -> &str {
        &self.root.id
    }
}

/// Turn a structure into blocks with fresh ids, returning the root and
/// collecting every nested block into `descendants`
fn materialize(
    registry: &SchemaRegistry,
    structure: &BlockStructure,
    parent_id: Option<String>,
    page: &Page,
    ids: &mut IdGenerator,
    descendants: &mut Vec<Block>,
) -> Result<Block, EngineError> {
    let schema = registry
        .get(&structure.block_type)
        .ok_or_else(|| EngineError::BlockTypeNotRegistered(structure.block_type.clone()))?;

    let id = ids.new_block_id(page);
    let mut block = Block::new(id.clone(), structure.block_type.clone())
        .with_properties(schema.build_properties(&structure.properties));

    block.name = Some(
        structure
            .name
            .clone()
            .or_else(|| schema.display_name().map(str::to_string))
            .unwrap_or_else(|| structure.block_type.clone()),
    );
    block.semantic_id = structure.resolved_semantic_id().map(str::to_string);
    block.parent_id = parent_id;
    block.is_static = structure.is_static;
    block.disabled = structure.disabled;
    block.repeated = structure.repeated;
    block.ghost = structure.ghost;

    for child in &structure.children {
        let child = materialize(registry, child, Some(id.clone()), page, ids, descendants)?;
        block.children.push(child.id.clone());
        descendants.push(child);
    }

    Ok(block)
}

/// Add `root` and its already-linked `descendants` to the page
fn place_tree(
    page: &mut Page,
    root: &Block,
    descendants: &[Block],
    options: &InsertOptions,
) -> Result<Placement, CommandError> {
    if let Some(taken) = std::iter::once(root)
        .chain(descendants)
        .find(|block| page.contains(&block.id))
    {
        return Err(CommandError::InvalidStructure(format!(
            "block id '{}' is already in use",
            taken.id
        )));
    }

    let (container, created_region) =
        resolve_container(page, options.parent_id.as_deref(), options.region_name.as_deref())?;
    let index = attach(page, &container, &root.id, options.index)?;

    page.blocks.insert(root.id.clone(), root.clone());
    for block in descendants {
        page.blocks.insert(block.id.clone(), block.clone());
    }

    Ok(Placement {
        position: BlockPosition { container, index },
        created_region,
    })
}

/// Remove what [`place_tree`] added
fn unplace_tree<'a>(
    page: &mut Page,
    root_id: &str,
    descendants: impl Iterator<Item = &'a str>,
    placement: &Placement,
) -> Result<EngineEvent, CommandError> {
    if !page.contains(root_id) {
        return Err(CommandError::BlockNotFound(root_id.to_string()));
    }

    let container = &placement.position.container;
    let index = detach(page, container, root_id)?;

    let block = page
        .blocks
        .remove(root_id)
        .ok_or_else(|| CommandError::BlockNotFound(root_id.to_string()))?;
    for id in descendants {
        page.blocks.remove(id);
    }
    drop_created_region(page, placement);

    Ok(EngineEvent::BlockRemove {
        block_id: root_id.to_string(),
        block: Box::new(block),
        parent_id: container.parent_id().map(str::to_string),
        region_name: container.region_name().map(str::to_string),
        index,
    })
}

fn insert_event(block: &Block, position: &BlockPosition) -> EngineEvent {
    EngineEvent::BlockInsert {
        block_id: block.id.clone(),
        block: Box::new(block.clone()),
        parent_id: position.container.parent_id().map(str::to_string),
        region_name: position.container.region_name().map(str::to_string),
        index: position.index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_common::{BlockPreset, PropertyField};
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register_many([
                BlockSchema::new("section")
                    .accepting(["*"])
                    .with_display_name("Section")
                    .with_property(PropertyField::new("padding", "number").with_default(json!(8)))
                    .with_preset(
                        BlockPreset::new("Hero")
                            .with_properties(json!({ "padding": 32 }).as_object().cloned().unwrap_or_default())
                            .with_child(BlockStructure::new("text").with_name("Title"))
                            .with_child(BlockStructure::new("text").static_block()),
                    ),
                BlockSchema::new("text")
                    .with_property(PropertyField::new("content", "text").with_default(json!("Hello"))),
            ])
            .unwrap();
        registry
    }

    #[test]
    fn test_insert_and_revert_restores_page() {
        let mut page = Page::default();
        let before = page.clone();
        let schema = BlockSchema::new("text")
            .with_property(PropertyField::new("content", "text").with_default(json!("Hi")));

        let mut command = InsertBlock::from_schema(&schema, "t-1", InsertOptions::default());
        let event = command.apply(&mut page).unwrap();

        assert_eq!(page.regions[0].blocks, vec!["t-1"]);
        assert_eq!(page.blocks["t-1"].properties["content"], json!("Hi"));
        assert!(matches!(event, EngineEvent::BlockInsert { index: 0, .. }));

        let event = command.revert(&mut page).unwrap();
        assert!(matches!(event, EngineEvent::BlockRemove { .. }));
        assert_eq!(page, before);
    }

    #[test]
    fn test_insert_into_missing_region_creates_then_drops_it() {
        let mut page = Page::default();
        let before = page.clone();

        let mut command = InsertBlock::new(Block::new("t-1", "text"), InsertOptions::in_region("footer"));
        command.apply(&mut page).unwrap();
        assert_eq!(page.region("footer").unwrap().blocks, vec!["t-1"]);

        command.revert(&mut page).unwrap();
        assert_eq!(page, before);
    }

    #[test]
    fn test_insert_into_missing_parent_fails_cleanly() {
        let mut page = Page::default();
        let before = page.clone();

        let mut command = InsertBlock::new(Block::new("t-1", "text"), InsertOptions::in_parent("ghost"));
        assert_eq!(
            command.apply(&mut page).unwrap_err(),
            CommandError::ParentNotFound("ghost".into())
        );
        assert_eq!(page, before);
    }

    #[test]
    fn test_preset_materializes_whole_tree() {
        let registry = registry();
        let mut page = Page::default();
        let mut ids = IdGenerator::from_seed("p");

        let mut command =
            InsertBlockFromPreset::from_preset(&registry, "section", 0, InsertOptions::default(), &page, &mut ids)
                .unwrap();
        command.apply(&mut page).unwrap();

        let root = &page.blocks[&command.root.id];
        assert_eq!(root.name.as_deref(), Some("Hero"));
        assert_eq!(root.properties["padding"], json!(32));
        assert_eq!(root.children.len(), 2);

        let title = &page.blocks[&root.children[0]];
        assert_eq!(title.name.as_deref(), Some("Title"));
        assert_eq!(title.parent_id.as_deref(), Some(root.id.as_str()));
        assert_eq!(title.properties["content"], json!("Hello"));

        let second = &page.blocks[&root.children[1]];
        assert!(second.is_static);
        assert_eq!(second.name.as_deref(), Some("text"));

        assert_eq!(command.created_ids().count(), 3);
        assert!(page.check_integrity().is_empty());
    }

    #[test]
    fn test_preset_out_of_range() {
        let registry = registry();
        let page = Page::default();
        let mut ids = IdGenerator::from_seed("p");

        let err = InsertBlockFromPreset::from_preset(&registry, "section", 4, InsertOptions::default(), &page, &mut ids)
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::PresetNotFound {
                block_type: "section".into(),
                index: 4
            }
        );
    }

    #[test]
    fn test_structure_with_unknown_nested_type_fails_at_build() {
        let registry = registry();
        let page = Page::default();
        let mut ids = IdGenerator::from_seed("p");

        let structure = BlockStructure::new("section")
            .with_child(BlockStructure::new("text"))
            .with_child(BlockStructure::new("video"));

        let err = InsertBlockFromPreset::from_structure(&registry, &structure, InsertOptions::default(), &page, &mut ids)
            .unwrap_err();
        assert_eq!(err, EngineError::BlockTypeNotRegistered("video".into()));
    }

    #[test]
    fn test_structure_keeps_semantic_id_and_flags() {
        let registry = registry();
        let mut page = Page::default();
        let before = page.clone();
        let mut ids = IdGenerator::from_seed("p");

        let mut structure = BlockStructure::new("text").with_id("copied-1");
        structure.disabled = true;
        structure.ghost = true;

        let mut command =
            InsertBlockFromPreset::from_structure(&registry, &structure, InsertOptions::default(), &page, &mut ids)
                .unwrap();
        command.apply(&mut page).unwrap();

        let block = &page.blocks[&command.root.id];
        assert_ne!(block.id, "copied-1");
        assert_eq!(block.semantic_id.as_deref(), Some("copied-1"));
        assert!(block.disabled && block.ghost);

        command.revert(&mut page).unwrap();
        assert_eq!(page, before);
    }
}
