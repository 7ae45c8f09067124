use super::{
    attach, detach, drop_created_region, find_block, not_applied, resolve_container, CommandError, CommandOp,
    Placement,
};
use crate::events::EngineEvent;
use pagecraft_common::{Block, BlockPosition, Container, IdGenerator, Page};
use serde::{Deserialize, Serialize};

/// Deep-copy a block and its subtree right after the original
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateBlock {
    pub block_id: String,

    /// Cloned subtree with fresh ids, root first
    pub clones: Vec<Block>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
}

impl DuplicateBlock {
    /// Clone the subtree of `block_id` as it is in `page` now
    pub fn new(page: &Page, block_id: &str, ids: &mut IdGenerator) -> Result<Self, CommandError> {
        let original = find_block(page, block_id)?;

        let mut clones = Vec::with_capacity(1 + original.children.len());
        clone_subtree(page, original, original.parent_id.clone(), ids, &mut clones);

        Ok(Self {
            block_id: block_id.to_string(),
            clones,
            placement: None,
        })
    }

    /// Id of the cloned root
    pub fn new_block_id(&self) -> &str {
        self.clones.first().map(|b| b.id.as_str()).unwrap_or_default()
    }

    /// Where the copy goes: after the original in its container, else the
    /// end of the first region
    fn target(&self, page: &mut Page) -> Result<(Container, Option<usize>, bool), CommandError> {
        let original = find_block(page, &self.block_id)?;

        if let Some(parent_id) = &original.parent_id {
            let parent = find_block(page, parent_id).map_err(|_| CommandError::ParentNotFound(parent_id.clone()))?;
            let index = parent.children.iter().position(|id| id == &self.block_id).map(|i| i + 1);
            return Ok((Container::Parent(parent_id.clone()), index, false));
        }

        if let Some(region) = page.region_containing(&self.block_id) {
            let index = region.blocks.iter().position(|id| id == &self.block_id).map(|i| i + 1);
            return Ok((Container::Region(region.name.clone()), index, false));
        }

        let (container, created) = resolve_container(page, None, None)?;
        Ok((container, None, created))
    }
}

impl CommandOp for DuplicateBlock {
    fn apply(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        let root = self
            .clones
            .first()
            .cloned()
            .ok_or_else(|| CommandError::InvalidStructure("nothing to duplicate".to_string()))?;

        if let Some(taken) = self.clones.iter().find(|block| page.contains(&block.id)) {
            return Err(CommandError::InvalidStructure(format!(
                "block id '{}' is already in use",
                taken.id
            )));
        }

        let (container, index, created_region) = self.target(page)?;
        let index = attach(page, &container, &root.id, index)?;
        for block in &self.clones {
            page.blocks.insert(block.id.clone(), block.clone());
        }

        let event = EngineEvent::BlockDuplicate {
            original_block_id: self.block_id.clone(),
            new_block_id: root.id.clone(),
            new_block: Box::new(root),
            parent_id: container.parent_id().map(str::to_string),
            region_name: container.region_name().map(str::to_string),
            index,
        };

        self.placement = Some(Placement {
            position: BlockPosition { container, index },
            created_region,
        });
        Ok(event)
    }

    fn revert(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        let placement = self.placement.take().ok_or_else(|| not_applied(self.name()))?;
        let root_id = self.new_block_id().to_string();
        find_block(page, &root_id)?;

        let container = &placement.position.container;
        let index = detach(page, container, &root_id)?;

        // The copy may have gained children since; follow the live tree
        let mut doomed = vec![root_id.clone()];
        doomed.extend(page.descendants(&root_id));
        let mut removed = None;
        for id in doomed {
            let block = page.blocks.remove(&id);
            if id == root_id {
                removed = block;
            }
        }
        drop_created_region(page, &placement);

        let block = removed.ok_or_else(|| CommandError::BlockNotFound(root_id.clone()))?;
        Ok(EngineEvent::BlockRemove {
            block_id: root_id,
            block: Box::new(block),
            parent_id: container.parent_id().map(str::to_string),
            region_name: container.region_name().map(str::to_string),
            index,
        })
    }

    fn name(&self) -> &'static str {
        "DuplicateBlock"
    }

    fn block_id(&self) -> &str {
        &self.block_id
    }
}

/// Push a copy of `block` and every live descendant with fresh ids, parents
/// before children
fn clone_subtree(page: &Page, block: &Block, parent_id: Option<String>, ids: &mut IdGenerator, out: &mut Vec<Block>) {
    let id = ids.new_block_id(page);
    let slot = out.len();
    out.push(Block {
        id: id.clone(),
        parent_id,
        children: Vec::with_capacity(block.children.len()),
        ..block.clone()
    });

    for child_id in &block.children {
        let Some(child) = page.block(child_id) else {
            continue;
        };
        let child_slot = out.len();
        clone_subtree(page, child, Some(id.clone()), ids, out);
        let child_copy_id = out[child_slot].id.clone();
        out[slot].children.push(child_copy_id);
    }
}
