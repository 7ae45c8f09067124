use super::{attach, detach, find_block, not_applied, CommandError, CommandOp};
use crate::events::EngineEvent;
use pagecraft_common::{Block, BlockPosition, Page};
use serde::{Deserialize, Serialize};

/// Take a block out of its container and drop its record.
///
/// Only the block's own entry is deleted. Descendants stay in `blocks`
/// (unreachable) so revert can restore the subtree by putting the node back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBlock {
    pub block_id: String,

    /// Snapshot and position captured on apply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<(Block, BlockPosition)>,
}

impl RemoveBlock {
    pub fn new(block_id: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            removed: None,
        }
    }
}

impl CommandOp for RemoveBlock {
    fn apply(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        find_block(page, &self.block_id)?;

        let position = page.locate(&self.block_id).ok_or_else(|| {
            CommandError::InvalidStructure(format!("block '{}' is not listed in any container", self.block_id))
        })?;

        detach(page, &position.container, &self.block_id)?;
        let block = page
            .blocks
            .remove(&self.block_id)
            .ok_or_else(|| CommandError::BlockNotFound(self.block_id.clone()))?;

        let event = EngineEvent::BlockRemove {
            block_id: self.block_id.clone(),
            block: Box::new(block.clone()),
            parent_id: position.container.parent_id().map(str::to_string),
            region_name: position.container.region_name().map(str::to_string),
            index: position.index,
        };

        self.removed = Some((block, position));
        Ok(event)
    }

    fn revert(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        let (block, position) = self.removed.take().ok_or_else(|| not_applied(self.name()))?;

        let index = attach(page, &position.container, &self.block_id, Some(position.index))?;
        page.blocks.insert(self.block_id.clone(), block.clone());

        Ok(EngineEvent::BlockInsert {
            block_id: self.block_id.clone(),
            block: Box::new(block),
            parent_id: position.container.parent_id().map(str::to_string),
            region_name: position.container.region_name().map(str::to_string),
            index,
        })
    }

    fn name(&self) -> &'static str {
        "RemoveBlock"
    }

    fn block_id(&self) -> &str {
        &self.block_id
    }
}
