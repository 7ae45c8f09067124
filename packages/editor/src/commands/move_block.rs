use super::{
    attach, detach, drop_created_region, find_block, find_block_mut, not_applied, resolve_container, CommandError,
    CommandOp, Placement,
};
use crate::events::EngineEvent;
use pagecraft_common::{BlockPosition, Page};
use serde::{Deserialize, Serialize};

/// Destination of a move: under a block, or at the top level of a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", rename_all = "camelCase")]
pub enum MoveTarget {
    #[serde(rename_all = "camelCase")]
    Parent {
        parent_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },

    /// `region_name: None` targets the first region
    #[serde(rename_all = "camelCase")]
    Region {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
}

impl MoveTarget {
    pub fn parent(parent_id: impl Into<String>, index: Option<usize>) -> Self {
        MoveTarget::Parent {
            parent_id: parent_id.into(),
            index,
        }
    }

    pub fn region(region_name: impl Into<String>, index: Option<usize>) -> Self {
        MoveTarget::Region {
            region_name: Some(region_name.into()),
            index,
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        match self {
            MoveTarget::Parent { parent_id, .. } => Some(parent_id),
            MoveTarget::Region { .. } => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            MoveTarget::Parent { index, .. } | MoveTarget::Region { index, .. } => *index,
        }
    }

    fn region_name(&self) -> Option<&str> {
        match self {
            MoveTarget::Parent { .. } => None,
            MoveTarget::Region { region_name, .. } => region_name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub source: BlockPosition,
    pub destination: Placement,
}

/// Relocate a block to another parent, region or index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBlock {
    pub block_id: String,
    pub target: MoveTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved: Option<MoveRecord>,
}

impl MoveBlock {
    pub fn new(block_id: impl Into<String>, target: MoveTarget) -> Self {
        Self {
            block_id: block_id.into(),
            target,
            moved: None,
        }
    }
}

impl CommandOp for MoveBlock {
    fn apply(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        find_block(page, &self.block_id)?;

        if let Some(parent_id) = self.target.parent_id() {
            if !page.contains(parent_id) {
                return Err(CommandError::ParentNotFound(parent_id.to_string()));
            }
            if page.is_self_or_ancestor(&self.block_id, parent_id) {
                return Err(CommandError::InvalidStructure(format!(
                    "moving '{}' under '{}' would create a cycle",
                    self.block_id, parent_id
                )));
            }
        }

        let source = page.locate(&self.block_id).ok_or_else(|| {
            CommandError::InvalidStructure(format!("block '{}' is not listed in any container", self.block_id))
        })?;
        detach(page, &source.container, &self.block_id)?;

        let (container, created_region) =
            resolve_container(page, self.target.parent_id(), self.target.region_name())?;
        let index = attach(page, &container, &self.block_id, self.target.index())?;
        find_block_mut(page, &self.block_id)?.parent_id = container.parent_id().map(str::to_string);

        let target = BlockPosition { container, index };
        let event = EngineEvent::BlockMove {
            block_id: self.block_id.clone(),
            source: source.clone(),
            target: target.clone(),
        };

        self.moved = Some(MoveRecord {
            source,
            destination: Placement {
                position: target,
                created_region,
            },
        });
        Ok(event)
    }

    fn revert(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        let record = self.moved.take().ok_or_else(|| not_applied(self.name()))?;
        find_block(page, &self.block_id)?;

        let destination = &record.destination;
        let from_index = detach(page, &destination.position.container, &self.block_id)?;
        drop_created_region(page, destination);

        let source = &record.source;
        let index = attach(page, &source.container, &self.block_id, Some(source.index))?;
        find_block_mut(page, &self.block_id)?.parent_id = source.container.parent_id().map(str::to_string);

        Ok(EngineEvent::BlockMove {
            block_id: self.block_id.clone(),
            source: BlockPosition {
                container: destination.position.container.clone(),
                index: from_index,
            },
            target: BlockPosition {
                container: source.container.clone(),
                index,
            },
        })
    }

    fn name(&self) -> &'static str {
        "MoveBlock"
    }

    fn block_id(&self) -> &str {
        &self.block_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_common::{Block, Container};

    fn page() -> Page {
        let mut page = Page::default();
        for block in [
            Block::new("box", "box").with_children(vec!["text".into()]),
            Block::new("text", "text").with_parent("box"),
            Block::new("other", "box"),
        ] {
            page.blocks.insert(block.id.clone(), block);
        }
        page.regions[0].blocks = vec!["box".into(), "other".into()];
        page
    }

    #[test]
    fn test_move_child_to_region_and_back() {
        let mut page = page();
        let before = page.clone();

        let mut command = MoveBlock::new("text", MoveTarget::region("main", Some(0)));
        let event = command.apply(&mut page).unwrap();

        assert_eq!(page.regions[0].blocks, vec!["text", "box", "other"]);
        assert!(page.blocks["box"].children.is_empty());
        assert_eq!(page.blocks["text"].parent_id, None);
        assert_eq!(
            event,
            EngineEvent::BlockMove {
                block_id: "text".into(),
                source: BlockPosition {
                    container: Container::Parent("box".into()),
                    index: 0
                },
                target: BlockPosition {
                    container: Container::Region("main".into()),
                    index: 0
                },
            }
        );

        command.revert(&mut page).unwrap();
        assert_eq!(page, before);
    }

    #[test]
    fn test_move_between_parents_with_out_of_range_index_appends() {
        let mut page = page();
        let before = page.clone();

        let mut command = MoveBlock::new("text", MoveTarget::parent("other", Some(9)));
        command.apply(&mut page).unwrap();
        assert_eq!(page.blocks["other"].children, vec!["text"]);
        assert_eq!(page.blocks["text"].parent_id.as_deref(), Some("other"));

        command.revert(&mut page).unwrap();
        assert_eq!(page, before);
    }

    #[test]
    fn test_move_to_new_region_is_fully_reverted() {
        let mut page = page();
        let before = page.clone();

        let mut command = MoveBlock::new("other", MoveTarget::region("sidebar", None));
        command.apply(&mut page).unwrap();
        assert_eq!(page.region("sidebar").unwrap().blocks, vec!["other"]);

        command.revert(&mut page).unwrap();
        assert_eq!(page, before);
    }

    #[test]
    fn test_move_into_own_descendant_is_rejected() {
        let mut page = page();
        let before = page.clone();

        let err = MoveBlock::new("box", MoveTarget::parent("text", None))
            .apply(&mut page)
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidStructure(_)));
        assert_eq!(page, before);
    }

    #[test]
    fn test_move_to_missing_parent_leaves_page_untouched() {
        let mut page = page();
        let before = page.clone();

        let err = MoveBlock::new("text", MoveTarget::parent("nope", None))
            .apply(&mut page)
            .unwrap_err();
        assert_eq!(err, CommandError::ParentNotFound("nope".into()));
        assert_eq!(page, before);
    }
}
