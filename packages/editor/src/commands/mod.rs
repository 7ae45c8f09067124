//! # Commands
//!
//! Reversible mutations of a [`Page`].
//!
//! ## Design
//!
//! Commands are plain data: everything needed to apply them is captured when
//! they are built (including freshly generated block ids), and everything
//! needed to revert them is captured by `apply`. That keeps history entries
//! serializable and lets redo reproduce the exact same ids.
//!
//! Commands only re-check what they touch (the block, its parent, its
//! container). Schema acceptance and the `static` flag are enforced by the
//! [`Engine`](crate::Engine) before a command is built.
//!
//! ## Placement rules
//!
//! - A requested index is used verbatim when it lies within the container
//!   (`0..=len`), anything else appends
//! - Top-level inserts go to the named region, else the first region, else
//!   `main`; a missing region is created and removed again on revert

mod command_trait;
mod duplicate;
mod insert;
mod move_block;
mod properties;
mod remove;
mod toggle;

pub use command_trait::CommandOp;
pub use duplicate::DuplicateBlock;
pub use insert::{InsertBlock, InsertBlockFromPreset, InsertOptions};
pub use move_block::{MoveBlock, MoveRecord, MoveTarget};
pub use properties::{PreviousValue, SetBlockName, SetBlockProperty};
pub use remove::RemoveBlock;
pub use toggle::ToggleBlock;

use crate::events::EngineEvent;
use crate::history::Reversible;
use pagecraft_common::{Block, BlockPosition, Container, Page, Region, DEFAULT_REGION_NAME};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every reversible mutation the engine records in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Command {
    Insert(InsertBlock),
    InsertFromPreset(InsertBlockFromPreset),
    Remove(RemoveBlock),
    Move(MoveBlock),
    Toggle(ToggleBlock),
    SetProperty(SetBlockProperty),
    SetName(SetBlockName),
    Duplicate(DuplicateBlock),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),
}

impl Command {
    fn op(&self) -> &dyn CommandOp {
        match self {
            Command::Insert(c) => c,
            Command::InsertFromPreset(c) => c,
            Command::Remove(c) => c,
            Command::Move(c) => c,
            Command::Toggle(c) => c,
            Command::SetProperty(c) => c,
            Command::SetName(c) => c,
            Command::Duplicate(c) => c,
        }
    }

    fn op_mut(&mut self) -> &mut dyn CommandOp {
        match self {
            Command::Insert(c) => c,
            Command::InsertFromPreset(c) => c,
            Command::Remove(c) => c,
            Command::Move(c) => c,
            Command::Toggle(c) => c,
            Command::SetProperty(c) => c,
            Command::SetName(c) => c,
            Command::Duplicate(c) => c,
        }
    }

    /// Debug name of the command kind
    pub fn name(&self) -> &'static str {
        self.op().name()
    }

    /// Id of the block the command is about
    pub fn block_id(&self) -> &str {
        self.op().block_id()
    }
}

impl Reversible for Command {
    type Target = Page;
    type Output = EngineEvent;
    type Error = CommandError;

    fn apply(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        self.op_mut().apply(page)
    }

    fn revert(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError> {
        self.op_mut().revert(page)
    }
}

macro_rules! impl_from_command {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Command {
                fn from(command: $ty) -> Self {
                    Command::$variant(command)
                }
            }
        )*
    };
}

impl_from_command! {
    InsertBlock => Insert,
    InsertBlockFromPreset => InsertFromPreset,
    RemoveBlock => Remove,
    MoveBlock => Move,
    ToggleBlock => Toggle,
    SetBlockProperty => SetProperty,
    SetBlockName => SetName,
    DuplicateBlock => Duplicate,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Where a command put a block, captured by `apply` for `revert`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub position: BlockPosition,

    /// The target region did not exist before `apply`
    #[serde(default, skip_serializing_if = "is_false")]
    pub created_region: bool,
}

/// Resolve a requested index against a container of `len` ids
pub fn insertion_index(requested: Option<usize>, len: usize) -> usize {
    match requested {
        Some(index) if index <= len => index,
        _ => len,
    }
}

/// Resolve the container a block goes into, creating the region if needed.
///
/// Returns the container and whether a region was created.
pub(crate) fn resolve_container(
    page: &mut Page,
    parent_id: Option<&str>,
    region_name: Option<&str>,
) -> Result<(Container, bool), CommandError> {
    if let Some(parent_id) = parent_id {
        if !page.contains(parent_id) {
            return Err(CommandError::ParentNotFound(parent_id.to_string()));
        }
        return Ok((Container::Parent(parent_id.to_string()), false));
    }

    let name = region_name
        .or(page.first_region_name())
        .unwrap_or(DEFAULT_REGION_NAME)
        .to_string();

    if page.region(&name).is_some() {
        return Ok((Container::Region(name), false));
    }

    page.regions.push(Region::new(name.clone()));
    Ok((Container::Region(name), true))
}

/// Splice `block_id` into a container, returning the index used
pub(crate) fn attach(
    page: &mut Page,
    container: &Container,
    block_id: &str,
    index: Option<usize>,
) -> Result<usize, CommandError> {
    let ids = page
        .container_mut(container)
        .ok_or_else(|| missing_container(container))?;

    let index = insertion_index(index, ids.len());
    ids.insert(index, block_id.to_string());
    Ok(index)
}

/// Take `block_id` out of a container, returning the index it held
pub(crate) fn detach(page: &mut Page, container: &Container, block_id: &str) -> Result<usize, CommandError> {
    let ids = page
        .container_mut(container)
        .ok_or_else(|| missing_container(container))?;

    let index = ids.iter().position(|id| id == block_id).ok_or_else(|| {
        CommandError::InvalidStructure(format!("block '{}' is not listed in {:?}", block_id, container))
    })?;

    ids.remove(index);
    Ok(index)
}

/// Remove a region a command created, once it is empty again
pub(crate) fn drop_created_region(page: &mut Page, placement: &Placement) {
    if !placement.created_region {
        return;
    }
    if let Container::Region(name) = &placement.position.container {
        page.regions
            .retain(|region| &region.name != name || !region.blocks.is_empty());
    }
}

pub(crate) fn not_applied(command: &str) -> CommandError {
    CommandError::InvalidStructure(format!("{} was reverted before being applied", command))
}

pub(crate) fn find_block<'a>(page: &'a Page, block_id: &str) -> Result<&'a Block, CommandError> {
    page.block(block_id)
        .ok_or_else(|| CommandError::BlockNotFound(block_id.to_string()))
}

pub(crate) fn find_block_mut<'a>(page: &'a mut Page, block_id: &str) -> Result<&'a mut Block, CommandError> {
    page.block_mut(block_id)
        .ok_or_else(|| CommandError::BlockNotFound(block_id.to_string()))
}

fn missing_container(container: &Container) -> CommandError {
    match container {
        Container::Parent(id) => CommandError::ParentNotFound(id.clone()),
        Container::Region(name) => CommandError::InvalidStructure(format!("region '{}' not found", name)),
    }
}
