use super::CommandError;
use crate::events::EngineEvent;
use pagecraft_common::Page;

/// Trait for command kinds
///
/// Each command kind implements this trait to provide:
/// - Apply logic, capturing what revert needs
/// - Revert logic, restoring the page exactly
/// - The event describing each change
pub trait CommandOp {
    /// Apply this command to the page
    fn apply(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError>;

    /// Undo a previous `apply`
    fn revert(&mut self, page: &mut Page) -> Result<EngineEvent, CommandError>;

    /// Get a debug name for this command
    fn name(&self) -> &'static str;

    /// The block this command is about
    fn block_id(&self) -> &str;
}
