//! # Undo/Redo History
//!
//! A linear, bounded stack of reversible commands.
//!
//! ## Design
//!
//! - The caller applies a command, then records it with [`HistoryManager::add_command`]
//! - Undo reverts the command under the cursor and moves the cursor back
//! - Redo moves the cursor forward and re-applies that command
//! - Recording after an undo discards the redo branch (no branching history)
//! - When full, the oldest entry is evicted
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = HistoryManager::with_capacity(50);
//!
//! let mut command = Command::Toggle(ToggleBlock::new("hero", None));
//! command.apply(&mut page)?;
//! history.add_command(command);
//!
//! history.undo(&mut page)?;
//! history.redo(&mut page)?;
//! ```

use std::collections::VecDeque;

/// Default number of retained commands
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// A unit of work that can be applied to a target and reverted exactly
pub trait Reversible {
    type Target;
    type Output;
    type Error;

    fn apply(&mut self, target: &mut Self::Target) -> Result<Self::Output, Self::Error>;

    fn revert(&mut self, target: &mut Self::Target) -> Result<Self::Output, Self::Error>;
}

/// Result of a successful undo or redo
pub struct Step<'a, C: Reversible> {
    /// The command that was reverted or re-applied
    pub command: &'a C,

    /// What the command produced while doing so
    pub output: C::Output,
}

/// Undo/redo history
#[derive(Debug)]
pub struct HistoryManager<C> {
    entries: VecDeque<C>,

    /// Number of entries at or before the cursor (cursor + 1)
    applied: usize,

    /// Maximum number of entries (0 = unlimited)
    capacity: usize,
}

impl<C: Reversible> HistoryManager<C> {
    /// Create a history with the default capacity (100)
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }

    /// Create a history retaining at most `capacity` commands (0 = unlimited)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            applied: 0,
            capacity,
        }
    }

    /// Record an already-applied command
    pub fn add_command(&mut self, command: C) {
        // New action invalidates the redo branch
        self.entries.truncate(self.applied);

        if self.capacity > 0 && self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.applied -= 1;
        }

        self.entries.push_back(command);
        self.applied += 1;
    }

    /// Revert the command under the cursor.
    ///
    /// Returns `Ok(None)` when there is nothing to undo. On error the cursor
    /// does not move.
    pub fn undo(&mut self, target: &mut C::Target) -> Result<Option<Step<'_, C>>, C::Error> {
        if self.applied == 0 {
            return Ok(None);
        }

        let index = self.applied - 1;
        let output = self.entries[index].revert(target)?;
        self.applied = index;

        Ok(Some(Step {
            command: &self.entries[index],
            output,
        }))
    }

    /// Re-apply the command after the cursor.
    ///
    /// Returns `Ok(None)` when there is nothing to redo. On error the cursor
    /// does not move.
    pub fn redo(&mut self, target: &mut C::Target) -> Result<Option<Step<'_, C>>, C::Error> {
        if self.applied == self.entries.len() {
            return Ok(None);
        }

        let index = self.applied;
        let output = self.entries[index].apply(target)?;
        self.applied = index + 1;

        Ok(Some(Step {
            command: &self.entries[index],
            output,
        }))
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    /// Drop every entry and reset the cursor
    pub fn clear(&mut self) {
        self.entries.clear();
        self.applied = 0;
    }

    /// Index of the command under the cursor, `None` when nothing is applied
    pub fn current_index(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of commands that can be undone
    pub fn undo_levels(&self) -> usize {
        self.applied
    }

    /// Number of commands that can be redone
    pub fn redo_levels(&self) -> usize {
        self.entries.len() - self.applied
    }

    /// Recorded commands, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.entries.iter()
    }
}

impl<C: Reversible> Default for HistoryManager<C> {
    fn default() -> Self {
        Self::new()
    }
}
