//! # Pagecraft Editor
//!
//! Editing core for block-based pages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ common: Page / Region / Block, schemas      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Engine                              │
//! │  - Schema registry (accepts rules)          │
//! │  - Validate, then build a Command           │
//! │  - Apply, record in bounded history         │
//! │  - Emit one event per change                │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ observers: UI, preview, transport           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Engine is the only writer**: callers get copies, never live state
//! 2. **Commands are data**: everything needed to revert is captured on apply
//! 3. **Validate before mutating**: a rejected call leaves the page untouched
//! 4. **Events are incremental**: payloads carry positions and old values
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pagecraft_editor::{Engine, EngineConfig, InsertOptions, MoveTarget};
//!
//! let mut engine = Engine::new(
//!     EngineConfig::default()
//!         .with_schema(BlockSchema::new("box").accepting(["*"]))
//!         .with_schema(BlockSchema::new("text")),
//! )?;
//!
//! let boxed = engine.insert_block("box", InsertOptions::default())?;
//! let text = engine.insert_block("text", InsertOptions::in_parent(&boxed))?;
//! engine.move_block(&text, MoveTarget::region("main", Some(0)))?;
//!
//! engine.undo()?;
//! ```

mod commands;
mod engine;
mod errors;
mod events;
mod history;
mod registry;

pub use commands::{
    insertion_index, Command, CommandError, CommandOp, DuplicateBlock, InsertBlock, InsertBlockFromPreset,
    InsertOptions, MoveBlock, MoveRecord, MoveTarget, Placement, PreviousValue, RemoveBlock, SetBlockName, SetBlockProperty, ToggleBlock,
};
pub use engine::{Engine, EngineConfig};
pub use errors::EngineError;
pub use events::{EngineEvent, EventBus, EventKind, ListenerId};
pub use history::{HistoryManager, Reversible, Step, DEFAULT_HISTORY_SIZE};
pub use registry::{SchemaError, SchemaRegistry};

// Re-export the model for convenience
pub use pagecraft_common as model;
pub use pagecraft_common::{Block, BlockSchema, BlockStructure, Page, Region};
