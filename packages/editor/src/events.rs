//! # Engine Events
//!
//! Every mutation produces exactly one [`EngineEvent`] carrying enough data
//! for an observer to apply the same change incrementally (ids, positions,
//! before/after values). Undo/redo additionally produce a meta event naming
//! the affected command.
//!
//! Listeners run synchronously, in registration order, on the thread that
//! called the engine.

use crate::commands::Command;
use pagecraft_common::{Block, BlockPosition, Page};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Change notification emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum EngineEvent {
    #[serde(rename = "page:set", rename_all = "camelCase")]
    PageSet {
        previous_page: Box<Page>,
        new_page: Box<Page>,
    },

    #[serde(rename = "block:insert", rename_all = "camelCase")]
    BlockInsert {
        block_id: String,
        block: Box<Block>,
        parent_id: Option<String>,
        region_name: Option<String>,
        index: usize,
    },

    #[serde(rename = "block:remove", rename_all = "camelCase")]
    BlockRemove {
        block_id: String,
        block: Box<Block>,
        parent_id: Option<String>,
        region_name: Option<String>,
        index: usize,
    },

    #[serde(rename = "block:move", rename_all = "camelCase")]
    BlockMove {
        block_id: String,
        source: BlockPosition,
        target: BlockPosition,
    },

    #[serde(rename = "block:toggle", rename_all = "camelCase")]
    BlockToggle {
        block_id: String,
        disabled: bool,
        old_value: bool,
    },

    /// `value`/`old_value` are `None` when the key is absent, and then left
    /// out of the JSON so an absent key never reads as `null`
    #[serde(rename = "block:property:set", rename_all = "camelCase")]
    BlockPropertySet {
        block_id: String,
        key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        old_value: Option<Value>,
    },

    #[serde(rename = "block:update", rename_all = "camelCase")]
    BlockUpdate {
        block_id: String,
        block: Box<Block>,
        property: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        old_value: Option<Value>,
    },

    #[serde(rename = "block:duplicate", rename_all = "camelCase")]
    BlockDuplicate {
        original_block_id: String,
        new_block_id: String,
        new_block: Box<Block>,
        parent_id: Option<String>,
        region_name: Option<String>,
        index: usize,
    },

    #[serde(rename = "undo")]
    Undo { command: Box<Command> },

    #[serde(rename = "redo")]
    Redo { command: Box<Command> },
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::PageSet { .. } => EventKind::PageSet,
            EngineEvent::BlockInsert { .. } => EventKind::BlockInsert,
            EngineEvent::BlockRemove { .. } => EventKind::BlockRemove,
            EngineEvent::BlockMove { .. } => EventKind::BlockMove,
            EngineEvent::BlockToggle { .. } => EventKind::BlockToggle,
            EngineEvent::BlockPropertySet { .. } => EventKind::BlockPropertySet,
            EngineEvent::BlockUpdate { .. } => EventKind::BlockUpdate,
            EngineEvent::BlockDuplicate { .. } => EventKind::BlockDuplicate,
            EngineEvent::Undo { .. } => EventKind::Undo,
            EngineEvent::Redo { .. } => EventKind::Redo,
        }
    }

    /// Id of the block this event is about, if any
    pub fn block_id(&self) -> Option<&str> {
        match self {
            EngineEvent::BlockInsert { block_id, .. }
            | EngineEvent::BlockRemove { block_id, .. }
            | EngineEvent::BlockMove { block_id, .. }
            | EngineEvent::BlockToggle { block_id, .. }
            | EngineEvent::BlockPropertySet { block_id, .. }
            | EngineEvent::BlockUpdate { block_id, .. } => Some(block_id),
            EngineEvent::BlockDuplicate { new_block_id, .. } => Some(new_block_id),
            EngineEvent::PageSet { .. } | EngineEvent::Undo { .. } | EngineEvent::Redo { .. } => None,
        }
    }
}

/// Event names, as seen by subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PageSet,
    BlockInsert,
    BlockRemove,
    BlockMove,
    BlockToggle,
    BlockPropertySet,
    BlockUpdate,
    BlockDuplicate,
    Undo,
    Redo,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::PageSet,
        EventKind::BlockInsert,
        EventKind::BlockRemove,
        EventKind::BlockMove,
        EventKind::BlockToggle,
        EventKind::BlockPropertySet,
        EventKind::BlockUpdate,
        EventKind::BlockDuplicate,
        EventKind::Undo,
        EventKind::Redo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PageSet => "page:set",
            EventKind::BlockInsert => "block:insert",
            EventKind::BlockRemove => "block:remove",
            EventKind::BlockMove => "block:move",
            EventKind::BlockToggle => "block:toggle",
            EventKind::BlockPropertySet => "block:property:set",
            EventKind::BlockUpdate => "block:update",
            EventKind::BlockDuplicate => "block:duplicate",
            EventKind::Undo => "undo",
            EventKind::Redo => "redo",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned when registering a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&EngineEvent)>;

struct Registration {
    id: ListenerId,
    /// `None` listens to every event
    kind: Option<EventKind>,
    once: bool,
    listener: Listener,
}

/// Synchronous multi-subscriber callback registry
#[derive(Default)]
pub struct EventBus {
    registrations: Vec<Registration>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to one kind of event
    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        self.register(Some(kind), false, Box::new(listener))
    }

    /// Listen to the next event of one kind only
    pub fn once<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        self.register(Some(kind), true, Box::new(listener))
    }

    /// Listen to every event
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        self.register(None, false, Box::new(listener))
    }

    /// Remove a listener, returning whether it was registered
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() != before
    }

    /// Remove the listeners of one kind, or all listeners
    pub fn remove_all_listeners(&mut self, kind: Option<EventKind>) {
        match kind {
            Some(kind) => self.registrations.retain(|r| r.kind != Some(kind)),
            None => self.registrations.clear(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registrations.len()
    }

    /// Deliver an event to every matching listener
    pub fn emit(&mut self, event: &EngineEvent) {
        let kind = event.kind();
        let mut fired_once = false;

        for registration in &mut self.registrations {
            if registration.kind.is_some_and(|k| k != kind) {
                continue;
            }
            (registration.listener)(event);
            fired_once |= registration.once;
        }

        if fired_once {
            self.registrations
                .retain(|r| !(r.once && r.kind == Some(kind)));
        }
    }

    fn register(&mut self, kind: Option<EventKind>, once: bool, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.registrations.push(Registration {
            id,
            kind,
            once,
            listener,
        });
        id
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.registrations.len())
            .finish()
    }
}
