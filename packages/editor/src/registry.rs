//! # Schema Registry
//!
//! Stores [`BlockSchema`]s by type and answers whether one block type may be
//! nested inside another.
//!
//! ## Acceptance rules
//!
//! - A parent without an `accepts` list accepts nothing
//! - A `private` child is accepted only when the parent lists its exact type
//! - Otherwise any `accepts` entry may match, where `*` is a multi-character
//!   wildcard (`"*"`, `"@theme/*"`, `"*-button"`, `"*type*"`)
//!
//! Unregistered child types are treated as non-private.

use pagecraft_common::BlockSchema;
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Block type '{0}' is already registered")]
    DuplicateType(String),
}

/// Registry of block schemas keyed by type
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, BlockSchema>,

    /// Compiled `accepts` patterns, one per distinct pattern string
    pattern_cache: RefCell<HashMap<String, Option<Regex>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under `block_type`
    pub fn register(&mut self, block_type: impl Into<String>, schema: BlockSchema) -> Result<(), SchemaError> {
        let block_type = block_type.into();
        if self.schemas.contains_key(&block_type) {
            return Err(SchemaError::DuplicateType(block_type));
        }

        self.schemas.insert(block_type, schema);
        Ok(())
    }

    /// Register several schemas keyed by their own `block_type`.
    ///
    /// Stops at the first duplicate; schemas before it stay registered.
    pub fn register_many(&mut self, schemas: impl IntoIterator<Item = BlockSchema>) -> Result<(), SchemaError> {
        for schema in schemas {
            let block_type = schema.block_type.clone();
            self.register(block_type, schema)?;
        }
        Ok(())
    }

    /// Remove a schema, returning whether it was registered
    pub fn unregister(&mut self, block_type: &str) -> bool {
        self.schemas.remove(block_type).is_some()
    }

    pub fn get(&self, block_type: &str) -> Option<&BlockSchema> {
        self.schemas.get(block_type)
    }

    pub fn has(&self, block_type: &str) -> bool {
        self.schemas.contains_key(block_type)
    }

    pub fn get_all(&self) -> &HashMap<String, BlockSchema> {
        &self.schemas
    }

    /// Registered types, sorted
    pub fn get_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Types whose schema matches `predicate`, sorted
    pub fn find<F>(&self, mut predicate: F) -> Vec<&str>
    where
        F: FnMut(&str, &BlockSchema) -> bool,
    {
        let mut types: Vec<&str> = self
            .schemas
            .iter()
            .filter(|(block_type, schema)| predicate(block_type, schema))
            .map(|(block_type, _)| block_type.as_str())
            .collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Whether `child_type` may be nested directly under `parent_type`
    pub fn can_be_child(&self, child_type: &str, parent_type: &str) -> bool {
        let Some(accepts) = self.get(parent_type).and_then(|s| s.accepts.as_ref()) else {
            return false;
        };

        let is_private = self.get(child_type).is_some_and(|s| s.private);
        if is_private {
            return accepts.iter().any(|pattern| pattern == child_type);
        }

        accepts
            .iter()
            .any(|pattern| self.matches_pattern(child_type, pattern))
    }

    fn matches_pattern(&self, child_type: &str, pattern: &str) -> bool {
        if pattern == "*" {
            return true;
        }
        if !pattern.contains('*') {
            return pattern == child_type;
        }

        let mut cache = self.pattern_cache.borrow_mut();
        cache
            .entry(pattern.to_string())
            .or_insert_with(|| compile_pattern(pattern))
            .as_ref()
            .is_some_and(|regex| regex.is_match(child_type))
    }
}

/// Translate a glob pattern to an anchored regex: escape everything, then
/// expand each `*` to `.*`
fn compile_pattern(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    match Regex::new(&format!("^{}$", body)) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "Invalid accepts pattern");
            None
        }
    }
}
