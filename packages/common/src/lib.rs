//! Shared document model for pagecraft.
//!
//! A [`Page`] is an arena of [`Block`]s keyed by id plus an ordered list of
//! [`Region`]s holding root block ids. Every relationship (parent/children,
//! region membership) is an id lookup into that one owned map.

pub mod id_generator;
pub mod integrity;
pub mod page;
pub mod schema;
pub mod visitor;

pub use id_generator::*;
pub use integrity::*;
pub use page::*;
pub use schema::*;
pub use visitor::*;
