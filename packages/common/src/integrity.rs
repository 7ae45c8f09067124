//! # Page Integrity
//!
//! Checks the tree invariants documented on [`Page`](crate::Page) and reports
//! every violation found instead of stopping at the first.

use crate::page::{Block, Container, Page};
use crate::visitor::{walk_block, Visitor};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// A single invariant violation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    #[error("page has no regions")]
    NoRegions,

    #[error("region name '{0}' is used more than once")]
    DuplicateRegion(String),

    #[error("{container:?} lists unknown block '{id}'")]
    DanglingReference { id: String, container: Container },

    #[error("block '{id}' is listed {count} times")]
    MultipleReferences { id: String, count: usize },

    #[error("block '{id}' is listed in {container:?} but its parent is {parent_id:?}")]
    ParentMismatch {
        id: String,
        parent_id: Option<String>,
        container: Container,
    },

    #[error("block '{id}' has parent '{parent_id}' which does not list it")]
    MissingBackReference { id: String, parent_id: String },

    /// Left behind when the parent block was removed; undo relinks it
    #[error("block '{id}' belongs to removed parent '{parent_id}'")]
    OrphanedChild { id: String, parent_id: String },

    #[error("block '{id}' is its own ancestor")]
    Cycle { id: String },

    #[error("block '{id}' is not reachable from any region")]
    Unreachable { id: String },
}

impl IntegrityIssue {
    /// Removes leave the subtree addressable for undo: its blocks become
    /// unreachable and its top children orphaned. Neither is structural.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            IntegrityIssue::Unreachable { .. } | IntegrityIssue::OrphanedChild { .. }
        )
    }
}

#[derive(Default)]
struct Reachability {
    visited: HashSet<String>,
}

impl Visitor for Reachability {
    fn visit_block(&mut self, page: &Page, block: &Block, depth: usize) {
        if self.visited.insert(block.id.clone()) {
            walk_block(self, page, block, depth);
        }
    }
}

impl Page {
    /// Report every invariant violation in this page
    pub fn check_integrity(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        if self.regions.is_empty() {
            issues.push(IntegrityIssue::NoRegions);
        }

        let mut region_names = HashSet::new();
        for region in &self.regions {
            if !region_names.insert(region.name.as_str()) {
                issues.push(IntegrityIssue::DuplicateRegion(region.name.clone()));
            }
        }

        // Every container reference, in a stable order
        let mut references: Vec<(&str, Container)> = Vec::new();
        for region in &self.regions {
            for id in &region.blocks {
                references.push((id.as_str(), Container::Region(region.name.clone())));
            }
        }
        let mut parents: Vec<&Block> = self.blocks.values().collect();
        parents.sort_by(|a, b| a.id.cmp(&b.id));
        for parent in &parents {
            for id in &parent.children {
                references.push((id.as_str(), Container::Parent(parent.id.clone())));
            }
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for (id, container) in &references {
            let Some(block) = self.blocks.get(*id) else {
                issues.push(IntegrityIssue::DanglingReference {
                    id: id.to_string(),
                    container: container.clone(),
                });
                continue;
            };

            *counts.entry(*id).or_default() += 1;

            if block.parent_id.as_deref() != container.parent_id() {
                issues.push(IntegrityIssue::ParentMismatch {
                    id: id.to_string(),
                    parent_id: block.parent_id.clone(),
                    container: container.clone(),
                });
            }
        }

        let mut multiple: Vec<(&str, usize)> =
            counts.into_iter().filter(|(_, count)| *count > 1).collect();
        multiple.sort();
        for (id, count) in multiple {
            issues.push(IntegrityIssue::MultipleReferences {
                id: id.to_string(),
                count,
            });
        }

        for block in &parents {
            if let Some(parent_id) = &block.parent_id {
                match self.blocks.get(parent_id) {
                    None => issues.push(IntegrityIssue::OrphanedChild {
                        id: block.id.clone(),
                        parent_id: parent_id.clone(),
                    }),
                    Some(parent) if !parent.children.iter().any(|c| c == &block.id) => {
                        issues.push(IntegrityIssue::MissingBackReference {
                            id: block.id.clone(),
                            parent_id: parent_id.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }

            if self.has_parent_cycle(&block.id) {
                issues.push(IntegrityIssue::Cycle {
                    id: block.id.clone(),
                });
            }
        }

        let mut reachability = Reachability::default();
        reachability.visit_page(self);
        for block in &parents {
            if !reachability.visited.contains(&block.id) {
                issues.push(IntegrityIssue::Unreachable {
                    id: block.id.clone(),
                });
            }
        }

        issues
    }

    /// Structural issues only (see [`IntegrityIssue::is_structural`])
    pub fn structural_issues(&self) -> Vec<IntegrityIssue> {
        self.check_integrity()
            .into_iter()
            .filter(IntegrityIssue::is_structural)
            .collect()
    }

    fn has_parent_cycle(&self, block_id: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = self.blocks.get(block_id).and_then(|b| b.parent_id.as_deref());

        while let Some(id) = current {
            if id == block_id || !seen.insert(id) {
                return id == block_id;
            }
            current = self.blocks.get(id).and_then(|b| b.parent_id.as_deref());
        }

        false
    }
}
