//! # Page Model
//!
//! Blocks, regions and the page that owns them.
//!
//! ## Invariants
//!
//! - A block id is unique within a page
//! - `children` only lists ids present in `blocks`
//! - A block with `parent_id` appears exactly once in its parent's `children`
//! - A block without `parent_id` appears exactly once in exactly one region
//! - No block is its own transitive ancestor

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Default region name used when a page has none
pub const DEFAULT_REGION_NAME: &str = "main";

/// Free-form block property values
pub type BlockProperties = Map<String, Value>;

fn is_false(value: &bool) -> bool {
    !*value
}

/// A node in the page tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,

    #[serde(rename = "type")]
    pub block_type: String,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Stable id carried over from the preset or structure this block came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<String>,

    #[serde(default)]
    pub properties: BlockProperties,

    /// Ordered child block ids
    #[serde(default)]
    pub children: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,

    /// Cannot be moved or removed
    #[serde(default, rename = "static", skip_serializing_if = "is_false")]
    pub is_static: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub repeated: bool,

    /// Data-only, not rendered
    #[serde(default, skip_serializing_if = "is_false")]
    pub ghost: bool,
}

impl Block {
    pub fn new(id: impl Into<String>, block_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            name: None,
            semantic_id: None,
            properties: BlockProperties::new(),
            children: Vec::new(),
            parent_id: None,
            disabled: false,
            is_static: false,
            repeated: false,
            ghost: false,
        }
    }

    pub fn with_properties(mut self, properties: BlockProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_children(mut self, children: Vec<String>) -> Self {
        self.children = children;
        self
    }
}

/// A named top-level slot holding root block ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,

    #[serde(default)]
    pub blocks: Vec<String>,
}

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<String>) -> Self {
        self.blocks = blocks;
        self
    }
}

/// Identity of an ordered list of block ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Container {
    /// A block's `children`
    Parent(String),
    /// A region's `blocks`
    Region(String),
}

impl Container {
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Container::Parent(id) => Some(id),
            Container::Region(_) => None,
        }
    }

    pub fn region_name(&self) -> Option<&str> {
        match self {
            Container::Parent(_) => None,
            Container::Region(name) => Some(name),
        }
    }
}

/// Where a block sits: a container and a position inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPosition {
    pub container: Container,
    pub index: usize,
}

/// The whole document being edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// All blocks, flattened by id
    #[serde(default)]
    pub blocks: HashMap<String, Block>,

    #[serde(default)]
    pub regions: Vec<Region>,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            blocks: HashMap::new(),
            regions: vec![Region::new(DEFAULT_REGION_NAME)],
        }
    }
}

impl Page {
    /// Page with no blocks and no regions
    pub fn empty() -> Self {
        Self {
            blocks: HashMap::new(),
            regions: Vec::new(),
        }
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn block_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn region_mut(&mut self, name: &str) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.name == name)
    }

    /// Name of the first region, if any
    pub fn first_region_name(&self) -> Option<&str> {
        self.regions.first().map(|r| r.name.as_str())
    }

    /// Region listing `block_id` at the top level
    pub fn region_containing(&self, block_id: &str) -> Option<&Region> {
        self.regions
            .iter()
            .find(|r| r.blocks.iter().any(|id| id == block_id))
    }

    /// Ordered ids held by a container
    pub fn container(&self, container: &Container) -> Option<&Vec<String>> {
        match container {
            Container::Parent(id) => self.blocks.get(id).map(|b| &b.children),
            Container::Region(name) => self.region(name).map(|r| &r.blocks),
        }
    }

    pub fn container_mut(&mut self, container: &Container) -> Option<&mut Vec<String>> {
        match container {
            Container::Parent(id) => self.blocks.get_mut(id).map(|b| &mut b.children),
            Container::Region(name) => self.region_mut(name).map(|r| &mut r.blocks),
        }
    }

    /// Find the container and index currently holding a block.
    ///
    /// Blocks with a `parent_id` are looked up in the parent's children,
    /// everything else in the regions.
    pub fn locate(&self, block_id: &str) -> Option<BlockPosition> {
        let block = self.blocks.get(block_id)?;

        match &block.parent_id {
            Some(parent_id) => {
                let parent = self.blocks.get(parent_id)?;
                let index = parent.children.iter().position(|id| id == block_id)?;
                Some(BlockPosition {
                    container: Container::Parent(parent_id.clone()),
                    index,
                })
            }
            None => self.regions.iter().find_map(|region| {
                region
                    .blocks
                    .iter()
                    .position(|id| id == block_id)
                    .map(|index| BlockPosition {
                        container: Container::Region(region.name.clone()),
                        index,
                    })
            }),
        }
    }

    /// True if `ancestor_id` is `block_id` itself or one of its ancestors
    pub fn is_self_or_ancestor(&self, ancestor_id: &str, block_id: &str) -> bool {
        let mut current = Some(block_id);
        let mut steps = 0;

        while let Some(id) = current {
            if id == ancestor_id {
                return true;
            }
            // Bail out on malformed (cyclic) parent chains
            steps += 1;
            if steps > self.blocks.len() {
                return false;
            }
            current = self.blocks.get(id).and_then(|b| b.parent_id.as_deref());
        }

        false
    }

    /// Ids of every descendant of `block_id` in depth-first pre-order
    pub fn descendants(&self, block_id: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut stack: Vec<&str> = match self.blocks.get(block_id) {
            Some(block) => block.children.iter().rev().map(String::as_str).collect(),
            None => return result,
        };

        let mut seen: HashSet<&str> = HashSet::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            result.push(id.to_string());
            if let Some(block) = self.blocks.get(id) {
                stack.extend(block.children.iter().rev().map(String::as_str));
            }
        }

        result
    }

    /// Fill in missing `parent_id` back-links from existing `children` lists.
    ///
    /// Existing back-links are left untouched. When several parents list the
    /// same child, the parent with the smallest id wins.
    pub fn repair_parent_links(&mut self) -> usize {
        let mut parents: Vec<&Block> = self.blocks.values().collect();
        parents.sort_by(|a, b| a.id.cmp(&b.id));

        let links: Vec<(String, String)> = parents
            .into_iter()
            .flat_map(|parent| {
                parent
                    .children
                    .iter()
                    .map(move |child| (child.clone(), parent.id.clone()))
            })
            .collect();

        let mut repaired = 0;
        for (child_id, parent_id) in links {
            if let Some(child) = self.blocks.get_mut(&child_id) {
                if child.parent_id.is_none() {
                    child.parent_id = Some(parent_id);
                    repaired += 1;
                }
            }
        }

        repaired
    }

    /// Guarantee at least one region exists.
    ///
    /// When none are present a `main` region is synthesized holding every
    /// parentless block (sorted by id). Returns true if a region was added.
    pub fn ensure_region(&mut self) -> bool {
        if !self.regions.is_empty() {
            return false;
        }

        let mut roots: Vec<String> = self
            .blocks
            .values()
            .filter(|b| b.parent_id.is_none())
            .map(|b| b.id.clone())
            .collect();
        roots.sort();

        self.regions
            .push(Region::new(DEFAULT_REGION_NAME).with_blocks(roots));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> Page {
        let mut page = Page::default();
        let root = Block::new("root", "box").with_children(vec!["a".into(), "b".into()]);
        let a = Block::new("a", "text").with_parent("root");
        let b = Block::new("b", "box")
            .with_parent("root")
            .with_children(vec!["c".into()]);
        let c = Block::new("c", "text").with_parent("b");
        for block in [root, a, b, c] {
            page.blocks.insert(block.id.clone(), block);
        }
        page.regions[0].blocks.push("root".into());
        page
    }

    #[test]
    fn test_locate_child_and_root() {
        let page = sample_page();

        let pos = page.locate("b").unwrap();
        assert_eq!(pos.container, Container::Parent("root".into()));
        assert_eq!(pos.index, 1);

        let pos = page.locate("root").unwrap();
        assert_eq!(pos.container, Container::Region("main".into()));
        assert_eq!(pos.index, 0);

        assert!(page.locate("missing").is_none());
    }

    #[test]
    fn test_descendants_preorder() {
        let page = sample_page();
        assert_eq!(page.descendants("root"), vec!["a", "b", "c"]);
        assert!(page.descendants("c").is_empty());
    }

    #[test]
    fn test_ancestor_check() {
        let page = sample_page();
        assert!(page.is_self_or_ancestor("root", "c"));
        assert!(page.is_self_or_ancestor("c", "c"));
        assert!(!page.is_self_or_ancestor("a", "c"));
    }

    #[test]
    fn test_repair_parent_links() {
        let mut page = sample_page();
        page.blocks.get_mut("c").unwrap().parent_id = None;
        page.blocks.get_mut("a").unwrap().parent_id = None;

        assert_eq!(page.repair_parent_links(), 2);
        assert_eq!(page.blocks["c"].parent_id.as_deref(), Some("b"));
        assert_eq!(page.blocks["a"].parent_id.as_deref(), Some("root"));
    }

    #[test]
    fn test_repair_prefers_smallest_parent_id() {
        for _ in 0..8 {
            let mut page = Page::default();
            for parent in ["p3", "p1", "p2"] {
                page.blocks.insert(
                    parent.into(),
                    Block::new(parent, "box").with_children(vec!["shared".into()]),
                );
            }
            page.blocks.insert("shared".into(), Block::new("shared", "text"));

            assert_eq!(page.repair_parent_links(), 1);
            assert_eq!(page.blocks["shared"].parent_id.as_deref(), Some("p1"));
        }
    }

    #[test]
    fn test_descendants_skip_repeated_ids() {
        let mut page = sample_page();
        page.blocks
            .get_mut("b")
            .unwrap()
            .children
            .push("a".into());

        assert_eq!(page.descendants("root"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ensure_region_collects_roots() {
        let mut page = sample_page();
        page.regions.clear();

        assert!(page.ensure_region());
        assert_eq!(page.regions.len(), 1);
        assert_eq!(page.regions[0].name, DEFAULT_REGION_NAME);
        assert_eq!(page.regions[0].blocks, vec!["root"]);

        assert!(!page.ensure_region());
    }

    #[test]
    fn test_block_serializes_with_camel_case_keys() {
        let mut block = Block::new("x", "text").with_parent("p");
        block.is_static = true;

        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["parentId"], "p");
        assert_eq!(json["static"], true);
        assert!(json.get("disabled").is_none());
    }
}
