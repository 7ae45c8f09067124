use crate::page::{Block, Container, Page, Region};

/// Visitor pattern for traversing a page tree immutably
///
/// Default implementations walk regions in order, then each block's
/// children depth-first. Override specific visit_* methods to act on nodes.
///
/// The default walk does not guard against cyclic parent/child data;
/// visitors that may see malformed pages should track visited ids and skip
/// calling [`walk_block`] for repeats.
pub trait Visitor: Sized {
    fn visit_page(&mut self, page: &Page) {
        walk_page(self, page);
    }

    fn visit_region(&mut self, page: &Page, region: &Region) {
        walk_region(self, page, region);
    }

    fn visit_block(&mut self, page: &Page, block: &Block, depth: usize) {
        walk_block(self, page, block, depth);
    }

    /// Called for ids listed in a container but absent from `blocks`
    fn visit_missing(&mut self, _id: &str, _container: &Container) {
        // Leaf, nothing to walk
    }
}

pub fn walk_page<V: Visitor>(visitor: &mut V, page: &Page) {
    for region in &page.regions {
        visitor.visit_region(page, region);
    }
}

pub fn walk_region<V: Visitor>(visitor: &mut V, page: &Page, region: &Region) {
    for id in &region.blocks {
        match page.block(id) {
            Some(block) => visitor.visit_block(page, block, 0),
            None => visitor.visit_missing(id, &Container::Region(region.name.clone())),
        }
    }
}

pub fn walk_block<V: Visitor>(visitor: &mut V, page: &Page, block: &Block, depth: usize) {
    for id in &block.children {
        match page.block(id) {
            Some(child) => visitor.visit_block(page, child, depth + 1),
            None => visitor.visit_missing(id, &Container::Parent(block.id.clone())),
        }
    }
}
