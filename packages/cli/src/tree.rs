use colored::Colorize;
use pagecraft_editor::model::{walk_block, walk_region, Block, Container, Page, Region, Visitor};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders a page as an indented outline, one line per region and block
#[derive(Default)]
pub struct TreePrinter {
    output: String,
    /// Depth each printed block was first seen at
    depths: HashMap<String, usize>,
}

impl TreePrinter {
    pub fn print(page: &Page) -> String {
        let mut printer = Self::default();
        printer.visit_page(page);
        printer.output
    }

    fn line(&mut self, depth: usize, text: &str) {
        let _ = writeln!(self.output, "{}{}", "  ".repeat(depth), text);
    }
}

impl Visitor for TreePrinter {
    fn visit_region(&mut self, page: &Page, region: &Region) {
        let label = format!("[{}]", region.name).bold().to_string();
        self.line(0, &label);
        walk_region(self, page, region);
    }

    fn visit_block(&mut self, page: &Page, block: &Block, depth: usize) {
        let mut label = format!("{} {}", block.block_type.cyan(), block.id.dimmed());
        if let Some(name) = &block.name {
            label.push_str(&format!(" \"{}\"", name));
        }
        for (flag, set) in [
            ("disabled", block.disabled),
            ("static", block.is_static),
            ("repeated", block.repeated),
            ("ghost", block.ghost),
        ] {
            if set {
                label.push_str(&format!(" {}", flag.yellow()));
            }
        }

        if self.depths.contains_key(&block.id) {
            label.push_str(&format!(" {}", "(already listed)".red()));
            self.line(depth + 1, &label);
            return;
        }

        self.depths.insert(block.id.clone(), depth);
        self.line(depth + 1, &label);
        walk_block(self, page, block, depth);
    }

    fn visit_missing(&mut self, id: &str, container: &Container) {
        let depth = match container {
            Container::Region(_) => 1,
            Container::Parent(parent_id) => self.depths.get(parent_id).map_or(1, |depth| depth + 2),
        };
        let label = format!("{} {}", "missing".red(), id);
        self.line(depth, &label);
    }
}
