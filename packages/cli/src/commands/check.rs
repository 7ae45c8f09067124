use crate::config::{load_config, load_page};
use crate::tree::TreePrinter;
use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use pagecraft_editor::model::IntegrityIssue;
use pagecraft_editor::{Engine, Page};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Page JSON file to check
    pub page: PathBuf,

    /// Engine config file (defaults to ./pagecraft.config.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the page outline
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    println!("🔍 {} {}", "Checking".green().bold(), args.page.display());

    let mut engine = Engine::new(load_config(cwd, args.config.as_deref())?)?;
    engine.set_page(load_page(&args.page)?);
    let page = engine.get_page();

    if args.verbose {
        println!();
        print!("{}", TreePrinter::print(&page));
    }

    let (issues, notes) = partition_issues(&page);
    println!();
    println!("   Blocks:  {}", page.blocks.len());
    println!("   Regions: {}", page.regions.len());

    for note in &notes {
        println!("   {} {}", "note:".yellow(), note);
    }

    if issues.is_empty() {
        println!("   {} No issues found!", "✓".green());
        return Ok(());
    }

    for issue in &issues {
        println!("   {} {}", "✗".red(), issue);
    }
    bail!("{} integrity issue(s) found", issues.len())
}

/// Split integrity findings into structural issues and notes (blocks kept
/// around by a remove so it can be undone)
fn partition_issues(page: &Page) -> (Vec<IntegrityIssue>, Vec<IntegrityIssue>) {
    page.check_integrity()
        .into_iter()
        .partition(IntegrityIssue::is_structural)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_editor::{BlockSchema, EngineConfig, InsertOptions};

    #[test]
    fn test_removed_subtree_is_only_noted() {
        let config = EngineConfig::default()
            .with_schema(BlockSchema::new("box").accepting(["*"]))
            .with_schema(BlockSchema::new("text"));
        let mut engine = Engine::new(config).unwrap();
        let parent = engine.insert_block("box", InsertOptions::default()).unwrap();
        engine
            .insert_block("text", InsertOptions::in_parent(parent.clone()))
            .unwrap();
        engine.remove_block(&parent).unwrap();

        let (issues, notes) = partition_issues(&engine.get_page());
        assert!(issues.is_empty());
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn test_dangling_reference_fails() {
        let mut page = Page::default();
        page.regions[0].blocks.push("ghost".into());

        let (issues, notes) = partition_issues(&page);
        assert_eq!(issues.len(), 1);
        assert!(notes.is_empty());
    }
}
