use crate::config::{load_config, load_page};
use anyhow::Result;
use clap::Args;
use pagecraft_editor::Engine;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Page JSON file
    pub page: PathBuf,

    /// Block to export, with its descendants
    pub block_id: String,

    /// Engine config file (defaults to ./pagecraft.config.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn export(args: ExportArgs, cwd: &str) -> Result<()> {
    let mut engine = Engine::new(load_config(cwd, args.config.as_deref())?)?;
    engine.set_page(load_page(&args.page)?);

    let structure = engine.export_block_as_nested_structure(&args.block_id)?;
    println!("{}", serde_json::to_string_pretty(&structure)?);
    Ok(())
}
