use crate::config::load_config;
use crate::script::{parse_script, ScriptRunner};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use pagecraft_editor::{Engine, EngineEvent};
use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::info;

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Operation script (JSON array)
    pub script: PathBuf,

    /// Engine config file (defaults to ./pagecraft.config.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the resulting page here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn apply(args: ApplyArgs, cwd: &str) -> Result<()> {
    let content = fs::read_to_string(&args.script)
        .with_context(|| format!("Cannot read script {}", args.script.display()))?;
    let operations = parse_script(&content)
        .with_context(|| format!("Invalid script {}", args.script.display()))?;

    let mut engine = Engine::new(load_config(cwd, args.config.as_deref())?)?;

    let emitted = Rc::new(Cell::new(0usize));
    let counter = emitted.clone();
    engine.subscribe(move |event: &EngineEvent| {
        counter.set(counter.get() + 1);
        info!(event = %event.kind(), block_id = event.block_id().unwrap_or("-"), "event");
    });

    ScriptRunner::new(&mut engine).run_all(&operations)?;

    let page = serde_json::to_string_pretty(&engine.get_page())?;
    match &args.output {
        Some(path) => {
            fs::write(path, page).with_context(|| format!("Cannot write {}", path.display()))?;
            eprintln!("✨ {} {}", "Wrote".green().bold(), path.display());
        }
        None => println!("{}", page),
    }

    eprintln!("   Operations: {}", operations.len());
    eprintln!("   Events:     {}", emitted.get());
    eprintln!("   History:    {}", engine.history().len());
    Ok(())
}
