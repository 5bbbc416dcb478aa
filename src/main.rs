mod config;
mod error;
mod executor;
mod model;
mod precheck;
mod prompt;
mod script;
mod sequencer;
mod steps;
mod template;
mod templates;

use anyhow::Result;
use clap::Parser;
use config::Config;
use model::{SystemPath, ToolRegistry};
use prompt::{ConsoleOperator, Operator, TerminalOperator};
use sequencer::{Presets, Sequencer};
use std::io::{self, IsTerminal};
use std::path::PathBuf;

/// Walks an operator through PSF photometry and aperture correction, writing
/// the command scripts for the external photometry tools and running them.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration (defaults to ./photo-reducer.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Top-level data set directory, e.g. /data/n2158_phot/n2158/
    #[arg(short, long)]
    workdir: Option<PathBuf>,

    /// Frame subdirectory to reduce, e.g. n21158
    #[arg(short, long)]
    frame: Option<String>,

    /// Known FWHM of the frame; skips the FWHM question
    #[arg(long)]
    fwhm: Option<f64>,

    /// Write scripts but do not run any external tool
    #[arg(long)]
    dry_run: bool,

    /// Seconds before a non-interactive tool is killed (0 disables)
    #[arg(long)]
    timeout: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.dry_run = true;
    }
    if let Some(secs) = cli.timeout {
        config.tool_timeout_secs = secs;
    }
    log::debug!("configuration: {:?}", config);

    let mut tools = ToolRegistry::new(&config.tools);
    tools.probe(&SystemPath);

    let presets = Presets {
        work_dir: cli.workdir,
        frame: cli.frame,
        fwhm: cli.fwhm,
    };

    let mut operator: Box<dyn Operator> = if io::stdin().is_terminal() && io::stdout().is_terminal() {
        Box::new(TerminalOperator::new())
    } else {
        Box::new(ConsoleOperator::stdio())
    };
    let mut sequencer = Sequencer::new(&tools, &config, operator.as_mut(), presets);
    sequencer.run();

    if let Some(session) = sequencer.session() {
        log::info!("left frame {} ({:?})", session.frame, sequencer.phase());
    }
    Ok(())
}
