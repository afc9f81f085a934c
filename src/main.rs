use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};

use brushworks::command::CommandRegistry;
use brushworks::level::{load_level, save_level};
use brushworks::{logging, Engine, EngineConfig, EntityTag, Scene};

/// Load, check and run brushworks maps
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Engine configuration file
    #[arg(long, default_value = "engine.ron")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Run a map in the fixed-rate loop
    Run {
        map: String,
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Load a map and report what it contains
    Check { map: String },
    /// Load a map and write it back out with ids filled in
    Resave {
        map: String,
        /// Write here instead of over the input
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Read console commands from stdin
    Console { map: Option<String> },
}

fn main() -> ExitCode {
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = EngineConfig::load(&args.config)?;
    info!("brushworks v{}", brushworks::VERSION);

    match args.command {
        Mode::Run { map, ticks } => {
            let mut engine = Engine::new(config);
            engine.load_map(&map).with_context(|| format!("loading {}", map))?;
            engine.run(ticks);
        }
        Mode::Check { map } => check(&config, &map)?,
        Mode::Resave { map, out } => {
            let path = config.map_path(&map);
            let mut level = load_level(&path).with_context(|| format!("loading {}", path.display()))?;
            let out = out.unwrap_or(path);
            save_level(&mut level, &out, config.compress_saves)?;
        }
        Mode::Console { map } => console(config, map.as_deref())?,
    }
    Ok(())
}

fn check(config: &EngineConfig, map: &str) -> Result<()> {
    let path = config.map_path(map);
    let level = load_level(&path).with_context(|| format!("loading {}", path.display()))?;

    for tag in EntityTag::ALL {
        let count = level.entities.iter().filter(|e| e.tag() == tag).count();
        if count > 0 {
            info!("{:>6} {}", count, tag);
        }
    }
    info!("{:>6} brushes", level.brushes.len());

    // Instantiating reports duplicate ids
    let scene = Scene::from_level(&level);
    if scene.len() != level.entities.len() {
        anyhow::bail!(
            "{} of {} entities could not be instantiated",
            level.entities.len() - scene.len(),
            level.entities.len()
        );
    }
    if scene.player().is_none() {
        info!("map has no player");
    }
    Ok(())
}

fn console(config: EngineConfig, map: Option<&str>) -> Result<()> {
    let mut engine = Engine::new(config);
    if let Some(map) = map {
        engine.load_map(map).with_context(|| format!("loading {}", map))?;
    }
    let registry = CommandRegistry::with_builtins();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    engine.start();
    while engine.is_running() {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if let Err(e) = registry.execute(&mut engine, &line) {
            error!("{}", e);
        }
    }
    Ok(())
}
