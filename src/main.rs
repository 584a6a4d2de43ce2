//! Chainhost CLI - manage and run the plugin chain from the command line

use chainhost::audio::AudioEngine;
use chainhost::engine::ChainEngine;
use chainhost::plugin_host::{FormatInstantiator, PluginId, PluginRegistry};
use chainhost::settings::FileStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chainhost")]
#[command(about = "Ordered audio plugin chain host", long_about = None)]
struct Cli {
    /// Settings file (default: <config dir>/chainhost/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Plugin catalog file (default: <config dir>/chainhost/catalog.json)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the plugins known to the catalog
    Catalog {},

    /// Show the current chain in order
    Chain {},

    /// Add a catalog plugin to the end of the chain
    Add {
        /// Plugin name (as listed by `catalog`)
        name: String,
    },

    /// Remove a plugin from the chain, deleting its persisted state
    Remove {
        /// Plugin name
        name: String,
    },

    /// Move a plugin one position towards the input
    Up {
        /// Plugin name
        name: String,
    },

    /// Move a plugin one position towards the output
    Down {
        /// Plugin name
        name: String,
    },

    /// Toggle a plugin's bypass flag
    Bypass {
        /// Plugin name
        name: String,
    },

    /// Delete every active plugin's saved state
    PurgeStates {},

    /// Run audio through the chain
    Run {
        /// Stop after this many seconds (default: run until interrupted)
        #[arg(short, long)]
        duration: Option<f32>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chainhost");
    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(|| config_dir.join("settings.json"));
    let catalog_path = cli
        .catalog
        .clone()
        .unwrap_or_else(|| config_dir.join("catalog.json"));

    let store = FileStore::open(&settings_path)?;
    let mut registry = PluginRegistry::load(&catalog_path)?;
    // The chain is a single stereo path; mono-only plugins cannot sit on it
    registry.retain_stereo_capable();
    let mut engine = ChainEngine::new(
        Box::new(store),
        registry,
        Box::new(FormatInstantiator::new()),
    )?;

    match cli.command {
        Commands::Catalog {} => {
            if engine.registry().is_empty() {
                println!("Catalog is empty ({})", catalog_path.display());
            }
            for info in engine.registry().list() {
                println!(
                    "{:<30} {:<10} {:<6} {}",
                    info.id.name, info.id.version, info.id.format, info.vendor
                );
            }
        }
        Commands::Chain {} => {
            let chain = engine.current_chain();
            if chain.is_empty() {
                println!("Chain is empty");
            }
            for (pos, (id, bypassed)) in chain.iter().enumerate() {
                let marker = if *bypassed { " [bypassed]" } else { "" };
                println!("{:>3}. {}{}", pos + 1, id, marker);
            }
        }
        Commands::Add { name } => {
            let id = catalog_id(&engine, &name)?;
            engine.add_plugin(&id)?;
            println!("Added {}", id);
        }
        Commands::Remove { name } => {
            let id = chain_id(&engine, &name)?;
            engine.remove_plugin(&id)?;
            println!("Removed {}", id);
        }
        Commands::Up { name } => {
            let id = chain_id(&engine, &name)?;
            if engine.move_up(&id)? {
                println!("Moved {} up", id);
            } else {
                println!("{} is already first", id);
            }
        }
        Commands::Down { name } => {
            let id = chain_id(&engine, &name)?;
            if engine.move_down(&id)? {
                println!("Moved {} down", id);
            } else {
                println!("{} is already last", id);
            }
        }
        Commands::Bypass { name } => {
            let id = chain_id(&engine, &name)?;
            if engine.toggle_bypass(&id)? {
                println!("{} bypassed", id);
            } else {
                println!("{} active", id);
            }
        }
        Commands::PurgeStates {} => {
            engine.purge_states()?;
            println!("Deleted saved plugin states");
        }
        Commands::Run { duration } => {
            let _audio = AudioEngine::new(engine.graph_handle())?;
            println!("Running {} plugin(s); Ctrl+C to stop", engine.current_chain().len());
            match duration {
                Some(seconds) => {
                    std::thread::sleep(std::time::Duration::from_secs_f32(seconds));
                }
                None => loop {
                    std::thread::sleep(std::time::Duration::from_secs(1));
                },
            }
        }
    }

    Ok(())
}

/// Resolve a name against the catalog
fn catalog_id(engine: &ChainEngine, name: &str) -> Result<PluginId, String> {
    engine
        .registry()
        .find(name)
        .map(|info| info.id.clone())
        .ok_or_else(|| format!("No plugin named {:?} in the catalog", name))
}

/// Resolve a name against the active chain (case-insensitive)
fn chain_id(engine: &ChainEngine, name: &str) -> Result<PluginId, String> {
    let name_lower = name.to_lowercase();
    engine
        .current_chain()
        .into_iter()
        .map(|(id, _)| id)
        .find(|id| id.name.to_lowercase() == name_lower)
        .ok_or_else(|| format!("No plugin named {:?} in the chain", name))
}
