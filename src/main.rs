pub mod types;
pub mod config;
pub mod data;
pub mod projection;
pub mod transform;
pub mod map;
pub mod render;
pub mod colormap;
pub mod scoring;
pub mod heatmap;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the adjusted US basemap with territory labels
    Basemap {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Render one confusion-matrix panel per configured data set
    Score {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Render the smoothed density heatmap with the default-loan overlay
    Heatmap {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Basemap { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let basemap = map::assemble(&app_config)?;
            render::render_basemap(&app_config.map, &basemap)?;
        }
        Commands::Score { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            scoring::run_scoring(&app_config.scoring)?;
        }
        Commands::Heatmap { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let table = data::load_table(&app_config.heatmap.data_csv)?;
            heatmap::render_heatmap(&app_config.heatmap, &table)?;
        }
    }

    Ok(())
}
