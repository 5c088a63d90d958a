mod report;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ratp_core::FilterSelection;
use ratp_dashboard::GroupOrder;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ratp-cli")]
#[command(about = "RATP approved local shops, from the open data API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print shop counts by type and by commune
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
        /// Group order: count, label or first
        #[arg(long, default_value = "count")]
        order: GroupOrder,
        /// Number of communes to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Write the filtered shop table as CSV
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Fetch every page once and report what came back
    Fetch,
}

/// Repeatable shop type and commune filters. None given means everything.
#[derive(Debug, Clone, Default, Args)]
struct FilterArgs {
    #[arg(long = "type", value_name = "TYPE")]
    shop_types: Vec<String>,
    #[arg(long = "commune", value_name = "COMMUNE")]
    communes: Vec<String>,
}

impl FilterArgs {
    fn selection(&self) -> FilterSelection {
        FilterSelection::new(self.shop_types.iter().cloned(), self.communes.iter().cloned())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("ratp-cli: run `ratp-cli --help` for commands");
        return Ok(());
    };

    dotenvy::dotenv().ok();
    let config = ratp_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Summary {
            filters,
            order,
            top,
        } => report::run_summary(&config, &filters.selection(), order, top).await?,
        Commands::Export { filters, output } => {
            report::run_export(&config, &filters.selection(), &output).await?;
        }
        Commands::Fetch => report::run_fetch(&config).await?,
    }

    Ok(())
}
