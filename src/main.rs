use clap::{Parser, Subcommand};
use podium::{Settings, client, logging, server};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "podium")]
#[command(about = "Hot-reload coordination for JSON-driven UI manifests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    Config,

    /// Run the dev reload server
    Serve {
        /// Bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Workspace root (overrides config)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Connect to a dev server and run the reload session
    Client {
        /// Server base URL
        #[arg(short, long, default_value = "http://127.0.0.1:5179")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            Settings::init_config_file(force)?;
        }

        Commands::Config => {
            let settings = Settings::load_or_default();
            print!("{}", toml::to_string_pretty(&settings)?);
        }

        Commands::Serve { bind, root } => {
            let mut settings = Settings::load_or_default();
            if let Some(root) = root {
                settings.workspace_root = Some(root);
            }
            server::serve(settings, bind).await?;
        }

        Commands::Client { server } => {
            let settings = Settings::load_or_default();
            logging::init_with_config(&settings.logging);
            client::run(&server, &settings).await?;
        }
    }

    Ok(())
}
