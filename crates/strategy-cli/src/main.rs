mod cmd;
mod context;
mod output;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, doc::DocSubcommand, idea::IdeaSubcommand,
    project::ProjectSubcommand,
};
use context::{Context, Overrides};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "strategy",
    about = "StrategySuite: build business strategies with PESTLE, Porter's Five Forces, the Marketing Mix and SWOT",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ~/.strategy-suite/config.yaml)
    #[arg(long, global = true, env = "STRATEGY_CONFIG")]
    config: Option<PathBuf>,

    /// Proxy server URL; without one, projects are kept in the local cache
    #[arg(long, global = true, env = "STRATEGY_SERVER")]
    server: Option<String>,

    /// User id that owns the projects
    #[arg(long, global = true, env = "STRATEGY_USER")]
    user: Option<String>,

    /// Directory for the local project cache
    #[arg(long, global = true, env = "STRATEGY_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, list, show and delete projects
    Project {
        #[command(subcommand)]
        subcommand: ProjectSubcommand,
    },

    /// Add, edit, select and reorder ideas within a category
    Idea {
        #[command(subcommand)]
        subcommand: IdeaSubcommand,
    },

    /// Set the justification text for a category
    Justify {
        project: String,
        category: String,
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Manage the business context documents of a project
    Doc {
        #[command(subcommand)]
        subcommand: DocSubcommand,
    },

    /// List frameworks and their categories
    Categories,

    /// Ask the server for AI ideas for one category
    Suggest {
        project: String,
        category: String,
        /// Narrow the suggestions to a theme
        #[arg(long)]
        focus: Option<String>,
    },

    /// Write a project's selected ideas as a standalone HTML report
    Export {
        project: String,
        /// Output file (default: <project>-strategy-<date>.html)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Run the proxy server
    Serve {
        /// Port to listen on (default: PORT or 3001)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show or change client settings
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli);

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let json = cli.json;
    // Serving and listing the catalog need no client settings.
    match cli.command {
        Commands::Serve { port } => return cmd::serve::run(port),
        Commands::Categories => return cmd::categories::run(json),
        _ => {}
    }

    let ctx = Context::resolve(Overrides {
        config: cli.config,
        server: cli.server,
        user: cli.user,
        cache_dir: cli.cache_dir,
    })?;

    match cli.command {
        Commands::Project { subcommand } => cmd::project::run(&ctx, subcommand, json),
        Commands::Idea { subcommand } => cmd::idea::run(&ctx, subcommand, json),
        Commands::Justify {
            project,
            category,
            text,
        } => cmd::idea::justify(&ctx, &project, &category, &text.join(" "), json),
        Commands::Doc { subcommand } => cmd::doc::run(&ctx, subcommand, json),
        Commands::Suggest {
            project,
            category,
            focus,
        } => cmd::suggest::run(&ctx, &project, &category, focus, json),
        Commands::Export { project, output } => cmd::export::run(&ctx, &project, output, json),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand, json),
        Commands::Serve { .. } | Commands::Categories => Ok(()),
    }
}
