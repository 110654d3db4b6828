// src/main.rs — reviser entry point

use clap::Parser;

use reviser::cli::run::{self, RunOptions};
use reviser::cli::{Cli, Commands};
use reviser::infra::config::Config;
use reviser::infra::logger;

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG)
    logger::init_logging("warn");

    if let Err(e) = dispatch().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn dispatch() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.apply_overrides(&mut config);
    tracing::debug!(model = %config.model.name, max_iterations = config.engine.max_iterations, "Config ready");

    let opts = RunOptions {
        output: cli.output.clone(),
        save: cli.save,
        quiet: cli.quiet,
    };

    match &cli.command {
        Commands::Count { complex, target } => {
            run::run_count(*complex, *target, &config, &opts).await
        }
        Commands::Reflect { topic } => run::run_reflect(&topic.join(" "), &config, &opts).await,
        Commands::Reflexion { question } => {
            run::run_reflexion(&question.join(" "), &config, &opts).await
        }
        Commands::React { question } => run::run_react(&question.join(" "), &config, &opts).await,
        Commands::Graph { pattern, mermaid } => {
            run::run_graph(*pattern, *mermaid);
            Ok(())
        }
    }
}
