// src/cli/mod.rs — CLI definition (clap derive)

pub mod export;
pub mod graph;
pub mod progress;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::agents::Pattern;
use crate::infra::config::Config;

#[derive(Parser, Debug)]
#[command(name = "reviser", about = "Bounded draft / search / revise loops", version)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model name (overrides config)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Augmentation cycles allowed before the budget policy stops
    #[arg(short = 'n', long, global = true)]
    pub max_iterations: Option<usize>,

    /// Write the final ledger to this file as JSON
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Also keep the ledger under the data dir's runs/ folder
    #[arg(long, global = true)]
    pub save: bool,

    /// Suppress progress output (only emit final result)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Increment a counter until it reaches the target
    Count {
        /// Track a running sum and the history of counts as well
        #[arg(long)]
        complex: bool,
        /// Stop once count reaches this value
        #[arg(long)]
        target: Option<i64>,
    },
    /// Write a post, critique it, rewrite it
    Reflect {
        #[arg(required = true, trailing_var_arg = true)]
        topic: Vec<String>,
    },
    /// Draft an answer, research it, revise with citations
    Reflexion {
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// Answer with web search and the system clock as tools
    React {
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// Print a pattern's stage cycle
    Graph {
        #[arg(value_enum)]
        pattern: Pattern,
        /// Mermaid instead of plain text
        #[arg(long)]
        mermaid: bool,
    },
}

impl Cli {
    /// Fold command-line flags into the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model.name = model.clone();
        }
        if let Some(n) = self.max_iterations {
            config.engine.max_iterations = n;
        }
    }
}
