use clap::{Args, Parser, Subcommand};
use ensemble_core::config::{LlmProvider, Settings};
use ensemble_core::EnsembleError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ensemble")]
#[command(about = "Ensemble - multi-agent pipelines over tool-using LLM agents")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// LLM model to use
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// LLM provider (openai, claude, ollama, groq, openrouter, lmstudio)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Iteration budget for agents that do not set their own
    #[arg(long, global = true)]
    pub max_iterations: Option<usize>,

    /// How many times a reviewer may send work back
    #[arg(long, global = true)]
    pub max_revisions: Option<u32>,

    /// How many goals `ask` works on at once
    #[arg(long, global = true)]
    pub max_parallel: Option<usize>,

    /// Settings file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log pipeline progress
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a multi-agent pipeline on a goal
    Run(RunArgs),
    /// Run a general-purpose agent with every capability. Several goals run
    /// side by side, up to the configured parallelism.
    Ask {
        #[arg(required = true)]
        goals: Vec<String>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// List available capabilities
    Tools {
        /// Print full descriptors as JSON
        #[arg(long)]
        json: bool,
    },
    /// List built-in pipeline presets
    Presets,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// The goal; defaults to the pipeline file's goal or the preset's example
    pub goal: Option<String>,

    /// Pipeline definition file (TOML)
    #[arg(long, conflicts_with = "preset")]
    pub pipeline: Option<PathBuf>,

    /// Built-in pipeline: blog, qa or debate
    #[arg(long)]
    pub preset: Option<String>,

    /// Ask on stdin before continuing after each agent
    #[arg(long)]
    pub approve: bool,

    /// Carry the conversation from agent to agent instead of passing answers
    #[arg(long, conflicts_with = "approve")]
    pub chain: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    pub fn apply_overrides(&self, settings: &mut Settings) -> Result<(), EnsembleError> {
        if let Some(ref provider) = self.provider {
            settings.set_provider(provider.parse::<LlmProvider>()?);
        }
        if let Some(ref model) = self.model {
            settings.llm.model = model.clone();
        }
        if let Some(max) = self.max_iterations {
            settings.pipeline.max_iterations = max;
        }
        if let Some(max) = self.max_revisions {
            settings.pipeline.max_revisions = max;
        }
        if let Some(max) = self.max_parallel {
            settings.pipeline.max_parallel = max;
        }
        Ok(())
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "warn,ensemble_core=info"
        } else {
            "warn"
        }
    }
}
