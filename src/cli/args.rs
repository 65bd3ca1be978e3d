//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::CliArgs;

/// scenesmith - turn a plain-language request into a Manim animation
#[derive(Parser, Debug)]
#[command(name = "scenesmith")]
#[command(about = "Generate Manim animation scripts from natural-language requests")]
#[command(long_about = r#"
scenesmith turns a plain-language request into a runnable Manim script through
validated generation stages, and optionally renders it with a self-healing
repair loop.

EXAMPLES:
  # Generate a script only
  scenesmith "explain the derivative of x^2"

  # Generate and render at low quality
  scenesmith --execute --quality low "visualize the Pythagorean theorem"

  # Use OpenRouter with a specific model and print the result as JSON
  scenesmith --provider openrouter --model meta-llama/llama-3.3-70b-instruct --json "area of a circle"

CONFIGURATION:
  Precedence: CLI flags > environment > .scenesmith/config.toml > defaults
  The config file is discovered by searching upward from the current directory.
  API keys are read from GROQ_API_KEY, OPENROUTER_API_KEY or GEMINI_API_KEY.
"#)]
#[command(version)]
pub struct Cli {
    /// What to animate
    #[arg(required = true, num_args = 1..)]
    pub prompt: Vec<String>,

    /// Render the script with the repair loop
    #[arg(long)]
    pub execute: bool,

    /// Do not write JSON logs
    #[arg(long)]
    pub no_logs: bool,

    /// Skip the narration stage
    #[arg(long)]
    pub no_narration: bool,

    /// Verbose tracing on stderr
    #[arg(long)]
    pub debug: bool,

    /// Print the pipeline result as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file (overrides discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Generation provider: groq, openrouter or gemini
    #[arg(long)]
    pub provider: Option<String>,

    /// Model identifier; repeat to build the fallback list
    #[arg(long = "model")]
    pub models: Vec<String>,

    /// Root of outputs/, logs/ and temp/
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// Render quality: low, medium, high, production or 4k
    #[arg(long)]
    pub quality: Option<String>,

    /// Ceiling on render attempts
    #[arg(long)]
    pub max_repair_attempts: Option<u32>,

    /// Clear the working area after the run
    #[arg(long)]
    pub clean_temp: bool,
}

impl Cli {
    /// The request as one string.
    #[must_use]
    pub fn prompt_text(&self) -> String {
        self.prompt.join(" ").trim().to_string()
    }

    /// Values for the configuration layer. Unset flags stay `None` so lower
    /// layers can supply them.
    #[must_use]
    pub fn to_cli_args(&self) -> CliArgs {
        CliArgs {
            config_path: self.config.clone(),
            provider: self.provider.clone(),
            models: self.models.clone(),
            storage_dir: self.storage_dir.clone(),
            execute: self.execute.then_some(true),
            save_logs: self.no_logs.then_some(false),
            narrate: self.no_narration.then_some(false),
            quality: self.quality.clone(),
            max_repair_attempts: self.max_repair_attempts,
        }
    }
}
