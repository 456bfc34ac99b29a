use anyhow::Context;
use clap::Parser;
use promptpack::{
    Config, Pipeline, DEFAULT_MODEL, DEFAULT_NUM_CTX, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE,
};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "promptpack",
    version,
    about = "Pack Markdown documents into LLM chat request payloads",
    long_about = "Walks a directory, wraps every Markdown document into a chat request \
    body and writes one JSON file per document.\n\n\
    USAGE EXAMPLES:\n  \
      # Convert ./IN into ./OUT\n  \
      promptpack\n\n  \
      # Use other directories and a larger context window\n  \
      promptpack --input ./notes --output ./requests --num-ctx 8192"
)]
struct Cli {
    /// Directory to walk for documents
    #[arg(short, long, default_value = "./IN", value_name = "PATH")]
    input: PathBuf,

    /// Directory receiving one <name>.json per document
    #[arg(short, long, default_value = "./OUT", value_name = "PATH")]
    output: PathBuf,

    /// Extension of documents to pick up (case-sensitive, no dot)
    #[arg(long, default_value = "md", value_name = "EXT")]
    extension: String,

    /// Model name written into each request
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// System instruction preceding each document
    #[arg(long, default_value = DEFAULT_SYSTEM_PROMPT)]
    system_prompt: String,

    /// Sampling temperature
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f64,

    /// Context window size (num_ctx)
    #[arg(long, default_value_t = DEFAULT_NUM_CTX)]
    num_ctx: u32,

    /// Path to a Tera template for the user message
    ///
    /// The template sees `content` (document text) and `name` (file stem).
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Create the output directory if it does not exist
    #[arg(long)]
    create_output_dir: bool,

    /// Dry run (don't write files)
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    let mut builder = Config::builder()
        .input_dir(cli.input)
        .output_dir(cli.output)
        .extension(cli.extension)
        .model(cli.model)
        .system_prompt(cli.system_prompt)
        .temperature(cli.temperature)
        .num_ctx(cli.num_ctx)
        .create_output_dir(cli.create_output_dir)
        .dry_run(cli.dry_run);

    if let Some(template_path) = cli.template {
        builder = builder.template_path(template_path);
    }

    let config = builder.build().context("Failed to build configuration")?;

    let stats = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run()
        .context("Pipeline execution failed")?;

    stats.print_summary();

    Ok(())
}

fn setup_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("promptpack=info"),
        1 => EnvFilter::new("promptpack=debug"),
        _ => EnvFilter::new("promptpack=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();
}
