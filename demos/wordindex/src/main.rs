use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use mrlite::constants::{ENV_NUM_MAPPERS, ENV_NUM_REDUCERS};
use mrlite::io::{default_inputs, expand_inputs};
use mrlite::utils::env_count;
use mrlite::{AlnumPrefix, OutputFormat, PartitionFileSink, Pipeline, PipelineConfig, WriterSink};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Index where each word occurs across input files")]
struct Args {
    /// Number of map threads; without INPUTs reads file1.txt..fileN.txt
    #[arg(short = 'p', long)]
    mappers: Option<usize>,
    /// Number of reduce threads
    #[arg(short = 'c', long)]
    reducers: Option<usize>,
    /// Slots per partition queue
    #[arg(long)]
    capacity: Option<usize>,
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// Write part-NNNNN files into this directory instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    /// Write the run summary as JSON
    #[arg(long)]
    stats: Option<PathBuf>,
    /// Input files or directories, one map thread per file
    inputs: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

fn prompt_count(label: &str) -> Result<usize> {
    let mut stderr = io::stderr();
    write!(stderr, "{}: ", label)?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line).context("read from stdin")?;
    line.trim().parse::<usize>().with_context(|| format!("not a number: {:?}", line.trim()))
}

/// Sources from explicit inputs, or `file1.txt..fileN.txt` for N map threads.
fn resolve_sources(args: &Args, interactive: bool) -> Result<Vec<PathBuf>> {
    if !args.inputs.is_empty() {
        let sources = expand_inputs(&args.inputs)?;
        if let Some(p) = args.mappers {
            if p != sources.len() {
                bail!("--mappers {} does not match the {} input files", p, sources.len());
            }
        }
        return Ok(sources);
    }
    let mappers = match args.mappers.or_else(|| env_count(ENV_NUM_MAPPERS)) {
        Some(n) => n,
        None if interactive => prompt_count("Number of Map threads")?,
        None => bail!("no inputs given; pass INPUT paths or --mappers N"),
    };
    if mappers == 0 {
        bail!("number of map threads must be at least 1");
    }
    Ok(default_inputs(mappers))
}

fn resolve_config(args: &Args, interactive: bool) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env();
    match args.reducers {
        Some(c) => config = config.with_reducers(c),
        None if interactive && env_count(ENV_NUM_REDUCERS).is_none() => {
            config = config.with_reducers(prompt_count("Number of Reduce threads")?)
        }
        None => {}
    }
    if let Some(cap) = args.capacity {
        config = config.with_queue_capacity(cap);
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();
    let interactive = io::stdin().is_terminal();

    let sources = resolve_sources(&args, interactive)?;
    let config = resolve_config(&args, interactive)?;
    let mut pipeline = Pipeline::new(config);
    for source in sources {
        pipeline.add_input(source);
    }

    let normalizer = AlnumPrefix::new();
    let format = OutputFormat::from(args.format);
    let summary = match &args.output {
        Some(dir) => pipeline.run(&normalizer, PartitionFileSink::new(dir, format)?)?,
        None => pipeline.run(&normalizer, WriterSink::stdout(format))?,
    };

    if let Some(path) = &args.stats {
        let file = std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &summary).context("write run summary")?;
        tracing::info!(path = %path.display(), "wrote run summary");
    }
    Ok(())
}
