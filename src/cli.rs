//! Command-line interface for routescan.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::MetadataCache;
use crate::config::{self, Config};
use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Starter configuration written by `routescan init`.
const CONFIG_TEMPLATE: &str = include_str!("templates/routescan.yaml");

/// Static analyzer for annotated Go controllers.
///
/// Routescan walks controller declarations, links their annotations to
/// method parameters, resolves every referenced model and reports
/// problems before any spec or routing code is generated.
#[derive(Parser)]
#[command(name = "routescan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build, validate and print the flattened route metadata
    Analyze(AnalyzeArgs),
    /// Build the graph and report diagnostics
    #[command(visible_alias = "check")]
    Validate(ValidateArgs),
    /// Print the raw symbol graph
    Dump(DumpArgs),
    /// Create a routescan.yaml with the default settings
    Init(InitArgs),
}

/// Arguments shared by every command that analyzes a project.
#[derive(Parser)]
pub struct ProjectArgs {
    /// Project root (directory containing go.mod)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Metadata cache file, loaded before and saved after the run
    #[arg(long)]
    pub cache: Option<PathBuf>,
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Arguments for the validate command.
#[derive(Parser)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the dump command.
#[derive(Parser)]
pub struct DumpArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output format: text or dot
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "routescan.yaml")]
    pub output: PathBuf,
}

/// Resolve the root, load config and cache, and build a pipeline.
fn open_project(args: &ProjectArgs) -> anyhow::Result<Pipeline> {
    let root = args
        .path
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("cannot access path {:?}: {}", args.path, e))?;
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }

    let config = Config::load(&root, args.config.as_deref())?;
    config::validate(&config)?;

    let pipeline = Pipeline::new(&root, config);
    Ok(match &args.cache {
        Some(path) => {
            let cache = MetadataCache::load(path);
            debug!(entries = cache.len(), path = %path.display(), "loaded metadata cache");
            pipeline.with_cache(Arc::new(cache))
        }
        None => pipeline,
    })
}

/// Persist the cache if one was requested. Failure is not fatal.
fn save_cache(args: &ProjectArgs, pipeline: &Pipeline) {
    if let Some(path) = &args.cache {
        if let Err(e) = pipeline.cache().save(path) {
            warn!(path = %path.display(), error = %e, "failed to save metadata cache");
        }
    }
}

/// Map a pipeline failure to an exit code, printing it.
fn report_failure(e: &PipelineError) -> i32 {
    eprintln!("Error: {}", e);
    if let PipelineError::Build(failure) = e {
        for line in failure.diagnostic_stack() {
            eprintln!("  {}", line);
        }
    }
    if e.is_validation() {
        EXIT_FAILED
    } else {
        EXIT_ERROR
    }
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    let mut pipeline = open_project(&args.project)?;
    let result = pipeline.run();
    save_cache(&args.project, &pipeline);

    match result {
        Ok(metadata) => {
            report::write_metadata_json(&metadata)?;
            Ok(EXIT_SUCCESS)
        }
        Err(e) => Ok(report_failure(&e)),
    }
}

/// Run the validate command.
pub fn run_validate(args: &ValidateArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let mut pipeline = open_project(&args.project)?;
    let built = pipeline.generate_graph().map(|_| ());
    save_cache(&args.project, &pipeline);
    if let Err(e) = built {
        return Ok(report_failure(&e));
    }

    let entities = match pipeline.validate() {
        Ok(entities) => entities,
        Err(e) => return Ok(report_failure(&e)),
    };

    let path_str = args.project.path.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_diagnostics_json(&path_str, &entities)?,
        _ => report::write_diagnostics_pretty(&path_str, pipeline.root(), &entities),
    }

    if report::Totals::of(&entities).passed() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the dump command.
pub fn run_dump(args: &DumpArgs) -> anyhow::Result<i32> {
    if args.format != "text" && args.format != "dot" {
        eprintln!(
            "Error: invalid format {:?}, must be 'text' or 'dot'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let mut pipeline = open_project(&args.project)?;
    let built = pipeline.generate_graph().map(|_| ());
    save_cache(&args.project, &pipeline);
    if let Err(e) = built {
        return Ok(report_failure(&e));
    }

    let rendered = match args.format.as_str() {
        "dot" => pipeline.dump_dot(),
        _ => pipeline.dump_text(),
    };
    match rendered {
        Ok(text) => {
            print!("{}", text);
            Ok(EXIT_SUCCESS)
        }
        Err(e) => Ok(report_failure(&e)),
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, CONFIG_TEMPLATE) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to match your project layout", args.output.display());
    println!("  2. Run: routescan validate .");

    Ok(EXIT_SUCCESS)
}
