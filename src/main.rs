use clap::{Parser, Subcommand};
use postforge::layout::OutputLayout;
use postforge::query::ContentStore;
use postforge::types::{DocumentEvent, Failure, SourceDocument};
use postforge::{compile, config, emit, extract, feeds, gate, history, images, output, scan};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn version_string() -> &'static str {
    let release = env!("POSTFORGE_RELEASE_BUILD");
    if release == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("POSTFORGE_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "postforge")]
#[command(about = "Build-time content pipeline for a markdown blog")]
#[command(long_about = "\
Build-time content pipeline for a markdown blog

Documents live two levels deep: the directory is the category, the file stem
is the document id, and the slug is <category>/<id>.

Content structure:

  content/
  ├── config.toml              # Pipeline config (optional)
  ├── posts/
  │   ├── hello_world.mdx      # slug posts/hello_world
  │   └── rust_series_1.mdx
  └── drafts/
      └── wip.mdx

Every document starts with a YAML front matter block:

  ---
  meta:
    title: Hello world
    description: First post
    dateCreated: 2022-11-28     # optional, backfilled from git history
  tags: [rust, web]             # optional, defaults to [untagged]
  series:                       # optional
    name: rust_series
    part: 1
  ---

Image assets named by meta.image live flat in --assets (png, jpg, webp, gif).

Outputs (under --output):

  frontmatter/<category>/<id>.json, frontmatter/<category>/index.js,
  frontmatter/tags.json, mdx/<category>/<id>.mjs, mdx/<category>/index.mjs,
  feeds/rss.xml, feeds/sitemap.xml, images/index.js

Set RUST_LOG=debug for diagnostic logging.
Run 'postforge gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "generated", global = true)]
    output: PathBuf,

    /// Image asset directory
    #[arg(long, default_value = "assets", global = true)]
    assets: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for gated stages.
#[derive(clap::Args, Clone, Copy)]
struct GateArgs {
    /// Run even when outputs look up to date
    #[arg(long)]
    force: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Extract front matter into JSON, barrels and tags.json
    Extract(GateArgs),
    /// Compile document bodies into ES modules
    Compile(GateArgs),
    /// Write rss.xml and sitemap.xml from extracted front matter
    Feeds,
    /// Write the image barrel with asset dimensions
    Images,
    /// Run extract, compile, feeds and images
    Build(GateArgs),
    /// Validate every document without writing anything
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

/// Whether every document in a stage succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Clean,
    Failed,
}

impl Outcome {
    fn and(self, other: Outcome) -> Outcome {
        if self == Outcome::Clean && other == Outcome::Clean {
            Outcome::Clean
        } else {
            Outcome::Failed
        }
    }
}

fn main() -> CliResult<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let layout = OutputLayout::new(&cli.output);

    let outcome = match cli.command {
        Command::Extract(args) => {
            let config = config::load_config(&cli.source)?;
            run_extract(&cli.source, &layout, &config, args)?
        }
        Command::Compile(args) => {
            let config = config::load_config(&cli.source)?;
            run_compile(&cli.source, &layout, &config, args)?
        }
        Command::Feeds => {
            let config = config::load_config(&cli.source)?;
            run_feeds(&layout, &config)?
        }
        Command::Images => {
            let config = config::load_config(&cli.source)?;
            run_images(&cli.assets, &layout, &config)?
        }
        Command::Build(args) => {
            let config = config::load_config(&cli.source)?;
            println!("==> Stage 1: Extracting front matter from {}", cli.source.display());
            let extracted = run_extract(&cli.source, &layout, &config, args)?;
            println!("==> Stage 2: Compiling bodies → {}", layout.mdx_dir().display());
            let compiled = run_compile(&cli.source, &layout, &config, args)?;
            println!("==> Stage 3: Writing feeds → {}", layout.feeds_dir().display());
            let fed = run_feeds(&layout, &config)?;
            println!("==> Stage 4: Listing images from {}", cli.assets.display());
            let imaged = run_images(&cli.assets, &layout, &config)?;
            let outcome = extracted.and(compiled).and(fed).and(imaged);
            if outcome == Outcome::Clean {
                println!("==> Build complete: {}", cli.output.display());
            }
            outcome
        }
        Command::Check => {
            let config = config::load_config(&cli.source)?;
            println!("==> Checking {}", cli.source.display());
            let documents = scan::scan(&cli.source, &config)?;
            output::print_scan_output(&documents);
            let report = extract::extract(
                &documents,
                &history::GitHistory::new(config.processing.history_timeout()),
                config::effective_threads(&config.processing),
                None,
            )?;
            output::print_lines(&output::format_extract_summary(&report, None));
            output::print_failure_report(&report.failures, Some(&cli.source));
            if report.is_success() {
                println!("==> Content is valid");
                Outcome::Clean
            } else {
                Outcome::Failed
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Outcome::Clean
        }
    };

    Ok(match outcome {
        Outcome::Clean => ExitCode::SUCCESS,
        Outcome::Failed => ExitCode::FAILURE,
    })
}

fn run_extract(
    source: &Path,
    layout: &OutputLayout,
    config: &config::PipelineConfig,
    args: GateArgs,
) -> CliResult<Outcome> {
    let dir = layout.frontmatter_dir();
    if !gate_allows("extract", source, &dir, config, args) {
        return Ok(Outcome::Clean);
    }
    finish_stage(&dir, extract_stage(source, layout, config))
}

fn extract_stage(
    source: &Path,
    layout: &OutputLayout,
    config: &config::PipelineConfig,
) -> CliResult<Vec<Failure>> {
    let documents = scan::scan(source, config)?;
    let history = history::GitHistory::new(config.processing.history_timeout());

    let (tx, printer) = spawn_printer(None);
    let report = extract::extract(
        &documents,
        &history,
        config::effective_threads(&config.processing),
        Some(tx),
    );
    join_printer(printer);
    let report = report?;

    let emitted = emit::emit(&report.payloads, layout)?;
    output::print_lines(&output::format_extract_summary(&report, Some(&emitted)));
    output::print_failure_report(&report.failures, Some(source));
    Ok(report.failures)
}

fn run_compile(
    source: &Path,
    layout: &OutputLayout,
    config: &config::PipelineConfig,
    args: GateArgs,
) -> CliResult<Outcome> {
    let dir = layout.mdx_dir();
    if !gate_allows("compile", source, &dir, config, args) {
        return Ok(Outcome::Clean);
    }
    finish_stage(&dir, compile_stage(source, layout, config))
}

fn compile_stage(
    source: &Path,
    layout: &OutputLayout,
    config: &config::PipelineConfig,
) -> CliResult<Vec<Failure>> {
    let documents: Vec<SourceDocument> = scan::scan(source, config)?;

    let (tx, printer) = spawn_printer(Some(layout.root().to_path_buf()));
    let report = compile::compile(
        &documents,
        layout,
        &config.compile,
        config::effective_threads(&config.processing),
        Some(tx),
    );
    join_printer(printer);
    let report = report?;

    output::print_lines(&output::format_compile_summary(&report));
    output::print_failure_report(&report.failures, Some(source));
    Ok(report.failures)
}

/// Leave the failure marker behind for the gate unless the stage ended clean.
fn finish_stage(output_dir: &Path, result: CliResult<Vec<Failure>>) -> CliResult<Outcome> {
    let problems: Vec<String> = match &result {
        Ok(failures) => failures.iter().map(ToString::to_string).collect(),
        Err(e) => vec![e.to_string()],
    };
    let recorded = gate::record_outcome(output_dir, &problems);
    let failures = result?;
    recorded?;
    Ok(if failures.is_empty() {
        Outcome::Clean
    } else {
        Outcome::Failed
    })
}

fn run_feeds(layout: &OutputLayout, config: &config::PipelineConfig) -> CliResult<Outcome> {
    let store = ContentStore::load(&layout.frontmatter_dir())?;
    let summary = feeds::write_feeds(&store, config, layout)?;
    output::print_lines(&output::format_feed_summary(&summary, &config.feeds.category));
    Ok(Outcome::Clean)
}

fn run_images(
    assets: &Path,
    layout: &OutputLayout,
    config: &config::PipelineConfig,
) -> CliResult<Outcome> {
    let summary = images::write_image_barrel(assets, layout, &config.images)?;
    output::print_lines(&output::format_image_summary(&summary, assets));
    Ok(Outcome::Clean)
}

fn gate_allows(
    step: &str,
    source: &Path,
    output_dir: &Path,
    config: &config::PipelineConfig,
    args: GateArgs,
) -> bool {
    let decision = if args.force {
        gate::GateDecision::forced()
    } else {
        gate::needs_regeneration(source, output_dir, config)
    };
    output::print_gate(step, &decision);
    decision.needs_regen()
}

/// Print per-document events as workers finish them.
fn spawn_printer(output_root: Option<PathBuf>) -> (Sender<DocumentEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel();
    let printer = thread::spawn(move || {
        for event in rx {
            for line in output::format_document_event(&event, output_root.as_deref()) {
                println!("{}", line);
            }
        }
    });
    (tx, printer)
}

fn join_printer(printer: JoinHandle<()>) {
    if printer.join().is_err() {
        tracing::warn!("progress printer panicked");
    }
}
