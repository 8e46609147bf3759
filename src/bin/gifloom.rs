use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "gifloom", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a job into a looping GIF (requires `ffmpeg` on PATH).
    Compose(ComposeArgs),
    /// Print the reconciled timeline of a job as JSON.
    Plan(PlanArgs),
    /// Print frame count and native size of one source.
    Probe(ProbeArgs),
    /// Compose through a directory-backed artifact cache and print the public URL.
    Cache(CacheArgs),
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Job config JSON; defaults apply to missing fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compositing strategy.
    #[arg(long, value_enum)]
    mode: Option<ModeChoice>,

    /// Native frames advanced per output frame.
    #[arg(long)]
    frame_skip: Option<u32>,

    /// Use the exact least-common-multiple reconciler.
    #[arg(long)]
    exact_lcm: bool,
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Job description JSON.
    #[arg(long)]
    job: PathBuf,

    /// Output GIF path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Job description JSON.
    #[arg(long)]
    job: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// URL or local path of an animation.
    media: String,
}

#[derive(Parser, Debug)]
struct CacheArgs {
    /// Job description JSON.
    #[arg(long)]
    job: PathBuf,

    /// Directory holding stored composites.
    #[arg(long)]
    store: PathBuf,

    /// Public URL the store directory is served at.
    #[arg(long)]
    base_url: String,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Frames,
    FilterGraph,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let result = match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Plan(args) => cmd_plan(args),
        Command::Probe(args) => cmd_probe(args),
        Command::Cache(args) => cmd_cache(args),
    };
    if let Err(e) = &result
        && let Some(err) = e.downcast_ref::<gifloom::GifloomError>()
    {
        eprintln!("{}", gifloom::failure_summary(err));
    }
    result
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &ConfigArgs) -> anyhow::Result<gifloom::JobConfig> {
    let mut cfg = match &args.config {
        Some(path) => gifloom::JobConfig::load(path)?,
        None => gifloom::JobConfig::default(),
    };
    if let Some(mode) = args.mode {
        cfg.mode = match mode {
            ModeChoice::Frames => gifloom::CompositeMode::Frames,
            ModeChoice::FilterGraph => gifloom::CompositeMode::FilterGraph,
        };
    }
    if let Some(skip) = args.frame_skip {
        cfg.reconcile.frame_skip = skip;
    }
    if args.exact_lcm {
        cfg.reconcile.strategy = gifloom::ReconcileStrategy::ExactLcm;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn fetcher_for(job_path: &Path) -> anyhow::Result<gifloom::HttpFetcher> {
    let root = job_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(gifloom::HttpFetcher::new(gifloom::FetchOpts {
        root: root.to_path_buf(),
        ..gifloom::FetchOpts::default()
    })?)
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let job = gifloom::JobSpec::load(&args.job)?;
    let cfg = load_config(&args.config)?;
    let fetcher = fetcher_for(&args.job)?;

    let out = gifloom::compose_job(&job, &cfg, &fetcher)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &out.bytes)
        .with_context(|| format!("write gif '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}x{}, {} frames, {} substituted draws, {} truncated sources)",
        args.out.display(),
        out.width,
        out.height,
        out.frame_count,
        out.stats.frames_substituted,
        out.stats.truncated_sources
    );
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let job = gifloom::JobSpec::load(&args.job)?;
    let cfg = load_config(&args.config)?;
    let fetcher = fetcher_for(&args.job)?;

    let spec = gifloom::prepare(&job, &fetcher)?;
    let timeline = gifloom::plan(&spec, &cfg.reconcile)?;
    let report = serde_json::json!({
        "sources": spec.layers.iter().map(|l| l.source.info()).collect::<Vec<_>>(),
        "timeline": timeline,
        "frame_delay_ms": cfg.encoder.effective_delay_ms(timeline.frame_skip),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let fetcher = gifloom::HttpFetcher::new(gifloom::FetchOpts::default())?;
    let info = gifloom::probe(&gifloom::MediaRef::parse(&args.media), &fetcher)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn cmd_cache(args: CacheArgs) -> anyhow::Result<()> {
    let job = gifloom::JobSpec::load(&args.job)?;
    let cfg = load_config(&args.config)?;
    let fetcher = fetcher_for(&args.job)?;
    let store = gifloom::DirArtifactStore::new(&args.store, args.base_url)?;

    let cached = gifloom::compose_cached(&job, &cfg, &fetcher, &store)?;
    println!("{}", serde_json::to_string_pretty(&cached)?);
    Ok(())
}
