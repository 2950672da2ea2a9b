use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use lintmend::{
    default_cache_root, diff, ensure_models, CheckstyleConfig, CheckstyleRunner, ModelCache,
    ModelOutcome, ModelStore, ProjectId, Protocol, RemoteConfig, RepairCollector, ReportFilter,
    TrainingRunner,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "lintmend",
    version,
    about = "Checkstyle orchestration and repair-model management"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run checkstyle over target paths and summarize the report
    Check(CheckArgs),
    /// Locate a stored model for a project, optionally training on a miss
    FetchModel(FetchModelArgs),
    /// Pair repaired files with their originals into a diff dataset
    CollectRepairs(CollectRepairsArgs),
    /// Upload a trained model and its ruleset as a new release
    UploadModel(UploadModelArgs),
    /// Inspect or clear the local model cache
    Cache(CacheArgs),
    /// Print the unified diff between two files
    Diff(DiffArgs),
}

#[derive(Args)]
struct CheckArgs {
    /// Checkstyle ruleset file
    #[arg(long)]
    rules: PathBuf,
    /// Checkstyle all-in-one jar
    #[arg(long, env = "LINTMEND_CHECKSTYLE_JAR")]
    jar: PathBuf,
    /// Keep only .java files in the report
    #[arg(long)]
    only_java: bool,
    /// Keep only violations from the targeted whitespace/layout checks
    #[arg(long)]
    only_targeted: bool,
    /// Emit the full report as JSON
    #[arg(long)]
    json: bool,
    /// Files or directories to scan
    #[arg(required = true)]
    targets: Vec<PathBuf>,
}

#[derive(Args)]
struct FetchModelArgs {
    /// Project slug, e.g. alice-demo
    project: String,
    /// Checkstyle ruleset the model must have been trained against
    #[arg(long)]
    rules: PathBuf,
    /// Protocols to fetch; defaults to all known protocols
    #[arg(long = "protocol", value_name = "PROTOCOL")]
    protocols: Vec<String>,
    /// Train (and upload) a new model when none is stored
    #[arg(long)]
    train: bool,
    /// Local model cache root
    #[arg(long, default_value_os_t = default_cache_root())]
    cache_root: PathBuf,
    /// Directory holding the train_<protocol>_upload.sh scripts
    #[arg(long, default_value = ".")]
    scripts_dir: PathBuf,
}

#[derive(Args)]
struct CollectRepairsArgs {
    /// Project slug, e.g. alice-demo
    project: String,
    /// Dataset directory of numbered error cases
    #[arg(long)]
    dataset_dir: PathBuf,
    /// Directory of numbered repaired-file subdirectories
    #[arg(long)]
    repaired_dir: PathBuf,
    /// Output JSON file
    #[arg(long)]
    output: PathBuf,
}

#[derive(Args)]
struct UploadModelArgs {
    /// Project slug, e.g. alice-demo
    project: String,
    /// Trained model artifact to upload
    #[arg(long)]
    model: PathBuf,
    /// Checkstyle ruleset the model was trained against
    #[arg(long)]
    rules: PathBuf,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
    /// Local model cache root
    #[arg(long, default_value_os_t = default_cache_root())]
    cache_root: PathBuf,
}

#[derive(Subcommand)]
enum CacheCommand {
    /// List cached projects, their releases, and release sizes
    Status,
    /// Remove every cached release of a project
    Clean {
        /// Project slug, e.g. alice-demo
        project: String,
    },
}

#[derive(Args)]
struct DiffArgs {
    old: PathBuf,
    new: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Check(args) => check(args),
        Command::FetchModel(args) => fetch_model(args),
        Command::CollectRepairs(args) => collect_repairs(args),
        Command::UploadModel(args) => upload_model(args),
        Command::Cache(args) => cache(args),
        Command::Diff(args) => print_diff(args),
    }
}

fn check(args: CheckArgs) -> Result<()> {
    let runner = CheckstyleRunner::new(CheckstyleConfig::new(&args.jar));
    let filter = ReportFilter {
        only_java: args.only_java,
        only_targeted: args.only_targeted,
    };

    let result = runner
        .check(&args.rules, &args.targets, filter)
        .context("checkstyle run failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.report)?);
        return Ok(());
    }

    for (file, report) in &result.report.files {
        println!("{file}: {} violation(s)", report.violations.len());
        for violation in &report.violations {
            match violation.column {
                Some(column) => println!(
                    "  {}:{} {} [{}]",
                    violation.line,
                    column,
                    violation.message,
                    violation.check_name()
                ),
                None => println!(
                    "  {} {} [{}]",
                    violation.line,
                    violation.message,
                    violation.check_name()
                ),
            }
        }
    }
    println!(
        "{} file(s), {} violation(s), {} clean",
        result.report.files.len(),
        result.report.total_violations(),
        result.report.clean_files()
    );
    Ok(())
}

fn fetch_model(args: FetchModelArgs) -> Result<()> {
    let project: ProjectId = args.project.parse()?;
    let protocols = parse_protocols(&args.protocols)?;
    let remote = RemoteConfig::from_env().context("remote store settings")?;
    let store = ModelStore::new(&args.cache_root, remote);

    if args.train {
        let trainer = TrainingRunner::new(&args.scripts_dir);
        let outcomes = ensure_models(&store, &trainer, &project, &protocols, &args.rules)?;
        for (protocol, outcome) in outcomes {
            match outcome {
                ModelOutcome::Available(path) => println!("{protocol}: {}", path.display()),
                ModelOutcome::Trained => println!("{protocol}: trained a new model"),
            }
        }
        return Ok(());
    }

    for protocol in protocols {
        match store.get_model(&project, protocol, &args.rules)? {
            Some(path) => println!("{protocol}: {}", path.display()),
            None => println!("{protocol}: no compatible model stored"),
        }
    }
    Ok(())
}

fn collect_repairs(args: CollectRepairsArgs) -> Result<()> {
    let project: ProjectId = args.project.parse()?;
    let collector = RepairCollector::new(&args.dataset_dir, &args.repaired_dir);
    let count = collector
        .collect_to(&project, &args.output)
        .context("collecting repairs")?;
    println!("Collected {count} repair(s) into {}", args.output.display());
    Ok(())
}

fn upload_model(args: UploadModelArgs) -> Result<()> {
    let project: ProjectId = args.project.parse()?;
    let remote = RemoteConfig::from_env().context("remote store settings")?;
    let store = ModelStore::new(default_cache_root(), remote);

    let release = store.upload_model(&args.model, &args.rules, &project)?;
    println!("Uploaded {} as release {release}", args.model.display());
    Ok(())
}

fn cache(args: CacheArgs) -> Result<()> {
    let cache = ModelCache::new(&args.cache_root);
    match args.command {
        CacheCommand::Status => {
            let mut total = 0u64;
            for project in cache.projects()? {
                for release in cache.releases(&project)? {
                    let size = cache.release_size(&project, release)?;
                    total += size;
                    println!("{project}/{release}: {size} bytes");
                }
            }
            println!("total: {total} bytes in {}", args.cache_root.display());
        }
        CacheCommand::Clean { project } => {
            let project: ProjectId = project.parse()?;
            cache.remove_project(&project)?;
            println!("Removed cached releases of {project}");
        }
    }
    Ok(())
}

fn print_diff(args: DiffArgs) -> Result<()> {
    let text = diff::unified_diff(&args.old, &args.new)?;
    if text.is_empty() {
        println!("Files are identical");
    } else {
        print!("{text}");
    }
    Ok(())
}

fn parse_protocols(raw: &[String]) -> Result<Vec<Protocol>> {
    if raw.is_empty() {
        return Ok(Protocol::all().to_vec());
    }
    let mut protocols = Vec::with_capacity(raw.len());
    for name in raw {
        match name.parse::<Protocol>() {
            Ok(protocol) => protocols.push(protocol),
            Err(e) => bail!("{e}"),
        }
    }
    Ok(protocols)
}
