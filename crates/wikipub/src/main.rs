use std::env;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use wikipub_core::config::{ConfigOverrides, PublishConfig, load_config};
use wikipub_core::publish::{PublishOptions, check, publish};

#[derive(Debug, Parser)]
#[command(
    name = "wikipub",
    version,
    about = "Republish a documentation tree as flat wiki pages"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Path to wikipub.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved configuration")]
    diagnostics: bool,
    #[command(flatten)]
    overrides: OverrideArgs,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Args)]
struct OverrideArgs {
    #[arg(long, global = true, value_name = "NAME", help = "Repository owner")]
    owner: Option<String>,
    #[arg(long, global = true, value_name = "NAME", help = "Repository name")]
    repo: Option<String>,
    #[arg(long, global = true, value_name = "NAME", help = "Branch for raw image URLs")]
    branch: Option<String>,
    #[arg(long, global = true, value_name = "PATH", help = "Documentation tree root")]
    docs_dir: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH", help = "Navigation manifest")]
    manifest: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH", help = "Destination wiki directory")]
    dest: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH", help = "Root document (home page source)")]
    root_doc: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Transform all pages and rewrite the destination")]
    Publish(PublishArgs),
    #[command(about = "Validate the manifest and page set without writing")]
    Check(CheckArgs),
}

#[derive(Debug, Args, Default)]
struct PublishArgs {
    #[arg(long, help = "Read and transform everything, write nothing")]
    dry_run: bool,
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

#[derive(Debug, Args, Default)]
struct CheckArgs {
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    if cli.diagnostics {
        println!("[diagnostics]\n{}\n", config.diagnostics());
    }

    match cli.command {
        Some(Commands::Publish(args)) => run_publish(&config, &args),
        Some(Commands::Check(args)) => run_check(&config, &args),
        None => run_publish(&config, &PublishArgs::default()),
    }
}

fn resolve_config(cli: &Cli) -> Result<PublishConfig> {
    let config_path = cli
        .config
        .clone()
        .or_else(|| env::var("WIKIPUB_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("wikipub.toml"));
    let file = load_config(&config_path)?;
    let overrides = ConfigOverrides {
        owner: cli.overrides.owner.clone(),
        repo: cli.overrides.repo.clone(),
        branch: cli.overrides.branch.clone(),
        docs_dir: cli.overrides.docs_dir.clone(),
        manifest: cli.overrides.manifest.clone(),
        destination: cli.overrides.dest.clone(),
        root_doc: cli.overrides.root_doc.clone(),
    };
    Ok(PublishConfig::resolve(&file, &overrides))
}

fn run_publish(config: &PublishConfig, args: &PublishArgs) -> Result<()> {
    let report = publish(
        config,
        &PublishOptions {
            dry_run: args.dry_run,
        },
    )?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("publish");
    println!("destination: {}", config.destination.display());
    println!("pages: {}", report.pages);
    println!("cleared_entries: {}", report.cleared_entries);
    println!("dry_run: {}", report.dry_run);
    print_warnings(&report.warnings);
    Ok(())
}

fn run_check(config: &PublishConfig, args: &CheckArgs) -> Result<()> {
    let report = check(config)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("check");
    println!("manifest: {}", config.manifest_path.display());
    println!("nav_entries: {}", report.nav_entries);
    println!("pages: {}", report.pages);
    if report.unlisted.is_empty() {
        println!("unlisted: <none>");
    } else {
        println!("unlisted.count: {}", report.unlisted.len());
        for path in &report.unlisted {
            println!("unlisted.page: {path}");
        }
    }
    print_warnings(&report.warnings);
    Ok(())
}

fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!("warnings:");
    for warning in warnings {
        println!("  - {warning}");
    }
}
