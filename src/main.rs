use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use gha_pin::config::{self, split_list, Overrides, PinConfig, Settings, SourcePlan};
use gha_pin::{find_workflow_files, rewrite, unpinned_references, Pinner, RewriteOptions};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gha-pin")]
#[command(about = "Pin GitHub Actions references to commit SHAs", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ./.gha-pin.toml, then ~/.gha-pin.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory names to skip when searching for workflow files (comma separated)
    #[arg(long, global = true, value_delimiter = ',')]
    ignore_dirs: Option<Vec<String>>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pin action references in workflow files to commit SHAs
    ///
    /// Without FILES, every .yml/.yaml file below the current directory is
    /// processed. A directory argument is searched the same way.
    Pin {
        files: Vec<PathBuf>,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Token for api.github.com
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,

        /// Token for the GitHub Enterprise Server given by --api-server
        #[arg(long, env = "GHES_GITHUB_TOKEN", hide_env_values = true)]
        ghes_github_token: Option<String>,

        /// Full API base URL, e.g. https://github.example.com/api/v3/
        /// (falls back to GITHUB_API_URL, then https://api.github.com/)
        #[arg(long)]
        api_server: Option<String>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// List references that are not pinned, without contacting any server
    Check {
        files: Vec<PathBuf>,

        #[command(flatten)]
        policy: PolicyArgs,
    },
}

#[derive(Args)]
struct PolicyArgs {
    /// Owners whose actions are left alone (comma separated)
    #[arg(long, value_delimiter = ',')]
    ignore_owners: Option<Vec<String>>,

    /// Repositories left alone, as owner/repo (comma separated)
    #[arg(long, value_delimiter = ',')]
    ignore_repos: Option<Vec<String>>,

    /// Pin composite actions even when their owner is ignored (GitHub's
    /// August 2025 SHA pinning policy); reusable workflows still honour
    /// --ignore-owners
    #[arg(long)]
    strict_pinning_202508: bool,
}

impl PolicyArgs {
    fn into_overrides(self, ignore_dirs: Option<Vec<String>>) -> Overrides {
        Overrides {
            ignore_dirs: ignore_dirs.map(|dirs| split_list(&dirs)),
            ignore_owners: self.ignore_owners.map(|v| split_list(&v)),
            ignore_repos: self.ignore_repos.map(|v| split_list(&v)),
            strict_pinning_202508: self.strict_pinning_202508,
            ..Overrides::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Pin {
            files,
            policy,
            github_token,
            ghes_github_token,
            api_server,
            dry_run,
            diff,
        } => {
            let overrides = Overrides {
                api_server,
                github_token,
                ghes_github_token,
                env_api_url: env::var("GITHUB_API_URL").ok(),
                ..policy.into_overrides(cli.ignore_dirs)
            };
            cmd_pin(Settings::merge(&config, overrides), files, dry_run, diff)
        }

        Commands::Check { files, policy } => {
            let overrides = policy.into_overrides(cli.ignore_dirs);
            cmd_check(Settings::merge(&config, overrides), files)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<PinConfig> {
    match config::discover(explicit)? {
        Some(loaded) => {
            info!(
                path = %loaded.file.path.display(),
                origin = %loaded.file.origin,
                "using config file"
            );
            Ok(loaded.config)
        }
        None => {
            debug!("no config file found");
            Ok(PinConfig::default())
        }
    }
}

/// Explicit files as given, directories searched recursively, and the
/// current directory when nothing is given.
fn collect_files(args: &[PathBuf], ignore_dirs: &[String]) -> Result<Vec<PathBuf>> {
    if args.is_empty() {
        return Ok(find_workflow_files(Path::new("."), ignore_dirs)?);
    }

    let mut files = Vec::new();
    for arg in args {
        if arg.is_dir() {
            files.extend(find_workflow_files(arg, ignore_dirs)?);
        } else {
            files.push(arg.clone());
        }
    }
    Ok(files)
}

fn display_path(path: &Path) -> String {
    path.strip_prefix(".").unwrap_or(path).display().to_string()
}

/// Helper: Display unified diff between original and updated content
fn display_diff(file: &Path, original: &str, updated: &str) {
    let name = display_path(file);
    println!("\n{}", format!("--- {name} (original)").dimmed());
    println!("{}", format!("+++ {name} (pinned)").dimmed());

    let diff = TextDiff::from_lines(original, updated);
    for hunk in diff.unified_diff().context_radius(2).iter_hunks() {
        println!("{}", hunk.header().to_string().cyan());
        for change in hunk.iter_changes() {
            let line = match change.tag() {
                ChangeTag::Delete => format!("-{change}").red(),
                ChangeTag::Insert => format!("+{change}").green(),
                ChangeTag::Equal => format!(" {change}").normal(),
            };
            print!("{line}");
            if change.missing_newline() {
                println!();
            }
        }
    }
}

fn print_error_chain(error: &dyn StdError) {
    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}

fn cmd_pin(settings: Settings, files: Vec<PathBuf>, dry_run: bool, show_diff: bool) -> Result<()> {
    let plan = SourcePlan::new(
        settings.api_server.as_deref(),
        settings.github_token.as_deref(),
        settings.ghes_github_token.as_deref(),
    )?;
    let resolver = plan
        .build_resolver()
        .context("failed to create GitHub API client")?;

    let files = collect_files(&files, &settings.ignore_dirs)?;
    if files.is_empty() {
        println!("{}", "No workflow files found".yellow());
        return Ok(());
    }

    if dry_run {
        println!("{}", "[DRY RUN - no files will be written]".cyan());
    }

    let mut pinner = Pinner::new(resolver, settings.pin);
    let summary = rewrite(&files, &RewriteOptions { dry_run }, |content| {
        pinner.apply(content)
    });

    for change in &summary.changed {
        let verb = if dry_run { "would pin" } else { "pinned" };
        println!("{} {}: {}", "✓".green(), display_path(&change.path), verb);
        if show_diff {
            display_diff(&change.path, &change.original, &change.updated);
        }
    }
    for failure in &summary.failures {
        eprintln!("{} {}: {}", "✗".red(), display_path(&failure.path), failure.error);
        print_error_chain(&failure.error);
    }

    println!();
    if summary.changed.is_empty() && !summary.has_failures() {
        println!(
            "{}",
            "No changes needed. All actions are already pinned or exempt.".green()
        );
    }
    println!("{}", "Summary:".bold());
    println!("  {} changed", format!("{}", summary.changed.len()).green());
    println!("  {} unchanged", format!("{}", summary.unchanged.len()).cyan());
    println!("  {} failed", format!("{}", summary.failures.len()).red());

    if summary.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_check(settings: Settings, files: Vec<PathBuf>) -> Result<()> {
    let files = collect_files(&files, &settings.ignore_dirs)?;

    let mut unpinned = 0usize;
    let mut failed = 0usize;
    for path in &files {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), display_path(path), e);
                failed += 1;
                continue;
            }
        };

        for (line, reference) in unpinned_references(&content, &settings.pin) {
            println!("{}:{}: {}", display_path(path), line, reference.to_string().yellow());
            unpinned += 1;
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} files checked", files.len());
    println!("  {} unpinned", format!("{}", unpinned).yellow());
    println!("  {} failed", format!("{}", failed).red());

    if unpinned > 0 || failed > 0 {
        std::process::exit(1);
    }

    println!("{}", "All actions are pinned.".green());
    Ok(())
}
