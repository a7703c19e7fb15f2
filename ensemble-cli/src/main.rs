//! Ensemble — multi-repository workspace orchestrator.
//!
//! # Usage
//!
//! ```text
//! ensemble setup [--no-build]
//! ensemble build [PROJECT...] [--clean]
//! ensemble test [PROJECT...] [--verbose] [--fail-fast]
//! ensemble status [--json] [--no-fetch]
//! ensemble clean [PROJECT...] [--deep] [--dry-run]
//! ensemble update [--clean] [--dry-run] [--no-build] [--shallow]
//! ensemble watch [PROJECT...]
//! ensemble order
//! ```
//!
//! Exit codes: `0` success, `1` a repository failed or a core build aborted
//! the run, `2` fatal error (registry, clone, install, lock).

mod commands;
mod console;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;

use commands::{
    build::BuildArgs, clean::CleanArgs, order::OrderArgs, setup::SetupArgs, status::StatusArgs,
    test::TestArgs, update::UpdateArgs, watch::WatchArgs,
};
use ensemble_core::{registry, Registry, RepoName, Workspace};

const EXIT_FATAL: u8 = 2;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "ensemble",
    version,
    about = "Clone, link, build and test a set of interdependent repositories",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone missing repositories, install, link local packages and build.
    Setup(SetupArgs),

    /// Run each project's build script in dependency order.
    Build(BuildArgs),

    /// Run each project's test script.
    Test(TestArgs),

    /// Show git and build health of every repository.
    Status(StatusArgs),

    /// Remove build artifacts (and with --deep, installed dependencies).
    Clean(CleanArgs),

    /// Pull every repository and rebuild what changed.
    Update(UpdateArgs),

    /// Rebuild repositories and their dependents when sources change.
    Watch(WatchArgs),

    /// Print the validated build order.
    Order(OrderArgs),
}

// ---------------------------------------------------------------------------
// Global options, resolved once into a Workspace
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Workspace root (default: current directory).
    #[arg(long, env = "ENSEMBLE_ROOT", global = true)]
    pub root: Option<PathBuf>,

    /// Registry file (default: <root>/config/repos.json).
    #[arg(long, env = "ENSEMBLE_REGISTRY", global = true)]
    pub registry: Option<PathBuf>,

    /// npm executable.
    #[arg(long, env = "ENSEMBLE_NPM", default_value = "npm", global = true)]
    pub npm: String,

    /// git executable.
    #[arg(long, env = "ENSEMBLE_GIT", default_value = "git", global = true)]
    pub git: String,

    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// A resolved workspace and its loaded registry.
pub struct Session {
    pub workspace: Workspace,
    pub registry: Registry,
}

impl GlobalArgs {
    pub fn workspace(&self) -> Result<Workspace> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("could not determine current directory")?,
        };
        let mut workspace = Workspace::new(root)
            .with_npm(self.npm.clone())
            .with_git(self.git.clone());
        if let Some(path) = &self.registry {
            workspace = workspace.with_registry(path.clone());
        }
        Ok(workspace)
    }

    pub fn session(&self) -> Result<Session> {
        let workspace = self.workspace()?;
        let registry = registry::load(&workspace).with_context(|| {
            format!(
                "failed to load registry {}",
                workspace.registry_path.display()
            )
        })?;
        tracing::debug!(
            root = %workspace.root.display(),
            repositories = registry.len(),
            "workspace loaded"
        );
        Ok(Session {
            workspace,
            registry,
        })
    }
}

/// Positional project names as repository names.
pub fn selection(projects: &[String]) -> Vec<RepoName> {
    projects.iter().map(|p| RepoName::from(p.as_str())).collect()
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let global = &cli.global;
    let result = match cli.command {
        Commands::Setup(args) => args.run(global),
        Commands::Build(args) => args.run(global),
        Commands::Test(args) => args.run(global),
        Commands::Status(args) => args.run(global),
        Commands::Clean(args) => args.run(global),
        Commands::Update(args) => args.run(global),
        Commands::Watch(args) => args.run(global),
        Commands::Order(args) => args.run(global),
    };

    match result {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn init_tracing(verbosity: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
