//! `ensemble status` — git and build health of every repository.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use ensemble_core::RepoName;
use ensemble_exec::{git::CommitSummary, SystemRunner};
use ensemble_ops::{
    status, Context, Health, HealthSummary, RepoStatus, Silent, StatusOptions, StatusReport,
};

use crate::GlobalArgs;

/// Arguments for `ensemble status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Skip the network check against each remote.
    #[arg(long)]
    pub no_fetch: bool,
}

impl StatusArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<i32> {
        let session = global.session()?;
        let runner = SystemRunner;
        let ctx = Context::new(&session.workspace, &session.registry, &runner);
        let options = StatusOptions {
            fetch: !self.no_fetch,
        };

        let report = status::status(&ctx, &options, &mut Silent);
        if self.json {
            print_json(&report)?;
        } else {
            print_table(&report);
        }
        Ok(0)
    }
}

#[derive(Serialize)]
struct StatusReportJson<'a> {
    healthy: bool,
    summary: SummaryJson<'a>,
    suggestions: Vec<String>,
    repositories: Vec<RepoStatusJson<'a>>,
}

#[derive(Serialize)]
struct SummaryJson<'a> {
    not_cloned: Vec<&'a str>,
    no_build: Vec<&'a str>,
    uncommitted: Vec<&'a str>,
    behind: Vec<&'a str>,
    no_tests: Vec<&'a str>,
}

#[derive(Serialize)]
struct RepoStatusJson<'a> {
    name: &'a str,
    directory: String,
    core: bool,
    cloned: bool,
    branch: Option<&'a str>,
    last_commit: Option<&'a CommitSummary>,
    dirty: bool,
    ahead: u32,
    behind: u32,
    has_build: bool,
    has_tests: bool,
    health: &'static str,
    health_label: String,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "branch")]
    branch: String,
    #[tabled(rename = "last commit")]
    last_commit: String,
    #[tabled(rename = "changes")]
    changes: String,
    #[tabled(rename = "build")]
    build: String,
    #[tabled(rename = "health")]
    health: String,
}

fn print_json(report: &StatusReport) -> Result<()> {
    let summary = &report.summary;
    let payload = StatusReportJson {
        healthy: summary.is_healthy(),
        summary: SummaryJson {
            not_cloned: names(&summary.not_cloned),
            no_build: names(&summary.no_build),
            uncommitted: names(&summary.uncommitted),
            behind: names(&summary.behind),
            no_tests: names(&summary.no_tests),
        },
        suggestions: summary.suggestions(),
        repositories: report.repos.iter().map(repo_json).collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn names(list: &[RepoName]) -> Vec<&str> {
    list.iter().map(RepoName::as_str).collect()
}

fn repo_json(repo: &RepoStatus) -> RepoStatusJson<'_> {
    RepoStatusJson {
        name: repo.name.as_str(),
        directory: repo.directory.display().to_string(),
        core: repo.core,
        cloned: repo.cloned,
        branch: repo.branch.as_deref(),
        last_commit: repo.last_commit.as_ref(),
        dirty: repo.dirty,
        ahead: repo.ahead,
        behind: repo.behind,
        has_build: repo.has_build,
        has_tests: repo.has_test_script,
        health: repo.health.key(),
        health_label: repo.health.to_string(),
    }
}

fn print_table(report: &StatusReport) {
    println!(
        "Ensemble v{} | {} repositories",
        env!("CARGO_PKG_VERSION"),
        report.repos.len()
    );
    if report.repos.is_empty() {
        println!("No repositories registered.");
        return;
    }

    let rows: Vec<StatusTableRow> = report
        .repos
        .iter()
        .map(|repo| StatusTableRow {
            repository: if repo.core {
                format!("{} (core)", repo.name)
            } else {
                repo.name.to_string()
            },
            branch: repo.branch.clone().unwrap_or_else(|| "-".to_string()),
            last_commit: repo
                .last_commit
                .as_ref()
                .map(commit_cell)
                .unwrap_or_else(|| "-".to_string()),
            changes: changes_cell(repo),
            build: if !repo.cloned {
                "-".to_string()
            } else if repo.has_build {
                "✓".to_string()
            } else {
                "✗".to_string()
            },
            health: health_cell(repo.health),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    print_summary(&report.summary);
}

fn commit_cell(commit: &CommitSummary) -> String {
    let short: String = commit.hash.chars().take(7).collect();
    let mut subject: String = commit.subject.chars().take(40).collect();
    if commit.subject.chars().count() > 40 {
        subject.push('…');
    }
    format!("{short} {subject}")
}

fn changes_cell(repo: &RepoStatus) -> String {
    if !repo.cloned {
        return "-".to_string();
    }
    let mut parts = Vec::new();
    if repo.dirty {
        parts.push("uncommitted".to_string());
    }
    if repo.ahead > 0 {
        parts.push(format!("↑{}", repo.ahead));
    }
    if repo.behind > 0 {
        parts.push(format!("↓{}", repo.behind));
    }
    if parts.is_empty() {
        "clean".to_string()
    } else {
        parts.join(" ")
    }
}

fn health_cell(health: Health) -> String {
    let label = health.to_string();
    match health {
        Health::Ok => format!("{} {}", "■".green().bold(), label),
        Health::Behind(_) => format!("{} {}", "■".cyan().bold(), label),
        Health::Uncommitted => format!("{} {}", "■".yellow().bold(), label),
        Health::NoBuild => format!("{} {}", "■".magenta().bold(), label),
        Health::NotCloned => format!("{} {}", "■".red().bold(), label),
    }
}

fn print_summary(summary: &HealthSummary) {
    println!();
    if summary.is_healthy() {
        println!("{}", "All repositories are healthy.".green().bold());
    } else {
        let line = |label: &str, list: &[RepoName]| {
            if !list.is_empty() {
                println!("  {label}: {}", names(list).join(", "));
            }
        };
        line("not cloned", &summary.not_cloned);
        line("no build", &summary.no_build);
        line("uncommitted", &summary.uncommitted);
        line("behind remote", &summary.behind);
    }
    if !summary.no_tests.is_empty() {
        println!(
            "  {}: {}",
            "no test script".bright_black(),
            names(&summary.no_tests).join(", ")
        );
    }

    let suggestions = summary.suggestions();
    if !suggestions.is_empty() {
        println!();
        for suggestion in suggestions {
            println!("→ {suggestion}");
        }
    }
}
