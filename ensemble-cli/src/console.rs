//! Terminal rendering: per-repository progress lines and summary tables.

use colored::{ColoredString, Colorize};
use tabled::{settings::Style, Table, Tabled};

use ensemble_core::RepoName;
use ensemble_ops::{Action, Progress, RepoOutcome, Report};

/// Prints one line when a repository starts and one when it finishes.
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn started(&mut self, action: Action, name: &RepoName) {
        println!("{} {} {}", action_icon(action), action.verb(), name.as_str().bold());
    }

    fn finished(&mut self, _action: Action, name: &RepoName, outcome: &RepoOutcome) {
        println!("   {} {} {}", outcome_icon(outcome), name, outcome_label(outcome));
    }

    fn phase(&mut self, message: &str) {
        println!("{} {}", "▸".cyan().bold(), message);
    }
}

fn action_icon(action: Action) -> &'static str {
    match action {
        Action::Clone => "📥",
        Action::Link => "🔗",
        Action::Build => "🔨",
        Action::Test => "🧪",
        Action::Clean => "🧹",
        Action::Update => "🔄",
        Action::Status => "🔍",
    }
}

pub fn outcome_icon(outcome: &RepoOutcome) -> &'static str {
    match outcome {
        RepoOutcome::Success | RepoOutcome::UpToDate => "✅",
        RepoOutcome::Failed { .. } => "❌",
        RepoOutcome::Error { .. } => "💥",
        RepoOutcome::Missing => "⚠️",
        RepoOutcome::NoScript => "⏭️",
        RepoOutcome::Skipped => "⏸️",
        RepoOutcome::Updated { .. } | RepoOutcome::WouldUpdate { .. } => "⬆️",
    }
}

pub fn outcome_label(outcome: &RepoOutcome) -> ColoredString {
    let text = outcome.to_string();
    match outcome {
        RepoOutcome::Success | RepoOutcome::UpToDate => text.green(),
        RepoOutcome::Failed { .. } | RepoOutcome::Error { .. } => text.red().bold(),
        RepoOutcome::Missing | RepoOutcome::Skipped => text.yellow(),
        RepoOutcome::NoScript => text.bright_black(),
        RepoOutcome::Updated { .. } | RepoOutcome::WouldUpdate { .. } => text.cyan(),
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "result")]
    result: String,
    #[tabled(rename = "detail")]
    detail: String,
}

/// Table of every outcome, then the counts line, then failure output tails.
pub fn print_report(title: &str, report: &Report) {
    if report.is_empty() {
        println!("{title}: nothing to do.");
        return;
    }

    let rows: Vec<SummaryRow> = report
        .entries()
        .iter()
        .map(|(name, outcome)| SummaryRow {
            repository: name.to_string(),
            result: format!("{} {}", outcome_icon(outcome), outcome.label()),
            detail: outcome
                .reason()
                .and_then(|r| r.lines().next())
                .unwrap_or("")
                .to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());

    println!();
    println!("{}", title.bold());
    println!("{table}");
    println!("{}", tally_line(report));

    for (name, outcome) in report.entries() {
        let Some(reason) = outcome.reason() else {
            continue;
        };
        let tail: Vec<&str> = reason.lines().skip(1).collect();
        if tail.is_empty() {
            continue;
        }
        println!();
        println!("{} {}", "──".bright_black(), name.as_str().red().bold());
        for line in tail {
            println!("   {line}");
        }
    }
}

fn tally_line(report: &Report) -> String {
    let tally = report.tally();
    let mut parts = Vec::new();
    let mut push = |count: usize, label: &str, paint: fn(&str) -> ColoredString| {
        if count > 0 {
            parts.push(paint(&format!("{count} {label}")).to_string());
        }
    };
    push(tally.success, "succeeded", |s| s.green());
    push(tally.updated, "updated", |s| s.cyan());
    push(tally.up_to_date, "up to date", |s| s.green());
    push(tally.failed, "failed", |s| s.red());
    push(tally.error, "errored", |s| s.red());
    push(tally.missing, "missing", |s| s.yellow());
    push(tally.no_script, "without script", |s| s.bright_black());
    push(tally.skipped, "skipped", |s| s.yellow());
    parts.join(", ")
}
