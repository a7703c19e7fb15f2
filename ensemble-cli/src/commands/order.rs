//! `ensemble order` — print the validated build order.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use ensemble_core::RepoName;

use crate::GlobalArgs;

/// Arguments for `ensemble order`.
#[derive(Args, Debug)]
pub struct OrderArgs {}

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "core")]
    core: String,
    #[tabled(rename = "depends on")]
    depends_on: String,
    #[tabled(rename = "dependents")]
    dependents: String,
}

impl OrderArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<i32> {
        let session = global.session()?;
        let registry = &session.registry;
        let graph = registry.graph();

        let rows: Vec<OrderRow> = registry
            .build_order()
            .iter()
            .enumerate()
            .map(|(index, name)| OrderRow {
                position: index + 1,
                repository: name.to_string(),
                core: if registry.get(name).is_some_and(|d| d.core) {
                    "yes".to_string()
                } else {
                    String::new()
                },
                depends_on: join(graph.dependencies_of(name)),
                dependents: join(graph.direct_dependents(name)),
            })
            .collect();

        if rows.is_empty() {
            println!("No repositories registered.");
            return Ok(0);
        }
        let source = if registry.has_declared_order() {
            "declared build_order"
        } else {
            "derived from dependencies"
        };
        println!("{} ({})", "Build order".bold(), source.bright_black());
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(0)
    }
}

fn join(names: impl IntoIterator<Item = RepoName>) -> String {
    let names: Vec<String> = names.into_iter().map(|n| n.to_string()).collect();
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}
