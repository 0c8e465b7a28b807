//! Output formatting utilities for the CLI.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::domain::models::{StatsSnapshot, WriteBackSnapshot};

/// Result of a command that can be rendered for humans or as JSON.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
        );
    } else {
        println!("{}", result.to_human());
    }
}

fn metric_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![Cell::new("METRIC"), Cell::new("VALUE")]);
    table
}

fn push_row(table: &mut Table, name: &str, value: impl ToString) {
    table.add_row(vec![
        Cell::new(name),
        Cell::new(value.to_string()).set_alignment(CellAlignment::Right),
    ]);
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Render cache statistics as a two-column table.
pub fn stats_table(stats: &StatsSnapshot) -> Table {
    let mut table = metric_table();
    push_row(&mut table, "requests", stats.total_requests);
    push_row(&mut table, "l1 hits", stats.l1_hits);
    push_row(&mut table, "l1 misses", stats.l1_misses);
    push_row(&mut table, "l2 hits", stats.l2_hits);
    push_row(&mut table, "l2 misses", stats.l2_misses);
    push_row(&mut table, "sets", stats.sets);
    push_row(&mut table, "deletes", stats.deletes);
    push_row(&mut table, "evictions", stats.evictions);
    push_row(&mut table, "expirations", stats.expirations);
    push_row(&mut table, "l1 hit rate", percent(stats.l1_hit_rate));
    push_row(&mut table, "l2 hit rate", percent(stats.l2_hit_rate));
    push_row(&mut table, "overall hit rate", percent(stats.overall_hit_rate));
    push_row(
        &mut table,
        "l1 size",
        format!("{}/{}", stats.l1_size, stats.l1_max_size),
    );
    table
}

/// Render write-back worker counters as a two-column table.
pub fn write_back_table(stats: &WriteBackSnapshot) -> Table {
    let mut table = metric_table();
    push_row(&mut table, "enqueued", stats.enqueued);
    push_row(&mut table, "completed", stats.completed);
    push_row(&mut table, "failed", stats.failed);
    push_row(&mut table, "dropped", stats.dropped);
    push_row(&mut table, "skipped", stats.skipped);
    push_row(&mut table, "abandoned", stats.abandoned);
    table
}
