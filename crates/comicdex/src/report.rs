//! 🍽️ Tables for humans. The machines get the tracing logs; you get these.
//!
//! Borderless comfy-tables, numbers with commas, nothing that needs a legend.

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};

use crate::bulk::BulkStats;
use crate::collector::CollectReport;
use crate::progress::format_number;
use crate::search::SearchEnvelope;

fn blank_table() -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn count_row(label: &str, n: u64) -> Vec<Cell> {
    vec![
        Cell::new(label),
        Cell::new(format_number(n)).set_alignment(CellAlignment::Right),
    ]
}

/// 📡 How the fan-out went.
pub fn collect_table(report: &CollectReport) -> Table {
    let mut table = blank_table();
    table.add_row(count_row("📋 requested", report.requested as u64));
    table.add_row(count_row("✅ fetched", report.succeeded() as u64));
    table.add_row(count_row("💀 failed", report.failed() as u64));
    if report.aborted > 0 {
        table.add_row(count_row("🧨 aborted", report.aborted as u64));
    }
    table
}

/// 📊 The bulk indexer's final tally.
pub fn stats_table(stats: &BulkStats) -> Table {
    let mut table = blank_table();
    table.add_row(count_row("📥 added", stats.num_added));
    table.add_row(count_row("📤 flushed", stats.num_flushed));
    table.add_row(count_row("✅ indexed", stats.num_indexed));
    table.add_row(count_row("🆕 created", stats.num_created));
    table.add_row(count_row("🔁 updated", stats.num_updated));
    table.add_row(count_row("💀 failed", stats.num_failed));
    table.add_row(count_row("📡 requests", stats.num_requests));
    table.add_row(count_row("📦 bytes", stats.flushed_bytes));
    table
}

/// 🔎 One-line summary of the envelope: total, relation, timing, shards.
pub fn envelope_summary(envelope: &SearchEnvelope) -> String {
    format!(
        "🔎 {} hits ({}) in {}ms, shards {}/{} ok, {} skipped, {} failed{}",
        format_number(envelope.hits.total.value),
        envelope.hits.total.relation,
        envelope.took,
        envelope.shards.successful,
        envelope.shards.total,
        envelope.shards.skipped,
        envelope.shards.failed,
        if envelope.timed_out { " ⏱️ TIMED OUT" } else { "" }
    )
}

/// 📰 One row per hit with the fields worth reading at a terminal.
pub fn hits_table(envelope: &SearchEnvelope) -> Table {
    let mut table = blank_table();
    table.set_header(vec!["ID", "Score", "Num", "Title", "Day", "News", "Alt"]);
    for hit in &envelope.hits.hits {
        let comic = &hit.source;
        table.add_row(vec![
            Cell::new(&hit.id),
            Cell::new(
                hit.score
                    .map(|score| format!("{score:.3}"))
                    .unwrap_or_else(|| "-".to_string()),
            )
            .set_alignment(CellAlignment::Right),
            Cell::new(comic.num).set_alignment(CellAlignment::Right),
            Cell::new(&comic.title),
            Cell::new(&comic.day),
            Cell::new(&comic.news),
            Cell::new(&comic.alt),
        ]);
    }
    table
}
