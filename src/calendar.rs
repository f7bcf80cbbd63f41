//! Markdown content calendar for a planned run.

use crate::campaign::PlannedPost;
use anyhow::Context as AnyhowContext;
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const SEPARATOR_WIDTH: usize = 80;

fn post_text(planned: &PlannedPost) -> String {
    match &planned.outcome {
        Ok(post) => post.content.clone(),
        Err(e) => format!("_No post generated: {}_", e),
    }
}

pub fn render_markdown(planned: &[PlannedPost], generated_on: NaiveDate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Content Calendar\n");
    let _ = writeln!(out, "Generated on: {}\n", generated_on.format("%Y-%m-%d"));

    let _ = writeln!(out, "## Weekly Content Calendar\n");
    let _ = writeln!(out, "| Day | Date | Platform | Theme | Post |");
    let _ = writeln!(out, "|-----|------|----------|-------|------|");
    for item in planned {
        let text = post_text(item).replace(|c: char| c == '\r' || c == '\n', " ").replace('|', "\\|");
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            item.slot.date.format("%A"),
            item.slot.date.format("%Y-%m-%d"),
            item.platform,
            item.slot.theme,
            text
        );
    }

    let _ = writeln!(out, "\n## Individual Posts\n");
    for item in planned {
        let _ = writeln!(
            out,
            "### {} ({}): {}\n",
            item.slot.date.format("%A"),
            item.platform,
            item.slot.theme
        );
        let _ = writeln!(out, "{}\n", post_text(item));
        let _ = writeln!(out, "{}\n", "-".repeat(SEPARATOR_WIDTH));
    }

    out
}

/// Writes `content_calendar_YYYYMMDD.md` into `dir` and returns its path.
pub fn write_calendar(
    dir: impl AsRef<Path>,
    planned: &[PlannedPost],
    generated_on: NaiveDate,
) -> anyhow::Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create calendar dir {}", dir.display()))?;

    let path = dir.join(format!(
        "content_calendar_{}.md",
        generated_on.format("%Y%m%d")
    ));
    fs::write(&path, render_markdown(planned, generated_on))
        .with_context(|| format!("Failed to write calendar {}", path.display()))?;
    Ok(path)
}
