use crate::cli::CommonArgs;
use crate::parse::LogParser;
use crate::stats::{AuthorStats, ProjectStats, StatsEngine, WindowReport};
use crate::util::format_timestamp;
use anyhow::Context;
use chrono::{DateTime, Utc};
use console::style;

pub fn authors(common: CommonArgs, json: bool, ndjson: bool) -> anyhow::Result<()> {
    let data = LogParser::parse_file(&common.log)
        .with_context(|| format!("Failed to parse log {}", common.log.display()))?;
    let window = common.resolve_window().context("Failed to resolve time window")?;

    let engine = StatsEngine::new(&data);
    let report = engine.window_stats(&window);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if ndjson {
        output_ndjson(&report)?;
    } else {
        output_table(&report);
    }

    Ok(())
}

pub fn quartal(common: CommonArgs, json: bool, ndjson: bool) -> anyhow::Result<()> {
    let data = LogParser::parse_file(&common.log)
        .with_context(|| format!("Failed to parse log {}", common.log.display()))?;

    let engine = StatsEngine::new(&data);
    let series = engine.quartal_series();

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
    } else if ndjson {
        for window in &series {
            println!("{}", serde_json::to_string(window)?);
        }
    } else if series.is_empty() {
        println!("No commits in the log");
    } else {
        for window in &series {
            output_table(window);
            println!();
        }
    }

    Ok(())
}

pub fn report(common: CommonArgs, ndjson: bool) -> anyhow::Result<()> {
    let data = LogParser::parse_file(&common.log)
        .with_context(|| format!("Failed to parse log {}", common.log.display()))?;

    let engine = StatsEngine::new(&data);
    let output = engine.report(&common.log.display().to_string());

    if ndjson {
        println!("{}", serde_json::to_string(&output.all_time)?);
        for window in &output.quartals {
            println!("{}", serde_json::to_string(window)?);
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}

/// The projection contract: an ordered list of named field values, counts
/// rendered plain and ratios with two decimals. Field order is fixed and
/// consumed by the table renderer below as well as external tooling.
pub fn author_fields(stats: &AuthorStats) -> Vec<(&'static str, String)> {
    vec![
        ("author", stats.author.clone()),
        ("commit_number", stats.commit_number.to_string()),
        ("all_new_lines", stats.all_new_lines.to_string()),
        ("all_deleted_lines", stats.all_deleted_lines.to_string()),
        ("commits_per_day", format!("{:.2}", stats.commits_per_day)),
        ("files_per_commit", format!("{:.2}", stats.files_per_commit)),
        ("lines_per_commit", format!("{:.2}", stats.lines_per_commit)),
        ("commits_under_25", format!("{:.2}", stats.commits_under_25)),
        ("commits_above_500", format!("{:.2}", stats.commits_above_500)),
        ("test_line_ratio", format!("{:.2}", stats.test_line_ratio)),
        ("merge_commits", stats.merge_commits.to_string()),
    ]
}

/// The project field set: author-count in place of the author identity,
/// plus the window metadata (a sentinel stands in for the all-time window).
pub fn project_fields(project: &ProjectStats) -> Vec<(&'static str, String)> {
    vec![
        ("time_from", timestamp_or_sentinel(&project.time_from)),
        ("time_to", timestamp_or_sentinel(&project.time_to)),
        ("authors", project.authors.to_string()),
        ("commit_number", project.commit_number.to_string()),
        ("all_new_lines", project.all_new_lines.to_string()),
        ("all_deleted_lines", project.all_deleted_lines.to_string()),
        ("commits_per_day", format!("{:.2}", project.commits_per_day)),
        ("files_per_commit", format!("{:.2}", project.files_per_commit)),
        ("lines_per_commit", format!("{:.2}", project.lines_per_commit)),
        ("commits_under_25", format!("{:.2}", project.commits_under_25)),
        ("commits_above_500", format!("{:.2}", project.commits_above_500)),
        ("test_line_ratio", format!("{:.2}", project.test_line_ratio)),
        ("merge_commits", project.merge_commits.to_string()),
    ]
}

fn timestamp_or_sentinel(ts: &Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => format_timestamp(ts),
        None => "all time".to_string(),
    }
}

fn window_label(report: &WindowReport) -> String {
    match (&report.time_from, &report.time_to) {
        (None, None) => "all time".to_string(),
        (Some(from), Some(to)) => {
            format!("from {} to {}", format_timestamp(from), format_timestamp(to))
        }
        (Some(from), None) => format!("from {}", format_timestamp(from)),
        (None, Some(to)) => format!("until {}", format_timestamp(to)),
    }
}

fn output_ndjson(report: &WindowReport) -> anyhow::Result<()> {
    for author in &report.authors {
        println!("{}", serde_json::to_string(author)?);
    }
    if let Some(project) = &report.project {
        println!("{}", serde_json::to_string(project)?);
    }
    Ok(())
}

fn output_table(report: &WindowReport) {
    println!(
        "{}",
        style(format!("Window: {}", window_label(report))).bold()
    );

    if report.authors.is_empty() {
        println!("No qualifying authors in this window");
        return;
    }

    let names: Vec<&str> = author_fields(&report.authors[0])
        .iter()
        .map(|(name, _)| *name)
        .collect();
    let mut header = format!("{:<12}", names[0]);
    for name in &names[1..] {
        header.push_str(&format!(" {:>17}", name));
    }
    println!("{}", style(header).bold());
    println!("{}", "─".repeat(12 + 18 * (names.len() - 1)));

    for author in &report.authors {
        let fields = author_fields(author);
        let mut row = format!("{:<12}", fields[0].1);
        for (_, value) in &fields[1..] {
            row.push_str(&format!(" {:>17}", value));
        }
        println!("{row}");
    }

    if let Some(project) = &report.project {
        println!();
        println!("{}", style("Project totals").bold());
        for (name, value) in project_fields(project) {
            println!("  {:<18} {}", name, style(value).cyan());
        }
    }
}
