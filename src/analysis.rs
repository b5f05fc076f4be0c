use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::colors::{self, ColorScheme};
use crate::grouping::{self, GroupingOptions, GroupingStrategy};
use crate::stats::{AnalysisResult, GroupingStats};
use crate::utils::format_number;
use crate::{export, input, Args};

pub fn grouping_options(args: &Args) -> GroupingOptions {
    GroupingOptions {
        strategy: if args.transitive {
            GroupingStrategy::Transitive
        } else {
            GroupingStrategy::Sequential
        },
        ignore_blank_urls: args.ignore_blank_urls,
        workers: args.workers,
    }
}

pub fn color_scheme(args: &Args) -> Result<ColorScheme> {
    match args.seed {
        Some(seed) => Ok(ColorScheme::Seeded(seed)),
        None => Ok(ColorScheme::Palette(colors::load_palette(
            args.palette.as_deref(),
        )?)),
    }
}

/// Reads, groups and exports one keyword file. Either every output file is written or none is.
pub fn analyze_keywords(input_path: &Path, args: &Args) -> Result<AnalysisResult> {
    let total_start_time = Instant::now();
    info!(action = "start", component = "analysis", file_path = ?input_path, "Starting keyword grouping");

    let table = input::load_table(input_path)
        .with_context(|| format!("Failed to read {:?}", input_path))?;
    let raw_rows = table.raw_rows()?;
    let outcome = grouping::group_raw_rows(&raw_rows, &grouping_options(args))?;

    let scheme = color_scheme(args)?;
    let colors = scheme.assign(outcome.groups().iter().map(|g| g.id))?;

    export::export_results(
        &table,
        &outcome,
        &colors,
        &args.output,
        args.summary_csv.as_deref(),
    )
    .with_context(|| format!("Failed to write results {:?}", args.output))?;

    let stats = GroupingStats::from_outcome(&outcome);
    info!(
        action = "complete",
        component = "analysis",
        duration_ms = total_start_time.elapsed().as_millis(),
        "Keyword grouping completed successfully"
    );

    Ok(AnalysisResult {
        table,
        outcome,
        colors,
        stats,
        workbook_path: args.output.clone(),
    })
}

pub fn print_analysis_results(result: &AnalysisResult, args: &Args) {
    let stats = &result.stats;

    println!("\n--- Keyword Grouping ---");
    println!("Phrases analyzed: {}", format_number(stats.total_rows));
    println!(
        "Groups found: {} ({} phrases)",
        format_number(stats.multi_row_groups),
        format_number(stats.grouped_rows)
    );
    println!(
        "Phrases without a group: {}",
        format_number(stats.singleton_rows)
    );
    println!("Largest group: {} phrases", format_number(stats.largest_group));

    if let Some(top_count) = args.top {
        let mut largest: Vec<_> = result
            .outcome
            .groups()
            .iter()
            .filter(|g| !g.is_singleton())
            .collect();
        largest.sort_by(|a, b| b.members.len().cmp(&a.members.len()).then(a.id.cmp(&b.id)));

        println!(
            "\nTop {} largest groups:",
            std::cmp::min(top_count, largest.len())
        );
        for group in largest.iter().take(top_count) {
            let color = result
                .colors
                .get(&group.id)
                .map(|c| c.to_string())
                .unwrap_or_default();
            println!(
                "- #{} {}: {} phrases {}",
                group.id,
                group.main_topic,
                format_number(group.members.len()),
                color
            );
        }
    }

    println!("\nResults saved to {}", result.workbook_path.display());
}
