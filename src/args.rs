use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "phrasegroup",
    about = "Group keyword phrases that share search result URLs and pick a main topic per group",
    version,
    long_about = None
)]
pub struct Args {
    /// CSV file with phrase, volume, URL-1, URL-2 and URL-3 columns
    #[arg(required_unless_present = "init")]
    pub input: Option<PathBuf>,

    /// Path of the exported workbook
    #[arg(short, long, default_value = "grouping_results.xlsx")]
    pub output: PathBuf,

    /// Also write one CSV line per group (id, main topic, size, total volume)
    #[arg(long)]
    pub summary_csv: Option<PathBuf>,

    /// Number of largest groups to display
    #[arg(short, long)]
    pub top: Option<usize>,

    /// Path to custom group color palette file
    #[arg(short, long)]
    pub palette: Option<PathBuf>,

    /// Use random group colors generated from this seed instead of the palette
    #[arg(long, conflicts_with = "palette")]
    pub seed: Option<u64>,

    /// Merge groups transitively through shared URLs instead of the forward scan
    #[arg(long)]
    pub transitive: bool,

    /// Do not treat blank URL cells as a shared URL
    #[arg(long)]
    pub ignore_blank_urls: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Number of worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Initialize group_palette.txt with the default colors
    #[arg(long)]
    pub init: bool,
}
