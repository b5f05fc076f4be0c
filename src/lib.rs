pub mod analysis;
pub mod args;
pub mod colors;
pub mod error;
pub mod export;
pub mod grouping;
pub mod input;
pub mod rows;
pub mod stats;
pub mod utils;

pub use analysis::{analyze_keywords, print_analysis_results};
pub use args::Args;
pub use colors::{init_default_palette, ColorScheme, RgbColor};
pub use error::GroupingError;
pub use grouping::{group_raw_rows, group_rows, GroupingOptions, GroupingStrategy};
pub use rows::{Assignment, Group, GroupId, GroupingOutcome, RawRow, Row, RowId};
pub use stats::{AnalysisResult, GroupingStats};
