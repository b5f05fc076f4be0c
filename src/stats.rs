use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::colors::RgbColor;
use crate::input::Table;
use crate::rows::{GroupId, GroupingOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingStats {
    pub total_rows: usize,
    pub multi_row_groups: usize,
    pub grouped_rows: usize,
    pub singleton_rows: usize,
    pub largest_group: usize,
}

impl GroupingStats {
    pub fn from_outcome(outcome: &GroupingOutcome) -> Self {
        let multi: Vec<usize> = outcome
            .groups()
            .iter()
            .filter(|g| !g.is_singleton())
            .map(|g| g.members.len())
            .collect();

        Self {
            total_rows: outcome.assignments().len(),
            multi_row_groups: multi.len(),
            grouped_rows: multi.iter().sum(),
            singleton_rows: outcome.singleton_groups(),
            largest_group: outcome
                .groups()
                .iter()
                .map(|g| g.members.len())
                .max()
                .unwrap_or(0),
        }
    }
}

#[derive(Debug)]
pub struct AnalysisResult {
    pub table: Table,
    pub outcome: GroupingOutcome,
    pub colors: BTreeMap<GroupId, RgbColor>,
    pub stats: GroupingStats,
    pub workbook_path: PathBuf,
}
