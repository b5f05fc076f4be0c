use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;

use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, Worksheet, XlsxError};
use serde::Serialize;
use tracing::{info, warn};

use crate::colors::RgbColor;
use crate::error::GroupingError;
use crate::input::Table;
use crate::rows::{GroupId, GroupingOutcome};

pub const SHEET_NAME: &str = "Results";
pub const GROUP_ID_HEADER: &str = "group id";
pub const MAIN_TOPIC_HEADER: &str = "main topic";

/// One line of the per-group summary CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group_id: u32,
    pub main_topic: String,
    pub size: usize,
    pub total_volume: f64,
}

pub fn summarize_groups(outcome: &GroupingOutcome) -> Vec<GroupSummary> {
    outcome
        .groups()
        .iter()
        .map(|group| GroupSummary {
            group_id: group.id.get(),
            main_topic: group.main_topic.clone(),
            size: group.members.len(),
            total_volume: group.total_volume,
        })
        .collect()
}

pub fn group_summary_csv(outcome: &GroupingOutcome) -> Result<Vec<u8>, GroupingError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for summary in summarize_groups(outcome) {
        writer.serialize(summary)?;
    }
    writer
        .into_inner()
        .map_err(|e| GroupingError::Io(io::Error::new(e.error().kind(), e.error().to_string())))
}

fn fill_format(color: RgbColor) -> Format {
    Format::new()
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(color.rgb()))
}

fn sheet_row(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

fn sheet_col(index: usize) -> u16 {
    u16::try_from(index).unwrap_or(u16::MAX)
}

fn write_header(worksheet: &mut Worksheet, table: &Table, width: usize) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, sheet_col(col), header, &bold)?;
    }
    worksheet.write_string_with_format(0, sheet_col(width), GROUP_ID_HEADER, &bold)?;
    worksheet.write_string_with_format(0, sheet_col(width + 1), MAIN_TOPIC_HEADER, &bold)?;
    Ok(())
}

/// Builds the results workbook: original columns untouched, then group id and main topic.
/// Every cell of a data row is filled with its group's color.
pub fn build_workbook(
    table: &Table,
    outcome: &GroupingOutcome,
    colors: &BTreeMap<GroupId, RgbColor>,
) -> Result<Workbook, GroupingError> {
    let volume_col = table.layout()?.map(|layout| layout.volume);
    let formats: HashMap<GroupId, Format> = colors
        .iter()
        .map(|(&id, &color)| (id, fill_format(color)))
        .collect();
    let plain = Format::new();
    let width = table.width();

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;
    write_header(worksheet, table, width)?;
    worksheet.set_freeze_panes(1, 0)?;

    for (record, assignment) in table.records.iter().zip(outcome.assignments()) {
        let row = sheet_row(assignment.row.position() + 1);
        let format = formats.get(&assignment.group).unwrap_or(&plain);

        // Short records are padded so the computed columns stay aligned.
        for col in 0..width {
            let cell = record.get(col).unwrap_or("");
            let number = (Some(col) == volume_col)
                .then(|| cell.trim().parse::<f64>().ok())
                .flatten();
            match number {
                Some(value) => {
                    worksheet.write_number_with_format(row, sheet_col(col), value, format)?
                }
                None => worksheet.write_string_with_format(row, sheet_col(col), cell, format)?,
            };
        }
        worksheet.write_number_with_format(
            row,
            sheet_col(width),
            f64::from(assignment.group.get()),
            format,
        )?;
        worksheet.write_string_with_format(
            row,
            sheet_col(width + 1),
            assignment.main_topic.as_str(),
            format,
        )?;
    }

    worksheet.autofit();
    Ok(workbook)
}

/// Writes every file or none: on a failed write, files already written are removed.
fn write_all(outputs: &[(&Path, Vec<u8>)]) -> Result<(), GroupingError> {
    for (written, (path, bytes)) in outputs.iter().enumerate() {
        if let Err(e) = fs::write(path, bytes) {
            for (done, _) in &outputs[..written] {
                if let Err(cleanup) = fs::remove_file(done) {
                    warn!(action = "cleanup", component = "export", file_path = ?done, error = %cleanup, "Failed to remove partial output");
                }
            }
            return Err(e.into());
        }
    }
    Ok(())
}

/// Renders the workbook and the optional group summary in memory, then writes both.
pub fn export_results(
    table: &Table,
    outcome: &GroupingOutcome,
    colors: &BTreeMap<GroupId, RgbColor>,
    workbook_path: &Path,
    summary_path: Option<&Path>,
) -> Result<(), GroupingError> {
    let start_time = Instant::now();
    info!(action = "start", component = "export", file_path = ?workbook_path, "Writing results");

    let mut outputs = vec![(workbook_path, build_workbook(table, outcome, colors)?.save_to_buffer()?)];
    if let Some(path) = summary_path {
        outputs.push((path, group_summary_csv(outcome)?));
    }
    write_all(&outputs)?;

    info!(
        action = "complete",
        component = "export",
        row_count = table.len(),
        file_count = outputs.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Results written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::{group_raw_rows, GroupingOptions};
    use crate::input::read_table;

    #[test]
    fn summary_lists_every_group_in_id_order() {
        let data = "phrase,volume,URL-1,URL-2,URL-3\na,1,u,x,y\nb,3,u,p,q\nc,2,k,l,m\n";
        let table = read_table(data.as_bytes()).unwrap();
        let outcome = group_raw_rows(&table.raw_rows().unwrap(), &GroupingOptions::default()).unwrap();

        let summary = summarize_groups(&outcome);
        assert_eq!(
            summary,
            vec![
                GroupSummary { group_id: 1, main_topic: "b".into(), size: 2, total_volume: 4.0 },
                GroupSummary { group_id: 2, main_topic: "c".into(), size: 1, total_volume: 2.0 },
            ]
        );
    }

    #[test]
    fn workbook_saves_to_buffer() {
        let data = "phrase,volume,URL-1,URL-2,URL-3\na,1,u,x,y\n";
        let table = read_table(data.as_bytes()).unwrap();
        let outcome = group_raw_rows(&table.raw_rows().unwrap(), &GroupingOptions::default()).unwrap();
        let colors = BTreeMap::from([(GroupId::first(), RgbColor::new(0xDAEEF3))]);

        let mut workbook = build_workbook(&table, &outcome, &colors).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn summary_csv_has_header_and_one_line_per_group() {
        let data = "phrase,volume,URL-1,URL-2,URL-3\na,1,u,x,y\nb,2,k,l,m\n";
        let table = read_table(data.as_bytes()).unwrap();
        let outcome = group_raw_rows(&table.raw_rows().unwrap(), &GroupingOptions::default()).unwrap();

        let text = String::from_utf8(group_summary_csv(&outcome).unwrap()).unwrap();
        assert_eq!(text, "group_id,main_topic,size,total_volume\n1,a,1,1.0\n2,b,1,2.0\n");
    }

    #[test]
    fn failed_write_removes_earlier_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.xlsx");
        let blocked = dir.path().to_path_buf();

        let err = write_all(&[(first.as_path(), b"data".to_vec()), (blocked.as_path(), b"x".to_vec())]);
        assert!(err.is_err());
        assert!(!first.exists());
    }
}
