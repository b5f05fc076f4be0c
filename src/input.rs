use std::io;
use std::path::Path;
use std::time::Instant;

use csv::{ReaderBuilder, StringRecord};
use tracing::info;

use crate::error::GroupingError;
use crate::rows::{RawRow, PHRASE_FIELD, URL_COUNT, URL_FIELDS, VOLUME_FIELD};

// Header names accepted for each required column, besides the canonical one.
const PHRASE_ALIASES: &[&str] = &["KW"];
const VOLUME_ALIASES: &[&str] = &["Vol"];
const URL_ALIASES: [&[&str]; URL_COUNT] = [&["url google 1"], &["url google 2"], &["url google 3"]];

/// The input table exactly as read: original headers and cells, in order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: StringRecord,
    pub records: Vec<StringRecord>,
}

/// Column positions of the required fields within a [`Table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub phrase: usize,
    pub volume: usize,
    pub urls: [usize; URL_COUNT],
}

impl Table {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Widest row in the table, headers included. Records may run past the header.
    pub fn width(&self) -> usize {
        self.records
            .iter()
            .map(StringRecord::len)
            .chain([self.headers.len()])
            .max()
            .unwrap_or(0)
    }

    /// Locates the required columns. A table with no records needs no columns.
    pub fn layout(&self) -> Result<Option<ColumnLayout>, GroupingError> {
        if self.records.is_empty() {
            return Ok(None);
        }
        let mut urls = [0; URL_COUNT];
        for (slot, (field, aliases)) in urls.iter_mut().zip(URL_FIELDS.into_iter().zip(URL_ALIASES)) {
            *slot = self.column(field, aliases)?;
        }
        Ok(Some(ColumnLayout {
            phrase: self.column(PHRASE_FIELD, PHRASE_ALIASES)?,
            volume: self.column(VOLUME_FIELD, VOLUME_ALIASES)?,
            urls,
        }))
    }

    fn column(&self, field: &'static str, aliases: &[&str]) -> Result<usize, GroupingError> {
        self.headers
            .iter()
            .map(str::trim)
            .position(|h| h == field || aliases.contains(&h))
            .ok_or(GroupingError::MissingColumn { field })
    }

    /// Pulls the required fields out of every record. Cells past the end of a short
    /// record come back as `None`.
    pub fn raw_rows(&self) -> Result<Vec<RawRow>, GroupingError> {
        let Some(layout) = self.layout()? else {
            return Ok(Vec::new());
        };
        let cell = |record: &StringRecord, idx: usize| record.get(idx).map(str::to_string);

        Ok(self
            .records
            .iter()
            .map(|record| RawRow {
                phrase: cell(record, layout.phrase),
                volume: cell(record, layout.volume),
                urls: layout.urls.map(|idx| cell(record, idx)),
            })
            .collect())
    }
}

pub fn read_table<R: io::Read>(reader: R) -> Result<Table, GroupingError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();
    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Table { headers, records })
}

pub fn load_table(path: &Path) -> Result<Table, GroupingError> {
    let start_time = Instant::now();
    info!(action = "start", component = "csv_input", file_path = ?path, "Reading keyword table");

    let file = std::fs::File::open(path)?;
    let table = read_table(io::BufReader::new(file))?;

    info!(
        action = "complete",
        component = "csv_input",
        row_count = table.len(),
        column_count = table.headers.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Keyword table loaded"
    );
    Ok(table)
}
