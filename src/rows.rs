use std::fmt;

use crate::error::GroupingError;

/// Number of candidate result URLs carried by every row.
pub const URL_COUNT: usize = 3;

pub const PHRASE_FIELD: &str = "phrase";
pub const VOLUME_FIELD: &str = "volume";
pub const URL_FIELDS: [&str; URL_COUNT] = ["URL-1", "URL-2", "URL-3"];

/// Opaque identity of an input row. Ordering follows input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(usize);

impl RowId {
    pub fn new(position: usize) -> Self {
        Self(position)
    }

    pub fn position(self) -> usize {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.0 + 1)
    }
}

/// Positive group number, stable only within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(u32);

impl GroupId {
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row as read from input, before required fields are checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub phrase: Option<String>,
    pub volume: Option<String>,
    pub urls: [Option<String>; URL_COUNT],
}

/// A validated keyword row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: RowId,
    pub phrase: String,
    pub volume: f64,
    pub urls: [String; URL_COUNT],
}

impl Row {
    pub fn new(id: RowId, phrase: impl Into<String>, volume: f64, urls: [&str; URL_COUNT]) -> Self {
        Self {
            id,
            phrase: phrase.into(),
            volume,
            urls: urls.map(str::to_string),
        }
    }

    /// Checks every required field of `raw`. Nothing is substituted for a missing value.
    pub fn from_raw(id: RowId, raw: &RawRow) -> Result<Self, GroupingError> {
        let phrase = raw.phrase.clone().ok_or(GroupingError::MissingField {
            row: id,
            field: PHRASE_FIELD,
        })?;

        let volume_text = raw
            .volume
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(GroupingError::MissingField {
                row: id,
                field: VOLUME_FIELD,
            })?;
        let volume = parse_volume(volume_text).ok_or_else(|| GroupingError::InvalidVolume {
            row: id,
            value: volume_text.to_string(),
        })?;

        let mut urls: [String; URL_COUNT] = Default::default();
        for (slot, (value, field)) in urls.iter_mut().zip(raw.urls.iter().zip(URL_FIELDS)) {
            *slot = value
                .clone()
                .ok_or(GroupingError::MissingField { row: id, field })?;
        }

        Ok(Self {
            id,
            phrase,
            volume,
            urls,
        })
    }
}

fn parse_volume(text: &str) -> Option<f64> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Group and main topic given to a single row.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub row: RowId,
    pub group: GroupId,
    pub main_topic: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: GroupId,
    pub members: Vec<RowId>,
    pub main_topic: String,
    pub total_volume: f64,
}

impl Group {
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

/// Result of one grouping run: every row assigned, groups in id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupingOutcome {
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) groups: Vec<Group>,
}

impl GroupingOutcome {
    /// Assignments in input row order.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn assignment(&self, row: RowId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.row == row)
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.get().checked_sub(1)? as usize)
    }

    pub fn multi_row_groups(&self) -> usize {
        self.groups.iter().filter(|g| !g.is_singleton()).count()
    }

    pub fn singleton_groups(&self) -> usize {
        self.groups.iter().filter(|g| g.is_singleton()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
