//! Data models for the split-and-send pipeline
//!
//! This module contains the in-memory table representation, the distribution
//! list with its send flags, partition files and the match key shared between them.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{DispatchError, Result};
use crate::validation::InputValidator;

/// A single spreadsheet cell value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    /// Blank cell; treated as a missing value
    #[default]
    Empty,
    /// Text value
    Text(String),
    /// Numeric value
    Number(f64),
    /// Boolean value
    Bool(bool),
    /// Date/time stored as an Excel serial number
    DateTime(f64),
    /// Spreadsheet error value such as `#N/A`
    Error(String),
}

impl Cell {
    /// Whether the cell counts as missing when grouping
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Text rendering used for grouping, file names and matching
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) | Self::Error(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => String::from(if *b { "True" } else { "False" }),
            Self::DateTime(serial) => excel_serial_to_datetime(*serial)
                .map_or_else(|| format_number(*serial), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Convert an Excel 1900-system serial number to a timestamp
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

/// A rectangular table with a header row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column names, in sheet order
    pub headers: Vec<String>,
    /// Data rows; a row may be shorter than the header
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create an empty table with the given headers
    #[must_use]
    pub const fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    /// Position of a column by exact name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Whether a column with this exact name exists
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `(row, col)`, or `Empty` when the row is short
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        const EMPTY: &Cell = &Cell::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(EMPTY)
    }

    /// Number of data rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copy of this table holding only the listed rows, in the given order
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: indices.iter().filter_map(|&i| self.rows.get(i).cloned()).collect(),
        }
    }
}

/// Send status of one distribution entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SentFlag {
    /// No file was emailed to this entry (yet)
    #[default]
    #[serde(rename = "Not Sent")]
    NotSent,
    /// The matched file was handed to the mail transport
    Sent,
    /// Sending the matched file failed
    Failed,
}

impl SentFlag {
    /// Label written into the flag column
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotSent => "Not Sent",
            Self::Sent => "Sent",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for SentFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized (category, identity) pair used to join partition files to recipients.
///
/// The category is the grouping column, the identity the sanitized group value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    category: String,
    identity: String,
}

impl MatchKey {
    /// Build a key, normalizing both parts
    #[must_use]
    pub fn new(category: &str, identity: &str) -> Self {
        Self {
            category: InputValidator::normalize_key(category),
            identity: InputValidator::normalize_key(identity),
        }
    }

    /// Normalized category
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Normalized identity
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

/// A file written by the partitioner
#[derive(Debug, Clone)]
pub struct PartitionFile {
    /// Grouping column the file belongs to (also its folder name)
    pub column: String,
    /// Group value as read from the records
    pub value: String,
    /// Sanitized file stem, without extension
    pub stem: String,
    /// Absolute path of the written file
    pub path: PathBuf,
    /// Number of record rows in the file
    pub rows: usize,
}

impl PartitionFile {
    /// File name including extension
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.xlsx", self.stem)
    }

    /// Key used to find recipients for this file
    #[must_use]
    pub fn match_key(&self) -> MatchKey {
        MatchKey::new(&self.column, &self.stem)
    }
}

/// Column names the distribution list must provide
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionColumns {
    /// Recipient name column
    pub name: String,
    /// Role column, compared against grouping column names
    pub designation: String,
    /// Recipient address column
    pub email: String,
    /// Status column added on export
    pub flag: String,
}

impl Default for DistributionColumns {
    fn default() -> Self {
        Self {
            name: "Name".to_string(),
            designation: "Designation".to_string(),
            email: "Email_ID".to_string(),
            flag: "Sent_Flag".to_string(),
        }
    }
}

/// A borrowed view of one distribution row
#[derive(Debug, Clone, Copy)]
pub struct DistributionEntry<'a> {
    /// Row index within the distribution table
    pub index: usize,
    /// Recipient name cell
    pub name: &'a Cell,
    /// Role cell
    pub designation: &'a Cell,
    /// Address cell
    pub email: &'a Cell,
}

/// The distribution list together with one send flag per row
#[derive(Debug, Clone)]
pub struct DistributionList {
    table: Table,
    columns: DistributionColumns,
    name_idx: usize,
    designation_idx: usize,
    email_idx: usize,
    flags: Vec<SentFlag>,
}

impl DistributionList {
    /// Wrap a loaded table, checking the required columns and resetting every flag to `Not Sent`
    pub fn from_table(mut table: Table, columns: &DistributionColumns) -> Result<Self> {
        let required = [&columns.name, &columns.designation, &columns.email];
        let missing: Vec<String> = required
            .iter()
            .filter(|c| !table.has_column(c))
            .map(|c| (*c).clone())
            .collect();
        if !missing.is_empty() {
            return Err(DispatchError::MissingColumns {
                table: "Distribution list".to_string(),
                columns: missing,
            });
        }

        // An existing flag column is replaced, never duplicated
        if let Some(idx) = table.column_index(&columns.flag) {
            table.headers.remove(idx);
            for row in &mut table.rows {
                if idx < row.len() {
                    row.remove(idx);
                }
            }
        }

        let lookup = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| DispatchError::MissingColumns {
                    table: "Distribution list".to_string(),
                    columns: vec![name.to_string()],
                })
        };
        let name_idx = lookup(&columns.name)?;
        let designation_idx = lookup(&columns.designation)?;
        let email_idx = lookup(&columns.email)?;

        let flags = vec![SentFlag::NotSent; table.len()];
        Ok(Self {
            table,
            columns: columns.clone(),
            name_idx,
            designation_idx,
            email_idx,
            flags,
        })
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the list has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Entry at `index`
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<DistributionEntry<'_>> {
        (index < self.len()).then(|| DistributionEntry {
            index,
            name: self.table.cell(index, self.name_idx),
            designation: self.table.cell(index, self.designation_idx),
            email: self.table.cell(index, self.email_idx),
        })
    }

    /// All entries in sheet order
    pub fn entries(&self) -> impl Iterator<Item = DistributionEntry<'_>> {
        (0..self.len()).filter_map(|i| self.entry(i))
    }

    /// Indices of entries eligible for `key`, in sheet order
    #[must_use]
    pub fn find_matches(&self, key: &MatchKey) -> Vec<usize> {
        self.entries()
            .filter(|e| !e.designation.is_missing() && !e.name.is_missing())
            .filter(|e| InputValidator::normalize_key(&e.designation.display()) == key.category())
            .filter(|e| InputValidator::normalize_key(&e.name.display()) == key.identity())
            .map(|e| e.index)
            .collect()
    }

    /// Current flags, one per row
    #[must_use]
    pub fn flags(&self) -> &[SentFlag] {
        &self.flags
    }

    /// Set the flag for each listed row
    pub fn set_flags(&mut self, indices: &[usize], flag: SentFlag) {
        for &i in indices {
            if let Some(slot) = self.flags.get_mut(i) {
                *slot = flag;
            }
        }
    }

    /// The list as a table with the flag column appended
    #[must_use]
    pub fn to_table(&self) -> Table {
        let width = self.table.headers.len();
        let mut headers = self.table.headers.clone();
        headers.push(self.columns.flag.clone());

        let rows = self
            .table
            .rows
            .iter()
            .zip(&self.flags)
            .map(|(row, flag)| {
                let mut out = row.clone();
                out.resize(width, Cell::Empty);
                out.push(Cell::Text(flag.as_str().to_string()));
                out
            })
            .collect();

        Table { headers, rows }
    }
}

/// Severity of an inline run notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Something completed
    Success,
    /// Operator should look at this, run continues
    Warning,
    /// A step failed, run continues
    Error,
}

/// Human-readable message surfaced to the operator during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Message text
    pub message: String,
}

impl Notice {
    /// Success notice
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    /// Warning notice
    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    /// Error notice
    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// A downloadable output of a run
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Suggested file name
    pub file_name: String,
    /// File contents
    pub bytes: Vec<u8>,
}
