use crate::error::{GfResult, GroupingError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// A single recorded measurement. Cells that parse as finite numbers are numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Number(f64),
    Text(String),
}

impl AttrValue {
    /// Parses a raw cell. Empty and non-finite cells ("nan", "inf") count as missing.
    pub fn parse_cell(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(AttrValue::Number(v)),
            Ok(_) => None,
            Err(_) => Some(AttrValue::Text(s.to_string())),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(v) => Some(*v),
            AttrValue::Text(_) => None,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Number(v)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(AttrValue::as_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// At least one value and every present value is numeric
    Numeric,
    /// At least one textual value
    Text,
    /// Declared but no subject carries a value
    Empty,
}

/// The subject table a run works on. Column order follows the input header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    columns: Vec<String>,
    subjects: Vec<Subject>,
}

impl Cohort {
    pub fn new(columns: Vec<String>, subjects: Vec<Subject>) -> GfResult<Self> {
        let declared: HashSet<&str> = columns.iter().map(String::as_str).collect();
        if declared.len() != columns.len() {
            return Err(GroupingError::validation("duplicate column names"));
        }

        let mut seen = HashSet::new();
        for s in &subjects {
            if s.id.trim().is_empty() {
                return Err(GroupingError::validation("subject with empty id"));
            }
            if !seen.insert(s.id.as_str()) {
                return Err(GroupingError::Validation(format!(
                    "duplicate subject id '{}'",
                    s.id
                )));
            }
            if let Some(key) = s.attributes.keys().find(|k| !declared.contains(k.as_str())) {
                return Err(GroupingError::Validation(format!(
                    "subject '{}' carries undeclared attribute '{}'",
                    s.id, key
                )));
            }
            for (key, value) in &s.attributes {
                if let AttrValue::Number(v) = value {
                    if !v.is_finite() {
                        return Err(GroupingError::Validation(format!(
                            "subject '{}' has non-finite value {} for '{}'",
                            s.id, v, key
                        )));
                    }
                }
            }
        }

        Ok(Self { columns, subjects })
    }

    /// Builds a cohort whose columns are the attribute names in first-seen order.
    pub fn from_subjects(subjects: Vec<Subject>) -> GfResult<Self> {
        let mut columns: Vec<String> = Vec::new();
        for s in &subjects {
            for key in s.attributes.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        Self::new(columns, subjects)
    }

    /// Reads a header-led CSV table. The first column holds subject ids.
    pub fn from_csv_reader<R: Read>(reader: R) -> GfResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        if headers.len() < 2 {
            return Err(GroupingError::validation(
                "CSV needs an id column and at least one attribute column",
            ));
        }
        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut subjects = Vec::new();
        for (row_idx, record) in rdr.records().enumerate() {
            let rec = record?;
            if rec.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            let id = rec.get(0).unwrap_or_default();
            if id.is_empty() {
                return Err(GroupingError::Validation(format!(
                    "row {} has no subject id",
                    row_idx + 1
                )));
            }

            let mut subject = Subject::new(id);
            for (col, cell) in columns.iter().zip(rec.iter().skip(1)) {
                if let Some(value) = AttrValue::parse_cell(cell) {
                    subject.attributes.insert(col.clone(), value);
                }
            }
            subjects.push(subject);
        }

        debug!(
            "Loaded {} subjects with {} attribute columns",
            subjects.len(),
            columns.len()
        );
        Self::new(columns, subjects)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GfResult<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        if !self.has_column(name) {
            return None;
        }
        let mut any_value = false;
        for s in &self.subjects {
            match s.get(name) {
                Some(AttrValue::Text(_)) => return Some(ColumnKind::Text),
                Some(AttrValue::Number(_)) => any_value = true,
                None => {}
            }
        }
        Some(if any_value {
            ColumnKind::Numeric
        } else {
            ColumnKind::Empty
        })
    }

    /// Every column that is scored: numeric, in header order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| self.column_kind(c) == Some(ColumnKind::Numeric))
            .cloned()
            .collect()
    }

    /// Per-subject values of one column, `None` where missing or textual.
    pub fn numeric_values(&self, name: &str) -> Vec<Option<f64>> {
        self.subjects.iter().map(|s| s.number(name)).collect()
    }
}
