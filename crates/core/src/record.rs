//! Treatment record model and reader.
//!
//! A [`TreatmentRecord`] is read from a [`NormalizedRecord`] on a best-effort basis. Reading
//! never fails: missing fields become empty strings or zero, and malformed sub-records are
//! skipped and reported as [`ShapingWarning`]s so that a partially-malformed chart can still be
//! printed.
//!
//! ## Wire Format
//!
//! ```text
//! {
//!   "Name": "...", "Age_year": 3, "Age_month": "4", "Sex": "...",
//!   "bed_number": 12, "uhid": "...",
//!   "Diagnosis": "...", "Consultants": "...", "JR": "...", "SR": "...",
//!   "each_entry_layout": {
//!     "entry_1": {
//!       "title": "Antimicrobials",
//!       "columns": ["day", "dose"],                      // optional
//!       "subtitles": {
//!         "subtitle_1": {"content": "...", "day": "D1", "dose": "500mg"}
//!       }
//!     }
//!   },
//!   "each_table_row_layout": {
//!     "row_1": {"row_header_name": "Date", "row_header_description": "2024-01-01"}
//!   }
//! }
//! ```
//!
//! Object order is preserved, so groups, rows and parameter rows keep their input order.

use crate::constants::{
    KEY_AGE_MONTHS, KEY_AGE_YEARS, KEY_BED, KEY_BED_ALIAS, KEY_CONSULTANTS, KEY_DIAGNOSIS,
    KEY_ENTRY_GROUPS, KEY_ENTRY_GROUPS_ALIAS, KEY_GROUP_COLUMNS, KEY_GROUP_SUBTITLES,
    KEY_GROUP_TITLE, KEY_JUNIOR_RESIDENTS, KEY_NAME, KEY_PARAMETER_DESCRIPTION,
    KEY_PARAMETER_LABEL, KEY_PARAMETER_ROWS, KEY_PARAMETER_ROWS_ALIAS, KEY_ROW_CONTENT,
    KEY_SENIOR_RESIDENTS, KEY_SEX, KEY_UHID,
};
use crate::normalize::NormalizedRecord;
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// COLUMNS
// ============================================================================

/// A recognised treatment-table column.
///
/// `Content` is always the first column of a table; the others are optional.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    Content,
    Day,
    Dose,
    Volume,
    Rate,
}

impl Column {
    /// Optional columns in their canonical order.
    pub const OPTIONAL: [Column; 4] = [Column::Day, Column::Dose, Column::Volume, Column::Rate];

    /// The record key for this column.
    pub fn key(self) -> &'static str {
        match self {
            Column::Content => KEY_ROW_CONTENT,
            Column::Day => "day",
            Column::Dose => "dose",
            Column::Volume => "volume",
            Column::Rate => "rate",
        }
    }

    /// Header text for an optional column: the capitalised key.
    pub fn header(self) -> &'static str {
        match self {
            Column::Content => "Content",
            Column::Day => "Day",
            Column::Dose => "Dose",
            Column::Volume => "Volume",
            Column::Rate => "Rate",
        }
    }

    /// Parses a record key, ignoring case and surrounding whitespace.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        [Column::Content]
            .into_iter()
            .chain(Column::OPTIONAL)
            .find(|column| column.key().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// WARNINGS
// ============================================================================

/// A non-fatal problem found while reading a record.
///
/// The offending sub-record is skipped; the rest of the chart is still produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapingWarning {
    /// Dotted path of the offending value, e.g. `each_entry_layout.entry_2.subtitles.s1`.
    pub location: String,
    pub message: String,
}

impl ShapingWarning {
    fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ShapingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Collects warnings and mirrors each one to the log.
#[derive(Default)]
struct Warnings(Vec<ShapingWarning>);

impl Warnings {
    fn push(&mut self, location: impl Into<String>, message: impl Into<String>) {
        let warning = ShapingWarning::new(location, message);
        tracing::warn!(
            location = %warning.location,
            "skipping malformed record data: {}",
            warning.message
        );
        self.0.push(warning);
    }
}

// ============================================================================
// RECORD MODEL
// ============================================================================

/// One treatment line within an entry group.
///
/// Strings are as entered (after normalisation); sanitisation happens during shaping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubtitleRow {
    pub content: String,
    /// Optional fields in the order they appeared in the input.
    pub fields: Vec<(Column, String)>,
}

impl SubtitleRow {
    /// Returns the raw value for `column`, if the row carries it.
    pub fn value(&self, column: Column) -> Option<&str> {
        match column {
            Column::Content => Some(self.content.as_str()),
            other => self
                .fields
                .iter()
                .find(|(c, _)| *c == other)
                .map(|(_, v)| v.as_str()),
        }
    }
}

/// One treatment category, e.g. "Antimicrobials".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryGroup {
    pub title: String,
    /// Explicitly declared optional columns, in declared order. `None` means infer.
    pub columns: Option<Vec<Column>>,
    pub rows: Vec<SubtitleRow>,
}

/// One label/value pair for the parameter table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterEntry {
    pub label: String,
    pub description: String,
}

/// The root input of a chart.
///
/// Constructed once per request and never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreatmentRecord {
    pub name: String,
    pub age_years: u32,
    pub age_months: u32,
    pub sex: String,
    pub bed_number: u32,
    pub uhid: String,
    pub diagnosis: String,
    pub consultants: String,
    pub junior_residents: String,
    pub senior_residents: String,
    pub groups: Vec<EntryGroup>,
    pub parameters: Vec<ParameterEntry>,
}

impl TreatmentRecord {
    /// Reads a record from normalised JSON.
    ///
    /// # Arguments
    ///
    /// * `record` - The normalised record tree.
    ///
    /// # Returns
    ///
    /// The record together with every warning raised while reading it. Reading never fails.
    pub fn from_json(record: &NormalizedRecord) -> (Self, Vec<ShapingWarning>) {
        let mut warnings = Warnings::default();

        let Some(root) = record.as_value().as_object() else {
            warnings.push("$", "record is not a JSON object; rendering an empty chart");
            return (Self::default(), warnings.0);
        };

        let record = Self {
            name: text_at(root, &[KEY_NAME, "name"], &mut warnings),
            age_years: count_at(root, &[KEY_AGE_YEARS, "age_year"], &mut warnings),
            age_months: count_at(root, &[KEY_AGE_MONTHS, "age_month"], &mut warnings),
            sex: text_at(root, &[KEY_SEX, "sex"], &mut warnings),
            bed_number: count_at(root, &[KEY_BED, KEY_BED_ALIAS], &mut warnings),
            uhid: text_at(root, &[KEY_UHID, "UHID"], &mut warnings),
            diagnosis: text_at(root, &[KEY_DIAGNOSIS, "diagnosis"], &mut warnings),
            consultants: names_at(root, &[KEY_CONSULTANTS, "consultants"], &mut warnings),
            junior_residents: names_at(root, &[KEY_JUNIOR_RESIDENTS, "jr"], &mut warnings),
            senior_residents: names_at(root, &[KEY_SENIOR_RESIDENTS, "sr"], &mut warnings),
            groups: read_groups(root, &mut warnings),
            parameters: read_parameters(root, &mut warnings),
        };

        (record, warnings.0)
    }
}

// ============================================================================
// FIELD READERS
// ============================================================================

/// First present (non-null) value among `keys`, with the key it was found under.
fn lookup<'a>(
    map: &'a Map<String, Value>,
    keys: &[&'static str],
) -> Option<(&'static str, &'a Value)> {
    keys.iter()
        .find_map(|key| map.get(*key).filter(|v| !v.is_null()).map(|v| (*key, v)))
}

/// Renders a scalar as text. Arrays and objects are not text and yield `None`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn cell_text(value: Option<&Value>, location: String, warnings: &mut Warnings) -> String {
    let Some(value) = value else {
        return String::new();
    };
    scalar_text(value).unwrap_or_else(|| {
        warnings.push(location, "expected text, found a nested value; left blank");
        String::new()
    })
}

fn text_at(map: &Map<String, Value>, keys: &[&'static str], warnings: &mut Warnings) -> String {
    match lookup(map, keys) {
        Some((key, value)) => cell_text(Some(value), key.to_string(), warnings),
        None => String::new(),
    }
}

/// Name lists may be a single string or an array of strings.
fn names_at(map: &Map<String, Value>, keys: &[&'static str], warnings: &mut Warnings) -> String {
    match lookup(map, keys) {
        Some((key, Value::Array(items))) => {
            let mut names = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let name = cell_text(Some(item), format!("{}[{}]", key, index), warnings);
                if !name.trim().is_empty() {
                    names.push(name.trim().to_string());
                }
            }
            names.join(", ")
        }
        Some((key, value)) => cell_text(Some(value), key.to_string(), warnings),
        None => String::new(),
    }
}

/// Reads a non-negative count. Anything that is not a whole number becomes 0.
fn count_at(map: &Map<String, Value>, keys: &[&'static str], warnings: &mut Warnings) -> u32 {
    let Some((key, value)) = lookup(map, keys) else {
        return 0;
    };

    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return 0;
            }
            if s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse::<u32>().ok()
            } else {
                None
            }
        }
        _ => None,
    };

    parsed.unwrap_or_else(|| {
        warnings.push(key, format!("{} is not a whole number; using 0", value));
        0
    })
}

/// Iterates an object's entries, or an array's items keyed by index.
fn entries(value: &Value) -> Option<Vec<(String, &Value)>> {
    match value {
        Value::Object(map) => Some(map.iter().map(|(k, v)| (k.clone(), v)).collect()),
        Value::Array(items) => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
        ),
        _ => None,
    }
}

fn read_groups(root: &Map<String, Value>, warnings: &mut Warnings) -> Vec<EntryGroup> {
    let Some((key, value)) = lookup(root, &[KEY_ENTRY_GROUPS, KEY_ENTRY_GROUPS_ALIAS]) else {
        return Vec::new();
    };
    let Some(items) = entries(value) else {
        warnings.push(key, "entry groups must be an object; no tables rendered");
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|(group_key, group)| {
            read_group(&format!("{}.{}", key, group_key), group, warnings)
        })
        .collect()
}

fn read_group(location: &str, value: &Value, warnings: &mut Warnings) -> Option<EntryGroup> {
    let Some(group) = value.as_object() else {
        warnings.push(location, "entry group is not an object; skipped");
        return None;
    };

    let title = cell_text(
        group.get(KEY_GROUP_TITLE),
        format!("{}.{}", location, KEY_GROUP_TITLE),
        warnings,
    );
    let columns = group
        .get(KEY_GROUP_COLUMNS)
        .filter(|v| !v.is_null())
        .and_then(|v| read_columns(&format!("{}.{}", location, KEY_GROUP_COLUMNS), v, warnings));

    let mut rows = Vec::new();
    if let Some(subtitles) = group.get(KEY_GROUP_SUBTITLES).filter(|v| !v.is_null()) {
        let subtitles_location = format!("{}.{}", location, KEY_GROUP_SUBTITLES);
        match entries(subtitles) {
            Some(items) => {
                for (row_key, row) in items {
                    let row_location = format!("{}.{}", subtitles_location, row_key);
                    if let Some(row) = read_row(&row_location, row, warnings) {
                        rows.push(row);
                    }
                }
            }
            None => warnings.push(subtitles_location, "subtitles must be an object; skipped"),
        }
    }

    Some(EntryGroup {
        title,
        columns,
        rows,
    })
}

/// Reads an explicit column list. Unknown names are reported and ignored; duplicates and
/// `content` (always implied first) are dropped.
fn read_columns(location: &str, value: &Value, warnings: &mut Warnings) -> Option<Vec<Column>> {
    let Some(items) = value.as_array() else {
        warnings.push(location, "columns must be a list; inferring columns instead");
        return None;
    };

    let mut columns = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let parsed = item.as_str().and_then(Column::from_key);
        match parsed {
            Some(Column::Content) => {}
            Some(column) if !columns.contains(&column) => columns.push(column),
            Some(_) => {}
            None => warnings.push(
                format!("{}[{}]", location, index),
                format!("unrecognised column {}; ignored", item),
            ),
        }
    }

    Some(columns)
}

fn read_row(location: &str, value: &Value, warnings: &mut Warnings) -> Option<SubtitleRow> {
    let Some(row) = value.as_object() else {
        warnings.push(location, "subtitle row is not an object; skipped");
        return None;
    };

    let mut content = String::new();
    let mut fields = Vec::new();
    for (key, value) in row {
        let field_location = format!("{}.{}", location, key);
        match Column::from_key(key) {
            Some(Column::Content) => content = cell_text(Some(value), field_location, warnings),
            Some(column) => {
                if fields.iter().any(|(c, _)| *c == column) {
                    continue;
                }
                fields.push((column, cell_text(Some(value), field_location, warnings)));
            }
            None => tracing::debug!(location = %field_location, "ignoring unrecognised row field"),
        }
    }

    Some(SubtitleRow { content, fields })
}

fn read_parameters(root: &Map<String, Value>, warnings: &mut Warnings) -> Vec<ParameterEntry> {
    let Some((key, value)) = lookup(root, &[KEY_PARAMETER_ROWS, KEY_PARAMETER_ROWS_ALIAS]) else {
        return Vec::new();
    };
    let Some(items) = entries(value) else {
        warnings.push(key, "parameter rows must be an object; none rendered");
        return Vec::new();
    };

    let mut parameters = Vec::with_capacity(items.len());
    for (row_key, row) in items {
        let location = format!("{}.{}", key, row_key);
        let Some(row) = row.as_object() else {
            warnings.push(location, "parameter row is not an object; skipped");
            continue;
        };
        parameters.push(ParameterEntry {
            label: cell_text(
                row.get(KEY_PARAMETER_LABEL),
                format!("{}.{}", location, KEY_PARAMETER_LABEL),
                warnings,
            ),
            description: cell_text(
                row.get(KEY_PARAMETER_DESCRIPTION),
                format!("{}.{}", location, KEY_PARAMETER_DESCRIPTION),
                warnings,
            ),
        });
    }

    parameters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_record;
    use serde_json::json;

    fn read(value: Value) -> (TreatmentRecord, Vec<ShapingWarning>) {
        TreatmentRecord::from_json(&normalize_record(value))
    }

    #[test]
    fn test_reads_patient_fields() {
        let (record, warnings) = read(json!({
            "Name": "Baby A",
            "Age_year": 3,
            "Age_month": "4",
            "Sex": "F",
            "bed_number": "12",
            "uhid": "UH-001",
            "Diagnosis": "Pneumonia",
            "Consultants": "Dr. One",
            "JR": ["Dr. Two", "Dr. Three"],
            "SR": "Dr. Four"
        }));

        assert!(warnings.is_empty());
        assert_eq!(record.name, "Baby A");
        assert_eq!(record.age_years, 3);
        assert_eq!(record.age_months, 4);
        assert_eq!(record.bed_number, 12);
        assert_eq!(record.uhid, "UH-001");
        assert_eq!(record.diagnosis, "Pneumonia");
        assert_eq!(record.junior_residents, "Dr. Two, Dr. Three");
        assert_eq!(record.senior_residents, "Dr. Four");
    }

    #[test]
    fn test_missing_fields_default() {
        let (record, warnings) = read(json!({}));
        assert!(warnings.is_empty());
        assert_eq!(record, TreatmentRecord::default());
    }

    #[test]
    fn test_non_numeric_age_is_zero() {
        let (record, warnings) = read(json!({"Age_year": "abc", "Age_month": -2}));
        assert_eq!(record.age_years, 0);
        assert_eq!(record.age_months, 0);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].location, "Age_year");
    }

    #[test]
    fn test_capitalised_keys_win_over_lowercase() {
        let (record, _) = read(json!({"diagnosis": "old", "Diagnosis": "new", "consultants": "x"}));
        assert_eq!(record.diagnosis, "new");
        assert_eq!(record.consultants, "x");
    }

    #[test]
    fn test_aliases_are_accepted() {
        let (record, _) = read(json!({
            "Bed_Number": 7,
            "entries": {"e": {"title": "Fluids", "subtitles": {"s": {"content": "NS"}}}},
            "parameters": {"p": {"row_header_name": "Weight", "row_header_description": "12kg"}}
        }));
        assert_eq!(record.bed_number, 7);
        assert_eq!(record.groups.len(), 1);
        assert_eq!(record.groups[0].title, "Fluids");
        assert_eq!(record.parameters[0].label, "Weight");
    }

    #[test]
    fn test_groups_and_rows_keep_input_order() {
        let (record, _) = read(json!({
            "each_entry_layout": {
                "zeta": {"title": "Z", "subtitles": {"b": {"content": "second"}, "a": {"content": "first"}}},
                "alpha": {"title": "A"}
            }
        }));
        let titles: Vec<&str> = record.groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Z", "A"]);
        assert_eq!(record.groups[0].rows[0].content, "second");
        assert_eq!(record.groups[0].rows[1].content, "first");
    }

    #[test]
    fn test_row_fields_keep_input_order_and_values() {
        let (record, _) = read(json!({
            "each_entry_layout": {"e": {"subtitles": {"s": {"dose": 500, "content": "Amox", "Day": "D1"}}}}
        }));
        let row = &record.groups[0].rows[0];
        assert_eq!(row.content, "Amox");
        assert_eq!(
            row.fields,
            vec![(Column::Dose, "500".to_string()), (Column::Day, "D1".to_string())]
        );
        assert_eq!(row.value(Column::Volume), None);
    }

    #[test]
    fn test_malformed_groups_and_rows_are_skipped() {
        let (record, warnings) = read(json!({
            "each_entry_layout": {
                "bad": "not a group",
                "good": {"title": "T", "subtitles": {"s1": 5, "s2": {"content": "ok"}}}
            }
        }));
        assert_eq!(record.groups.len(), 1);
        assert_eq!(record.groups[0].rows.len(), 1);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].location, "each_entry_layout.bad");
        assert_eq!(warnings[1].location, "each_entry_layout.good.subtitles.s1");
    }

    #[test]
    fn test_explicit_columns_are_parsed() {
        let (record, warnings) = read(json!({
            "each_entry_layout": {"e": {"columns": ["content", "Dose", "bogus", "day", "dose"]}}
        }));
        assert_eq!(record.groups[0].columns, Some(vec![Column::Dose, Column::Day]));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].location, "each_entry_layout.e.columns[2]");
    }

    #[test]
    fn test_nested_cell_value_is_blank_with_warning() {
        let (record, warnings) = read(json!({
            "each_entry_layout": {"e": {"subtitles": {"s": {"content": {"x": 1}, "dose": "5mg"}}}}
        }));
        assert_eq!(record.groups[0].rows[0].content, "");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_malformed_parameter_row_is_skipped() {
        let (record, warnings) = read(json!({
            "each_table_row_layout": {
                "r1": {"row_header_name": "Date", "row_header_description": "2024-01-01"},
                "r2": ["nope"],
                "r3": {"row_header_name": "Weight"}
            }
        }));
        assert_eq!(record.parameters.len(), 2);
        assert_eq!(record.parameters[1].description, "");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_non_object_root_yields_empty_record() {
        let (record, warnings) = read(json!([1, 2, 3]));
        assert_eq!(record, TreatmentRecord::default());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_column_from_key() {
        assert_eq!(Column::from_key(" Volume "), Some(Column::Volume));
        assert_eq!(Column::from_key("CONTENT"), Some(Column::Content));
        assert_eq!(Column::from_key("route"), None);
    }
}
