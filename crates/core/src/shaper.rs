//! Record shaping.
//!
//! Turns a [`TreatmentRecord`] into the three flat structures the renderers consume: sanitised
//! patient fields, table descriptors with a resolved column set, and parameter rows. Every leaf
//! string passes through the [`Sanitizer`] here, so renderers only ever see escaped text.

use crate::record::{Column, EntryGroup, TreatmentRecord};
use crate::sanitize::{SafeText, Sanitizer};

/// Sanitised patient demographics and care team.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientFields {
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
}

/// One row of a [`TableDescriptor`]: sanitised cells restricted to the table's columns, in
/// column order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRow {
    cells: Vec<(Column, String)>,
}

impl TableRow {
    /// The sanitised cell for `column`, or `""` when the table has no such column.
    pub fn cell(&self, column: Column) -> &str {
        self.cells
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn cells(&self) -> &[(Column, String)] {
        &self.cells
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_empty())
    }
}

/// A treatment table ready for rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDescriptor {
    /// Sanitised title.
    pub title: String,
    /// Resolved columns; `Column::Content` is always first.
    pub columns: Vec<Column>,
    pub rows: Vec<TableRow>,
}

/// A sanitised label/value pair.
///
/// Both sides keep their source text so the parameter renderer can wrap before escaping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterRow {
    pub label: SafeText,
    pub description: SafeText,
}

/// Output of [`RecordShaper::shape`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapedChart {
    pub patient: PatientFields,
    pub tables: Vec<TableDescriptor>,
    pub parameters: Vec<ParameterRow>,
}

/// Resolves the column set of a group.
///
/// An explicit list wins. Otherwise the optional columns are those carrying a non-blank value in
/// at least one row, in the order they are first seen walking rows top to bottom and fields left
/// to right. `Column::Content` is always prepended.
pub fn resolve_columns(group: &EntryGroup) -> Vec<Column> {
    let mut columns = vec![Column::Content];

    match &group.columns {
        Some(explicit) => {
            for column in explicit {
                if !columns.contains(column) {
                    columns.push(*column);
                }
            }
        }
        None => {
            for row in &group.rows {
                for (column, value) in &row.fields {
                    if !value.trim().is_empty() && !columns.contains(column) {
                        columns.push(*column);
                    }
                }
            }
        }
    }

    columns
}

#[derive(Clone, Debug, Default)]
pub struct RecordShaper {
    sanitizer: Sanitizer,
}

impl RecordShaper {
    pub fn new(sanitizer: Sanitizer) -> Self {
        Self { sanitizer }
    }

    /// Shapes `record` for rendering. Never fails.
    pub fn shape(&self, record: &TreatmentRecord) -> ShapedChart {
        ShapedChart {
            patient: self.patient_fields(record),
            tables: record
                .groups
                .iter()
                .filter_map(|group| self.table(group))
                .collect(),
            parameters: record
                .parameters
                .iter()
                .map(|entry| ParameterRow {
                    label: self.sanitizer.sanitize_text(Some(&entry.label)),
                    description: self.sanitizer.sanitize_text(Some(&entry.description)),
                })
                .collect(),
        }
    }

    fn patient_fields(&self, record: &TreatmentRecord) -> PatientFields {
        let s = |raw: &str| self.sanitizer.sanitize(Some(raw));
        PatientFields {
            name: s(&record.name),
            age_years: record.age_years,
            age_months: record.age_months,
            sex: s(&record.sex),
            bed_number: record.bed_number,
            uhid: s(&record.uhid),
            diagnosis: s(&record.diagnosis),
            consultants: s(&record.consultants),
            junior_residents: s(&record.junior_residents),
            senior_residents: s(&record.senior_residents),
        }
    }

    /// Builds the descriptor for one group, or `None` when no row survives.
    fn table(&self, group: &EntryGroup) -> Option<TableDescriptor> {
        let columns = resolve_columns(group);

        let rows: Vec<TableRow> = group
            .rows
            .iter()
            .map(|row| TableRow {
                cells: columns
                    .iter()
                    .map(|column| (*column, self.sanitizer.sanitize(row.value(*column))))
                    .collect(),
            })
            .filter(|row| !row.is_blank())
            .collect();

        if rows.is_empty() {
            tracing::debug!(title = %group.title, "dropping entry group with no rows");
            return None;
        }

        Some(TableDescriptor {
            title: self.sanitizer.sanitize(Some(&group.title)),
            columns,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_record;
    use serde_json::{json, Value};

    fn shape(value: Value) -> ShapedChart {
        let (record, _) = TreatmentRecord::from_json(&normalize_record(value));
        RecordShaper::default().shape(&record)
    }

    fn group(subtitles: Value) -> Value {
        json!({"each_entry_layout": {"e": {"title": "T", "subtitles": subtitles}}})
    }

    #[test]
    fn test_only_dose_yields_content_and_dose() {
        let chart = shape(group(json!({
            "a": {"content": "Paracetamol", "dose": "15mg/kg"},
            "b": {"content": "Ondansetron", "dose": "0.1mg/kg", "day": ""}
        })));
        assert_eq!(chart.tables[0].columns, vec![Column::Content, Column::Dose]);
    }

    #[test]
    fn test_inferred_columns_follow_first_seen_order() {
        let chart = shape(group(json!({
            "a": {"content": "x", "volume": "10ml"},
            "b": {"content": "y", "rate": "2ml/h", "day": "D1", "volume": "5ml"}
        })));
        assert_eq!(
            chart.tables[0].columns,
            vec![Column::Content, Column::Volume, Column::Rate, Column::Day]
        );
    }

    #[test]
    fn test_explicit_columns_win() {
        let chart = shape(json!({"each_entry_layout": {"e": {
            "title": "T",
            "columns": ["volume", "day"],
            "subtitles": {"a": {"content": "x", "dose": "5mg", "day": "D1"}}
        }}}));
        let table = &chart.tables[0];
        assert_eq!(table.columns, vec![Column::Content, Column::Volume, Column::Day]);
        assert_eq!(table.rows[0].cell(Column::Dose), "");
        assert_eq!(table.rows[0].cell(Column::Day), "D1");
    }

    #[test]
    fn test_blank_rows_dropped_and_dose_only_row_kept() {
        let chart = shape(group(json!({
            "a": {"content": ""},
            "b": {"content": "   "},
            "c": {"content": "", "dose": "5mg"}
        })));
        let table = &chart.tables[0];
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].cell(Column::Content), "");
        assert_eq!(table.rows[0].cell(Column::Dose), "5mg");
    }

    #[test]
    fn test_group_without_rows_is_dropped() {
        let chart = shape(json!({"each_entry_layout": {
            "empty": {"title": "Nothing", "subtitles": {"a": {"content": ""}}},
            "none": {"title": "No subtitles"},
            "kept": {"title": "Fluids", "subtitles": {"a": {"content": "NS"}}}
        }}));
        assert_eq!(chart.tables.len(), 1);
        assert_eq!(chart.tables[0].title, "Fluids");
    }

    #[test]
    fn test_cells_are_sanitised() {
        let chart = shape(group(json!({"a": {"content": "50% dextrose & water", "dose": "5_ml"}})));
        let row = &chart.tables[0].rows[0];
        assert_eq!(row.cell(Column::Content), "50\\% dextrose \\& water");
        assert_eq!(row.cell(Column::Dose), "5\\_ml");
    }

    #[test]
    fn test_parameter_rows_kept_even_when_blank() {
        let chart = shape(json!({"each_table_row_layout": {
            "r1": {"row_header_name": "Weight", "row_header_description": ""},
            "r2": {"row_header_name": "", "row_header_description": ""},
            "r3": {"row_header_name": "Date", "row_header_description": "2024-01-01"}
        }}));
        assert_eq!(chart.parameters.len(), 3);
        assert!(chart.parameters[0].description.is_empty());
        assert_eq!(chart.parameters[2].label.escaped(), "Date");
    }

    #[test]
    fn test_patient_fields_are_sanitised() {
        let chart = shape(json!({"Name": " O'Neil ", "Age_year": "abc", "Bed_Number": 4}));
        assert_eq!(chart.patient.name, "O\\textquotesingle{}Neil");
        assert_eq!(chart.patient.age_years, 0);
        assert_eq!(chart.patient.bed_number, 4);
        assert_eq!(chart.patient.diagnosis, "");
    }
}
