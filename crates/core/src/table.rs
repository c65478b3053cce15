//! Treatment table rendering.
//!
//! Each [`TableDescriptor`] becomes one bordered table. The content column takes whatever width
//! the fixed columns leave over; `day` is narrower than the other optional columns because day
//! markers are short tokens (`D1`, `D2`).

use crate::compose::PageFragment;
use crate::config::LayoutConfig;
use crate::record::Column;
use crate::shaper::TableDescriptor;
use std::fmt::Write;

/// Vertical gap after each treatment table.
const TABLE_GAP: &str = "\\par\\vspace{0.2cm}";

/// Formats a length in centimetres.
pub(crate) fn cm(value: f32) -> String {
    format!("{:.2}cm", value)
}

#[derive(Clone, Debug, Default)]
pub struct TableRenderer {
    layout: LayoutConfig,
}

impl TableRenderer {
    pub fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }

    /// Column widths in centimetres, in the table's column order.
    pub fn column_widths(&self, columns: &[Column]) -> Vec<f32> {
        let fixed = |column: &Column| match column {
            Column::Content => 0.0,
            Column::Day => self.layout.day_column_cm,
            _ => self.layout.optional_column_cm,
        };
        let fixed_total: f32 = columns.iter().map(fixed).sum();
        let content = (self.layout.table_width_cm - fixed_total).max(self.layout.min_content_cm);

        columns
            .iter()
            .map(|column| match column {
                Column::Content => content,
                other => fixed(other),
            })
            .collect()
    }

    /// Renders one table.
    ///
    /// Returns `None` for a table with no columns or no rows. Rows are numbered from 1 within
    /// the table, prefixed to the content cell. Output depends only on the descriptor and the
    /// layout, so identical input renders byte-identically.
    pub fn render(&self, table: &TableDescriptor) -> Option<PageFragment> {
        if table.columns.is_empty() || table.rows.is_empty() {
            return None;
        }

        let spec: String = self
            .column_widths(&table.columns)
            .into_iter()
            .map(|width| format!("p{{{}}}|", cm(width)))
            .collect();

        let header: Vec<String> = table
            .columns
            .iter()
            .map(|column| match column {
                Column::Content => format!("\\textbf{{{}}}", table.title),
                other => format!("\\textbf{{{}}}", other.header()),
            })
            .collect();

        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "\\begin{{tabular}}{{|{}}}", spec);
        out.push_str("\\hline\n");
        let _ = writeln!(out, "{} \\\\", header.join(" & "));
        out.push_str("\\hline\n");

        for (index, row) in table.rows.iter().enumerate() {
            let cells: Vec<String> = table
                .columns
                .iter()
                .map(|column| match column {
                    Column::Content => format!("{}. {}", index + 1, row.cell(Column::Content)),
                    other => row.cell(*other).to_string(),
                })
                .collect();
            let _ = writeln!(out, "{} \\\\", cells.join(" & "));
            out.push_str("\\hline\n");
        }

        out.push_str("\\end{tabular}\n");
        out.push_str(TABLE_GAP);
        out.push('\n');

        Some(PageFragment::new(out))
    }
}
