//! Parameter table rendering.
//!
//! A narrow two-column table of label/value pairs (date, weight, ...) printed beside the
//! treatment tables. Labels and values are hard-wrapped at fixed character widths so the column
//! widths never move. The date row is always bold and never wrapped.

use crate::compose::PageFragment;
use crate::config::LayoutConfig;
use crate::constants::DATE_LABEL;
use crate::sanitize::Sanitizer;
use crate::shaper::ParameterRow;
use crate::table::cm;
use std::fmt::Write;

#[derive(Clone, Debug, Default)]
pub struct ParameterTableRenderer {
    sanitizer: Sanitizer,
    layout: LayoutConfig,
}

impl ParameterTableRenderer {
    pub fn new(sanitizer: Sanitizer, layout: LayoutConfig) -> Self {
        Self { sanitizer, layout }
    }

    /// Renders all rows in input order.
    ///
    /// Returns an empty fragment when there are no rows; rows with a blank value are kept and
    /// render as a blank cell.
    pub fn render(&self, rows: &[ParameterRow]) -> PageFragment {
        if rows.is_empty() {
            return PageFragment::default();
        }

        let mut out = String::new();
        let _ = writeln!(
            out,
            "\\begin{{tabular}}{{|p{{{}}}|p{{{}}}|}}",
            cm(self.layout.label_cell_cm),
            cm(self.layout.value_cell_cm)
        );
        out.push_str("\\hline\n");

        for row in rows {
            out.push_str(&self.render_row(row));
            out.push_str("\\hline\n");
        }

        out.push_str("\\end{tabular}\n");
        PageFragment::new(out)
    }

    fn render_row(&self, row: &ParameterRow) -> String {
        if is_date_row(row) {
            return format!(
                "\\textbf{{{}}} & \\textbf{{{}}} \\\\\n",
                row.label.escaped(),
                row.description.escaped()
            );
        }

        let label = self
            .sanitizer
            .escape_wrapped(&row.label, self.layout.label_wrap_chars);
        let value = self
            .sanitizer
            .escape_wrapped(&row.description, self.layout.value_wrap_chars);

        format!(
            "\\begin{{minipage}}[t]{{\\linewidth}}\\raggedright\\textbf{{{}}}\\end{{minipage}} & \
             \\begin{{minipage}}[t]{{\\linewidth}}\\raggedright {}\\end{{minipage}} \\\\\n",
            label, value
        )
    }
}

fn is_date_row(row: &ParameterRow) -> bool {
    row.label.source().trim().eq_ignore_ascii_case(DATE_LABEL)
}
