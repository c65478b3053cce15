//! Page composition.
//!
//! Assembles the sanitised patient fields and the rendered table fragments into one complete
//! LaTeX page description:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ logo        heading / subheading             │
//! │ name | age | sex | bed | uhid                 │
//! │ diagnosis                                    │
//! │ consultants            | JRs / SRs           │
//! │ treatment tables...    | parameter table     │
//! │                                              │
//! │                           SR Signature:      │  absolute position
//! │                           JR Signature:      │  absolute position
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The logo is resolved when [`PageComposer::compose`] runs, not before, because a site may
//! upload a new logo between two charts.

use crate::sanitize::Sanitizer;
use crate::shaper::PatientFields;
use crate::{ChartError, ChartResult};
use serde_json::Value;
use std::fmt::{self, Write};
use std::path::{Path, PathBuf};
use wardchart_files::LogoStore;

/// Signature annotations, as (x, y) in millimetres from the top-left corner of the page.
const JR_SIGNATURE_POSITION: (u32, u32) = (150, 267);
const SR_SIGNATURE_POSITION: (u32, u32) = (150, 247);
const SIGNATURE_BLOCK_WIDTH_MM: u32 = 70;

/// A piece of page description produced by a renderer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageFragment(String);

impl PageFragment {
    pub fn new(markup: String) -> Self {
        Self(markup)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A complete page description, ready for the typesetting engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageDescription(String);

impl PageDescription {
    pub(crate) fn new(markup: String) -> Self {
        Self(markup)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PageDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typographic sizes derived from the base font size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TypeSizes {
    pub font_size: u32,
    pub line_height: u32,
    pub header_size: u32,
    pub header_line_height: u32,
    pub subheader_size: u32,
    pub subheader_line_height: u32,
    /// Upward shift of the two-column body, in centimetres.
    pub body_raise_cm: f32,
}

impl TypeSizes {
    pub fn derive(font_size: u32) -> Self {
        let header_size = font_size.saturating_sub(1).max(1);
        let subheader_size = header_size.saturating_sub(1).max(1);
        Self {
            font_size,
            line_height: font_size * 6 / 5,
            header_size,
            header_line_height: header_size + 2,
            subheader_size,
            subheader_line_height: subheader_size + 2,
            body_raise_cm: (font_size as f32 / 11.0 * 3.0).max(1.5),
        }
    }
}

/// Where the header logo comes from: an uploaded site logo if there is one, else the bundled
/// default.
#[derive(Clone, Debug)]
pub struct LogoSource {
    store_dir: PathBuf,
    default_path: PathBuf,
}

impl LogoSource {
    pub fn new(store_dir: PathBuf, default_path: PathBuf) -> Self {
        Self {
            store_dir,
            default_path,
        }
    }

    /// The same store with a different fallback logo.
    pub fn with_default(&self, default_path: PathBuf) -> Self {
        Self {
            store_dir: self.store_dir.clone(),
            default_path,
        }
    }

    /// Resolves the logo to embed, as an absolute path.
    ///
    /// # Errors
    ///
    /// Returns `ChartError::Logo` if the store pointer is unreadable or invalid,
    /// `ChartError::MissingLogo` if no upload exists and the default logo is missing, and
    /// `ChartError::UnsafeLogoPath` if the resolved path would break the page markup.
    pub fn resolve(&self) -> ChartResult<PathBuf> {
        if self.store_dir.is_dir() {
            if let Some(uploaded) = LogoStore::new(&self.store_dir)?.current()? {
                return markup_safe(uploaded);
            }
        }

        if !self.default_path.is_file() {
            return Err(ChartError::MissingLogo {
                path: self.default_path.clone(),
            });
        }
        let resolved = self
            .default_path
            .canonicalize()
            .map_err(|_| ChartError::MissingLogo {
                path: self.default_path.clone(),
            })?;
        markup_safe(resolved)
    }
}

/// Rejects paths that LaTeX would read as markup inside `\includegraphics{...}`.
fn markup_safe(path: PathBuf) -> ChartResult<PathBuf> {
    let unsafe_char = |c: char| {
        matches!(c, '%' | '#' | '{' | '}' | '~' | '^' | '$' | '&')
            || (c == '\\' && std::path::MAIN_SEPARATOR != '\\')
    };
    if path.to_string_lossy().chars().any(unsafe_char) {
        return Err(ChartError::UnsafeLogoPath { path });
    }
    Ok(path)
}

#[derive(Clone, Debug)]
pub struct PageComposer {
    sanitizer: Sanitizer,
    logo: LogoSource,
}

impl PageComposer {
    pub fn new(sanitizer: Sanitizer, logo: LogoSource) -> Self {
        Self { sanitizer, logo }
    }

    /// A composer that falls back to `default_logo` instead of the configured default.
    pub fn with_default_logo(&self, default_logo: PathBuf) -> Self {
        Self {
            sanitizer: self.sanitizer.clone(),
            logo: self.logo.with_default(default_logo),
        }
    }

    /// Composes the full page description.
    ///
    /// # Arguments
    ///
    /// * `heading`, `subheading` - Settings values; must be JSON strings
    /// * `patient` - Sanitised patient fields
    /// * `tables` - Treatment table fragments, in display order
    /// * `parameters` - The parameter table fragment (may be empty)
    /// * `font_size` - Base font size in points
    ///
    /// # Errors
    ///
    /// Returns `ChartError::Composition` if `heading` or `subheading` is not a string or
    /// `font_size` is zero, and a resource error if no logo can be resolved.
    pub fn compose(
        &self,
        heading: &Value,
        subheading: &Value,
        patient: &PatientFields,
        tables: &[PageFragment],
        parameters: &PageFragment,
        font_size: u32,
    ) -> ChartResult<PageDescription> {
        let heading = self.header_text("heading", heading)?;
        let subheading = self.header_text("subheading", subheading)?;
        if font_size == 0 {
            return Err(ChartError::Composition("font size must be positive".into()));
        }
        let sizes = TypeSizes::derive(font_size);
        let logo = self.logo.resolve()?;

        let mut page = String::new();
        write_preamble(&mut page, &sizes);
        write_header(&mut page, &sizes, &logo, &heading, &subheading);
        write_patient_block(&mut page, patient);
        write_consultant_block(&mut page, patient);
        write_body(&mut page, &sizes, tables, parameters);
        write_signatures(&mut page);
        page.push_str("\\end{document}\n");

        Ok(PageDescription::new(page))
    }

    fn header_text(&self, field: &str, value: &Value) -> ChartResult<String> {
        match value {
            Value::String(text) => Ok(self.sanitizer.sanitize(Some(text))),
            other => Err(ChartError::Composition(format!(
                "{} must be a string, got {}",
                field, other
            ))),
        }
    }
}

// Writing to a String cannot fail, so the fmt::Result of each write is discarded.

fn write_preamble(page: &mut String, sizes: &TypeSizes) {
    page.push_str(
        "\\documentclass{article}\n\
         \\usepackage[T1]{fontenc}\n\
         \\usepackage{graphicx}\n\
         \\usepackage[a4paper, margin=0.3in]{geometry}\n\
         \\usepackage{array}\n\
         \\usepackage[absolute,overlay]{textpos}\n\
         \\setlength{\\TPHorizModule}{1mm}\n\
         \\setlength{\\TPVertModule}{1mm}\n\
         \\pagestyle{empty}\n\
         \\begin{document}\n",
    );
    let _ = writeln!(
        page,
        "\\fontsize{{{}pt}}{{{}pt}}\\selectfont",
        sizes.font_size, sizes.line_height
    );
}

fn write_header(page: &mut String, sizes: &TypeSizes, logo: &Path, heading: &str, subheading: &str) {
    let logo = logo.to_string_lossy().replace('\\', "/");
    page.push_str("\\noindent\n\\begin{minipage}{0.2\\textwidth}\n");
    let _ = writeln!(page, "\\includegraphics[width=2cm]{{{}}}", logo);
    page.push_str("\\end{minipage}\n\\vspace{-1cm}\n\\hfill\n");
    page.push_str("\\begin{center}\n");
    let _ = writeln!(
        page,
        "{{\\fontsize{{{}pt}}{{{}pt}}\\selectfont\\textbf{{{}}}}} \\\\",
        sizes.header_size, sizes.header_line_height, heading
    );
    let _ = writeln!(
        page,
        "{{\\fontsize{{{}pt}}{{{}pt}}\\selectfont\\textbf{{{}}}}}",
        sizes.subheader_size, sizes.subheader_line_height, subheading
    );
    page.push_str("\\end{center}\n");
}

fn write_patient_block(page: &mut String, patient: &PatientFields) {
    page.push_str("\\noindent\\begin{tabular}{|p{5cm}|p{4cm}|p{2.5cm}|p{1.5cm}|p{3cm}|}\n\\hline\n");
    let _ = writeln!(
        page,
        "\\textbf{{Name:}} {} & \\textbf{{Age:}} {} years {} months & \\textbf{{Gender:}} {} & \
         \\textbf{{Bed:}} {} & \\textbf{{UHID:}} {} \\\\",
        patient.name,
        patient.age_years,
        patient.age_months,
        patient.sex,
        patient.bed_number,
        patient.uhid
    );
    page.push_str("\\hline\n");
    let _ = writeln!(
        page,
        "\\multicolumn{{5}}{{|p{{19cm}}|}}{{\\textbf{{Diagnosis:}} {}}} \\\\",
        patient.diagnosis
    );
    page.push_str("\\hline\n\\end{tabular}\n\n");
}

fn write_consultant_block(page: &mut String, patient: &PatientFields) {
    page.push_str("\\noindent\\begin{tabular}{|p{11.3cm}|p{7.3cm}|}\n\\hline\n");
    let _ = writeln!(
        page,
        "\\textbf{{Consultant:}} {} & \\textbf{{JRs:}} {} \\\\",
        patient.consultants, patient.junior_residents
    );
    page.push_str("\\cline{2-2}\n");
    let _ = writeln!(page, " & \\textbf{{SRs:}} {} \\\\", patient.senior_residents);
    page.push_str("\\hline\n\\end{tabular}\n\\vspace{0.1cm}\n\n");
}

fn write_body(page: &mut String, sizes: &TypeSizes, tables: &[PageFragment], parameters: &PageFragment) {
    page.push_str("\\noindent\n\\begin{minipage}[t]{0.45\\textwidth}\n");
    let _ = writeln!(page, "\\vspace{{-{:.2}cm}}", sizes.body_raise_cm);
    for table in tables {
        page.push_str(table.as_str());
    }
    page.push_str("\\end{minipage}%\n\\hfill%\n\\begin{minipage}[t]{0.32\\textwidth}\n");
    page.push_str(parameters.as_str());
    page.push_str("\\end{minipage}\n\n");
}

fn write_signatures(page: &mut String) {
    for (label, (x, y)) in [
        ("JR Signature:", JR_SIGNATURE_POSITION),
        ("SR Signature:", SR_SIGNATURE_POSITION),
    ] {
        let _ = writeln!(
            page,
            "\\begin{{textblock}}{{{}}}({}, {})\n\\textbf{{{}}}\n\\end{{textblock}}",
            SIGNATURE_BLOCK_WIDTH_MM, x, y, label
        );
    }
}
