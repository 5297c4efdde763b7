//! Printable reports. Each document is first described as a [`ReportDocument`]
//! (header lines, metadata, sections) and then rendered to PDF by [`pdf`];
//! the analytics report also has an XLSX rendition in [`xlsx`].

pub mod audit_log;
pub mod closed_report;
pub mod locale;
pub mod pdf;
pub mod ticket_detail;
pub mod ticket_list;
pub mod xlsx;

use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder};

use crate::config::AppConfig;
pub use pdf::{load_logo, render_pdf, Logo};

/// Generic "nothing to show" text for an empty record table.
pub const NO_RECORDS: &str = "No hay registros para mostrar.";

pub type Fill = [u8; 3];

pub const HEADER_BLUE: Fill = [59, 130, 246];
pub const HEADER_DARK: Fill = [17, 24, 39];
pub const ZEBRA: Fill = [245, 247, 250];
pub const STATE_GREEN: Fill = [34, 197, 94];

// ─── Report model ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoPlacement {
    /// Centred above the header lines.
    Centered,
    /// Top-left corner, header lines beside it.
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderLine {
    pub text: String,
    pub size: f32,
    pub bold: bool,
    pub color: Option<Fill>,
}

impl HeaderLine {
    pub fn bold(text: impl Into<String>, size: f32) -> Self {
        HeaderLine { text: text.into(), size, bold: true, color: None }
    }

    pub fn plain(text: impl Into<String>, size: f32) -> Self {
        HeaderLine { text: text.into(), size, bold: false, color: None }
    }

    pub fn colored(mut self, color: Fill) -> Self {
        self.color = Some(color);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub title: String,
    /// Relative width; the table always spans the printable width.
    pub weight: f32,
}

impl Column {
    pub fn new(title: impl Into<String>, weight: f32) -> Self {
        Column { title: title.into(), weight }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// Title bar followed by label/value rows.
    KeyValue {
        title: String,
        rows: Vec<(String, String)>,
        header_fill: Fill,
    },
    /// One row per record. Never built with zero rows: see [`Section::table`].
    Table {
        title: Option<String>,
        columns: Vec<Column>,
        rows: Vec<Vec<String>>,
        header_fill: Fill,
        zebra: bool,
    },
    Placeholder(String),
    /// Labels printed under blank signature lines.
    Signatures(Vec<String>),
}

impl Section {
    /// A record table, or `placeholder` when there is nothing to list.
    pub fn table(
        title: Option<String>,
        columns: Vec<Column>,
        rows: Vec<Vec<String>>,
        header_fill: Fill,
        placeholder: &str,
    ) -> Section {
        if rows.is_empty() {
            return Section::Placeholder(placeholder.to_string());
        }
        Section::Table { title, columns, rows, header_fill, zebra: true }
    }
}

#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub title: String,
    pub file_name: String,
    pub logo: Option<Logo>,
    pub logo_placement: LogoPlacement,
    pub logo_width_mm: f32,
    pub header: Vec<HeaderLine>,
    pub metadata: Vec<(String, String)>,
    pub sections: Vec<Section>,
    /// Printed on the left of every page footer, next to the page number.
    pub footer_note: Option<String>,
    pub margin_mm: f32,
}

impl ReportDocument {
    pub fn new(title: impl Into<String>, file_name: impl Into<String>) -> Self {
        ReportDocument {
            title: title.into(),
            file_name: file_name.into(),
            logo: None,
            logo_placement: LogoPlacement::Centered,
            logo_width_mm: 30.0,
            header: Vec::new(),
            metadata: Vec::new(),
            sections: Vec::new(),
            footer_note: None,
            margin_mm: 14.0,
        }
    }

    pub fn has_table(&self) -> bool {
        self.sections.iter().any(|s| matches!(s, Section::Table { .. }))
    }
}

/// Institutional data shared by every document.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub institucion: String,
    pub titulo_sistema: String,
    pub ubicacion: String,
    pub logo: Option<Logo>,
    pub offset: FixedOffset,
    pub generated_at: DateTime<Utc>,
}

impl ReportContext {
    /// Loads the configured logo; a missing or unreadable file only drops the logo.
    pub fn from_config(config: &AppConfig, now: DateTime<Utc>) -> Self {
        ReportContext {
            institucion: config.nombre_institucion.clone(),
            titulo_sistema: config.titulo_sistema.clone(),
            ubicacion: config.ubicacion.clone(),
            logo: load_logo(Path::new(&config.ruta_logo)),
            offset: config.offset(),
            generated_at: now,
        }
    }

    pub fn generated_label(&self) -> String {
        locale::format_timestamp(self.generated_at, &self.offset)
    }
}

// ─── XLSX formats ────────────────────────────────────────────────────────────

/// Header row: bold white on the report blue, thin border.
pub fn create_header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color("3B82F6")
        .set_font_color("FFFFFF")
        .set_font_size(11)
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
        .set_text_wrap()
}

/// dd/mm/yyyy hh:mm AM/PM
pub fn create_datetime_format() -> Format {
    Format::new().set_num_format("dd/mm/yyyy hh:mm AM/PM")
}

/// #,##0.0
pub fn create_number_format() -> Format {
    Format::new().set_num_format("#,##0.0")
}

pub fn create_integer_format() -> Format {
    Format::new().set_num_format("#,##0")
}

pub fn create_percent_format() -> Format {
    Format::new().set_num_format("0.0%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_becomes_placeholder() {
        let s = Section::table(None, vec![Column::new("ID", 1.0)], vec![], HEADER_BLUE, NO_RECORDS);
        assert_eq!(s, Section::Placeholder(NO_RECORDS.to_string()));
    }

    #[test]
    fn test_non_empty_table_is_kept() {
        let s = Section::table(
            Some("Tickets".into()),
            vec![Column::new("ID", 1.0)],
            vec![vec!["1".into()]],
            HEADER_BLUE,
            NO_RECORDS,
        );
        assert!(matches!(s, Section::Table { ref rows, .. } if rows.len() == 1));
    }

    #[test]
    fn test_context_without_logo_file() {
        let config = AppConfig {
            ruta_logo: "/no/existe/logo.png".into(),
            ..AppConfig::default()
        };
        let ctx = ReportContext::from_config(&config, Utc::now());
        assert!(ctx.logo.is_none());
        assert_eq!(ctx.institucion, "Hospital Puerto Cortes");
    }
}
