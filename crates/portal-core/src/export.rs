//! Print document and download descriptors for PDF and Word export
//!
//! Rasterizing happens in the page; this module builds the HTML that is
//! loaded into the off-screen frame, the rasterizer options and the file
//! names.

use chrono::NaiveDate;
use serde::Serialize;

use crate::artifact::{ArtifactKind, GeneratedArtifact};
use crate::document::cleanup::strip_for_export;
use crate::error::{PortalError, Result};

const PRINT_CSS: &str = r#"
    body {
      font-family: 'Segoe UI', -apple-system, BlinkMacSystemFont, sans-serif;
      margin: 20px;
      padding: 0;
      background: white;
      color: #2c3e50;
      line-height: 1.6;
    }
    h1, h2, h3 {
      color: #2d3748;
      margin: 20px 0 15px 0;
    }
    h1 { font-size: 24px; }
    h2 { font-size: 20px; }
    h3 { font-size: 18px; }
    p { margin: 10px 0; }
    table {
      width: 100%;
      border-collapse: collapse;
      margin: 20px 0;
    }
    th, td {
      border: 1px solid #ddd;
      padding: 12px 8px;
      text-align: left;
    }
    th {
      background-color: #f8f9fa;
      font-weight: bold;
    }
    ul, ol { margin: 15px 0; padding-left: 30px; }
    li { margin: 8px 0; }
"#;

const NOT_AVAILABLE: &str = "N/A";

pub const WORD_MIME: &str = "application/msword";

fn placeholder(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::SprintPlan => {
            "<h1>No Generated Plan Available</h1><p>This sprint plan does not have a generated plan yet.</p>"
        }
        ArtifactKind::RiskAssessment => {
            "<h1>No Generated Assessment Available</h1><p>This risk assessment does not have a generated assessment yet.</p>"
        }
    }
}

fn title_prefix(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::SprintPlan => "Sprint Plan",
        ArtifactKind::RiskAssessment => "Risk Assessment",
    }
}

fn file_prefix(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::SprintPlan => "sprint-plan",
        ArtifactKind::RiskAssessment => "risk-assessment",
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Base file name without extension, e.g. `sprint-plan-12-2024-05-01`
pub fn export_stem(kind: ArtifactKind, key: Option<&str>, date: NaiveDate) -> String {
    format!(
        "{}-{}-{}",
        file_prefix(kind),
        key.filter(|k| !k.is_empty()).unwrap_or(NOT_AVAILABLE),
        date.format("%Y-%m-%d")
    )
}

/// Full HTML document loaded into the off-screen frame
pub fn print_document(kind: ArtifactKind, key: Option<&str>, content: &str) -> String {
    let body = strip_for_export(content);
    let body = if body.is_empty() {
        placeholder(kind).to_string()
    } else {
        body
    };
    let title = format!(
        "{} - {}",
        title_prefix(kind),
        key.filter(|k| !k.is_empty()).unwrap_or(NOT_AVAILABLE)
    );
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"UTF-8\">\n  <title>{}</title>\n  <style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(&title),
        PRINT_CSS,
        body
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageOptions {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub quality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasOptions {
    pub scale: f64,
    #[serde(rename = "useCORS")]
    pub use_cors: bool,
    pub letter_rendering: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageOptions {
    pub unit: &'static str,
    pub format: &'static str,
    pub orientation: &'static str,
}

/// Options object handed to the page's rasterizer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfOptions {
    pub margin: [u32; 4],
    pub filename: String,
    pub image: ImageOptions,
    pub html2canvas: CanvasOptions,
    #[serde(rename = "jsPDF")]
    pub js_pdf: PageOptions,
}

impl PdfOptions {
    pub fn new(filename: String) -> Self {
        Self {
            margin: [15, 15, 15, 15],
            filename,
            image: ImageOptions {
                kind: "jpeg",
                quality: 0.98,
            },
            html2canvas: CanvasOptions {
                scale: 1.0,
                use_cors: true,
                letter_rendering: true,
            },
            js_pdf: PageOptions {
                unit: "mm",
                format: "a4",
                orientation: "portrait",
            },
        }
    }
}

/// Off-screen frame geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameGeometry {
    pub width_px: u32,
    pub height_px: u32,
    pub left_px: i32,
}

pub const PRINT_FRAME: FrameGeometry = FrameGeometry {
    width_px: 800,
    height_px: 1200,
    left_px: -9999,
};

impl FrameGeometry {
    /// Inline style for the frame element
    pub fn css(&self) -> String {
        format!(
            "position:absolute;left:{}px;top:0;width:{}px;height:{}px;border:0;",
            self.left_px, self.width_px, self.height_px
        )
    }
}

/// Everything the page needs to produce a PDF
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfExport {
    pub html: String,
    pub options: PdfOptions,
}

impl PdfExport {
    pub fn new(kind: ArtifactKind, key: Option<&str>, content: &str, date: NaiveDate) -> Self {
        Self {
            html: print_document(kind, key, content),
            options: PdfOptions::new(format!("{}.pdf", export_stem(kind, key, date))),
        }
    }

    pub fn for_artifact(artifact: &GeneratedArtifact, content: &str, date: NaiveDate) -> Self {
        Self::new(artifact.kind, artifact.display_key().as_deref(), content, date)
    }
}

/// A blob download
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Download {
    pub file_name: String,
    pub mime_type: &'static str,
    pub content: String,
}

/// Word download of a backend-supplied document
pub fn word_download(
    kind: ArtifactKind,
    key: Option<&str>,
    word_document: Option<&str>,
    date: NaiveDate,
) -> Result<Download> {
    let content = word_document.filter(|d| !d.trim().is_empty()).ok_or_else(|| {
        PortalError::InvalidInput("No Word document available for download.".to_string())
    })?;
    Ok(Download {
        file_name: format!("{}.doc", export_stem(kind, key, date)),
        mime_type: WORD_MIME,
        content: content.to_string(),
    })
}
