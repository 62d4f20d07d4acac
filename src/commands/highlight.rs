use crate::error::AppError;
use crate::highlight;
use crate::session::models::Document;
use std::path::Path;
use tracing::info;

#[derive(Debug)]
pub struct HighlightReport {
    pub phrases: Vec<String>,
    pub html: String,
}

pub fn highlight_document(document: &Document) -> HighlightReport {
    HighlightReport {
        phrases: highlight::matched_phrases(document.text())
            .into_iter()
            .map(str::to_string)
            .collect(),
        html: highlight::render_html(document.label(), document.text()),
    }
}

pub async fn export_html(report: &HighlightReport, path: &Path) -> Result<(), AppError> {
    tokio::fs::write(path, report.html.as_bytes()).await?;
    info!(path = %path.display(), matches = report.phrases.len(), "highlighted HTML written");
    Ok(())
}
