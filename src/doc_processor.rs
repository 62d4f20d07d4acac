use crate::session::models::{Document, DocumentSource};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// File types an upload can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Txt,
    Md,
}

impl FileKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "pdf" => Some(FileKind::Pdf),
            "txt" => Some(FileKind::Txt),
            "md" | "markdown" => Some(FileKind::Md),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Txt => "txt",
            FileKind::Md => "md",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Whether this build can read PDFs.
pub fn pdf_supported() -> bool {
    cfg!(feature = "pdf")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UploadPolicy {
    pub include_markdown: bool,
}

impl UploadPolicy {
    pub fn allowed_kinds(&self) -> Vec<FileKind> {
        let mut kinds = Vec::with_capacity(3);
        if pdf_supported() {
            kinds.push(FileKind::Pdf);
        }
        kinds.push(FileKind::Txt);
        if self.include_markdown {
            kinds.push(FileKind::Md);
        }
        kinds
    }

    fn allows(&self, kind: FileKind) -> bool {
        self.allowed_kinds().contains(&kind)
    }

    fn describe(&self) -> String {
        self.allowed_kinds()
            .iter()
            .map(|k| format!(".{}", k))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("`{0}` is empty (0 bytes); add content, save it and upload it again")]
    Empty(String),
    #[error("unsupported file type `{name}`; allowed: {allowed}")]
    Unsupported { name: String, allowed: String },
    #[error("no text could be extracted from `{0}` (it may be image-based); try a TXT file or paste the text instead")]
    ImageOnlyPdf(String),
    #[error("PDF support is not available in this build; rebuild with `--features pdf`")]
    PdfUnavailable,
    #[error("failed to read PDF: {0}")]
    Pdf(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    /// Input problems the user can fix; the operation just does not proceed.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            DocumentError::Empty(_)
                | DocumentError::Unsupported { .. }
                | DocumentError::ImageOnlyPdf(_)
        )
    }
}

/// Decode UTF-8, silently dropping invalid byte sequences.
pub fn decode_utf8_dropping_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

#[cfg(feature = "pdf")]
fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
    // pdf-extract panics on some malformed files instead of returning Err.
    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| DocumentError::Pdf("malformed PDF".into()))?
        .map_err(|e| DocumentError::Pdf(e.to_string()))
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf_pages(_bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
    Err(DocumentError::PdfUnavailable)
}

/// Join extracted pages with a blank line. No text at all means the PDF is
/// image-based.
fn join_pages(filename: &str, pages: &[String]) -> Result<String, DocumentError> {
    let text = pages.join("\n\n").trim().to_string();
    if text.is_empty() {
        return Err(DocumentError::ImageOnlyPdf(filename.to_string()));
    }
    Ok(text)
}

/// Turn an uploaded file into a document.
pub fn load_upload(
    filename: &str,
    bytes: &[u8],
    policy: UploadPolicy,
    char_budget: usize,
) -> Result<Document, DocumentError> {
    if bytes.is_empty() {
        return Err(DocumentError::Empty(filename.to_string()));
    }

    let kind = match FileKind::from_name(filename) {
        Some(FileKind::Pdf) if !pdf_supported() => return Err(DocumentError::PdfUnavailable),
        Some(kind) if policy.allows(kind) => kind,
        _ => {
            return Err(DocumentError::Unsupported {
                name: filename.to_string(),
                allowed: policy.describe(),
            })
        }
    };

    let text = match kind {
        FileKind::Pdf => {
            let pages = extract_pdf_pages(bytes)?;
            debug!(pages = pages.len(), "extracted PDF pages");
            join_pages(filename, &pages)?
        }
        FileKind::Txt | FileKind::Md => decode_utf8_dropping_invalid(bytes).trim().to_string(),
    };

    info!(file = filename, kind = %kind, chars = text.chars().count(), "document loaded");
    Ok(Document::new(
        text,
        DocumentSource::Upload {
            filename: filename.to_string(),
            kind,
        },
        char_budget,
    ))
}

/// Read a file from disk and load it as an upload.
pub async fn read_upload(
    path: &Path,
    policy: UploadPolicy,
    char_budget: usize,
) -> Result<Document, DocumentError> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();
    let bytes = tokio::fs::read(path).await?;
    load_upload(&filename, &bytes, policy, char_budget)
}

/// Non-blank pasted text takes precedence over an upload.
pub fn resolve_document(
    upload: Option<Document>,
    pasted: Option<&str>,
    char_budget: usize,
) -> Option<Document> {
    match pasted.filter(|text| !text.trim().is_empty()) {
        Some(text) => Some(Document::pasted(text, char_budget)),
        None => upload,
    }
}
