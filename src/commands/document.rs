use crate::doc_processor::{self, UploadPolicy};
use crate::error::AppError;
use crate::session::Session;
use std::path::Path;
use tracing::warn;

#[derive(Debug)]
pub struct DocumentInfo {
    pub label: String,
    pub chars: usize,
    pub truncated: bool,
}

/// Load an uploaded file and/or pasted text into the session.
///
/// Pasted text wins over the upload. Upload warnings (empty file, wrong
/// type, image-only PDF) only fail the call when there is no pasted text to
/// fall back on; the session's document is left untouched in that case.
pub async fn load_document(
    session: &mut Session,
    file: Option<&Path>,
    pasted: Option<&str>,
    policy: UploadPolicy,
    char_budget: usize,
) -> Result<Option<DocumentInfo>, AppError> {
    let has_paste = pasted.is_some_and(|text| !text.trim().is_empty());

    let upload = match file {
        Some(path) => match doc_processor::read_upload(path, policy, char_budget).await {
            Ok(document) => Some(document),
            Err(e) if e.is_warning() && has_paste => {
                warn!(error = %e, "upload ignored, using pasted text");
                None
            }
            Err(e) => return Err(e.into()),
        },
        None => None,
    };

    let Some(document) = doc_processor::resolve_document(upload, pasted, char_budget) else {
        return Ok(None);
    };

    let info = DocumentInfo {
        label: document.label().to_string(),
        chars: document.char_count(),
        truncated: document.is_truncated(),
    };
    if info.truncated {
        warn!(
            chars = info.chars,
            budget = char_budget,
            "document exceeds the character budget; only the beginning will be sent"
        );
    }
    session.replace_document(document);
    Ok(Some(info))
}
