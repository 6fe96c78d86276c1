use tracing::warn;

use crate::errors::AppError;

const PDF_MAGIC: &[u8] = b"%PDF";

fn is_pdf(bytes: &[u8], content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"))
        || bytes.starts_with(PDF_MAGIC)
}

/// Extracts resume text from an uploaded PDF or plain-text file.
///
/// Text that is empty after trimming is rejected here so nothing downstream ever
/// hashes an empty resume. The returned text itself is not trimmed.
pub async fn extract_text(bytes: Vec<u8>, content_type: Option<&str>) -> Result<String, AppError> {
    if bytes.is_empty() {
        return Err(AppError::Validation("Resume file is empty".to_string()));
    }

    let text = if is_pdf(&bytes, content_type) {
        // pdf parsing is CPU-bound and may panic on hostile input
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| {
                warn!("PDF extraction task failed: {e}");
                AppError::Validation("Could not read the PDF file".to_string())
            })?
            .map_err(|e| {
                warn!("PDF extraction failed: {e}");
                AppError::Validation("Could not read the PDF file".to_string())
            })?
    } else {
        String::from_utf8(bytes).map_err(|_| {
            AppError::Validation("Resume must be a PDF or UTF-8 text file".to_string())
        })?
    };

    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "Could not extract resume text".to_string(),
        ));
    }

    Ok(text)
}
