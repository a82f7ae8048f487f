//! PDF text extraction: pull the text of every page via `pdf_extract`,
//! then normalize it to NFC and trim.

use unicode_normalization::UnicodeNormalization;

/// Extract and lightly normalize a PDF's text. Never fails the caller — an
/// unreadable PDF yields an empty string rather than aborting the
/// surrounding batch ingest.
pub fn extract_pdf(bytes: &[u8]) -> String {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(raw) => normalize(&raw),
        Err(e) => {
            tracing::warn!(error = %e, "failed to extract pdf text");
            String::new()
        }
    }
}

fn normalize(text: &str) -> String {
    text.nfc().collect::<String>().trim().to_string()
}
