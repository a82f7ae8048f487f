//! # Format Extractors (C1)
//!
//! Turns a file's bytes (or a fetched URL) into plain text plus a metadata
//! stamp. Dispatch is by extension of the declared filename, case
//! insensitive. Per-file failures are reported per-file and never abort a
//! batch upload — see [`crate::web::handlers::upload_documents`].

mod html;
mod office;
mod pdf;

use crate::error::ExtractError;

/// The plain-text result of extracting one source, plus enough metadata to
/// seed [`crate::chunk::SourceInfo`].
pub struct Extracted {
    pub text: String,
    pub content_type: String,
    pub title: Option<String>,
}

/// Decode `bytes` (declared as `declared_name`) into plain text.
///
/// Dispatch is purely by extension; the byte content itself is never
/// sniffed.
pub fn extract(bytes: &[u8], declared_name: &str) -> Result<Extracted, ExtractError> {
    let ext = declared_name
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "pdf" => Ok(Extracted {
            text: pdf::extract_pdf(bytes),
            content_type: "pdf".to_string(),
            title: None,
        }),
        "docx" => Ok(Extracted {
            text: office::extract_docx(bytes),
            content_type: "docx".to_string(),
            title: None,
        }),
        "pptx" => Ok(Extracted {
            text: office::extract_pptx(bytes),
            content_type: "pptx".to_string(),
            title: None,
        }),
        "xlsx" | "xls" => Ok(Extracted {
            text: office::extract_spreadsheet(bytes),
            content_type: "spreadsheet".to_string(),
            title: None,
        }),
        "txt" | "md" | "markdown" | "csv" => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            Ok(Extracted {
                text,
                content_type: ext,
                title: None,
            })
        }
        other => Err(ExtractError::UnsupportedFormat(other.to_string())),
    }
}

/// Fetch a URL and extract its main-content text (C1's URL path).
pub async fn extract_url(url: &str) -> Result<Extracted, ExtractError> {
    html::extract_url(url).await
}
