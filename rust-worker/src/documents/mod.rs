//! Generated-document handling for notifications.
//!
//! ```text
//! DocumentResult[] → verify_documents() → select_documents() → download_document_with_retry() → Attachment[]
//! ```

pub mod downloader;
pub mod select;
pub mod verifier;

pub use downloader::{download_document_with_retry, fetch_pdf, PDF_BASE64_MAGIC, PDF_MIME_TYPE};
pub use select::{find_document, select_documents};
pub use verifier::{head_ok, verify_documents, VerificationReport};
