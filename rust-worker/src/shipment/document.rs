//! Generated shipment documents (BOL, carrier confirmation, labels).

use serde::{Deserialize, Serialize};
use url::Url;

use super::types::null_as_default;

/// What a generated document is.
///
/// The document-generation service tags each result with its kind. Results
/// from older producers carry no tag; their kind is inferred once from the
/// `type` field and the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Bol,
    CarrierConfirmation,
    Label,
    Other,
}

impl DocumentKind {
    /// Human readable label used in logs and email bodies.
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Bol => "BOL",
            DocumentKind::CarrierConfirmation => "Carrier Confirmation",
            DocumentKind::Label => "Shipping Label",
            DocumentKind::Other => "Document",
        }
    }

    fn infer(doc_type: Option<&str>, file_name: &str) -> Self {
        let doc_type = doc_type.map(|t| t.trim().to_ascii_lowercase());
        match doc_type.as_deref() {
            Some("carrier_confirmation") => return DocumentKind::CarrierConfirmation,
            Some("bol") => return DocumentKind::Bol,
            Some("label") | Some("labels") | Some("shipping_label") => {
                return DocumentKind::Label
            }
            _ => {}
        }

        // "BOL" only counts in upper case; "symbol" is not a bill of lading.
        if file_name.contains("BOL") {
            return DocumentKind::Bol;
        }

        let upper = file_name.to_ascii_uppercase();
        if upper.contains("CARRIER") {
            DocumentKind::CarrierConfirmation
        } else if upper.contains("LABEL") {
            DocumentKind::Label
        } else {
            DocumentKind::Other
        }
    }
}

/// One entry of the document-generation output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentResult {
    #[serde(deserialize_with = "null_as_default")]
    pub success: bool,
    pub data: Option<DocumentData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<DocumentKind>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentData {
    pub download_url: Option<String>,
    pub file_name: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
}

impl DocumentResult {
    pub fn new(kind: DocumentKind, download_url: &str, file_name: &str) -> Self {
        Self {
            success: true,
            data: Some(DocumentData {
                download_url: Some(download_url.to_string()),
                file_name: Some(file_name.to_string()),
                doc_type: None,
            }),
            kind: Some(kind),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind.unwrap_or_else(|| {
            let data = self.data.as_ref();
            DocumentKind::infer(
                data.and_then(|d| d.doc_type.as_deref()),
                self.file_name(),
            )
        })
    }

    pub fn file_name(&self) -> &str {
        self.data
            .as_ref()
            .and_then(|d| d.file_name.as_deref())
            .unwrap_or("")
    }

    pub fn download_url(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.download_url.as_deref())
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// URL worth a network call: the document was generated and the URL is
    /// an absolute http(s) URL.
    pub fn fetchable_url(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        let raw = self.download_url()?;
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(raw),
            _ => None,
        }
    }

    /// File name for the attachment, defaulting to `<Kind>.pdf`.
    pub fn attachment_name(&self) -> String {
        let name = self.file_name().trim();
        if name.is_empty() {
            format!("{}.pdf", self.kind().label().replace(' ', "-"))
        } else {
            name.to_string()
        }
    }
}
