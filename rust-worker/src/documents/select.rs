//! Which generated documents travel with which notification.
//!
//! | shipment | customer | carrier             | internal            |
//! |----------|----------|---------------------|---------------------|
//! | courier  | labels   | labels              | nothing             |
//! | freight  | BOL      | BOL + confirmation  | BOL + confirmation  |

use crate::recipients::RecipientClass;
use crate::shipment::{DocumentKind, DocumentResult, ShipmentType};

/// First successfully generated document of `kind`.
pub fn find_document(documents: &[DocumentResult], kind: DocumentKind) -> Option<&DocumentResult> {
    documents.iter().find(|d| d.success && d.kind() == kind)
}

/// Documents to attach for one recipient class, in attachment order.
pub fn select_documents(
    shipment_type: ShipmentType,
    class: RecipientClass,
    documents: &[DocumentResult],
) -> Vec<&DocumentResult> {
    match (shipment_type, class) {
        (ShipmentType::Courier, RecipientClass::Internal) => Vec::new(),
        (ShipmentType::Courier, _) => documents
            .iter()
            .filter(|d| d.success && d.kind() == DocumentKind::Label)
            .collect(),
        (ShipmentType::Freight, RecipientClass::Customer) => {
            find_document(documents, DocumentKind::Bol).into_iter().collect()
        }
        (ShipmentType::Freight, _) => [DocumentKind::Bol, DocumentKind::CarrierConfirmation]
            .into_iter()
            .filter_map(|kind| find_document(documents, kind))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipment::DocumentData;

    fn doc(file_name: &str, success: bool) -> DocumentResult {
        DocumentResult {
            success,
            data: Some(DocumentData {
                download_url: Some(format!("https://docs.example.com/{}", file_name)),
                file_name: Some(file_name.to_string()),
                doc_type: None,
            }),
            kind: None,
        }
    }

    fn names(selected: Vec<&DocumentResult>) -> Vec<&str> {
        selected.into_iter().map(|d| d.file_name()).collect()
    }

    fn freight_documents() -> Vec<DocumentResult> {
        vec![
            doc("SH-1-label.pdf", true),
            doc("SH-1-BOL-draft.pdf", false),
            doc("SH-1-BOL.pdf", true),
            doc("SH-1-BOL-copy.pdf", true),
            doc("SH-1-CARRIER-CONFIRMATION.pdf", true),
        ]
    }

    #[test]
    fn test_bol_is_first_successful_match() {
        let documents = freight_documents();
        let bol = find_document(&documents, DocumentKind::Bol).unwrap();
        assert_eq!(bol.file_name(), "SH-1-BOL.pdf");
    }

    #[test]
    fn test_missing_bol_selects_nothing() {
        let documents = vec![doc("SH-1-BOL.pdf", false), doc("invoice.pdf", true)];
        assert!(select_documents(ShipmentType::Freight, RecipientClass::Customer, &documents).is_empty());
    }

    #[test]
    fn test_freight_selection() {
        let documents = freight_documents();
        assert_eq!(
            names(select_documents(ShipmentType::Freight, RecipientClass::Customer, &documents)),
            vec!["SH-1-BOL.pdf"]
        );
        assert_eq!(
            names(select_documents(ShipmentType::Freight, RecipientClass::Carrier, &documents)),
            vec!["SH-1-BOL.pdf", "SH-1-CARRIER-CONFIRMATION.pdf"]
        );
        assert_eq!(
            names(select_documents(ShipmentType::Freight, RecipientClass::Internal, &documents)),
            vec!["SH-1-BOL.pdf", "SH-1-CARRIER-CONFIRMATION.pdf"]
        );
    }

    #[test]
    fn test_courier_selection() {
        let documents = vec![
            doc("SH-2-label-1.pdf", true),
            doc("SH-2-label-2.pdf", true),
            doc("SH-2-label-3.pdf", false),
            doc("SH-2-BOL.pdf", true),
        ];
        assert_eq!(
            names(select_documents(ShipmentType::Courier, RecipientClass::Customer, &documents)),
            vec!["SH-2-label-1.pdf", "SH-2-label-2.pdf"]
        );
        assert_eq!(
            names(select_documents(ShipmentType::Courier, RecipientClass::Carrier, &documents)).len(),
            2
        );
        assert!(select_documents(ShipmentType::Courier, RecipientClass::Internal, &documents).is_empty());
    }

    #[test]
    fn test_bol_lookup_by_file_name() {
        let carrier_bol = vec![doc("SH-1-CARRIER-BOL.pdf", true)];
        assert_eq!(
            find_document(&carrier_bol, DocumentKind::Bol).map(|d| d.file_name()),
            Some("SH-1-CARRIER-BOL.pdf")
        );

        let unrelated = vec![doc("symbol-sheet.pdf", true)];
        assert!(find_document(&unrelated, DocumentKind::Bol).is_none());
        assert!(select_documents(ShipmentType::Freight, RecipientClass::Customer, &unrelated).is_empty());
    }

    #[test]
    fn test_internal_never_gets_labels() {
        let documents = freight_documents();
        let selected = select_documents(ShipmentType::Freight, RecipientClass::Internal, &documents);
        assert!(selected.iter().all(|d| d.kind() != DocumentKind::Label));
    }
}
