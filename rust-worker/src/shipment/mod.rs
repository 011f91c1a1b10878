//! Shipment input model: shipment record, generated documents, totals.

pub mod document;
pub mod totals;
pub mod types;

pub use document::{DocumentData, DocumentKind, DocumentResult};
pub use totals::{format_quantity, ShipmentTotals};
pub use types::{Address, Package, SelectedCarrier, ShipmentData, ShipmentType, Terminal};
