//! Shipment record types as produced by the shipment-creation flow.
//!
//! Field names follow the camelCase keys of the stored shipment document.
//! The record is read-only input to the notification pipeline.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Creation method value for the QuickShip flow.
pub const QUICKSHIP: &str = "quickship";

/// Shipment data captured at creation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShipmentData {
    #[serde(rename = "shipmentID", alias = "shipmentId")]
    pub shipment_id: Option<String>,
    /// `courier` or `freight`
    pub shipment_type: Option<String>,
    /// `quickship` for the QuickShip flow, absent for the regular booking flow
    pub creation_method: Option<String>,
    #[serde(rename = "companyID", alias = "companyId")]
    pub company_id: Option<String>,
    pub customer_email: Option<String>,
    pub ship_from: Option<Address>,
    pub ship_to: Option<Address>,
    pub bill_to: Option<Address>,
    #[serde(deserialize_with = "null_as_default")]
    pub packages: Vec<Package>,
    pub selected_carrier: Option<SelectedCarrier>,
    /// Legacy top-level carrier address
    pub carrier_email: Option<String>,
    /// `<terminalId>_<contactType>_<index>` in the QuickShip flow
    pub selected_carrier_contact_id: Option<String>,
    pub reference_number: Option<String>,
    pub shipment_date: Option<String>,
}

/// Broad shipment category driving attachment rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentType {
    Courier,
    Freight,
}

impl ShipmentData {
    /// Anything that is not explicitly `courier` is treated as freight.
    pub fn shipment_type(&self) -> ShipmentType {
        match self.shipment_type.as_deref().map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("courier") => ShipmentType::Courier,
            _ => ShipmentType::Freight,
        }
    }

    pub fn is_quickship(&self) -> bool {
        self.creation_method
            .as_deref()
            .is_some_and(|m| m.trim().eq_ignore_ascii_case(QUICKSHIP))
    }

    /// Identifier used in logs and subjects.
    pub fn display_id(&self) -> &str {
        self.shipment_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or("unknown")
    }

    pub fn carrier_name(&self) -> Option<&str> {
        let carrier = self.selected_carrier.as_ref()?;
        carrier
            .name
            .as_deref()
            .or(carrier.carrier_name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Postal address with an optional contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub street2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl Address {
    /// Contact name, falling back to first and last name.
    pub fn contact(&self) -> Option<String> {
        if let Some(name) = non_blank(self.contact_name.as_deref()) {
            return Some(name.to_string());
        }
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .filter_map(non_blank)
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    /// Single-line rendering, e.g. "Acme, 1 Main St, Toronto, ON M5V 1A1, CA".
    pub fn one_line(&self) -> String {
        let region = [self.state.as_deref(), self.postal_code.as_deref()]
            .into_iter()
            .filter_map(non_blank)
            .collect::<Vec<_>>()
            .join(" ");

        [
            non_blank(self.company_name.as_deref()),
            non_blank(self.street.as_deref()),
            non_blank(self.street2.as_deref()),
            non_blank(self.city.as_deref()),
            non_blank(Some(region.as_str())),
            non_blank(self.country.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// A package line of the shipment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Package {
    #[serde(deserialize_with = "number_or_string")]
    pub weight: Option<f64>,
    #[serde(deserialize_with = "number_or_string")]
    pub packaging_quantity: Option<f64>,
    pub description: Option<String>,
    pub packaging_type: Option<String>,
}

/// Carrier chosen for the shipment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectedCarrier {
    pub name: Option<String>,
    pub carrier_name: Option<String>,
    #[serde(alias = "carrierID")]
    pub carrier_id: Option<String>,
    pub contact_email: Option<String>,
    /// Terminal-based contacts configured for QuickShip carriers
    #[serde(deserialize_with = "null_as_default")]
    pub email_contacts: Vec<Terminal>,
}

/// A carrier branch holding categorized contact lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Terminal {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    pub name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_default: bool,
    /// Contact type (`dispatch`, `customer_service`, ...) to addresses
    #[serde(deserialize_with = "contact_lists")]
    pub contact_types: HashMap<String, Vec<String>>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Treat an explicit `null` like a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Contact lists where the map, a list or a single entry may be `null`.
fn contact_lists<'de, D>(deserializer: D) -> Result<HashMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<HashMap<String, Option<Vec<Option<String>>>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(kind, emails)| (kind, emails.into_iter().flatten().flatten().collect()))
        .collect())
}

/// Accept `10`, `10.5` or `"10"`; anything else becomes `None`.
pub(crate) fn number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipment_deserialization() {
        let json = r#"{
            "shipmentID": "SH-100",
            "shipmentType": "courier",
            "companyID": "ACME",
            "shipTo": {"email": "to@example.com", "city": "Toronto"},
            "packages": [{"weight": "10", "packagingQuantity": 2}, {"weight": 5}],
            "selectedCarrier": {"name": "Canpar Express"},
            "unknownField": {"ignored": true}
        }"#;

        let shipment: ShipmentData = serde_json::from_str(json).unwrap();
        assert_eq!(shipment.display_id(), "SH-100");
        assert_eq!(shipment.shipment_type(), ShipmentType::Courier);
        assert_eq!(shipment.company_id.as_deref(), Some("ACME"));
        assert_eq!(shipment.packages[0].weight, Some(10.0));
        assert_eq!(shipment.packages[0].packaging_quantity, Some(2.0));
        assert_eq!(shipment.packages[1].packaging_quantity, None);
        assert_eq!(shipment.carrier_name(), Some("Canpar Express"));
    }

    #[test]
    fn test_unknown_shipment_type_is_freight() {
        let mut shipment = ShipmentData::default();
        assert_eq!(shipment.shipment_type(), ShipmentType::Freight);
        shipment.shipment_type = Some("LTL".to_string());
        assert_eq!(shipment.shipment_type(), ShipmentType::Freight);
        shipment.shipment_type = Some(" Courier ".to_string());
        assert_eq!(shipment.shipment_type(), ShipmentType::Courier);
    }

    #[test]
    fn test_is_quickship() {
        let mut shipment = ShipmentData::default();
        assert!(!shipment.is_quickship());
        shipment.creation_method = Some("QuickShip".to_string());
        assert!(shipment.is_quickship());
    }

    #[test]
    fn test_carrier_name_falls_back_to_carrier_name_field() {
        let shipment = ShipmentData {
            selected_carrier: Some(SelectedCarrier {
                carrier_name: Some("Day & Ross".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(shipment.carrier_name(), Some("Day & Ross"));
    }

    #[test]
    fn test_address_rendering() {
        let address = Address {
            company_name: Some("Acme".to_string()),
            street: Some("1 Main St".to_string()),
            city: Some("Toronto".to_string()),
            state: Some("ON".to_string()),
            postal_code: Some("M5V 1A1".to_string()),
            country: Some("CA".to_string()),
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            ..Default::default()
        };
        assert_eq!(address.one_line(), "Acme, 1 Main St, Toronto, ON M5V 1A1, CA");
        assert_eq!(address.contact().as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_null_collections_read_as_empty() {
        let json = r#"{
            "shipmentID": "SH-101",
            "packages": null,
            "selectedCarrier": {"name": "Day & Ross", "emailContacts": null}
        }"#;

        let shipment: ShipmentData = serde_json::from_str(json).unwrap();
        assert!(shipment.packages.is_empty());
        assert!(shipment.selected_carrier.unwrap().email_contacts.is_empty());
    }

    #[test]
    fn test_null_terminal_fields_read_as_defaults() {
        let json = r#"{
            "id": null,
            "isDefault": null,
            "contactTypes": {"dispatch": null, "billing": ["b@example.com", null]}
        }"#;

        let terminal: Terminal = serde_json::from_str(json).unwrap();
        assert_eq!(terminal.id, "");
        assert!(!terminal.is_default);
        assert!(terminal.contact_types["dispatch"].is_empty());
        assert_eq!(terminal.contact_types["billing"], vec!["b@example.com"]);

        let terminal: Terminal = serde_json::from_str(r#"{"id": "T1", "contactTypes": null}"#).unwrap();
        assert_eq!(terminal.id, "T1");
        assert!(terminal.contact_types.is_empty());
    }

    #[test]
    fn test_display_id_unknown() {
        assert_eq!(ShipmentData::default().display_id(), "unknown");
    }
}
