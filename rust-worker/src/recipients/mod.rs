//! Recipient resolution for the three notification classes.
//!
//! - Customer: `shipTo.email`, else `customerEmail`
//! - Carrier: QuickShip terminal contacts or the legacy carrier address
//! - Internal: subscribers from the [`SubscriptionStore`](crate::subscriptions::SubscriptionStore)

pub mod carrier;

use serde::{Deserialize, Serialize};

use crate::shipment::ShipmentData;

pub use carrier::{resolve_carrier_email, CarrierEmail, CONTACT_TYPE_PRIORITY};

/// Recipient class of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientClass {
    Customer,
    Carrier,
    Internal,
}

impl RecipientClass {
    pub fn as_str(self) -> &'static str {
        match self {
            RecipientClass::Customer => "customer",
            RecipientClass::Carrier => "carrier",
            RecipientClass::Internal => "internal",
        }
    }
}

/// Customer address: `shipTo.email`, falling back to `customerEmail`.
pub fn resolve_customer_email(shipment: &ShipmentData) -> Option<String> {
    shipment
        .ship_to
        .as_ref()
        .and_then(|to| clean_email(to.email.as_deref()))
        .or_else(|| clean_email(shipment.customer_email.as_deref()))
}

pub(crate) fn clean_email(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipment::Address;

    #[test]
    fn test_customer_email_prefers_ship_to() {
        let shipment = ShipmentData {
            ship_to: Some(Address {
                email: Some("to@example.com".to_string()),
                ..Default::default()
            }),
            customer_email: Some("customer@example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_customer_email(&shipment).as_deref(), Some("to@example.com"));
    }

    #[test]
    fn test_customer_email_falls_back() {
        let shipment = ShipmentData {
            ship_to: Some(Address {
                email: Some("  ".to_string()),
                ..Default::default()
            }),
            customer_email: Some(" customer@example.com ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_customer_email(&shipment).as_deref(),
            Some("customer@example.com")
        );
    }

    #[test]
    fn test_customer_email_missing() {
        assert_eq!(resolve_customer_email(&ShipmentData::default()), None);
    }

    #[test]
    fn test_recipient_class_serialization() {
        let json = serde_json::to_string(&RecipientClass::Internal).unwrap();
        assert_eq!(json, "\"internal\"");
    }
}
