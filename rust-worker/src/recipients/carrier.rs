//! Carrier address resolution.
//!
//! QuickShip carriers keep their contacts per terminal; the booking flow
//! stores a single carrier address. The two sources never mix.

use tracing::debug;

use super::clean_email;
use crate::shipment::{ShipmentData, Terminal};

/// Contact types in the order they are tried on a terminal.
pub const CONTACT_TYPE_PRIORITY: [&str; 8] = [
    "dispatch",
    "customer_service",
    "quotes",
    "billing_adjustments",
    "claims",
    "sales_reps",
    "customs",
    "other",
];

/// A resolved carrier address and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarrierEmail {
    Terminal { email: String, terminal_id: String },
    SelectedCarrier(String),
    CarrierEmailField(String),
}

impl CarrierEmail {
    pub fn email(&self) -> &str {
        match self {
            CarrierEmail::Terminal { email, .. } => email,
            CarrierEmail::SelectedCarrier(email) | CarrierEmail::CarrierEmailField(email) => email,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            CarrierEmail::Terminal { .. } => "quickship_terminal",
            CarrierEmail::SelectedCarrier(_) => "selected_carrier",
            CarrierEmail::CarrierEmailField(_) => "carrier_email",
        }
    }
}

/// Resolve the carrier address for a shipment.
///
/// Returns `None` when the selected source has no usable address; the
/// caller applies the no-recipient policy.
pub fn resolve_carrier_email(shipment: &ShipmentData) -> Option<CarrierEmail> {
    let terminals = shipment
        .selected_carrier
        .as_ref()
        .map(|c| c.email_contacts.as_slice())
        .unwrap_or(&[]);

    if shipment.is_quickship() && !terminals.is_empty() {
        let terminal = select_terminal(terminals, shipment.selected_carrier_contact_id.as_deref())?;
        let email = first_terminal_email(terminal)?;
        debug!(
            terminal_id = %terminal.id,
            email = %email,
            "carrier_email_from_terminal"
        );
        return Some(CarrierEmail::Terminal {
            email,
            terminal_id: terminal.id.clone(),
        });
    }

    if let Some(email) = shipment
        .selected_carrier
        .as_ref()
        .and_then(|c| clean_email(c.contact_email.as_deref()))
    {
        return Some(CarrierEmail::SelectedCarrier(email));
    }

    clean_email(shipment.carrier_email.as_deref()).map(CarrierEmail::CarrierEmailField)
}

/// Terminal named by the contact id prefix, else the default, else the first.
fn select_terminal<'a>(terminals: &'a [Terminal], contact_id: Option<&str>) -> Option<&'a Terminal> {
    let terminal_id = contact_id
        .and_then(|id| id.split('_').next())
        .map(str::trim)
        .filter(|id| !id.is_empty());

    terminal_id
        .and_then(|id| terminals.iter().find(|t| t.id == id))
        .or_else(|| terminals.iter().find(|t| t.is_default))
        .or_else(|| terminals.first())
}

fn first_terminal_email(terminal: &Terminal) -> Option<String> {
    CONTACT_TYPE_PRIORITY.iter().find_map(|contact_type| {
        terminal
            .contact_types
            .get(*contact_type)?
            .iter()
            .find_map(|email| clean_email(Some(email.as_str())))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipment::SelectedCarrier;
    use std::collections::HashMap;

    fn terminal(id: &str, is_default: bool, contacts: &[(&str, &str)]) -> Terminal {
        let mut contact_types: HashMap<String, Vec<String>> = HashMap::new();
        for (contact_type, email) in contacts {
            contact_types
                .entry(contact_type.to_string())
                .or_default()
                .push(email.to_string());
        }
        Terminal {
            id: id.to_string(),
            name: Some(format!("{} terminal", id)),
            is_default,
            contact_types,
        }
    }

    fn quickship(terminals: Vec<Terminal>, contact_id: Option<&str>) -> ShipmentData {
        ShipmentData {
            creation_method: Some("quickship".to_string()),
            selected_carrier_contact_id: contact_id.map(str::to_string),
            selected_carrier: Some(SelectedCarrier {
                name: Some("Freight Co".to_string()),
                contact_email: Some("legacy@carrier.com".to_string()),
                email_contacts: terminals,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_quickship_terminal_by_contact_id() {
        let shipment = quickship(
            vec![
                terminal("TERM0", true, &[("dispatch", "default@x.com")]),
                terminal("TERM1", false, &[("dispatch", "ops@x.com")]),
            ],
            Some("TERM1_dispatch_0"),
        );

        let resolved = resolve_carrier_email(&shipment).unwrap();
        assert_eq!(resolved.email(), "ops@x.com");
        assert_eq!(resolved.source(), "quickship_terminal");
    }

    #[test]
    fn test_quickship_falls_back_to_default_terminal() {
        let shipment = quickship(
            vec![
                terminal("TERM0", false, &[("dispatch", "first@x.com")]),
                terminal("TERM9", true, &[("claims", "claims@x.com")]),
            ],
            Some("MISSING_dispatch_0"),
        );

        assert_eq!(resolve_carrier_email(&shipment).unwrap().email(), "claims@x.com");
    }

    #[test]
    fn test_quickship_falls_back_to_first_terminal() {
        let shipment = quickship(
            vec![
                terminal("TERM0", false, &[("quotes", "quotes@x.com")]),
                terminal("TERM1", false, &[("dispatch", "ops@x.com")]),
            ],
            None,
        );

        assert_eq!(resolve_carrier_email(&shipment).unwrap().email(), "quotes@x.com");
    }

    #[test]
    fn test_contact_type_priority_skips_empty_entries() {
        let shipment = quickship(
            vec![terminal(
                "TERM1",
                false,
                &[
                    ("other", "other@x.com"),
                    ("dispatch", ""),
                    ("dispatch", "  "),
                    ("customer_service", "cs@x.com"),
                ],
            )],
            Some("TERM1_other_0"),
        );

        assert_eq!(resolve_carrier_email(&shipment).unwrap().email(), "cs@x.com");
    }

    #[test]
    fn test_quickship_terminal_without_emails_does_not_use_legacy() {
        let shipment = quickship(vec![terminal("TERM1", true, &[("dispatch", "")])], None);
        assert_eq!(resolve_carrier_email(&shipment), None);
    }

    #[test]
    fn test_legacy_selected_carrier_email() {
        let mut shipment = quickship(Vec::new(), None);
        shipment.creation_method = None;
        assert_eq!(
            resolve_carrier_email(&shipment),
            Some(CarrierEmail::SelectedCarrier("legacy@carrier.com".to_string()))
        );
    }

    #[test]
    fn test_legacy_carrier_email_field() {
        let shipment = ShipmentData {
            carrier_email: Some("field@carrier.com".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_carrier_email(&shipment),
            Some(CarrierEmail::CarrierEmailField("field@carrier.com".to_string()))
        );
    }

    #[test]
    fn test_no_carrier_email() {
        assert_eq!(resolve_carrier_email(&ShipmentData::default()), None);
    }
}
