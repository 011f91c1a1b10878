//! Email bodies for the three recipient classes.
//!
//! Handlebars renders the HTML bodies with escaping and the text bodies
//! without it.

use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::Attachment;
use crate::error::{NotifyError, NotifyResult};
use crate::recipients::RecipientClass;
use crate::shipment::{format_quantity, ShipmentData, ShipmentTotals, ShipmentType};

/// Rendered email content.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Values available to every template.
#[derive(Debug, Clone, Serialize)]
pub struct EmailContext {
    pub shipment_id: String,
    pub shipment_type: ShipmentType,
    pub reference_number: Option<String>,
    pub shipment_date: Option<String>,
    pub carrier_name: Option<String>,
    pub ship_from: Option<String>,
    pub ship_to: Option<String>,
    pub ship_to_contact: Option<String>,
    pub total_weight: String,
    pub total_pieces: String,
    pub package_count: usize,
    pub attachments: Vec<String>,
}

impl EmailContext {
    pub fn new(shipment: &ShipmentData, attachments: &[Attachment]) -> Self {
        let totals = ShipmentTotals::from_packages(&shipment.packages);
        let one_line = |address: Option<&crate::shipment::Address>| {
            address.map(|a| a.one_line()).filter(|s| !s.is_empty())
        };

        Self {
            shipment_id: shipment.display_id().to_string(),
            shipment_type: shipment.shipment_type(),
            reference_number: shipment.reference_number.clone(),
            shipment_date: shipment.shipment_date.clone(),
            carrier_name: shipment.carrier_name().map(str::to_string),
            ship_from: one_line(shipment.ship_from.as_ref()),
            ship_to: one_line(shipment.ship_to.as_ref()),
            ship_to_contact: shipment.ship_to.as_ref().and_then(|a| a.contact()),
            total_weight: format_quantity(totals.weight),
            total_pieces: format_quantity(totals.pieces),
            package_count: shipment.packages.len(),
            attachments: attachments.iter().map(|a| a.filename.clone()).collect(),
        }
    }
}

pub struct EmailComposer {
    html: Handlebars<'static>,
    text: Handlebars<'static>,
}

impl EmailComposer {
    pub fn new() -> NotifyResult<Self> {
        let mut html = Handlebars::new();
        let mut text = Handlebars::new();
        text.register_escape_fn(handlebars::no_escape);

        html.register_partial("details", DETAILS_HTML)
            .map_err(|e| NotifyError::Template(format!("details_html: {}", e)))?;
        text.register_partial("details", DETAILS_TEXT)
            .map_err(|e| NotifyError::Template(format!("details_text: {}", e)))?;

        for (name, html_source, text_source) in [
            ("customer", CUSTOMER_HTML, CUSTOMER_TEXT),
            ("carrier", CARRIER_HTML, CARRIER_TEXT),
            ("internal", INTERNAL_HTML, INTERNAL_TEXT),
        ] {
            html.register_template_string(name, html_source)
                .map_err(|e| NotifyError::Template(format!("{}_html: {}", name, e)))?;
            text.register_template_string(name, text_source)
                .map_err(|e| NotifyError::Template(format!("{}_text: {}", name, e)))?;
        }

        Ok(Self { html, text })
    }

    pub fn compose(&self, class: RecipientClass, context: &EmailContext) -> NotifyResult<RenderedEmail> {
        debug!(
            shipment_id = %context.shipment_id,
            class = class.as_str(),
            "email_compose"
        );

        let subject = match class {
            RecipientClass::Customer => format!("Shipment {} Confirmed", context.shipment_id),
            RecipientClass::Carrier => {
                format!("New Shipment {} - Pickup Request", context.shipment_id)
            }
            RecipientClass::Internal => format!("[Internal] Shipment {} Created", context.shipment_id),
        };

        Ok(RenderedEmail {
            subject,
            html: self.html.render(class.as_str(), context)?,
            text: self.text.render(class.as_str(), context)?,
        })
    }
}

const DETAILS_HTML: &str = r#"<table cellpadding="4">
<tr><td><strong>Shipment ID</strong></td><td>{{shipment_id}}</td></tr>
{{#if reference_number}}<tr><td><strong>Reference</strong></td><td>{{reference_number}}</td></tr>{{/if}}
{{#if shipment_date}}<tr><td><strong>Ship Date</strong></td><td>{{shipment_date}}</td></tr>{{/if}}
{{#if carrier_name}}<tr><td><strong>Carrier</strong></td><td>{{carrier_name}}</td></tr>{{/if}}
{{#if ship_from}}<tr><td><strong>From</strong></td><td>{{ship_from}}</td></tr>{{/if}}
{{#if ship_to}}<tr><td><strong>To</strong></td><td>{{ship_to}}</td></tr>{{/if}}
<tr><td><strong>Pieces</strong></td><td>{{total_pieces}}</td></tr>
<tr><td><strong>Total Weight</strong></td><td>{{total_weight}}</td></tr>
</table>
{{#if attachments}}<p>Attached:</p><ul>{{#each attachments}}<li>{{this}}</li>{{/each}}</ul>{{/if}}"#;

const DETAILS_TEXT: &str = r#"Shipment ID: {{shipment_id}}
{{#if reference_number}}Reference: {{reference_number}}
{{/if}}{{#if shipment_date}}Ship Date: {{shipment_date}}
{{/if}}{{#if carrier_name}}Carrier: {{carrier_name}}
{{/if}}{{#if ship_from}}From: {{ship_from}}
{{/if}}{{#if ship_to}}To: {{ship_to}}
{{/if}}Pieces: {{total_pieces}}
Total Weight: {{total_weight}}
{{#if attachments}}
Attached:
{{#each attachments}}- {{this}}
{{/each}}{{/if}}"#;

const CUSTOMER_HTML: &str = concat!(
    "<html><body>",
    "<h2>Your shipment has been booked</h2>",
    "<p>{{#if ship_to_contact}}Hello {{ship_to_contact}},{{else}}Hello,{{/if}}</p>",
    "<p>Your {{shipment_type}} shipment is confirmed. The details are below.</p>",
    r#"<table cellpadding="4">
<tr><td><strong>Shipment ID</strong></td><td>{{shipment_id}}</td></tr>
{{#if reference_number}}<tr><td><strong>Reference</strong></td><td>{{reference_number}}</td></tr>{{/if}}
{{#if carrier_name}}<tr><td><strong>Carrier</strong></td><td>{{carrier_name}}</td></tr>{{/if}}
{{#if ship_to}}<tr><td><strong>To</strong></td><td>{{ship_to}}</td></tr>{{/if}}
<tr><td><strong>Pieces</strong></td><td>{{total_pieces}}</td></tr>
<tr><td><strong>Total Weight</strong></td><td>{{total_weight}}</td></tr>
</table>"#,
    "{{#if attachments}}<p>Your shipping documents are attached.</p>{{/if}}",
    "</body></html>"
);

const CUSTOMER_TEXT: &str = r#"Your shipment has been booked.

Shipment ID: {{shipment_id}}
{{#if reference_number}}Reference: {{reference_number}}
{{/if}}{{#if carrier_name}}Carrier: {{carrier_name}}
{{/if}}{{#if ship_to}}To: {{ship_to}}
{{/if}}Pieces: {{total_pieces}}
Total Weight: {{total_weight}}
{{#if attachments}}
Your shipping documents are attached.
{{/if}}"#;

const CARRIER_HTML: &str = concat!(
    "<html><body>",
    "<h2>New pickup request</h2>",
    "<p>A new {{shipment_type}} shipment has been booked with you. Please arrange pickup.</p>",
    r#"<table cellpadding="4">
<tr><td><strong>Shipment ID</strong></td><td>{{shipment_id}}</td></tr>
{{#if reference_number}}<tr><td><strong>Reference</strong></td><td>{{reference_number}}</td></tr>{{/if}}
{{#if shipment_date}}<tr><td><strong>Ship Date</strong></td><td>{{shipment_date}}</td></tr>{{/if}}
{{#if ship_from}}<tr><td><strong>Pickup</strong></td><td>{{ship_from}}</td></tr>{{/if}}
{{#if ship_to}}<tr><td><strong>Deliver To</strong></td><td>{{ship_to}}</td></tr>{{/if}}
<tr><td><strong>Pieces</strong></td><td>{{total_pieces}}</td></tr>
<tr><td><strong>Total Weight</strong></td><td>{{total_weight}}</td></tr>
</table>"#,
    "{{#if attachments}}<p>Attached:</p><ul>{{#each attachments}}<li>{{this}}</li>{{/each}}</ul>{{/if}}",
    "</body></html>"
);

const CARRIER_TEXT: &str = r#"New pickup request.

Shipment ID: {{shipment_id}}
{{#if reference_number}}Reference: {{reference_number}}
{{/if}}{{#if shipment_date}}Ship Date: {{shipment_date}}
{{/if}}{{#if ship_from}}Pickup: {{ship_from}}
{{/if}}{{#if ship_to}}Deliver To: {{ship_to}}
{{/if}}Pieces: {{total_pieces}}
Total Weight: {{total_weight}}
{{#if attachments}}
Attached:
{{#each attachments}}- {{this}}
{{/each}}{{/if}}"#;

const INTERNAL_HTML: &str = concat!(
    "<html><body>",
    "<h2>Shipment created</h2>",
    "<p>A {{shipment_type}} shipment was created with {{package_count}} package line(s).</p>",
    "{{> details}}",
    "</body></html>"
);

const INTERNAL_TEXT: &str = concat!(
    "Shipment created ({{shipment_type}}, {{package_count}} package line(s)).\n\n",
    "{{> details}}"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipment::{Address, Package, SelectedCarrier};

    fn shipment() -> ShipmentData {
        ShipmentData {
            shipment_id: Some("SH-42".to_string()),
            shipment_type: Some("freight".to_string()),
            reference_number: Some("PO <77>".to_string()),
            ship_to: Some(Address {
                company_name: Some("Acme & Sons".to_string()),
                city: Some("Toronto".to_string()),
                contact_name: Some("Jane".to_string()),
                ..Default::default()
            }),
            packages: vec![
                Package {
                    weight: Some(10.0),
                    packaging_quantity: Some(2.0),
                    ..Default::default()
                },
                Package {
                    weight: Some(5.0),
                    packaging_quantity: Some(1.0),
                    ..Default::default()
                },
            ],
            selected_carrier: Some(SelectedCarrier {
                name: Some("Day & Ross".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn bol() -> Attachment {
        Attachment {
            content: "JVBERi0=".to_string(),
            filename: "SH-42-BOL.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
        }
    }

    #[test]
    fn test_context_totals() {
        let context = EmailContext::new(&shipment(), &[bol()]);
        assert_eq!(context.total_weight, "25");
        assert_eq!(context.total_pieces, "3");
        assert_eq!(context.package_count, 2);
        assert_eq!(context.attachments, vec!["SH-42-BOL.pdf".to_string()]);
    }

    #[test]
    fn test_subjects() {
        let composer = EmailComposer::new().unwrap();
        let context = EmailContext::new(&shipment(), &[]);

        let customer = composer.compose(RecipientClass::Customer, &context).unwrap();
        let carrier = composer.compose(RecipientClass::Carrier, &context).unwrap();
        let internal = composer.compose(RecipientClass::Internal, &context).unwrap();

        assert_eq!(customer.subject, "Shipment SH-42 Confirmed");
        assert_eq!(carrier.subject, "New Shipment SH-42 - Pickup Request");
        assert_eq!(internal.subject, "[Internal] Shipment SH-42 Created");
    }

    #[test]
    fn test_html_is_escaped_text_is_not() {
        let composer = EmailComposer::new().unwrap();
        let context = EmailContext::new(&shipment(), &[bol()]);
        let email = composer.compose(RecipientClass::Carrier, &context).unwrap();

        assert!(email.html.contains("PO &lt;77&gt;"));
        assert!(email.html.contains("SH-42-BOL.pdf"));
        assert!(email.text.contains("Reference: PO <77>"));
        assert!(email.text.contains("Total Weight: 25"));
        assert!(email.text.contains("- SH-42-BOL.pdf"));
    }

    #[test]
    fn test_internal_uses_details_partial() {
        let composer = EmailComposer::new().unwrap();
        let context = EmailContext::new(&shipment(), &[]);
        let email = composer.compose(RecipientClass::Internal, &context).unwrap();

        assert!(email.text.contains("Shipment ID: SH-42"));
        assert!(email.text.contains("Carrier: Day & Ross"));
        assert!(email.html.contains("Day &amp; Ross"));
    }
}
