//! Text sections of the report: header, title, customer contact block and the
//! order's free-text fields.

use chrono::{DateTime, Local};

use crate::model::{ContentBlock, CustomerProfile, MaintenanceOrder};

pub const CUSTOMER_HEADING: &str = "CUSTOMER INFORMATION";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Trimmed, non-empty text or nothing.
fn present(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

/// The order's text fields in report order, paired with their headings.
fn order_fields(order: &MaintenanceOrder) -> [(&'static str, Option<&str>); 5] {
    [
        ("SCOPE", order.scope.as_deref()),
        ("PARTS", order.parts.as_deref()),
        ("TOOLS", order.tools.as_deref()),
        ("DOCUMENTS", order.documents.as_deref()),
        ("SERVICE INSTRUCTIONS", order.service_instructions.as_deref()),
    ]
}

fn contact_fields(customer: &CustomerProfile) -> [(&'static str, Option<&str>); 7] {
    [
        ("Customer", Some(customer.name.as_str())),
        ("Check-in Contact", customer.checkin_contact.as_deref()),
        ("Check-in Phone", customer.checkin_phone.as_deref()),
        ("Check-in Instructions", customer.checkin_instructions.as_deref()),
        ("Check-out Contact", customer.checkout_contact.as_deref()),
        ("Check-out Phone", customer.checkout_phone.as_deref()),
        ("Check-out Instructions", customer.checkout_instructions.as_deref()),
    ]
}

pub struct SectionBuilder<'a> {
    support_line: &'a str,
}

impl<'a> SectionBuilder<'a> {
    pub fn new(support_line: &'a str) -> Self {
        Self { support_line }
    }

    pub fn build(
        &self,
        order: &MaintenanceOrder,
        customer: Option<&CustomerProfile>,
        generated_at: DateTime<Local>,
    ) -> Vec<ContentBlock> {
        let mut blocks = vec![ContentBlock::Header {
            generated_at: generated_at.format(TIMESTAMP_FORMAT).to_string(),
            support_line: self.support_line.to_string(),
        }];

        if let Some(title) = present(Some(order.title.as_str())) {
            blocks.push(ContentBlock::Title(title.to_string()));
        }

        if let Some(customer) = customer {
            blocks.extend(customer_section(customer));
        }

        for (label, text) in order_fields(order) {
            // Body keeps the raw text; only the presence check trims.
            if let (Some(_), Some(raw)) = (present(text), text) {
                blocks.push(ContentBlock::Heading(label.to_string()));
                blocks.push(ContentBlock::Body(raw.to_string()));
            }
        }

        blocks
    }
}

/// Page break, heading and one line per non-empty field; nothing at all when
/// every field is empty.
fn customer_section(customer: &CustomerProfile) -> Vec<ContentBlock> {
    let lines: Vec<ContentBlock> = contact_fields(customer)
        .into_iter()
        .filter_map(|(label, value)| {
            present(value).map(|v| ContentBlock::ContactLine {
                label,
                value: v.to_string(),
            })
        })
        .collect();

    if lines.is_empty() {
        log::debug!("Customer {} has no contact details; section omitted", customer.id);
        return Vec::new();
    }

    let mut blocks = Vec::with_capacity(lines.len() + 2);
    blocks.push(ContentBlock::PageBreak);
    blocks.push(ContentBlock::Heading(CUSTOMER_HEADING.to_string()));
    blocks.extend(lines);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn order() -> MaintenanceOrder {
        MaintenanceOrder {
            id: 1,
            title: "Quarterly inspection".into(),
            scope: None,
            parts: None,
            tools: None,
            documents: None,
            service_instructions: None,
            charger_type_id: 2,
            customer_id: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
        }
    }

    fn customer() -> CustomerProfile {
        CustomerProfile {
            id: 9,
            name: "Harbor Fleet".into(),
            checkin_contact: None,
            checkin_phone: None,
            checkin_instructions: None,
            checkout_contact: None,
            checkout_phone: None,
            checkout_instructions: None,
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 19, 14, 5, 0).unwrap()
    }

    fn headings(blocks: &[ContentBlock]) -> Vec<&str> {
        blocks.iter().filter_map(ContentBlock::heading).collect()
    }

    #[test]
    fn header_carries_timestamp_and_support_line() {
        let blocks = SectionBuilder::new("Call 555-0199").build(&order(), None, now());
        match &blocks[0] {
            ContentBlock::Header {
                generated_at,
                support_line,
            } => {
                assert_eq!(generated_at, "2026-10-19 14:05");
                assert_eq!(support_line, "Call 555-0199");
            }
            other => panic!("expected header, got {other:?}"),
        }
    }

    #[test]
    fn all_fields_empty_yields_header_and_title_only() {
        let mut o = order();
        o.scope = Some("   ".into());
        o.tools = Some(String::new());
        let blocks = SectionBuilder::new("support").build(&o, None, now());
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[1], ContentBlock::Title(ref t) if t == "Quarterly inspection"));
        assert!(headings(&blocks).is_empty());
    }

    #[test]
    fn blank_title_is_skipped() {
        let mut o = order();
        o.title = "  ".into();
        let blocks = SectionBuilder::new("support").build(&o, None, now());
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn only_parts_emits_one_heading_with_exact_body() {
        let mut o = order();
        o.parts = Some("Filter, O-ring".into());
        let blocks = SectionBuilder::new("support").build(&o, None, now());
        assert_eq!(headings(&blocks), vec!["PARTS"]);
        let idx = blocks.iter().position(|b| b.heading() == Some("PARTS")).unwrap();
        assert!(matches!(&blocks[idx + 1], ContentBlock::Body(t) if t == "Filter, O-ring"));
        assert_eq!(idx + 2, blocks.len());
    }

    #[test]
    fn fields_follow_fixed_order() {
        let mut o = order();
        o.service_instructions = Some("Torque to spec".into());
        o.scope = Some("Replace cooling fan".into());
        o.documents = Some("Wiring diagram rev C".into());
        let blocks = SectionBuilder::new("support").build(&o, None, now());
        assert_eq!(
            headings(&blocks),
            vec!["SCOPE", "DOCUMENTS", "SERVICE INSTRUCTIONS"]
        );
    }

    #[test]
    fn body_keeps_raw_text() {
        let mut o = order();
        o.tools = Some("  torque wrench\n  multimeter\n".into());
        let blocks = SectionBuilder::new("support").build(&o, None, now());
        assert!(blocks
            .iter()
            .any(|b| matches!(b, ContentBlock::Body(t) if t == "  torque wrench\n  multimeter\n")));
    }

    #[test]
    fn customer_section_lists_only_present_fields_in_order() {
        let mut c = customer();
        c.checkout_phone = Some("555-0102".into());
        c.checkin_contact = Some("Dana at gate 2".into());
        c.checkin_phone = Some("   ".into());
        let blocks = SectionBuilder::new("support").build(&order(), Some(&c), now());

        let break_idx = blocks.iter().position(ContentBlock::is_page_break).unwrap();
        assert_eq!(blocks[break_idx + 1].heading(), Some(CUSTOMER_HEADING));
        let labels: Vec<&str> = blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ContactLine { label, .. } => Some(*label),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["Customer", "Check-in Contact", "Check-out Phone"]);
    }

    #[test]
    fn customer_section_precedes_order_fields() {
        let mut o = order();
        o.scope = Some("Inspect".into());
        let blocks = SectionBuilder::new("support").build(&o, Some(&customer()), now());
        assert_eq!(headings(&blocks), vec![CUSTOMER_HEADING, "SCOPE"]);
    }

    #[test]
    fn empty_customer_contributes_no_page_break() {
        let mut c = customer();
        c.name = " ".into();
        let blocks = SectionBuilder::new("support").build(&order(), Some(&c), now());
        assert!(!blocks.iter().any(ContentBlock::is_page_break));
        assert!(headings(&blocks).is_empty());
    }
}
