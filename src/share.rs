//! Share payloads.
//!
//! The vault never sends anything itself. It hands the client a deep link
//! (WhatsApp, e-mail) or tells it to run a local transfer (Bluetooth,
//! clipboard), and records an audit row either way.

use crate::model::{ShareMethod, UploadedDocument};
use url::form_urlencoded::byte_serialize;

pub const STATUS_READY: &str = "ready";
pub const STATUS_INITIATED: &str = "initiated";

/// Link and status for one share, before it is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub status: &'static str,
    pub link: Option<String>,
}

/// Build the payload for sharing `document` via `method`.
pub fn build_payload(
    method: ShareMethod,
    recipient: Option<&str>,
    document: &UploadedDocument,
) -> SharePayload {
    let recipient = recipient.map(str::trim).filter(|r| !r.is_empty());
    match method {
        ShareMethod::Whatsapp => {
            let phone: String = recipient
                .unwrap_or_default()
                .chars()
                .filter(char::is_ascii_digit)
                .collect();
            let text = encode(&share_text(document));
            SharePayload {
                status: STATUS_READY,
                link: Some(format!("https://wa.me/{phone}?text={text}")),
            }
        }
        ShareMethod::Email => {
            let to: String = recipient.map(encode_address).unwrap_or_default();
            let subject = encode(&format!("Shared document: {}", document.name));
            let body = encode(&share_text(document));
            SharePayload {
                status: STATUS_READY,
                link: Some(format!("mailto:{to}?subject={subject}&body={body}")),
            }
        }
        ShareMethod::Bluetooth | ShareMethod::Copy => SharePayload {
            status: STATUS_INITIATED,
            link: None,
        },
    }
}

fn share_text(document: &UploadedDocument) -> String {
    format!(
        "{} ({}): {}",
        document.name,
        document.category.label(),
        document.binary.url
    )
}

/// Percent-encode for a query value. Spaces become `%20`, not `+`, since
/// mail clients do not decode `+` in `mailto:` links.
fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Keep `@` readable in the address part of a `mailto:` link.
fn encode_address(address: &str) -> String {
    encode(address).replace("%40", "@")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BinaryRef, DocumentCategory, ExtractedFields};
    use chrono::Utc;

    fn doc() -> UploadedDocument {
        let now = Utc::now();
        UploadedDocument {
            id: "d1".into(),
            owner_id: "u1".into(),
            name: "My Visa".into(),
            category: DocumentCategory::Visa,
            binary: BinaryRef {
                path: "documents/u1/d1/original.jpg".into(),
                content_type: "image/jpeg".into(),
                size: 3,
                url: "https://files.example.com/documents/u1/d1/original.jpg".into(),
            },
            thumbnail: None,
            raw_text: String::new(),
            extracted_fields: ExtractedFields::default(),
            tags: vec![],
            expiry_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn whatsapp_link_keeps_only_digits() {
        let p = build_payload(ShareMethod::Whatsapp, Some("+1 (555) 010-2030"), &doc());
        let link = p.link.unwrap();
        assert!(link.starts_with("https://wa.me/15550102030?text="), "{link}");
        assert!(link.contains("My%20Visa"));
        assert_eq!(p.status, STATUS_READY);
    }

    #[test]
    fn whatsapp_without_recipient_opens_picker() {
        let p = build_payload(ShareMethod::Whatsapp, None, &doc());
        assert!(p.link.unwrap().starts_with("https://wa.me/?text="));
    }

    #[test]
    fn email_link_has_subject_and_body() {
        let p = build_payload(ShareMethod::Email, Some("ana@example.com"), &doc());
        let link = p.link.unwrap();
        assert!(link.starts_with("mailto:ana@example.com?subject=Shared%20document%3A%20My%20Visa&body="), "{link}");
        assert!(link.contains("https%3A%2F%2Ffiles.example.com"));
    }

    #[test]
    fn local_transfers_are_initiated_without_link() {
        for method in [ShareMethod::Bluetooth, ShareMethod::Copy] {
            let p = build_payload(method, Some("ignored"), &doc());
            assert_eq!(p.status, STATUS_INITIATED);
            assert!(p.link.is_none());
        }
    }
}
