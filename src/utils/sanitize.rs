use std::fmt;

use crate::securepay::xml::Element;

const CARD_INFO_PATH: &str = "Payment/TxnList/Txn/CreditCardInfo";
const MERCHANT_INFO_PATH: &str = "MerchantInfo";

/// Card fields blanked under every `CreditCardInfo`. Responses echo `pan`
/// and `cardType` where requests send `cardNumber`.
const SENSITIVE_CARD_FIELDS: &[&str] = &["cardNumber", "pan", "expiryDate", "cardType", "cvv"];
const SENSITIVE_MERCHANT_FIELDS: &[&str] = &["password"];

/// Returns a copy of `document` with card and merchant secrets emptied.
/// Elements stay in place; only their text is cleared.
pub fn redact_document(document: &Element) -> Element {
    let mut redacted = document.clone();
    redact_in_place(&mut redacted);
    redacted
}

fn redact_in_place(document: &mut Element) {
    for card_info in document.find_all_mut(CARD_INFO_PATH) {
        blank_fields(card_info, SENSITIVE_CARD_FIELDS);
    }
    if let Some(merchant_info) = document.find_mut(MERCHANT_INFO_PATH) {
        blank_fields(merchant_info, SENSITIVE_MERCHANT_FIELDS);
    }
}

fn blank_fields(parent: &mut Element, fields: &[&str]) {
    for child in parent.children.iter_mut() {
        if fields.contains(&child.name.as_str()) {
            child.text.clear();
        }
    }
}

/// Display wrapper for logging documents. Redaction runs only when the
/// value is actually formatted, so disabled log levels cost nothing.
pub struct Redacted<'a>(pub &'a Element);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match redact_document(self.0).to_xml() {
            Ok(xml) => f.write_str(&xml),
            Err(e) => write!(f, "<unserializable {}: {}>", self.0.name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Element {
        Element::new("SecurePayMessage")
            .with_child(
                Element::new("MerchantInfo")
                    .with_child(Element::new("merchantID").with_text("ABC0001"))
                    .with_child(Element::new("password").with_text("abc123")),
            )
            .with_child(
                Element::new("Payment").with_child(
                    Element::new("TxnList").with_attribute("count", "1").with_child(
                        Element::new("Txn")
                            .with_attribute("ID", "1")
                            .with_child(Element::new("amount").with_text("1000"))
                            .with_child(
                                Element::new("CreditCardInfo")
                                    .with_child(Element::new("cardNumber").with_text("4444333322221111"))
                                    .with_child(Element::new("cvv").with_text("123"))
                                    .with_child(Element::new("expiryDate").with_text("08/29"))
                                    .with_child(Element::new("cardType").with_text("6")),
                            ),
                    ),
                ),
            )
    }

    #[test]
    fn test_blanks_sensitive_fields_only() {
        let original = request();
        let redacted = redact_document(&original);

        let mut expected = original.clone();
        for path in [
            "MerchantInfo/password",
            "Payment/TxnList/Txn/CreditCardInfo/cardNumber",
            "Payment/TxnList/Txn/CreditCardInfo/cvv",
            "Payment/TxnList/Txn/CreditCardInfo/expiryDate",
            "Payment/TxnList/Txn/CreditCardInfo/cardType",
        ] {
            expected.find_mut(path).unwrap().text.clear();
        }

        assert_eq!(redacted, expected);
        assert_eq!(redacted.find_text("MerchantInfo/merchantID"), Some("ABC0001"));
        assert_eq!(redacted.find_text("Payment/TxnList/Txn/amount"), Some("1000"));
    }

    #[test]
    fn test_does_not_touch_the_original() {
        let original = request();
        let _ = redact_document(&original);
        assert_eq!(original.find_text("MerchantInfo/password"), Some("abc123"));
        assert_eq!(
            original.find_text("Payment/TxnList/Txn/CreditCardInfo/cardNumber"),
            Some("4444333322221111")
        );
    }

    #[test]
    fn test_idempotent() {
        let once = redact_document(&request());
        assert_eq!(redact_document(&once), once);
    }

    #[test]
    fn test_tolerates_documents_without_sensitive_sections() {
        let doc = Element::new("SecurePayMessage")
            .with_child(Element::new("Status").with_child(Element::new("statusCode").with_text("000")));
        assert_eq!(redact_document(&doc), doc);
    }

    #[test]
    fn test_redacts_response_pan() {
        let doc = Element::parse(
            "<SecurePayMessage><Payment><TxnList><Txn><CreditCardInfo><pan>444433...111</pan><cardDescription>Visa</cardDescription></CreditCardInfo></Txn></TxnList></Payment></SecurePayMessage>",
        )
        .unwrap();
        let redacted = redact_document(&doc);
        let info = redacted.find("Payment/TxnList/Txn/CreditCardInfo").unwrap();
        assert_eq!(info.find_text("pan"), Some(""));
        assert_eq!(info.find_text("cardDescription"), Some("Visa"));
    }

    #[test]
    fn test_redacted_display() {
        let logged = Redacted(&request()).to_string();
        assert!(!logged.contains("4444333322221111"));
        assert!(!logged.contains("abc123"));
        assert!(logged.contains("<password/>"));
        assert!(logged.contains("<merchantID>ABC0001</merchantID>"));
    }
}
