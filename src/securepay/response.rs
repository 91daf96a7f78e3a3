//! Interpretation of SecurePay response documents.

use thiserror::Error;

use super::xml::Element;

pub const TXN_RESULT_PATH: &str = "Payment/TxnList/Txn";
/// `statusCode` returned when the message itself was accepted.
pub const STATUS_NORMAL: &str = "000";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpretError {
    #[error("Response is not well-formed XML")]
    Unparseable,
    #[error("Response has no transaction result (status {status_code:?}: {status_description:?})")]
    MissingResultNode {
        status_code: Option<String>,
        status_description: Option<String>,
    },
}

/// Message-level `Status` block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GatewayStatus {
    pub code: String,
    pub description: String,
}

impl GatewayStatus {
    pub fn from_document(document: &Element) -> Option<Self> {
        let status = document.find("Status")?;
        Some(Self {
            code: status.find_text("statusCode").unwrap_or_default().to_string(),
            description: status
                .find_text("statusDescription")
                .unwrap_or_default()
                .to_string(),
        })
    }

    pub fn is_normal(&self) -> bool {
        self.code == STATUS_NORMAL
    }
}

/// What the gateway said about one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnOutcome {
    pub approved: bool,
    pub response_code: String,
    pub response_text: String,
    pub txn_id: Option<String>,
    pub preauth_id: Option<String>,
}

/// Reads the single `Txn` result from a response document.
pub fn interpret(document: &Element) -> Result<TxnOutcome, InterpretError> {
    let txn = document.find(TXN_RESULT_PATH).ok_or_else(|| {
        let status = GatewayStatus::from_document(document);
        InterpretError::MissingResultNode {
            status_code: status.as_ref().map(|s| s.code.clone()),
            status_description: status.map(|s| s.description),
        }
    })?;

    Ok(TxnOutcome {
        approved: txn.find_text("approved").map(is_approved).unwrap_or(false),
        response_code: text_or_empty(txn, "responseCode"),
        response_text: text_or_empty(txn, "responseText"),
        txn_id: optional_text(txn, "txnID"),
        preauth_id: optional_text(txn, "preauthID"),
    })
}

/// The gateway documents `Yes` but has been seen sending `YES` too.
pub fn is_approved(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}

fn text_or_empty(node: &Element, path: &str) -> String {
    node.find_text(path).unwrap_or_default().to_string()
}

fn optional_text(node: &Element, path: &str) -> Option<String> {
    node.find_text(path)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const APPROVED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<SecurePayMessage>
  <MessageInfo>
    <messageID>8af793f9af34bea0cf40f5fb5c630c</messageID>
    <messageTimestamp>20240503140709123000+600</messageTimestamp>
    <apiVersion>xml-4.2</apiVersion>
  </MessageInfo>
  <RequestType>Payment</RequestType>
  <MerchantInfo><merchantID>ABC0001</merchantID></MerchantInfo>
  <Status><statusCode>000</statusCode><statusDescription>Normal</statusDescription></Status>
  <Payment>
    <TxnList count="1">
      <Txn ID="1">
        <txnType>10</txnType>
        <txnSource>0</txnSource>
        <amount>1000</amount>
        <purchaseOrderNo>Transaction-1</purchaseOrderNo>
        <approved>Yes</approved>
        <responseCode>00</responseCode>
        <responseText>Approved</responseText>
        <txnID>009844</txnID>
        <preauthID>558391</preauthID>
        <CreditCardInfo>
          <pan>444433...111</pan>
          <expiryDate>08/29</expiryDate>
          <cardType>6</cardType>
          <cardDescription>Visa</cardDescription>
        </CreditCardInfo>
      </Txn>
    </TxnList>
  </Payment>
</SecurePayMessage>"#;

    #[test]
    fn test_interprets_approved_response() {
        let doc = Element::parse(APPROVED).unwrap();
        let outcome = interpret(&doc).unwrap();
        assert_eq!(
            outcome,
            TxnOutcome {
                approved: true,
                response_code: "00".to_string(),
                response_text: "Approved".to_string(),
                txn_id: Some("009844".to_string()),
                preauth_id: Some("558391".to_string()),
            }
        );
    }

    #[test]
    fn test_approval_is_case_insensitive() {
        assert!(is_approved("Yes"));
        assert!(is_approved("YES"));
        assert!(is_approved("yes"));
        assert!(!is_approved("No"));
        assert!(!is_approved("NO"));
        assert!(!is_approved("y"));
        assert!(!is_approved(""));
    }

    #[test]
    fn test_absent_fields_default() {
        let doc = Element::parse(
            "<SecurePayMessage><Payment><TxnList><Txn><approved>No</approved></Txn></TxnList></Payment></SecurePayMessage>",
        )
        .unwrap();
        let outcome = interpret(&doc).unwrap();
        assert!(!outcome.approved);
        assert_eq!(outcome.response_code, "");
        assert_eq!(outcome.response_text, "");
        assert_eq!(outcome.txn_id, None);
        assert_eq!(outcome.preauth_id, None);
    }

    #[test]
    fn test_missing_approved_is_not_approved() {
        let doc = Element::parse(
            "<SecurePayMessage><Payment><TxnList><Txn><responseCode>05</responseCode></Txn></TxnList></Payment></SecurePayMessage>",
        )
        .unwrap();
        assert!(!interpret(&doc).unwrap().approved);
    }

    #[test]
    fn test_missing_result_node_reports_status() {
        let doc = Element::parse(
            "<SecurePayMessage><Status><statusCode>504</statusCode><statusDescription>Invalid merchant ID</statusDescription></Status></SecurePayMessage>",
        )
        .unwrap();
        assert_eq!(
            interpret(&doc),
            Err(InterpretError::MissingResultNode {
                status_code: Some("504".to_string()),
                status_description: Some("Invalid merchant ID".to_string()),
            })
        );
    }

    #[test]
    fn test_gateway_status() {
        let doc = Element::parse(APPROVED).unwrap();
        let status = GatewayStatus::from_document(&doc).unwrap();
        assert!(status.is_normal());
        assert_eq!(status.description, "Normal");
    }
}
