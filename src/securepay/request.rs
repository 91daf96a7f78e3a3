//! Request documents for the SecurePay XML API.
//!
//! Every request is a `SecurePayMessage` wrapping a `MessageInfo` block, a
//! `MerchantInfo` block, the `RequestType` literal and, for payments, a
//! single `Txn` inside `Payment/TxnList`.

use chrono::{DateTime, FixedOffset};
use thiserror::Error;
use uuid::Uuid;

use super::timestamp;
use super::xml::Element;
use crate::domain::transaction::AmountOutOfRange;
use crate::domain::{BankAccount, CreditCard, Merchant, Transaction, TxnType};

pub const API_VERSION: &str = "xml-4.2";
pub const TIMEOUT_SECS: u32 = 60;
/// `txnSource` is always 0 for XML API requests.
pub const TXN_SOURCE: u32 = 0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Transaction type {0} cannot be built with this request")]
    UnsupportedTxnType(TxnType),
    #[error("Transaction {0} requires a reference transaction")]
    MissingReference(i64),
    #[error("Reference transaction {reference} has no gateway {field}")]
    MissingReferenceId { reference: i64, field: &'static str },
    #[error("{0}")]
    Amount(#[from] AmountOutOfRange),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Payment,
    Echo,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Payment => "Payment",
            RequestType::Echo => "Echo",
        }
    }
}

/// SecurePay's numeric `txnType` for each operation.
pub fn txn_type_code(txn_type: TxnType) -> u32 {
    match txn_type {
        TxnType::Pay => 0,
        TxnType::Refund => 4,
        TxnType::Reversal => 6,
        TxnType::Preauth => 10,
        TxnType::Complete => 11,
        TxnType::Credit => 15,
        TxnType::Debit => 17,
    }
}

/// Identity and time stamp of one outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageInfo {
    pub message_id: String,
    pub timestamp: DateTime<FixedOffset>,
}

impl MessageInfo {
    pub fn new(message_id: impl Into<String>, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            message_id: message_id.into(),
            timestamp,
        }
    }

    /// Random v4 message id, stamped with the local time.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string(), timestamp::now())
    }

    fn to_element(&self) -> Element {
        Element::new("MessageInfo").with_children([
            Element::new("messageID").with_text(&self.message_id),
            Element::new("messageTimestamp").with_text(timestamp::encode(&self.timestamp)),
            Element::new("timeoutValue").with_text(TIMEOUT_SECS),
            Element::new("apiVersion").with_text(API_VERSION),
        ])
    }
}

/// Builds request documents for one merchant.
pub struct RequestBuilder<'a> {
    merchant: &'a Merchant,
    message: Option<MessageInfo>,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(merchant: &'a Merchant) -> Self {
        Self {
            merchant,
            message: None,
        }
    }

    /// Pins the message id and timestamp instead of generating them.
    pub fn with_message_info(mut self, message: MessageInfo) -> Self {
        self.message = Some(message);
        self
    }

    /// Card payment, for `pay` and `preauth`.
    pub fn payment(&self, transaction: &Transaction, card: &CreditCard) -> Result<Element, BuildError> {
        expect_type(transaction, &[TxnType::Pay, TxnType::Preauth])?;

        let txn = basic_txn(transaction)?.with_child(credit_card_info(card));
        Ok(self.message_document(RequestType::Payment, Some(wrap_txn(txn))))
    }

    /// Operation on an earlier transaction: `refund` and `reversal` carry its
    /// `txnID`, `complete` carries its `preauthID`.
    pub fn referenced(
        &self,
        transaction: &Transaction,
        reference: Option<&Transaction>,
    ) -> Result<Element, BuildError> {
        expect_type(
            transaction,
            &[TxnType::Refund, TxnType::Reversal, TxnType::Complete],
        )?;
        let reference = reference.ok_or(BuildError::MissingReference(transaction.id))?;

        let prior_id = match transaction.txn_type {
            TxnType::Complete => {
                let preauth_id = non_empty(&reference.preauth_id).ok_or(
                    BuildError::MissingReferenceId {
                        reference: reference.id,
                        field: "preauthID",
                    },
                )?;
                Element::new("preauthID").with_text(preauth_id)
            }
            _ => {
                let txn_id =
                    non_empty(&reference.txn_id).ok_or(BuildError::MissingReferenceId {
                        reference: reference.id,
                        field: "txnID",
                    })?;
                Element::new("txnID").with_text(txn_id)
            }
        };

        let txn = basic_txn(transaction)?.with_child(prior_id);
        Ok(self.message_document(RequestType::Payment, Some(wrap_txn(txn))))
    }

    /// Direct entry transfer, for `credit` and `debit`.
    pub fn direct_transfer(
        &self,
        transaction: &Transaction,
        account: &BankAccount,
    ) -> Result<Element, BuildError> {
        expect_type(transaction, &[TxnType::Credit, TxnType::Debit])?;

        let txn = basic_txn(transaction)?.with_child(direct_entry_info(account));
        Ok(self.message_document(RequestType::Payment, Some(wrap_txn(txn))))
    }

    /// Connectivity check with no payload.
    pub fn echo(&self) -> Element {
        self.message_document(RequestType::Echo, None)
    }

    fn message_document(&self, request_type: RequestType, payload: Option<Element>) -> Element {
        let message = self.message.clone().unwrap_or_else(MessageInfo::generate);

        Element::new("SecurePayMessage")
            .with_child(message.to_element())
            .with_child(merchant_info(self.merchant))
            .with_child(Element::new("RequestType").with_text(request_type.as_str()))
            .with_children(payload)
    }
}

fn expect_type(transaction: &Transaction, allowed: &[TxnType]) -> Result<(), BuildError> {
    if allowed.contains(&transaction.txn_type) {
        Ok(())
    } else {
        Err(BuildError::UnsupportedTxnType(transaction.txn_type))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn merchant_info(merchant: &Merchant) -> Element {
    Element::new("MerchantInfo").with_children([
        Element::new("merchantID").with_text(&merchant.merchant_id),
        Element::new("password").with_text(&merchant.password),
    ])
}

fn basic_txn(transaction: &Transaction) -> Result<Element, BuildError> {
    Ok(Element::new("Txn").with_attribute("ID", "1").with_children([
        Element::new("txnType").with_text(txn_type_code(transaction.txn_type)),
        Element::new("txnSource").with_text(TXN_SOURCE),
        Element::new("amount").with_text(transaction.minor_units()?),
        Element::new("purchaseOrderNo").with_text(&transaction.purchase_order_no),
    ]))
}

fn wrap_txn(txn: Element) -> Element {
    Element::new("Payment").with_child(
        Element::new("TxnList")
            .with_attribute("count", "1")
            .with_child(txn),
    )
}

fn credit_card_info(card: &CreditCard) -> Element {
    Element::new("CreditCardInfo").with_children([
        Element::new("cardNumber").with_text(&card.number),
        Element::new("cvv").with_text(card.cvv_text()),
        Element::new("expiryDate").with_text(card.expiry()),
    ])
}

fn direct_entry_info(account: &BankAccount) -> Element {
    Element::new("DirectEntryInfo").with_children([
        Element::new("bsbNumber").with_text(&account.bsb),
        Element::new("accountNumber").with_text(&account.account_number),
        Element::new("accountName").with_text(&account.name),
    ])
}
