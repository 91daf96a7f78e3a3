//! Transaction domain entity.
//! Framework-agnostic representation of a SecurePay transaction and its lifecycle.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// The seven operations the gateway supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnType {
    Pay,
    Refund,
    Reversal,
    Preauth,
    Complete,
    Credit,
    Debit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown transaction type: {0}")]
pub struct UnknownTxnType(pub String);

impl TxnType {
    pub const ALL: [TxnType; 7] = [
        TxnType::Pay,
        TxnType::Refund,
        TxnType::Reversal,
        TxnType::Preauth,
        TxnType::Complete,
        TxnType::Credit,
        TxnType::Debit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TxnType::Pay => "pay",
            TxnType::Refund => "refund",
            TxnType::Reversal => "reversal",
            TxnType::Preauth => "preauth",
            TxnType::Complete => "complete",
            TxnType::Credit => "credit",
            TxnType::Debit => "debit",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TxnType::Pay => "Payment",
            TxnType::Refund => "Refund",
            TxnType::Reversal => "Reversal",
            TxnType::Preauth => "Preauthenticate",
            TxnType::Complete => "Complete",
            TxnType::Credit => "Direct Credit",
            TxnType::Debit => "Direct Debit",
        }
    }

    /// Refund, reversal and complete act on an earlier transaction.
    pub fn requires_reference(&self) -> bool {
        matches!(self, TxnType::Refund | TxnType::Reversal | TxnType::Complete)
    }

    pub fn is_direct_entry(&self) -> bool {
        matches!(self, TxnType::Credit | TxnType::Debit)
    }
}

impl FromStr for TxnType {
    type Err = UnknownTxnType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TxnType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTxnType(s.to_string()))
    }
}

impl fmt::Display for TxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a transaction. Only ever moves forward, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnStatus {
    Init,
    Sending,
    Receiving,
    Completed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid status transition from {from} to {to}")]
pub struct StatusTransitionError {
    pub from: TxnStatus,
    pub to: TxnStatus,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown transaction status: {0}")]
pub struct UnknownTxnStatus(pub String);

impl TxnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnStatus::Init => "init",
            TxnStatus::Sending => "sending",
            TxnStatus::Receiving => "receiving",
            TxnStatus::Completed => "completed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TxnStatus::Init => "Initializing",
            TxnStatus::Sending => "Sending request to SecurePay",
            TxnStatus::Receiving => "Receiving transaction information from SecurePay",
            TxnStatus::Completed => "Transaction has completed",
        }
    }

    pub fn next(&self) -> Option<TxnStatus> {
        match self {
            TxnStatus::Init => Some(TxnStatus::Sending),
            TxnStatus::Sending => Some(TxnStatus::Receiving),
            TxnStatus::Receiving => Some(TxnStatus::Completed),
            TxnStatus::Completed => None,
        }
    }

    /// Validates a move to `to`. Anything but the immediate successor is rejected.
    pub fn advance(self, to: TxnStatus) -> Result<TxnStatus, StatusTransitionError> {
        match self.next() {
            Some(next) if next == to => Ok(to),
            _ => Err(StatusTransitionError { from: self, to }),
        }
    }
}

impl FromStr for TxnStatus {
    type Err = UnknownTxnStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(TxnStatus::Init),
            "sending" => Ok(TxnStatus::Sending),
            "receiving" => Ok(TxnStatus::Receiving),
            "completed" => Ok(TxnStatus::Completed),
            other => Err(UnknownTxnStatus(other.to_string())),
        }
    }
}

impl fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-valued flag where "not yet known" is its own case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "Option<bool>")]
pub enum TriState {
    #[default]
    Unknown,
    True,
    False,
}

impl TriState {
    pub fn is_true(&self) -> bool {
        matches!(self, TriState::True)
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value {
            TriState::True
        } else {
            TriState::False
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        value.map(TriState::from).unwrap_or_default()
    }
}

impl From<TriState> for Option<bool> {
    fn from(value: TriState) -> Self {
        match value {
            TriState::Unknown => None,
            TriState::True => Some(true),
            TriState::False => Some(false),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Amount {0} cannot be expressed in minor units")]
pub struct AmountOutOfRange(pub String);

/// Converts a major-unit amount to the integer minor units sent on the wire.
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, AmountOutOfRange> {
    use bigdecimal::ToPrimitive;

    (amount * BigDecimal::from(100))
        .round(0)
        .to_i64()
        .ok_or_else(|| AmountOutOfRange(amount.to_string()))
}

/// Rounds half-up to whole cents, the only precision the gateway carries.
pub fn normalize_amount(amount: &BigDecimal) -> BigDecimal {
    amount.round(2).with_scale(2)
}

pub fn from_minor_units(minor: i64) -> BigDecimal {
    (BigDecimal::from(minor) / BigDecimal::from(100)).with_scale(2)
}

/// Business fields of a transaction that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub txn_type: TxnType,
    pub amount: BigDecimal,
    pub card_name: String,
    pub description: String,
    pub extra_data: serde_json::Value,
    pub purchase_order_no: String,
    pub reference_transaction_id: Option<i64>,
    pub debug: bool,
}

impl NewTransaction {
    pub fn new(txn_type: TxnType, amount: BigDecimal, card_name: String, debug: bool) -> Self {
        Self {
            txn_type,
            amount: normalize_amount(&amount),
            card_name,
            description: String::new(),
            extra_data: serde_json::Value::Null,
            purchase_order_no: String::new(),
            reference_transaction_id: None,
            debug,
        }
    }

    /// Attaches caller data. Its `description` key, if any, becomes the description.
    pub fn with_extra_data(mut self, data: serde_json::Value) -> Self {
        if let Some(description) = data.get("description").and_then(|d| d.as_str()) {
            self.description = description.to_string();
        }
        self.extra_data = data;
        self
    }

    pub fn with_purchase_order_no(mut self, purchase_order_no: impl Into<String>) -> Self {
        self.purchase_order_no = purchase_order_no.into();
        self
    }

    pub fn referencing(mut self, reference: &Transaction) -> Self {
        self.reference_transaction_id = Some(reference.id);
        self
    }
}

/// Domain entity representing a transaction with the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub purchase_order_no: String,
    pub card_name: String,
    pub txn_type: TxnType,
    pub amount: BigDecimal,
    pub description: String,
    pub extra_data: serde_json::Value,
    pub status: TxnStatus,
    pub processed: TriState,
    pub success: TriState,
    pub response_text: String,
    pub response_code: String,
    pub bank_message: String,
    pub reference_transaction_id: Option<i64>,
    pub txn_id: Option<String>,
    pub preauth_id: Option<String>,
    pub debug: bool,
}

impl Transaction {
    /// Materializes a freshly created record. Status starts at `init`.
    pub fn from_new(id: i64, new: NewTransaction) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            purchase_order_no: new.purchase_order_no,
            card_name: new.card_name,
            txn_type: new.txn_type,
            amount: new.amount,
            description: new.description,
            extra_data: new.extra_data,
            status: TxnStatus::Init,
            processed: TriState::Unknown,
            success: TriState::Unknown,
            response_text: String::new(),
            response_code: String::new(),
            bank_message: String::new(),
            reference_transaction_id: new.reference_transaction_id,
            txn_id: None,
            preauth_id: None,
            debug: new.debug,
        }
    }

    pub fn transition_to(&mut self, to: TxnStatus) -> Result<(), StatusTransitionError> {
        self.status = self.status.advance(to)?;
        Ok(())
    }

    pub fn minor_units(&self) -> Result<i64, AmountOutOfRange> {
        to_minor_units(&self.amount)
    }

    /// Not known to have succeeded or failed; someone has to look at it.
    pub fn needs_review(&self) -> bool {
        self.status != TxnStatus::Completed
    }

    /// Money moved but the caller has not confirmed fulfilment.
    pub fn is_unfulfilled(&self) -> bool {
        self.success.is_true() && !self.processed.is_true()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.success {
            TriState::True => "Successful",
            TriState::False => "Unsuccessful",
            TriState::Unknown => "Unfinished",
        };
        write!(
            f,
            "{} {} for {} on {} by {}",
            outcome,
            self.txn_type.label(),
            self.amount.with_scale(2),
            self.created_at.format("%d/%m/%Y"),
            self.card_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> BigDecimal {
        s.parse::<BigDecimal>().unwrap()
    }

    #[test]
    fn test_txn_type_parses_every_known_type() {
        for txn_type in TxnType::ALL {
            assert_eq!(txn_type.as_str().parse::<TxnType>(), Ok(txn_type));
        }
        assert_eq!(
            "chargeback".parse::<TxnType>(),
            Err(UnknownTxnType("chargeback".to_string()))
        );
    }

    #[test]
    fn test_status_moves_forward_one_step() {
        assert_eq!(TxnStatus::Init.advance(TxnStatus::Sending), Ok(TxnStatus::Sending));
        assert_eq!(
            TxnStatus::Sending.advance(TxnStatus::Receiving),
            Ok(TxnStatus::Receiving)
        );
        assert_eq!(
            TxnStatus::Receiving.advance(TxnStatus::Completed),
            Ok(TxnStatus::Completed)
        );
    }

    #[test]
    fn test_status_rejects_skips_and_reversals() {
        assert!(TxnStatus::Init.advance(TxnStatus::Receiving).is_err());
        assert!(TxnStatus::Init.advance(TxnStatus::Completed).is_err());
        assert!(TxnStatus::Receiving.advance(TxnStatus::Sending).is_err());
        assert!(TxnStatus::Completed.advance(TxnStatus::Init).is_err());
        assert!(TxnStatus::Sending.advance(TxnStatus::Sending).is_err());
    }

    #[test]
    fn test_minor_units_conversion() {
        for (major, minor) in [("12.34", 1234), ("0.00", 0), ("1", 100), ("99999999.99", 9999999999)] {
            assert_eq!(to_minor_units(&amount(major)), Ok(minor));
            assert_eq!(from_minor_units(minor), amount(major));
        }
    }

    #[test]
    fn test_normalize_amount_rounds_to_cents() {
        assert_eq!(normalize_amount(&amount("10.999")).to_string(), "11.00");
        assert_eq!(normalize_amount(&amount("10.994")).to_string(), "10.99");
        assert_eq!(normalize_amount(&amount("0.005")).to_string(), "0.01");
        assert_eq!(normalize_amount(&amount("0.004")).to_string(), "0.00");
        assert_eq!(normalize_amount(&amount("5")).to_string(), "5.00");
    }

    #[test]
    fn test_from_minor_units_keeps_two_decimals() {
        assert_eq!(from_minor_units(1230).to_string(), "12.30");
        assert_eq!(from_minor_units(0).to_string(), "0.00");
    }

    #[test]
    fn test_tri_state_conversions() {
        assert_eq!(TriState::from(None), TriState::Unknown);
        assert_eq!(TriState::from(Some(false)), TriState::False);
        assert_eq!(Option::<bool>::from(TriState::True), Some(true));
    }

    #[test]
    fn test_description_taken_from_extra_data() {
        let new = NewTransaction::new(TxnType::Pay, amount("10"), "Tim".to_string(), true)
            .with_extra_data(serde_json::json!({"description": "Widgets", "order": 42}));
        assert_eq!(new.description, "Widgets");
        assert_eq!(new.extra_data["order"], 42);
        assert_eq!(new.amount.to_string(), "10.00");
    }

    #[test]
    fn test_display() {
        let new = NewTransaction::new(TxnType::Preauth, amount("12.5"), "Tim Heap".to_string(), true);
        let mut tx = Transaction::from_new(7, new);
        let date = tx.created_at.format("%d/%m/%Y").to_string();
        assert_eq!(
            tx.to_string(),
            format!("Unfinished Preauthenticate for 12.50 on {} by Tim Heap", date)
        );

        tx.success = TriState::True;
        assert!(tx.to_string().starts_with("Successful"));
    }

    #[test]
    fn test_unfulfilled_flag() {
        let new = NewTransaction::new(TxnType::Pay, amount("1"), "Tim".to_string(), true);
        let mut tx = Transaction::from_new(1, new);
        assert!(!tx.is_unfulfilled());

        tx.success = TriState::True;
        assert!(tx.is_unfulfilled());

        tx.processed = TriState::True;
        assert!(!tx.is_unfulfilled());
    }

    #[test]
    fn test_serializes_for_reports() {
        let mut tx = Transaction::from_new(
            3,
            NewTransaction::new(TxnType::Preauth, amount("12.5"), "Tim Heap".to_string(), true),
        );
        tx.success = TriState::True;

        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["txn_type"], "preauth");
        assert_eq!(value["status"], "init");
        assert_eq!(value["success"], true);
        assert_eq!(value["processed"], serde_json::Value::Null);
    }
}
