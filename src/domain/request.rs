//! Business requests accepted by the lifecycle engine, one variant per operation.

use bigdecimal::BigDecimal;

use super::instrument::{BankAccount, CreditCard};
use super::transaction::{Transaction, TxnType};

pub const DEFAULT_CARD_PURCHASE_ORDER: &str = "Transaction-{id}";
pub const DEFAULT_TRANSFER_PURCHASE_ORDER: &str = "Transfer {id}";

/// Card charge or reservation.
#[derive(Debug, Clone)]
pub struct CardPayment {
    pub amount: BigDecimal,
    pub card: CreditCard,
    /// Purchase order number; `{id}` is replaced by the local transaction id.
    pub purchase_order_no: String,
    pub data: serde_json::Value,
}

impl CardPayment {
    pub fn new(amount: BigDecimal, card: CreditCard) -> Self {
        Self {
            amount,
            card,
            purchase_order_no: DEFAULT_CARD_PURCHASE_ORDER.to_string(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_purchase_order_no(mut self, template: impl Into<String>) -> Self {
        self.purchase_order_no = template.into();
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Operation acting on an earlier transaction.
#[derive(Debug, Clone)]
pub struct ReferencedPayment {
    pub reference: Transaction,
    /// Defaults to the reference transaction's amount.
    pub amount: Option<BigDecimal>,
    pub data: serde_json::Value,
}

impl ReferencedPayment {
    pub fn new(reference: Transaction) -> Self {
        Self {
            reference,
            amount: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_amount(mut self, amount: BigDecimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn effective_amount(&self) -> BigDecimal {
        self.amount
            .clone()
            .unwrap_or_else(|| self.reference.amount.clone())
    }
}

/// Direct entry bank transfer.
#[derive(Debug, Clone)]
pub struct DirectTransfer {
    pub amount: BigDecimal,
    pub account: BankAccount,
    pub purchase_order_no: String,
    pub data: serde_json::Value,
}

impl DirectTransfer {
    pub fn new(amount: BigDecimal, account: BankAccount) -> Self {
        Self {
            amount,
            account,
            purchase_order_no: DEFAULT_TRANSFER_PURCHASE_ORDER.to_string(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_purchase_order_no(mut self, template: impl Into<String>) -> Self {
        self.purchase_order_no = template.into();
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

#[derive(Debug, Clone)]
pub enum TxnRequest {
    Pay(CardPayment),
    Preauth(CardPayment),
    Complete(ReferencedPayment),
    Refund(ReferencedPayment),
    Reversal(ReferencedPayment),
    DirectCredit(DirectTransfer),
    DirectDebit(DirectTransfer),
}

impl TxnRequest {
    pub fn txn_type(&self) -> TxnType {
        match self {
            TxnRequest::Pay(_) => TxnType::Pay,
            TxnRequest::Preauth(_) => TxnType::Preauth,
            TxnRequest::Complete(_) => TxnType::Complete,
            TxnRequest::Refund(_) => TxnType::Refund,
            TxnRequest::Reversal(_) => TxnType::Reversal,
            TxnRequest::DirectCredit(_) => TxnType::Credit,
            TxnRequest::DirectDebit(_) => TxnType::Debit,
        }
    }
}

/// Fills `{id}` in a purchase order template.
pub fn render_purchase_order(template: &str, id: i64) -> String {
    template.replace("{id}", &id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_purchase_order() {
        assert_eq!(render_purchase_order(DEFAULT_CARD_PURCHASE_ORDER, 42), "Transaction-42");
        assert_eq!(render_purchase_order(DEFAULT_TRANSFER_PURCHASE_ORDER, 7), "Transfer 7");
        assert_eq!(render_purchase_order("INV-100", 7), "INV-100");
    }
}
