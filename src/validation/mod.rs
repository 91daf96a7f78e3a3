use bigdecimal::BigDecimal;
use std::fmt;

use crate::domain::{BankAccount, CreditCard};

pub const DESCRIPTION_MAX_LEN: usize = 25;
pub const PURCHASE_ORDER_MAX_LEN: usize = 60;
pub const CARD_NAME_MAX_LEN: usize = 255;
pub const BANK_ACCOUNT_NAME_MAX_LEN: usize = 32;
pub const BSB_LEN: usize = 6;
pub const ACCOUNT_NUMBER_MAX_LEN: usize = 9;
pub const CVV_MAX: u16 = 9999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_digits(field: &'static str, value: &str) -> ValidationResult {
    if value.is_empty() || !value.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(field, "must contain only digits"));
    }

    Ok(())
}

pub fn validate_positive_amount(amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::from(0) {
        return Err(ValidationError::new("amount", "must be greater than zero"));
    }

    Ok(())
}

/// A completion may capture at most what was reserved.
pub fn validate_amount_within(amount: &BigDecimal, limit: &BigDecimal) -> ValidationResult {
    if amount > limit {
        return Err(ValidationError::new(
            "amount",
            format!("must not exceed {}", limit),
        ));
    }

    Ok(())
}

pub fn validate_description(description: &str) -> ValidationResult {
    validate_max_len("description", description, DESCRIPTION_MAX_LEN)
}

pub fn validate_purchase_order_no(purchase_order_no: &str) -> ValidationResult {
    validate_required("purchase_order_no", purchase_order_no)?;
    validate_max_len("purchase_order_no", purchase_order_no, PURCHASE_ORDER_MAX_LEN)
}

pub fn validate_credit_card(card: &CreditCard) -> ValidationResult {
    validate_required("name", &card.name)?;
    validate_max_len("name", &card.name, CARD_NAME_MAX_LEN)?;
    validate_digits("number", &card.number)?;

    if !(1..=12).contains(&card.expiry_month) {
        return Err(ValidationError::new("expiry", "month must be between 1 and 12"));
    }
    if card.cvv > CVV_MAX {
        return Err(ValidationError::new("cvv", "must be three or four digits"));
    }

    Ok(())
}

pub fn validate_bank_account(account: &BankAccount) -> ValidationResult {
    validate_required("name", &account.name)?;
    validate_max_len("name", &account.name, BANK_ACCOUNT_NAME_MAX_LEN)?;

    validate_digits("bsb", &account.bsb)?;
    if account.bsb.len() != BSB_LEN {
        return Err(ValidationError::new(
            "bsb",
            format!("must be exactly {} digits", BSB_LEN),
        ));
    }

    validate_digits("account_number", &account.account_number)?;
    validate_max_len("account_number", &account.account_number, ACCOUNT_NUMBER_MAX_LEN)?;

    Ok(())
}
