//! Payment instruments handed to the gateway.
//!
//! Values arrive pre-validated by whoever collected them (see
//! `crate::validation`); only the wire formatting lives here.

use serde::Serialize;
use std::fmt;

/// Card details for pay and preauth requests.
#[derive(Clone, PartialEq, Eq)]
pub struct CreditCard {
    pub name: String,
    pub number: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub cvv: u16,
}

impl CreditCard {
    /// Builds a card, dropping any non-digit characters from the number.
    pub fn new(
        name: impl Into<String>,
        number: &str,
        expiry_month: u8,
        expiry_year: u16,
        cvv: u16,
    ) -> Self {
        Self {
            name: name.into(),
            number: clean_card_number(number),
            expiry_month,
            expiry_year,
            cvv,
        }
    }

    /// `MM/YY`, with the century stripped from four digit years.
    pub fn expiry(&self) -> String {
        format!("{:02}/{:02}", self.expiry_month, self.expiry_year % 100)
    }

    /// CVV zero-padded to three digits.
    pub fn cvv_text(&self) -> String {
        format!("{:03}", self.cvv)
    }

    pub fn masked_number(&self) -> String {
        let len = self.number.len();
        if len > 4 {
            format!("{}{}", "*".repeat(len - 4), &self.number[len - 4..])
        } else {
            "****".to_string()
        }
    }
}

impl fmt::Debug for CreditCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreditCard")
            .field("name", &self.name)
            .field("number", &self.masked_number())
            .field("expiry", &"**/**")
            .field("cvv", &"***")
            .finish()
    }
}

pub fn clean_card_number(number: &str) -> String {
    number.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Bank account for direct entry credits and debits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankAccount {
    pub name: String,
    pub bsb: String,
    pub account_number: String,
}

impl BankAccount {
    pub fn new(
        name: impl Into<String>,
        bsb: impl Into<String>,
        account_number: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            bsb: bsb.into(),
            account_number: account_number.into(),
        }
    }
}

impl fmt::Display for BankAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.bsb, self.account_number)
    }
}

/// A bank account kept on file so direct entry requests can be repeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredBankAccount {
    pub id: i64,
    #[serde(flatten)]
    pub account: BankAccount,
}

impl fmt::Display for StoredBankAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.account, f)
    }
}
