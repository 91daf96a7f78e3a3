pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod ports;
pub mod securepay;
pub mod use_cases;
pub mod utils;
pub mod validation;

pub use domain::{
    BankAccount, CreditCard, Environment, GatewayProfile, Merchant, Transaction, TriState,
    TxnStatus, TxnType,
};
pub use error::LifecycleError;
pub use use_cases::LifecycleEngine;
