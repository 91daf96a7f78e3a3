pub mod instrument;
pub mod merchant;
pub mod request;
pub mod transaction;

pub use instrument::{BankAccount, CreditCard, StoredBankAccount};
pub use merchant::{Environment, GatewayProfile, Merchant};
pub use request::{CardPayment, DirectTransfer, ReferencedPayment, TxnRequest};
pub use transaction::{
    from_minor_units, normalize_amount, to_minor_units, NewTransaction, StatusTransitionError,
    Transaction, TriState, TxnStatus, TxnType,
};
