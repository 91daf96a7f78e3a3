use thiserror::Error;

use crate::domain::StatusTransitionError;
use crate::ports::RepositoryError;
use crate::securepay::client::TransportError;
use crate::securepay::request::BuildError;
use crate::securepay::response::InterpretError;
use crate::validation::ValidationError;

/// Failure of a lifecycle operation. None of these are retried internally.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Could not build request: {0}")]
    Build(#[from] BuildError),

    /// The request may or may not have reached the gateway. The transaction
    /// is left at `sending`.
    #[error("Transport failure for transaction {transaction_id}: {source}")]
    Transport {
        transaction_id: i64,
        #[source]
        source: TransportError,
    },

    /// A response arrived but could not be read. The transaction is left at
    /// `receiving` with the raw response stored.
    #[error("Unresolved outcome for transaction {transaction_id}: {source}")]
    UnresolvedOutcome {
        transaction_id: i64,
        #[source]
        source: InterpretError,
    },

    /// A request outside any transaction (echo) could not be delivered.
    #[error("Gateway unreachable: {0}")]
    Unreachable(#[source] TransportError),

    #[error("Unexpected gateway response: {0}")]
    UnexpectedResponse(#[source] InterpretError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    InvalidTransition(#[from] StatusTransitionError),
}

impl LifecycleError {
    /// The local transaction the failure left behind, if one was created.
    pub fn transaction_id(&self) -> Option<i64> {
        match self {
            LifecycleError::Transport { transaction_id, .. }
            | LifecycleError::UnresolvedOutcome { transaction_id, .. } => Some(*transaction_id),
            _ => None,
        }
    }

    /// Money may have moved; reconcile by hand instead of treating this as a failure.
    pub fn needs_manual_review(&self) -> bool {
        matches!(
            self,
            LifecycleError::Transport { .. } | LifecycleError::UnresolvedOutcome { .. }
        )
    }
}
