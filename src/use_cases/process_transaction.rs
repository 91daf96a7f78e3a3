//! Transaction lifecycle use case.
//!
//! Every operation runs the same skeleton: create the record at `init`,
//! build the request, move to `sending` and call the gateway, move to
//! `receiving` and store the raw reply, interpret it, move to `completed`.
//! The record is saved at each step so an interrupted run shows where it
//! stopped. Nothing is retried: a run that got as far as `sending` may
//! already have moved money.

use bigdecimal::BigDecimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::request::render_purchase_order;
use crate::domain::{
    BankAccount, CardPayment, CreditCard, DirectTransfer, GatewayProfile, NewTransaction,
    ReferencedPayment, Transaction, TriState, TxnRequest, TxnStatus, TxnType,
};
use crate::error::LifecycleError;
use crate::ports::TransactionRepository;
use crate::securepay::client::{self, Transport};
use crate::securepay::request::{BuildError, RequestBuilder};
use crate::securepay::response::{self, GatewayStatus, InterpretError};
use crate::securepay::xml::Element;
use crate::utils::sanitize::Redacted;
use crate::validation;

/// Drives transactions through the gateway and the store.
pub struct LifecycleEngine {
    repository: Arc<dyn TransactionRepository>,
    transport: Arc<dyn Transport>,
}

impl LifecycleEngine {
    pub fn new(repository: Arc<dyn TransactionRepository>, transport: Arc<dyn Transport>) -> Self {
        Self {
            repository,
            transport,
        }
    }

    /// Charges a card.
    pub async fn pay(
        &self,
        profile: &GatewayProfile,
        amount: BigDecimal,
        card: CreditCard,
    ) -> Result<Transaction, LifecycleError> {
        self.execute(profile, TxnRequest::Pay(CardPayment::new(amount, card)))
            .await
    }

    /// Reserves funds on a card without taking them. See [`Self::complete`].
    pub async fn preauth(
        &self,
        profile: &GatewayProfile,
        amount: BigDecimal,
        card: CreditCard,
    ) -> Result<Transaction, LifecycleError> {
        self.execute(profile, TxnRequest::Preauth(CardPayment::new(amount, card)))
            .await
    }

    /// Captures a preauthorization. `amount` defaults to the reserved amount
    /// and may be lower; the gateway releases the remainder.
    pub async fn complete(
        &self,
        profile: &GatewayProfile,
        reference: &Transaction,
        amount: Option<BigDecimal>,
    ) -> Result<Transaction, LifecycleError> {
        self.execute(profile, TxnRequest::Complete(referenced(reference, amount)))
            .await
    }

    pub async fn refund(
        &self,
        profile: &GatewayProfile,
        reference: &Transaction,
        amount: Option<BigDecimal>,
    ) -> Result<Transaction, LifecycleError> {
        self.execute(profile, TxnRequest::Refund(referenced(reference, amount)))
            .await
    }

    /// Voids an earlier transaction.
    pub async fn reversal(
        &self,
        profile: &GatewayProfile,
        reference: &Transaction,
        amount: Option<BigDecimal>,
    ) -> Result<Transaction, LifecycleError> {
        self.execute(profile, TxnRequest::Reversal(referenced(reference, amount)))
            .await
    }

    /// Pays money out of the merchant's account into `account`.
    pub async fn direct_credit(
        &self,
        profile: &GatewayProfile,
        amount: BigDecimal,
        account: BankAccount,
    ) -> Result<Transaction, LifecycleError> {
        self.execute(
            profile,
            TxnRequest::DirectCredit(DirectTransfer::new(amount, account)),
        )
        .await
    }

    /// Pulls money from `account` into the merchant's account.
    pub async fn direct_debit(
        &self,
        profile: &GatewayProfile,
        amount: BigDecimal,
        account: BankAccount,
    ) -> Result<Transaction, LifecycleError> {
        self.execute(
            profile,
            TxnRequest::DirectDebit(DirectTransfer::new(amount, account)),
        )
        .await
    }

    /// Runs one transaction from creation to completion.
    pub async fn execute(
        &self,
        profile: &GatewayProfile,
        request: TxnRequest,
    ) -> Result<Transaction, LifecycleError> {
        let txn_type = request.txn_type();
        let new = prepare(&request, profile)?;

        let mut transaction = self.repository.create(&new).await?;
        info!(
            "Created {} transaction {} for {}",
            txn_type, transaction.id, transaction.amount
        );

        if transaction.purchase_order_no.contains("{id}") {
            transaction.purchase_order_no =
                render_purchase_order(&transaction.purchase_order_no, transaction.id);
        }

        let builder = RequestBuilder::new(&profile.merchant);
        let built = match &request {
            TxnRequest::Pay(p) | TxnRequest::Preauth(p) => builder.payment(&transaction, &p.card),
            TxnRequest::Complete(r) | TxnRequest::Refund(r) | TxnRequest::Reversal(r) => {
                builder.referenced(&transaction, Some(&r.reference))
            }
            TxnRequest::DirectCredit(t) | TxnRequest::DirectDebit(t) => {
                builder.direct_transfer(&transaction, &t.account)
            }
        };
        let document = match built {
            Ok(document) => document,
            Err(e) => {
                warn!("Could not build request for transaction {}: {}", transaction.id, e);
                self.repository.save(&transaction).await?;
                return Err(e.into());
            }
        };

        let endpoint = client::endpoint(profile, txn_type);
        self.send(transaction, &endpoint, &document).await
    }

    /// Checks connectivity and credentials with an Echo request.
    pub async fn echo(&self, profile: &GatewayProfile) -> Result<GatewayStatus, LifecycleError> {
        let document = RequestBuilder::new(&profile.merchant).echo();
        let endpoint = client::endpoint_for_path(profile, client::api_path(TxnType::Pay));

        let reply = self
            .transport
            .send(&endpoint, &document)
            .await
            .map_err(LifecycleError::Unreachable)?;

        let status = reply
            .document
            .as_ref()
            .and_then(GatewayStatus::from_document)
            .ok_or(LifecycleError::UnexpectedResponse(InterpretError::Unparseable))?;

        info!("Echo returned status {} ({})", status.code, status.description);
        Ok(status)
    }

    /// Records whether the action paid for was carried out. Only the caller knows.
    pub async fn mark_processed(&self, id: i64, processed: bool) -> Result<Transaction, LifecycleError> {
        let mut transaction = self.repository.find(id).await?;
        transaction.processed = TriState::from(processed);
        self.repository.save(&transaction).await?;
        info!("Transaction {} marked processed={}", id, processed);
        Ok(transaction)
    }

    async fn send(
        &self,
        mut transaction: Transaction,
        endpoint: &str,
        document: &Element,
    ) -> Result<Transaction, LifecycleError> {
        transaction.transition_to(TxnStatus::Sending)?;
        self.repository.save(&transaction).await?;
        info!("Sending transaction {} to {}", transaction.id, endpoint);
        debug!(request = %Redacted(document), "Request for transaction {}", transaction.id);

        let reply = match self.transport.send(endpoint, document).await {
            Ok(reply) => reply,
            Err(source) => {
                error!("Transport failure for transaction {}: {}", transaction.id, source);
                return Err(LifecycleError::Transport {
                    transaction_id: transaction.id,
                    source,
                });
            }
        };

        transaction.transition_to(TxnStatus::Receiving)?;
        transaction.response_text = reply.raw.clone();
        self.repository.save(&transaction).await?;

        let outcome = reply
            .document
            .as_ref()
            .ok_or(InterpretError::Unparseable)
            .and_then(response::interpret);
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(source) => {
                warn!(
                    "Transaction {} left at receiving, outcome unknown: {}",
                    transaction.id, source
                );
                return Err(LifecycleError::UnresolvedOutcome {
                    transaction_id: transaction.id,
                    source,
                });
            }
        };

        transaction.success = TriState::from(outcome.approved);
        transaction.response_code = outcome.response_code;
        transaction.bank_message = outcome.response_text;
        transaction.txn_id = outcome.txn_id;
        transaction.preauth_id = outcome.preauth_id;
        transaction.transition_to(TxnStatus::Completed)?;
        self.repository.save(&transaction).await?;

        info!(
            "Transaction {} completed: approved={} code={} message={}",
            transaction.id, outcome.approved, transaction.response_code, transaction.bank_message
        );
        // The store owns creation-time fields such as the reference, which may
        // have been cleared while the request was in flight.
        Ok(self.repository.find(transaction.id).await?)
    }
}

fn referenced(reference: &Transaction, amount: Option<BigDecimal>) -> ReferencedPayment {
    let payment = ReferencedPayment::new(reference.clone());
    match amount {
        Some(amount) => payment.with_amount(amount),
        None => payment,
    }
}

/// Validates a request and lays out the record to create for it. Amount
/// checks run on the amount as it will be stored, rounded to cents.
fn prepare(request: &TxnRequest, profile: &GatewayProfile) -> Result<NewTransaction, LifecycleError> {
    let txn_type = request.txn_type();
    let debug = profile.environment.is_test();

    let new = match request {
        TxnRequest::Pay(p) | TxnRequest::Preauth(p) => {
            validation::validate_credit_card(&p.card)?;
            validation::validate_purchase_order_no(&p.purchase_order_no)?;
            NewTransaction::new(txn_type, p.amount.clone(), p.card.name.clone(), debug)
                .with_extra_data(p.data.clone())
                .with_purchase_order_no(p.purchase_order_no.clone())
        }
        TxnRequest::Complete(r) | TxnRequest::Refund(r) | TxnRequest::Reversal(r) => {
            let new = NewTransaction::new(
                txn_type,
                r.effective_amount(),
                r.reference.card_name.clone(),
                debug,
            )
            .with_extra_data(r.data.clone())
            .with_purchase_order_no(r.reference.purchase_order_no.clone())
            .referencing(&r.reference);
            if txn_type == TxnType::Complete {
                validation::validate_amount_within(&new.amount, &r.reference.amount)?;
            }
            new
        }
        TxnRequest::DirectCredit(t) | TxnRequest::DirectDebit(t) => {
            validation::validate_bank_account(&t.account)?;
            validation::validate_purchase_order_no(&t.purchase_order_no)?;
            NewTransaction::new(txn_type, t.amount.clone(), t.account.name.clone(), debug)
                .with_extra_data(t.data.clone())
                .with_purchase_order_no(t.purchase_order_no.clone())
        }
    };

    validation::validate_positive_amount(&new.amount)?;
    validation::validate_description(&new.description)?;
    // Catch amounts the wire format cannot carry before anything is stored.
    crate::domain::to_minor_units(&new.amount).map_err(BuildError::from)?;
    Ok(new)
}
