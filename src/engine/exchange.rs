//! Exchange
//!
//! Converts money between two accounts of the same user.

use crate::domain::{
    check_legs, DomainError, EntryDraft, OperationContext, Transaction, TransactionKind,
};
use crate::store::{AccountStore, LedgerWriter, UnitOfWork};

use super::{positive_amount, ExchangeCommand, MovementEngine, MovementError};

impl MovementEngine {
    /// Execute an exchange at the provider's rate for (from, to).
    ///
    /// The converted amount is `round2(amount * rate)`; the rate itself is
    /// never rounded.
    pub async fn exchange(
        &self,
        command: &ExchangeCommand,
        context: &OperationContext,
    ) -> Result<Transaction, MovementError> {
        let (from, to) = (command.from_currency, command.to_currency);

        if from == to {
            return Err(DomainError::SameCurrencyExchange.into());
        }

        let amount = positive_amount(command.from_amount)?;

        let mut work = self.store.begin().await?;

        let source = work.find_account(command.user_id, from).await?;
        let target = work.find_account(command.user_id, to).await?;

        let (source, target) = match (source, target) {
            (Some(source), Some(target)) => (source, target),
            (None, _) => {
                return Err(DomainError::AccountNotFound {
                    user_id: command.user_id,
                    currency: from,
                }
                .into())
            }
            (_, None) => {
                return Err(DomainError::AccountNotFound {
                    user_id: command.user_id,
                    currency: to,
                }
                .into())
            }
        };

        if !source.can_cover(amount) {
            tracing::debug!(
                correlation_id = ?context.correlation_id,
                account_id = %source.id,
                required = %amount,
                available = %source.balance,
                "Exchange rejected: insufficient funds"
            );
            return Err(DomainError::insufficient_funds(amount.value(), source.balance.value()).into());
        }

        // Errors from here on drop `work`, releasing the row locks
        let rate = self.rates.rate(from, to)?;
        let converted = amount.convert(&rate)?;
        if !converted.is_positive() {
            return Err(DomainError::invalid_amount(format!(
                "{} {} converts to zero {}",
                amount, from, to
            ))
            .into());
        }

        let legs = [
            EntryDraft::new(source.id, from, -amount),
            EntryDraft::new(target.id, to, converted),
        ];
        check_legs(TransactionKind::Exchange, &legs)?;

        work.adjust_balance(source.id, -amount).await?;
        work.adjust_balance(target.id, converted).await?;

        // The transaction records the source leg only
        let mut transaction = work.record_transaction(TransactionKind::Exchange, amount).await?;
        transaction.entries = work.append_entries(transaction.id, &legs).await?;

        work.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            transaction_id = %transaction.id,
            user_id = %command.user_id,
            from = %from,
            to = %to,
            amount = %amount,
            converted = %converted,
            rate = %rate.value(),
            "Exchange committed"
        );

        Ok(transaction)
    }
}
