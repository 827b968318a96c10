//! Transfer
//!
//! Moves money between two users in one currency.

use crate::domain::{
    check_legs, DomainError, EntryDraft, OperationContext, Transaction, TransactionKind,
};
use crate::store::{AccountStore, LedgerWriter, UnitOfWork};

use super::{positive_amount, MovementEngine, MovementError, TransferCommand};

impl MovementEngine {
    /// Execute a transfer. Validation order:
    /// amount, sender account, funds, recipient, self-transfer, recipient account.
    pub async fn transfer(
        &self,
        command: &TransferCommand,
        context: &OperationContext,
    ) -> Result<Transaction, MovementError> {
        let amount = positive_amount(command.amount)?;
        let currency = command.currency;

        let mut work = self.store.begin().await?;

        let sender = work
            .find_account(command.sender_id, currency)
            .await?
            .ok_or(DomainError::AccountNotFound {
                user_id: command.sender_id,
                currency,
            })?;

        if !sender.can_cover(amount) {
            tracing::debug!(
                correlation_id = ?context.correlation_id,
                account_id = %sender.id,
                required = %amount,
                available = %sender.balance,
                "Transfer rejected: insufficient funds"
            );
            return Err(DomainError::insufficient_funds(amount.value(), sender.balance.value()).into());
        }

        let recipient = work
            .find_user_by_email(&command.recipient_email)
            .await?
            .ok_or_else(|| DomainError::RecipientNotFound(command.recipient_email.clone()))?;

        if recipient.id == command.sender_id {
            return Err(DomainError::SelfTransferNotAllowed.into());
        }

        let recipient_account = work
            .find_account(recipient.id, currency)
            .await?
            .ok_or(DomainError::RecipientAccountMissing(currency))?;

        let legs = [
            EntryDraft::new(sender.id, currency, -amount),
            EntryDraft::new(recipient_account.id, currency, amount),
        ];
        check_legs(TransactionKind::Transfer, &legs)?;

        work.adjust_balance(sender.id, -amount).await?;
        work.adjust_balance(recipient_account.id, amount).await?;

        let mut transaction = work.record_transaction(TransactionKind::Transfer, amount).await?;
        transaction.entries = work.append_entries(transaction.id, &legs).await?;

        work.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            transaction_id = %transaction.id,
            from_account = %sender.id,
            to_account = %recipient_account.id,
            currency = %currency,
            amount = %amount,
            "Transfer committed"
        );

        Ok(transaction)
    }
}
