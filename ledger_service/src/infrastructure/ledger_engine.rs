use async_trait::async_trait;
use common::{DomainError, Money, UserId};
use sqlx::{PgPool, Postgres, Transaction as PgTransaction};

use crate::domain::entities::{
    KycStatus, LedgerEntry, LedgerEntryType, Transaction as LedgerTransaction, TransactionStatus,
};
use crate::domain::repository::{DepositCommand, LedgerEngine, TransferCommand};
use crate::infrastructure::persistence::map_db_err;
use crate::infrastructure::persistence::models::TransactionModel;

/// The Transfer Engine (§4.F). Every public method here first commits a
/// `PROCESSING` transaction header on its own, then runs the wallet-moving
/// work as a second Postgres transaction: lock both wallets in a
/// deterministic order, re-verify eligibility, move the balances, and
/// write the ledger entries, finishing with the header's terminal status.
/// If the second transaction fails for any reason the header is still
/// updated to `FAILED` as its own committed statement, so a rejected
/// transfer always leaves an audit row behind (§4.F failure policy).
///
/// Grounded on `wallet_service/src/infrastructure/persistence/wallet_repository.rs`'s
/// `update_balance` (`UPDATE ... SET balance = balance + $1`), extended to
/// span the wallet, transaction, and ledger tables, and on
/// `webhook_event_repository.rs`'s `create_if_absent` for the header's own
/// insert-or-fetch idempotency.
pub struct PostgresLedgerEngine {
    pool: PgPool,
}

impl PostgresLedgerEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn can_transact(tx: &mut PgTransaction<'_, Postgres>, user_id: UserId) -> Result<bool, DomainError> {
        let row: (KycStatus, bool) = sqlx::query_as(
            r#"SELECT kyc_status, active FROM users WHERE id = $1 FOR SHARE"#,
        )
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_db_err)?;

        Ok(row.1 && row.0 == KycStatus::Verified)
    }

    async fn lock_wallet_balance(
        tx: &mut PgTransaction<'_, Postgres>,
        user_id: UserId,
    ) -> Result<Money, DomainError> {
        let row: (Money,) = sqlx::query_as(
            r#"SELECT balance FROM wallets WHERE user_id = $1 FOR UPDATE"#,
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_db_err)?
        .ok_or_else(|| DomainError::not_found(format!("wallet for user {user_id}")))?;

        Ok(row.0)
    }

    async fn set_wallet_balance(
        tx: &mut PgTransaction<'_, Postgres>,
        user_id: UserId,
        balance: Money,
    ) -> Result<(), DomainError> {
        sqlx::query(r#"UPDATE wallets SET balance = $1, updated_at = now() WHERE user_id = $2"#)
            .bind(balance)
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Inserts the `PROCESSING` header (§4.F step 1) as its own committed
    /// statement, ahead of any wallet locking. Returns the pre-existing row
    /// instead when `reference_id` was already claimed by a concurrent
    /// caller, mirroring `WebhookEventRepository::create_if_absent`.
    async fn insert_or_fetch_header(
        pool: &PgPool,
        transaction: &LedgerTransaction,
    ) -> Result<LedgerTransaction, DomainError> {
        let inserted = sqlx::query_as::<_, TransactionModel>(
            r#"
            INSERT INTO transactions (
                id, reference_id, from_user_id, to_user_id, amount, transaction_type, status,
                from_balance_before, from_balance_after, to_balance_before, to_balance_after,
                description, metadata, error_message, retry_count, created_at, updated_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (reference_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(transaction.id)
        .bind(&transaction.reference_id)
        .bind(transaction.from_user_id)
        .bind(transaction.to_user_id)
        .bind(transaction.amount)
        .bind(transaction.transaction_type)
        .bind(transaction.status)
        .bind(transaction.from_balance_before)
        .bind(transaction.from_balance_after)
        .bind(transaction.to_balance_before)
        .bind(transaction.to_balance_after)
        .bind(&transaction.description)
        .bind(&transaction.metadata)
        .bind(&transaction.error_message)
        .bind(transaction.retry_count)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .bind(transaction.completed_at)
        .fetch_optional(pool)
        .await
        .map_err(map_db_err)?;

        if let Some(model) = inserted {
            return Ok(model.into());
        }

        sqlx::query_as::<_, TransactionModel>(r#"SELECT * FROM transactions WHERE reference_id = $1"#)
            .bind(&transaction.reference_id)
            .fetch_optional(pool)
            .await
            .map_err(map_db_err)?
            .map(Into::into)
            .ok_or_else(|| DomainError::internal("transaction header vanished between insert and re-fetch"))
    }

    /// Commits the header's terminal state (§4.F step 4) inside the same
    /// transaction as the wallet and ledger writes it accompanies.
    async fn complete_header(
        tx: &mut PgTransaction<'_, Postgres>,
        transaction: &LedgerTransaction,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET status = $1, from_balance_before = $2, from_balance_after = $3,
                to_balance_before = $4, to_balance_after = $5, error_message = $6,
                updated_at = $7, completed_at = $8
            WHERE id = $9
            "#,
        )
        .bind(transaction.status)
        .bind(transaction.from_balance_before)
        .bind(transaction.from_balance_after)
        .bind(transaction.to_balance_before)
        .bind(transaction.to_balance_after)
        .bind(&transaction.error_message)
        .bind(transaction.updated_at)
        .bind(transaction.completed_at)
        .bind(transaction.id)
        .execute(&mut **tx)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    /// Commits the header's `FAILED` state (§4.F failure policy) as a
    /// statement of its own, independent of the rolled-back transaction
    /// body that produced the failure.
    async fn fail_header(pool: &PgPool, transaction: &LedgerTransaction) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET status = $1, from_balance_before = $2, from_balance_after = $3,
                to_balance_before = $4, to_balance_after = $5, error_message = $6,
                updated_at = $7, completed_at = $8
            WHERE id = $9
            "#,
        )
        .bind(transaction.status)
        .bind(transaction.from_balance_before)
        .bind(transaction.from_balance_after)
        .bind(transaction.to_balance_before)
        .bind(transaction.to_balance_after)
        .bind(&transaction.error_message)
        .bind(transaction.updated_at)
        .bind(transaction.completed_at)
        .bind(transaction.id)
        .execute(pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn insert_ledger_entry(
        tx: &mut PgTransaction<'_, Postgres>,
        entry: &LedgerEntry,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, transaction_id, user_id, entry_type, amount, balance_after, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.transaction_id)
        .bind(entry.user_id)
        .bind(entry.entry_type)
        .bind(entry.amount)
        .bind(entry.balance_after)
        .bind(entry.created_at)
        .execute(&mut **tx)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    /// The wallet-moving body of a transfer (§4.F steps 2-3): lock order,
    /// eligibility re-check, balance check, both wallet updates, the two
    /// ledger entries, and the header's `COMPLETED` transition. Any `Err`
    /// here leaves `transaction` untouched so the caller can fail the
    /// header instead.
    async fn run_transfer_body(
        tx: &mut PgTransaction<'_, Postgres>,
        transaction: &mut LedgerTransaction,
        cmd: &TransferCommand,
    ) -> Result<(), DomainError> {
        // Deterministic lock order (§4.F): always lock the lexicographically
        // smaller user id first, regardless of transfer direction, so two
        // opposite-direction transfers between the same pair of accounts
        // can never deadlock each other.
        let (first, second) = if cmd.from_user.into_uuid() <= cmd.to_user.into_uuid() {
            (cmd.from_user, cmd.to_user)
        } else {
            (cmd.to_user, cmd.from_user)
        };
        let first_balance = Self::lock_wallet_balance(tx, first).await?;
        let second_balance = Self::lock_wallet_balance(tx, second).await?;
        let (from_balance_before, to_balance_before) = if first == cmd.from_user {
            (first_balance, second_balance)
        } else {
            (second_balance, first_balance)
        };

        // Re-verify eligibility now that both rows are locked (§9 open
        // question (b)): a KYC change racing the transfer must not leave
        // a stale authorization in effect.
        if !Self::can_transact(tx, cmd.from_user).await? {
            return Err(DomainError::unauthorized(format!(
                "user {} is not eligible to transact",
                cmd.from_user
            )));
        }
        if !Self::can_transact(tx, cmd.to_user).await? {
            return Err(DomainError::unauthorized(format!(
                "user {} is not eligible to transact",
                cmd.to_user
            )));
        }

        if from_balance_before < cmd.amount {
            return Err(DomainError::InsufficientBalance);
        }

        let from_balance_after = from_balance_before.checked_sub(cmd.amount)?;
        let to_balance_after = to_balance_before.checked_add(cmd.amount)?;

        Self::set_wallet_balance(tx, cmd.from_user, from_balance_after).await?;
        Self::set_wallet_balance(tx, cmd.to_user, to_balance_after).await?;

        transaction.from_balance_before = Some(from_balance_before);
        transaction.from_balance_after = Some(from_balance_after);
        transaction.to_balance_before = Some(to_balance_before);
        transaction.to_balance_after = Some(to_balance_after);
        transaction.mark_completed();
        Self::complete_header(tx, transaction).await?;

        let debit_entry = LedgerEntry::new(
            transaction.id,
            cmd.from_user,
            LedgerEntryType::Debit,
            cmd.amount,
            from_balance_after,
        );
        let credit_entry = LedgerEntry::new(
            transaction.id,
            cmd.to_user,
            LedgerEntryType::Credit,
            cmd.amount,
            to_balance_after,
        );
        Self::insert_ledger_entry(tx, &debit_entry).await?;
        Self::insert_ledger_entry(tx, &credit_entry).await?;

        Ok(())
    }

    async fn run_deposit_body(
        tx: &mut PgTransaction<'_, Postgres>,
        transaction: &mut LedgerTransaction,
        cmd: &DepositCommand,
    ) -> Result<(), DomainError> {
        let to_balance_before = Self::lock_wallet_balance(tx, cmd.to_user).await?;
        let to_balance_after = to_balance_before.checked_add(cmd.amount)?;
        Self::set_wallet_balance(tx, cmd.to_user, to_balance_after).await?;

        transaction.to_balance_before = Some(to_balance_before);
        transaction.to_balance_after = Some(to_balance_after);
        transaction.mark_completed();
        Self::complete_header(tx, transaction).await?;

        let credit_entry = LedgerEntry::new(
            transaction.id,
            cmd.to_user,
            LedgerEntryType::Credit,
            cmd.amount,
            to_balance_after,
        );
        Self::insert_ledger_entry(tx, &credit_entry).await?;

        Ok(())
    }
}

#[async_trait]
impl LedgerEngine for PostgresLedgerEngine {
    #[tracing::instrument(name = "PostgresLedgerEngine::transfer", skip(self, cmd))]
    async fn transfer(&self, cmd: TransferCommand) -> Result<LedgerTransaction, DomainError> {
        let header = LedgerTransaction::new_transfer(
            cmd.reference_id.clone(),
            cmd.from_user,
            cmd.to_user,
            cmd.amount,
            cmd.description.clone(),
        )?;
        let mut transaction = Self::insert_or_fetch_header(&self.pool, &header).await?;
        if transaction.status != TransactionStatus::Processing {
            // Another caller already drove this reference_id to a
            // terminal state; replay it rather than re-running the body.
            return Ok(transaction);
        }

        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        match Self::run_transfer_body(&mut tx, &mut transaction, &cmd).await {
            Ok(()) => {
                tx.commit().await.map_err(map_db_err)?;
                Ok(transaction)
            }
            Err(e) => {
                tx.rollback().await.map_err(map_db_err)?;
                transaction.mark_failed(e.to_string());
                Self::fail_header(&self.pool, &transaction).await?;
                Err(e)
            }
        }
    }

    #[tracing::instrument(name = "PostgresLedgerEngine::deposit", skip(self, cmd))]
    async fn deposit(&self, cmd: DepositCommand) -> Result<LedgerTransaction, DomainError> {
        let header = LedgerTransaction::new_deposit(
            cmd.reference_id.clone(),
            cmd.to_user,
            cmd.amount,
            cmd.description.clone(),
        )?;
        let mut transaction = Self::insert_or_fetch_header(&self.pool, &header).await?;
        if transaction.status != TransactionStatus::Processing {
            return Ok(transaction);
        }

        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        match Self::run_deposit_body(&mut tx, &mut transaction, &cmd).await {
            Ok(()) => {
                tx.commit().await.map_err(map_db_err)?;
                Ok(transaction)
            }
            Err(e) => {
                tx.rollback().await.map_err(map_db_err)?;
                transaction.mark_failed(e.to_string());
                Self::fail_header(&self.pool, &transaction).await?;
                Err(e)
            }
        }
    }
}
