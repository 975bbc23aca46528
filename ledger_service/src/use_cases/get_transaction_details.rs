use std::sync::Arc;

use common::{DomainError, TransactionId};

use crate::domain::entities::Transaction;
use crate::domain::repository::TransactionRepository;

/// Caso de uso para obtener los detalles de una única transacción.
///
/// Encapsula la lógica necesaria para consultar una transacción específica
/// por su ID delegando la tarea de acceso a datos al `TransactionRepository`.
#[derive(Clone)]
pub struct GetTransactionDetailsUseCase {
    transaction_repo: Arc<dyn TransactionRepository>,
}

impl GetTransactionDetailsUseCase {
    pub fn new(transaction_repo: Arc<dyn TransactionRepository>) -> Self {
        Self { transaction_repo }
    }

    #[tracing::instrument(name = "GetTransactionDetailsUseCase::execute", skip(self))]
    pub async fn execute(&self, transaction_id: TransactionId) -> Result<Transaction, DomainError> {
        self.transaction_repo
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("transaction {transaction_id}")))
    }
}
