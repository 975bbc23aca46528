use std::sync::Arc;

use common::{DomainError, UserId};

use crate::domain::entities::Transaction;
use crate::domain::repository::TransactionRepository;

/// Caso de uso para obtener el historial de movimientos de un usuario.
///
/// Encapsula la búsqueda de transacciones (transferencias y depósitos)
/// utilizando el repositorio de persistencia `TransactionRepository`.
#[derive(Clone)]
pub struct ListTransactionsUseCase {
    transaction_repo: Arc<dyn TransactionRepository>,
}

impl ListTransactionsUseCase {
    pub fn new(transaction_repo: Arc<dyn TransactionRepository>) -> Self {
        Self { transaction_repo }
    }

    #[tracing::instrument(name = "ListTransactionsUseCase::execute", skip(self))]
    pub async fn execute(&self, user_id: UserId) -> Result<Vec<Transaction>, DomainError> {
        self.transaction_repo.find_by_user_id(user_id).await
    }
}
