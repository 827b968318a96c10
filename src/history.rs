//! Transaction history
//!
//! Paginated, newest-first listing of the transactions a user took part in.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Transaction, TransactionKind};
use crate::store::{HistoryFilter, Store, StoreError};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Raw paging input; out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub kind: Option<TransactionKind>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl HistoryQuery {
    /// Effective (page, limit)
    pub fn normalized(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        (page, limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub last_page: i64,
}

#[derive(Clone)]
pub struct TransactionHistory {
    store: Arc<dyn Store>,
}

impl TransactionHistory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, user_id: Uuid, query: &HistoryQuery) -> Result<TransactionPage, StoreError> {
        let (page, limit) = query.normalized();
        let filter = HistoryFilter {
            user_id,
            kind: query.kind,
            offset: (page - 1).saturating_mul(limit),
            limit,
        };

        let (items, total) = self.store.list_transactions(&filter).await?;

        tracing::debug!(
            user_id = %user_id,
            kind = ?query.kind,
            page,
            limit,
            total,
            "Listed transactions"
        );

        Ok(TransactionPage {
            items,
            total,
            page,
            limit,
            last_page: last_page(total, limit),
        })
    }
}

/// ceil(total / limit); 0 when there is nothing to show
fn last_page(total: i64, limit: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}
