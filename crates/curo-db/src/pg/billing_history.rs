//! PostgreSQL billing history repository implementation
//!
//! The ledger is append-only. The statements live in module constants
//! so the test below can audit that none of them mutates existing rows.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::BillingHistoryRow;
use crate::repo::{BillingHistoryRepository, CreateBillingEntry};

/// Insert keyed on the external charge/invoice id; webhook redelivery
/// of the same event writes nothing.
const INSERT_ENTRY: &str = r#"
    INSERT INTO billing_history (id, profile_id, external_id, amount_cents, currency,
                                 description, billed_at, success, recurring,
                                 period_start, period_end)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    ON CONFLICT (external_id) DO NOTHING
"#;

const EXISTS_BY_EXTERNAL_ID: &str =
    "SELECT EXISTS(SELECT 1 FROM billing_history WHERE external_id = $1)";

const LIST_FOR_PROFILE: &str = r#"
    SELECT id, profile_id, external_id, amount_cents, currency, description,
           billed_at, success, recurring, period_start, period_end
    FROM billing_history
    WHERE profile_id = $1
    ORDER BY billed_at DESC
    LIMIT $2
"#;

/// PostgreSQL billing history repository
#[derive(Clone)]
pub struct PgBillingHistoryRepository {
    pool: PgPool,
}

impl PgBillingHistoryRepository {
    /// Create a new billing history repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingHistoryRepository for PgBillingHistoryRepository {
    async fn insert(&self, entry: CreateBillingEntry) -> DbResult<bool> {
        let result = sqlx::query(INSERT_ENTRY)
            .bind(entry.id)
            .bind(entry.profile_id)
            .bind(&entry.external_id)
            .bind(entry.amount_cents)
            .bind(&entry.currency)
            .bind(&entry.description)
            .bind(entry.billed_at)
            .bind(entry.success)
            .bind(entry.recurring)
            .bind(entry.period_start)
            .bind(entry.period_end)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists_by_external_id(&self, external_id: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar(EXISTS_BY_EXTERNAL_ID)
            .bind(external_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn list_for_profile(
        &self,
        profile_id: Uuid,
        limit: i64,
    ) -> DbResult<Vec<BillingHistoryRow>> {
        let rows = sqlx::query_as::<_, BillingHistoryRow>(LIST_FOR_PROFILE)
            .bind(profile_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The ledger is a log, not mutable state: no statement in this
    /// module may UPDATE or DELETE billing_history rows.
    #[test]
    fn test_ledger_statements_are_append_only() {
        for stmt in [INSERT_ENTRY, EXISTS_BY_EXTERNAL_ID, LIST_FOR_PROFILE] {
            let upper = stmt.to_uppercase();
            assert!(!upper.contains("UPDATE"), "mutating statement found: {stmt}");
            assert!(!upper.contains("DELETE"), "deleting statement found: {stmt}");
        }
    }

    #[test]
    fn test_insert_is_keyed_on_external_id() {
        assert!(INSERT_ENTRY.contains("ON CONFLICT (external_id) DO NOTHING"));
    }
}
