//! PostgreSQL form submission repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::FormSubmissionRow;
use crate::repo::FormSubmissionRepository;

/// PostgreSQL form submission repository
#[derive(Clone)]
pub struct PgFormSubmissionRepository {
    pool: PgPool,
}

impl PgFormSubmissionRepository {
    /// Create a new form submission repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FormSubmissionRepository for PgFormSubmissionRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<FormSubmissionRow>> {
        let row = sqlx::query_as::<_, FormSubmissionRow>(
            r#"
            SELECT id, profile_id, approval_status, created_at, updated_at
            FROM form_submissions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn approve(&self, id: Uuid) -> DbResult<()> {
        // Only pending submissions transition; approved/rejected are final.
        sqlx::query(
            r#"
            UPDATE form_submissions
            SET approval_status = 'approved', updated_at = NOW()
            WHERE id = $1 AND approval_status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
