//! PostgreSQL profile repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::ProfileRow;
use crate::repo::ProfileRepository;

const PROFILE_COLUMNS: &str = r#"
    id, first_name, last_name, email, stripe_customer_id,
    default_payment_method_id, stripe_subscription_id, subscription_status,
    current_sub_end_date, subscribe_status, payment_failed, payment_failed_at,
    created_at, updated_at
"#;

/// PostgreSQL profile repository
#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    /// Create a new profile repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ProfileRow>> {
        let profile = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn find_by_email(&self, email: &str) -> DbResult<Option<ProfileRow>> {
        let profile = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn find_by_stripe_customer_id(&self, customer_id: &str) -> DbResult<Option<ProfileRow>> {
        let profile = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE stripe_customer_id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn set_subscription(
        &self,
        id: Uuid,
        subscription_id: &str,
        status: &str,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE profiles
            SET stripe_subscription_id = $1, subscription_status = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(subscription_id)
        .bind(status)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn advance_sub_end_date(&self, id: Uuid, end_date: DateTime<Utc>) -> DbResult<()> {
        // GREATEST keeps the paid-through boundary monotonic under
        // concurrent writers (e.g. a dosage change racing a renewal).
        sqlx::query(
            r#"
            UPDATE profiles
            SET current_sub_end_date = GREATEST(COALESCE(current_sub_end_date, $1), $1),
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(end_date)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_subscribe_status(&self, id: Uuid, subscribed: bool) -> DbResult<()> {
        sqlx::query(
            "UPDATE profiles SET subscribe_status = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(subscribed)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_payment_failed(&self, id: Uuid, failed: bool, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE profiles
            SET payment_failed = $1, payment_failed_at = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(failed)
        .bind(failed.then_some(at))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
