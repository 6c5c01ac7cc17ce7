//! PostgreSQL per-category plan repository implementation
//!
//! The `profile_plans` side table replaces a serialized plan-map blob:
//! the `(profile_id, category)` uniqueness constraint plus upsert gives
//! real concurrency safety instead of read-modify-write on a document.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use curo_types::Category;

use crate::error::DbResult;
use crate::models::PlanRow;
use crate::repo::PlanRepository;

/// PostgreSQL plan repository
#[derive(Clone)]
pub struct PgPlanRepository {
    pool: PgPool,
}

impl PgPlanRepository {
    /// Create a new plan repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanRepository for PgPlanRepository {
    async fn upsert(&self, profile_id: Uuid, category: Category, plan_name: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profile_plans (profile_id, category, plan_name, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (profile_id, category)
            DO UPDATE SET plan_name = EXCLUDED.plan_name, updated_at = NOW()
            "#,
        )
        .bind(profile_id)
        .bind(category.slug())
        .bind(plan_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, profile_id: Uuid, category: Category) -> DbResult<Option<PlanRow>> {
        let plan = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT profile_id, category, plan_name, updated_at
            FROM profile_plans
            WHERE profile_id = $1 AND category = $2
            "#,
        )
        .bind(profile_id)
        .bind(category.slug())
        .fetch_optional(&self.pool)
        .await?;

        Ok(plan)
    }

    async fn list_for_profile(&self, profile_id: Uuid) -> DbResult<Vec<PlanRow>> {
        let plans = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT profile_id, category, plan_name, updated_at
            FROM profile_plans
            WHERE profile_id = $1
            ORDER BY category
            "#,
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }
}
