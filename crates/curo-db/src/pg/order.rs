//! PostgreSQL order repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::OrderRow;
use crate::repo::{CreateOrder, OrderRepository};

const ORDER_COLUMNS: &str = r#"
    id, profile_id, plan_name, price_cents, shipping_address,
    payment_status, delivery_status, form_submission_id, is_renewal, created_at
"#;

/// PostgreSQL order repository
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, order: CreateOrder) -> DbResult<OrderRow> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (id, profile_id, plan_name, price_cents, shipping_address,
                                payment_status, delivery_status, form_submission_id, is_renewal)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.id)
        .bind(order.profile_id)
        .bind(&order.plan_name)
        .bind(order.price_cents)
        .bind(&order.shipping_address)
        .bind(&order.payment_status)
        .bind(order.form_submission_id)
        .bind(order.is_renewal)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_latest_for_profile(&self, profile_id: Uuid) -> DbResult<Option<OrderRow>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE profile_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_delivery_status(&self, id: Uuid, status: &str) -> DbResult<()> {
        sqlx::query("UPDATE orders SET delivery_status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
