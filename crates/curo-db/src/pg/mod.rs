//! PostgreSQL repository implementations

mod billing_history;
mod form_submission;
mod order;
mod plan;
mod profile;

pub use billing_history::PgBillingHistoryRepository;
pub use form_submission::PgFormSubmissionRepository;
pub use order::PgOrderRepository;
pub use plan::PgPlanRepository;
pub use profile::PgProfileRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub profiles: PgProfileRepository,
    pub plans: PgPlanRepository,
    pub orders: PgOrderRepository,
    pub billing_history: PgBillingHistoryRepository,
    pub form_submissions: PgFormSubmissionRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            profiles: PgProfileRepository::new(pool.clone()),
            plans: PgPlanRepository::new(pool.clone()),
            orders: PgOrderRepository::new(pool.clone()),
            billing_history: PgBillingHistoryRepository::new(pool.clone()),
            form_submissions: PgFormSubmissionRepository::new(pool),
        }
    }
}
