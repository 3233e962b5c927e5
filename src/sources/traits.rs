use async_trait::async_trait;

use crate::error::FetchError;
use crate::sources::models::{Debt, Payment, PaymentPlan};

/// A provider of the three read-only collections.
///
/// Each method is one round trip against one endpoint; implementations
/// share no mutable state between calls.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_debts(&self) -> Result<Vec<Debt>, FetchError>;

    async fn fetch_payment_plans(&self) -> Result<Vec<PaymentPlan>, FetchError>;

    async fn fetch_payments(&self) -> Result<Vec<Payment>, FetchError>;
}
