// Snapshot fan-in
//
// Three retrieval tasks run concurrently, one per collection. Each task owns
// a oneshot sender and reports exactly once. The coordinator races the three
// receivers against a single deadline and needs all three before returning.
// Whatever is still running when the coordinator returns is aborted.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult, FetchError};
use crate::sources::models::{Collection, Snapshot};
use crate::sources::traits::DataSource;

/// Aborts every retrieval task still in flight when dropped
struct InFlight {
    handles: Vec<JoinHandle<()>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        for handle in &self.handles {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

/// Spawn one retrieval task that writes its result to `tx` exactly once
fn spawn_retrieval<T, F, Fut>(
    source: Arc<dyn DataSource>,
    tx: oneshot::Sender<Result<T, FetchError>>,
    fetch: F,
) -> JoinHandle<()>
where
    T: Send + 'static,
    F: FnOnce(Arc<dyn DataSource>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<T, FetchError>> + Send + 'static,
{
    tokio::spawn(async move {
        let result = fetch(source).await;
        // The coordinator may have given up already
        let _ = tx.send(result);
    })
}

/// Unwrap one arrival, logging and propagating failures
fn settle<T>(
    collection: Collection,
    arrival: Result<Result<T, FetchError>, oneshot::error::RecvError>,
) -> Result<T, FetchError> {
    match arrival {
        Ok(Ok(records)) => Ok(records),
        Ok(Err(e)) => {
            error!("❌ Error encountered retrieving or parsing {}: {}", collection, e);
            Err(e)
        }
        Err(_) => {
            error!("❌ Retrieval task for {} dropped its result channel", collection);
            Err(FetchError::TaskAborted(collection))
        }
    }
}

/// Fetch all three collections concurrently, bounded by `timeout`.
///
/// Fails on the first fetch error or when the deadline passes; no partial
/// snapshot is ever returned.
pub async fn fetch_snapshot(source: Arc<dyn DataSource>, timeout: Duration) -> AppResult<Snapshot> {
    info!(
        "🔄 Retrieving debts, payment plans and payments from {} source",
        source.name()
    );

    let (debts_tx, mut debts_rx) = oneshot::channel();
    let (plans_tx, mut plans_rx) = oneshot::channel();
    let (payments_tx, mut payments_rx) = oneshot::channel();

    let _in_flight = InFlight {
        handles: vec![
            spawn_retrieval(source.clone(), debts_tx, |s| async move {
                s.fetch_debts().await
            }),
            spawn_retrieval(source.clone(), plans_tx, |s| async move {
                s.fetch_payment_plans().await
            }),
            spawn_retrieval(source.clone(), payments_tx, |s| async move {
                s.fetch_payments().await
            }),
        ],
    };

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut debts = None;
    let mut plans = None;
    let mut payments = None;

    while debts.is_none() || plans.is_none() || payments.is_none() {
        tokio::select! {
            arrival = &mut debts_rx, if debts.is_none() => {
                debts = Some(settle(Collection::Debts, arrival)?);
            }
            arrival = &mut plans_rx, if plans.is_none() => {
                plans = Some(settle(Collection::PaymentPlans, arrival)?);
            }
            arrival = &mut payments_rx, if payments.is_none() => {
                payments = Some(settle(Collection::Payments, arrival)?);
            }
            _ = &mut deadline => {
                let pending: Vec<Collection> = Collection::all()
                    .into_iter()
                    .filter(|collection| match collection {
                        Collection::Debts => debts.is_none(),
                        Collection::PaymentPlans => plans.is_none(),
                        Collection::Payments => payments.is_none(),
                    })
                    .collect();
                warn!("⏰ Timed out waiting for one or more results: {:?}", pending);
                return Err(AppError::Timeout {
                    pending,
                    waited_secs: timeout.as_secs(),
                });
            }
        }
    }

    let snapshot = match (debts, plans, payments) {
        (Some(debts), Some(plans), Some(payments)) => Snapshot::new(debts, plans, payments),
        (None, _, _) => return Err(FetchError::TaskAborted(Collection::Debts).into()),
        (_, None, _) => return Err(FetchError::TaskAborted(Collection::PaymentPlans).into()),
        (_, _, None) => return Err(FetchError::TaskAborted(Collection::Payments).into()),
    };

    info!(
        "✓ Snapshot complete: {} debts, {} payment plans, {} payments",
        snapshot.debts.len(),
        snapshot.payment_plans.len(),
        snapshot.payments.len()
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::sources::models::{Debt, Payment, PaymentPlan};

    /// In-memory source with per-collection delays
    struct StaticSource {
        debts_delay: Duration,
        plans_delay: Duration,
        payments_delay: Duration,
        fail_plans: bool,
        panic_payments: bool,
        payments_finished: Arc<AtomicBool>,
    }

    impl StaticSource {
        fn new() -> Self {
            Self {
                debts_delay: Duration::ZERO,
                plans_delay: Duration::ZERO,
                payments_delay: Duration::ZERO,
                fail_plans: false,
                panic_payments: false,
                payments_finished: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl DataSource for StaticSource {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn fetch_debts(&self) -> Result<Vec<Debt>, FetchError> {
            tokio::time::sleep(self.debts_delay).await;
            Ok(vec![Debt {
                id: 0,
                amount: dec!(123.46),
                is_in_payment_plan: false,
            }])
        }

        async fn fetch_payment_plans(&self) -> Result<Vec<PaymentPlan>, FetchError> {
            tokio::time::sleep(self.plans_delay).await;
            if self.fail_plans {
                return Err(FetchError::UnexpectedStatus {
                    collection: Collection::PaymentPlans,
                    status: 503,
                });
            }
            Ok(vec![PaymentPlan {
                id: 0,
                debt_id: 0,
                amount_to_pay: dec!(123.46),
                installment_frequency: "weekly".to_string(),
                installment_amount: dec!(5.28),
                start_date: NaiveDate::from_ymd_opt(2020, 2, 28).unwrap(),
            }])
        }

        async fn fetch_payments(&self) -> Result<Vec<Payment>, FetchError> {
            tokio::time::sleep(self.payments_delay).await;
            if self.panic_payments {
                panic!("payments retrieval crashed");
            }
            self.payments_finished.store(true, Ordering::SeqCst);
            Ok(vec![Payment {
                amount: dec!(5.28),
                date: NaiveDate::from_ymd_opt(2020, 3, 6).unwrap(),
                payment_plan_id: 0,
            }])
        }
    }

    #[tokio::test]
    async fn test_collects_all_three_regardless_of_completion_order() {
        let mut source = StaticSource::new();
        source.debts_delay = Duration::from_millis(60);
        source.plans_delay = Duration::from_millis(30);

        let snapshot = fetch_snapshot(Arc::new(source), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(snapshot.debts.len(), 1);
        assert_eq!(snapshot.payment_plans.len(), 1);
        assert_eq!(snapshot.payments.len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_reports_pending_collections() {
        let mut source = StaticSource::new();
        source.payments_delay = Duration::from_secs(30);

        let err = fetch_snapshot(Arc::new(source), Duration::from_millis(50))
            .await
            .unwrap_err();

        match err {
            AppError::Timeout { pending, .. } => {
                assert_eq!(pending, vec![Collection::Payments]);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_first_fetch_error_aborts_the_run() {
        let mut source = StaticSource::new();
        source.fail_plans = true;
        source.payments_delay = Duration::from_millis(200);
        let payments_finished = source.payments_finished.clone();

        let err = fetch_snapshot(Arc::new(source), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Fetch(FetchError::UnexpectedStatus { status: 503, .. })
        ));

        // The slow payments retrieval was aborted rather than left running
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!payments_finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_crashed_retrieval_is_reported_as_aborted() {
        let mut source = StaticSource::new();
        source.panic_payments = true;

        let err = fetch_snapshot(Arc::new(source), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Fetch(FetchError::TaskAborted(Collection::Payments))
        ));
    }
}
