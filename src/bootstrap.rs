use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    reconcile::{HierarchyAssembler, ReconciledPlan, Reconciliation},
    sources::{fetch_snapshot, DataSource, HttpDataSource},
};

/// Wire up the HTTP source from configuration and run one reconciliation
pub async fn run(config: &Config) -> AppResult<Reconciliation> {
    info!("Initializing reconciliation components ...");

    let source: Arc<dyn DataSource> = Arc::new(HttpDataSource::new(config.endpoints(), config.request_timeout())?);
    info!(
        "✅ HTTP source initialized (request timeout {}s, fetch deadline {}s)",
        config.request_timeout_secs, config.fetch_timeout_secs
    );

    reconcile_from(source, config).await
}

/// Fetch a snapshot from `source` and reconcile it under the configured policy
pub async fn reconcile_from(source: Arc<dyn DataSource>, config: &Config) -> AppResult<Reconciliation> {
    let snapshot = fetch_snapshot(source, config.fetch_timeout()).await?;

    let policy = config.reconcile_policy();
    info!("⚙️  Reconciling with {:?}", policy);
    let reconciliation = HierarchyAssembler::new(policy).assemble(snapshot);

    for debt in &reconciliation.debts {
        if let Some(plan) = &debt.payment_plan {
            dump_plan(debt.id, plan);
        }
    }

    if !reconciliation.plan_errors.is_empty() {
        let summary = reconciliation
            .plan_errors
            .iter()
            .map(|e| format!("debt {} plan {}: {}", e.debt_id, e.plan_id, e.error))
            .collect::<Vec<_>>()
            .join("; ");
        warn!(
            "⚠️  {} plan(s) left without a next due date: {}",
            reconciliation.plan_errors.len(),
            summary
        );
    }

    if !reconciliation.is_clean() {
        let summary = reconciliation
            .integrity_issues
            .iter()
            .map(|issue| issue.to_string())
            .collect::<Vec<_>>()
            .join("; ");

        if config.strict_integrity {
            return Err(AppError::Integrity(summary));
        }
        warn!("⚠️  Continuing despite data integrity issues: {}", summary);
    }

    Ok(reconciliation)
}

/// Render the enriched debts as a pretty JSON array
pub fn render(reconciliation: &Reconciliation) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(&reconciliation.debts)?)
}

fn dump_plan(debt_id: i64, plan: &ReconciledPlan) {
    debug!(
        "Debt {} plan {} ({}): {} payments totalling {}, {} on schedule",
        debt_id,
        plan.plan.id,
        plan.frequency.map_or("unrecognized cadence", |f| f.as_str()),
        plan.payments.len(),
        plan.total_paid(),
        plan.scheduled_payments().count()
    );

    let Some(schedule) = &plan.schedule else {
        return;
    };
    if let Some(last) = schedule.last() {
        debug!(
            "  {} installments, last on {} at balance {}",
            schedule.len(),
            last.date,
            last.anticipated_balance
        );
    }
    for installment in schedule.installments() {
        debug!(
            "  {} anticipated balance {}",
            installment.date, installment.anticipated_balance
        );
    }
}
