use std::collections::{BTreeMap, HashSet};
use tracing::{debug, error, info, warn};

use crate::error::ScheduleError;
use crate::reconcile::balance;
use crate::reconcile::models::{IntegrityIssue, PlanError, ReconciledDebt, ReconciledPlan, Reconciliation};
use crate::reconcile::next_due::{NextDueDateResolver, NextDueFallback};
use crate::schedule::{ClassifierPolicy, Frequency, InstallmentSchedule, PaymentClassifier};
use crate::sources::models::{Debt, Payment, PaymentPlan, Snapshot};

/// Policy knobs of a reconciliation pass
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcilePolicy {
    pub classifier: ClassifierPolicy,
    pub next_due_fallback: NextDueFallback,
}

/// Joins the three flat collections and derives balances and due dates
pub struct HierarchyAssembler {
    classifier: PaymentClassifier,
    resolver: NextDueDateResolver,
}

impl HierarchyAssembler {
    pub fn new(policy: ReconcilePolicy) -> Self {
        Self {
            classifier: PaymentClassifier::new(policy.classifier),
            resolver: NextDueDateResolver::new(policy.next_due_fallback),
        }
    }

    /// Reconcile one snapshot.
    ///
    /// Integrity issues and per-plan errors are collected, never raised.
    pub fn assemble(&self, snapshot: Snapshot) -> Reconciliation {
        let Snapshot {
            mut debts,
            payment_plans,
            payments,
        } = snapshot;

        let mut integrity_issues = Vec::new();
        let mut plan_errors = Vec::new();

        // Free plan pool keyed by debt id; ordered so leftovers report deterministically
        let mut plan_pool: BTreeMap<i64, PaymentPlan> = BTreeMap::new();
        for plan in payment_plans {
            if let Some(existing) = plan_pool.get(&plan.debt_id) {
                warn!(
                    "Debt {} already has plan {}; plan {} ignored",
                    plan.debt_id, existing.id, plan.id
                );
                integrity_issues.push(IntegrityIssue::DuplicatePlan {
                    plan_id: plan.id,
                    debt_id: plan.debt_id,
                });
                continue;
            }
            plan_pool.insert(plan.debt_id, plan);
        }

        let mut payment_pool: BTreeMap<i64, Vec<Payment>> = BTreeMap::new();
        for payment in payments {
            payment_pool.entry(payment.payment_plan_id).or_default().push(payment);
        }

        debts.sort_by_key(|d| d.id);

        let mut seen = HashSet::new();
        let mut reconciled = Vec::with_capacity(debts.len());

        for debt in debts {
            if !seen.insert(debt.id) {
                warn!("Debt {} appears more than once; later copy ignored", debt.id);
                integrity_issues.push(IntegrityIssue::DuplicateDebt { debt_id: debt.id });
                continue;
            }

            let enriched = match plan_pool.remove(&debt.id) {
                None => Self::without_plan(&debt),
                Some(plan) => {
                    let mut attached = payment_pool.remove(&plan.id).unwrap_or_default();
                    attached.sort_by_key(|p| p.date);

                    let (enriched, plan_error) = self.reconcile_plan(&debt, plan, attached);
                    if let Some(plan_error) = plan_error {
                        warn!(
                            "Plan {} for debt {} left without a due date: {}",
                            plan_error.plan_id, plan_error.debt_id, plan_error.error
                        );
                        plan_errors.push(plan_error);
                    }
                    enriched
                }
            };

            if enriched.is_in_payment_plan != debt.is_in_payment_plan {
                debug!(
                    "Debt {}: served is_in_payment_plan={} replaced by derived {}",
                    debt.id, debt.is_in_payment_plan, enriched.is_in_payment_plan
                );
            }
            reconciled.push(enriched);
        }

        // Anything left in the pools was never attached
        for (debt_id, plan) in plan_pool {
            integrity_issues.push(IntegrityIssue::OrphanedPlan {
                plan_id: plan.id,
                debt_id,
            });
        }
        for (payment_plan_id, orphaned) in payment_pool {
            integrity_issues.push(IntegrityIssue::OrphanedPayments {
                payment_plan_id,
                count: orphaned.len(),
            });
        }

        for issue in &integrity_issues {
            error!("❌ Data integrity: {}", issue);
        }

        info!(
            "✓ Reconciled {} debts ({} in active plans, {} plan errors, {} integrity issues)",
            reconciled.len(),
            reconciled.iter().filter(|d| d.is_in_payment_plan).count(),
            plan_errors.len(),
            integrity_issues.len()
        );

        Reconciliation {
            debts: reconciled,
            integrity_issues,
            plan_errors,
        }
    }

    fn without_plan(debt: &Debt) -> ReconciledDebt {
        let remaining = balance::remaining_amount(debt.amount, None, std::iter::empty());
        ReconciledDebt::new(debt.id, debt.amount, remaining, None, None)
    }

    /// Schedule, classify, balance, then resolve the due date, in that order
    fn reconcile_plan(
        &self,
        debt: &Debt,
        plan: PaymentPlan,
        payments: Vec<Payment>,
    ) -> (ReconciledDebt, Option<PlanError>) {
        let schedule = plan
            .installment_frequency
            .parse::<Frequency>()
            .and_then(|frequency| InstallmentSchedule::generate(&plan, frequency));

        let (frequency, schedule, payments, plan_error) = match schedule {
            Ok(schedule) => {
                let classified = self.classifier.classify(&schedule, payments);
                (Some(schedule.frequency()), Some(schedule), classified, None)
            }
            Err(error) => {
                let frequency = match &error {
                    ScheduleError::UnrecognizedCadence(_) => None,
                    ScheduleError::MalformedSchedule { .. } => plan.installment_frequency.parse().ok(),
                };
                let plan_error = PlanError {
                    debt_id: debt.id,
                    plan_id: plan.id,
                    error,
                };
                (frequency, None, PaymentClassifier::unscheduled(payments), Some(plan_error))
            }
        };

        let remaining = balance::remaining_amount(
            debt.amount,
            Some(plan.amount_to_pay),
            payments.iter().map(|p| &p.payment),
        );
        let active = !balance::is_paid_off(remaining);

        let next_payment_due_date = match (&schedule, active) {
            (Some(schedule), true) => self.resolver.resolve(schedule, &payments),
            _ => None,
        };

        debug!(
            "Debt {}: plan {} remaining={} paid_off={} next_due={:?}",
            debt.id,
            plan.id,
            remaining,
            !active,
            next_payment_due_date
        );

        let reconciled_plan = ReconciledPlan {
            plan,
            frequency,
            schedule,
            payments,
        };

        (
            ReconciledDebt::new(
                debt.id,
                debt.amount,
                remaining,
                next_payment_due_date,
                Some(reconciled_plan),
            ),
            plan_error,
        )
    }
}
