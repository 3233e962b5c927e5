use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::error::ScheduleError;
use crate::reconcile::balance;
use crate::schedule::{ClassifiedPayment, Frequency, InstallmentSchedule};
use crate::sources::models::PaymentPlan;

/// A payment plan after reconciliation, exclusively owned by its debt
#[derive(Debug, Clone)]
pub struct ReconciledPlan {
    pub plan: PaymentPlan,
    /// None when the plan's cadence label was not recognized
    pub frequency: Option<Frequency>,
    /// None when the schedule could not be generated
    pub schedule: Option<InstallmentSchedule>,
    /// Attached payments, ascending by date
    pub payments: Vec<ClassifiedPayment>,
}

impl ReconciledPlan {
    pub fn total_paid(&self) -> Decimal {
        balance::sum_payments(self.payments.iter().map(|p| &p.payment))
    }

    pub fn scheduled_payments(&self) -> impl Iterator<Item = &ClassifiedPayment> {
        self.payments.iter().filter(|p| p.scheduled)
    }
}

/// Enriched debt, as emitted by the run
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledDebt {
    pub id: i64,

    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,

    pub is_in_payment_plan: bool,

    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    remaining_amount: Decimal,

    pub next_payment_due_date: Option<NaiveDate>,

    #[serde(skip)]
    pub payment_plan: Option<ReconciledPlan>,
}

impl ReconciledDebt {
    /// The remaining amount is fixed at construction and never recomputed
    pub fn new(
        id: i64,
        amount: Decimal,
        remaining_amount: Decimal,
        next_payment_due_date: Option<NaiveDate>,
        payment_plan: Option<ReconciledPlan>,
    ) -> Self {
        let is_in_payment_plan = payment_plan.is_some() && !balance::is_paid_off(remaining_amount);
        Self {
            id,
            amount,
            is_in_payment_plan,
            remaining_amount,
            next_payment_due_date,
            payment_plan,
        }
    }

    pub fn remaining_amount(&self) -> Decimal {
        self.remaining_amount
    }

    pub fn is_paid_off(&self) -> bool {
        balance::is_paid_off(self.remaining_amount())
    }
}

/// Data-integrity problems found while joining the collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// A plan whose debt id matches no debt
    OrphanedPlan { plan_id: i64, debt_id: i64 },
    /// A second plan for a debt that already has one
    DuplicatePlan { plan_id: i64, debt_id: i64 },
    /// Payments referencing a plan that was never attached
    OrphanedPayments { payment_plan_id: i64, count: usize },
    /// A repeated debt id; only the first occurrence is reconciled
    DuplicateDebt { debt_id: i64 },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::OrphanedPlan { plan_id, debt_id } => {
                write!(f, "payment plan {} references missing debt {}", plan_id, debt_id)
            }
            IntegrityIssue::DuplicatePlan { plan_id, debt_id } => {
                write!(f, "payment plan {} is a second plan for debt {}", plan_id, debt_id)
            }
            IntegrityIssue::OrphanedPayments { payment_plan_id, count } => {
                write!(f, "{} payment(s) reference unattached plan {}", count, payment_plan_id)
            }
            IntegrityIssue::DuplicateDebt { debt_id } => {
                write!(f, "debt {} appears more than once", debt_id)
            }
        }
    }
}

/// A recoverable failure confined to one plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanError {
    pub debt_id: i64,
    pub plan_id: i64,
    pub error: ScheduleError,
}

/// Output of one reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Ascending by debt id
    pub debts: Vec<ReconciledDebt>,
    pub integrity_issues: Vec<IntegrityIssue>,
    pub plan_errors: Vec<PlanError>,
}

impl Reconciliation {
    pub fn is_clean(&self) -> bool {
        self.integrity_issues.is_empty()
    }

    #[cfg(test)]
    pub fn debt(&self, id: i64) -> Option<&ReconciledDebt> {
        self.debts.iter().find(|d| d.id == id)
    }
}
