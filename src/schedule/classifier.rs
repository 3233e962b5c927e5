use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::schedule::generator::InstallmentSchedule;
use crate::sources::models::Payment;

/// Payment classification policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifierPolicy {
    /// Tolerance around each schedule date, in days. None means exact match only.
    pub grace_period_days: Option<u32>,
}

/// A payment together with its schedule classification
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedPayment {
    pub payment: Payment,
    pub scheduled: bool,
    /// Schedule date the payment was matched to
    pub matched_date: Option<NaiveDate>,
}

/// Tags observed payments as on-schedule or unscheduled
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentClassifier {
    policy: ClassifierPolicy,
}

impl PaymentClassifier {
    pub fn new(policy: ClassifierPolicy) -> Self {
        Self { policy }
    }

    /// Find the schedule date a payment on `date` counts toward, if any
    pub fn match_date(&self, schedule: &InstallmentSchedule, date: NaiveDate) -> Option<NaiveDate> {
        if schedule.contains(date) {
            return Some(date);
        }

        let grace = match self.policy.grace_period_days {
            Some(days) if days > 0 => Days::new(u64::from(days)),
            _ => return None,
        };

        let from = date.checked_sub_days(grace).unwrap_or(NaiveDate::MIN);
        let to = date.checked_add_days(grace).unwrap_or(NaiveDate::MAX);

        // Nearest wins; on a tie the earlier slot does
        schedule
            .dates_between(from, to)
            .min_by_key(|slot| (*slot - date).num_days().abs())
    }

    /// Classify every payment, preserving input order
    pub fn classify(&self, schedule: &InstallmentSchedule, payments: Vec<Payment>) -> Vec<ClassifiedPayment> {
        payments
            .into_iter()
            .map(|payment| {
                let matched_date = self.match_date(schedule, payment.date);
                debug!(
                    "Payment date:{} amount:{} scheduled:{}",
                    payment.date,
                    payment.amount,
                    matched_date.is_some()
                );
                ClassifiedPayment {
                    payment,
                    scheduled: matched_date.is_some(),
                    matched_date,
                }
            })
            .collect()
    }

    /// Wrap payments as unscheduled when no schedule could be generated
    pub fn unscheduled(payments: Vec<Payment>) -> Vec<ClassifiedPayment> {
        payments
            .into_iter()
            .map(|payment| ClassifiedPayment {
                payment,
                scheduled: false,
                matched_date: None,
            })
            .collect()
    }
}
