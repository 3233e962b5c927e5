use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::ops::Bound;
use tracing::{debug, warn};

use crate::error::ScheduleError;
use crate::schedule::frequency::Frequency;
use crate::sources::models::PaymentPlan;

/// Upper bound on installments per plan
pub const MAX_SCHEDULE_INSTALLMENTS: usize = 100_000;

/// One expected installment: its date and the balance anticipated on that date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledInstallment {
    pub date: NaiveDate,
    pub anticipated_balance: Decimal,
}

/// Lazy sequence of expected installments.
///
/// Starts at `(start, target)`, advances one cadence per step and stops after
/// the first installment whose anticipated balance is at or below zero. A
/// non-positive installment amount yields only the first installment.
#[derive(Debug, Clone)]
pub struct ScheduleIter {
    frequency: Frequency,
    installment_amount: Decimal,
    next: Option<ScheduledInstallment>,
}

impl ScheduleIter {
    pub fn new(
        start_date: NaiveDate,
        frequency: Frequency,
        target_amount: Decimal,
        installment_amount: Decimal,
    ) -> Self {
        Self {
            frequency,
            installment_amount,
            next: Some(ScheduledInstallment {
                date: start_date,
                anticipated_balance: target_amount,
            }),
        }
    }
}

impl Iterator for ScheduleIter {
    type Item = Result<ScheduledInstallment, NaiveDate>;

    /// Yields `Err(date)` once if the calendar runs out after `date`
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;

        let terminal = current.anticipated_balance <= Decimal::ZERO
            || self.installment_amount <= Decimal::ZERO;

        if !terminal {
            match self.frequency.advance(current.date) {
                Some(date) => {
                    self.next = Some(ScheduledInstallment {
                        date,
                        anticipated_balance: current.anticipated_balance - self.installment_amount,
                    });
                }
                None => return Some(Err(current.date)),
            }
        }

        Some(Ok(current))
    }
}

/// Materialized schedule: date -> anticipated remaining balance
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentSchedule {
    start_date: NaiveDate,
    frequency: Frequency,
    entries: BTreeMap<NaiveDate, Decimal>,
}

impl InstallmentSchedule {
    /// Generate the expected schedule for a plan
    pub fn generate(plan: &PaymentPlan, frequency: Frequency) -> Result<Self, ScheduleError> {
        if plan.installment_amount <= Decimal::ZERO {
            warn!(
                "Plan {} has non-positive installment amount {}; schedule limited to its start date",
                plan.id, plan.installment_amount
            );
        }

        let iter = ScheduleIter::new(
            plan.start_date,
            frequency,
            plan.amount_to_pay,
            plan.installment_amount,
        );

        let mut entries = BTreeMap::new();
        for installment in iter {
            let installment = installment.map_err(|last| ScheduleError::MalformedSchedule {
                plan_id: plan.id,
                reason: format!("calendar overflow after {}", last),
            })?;

            if entries.len() >= MAX_SCHEDULE_INSTALLMENTS {
                return Err(ScheduleError::MalformedSchedule {
                    plan_id: plan.id,
                    reason: format!("more than {} installments", MAX_SCHEDULE_INSTALLMENTS),
                });
            }

            entries.insert(installment.date, installment.anticipated_balance);
        }

        debug!(
            "Generated {} installments for plan {} ({} from {})",
            entries.len(),
            plan.id,
            frequency,
            plan.start_date
        );

        Ok(Self {
            start_date: plan.start_date,
            frequency,
            entries,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Exact-date membership
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.entries.contains_key(&date)
    }

    /// Schedule dates within `[from, to]`, ascending
    pub fn dates_between(&self, from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> + '_ {
        self.entries
            .range((Bound::Included(from), Bound::Included(to)))
            .map(|(date, _)| *date)
    }

    pub fn installments(&self) -> impl Iterator<Item = ScheduledInstallment> + '_ {
        self.entries.iter().map(|(date, balance)| ScheduledInstallment {
            date: *date,
            anticipated_balance: *balance,
        })
    }

    pub fn last(&self) -> Option<ScheduledInstallment> {
        self.entries
            .iter()
            .next_back()
            .map(|(date, balance)| ScheduledInstallment {
                date: *date,
                anticipated_balance: *balance,
            })
    }

    /// Latest cadence slot on or before `date`, counted from the start date.
    ///
    /// Not bounded by the end of the generated schedule. Returns the start
    /// date when `date` precedes it.
    pub fn last_slot_on_or_before(&self, date: NaiveDate) -> NaiveDate {
        if date <= self.start_date {
            return self.start_date;
        }

        let elapsed = (date - self.start_date).num_days() as u64;
        let slots = elapsed / self.frequency.days();

        self.start_date
            .checked_add_days(chrono::Days::new(slots * self.frequency.days()))
            .unwrap_or(self.start_date)
    }
}
