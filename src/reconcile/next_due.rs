use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::schedule::classifier::ClassifiedPayment;
use crate::schedule::generator::InstallmentSchedule;

/// What the next due date is when no payment lines up with the schedule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextDueFallback {
    /// The plan's start date: nothing has been validated against the schedule yet
    #[default]
    StartDate,
    /// One cadence past the last schedule slot not after the most recent
    /// payment (start date + one cadence for payments made before the start)
    FollowingScheduleSlot,
}

/// Projects the next expected payment date of an active plan
#[derive(Debug, Clone, Copy, Default)]
pub struct NextDueDateResolver {
    fallback: NextDueFallback,
}

impl NextDueDateResolver {
    pub fn new(fallback: NextDueFallback) -> Self {
        Self { fallback }
    }

    /// `payments` must be in ascending date order.
    ///
    /// Returns None only if the projected date falls off the calendar.
    pub fn resolve(&self, schedule: &InstallmentSchedule, payments: &[ClassifiedPayment]) -> Option<NaiveDate> {
        let frequency = schedule.frequency();

        let Some(latest) = payments.last() else {
            return Some(schedule.start_date());
        };

        // Most recent scheduled payment drives the projection; unscheduled ones never do
        if let Some(anchor) = payments
            .iter()
            .rev()
            .filter(|p| p.scheduled)
            .find_map(|p| p.matched_date.or(Some(p.payment.date)))
        {
            debug!("Last scheduled payment matched {}", anchor);
            return frequency.advance(anchor);
        }

        debug!(
            "No scheduled payments out of {}; falling back to {:?}",
            payments.len(),
            self.fallback
        );

        match self.fallback {
            NextDueFallback::StartDate => Some(schedule.start_date()),
            NextDueFallback::FollowingScheduleSlot => {
                let slot = schedule.last_slot_on_or_before(latest.payment.date);
                frequency.advance(slot)
            }
        }
    }
}
