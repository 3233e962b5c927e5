use chrono::{Days, NaiveDate};
use std::fmt;
use std::str::FromStr;

use crate::error::ScheduleError;

/// Installment cadence of a payment plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Weekly,
    BiWeekly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ScheduleError;

    /// Labels are matched case-insensitively
    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label.trim().to_lowercase().as_str() {
            "weekly" => Ok(Frequency::Weekly),
            "bi_weekly" | "bi-weekly" | "biweekly" => Ok(Frequency::BiWeekly),
            _ => Err(ScheduleError::UnrecognizedCadence(label.to_string())),
        }
    }
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::BiWeekly => "bi_weekly",
        }
    }

    /// Calendar days between two installments
    pub fn days(&self) -> u64 {
        match self {
            Frequency::Weekly => 7,
            Frequency::BiWeekly => 14,
        }
    }

    /// Move `date` forward by one installment; None past the end of the calendar
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        date.checked_add_days(Days::new(self.days()))
    }
}
