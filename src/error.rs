use thiserror::Error;

use crate::sources::models::Collection;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Timed out after {waited_secs}s waiting for: {}", format_collections(.pending))]
    Timeout {
        pending: Vec<Collection>,
        waited_secs: u64,
    },

    #[error("Data integrity violation: {0}")]
    Integrity(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while retrieving one of the three source collections.
/// Any of these is fatal to the run.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid server URI passed for {0}")]
    InvalidUri(Collection),

    #[error("Transport failure retrieving {collection}: {source}")]
    Transport {
        collection: Collection,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected status code {status} retrieving {collection}")]
    UnexpectedStatus { collection: Collection, status: u16 },

    #[error("Failed to parse {collection}: {source}")]
    Parse {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },

    #[error("Retrieval task for {0} ended without reporting a result")]
    TaskAborted(Collection),
}

/// Per-plan errors. These are absorbed by the assembler and leave the
/// affected debt's derived date unset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Received unexpected value of {0:?} in payment frequency")]
    UnrecognizedCadence(String),

    #[error("Malformed schedule for plan {plan_id}: {reason}")]
    MalformedSchedule { plan_id: i64, reason: String },
}

pub type AppResult<T> = Result<T, AppError>;

fn format_collections(collections: &[Collection]) -> String {
    collections
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_lists_pending_collections() {
        let err = AppError::Timeout {
            pending: vec![Collection::PaymentPlans, Collection::Payments],
            waited_secs: 240,
        };

        assert_eq!(
            err.to_string(),
            "Timed out after 240s waiting for: payment_plans, payments"
        );
    }

    #[test]
    fn test_unrecognized_cadence_message() {
        let err = ScheduleError::UnrecognizedCadence("monthly".to_string());
        assert!(err.to_string().contains("\"monthly\""));
    }
}
