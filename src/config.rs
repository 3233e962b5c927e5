use config::{ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

use crate::reconcile::{NextDueFallback, ReconcilePolicy};
use crate::schedule::ClassifierPolicy;
use crate::sources::Endpoints;

const ENV_PREFIX: &str = "RECONCILER";

const DEFAULT_DEBTS_URL: &str = "https://my-json-server.typicode.com/druska/trueaccord-mock-payments-api/debts";
const DEFAULT_PAYMENT_PLANS_URL: &str =
    "https://my-json-server.typicode.com/druska/trueaccord-mock-payments-api/payment_plans";
const DEFAULT_PAYMENTS_URL: &str = "https://my-json-server.typicode.com/druska/trueaccord-mock-payments-api/payments";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub debts_url: String,
    pub payment_plans_url: String,
    pub payments_url: String,
    /// Overall deadline for the three-way fetch
    pub fetch_timeout_secs: u64,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub grace_period_days: Option<u32>,
    pub next_due_fallback: NextDueFallback,
    /// Fail the run on any data-integrity issue instead of reporting it
    pub strict_integrity: bool,
}

impl Config {
    /// Load from `RECONCILER_*` environment variables over built-in defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::with_prefix(ENV_PREFIX))
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let config: Config = config::Config::builder()
            .set_default("debts_url", DEFAULT_DEBTS_URL)?
            .set_default("payment_plans_url", DEFAULT_PAYMENT_PLANS_URL)?
            .set_default("payments_url", DEFAULT_PAYMENTS_URL)?
            .set_default("fetch_timeout_secs", 240)?
            .set_default("request_timeout_secs", 60)?
            .set_default("next_due_fallback", "start_date")?
            .set_default("strict_integrity", false)?
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()?;

        if config.fetch_timeout_secs == 0 {
            return Err(ConfigError::Message("fetch_timeout_secs must be positive".into()));
        }
        if config.request_timeout_secs == 0 {
            return Err(ConfigError::Message("request_timeout_secs must be positive".into()));
        }

        Ok(config)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            debts_url: self.debts_url.clone(),
            payment_plans_url: self.payment_plans_url.clone(),
            payments_url: self.payments_url.clone(),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            classifier: ClassifierPolicy {
                grace_period_days: self.grace_period_days,
            },
            next_due_fallback: self.next_due_fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::load(Environment::with_prefix(ENV_PREFIX).source(Some(source)))
    }

    #[test]
    fn test_defaults() {
        let config = load_from(&[]).unwrap();

        assert_eq!(config.debts_url, DEFAULT_DEBTS_URL);
        assert_eq!(config.payments_url, DEFAULT_PAYMENTS_URL);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(240));
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.grace_period_days, None);
        assert_eq!(config.next_due_fallback, NextDueFallback::StartDate);
        assert!(!config.strict_integrity);
    }

    #[test]
    fn test_environment_overrides() {
        let config = load_from(&[
            ("RECONCILER_DEBTS_URL", "http://localhost:9000/debts"),
            ("RECONCILER_FETCH_TIMEOUT_SECS", "5"),
            ("RECONCILER_GRACE_PERIOD_DAYS", "3"),
            ("RECONCILER_NEXT_DUE_FALLBACK", "following_schedule_slot"),
            ("RECONCILER_STRICT_INTEGRITY", "true"),
        ])
        .unwrap();

        assert_eq!(config.endpoints().debts_url, "http://localhost:9000/debts");
        assert_eq!(config.endpoints().payment_plans_url, DEFAULT_PAYMENT_PLANS_URL);
        assert_eq!(config.fetch_timeout_secs, 5);
        assert!(config.strict_integrity);

        let policy = config.reconcile_policy();
        assert_eq!(policy.classifier.grace_period_days, Some(3));
        assert_eq!(policy.next_due_fallback, NextDueFallback::FollowingScheduleSlot);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(load_from(&[("RECONCILER_FETCH_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn test_unknown_fallback_is_rejected() {
        assert!(load_from(&[("RECONCILER_NEXT_DUE_FALLBACK", "tomorrow")]).is_err());
    }
}
