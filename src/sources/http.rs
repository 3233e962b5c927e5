use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::sources::models::{Collection, Debt, Payment, PaymentPlan};
use crate::sources::traits::DataSource;

/// Endpoint locations for the three collections
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub debts_url: String,
    pub payment_plans_url: String,
    pub payments_url: String,
}

impl Endpoints {
    pub fn url_for(&self, collection: Collection) -> &str {
        match collection {
            Collection::Debts => &self.debts_url,
            Collection::PaymentPlans => &self.payment_plans_url,
            Collection::Payments => &self.payments_url,
        }
    }
}

/// JSON-over-HTTP data source
pub struct HttpDataSource {
    client: Client,
    endpoints: Endpoints,
}

impl HttpDataSource {
    pub fn new(endpoints: Endpoints, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client, endpoints })
    }

    /// GET one collection and parse it as a JSON array
    async fn fetch_collection<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<T>, FetchError> {
        let url = self.endpoints.url_for(collection);
        if url.trim().is_empty() {
            return Err(FetchError::InvalidUri(collection));
        }

        debug!("Requesting {} from {}", collection, url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Transport { collection, source })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::UnexpectedStatus {
                collection,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport { collection, source })?;

        let records: Vec<T> = serde_json::from_slice(&body)
            .map_err(|source| FetchError::Parse { collection, source })?;

        info!("✓ Retrieved {} {}", records.len(), collection);
        Ok(records)
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_debts(&self) -> Result<Vec<Debt>, FetchError> {
        self.fetch_collection(Collection::Debts).await
    }

    async fn fetch_payment_plans(&self) -> Result<Vec<PaymentPlan>, FetchError> {
        self.fetch_collection(Collection::PaymentPlans).await
    }

    async fn fetch_payments(&self) -> Result<Vec<Payment>, FetchError> {
        let mut payments: Vec<Payment> = self.fetch_collection(Collection::Payments).await?;
        payments.sort_by_key(|p| p.date);
        Ok(payments)
    }
}
