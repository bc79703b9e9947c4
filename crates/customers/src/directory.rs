//! The collaborator contract: resolve a customer by id.

use std::time::Duration;

use async_trait::async_trait;
use common::{CustomerId, ServiceToken};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::CustomerError;
use crate::model::Customer;

/// Read contract consumed by the order ledger and the saga orchestrator.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Resolves a customer, returning `None` if no live customer has this id.
    async fn find(&self, id: CustomerId) -> Result<Option<Customer>, CustomerError>;
}

/// Timeout applied to every directory call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the `customers-api` service.
#[derive(Clone)]
pub struct HttpCustomerDirectory {
    client: reqwest::Client,
    base_url: String,
    token: ServiceToken,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

impl HttpCustomerDirectory {
    /// Creates a client for the directory at `base_url`, authenticating with
    /// the shared service token.
    pub fn new(base_url: impl Into<String>, token: ServiceToken) -> Result<Self, CustomerError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token,
        })
    }
}

#[async_trait]
impl CustomerDirectory for HttpCustomerDirectory {
    #[tracing::instrument(skip(self))]
    async fn find(&self, id: CustomerId) -> Result<Option<Customer>, CustomerError> {
        let url = format!("{}/customers/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.token.bearer())
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let envelope: DataEnvelope<Customer> = response.json().await?;
                Ok(Some(envelope.data))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(CustomerError::Unavailable {
                status: status.as_u16(),
            }),
        }
    }
}
