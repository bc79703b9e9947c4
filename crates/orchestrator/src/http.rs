//! HTTP client for the orders-api.

use std::time::Duration;

use async_trait::async_trait;
use common::{CustomerId, OrderId, ServiceToken};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::clients::{OrderLine, OrderSummary, OrdersClient};
use crate::error::StepError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the orders-api service.
#[derive(Clone)]
pub struct HttpOrdersClient {
    client: reqwest::Client,
    base_url: String,
    token: ServiceToken,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}

impl HttpOrdersClient {
    pub fn new(base_url: impl Into<String>, token: ServiceToken) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token,
        })
    }

    /// Parses a successful envelope, or turns the remote error envelope into
    /// a [`StepError::Rejected`] carrying its status and message.
    async fn read_order(
        response: reqwest::Response,
        expected: StatusCode,
    ) -> Result<OrderSummary, StepError> {
        let status = response.status();
        if status == expected {
            let envelope: DataEnvelope<OrderSummary> = response.json().await?;
            return Ok(envelope.data);
        }

        let message = response
            .json::<ErrorEnvelope>()
            .await
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| "upstream request failed".to_string());
        Err(StepError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl OrdersClient for HttpOrdersClient {
    #[tracing::instrument(skip(self, items))]
    async fn create_order(
        &self,
        customer_id: CustomerId,
        items: &[OrderLine],
    ) -> Result<OrderSummary, StepError> {
        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.token.bearer())
            .json(&serde_json::json!({ "customer_id": customer_id, "items": items }))
            .send()
            .await?;

        Self::read_order(response, StatusCode::CREATED).await
    }

    #[tracing::instrument(skip(self, idempotency_key))]
    async fn confirm_order(
        &self,
        order_id: OrderId,
        idempotency_key: &str,
    ) -> Result<OrderSummary, StepError> {
        let response = self
            .client
            .post(format!("{}/orders/{}/confirm", self.base_url, order_id))
            .header(reqwest::header::AUTHORIZATION, self.token.bearer())
            .header("X-Idempotency-Key", idempotency_key)
            .send()
            .await?;

        Self::read_order(response, StatusCode::OK).await
    }
}
