//! Orchestrator configuration loaded from environment variables.

/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3002`)
/// - `CUSTOMERS_API_URL` — base URL of the customer directory service
/// - `ORDERS_API_URL` — base URL of the orders-api service
/// - `INTERNAL_SERVICE_TOKEN` — shared secret for internal calls
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub customers_api_url: String,
    pub orders_api_url: String,
    pub internal_token: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3002),
            customers_api_url: std::env::var("CUSTOMERS_API_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            orders_api_url: std::env::var("ORDERS_API_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            internal_token: std::env::var("INTERNAL_SERVICE_TOKEN").unwrap_or_default(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
