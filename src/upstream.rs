// Accounting Platform Client (server mode)
// Thin async wrapper over the platform's OAuth token endpoint and report
// endpoint: JSON in/out, bearer header injected per tenant. No retry,
// backoff, or circuit breaking - errors propagate to the handler, which
// surfaces them as HTTP 500 with the raw message.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::report::ReportDocument;

/// Endpoint configuration for the platform.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Token endpoint, e.g. "https://identity.example.com/connect/token".
    pub token_url: String,
    /// Reports API base, e.g. "https://api.example.com/api.xro/2.0".
    pub api_base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl UpstreamConfig {
    /// Read configuration from the environment (set by the hosting platform).
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| anyhow!("Missing {} in environment", name))
        };

        Ok(UpstreamConfig {
            token_url: var("ACCOUNTING_TOKEN_URL")?,
            api_base_url: var("ACCOUNTING_API_BASE_URL")?,
            client_id: var("ACCOUNTING_CLIENT_ID")?,
            client_secret: var("ACCOUNTING_CLIENT_SECRET")?,
            redirect_uri: var("ACCOUNTING_REDIRECT_URI")?,
        })
    }
}

/// Token endpoint response (both code exchange and refresh).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
struct ReportQuery<'a> {
    #[serde(rename = "fromDate", skip_serializing_if = "Option::is_none")]
    from_date: Option<&'a str>,
    #[serde(rename = "toDate", skip_serializing_if = "Option::is_none")]
    to_date: Option<&'a str>,
}

pub struct UpstreamClient {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Self {
        UpstreamClient {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Exchange an OAuth authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.config.redirect_uri),
        ])
        .await
    }

    /// Refresh an expired access token. The platform rotates refresh tokens,
    /// so the caller must persist the returned pair immediately.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let resp = self
            .client
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(form)
            .send()
            .await
            .context("Token request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Token endpoint returned {}: {}", status, body));
        }

        resp.json::<TokenResponse>()
            .await
            .context("Failed to parse token response")
    }

    /// Fetch a report for one tenant.
    ///
    /// `report_type` is the platform's report name ("ProfitAndLoss",
    /// "BalanceSheet"); dates are "YYYY-MM-DD" and optional (the platform
    /// defaults to the current month).
    pub async fn fetch_report(
        &self,
        access_token: &str,
        tenant_id: &str,
        report_type: &str,
        from_date: Option<&str>,
        to_date: Option<&str>,
    ) -> Result<ReportDocument> {
        let url = format!("{}/Reports/{}", self.config.api_base_url, report_type);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .header("Xero-Tenant-Id", tenant_id)
            .header("Accept", "application/json")
            .query(&ReportQuery {
                from_date,
                to_date,
            })
            .send()
            .await
            .context("Report request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Report endpoint returned {}: {}", status, body));
        }

        resp.json::<ReportDocument>()
            .await
            .context("Failed to parse report document")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_parses() {
        let json = r#"{
            "access_token": "abc",
            "refresh_token": "def",
            "expires_in": 1800,
            "token_type": "Bearer"
        }"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.refresh_token, "def");
        assert_eq!(token.expires_in, 1800);
    }

    #[test]
    fn test_report_query_skips_missing_dates() {
        let q = ReportQuery {
            from_date: None,
            to_date: Some("2025-01-31"),
        };
        let encoded = serde_json::to_string(&q).unwrap();
        assert!(!encoded.contains("fromDate"));
        assert!(encoded.contains("toDate"));
    }
}
