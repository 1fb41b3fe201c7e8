//! Marketing opt-out collaborator.
//!
//! The home menu reads and flips a subscriber's marketing preference through
//! [`MarketingCrm`]. Production deployments talk to the CRM over HTTP
//! ([`HttpCrm`], `crm-http` feature); tests use [`InMemoryCrm`]; single-node
//! setups without a CRM fall back to the local list kept by
//! [`crate::storage::file::FileStorage`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::storage::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketingDecision {
    OptOut,
    OptIn,
}

#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("CRM request failed: {0}")]
    Request(String),

    #[error("CRM request timed out after {0}s")]
    Timeout(u64),

    #[error("CRM rejected the request with status {0}")]
    Status(u16),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait MarketingCrm: Send + Sync {
    async fn is_opted_out(&self, phone_number: &str) -> Result<bool, CrmError>;
    async fn opt_out_or_opt_in(&self, phone_number: &str, decision: MarketingDecision) -> Result<(), CrmError>;
}

/// Opt-out set held in memory.
#[derive(Default, Clone)]
pub struct InMemoryCrm {
    opted_out: Arc<RwLock<HashSet<String>>>,
    /// When set, every call fails; lets tests exercise the collaborator-failure path.
    unavailable: Arc<RwLock<bool>>,
}

impl InMemoryCrm {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    async fn check_available(&self) -> Result<(), CrmError> {
        if *self.unavailable.read().await {
            return Err(CrmError::Request("CRM unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketingCrm for InMemoryCrm {
    async fn is_opted_out(&self, phone_number: &str) -> Result<bool, CrmError> {
        self.check_available().await?;
        Ok(self.opted_out.read().await.contains(phone_number))
    }

    async fn opt_out_or_opt_in(&self, phone_number: &str, decision: MarketingDecision) -> Result<(), CrmError> {
        self.check_available().await?;
        let mut set = self.opted_out.write().await;
        match decision {
            MarketingDecision::OptOut => set.insert(phone_number.to_string()),
            MarketingDecision::OptIn => set.remove(phone_number),
        };
        Ok(())
    }
}

#[cfg(feature = "crm-http")]
pub use http::HttpCrm;

#[cfg(feature = "crm-http")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use log::{debug, warn};
    use serde::{Deserialize, Serialize};
    use tokio::time::timeout;

    use super::{CrmError, MarketingCrm, MarketingDecision};
    use crate::config::CrmConfig;

    #[derive(Debug, Deserialize)]
    struct MarketingStatus {
        opted_out: bool,
    }

    #[derive(Debug, Serialize)]
    struct MarketingUpdate {
        decision: MarketingDecision,
    }

    /// REST client for the CRM's marketing-preference endpoints.
    pub struct HttpCrm {
        base_url: String,
        timeout_seconds: u64,
        client: reqwest::Client,
    }

    impl HttpCrm {
        pub fn new(base_url: &str, config: &CrmConfig) -> Self {
            Self {
                base_url: base_url.trim_end_matches('/').to_string(),
                timeout_seconds: config.timeout_seconds,
                client: reqwest::Client::new(),
            }
        }

        fn url(&self, phone_number: &str) -> String {
            let encoded = percent_encoding::utf8_percent_encode(phone_number, percent_encoding::NON_ALPHANUMERIC);
            format!("{}/contacts/{}/marketing", self.base_url, encoded)
        }

        async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, CrmError> {
            let limit = Duration::from_secs(self.timeout_seconds);
            let response = timeout(limit, request.send())
                .await
                .map_err(|_| CrmError::Timeout(self.timeout_seconds))?
                .map_err(|e| CrmError::Request(e.to_string()))?;
            if !response.status().is_success() {
                warn!("CRM returned {} for {}", response.status(), response.url());
                return Err(CrmError::Status(response.status().as_u16()));
            }
            Ok(response)
        }
    }

    #[async_trait]
    impl MarketingCrm for HttpCrm {
        async fn is_opted_out(&self, phone_number: &str) -> Result<bool, CrmError> {
            let response = self.send(self.client.get(self.url(phone_number))).await?;
            let status: MarketingStatus = response.json().await.map_err(|e| CrmError::Request(e.to_string()))?;
            Ok(status.opted_out)
        }

        async fn opt_out_or_opt_in(&self, phone_number: &str, decision: MarketingDecision) -> Result<(), CrmError> {
            debug!("CRM marketing update decision={:?}", decision);
            let body = MarketingUpdate { decision };
            self.send(self.client.put(self.url(phone_number)).json(&body)).await?;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn url_encodes_phone_and_trims_slash() {
            let crm = HttpCrm::new("https://crm.example/api/", &CrmConfig::default());
            assert_eq!(crm.url("+254712345678"), "https://crm.example/api/contacts/%2B254712345678/marketing");
        }

        #[test]
        fn update_body_uses_snake_case_decision() {
            let body = serde_json::to_string(&MarketingUpdate { decision: MarketingDecision::OptOut }).unwrap();
            assert_eq!(body, r#"{"decision":"opt_out"}"#);
        }
    }
}
