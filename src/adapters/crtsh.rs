use crate::domain::model::CtLogEntry;
use crate::domain::ports::{ConfigProvider, CtLogQuery, CtLogSource};
use crate::utils::error::{LookupError, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;

/// crt.sh 風格的 CT log 搜尋端點（`?q=` 查名稱、`?O=` 查組織，`output=json`）
#[derive(Debug, Clone)]
pub struct CrtShClient {
    client: Client,
    endpoint: String,
}

impl CrtShClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let client = Client::builder().user_agent(config.user_agent()).build()?;
        Ok(Self::with_client(client, config.ct_log_endpoint()))
    }
}

#[async_trait]
impl CtLogSource for CrtShClient {
    async fn query_ct_log(
        &self,
        query: &CtLogQuery,
    ) -> std::result::Result<Vec<CtLogEntry>, LookupError> {
        let (key, value) = match query {
            CtLogQuery::Identity(pattern) => ("q", pattern.as_str()),
            CtLogQuery::Organization(org) => ("O", org.as_str()),
        };

        tracing::debug!("Querying CT log {} for {}", self.endpoint, query);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[(key, value), ("output", "json")])
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("CT log response status: {}", status);
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        // crt.sh 出錯時常回傳 HTML，所以先取文字再解析
        let body = response.text().await?;
        let entries: Vec<CtLogEntry> = serde_json::from_str(&body)?;
        Ok(entries)
    }
}
