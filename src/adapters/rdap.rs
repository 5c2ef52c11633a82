use crate::domain::ports::{ConfigProvider, WhoisSource};
use crate::utils::error::{LookupError, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// 透過 RDAP（JSON 版的 WHOIS）查詢註冊組織
#[derive(Debug, Clone)]
pub struct RdapWhoisClient {
    client: Client,
    endpoint: String,
}

impl RdapWhoisClient {
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
        Ok(Self::with_client(client, config.rdap_endpoint()))
    }

    fn domain_url(&self, domain: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), domain)
    }
}

#[async_trait]
impl WhoisSource for RdapWhoisClient {
    async fn query_whois(&self, domain: &str) -> std::result::Result<Option<String>, LookupError> {
        let url = self.domain_url(domain);
        tracing::debug!("Querying RDAP: {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/rdap+json, application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let document: Value = serde_json::from_str(&body)?;
        Ok(registrant_organization(&document))
    }
}

/// 找出第一個 registrant 實體，優先取 vCard 的 `org`，沒有再取 `fn`
pub fn registrant_organization(document: &Value) -> Option<String> {
    let entities = document.get("entities")?.as_array()?;

    let registrant = entities.iter().find(|entity| {
        entity
            .get("roles")
            .and_then(Value::as_array)
            .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some("registrant")))
    })?;

    let properties = registrant
        .get("vcardArray")?
        .as_array()?
        .get(1)?
        .as_array()?;

    let property = |name: &str| {
        properties.iter().find_map(|prop| {
            let prop = prop.as_array()?;
            if prop.first()?.as_str()? != name {
                return None;
            }
            let value = prop.get(3)?.as_str()?.trim();
            (!value.is_empty()).then(|| value.to_string())
        })
    };

    property("org").or_else(|| property("fn"))
}
