use crate::domain::model::CtLogEntry;
use crate::domain::ports::{CtLogQuery, CtLogSource, WhoisSource};
use crate::utils::error::LookupError;
use async_trait::async_trait;

/// 永遠失敗的來源，離線模式下讓每個階段直接走備援
#[derive(Debug, Clone, Default)]
pub struct UnavailableSource {
    reason: String,
}

impl UnavailableSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn offline() -> Self {
        Self::new("network lookups disabled (offline mode)")
    }
}

#[async_trait]
impl CtLogSource for UnavailableSource {
    async fn query_ct_log(&self, _query: &CtLogQuery) -> Result<Vec<CtLogEntry>, LookupError> {
        Err(LookupError::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl WhoisSource for UnavailableSource {
    async fn query_whois(&self, _domain: &str) -> Result<Option<String>, LookupError> {
        Err(LookupError::Unavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_source_always_fails() {
        let source = UnavailableSource::offline();
        let ct = source
            .query_ct_log(&CtLogQuery::Identity("%.example.com".to_string()))
            .await;
        assert!(matches!(ct, Err(LookupError::Unavailable(_))));

        let whois = source.query_whois("example.com").await;
        assert!(matches!(whois, Err(LookupError::Unavailable(_))));
    }
}
