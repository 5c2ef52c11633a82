use crate::domain::model::{CtLogEntry, LookupResult, Stage};
use crate::utils::error::LookupError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// CT log 查詢條件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CtLogQuery {
    /// 以名稱樣式查詢，例如 `%.example.com`
    Identity(String),
    /// 以憑證主體的組織名稱查詢
    Organization(String),
}

impl fmt::Display for CtLogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtLogQuery::Identity(pattern) => write!(f, "identity '{}'", pattern),
            CtLogQuery::Organization(org) => write!(f, "organization '{}'", org),
        }
    }
}

#[async_trait]
pub trait CtLogSource: Send + Sync {
    async fn query_ct_log(&self, query: &CtLogQuery) -> Result<Vec<CtLogEntry>, LookupError>;
}

#[async_trait]
pub trait WhoisSource: Send + Sync {
    /// `Ok(None)` 表示查得到網域但沒有註冊組織，不算失敗
    async fn query_whois(&self, domain: &str) -> Result<Option<String>, LookupError>;
}

/// 備援組織名稱的亂數來源，測試時可以換成固定值
pub trait RandomSource: Send + Sync {
    /// 回傳 `0..bound` 之間的索引，`bound` 必定大於 0
    fn next_index(&self, bound: usize) -> usize;
}

/// 每個階段的輸入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub domain: String,
    pub organization: Option<String>,
}

impl LookupQuery {
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            organization: None,
        }
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }
}

/// 一個階段的查詢策略：即時查詢加上一定成功的備援
#[async_trait]
pub trait LookupStrategy: Send + Sync {
    fn stage(&self) -> Stage;

    async fn execute(&self, query: &LookupQuery) -> Result<LookupResult, LookupError>;

    fn fallback(&self, query: &LookupQuery) -> LookupResult;
}

pub trait ConfigProvider: Send + Sync {
    fn ct_log_endpoint(&self) -> &str;
    fn rdap_endpoint(&self) -> &str;
    fn user_agent(&self) -> &str;
    fn stage_timeout(&self) -> Option<Duration>;
    fn concurrent_lookups(&self) -> bool;
    fn fallback_organizations(&self) -> &[String];
    fn offline(&self) -> bool;
}
