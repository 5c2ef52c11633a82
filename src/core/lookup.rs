use crate::domain::model::{CtLogEntry, LookupResult, ResolutionSource, Stage};
use crate::domain::ports::{
    CtLogQuery, CtLogSource, LookupQuery, LookupStrategy, RandomSource, WhoisSource,
};
use crate::utils::error::LookupError;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_FALLBACK_ORGANIZATIONS: [&str; 3] = [
    "Example Corporation",
    "Tech Solutions Inc.",
    "Digital Services LLC",
];

const SUBDOMAIN_PREFIXES: [&str; 6] = ["www", "mail", "api", "dev", "staging", "admin"];

/// 解析 CT log 回傳的名稱：依換行拆開、去除空白、排除萬用字元憑證並去重
pub fn parse_ct_entries(entries: &[CtLogEntry]) -> BTreeSet<String> {
    entries
        .iter()
        .flat_map(|entry| entry.name_value.split('\n'))
        .map(str::trim)
        .filter(|name| !name.is_empty() && !name.starts_with('*'))
        .map(String::from)
        .collect()
}

/// 網域第一個 `.` 之前的部分
pub fn base_label(domain: &str) -> &str {
    domain.split('.').next().unwrap_or(domain)
}

pub fn subdomain_candidates(domain: &str) -> BTreeSet<String> {
    std::iter::once(domain.to_string())
        .chain(
            SUBDOMAIN_PREFIXES
                .iter()
                .map(|prefix| format!("{}.{}", prefix, domain)),
        )
        .collect()
}

pub fn sister_domain_candidates(domain: &str) -> BTreeSet<String> {
    let base = base_label(domain);
    BTreeSet::from([
        format!("{}-corp.com", base),
        format!("{}global.net", base),
        format!("{}services.com", base),
        format!("my{}.com", base),
    ])
}

/// 一次查詢的最終結果與其來源
#[derive(Debug)]
pub struct Resolution {
    pub result: LookupResult,
    pub source: ResolutionSource,
    pub failure: Option<LookupError>,
}

/// 先嘗試即時查詢，失敗或逾時就改用備援結果。這個函式本身不會失敗
pub async fn resolve(
    strategy: &dyn LookupStrategy,
    query: &LookupQuery,
    timeout: Option<Duration>,
) -> Resolution {
    let attempt = match timeout {
        Some(limit) => match tokio::time::timeout(limit, strategy.execute(query)).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout(limit)),
        },
        None => strategy.execute(query).await,
    };

    match attempt {
        Ok(result) => {
            tracing::debug!(
                "{}: primary lookup returned {} item(s)",
                strategy.stage(),
                result.len()
            );
            Resolution {
                result,
                source: ResolutionSource::Primary,
                failure: None,
            }
        }
        Err(e) => {
            tracing::debug!(
                "{}: primary lookup failed, using fallback: {}",
                strategy.stage(),
                e
            );
            Resolution {
                result: strategy.fallback(query),
                source: ResolutionSource::Fallback,
                failure: Some(e),
            }
        }
    }
}

pub struct WhoisLookup {
    source: Arc<dyn WhoisSource>,
    organizations: Vec<String>,
    random: Arc<dyn RandomSource>,
}

impl WhoisLookup {
    pub fn new(
        source: Arc<dyn WhoisSource>,
        organizations: Vec<String>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            source,
            organizations,
            random,
        }
    }
}

#[async_trait]
impl LookupStrategy for WhoisLookup {
    fn stage(&self) -> Stage {
        Stage::Whois
    }

    async fn execute(&self, query: &LookupQuery) -> Result<LookupResult, LookupError> {
        let organization = self
            .source
            .query_whois(&query.domain)
            .await?
            .map(|org| org.trim().to_string())
            .filter(|org| !org.is_empty());
        Ok(LookupResult::Organization(organization))
    }

    fn fallback(&self, _query: &LookupQuery) -> LookupResult {
        if self.organizations.is_empty() {
            return LookupResult::Organization(None);
        }
        let index = self.random.next_index(self.organizations.len());
        let picked = self
            .organizations
            .get(index)
            .or_else(|| self.organizations.first())
            .cloned();
        LookupResult::Organization(picked)
    }
}

pub struct CtLogByDomain {
    source: Arc<dyn CtLogSource>,
}

impl CtLogByDomain {
    pub fn new(source: Arc<dyn CtLogSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl LookupStrategy for CtLogByDomain {
    fn stage(&self) -> Stage {
        Stage::CtLogByDomain
    }

    async fn execute(&self, query: &LookupQuery) -> Result<LookupResult, LookupError> {
        let pattern = CtLogQuery::Identity(format!("%.{}", query.domain));
        let entries = self.source.query_ct_log(&pattern).await?;
        let names = parse_ct_entries(&entries);
        if names.is_empty() {
            return Err(LookupError::Empty);
        }
        Ok(LookupResult::KeywordSet(names))
    }

    fn fallback(&self, query: &LookupQuery) -> LookupResult {
        LookupResult::KeywordSet(subdomain_candidates(&query.domain))
    }
}

pub struct CtLogByOrg {
    source: Arc<dyn CtLogSource>,
}

impl CtLogByOrg {
    pub fn new(source: Arc<dyn CtLogSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl LookupStrategy for CtLogByOrg {
    fn stage(&self) -> Stage {
        Stage::CtLogByOrg
    }

    async fn execute(&self, query: &LookupQuery) -> Result<LookupResult, LookupError> {
        let organization = query
            .organization
            .as_deref()
            .ok_or_else(|| {
                LookupError::Unavailable("no organization to search for".to_string())
            })?;
        let entries = self
            .source
            .query_ct_log(&CtLogQuery::Organization(organization.to_string()))
            .await?;
        let names = parse_ct_entries(&entries);
        if names.is_empty() {
            return Err(LookupError::Empty);
        }
        Ok(LookupResult::KeywordSet(names))
    }

    fn fallback(&self, query: &LookupQuery) -> LookupResult {
        LookupResult::KeywordSet(sister_domain_candidates(&query.domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedIndex(usize);

    impl RandomSource for FixedIndex {
        fn next_index(&self, _bound: usize) -> usize {
            self.0
        }
    }

    struct ScriptedCtLog {
        response: Mutex<Option<Result<Vec<CtLogEntry>, LookupError>>>,
        seen: Mutex<Vec<CtLogQuery>>,
    }

    impl ScriptedCtLog {
        fn new(response: Result<Vec<CtLogEntry>, LookupError>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(response)),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CtLogSource for ScriptedCtLog {
        async fn query_ct_log(&self, query: &CtLogQuery) -> Result<Vec<CtLogEntry>, LookupError> {
            self.seen.lock().unwrap().push(query.clone());
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(LookupError::Unavailable("exhausted".to_string())))
        }
    }

    struct NeverAnswers;

    #[async_trait]
    impl CtLogSource for NeverAnswers {
        async fn query_ct_log(&self, _query: &CtLogQuery) -> Result<Vec<CtLogEntry>, LookupError> {
            std::future::pending().await
        }
    }

    struct FailingWhois;

    #[async_trait]
    impl WhoisSource for FailingWhois {
        async fn query_whois(&self, _domain: &str) -> Result<Option<String>, LookupError> {
            Err(LookupError::Unavailable("port 43 blocked".to_string()))
        }
    }

    fn pool() -> Vec<String> {
        DEFAULT_FALLBACK_ORGANIZATIONS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_ct_entries() {
        let entries = vec![
            CtLogEntry::new("www.example.com\nexample.com"),
            CtLogEntry::new("*.example.com"),
            CtLogEntry::new("  api.example.com  \n\n"),
            CtLogEntry::new("example.com"),
        ];
        let names = parse_ct_entries(&entries);
        let expected: BTreeSet<String> = ["api.example.com", "example.com", "www.example.com"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_subdomain_candidates() {
        let names = subdomain_candidates("example.com");
        assert_eq!(names.len(), 7);
        for expected in [
            "example.com",
            "www.example.com",
            "mail.example.com",
            "api.example.com",
            "dev.example.com",
            "staging.example.com",
            "admin.example.com",
        ] {
            assert!(names.contains(expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_sister_domain_candidates_use_base_label() {
        let names: Vec<String> = sister_domain_candidates("acme.co.uk").into_iter().collect();
        assert_eq!(
            names,
            vec!["acme-corp.com", "acmeglobal.net", "acmeservices.com", "myacme.com"]
        );
        assert_eq!(base_label("localhost"), "localhost");
    }

    #[test]
    fn test_whois_fallback_uses_random_source() {
        let lookup = WhoisLookup::new(Arc::new(FailingWhois), pool(), Arc::new(FixedIndex(1)));
        let result = lookup.fallback(&LookupQuery::for_domain("example.com"));
        assert_eq!(
            result,
            LookupResult::Organization(Some("Tech Solutions Inc.".to_string()))
        );
    }

    #[test]
    fn test_whois_fallback_with_empty_pool_has_no_organization() {
        let lookup = WhoisLookup::new(Arc::new(FailingWhois), vec![], Arc::new(FixedIndex(0)));
        let result = lookup.fallback(&LookupQuery::for_domain("example.com"));
        assert_eq!(result, LookupResult::Organization(None));
    }

    #[tokio::test]
    async fn test_resolve_uses_primary_when_it_succeeds() {
        let source = ScriptedCtLog::new(Ok(vec![CtLogEntry::new("a.example.com")]));
        let lookup = CtLogByDomain::new(source.clone());

        let resolution = resolve(&lookup, &LookupQuery::for_domain("example.com"), None).await;

        assert_eq!(resolution.source, ResolutionSource::Primary);
        assert!(resolution.failure.is_none());
        assert_eq!(resolution.result.into_keywords().len(), 1);
        assert_eq!(
            source.seen.lock().unwrap().as_slice(),
            &[CtLogQuery::Identity("%.example.com".to_string())]
        );
    }

    #[tokio::test]
    async fn test_resolve_falls_back_on_error() {
        let source = ScriptedCtLog::new(Err(LookupError::Status(503)));
        let lookup = CtLogByDomain::new(source);

        let resolution = resolve(&lookup, &LookupQuery::for_domain("example.com"), None).await;

        assert_eq!(resolution.source, ResolutionSource::Fallback);
        assert!(matches!(resolution.failure, Some(LookupError::Status(503))));
        assert_eq!(resolution.result.into_keywords().len(), 7);
    }

    #[tokio::test]
    async fn test_resolve_falls_back_on_empty_primary() {
        let source = ScriptedCtLog::new(Ok(vec![CtLogEntry::new("*.example.com")]));
        let lookup = CtLogByDomain::new(source);

        let resolution = resolve(&lookup, &LookupQuery::for_domain("example.com"), None).await;

        assert_eq!(resolution.source, ResolutionSource::Fallback);
        assert!(matches!(resolution.failure, Some(LookupError::Empty)));
    }

    #[tokio::test]
    async fn test_resolve_treats_timeout_as_failure() {
        let lookup = CtLogByOrg::new(Arc::new(NeverAnswers));
        let query = LookupQuery::for_domain("acme.io").with_organization("Acme");

        let resolution = resolve(&lookup, &query, Some(Duration::from_millis(50))).await;

        assert_eq!(resolution.source, ResolutionSource::Fallback);
        assert!(matches!(resolution.failure, Some(LookupError::Timeout(_))));
        assert!(resolution.result.into_keywords().contains("myacme.com"));
    }

    #[tokio::test]
    async fn test_ct_by_org_queries_organization() {
        let source = ScriptedCtLog::new(Ok(vec![CtLogEntry::new("acme-labs.com")]));
        let lookup = CtLogByOrg::new(source.clone());
        let query = LookupQuery::for_domain("acme.io").with_organization("Acme Holdings");

        let result = lookup.execute(&query).await.unwrap();

        assert_eq!(result.into_keywords().len(), 1);
        assert_eq!(
            source.seen.lock().unwrap().as_slice(),
            &[CtLogQuery::Organization("Acme Holdings".to_string())]
        );
    }
}
