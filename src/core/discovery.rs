use crate::adapters::{CrtShClient, FastRandSource, RdapWhoisClient, UnavailableSource};
use crate::core::aggregator::KeywordAggregator;
use crate::core::lookup::{self, CtLogByDomain, CtLogByOrg, Resolution, WhoisLookup};
use crate::core::tracker::{StepTracker, TrackerSnapshot};
use crate::domain::model::{
    DiscoveryOutcome, DiscoveryReport, DiscoveryRequest, LookupResult, ProgressKind,
    ResolutionSource, Stage, StageOutcome, StepState,
};
use crate::domain::ports::{
    ConfigProvider, CtLogSource, LookupQuery, LookupStrategy, RandomSource, WhoisSource,
};
use crate::utils::error::{ReconError, Result};
use crate::utils::validation::validate_domain;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

const BANNER_WIDTH: usize = 50;

/// Pipeline 目前所在的階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Idle,
    Running(Stage),
    Aggregating,
    Complete,
    Failed(Stage),
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    /// 每個即時查詢的時限，逾時等同查詢失敗
    pub stage_timeout: Option<Duration>,
    /// 允許 Stage1 與 Stage2 同時執行
    pub concurrent_lookups: bool,
}

/// 三個階段所需的外部能力
pub struct DiscoverySources {
    pub whois: Arc<dyn WhoisSource>,
    pub ct_log: Arc<dyn CtLogSource>,
    pub random: Arc<dyn RandomSource>,
    pub fallback_organizations: Vec<String>,
}

impl DiscoverySources {
    pub fn new(whois: Arc<dyn WhoisSource>, ct_log: Arc<dyn CtLogSource>) -> Self {
        Self {
            whois,
            ct_log,
            random: Arc::new(FastRandSource::new()),
            fallback_organizations: lookup::DEFAULT_FALLBACK_ORGANIZATIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn with_fallback_organizations(mut self, organizations: Vec<String>) -> Self {
        self.fallback_organizations = organizations;
        self
    }
}

/// 依序執行 WHOIS、CT log（網域）、CT log（組織）三個階段並彙整關鍵字。
///
/// 查詢失敗一律由備援吸收，只有前置條件違反或外部取消會讓一次執行提早結束。
/// 每次執行都會重設追蹤器，執行結束後仍可查看進度紀錄與各階段狀態。
pub struct DiscoveryPipeline {
    whois: Arc<dyn LookupStrategy>,
    ct_by_domain: Arc<dyn LookupStrategy>,
    ct_by_org: Arc<dyn LookupStrategy>,
    settings: PipelineSettings,
    tracker: StepTracker,
    phase: PipelinePhase,
    cancellation: Option<CancellationToken>,
}

impl DiscoveryPipeline {
    pub fn new(sources: DiscoverySources) -> Self {
        let whois = WhoisLookup::new(
            sources.whois,
            sources.fallback_organizations,
            sources.random,
        );
        Self::with_strategies(
            Arc::new(whois),
            Arc::new(CtLogByDomain::new(sources.ct_log.clone())),
            Arc::new(CtLogByOrg::new(sources.ct_log)),
        )
    }

    pub fn with_strategies(
        whois: Arc<dyn LookupStrategy>,
        ct_by_domain: Arc<dyn LookupStrategy>,
        ct_by_org: Arc<dyn LookupStrategy>,
    ) -> Self {
        Self {
            whois,
            ct_by_domain,
            ct_by_org,
            settings: PipelineSettings::default(),
            tracker: StepTracker::new(),
            phase: PipelinePhase::Idle,
            cancellation: None,
        }
    }

    /// 依設定建立真正連網（或離線）的 pipeline
    pub fn from_config<C: ConfigProvider + ?Sized>(
        config: &C,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self> {
        let (whois, ct_log): (Arc<dyn WhoisSource>, Arc<dyn CtLogSource>) = if config.offline() {
            tracing::info!("🔌 Offline mode: every stage will use sample data");
            let source = Arc::new(UnavailableSource::offline());
            (source.clone(), source)
        } else {
            (
                Arc::new(RdapWhoisClient::from_config(config)?),
                Arc::new(CrtShClient::from_config(config)?),
            )
        };

        let sources = DiscoverySources::new(whois, ct_log)
            .with_random_source(random)
            .with_fallback_organizations(config.fallback_organizations().to_vec());

        Ok(Self::new(sources).with_settings(PipelineSettings {
            stage_timeout: config.stage_timeout(),
            concurrent_lookups: config.concurrent_lookups(),
        }))
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 取消只在階段交界生效，進行中的查詢會先完成
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    pub fn tracker(&self) -> &StepTracker {
        &self.tracker
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.tracker.subscribe()
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.tracker.snapshot()
    }

    pub async fn run_discovery(&mut self, domain: &str) -> Result<DiscoveryOutcome> {
        self.run(&DiscoveryRequest::new(domain)).await
    }

    pub async fn run(&mut self, request: &DiscoveryRequest) -> Result<DiscoveryOutcome> {
        validate_domain(request.domain())?;

        self.tracker.reset();
        self.phase = PipelinePhase::Idle;

        let domain = request.domain();
        tracing::info!("🚀 Starting keyword discovery for {}", domain);
        self.tracker.log(
            ProgressKind::Plain,
            &format!("--- Starting Keyword Discovery for: {} ---", domain),
        );
        self.tracker.blank_line();

        match self.execute(domain).await {
            Ok(outcome) => {
                self.phase = PipelinePhase::Complete;
                tracing::info!(
                    "✅ Discovery completed: {} unique keywords",
                    outcome.report.total_count
                );
                Ok(outcome)
            }
            Err(e) => {
                self.abort(&e);
                Err(e)
            }
        }
    }

    async fn execute(&mut self, domain: &str) -> Result<DiscoveryOutcome> {
        let mut aggregator = KeywordAggregator::seeded(domain);
        let mut completed: Vec<Stage> = Vec::new();
        let mut stages: Vec<StageOutcome> = Vec::new();
        let query = LookupQuery::for_domain(domain);

        let (whois, by_domain) = if self.settings.concurrent_lookups {
            self.check_cancelled(&completed)?;
            self.phase = PipelinePhase::Running(Stage::Whois);
            let (whois, by_domain) = tokio::join!(
                self.run_stage(self.whois.as_ref(), &query),
                self.run_stage(self.ct_by_domain.as_ref(), &query)
            );
            (whois?, by_domain?)
        } else {
            self.check_cancelled(&completed)?;
            self.phase = PipelinePhase::Running(Stage::Whois);
            let whois = self.run_stage(self.whois.as_ref(), &query).await?;
            completed.push(Stage::Whois);

            self.check_cancelled(&completed)?;
            self.phase = PipelinePhase::Running(Stage::CtLogByDomain);
            let by_domain = self.run_stage(self.ct_by_domain.as_ref(), &query).await?;
            (whois, by_domain)
        };
        completed = vec![Stage::Whois, Stage::CtLogByDomain];

        let organization = match &whois.result {
            LookupResult::Organization(org) => org.clone(),
            LookupResult::KeywordSet(_) => None,
        };

        stages.push(Self::stage_outcome(Stage::Whois, &whois));
        stages.push(Self::stage_outcome(Stage::CtLogByDomain, &by_domain));
        aggregator.collect(whois.result.into_keywords());
        aggregator.collect(by_domain.result.into_keywords());

        match &organization {
            Some(org) => {
                self.check_cancelled(&completed)?;
                self.phase = PipelinePhase::Running(Stage::CtLogByOrg);
                self.tracker.blank_line();
                let org_query = query.clone().with_organization(org.clone());
                let by_org = self.run_stage(self.ct_by_org.as_ref(), &org_query).await?;
                completed.push(Stage::CtLogByOrg);

                stages.push(Self::stage_outcome(Stage::CtLogByOrg, &by_org));
                aggregator.collect(by_org.result.into_keywords());
            }
            None => {
                self.tracker.blank_line();
                self.tracker.log(
                    ProgressKind::Notice,
                    "[Step 3] Skipped: no organization found to search CT logs for.",
                );
                stages.push(StageOutcome {
                    stage: Stage::CtLogByOrg,
                    source: ResolutionSource::Skipped,
                    keyword_count: 0,
                });
            }
        }

        self.check_cancelled(&completed)?;
        self.phase = PipelinePhase::Aggregating;
        let report = aggregator.into_report();
        self.log_summary(&report);

        Ok(DiscoveryOutcome {
            report,
            organization,
            stages,
        })
    }

    async fn run_stage(
        &self,
        strategy: &dyn LookupStrategy,
        query: &LookupQuery,
    ) -> Result<Resolution> {
        let stage = strategy.stage();
        self.tracker.begin(stage)?;
        self.tracker.log(ProgressKind::Info, &Self::start_message(stage, query));

        let resolution = lookup::resolve(strategy, query, self.settings.stage_timeout).await;

        match (&resolution.result, stage) {
            (LookupResult::Organization(Some(org)), _) => {
                self.tracker.log(
                    ProgressKind::Success,
                    &format!("Found Organization: {}", org),
                );
            }
            (LookupResult::Organization(None), _) => {
                self.tracker.log(
                    ProgressKind::Notice,
                    &format!("No registrant organization found for {}.", query.domain),
                );
            }
            (LookupResult::KeywordSet(items), Stage::CtLogByOrg) => {
                self.tracker.log(
                    ProgressKind::Success,
                    &format!(
                        "Found {} organization-related keywords (sister domains).",
                        items.len()
                    ),
                );
            }
            (LookupResult::KeywordSet(items), _) => {
                self.tracker.log(
                    ProgressKind::Success,
                    &format!("Found {} domain-related keywords.", items.len()),
                );
            }
        }

        if let Some(failure) = &resolution.failure {
            tracing::warn!("⚠️ {} fell back to sample data: {}", stage, failure);
            self.tracker.log(
                ProgressKind::Notice,
                &format!("Note: Using sample data ({}).", failure),
            );
        }

        self.tracker.succeed(stage)?;
        if stage == Stage::Whois {
            self.tracker.blank_line();
        }
        Ok(resolution)
    }

    fn start_message(stage: Stage, query: &LookupQuery) -> String {
        match stage {
            Stage::Whois => format!(
                "[Step 1] Performing WHOIS lookup for {}...",
                query.domain
            ),
            Stage::CtLogByDomain => format!(
                "[Step 2] Querying CT Logs for subdomains of '{}'...",
                query.domain
            ),
            Stage::CtLogByOrg => format!(
                "[Step 3] Querying CT Logs for Organization '{}'...",
                query.organization.as_deref().unwrap_or_default()
            ),
        }
    }

    fn stage_outcome(stage: Stage, resolution: &Resolution) -> StageOutcome {
        StageOutcome {
            stage,
            source: resolution.source,
            keyword_count: resolution.result.len(),
        }
    }

    fn log_summary(&self, report: &DiscoveryReport) {
        let rule = "=".repeat(BANNER_WIDTH);
        self.tracker.blank_line();
        self.tracker.log(ProgressKind::Banner, &rule);
        self.tracker.log(
            ProgressKind::Banner,
            "  All Discovered Keywords (Deduplicated)",
        );
        self.tracker.log(ProgressKind::Banner, &rule);
        self.tracker.log(
            ProgressKind::Success,
            &format!(
                "Total: {} unique keywords ({} names, {} domains)",
                report.total_count,
                report.name_keywords.len(),
                report.domain_keywords.len()
            ),
        );
    }

    fn check_cancelled(&self, completed: &[Stage]) -> Result<()> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => Err(ReconError::Cancelled {
                completed: completed.to_vec(),
            }),
            _ => Ok(()),
        }
    }

    fn abort(&mut self, error: &ReconError) {
        match error {
            ReconError::Cancelled { .. } => {
                self.phase = PipelinePhase::Cancelled;
                tracing::warn!("🛑 Discovery cancelled");
                self.tracker.log(
                    ProgressKind::Error,
                    "Discovery cancelled before completion.",
                );
            }
            _ => {
                // 把仍在執行中的階段標為失敗
                for stage in Stage::ALL {
                    if self.tracker.state(stage) == StepState::Running {
                        // 只有 Running 能轉成 Failed，這裡不會再出錯
                        let _ = self.tracker.fail(stage);
                    }
                }
                let stage = match (self.phase, error) {
                    (PipelinePhase::Running(stage), _) => Some(stage),
                    (_, ReconError::StepTransition { stage, .. }) => Some(*stage),
                    _ => None,
                };
                if let Some(stage) = stage {
                    self.phase = PipelinePhase::Failed(stage);
                }
                tracing::error!("❌ Discovery failed: {}", error);
                self.tracker.log(
                    ProgressKind::Error,
                    &format!("Error during discovery: {}", error),
                );
            }
        }
    }
}
