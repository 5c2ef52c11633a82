use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::Level;

/// 一次探索的輸入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    domain: String,
}

impl DiscoveryRequest {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// Pipeline 的三個階段，依執行順序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Whois,
    CtLogByDomain,
    CtLogByOrg,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Whois, Stage::CtLogByDomain, Stage::CtLogByOrg];

    pub fn index(self) -> usize {
        match self {
            Stage::Whois => 0,
            Stage::CtLogByDomain => 1,
            Stage::CtLogByOrg => 2,
        }
    }

    pub fn step_number(self) -> usize {
        self.index() + 1
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Whois => "WHOIS",
            Stage::CtLogByDomain => "CT Log (Domain)",
            Stage::CtLogByOrg => "CT Log (Org)",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {} ({})", self.step_number(), self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepState::Pending => "pending",
            StepState::Running => "running",
            StepState::Succeeded => "succeeded",
            StepState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// 進度訊息種類，對應前端上色用的前綴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    /// `[*]` 階段開始或一般資訊
    Info,
    /// `[+]` 成功細節
    Success,
    /// `[!]` 錯誤
    Error,
    /// `[i]` 使用備援資料的提示
    Notice,
    /// `=` 橫幅與標題
    Banner,
    /// 無前綴的行（含空白分隔行）
    Plain,
}

impl ProgressKind {
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            ProgressKind::Info => Some("[*]"),
            ProgressKind::Success => Some("[+]"),
            ProgressKind::Error => Some("[!]"),
            ProgressKind::Notice => Some("[i]"),
            ProgressKind::Banner | ProgressKind::Plain => None,
        }
    }

    /// 鏡射到 tracing 時使用的層級，橫幅與空白行不鏡射
    pub fn log_level(self) -> Option<Level> {
        match self {
            ProgressKind::Info | ProgressKind::Success => Some(Level::INFO),
            ProgressKind::Notice => Some(Level::WARN),
            ProgressKind::Error => Some(Level::ERROR),
            ProgressKind::Banner | ProgressKind::Plain => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub kind: ProgressKind,
    pub text: String,
}

impl ProgressEntry {
    pub fn new(kind: ProgressKind, message: &str) -> Self {
        let text = match kind.prefix() {
            Some(prefix) => format!("{} {}", prefix, message),
            None => message.to_string(),
        };
        Self { kind, text }
    }

    pub fn blank() -> Self {
        Self {
            kind: ProgressKind::Plain,
            text: String::new(),
        }
    }
}

impl fmt::Display for ProgressEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// CT log 查詢回傳的一列，`name_value` 可能含多個以換行分隔的名稱
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtLogEntry {
    #[serde(default)]
    pub name_value: String,
}

impl CtLogEntry {
    pub fn new(name_value: impl Into<String>) -> Self {
        Self {
            name_value: name_value.into(),
        }
    }
}

/// 查詢結果：組織名稱最多一個，CT log 查詢則為名稱集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Organization(Option<String>),
    KeywordSet(BTreeSet<String>),
}

impl LookupResult {
    /// 把結果攤平成可以併入關鍵字集合的字串
    pub fn into_keywords(self) -> BTreeSet<String> {
        match self {
            LookupResult::Organization(Some(name)) => BTreeSet::from([name]),
            LookupResult::Organization(None) => BTreeSet::new(),
            LookupResult::KeywordSet(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LookupResult::Organization(org) => usize::from(org.is_some()),
            LookupResult::KeywordSet(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 資料來自即時查詢、備援產生，或階段被略過
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Primary,
    Fallback,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub source: ResolutionSource,
    pub keyword_count: usize,
}

/// 最終報告。兩個分區互斥且各自以位元組字典序排序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub name_keywords: Vec<String>,
    pub domain_keywords: Vec<String>,
    pub total_count: usize,
}

/// Pipeline 的回傳值：報告加上執行過程的附帶資訊
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    pub report: DiscoveryReport,
    pub organization: Option<String>,
    pub stages: Vec<StageOutcome>,
}
