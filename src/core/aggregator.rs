use crate::domain::model::DiscoveryReport;
use std::collections::BTreeSet;

/// 收集各階段的關鍵字集合，最後合併並分類成名稱與網域兩組
#[derive(Debug, Clone, Default)]
pub struct KeywordAggregator {
    found: Vec<BTreeSet<String>>,
}

impl KeywordAggregator {
    /// 以原始輸入網域作為第一個關鍵字
    pub fn seeded(domain: &str) -> Self {
        Self {
            found: vec![BTreeSet::from([domain.to_string()])],
        }
    }

    pub fn collect(&mut self, keywords: BTreeSet<String>) {
        self.found.push(keywords);
    }

    pub fn into_report(self) -> DiscoveryReport {
        Self::classify(&Self::merge(self.found))
    }

    /// 單純聯集，比對大小寫敏感
    pub fn merge<I>(sets: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = BTreeSet<String>>,
    {
        sets.into_iter().flatten().collect()
    }

    /// 含 `.` 的歸為網域關鍵字，其餘為名稱關鍵字
    pub fn classify(keywords: &BTreeSet<String>) -> DiscoveryReport {
        let (mut domain_keywords, mut name_keywords): (Vec<String>, Vec<String>) =
            keywords.iter().cloned().partition(|k| k.contains('.'));

        // BTreeSet 已排序，這裡再排一次讓呼叫端傳入任何集合都成立
        name_keywords.sort();
        domain_keywords.sort();

        DiscoveryReport {
            total_count: name_keywords.len() + domain_keywords.len(),
            name_keywords,
            domain_keywords,
        }
    }
}
