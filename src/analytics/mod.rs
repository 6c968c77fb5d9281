//! 访问统计管道
//!
//! 解析热路径只负责把 `VisitEvent` 推入队列；聚合器独立批量消费，
//! 按 (link, UTC 天) 分组后写入汇总表。统计是尽力而为的：
//! 任何一步失败都不允许影响重定向本身。

pub mod aggregator;
pub mod queue;
pub mod sink;

pub use aggregator::{BatchReport, VisitAggregator};
pub use queue::{MemoryVisitQueue, RedisVisitQueue, VisitQueue};
pub use sink::RollupSink;

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 无 referrer 或 header 缺失
pub const REFERRER_DIRECT: &str = "Direct";
/// 有 referrer 但解析不出 host
pub const REFERRER_OTHER: &str = "Other";
/// 无法确定来源国家
pub const COUNTRY_UNKNOWN: &str = "Unknown";

/// 单次访问事件（只存在于队列中，从不落库）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitEvent {
    pub link_id: i64,
    pub referrer_host: String,
    pub country_code: String,
    /// 毫秒精度时间戳；聚合器用它决定归属哪一天
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub occurred_at: DateTime<Utc>,
}

/// 一个 (link, 天) 分组的聚合结果
#[derive(Debug, Clone, Default)]
pub struct VisitAggregation {
    /// 点击计数
    pub count: usize,
    /// 来源统计 (referrer host -> count)
    pub referrers: HashMap<String, usize>,
    /// 国家统计 (country -> count)
    pub countries: HashMap<String, usize>,
}

impl VisitAggregation {
    fn record(&mut self, event: &VisitEvent) {
        self.count += 1;
        *self
            .referrers
            .entry(event.referrer_host.clone())
            .or_insert(0) += 1;
        *self
            .countries
            .entry(event.country_code.clone())
            .or_insert(0) += 1;
    }
}

/// 从事件列表聚合数据，key 为 (link_id, 事件时间戳所在的 UTC 天)
pub fn aggregate_events(events: &[VisitEvent]) -> HashMap<(i64, NaiveDate), VisitAggregation> {
    let mut result: HashMap<(i64, NaiveDate), VisitAggregation> = HashMap::new();

    for event in events {
        let day = event.occurred_at.date_naive();
        result
            .entry((event.link_id, day))
            .or_default()
            .record(event);
    }

    result
}
