use async_trait::async_trait;
use chrono::NaiveDate;

use super::VisitAggregation;

/// 汇总写入端
///
/// 实现方必须使用原子的 increment-or-create upsert：多个聚合器实例
/// 并发运行时不依赖互斥，靠存储层的原子累加保证正确性。
#[async_trait]
pub trait RollupSink: Send + Sync {
    /// 将一个 (link, 天) 分组写入存储：
    /// visits 累加 + 点击/来源/地理汇总行 upsert 累加
    async fn apply_rollups(
        &self,
        link_id: i64,
        day: NaiveDate,
        aggregation: &VisitAggregation,
    ) -> anyhow::Result<()>;
}
