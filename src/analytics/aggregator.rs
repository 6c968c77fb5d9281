//! 访问统计聚合器
//!
//! 由外部调度器（或 main 里的定时任务）周期性调用 `run_batch`：
//! 从队列破坏性弹出一批事件，按 (link, UTC 天) 分组，写入汇总表。
//!
//! 交付语义是 at-least-once：没有 ack 协议，崩在出队和落库之间的
//! 批次会丢失或重复。这是换取简单性的既定取舍，见 DESIGN.md。

use std::collections::HashSet;
use std::sync::Arc;

use tokio::time::{Duration, sleep};
use tracing::{debug, trace, warn};

use super::{RollupSink, VisitQueue, aggregate_events};

/// 单次聚合的观测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// 本批处理的事件数
    pub processed: usize,
    /// 受影响的链接数
    pub links_affected: usize,
    /// 聚合后的队列长度
    pub queue_length_after: usize,
}

pub struct VisitAggregator {
    queue: Arc<dyn VisitQueue>,
    sink: Arc<dyn RollupSink>,
}

impl VisitAggregator {
    pub fn new(queue: Arc<dyn VisitQueue>, sink: Arc<dyn RollupSink>) -> Self {
        Self { queue, sink }
    }

    /// 聚合一批事件（幂等入口，任意节奏可调用）
    pub async fn run_batch(&self, max_events: usize) -> BatchReport {
        let events = self.queue.dequeue(max_events).await;

        if events.is_empty() {
            trace!("VisitAggregator: queue empty, nothing to do");
            return BatchReport {
                processed: 0,
                links_affected: 0,
                queue_length_after: self.queue.len().await,
            };
        }

        let grouped = aggregate_events(&events);
        let links: HashSet<i64> = grouped.keys().map(|(link_id, _)| *link_id).collect();

        for ((link_id, day), aggregation) in &grouped {
            // 单个分组失败只记日志：统计可以丢，聚合循环不能死
            if let Err(e) = self.sink.apply_rollups(*link_id, *day, aggregation).await {
                warn!(
                    "VisitAggregator: rollup write failed for link {} ({}): {}",
                    link_id, day, e
                );
            }
        }

        let report = BatchReport {
            processed: events.len(),
            links_affected: links.len(),
            queue_length_after: self.queue.len().await,
        };

        debug!(
            "VisitAggregator: batch done, {} events across {} links ({} still queued)",
            report.processed, report.links_affected, report.queue_length_after
        );

        report
    }

    /// 启动后台聚合任务（作为异步方法运行）
    pub async fn start_background_task(&self, interval: Duration, batch_size: usize) {
        loop {
            sleep(interval).await;
            self.run_batch(batch_size).await;
        }
    }
}
