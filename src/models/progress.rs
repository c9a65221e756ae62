use serde::Serialize;

use super::job::JobRecord;

/// 后台搜索进度（同步计算，无副作用）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchProgress {
    pub current_batch: usize,
    pub total_batches: usize,
    pub percentage: f64,
    pub total_jobs: usize,
    pub is_running: bool,
    pub is_searching: bool,
}

impl SearchProgress {
    pub fn new(
        current_batch: usize,
        total_batches: usize,
        total_jobs: usize,
        is_running: bool,
        is_searching: bool,
    ) -> Self {
        let percentage = if total_batches == 0 {
            0.0
        } else {
            (current_batch.min(total_batches) as f64 / total_batches as f64 * 100.0).round()
        };
        Self {
            current_batch,
            total_batches,
            percentage,
            total_jobs,
            is_running,
            is_searching,
        }
    }
}

/// 后台搜索事件
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    /// 一次新的运行开始
    RunStarted { generation: u64 },
    /// 预热：从远端缓存载入的记录
    CacheLoaded { records: Vec<JobRecord>, total: usize },
    /// 开始处理某个批次
    BatchStarted {
        index: usize,
        total: usize,
        keywords: Vec<String>,
    },
    /// 某个关键词搜索完成（`records` 只包含新增记录，可能为空）
    RecordsAdded {
        keyword: String,
        records: Vec<JobRecord>,
        total: usize,
    },
    /// 某个关键词搜索失败，循环继续
    KeywordFailed { keyword: String, error: String },
    /// 运行被 stop() 中断
    RunStopped { total: usize },
    /// 全部批次处理完成
    RunComplete { records: Vec<JobRecord>, total: usize },
}

impl SearchEvent {
    /// 事件名（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            SearchEvent::RunStarted { .. } => "runStarted",
            SearchEvent::CacheLoaded { .. } => "cacheLoaded",
            SearchEvent::BatchStarted { .. } => "batchStarted",
            SearchEvent::RecordsAdded { .. } => "recordsAdded",
            SearchEvent::KeywordFailed { .. } => "keywordFailed",
            SearchEvent::RunStopped { .. } => "runStopped",
            SearchEvent::RunComplete { .. } => "runComplete",
        }
    }
}
