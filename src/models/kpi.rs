//! KPI 数据结构与纯计算

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::job::JobRecord;

/// 职位相关的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JobKpis {
    pub total_jobs: u64,
    pub active_jobs: u64,
    /// 活跃职位占比（百分比，保留一位小数）
    pub matching_rate: f64,
}

impl JobKpis {
    /// 根据职位记录计算统计，空输入返回全零
    pub fn from_records(records: &[JobRecord]) -> Self {
        let total_jobs = records.len() as u64;
        let active_jobs = records.iter().filter(|r| r.is_active).count() as u64;
        Self {
            total_jobs,
            active_jobs,
            matching_rate: percentage(active_jobs, total_jobs),
        }
    }
}

/// 仪表盘 KPI 快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    pub total_students: u64,
    pub total_companies: u64,
    pub total_jobs: u64,
    pub active_jobs: u64,
    pub total_applications: u64,
    pub matching_rate: f64,
    pub timestamp: DateTime<Utc>,
}

impl KpiSnapshot {
    /// 快照是否仍在 TTL 内
    pub fn is_within(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) < ttl
    }
}

/// 缓存新鲜度（按需计算，不持久化）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheFreshness {
    pub is_fresh: bool,
    /// 最新记录距今的小时数；没有记录时为 `None`
    pub age_hours: Option<f64>,
}

impl CacheFreshness {
    /// 以最新一条记录的入库时间判断新鲜度
    ///
    /// 晚于 `now` 的时间戳按 0 小时计
    pub fn compute(records: &[JobRecord], now: DateTime<Utc>, threshold: Duration) -> Self {
        let Some(newest) = records.iter().map(|r| r.ingested_at).max() else {
            return Self {
                is_fresh: false,
                age_hours: None,
            };
        };

        let age = now.signed_duration_since(newest).max(Duration::zero());
        Self {
            is_fresh: age < threshold,
            age_hours: Some(age.num_milliseconds() as f64 / 3_600_000.0),
        }
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = part as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}
