//! KPI 聚合器 - 编排层
//!
//! ## 职责
//!
//! 从当前可用的数据（编排器语料库、远端缓存、平台统计接口）计算仪表盘指标，
//! 结果在内存中缓存一个 TTL 周期；数据过期时提示编排器刷新。
//!
//! 任何一个子指标失败都只把该字段降级为 0，整个快照总能返回。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::clients::{JobApi, PlatformStatsApi};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{CacheFreshness, JobKpis, JobRecord, KpiSnapshot};
use crate::orchestrator::BatchSearchOrchestrator;
use crate::services::JobSearchService;
use crate::utils::Clock;

/// KPI 聚合器
pub struct KpiAggregator {
    orchestrator: Arc<BatchSearchOrchestrator>,
    stats: Arc<dyn PlatformStatsApi>,
    cache_source: JobSearchService,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    freshness_threshold: chrono::Duration,
    refresh_grace: Duration,
    source_timeout: Duration,
    fallback_limit: u32,
    cached: Mutex<Option<KpiSnapshot>>,
}

impl KpiAggregator {
    pub fn new(
        orchestrator: Arc<BatchSearchOrchestrator>,
        job_api: Arc<dyn JobApi>,
        stats: Arc<dyn PlatformStatsApi>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            orchestrator,
            stats,
            cache_source: JobSearchService::new(job_api, clock.clone(), config),
            clock,
            ttl: config.kpi_cache_ttl(),
            freshness_threshold: config.freshness_threshold(),
            refresh_grace: config.refresh_grace(),
            source_timeout: config.request_timeout(),
            fallback_limit: config.warm_start_limit,
            cached: Mutex::new(None),
        }
    }

    /// 获取全部 KPI
    ///
    /// TTL 内直接返回缓存的快照；否则重新计算并缓存。
    pub async fn get_all_kpis(&self) -> KpiSnapshot {
        let now = self.clock.now();
        if let Some(snapshot) = self.cached_snapshot(now) {
            debug!("使用缓存的 KPI 快照 ({})", snapshot.timestamp);
            return snapshot;
        }

        let (total_students, total_companies, total_applications, jobs) = futures::join!(
            self.count_or_zero("total_students", self.stats.count_students()),
            self.count_or_zero("total_companies", self.stats.count_companies()),
            self.count_or_zero("total_applications", self.stats.count_applications()),
            self.job_kpis(),
        );

        let snapshot = KpiSnapshot {
            total_students,
            total_companies,
            total_jobs: jobs.total_jobs,
            active_jobs: jobs.active_jobs,
            total_applications,
            matching_rate: jobs.matching_rate,
            timestamp: now,
        };

        *self.cached.lock() = Some(snapshot.clone());
        snapshot
    }

    /// 强制刷新 KPI
    pub async fn refresh_kpis(&self) -> KpiSnapshot {
        self.invalidate();
        self.get_all_kpis().await
    }

    /// 丢弃缓存的快照
    pub fn invalidate(&self) {
        self.cached.lock().take();
    }

    /// 根据编排器语料库计算缓存新鲜度
    pub fn cache_freshness(&self) -> CacheFreshness {
        CacheFreshness::compute(
            &self.orchestrator.get_results(),
            self.clock.now(),
            self.freshness_threshold,
        )
    }

    /// 确保缓存新鲜
    ///
    /// 新鲜时直接返回 `true`。过期且编排器空闲时触发一次后台搜索，
    /// 等待宽限期后再检查一次并返回结果；只尝试改善，不保证新鲜。
    pub async fn ensure_cache_freshness(&self) -> bool {
        let freshness = self.cache_freshness();
        if freshness.is_fresh {
            return true;
        }

        match freshness.age_hours {
            Some(age) => info!("🕒 职位缓存已过期 ({:.1} 小时)", age),
            None => info!("🕒 职位缓存为空"),
        }

        if self.orchestrator.is_running() {
            debug!("后台搜索已在运行，本次不再触发");
            return false;
        }

        if !self.orchestrator.start() {
            debug!("其他调用方已触发后台搜索，本次不再等待");
            return false;
        }
        sleep(self.refresh_grace).await;

        let updated = self.cache_freshness();
        debug!("刷新后新鲜度: {:?}", updated);
        updated.is_fresh
    }

    /// 从职位记录计算统计（纯函数）
    pub fn calculate_kpis_from_jobs(records: &[JobRecord]) -> JobKpis {
        JobKpis::from_records(records)
    }

    // ========== 内部计算 ==========

    fn cached_snapshot(&self, now: chrono::DateTime<chrono::Utc>) -> Option<KpiSnapshot> {
        self.cached
            .lock()
            .as_ref()
            .filter(|s| s.is_within(self.ttl, now))
            .cloned()
    }

    /// 职位统计：优先使用内存语料，为空时回退到远端缓存
    async fn job_kpis(&self) -> JobKpis {
        let records = self.orchestrator.get_results();
        if !records.is_empty() {
            return Self::calculate_kpis_from_jobs(&records);
        }

        match timeout(self.source_timeout, self.cache_source.load_cached(self.fallback_limit)).await {
            Ok(Ok(records)) => Self::calculate_kpis_from_jobs(&records),
            Ok(Err(e)) => {
                warn!("⚠️ 读取缓存职位失败，职位指标按 0 计: {}", e);
                JobKpis::default()
            }
            Err(_) => {
                warn!("⚠️ 读取缓存职位超时，职位指标按 0 计");
                JobKpis::default()
            }
        }
    }

    async fn count_or_zero<F>(&self, field: &str, source: F) -> u64
    where
        F: Future<Output = AppResult<u64>>,
    {
        match timeout(self.source_timeout, source).await {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => {
                warn!("⚠️ KPI 字段 {} 计算失败，按 0 计: {}", field, e);
                0
            }
            Err(_) => {
                warn!("⚠️ KPI 字段 {} 超时，按 0 计", field);
                0
            }
        }
    }
}
