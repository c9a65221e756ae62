use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::clients::{JobApi, MoiraiClient, PlatformStatsApi};
use crate::config::Config;
use crate::models::SearchEvent;
use crate::orchestrator::{BatchSearchOrchestrator, KpiAggregator};
use crate::services::EventBus;
use crate::utils::logging::{log_startup, print_kpi_snapshot, print_run_summary};
use crate::utils::{Clock, SystemClock};

/// 应用上下文
///
/// 所有组件在这里显式创建并注入，使用方通过引用拿到需要的实例。
pub struct AppContext {
    config: Config,
    events: Arc<EventBus>,
    orchestrator: Arc<BatchSearchOrchestrator>,
    kpis: KpiAggregator,
}

impl AppContext {
    /// 使用真实 HTTP 客户端创建
    pub fn new(config: Config) -> crate::AppResult<Self> {
        let client = Arc::new(MoiraiClient::new(&config)?);
        Ok(Self::with_apis(
            config,
            client.clone(),
            client,
            Arc::new(SystemClock),
        ))
    }

    /// 使用自定义的 API 实现创建（测试或嵌入其他程序时）
    pub fn with_apis(
        config: Config,
        job_api: Arc<dyn JobApi>,
        stats_api: Arc<dyn PlatformStatsApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = Arc::new(EventBus::new());
        let orchestrator = Arc::new(BatchSearchOrchestrator::new(
            job_api.clone(),
            clock.clone(),
            events.clone(),
            &config,
        ));
        let kpis = KpiAggregator::new(orchestrator.clone(), job_api, stats_api, clock, &config);

        Self {
            config,
            events,
            orchestrator,
            kpis,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn orchestrator(&self) -> &Arc<BatchSearchOrchestrator> {
        &self.orchestrator
    }

    pub fn kpis(&self) -> &KpiAggregator {
        &self.kpis
    }

    /// 运行一次完整的后台搜索，结束后输出 KPI
    ///
    /// Ctrl-C 会调用 `stop()`，等待在途请求结束后退出。
    pub async fn run(&self) -> Result<()> {
        log_startup(&self.config);

        let mut rx = self.events.subscribe();
        if !self.orchestrator.start() {
            warn!("⚠️ 后台搜索未能启动");
            return Ok(());
        }

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Ok(SearchEvent::RunComplete { .. }) | Ok(SearchEvent::RunStopped { .. }) => break,
                    Ok(SearchEvent::KeywordFailed { keyword, error }) => {
                        debug!("关键词 {} 失败: {}", keyword, error);
                    }
                    Ok(event) => debug!("事件: {}", event.name()),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("⚠️ 事件消费过慢，跳过 {} 条", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        warn!("⚠️ 监听 Ctrl-C 失败: {}", e);
                    }
                    info!("收到中断信号，正在停止...");
                    self.orchestrator.stop();
                }
            }
        }

        print_run_summary(&self.orchestrator.get_progress());

        let snapshot = self.kpis.refresh_kpis().await;
        print_kpi_snapshot(&snapshot);

        Ok(())
    }
}
