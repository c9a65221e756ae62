//! # MoirAI Job Aggregator
//!
//! MoirAI 职位平台的后台职位聚合与 KPI 服务
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 外部接口层（Clients）
//! - `clients/` - 通过 `JobApi` / `PlatformStatsApi` trait 暴露后端 API 能力
//! - `MoiraiClient` - 基于 reqwest 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个关键词或单批记录
//! - `JobSearchService` - 搜索并归一化职位
//! - `CacheWriter` - 新增职位写回远端缓存（发出即不管）
//! - `EventBus` - 进度事件的订阅与分发
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_search` - 按批次串行搜索，维护去重语料库
//! - `orchestrator/kpi_aggregator` - 计算并缓存仪表盘 KPI，数据过期时触发刷新
//!
//! ### ④ 组合根
//! - `app::AppContext` - 显式创建并注入所有组件
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use app::AppContext;
pub use clients::{JobApi, MoiraiClient, PlatformStatsApi};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{BatchPlan, CacheFreshness, JobKpis, JobRecord, KpiSnapshot, SearchEvent, SearchProgress};
pub use orchestrator::{BatchSearchOrchestrator, KpiAggregator};
pub use services::EventBus;
