//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_search` - 后台批量搜索编排器
//! - 管理一次运行的生命周期（start / stop / clear）
//! - 严格按批次、按关键词串行搜索
//! - 维护去重后的内存语料库
//! - 通过事件总线通知进度
//!
//! ### `kpi_aggregator` - KPI 聚合器
//! - 读取编排器语料库计算仪表盘指标
//! - 短时缓存快照
//! - 数据过期时触发编排器刷新
//!
//! ## 层次关系
//!
//! ```text
//! kpi_aggregator ──→ batch_search
//!        ↓                 ↓
//! services (能力层：job_search / cache_writer / event_bus)
//!        ↓
//! clients (外部 API)
//! ```

pub mod batch_search;
pub mod kpi_aggregator;

// 重新导出主要类型
pub use batch_search::BatchSearchOrchestrator;
pub use kpi_aggregator::KpiAggregator;
