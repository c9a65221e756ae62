/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{KpiSnapshot, SearchProgress};

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 info，verbose 时为 debug。重复调用无副作用。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 后台职位聚合模式");
    info!("🌐 API 地址: {}", config.api_base_url);
    info!(
        "📋 共 {} 个批次 / {} 个关键词",
        config.keyword_batches.len(),
        config.keyword_batches.keyword_count()
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号（从 1 开始）
/// - `total_batches`: 批次总数
/// - `keywords`: 本批关键词
pub fn log_batch_start(batch_num: usize, total_batches: usize, keywords: &[String]) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("🔑 本批关键词: {}", keywords.join(", "));
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, added: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 新增 {} 条，累计 {} 条", batch_num, added, total);
    info!("{}", "─".repeat(60));
}

/// 打印运行结束统计
pub fn print_run_summary(progress: &SearchProgress) {
    info!("\n{}", "=".repeat(60));
    info!("📊 后台搜索结束");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!(
        "📦 批次: {}/{} ({}%)",
        progress.current_batch, progress.total_batches, progress.percentage
    );
    info!("💼 职位总数: {}", progress.total_jobs);
    info!("{}", "=".repeat(60));
}

/// 打印 KPI 快照
pub fn print_kpi_snapshot(snapshot: &KpiSnapshot) {
    info!("\n{}", "=".repeat(60));
    info!("📈 KPI 快照 ({})", snapshot.timestamp.format("%Y-%m-%d %H:%M:%S"));
    info!("{}", "=".repeat(60));
    info!("🎓 学生: {}", snapshot.total_students);
    info!("🏢 企业: {}", snapshot.total_companies);
    info!("💼 职位: {} (活跃 {})", snapshot.total_jobs, snapshot.active_jobs);
    info!("📨 申请: {}", snapshot.total_applications);
    info!("🎯 匹配率: {:.1}%", snapshot.matching_rate);
    info!("{}", "=".repeat(60));
}
