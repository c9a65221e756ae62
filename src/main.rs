use anyhow::Result;
use moirai_job_aggregator::utils::logging;
use moirai_job_aggregator::{AppContext, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志（配置加载前，以便记录配置警告）
    let verbose = std::env::var("VERBOSE_LOGGING")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    logging::init(verbose);

    // 加载配置
    let config = Config::load()?;

    // 初始化并运行应用
    AppContext::new(config)?.run().await?;

    Ok(())
}
