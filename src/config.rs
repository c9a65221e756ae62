use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::{AppError, AppResult, ConfigError};
use crate::models::BatchPlan;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- API 配置 ---
    /// MoirAI 后端 API 地址
    pub api_base_url: String,
    /// Bearer token（可选）
    pub api_token: Option<String>,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,

    // --- 搜索配置 ---
    /// 搜索地点过滤（可选）
    pub search_location: Option<String>,
    /// 搜索分类过滤（可选）
    pub search_category: Option<String>,
    /// 每个关键词最多返回条数
    pub search_limit: u32,
    /// 批次之间的等待（毫秒）
    pub inter_batch_delay_ms: u64,
    /// 等待上一个搜索完成的上限（毫秒）
    pub search_wait_timeout_ms: u64,
    /// 关键词批次
    pub keyword_batches: BatchPlan,

    // --- 缓存配置 ---
    /// 启动时是否从远端缓存预热
    pub warm_start: bool,
    /// 预热最多载入条数
    pub warm_start_limit: u32,
    /// 写入缓存时的来源标记
    pub cache_source_tag: String,
    /// 超过该小时数视为过期
    pub freshness_threshold_hours: u64,
    /// KPI 快照缓存时间（秒）
    pub kpi_cache_ttl_secs: u64,
    /// 触发刷新后等待的宽限期（毫秒）
    pub refresh_grace_ms: u64,

    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            api_token: None,
            request_timeout_secs: 30,
            search_location: None,
            search_category: None,
            search_limit: 50,
            inter_batch_delay_ms: 3_000,
            search_wait_timeout_ms: 10_000,
            keyword_batches: BatchPlan::default_plan(),
            warm_start: true,
            warm_start_limit: 500,
            cache_source_tag: "background_search".to_string(),
            freshness_threshold_hours: 4,
            kpi_cache_ttl_secs: 300,
            refresh_grace_ms: 2_000,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：`MOIRAI_CONFIG` 指定的 TOML 文件（可选）+ 环境变量覆盖
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("MOIRAI_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_toml_file(path.trim())?,
            _ => Self::default(),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 只用默认值 + 环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取，缺失字段使用默认值
    pub fn from_toml_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            AppError::Config(ConfigError::TomlParseFailed { source, .. }) => {
                AppError::Config(ConfigError::TomlParseFailed {
                    path: path.display().to_string(),
                    source,
                })
            }
            other => other,
        })
    }

    /// 从 TOML 字符串读取
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|source| {
            AppError::Config(ConfigError::TomlParseFailed {
                path: String::new(),
                source,
            })
        })
    }

    /// 应用环境变量覆盖，解析失败的值保留原值并记录警告
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("MOIRAI_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Ok(v) = std::env::var("MOIRAI_API_TOKEN") {
            self.api_token = Some(v).filter(|t| !t.is_empty());
        }
        if let Ok(v) = std::env::var("MOIRAI_SEARCH_LOCATION") {
            self.search_location = Some(v).filter(|l| !l.is_empty());
        }
        if let Ok(v) = std::env::var("MOIRAI_SEARCH_CATEGORY") {
            self.search_category = Some(v).filter(|c| !c.is_empty());
        }
        if let Ok(v) = std::env::var("MOIRAI_CACHE_SOURCE") {
            self.cache_source_tag = v;
        }
        override_parsed("MOIRAI_REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs);
        override_parsed("MOIRAI_SEARCH_LIMIT", &mut self.search_limit);
        override_parsed("MOIRAI_INTER_BATCH_DELAY_MS", &mut self.inter_batch_delay_ms);
        override_parsed("MOIRAI_SEARCH_WAIT_TIMEOUT_MS", &mut self.search_wait_timeout_ms);
        override_parsed("MOIRAI_WARM_START", &mut self.warm_start);
        override_parsed("MOIRAI_WARM_START_LIMIT", &mut self.warm_start_limit);
        override_parsed("MOIRAI_FRESHNESS_THRESHOLD_HOURS", &mut self.freshness_threshold_hours);
        override_parsed("MOIRAI_KPI_CACHE_TTL_SECS", &mut self.kpi_cache_ttl_secs);
        override_parsed("MOIRAI_REFRESH_GRACE_MS", &mut self.refresh_grace_ms);
        override_parsed("VERBOSE_LOGGING", &mut self.verbose_logging);
        self
    }

    /// 校验配置
    pub fn validate(&self) -> AppResult<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(AppError::invalid_config("api_base_url", "不能为空"));
        }
        if self.search_limit == 0 {
            return Err(AppError::invalid_config("search_limit", "必须大于 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::invalid_config("request_timeout_secs", "必须大于 0"));
        }
        if self.keyword_batches.is_empty() {
            return Err(AppError::invalid_config("keyword_batches", "至少需要一个批次"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    pub fn search_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.search_wait_timeout_ms)
    }

    pub fn refresh_grace(&self) -> Duration {
        Duration::from_millis(self.refresh_grace_ms)
    }

    pub fn freshness_threshold(&self) -> chrono::Duration {
        chrono::Duration::hours(self.freshness_threshold_hours as i64)
    }

    pub fn kpi_cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.kpi_cache_ttl_secs as i64)
    }
}

fn override_parsed<T: FromStr>(var_name: &str, slot: &mut T) {
    let Ok(raw) = std::env::var(var_name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => {
            let err = ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value: raw,
                expected_type: std::any::type_name::<T>().to_string(),
            };
            warn!("⚠️ {}，保留原值", err);
        }
    }
}
