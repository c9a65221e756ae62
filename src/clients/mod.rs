//! 外部 API 客户端
//!
//! 通过 trait 暴露能力，上层只依赖 trait，测试中可替换为内存实现。

pub mod moirai_client;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppResult;
use crate::models::JobRecord;

pub use moirai_client::MoiraiClient;

/// 搜索请求参数
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchQuery {
    pub keyword: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// 写入缓存的请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStoreRequest {
    pub jobs: Vec<JobRecord>,
    pub keyword: String,
    pub source: String,
}

/// 职位搜索与缓存接口
#[async_trait]
pub trait JobApi: Send + Sync {
    /// 按关键词搜索，返回原始 JSON
    async fn search_jobs(&self, query: &SearchQuery) -> AppResult<Value>;

    /// 写入缓存，返回保存条数
    async fn store_cached_jobs(&self, request: &CacheStoreRequest) -> AppResult<u64>;

    /// 读取缓存，返回原始 JSON（`{ jobs, total }`）
    async fn list_cached_jobs(&self, limit: u32) -> AppResult<Value>;
}

/// 平台统计接口（学生、企业、申请数量）
#[async_trait]
pub trait PlatformStatsApi: Send + Sync {
    async fn count_students(&self) -> AppResult<u64>;
    async fn count_companies(&self) -> AppResult<u64>;
    async fn count_applications(&self) -> AppResult<u64>;
}
