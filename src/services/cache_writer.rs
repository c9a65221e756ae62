//! 缓存写入服务 - 业务能力层
//!
//! 只负责把新增职位写回远端缓存，发出即不管

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::clients::{CacheStoreRequest, JobApi};
use crate::models::JobRecord;

/// 缓存写入服务
///
/// 写入失败只记录日志，不重试、不向上传播、不阻塞下一次搜索。
pub struct CacheWriter {
    api: Arc<dyn JobApi>,
    source_tag: String,
}

impl CacheWriter {
    pub fn new(api: Arc<dyn JobApi>, source_tag: impl Into<String>) -> Self {
        Self {
            api,
            source_tag: source_tag.into(),
        }
    }

    /// 在后台任务中写入缓存
    ///
    /// 返回的 JoinHandle 调用方可以直接丢弃；空记录不发请求。
    pub fn persist(&self, keyword: &str, records: Vec<JobRecord>) -> Option<JoinHandle<()>> {
        if records.is_empty() {
            return None;
        }

        let api = self.api.clone();
        let request = CacheStoreRequest {
            jobs: records,
            keyword: keyword.to_string(),
            source: self.source_tag.clone(),
        };

        Some(tokio::spawn(async move {
            match api.store_cached_jobs(&request).await {
                Ok(saved) => debug!(
                    "💾 [{}] 已写入缓存 {} 条 (提交 {} 条)",
                    request.keyword,
                    saved,
                    request.jobs.len()
                ),
                Err(e) => warn!("⚠️ [{}] 写入缓存失败: {}", request.keyword, e),
            }
        }))
    }
}
