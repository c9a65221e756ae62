//! 职位搜索服务 - 业务能力层
//!
//! 只负责"搜一个关键词"和"读缓存"能力，不关心批次顺序

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::clients::{JobApi, SearchQuery};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::job::{extract_record_list, parse_fetched_records, parse_records};
use crate::models::JobRecord;
use crate::utils::Clock;

/// 职位搜索服务
///
/// 职责：
/// - 调用搜索接口并归一化结果
/// - 只处理单个关键词
/// - 不持有语料库，不做去重
pub struct JobSearchService {
    api: Arc<dyn JobApi>,
    clock: Arc<dyn Clock>,
    location: Option<String>,
    category: Option<String>,
    limit: u32,
}

impl JobSearchService {
    /// 创建新的搜索服务
    pub fn new(api: Arc<dyn JobApi>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self {
            api,
            clock,
            location: config.search_location.clone(),
            category: config.search_category.clone(),
            limit: config.search_limit,
        }
    }

    /// 构建某个关键词的查询参数
    pub fn query_for(&self, keyword: &str) -> SearchQuery {
        SearchQuery {
            keyword: keyword.to_string(),
            location: self.location.clone(),
            category: self.category.clone(),
            limit: Some(self.limit),
        }
    }

    /// 搜索单个关键词
    ///
    /// # 返回
    /// 网络错误或非 2xx 返回 Err；响应里没有职位列表时按 0 条处理。
    /// 返回记录的入库时间均为当前时间。
    pub async fn search(&self, keyword: &str) -> AppResult<Vec<JobRecord>> {
        let query = self.query_for(keyword);
        let response = self.api.search_jobs(&query).await?;
        Ok(self.records_from(keyword, &response, parse_fetched_records))
    }

    /// 从远端缓存读取已保存的职位
    pub async fn load_cached(&self, limit: u32) -> AppResult<Vec<JobRecord>> {
        let response = self.api.list_cached_jobs(limit).await?;
        let records = self.records_from("cache", &response, parse_records);

        if let Some(total) = response.get("total").and_then(Value::as_u64) {
            debug!("远端缓存共 {} 条，本次载入 {} 条", total, records.len());
        }

        Ok(records)
    }

    fn records_from(
        &self,
        label: &str,
        response: &Value,
        parse: fn(&Value, DateTime<Utc>) -> Vec<JobRecord>,
    ) -> Vec<JobRecord> {
        if extract_record_list(response).is_none() {
            warn!("⚠️ [{}] 响应中没有职位列表，按 0 条处理", label);
            return Vec::new();
        }
        let records = parse(response, self.clock.now());
        debug!("[{}] 解析到 {} 条职位", label, records.len());
        records
    }
}
