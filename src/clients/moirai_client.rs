/// MoirAI 后端 API 客户端
///
/// 封装所有与后端 REST API 相关的调用逻辑
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use super::{CacheStoreRequest, JobApi, PlatformStatsApi, SearchQuery};
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};

const SEARCH_ENDPOINT: &str = "jobs/search";
const CACHE_STORE_ENDPOINT: &str = "jobs/cache/store";
const CACHE_LIST_ENDPOINT: &str = "jobs/cache/list";
const STUDENTS_COUNT_ENDPOINT: &str = "students/count";
const COMPANIES_COUNT_ENDPOINT: &str = "companies/count";
const APPLICATIONS_COUNT_ENDPOINT: &str = "applications/count";

/// MoirAI API 客户端
pub struct MoiraiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl MoiraiClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::api_request_failed("client-builder", e))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// 发送请求并把响应解析为 JSON
    async fn send_json(&self, endpoint: &str, request: RequestBuilder) -> AppResult<Value> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))?;

        if !status.is_success() {
            return Err(AppError::api_bad_status(endpoint, status.as_u16(), body));
        }

        debug!("{} 响应 {} 字节", endpoint, body.len());

        serde_json::from_str(&body).map_err(|source| {
            AppError::Api(ApiError::JsonParseFailed {
                endpoint: endpoint.to_string(),
                source,
            })
        })
    }

    async fn fetch_count(&self, endpoint: &str) -> AppResult<u64> {
        let value = self.send_json(endpoint, self.http.get(self.url(endpoint))).await?;
        extract_count(&value).ok_or_else(|| AppError::api_missing_field(endpoint, "total"))
    }
}

#[async_trait]
impl JobApi for MoiraiClient {
    async fn search_jobs(&self, query: &SearchQuery) -> AppResult<Value> {
        let request = self.http.get(self.url(SEARCH_ENDPOINT)).query(query);
        self.send_json(SEARCH_ENDPOINT, request).await
    }

    async fn store_cached_jobs(&self, request: &CacheStoreRequest) -> AppResult<u64> {
        let builder = self.http.post(self.url(CACHE_STORE_ENDPOINT)).json(request);
        let value = self.send_json(CACHE_STORE_ENDPOINT, builder).await?;
        Ok(["saved", "count", "total"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_u64))
            .unwrap_or(0))
    }

    async fn list_cached_jobs(&self, limit: u32) -> AppResult<Value> {
        let request = self
            .http
            .get(self.url(CACHE_LIST_ENDPOINT))
            .query(&[("limit", limit)]);
        self.send_json(CACHE_LIST_ENDPOINT, request).await
    }
}

#[async_trait]
impl PlatformStatsApi for MoiraiClient {
    async fn count_students(&self) -> AppResult<u64> {
        self.fetch_count(STUDENTS_COUNT_ENDPOINT).await
    }

    async fn count_companies(&self) -> AppResult<u64> {
        self.fetch_count(COMPANIES_COUNT_ENDPOINT).await
    }

    async fn count_applications(&self) -> AppResult<u64> {
        self.fetch_count(APPLICATIONS_COUNT_ENDPOINT).await
    }
}

/// 统计接口返回 `{ total }` 或 `{ count }`
fn extract_count(value: &Value) -> Option<u64> {
    ["total", "count"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_u64))
}
