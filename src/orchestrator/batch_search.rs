//! 后台批量搜索编排器 - 编排层
//!
//! ## 职责
//!
//! 按批次顺序依次搜索关键词，把结果去重后放进内存语料库，
//! 新增记录写回远端缓存，并通过事件总线通知进度。
//!
//! ## 运行规则
//!
//! 1. **串行搜索**：每次搜索前先取得唯一的搜索许可；等待超时后不持许可继续
//! 2. **批次有序**：批次、关键词都按计划顺序处理，失败跳过不重排
//! 3. **失败不中断**：单个关键词失败只记日志，预热失败从空语料开始
//! 4. **协作式停止**：`stop()` 不打断在途请求，它返回的记录照常合并；
//!    等待许可期间被停止或被新一轮运行取代时，不再发起搜索
//!
//! ```text
//! Idle → RunningBatch(0) → 批间等待 → RunningBatch(1) → ... → Idle(Complete)
//!              └──────────── stop() ────────────→ Stopped
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{watch, Semaphore, SemaphorePermit};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::clients::JobApi;
use crate::config::Config;
use crate::models::{BatchPlan, JobRecord, SearchEvent, SearchProgress};
use crate::services::{CacheWriter, EventBus, JobSearchService};
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::utils::Clock;

/// 去重后的职位语料库
#[derive(Debug, Default)]
struct Corpus {
    records: Vec<JobRecord>,
    ids: HashSet<String>,
}

impl Corpus {
    /// 合并记录，返回真正新增的部分（重复 id 直接丢弃，不合并字段）
    fn merge(&mut self, incoming: Vec<JobRecord>) -> Vec<JobRecord> {
        let mut added = Vec::new();
        for record in incoming {
            if self.ids.insert(record.id.clone()) {
                self.records.push(record.clone());
                added.push(record);
            }
        }
        added
    }

    fn clear(&mut self) {
        self.records.clear();
        self.ids.clear();
    }
}

/// 在途搜索计数守卫，drop 时计数减一
struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 一次运行的结束方式
enum RunOutcome {
    Complete,
    Stopped,
}

/// 后台批量搜索编排器
pub struct BatchSearchOrchestrator {
    search: JobSearchService,
    cache_writer: CacheWriter,
    events: Arc<EventBus>,
    plan: BatchPlan,
    inter_batch_delay: Duration,
    search_wait_timeout: Duration,
    warm_start: bool,
    warm_start_limit: u32,

    /// 运行标志；`generation` 与 `batch_index` 的写入都在它的锁内完成
    running: watch::Sender<bool>,
    search_permit: Semaphore,
    in_flight: AtomicUsize,
    generation: AtomicU64,
    batch_index: AtomicUsize,
    corpus: RwLock<Corpus>,
}

impl BatchSearchOrchestrator {
    /// 创建编排器
    pub fn new(
        api: Arc<dyn JobApi>,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
        config: &Config,
    ) -> Self {
        Self {
            search: JobSearchService::new(api.clone(), clock, config),
            cache_writer: CacheWriter::new(api, config.cache_source_tag.clone()),
            events,
            plan: config.keyword_batches.clone(),
            inter_batch_delay: config.inter_batch_delay(),
            search_wait_timeout: config.search_wait_timeout(),
            warm_start: config.warm_start,
            warm_start_limit: config.warm_start_limit,
            running: watch::Sender::new(false),
            search_permit: Semaphore::new(1),
            in_flight: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
            batch_index: AtomicUsize::new(0),
            corpus: RwLock::new(Corpus::default()),
        }
    }

    /// 启动后台搜索
    ///
    /// 已在运行时不做任何事（记录警告），返回 `false`。
    /// 立即返回，完成时发出 `RunComplete` 事件。
    pub fn start(self: &Arc<Self>) -> bool {
        let mut generation = 0;
        let started = self.running.send_if_modified(|running| {
            if *running {
                return false;
            }
            *running = true;
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            self.batch_index.store(0, Ordering::SeqCst);
            true
        });

        if !started {
            warn!("⚠️ 后台搜索已在运行，忽略本次 start()");
            return false;
        }

        info!("🚀 后台搜索启动 (第 {} 次运行, {} 个批次)", generation, self.plan.len());
        self.events.emit(SearchEvent::RunStarted { generation });

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run(generation).await;
        });

        true
    }

    /// 停止后台搜索
    ///
    /// 不中断在途请求；下一个关键词/批次不会再开始。可重复调用。
    pub fn stop(&self) {
        let was_running = self.running.send_if_modified(|running| std::mem::replace(running, false));
        if was_running {
            info!("⏹️ 已请求停止后台搜索");
        }
    }

    /// 当前语料库快照
    pub fn get_results(&self) -> Vec<JobRecord> {
        self.corpus.read().records.clone()
    }

    /// 当前进度
    pub fn get_progress(&self) -> SearchProgress {
        SearchProgress::new(
            self.batch_index.load(Ordering::SeqCst),
            self.plan.len(),
            self.corpus.read().records.len(),
            self.is_running(),
            self.is_searching(),
        )
    }

    /// 清空语料库并把批次索引归零
    ///
    /// 运行中拒绝清空，返回 `false`；需要先 `stop()`。
    pub fn clear(&self) -> bool {
        if self.is_running() {
            warn!("⚠️ 后台搜索运行中，拒绝清空语料库");
            return false;
        }
        self.corpus.write().clear();
        self.running.send_if_modified(|running| {
            if !*running {
                self.batch_index.store(0, Ordering::SeqCst);
            }
            false
        });
        info!("🧹 语料库已清空");
        true
    }

    /// 直接合并一批记录，返回新增部分
    pub fn merge_records(&self, records: Vec<JobRecord>) -> Vec<JobRecord> {
        self.corpus.write().merge(records)
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    pub fn is_searching(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn total_jobs(&self) -> usize {
        self.corpus.read().records.len()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// 等待运行结束，超时返回 `false`
    pub async fn wait_until_idle(&self, limit: Duration) -> bool {
        let mut rx = self.running.subscribe();
        timeout(limit, async move { rx.wait_for(|running| !*running).await.is_ok() })
            .await
            .unwrap_or(false)
    }

    // ========== 内部流程 ==========

    fn is_active(&self, generation: u64) -> bool {
        self.is_running() && self.generation.load(Ordering::SeqCst) == generation
    }

    /// 记录批次完成；本次运行已被停止或取代时不写入，返回 `false`
    fn advance_batch(&self, generation: u64, completed: usize) -> bool {
        let mut advanced = false;
        self.running.send_if_modified(|running| {
            if *running && self.generation.load(Ordering::SeqCst) == generation {
                self.batch_index.store(completed, Ordering::SeqCst);
                advanced = true;
            }
            false
        });
        advanced
    }

    async fn run(&self, generation: u64) {
        if self.warm_start {
            self.load_from_cache().await;
        }

        let outcome = self.run_batches(generation).await;
        let total = self.total_jobs();

        match outcome {
            RunOutcome::Complete => {
                // 只有本次运行仍是当前运行时才落回 Idle
                self.running.send_if_modified(|running| {
                    if *running && self.generation.load(Ordering::SeqCst) == generation {
                        *running = false;
                        true
                    } else {
                        false
                    }
                });
                info!("🎉 后台搜索完成，共 {} 条职位", total);
                self.events.emit(SearchEvent::RunComplete {
                    records: self.get_results(),
                    total,
                });
            }
            RunOutcome::Stopped => {
                info!("⏹️ 后台搜索已停止，当前 {} 条职位", total);
                self.events.emit(SearchEvent::RunStopped { total });
            }
        }
    }

    async fn run_batches(&self, generation: u64) -> RunOutcome {
        let total_batches = self.plan.len();

        for (index, keywords) in self.plan.iter().enumerate() {
            if !self.is_active(generation) {
                return RunOutcome::Stopped;
            }

            log_batch_start(index + 1, total_batches, keywords);
            self.events.emit(SearchEvent::BatchStarted {
                index,
                total: total_batches,
                keywords: keywords.to_vec(),
            });

            let mut added = 0;
            for keyword in keywords {
                if !self.is_active(generation) {
                    return RunOutcome::Stopped;
                }
                match self.search_keyword(generation, keyword).await {
                    Some(count) => added += count,
                    None => return RunOutcome::Stopped,
                }
            }

            if !self.advance_batch(generation, index + 1) {
                return RunOutcome::Stopped;
            }
            log_batch_complete(index + 1, added, self.total_jobs());

            if index + 1 < total_batches && !self.pause_between_batches().await {
                return RunOutcome::Stopped;
            }
        }

        RunOutcome::Complete
    }

    /// 搜索单个关键词并合并结果，返回新增条数
    ///
    /// 等待搜索许可期间本次运行失效时不发起搜索，返回 `None`
    async fn search_keyword(&self, generation: u64, keyword: &str) -> Option<usize> {
        let _permit = self.acquire_search_permit().await;
        if !self.is_active(generation) {
            debug!("[{}] 等待期间运行已停止，跳过搜索", keyword);
            return None;
        }

        let result = {
            let _guard = InFlightGuard::enter(&self.in_flight);
            debug!("🔍 搜索关键词: {}", keyword);
            self.search.search(keyword).await
        };

        match result {
            Ok(records) => {
                let fetched = records.len();
                let added = self.merge_records(records);
                let total = self.total_jobs();

                if added.is_empty() {
                    info!("[{}] 无新增职位 (返回 {} 条)", keyword, fetched);
                } else {
                    info!("[{}] ✓ 新增 {} 条职位，累计 {} 条", keyword, added.len(), total);
                    self.cache_writer.persist(keyword, added.clone());
                }

                let count = added.len();
                self.events.emit(SearchEvent::RecordsAdded {
                    keyword: keyword.to_string(),
                    records: added,
                    total,
                });
                Some(count)
            }
            Err(e) => {
                warn!("⚠️ [{}] 搜索失败，跳过: {}", keyword, e);
                self.events.emit(SearchEvent::KeywordFailed {
                    keyword: keyword.to_string(),
                    error: e.to_string(),
                });
                Some(0)
            }
        }
    }

    /// 等待在途搜索完成并取得搜索许可；超时后不持许可继续执行
    async fn acquire_search_permit(&self) -> Option<SemaphorePermit<'_>> {
        match timeout(self.search_wait_timeout, self.search_permit.acquire()).await {
            Ok(Ok(permit)) => Some(permit),
            Ok(Err(_)) => None,
            Err(_) => {
                warn!(
                    "⚠️ 等待上一个搜索超时 ({:?})，继续执行",
                    self.search_wait_timeout
                );
                None
            }
        }
    }

    /// 批间等待；期间被 stop() 时立即返回 `false`
    async fn pause_between_batches(&self) -> bool {
        debug!("⏳ 批次间等待 {:?}", self.inter_batch_delay);
        let mut rx = self.running.subscribe();
        tokio::select! {
            _ = sleep(self.inter_batch_delay) => true,
            _ = async move { rx.wait_for(|running| !*running).await.is_ok() } => false,
        }
    }

    /// 预热：读取远端缓存，失败时从空语料开始
    async fn load_from_cache(&self) {
        match self.search.load_cached(self.warm_start_limit).await {
            Ok(records) => {
                let added = self.merge_records(records);
                let total = self.total_jobs();
                info!("📥 从缓存载入 {} 条职位，累计 {} 条", added.len(), total);
                self.events.emit(SearchEvent::CacheLoaded {
                    records: added,
                    total,
                });
            }
            Err(e) => {
                warn!("⚠️ 读取缓存失败，从空语料开始: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{CacheStoreRequest, SearchQuery};
    use crate::error::{AppError, AppResult};
    use crate::utils::SystemClock;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    /// 内存版 API：按关键词返回固定响应，记录并发情况
    #[derive(Default)]
    struct ScriptedApi {
        responses: HashMap<String, AppResult<Value>>,
        latency: Duration,
        cache: Option<Value>,
        active: AtomicUsize,
        max_active: AtomicUsize,
        searched: Mutex<Vec<String>>,
        stored: Mutex<Vec<CacheStoreRequest>>,
    }

    impl ScriptedApi {
        fn respond(mut self, keyword: &str, ids: &[&str]) -> Self {
            let jobs: Vec<Value> = ids
                .iter()
                .map(|id| json!({ "id": id, "title": format!("job {}", id), "is_active": true }))
                .collect();
            self.responses.insert(keyword.to_string(), Ok(json!({ "jobs": jobs })));
            self
        }

        fn fail(mut self, keyword: &str) -> Self {
            self.responses.insert(
                keyword.to_string(),
                Err(AppError::api_bad_status("jobs/search", 500, "down")),
            );
            self
        }
    }

    #[async_trait]
    impl JobApi for ScriptedApi {
        async fn search_jobs(&self, query: &SearchQuery) -> AppResult<Value> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.searched.lock().push(query.keyword.clone());

            if !self.latency.is_zero() {
                sleep(self.latency).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            match self.responses.get(&query.keyword) {
                Some(Ok(v)) => Ok(v.clone()),
                Some(Err(_)) => Err(AppError::api_bad_status("jobs/search", 500, "down")),
                None => Ok(json!({})),
            }
        }

        async fn store_cached_jobs(&self, request: &CacheStoreRequest) -> AppResult<u64> {
            self.stored.lock().push(request.clone());
            Ok(request.jobs.len() as u64)
        }

        async fn list_cached_jobs(&self, _limit: u32) -> AppResult<Value> {
            self.cache
                .clone()
                .ok_or_else(|| AppError::api_bad_status("jobs/cache/list", 503, "unavailable"))
        }
    }

    fn test_config(plan: Vec<Vec<&str>>) -> Config {
        Config {
            keyword_batches: BatchPlan::new(plan),
            inter_batch_delay_ms: 20,
            search_wait_timeout_ms: 200,
            warm_start: false,
            ..Config::default()
        }
    }

    fn build(api: ScriptedApi, config: &Config) -> (Arc<BatchSearchOrchestrator>, Arc<ScriptedApi>) {
        let api = Arc::new(api);
        let orch = Arc::new(BatchSearchOrchestrator::new(
            api.clone(),
            Arc::new(SystemClock),
            Arc::new(EventBus::new()),
            config,
        ));
        (orch, api)
    }

    async fn wait_until_searching(orch: &BatchSearchOrchestrator) {
        timeout(Duration::from_secs(2), async {
            while !orch.is_searching() {
                sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("search should start");
    }

    fn record(id: &str) -> JobRecord {
        JobRecord {
            id: id.to_string(),
            title: "seed".to_string(),
            company: String::new(),
            location: String::new(),
            skills: vec![],
            is_active: true,
            ingested_at: Utc::now(),
            posted_at: None,
            provisional_id: false,
        }
    }

    #[test]
    fn test_corpus_merge_dedups() {
        let mut corpus = Corpus::default();
        let added = corpus.merge(vec![record("1"), record("2"), record("1")]);
        assert_eq!(added.len(), 2);
        let added = corpus.merge(vec![record("2"), record("3")]);
        assert_eq!(added.len(), 1);
        assert_eq!(corpus.records.len(), 3);
    }

    #[tokio::test]
    async fn test_run_completes_and_dedups() {
        let api = ScriptedApi::default()
            .respond("a", &["1", "2"])
            .respond("b", &["2", "3"])
            .respond("c", &["3", "1"]);
        let (orch, api) = build(api, &test_config(vec![vec!["a", "b"], vec!["c"]]));

        assert!(orch.start());
        assert!(orch.wait_until_idle(Duration::from_secs(5)).await);

        let ids: Vec<String> = orch.get_results().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(*api.searched.lock(), vec!["a", "b", "c"]);

        let progress = orch.get_progress();
        assert_eq!(progress.current_batch, 2);
        assert_eq!(progress.percentage, 100.0);
        assert!(!progress.is_running);
        assert!(!progress.is_searching);
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let api = ScriptedApi {
            latency: Duration::from_millis(50),
            ..ScriptedApi::default()
        };
        let (orch, _) = build(api, &test_config(vec![vec!["a"]]));

        assert!(orch.start());
        assert!(!orch.start());
        assert!(orch.wait_until_idle(Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_keyword_failure_does_not_abort_run() {
        let api = ScriptedApi::default()
            .fail("a")
            .respond("b", &["1"]);
        let (orch, api) = build(api, &test_config(vec![vec!["a", "b"]]));

        orch.start();
        assert!(orch.wait_until_idle(Duration::from_secs(5)).await);

        assert_eq!(orch.total_jobs(), 1);
        assert_eq!(api.searched.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_never_more_than_one_search_in_flight() {
        let api = ScriptedApi {
            latency: Duration::from_millis(10),
            ..ScriptedApi::default()
        }
        .respond("a", &["1"])
        .respond("b", &["2"])
        .respond("c", &["3"])
        .respond("d", &["4"]);
        let (orch, api) = build(api, &test_config(vec![vec!["a", "b"], vec!["c", "d"]]));

        orch.start();
        assert!(orch.wait_until_idle(Duration::from_secs(5)).await);

        assert_eq!(api.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_keeps_merged_records() {
        let api = ScriptedApi {
            latency: Duration::from_millis(30),
            ..ScriptedApi::default()
        }
        .respond("a", &["1"])
        .respond("b", &["2"])
        .respond("c", &["3"]);
        let config = Config {
            inter_batch_delay_ms: 5_000,
            ..test_config(vec![vec!["a"], vec!["b"], vec!["c"]])
        };
        let (orch, api) = build(api, &config);

        let mut rx = orch.events().subscribe();
        orch.start();

        // 第一批完成后在批间等待中停止
        loop {
            if let SearchEvent::RecordsAdded { .. } = rx.recv().await.unwrap() {
                break;
            }
        }
        let before = orch.get_results();
        orch.stop();
        orch.stop();

        assert!(orch.wait_until_idle(Duration::from_secs(1)).await);
        loop {
            if let SearchEvent::RunStopped { total } = rx.recv().await.unwrap() {
                assert_eq!(total, 1);
                break;
            }
        }

        let after = orch.get_results();
        assert!(before.iter().all(|r| after.contains(r)));
        assert_eq!(*api.searched.lock(), vec!["a"]);
        assert!(orch.get_progress().current_batch < 3);
    }

    #[tokio::test]
    async fn test_warm_start_loads_cache_and_dedups() {
        let api = ScriptedApi {
            cache: Some(json!({ "jobs": [{ "id": "1", "title": "cached" }], "total": 1 })),
            ..ScriptedApi::default()
        }
        .respond("a", &["1", "2"]);
        let config = Config {
            warm_start: true,
            ..test_config(vec![vec!["a"]])
        };
        let (orch, _) = build(api, &config);

        let mut rx = orch.events().subscribe();
        orch.start();
        assert!(orch.wait_until_idle(Duration::from_secs(5)).await);

        assert_eq!(orch.total_jobs(), 2);
        let mut saw_cache = false;
        while let Ok(event) = rx.try_recv() {
            if let SearchEvent::CacheLoaded { total, .. } = event {
                assert_eq!(total, 1);
                saw_cache = true;
            }
        }
        assert!(saw_cache);
    }

    #[tokio::test]
    async fn test_warm_start_failure_is_not_fatal() {
        let api = ScriptedApi::default().respond("a", &["1"]);
        let config = Config {
            warm_start: true,
            ..test_config(vec![vec!["a"]])
        };
        let (orch, _) = build(api, &config);

        orch.start();
        assert!(orch.wait_until_idle(Duration::from_secs(5)).await);
        assert_eq!(orch.total_jobs(), 1);
    }

    #[tokio::test]
    async fn test_new_records_are_persisted() {
        let api = ScriptedApi::default()
            .respond("a", &["1", "2"])
            .respond("b", &["1"]);
        let (orch, api) = build(api, &test_config(vec![vec!["a", "b"]]));

        orch.start();
        assert!(orch.wait_until_idle(Duration::from_secs(5)).await);
        sleep(Duration::from_millis(50)).await;

        let stored = api.stored.lock();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].keyword, "a");
        assert_eq!(stored[0].jobs.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_refused_while_running() {
        let api = ScriptedApi {
            latency: Duration::from_millis(50),
            ..ScriptedApi::default()
        }
        .respond("a", &["1"]);
        let (orch, _) = build(api, &test_config(vec![vec!["a"]]));

        orch.start();
        assert!(!orch.clear());
        assert!(orch.wait_until_idle(Duration::from_secs(5)).await);

        assert_eq!(orch.total_jobs(), 1);
        assert!(orch.clear());
        assert_eq!(orch.total_jobs(), 0);
        assert_eq!(orch.get_progress().current_batch, 0);
    }

    #[tokio::test]
    async fn test_restart_waits_for_previous_search() {
        let api = ScriptedApi {
            latency: Duration::from_millis(100),
            ..ScriptedApi::default()
        }
        .respond("a", &["1"]);
        let config = Config {
            search_wait_timeout_ms: 2_000,
            ..test_config(vec![vec!["a"]])
        };
        let (orch, api) = build(api, &config);

        orch.start();
        wait_until_searching(&orch).await;
        orch.stop();
        assert!(orch.start());
        assert!(orch.wait_until_idle(Duration::from_secs(5)).await);

        assert_eq!(*api.searched.lock(), vec!["a", "a"]);
        assert_eq!(api.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_restart_proceeds_after_wait_timeout() {
        let api = ScriptedApi {
            latency: Duration::from_millis(300),
            ..ScriptedApi::default()
        }
        .respond("a", &["1"]);
        let config = Config {
            search_wait_timeout_ms: 50,
            ..test_config(vec![vec!["a"]])
        };
        let (orch, api) = build(api, &config);

        orch.start();
        wait_until_searching(&orch).await;
        orch.stop();
        assert!(orch.start());
        assert!(orch.wait_until_idle(Duration::from_secs(5)).await);

        // 旧搜索超过等待上限，新一轮不再等待
        assert_eq!(*api.searched.lock(), vec!["a", "a"]);
        assert_eq!(api.max_active.load(Ordering::SeqCst), 2);
        assert_eq!(orch.total_jobs(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_superseded_run_never_searches() {
        let api = ScriptedApi {
            latency: Duration::from_millis(300),
            ..ScriptedApi::default()
        }
        .respond("a", &["1"]);
        let config = Config {
            search_wait_timeout_ms: 2_000,
            ..test_config(vec![vec!["a"]])
        };
        let (orch, api) = build(api, &config);

        orch.start();
        wait_until_searching(&orch).await;
        orch.stop();
        assert!(orch.start());
        sleep(Duration::from_millis(50)).await;
        orch.stop();
        assert!(orch.start());
        assert!(orch.wait_until_idle(Duration::from_secs(5)).await);

        // 第一轮的在途搜索 + 最后一轮的搜索；中间被取代的一轮不搜索
        assert_eq!(*api.searched.lock(), vec!["a", "a"]);
        assert_eq!(api.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_superseded_run_cannot_advance_batch_index() {
        let api = ScriptedApi {
            latency: Duration::from_millis(200),
            ..ScriptedApi::default()
        }
        .respond("a", &["1"])
        .respond("b", &["2"]);
        let config = Config {
            search_wait_timeout_ms: 2_000,
            ..test_config(vec![vec!["a"], vec!["b"]])
        };
        let (orch, _) = build(api, &config);

        orch.start();
        let stale = orch.generation.load(Ordering::SeqCst);
        wait_until_searching(&orch).await;
        orch.stop();
        orch.start();

        assert!(!orch.advance_batch(stale, 1));
        assert_eq!(orch.get_progress().current_batch, 0);

        assert!(orch.wait_until_idle(Duration::from_secs(5)).await);
        assert_eq!(orch.get_progress().current_batch, 2);
    }

    #[tokio::test]
    async fn test_batch_index_never_decreases_during_run() {
        let api = ScriptedApi {
            latency: Duration::from_millis(10),
            ..ScriptedApi::default()
        }
        .respond("a", &["1"])
        .respond("b", &["2"])
        .respond("c", &["3"]);
        let (orch, _) = build(api, &test_config(vec![vec!["a"], vec!["b"], vec!["c"]]));

        let started = Arc::new(Mutex::new(Vec::new()));
        {
            let started = started.clone();
            orch.events().register(Arc::new(move |e: &SearchEvent| {
                if let SearchEvent::BatchStarted { index, .. } = e {
                    started.lock().push(*index);
                }
            }));
        }

        assert!(orch.start());
        let sampler = {
            let orch = orch.clone();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                while orch.is_running() {
                    seen.push(orch.get_progress().current_batch);
                    sleep(Duration::from_millis(2)).await;
                }
                seen.push(orch.get_progress().current_batch);
                seen
            })
        };

        let seen = sampler.await.unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&3));
        assert_eq!(*started.lock(), vec![0, 1, 2]);
    }
}
