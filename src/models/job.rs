//! 职位记录
//!
//! 外部搜索接口返回的职位数据字段并不统一，这里负责把它们归一化成 `JobRecord`。

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 合成 ID 的前缀
pub const SYNTHETIC_ID_PREFIX: &str = "syn-";

/// 响应中可能承载职位列表的字段（按优先级）
const RECORD_LIST_FIELDS: [&str; 3] = ["jobs", "results", "data"];

/// 缓存记录的入库时间字段
const INGESTION_FIELDS: [&str; 3] = ["cached_at", "fetched_at", "ingested_at"];

/// 职位发布时间字段，与入库时间无关
const POSTED_FIELDS: [&str; 2] = ["created_at", "posted_at"];

/// 归一化后的职位记录
///
/// 一旦进入语料库便不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// 进入本地语料的时间，新鲜度以此为准
    pub ingested_at: DateTime<Utc>,
    /// 职位发布时间（外部数据提供时）
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
    /// ID 是否为本地合成（外部数据缺少 id 时）
    #[serde(default)]
    pub provisional_id: bool,
}

fn default_active() -> bool {
    true
}

impl JobRecord {
    /// 从任意 JSON 对象构建记录
    ///
    /// # 参数
    /// - `item`: 外部返回的单条职位 JSON
    /// - `now`: 当前时间；缺少入库时间戳时使用，晚于它的时间戳截断为 `now`
    ///
    /// # 返回
    /// 既没有 id 也没有标题的记录视为不可用，返回 `None`
    pub fn from_value(item: &Value, now: DateTime<Utc>) -> Option<Self> {
        let obj = item.as_object()?;

        let title = string_field(item, &["title"]).unwrap_or_default();
        let company = company_field(item).unwrap_or_default();
        let location = string_field(item, &["location"]).unwrap_or_default();
        let external_id = id_field(item);

        if external_id.is_none() && title.is_empty() {
            return None;
        }

        let (id, provisional_id) = match external_id {
            Some(id) => (id, false),
            None => (synthesize_id(&title, &company, &location), true),
        };

        let is_active = ["is_active", "active"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_bool))
            .unwrap_or(true);

        let ingested_at = timestamp_field(item, &INGESTION_FIELDS)
            .map_or(now, |at| at.min(now));
        let posted_at = timestamp_field(item, &POSTED_FIELDS);

        Some(Self {
            id,
            title,
            company,
            location,
            skills: skills_field(item),
            is_active,
            ingested_at,
            posted_at,
            provisional_id,
        })
    }
}

/// 从响应中取出职位数组
///
/// 依次查找 `jobs` / `results` / `data`，都不存在或不是数组时返回 `None`
pub fn extract_record_list(response: &Value) -> Option<&[Value]> {
    RECORD_LIST_FIELDS
        .iter()
        .find_map(|field| response.get(*field).and_then(Value::as_array))
        .map(|v| v.as_slice())
}

/// 解析整个响应，返回可用的职位记录
///
/// 缺少列表字段时返回空 Vec（按零条处理，不报错）
pub fn parse_records(response: &Value, now: DateTime<Utc>) -> Vec<JobRecord> {
    extract_record_list(response)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| JobRecord::from_value(item, now))
                .collect()
        })
        .unwrap_or_default()
}

/// 解析刚刚抓取的搜索响应，入库时间一律为 `now`
///
/// 搜索接口返回的时间戳描述的是职位本身，不代表这次抓取
pub fn parse_fetched_records(response: &Value, now: DateTime<Utc>) -> Vec<JobRecord> {
    let mut records = parse_records(response, now);
    for record in &mut records {
        record.ingested_at = now;
    }
    records
}

/// 根据标题、公司、地点合成稳定的临时 ID
pub fn synthesize_id(title: &str, company: &str, location: &str) -> String {
    let key = [title, company, location]
        .iter()
        .map(|part| normalize(part))
        .collect::<Vec<_>>()
        .join("|");
    let hex = blake3::hash(key.as_bytes()).to_hex();
    format!("{}{}", SYNTHETIC_ID_PREFIX, &hex.as_str()[..16])
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn id_field(item: &Value) -> Option<String> {
    ["id", "job_id", "external_id"].iter().find_map(|key| match item.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn string_field(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        item.get(*key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
    })
}

fn company_field(item: &Value) -> Option<String> {
    match item.get("company") {
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(Value::Object(obj)) => obj.get("name").and_then(Value::as_str).map(|s| s.trim().to_string()),
        _ => string_field(item, &["company_name"]),
    }
}

fn skills_field(item: &Value) -> Vec<String> {
    let raw = ["skills", "required_skills"].iter().find_map(|key| item.get(*key));
    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn timestamp_field(item: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str).and_then(parse_timestamp))
}

/// 解析 RFC 3339 或不带时区的 ISO 时间（按 UTC 处理）
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_from_value_full_record() {
        let item = json!({
            "id": "job-42",
            "title": "Backend Developer",
            "company": "Acme",
            "location": "CDMX",
            "skills": ["Rust", "SQL", ""],
            "is_active": false,
            "created_at": "2025-02-28T10:00:00Z"
        });

        let record = JobRecord::from_value(&item, now()).unwrap();
        assert_eq!(record.id, "job-42");
        assert_eq!(record.skills, vec!["Rust", "SQL"]);
        assert!(!record.is_active);
        assert!(!record.provisional_id);
        assert_eq!(record.ingested_at, now());
        assert_eq!(record.posted_at, Some(Utc.with_ymd_and_hms(2025, 2, 28, 10, 0, 0).unwrap()));
    }

    #[test]
    fn test_from_value_aliases() {
        let item = json!({
            "job_id": 77,
            "title": "Data Analyst",
            "company": { "name": "Globex" },
            "required_skills": "python, pandas ,",
            "cached_at": "2025-02-27T08:30:00.123456"
        });

        let record = JobRecord::from_value(&item, now()).unwrap();
        assert_eq!(record.id, "77");
        assert_eq!(record.company, "Globex");
        assert_eq!(record.skills, vec!["python", "pandas"]);
        assert!(record.is_active);
        assert_eq!(record.location, "");
        assert_eq!(
            record.ingested_at,
            Utc.with_ymd_and_hms(2025, 2, 27, 8, 30, 0).unwrap() + chrono::Duration::microseconds(123_456)
        );
        assert!(record.posted_at.is_none());
    }

    #[test]
    fn test_cached_stamp_preferred_and_future_clamped() {
        let item = json!({
            "id": "9",
            "title": "SRE",
            "created_at": "2024-11-02T00:00:00Z",
            "cached_at": "2025-03-01T09:00:00Z"
        });
        let record = JobRecord::from_value(&item, now()).unwrap();
        assert_eq!(record.ingested_at, Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());

        let future = json!({ "id": "10", "title": "SRE", "fetched_at": "2025-03-02T00:00:00Z" });
        let record = JobRecord::from_value(&future, now()).unwrap();
        assert_eq!(record.ingested_at, now());
    }

    #[test]
    fn test_fetched_records_stamped_now() {
        let response = json!({ "jobs": [{
            "id": "1",
            "title": "Dev",
            "created_at": "2025-01-15T09:00:00Z",
            "cached_at": "2025-02-01T09:00:00Z"
        }] });
        let records = parse_fetched_records(&response, now());
        assert_eq!(records[0].ingested_at, now());
        assert_eq!(records[0].posted_at, Some(Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()));
    }

    #[test]
    fn test_missing_id_synthesizes_stable_id() {
        let a = json!({ "title": "QA  Engineer", "company": "Initech", "location": "GDL" });
        let b = json!({ "title": "qa engineer", "company": "INITECH", "location": " gdl " });

        let ra = JobRecord::from_value(&a, now()).unwrap();
        let rb = JobRecord::from_value(&b, now()).unwrap();

        assert!(ra.provisional_id);
        assert!(ra.id.starts_with(SYNTHETIC_ID_PREFIX));
        assert_eq!(ra.id, rb.id);
        assert_eq!(ra.ingested_at, now());
    }

    #[test]
    fn test_unusable_record_dropped() {
        assert!(JobRecord::from_value(&json!({ "company": "Nobody" }), now()).is_none());
        assert!(JobRecord::from_value(&json!("not an object"), now()).is_none());
    }

    #[test]
    fn test_parse_records_missing_list_is_empty() {
        assert!(parse_records(&json!({ "message": "ok" }), now()).is_empty());
        assert!(parse_records(&json!({ "jobs": null }), now()).is_empty());

        let response = json!({ "results": [{ "id": "1", "title": "A" }, { "bogus": true }] });
        let records = parse_records(&response, now());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "1");
    }
}
