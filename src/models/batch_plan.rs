use serde::{Deserialize, Serialize};

/// 关键词批次计划
///
/// 每个批次是一组相关的搜索关键词（例如一个技术方向），运行期间只读，
/// 顺序固定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchPlan {
    batches: Vec<Vec<String>>,
}

impl BatchPlan {
    /// 从批次列表创建计划，丢弃空白关键词和空批次
    pub fn new<B, K>(batches: B) -> Self
    where
        B: IntoIterator<Item = K>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        let batches = batches
            .into_iter()
            .map(|batch| {
                batch
                    .into_iter()
                    .map(Into::into)
                    .map(|kw: String| kw.trim().to_string())
                    .filter(|kw| !kw.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|batch| !batch.is_empty())
            .collect();
        Self { batches }
    }

    /// 默认的技术方向批次
    pub fn default_plan() -> Self {
        Self::new([
            vec!["python", "django", "fastapi"],
            vec!["javascript", "react", "node.js"],
            vec!["java", "spring boot", "kotlin"],
            vec!["data science", "machine learning", "sql"],
            vec!["devops", "docker", "aws"],
            vec!["frontend", "ux ui", "typescript"],
            vec!["practicante", "becario", "trainee"],
        ])
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[String]> {
        self.batches.iter().map(|b| b.as_slice())
    }

    /// 全部关键词数量
    pub fn keyword_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }
}

impl Default for BatchPlan {
    fn default() -> Self {
        Self::default_plan()
    }
}
