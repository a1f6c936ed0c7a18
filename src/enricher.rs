//! Per-entry enrichment: keyword extraction and 3-point summaries.
//!
//! The pipeline depends only on the [`Summarizer`] capability. The remote
//! implementation talks to a chat-completions endpoint; the local one is a
//! deterministic heuristic. [`ResilientSummarizer`] retries the remote once
//! and then falls back, so enrichment failures never surface past this
//! module.

use crate::config::ReportConfig;
use crate::sanitize::{ensure_terminal_punct, sentence_bounded_truncate, truncate_chars, truncate_with_ellipsis};
use crate::types::{Candidate, NewsEntry, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Summary point markers, applied in a deterministic cycle.
pub const SUMMARY_MARKERS: [&str; 10] = ["✨", "🌍", "💰", "🏢", "📈", "🔍", "💼", "🧠", "💡", "🤖"];

const MIN_SENTENCE_CHARS: usize = 6;
const KEYWORD_MAX_CHARS: usize = 4;
const KEYWORD_COUNT: usize = 3;
const KEYWORD_SOURCE_CHARS: usize = 200;
const PAD_SUMMARY_POINT: &str = "此条内容较少，建议查看原文获取更多信息";

/// External text-generation capability: fallible, replaceable by the local
/// heuristic implementation.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Up to three short summary points for one item.
    async fn summarize(&self, title: &str, content: &str, source_name: &str)
        -> Result<Vec<String>>;

    /// A short space-separated keyword string for one item.
    async fn extract_keywords(
        &self,
        title: &str,
        content: &str,
        source_name: &str,
    ) -> Result<String>;

    /// Condense a body to a ~200-250 char standalone précis.
    async fn condense(&self, title: &str, content: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Summarizer backed by an OpenAI-compatible chat-completions endpoint.
pub struct RemoteSummarizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl RemoteSummarizer {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    async fn chat(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens,
        };

        let response: ChatResponse = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = response
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(crate::types::AggregatorError::Summarizer(
                "empty completion".to_string(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl Summarizer for RemoteSummarizer {
    async fn summarize(
        &self,
        title: &str,
        content: &str,
        source_name: &str,
    ) -> Result<Vec<String>> {
        let system = "你是一个AI新闻摘要专家。请从输入的新闻内容中提取3个最重要的核心信息点，\
            每点不超过60个字，必须是完整的一句话。为每个要点添加一个表情符号(✨🌍💰🏢📈🔍💼🧠💡🤖等)开头。\
            摘要应该聚焦于具体数据、核心信息或分析结论，避免空泛的内容。\
            请直接返回3个要点，每个要点一行，不要添加任何其他内容。";
        let user = format!(
            "请从以下{}新闻内容中提取3个最重要的核心信息点:\n\n标题: {}\n\n内容: {}",
            if source_name.is_empty() {
                String::new()
            } else {
                format!("{}的", source_name)
            },
            title,
            content
        );

        let text = self.chat(system, &user, 350).await?;
        let points: Vec<String> = text
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if points.is_empty() {
            return Err(crate::types::AggregatorError::Summarizer(
                "summary had no points".to_string(),
            ));
        }
        Ok(points)
    }

    async fn extract_keywords(
        &self,
        title: &str,
        content: &str,
        source_name: &str,
    ) -> Result<String> {
        let system = "你是一个专业的新闻关键词提取工具。你的任务是从新闻文本中提取2-3个极简短的名词关键词。\
            每个关键词必须是纯名词，且不超过4个汉字。重点关注公司名称、行业领域和技术概念。\
            只返回这些关键词，用空格分隔，不要包含任何其他解释或内容。";
        let excerpt = truncate_chars(content, KEYWORD_SOURCE_CHARS);
        let user = format!(
            "请从以下新闻文本中提取2-3个名词关键词，用空格分隔。这条新闻来自\"{}\":\n\n{} {}",
            source_name, title, excerpt
        );
        self.chat(system, &user, 50).await
    }

    async fn condense(&self, title: &str, content: &str) -> Result<String> {
        let system = "你是一个专业的新闻编辑，擅长将复杂的技术新闻内容提炼为简洁的概括。\
            你需要生成一段200-250字的新闻概括，保留原文的核心信息和关键数据，\
            使用客观专业的语言，确保内容完整且易于理解。";
        let user = format!(
            "请根据以下新闻标题和内容，生成一段200-250字的新闻概括，保留核心信息，语言简洁专业：\n\n标题：{}\n\n原始内容：{}",
            title, content
        );
        let text = self.chat(system, &user, 500).await?;
        let bounded = sentence_bounded_truncate(&text, 250, 200);
        Ok(ensure_terminal_punct(&bounded))
    }
}

/// Deterministic local heuristic, used when the external capability fails
/// or is not configured. Never errors.
#[derive(Debug, Default, Clone)]
pub struct LocalSummarizer;

impl LocalSummarizer {
    fn split_sentences(text: &str) -> Vec<&str> {
        text.split(['.', '。', '!', '！', '?', '？'])
            .map(str::trim)
            .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
            .collect()
    }

    fn summary_points(title: &str, content: &str, target: usize, point_chars: usize) -> Vec<String> {
        let full = if title.is_empty() {
            content.to_string()
        } else {
            format!("{}: {}", title, content)
        };

        let mut points: Vec<String> = Self::split_sentences(&full)
            .into_iter()
            .take(target)
            .enumerate()
            .map(|(i, sentence)| {
                let body = truncate_with_ellipsis(sentence, point_chars);
                format!("{} {}", SUMMARY_MARKERS[i % SUMMARY_MARKERS.len()], body)
            })
            .collect();

        // Pad to the fixed count; never exceed it.
        while points.len() < target {
            let marker = SUMMARY_MARKERS[points.len() % SUMMARY_MARKERS.len()];
            points.push(format!("{} {}", marker, PAD_SUMMARY_POINT));
        }
        points
    }

    fn keyword_string(title: &str, content: &str) -> String {
        let excerpt = truncate_chars(content, KEYWORD_SOURCE_CHARS);
        let text = format!("{} {}", title, excerpt);

        let mut freq: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for raw in text.split(|c: char| {
            c.is_whitespace()
                || matches!(
                    c,
                    ',' | '.' | '，' | '。' | ':' | '：' | ';' | '；' | '!' | '！' | '?' | '？'
                        | '-' | '(' | ')' | '（' | '）' | '\'' | '"' | '“' | '”' | '【' | '】'
                        | '/' | '、'
                )
        }) {
            let word = raw.trim();
            if word.chars().count() < 2 {
                continue;
            }
            if word.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if STOPWORDS.contains(&word.to_lowercase().as_str()) {
                continue;
            }
            let entry = freq.entry(word).or_insert(0);
            if *entry == 0 {
                order.push(word);
            }
            *entry += 1;
        }

        // Frequency rank with first-appearance order as the tiebreak keeps
        // the result stable across runs.
        let mut ranked: Vec<&str> = order.clone();
        ranked.sort_by(|a, b| {
            freq[b]
                .cmp(&freq[a])
                .then_with(|| {
                    let pos = |w: &&str| order.iter().position(|o| o == w).unwrap_or(usize::MAX);
                    pos(a).cmp(&pos(b))
                })
        });

        let keywords: Vec<String> = ranked
            .into_iter()
            .take(KEYWORD_COUNT)
            .map(|w| truncate_chars(w, KEYWORD_MAX_CHARS))
            .collect();

        if keywords.is_empty() {
            return truncate_chars(title, 10).trim().to_string();
        }
        keywords.join(" ")
    }
}

#[async_trait]
impl Summarizer for LocalSummarizer {
    async fn summarize(
        &self,
        title: &str,
        content: &str,
        _source_name: &str,
    ) -> Result<Vec<String>> {
        Ok(Self::summary_points(title, content, 3, 60))
    }

    async fn extract_keywords(
        &self,
        title: &str,
        content: &str,
        _source_name: &str,
    ) -> Result<String> {
        Ok(Self::keyword_string(title, content))
    }

    async fn condense(&self, _title: &str, content: &str) -> Result<String> {
        let bounded = sentence_bounded_truncate(content, 250, 200);
        Ok(ensure_terminal_punct(&bounded))
    }
}

/// Retry-once-then-fallback wrapper. With no remote configured it is just
/// the local heuristic.
pub struct ResilientSummarizer {
    remote: Option<Arc<dyn Summarizer>>,
    local: LocalSummarizer,
}

impl ResilientSummarizer {
    pub fn new(remote: Option<Arc<dyn Summarizer>>) -> Self {
        Self {
            remote,
            local: LocalSummarizer,
        }
    }

    pub fn local_only() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Summarizer for ResilientSummarizer {
    async fn summarize(
        &self,
        title: &str,
        content: &str,
        source_name: &str,
    ) -> Result<Vec<String>> {
        if let Some(remote) = self.remote.as_deref() {
            for attempt in 0..2 {
                match remote.summarize(title, content, source_name).await {
                    Ok(points) => return Ok(points),
                    Err(e) => {
                        warn!(attempt, error = %e, "remote summarize failed");
                    }
                }
            }
        }
        self.local.summarize(title, content, source_name).await
    }

    async fn extract_keywords(
        &self,
        title: &str,
        content: &str,
        source_name: &str,
    ) -> Result<String> {
        if let Some(remote) = self.remote.as_deref() {
            for attempt in 0..2 {
                match remote.extract_keywords(title, content, source_name).await {
                    Ok(keywords) => return Ok(keywords),
                    Err(e) => {
                        warn!(attempt, error = %e, "remote keyword extraction failed");
                    }
                }
            }
        }
        self.local.extract_keywords(title, content, source_name).await
    }

    async fn condense(&self, title: &str, content: &str) -> Result<String> {
        if let Some(remote) = self.remote.as_deref() {
            for attempt in 0..2 {
                match remote.condense(title, content).await {
                    Ok(text) => return Ok(text),
                    Err(e) => {
                        warn!(attempt, error = %e, "remote condense failed");
                    }
                }
            }
        }
        self.local.condense(title, content).await
    }
}

/// Enrich every selected candidate concurrently. Results land at their
/// originating index regardless of completion order, and assembly only
/// proceeds once every item has either succeeded or fallen back.
pub async fn enrich_all(
    summarizer: &dyn Summarizer,
    selected: Vec<Candidate>,
    config: &ReportConfig,
) -> Vec<NewsEntry> {
    let tasks = selected
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| build_entry(summarizer, index, candidate, config));
    futures::future::join_all(tasks).await
}

async fn build_entry(
    summarizer: &dyn Summarizer,
    index: usize,
    candidate: Candidate,
    config: &ReportConfig,
) -> NewsEntry {
    let item = candidate.item;
    let number = index + 1;
    let chars = item.content.chars().count();

    // Entries under the gate skip enrichment entirely; the assembler
    // decides whether a relaxed per-source threshold rescues them.
    if chars < config.entry_min_chars {
        debug!(title = %item.title, chars, "entry below content gate, skipping enrichment");
        return NewsEntry {
            id: format!("news{}", number),
            number,
            title: format!("{}、{}", number, item.title),
            keywords: String::new(),
            content: item.content,
            summary: Vec::new(),
            source: item.link,
            source_name: item.source_name,
            category: item.category,
            content_length_sufficient: false,
        };
    }

    let display_content = if chars > config.display_cap_chars {
        truncate_with_ellipsis(&item.content, config.display_cap_chars)
    } else {
        item.content.clone()
    };

    let local = LocalSummarizer;
    let keywords = match summarizer
        .extract_keywords(&item.title, &item.content, &item.source_name)
        .await
    {
        Ok(k) => k,
        // The local heuristic cannot fail; this is the last resort either way.
        Err(_) => local
            .extract_keywords(&item.title, &item.content, &item.source_name)
            .await
            .unwrap_or_default(),
    };
    let mut summary = match summarizer
        .summarize(&item.title, &item.content, &item.source_name)
        .await
    {
        Ok(s) => s,
        Err(_) => local
            .summarize(&item.title, &item.content, &item.source_name)
            .await
            .unwrap_or_default(),
    };
    // The point count is fixed: a chatty remote gets cut, a terse one is
    // padded with local points.
    summary.truncate(config.summary_points);
    if summary.len() < config.summary_points {
        if let Ok(local_points) = local
            .summarize(&item.title, &item.content, &item.source_name)
            .await
        {
            summary.extend(local_points.into_iter().skip(summary.len()));
            summary.truncate(config.summary_points);
        }
    }

    NewsEntry {
        id: format!("news{}", number),
        number,
        title: format!("{}、{}", number, item.title),
        keywords,
        content: display_content,
        summary,
        source: item.link,
        source_name: item.source_name,
        category: item.category,
        content_length_sufficient: true,
    }
}

/// Stopwords for the local keyword heuristic: function words plus reporting
/// boilerplate that would otherwise dominate frequency ranking.
const STOPWORDS: &[&str] = &[
    // function words
    "的", "了", "是", "在", "我", "有", "和", "就", "不", "人", "都", "一个", "也", "很", "到",
    "说", "要", "去", "你", "会", "着", "没有", "自己", "这", "那", "这个", "那个", "但是",
    "因为", "所以", "如果", "虽然", "然而", "于是", "可以", "已经", "通过", "需要", "成为",
    "提供", "包括", "等等", "以及", "或者", "比如", "例如", "还有", "其他", "一些", "这些",
    "那些", "可能", "表示", "认为", "如何", "什么", "这样", "那样", "只是",
    // reporting boilerplate
    "获悉", "美元", "预计", "同比", "环比", "增长", "下降", "发布", "公布", "消息", "消息称",
    "报道", "报道称", "报告", "数据", "数据显示", "研究", "调查", "来源", "来自", "发稿",
    "截至", "公告", "内容", "显示", "记者", "编辑", "36氪", "36kr", "分析", "专家", "技术",
    "市场", "企业", "产品", "投资", "项目", "发展", "公司", "行业", "领域", "计划", "实现",
    "应用", "服务", "未来", "创新", "全球", "中国", "国内", "国际", "世界", "地区", "时间",
    "日期", "今天", "昨天", "明天",
    // english function words
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "an", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might", "must", "can", "this", "that", "these", "those",
];
