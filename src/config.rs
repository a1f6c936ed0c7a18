use serde::{Deserialize, Serialize};

/// Which fields of a parsed feed entry may supply the body text, in
/// preference order. Resolved once per source at registration time instead
/// of probing entry shapes per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentField {
    /// `<content:encoded>` / Atom `<content>` body.
    Body,
    /// `<description>` / Atom `<summary>`.
    Summary,
    /// Media object descriptions (some aggregator feeds put text there).
    MediaDescription,
}

/// Descriptor for one RSS source. Trust and strictness control how the
/// relevance filter treats the source's items; the caps and thresholds feed
/// the selector and assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    pub name: String,
    pub category: String,
    /// Ordered candidate fields for the item body; the title is the final
    /// fallback and never needs listing.
    pub content_fields: Vec<ContentField>,
    /// Whether the body text is HTML that must be stripped to plain text.
    pub strip_html: bool,
    /// Per-source fetch timeout. Slow aggregator endpoints get a larger one.
    pub timeout_secs: u64,
    /// Minimum content length (chars) for the relevance filter to retain an
    /// item from this source.
    pub min_content_chars: usize,
    /// Trusted sources skip keyword matching; length gating still applies.
    pub trusted: bool,
    /// Strict sources must match a topic keyword even when trusted.
    pub strict: bool,
    /// Upper bound on this source's contribution to one report.
    pub max_per_report: usize,
    /// Relaxed assembler gate for high-volume aggregator sources whose items
    /// run short.
    pub relaxed_entry_gate: bool,
}

impl SourceConfig {
    pub fn new(url: &str, name: &str, category: &str) -> Self {
        Self {
            url: url.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            content_fields: vec![
                ContentField::Body,
                ContentField::Summary,
                ContentField::MediaDescription,
            ],
            strip_html: true,
            timeout_secs: 60,
            min_content_chars: 180,
            trusted: false,
            strict: false,
            max_per_report: 4,
            relaxed_entry_gate: false,
        }
    }

    pub fn trusted(mut self) -> Self {
        self.trusted = true;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_min_content_chars(mut self, chars: usize) -> Self {
        self.min_content_chars = chars;
        self
    }

    pub fn with_max_per_report(mut self, cap: usize) -> Self {
        self.max_per_report = cap;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_relaxed_entry_gate(mut self) -> Self {
        self.relaxed_entry_gate = true;
        self
    }

    pub fn with_content_fields(mut self, fields: Vec<ContentField>) -> Self {
        self.content_fields = fields;
        self
    }
}

/// One named keyword category of the topic vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordCategory {
    pub name: String,
    pub terms: Vec<String>,
}

impl KeywordCategory {
    pub fn new(name: &str, terms: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            terms: terms.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// The topic vocabulary the relevance filter matches against, partitioned
/// into categories, plus exclusion terms and the high-priority set the
/// selector ranks by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    pub categories: Vec<KeywordCategory>,
    pub excluded: Vec<String>,
    pub high_priority: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            categories: vec![
                KeywordCategory::new(
                    "products-and-models",
                    &[
                        "chatgpt", "gpt", "claude", "gemini", "llm", "大模型", "智能体", "agent",
                        "stable diffusion", "多模态", "生成式", "飞桨", "昇腾", "鸿蒙", "昆仑",
                    ],
                ),
                KeywordCategory::new(
                    "organizations",
                    &[
                        "openai", "anthropic", "nvidia", "amd", "intel", "qualcomm", "arm",
                        "百度", "阿里", "腾讯", "字节跳动", "谷歌", "微软", "meta", "华为",
                        "智谱", "科大讯飞", "商汤", "旷视", "优必选", "地平线", "寒武纪",
                    ],
                ),
                KeywordCategory::new(
                    "technical-terms",
                    &[
                        "ai", "人工智能", "机器学习", "深度学习", "神经网络", "算法", "模型",
                        "语音识别", "图像识别", "计算机视觉", "自然语言处理", "nlp", "芯片",
                        "算力", "训练", "推理", "人形机器人", "量子", "自动驾驶", "云计算",
                        "边缘计算", "大数据", "数据中心", "智能制造",
                    ],
                ),
                KeywordCategory::new(
                    "policy-and-industry",
                    &[
                        "融资", "收购", "政策", "大厂", "前沿", "迭代", "创新", "技术突破",
                        "智慧城市", "元宇宙", "web3",
                    ],
                ),
            ],
            excluded: ["噱头", "炒作", "概念", "宣传", "营销"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            high_priority: [
                "技术突破", "新模型", "发布", "融资", "收购", "大厂", "芯片", "模型迭代",
                "前沿", "重大", "政策", "ai产品",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Parameters of the ranked selection stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// When the target day yields fewer retained items than this, backfill
    /// from recent days.
    pub window_floor: usize,
    /// How many days of backfill are eligible as supplements.
    pub backfill_days: i64,
    /// Final report size cap.
    pub max_report_size: usize,
    /// Content-length differences below this are treated as noise when
    /// ranking, and the comparison falls through to recency.
    pub length_noise_chars: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            window_floor: 8,
            backfill_days: 3,
            max_report_size: 20,
            length_noise_chars: 100,
        }
    }
}

/// Parameters of enrichment and report assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Entries below this many chars fail the content gate.
    pub entry_min_chars: usize,
    /// Gate for sources flagged `relaxed_entry_gate`.
    pub relaxed_entry_min_chars: usize,
    /// Display cap on entry content.
    pub display_cap_chars: usize,
    /// Number of summary points per entry.
    pub summary_points: usize,
    /// Per-point length cap, excluding the marker.
    pub summary_point_chars: usize,
    /// Report title prefix, e.g. `AI日报`.
    pub title_prefix: String,
    /// Title used when no entries qualify.
    pub fallback_title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            entry_min_chars: 300,
            relaxed_entry_min_chars: 120,
            display_cap_chars: 250,
            summary_points: 3,
            summary_point_chars: 60,
            title_prefix: "AI日报".to_string(),
            fallback_title: "今日AI行业热点资讯".to_string(),
        }
    }
}

/// HTTP client behaviour for feed fetching.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub default_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; daily-news/0.1)".to_string(),
            default_timeout_secs: 60,
            max_retries: 2,
            retry_delay_secs: 5,
        }
    }
}

/// The default source roster from the production deployment. Trusted AI
/// media bypass keyword matching; the 36Kr aggregator is strict and runs
/// with relaxed length gates and a higher per-report cap.
pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(
            "https://wechat2rss.xlab.app/feed/7131b577c61365cb47e81000738c10d872685908.xml",
            "量子位(微信)",
            "ai-tech",
        )
        .trusted()
        .with_min_content_chars(100),
        SourceConfig::new("https://www.jiqizhixin.com/rss", "机器之心", "ai-research")
            .trusted()
            .with_min_content_chars(100),
        SourceConfig::new(
            "https://chenz.zeabur.app/feeds/MP_WXS_3871912638.atom",
            "AI寒武纪",
            "ai-industry",
        )
        .trusted()
        .with_min_content_chars(100),
        SourceConfig::new(
            "https://rsshub.rssforever.com/36kr/motif/327686782977",
            "36Kr综合资讯",
            "ai-tech",
        )
        .strict()
        .with_timeout_secs(120)
        .with_min_content_chars(120)
        .with_max_per_report(6)
        .with_relaxed_entry_gate(),
    ]
}
