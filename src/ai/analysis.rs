//! 分析请求与结果类型
//!
//! 定义三种文本分析（摘要、情感、情绪）以及客户端边界上的结果和错误分类。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 分析类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    /// 摘要生成
    Summarize,
    /// 情感分类
    Sentiment,
    /// 细粒度情绪识别
    Emotion,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 3] = [Self::Summarize, Self::Sentiment, Self::Emotion];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Sentiment => "sentiment",
            Self::Emotion => "emotion",
        }
    }

    /// 失败提示中使用的动词短语
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Summarize => "summarize text",
            Self::Sentiment => "analyze sentiment",
            Self::Emotion => "detect emotion",
        }
    }

    /// 对话框标题
    pub fn title(&self) -> &'static str {
        match self {
            Self::Summarize => "Summary",
            Self::Sentiment => "Sentiment",
            Self::Emotion => "Emotion",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summarize" | "summary" => Ok(Self::Summarize),
            "sentiment" => Ok(Self::Sentiment),
            "emotion" => Ok(Self::Emotion),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// 无法识别的分析类型名称
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown analysis kind '{0}' (expected summarize, sentiment or emotion)")]
pub struct UnknownKind(pub String);

/// 输入为空（未选中文本或仅含空白）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no text selected")]
pub struct EmptyInput;

/// 单次分析请求
///
/// 每次用户操作新建，消费后即丢弃。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    text: String,
    kind: AnalysisKind,
}

impl AnalysisRequest {
    /// 创建请求，空白文本直接拒绝
    pub fn new(text: impl Into<String>, kind: AnalysisKind) -> Result<Self, EmptyInput> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(EmptyInput);
        }
        Ok(Self { text, kind })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> AnalysisKind {
        self.kind
    }
}

/// 分析结果（展示给用户的文本）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "lowercase")]
pub enum AnalysisResult {
    Ok(String),
    Error(String),
}

impl AnalysisResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Ok(text) | Self::Error(text) => text,
        }
    }
}

impl From<Result<String, InferenceError>> for AnalysisResult {
    fn from(result: Result<String, InferenceError>) -> Self {
        match result {
            Ok(text) => Self::Ok(text),
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

/// 推理调用的错误分类
///
/// 空输入在构造请求时由 [`EmptyInput`] 单独处理。
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Unable to {verb}. Status code: {code}", verb = .kind.verb())]
    RemoteStatus { kind: AnalysisKind, code: u16 },
    #[error("Unable to reach the inference service: request timed out")]
    Timeout,
    #[error("Unable to reach the inference service: {0}")]
    Transport(String),
    #[error("Invalid response from the inference service: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
