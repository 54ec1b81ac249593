//! 推理响应解析
//!
//! 每种分析类型一条明确的解析规则。缺失字段时返回降级文本而不是错误。

use serde_json::Value;

use super::analysis::AnalysisKind;

pub const NO_SUMMARY: &str = "No summary available.";
pub const NO_SENTIMENT: &str = "No sentiment available.";
pub const NO_EMOTION: &str = "No emotion detected.";
const DEFAULT_SENTIMENT: &str = "Neutral";

/// 将响应 JSON 转换为展示文本
pub fn interpret(kind: AnalysisKind, body: &Value) -> String {
    match kind {
        AnalysisKind::Summarize => parse_summary(body),
        AnalysisKind::Sentiment => parse_sentiment(body),
        AnalysisKind::Emotion => parse_emotion(body),
    }
}

/// `[{"summary_text": "..."}]`
fn parse_summary(body: &Value) -> String {
    body.as_array()
        .and_then(|items| items.first())
        .and_then(|first| first.get("summary_text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| NO_SUMMARY.to_string())
}

/// `[{"label": "..."}]` 或 `[[{"label": "...", "score": ...}, ...]]`
fn parse_sentiment(body: &Value) -> String {
    let Some(first) = unwrap_nested(body).and_then(|items| items.first()) else {
        return NO_SENTIMENT.to_string();
    };

    let label = first
        .get("label")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_SENTIMENT);
    format!("Sentiment: {}", label)
}

/// `[{"label", "score"}, ...]` 或外层再包一层数组；取分数最高者
fn parse_emotion(body: &Value) -> String {
    let Some(items) = unwrap_nested(body) else {
        return NO_EMOTION.to_string();
    };

    let mut best: Option<(&str, f64)> = None;
    for item in items {
        let (Some(label), Some(score)) = (
            item.get("label").and_then(Value::as_str),
            item.get("score").and_then(Value::as_f64),
        ) else {
            continue;
        };
        // 严格大于：分数相同时保留先出现的
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((label, score));
        }
    }

    best.map(|(label, _)| label.to_string())
        .unwrap_or_else(|| NO_EMOTION.to_string())
}

/// 取出结果列表；若第一个元素本身是数组则展开一层
fn unwrap_nested(body: &Value) -> Option<&Vec<Value>> {
    let items = body.as_array()?;
    match items.first() {
        Some(Value::Array(inner)) => Some(inner),
        _ => Some(items),
    }
}
