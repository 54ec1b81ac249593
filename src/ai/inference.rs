//! 选中文本推理客户端
//!
//! 将用户选中的文本发送到托管推理 API（摘要、情感、情绪），
//! 并把 JSON 响应转换为可以直接显示的短文本。任何失败都以 [`AnalysisResult::Error`] 返回。

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::analysis::{AnalysisKind, AnalysisRequest, AnalysisResult, EmptyInput, InferenceError};
use super::response;
use super::transport::{Credential, HttpTransport, InferenceTransport, TransportError};

/// 单个推理端点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// 模型标识（如 facebook/bart-large-cnn）
    pub model: String,
    /// 完整 URL，为空时使用 `base_url/model`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl EndpointConfig {
    pub fn model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            url: None,
        }
    }
}

/// 每种分析类型对应的端点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointTable {
    #[serde(default = "default_summarize_endpoint")]
    pub summarize: EndpointConfig,
    #[serde(default = "default_sentiment_endpoint")]
    pub sentiment: EndpointConfig,
    #[serde(default = "default_emotion_endpoint")]
    pub emotion: EndpointConfig,
}

fn default_summarize_endpoint() -> EndpointConfig {
    EndpointConfig::model("facebook/bart-large-cnn")
}

fn default_sentiment_endpoint() -> EndpointConfig {
    EndpointConfig::model("distilbert-base-uncased-finetuned-sst-2-english")
}

fn default_emotion_endpoint() -> EndpointConfig {
    EndpointConfig::model("j-hartmann/emotion-english-distilroberta-base")
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self {
            summarize: default_summarize_endpoint(),
            sentiment: default_sentiment_endpoint(),
            emotion: default_emotion_endpoint(),
        }
    }
}

impl EndpointTable {
    pub fn get(&self, kind: AnalysisKind) -> &EndpointConfig {
        match kind {
            AnalysisKind::Summarize => &self.summarize,
            AnalysisKind::Sentiment => &self.sentiment,
            AnalysisKind::Emotion => &self.emotion,
        }
    }
}

/// 推理客户端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// 模型端点前缀
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 请求超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 存放 API 密钥的环境变量名
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// API 密钥（环境变量优先）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// 各分析类型的端点
    #[serde(default)]
    pub endpoints: EndpointTable,
}

fn default_base_url() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_api_key_env() -> String {
    "HF_API_TOKEN".to_string()
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
            api_key: None,
            endpoints: EndpointTable::default(),
        }
    }
}

impl InferenceConfig {
    /// 解析某类分析的完整 URL
    pub fn endpoint_url(&self, kind: AnalysisKind) -> String {
        let endpoint = self.endpoints.get(kind);
        match endpoint.url {
            Some(ref url) => url.clone(),
            None => format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint.model),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 从进程环境解析凭据
    pub fn resolve_credential(&self) -> Option<Credential> {
        self.resolve_credential_with(|name| env::var(name).ok())
    }

    /// 环境变量优先，其次是配置文件中的 `api_key`
    pub fn resolve_credential_with<F>(&self, lookup: F) -> Option<Credential>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.api_key_env)
            .and_then(Credential::new)
            .or_else(|| self.api_key.clone().and_then(Credential::new))
    }

    /// 校验端点 URL 与超时
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!("inference.timeout_secs must be greater than zero");
        }

        for kind in AnalysisKind::ALL {
            let url = self.endpoint_url(kind);
            let parsed = reqwest::Url::parse(&url)
                .map_err(|e| anyhow!("invalid {} endpoint '{}': {}", kind, url, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!("{} endpoint '{}' must use http or https", kind, url);
            }
        }

        Ok(())
    }
}

/// 推理客户端
///
/// 端点表与凭据在构造后不可变；每次调用相互独立，可并发使用。
pub struct InferenceClient<T = HttpTransport> {
    config: InferenceConfig,
    credential: Option<Credential>,
    transport: T,
}

impl InferenceClient<HttpTransport> {
    /// 从配置创建，凭据取自环境变量或配置文件
    pub fn from_config(config: InferenceConfig) -> Result<Self> {
        config.validate()?;

        let credential = config.resolve_credential();
        let transport = HttpTransport::new(config.timeout())
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        info!("Initializing inference client...");
        info!("  Base URL: {}", config.base_url);
        info!("  Timeout: {}s", config.timeout_secs);

        let client = Self::with_transport(config, credential, transport);
        if !client.has_credential() {
            warn!(
                "No inference API key found (set {}); requests will be sent without authorization",
                client.config.api_key_env
            );
        }
        Ok(client)
    }
}

impl<T: InferenceTransport> InferenceClient<T> {
    pub fn with_transport(
        config: InferenceConfig,
        credential: Option<Credential>,
        transport: T,
    ) -> Self {
        Self {
            config,
            credential,
            transport,
        }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// 分析一段文本；空白文本返回 [`EmptyInput`]，不发出请求
    pub async fn analyze_text(
        &self,
        text: &str,
        kind: AnalysisKind,
    ) -> Result<AnalysisResult, EmptyInput> {
        let request = AnalysisRequest::new(text, kind)?;
        Ok(self.analyze(&request).await)
    }

    /// 执行分析，所有失败都转换为 [`AnalysisResult::Error`]
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        AnalysisResult::from(self.try_analyze(request).await)
    }

    /// 执行分析并保留错误类型
    pub async fn try_analyze(&self, request: &AnalysisRequest) -> Result<String, InferenceError> {
        let kind = request.kind();
        let url = self.config.endpoint_url(kind);
        let body = serde_json::json!({ "inputs": request.text() });

        info!(
            "Inference API request: kind={}, model={}, input_chars={}",
            kind,
            self.config.endpoints.get(kind).model,
            request.text().chars().count()
        );
        debug!("Inference API URL: {}", url);

        let start = Instant::now();
        let reply = self
            .transport
            .post_json(&url, self.credential.as_ref(), &body)
            .await
            .map_err(|e| {
                warn!("Inference API transport error: kind={}, error={}", kind, e);
                match e {
                    TransportError::Timeout => InferenceError::Timeout,
                    TransportError::Connect(message) => InferenceError::Transport(message),
                }
            })?;

        info!(
            "Inference API response: kind={}, status={}, elapsed={:.2}s",
            kind,
            reply.status,
            start.elapsed().as_secs_f64()
        );

        if !reply.is_success() {
            warn!(
                "Inference API error: status={}, body={}",
                reply.status,
                reply.body.chars().take(200).collect::<String>()
            );
            return Err(InferenceError::RemoteStatus {
                kind,
                code: reply.status,
            });
        }

        let value: serde_json::Value = serde_json::from_str(&reply.body).map_err(|e| {
            warn!("Inference API returned non-JSON body: {}", e);
            InferenceError::from(e)
        })?;

        let text = response::interpret(kind, &value);
        debug!("Inference result length: {} chars", text.len());
        Ok(text)
    }
}
