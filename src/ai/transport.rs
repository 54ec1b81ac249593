//! HTTP 传输层
//!
//! 推理客户端只依赖 [`InferenceTransport`]，生产环境使用 reqwest，测试使用记录调用的桩实现。

use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// 共享的 Bearer 凭据
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// 空字符串视为未配置
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        let secret = secret.trim();
        if secret.is_empty() {
            None
        } else {
            Some(Self(secret.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// 日志用的脱敏前缀
    pub fn masked(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{}...", prefix)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

/// HTTP 响应（状态码 + 原始正文）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 传输层故障
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Connect(String),
}

/// 推理请求的传输接口
pub trait InferenceTransport: Send + Sync {
    fn post_json(
        &self,
        url: &str,
        credential: Option<&Credential>,
        body: &Value,
    ) -> impl Future<Output = Result<HttpReply, TransportError>> + Send;
}

/// 基于 reqwest 的传输实现
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        Self::from_builder(Self::builder(timeout))
    }

    fn builder(timeout: Duration) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("marginalia/", env!("CARGO_PKG_VERSION")))
    }

    fn from_builder(builder: reqwest::ClientBuilder) -> Result<Self, TransportError> {
        let client = builder
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self { client })
    }
}

impl InferenceTransport for HttpTransport {
    fn post_json(
        &self,
        url: &str,
        credential: Option<&Credential>,
        body: &Value,
    ) -> impl Future<Output = Result<HttpReply, TransportError>> + Send {
        let mut req = self.client.post(url).json(body);
        if let Some(credential) = credential {
            req = req.bearer_auth(credential.expose());
            debug!("Inference API: using API key ({})", credential.masked());
        }

        async move {
            let response = req.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(map_reqwest_error)?;
            Ok(HttpReply { status, body })
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connect(e.to_string())
    }
}
