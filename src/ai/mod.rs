//! AI 推理模块
//!
//! 对用户选中的文本进行摘要、情感和情绪分析。
//! 所有请求都发往托管推理 API，响应解析为可直接显示的短文本。

pub mod analysis;
pub mod inference;
pub mod response;
pub mod transport;

pub use analysis::{
    AnalysisKind, AnalysisRequest, AnalysisResult, EmptyInput, InferenceError, UnknownKind,
};
pub use inference::{EndpointConfig, EndpointTable, InferenceClient, InferenceConfig};
pub use transport::{Credential, HttpReply, HttpTransport, InferenceTransport, TransportError};
