//! Marginalia - 浏览器外壳的选中文本分析核心
//!
//! 核心库，提供推理客户端、后台分发和界面命令。
//! 页面渲染、导航和选区提取由宿主浏览器引擎负责，不在本库范围内。

pub mod ai;
pub mod commands;
pub mod config;
pub mod dispatch;

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub use ai::{AnalysisKind, AnalysisResult, HttpTransport, InferenceClient, InferenceTransport};
pub use commands::{Dialog, DialogLevel};
pub use config::AppConfig;
pub use dispatch::{AnalysisCompletion, AnalysisDispatcher, DispatcherStatus};

/// 应用全局状态
pub struct AppState<T = HttpTransport> {
    /// 应用配置（TOML 文件）
    pub config: AppConfig,
    /// 推理客户端
    pub client: Arc<InferenceClient<T>>,
    /// 后台分发器
    pub dispatcher: AnalysisDispatcher<T>,
}

impl AppState<HttpTransport> {
    /// 根据配置创建应用状态，返回完成通知的 receiver
    ///
    /// 需在 tokio 运行时内调用。
    pub fn new(config: AppConfig) -> anyhow::Result<(Self, mpsc::Receiver<AnalysisCompletion>)> {
        let client = InferenceClient::from_config(config.inference.clone())?;
        Ok(Self::with_client(config, client))
    }
}

impl<T: InferenceTransport + 'static> AppState<T> {
    /// 使用已构建的客户端创建应用状态
    ///
    /// 需在 tokio 运行时内创建；之后可从任意线程提交分析。
    pub fn with_client(
        config: AppConfig,
        client: InferenceClient<T>,
    ) -> (Self, mpsc::Receiver<AnalysisCompletion>) {
        Self::with_runtime(config, client, Handle::current())
    }

    /// 同上，分析任务在指定运行时上执行
    pub fn with_runtime(
        config: AppConfig,
        client: InferenceClient<T>,
        runtime: Handle,
    ) -> (Self, mpsc::Receiver<AnalysisCompletion>) {
        let client = Arc::new(client);
        let (dispatcher, completion_rx) =
            AnalysisDispatcher::new(client.clone(), &config.dispatch, runtime);
        let state = Self {
            config,
            client,
            dispatcher,
        };
        (state, completion_rx)
    }
}
