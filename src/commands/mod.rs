//! 界面命令模块
//!
//! 提供给浏览器外壳调用的接口：接收当前选中文本和分析类型，
//! 返回需要弹出的对话框描述。界面层只负责渲染 [`Dialog`]。

use crate::ai::{AnalysisKind, AnalysisResult, InferenceTransport};
use crate::dispatch::AnalysisCompletion;
use crate::AppState;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// 对话框级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogLevel {
    Info,
    Warning,
    Error,
}

impl DialogLevel {
    /// 是否表示操作未完成（CLI 据此返回非零退出码）
    pub fn is_failure(self) -> bool {
        !matches!(self, DialogLevel::Info)
    }
}

/// 模态对话框内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dialog {
    pub level: DialogLevel,
    pub title: String,
    pub message: String,
}

impl Dialog {
    /// 未选中文本时的提示
    pub fn no_selection() -> Self {
        Self {
            level: DialogLevel::Warning,
            title: "No text selected".to_string(),
            message: "Please select some text first.".to_string(),
        }
    }

    /// 根据分析结果生成对话框
    pub fn for_result(kind: AnalysisKind, result: &AnalysisResult) -> Self {
        match result {
            AnalysisResult::Ok(text) => Self {
                level: DialogLevel::Info,
                title: kind.title().to_string(),
                message: text.clone(),
            },
            AnalysisResult::Error(message) => Self {
                level: DialogLevel::Error,
                title: "Error".to_string(),
                message: message.clone(),
            },
        }
    }
}

impl fmt::Display for Dialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// 分析选中文本并等待结果
///
/// 在 UI 线程之外调用（或由异步运行时驱动）。
pub async fn analyze_selection<T: InferenceTransport + 'static>(
    state: &AppState<T>,
    selection: Option<&str>,
    kind: AnalysisKind,
) -> Dialog {
    debug!("analyze_selection: kind={}", kind);

    let Some(text) = selection else {
        return Dialog::no_selection();
    };

    match state.client.analyze_text(text, kind).await {
        Ok(result) => Dialog::for_result(kind, &result),
        Err(_) => Dialog::no_selection(),
    }
}

/// 提交选中文本到后台任务，立即返回请求 id
///
/// 结果通过 [`AppState::new`] 返回的 receiver 送达，再交给 [`present`]。
pub fn submit_selection<T: InferenceTransport + 'static>(
    state: &AppState<T>,
    selection: Option<&str>,
    kind: AnalysisKind,
) -> Result<u64, Dialog> {
    let text = selection.ok_or_else(Dialog::no_selection)?;
    let id = state
        .dispatcher
        .submit(text, kind)
        .map_err(|_| Dialog::no_selection())?;
    info!("Analysis submitted: id={}, kind={}", id, kind);
    Ok(id)
}

/// 将完成通知转换为对话框
pub fn present(completion: &AnalysisCompletion) -> Dialog {
    Dialog::for_result(completion.kind, &completion.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::transport::testing::StubTransport;
    use crate::ai::{Credential, InferenceClient};
    use crate::config::AppConfig;
    use tokio::sync::mpsc;

    fn state(
        transport: StubTransport,
    ) -> (
        AppState<StubTransport>,
        mpsc::Receiver<AnalysisCompletion>,
    ) {
        let config = AppConfig::default();
        let client = InferenceClient::with_transport(
            config.inference.clone(),
            Credential::new("hf_test"),
            transport,
        );
        AppState::with_client(config, client)
    }

    #[tokio::test]
    async fn test_missing_selection_warns() {
        let (state, _rx) = state(StubTransport::replying(200, "[]"));

        for selection in [None, Some(""), Some("  \n")] {
            let dialog = analyze_selection(&state, selection, AnalysisKind::Summarize).await;
            assert_eq!(dialog, Dialog::no_selection());
            assert_eq!(dialog.level, DialogLevel::Warning);

            let submitted = submit_selection(&state, selection, AnalysisKind::Emotion);
            assert_eq!(submitted, Err(Dialog::no_selection()));
        }
        assert!(state.client.config().validate().is_ok());
        assert_eq!(state.dispatcher.status().submitted, 0);
    }

    #[tokio::test]
    async fn test_summary_dialog() {
        let (state, _rx) = state(StubTransport::replying(
            200,
            r#"[{"summary_text": "Rust is fast."}]"#,
        ));

        let dialog =
            analyze_selection(&state, Some("Rust is a language..."), AnalysisKind::Summarize)
                .await;
        assert_eq!(
            dialog,
            Dialog {
                level: DialogLevel::Info,
                title: "Summary".to_string(),
                message: "Rust is fast.".to_string(),
            }
        );
        assert_eq!(dialog.to_string(), "Summary: Rust is fast.");
    }

    #[tokio::test]
    async fn test_error_dialog() {
        let (state, _rx) = state(StubTransport::replying(429, "rate limited"));

        let dialog = analyze_selection(&state, Some("text"), AnalysisKind::Sentiment).await;
        assert_eq!(dialog.level, DialogLevel::Error);
        assert_eq!(dialog.message, "Unable to analyze sentiment. Status code: 429");
        assert!(dialog.level.is_failure());
    }

    #[test]
    fn test_failure_levels() {
        assert!(!DialogLevel::Info.is_failure());
        assert!(DialogLevel::Warning.is_failure());
        assert!(DialogLevel::Error.is_failure());
        assert!(Dialog::no_selection().level.is_failure());
    }

    #[tokio::test]
    async fn test_submit_and_present() {
        let (state, mut rx) = state(StubTransport::replying(
            200,
            r#"[[{"label":"joy","score":0.1},{"label":"surprise","score":0.8}]]"#,
        ));

        let id = submit_selection(&state, Some("What a twist!"), AnalysisKind::Emotion).unwrap();
        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.id, id);

        let dialog = present(&completion);
        assert_eq!(dialog.level, DialogLevel::Info);
        assert_eq!(dialog.title, "Emotion");
        assert_eq!(dialog.message, "surprise");
    }

    #[test]
    fn test_submit_selection_from_ui_thread() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let config = AppConfig::default();
        let client = InferenceClient::with_transport(
            config.inference.clone(),
            Credential::new("hf_test"),
            StubTransport::replying(200, r#"[[{"label": "NEGATIVE", "score": 0.97}]]"#),
        );
        let (state, mut rx) = AppState::with_runtime(config, client, runtime.handle().clone());

        // 当前线程不在运行时内
        let id = submit_selection(&state, Some("This was dull."), AnalysisKind::Sentiment).unwrap();
        let completion = runtime.block_on(rx.recv()).unwrap();
        assert_eq!(completion.id, id);
        assert_eq!(present(&completion).message, "Sentiment: NEGATIVE");
    }
}
