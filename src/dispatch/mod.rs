//! 分析任务分发
//!
//! UI 线程只负责提交请求；推理调用在 tokio 任务中执行，
//! 完成结果通过 mpsc 通道送回 UI 上下文，界面不会因远端响应慢而卡住。

use crate::ai::{
    AnalysisKind, AnalysisRequest, AnalysisResult, EmptyInput, HttpTransport, InferenceClient,
    InferenceTransport,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 完成通道默认容量
const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// 分发配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// 完成通道容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// 一次分析的完成通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisCompletion {
    pub id: u64,
    pub kind: AnalysisKind,
    pub result: AnalysisResult,
}

/// 分发器状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStatus {
    /// 已提交的请求数
    pub submitted: u64,
    /// 已完成的请求数
    pub completed: u64,
    /// 以错误结束的请求数
    pub failed: u64,
    /// 正在执行的请求数
    pub in_flight: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicU64,
}

/// 分析任务分发器
pub struct AnalysisDispatcher<T = HttpTransport> {
    client: Arc<InferenceClient<T>>,
    runtime: Handle,
    completion_tx: mpsc::Sender<AnalysisCompletion>,
    next_id: AtomicU64,
    counters: Arc<Counters>,
}

impl<T: InferenceTransport + 'static> AnalysisDispatcher<T> {
    /// 创建分发器，返回 UI 端用于接收完成通知的 receiver
    ///
    /// 分析任务在 `runtime` 上执行。
    pub fn new(
        client: Arc<InferenceClient<T>>,
        config: &DispatchConfig,
        runtime: Handle,
    ) -> (Self, mpsc::Receiver<AnalysisCompletion>) {
        let (completion_tx, completion_rx) = mpsc::channel(config.queue_capacity.max(1));
        let dispatcher = Self {
            client,
            runtime,
            completion_tx,
            next_id: AtomicU64::new(1),
            counters: Arc::new(Counters::default()),
        };
        (dispatcher, completion_rx)
    }

    /// 提交分析请求
    ///
    /// 空白文本在调用线程上直接拒绝；否则返回请求 id，结果稍后通过通道送达。
    /// 调用线程不需要处于 tokio 运行时内（例如 UI 线程）。
    pub fn submit(&self, text: &str, kind: AnalysisKind) -> Result<u64, EmptyInput> {
        let request = AnalysisRequest::new(text, kind)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        self.counters.submitted.fetch_add(1, Ordering::SeqCst);
        self.counters.in_flight.fetch_add(1, Ordering::SeqCst);
        debug!("Submitted analysis request {} ({})", id, kind);

        let client = self.client.clone();
        let completion_tx = self.completion_tx.clone();
        let counters = self.counters.clone();

        self.runtime.spawn(async move {
            let result = client.analyze(&request).await;

            counters.in_flight.fetch_sub(1, Ordering::SeqCst);
            counters.completed.fetch_add(1, Ordering::SeqCst);
            if !result.is_ok() {
                counters.failed.fetch_add(1, Ordering::SeqCst);
            }

            info!(
                "Analysis request {} finished: kind={}, ok={}",
                id,
                kind,
                result.is_ok()
            );

            let completion = AnalysisCompletion { id, kind, result };
            if completion_tx.send(completion).await.is_err() {
                warn!("Completion receiver dropped, discarding result of request {}", id);
            }
        });

        Ok(id)
    }

    /// 获取状态
    pub fn status(&self) -> DispatcherStatus {
        DispatcherStatus {
            submitted: self.counters.submitted.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
            in_flight: self.counters.in_flight.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::transport::testing::StubTransport;
    use crate::ai::{Credential, InferenceConfig};

    fn dispatcher(
        transport: StubTransport,
    ) -> (
        AnalysisDispatcher<StubTransport>,
        mpsc::Receiver<AnalysisCompletion>,
    ) {
        let client = InferenceClient::with_transport(
            InferenceConfig::default(),
            Credential::new("hf_test"),
            transport,
        );
        AnalysisDispatcher::new(Arc::new(client), &DispatchConfig::default(), Handle::current())
    }

    #[tokio::test]
    async fn test_blank_input_not_spawned() {
        let (dispatcher, _rx) = dispatcher(StubTransport::replying(200, "[]"));
        assert_eq!(dispatcher.submit("  ", AnalysisKind::Summarize), Err(EmptyInput));
        assert_eq!(dispatcher.status(), DispatcherStatus::default());
    }

    #[tokio::test]
    async fn test_completion_delivered() {
        let (dispatcher, mut rx) = dispatcher(StubTransport::replying(
            200,
            r#"[{"label": "POSITIVE", "score": 0.99}]"#,
        ));

        let id = dispatcher.submit("great movie", AnalysisKind::Sentiment).unwrap();
        let completion = rx.recv().await.unwrap();

        assert_eq!(completion.id, id);
        assert_eq!(completion.kind, AnalysisKind::Sentiment);
        assert_eq!(
            completion.result,
            AnalysisResult::Ok("Sentiment: POSITIVE".to_string())
        );

        let status = dispatcher.status();
        assert_eq!(status.submitted, 1);
        assert_eq!(status.completed, 1);
        assert_eq!(status.failed, 0);
        assert_eq!(status.in_flight, 0);
    }

    #[tokio::test]
    async fn test_one_completion_per_request() {
        let (dispatcher, mut rx) = dispatcher(StubTransport::replying(503, "loading"));

        let mut ids = Vec::new();
        for kind in AnalysisKind::ALL {
            ids.push(dispatcher.submit("text", kind).unwrap());
        }

        let mut seen = Vec::new();
        for _ in 0..ids.len() {
            let completion = rx.recv().await.unwrap();
            assert!(completion.result.text().contains("503"));
            seen.push(completion.id);
        }
        seen.sort_unstable();
        assert_eq!(seen, ids);

        let status = dispatcher.status();
        assert_eq!(status.completed, 3);
        assert_eq!(status.failed, 3);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_tolerated() {
        let (dispatcher, rx) = dispatcher(StubTransport::replying(200, "[]"));
        drop(rx);

        dispatcher.submit("text", AnalysisKind::Emotion).unwrap();
        for _ in 0..100 {
            if dispatcher.status().completed == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(dispatcher.status().completed, 1);
    }

    #[test]
    fn test_submit_from_thread_outside_runtime() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let client = InferenceClient::with_transport(
            InferenceConfig::default(),
            Credential::new("hf_test"),
            StubTransport::replying(200, r#"[{"summary_text": "Done."}]"#),
        );
        let (dispatcher, mut rx) = AnalysisDispatcher::new(
            Arc::new(client),
            &DispatchConfig::default(),
            runtime.handle().clone(),
        );

        // 模拟 UI 线程：没有进入运行时上下文
        let id = std::thread::spawn(move || {
            assert!(Handle::try_current().is_err());
            dispatcher.submit("long text", AnalysisKind::Summarize).unwrap()
        })
        .join()
        .unwrap();

        let completion = runtime.block_on(rx.recv()).unwrap();
        assert_eq!(completion.id, id);
        assert_eq!(completion.result, AnalysisResult::Ok("Done.".to_string()));
    }
}
