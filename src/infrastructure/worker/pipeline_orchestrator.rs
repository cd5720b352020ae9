//! Pipeline Orchestrator - 每个阶段一个 worker，阶段之间用有界队列连接

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::application::ports::{
    PendingReviewStores, Phase, PhaseOutcome, PipelineError, PipelinePhase, PipelineRunnerPort,
    ResultStorePort,
};
use crate::domain::processing::{FileId, ProcessingContext, ProcessingStatus, ReviewDetails};
use crate::infrastructure::events::EventPublisher;
use crate::infrastructure::persistence::{snapshot_path, write_snapshot};

/// 编排器配置
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 每个阶段输入队列的容量
    pub queue_capacity: usize,
    /// 关闭时等待 worker 排空的最长时间
    pub shutdown_timeout: Duration,
    /// 暂停时写入上下文快照的目录
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 32,
            shutdown_timeout: Duration::from_secs(10),
            snapshot_dir: None,
        }
    }
}

/// 阶段结果的去向：结果存储、待评审存储、事件
struct OutcomeSink {
    results: Arc<dyn ResultStorePort>,
    stores: PendingReviewStores,
    events: Arc<EventPublisher>,
    snapshot_dir: Option<PathBuf>,
}

impl OutcomeSink {
    /// 先放入待评审存储再更新状态，状态可见时上下文一定可取
    fn park(&self, mut context: ProcessingContext, details: ReviewDetails) {
        let file_id = context.file_id;
        let kind = details.kind();
        context.review = Some(details.clone());

        if let Some(dir) = &self.snapshot_dir {
            if let Err(e) = write_snapshot(&snapshot_path(dir, file_id), &context) {
                tracing::warn!(file_id = %file_id, error = %e, "Failed to write snapshot");
            }
        }

        self.stores.for_kind(kind).store(context);
        self.results.set_status(file_id, kind.awaiting_status());
        self.events.publish_suspended(file_id, &details);

        tracing::info!(file_id = %file_id, kind = kind.as_str(), "Context parked for review");
    }

    fn complete(&self, file_id: FileId, payload: Vec<u8>) {
        let size = payload.len();
        self.results.store_result(file_id, payload);
        self.events.publish_completed(file_id, size);
        tracing::info!(file_id = %file_id, size_bytes = size, "Pipeline completed");
    }

    fn fail(&self, file_id: FileId, phase: Phase, message: String) {
        tracing::error!(file_id = %file_id, phase = %phase, error = %message, "Pipeline failed");
        self.events.publish_failed(file_id, &message);
        self.results.store_error(file_id, message);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// 单个阶段的 worker
///
/// 串行处理自己的队列，暂停不会阻塞后续上下文
struct StageWorker {
    phase: Arc<dyn PipelinePhase>,
    receiver: mpsc::Receiver<ProcessingContext>,
    next: Option<mpsc::Sender<ProcessingContext>>,
    sink: Arc<OutcomeSink>,
}

impl StageWorker {
    async fn run(mut self) {
        let phase = self.phase.phase();
        tracing::debug!(phase = %phase, "Stage worker started");

        while let Some(context) = self.receiver.recv().await {
            let file_id = context.file_id;
            tracing::debug!(file_id = %file_id, phase = %phase, "Phase started");

            let outcome = AssertUnwindSafe(self.phase.run(context))
                .catch_unwind()
                .await;

            match outcome {
                Ok(PhaseOutcome::Continue(context)) => self.forward(phase, *context).await,
                Ok(PhaseOutcome::Suspend { context, details }) => {
                    self.sink.park(*context, details)
                }
                Ok(PhaseOutcome::Fail(e)) => self.sink.fail(file_id, phase, e.to_string()),
                Err(panic) => self.sink.fail(
                    file_id,
                    phase,
                    PipelineError::unexpected(phase, panic_message(&*panic)).to_string(),
                ),
            }
        }

        // 队列关闭且已排空，丢弃 next 让下游继续级联关闭
        tracing::debug!(phase = %phase, "Stage worker stopped");
    }

    async fn forward(&self, phase: Phase, mut context: ProcessingContext) {
        let file_id = context.file_id;
        match &self.next {
            Some(next) => {
                if next.send(context).await.is_err() {
                    let next_phase = phase.next().unwrap_or(phase);
                    self.sink.fail(
                        file_id,
                        phase,
                        PipelineError::QueueClosed(next_phase).to_string(),
                    );
                }
            }
            None => match context.epub.take() {
                Some(payload) => self.sink.complete(file_id, payload),
                None => self.sink.fail(
                    file_id,
                    phase,
                    PipelineError::unexpected(phase, "final phase produced no EPUB").to_string(),
                ),
            },
        }
    }
}

/// 流水线编排器
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    order: Vec<Phase>,
    senders: RwLock<Option<Vec<mpsc::Sender<ProcessingContext>>>>,
    handles: Mutex<Vec<(Phase, JoinHandle<()>)>>,
    accepting: AtomicBool,
    sink: Arc<OutcomeSink>,
}

impl PipelineOrchestrator {
    /// 为每个阶段启动一个 worker；必须在 tokio 运行时内调用
    pub fn start(
        phases: Vec<Arc<dyn PipelinePhase>>,
        results: Arc<dyn ResultStorePort>,
        stores: PendingReviewStores,
        events: Arc<EventPublisher>,
        config: PipelineConfig,
    ) -> Arc<Self> {
        let sink = Arc::new(OutcomeSink {
            results,
            stores,
            events,
            snapshot_dir: config.snapshot_dir.clone(),
        });

        let capacity = config.queue_capacity.max(1);
        let (senders, receivers): (Vec<_>, Vec<_>) = phases
            .iter()
            .map(|_| mpsc::channel::<ProcessingContext>(capacity))
            .unzip();

        let order: Vec<Phase> = phases.iter().map(|p| p.phase()).collect();
        let mut handles = Vec::with_capacity(phases.len());

        for (index, (phase, receiver)) in phases.into_iter().zip(receivers).enumerate() {
            let worker = StageWorker {
                phase,
                receiver,
                next: senders.get(index + 1).cloned(),
                sink: sink.clone(),
            };
            handles.push((order[index], tokio::spawn(worker.run())));
        }

        tracing::info!(
            phases = order.len(),
            queue_capacity = capacity,
            "PipelineOrchestrator started"
        );

        Arc::new(Self {
            config,
            order,
            senders: RwLock::new(Some(senders)),
            handles: Mutex::new(handles),
            accepting: AtomicBool::new(true),
            sink,
        })
    }

    async fn enqueue(&self, context: ProcessingContext, phase: Phase) -> Result<(), PipelineError> {
        let index = self
            .order
            .iter()
            .position(|p| *p == phase)
            .ok_or(PipelineError::QueueClosed(phase))?;

        let sender = {
            let guard = self.senders.read().await;
            match guard.as_ref().and_then(|senders| senders.get(index)) {
                Some(sender) if self.is_accepting() => sender.clone(),
                _ => return Err(PipelineError::ShuttingDown),
            }
        };

        let file_id = context.file_id;
        // 先置状态再入队，避免覆盖下游已经写入的终态
        self.sink.results.set_status(file_id, ProcessingStatus::InProgress);
        self.sink
            .events
            .publish_status_changed(file_id, ProcessingStatus::InProgress);

        if sender.send(context).await.is_err() {
            let error = PipelineError::QueueClosed(phase);
            self.sink.results.store_error(file_id, error.to_string());
            return Err(error);
        }
        tracing::debug!(file_id = %file_id, phase = %phase, "Context enqueued");
        Ok(())
    }

    /// 轮询直到状态离开 InProgress 或超时，返回最后看到的状态
    pub async fn wait_until_settled(
        &self,
        file_id: &FileId,
        timeout: Duration,
    ) -> Option<ProcessingStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let status = self.sink.results.get_status(file_id);
            if !matches!(status, Some(ProcessingStatus::InProgress))
                || tokio::time::Instant::now() >= deadline
            {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// 协作式关闭：停止接收、排空队列、限时等待 worker，超时后强制终止
    pub async fn shutdown(&self) {
        if !self.accepting.swap(false, Ordering::SeqCst) {
            return;
        }
        drop(self.senders.write().await.take());

        let handles = std::mem::take(&mut *self.handles.lock().await);
        let deadline = tokio::time::Instant::now() + self.config.shutdown_timeout;

        for (phase, mut handle) in handles {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(phase = %phase, error = %e, "Stage worker ended abnormally")
                }
                Err(_) => {
                    tracing::warn!(phase = %phase, "Stage worker did not drain in time, aborting");
                    handle.abort();
                }
            }
        }
        tracing::info!("PipelineOrchestrator stopped");
    }
}

#[async_trait]
impl PipelineRunnerPort for PipelineOrchestrator {
    async fn submit(&self, context: ProcessingContext) -> Result<FileId, PipelineError> {
        let file_id = context.file_id;
        let first = self
            .order
            .first()
            .copied()
            .ok_or(PipelineError::ShuttingDown)?;
        self.enqueue(context, first).await?;
        Ok(file_id)
    }

    async fn resubmit(&self, context: ProcessingContext, phase: Phase) -> Result<(), PipelineError> {
        self.enqueue(context, phase).await
    }

    fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}
