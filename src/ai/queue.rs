//! Single-consumer AI task queue.
//!
//! Tasks are ordered by priority (desc), then submission time (asc). One
//! worker loop ([`AiQueue::run`]) pops the head, calls the generator, and
//! either resolves the task, parks it for an exponential backoff, or fails
//! it. A cooldown separates consecutive finished tasks so the downstream
//! rate limit is never hit back to back.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tokio::sync::{broadcast, oneshot, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::error::{GenerateError, TaskError};
use super::gemini::{strip_code_fence, Generator};
use super::progress::{
    DefaultRenderer, ProgressAuthor, ProgressRenderer, ProgressSink, ProgressStage, ProgressUpdate,
    ProgressView,
};
use super::task::{TaskConfig, TaskOutput, TaskRegistry};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(15);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Pause after every finished task (success or terminal failure).
    pub cooldown: Duration,
    /// Idle fallback when no wake-up arrives.
    pub poll_interval: Duration,
    /// Retry `n` waits `backoff_base * 2^n`.
    pub backoff_base: Duration,
    pub default_max_retries: u32,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            poll_interval: DEFAULT_POLL_INTERVAL,
            backoff_base: DEFAULT_BACKOFF_BASE,
            default_max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl QueueOptions {
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(retry_count))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    fn generate(seq: u64) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        Self(format!("ai-{seq}-{millis}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Everything a caller can say about a task at submission.
pub struct TaskRequest {
    kind: String,
    payload: Value,
    priority: i32,
    max_retries: Option<u32>,
    progress: Option<Arc<dyn ProgressSink>>,
    author: Option<ProgressAuthor>,
}

impl TaskRequest {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            priority: 0,
            max_retries: None,
            progress: None,
            author: None,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn author(mut self, author: ProgressAuthor) -> Self {
        self.author = Some(author);
        self
    }
}

type TaskResult = Result<TaskOutput, TaskError>;

struct Task {
    id: TaskId,
    kind: String,
    config: Arc<TaskConfig>,
    payload: Value,
    description: String,
    priority: i32,
    created_at: Instant,
    seq: u64,
    retry_count: u32,
    max_retries: u32,
    progress: Option<Arc<dyn ProgressSink>>,
    author: Option<ProgressAuthor>,
    /// Resolves once the "queued" status has been drawn.
    queued_render: Option<oneshot::Receiver<()>>,
    responder: oneshot::Sender<TaskResult>,
}

type SortKey = (Reverse<i32>, Instant, u64);

impl Task {
    fn sort_key(&self) -> SortKey {
        (Reverse(self.priority), self.created_at, self.seq)
    }

    fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id.clone(),
            kind: self.kind.clone(),
            priority: self.priority,
            retry_count: self.retry_count,
        }
    }

    fn view(&self, stage: ProgressStage) -> ProgressView<'_> {
        ProgressView {
            task_id: &self.id,
            title: &self.config.title,
            icon: &self.config.icon,
            description: &self.description,
            retry_count: self.retry_count,
            max_retries: self.max_retries,
            author: self.author.as_ref(),
            stage,
        }
    }

    /// Consumes the task, so the caller hears back exactly once.
    fn settle(self, result: TaskResult) {
        if self.responder.send(result).is_err() {
            debug!("작업 {} 결과를 받을 호출자가 없습니다", self.id);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub id: TaskId,
    pub kind: String,
    pub priority: i32,
    pub retry_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatus {
    pub queue_length: usize,
    pub processing: Option<TaskSummary>,
    pub next_task: Option<TaskSummary>,
    /// Tasks waiting out a backoff delay, not counted in `queue_length`.
    pub retrying: usize,
}

impl QueueStatus {
    pub fn is_processing(&self) -> bool {
        self.processing.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Added {
        id: TaskId,
        kind: String,
        position: usize,
        queue_length: usize,
    },
    Started {
        id: TaskId,
        retry_count: u32,
    },
    Retrying {
        id: TaskId,
        retry_count: u32,
        delay: Duration,
        error: String,
    },
    Requeued {
        id: TaskId,
    },
    Completed {
        id: TaskId,
        retry_count: u32,
    },
    Failed {
        id: TaskId,
        retry_count: u32,
        error: String,
    },
    Removed {
        id: TaskId,
    },
    Cleared {
        count: usize,
    },
}

#[derive(Default)]
struct QueueState {
    queued: Vec<Task>,
    backoff: HashMap<TaskId, Task>,
    processing: Option<TaskSummary>,
}

impl QueueState {
    fn position_for(&self, key: &SortKey) -> usize {
        self.queued.partition_point(|t| t.sort_key() <= *key)
    }

    /// Returns the 0-based index the task landed at.
    fn insert(&mut self, task: Task) -> usize {
        let index = self.position_for(&task.sort_key());
        self.queued.insert(index, task);
        index
    }
}

/// Waits for the outcome of one submitted task.
pub struct TaskHandle {
    id: TaskId,
    receiver: oneshot::Receiver<TaskResult>,
}

impl TaskHandle {
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub async fn wait(self) -> TaskResult {
        self.receiver
            .await
            .unwrap_or_else(|_| Err(TaskError::QueueClosed))
    }
}

struct Inner {
    registry: TaskRegistry,
    generator: Arc<dyn Generator>,
    renderer: Arc<dyn ProgressRenderer>,
    options: QueueOptions,
    state: Mutex<QueueState>,
    wake: Notify,
    events: broadcast::Sender<QueueEvent>,
    next_seq: AtomicU64,
}

/// Cheap to clone; every clone drives the same queue.
#[derive(Clone)]
pub struct AiQueue {
    inner: Arc<Inner>,
}

impl AiQueue {
    pub fn new(registry: TaskRegistry, generator: Arc<dyn Generator>, options: QueueOptions) -> Self {
        Self::with_renderer(registry, generator, options, Arc::new(DefaultRenderer))
    }

    pub fn with_renderer(
        registry: TaskRegistry,
        generator: Arc<dyn Generator>,
        options: QueueOptions,
        renderer: Arc<dyn ProgressRenderer>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                registry,
                generator,
                renderer,
                options,
                state: Mutex::new(QueueState::default()),
                wake: Notify::new(),
                events,
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.inner.registry
    }

    pub fn options(&self) -> &QueueOptions {
        &self.inner.options
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.inner.events.subscribe()
    }

    /// Starts the worker loop on the current runtime.
    pub fn spawn(&self) -> JoinHandle<()> {
        tokio::spawn(self.clone().run())
    }

    /// Validates and enqueues a task. Unknown kinds fail here and never
    /// touch the queue.
    pub async fn add_task(&self, request: TaskRequest) -> Result<TaskHandle, TaskError> {
        let Some(config) = self.inner.registry.get(&request.kind) else {
            warn!("알 수 없는 AI 작업 유형: {}", request.kind);
            return Err(TaskError::UnknownKind(request.kind));
        };

        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let (responder, receiver) = oneshot::channel();
        // 워커는 대기 상태 표시가 끝날 때까지 "처리 중"을 그리지 않는다
        let (rendered_tx, rendered_rx) = oneshot::channel();
        let has_sink = request.progress.is_some();
        let task = Task {
            id: TaskId::generate(seq),
            kind: request.kind,
            description: config.build_description(&request.payload),
            config,
            payload: request.payload,
            priority: request.priority,
            created_at: Instant::now(),
            seq,
            retry_count: 0,
            max_retries: request
                .max_retries
                .unwrap_or(self.inner.options.default_max_retries),
            progress: request.progress,
            author: request.author,
            queued_render: has_sink.then_some(rendered_rx),
            responder,
        };
        let id = task.id.clone();
        let kind = task.kind.clone();

        let (position, queue_length, queued_update) = {
            let mut state = self.inner.state.lock().await;
            let index = state.insert(task);
            let position = index + 1;
            let queue_length = state.queued.len();
            let update = self.prepare_progress(
                &state.queued[index],
                ProgressStage::Queued {
                    position,
                    queue_length,
                },
            );
            (position, queue_length, update)
        };
        self.inner.wake.notify_one();

        info!("AI 작업 추가: {id} ({kind}) 순번 {position}/{queue_length}");
        self.emit(QueueEvent::Added {
            id: id.clone(),
            kind,
            position,
            queue_length,
        });

        if let Some((sink, update)) = queued_update {
            self.deliver_progress(&id, sink.as_ref(), update).await;
        }
        // 작업이 이미 취소되어 받는 쪽이 없을 수 있다
        let _ = rendered_tx.send(());

        Ok(TaskHandle { id, receiver })
    }

    /// `add_task` followed by waiting for the outcome.
    pub async fn submit(&self, request: TaskRequest) -> TaskResult {
        self.add_task(request).await?.wait().await
    }

    pub async fn status(&self) -> QueueStatus {
        let state = self.inner.state.lock().await;
        QueueStatus {
            queue_length: state.queued.len(),
            processing: state.processing.clone(),
            next_task: state.queued.first().map(Task::summary),
            retrying: state.backoff.len(),
        }
    }

    /// Rejects every waiting task, including those in backoff. The task in
    /// flight is left alone.
    pub async fn clear_queue(&self) -> usize {
        let drained: Vec<Task> = {
            let mut state = self.inner.state.lock().await;
            let mut drained: Vec<Task> = state.queued.drain(..).collect();
            drained.extend(state.backoff.drain().map(|(_, task)| task));
            drained
        };

        let count = drained.len();
        for task in drained {
            task.settle(Err(TaskError::Cleared));
        }

        if count > 0 {
            info!("AI 대기열 비움: {count}개 작업 취소");
            self.emit(QueueEvent::Cleared { count });
        }
        count
    }

    /// Rejects one not-yet-started task. Returns whether it was found.
    pub async fn remove_task(&self, id: &TaskId) -> bool {
        let removed = {
            let mut state = self.inner.state.lock().await;
            match state.queued.iter().position(|t| &t.id == id) {
                Some(index) => Some(state.queued.remove(index)),
                None => state.backoff.remove(id),
            }
        };

        match removed {
            Some(task) => {
                info!("AI 작업 제거: {id}");
                task.settle(Err(TaskError::Removed));
                self.emit(QueueEvent::Removed { id: id.clone() });
                true
            }
            None => false,
        }
    }

    /// The worker loop. Runs until the runtime shuts down.
    pub async fn run(self) {
        info!("AI 작업 큐 시작 (쿨다운 {:?})", self.inner.options.cooldown);
        loop {
            let task = self.next_task().await;
            let finished = self.process(task).await;

            self.inner.state.lock().await.processing = None;

            if finished {
                tokio::time::sleep(self.inner.options.cooldown).await;
            }
        }
    }

    async fn next_task(&self) -> Task {
        loop {
            {
                let mut state = self.inner.state.lock().await;
                if !state.queued.is_empty() {
                    let task = state.queued.remove(0);
                    state.processing = Some(task.summary());
                    return task;
                }
            }

            tokio::select! {
                _ = self.inner.wake.notified() => {}
                _ = tokio::time::sleep(self.inner.options.poll_interval) => {}
            }
        }
    }

    /// Runs one attempt. Returns true when the task reached a terminal
    /// state and the cooldown applies.
    async fn process(&self, mut task: Task) -> bool {
        info!(
            "AI 작업 시작: {} ({}) 시도 {}/{}",
            task.id,
            task.kind,
            task.retry_count + 1,
            task.max_retries + 1
        );
        self.emit(QueueEvent::Started {
            id: task.id.clone(),
            retry_count: task.retry_count,
        });
        if let Some(queued_render) = task.queued_render.take() {
            // 보낸 쪽이 사라졌어도 진행한다
            let _ = queued_render.await;
        }
        self.show_progress(&task, ProgressStage::Processing).await;

        match self.execute(&task).await {
            Ok(output) => {
                info!("AI 작업 완료: {}", task.id);
                self.emit(QueueEvent::Completed {
                    id: task.id.clone(),
                    retry_count: task.retry_count,
                });
                task.settle(Ok(output));
                true
            }
            Err(e) if task.retry_count < task.max_retries => {
                task.retry_count += 1;
                let delay = self.inner.options.backoff_delay(task.retry_count);
                warn!(
                    "AI 작업 실패, 재시도 예정: {} ({}/{}, {:?} 후): {e}",
                    task.id, task.retry_count, task.max_retries, delay
                );

                let error = e.to_string();
                self.show_progress(
                    &task,
                    ProgressStage::Retrying {
                        delay,
                        error: error.clone(),
                    },
                )
                .await;

                let id = task.id.clone();
                let retry_count = task.retry_count;
                self.schedule_retry(task, delay).await;
                self.emit(QueueEvent::Retrying {
                    id,
                    retry_count,
                    delay,
                    error,
                });
                false
            }
            Err(e) => {
                error!("AI 작업 최종 실패: {} ({}회 재시도): {e}", task.id, task.retry_count);

                let error = e.to_string();
                self.show_progress(
                    &task,
                    ProgressStage::Failed {
                        error: error.clone(),
                    },
                )
                .await;
                self.emit(QueueEvent::Failed {
                    id: task.id.clone(),
                    retry_count: task.retry_count,
                    error,
                });
                task.settle(Err(TaskError::Generation(e)));
                true
            }
        }
    }

    async fn execute(&self, task: &Task) -> Result<TaskOutput, GenerateError> {
        let config = &task.config;
        let user_prompt = config.build_user_prompt(&task.payload);
        let structured = config.structured_response();

        let text = self
            .inner
            .generator
            .generate(
                &config.system_prompt,
                &user_prompt,
                structured.map(|s| &s.schema),
            )
            .await?;

        let Some(structured) = structured else {
            return Ok(TaskOutput::Text(text));
        };

        let parsed: Value = serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| GenerateError::InvalidResponse(format!("JSON 파싱 실패: {e}")))?;
        let validated = structured
            .validate(parsed)
            .map_err(GenerateError::InvalidResponse)?;

        Ok(TaskOutput::Structured(validated))
    }

    /// Parks the task and re-inserts it once `delay` has passed. The worker
    /// does not wait for it.
    async fn schedule_retry(&self, task: Task, delay: Duration) {
        let id = task.id.clone();
        self.inner.state.lock().await.backoff.insert(id.clone(), task);

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.requeue(&id).await;
        });
    }

    async fn requeue(&self, id: &TaskId) {
        let requeued = {
            let mut state = self.inner.state.lock().await;
            match state.backoff.remove(id) {
                Some(task) => {
                    state.insert(task);
                    true
                }
                // 대기 중에 취소됨
                None => false,
            }
        };

        if requeued {
            debug!("AI 작업 재등록: {id}");
            self.inner.wake.notify_one();
            self.emit(QueueEvent::Requeued { id: id.clone() });
        }
    }

    async fn show_progress(&self, task: &Task, stage: ProgressStage) {
        if let Some((sink, update)) = self.prepare_progress(task, stage) {
            self.deliver_progress(&task.id, sink.as_ref(), update).await;
        }
    }

    fn prepare_progress(
        &self,
        task: &Task,
        stage: ProgressStage,
    ) -> Option<(Arc<dyn ProgressSink>, ProgressUpdate)> {
        let sink = task.progress.clone()?;
        Some((sink, self.inner.renderer.render(&task.view(stage))))
    }

    async fn deliver_progress(&self, id: &TaskId, sink: &dyn ProgressSink, update: ProgressUpdate) {
        if let Err(e) = sink.update(update).await {
            warn!("진행 상황 메시지 갱신 실패 ({id}): {e}");
        }
    }

    fn emit(&self, event: QueueEvent) {
        // 구독자가 없으면 버려진다
        let _ = self.inner.events.send(event);
    }
}
