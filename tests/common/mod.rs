#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_queue_bot::ai::{
    AiQueue, GenerateError, Generator, ProgressSink, ProgressUpdate, QueueEvent, QueueOptions,
    TaskConfig, TaskId, TaskRegistry, TaskRequest,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Semaphore};
use tokio::time::Instant;

type Respond = Box<dyn Fn(&str, usize) -> Result<String, GenerateError> + Send + Sync>;

/// Generator stub. `respond` gets the user prompt and how many times that
/// prompt has been seen (1-based).
pub struct StubGenerator {
    respond: Respond,
    latency: Duration,
    gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<String>>,
    call_times: Mutex<Vec<Instant>>,
    schemas: Mutex<Vec<bool>>,
    in_flight: AtomicBool,
    overlapped: AtomicBool,
}

impl StubGenerator {
    pub fn new(
        respond: impl Fn(&str, usize) -> Result<String, GenerateError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            latency: Duration::from_millis(10),
            gate: None,
            calls: Mutex::new(Vec::new()),
            call_times: Mutex::new(Vec::new()),
            schemas: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
        }
    }

    pub fn echo() -> Self {
        Self::new(|prompt, _| Ok(format!("echo:{prompt}")))
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every call waits for a permit from `gate` before answering.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    pub fn schemas(&self) -> Vec<bool> {
        self.schemas.lock().unwrap().clone()
    }

    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        schema: Option<&Value>,
    ) -> Result<String, GenerateError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }

        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(user_prompt.to_string());
            calls.iter().filter(|c| c.as_str() == user_prompt).count()
        };
        self.call_times.lock().unwrap().push(Instant::now());
        self.schemas.lock().unwrap().push(schema.is_some());

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        tokio::time::sleep(self.latency).await;

        let result = (self.respond)(user_prompt, attempt);
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }
}

/// Records every update it receives.
#[derive(Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<ProgressUpdate>>,
    delay: Duration,
}

impl RecordingSink {
    /// Every edit takes `delay`, like a slow Discord round trip.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().unwrap().clone()
    }

    /// The status suffix of each title, e.g. "대기 중".
    pub fn stages(&self) -> Vec<String> {
        self.updates()
            .iter()
            .map(|u| u.title.rsplit(" · ").next().unwrap_or_default().to_string())
            .collect()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn update(&self, update: ProgressUpdate) -> Result<(), ai_queue_bot::Error> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.updates.lock().unwrap().push(update);
        Ok(())
    }
}

/// Behaves like a message that was deleted.
pub struct FailingSink;

#[async_trait]
impl ProgressSink for FailingSink {
    async fn update(&self, _update: ProgressUpdate) -> Result<(), ai_queue_bot::Error> {
        Err("Unknown Message".into())
    }
}

pub fn echo_registry() -> TaskRegistry {
    TaskRegistry::new().register(
        "echo",
        TaskConfig::new("에코", "🔁", "echo the label")
            .user_prompt(|payload| payload["label"].as_str().unwrap_or_default().to_string())
            .description(|payload| format!("label={}", payload["label"])),
    )
}

pub fn echo(label: &str) -> TaskRequest {
    TaskRequest::new("echo", json!({ "label": label }))
}

pub fn queue_with(registry: TaskRegistry, generator: Arc<StubGenerator>) -> AiQueue {
    AiQueue::new(registry, generator, QueueOptions::default())
}

pub fn echo_queue(generator: Arc<StubGenerator>) -> AiQueue {
    queue_with(echo_registry(), generator)
}

pub fn api_error(message: impl Into<String>) -> GenerateError {
    GenerateError::Api(message.into())
}

/// Waits until `matches` accepts an event, skipping the rest.
pub async fn wait_for_event(
    events: &mut broadcast::Receiver<QueueEvent>,
    matches: impl Fn(&QueueEvent) -> bool,
) -> QueueEvent {
    loop {
        let event = events.recv().await.expect("event channel closed");
        if matches(&event) {
            return event;
        }
    }
}

pub async fn wait_for_added(events: &mut broadcast::Receiver<QueueEvent>) -> TaskId {
    match wait_for_event(events, |e| matches!(e, QueueEvent::Added { .. })).await {
        QueueEvent::Added { id, .. } => id,
        _ => unreachable!(),
    }
}

pub async fn wait_for_start(events: &mut broadcast::Receiver<QueueEvent>, id: &TaskId) {
    wait_for_event(events, |e| matches!(e, QueueEvent::Started { id: started, .. } if started == id))
        .await;
}

/// Everything emitted so far without waiting.
pub fn drain_events(events: &mut broadcast::Receiver<QueueEvent>) -> Vec<QueueEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
