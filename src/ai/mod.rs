pub mod channel;
pub mod discord;
pub mod error;
pub mod gemini;
pub mod progress;
pub mod queue;
pub mod task;

pub use error::{GenerateError, TaskError};
pub use gemini::{GeminiClient, Generator};
pub use progress::{ProgressAuthor, ProgressSink, ProgressUpdate};
pub use queue::{AiQueue, QueueEvent, QueueOptions, QueueStatus, TaskHandle, TaskId, TaskRequest};
pub use task::{TaskConfig, TaskOutput, TaskRegistry};

use tracing::debug;

/// Logs every lifecycle event at debug level until the queue goes away.
pub fn spawn_event_logger(queue: &AiQueue) -> tokio::task::JoinHandle<()> {
    let mut events = queue.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!("AI 큐 이벤트: {event:?}"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    debug!("AI 큐 이벤트 {n}개 누락");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
