//! Progress reporting for queued tasks.
//!
//! The queue describes where a task is ([`ProgressView`]), a
//! [`ProgressRenderer`] turns that into a [`ProgressUpdate`], and the
//! caller's [`ProgressSink`] shows it. The queue never renders a finished
//! task; the caller replaces the message with the result itself.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use super::queue::TaskId;

pub const COLOR_QUEUED: u32 = 0x5865F2;
pub const COLOR_PROCESSING: u32 = 0xFEE75C;
pub const COLOR_RETRYING: u32 = 0xE67E22;
pub const COLOR_FAILED: u32 = 0xED4245;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressAuthor {
    pub name: String,
    pub icon_url: Option<String>,
}

impl ProgressAuthor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon_url: None,
        }
    }

    pub fn icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon_url = Some(url.into());
        self
    }
}

/// A renderable status payload, independent of Discord types.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub title: String,
    pub description: String,
    pub footer: String,
    pub color: u32,
    pub timestamp: SystemTime,
    pub author: Option<ProgressAuthor>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressStage {
    Queued { position: usize, queue_length: usize },
    Processing,
    Retrying { delay: Duration, error: String },
    Failed { error: String },
}

pub struct ProgressView<'a> {
    pub task_id: &'a TaskId,
    pub title: &'a str,
    pub icon: &'a str,
    pub description: &'a str,
    pub retry_count: u32,
    pub max_retries: u32,
    pub author: Option<&'a ProgressAuthor>,
    pub stage: ProgressStage,
}

pub trait ProgressRenderer: Send + Sync {
    fn render(&self, view: &ProgressView<'_>) -> ProgressUpdate;
}

/// Editable message owned by the caller. Failures are logged by the queue
/// and otherwise ignored.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn update(&self, update: ProgressUpdate) -> Result<(), crate::Error>;
}

/// Korean status embeds used by the bot.
pub struct DefaultRenderer;

impl ProgressRenderer for DefaultRenderer {
    fn render(&self, view: &ProgressView<'_>) -> ProgressUpdate {
        let (status, color, detail) = match &view.stage {
            ProgressStage::Queued {
                position,
                queue_length,
            } => (
                "대기 중",
                COLOR_QUEUED,
                format!("⏳ 대기 순번: **{position}** / {queue_length}"),
            ),
            ProgressStage::Processing => (
                "처리 중",
                COLOR_PROCESSING,
                "⚙️ AI가 응답을 생성하고 있습니다...".to_string(),
            ),
            ProgressStage::Retrying { delay, error } => (
                "재시도 대기",
                COLOR_RETRYING,
                format!(
                    "🔁 재시도 {}/{} — {}초 후 다시 시도합니다\n`{error}`",
                    view.retry_count,
                    view.max_retries,
                    delay.as_secs()
                ),
            ),
            ProgressStage::Failed { error } => (
                "실패",
                COLOR_FAILED,
                format!("❌ 요청을 처리하지 못했습니다\n`{error}`"),
            ),
        };

        let description = if view.description.is_empty() {
            detail
        } else {
            format!("{}\n\n{detail}", view.description)
        };

        ProgressUpdate {
            title: format!("{} {} · {status}", view.icon, view.title),
            description,
            footer: format!("작업 ID: {}", view.task_id),
            color,
            timestamp: SystemTime::now(),
            author: view.author.cloned(),
        }
    }
}
