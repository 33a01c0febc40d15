//! Glue between the queue and Discord messages.

use std::sync::Arc;

use async_trait::async_trait;
use poise::CreateReply;
use serenity::builder::{CreateEmbed, EditMessage};
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, MessageId};
use serenity::model::user::User;

use super::error::TaskError;
use super::progress::{ProgressAuthor, ProgressSink, ProgressUpdate};
use super::queue::TaskRequest;
use super::task::TaskOutput;
use crate::utils::embed;
use crate::{Context, Error};

/// A bot message the queue edits in place while a task waits.
///
/// Edits go through the channel endpoint rather than the interaction token,
/// which expires after 15 minutes.
pub struct MessageProgress {
    http: Arc<Http>,
    channel_id: ChannelId,
    message_id: MessageId,
}

impl MessageProgress {
    pub fn new(http: Arc<Http>, message: &Message) -> Self {
        Self {
            http,
            channel_id: message.channel_id,
            message_id: message.id,
        }
    }

    /// Replaces the status embed with the caller's final content.
    pub async fn finish(&self, builder: EditMessage) -> Result<(), Error> {
        self.channel_id
            .edit_message(&*self.http, self.message_id, builder)
            .await?;
        Ok(())
    }

    pub async fn finish_embed(&self, embed: CreateEmbed) -> Result<(), Error> {
        self.finish(EditMessage::new().embed(embed)).await
    }
}

#[async_trait]
impl ProgressSink for MessageProgress {
    async fn update(&self, update: ProgressUpdate) -> Result<(), Error> {
        self.finish_embed(embed::progress(&update)).await
    }
}

pub fn author_of(user: &User) -> ProgressAuthor {
    let author = ProgressAuthor::new(user.name.clone());
    match user.avatar_url() {
        Some(url) => author.icon_url(url),
        None => author,
    }
}

/// Embed shown when a task ends without a result.
pub fn failure_embed(err: &TaskError) -> CreateEmbed {
    if err.is_cancellation() {
        embed::cancelled(&err.to_string())
    } else {
        embed::error(&format!("죄송합니다, 요청을 처리하지 못했습니다.\n`{err}`"))
    }
}

/// Posts a placeholder, queues the request with that message as its
/// progress sink, and swaps in `render(output)` once the task finishes.
pub async fn run_command_task<F>(
    ctx: Context<'_>,
    title: &str,
    request: TaskRequest,
    render: F,
) -> Result<(), Error>
where
    F: FnOnce(TaskOutput) -> CreateEmbed,
{
    let Some(queue) = ctx.data().ai_queue.clone() else {
        ctx.send(CreateReply::default().embed(embed::error("AI 기능이 비활성화되어 있습니다.")))
            .await?;
        return Ok(());
    };

    let reply = ctx
        .send(CreateReply::default().embed(embed::waiting(title)))
        .await?;
    let message = reply.message().await?.into_owned();
    let progress = Arc::new(MessageProgress::new(
        ctx.serenity_context().http.clone(),
        &message,
    ));

    let request = request
        .author(author_of(ctx.author()))
        .progress(progress.clone());

    let final_embed = match queue.submit(request).await {
        Ok(output) => render(output),
        Err(e) => {
            if !e.is_cancellation() {
                tracing::error!("AI 명령 실패 ({}): {e}", ctx.command().name);
            }
            failure_embed(&e)
        }
    };

    progress.finish_embed(final_embed).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::error::GenerateError;

    #[test]
    fn test_failure_embed_distinguishes_cancellation() {
        let cancelled = serde_json::to_value(failure_embed(&TaskError::Removed)).unwrap();
        assert!(cancelled["title"].as_str().unwrap().contains("취소"));

        let failed = serde_json::to_value(failure_embed(&TaskError::Generation(
            GenerateError::EmptyResponse,
        )))
        .unwrap();
        assert!(failed["title"].as_str().unwrap().contains("오류"));
        assert!(failed["description"].as_str().unwrap().contains("빈 응답"));
    }
}
