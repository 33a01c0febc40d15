use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, CreateMessage, EditMessage};
use serde_json::json;

use super::discord::{author_of, failure_embed, MessageProgress};
use super::queue::TaskRequest;
use super::task::{self, PRIORITY_BACKGROUND};
use crate::utils::embed;
use crate::{Data, Error};

/// Discord 메시지 2000자 제한
const MESSAGE_LIMIT: usize = 2000;

/// 봇을 멘션한 메시지를 chat 작업으로 대기열에 넣고, 답변으로 교체한다.
pub async fn handle(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    let Some(queue) = data.ai_queue.clone() else {
        return Ok(());
    };

    if msg.author.bot {
        return Ok(());
    }

    if let Some(channel_id) = data.ai_channel_id {
        if msg.channel_id.get() != channel_id {
            return Ok(());
        }
    }

    let bot_id = ctx.cache.current_user().id;
    if !msg.mentions.iter().any(|u| u.id == bot_id) {
        return Ok(());
    }

    let question = extract_question(&msg.content, bot_id);
    if question.is_empty() {
        return Ok(());
    }

    let placeholder = msg
        .channel_id
        .send_message(
            &ctx.http,
            CreateMessage::new()
                .embed(embed::waiting("AI 질문"))
                .reference_message(msg),
        )
        .await?;
    let progress = Arc::new(MessageProgress::new(ctx.http.clone(), &placeholder));

    let request = TaskRequest::new(
        task::CHAT,
        json!({ "question": question, "author": msg.author.name.as_str() }),
    )
    .priority(PRIORITY_BACKGROUND)
    .author(author_of(&msg.author))
    .progress(progress.clone());

    let edit = match queue.submit(request).await {
        Ok(output) => EditMessage::new()
            .content(truncate_for_discord(&output.into_text()))
            .embeds(vec![]),
        Err(e) => {
            if !e.is_cancellation() {
                tracing::error!("멘션 응답 실패: {e}");
            }
            EditMessage::new().embed(failure_embed(&e))
        }
    };

    progress.finish(edit).await
}

/// 멘션 텍스트에서 봇 멘션을 제거하고 질문만 남긴다
fn extract_question(content: &str, bot_id: serenity::UserId) -> String {
    content
        .replace(&format!("<@{bot_id}>"), "")
        .replace(&format!("<@!{bot_id}>"), "")
        .trim()
        .to_string()
}

fn truncate_for_discord(text: &str) -> String {
    if text.len() <= MESSAGE_LIMIT {
        return text.to_string();
    }
    let mut end = MESSAGE_LIMIT - 3;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
