use poise::CreateReply;

use crate::ai::{AiQueue, TaskId};
use crate::utils::embed;
use crate::{Context, Error};

async fn queue_or_reply(ctx: Context<'_>) -> Result<Option<AiQueue>, Error> {
    let queue = ctx.data().ai_queue.clone();
    if queue.is_none() {
        ctx.send(
            CreateReply::default()
                .embed(embed::error("AI 기능이 비활성화되어 있습니다."))
                .ephemeral(true),
        )
        .await?;
    }
    Ok(queue)
}

/// AI 대기열을 관리합니다
#[poise::command(
    slash_command,
    guild_only,
    subcommands("status", "cancel", "clear"),
    subcommand_required
)]
pub async fn aiqueue(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// AI 대기열 상태를 표시합니다
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let Some(queue) = queue_or_reply(ctx).await? else {
        return Ok(());
    };

    let status = queue.status().await;
    ctx.send(CreateReply::default().embed(embed::queue_status(&status)))
        .await?;
    Ok(())
}

/// 대기 중인 AI 작업을 취소합니다
#[poise::command(slash_command, guild_only)]
pub async fn cancel(
    ctx: Context<'_>,
    #[description = "작업 ID (진행 메시지 하단에 표시됨)"] id: String,
) -> Result<(), Error> {
    let Some(queue) = queue_or_reply(ctx).await? else {
        return Ok(());
    };

    let id = TaskId::from(id.trim());
    let embed = if queue.remove_task(&id).await {
        embed::cancelled(&format!("작업 `{id}`을(를) 취소했습니다."))
    } else {
        embed::error(&format!(
            "대기 중인 작업 `{id}`을(를) 찾을 수 없습니다. 이미 처리 중이거나 끝났을 수 있습니다."
        ))
    };

    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// 대기 중인 AI 작업을 모두 취소합니다
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn clear(ctx: Context<'_>) -> Result<(), Error> {
    let Some(queue) = queue_or_reply(ctx).await? else {
        return Ok(());
    };

    let count = queue.clear_queue().await;
    tracing::info!("{}님이 AI 대기열을 비웠습니다 ({count}개)", ctx.author().name);
    ctx.send(CreateReply::default().embed(embed::cancelled(&format!(
        "대기 중이던 작업 {count}개를 취소했습니다."
    ))))
    .await?;
    Ok(())
}
