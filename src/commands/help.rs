use poise::CreateReply;
use serenity::builder::CreateEmbed;

use crate::{Context, Error};

async fn help_impl(ctx: Context<'_>) -> Result<(), Error> {
    let ai_cmds = "\
`/ask` (`/a`) — AI에게 질문
`/translate` (`/tr`) — 텍스트 번역
`/trivia` (`/quiz`) — AI 퀴즈 출제
봇을 멘션해도 질문할 수 있습니다.";

    let queue_cmds = "\
`/aiqueue status` — 대기열 상태
`/aiqueue cancel` — 대기 중인 작업 취소 (작업 ID 필요)
`/aiqueue clear` — 대기열 전체 취소 (메시지 관리 권한)";

    let embed = CreateEmbed::new()
        .title("도움말")
        .field("AI", ai_cmds, false)
        .field("대기열", queue_cmds, false)
        .footer(serenity::builder::CreateEmbedFooter::new(
            "AI 요청은 순서대로 하나씩 처리됩니다.",
        ))
        .color(0x5865F2);

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// 봇 명령어 도움말
#[poise::command(slash_command, guild_only)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    help_impl(ctx).await
}
