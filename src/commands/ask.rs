use serde_json::json;

use crate::ai::discord::run_command_task;
use crate::ai::task::{self, PRIORITY_COMMAND};
use crate::ai::TaskRequest;
use crate::utils::embed;
use crate::{Context, Error};

async fn ask_impl(ctx: Context<'_>, question: String) -> Result<(), Error> {
    let request = TaskRequest::new(
        task::CHAT,
        json!({ "question": question, "author": ctx.author().name.as_str() }),
    )
    .priority(PRIORITY_COMMAND);

    run_command_task(ctx, "AI 질문", request, |output| {
        embed::answer("💬 AI 답변", &output.into_text())
    })
    .await
}

/// AI에게 질문합니다
#[poise::command(slash_command, guild_only)]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "질문 내용"] question: String,
) -> Result<(), Error> {
    ask_impl(ctx, question).await
}

/// AI에게 질문합니다 (/ask 단축)
#[poise::command(slash_command, guild_only)]
pub async fn a(
    ctx: Context<'_>,
    #[description = "질문 내용"] question: String,
) -> Result<(), Error> {
    ask_impl(ctx, question).await
}
