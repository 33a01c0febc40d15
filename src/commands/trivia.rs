use serde_json::json;

use crate::ai::discord::run_command_task;
use crate::ai::task::{self, TriviaQuestion, PRIORITY_COMMAND};
use crate::ai::TaskRequest;
use crate::utils::embed;
use crate::{Context, Error};

fn trivia_request(topic: Option<String>) -> TaskRequest {
    TaskRequest::new(task::TRIVIA, json!({ "topic": topic })).priority(PRIORITY_COMMAND)
}

async fn trivia_impl(ctx: Context<'_>, topic: Option<String>) -> Result<(), Error> {
    run_command_task(ctx, "퀴즈", trivia_request(topic), |output| {
        match TriviaQuestion::from_output(output) {
            Ok(trivia) => embed::trivia(&trivia),
            Err(e) => embed::error(&format!("퀴즈를 읽을 수 없습니다: {e}")),
        }
    })
    .await
}

/// AI가 퀴즈를 출제합니다
#[poise::command(slash_command, guild_only)]
pub async fn trivia(
    ctx: Context<'_>,
    #[description = "주제 (비우면 자유 주제)"] topic: Option<String>,
) -> Result<(), Error> {
    trivia_impl(ctx, topic).await
}

/// AI가 퀴즈를 출제합니다 (/trivia 별칭)
#[poise::command(slash_command, guild_only)]
pub async fn quiz(
    ctx: Context<'_>,
    #[description = "주제 (비우면 자유 주제)"] topic: Option<String>,
) -> Result<(), Error> {
    trivia_impl(ctx, topic).await
}
