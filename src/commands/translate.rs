use serde_json::json;

use crate::ai::discord::run_command_task;
use crate::ai::task::{self, PRIORITY_COMMAND};
use crate::ai::TaskRequest;
use crate::utils::embed;
use crate::{Context, Error};

async fn translate_impl(
    ctx: Context<'_>,
    text: String,
    target: Option<String>,
) -> Result<(), Error> {
    let target = target.unwrap_or_else(|| "한국어".to_string());
    let title = format!("🌐 번역 ({target})");
    let request =
        TaskRequest::new(task::TRANSLATE, json!({ "text": text, "target": target }))
            .priority(PRIORITY_COMMAND);

    run_command_task(ctx, "번역", request, |output| {
        embed::answer(&title, &output.into_text())
    })
    .await
}

/// 텍스트를 번역합니다
#[poise::command(slash_command, guild_only)]
pub async fn translate(
    ctx: Context<'_>,
    #[description = "번역할 텍스트"] text: String,
    #[description = "목표 언어 (기본: 한국어)"] target: Option<String>,
) -> Result<(), Error> {
    translate_impl(ctx, text, target).await
}

/// 텍스트를 번역합니다 (/translate 단축)
#[poise::command(slash_command, guild_only)]
pub async fn tr(
    ctx: Context<'_>,
    #[description = "번역할 텍스트"] text: String,
    #[description = "목표 언어 (기본: 한국어)"] target: Option<String>,
) -> Result<(), Error> {
    translate_impl(ctx, text, target).await
}
