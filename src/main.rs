use std::sync::Arc;

use ai_queue_bot::ai::{self, AiQueue, GeminiClient, TaskRegistry};
use ai_queue_bot::{commands, config, events, Data};
use poise::serenity_prelude as serenity;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // AI 작업 큐 초기화 (Gemini 키가 있을 때만)
    let ai_queue = match &config.gemini_api_key {
        Some(key) => match GeminiClient::with_timeout(key.clone(), config.ai_request_timeout) {
            Ok(client) => {
                let generator = Arc::new(client.model(config.gemini_model.clone()));
                let queue = AiQueue::new(TaskRegistry::builtin(), generator, config.queue_options());
                tracing::info!(
                    "AI 작업 큐 초기화 완료: 모델 {}, 쿨다운 {:?}",
                    config.gemini_model,
                    config.ai_cooldown
                );
                Some(queue)
            }
            Err(e) => {
                tracing::error!("Gemini 클라이언트 생성 실패: {e}");
                None
            }
        },
        None => {
            tracing::warn!("GEMINI_API_KEY가 없어 AI 기능을 비활성화합니다");
            None
        }
    };

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let ai_channel_id = config.ai_channel_id;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                // 워커 루프는 프로세스 수명 동안 하나만 돈다
                if let Some(queue) = &ai_queue {
                    queue.spawn();
                    ai::spawn_event_logger(queue);
                }

                tracing::info!("봇이 준비되었습니다!");
                Ok(Data {
                    ai_queue,
                    ai_channel_id,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .expect("클라이언트 생성 실패");

    if let Err(e) = client.start().await {
        tracing::error!("클라이언트 오류: {e}");
    }
}
