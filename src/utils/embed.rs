use serenity::builder::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter};
use serenity::model::Timestamp;

use crate::ai::progress::ProgressUpdate;
use crate::ai::queue::QueueStatus;
use crate::ai::task::TriviaQuestion;

const AI_COLOR: u32 = 0x5865F2;
const SUCCESS_COLOR: u32 = 0x57F287;
const NEUTRAL_COLOR: u32 = 0x99AAB5;

/// Discord embed description limit.
const DESCRIPTION_LIMIT: usize = 4096;

const CHOICE_MARKS: [&str; 4] = ["🇦", "🇧", "🇨", "🇩"];

fn clamp_description(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_LIMIT {
        return text.to_string();
    }
    let mut out: String = text.chars().take(DESCRIPTION_LIMIT - 3).collect();
    out.push_str("...");
    out
}

pub fn progress(update: &ProgressUpdate) -> CreateEmbed {
    let secs = update
        .timestamp
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64);
    let timestamp = Timestamp::from_unix_timestamp(secs).unwrap_or_else(|_| Timestamp::now());

    let mut embed = CreateEmbed::new()
        .title(&update.title)
        .description(clamp_description(&update.description))
        .color(update.color)
        .footer(CreateEmbedFooter::new(&update.footer))
        .timestamp(timestamp);

    if let Some(author) = &update.author {
        let mut builder = CreateEmbedAuthor::new(&author.name);
        if let Some(url) = &author.icon_url {
            builder = builder.icon_url(url);
        }
        embed = embed.author(builder);
    }
    embed
}

pub fn waiting(title: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!("⏳ {title}"))
        .description("요청을 대기열에 등록하는 중...")
        .color(NEUTRAL_COLOR)
}

pub fn answer(title: &str, text: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title(title)
        .description(clamp_description(text))
        .color(SUCCESS_COLOR)
}

pub fn trivia(trivia: &TriviaQuestion) -> CreateEmbed {
    let mut description = format!("**{}**\n\n", trivia.question);
    for (mark, choice) in CHOICE_MARKS.iter().zip(&trivia.choices) {
        description.push_str(&format!("{mark} {choice}\n"));
    }

    let answer_mark = CHOICE_MARKS
        .get(trivia.answer_index)
        .copied()
        .unwrap_or("?");
    let mut reveal = format!("||{answer_mark} {}||", trivia.answer().unwrap_or_default());
    if !trivia.explanation.is_empty() {
        reveal.push_str(&format!("\n||{}||", trivia.explanation));
    }

    CreateEmbed::new()
        .title("❓ 퀴즈")
        .description(clamp_description(&description))
        .field("정답 (클릭해서 확인)", reveal, false)
        .color(AI_COLOR)
}

pub fn queue_status(status: &QueueStatus) -> CreateEmbed {
    let processing = status
        .processing
        .as_ref()
        .map_or("없음".to_string(), |t| format!("`{}` ({})", t.id, t.kind));
    let next = status.next_task.as_ref().map_or("없음".to_string(), |t| {
        format!("`{}` ({}, 우선순위 {})", t.id, t.kind, t.priority)
    });

    CreateEmbed::new()
        .title("🤖 AI 대기열")
        .field("대기 중", format!("{}개", status.queue_length), true)
        .field("재시도 대기", format!("{}개", status.retrying), true)
        .field("처리 중", processing, false)
        .field("다음 작업", next, false)
        .color(AI_COLOR)
}

pub fn cancelled(message: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title("🚫 취소됨")
        .description(message)
        .color(NEUTRAL_COLOR)
}

pub fn error(message: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ 오류")
        .description(message)
        .color(0xED4245)
}
