//! Task kinds the queue knows how to run.
//!
//! A [`TaskRegistry`] maps a kind name to a [`TaskConfig`]. The queue only
//! reads the registry, so adding a kind means registering one more config.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const CHAT: &str = "chat";
pub const TRANSLATE: &str = "translate";
pub const TRIVIA: &str = "trivia";

/// Slash commands jump ahead of background work such as mentions.
pub const PRIORITY_COMMAND: i32 = 1;
pub const PRIORITY_BACKGROUND: i32 = 0;

const DESCRIPTION_PREVIEW_CHARS: usize = 100;

type PromptFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;
type ValidateFn = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Schema sent to the generator plus the check run over what comes back.
pub struct StructuredResponse {
    pub schema: Value,
    validate: ValidateFn,
}

impl StructuredResponse {
    pub fn validate(&self, parsed: Value) -> Result<Value, String> {
        (self.validate)(parsed)
    }
}

pub struct TaskConfig {
    pub title: String,
    pub icon: String,
    pub system_prompt: String,
    user_prompt: PromptFn,
    description: PromptFn,
    structured: Option<StructuredResponse>,
}

impl TaskConfig {
    /// Defaults: the payload's JSON text is the user prompt, no description.
    pub fn new(
        title: impl Into<String>,
        icon: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            icon: icon.into(),
            system_prompt: system_prompt.into(),
            user_prompt: Arc::new(|payload: &Value| payload.to_string()),
            description: Arc::new(|_: &Value| String::new()),
            structured: None,
        }
    }

    pub fn user_prompt(mut self, f: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        self.user_prompt = Arc::new(f);
        self
    }

    pub fn description(mut self, f: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        self.description = Arc::new(f);
        self
    }

    pub fn structured(
        mut self,
        schema: Value,
        validate: impl Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.structured = Some(StructuredResponse {
            schema,
            validate: Arc::new(validate),
        });
        self
    }

    pub fn build_user_prompt(&self, payload: &Value) -> String {
        (self.user_prompt)(payload)
    }

    pub fn build_description(&self, payload: &Value) -> String {
        (self.description)(payload)
    }

    pub fn structured_response(&self) -> Option<&StructuredResponse> {
        self.structured.as_ref()
    }

    pub fn has_structured_response(&self) -> bool {
        self.structured.is_some()
    }
}

#[derive(Clone, Default)]
pub struct TaskRegistry {
    configs: HashMap<String, Arc<TaskConfig>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bot's own kinds: chat, translate and trivia.
    pub fn builtin() -> Self {
        Self::new()
            .register(CHAT, chat_config())
            .register(TRANSLATE, translate_config())
            .register(TRIVIA, trivia_config())
    }

    pub fn register(mut self, kind: impl Into<String>, config: TaskConfig) -> Self {
        self.configs.insert(kind.into(), Arc::new(config));
        self
    }

    pub fn get(&self, kind: &str) -> Option<Arc<TaskConfig>> {
        self.configs.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.configs.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.configs.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

/// What a finished task hands back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    Text(String),
    Structured(Value),
}

impl TaskOutput {
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Structured(value) => value.to_string(),
        }
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

fn payload_str<'a>(payload: &'a Value, key: &str) -> &'a str {
    payload.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Cut to `max_chars` characters, appending an ellipsis when shortened.
pub fn preview(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}…", &text[..end]),
        None => text.to_string(),
    }
}

// --- chat ---

const CHAT_SYSTEM_PROMPT: &str = "\
당신은 디스코드 서버의 친절한 도우미 봇입니다.
규칙:
- 질문한 언어로 답변. 기본은 한국어.
- 핵심만 간결하게. 필요하면 목록 사용.
- 디스코드 마크다운만 사용.
- 답변은 1500자 이내.";

fn chat_config() -> TaskConfig {
    TaskConfig::new("AI 질문", "💬", CHAT_SYSTEM_PROMPT)
        .user_prompt(|payload| {
            let question = payload_str(payload, "question");
            match payload.get("author").and_then(Value::as_str) {
                Some(author) => format!("[{author}] {question}"),
                None => question.to_string(),
            }
        })
        .description(|payload| {
            format!(
                "**질문:** {}",
                preview(payload_str(payload, "question"), DESCRIPTION_PREVIEW_CHARS)
            )
        })
}

// --- translate ---

const TRANSLATE_SYSTEM_PROMPT: &str = "\
당신은 전문 번역가입니다.
주어진 텍스트를 요청된 언어로 자연스럽게 번역하세요.
번역문만 출력하고 설명은 붙이지 마세요.";

const DEFAULT_TARGET_LANGUAGE: &str = "한국어";

fn target_language(payload: &Value) -> &str {
    match payload_str(payload, "target") {
        "" => DEFAULT_TARGET_LANGUAGE,
        target => target,
    }
}

fn translate_config() -> TaskConfig {
    TaskConfig::new("번역", "🌐", TRANSLATE_SYSTEM_PROMPT)
        .user_prompt(|payload| {
            format!(
                "다음 텍스트를 {}(으)로 번역하세요:\n\n{}",
                target_language(payload),
                payload_str(payload, "text")
            )
        })
        .description(|payload| {
            format!(
                "**→ {}**\n{}",
                target_language(payload),
                preview(payload_str(payload, "text"), DESCRIPTION_PREVIEW_CHARS)
            )
        })
}

// --- trivia ---

const TRIVIA_SYSTEM_PROMPT: &str = "\
당신은 퀴즈 출제자입니다.
주어진 주제로 사지선다 퀴즈 한 문제를 만드세요.
- 보기는 정확히 4개, 정답은 하나.
- answer_index는 0부터 시작하는 정답 보기 번호.
- explanation에는 정답 해설을 한두 문장으로.
- 한국어로 작성.";

pub const TRIVIA_CHOICES: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriviaQuestion {
    pub question: String,
    pub choices: Vec<String>,
    pub answer_index: usize,
    #[serde(default)]
    pub explanation: String,
}

impl TriviaQuestion {
    pub fn from_output(output: TaskOutput) -> Result<Self, serde_json::Error> {
        match output {
            TaskOutput::Structured(value) => serde_json::from_value(value),
            TaskOutput::Text(text) => serde_json::from_str(&text),
        }
    }

    pub fn answer(&self) -> Option<&str> {
        self.choices.get(self.answer_index).map(String::as_str)
    }
}

fn trivia_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "question": { "type": "STRING" },
            "choices": { "type": "ARRAY", "items": { "type": "STRING" } },
            "answer_index": { "type": "INTEGER" },
            "explanation": { "type": "STRING" }
        },
        "required": ["question", "choices", "answer_index", "explanation"]
    })
}

pub fn validate_trivia(parsed: Value) -> Result<Value, String> {
    let trivia: TriviaQuestion =
        serde_json::from_value(parsed).map_err(|e| format!("퀴즈 형식 오류: {e}"))?;

    if trivia.question.trim().is_empty() {
        return Err("문제가 비어 있습니다".to_string());
    }
    if trivia.choices.len() != TRIVIA_CHOICES {
        return Err(format!(
            "보기는 {TRIVIA_CHOICES}개여야 합니다 (받은 개수: {})",
            trivia.choices.len()
        ));
    }
    if trivia.choices.iter().any(|c| c.trim().is_empty()) {
        return Err("빈 보기가 있습니다".to_string());
    }
    if trivia.answer_index >= trivia.choices.len() {
        return Err(format!("정답 번호가 범위를 벗어났습니다: {}", trivia.answer_index));
    }

    serde_json::to_value(trivia).map_err(|e| e.to_string())
}

fn trivia_config() -> TaskConfig {
    TaskConfig::new("퀴즈", "❓", TRIVIA_SYSTEM_PROMPT)
        .user_prompt(|payload| match payload_str(payload, "topic") {
            "" => "자유 주제로 퀴즈를 내주세요.".to_string(),
            topic => format!("주제: {topic}"),
        })
        .description(|payload| match payload_str(payload, "topic") {
            "" => "**주제:** 자유".to_string(),
            topic => format!("**주제:** {}", preview(topic, DESCRIPTION_PREVIEW_CHARS)),
        })
        .structured(trivia_schema(), validate_trivia)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trivia() -> Value {
        json!({
            "question": "러스트의 마스코트는?",
            "choices": ["게", "고퍼", "뱀", "코끼리"],
            "answer_index": 0,
            "explanation": "Ferris는 게입니다."
        })
    }

    #[test]
    fn test_builtin_kinds() {
        let registry = TaskRegistry::builtin();
        assert_eq!(registry.kinds(), vec![CHAT, TRANSLATE, TRIVIA]);
        assert!(!registry.contains("not-a-real-type"));
        assert!(registry.get(TRIVIA).unwrap().has_structured_response());
        assert!(!registry.get(CHAT).unwrap().has_structured_response());
    }

    #[test]
    fn test_chat_prompt_includes_author() {
        let config = chat_config();
        let payload = json!({"question": "오늘 날씨 어때?", "author": "민수"});
        assert_eq!(config.build_user_prompt(&payload), "[민수] 오늘 날씨 어때?");

        let anonymous = json!({"question": "안녕"});
        assert_eq!(config.build_user_prompt(&anonymous), "안녕");
    }

    #[test]
    fn test_translate_defaults_to_korean() {
        let config = translate_config();
        let prompt = config.build_user_prompt(&json!({"text": "hello"}));
        assert!(prompt.contains("한국어"));
        assert!(prompt.ends_with("hello"));

        let prompt = config.build_user_prompt(&json!({"text": "안녕", "target": "English"}));
        assert!(prompt.contains("English"));
    }

    #[test]
    fn test_default_config_uses_payload_json() {
        let config = TaskConfig::new("t", "i", "s");
        let payload = json!({"a": 1});
        assert_eq!(config.build_user_prompt(&payload), r#"{"a":1}"#);
        assert_eq!(config.build_description(&payload), "");
    }

    #[test]
    fn test_preview_truncates_by_chars() {
        assert_eq!(preview("가나다라마", 3), "가나다…");
        assert_eq!(preview("  짧음  ", 10), "짧음");
    }

    #[test]
    fn test_validate_trivia_accepts_well_formed() {
        let validated = validate_trivia(sample_trivia()).unwrap();
        let trivia = TriviaQuestion::from_output(TaskOutput::Structured(validated)).unwrap();
        assert_eq!(trivia.answer(), Some("게"));
    }

    #[test]
    fn test_validate_trivia_rejects_bad_shapes() {
        let mut wrong_count = sample_trivia();
        wrong_count["choices"] = json!(["a", "b"]);
        assert!(validate_trivia(wrong_count).is_err());

        let mut out_of_range = sample_trivia();
        out_of_range["answer_index"] = json!(4);
        assert!(validate_trivia(out_of_range).is_err());

        let mut empty_question = sample_trivia();
        empty_question["question"] = json!("  ");
        assert!(validate_trivia(empty_question).is_err());

        assert!(validate_trivia(json!({"question": "q"})).is_err());
    }

    #[test]
    fn test_task_output_into_text() {
        assert_eq!(TaskOutput::Text("hi".into()).into_text(), "hi");
        assert_eq!(TaskOutput::Structured(json!({"a": 1})).into_text(), r#"{"a":1}"#);
    }
}
