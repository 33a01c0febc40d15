use thiserror::Error;

/// A single generator attempt failed. Every variant is retryable.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("HTTP 오류: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API 응답 코드 {status}: {message}")]
    Status { status: u16, message: String },

    #[error("API 오류: {0}")]
    Api(String),

    #[error("빈 응답")]
    EmptyResponse,

    #[error("응답 형식 오류: {0}")]
    InvalidResponse(String),
}

/// Final outcome delivered through a task's handle when it does not succeed.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("알 수 없는 작업 유형: {0}")]
    UnknownKind(String),

    #[error("AI 요청 실패: {0}")]
    Generation(#[from] GenerateError),

    #[error("대기열이 비워져 작업이 취소되었습니다")]
    Cleared,

    #[error("작업이 대기열에서 제거되었습니다")]
    Removed,

    #[error("AI 대기열이 종료되었습니다")]
    QueueClosed,
}

impl TaskError {
    /// Cancelled on purpose (`clear_queue` / `remove_task`), not a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cleared | Self::Removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_variants() {
        assert!(TaskError::Cleared.is_cancellation());
        assert!(TaskError::Removed.is_cancellation());
        assert!(!TaskError::QueueClosed.is_cancellation());
        assert!(!TaskError::UnknownKind("x".into()).is_cancellation());
        assert!(!TaskError::Generation(GenerateError::EmptyResponse).is_cancellation());
    }

    #[test]
    fn test_generation_error_display_keeps_cause() {
        let err = TaskError::from(GenerateError::Api("quota exceeded".to_string()));
        let msg = err.to_string();
        assert!(msg.contains("AI 요청 실패"));
        assert!(msg.contains("quota exceeded"));
    }

    #[test]
    fn test_status_error_display() {
        let err = GenerateError::Status {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "API 응답 코드 429: rate limited");
    }
}
