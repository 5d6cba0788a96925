//! # 에러 처리 모듈
//!
//! 애플리케이션에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//! Rust에서는 예외(exception) 대신 `Result<T, E>` 타입으로 에러를 처리합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형(enum): 모든 에러 종류를 하나의 타입으로 통합
//! - `IntoResponse` 구현: 에러를 HTTP 응답으로 자동 변환
//!
//! 참고: AI 스트림 도중의 실패(전송 오류, 생성 서비스 오류)는 이 타입을
//! 거치지 않습니다. 스트림이 이미 시작된 뒤에는 HTTP 상태 코드를 바꿀 수
//! 없으므로, 스트림 안에서 `[ERROR] ...` 프레임으로 전달됩니다.
//! (services/ai 모듈 참고)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::history::HistoryError;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 각 에러 variant는 적절한 HTTP 상태 코드와 메시지로 변환됩니다.
/// 핸들러에서 `Result<T, AppError>`를 반환하면,
/// Axum이 자동으로 `IntoResponse`를 호출하여 HTTP 응답으로 변환합니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 요청한 리소스를 찾을 수 없음 (HTTP 404)
    #[error("Resource not found")]
    NotFound,

    /// 잘못된 요청 (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 리소스 충돌 (HTTP 409)
    /// 예: 이미 생성 스트림이 진행 중인 초안에 새 생성을 요청한 경우
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 허용되지 않는 상태 전이 (HTTP 409)
    /// 예: 이미 완료된 초안을 다시 완료 처리하려는 경우
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// 데이터베이스 오류 (HTTP 500)
    /// #[from]: sqlx::Error → AppError::Database 자동 변환.
    /// sqlx 함수 호출에 `?`를 붙이면 이 variant로 전파됩니다.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// 순수 상태 기계(services/history.rs)의 에러를 HTTP 계층의 에러로 변환합니다.
// 상태 기계 쪽은 axum을 전혀 모르게 유지하고, 변환은 여기서만 일어납니다.
impl From<HistoryError> for AppError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::VersionNotFound(_) => AppError::NotFound,
            HistoryError::InvalidTransition(msg) => AppError::InvalidTransition(msg),
        }
    }
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 내부 에러(Database, Internal)는 실제 에러 내용을 로그에만 기록하고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다.
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::BadRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", msg.clone())
            }
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::InvalidTransition(ref msg) => {
                (StatusCode::CONFLICT, "invalid_transition", msg.clone())
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
        };

        // 결과: { "error": { "code": "...", "message": "..." } }
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
