//! # AI 생성 라우트 핸들러
//!
//! 초안에 대한 AI 생성 스트림의 시작/취소와 동작 목록 조회를 처리합니다.
//!
//! ## 엔드포인트
//! - `POST /api/v1/drafts/{id}/generate`        → 생성 시작, SSE로 중계
//! - `POST /api/v1/drafts/{id}/generate/cancel` → 진행 중 생성 취소
//! - `GET  /api/v1/ai/actions`                  → 사용 가능한 동작 목록
//!
//! ## 스트림 중계
//! 생성 서비스에서 받은 이벤트를 같은 프레임 규약으로 다시 내보냅니다:
//! `data: <조각>` 반복 후 `data: [DONE]` 또는 `data: [ERROR] <메시지>`.
//! 조각은 미리보기일 뿐 이력에 기록되지 않습니다. 결과를 수락하려면
//! 수신 측이 누적한 전체 텍스트를 일반 수정 API(`PUT /drafts/{id}`)로
//! 저장해 새 버전을 만듭니다. 에러로 끝난 스트림은 버전을 만들지 않습니다.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use serde_json::{json, Value};

use super::drafts::AppState;
use crate::{
    db,
    error::AppError,
    models::GenerateDraftRequest,
    services::ai::{decoder, prompt, CancelToken, GenerationRequest, StreamEvent},
    services::text,
};

/// `POST /drafts/{id}/generate` — AI 생성을 시작하고 SSE로 중계합니다.
///
/// 같은 초안에 이미 진행 중인 스트림이 있으면 409 conflict.
/// 입력 검증과 스트림 등록은 생성 서비스로 요청을 보내기 **전에** 끝납니다.
pub async fn generate_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<GenerateDraftRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let draft = db::get_draft(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    // 원문: 요청에 없으면 초안의 현재 내용을 사용합니다
    let source_text = req.text.unwrap_or(draft.content);

    if text::count_chars(&source_text) > state.config.ai_max_input_chars {
        return Err(AppError::BadRequest(format!(
            "source text is too long (max {} chars)",
            state.config.ai_max_input_chars
        )));
    }
    let prompt = prompt::render(req.action, &source_text, req.custom_prompt.as_deref())
        .map_err(AppError::BadRequest)?;

    // 한 초안에 하나의 스트림: 레지스트리 등록이 네트워크 활동보다 먼저입니다
    let cancel = CancelToken::new();
    let guard = state.generations.begin(&id, cancel.clone())?;

    let request = GenerationRequest {
        text: source_text,
        action: req.action,
        prompt,
    };
    let stream = state.ai.start(request, cancel);
    tracing::info!("generation started for draft {} ({})", id, req.action.as_str());

    // 이벤트 채널 → SSE 프레임.
    // 종결 이벤트가 나가거나 클라이언트가 끊기면 (스트림, 가드)가 드롭되며
    // 레지스트리 항목 정리와 전송 취소가 함께 일어납니다.
    let frames = futures::stream::unfold(Some((stream, guard)), |slot| async move {
        let (mut stream, guard) = slot?;
        let event = stream.next_event().await?;
        let frame = match &event {
            StreamEvent::Chunk(chunk) => Event::default().data(chunk),
            StreamEvent::Done => Event::default().data(decoder::DONE_TOKEN),
            StreamEvent::Error(message) => {
                Event::default().data(format!("{}{}", decoder::ERROR_TOKEN, message))
            }
        };
        let next = if event.is_terminal() {
            None
        } else {
            Some((stream, guard))
        };
        Some((Ok::<_, Infallible>(frame), next))
    });

    Ok(Sse::new(frames).keep_alive(KeepAlive::default()))
}

/// `POST /drafts/{id}/generate/cancel` — 진행 중 생성을 취소합니다.
///
/// 취소는 협조적입니다: 신호를 보내고, 스트림이 멈추면 더 이상의
/// 이벤트 전달 없이 SSE 연결이 닫힙니다. 진행 중인 스트림이 없어도
/// 에러가 아니며 `cancelled: false`로 응답합니다.
pub async fn cancel_generation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    db::get_draft(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let cancelled = state.generations.cancel(&id);
    if cancelled {
        tracing::info!("generation cancelled for draft {}", id);
    }
    Ok(Json(json!({ "cancelled": cancelled })))
}

/// `GET /ai/actions` — 사용 가능한 생성 동작 목록을 반환합니다.
pub async fn list_ai_actions() -> Json<Value> {
    Json(json!({ "actions": prompt::action_catalog() }))
}
