//! # 초안(Draft) 라우트 핸들러
//!
//! 초안의 CRUD와 상태 전이(완료/재개), 버전 조회/롤백을 처리하는
//! HTTP 핸들러 함수들입니다.
//!
//! ## 엔드포인트
//! - `GET    /api/v1/drafts`                         → 초안 목록 (?status= 필터)
//! - `POST   /api/v1/drafts`                         → 새 초안 생성
//! - `GET    /api/v1/drafts/statistics`              → 상태별 통계
//! - `GET    /api/v1/drafts/{id}`                    → 단일 초안 + 버전 요약
//! - `PUT    /api/v1/drafts/{id}`                    → 수정 (내용 변경 시 새 버전)
//! - `DELETE /api/v1/drafts/{id}`                    → 삭제 (버전 이력 포함)
//! - `POST   /api/v1/drafts/{id}/complete`           → 완료 처리
//! - `POST   /api/v1/drafts/{id}/reopen`             → 완료 취소 (재편집)
//! - `GET    /api/v1/drafts/{id}/versions`           → 버전 전체 조회
//! - `POST   /api/v1/drafts/{id}/rollback/{version}` → 지정 버전으로 롤백
//!
//! ## 처리 흐름
//! 이력을 바꾸는 핸들러는 공통으로:
//! 1. db에서 `DraftHistory`를 복원하고
//! 2. 순수 상태 기계의 연산을 적용한 뒤 (여기서 규칙 위반이 걸러집니다)
//! 3. 결과를 한 트랜잭션으로 저장합니다.
//! 같은 초안에 대한 동시 호출은 저장소 트랜잭션이 직렬화합니다.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    db,
    error::AppError,
    models::*,
    services::ai::{AiClient, GenerationRegistry},
    services::history::{DraftHistory, DraftStatus},
};

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// SqlitePool과 AiClient는 내부적으로 공유 구조라 clone 비용이 낮습니다.
#[derive(Clone)]
pub struct AppState {
    /// SQLite 연결 풀
    pub pool: SqlitePool,
    /// 환경변수에서 읽은 설정
    pub config: Config,
    /// AI 생성 서비스 클라이언트
    pub ai: AiClient,
    /// 초안별 진행 중 생성 스트림 대장
    pub generations: GenerationRegistry,
}

/// `GET /drafts` — 초안 목록을 조회합니다.
pub async fn list_drafts(
    State(state): State<AppState>,
    Query(query): Query<ListDraftsQuery>,
) -> Result<Json<Value>, AppError> {
    // 상태 필터 값 검증: 모르는 값은 조용히 무시하지 않고 400으로 돌려줍니다
    let status = match query.status.as_deref() {
        Some(s) => Some(
            DraftStatus::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown status filter: {s}")))?
                .as_str(),
        ),
        None => None,
    };
    let drafts = db::list_drafts(&state.pool, status).await?;
    Ok(Json(json!({ "drafts": drafts })))
}

/// `POST /drafts` — 새 초안을 생성합니다.
///
/// 초기 내용으로 버전 1이 함께 만들어집니다.
pub async fn create_draft(
    State(state): State<AppState>,
    Json(req): Json<CreateDraftRequest>,
) -> Result<Json<Draft>, AppError> {
    let title = req.title.as_deref().unwrap_or("제목 없는 초안");
    let content = req.content.as_deref().unwrap_or("");

    let history = DraftHistory::new(content, Some("최초 작성".to_string()));
    let id = uuid::Uuid::now_v7().to_string();
    db::insert_draft(
        &state.pool,
        &id,
        title,
        req.template_file_id.as_deref(),
        req.data_file_id.as_deref(),
        &history,
    )
    .await?;

    // 생성 직후 조회하여 DB가 채운 기본값(created_at 등)이 포함된 객체를 반환
    let draft = db::get_draft(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::Internal("failed to retrieve created draft".to_string()))?;
    Ok(Json(draft))
}

/// `GET /drafts/statistics` — 상태별 초안 개수를 조회합니다.
pub async fn draft_statistics(
    State(state): State<AppState>,
) -> Result<Json<DraftStatistics>, AppError> {
    let stats = db::draft_statistics(&state.pool).await?;
    Ok(Json(stats))
}

/// `GET /drafts/{id}` — 단일 초안을 버전 요약과 함께 조회합니다.
pub async fn get_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DraftWithVersions>, AppError> {
    let draft = db::get_draft(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    let versions = db::list_version_summaries(&state.pool, &id).await?;
    Ok(Json(DraftWithVersions { draft, versions }))
}

/// `PUT /drafts/{id}` — 초안을 수정합니다.
///
/// 내용이 현재 버전과 실제로 달라졌을 때만 새 버전이 생성됩니다.
/// 제목만 바꾸는 요청은 버전 이력을 건드리지 않습니다.
pub async fn update_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDraftRequest>,
) -> Result<Json<Draft>, AppError> {
    let mut history = db::load_history(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_content = req
        .content
        .as_deref()
        .filter(|content| *content != history.current().content);

    // 파일 참조 변경은 버전 이력과 무관한 메타데이터입니다
    if req.data_file_id.is_some() {
        db::update_metadata(&state.pool, &id, None, req.data_file_id.as_deref()).await?;
    }

    match new_content {
        Some(content) => {
            let summary = req
                .change_summary
                .clone()
                .unwrap_or_else(|| format!("버전 {}", history.current_number() + 1));
            let number = history.create_version(content, Some(summary)).number;
            db::persist_history(&state.pool, &id, req.title.as_deref(), &history, number).await?;
        }
        None => {
            if req.title.is_some() {
                db::update_metadata(&state.pool, &id, req.title.as_deref(), None).await?;
            }
        }
    }

    let draft = db::get_draft(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(draft))
}

/// `DELETE /drafts/{id}` — 초안을 버전 이력과 함께 삭제합니다.
///
/// 진행 중인 생성 스트림이 있으면 먼저 취소합니다.
pub async fn delete_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.generations.is_active(&id) {
        state.generations.cancel(&id);
    }

    let deleted = db::delete_draft(&state.pool, &id).await?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /drafts/{id}/complete` — 초안을 완료 상태로 전환합니다.
///
/// 본문에 제목/내용을 주면 마지막 버전으로 반영한 뒤 완료 처리합니다.
/// 이미 완료된 초안이면 409 invalid_transition.
pub async fn complete_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CompleteDraftRequest>,
) -> Result<Json<Draft>, AppError> {
    let mut history = db::load_history(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_number = history.complete(req.content.as_deref())?;
    // 새 버전이 없으면 저장할 버전 범위가 비도록 다음 번호를 넘깁니다
    let first_new = new_number.unwrap_or(history.current_number() + 1);
    db::persist_history(&state.pool, &id, req.title.as_deref(), &history, first_new).await?;

    let draft = db::get_draft(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(draft))
}

/// `POST /drafts/{id}/reopen` — 완료된 초안을 다시 편집 가능하게 되돌립니다.
///
/// 버전 이력은 그대로 유지됩니다. 완료 상태가 아니면 409 invalid_transition.
pub async fn reopen_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Draft>, AppError> {
    let mut history = db::load_history(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    history.reopen()?;
    db::persist_history(&state.pool, &id, None, &history, history.current_number() + 1).await?;

    let draft = db::get_draft(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(draft))
}

/// `GET /drafts/{id}/versions` — 초안의 전체 버전을 최신순으로 조회합니다.
pub async fn list_draft_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    db::get_draft(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let versions = db::list_versions(&state.pool, &id).await?;
    Ok(Json(json!({ "versions": versions })))
}

/// `POST /drafts/{id}/rollback/{version}` — 지정 버전의 내용으로 되돌립니다.
///
/// 이력을 자르지 않고, 대상 버전의 내용을 복사한 새 버전을 만듭니다.
/// 존재하지 않는 버전이면 404.
pub async fn rollback_draft(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, i64)>,
) -> Result<Json<Draft>, AppError> {
    let mut history = db::load_history(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let number = history.rollback_to(version)?.number;
    db::persist_history(&state.pool, &id, None, &history, number).await?;

    let draft = db::get_draft(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(draft))
}
