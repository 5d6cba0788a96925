use serde::{Deserialize, Serialize};

use crate::models::DraftVersionSummary;
use crate::services::ai::AiAction;

/// 초안의 현재 상태 스냅샷.
///
/// `content`와 `word_count`는 `current_version`이 가리키는 버전의 사본입니다.
/// (버전 이력 테이블을 읽지 않고도 목록/조회가 가능하도록 중복 저장)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Draft {
    pub id: String,
    pub title: String,
    pub content: String,
    /// "draft" 또는 "completed"
    pub status: String,
    pub current_version: i64,
    pub word_count: i64,
    /// 외부 파일 저장소의 템플릿 파일 참조 (내용은 이 서버가 해석하지 않음)
    pub template_file_id: Option<String>,
    /// 외부 파일 저장소의 데이터 파일 참조
    pub data_file_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// status가 "completed"일 때만 값이 있습니다.
    pub completed_at: Option<String>,
}

/// 목록 응답용 요약 (본문 제외)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DraftSummary {
    pub id: String,
    pub title: String,
    pub status: String,
    pub current_version: i64,
    pub word_count: i64,
    pub template_file_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// 단일 초안 조회 응답: 초안 + 버전 이력 요약
#[derive(Debug, Serialize)]
pub struct DraftWithVersions {
    #[serde(flatten)]
    pub draft: Draft,
    pub versions: Vec<DraftVersionSummary>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDraftRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub template_file_id: Option<String>,
    pub data_file_id: Option<String>,
}

/// 부분 업데이트 요청. 포함된 필드만 반영됩니다.
/// 내용(content)이 현재 버전과 다르면 새 버전이 생성됩니다.
#[derive(Debug, Deserialize)]
pub struct UpdateDraftRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub data_file_id: Option<String>,
    /// 버전 기록에 남길 변경 요약
    pub change_summary: Option<String>,
}

/// 완료 요청. 제목/내용을 함께 주면 마지막 버전으로 반영한 뒤 완료 처리합니다.
#[derive(Debug, Deserialize)]
pub struct CompleteDraftRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// `GET /drafts`의 쿼리 파라미터 (?status=draft 등)
#[derive(Debug, Deserialize)]
pub struct ListDraftsQuery {
    pub status: Option<String>,
}

/// AI 생성 시작 요청.
///
/// `text`를 생략하면 초안의 현재 내용을 원문으로 사용합니다.
/// (에디터에서 일부 문단만 선택해 보낼 수도 있습니다)
#[derive(Debug, Deserialize)]
pub struct GenerateDraftRequest {
    pub action: AiAction,
    pub text: Option<String>,
    /// action이 "custom"일 때 사용할 자유 형식 지시문
    pub custom_prompt: Option<String>,
}

/// 초안 통계 응답 (`GET /drafts/statistics`)
#[derive(Debug, Serialize)]
pub struct DraftStatistics {
    pub total: i64,
    pub draft_count: i64,
    pub completed_count: i64,
}
