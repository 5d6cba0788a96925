use serde::{Deserialize, Serialize};

/// 초안의 한 버전. 한 번 생성되면 어떤 필드도 변하지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DraftVersion {
    pub id: String,
    pub draft_id: String,
    pub version_number: i64,
    pub content: String,
    pub word_count: i64,
    pub change_summary: Option<String>,
    pub created_at: String,
}

/// 버전 목록 응답용 요약 (본문 제외)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DraftVersionSummary {
    pub id: String,
    pub draft_id: String,
    pub version_number: i64,
    pub word_count: i64,
    pub change_summary: Option<String>,
    pub created_at: String,
}
