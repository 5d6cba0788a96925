//! # 버전 행 쿼리 모듈
//!
//! `draft_versions` 테이블에 대한 조회/삽입 쿼리 함수들입니다.
//! 버전 행은 삽입만 있고 수정/삭제가 없습니다
//! (초안 삭제 시 통째로 지워지는 경우 제외).

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::AppError;
use crate::models::{DraftVersion, DraftVersionSummary};
use crate::services::history::Version;

/// 한 초안의 전체 버전을 최신순으로 조회합니다 (본문 포함).
pub async fn list_versions(
    pool: &SqlitePool,
    draft_id: &str,
) -> Result<Vec<DraftVersion>, AppError> {
    let versions = sqlx::query_as::<_, DraftVersion>(
        r#"
        SELECT id, draft_id, version_number, content, word_count, change_summary, created_at
        FROM draft_versions
        WHERE draft_id = ?
        ORDER BY version_number DESC
        "#,
    )
    .bind(draft_id)
    .fetch_all(pool)
    .await?;

    Ok(versions)
}

/// 한 초안의 버전 요약(본문 제외)을 최신순으로 조회합니다.
/// 초안 상세 응답에 붙여 보내는 용도입니다.
pub async fn list_version_summaries(
    pool: &SqlitePool,
    draft_id: &str,
) -> Result<Vec<DraftVersionSummary>, AppError> {
    let versions = sqlx::query_as::<_, DraftVersionSummary>(
        r#"
        SELECT id, draft_id, version_number, word_count, change_summary, created_at
        FROM draft_versions
        WHERE draft_id = ?
        ORDER BY version_number DESC
        "#,
    )
    .bind(draft_id)
    .fetch_all(pool)
    .await?;

    Ok(versions)
}

/// 이력 복원용: 버전 행을 번호 오름차순으로 읽어 상태 기계의 타입으로 바꿉니다.
pub(crate) async fn load_version_rows(
    conn: &mut SqliteConnection,
    draft_id: &str,
) -> Result<Vec<Version>, AppError> {
    let rows = sqlx::query_as::<_, DraftVersion>(
        r#"
        SELECT id, draft_id, version_number, content, word_count, change_summary, created_at
        FROM draft_versions
        WHERE draft_id = ?
        ORDER BY version_number ASC
        "#,
    )
    .bind(draft_id)
    .fetch_all(conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Version {
            number: row.version_number,
            content: row.content,
            word_count: row.word_count,
            change_summary: row.change_summary,
            created_at: row.created_at,
        })
        .collect())
}

/// 버전 행 하나를 삽입합니다. 호출부 트랜잭션 안에서 사용합니다.
pub(crate) async fn insert_version(
    conn: &mut SqliteConnection,
    draft_id: &str,
    version: &Version,
) -> Result<(), sqlx::Error> {
    let id = uuid::Uuid::now_v7().to_string();
    sqlx::query(
        r#"
        INSERT INTO draft_versions
            (id, draft_id, version_number, content, word_count, change_summary, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(draft_id)
    .bind(version.number)
    .bind(&version.content)
    .bind(version.word_count)
    .bind(&version.change_summary)
    .bind(&version.created_at)
    .execute(conn)
    .await?;

    Ok(())
}
