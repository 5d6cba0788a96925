//! # 초안 데이터베이스 쿼리 모듈
//!
//! `drafts` 테이블의 CRUD와, 버전 이력 상태 기계(`DraftHistory`)의
//! 복원(load)·저장(persist)을 담당합니다.
//!
//! ## 저장 규약
//! 이력을 바꾸는 모든 저장은 **한 트랜잭션**으로 수행됩니다:
//! 새 버전 행 삽입 + 초안 헤드 컬럼(content/current_version/status 등) 갱신이
//! 함께 커밋되거나 함께 버려집니다. 읽는 쪽은 반쯤 적용된 버전을 볼 수 없습니다.

use sqlx::SqlitePool;

use crate::db::versions;
use crate::error::AppError;
use crate::models::{Draft, DraftStatistics, DraftSummary};
use crate::services::history::{DraftHistory, DraftStatus};

/// 새 초안과 그 첫 버전(들)을 함께 저장합니다.
pub async fn insert_draft(
    pool: &SqlitePool,
    id: &str,
    title: &str,
    template_file_id: Option<&str>,
    data_file_id: Option<&str>,
    history: &DraftHistory,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let head = history.current();

    sqlx::query(
        r#"
        INSERT INTO drafts
            (id, title, content, status, current_version, word_count,
             template_file_id, data_file_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(&head.content)
    .bind(history.status().as_str())
    .bind(history.current_number())
    .bind(head.word_count)
    .bind(template_file_id)
    .bind(data_file_id)
    .execute(&mut *tx)
    .await?;

    for version in history.versions() {
        versions::insert_version(&mut tx, id, version).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// ID로 단일 초안을 조회합니다.
pub async fn get_draft(pool: &SqlitePool, id: &str) -> Result<Option<Draft>, AppError> {
    let draft = sqlx::query_as::<_, Draft>(
        r#"
        SELECT id, title, content, status, current_version, word_count,
               template_file_id, data_file_id, created_at, updated_at, completed_at
        FROM drafts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(draft)
}

/// 초안 목록을 최근 수정순으로 조회합니다. 상태 필터는 선택입니다.
pub async fn list_drafts(
    pool: &SqlitePool,
    status: Option<&str>,
) -> Result<Vec<DraftSummary>, AppError> {
    let drafts = match status {
        Some(status) => {
            sqlx::query_as::<_, DraftSummary>(
                r#"
                SELECT id, title, status, current_version, word_count,
                       template_file_id, created_at, updated_at
                FROM drafts
                WHERE status = ?
                ORDER BY updated_at DESC
                "#,
            )
            .bind(status)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DraftSummary>(
                r#"
                SELECT id, title, status, current_version, word_count,
                       template_file_id, created_at, updated_at
                FROM drafts
                ORDER BY updated_at DESC
                "#,
            )
            .fetch_all(pool)
            .await?
        }
    };

    Ok(drafts)
}

/// 버전 이력과 무관한 메타데이터(제목, 데이터 파일 참조)를 갱신합니다.
/// None인 필드는 그대로 둡니다. 초안이 없으면 false를 반환합니다.
pub async fn update_metadata(
    pool: &SqlitePool,
    id: &str,
    title: Option<&str>,
    data_file_id: Option<&str>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE drafts
        SET title = COALESCE(?, title),
            data_file_id = COALESCE(?, data_file_id),
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(data_file_id)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// 저장소에서 초안의 버전 이력 상태 기계를 복원합니다.
///
/// 초안 행과 버전 행을 한 트랜잭션 안에서 읽어,
/// 쓰기와 교차해도 일관된 스냅샷을 보장합니다.
pub async fn load_history(
    pool: &SqlitePool,
    draft_id: &str,
) -> Result<Option<DraftHistory>, AppError> {
    let mut tx = pool.begin().await?;

    let draft = sqlx::query_as::<_, Draft>(
        r#"
        SELECT id, title, content, status, current_version, word_count,
               template_file_id, data_file_id, created_at, updated_at, completed_at
        FROM drafts
        WHERE id = ?
        "#,
    )
    .bind(draft_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(draft) = draft else {
        return Ok(None);
    };

    let rows = versions::load_version_rows(&mut tx, draft_id).await?;
    tx.commit().await?;

    let status = DraftStatus::parse(&draft.status)
        .ok_or_else(|| AppError::Internal(format!("unknown draft status: {}", draft.status)))?;

    // 불변식이 깨진 이력은 저장소 손상이므로 내부 오류로 변환합니다
    let history =
        DraftHistory::from_parts(rows, draft.current_version, status, draft.completed_at)
            .map_err(AppError::Internal)?;

    Ok(Some(history))
}

/// 이력 변경의 결과를 저장합니다.
///
/// `first_new_version`번부터의 버전 행 삽입과 초안 헤드 갱신을
/// 한 트랜잭션으로 커밋합니다. 새 버전이 없으면(상태만 바뀐 경우)
/// 헤드 갱신만 수행합니다.
pub async fn persist_history(
    pool: &SqlitePool,
    draft_id: &str,
    new_title: Option<&str>,
    history: &DraftHistory,
    first_new_version: i64,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    for version in history.versions_from(first_new_version) {
        versions::insert_version(&mut tx, draft_id, version).await?;
    }

    let head = history.current();
    sqlx::query(
        r#"
        UPDATE drafts
        SET title = COALESCE(?, title),
            content = ?,
            word_count = ?,
            current_version = ?,
            status = ?,
            completed_at = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(new_title)
    .bind(&head.content)
    .bind(head.word_count)
    .bind(history.current_number())
    .bind(history.status().as_str())
    .bind(history.completed_at())
    .bind(draft_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// 초안과 모든 버전 행을 한 트랜잭션으로 삭제합니다.
/// 초안이 없었으면 false를 반환합니다.
pub async fn delete_draft(pool: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM draft_versions WHERE draft_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM drafts WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

/// 상태별 초안 개수 통계
pub async fn draft_statistics(pool: &SqlitePool) -> Result<DraftStatistics, AppError> {
    let (total, draft_count, completed_count) = sqlx::query_as::<_, (i64, i64, i64)>(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(status = 'draft'), 0),
               COALESCE(SUM(status = 'completed'), 0)
        FROM drafts
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(DraftStatistics {
        total,
        draft_count,
        completed_count,
    })
}
