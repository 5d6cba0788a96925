//! # 초안 버전 이력 상태 기계
//!
//! 초안 하나의 버전 이력과 상태 전이를 관리하는 순수 자료구조입니다.
//! I/O가 전혀 없으므로 단위 테스트가 쉽고, 저장은 db 계층이 담당합니다.
//!
//! ## 불변식
//! - 버전 번호는 1부터 빈틈없이 증가하며, 기존 버전은 절대 수정/삭제되지 않습니다.
//! - `current_number`는 항상 존재하는 버전을 가리킵니다.
//! - 현재 내용 == `current_number`가 가리키는 버전의 내용.
//! - 롤백도 삭제가 아니라 **추가**입니다: 대상 버전의 내용을 복사한 새 버전을
//!   만들어, 문서가 거쳐간 모든 상태를 재구성할 수 있게 유지합니다.
//!
//! ## 상태 전이
//! ```text
//! draft --complete()--> completed --reopen()--> draft
//! ```
//! 그 외의 전이는 `InvalidTransition` 에러입니다 (패닉 아님).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::text;

/// 이력 조작이 실패할 수 있는 경우들
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    /// 존재하지 않는 버전으로 롤백을 시도한 경우
    #[error("version {0} does not exist")]
    VersionNotFound(i64),

    /// 허용되지 않는 상태 전이 (예: 완료된 초안을 다시 완료)
    #[error("{0}")]
    InvalidTransition(String),
}

/// 초안의 상태. 저장 시에는 소문자 문자열("draft"/"completed")을 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Draft,
    Completed,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Completed => "completed",
        }
    }

    /// DB에 저장된 문자열을 되돌립니다. 알 수 없는 값이면 None.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(DraftStatus::Draft),
            "completed" => Some(DraftStatus::Completed),
            _ => None,
        }
    }
}

/// 초안의 한 버전. 생성된 뒤에는 어떤 필드도 변하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    /// 1부터 시작하는 버전 번호
    pub number: i64,
    pub content: String,
    pub word_count: i64,
    pub change_summary: Option<String>,
    /// UTC ISO-8601 문자열 (DB의 strftime 포맷과 동일)
    pub created_at: String,
}

/// 한 초안의 전체 버전 이력 + 상태.
///
/// `versions[i].number == i + 1` 불변식을 유지하므로
/// 번호로 버전을 찾을 때 인덱스 접근이 가능합니다.
#[derive(Debug, Clone)]
pub struct DraftHistory {
    versions: Vec<Version>,
    current_number: i64,
    status: DraftStatus,
    completed_at: Option<String>,
}

impl DraftHistory {
    /// 첫 버전(번호 1)과 함께 새 이력을 만듭니다.
    pub fn new(initial_content: &str, change_summary: Option<String>) -> Self {
        let mut history = DraftHistory {
            versions: Vec::new(),
            current_number: 0,
            status: DraftStatus::Draft,
            completed_at: None,
        };
        history.push_version(
            initial_content.to_string(),
            text::count_words(initial_content) as i64,
            change_summary,
        );
        history
    }

    /// 저장소에서 읽어온 행들로 이력을 복원합니다.
    ///
    /// 불변식(1..N 연속 번호, 유효한 current_number)이 깨져 있으면
    /// 저장소가 손상된 것이므로 에러 메시지를 반환합니다.
    /// (호출부인 db 계층에서 내부 오류로 변환됩니다)
    pub fn from_parts(
        versions: Vec<Version>,
        current_number: i64,
        status: DraftStatus,
        completed_at: Option<String>,
    ) -> Result<Self, String> {
        if versions.is_empty() {
            return Err("draft has no versions".to_string());
        }
        for (i, v) in versions.iter().enumerate() {
            let expected = i as i64 + 1;
            if v.number != expected {
                return Err(format!(
                    "version numbers are not contiguous: expected {}, found {}",
                    expected, v.number
                ));
            }
        }
        if current_number < 1 || current_number > versions.len() as i64 {
            return Err(format!(
                "current version {} is out of range 1..={}",
                current_number,
                versions.len()
            ));
        }
        Ok(DraftHistory {
            versions,
            current_number,
            status,
            completed_at,
        })
    }

    /// 새 버전을 추가하고 현재 포인터를 옮깁니다. 실패하지 않습니다.
    ///
    /// 단어 수는 내용에서 다시 계산합니다.
    pub fn create_version(&mut self, content: &str, change_summary: Option<String>) -> &Version {
        let word_count = text::count_words(content) as i64;
        self.push_version(content.to_string(), word_count, change_summary)
    }

    /// 대상 버전의 내용을 복사한 **새 버전**을 추가합니다 (이력 절단 없음).
    ///
    /// 단어 수도 대상 버전의 값을 그대로 복사합니다.
    pub fn rollback_to(&mut self, target: i64) -> Result<&Version, HistoryError> {
        let index = self.index_of(target)?;
        let (content, word_count) = {
            let v = &self.versions[index];
            (v.content.clone(), v.word_count)
        };
        let summary = format!("버전 {}(으)로 롤백", target);
        Ok(self.push_version(content, word_count, Some(summary)))
    }

    /// 초안을 완료 상태로 전환합니다.
    ///
    /// `final_content`가 있으면 상태 전환 직전에 마지막 버전으로 추가합니다.
    /// 검증이 모든 변경에 앞서므로, 실패하면 아무것도 바뀌지 않습니다.
    /// 새로 만든 버전의 번호를 반환합니다 (버전을 만들지 않았으면 None).
    pub fn complete(&mut self, final_content: Option<&str>) -> Result<Option<i64>, HistoryError> {
        if self.status == DraftStatus::Completed {
            return Err(HistoryError::InvalidTransition(
                "draft is already completed".to_string(),
            ));
        }
        let new_number = final_content.map(|content| {
            self.create_version(content, Some("완료 처리".to_string()));
            self.current_number
        });
        self.status = DraftStatus::Completed;
        self.completed_at = Some(now_utc());
        Ok(new_number)
    }

    /// 완료된 초안을 다시 편집 가능한 상태로 되돌립니다. 이력은 그대로입니다.
    pub fn reopen(&mut self) -> Result<(), HistoryError> {
        if self.status == DraftStatus::Draft {
            return Err(HistoryError::InvalidTransition(
                "draft is not completed".to_string(),
            ));
        }
        self.status = DraftStatus::Draft;
        self.completed_at = None;
        Ok(())
    }

    /// 현재 포인터가 가리키는 버전
    pub fn current(&self) -> &Version {
        // current_number는 항상 유효 범위를 가리킵니다 (from_parts에서 검증)
        &self.versions[(self.current_number - 1) as usize]
    }

    pub fn current_number(&self) -> i64 {
        self.current_number
    }

    pub fn status(&self) -> DraftStatus {
        self.status
    }

    pub fn completed_at(&self) -> Option<&str> {
        self.completed_at.as_deref()
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// 번호가 `from` 이상인 버전들 (저장되지 않은 새 버전 조회용)
    pub fn versions_from(&self, from: i64) -> &[Version] {
        let start = ((from - 1).max(0) as usize).min(self.versions.len());
        &self.versions[start..]
    }

    fn index_of(&self, number: i64) -> Result<usize, HistoryError> {
        if number < 1 || number > self.versions.len() as i64 {
            return Err(HistoryError::VersionNotFound(number));
        }
        Ok((number - 1) as usize)
    }

    fn push_version(
        &mut self,
        content: String,
        word_count: i64,
        change_summary: Option<String>,
    ) -> &Version {
        let number = self.versions.len() as i64 + 1;
        self.versions.push(Version {
            number,
            content,
            word_count,
            change_summary,
            created_at: now_utc(),
        });
        self.current_number = number;
        self.current()
    }
}

/// DB의 `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`와 같은 포맷의 현재 시각
fn now_utc() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> DraftHistory {
        DraftHistory::new("첫 내용", Some("최초 작성".to_string()))
    }

    #[test]
    fn new_history_starts_at_version_one() {
        let h = history();
        assert_eq!(h.current_number(), 1);
        assert_eq!(h.current().content, "첫 내용");
        assert_eq!(h.status(), DraftStatus::Draft);
        assert!(h.completed_at().is_none());
    }

    #[test]
    fn version_numbers_are_contiguous_in_creation_order() {
        let mut h = history();
        h.create_version("둘", None);
        h.create_version("셋", None);
        h.rollback_to(1).unwrap();
        h.complete(Some("마지막")).unwrap();
        let numbers: Vec<i64> = h.versions().iter().map(|v| v.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(h.current_number(), 5);
    }

    #[test]
    fn create_version_recomputes_word_count() {
        let mut h = history();
        let v = h.create_version("two words", None);
        assert_eq!(v.word_count, 2);
    }

    #[test]
    fn rollback_appends_copy_and_preserves_history() {
        let mut h = history();
        h.create_version("두 번째", None);
        h.create_version("세 번째", None);
        let before: Vec<Version> = h.versions().to_vec();

        let v = h.rollback_to(1).unwrap();
        assert_eq!(v.number, 4);
        assert_eq!(v.content, "첫 내용");
        assert_eq!(v.word_count, before[0].word_count);
        assert_eq!(h.current_number(), 4);

        // 기존 버전 1..3은 그대로 남아 있어야 합니다
        assert_eq!(&h.versions()[..3], &before[..]);
    }

    #[test]
    fn rollback_to_missing_version_fails() {
        let mut h = history();
        assert_eq!(h.rollback_to(99), Err(HistoryError::VersionNotFound(99)));
        assert_eq!(h.rollback_to(0), Err(HistoryError::VersionNotFound(0)));
        // 실패해도 이력은 변하지 않습니다
        assert_eq!(h.versions().len(), 1);
    }

    #[test]
    fn complete_twice_fails() {
        let mut h = history();
        h.complete(None).unwrap();
        let err = h.complete(None).unwrap_err();
        assert!(matches!(err, HistoryError::InvalidTransition(_)));
    }

    #[test]
    fn reopen_on_draft_fails() {
        let mut h = history();
        assert!(matches!(
            h.reopen(),
            Err(HistoryError::InvalidTransition(_))
        ));
    }

    #[test]
    fn complete_reopen_complete_cycle() {
        let mut h = history();
        h.complete(None).unwrap();
        assert_eq!(h.status(), DraftStatus::Completed);
        assert!(h.completed_at().is_some());

        h.reopen().unwrap();
        assert_eq!(h.status(), DraftStatus::Draft);
        assert!(h.completed_at().is_none());

        h.complete(None).unwrap();
        assert_eq!(h.status(), DraftStatus::Completed);
        assert!(h.completed_at().is_some());
    }

    #[test]
    fn complete_with_content_creates_final_version_atomically() {
        let mut h = history();
        let new_number = h.complete(Some("최종본")).unwrap();
        assert_eq!(new_number, Some(2));
        assert_eq!(h.current().content, "최종본");
        assert_eq!(h.status(), DraftStatus::Completed);

        // 이미 완료된 뒤에는 내용이 있어도 버전이 추가되지 않아야 합니다
        let before = h.versions().len();
        assert!(h.complete(Some("무시됨")).is_err());
        assert_eq!(h.versions().len(), before);
    }

    #[test]
    fn failed_complete_does_not_touch_history() {
        let mut h = history();
        h.complete(None).unwrap();
        let len = h.versions().len();
        assert!(h.complete(Some("버려질 내용")).is_err());
        assert_eq!(h.versions().len(), len);
        assert_eq!(h.current().content, "첫 내용");
    }

    #[test]
    fn from_parts_rejects_gaps_and_bad_pointer() {
        let v = |n: i64| Version {
            number: n,
            content: String::new(),
            word_count: 0,
            change_summary: None,
            created_at: now_utc(),
        };
        assert!(DraftHistory::from_parts(vec![], 1, DraftStatus::Draft, None).is_err());
        assert!(
            DraftHistory::from_parts(vec![v(1), v(3)], 1, DraftStatus::Draft, None).is_err()
        );
        assert!(
            DraftHistory::from_parts(vec![v(1), v(2)], 3, DraftStatus::Draft, None).is_err()
        );
        assert!(DraftHistory::from_parts(vec![v(1), v(2)], 2, DraftStatus::Draft, None).is_ok());
    }

    #[test]
    fn scenario_rollback_from_three_versions() {
        // 버전 [1,2,3], 현재=3에서 rollback(1) → [1,2,3,4], 현재=4
        let mut h = history();
        h.create_version("v2", None);
        h.create_version("v3", None);
        assert_eq!(h.current_number(), 3);

        h.rollback_to(1).unwrap();
        assert_eq!(h.versions().len(), 4);
        assert_eq!(h.current_number(), 4);
        assert_eq!(h.current().content, h.versions()[0].content);
    }
}
