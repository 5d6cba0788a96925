//! # 진행 중 생성 스트림 대장
//!
//! 초안별로 **동시에 하나**의 생성 스트림만 허용하기 위한 명시적 레지스트리입니다.
//! 프로세스 전역 암묵 상태가 아니라 `AppState`가 소유하고, 항목의 수명이
//! 분명합니다: `begin`에서 만들어지고, 반환된 가드가 드롭될 때 정리됩니다.
//! (SSE 응답이 정상 종료하든, 클라이언트가 끊어 버리든 동일하게 정리됩니다)

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::services::ai::client::CancelToken;

/// 초안 id → 진행 중 생성 항목
#[derive(Clone, Default, Debug)]
pub struct GenerationRegistry {
    inner: Arc<Mutex<HashMap<String, ActiveGeneration>>>,
}

#[derive(Debug)]
struct ActiveGeneration {
    /// 이 항목을 만든 스트림의 식별자.
    /// 가드 드롭이 **자기 자신의** 항목만 지우도록 구분합니다.
    stream_id: String,
    cancel: CancelToken,
}

impl GenerationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 초안에 생성 스트림을 등록합니다.
    ///
    /// 이미 진행 중인 스트림이 있으면 `Conflict`로 즉시 실패합니다.
    /// 성공 시 반환되는 가드가 항목의 수명을 소유합니다.
    pub fn begin(&self, draft_id: &str, cancel: CancelToken) -> Result<GenerationGuard, AppError> {
        let mut map = self.inner.lock().expect("generation registry lock poisoned");
        if map.contains_key(draft_id) {
            return Err(AppError::Conflict(
                "a generation is already running for this draft".to_string(),
            ));
        }
        let stream_id = uuid::Uuid::now_v7().to_string();
        map.insert(
            draft_id.to_string(),
            ActiveGeneration {
                stream_id: stream_id.clone(),
                cancel,
            },
        );
        Ok(GenerationGuard {
            registry: self.clone(),
            draft_id: draft_id.to_string(),
            stream_id,
        })
    }

    /// 진행 중 스트림에 취소를 요청합니다. 항목이 있었으면 true.
    ///
    /// 항목 제거는 여기서 하지 않습니다 — 스트림이 실제로 멈춘 뒤
    /// 가드 드롭이 정리합니다.
    pub fn cancel(&self, draft_id: &str) -> bool {
        let map = self.inner.lock().expect("generation registry lock poisoned");
        match map.get(draft_id) {
            Some(active) => {
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// 해당 초안에 진행 중 스트림이 있는지 여부
    pub fn is_active(&self, draft_id: &str) -> bool {
        self.inner
            .lock()
            .expect("generation registry lock poisoned")
            .contains_key(draft_id)
    }

    fn finish(&self, draft_id: &str, stream_id: &str) {
        let mut map = self.inner.lock().expect("generation registry lock poisoned");
        // 같은 스트림의 항목일 때만 제거합니다.
        // 늦게 드롭된 가드가 후속 스트림의 항목을 지우면 안 됩니다.
        if map.get(draft_id).is_some_and(|a| a.stream_id == stream_id) {
            map.remove(draft_id);
        }
    }
}

/// 레지스트리 항목의 수명을 소유하는 가드.
/// 드롭되면 (자신이 만든) 항목을 레지스트리에서 제거합니다.
#[derive(Debug)]
pub struct GenerationGuard {
    registry: GenerationRegistry,
    draft_id: String,
    stream_id: String,
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.registry.finish(&self.draft_id, &self.stream_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_a_conflict() {
        let registry = GenerationRegistry::new();
        let _guard = registry.begin("draft-1", CancelToken::new()).unwrap();
        let err = registry.begin("draft-1", CancelToken::new()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        // 다른 초안은 영향 없음
        assert!(registry.begin("draft-2", CancelToken::new()).is_ok());
    }

    #[test]
    fn guard_drop_clears_the_entry() {
        let registry = GenerationRegistry::new();
        let guard = registry.begin("draft-1", CancelToken::new()).unwrap();
        assert!(registry.is_active("draft-1"));
        drop(guard);
        assert!(!registry.is_active("draft-1"));
        assert!(registry.begin("draft-1", CancelToken::new()).is_ok());
    }

    #[test]
    fn cancel_signals_token_and_keeps_entry() {
        let registry = GenerationRegistry::new();
        let token = CancelToken::new();
        let _guard = registry.begin("draft-1", token.clone()).unwrap();

        assert!(registry.cancel("draft-1"));
        assert!(token.is_cancelled());
        // 항목은 가드가 드롭될 때까지 남습니다 (재시작은 그때부터 가능)
        assert!(registry.is_active("draft-1"));
    }

    #[test]
    fn cancel_without_active_stream_returns_false() {
        let registry = GenerationRegistry::new();
        assert!(!registry.cancel("missing"));
    }

    #[test]
    fn stale_guard_does_not_clear_successor() {
        let registry = GenerationRegistry::new();
        let first = registry.begin("draft-1", CancelToken::new()).unwrap();
        drop(first);
        let _second = registry.begin("draft-1", CancelToken::new()).unwrap();
        assert!(registry.is_active("draft-1"));
    }
}
