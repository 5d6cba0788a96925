//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//! Axum에서 핸들러는 HTTP 요청을 받아 응답을 반환하는 async 함수입니다.
//!
//! 각 하위 모듈:
//! - `ai`: AI 생성 시작(SSE 중계)/취소, 동작 목록
//! - `drafts`: 초안 CRUD, 완료/재개, 버전 조회/롤백, 통계
//! - `health`: 서버 상태 확인 (헬스체크)

pub mod ai;
pub mod drafts;
pub mod health;

// 각 모듈의 핸들러 함수들을 재공개하여
// main.rs에서 `routes::list_drafts`처럼 바로 접근 가능하게 합니다.
pub use ai::*;
pub use drafts::*;
pub use health::*;
