//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! 각 하위 모듈은 특정 도메인의 데이터 타입을 담당합니다:
//! - `draft`: 초안(Draft) 관련 구조체와 요청/응답 타입
//! - `version`: 초안 버전 이력 관련 구조체
//!
//! `pub use X::*;`는 하위 모듈의 모든 공개 항목을
//! 이 모듈에서 바로 접근할 수 있게 재공개(re-export)합니다.

pub mod draft;
pub mod version;

pub use draft::*;
pub use version::*;
