//! # 서비스 계층 (비즈니스 로직)
//!
//! HTTP나 데이터베이스를 모르는 순수 로직과,
//! 외부 AI 생성 서비스와의 연동을 담당하는 모듈입니다.
//!
//! 각 하위 모듈:
//! - `ai`: AI 생성 스트림 (프레임 디코더, 스트리밍 클라이언트, 진행 대장)
//! - `history`: 초안 버전 이력 상태 기계 (순수 자료구조, I/O 없음)
//! - `text`: 단어 수/문자 수 계산 유틸리티

pub mod ai;
pub mod history;
pub mod text;
