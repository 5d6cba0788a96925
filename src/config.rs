//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로 (필수)
//! - `AI_API_KEY`: AI 생성 서비스 인증 키 (필수)
//! - `AI_API_BASE`: AI 생성 서비스 주소
//! - `AI_MODEL`: 사용할 생성 모델 이름
//! - `AI_TIMEOUT_SECS`: 생성 스트림 전체에 적용되는 상한 시간(초)
//! - `AI_MAX_INPUT_CHARS`: 생성 요청 원문 길이 제한(문자 수)
//! - `AI_STRICT_STREAM_END`: 종료 신호 없이 끊긴 스트림을 에러로 볼지 여부
//! - `HOST`: 서버 바인딩 주소
//! - `PORT`: 서버 포트 번호

use std::env;

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 환경변수에서 한 번 읽어온 후,
/// 애플리케이션 전체에서 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 파일 경로 (예: "sqlite:data/chogo.db")
    pub database_url: String,
    /// AI 생성 서비스 인증 키 (Bearer 토큰으로 전달)
    pub ai_api_key: String,
    /// AI 생성 서비스의 기본 URL
    pub ai_api_base: String,
    /// 생성에 사용할 모델 이름
    pub ai_model: String,
    /// 한 번의 생성 스트림에 허용하는 최대 시간(초).
    /// 초과하면 스트림을 끊고 타임아웃 에러를 보고합니다.
    pub ai_timeout_secs: u64,
    /// 생성 요청 원문의 최대 길이 (유니코드 문자 수)
    pub ai_max_input_chars: usize,
    /// true면 `[DONE]` 없이 닫힌 스트림을 잘린 응답으로 간주해 에러 처리.
    /// false면 원격 서비스의 관례대로 정상 완료로 간주합니다.
    pub ai_strict_stream_end: bool,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 3000)
    pub port: u16,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`과 `AI_API_KEY`는 필수이며, 없으면 에러가 발생합니다.
    /// 나머지 설정은 기본값이 있어 환경변수가 없어도 동작합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?, // 필수: 없으면 에러
            ai_api_key: env::var("AI_API_KEY")?,     // 필수: 없으면 에러

            ai_api_base: env::var("AI_API_BASE")
                .unwrap_or_else(|_| "https://api.deepseek.com/v1".to_string()),
            ai_model: env::var("AI_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string()),

            // 문자열 → 숫자 변환. 파싱 실패 시 기본값을 사용합니다.
            ai_timeout_secs: env::var("AI_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            ai_max_input_chars: env::var("AI_MAX_INPUT_CHARS")
                .unwrap_or_else(|_| "6000".to_string())
                .parse()
                .unwrap_or(6000),

            // "1" 또는 "true"(대소문자 무관)만 참으로 해석합니다.
            ai_strict_stream_end: env::var("AI_STRICT_STREAM_END")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),

            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
        })
    }
}
