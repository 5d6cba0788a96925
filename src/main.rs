//! # 초고(chogo) 웹 서버 진입점
//!
//! AI 글쓰기 보조 초안 관리 서버의 시작점입니다.
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 데이터베이스 연결 풀 생성
//! 4. 데이터베이스 마이그레이션 실행
//! 5. AI 클라이언트와 생성 레지스트리 준비
//! 6. API 라우터 설정
//! 7. HTTP 서버 시작

mod config;
mod db;
mod error;
mod models;
mod routes;
mod services;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use config::Config;
use routes::{drafts::AppState, *};
use services::ai::{AiClient, GenerationRegistry};
use sqlx::sqlite::SqlitePoolOptions;
use std::path::Path;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // .env 파일이 없어도 에러 없이 넘어갑니다
    dotenvy::dotenv().ok();

    // RUST_LOG 환경변수로 로그 레벨을 제어합니다.
    // 환경변수가 없으면 기본값으로 chogo, tower_http, axum 모듈을 debug 레벨로 설정
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chogo=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting chogo server on {}:{}", config.host, config.port);

    // SQLite 연결 풀 생성
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    // 아직 실행되지 않은 마이그레이션만 순서대로 실행
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    let addr = format!("{}:{}", config.host, config.port);

    // 모든 라우트 핸들러가 공유하는 상태.
    // 생성 레지스트리는 전역이 아니라 여기서 만들어 상태로 넘깁니다.
    let state = AppState {
        pool: pool.clone(),
        ai: AiClient::new(&config),
        generations: GenerationRegistry::new(),
        config,
    };

    let api_routes = Router::new()
        // 초안 CRUD API
        .route("/drafts", get(list_drafts).post(create_draft))
        // 주의: statistics 라우트는 /drafts/{id}보다 구체적이므로 별도 경로로 둡니다
        .route("/drafts/statistics", get(draft_statistics))
        .route(
            "/drafts/{id}",
            get(get_draft).put(update_draft).delete(delete_draft),
        )
        // 상태 전이 API
        .route("/drafts/{id}/complete", post(complete_draft))
        .route("/drafts/{id}/reopen", post(reopen_draft))
        // 버전 이력 API
        .route("/drafts/{id}/versions", get(list_draft_versions))
        .route("/drafts/{id}/rollback/{version}", post(rollback_draft))
        // AI 생성 API (SSE)
        .route("/drafts/{id}/generate", post(generate_draft))
        .route("/drafts/{id}/generate/cancel", post(cancel_generation))
        .route("/ai/actions", get(list_ai_actions))
        // 헬스체크 API
        .route("/health", get(health_check))
        .with_state(state);

    // 개발 환경용 CORS (프로덕션에서는 특정 도메인만 허용해야 합니다)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 빌드된 프론트엔드가 있으면 같은 서버에서 서빙합니다.
    // SPA이므로 찾을 수 없는 경로는 index.html로 돌려보냅니다.
    let frontend_dist = Path::new("../frontend/dist");
    let app = if frontend_dist.exists() {
        tracing::info!("Serving frontend static files from ../frontend/dist");

        let serve_dir = ServeDir::new("../frontend/dist")
            .not_found_service(ServeFile::new("../frontend/dist/index.html"));

        Router::new()
            .nest("/api/v1", api_routes)
            .fallback_service(serve_dir)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    } else {
        tracing::warn!("Frontend dist directory not found, serving API only");

        Router::new()
            .nest("/api/v1", api_routes)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
