//! # 스트리밍 생성 클라이언트
//!
//! 생성 서비스에 대한 **진행 중 요청 하나**의 수명을 관리합니다.
//! 요청을 보내고, 도착하는 바이트 조각을 디코더에 먹이고,
//! 나온 이벤트를 수신 순서 그대로 채널에 흘려보냅니다.
//!
//! ## 자원 관리
//! 전송 자원(연결/리더)은 이 스트림을 읽는 태스크가 독점 소유하며,
//! 정상 완료·에러·취소·타임아웃 어느 경로로 끝나도 태스크 종료와 함께
//! 해제됩니다. 시작 호출이 반복돼도 자원이 누적되지 않습니다.
//!
//! ## 실패 전달
//! 연결 실패나 비정상 상태 코드는 `start`에서 동기적으로 실패하지 않고,
//! 스트림의 단일 `Error` 이벤트 하나로 전달됩니다. 그 바이트는
//! 디코더에 닿지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};

use crate::config::Config;
use crate::services::ai::decoder::StreamDecoder;
use crate::services::ai::prompt::AiAction;
use crate::services::ai::StreamEvent;

/// 생성 요청: 원문 + 변환 동작 + 렌더링된 지시문.
/// 지시문은 `prompt::render`로 미리 만들어 전달합니다.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub text: String,
    pub action: AiAction,
    pub prompt: String,
}

/// 협조적 취소 신호.
///
/// 복제해서 여러 곳(레지스트리, SSE 응답 스트림)에서 들고 있을 수 있고,
/// 어느 쪽에서 `cancel()`을 불러도 같은 스트림이 멈춥니다.
/// 취소가 확인된 뒤에는 어떤 이벤트도 더 전달되지 않습니다.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// 취소를 요청합니다. 여러 번 불러도 안전합니다.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// 진행 중 생성 스트림의 수신 측.
///
/// 이벤트를 당겨 읽는(pull) 유한 시퀀스입니다. `Done`/`Error`가 항상
/// 마지막 이벤트이며, 취소된 경우에는 종결 이벤트 없이 끝납니다.
pub struct GenerationStream {
    events: mpsc::Receiver<StreamEvent>,
    cancel: CancelToken,
}

impl GenerationStream {
    /// 다음 이벤트를 기다립니다. 스트림이 끝났으면(취소 포함) None.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }
}

// 소비자가 스트림을 중도에 버리면 취소로 간주해 전송 자원을 회수합니다
impl Drop for GenerationStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// 생성 서비스 HTTP 클라이언트.
///
/// 내부의 `reqwest::Client`는 연결 풀을 공유하므로 복제 비용이 낮고,
/// 스트림마다 새로 만들 필요가 없습니다.
#[derive(Clone)]
pub struct AiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    /// 스트림 전체(연결 포함)에 적용되는 시간 상한
    timeout: Duration,
    /// 종결 신호 없이 닫힌 스트림을 에러로 볼지 여부
    strict_stream_end: bool,
}

impl AiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.ai_api_base.clone(),
            api_key: config.ai_api_key.clone(),
            model: config.ai_model.clone(),
            timeout: Duration::from_secs(config.ai_timeout_secs),
            strict_stream_end: config.ai_strict_stream_end,
        }
    }

    /// 스트리밍 생성 요청을 시작합니다.
    ///
    /// 백그라운드 태스크가 응답을 읽어 이벤트 채널로 전달하며,
    /// 반환된 `GenerationStream`으로 당겨 읽습니다.
    /// 한 초안에 하나의 스트림 제한은 이 계층이 아니라
    /// `GenerationRegistry`가 담당합니다.
    pub fn start(&self, request: GenerationRequest, cancel: CancelToken) -> GenerationStream {
        let (tx, rx) = mpsc::channel(32);
        let client = self.clone();
        let cancel_rx = cancel.subscribe();
        tokio::spawn(async move {
            client.run(request, tx, cancel_rx).await;
        });
        GenerationStream { events: rx, cancel }
    }

    async fn run(
        self,
        request: GenerationRequest,
        tx: mpsc::Sender<StreamEvent>,
        mut cancel_rx: watch::Receiver<bool>,
    ) {
        let limit = self.timeout;
        let outcome =
            tokio::time::timeout(limit, self.stream_events(request, &tx, &mut cancel_rx)).await;
        if outcome.is_err() {
            // 시간 상한 초과: 내부 future가 드롭되며 연결도 함께 해제됩니다.
            // 취소와 달리 호출자가 시작한 일이 아니므로 에러로 보고합니다.
            tracing::warn!("generation timed out after {}s", limit.as_secs());
            let _ = tx
                .send(StreamEvent::Error(format!(
                    "generation timed out after {}s",
                    limit.as_secs()
                )))
                .await;
        }
    }

    /// 요청을 보내고 종결 이벤트(또는 취소)까지 이벤트를 전달합니다.
    async fn stream_events(
        &self,
        request: GenerationRequest,
        tx: &mpsc::Sender<StreamEvent>,
        cancel_rx: &mut watch::Receiver<bool>,
    ) {
        // 요청 본문. 구체 인코딩은 생성 서비스와의 계약일 뿐이라
        // 이 모듈 밖에서는 아무도 모릅니다.
        let body = serde_json::json!({
            "model": self.model,
            "action": request.action.as_str(),
            "text": request.text,
            "prompt": request.prompt,
            "stream": true,
        });

        let send = self
            .http
            .post(format!("{}/generate", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send();

        let response = tokio::select! {
            _ = wait_cancelled(cancel_rx) => return,
            response = send => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("generation request failed: {}", e);
                let _ = tx
                    .send(StreamEvent::Error(format!("connection failed: {e}")))
                    .await;
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("generation service returned {}", status);
            let _ = tx
                .send(StreamEvent::Error(format!(
                    "generation service returned status {status}"
                )))
                .await;
            return;
        }

        let mut stream = Box::pin(response.bytes_stream());
        let mut decoder = StreamDecoder::new();
        loop {
            let next = tokio::select! {
                _ = wait_cancelled(cancel_rx) => return,
                next = stream.next() => next,
            };
            match next {
                Some(Ok(bytes)) => {
                    for event in decoder.feed(&bytes) {
                        let terminal = event.is_terminal();
                        // 수신자가 사라졌으면 더 보낼 곳이 없습니다
                        if tx.send(event).await.is_err() {
                            return;
                        }
                        if terminal {
                            return;
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!("generation stream failed mid-flight: {}", e);
                    let _ = tx
                        .send(StreamEvent::Error(format!("stream failed: {e}")))
                        .await;
                    return;
                }
                None => {
                    // 종결 신호 없이 전송이 끝난 경우: 설정에 따라 Done/Error
                    if let Some(event) = decoder.close(self.strict_stream_end) {
                        let _ = tx.send(event).await;
                    }
                    return;
                }
            }
        }
    }
}

/// 취소 신호가 올 때까지 대기합니다. 이미 취소됐으면 즉시 반환합니다.
/// 토큰 소유자가 전부 사라졌다면 취소는 영원히 오지 않습니다.
async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai::StreamEvent::{Chunk, Done};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_client(base: &str, timeout_secs: u64, strict: bool) -> AiClient {
        AiClient {
            http: reqwest::Client::new(),
            api_base: base.to_string(),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(timeout_secs),
            strict_stream_end: strict,
        }
    }

    fn test_request() -> GenerationRequest {
        GenerationRequest {
            text: "원문".to_string(),
            action: AiAction::Polish,
            prompt: "다듬어 주세요".to_string(),
        }
    }

    fn sse_response(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n{body}"
        )
    }

    /// 연결 하나를 받아 준비된 응답을 돌려주는 일회용 서버.
    /// `hold_open`이면 응답을 보낸 뒤 연결을 닫지 않고 붙들어 둡니다.
    async fn serve_raw(response: String, hold_open: bool) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let Ok((mut sock, _)) = listener.accept().await else {
                return;
            };
            read_request(&mut sock).await;
            let _ = sock.write_all(response.as_bytes()).await;
            let _ = sock.flush().await;
            if hold_open {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
        format!("http://{}", addr)
    }

    /// 응답을 보내기 전에 요청 헤더와 본문을 전부 읽어들입니다
    async fn read_request(sock: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let Ok(n) = sock.read(&mut chunk).await else {
                return;
            };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
                let header = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                let body_len = header
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= pos + 4 + body_len {
                    return;
                }
            }
        }
    }

    fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    async fn collect(mut stream: GenerationStream) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = stream.next_event().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn delivers_chunks_then_done_in_order() {
        let base = serve_raw(sse_response("data: Hel\ndata: lo\ndata: [DONE]\n"), false).await;
        let client = test_client(&base, 5, false);
        let events = collect(client.start(test_request(), CancelToken::new())).await;
        assert_eq!(
            events,
            vec![Chunk("Hel".to_string()), Chunk("lo".to_string()), Done]
        );
    }

    #[tokio::test]
    async fn upstream_error_payload_is_terminal() {
        let base = serve_raw(
            sse_response("data: 절반\ndata: [ERROR] quota exceeded\ndata: 무시\n"),
            false,
        )
        .await;
        let client = test_client(&base, 5, false);
        let events = collect(client.start(test_request(), CancelToken::new())).await;
        assert_eq!(
            events,
            vec![
                Chunk("절반".to_string()),
                StreamEvent::Error("quota exceeded".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn bad_status_yields_single_transport_error() {
        let base = serve_raw(
            "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                .to_string(),
            false,
        )
        .await;
        let client = test_client(&base, 5, false);
        let events = collect(client.start(test_request(), CancelToken::new())).await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Error(msg) => assert!(msg.contains("503"), "{}", msg),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn connection_failure_yields_single_error() {
        // 리스너를 바로 닫아 연결이 거부되는 주소를 만듭니다
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = test_client(&format!("http://{}", addr), 5, false);
        let events = collect(client.start(test_request(), CancelToken::new())).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Error(_)));
    }

    #[tokio::test]
    async fn cancel_stops_delivery_without_terminal_event() {
        // 응답을 보낸 뒤 연결을 붙들고 있는 서버 (스트림이 멈춘 상황)
        let base = serve_raw(sse_response("data: 시작\n"), true).await;
        let client = test_client(&base, 30, false);
        let token = CancelToken::new();
        let mut stream = client.start(test_request(), token.clone());

        assert_eq!(stream.next_event().await, Some(Chunk("시작".to_string())));
        token.cancel();
        // 취소 뒤에는 종결 이벤트 없이 채널이 닫힙니다
        assert_eq!(stream.next_event().await, None);
    }

    #[tokio::test]
    async fn timeout_is_reported_as_error() {
        let base = serve_raw(sse_response("data: 느림\n"), true).await;
        let client = test_client(&base, 1, false);
        let mut stream = client.start(test_request(), CancelToken::new());

        assert_eq!(stream.next_event().await, Some(Chunk("느림".to_string())));
        match stream.next_event().await {
            Some(StreamEvent::Error(msg)) => assert!(msg.contains("timed out"), "{}", msg),
            other => panic!("expected timeout error, got {:?}", other),
        }
        assert_eq!(stream.next_event().await, None);
    }

    #[tokio::test]
    async fn lenient_close_treats_clean_eof_as_done() {
        let base = serve_raw(sse_response("data: Hello\n"), false).await;
        let client = test_client(&base, 5, false);
        let events = collect(client.start(test_request(), CancelToken::new())).await;
        assert_eq!(events, vec![Chunk("Hello".to_string()), Done]);
    }

    #[tokio::test]
    async fn strict_close_reports_truncation() {
        let base = serve_raw(sse_response("data: Hello\n"), false).await;
        let client = test_client(&base, 5, true);
        let events = collect(client.start(test_request(), CancelToken::new())).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Chunk("Hello".to_string()));
        assert!(matches!(events[1], StreamEvent::Error(_)));
    }
}
