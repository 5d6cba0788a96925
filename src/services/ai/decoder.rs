//! # 스트림 프레임 디코더
//!
//! 생성 서비스의 응답 바이트 스트림을 `StreamEvent` 열로 변환합니다.
//! 응답은 `data: <내용>` 형태의 줄들로 구성되며,
//! `[DONE]` 또는 `[ERROR] <메시지>` 페이로드로 종결됩니다.
//!
//! 전송 계층이 바이트를 어떻게 쪼개 주는지는 디코더가 알 수 없으므로,
//! 완결되지 않은 마지막 줄을 내부에 버퍼링했다가 다음 조각 앞에 붙입니다.
//! 같은 논리적 바이트 열이라면 조각 경계가 어디든 (1바이트씩 들어와도)
//! 동일한 이벤트 열이 나옵니다.

use crate::services::ai::StreamEvent;

/// 페이로드 줄의 접두사. 이 접두사가 없는 줄은 무시합니다
/// (keep-alive 주석 등 프로토콜상 허용되는 비-페이로드 줄).
pub const DATA_PREFIX: &str = "data: ";

/// 정상 종료를 알리는 예약 페이로드
pub const DONE_TOKEN: &str = "[DONE]";

/// 에러를 알리는 예약 마커. 마커와 구분 공백을 **하나의 토큰**으로 취급해
/// 정확히 이 길이만큼 잘라냅니다. 고정 오프셋으로 자르면
/// 메시지 첫 글자가 잘리는 실수를 하기 쉽습니다.
pub const ERROR_TOKEN: &str = "[ERROR] ";

/// 바이트 조각을 받아 프레임 이벤트를 생성하는 디코더.
///
/// 종결 이벤트(`Done`/`Error`)를 한 번 내보낸 뒤에는
/// 어떤 입력이 와도 더 이상 이벤트를 만들지 않습니다.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// 아직 줄바꿈을 만나지 못한 잔여 바이트
    buf: Vec<u8>,
    /// 종결 이벤트를 내보냈는지 여부
    finished: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 바이트 조각 하나를 소비하고, 완성된 줄에서 나온 이벤트들을 반환합니다.
    ///
    /// 몇 번이고 호출할 수 있으며, 이전 호출의 잔여 부분 줄은
    /// 이번 조각 앞에 이어 붙여 다시 줄 단위로 자릅니다.
    pub fn feed(&mut self, fragment: &[u8]) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        self.buf.extend_from_slice(fragment);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            // 줄바꿈까지 잘라내고('\n' 포함), 줄 끝의 '\n'과 '\r'은 버립니다
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let Some(event) = classify(&String::from_utf8_lossy(&line)) else {
                continue;
            };
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                // 종결 이후의 입력(버퍼 잔여분 포함)은 모두 무시합니다
                self.finished = true;
                self.buf.clear();
                break;
            }
        }
        events
    }

    /// 전송 계층이 종결 이벤트 없이 닫혔을 때 호출합니다.
    ///
    /// 종결되지 않은 부분 줄은 버립니다. `strict`가 false면
    /// 원격 서비스의 관례대로 깔끔한 연결 종료를 정상 완료로 간주해
    /// `Done`을 반환하고, true면 잘린 응답으로 보고 `Error`를 반환합니다.
    /// 이미 종결된 뒤라면 아무것도 반환하지 않습니다.
    pub fn close(&mut self, strict: bool) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        self.finished = true;
        self.buf.clear();
        if strict {
            Some(StreamEvent::Error(
                "stream ended without a terminator".to_string(),
            ))
        } else {
            Some(StreamEvent::Done)
        }
    }

    /// 종결 이벤트를 이미 내보냈는지 여부
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// 완성된 한 줄을 이벤트로 분류합니다. 페이로드 줄이 아니면 None.
fn classify(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    if payload == DONE_TOKEN {
        return Some(StreamEvent::Done);
    }
    if let Some(message) = payload.strip_prefix(ERROR_TOKEN) {
        return Some(StreamEvent::Error(message.to_string()));
    }
    // 그 외 페이로드는 해석 없이 그대로 전달합니다
    Some(StreamEvent::Chunk(payload.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai::StreamEvent::{Chunk, Done, Error};

    /// 조각 목록을 차례로 먹이고 나온 이벤트를 모두 모읍니다
    fn feed_all(fragments: &[&[u8]]) -> Vec<StreamEvent> {
        let mut decoder = StreamDecoder::new();
        let mut events = Vec::new();
        for fragment in fragments {
            events.extend(decoder.feed(fragment));
        }
        events
    }

    #[test]
    fn reassembles_line_split_across_fragments() {
        let events = feed_all(&[b"data: Hel", b"lo\ndata: [DONE]\n"]);
        assert_eq!(events, vec![Chunk("Hello".to_string()), Done]);
    }

    #[test]
    fn error_marker_is_stripped_as_one_token() {
        let events = feed_all(&[b"data: [ERROR] quota exceeded\n"]);
        assert_eq!(events, vec![Error("quota exceeded".to_string())]);
    }

    #[test]
    fn chunk_boundary_does_not_change_events() {
        let stream: &[u8] =
            b"data: \xec\x95\x88\xeb\x85\x95\n: keep-alive\r\ndata: world\n\ndata: [DONE]\n";
        let whole = feed_all(&[stream]);

        // 1바이트씩 먹여도 같은 이벤트 열이 나와야 합니다
        let mut decoder = StreamDecoder::new();
        let mut byte_at_a_time = Vec::new();
        for b in stream {
            byte_at_a_time.extend(decoder.feed(std::slice::from_ref(b)));
        }
        assert_eq!(whole, byte_at_a_time);

        // 임의의 경계로 쪼개도 동일합니다
        for split in 1..stream.len() {
            let (left, right) = stream.split_at(split);
            assert_eq!(whole, feed_all(&[left, right]), "split at {}", split);
        }
    }

    #[test]
    fn non_payload_lines_are_discarded() {
        let events = feed_all(&[b": keep-alive\nevent: ping\n\ndata: ok\n"]);
        assert_eq!(events, vec![Chunk("ok".to_string())]);
    }

    #[test]
    fn nothing_after_done() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(b"data: [DONE]\ndata: tail\n");
        assert_eq!(events, vec![Done]);
        assert!(decoder.is_finished());
        assert!(decoder.feed(b"data: more\n").is_empty());
        assert_eq!(decoder.close(false), None);
    }

    #[test]
    fn error_is_terminal_too() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(b"data: one\ndata: [ERROR] boom\ndata: two\n");
        assert_eq!(
            events,
            vec![Chunk("one".to_string()), Error("boom".to_string())]
        );
        assert!(decoder.feed(b"data: three\n").is_empty());
    }

    #[test]
    fn close_discards_partial_line() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.feed(b"data: Hel").is_empty());
        assert_eq!(decoder.close(false), Some(Done));
        // 두 번째 close는 아무것도 내보내지 않습니다
        assert_eq!(decoder.close(false), None);
    }

    #[test]
    fn strict_close_reports_truncated_stream() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(b"data: partial\n");
        match decoder.close(true) {
            Some(Error(_)) => {}
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn empty_payload_is_a_chunk() {
        let events = feed_all(&[b"data: \n"]);
        assert_eq!(events, vec![Chunk(String::new())]);
    }

    #[test]
    fn crlf_lines_are_handled() {
        let events = feed_all(&[b"data: a\r\ndata: [DONE]\r\n"]);
        assert_eq!(events, vec![Chunk("a".to_string()), Done]);
    }
}
