//! # 생성 동작(action) 목록과 프롬프트 템플릿
//!
//! 에디터가 요청할 수 있는 텍스트 변환 동작들과,
//! 각 동작을 생성 서비스에 전달할 지시문으로 바꾸는 템플릿입니다.

use serde::{Deserialize, Serialize};

/// 요청 가능한 텍스트 변환 동작.
/// JSON에서는 snake_case 문자열("translate_en" 등)로 표현됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiAction {
    /// 윤문: 표현을 다듬어 자연스럽게
    Polish,
    /// 확장: 세부 내용을 덧붙여 풍부하게
    Expand,
    /// 요약: 핵심만 남기고 간결하게
    Condense,
    /// 개작: 같은 뜻을 다른 표현으로
    Rewrite,
    /// 이어쓰기: 맥락에 맞게 뒷내용을 생성
    Continue,
    /// 풀이: 전문 용어를 쉬운 말로 설명
    Explain,
    /// 영어로 번역
    TranslateEn,
    /// 한국어로 번역
    TranslateZh,
    /// 자유 지시문 (custom_prompt 필수)
    Custom,
}

impl AiAction {
    /// 요청 페이로드에 실을 식별자 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            AiAction::Polish => "polish",
            AiAction::Expand => "expand",
            AiAction::Condense => "condense",
            AiAction::Rewrite => "rewrite",
            AiAction::Continue => "continue",
            AiAction::Explain => "explain",
            AiAction::TranslateEn => "translate_en",
            AiAction::TranslateZh => "translate_zh",
            AiAction::Custom => "custom",
        }
    }
}

/// 동작 목록 응답에 담기는 항목 (`GET /ai/actions`)
#[derive(Debug, Serialize)]
pub struct ActionInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

/// UI에 노출할 동작 목록. `custom`은 버튼이 아니라 자유 입력이므로 제외합니다.
pub fn action_catalog() -> Vec<ActionInfo> {
    vec![
        ActionInfo { id: "polish", name: "윤문", description: "표현을 다듬어 더 전문적이고 자연스럽게", icon: "✨" },
        ActionInfo { id: "expand", name: "확장", description: "세부 내용을 덧붙여 더 풍부하게", icon: "📝" },
        ActionInfo { id: "condense", name: "요약", description: "핵심만 남기고 간결하게", icon: "📉" },
        ActionInfo { id: "rewrite", name: "개작", description: "같은 뜻을 다른 표현으로", icon: "🔄" },
        ActionInfo { id: "continue", name: "이어쓰기", description: "맥락에 맞게 뒷내용 생성", icon: "➡️" },
        ActionInfo { id: "explain", name: "풀이", description: "전문 용어를 쉬운 말로 설명", icon: "💡" },
        ActionInfo { id: "translate_en", name: "영어 번역", description: "영어로 번역", icon: "🇬🇧" },
        ActionInfo { id: "translate_zh", name: "중국어 번역", description: "중국어로 번역", icon: "🇨🇳" },
    ]
}

/// 동작과 원문을 생성 서비스에 보낼 지시문으로 렌더링합니다.
///
/// `Custom` 동작인데 지시문이 없으면 에러 메시지를 반환합니다.
/// (HTTP 계층에서 BadRequest로 변환됩니다)
pub fn render(
    action: AiAction,
    text: &str,
    custom_prompt: Option<&str>,
) -> Result<String, String> {
    let rendered = match action {
        AiAction::Polish => format!(
            "다음 글을 윤문해 주세요. 뜻은 유지하면서 표현만 다듬어, 더 전문적이고 \
             자연스럽게 만들어 주세요.\n설명이나 머리말 없이 결과만 출력하세요.\n\n원문:\n{text}"
        ),
        AiAction::Expand => format!(
            "다음 글을 확장해 주세요. 기존 문체와 주제를 유지하면서 세부 내용을 \
             덧붙여 더 풍부하게 만들어 주세요.\n설명이나 머리말 없이 결과만 출력하세요.\n\n원문:\n{text}"
        ),
        AiAction::Condense => format!(
            "다음 글을 요약해 주세요. 핵심 내용은 남기고 군더더기를 덜어내, 더 \
             간결하고 힘 있게 만들어 주세요.\n설명이나 머리말 없이 결과만 출력하세요.\n\n원문:\n{text}"
        ),
        AiAction::Rewrite => format!(
            "다음 글을 같은 뜻을 유지한 채 다른 표현으로 고쳐 써 주세요.\n설명이나 \
             머리말 없이 결과만 출력하세요.\n\n원문:\n{text}"
        ),
        AiAction::Continue => format!(
            "다음 글의 맥락에 맞게 뒷내용을 이어서 써 주세요. 문체를 유지하고 내용이 \
             자연스럽게 이어져야 합니다.\n설명이나 머리말 없이 이어지는 내용만 출력하세요.\n\n지금까지의 내용:\n{text}"
        ),
        AiAction::Explain => format!(
            "다음 글에 나오는 전문 용어나 개념을 누구나 이해할 수 있는 쉬운 말로 \
             설명해 주세요.\n\n본문:\n{text}"
        ),
        AiAction::TranslateEn => format!(
            "다음 글을 전문성과 정확성을 유지하며 영어로 번역해 주세요.\n설명 없이 \
             번역 결과만 출력하세요.\n\n원문:\n{text}"
        ),
        AiAction::TranslateZh => format!(
            "다음 글을 전문성과 정확성을 유지하며 중국어로 번역해 주세요.\n설명 없이 \
             번역 결과만 출력하세요.\n\n원문:\n{text}"
        ),
        AiAction::Custom => {
            let instruction = custom_prompt
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    "custom action requires a custom_prompt".to_string()
                })?;
            format!("{instruction}\n\n본문:\n{text}")
        }
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parses_from_snake_case_json() {
        let action: AiAction = serde_json::from_str("\"translate_en\"").unwrap();
        assert_eq!(action, AiAction::TranslateEn);
        let action: AiAction = serde_json::from_str("\"polish\"").unwrap();
        assert_eq!(action, AiAction::Polish);
    }

    #[test]
    fn render_embeds_source_text() {
        let prompt = render(AiAction::Polish, "초안 본문", None).unwrap();
        assert!(prompt.contains("초안 본문"));
    }

    #[test]
    fn custom_requires_prompt() {
        assert!(render(AiAction::Custom, "본문", None).is_err());
        assert!(render(AiAction::Custom, "본문", Some("  ")).is_err());
        let prompt = render(AiAction::Custom, "본문", Some("경어체로 바꿔줘")).unwrap();
        assert!(prompt.contains("경어체로 바꿔줘"));
        assert!(prompt.contains("본문"));
    }
}
