//! Prompt composition.
//!
//! In `templated` mode every user message is wrapped in a fixed prompt-engineering instruction
//! that asks the model to critique the request and answer with an improved prompt under the
//! [`DEFAULT_MARKER`](crate::render::DEFAULT_MARKER) heading, formatted as a blockquote.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The built-in prompt-engineering template.
pub const DEFAULT_TEMPLATE: &str = r#"너는 프롬프트 엔지니어링 전문가야. 아래 사용자 요청을 분석하고, 더 좋은 결과를 얻을 수 있도록 프롬프트를 다시 작성해 줘.

다음 형식을 반드시 지켜:

### 🔍 분석
- 요청의 목적과 대상 독자
- 빠져 있거나 모호한 정보
- 개선 방향

### ✨ 최적화된 프롬프트
> (역할, 맥락, 구체적인 지시, 출력 형식, 제약 조건을 포함한 완성된 프롬프트를
> 인용 블록으로 작성해. 사용자가 그대로 복사해서 쓸 수 있어야 해.)

사용자 요청:"#;

/// Whether the template is injected in front of user input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PromptMode {
    /// Send the user's text as typed.
    #[default]
    Raw,
    /// Prepend the prompt-engineering template.
    Templated,
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptMode::Raw => write!(f, "raw"),
            PromptMode::Templated => write!(f, "templated"),
        }
    }
}

impl FromStr for PromptMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" | "plain" => Ok(PromptMode::Raw),
            "templated" | "template" => Ok(PromptMode::Templated),
            _ => Err(format!(
                "Invalid prompt mode: {s}. Valid options: raw, templated"
            )),
        }
    }
}

/// The instruction text prepended in [`PromptMode::Templated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    /// Wraps custom template text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Loads template text from a file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the file cannot be read or is blank.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            Error::configuration(
                format!("could not read template {}: {err}", path.display()),
                Some("template_file".to_string()),
            )
        })?;
        let text = text.trim_end();
        if text.trim().is_empty() {
            return Err(Error::configuration(
                format!("template {} is empty", path.display()),
                Some("template_file".to_string()),
            ));
        }
        Ok(Self::new(text))
    }

    /// The template text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Compose the outbound prompt for `input` under `mode`.
    ///
    /// Raw mode returns `input` unchanged; templated mode returns `template + "\n\n" + input`.
    pub fn compose(&self, mode: PromptMode, input: &str) -> String {
        match mode {
            PromptMode::Raw => input.to_string(),
            PromptMode::Templated => format!("{}\n\n{}", self.text, input),
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}
