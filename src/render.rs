//! Output rendering for chat replies.
//!
//! Replies produced under the prompt-engineering template end with an "optimized prompt"
//! section that the model formats as a markdown blockquote.  [`RenderPlan`] splits such a reply
//! at a marker heading so the analysis can be shown as prose and the template as a verbatim,
//! copy-pastable block.  The [`Renderer`] trait is the seam between that plan and a concrete
//! output device.

use std::io::{self, Stdout, Write};

use crate::blockquote::strip_blockquote_prefix;

/// ANSI escape code for dim text (used for block rules).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for informational messages).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for verbatim blocks).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// The heading a templated reply uses to introduce its optimized prompt.
pub const DEFAULT_MARKER: &str = "### ✨ 최적화된 프롬프트";

////////////////////////////////////////// RenderPlan //////////////////////////////////////////

/// How a reply should be laid out: prose first, then an optional verbatim block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    preamble: String,
    code_block: Option<String>,
}

impl RenderPlan {
    /// Split `content` at the first occurrence of `marker`.
    ///
    /// Without the marker (or with an empty marker) the whole reply is preamble.  Otherwise the
    /// preamble is everything before the marker and the block is the remainder, marker included,
    /// with its blockquote prefixes stripped.
    ///
    /// ```
    /// use promptsmith::RenderPlan;
    ///
    /// let plan = RenderPlan::new("A### X\n> B", "### X");
    /// assert_eq!(plan.preamble(), "A");
    /// assert_eq!(plan.code_block(), Some("### X\nB"));
    /// ```
    pub fn new(content: &str, marker: &str) -> Self {
        let split = if marker.is_empty() {
            None
        } else {
            content.find(marker)
        };
        match split {
            Some(index) => {
                let (preamble, remainder) = content.split_at(index);
                Self {
                    preamble: preamble.to_string(),
                    code_block: Some(strip_blockquote_prefix(remainder)),
                }
            }
            None => Self {
                preamble: content.to_string(),
                code_block: None,
            },
        }
    }

    /// The prose portion of the reply.
    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// The verbatim block, if the marker was present.
    pub fn code_block(&self) -> Option<&str> {
        self.code_block.as_deref()
    }

    /// True when the preamble carries anything other than whitespace.
    pub fn has_preamble(&self) -> bool {
        !self.preamble.trim().is_empty()
    }
}

/// Draw `content` through `renderer`, splitting at `marker`.
pub fn render_reply(renderer: &mut dyn Renderer, content: &str, marker: &str) {
    let plan = RenderPlan::new(content, marker);
    match plan.code_block() {
        Some(block) => {
            if plan.has_preamble() {
                renderer.print_text(plan.preamble());
            }
            renderer.print_verbatim(block);
        }
        None => renderer.print_text(plan.preamble()),
    }
    renderer.finish_response();
}

/////////////////////////////////////////// Renderer ///////////////////////////////////////////

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Capturing output in tests
pub trait Renderer: Send {
    /// Print formatted prose (markdown is passed through as-is).
    fn print_text(&mut self, text: &str);

    /// Print a literal block that must not be reflowed.
    fn print_verbatim(&mut self, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a reply has been fully drawn.
    fn finish_response(&mut self) {}
}

/// Plain text renderer with optional ANSI styling.
///
/// Verbatim blocks are fenced so they stand apart from the prose around them.  With color
/// enabled the fence is a dim rule and the block is yellow; without color the fence is a
/// markdown code fence, which keeps piped output pasteable as markdown.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn fence(&self) -> String {
        if self.use_color {
            format!("{ANSI_DIM}{}{ANSI_RESET}", "─".repeat(40))
        } else {
            "```".to_string()
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, text: &str) {
        println!("{}", text.trim_end());
        self.flush();
    }

    fn print_verbatim(&mut self, text: &str) {
        let fence = self.fence();
        println!("{fence}");
        if self.use_color {
            println!("{ANSI_YELLOW}{}{ANSI_RESET}", text.trim_end());
        } else {
            println!("{}", text.trim_end());
        }
        println!("{fence}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        if self.use_color {
            println!("{ANSI_CYAN}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
    }

    fn finish_response(&mut self) {
        println!();
        self.flush();
    }
}
