//! Removal of markdown blockquote prefixes.

/// Strip one leading blockquote marker from every line of `text`.
///
/// A line starting with `"> "` loses those two characters; a line starting with a bare `">"`
/// loses one.  All other lines pass through untouched.  Lines are split and re-joined on `'\n'`,
/// so a trailing newline or `\r\n` line endings survive the round trip.
///
/// ```
/// use promptsmith::strip_blockquote_prefix;
///
/// assert_eq!(strip_blockquote_prefix("> a\n>b\nc"), "a\nb\nc");
/// ```
pub fn strip_blockquote_prefix(text: &str) -> String {
    text.split('\n')
        .map(strip_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_line(line: &str) -> &str {
    line.strip_prefix("> ")
        .or_else(|| line.strip_prefix('>'))
        .unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_both_prefix_forms() {
        assert_eq!(strip_blockquote_prefix("> a\n>b\nc"), "a\nb\nc");
    }

    #[test]
    fn empty_input() {
        assert_eq!(strip_blockquote_prefix(""), "");
    }

    #[test]
    fn unquoted_input_is_unchanged() {
        let text = "first line\n\n  indented > not a quote\nlast\n";
        assert_eq!(strip_blockquote_prefix(text), text);
    }

    #[test]
    fn crlf_lines_keep_their_carriage_returns() {
        assert_eq!(strip_blockquote_prefix("> a\r\n> b\r\n"), "a\r\nb\r\n");
    }

    #[test]
    fn only_one_level_is_removed() {
        assert_eq!(strip_blockquote_prefix("> > nested"), "> nested");
        assert_eq!(strip_blockquote_prefix(">>x"), ">x");
    }

    #[test]
    fn empty_quote_line() {
        assert_eq!(strip_blockquote_prefix(">\n> \nx"), "\n\nx");
    }

    #[test]
    fn idempotent_for_single_prefix_lines() {
        let inputs = [
            "> a\n>b\nc",
            "> ### heading\n> \n> body text\n>tail",
            "plain\n> quoted",
            ">",
            "> ",
            "",
        ];
        for input in inputs {
            let once = strip_blockquote_prefix(input);
            assert_eq!(strip_blockquote_prefix(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn multibyte_content() {
        assert_eq!(
            strip_blockquote_prefix("> 여행 블로그\n>✨ 템플릿"),
            "여행 블로그\n✨ 템플릿"
        );
    }
}
