use nu_ansi_term::{Color, Style};
use reedline::{
    Highlighter, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    StyledText, ValidationResult, Validator,
};
use std::borrow::Cow;

use crate::tokenizer::{tokenize, tokens, TokenType};

#[derive(Clone)]
pub struct REPLPrompt;

impl Prompt for REPLPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Borrowed("minibasic")
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<str> {
        Cow::Borrowed("❯ ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed("  ... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

pub fn banner() -> String {
    format!(
        "{} {}\n{}\nCtrl-D or Ctrl-C to exit.",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_DESCRIPTION"),
    )
}

/// Keeps the buffer open while an `if`/`while` block or a parenthesis is
/// still unclosed, so one statement can span several lines. Strings never
/// span lines, so an unterminated one is submitted and reported on the spot.
pub struct REPLValidator;

impl Validator for REPLValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        let mut blocks: i64 = 0;
        let mut parens: i64 = 0;

        for token in tokens(line.as_bytes()) {
            let token = match token {
                Ok(token) => token,
                // Let the tokenizer report it on submit
                Err(_) => return ValidationResult::Complete,
            };

            match token.token_type {
                TokenType::If | TokenType::While => blocks += 1,
                TokenType::EndIf | TokenType::EndWhile => blocks -= 1,
                TokenType::LeftParen => parens += 1,
                TokenType::RightParen => parens -= 1,
                _ => {}
            }

            if blocks < 0 || parens < 0 {
                return ValidationResult::Complete;
            }
        }

        if blocks == 0 && parens == 0 {
            ValidationResult::Complete
        } else {
            ValidationResult::Incomplete
        }
    }
}

pub static KEYWORD_COLOR: Color = Color::LightBlue;
pub static LITERAL_COLOR: Color = Color::Yellow;
pub static DEFAULT_COLOR: Color = Color::White;
pub static OPERATOR_COLOR: Color = Color::DarkGray;

pub struct SyntaxHighlighter;

impl Highlighter for SyntaxHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled_text = StyledText::new();

        let tokens = match tokenize(line.as_bytes()) {
            Ok(t) => t,
            Err(_) => {
                styled_text.push((Style::new().fg(DEFAULT_COLOR), line.to_string()));
                return styled_text;
            }
        };

        let mut last_end = 0;

        for token in tokens {
            if token.token_type == TokenType::EOF {
                break;
            }

            // Whitespace and comments between tokens keep the default color
            if token.span.start > last_end {
                styled_text.push((
                    Style::new().fg(DEFAULT_COLOR),
                    line[last_end..token.span.start].to_string(),
                ));
            }

            let color = if token.token_type.is_keyword() {
                KEYWORD_COLOR
            } else if token.token_type.is_literal() {
                LITERAL_COLOR
            } else if token.token_type.is_operator() {
                OPERATOR_COLOR
            } else {
                DEFAULT_COLOR
            };

            styled_text.push((Style::new().fg(color), line[token.span.clone()].to_string()));
            last_end = token.span.end;
        }

        if last_end < line.len() {
            styled_text.push((Style::new().fg(DEFAULT_COLOR), line[last_end..].to_string()));
        }

        styled_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_complete(line: &str) -> bool {
        matches!(REPLValidator.validate(line), ValidationResult::Complete)
    }

    #[test]
    fn test_validator_single_line() {
        assert!(is_complete(""));
        assert!(is_complete("x = 1"));
        assert!(is_complete("if x then y endif"));
        assert!(is_complete("while x < 3 do x = x + 1 endwhile"));
    }

    #[test]
    fn test_validator_open_blocks() {
        assert!(!is_complete("while x < 3 do"));
        assert!(!is_complete("if x then\n  while y do"));
        assert!(!is_complete("x = (1 +"));
        assert!(is_complete("while x < 3 do\n  x = x + 1\nendwhile"));
    }

    #[test]
    fn test_validator_defers_errors() {
        assert!(is_complete("if x then @"));
        assert!(is_complete("endif"));
        assert!(is_complete("x = )"));
        assert!(is_complete("s = \"abc"));
        assert!(is_complete("if x then\n  s = \"abc"));
    }

    #[test]
    fn test_highlighter_preserves_text() {
        let line = "if x < 10 then s = \"ten\" endif // note";
        let styled = SyntaxHighlighter.highlight(line, 0);
        let rebuilt: String = styled.buffer.iter().map(|(_, text)| text.as_str()).collect();
        assert_eq!(rebuilt, line);

        let keywords: Vec<&str> = styled
            .buffer
            .iter()
            .filter(|(style, _)| style.foreground == Some(KEYWORD_COLOR))
            .map(|(_, text)| text.as_str())
            .collect();
        assert_eq!(keywords, vec!["if", "then", "endif"]);
    }

    #[test]
    fn test_highlighter_skips_comment_text() {
        let line = "x // if\nif x then 1 endif";
        let styled = SyntaxHighlighter.highlight(line, 0);
        let rebuilt: String = styled.buffer.iter().map(|(_, text)| text.as_str()).collect();
        assert_eq!(rebuilt, line);

        assert!(styled
            .buffer
            .iter()
            .any(|(style, text)| text == " // if\n" && style.foreground == Some(DEFAULT_COLOR)));

        let keywords: Vec<&str> = styled
            .buffer
            .iter()
            .filter(|(style, _)| style.foreground == Some(KEYWORD_COLOR))
            .map(|(_, text)| text.as_str())
            .collect();
        assert_eq!(keywords, vec!["if", "then", "endif"]);
    }
}
