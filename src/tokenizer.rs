use log::debug;
use std::{
    fmt::{self, Display, Formatter},
    ops::Range,
};

use crate::error::{tokenizer_error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenType {
    LeftParen,
    RightParen,
    Comma,
    Semicolon,

    Plus,
    Minus,
    Star,
    Slash,

    Bang,
    Equal,
    Greater,
    Less,

    Name(String),
    /// Keeps its surrounding quote characters.
    String(String),
    Number(i64),

    If,
    Then,
    Else,
    EndIf,
    While,
    Do,
    EndWhile,

    NewLine,
    EOF,
}

impl TokenType {
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenType::If
                | TokenType::Then
                | TokenType::Else
                | TokenType::EndIf
                | TokenType::While
                | TokenType::Do
                | TokenType::EndWhile
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, TokenType::String(_) | TokenType::Number(_))
    }

    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            TokenType::LeftParen
                | TokenType::RightParen
                | TokenType::Comma
                | TokenType::Semicolon
                | TokenType::Plus
                | TokenType::Minus
                | TokenType::Star
                | TokenType::Slash
                | TokenType::Bang
                | TokenType::Equal
                | TokenType::Greater
                | TokenType::Less
        )
    }
}

impl Display for TokenType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::LeftParen => write!(f, "("),
            TokenType::RightParen => write!(f, ")"),
            TokenType::Comma => write!(f, ","),
            TokenType::Semicolon => write!(f, ";"),
            TokenType::Plus => write!(f, "+"),
            TokenType::Minus => write!(f, "-"),
            TokenType::Star => write!(f, "*"),
            TokenType::Slash => write!(f, "/"),
            TokenType::Bang => write!(f, "!"),
            TokenType::Equal => write!(f, "="),
            TokenType::Greater => write!(f, ">"),
            TokenType::Less => write!(f, "<"),
            TokenType::Name(name) => write!(f, "{}", name),
            TokenType::String(s) => write!(f, "{}", s),
            TokenType::Number(n) => write!(f, "{}", n),
            TokenType::If => write!(f, "if"),
            TokenType::Then => write!(f, "then"),
            TokenType::Else => write!(f, "else"),
            TokenType::EndIf => write!(f, "endif"),
            TokenType::While => write!(f, "while"),
            TokenType::Do => write!(f, "do"),
            TokenType::EndWhile => write!(f, "endwhile"),
            TokenType::NewLine => writeln!(f),
            TokenType::EOF => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub line: usize,
    /// Byte offsets of the lexeme in the tokenized buffer.
    pub span: Range<usize>,
}

/// Lazy token stream over a source buffer.
///
/// Newlines and comments are consumed internally and never yielded. The stream
/// ends after the last token (no `EOF` is yielded) or after the first error.
/// Cloning a stream restarts it from the clone's position.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    bytes: &'a [u8],
    cursor: usize,
    line: usize,
    done: bool,
}

pub fn tokens(bytes: &[u8]) -> Tokens<'_> {
    tokens_from(bytes, 1)
}

/// Like [`tokens`], but numbers lines starting at `first_line`, for buffers
/// that are one line out of a larger file.
pub fn tokens_from(bytes: &[u8], first_line: usize) -> Tokens<'_> {
    Tokens {
        bytes,
        cursor: 0,
        line: first_line,
        done: false,
    }
}

impl Tokens<'_> {
    pub fn line(&self) -> usize {
        self.line
    }
}

impl Iterator for Tokens<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match next_token(&self.bytes[self.cursor..], self.line) {
                Ok((span, TokenType::EOF)) => {
                    self.cursor += span.end;
                    self.done = true;

                    assert_eq!(self.cursor, self.bytes.len());
                }
                Ok((span, TokenType::NewLine)) => {
                    self.cursor += span.end;
                    self.line += 1;
                }
                Ok((span, token_type)) => {
                    let start = self.cursor + span.start;
                    self.cursor += span.end;
                    return Some(Ok(Token {
                        token_type,
                        line: self.line,
                        span: start..self.cursor,
                    }));
                }
                Err(err) => {
                    debug!("{} on line {}", err, self.line);
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

/// Tokenizes the whole buffer, terminating the result with `EOF`.
pub fn tokenize(bytes: &[u8]) -> Result<Vec<Token>> {
    tokenize_at(bytes, 1)
}

/// Tokenizes a buffer whose first line is line `first_line` of its source.
pub fn tokenize_at(bytes: &[u8], first_line: usize) -> Result<Vec<Token>> {
    let mut stream = tokens_from(bytes, first_line);
    let mut tokens = Vec::with_capacity(bytes.len() + 1); // upper bound

    for token in stream.by_ref() {
        tokens.push(token?);
    }

    tokens.push(Token {
        token_type: TokenType::EOF,
        line: stream.line(),
        span: bytes.len()..bytes.len(),
    });

    Ok(tokens)
}

/// Scans one token; the returned span is relative to `bytes` and its end is
/// the number of bytes consumed.
fn next_token(bytes: &[u8], line: usize) -> Result<(Range<usize>, TokenType)> {
    let n = bytes.len();

    let mut cursor = bytes
        .iter()
        .take_while(|&&b| matches!(b, b' ' | b'\t' | b'\r'))
        .count();

    // Comments run to the end of the line; the newline itself is left for the caller.
    if bytes[cursor..].starts_with(b"//") {
        cursor += bytes[cursor..].iter().take_while(|&&b| b != b'\n').count();
    }

    if cursor == n {
        return Ok((cursor..cursor, TokenType::EOF));
    }

    let token = match bytes[cursor] {
        b'\n' => Some(TokenType::NewLine),
        b'(' => Some(TokenType::LeftParen),
        b')' => Some(TokenType::RightParen),
        b',' => Some(TokenType::Comma),
        b';' => Some(TokenType::Semicolon),
        b'+' => Some(TokenType::Plus),
        b'-' => Some(TokenType::Minus),
        b'*' => Some(TokenType::Star),
        b'/' => Some(TokenType::Slash),
        b'=' => Some(TokenType::Equal),
        b'!' => Some(TokenType::Bang),
        b'<' => Some(TokenType::Less),
        b'>' => Some(TokenType::Greater),
        _ => None,
    };

    if let Some(token) = token {
        return Ok((cursor..cursor + 1, token));
    }

    if bytes[cursor] == b'"' {
        let start_byte = cursor;
        let mut end_byte = cursor + 1;

        while end_byte < n && bytes[end_byte] != b'"' && bytes[end_byte] != b'\n' {
            end_byte += 1;
        }

        if end_byte >= n || bytes[end_byte] != b'"' {
            return tokenizer_error("Unterminated string literal", line);
        }

        let literal = String::from_utf8_lossy(&bytes[start_byte..=end_byte]).into_owned();
        return Ok((start_byte..end_byte + 1, TokenType::String(literal)));
    }

    if bytes[cursor].is_ascii_digit() {
        let start_byte = cursor;
        let mut end_byte = cursor;

        while end_byte < n && bytes[end_byte].is_ascii_digit() {
            end_byte += 1;
        }

        let lexeme = String::from_utf8_lossy(&bytes[start_byte..end_byte]);
        return match lexeme.parse() {
            Ok(value) => Ok((start_byte..end_byte, TokenType::Number(value))),
            Err(_) => tokenizer_error(&format!("Number literal '{}' is too large", lexeme), line),
        };
    }

    if bytes[cursor].is_ascii_alphabetic() || bytes[cursor] == b'_' {
        let start_byte = cursor;
        let mut end_byte = cursor + 1;

        while end_byte < n && (bytes[end_byte].is_ascii_alphanumeric() || bytes[end_byte] == b'_') {
            end_byte += 1;
        }

        let lexeme = &bytes[start_byte..end_byte];
        let token = match lexeme {
            b"if" => TokenType::If,
            b"then" => TokenType::Then,
            b"else" => TokenType::Else,
            b"endif" => TokenType::EndIf,
            b"while" => TokenType::While,
            b"do" => TokenType::Do,
            b"endwhile" => TokenType::EndWhile,
            _ => TokenType::Name(String::from_utf8_lossy(lexeme).into_owned()),
        };

        return Ok((start_byte..end_byte, token));
    }

    let unexpected = String::from_utf8_lossy(&bytes[cursor..])
        .chars()
        .next()
        .unwrap_or(char::REPLACEMENT_CHARACTER);

    tokenizer_error(&format!("Unexpected character '{}'", unexpected), line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn token_types(input: &str) -> Result<Vec<TokenType>> {
        Ok(tokenize(input.as_bytes())?
            .into_iter()
            .map(|token| token.token_type)
            .collect())
    }

    #[test]
    fn test_assignment() -> Result<()> {
        assert_eq!(
            token_types("x = 42")?,
            vec![
                TokenType::Name("x".to_string()),
                TokenType::Equal,
                TokenType::Number(42),
                TokenType::EOF,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_keywords_win_over_names() -> Result<()> {
        assert_eq!(
            token_types("if x then y endif")?,
            vec![
                TokenType::If,
                TokenType::Name("x".to_string()),
                TokenType::Then,
                TokenType::Name("y".to_string()),
                TokenType::EndIf,
                TokenType::EOF,
            ]
        );

        // A keyword prefix does not split an identifier
        assert_eq!(
            token_types("iffy dot endwhiles")?,
            vec![
                TokenType::Name("iffy".to_string()),
                TokenType::Name("dot".to_string()),
                TokenType::Name("endwhiles".to_string()),
                TokenType::EOF,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_string_keeps_quotes() -> Result<()> {
        assert_eq!(
            token_types("s = \"hello world\"")?,
            vec![
                TokenType::Name("s".to_string()),
                TokenType::Equal,
                TokenType::String("\"hello world\"".to_string()),
                TokenType::EOF,
            ]
        );

        // Shortest match between quotes
        assert_eq!(
            token_types("\"a\" \"b\"")?,
            vec![
                TokenType::String("\"a\"".to_string()),
                TokenType::String("\"b\"".to_string()),
                TokenType::EOF,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_comments_and_whitespace() -> Result<()> {
        assert_eq!(
            token_types("\t x // the rest is ignored = 1")?,
            vec![TokenType::Name("x".to_string()), TokenType::EOF]
        );
        assert_eq!(token_types("// only a comment")?, vec![TokenType::EOF]);
        assert_eq!(token_types("   ")?, vec![TokenType::EOF]);
        Ok(())
    }

    #[test]
    fn test_line_numbers() -> Result<()> {
        let tokens = tokenize(b"x\n\ny // note\nz")?;
        let lines: Vec<usize> = tokens.iter().map(|token| token.line).collect();
        assert_eq!(lines, vec![1, 3, 4, 4]);
        Ok(())
    }

    #[test]
    fn test_first_line_offset() -> Result<()> {
        let tokens = tokenize_at(b"x\ny", 7)?;
        let lines: Vec<usize> = tokens.iter().map(|token| token.line).collect();
        assert_eq!(lines, vec![7, 8, 8]);

        assert!(matches!(
            tokenize_at(b"x = 1 @", 12),
            Err(Error::Tokenizer { line: 12, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_spans() -> Result<()> {
        let source = "s = \"hi\" // note\n  count";
        let tokens = tokenize(source.as_bytes())?;
        let lexemes: Vec<&str> = tokens.iter().map(|token| &source[token.span.clone()]).collect();
        assert_eq!(lexemes, vec!["s", "=", "\"hi\"", "count", ""]);
        assert_eq!(tokens[3].span, 19..24);
        Ok(())
    }

    #[test]
    fn test_all_literal_characters() -> Result<()> {
        assert_eq!(
            token_types("=+-/*(),;<>!")?,
            vec![
                TokenType::Equal,
                TokenType::Plus,
                TokenType::Minus,
                TokenType::Slash,
                TokenType::Star,
                TokenType::LeftParen,
                TokenType::RightParen,
                TokenType::Comma,
                TokenType::Semicolon,
                TokenType::Less,
                TokenType::Greater,
                TokenType::Bang,
                TokenType::EOF,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_stream_is_lazy_and_restartable() -> Result<()> {
        let mut stream = tokens(b"a + b");
        let first = stream.next().transpose()?;
        assert_eq!(
            first.map(|token| token.token_type),
            Some(TokenType::Name("a".to_string()))
        );

        let restarted = stream.clone();
        let rest: Vec<TokenType> = stream
            .map(|token| token.map(|t| t.token_type))
            .collect::<Result<_>>()?;
        let again: Vec<TokenType> = restarted
            .map(|token| token.map(|t| t.token_type))
            .collect::<Result<_>>()?;

        assert_eq!(rest, vec![TokenType::Plus, TokenType::Name("b".to_string())]);
        assert_eq!(rest, again);
        Ok(())
    }

    #[test]
    fn test_error_cases() {
        assert!(matches!(
            tokenize(b"x = 1 @ 2"),
            Err(Error::Tokenizer { line: 1, .. })
        ));
        assert!(matches!(
            tokenize(b"\nx = \"open"),
            Err(Error::Tokenizer { line: 2, .. })
        ));
        assert!(tokenize(b"x = 'single'").is_err());
        assert!(tokenize(b"99999999999999999999999").is_err());
        assert!(tokenize("x = é".as_bytes()).is_err());
    }
}
