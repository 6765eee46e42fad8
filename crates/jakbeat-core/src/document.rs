//! Text front end: turns a beat document into the sections consumed by the
//! song builder.
//!
//! ```text
//! [WHO]
//! kick = ( path = kick.wav volume = 100 )
//! [WHAT]
//! Output = ( A1 A1 )
//! A1 = ( bpm = 120 )
//! [A1]
//! kick = "!..."
//! ```

use std::{iter::Peekable, vec::IntoIter};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::value::{OptionNode, Section, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: &'static str,
        found: String,
    },
    #[error("line {line}: unterminated quoted string")]
    UnterminatedString { line: usize },
    #[error("unexpected end of document, expected {expected}")]
    UnexpectedEof { expected: &'static str },
    #[error("line {line}: lists nested deeper than {}", MAX_NESTING)]
    TooDeep { line: usize },
}

/// Deepest `( … )` nesting the parser accepts.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    OpenSection,
    CloseSection,
    OpenList,
    CloseList,
    Equals,
    Text(String),
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            Self::OpenSection => "`[`".to_string(),
            Self::CloseSection => "`]`".to_string(),
            Self::OpenList => "`(`".to_string(),
            Self::CloseList => "`)`".to_string(),
            Self::Equals => "`=`".to_string(),
            Self::Text(text) => format!("{text:?}"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')' | '=')
}

fn tokenize(source: &str) -> Result<Vec<Token>, DocumentError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        let kind = match c {
            '\n' => {
                line += 1;
                continue;
            }
            c if c.is_whitespace() => continue,
            '[' => TokenKind::OpenSection,
            ']' => TokenKind::CloseSection,
            '(' => TokenKind::OpenList,
            ')' => TokenKind::CloseList,
            '=' => TokenKind::Equals,
            '"' => {
                let start = line;
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(c) => {
                            if c == '\n' {
                                line += 1;
                            }
                            text.push(c);
                        }
                        None => return Err(DocumentError::UnterminatedString { line: start }),
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Text(text),
                    line: start,
                });
                continue;
            }
            c => {
                let mut text = String::from(c);
                while let Some(&next) = chars.peek() {
                    if is_delimiter(next) {
                        break;
                    }
                    text.push(next);
                    chars.next();
                }
                TokenKind::Text(text)
            }
        };
        tokens.push(Token { kind, line });
    }

    Ok(tokens)
}

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
    depth: usize,
}

impl Parser {
    fn next(&mut self, expected: &'static str) -> Result<Token, DocumentError> {
        self.tokens
            .next()
            .ok_or(DocumentError::UnexpectedEof { expected })
    }

    fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<(), DocumentError> {
        let token = self.next(expected)?;
        if &token.kind == kind {
            Ok(())
        } else {
            Err(unexpected(&token, expected))
        }
    }

    fn text(&mut self, expected: &'static str) -> Result<String, DocumentError> {
        let token = self.next(expected)?;
        match token.kind {
            TokenKind::Text(text) => Ok(text),
            _ => Err(unexpected(&token, expected)),
        }
    }

    fn peek_is(&mut self, kind: &TokenKind) -> bool {
        self.tokens.peek().is_some_and(|token| &token.kind == kind)
    }

    fn section(&mut self) -> Result<Section, DocumentError> {
        self.expect(&TokenKind::OpenSection, "`[`")?;
        let mut section = Section::new(self.text("section name")?);
        self.expect(&TokenKind::CloseSection, "`]`")?;

        while self.tokens.peek().is_some() && !self.peek_is(&TokenKind::OpenSection) {
            let name = self.text("option name")?;
            self.expect(&TokenKind::Equals, "`=`")?;
            let value = self.value()?;
            section.options.push(OptionNode::new(name, value));
        }
        Ok(section)
    }

    fn value(&mut self) -> Result<Value, DocumentError> {
        let token = self.next("value")?;
        match token.kind {
            TokenKind::Text(text) => Ok(Value::Scalar(text)),
            TokenKind::OpenList => self.list(token.line),
            _ => Err(unexpected(&token, "value")),
        }
    }

    fn list(&mut self, line: usize) -> Result<Value, DocumentError> {
        if self.depth == MAX_NESTING {
            return Err(DocumentError::TooDeep { line });
        }
        self.depth += 1;
        let list = self.list_items();
        self.depth -= 1;
        list
    }

    fn list_items(&mut self) -> Result<Value, DocumentError> {
        let mut items = Vec::new();
        loop {
            let token = self.next("list item or `)`")?;
            match token.kind {
                TokenKind::CloseList => return Ok(Value::List(items)),
                TokenKind::OpenList => items.push(self.list(token.line)?),
                TokenKind::Text(text) => {
                    if self.peek_is(&TokenKind::Equals) {
                        self.tokens.next();
                        items.push(Value::Option(OptionNode::new(text, self.value()?)));
                    } else {
                        items.push(Value::Scalar(text));
                    }
                }
                _ => return Err(unexpected(&token, "list item or `)`")),
            }
        }
    }
}

fn unexpected(token: &Token, expected: &'static str) -> DocumentError {
    DocumentError::UnexpectedToken {
        line: token.line,
        expected,
        found: token.kind.describe(),
    }
}

#[instrument(skip(source), fields(bytes = source.len()))]
pub fn parse_document(source: &str) -> Result<Vec<Section>, DocumentError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens: tokens.into_iter().peekable(),
        depth: 0,
    };

    let mut sections = Vec::new();
    while parser.tokens.peek().is_some() {
        sections.push(parser.section()?);
    }

    debug!(sections = sections.len(), "document parsed");
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_value_shapes() {
        let source = r#"
[WHO]
kick = ( path = "samples/kick 1.wav" volume = 90 stereo = chorus params = ( pan = -20 depth = 5 ) )

[WHAT]
Output = ( A1 A1 B )
A1 = ( bpm = 140 )

[A1]
kick = "!. !."
"#;
        let sections = parse_document(source).expect("document should parse");
        assert_eq!(sections.len(), 3);

        let who = &sections[0];
        assert_eq!(who.name, "WHO");
        let Value::List(fields) = who.options[0].value.as_ref() else {
            panic!("sample entry should be a list");
        };
        assert_eq!(
            fields[0],
            Value::option("path", Value::scalar("samples/kick 1.wav"))
        );
        assert_eq!(
            fields[3],
            Value::option(
                "params",
                Value::List(vec![
                    Value::option("pan", Value::scalar("-20")),
                    Value::option("depth", Value::scalar("5")),
                ])
            )
        );

        assert_eq!(
            *sections[1].options[0].value,
            Value::List(vec![
                Value::scalar("A1"),
                Value::scalar("A1"),
                Value::scalar("B")
            ])
        );
        assert_eq!(*sections[2].options[0].value, Value::scalar("!. !."));
    }

    #[test]
    fn bare_glyphs_are_scalars() {
        let sections = parse_document("[A]\nkick=!..!\nhat = -/-/").expect("should parse");
        assert_eq!(*sections[0].options[0].value, Value::scalar("!..!"));
        assert_eq!(*sections[0].options[1].value, Value::scalar("-/-/"));
    }

    #[test]
    fn reports_line_of_unexpected_token() {
        let error = parse_document("[WHO]\nkick = ( path = a.wav )\n= oops").expect_err("must fail");
        assert_eq!(
            error,
            DocumentError::UnexpectedToken {
                line: 3,
                expected: "option name",
                found: "`=`".to_string(),
            }
        );
    }

    #[test]
    fn reports_unterminated_quote() {
        assert_eq!(
            parse_document("[A]\n\nkick = \"!..."),
            Err(DocumentError::UnterminatedString { line: 3 })
        );
    }

    #[test]
    fn reports_truncated_list() {
        assert_eq!(
            parse_document("[WHAT]\nOutput = ( A B"),
            Err(DocumentError::UnexpectedEof {
                expected: "list item or `)`"
            })
        );
    }

    #[test]
    fn options_before_any_section_are_rejected() {
        assert!(matches!(
            parse_document("kick = x"),
            Err(DocumentError::UnexpectedToken { expected: "`[`", .. })
        ));
    }

    #[test]
    fn runaway_nesting_is_rejected() {
        let source = format!(
            "[WHO]\nkick = {}{}",
            "(".repeat(200_000),
            ")".repeat(200_000)
        );
        assert_eq!(
            parse_document(&source),
            Err(DocumentError::TooDeep { line: 2 })
        );
    }

    #[test]
    fn nesting_up_to_the_cap_parses() {
        let source = format!(
            "[A]\nx = {}{}",
            "(".repeat(MAX_NESTING),
            ")".repeat(MAX_NESTING)
        );
        let sections = parse_document(&source).expect("nesting at the cap should parse");
        let mut depth = 0;
        let mut value = sections[0].options[0].value.as_ref();
        while let Value::List(items) = value {
            depth += 1;
            match items.first() {
                Some(inner) => value = inner,
                None => break,
            }
        }
        assert_eq!(depth, MAX_NESTING);
    }

    #[test]
    fn quotes_inside_a_bare_word_stay_in_the_word() {
        let sections = parse_document("[A]\nkick = a\"b\" hat = x").expect("should parse");
        assert_eq!(*sections[0].options[0].value, Value::scalar("a\"b\""));
        assert_eq!(*sections[0].options[1].value, Value::scalar("x"));
    }

    #[test]
    fn empty_document_has_no_sections() {
        assert_eq!(parse_document("  \n\t"), Ok(Vec::new()));
    }
}
