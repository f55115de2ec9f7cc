//! Tolerant reader for the relaxed-JSON manifest dialect
//!
//! Accepts `//` line and `/* */` block comments, single- or double-quoted
//! strings, unquoted object keys, and trailing commas in objects and arrays.
//! Produces a plain `serde_json::Value`, so everything downstream stays on
//! serde.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Syntax error with the position that produced it.
#[derive(Debug, Error)]
#[error("line {line}, column {column}: {message}")]
pub struct Json5Error {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Parse a relaxed-JSON document into a `serde_json::Value`.
pub fn parse(input: &str) -> Result<Value, Json5Error> {
    let mut parser = Parser::new(input);
    parser.skip_trivia()?;
    let value = parser.parse_value()?;
    parser.skip_trivia()?;
    if parser.peek().is_some() {
        return Err(parser.error("unexpected trailing content"));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> Json5Error {
        Json5Error {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), Json5Error> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected `{}`, found `{}`", expected, c))),
            None => Err(self.error(format!("expected `{}`, found end of input", expected))),
        }
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), Json5Error> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => match self.peek_at(1) {
                    Some('/') => {
                        while let Some(c) = self.peek() {
                            if c == '\n' {
                                break;
                            }
                            self.bump();
                        }
                    }
                    Some('*') => {
                        self.bump();
                        self.bump();
                        loop {
                            match self.peek() {
                                Some('*') if self.peek_at(1) == Some('/') => {
                                    self.bump();
                                    self.bump();
                                    break;
                                }
                                Some(_) => {
                                    self.bump();
                                }
                                None => return Err(self.error("unterminated block comment")),
                            }
                        }
                    }
                    _ => return Ok(()),
                },
                _ => return Ok(()),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, Json5Error> {
        match self.peek() {
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some('"') | Some('\'') => Ok(Value::String(self.parse_string()?)),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                self.parse_number()
            }
            Some(c) if is_identifier_start(c) => {
                let word = self.parse_identifier();
                match word.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" => Ok(Value::Null),
                    other => Err(self.error(format!("unexpected identifier `{}`", other))),
                }
            }
            Some(c) => Err(self.error(format!("unexpected character `{}`", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_object(&mut self) -> Result<Value, Json5Error> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(Value::Object(map));
                }
                Some('"') | Some('\'') => {
                    let key = self.parse_string()?;
                    self.parse_member(key, &mut map)?;
                }
                Some(c) if is_identifier_start(c) => {
                    let key = self.parse_identifier();
                    self.parse_member(key, &mut map)?;
                }
                Some(c) => return Err(self.error(format!("expected object key, found `{}`", c))),
                None => return Err(self.error("unterminated object")),
            }
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {
                    self.bump();
                    return Ok(Value::Object(map));
                }
                Some(c) => {
                    return Err(self.error(format!("expected `,` or `}}`, found `{}`", c)))
                }
                None => return Err(self.error("unterminated object")),
            }
        }
    }

    fn parse_member(&mut self, key: String, map: &mut Map<String, Value>) -> Result<(), Json5Error> {
        self.skip_trivia()?;
        self.expect(':')?;
        self.skip_trivia()?;
        let value = self.parse_value()?;
        map.insert(key, value);
        Ok(())
    }

    fn parse_array(&mut self) -> Result<Value, Json5Error> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(']') => {
                    self.bump();
                    return Ok(Value::Array(items));
                }
                Some(_) => items.push(self.parse_value()?),
                None => return Err(self.error("unterminated array")),
            }
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(']') => {
                    self.bump();
                    return Ok(Value::Array(items));
                }
                Some(c) => {
                    return Err(self.error(format!("expected `,` or `]`, found `{}`", c)))
                }
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, Json5Error> {
        let quote = self.bump().unwrap_or('"');
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('b') => out.push('\u{0008}'),
                    Some('f') => out.push('\u{000C}'),
                    Some('\\') => out.push('\\'),
                    Some('/') => out.push('/'),
                    Some('\'') => out.push('\''),
                    Some('"') => out.push('"'),
                    Some('u') => {
                        let code = self.read_hex4()?;
                        let c = match code {
                            // High surrogate: the paired low half must follow.
                            0xD800..=0xDBFF => {
                                if self.bump() != Some('\\') || self.bump() != Some('u') {
                                    return Err(
                                        self.error("unpaired surrogate in \\u escape")
                                    );
                                }
                                let low = self.read_hex4()?;
                                if !(0xDC00..=0xDFFF).contains(&low) {
                                    return Err(
                                        self.error("unpaired surrogate in \\u escape")
                                    );
                                }
                                let combined =
                                    0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                                char::from_u32(combined)
                                    .ok_or_else(|| self.error("invalid \\u escape"))?
                            }
                            0xDC00..=0xDFFF => {
                                return Err(self.error("unpaired surrogate in \\u escape"))
                            }
                            _ => char::from_u32(code)
                                .ok_or_else(|| self.error("invalid \\u escape"))?,
                        };
                        out.push(c);
                    }
                    Some(c) => return Err(self.error(format!("unknown escape `\\{}`", c))),
                    None => return Err(self.error("unterminated string")),
                },
                Some('\n') => return Err(self.error("unterminated string")),
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn read_hex4(&mut self) -> Result<u32, Json5Error> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid \\u escape"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn parse_identifier(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                out.push(c);
                self.bump();
            } else {
                break;
            }
        }
        out
    }

    fn parse_number(&mut self) -> Result<Value, Json5Error> {
        let mut text = String::new();
        if self.peek() == Some('+') {
            self.bump();
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Number(Number::from(i)));
        }
        if let Ok(f) = text.parse::<f64>() {
            if let Some(n) = Number::from_f64(f) {
                return Ok(Value::Number(n));
            }
        }
        Err(self.error(format!("invalid number `{}`", text)))
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_strict_json() {
        let value = parse(r#"{"id": "base", "count": 3, "ok": true}"#).unwrap();
        assert_eq!(value, json!({"id": "base", "count": 3, "ok": true}));
    }

    #[test]
    fn accepts_comments() {
        let doc = r#"
        {
            // the stable key
            id: "base",
            /* multi
               line */
            version: "1.0.0",
        }
        "#;
        let value = parse(doc).unwrap();
        assert_eq!(value["id"], "base");
        assert_eq!(value["version"], "1.0.0");
    }

    #[test]
    fn accepts_single_quotes_and_unquoted_keys() {
        let value = parse(r#"{id: 'base', entrypoint: 'catan:core'}"#).unwrap();
        assert_eq!(value["id"], "base");
        assert_eq!(value["entrypoint"], "catan:core");
    }

    #[test]
    fn accepts_trailing_commas() {
        let value = parse(r#"{list: [1, 2, 3,], nested: {a: 1,},}"#).unwrap();
        assert_eq!(value["list"], json!([1, 2, 3]));
        assert_eq!(value["nested"]["a"], 1);
    }

    #[test]
    fn string_escapes() {
        let value = parse(r#"{s: "a\nb\tA'\""}"#).unwrap();
        assert_eq!(value["s"], "a\nb\tA'\"");
    }

    #[test]
    fn unicode_escapes_including_surrogate_pairs() {
        let value = parse("{s: \"\\u0041\\u00e9\"}").unwrap();
        assert_eq!(value["s"], "A\u{e9}");

        // Astral-plane characters arrive as a high + low surrogate pair.
        let value = parse("{s: \"\\uD83C\\uDFB2\"}").unwrap();
        assert_eq!(value["s"], "\u{1F3B2}");

        assert!(parse(r#"{s: "\uD83C"}"#).is_err());
        assert!(parse(r#"{s: "\uD83Cx"}"#).is_err());
        assert!(parse(r#"{s: "\uDFB2"}"#).is_err());
    }

    #[test]
    fn reports_position_on_error() {
        let err = parse("{\n  id: \"base\"\n  version: 1\n}").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.to_string().contains("expected `,`"));
    }

    #[test]
    fn rejects_unterminated_comment_and_string() {
        assert!(parse("/* never closed").is_err());
        assert!(parse("{s: \"open").is_err());
        assert!(parse("{s: 'line\nbreak'}").is_err());
    }

    #[test]
    fn rejects_trailing_content() {
        assert!(parse("{} {}").is_err());
    }

    #[test]
    fn numbers() {
        let value = parse("{a: -4, b: 2.5, c: +7}").unwrap();
        assert_eq!(value["a"], -4);
        assert_eq!(value["b"], 2.5);
        assert_eq!(value["c"], 7);
    }
}
