use alloc::borrow::Cow;
use alloc::collections::VecDeque;
use alloc::string::String;

use crate::format::EntryType;

/// One lexical unit of the text form.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Colon,
    Comma,
    /// A quoted string, escapes already resolved.
    String(String),
    /// Any unquoted run: numbers, keywords, GUIDs, reference sentinels.
    Literal(String),
    /// Input the tokenizer could not make sense of.
    Invalid(String),
}

/// Splits the text form into [`Token`]s with arbitrary lookahead.
pub(crate) struct Tokenizer<'a> {
    input: Cow<'a, str>,
    pos: usize,
    queue: VecDeque<Token>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: impl Into<Cow<'a, str>>) -> Self {
        Self {
            input: input.into(),
            pos: 0,
            queue: VecDeque::new(),
        }
    }

    /// The token `n` places ahead, without consuming anything.
    pub fn peek(&mut self, n: usize) -> Option<&Token> {
        while self.queue.len() <= n {
            let token = self.lex()?;
            self.queue.push_back(token);
        }
        self.queue.get(n)
    }

    /// The next two tokens, without consuming anything.
    pub fn peek_pair(&mut self) -> (Option<&Token>, Option<&Token>) {
        self.peek(1);
        (self.queue.front(), self.queue.get(1))
    }

    pub fn next(&mut self) -> Option<Token> {
        match self.queue.pop_front() {
            Some(token) => Some(token),
            None => self.lex(),
        }
    }

    /// Drops whatever is left of the input.
    pub fn finish(&mut self) {
        self.queue.clear();
        self.pos = self.input.len();
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.next_char();
        }
    }

    fn lex(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let token = match self.peek_char()? {
            '{' => Token::BeginObject,
            '}' => Token::EndObject,
            '[' => Token::BeginArray,
            ']' => Token::EndArray,
            ':' => Token::Colon,
            ',' => Token::Comma,
            '"' => {
                self.next_char();
                return Some(match self.read_quoted() {
                    Some(text) => Token::String(text),
                    None => Token::Invalid(String::from("unterminated string")),
                });
            }
            _ => return Some(self.read_literal()),
        };
        self.next_char();
        Some(token)
    }

    /// Reads up to the closing quote; the opening one is already consumed.
    fn read_quoted(&mut self) -> Option<String> {
        let mut out = String::new();
        loop {
            match self.next_char()? {
                '"' => return Some(out),
                '\\' => match self.next_char()? {
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    'u' => out.push(self.read_unicode_escape()?),
                    other => out.push(other),
                },
                c => out.push(c),
            }
        }
    }

    fn read_hex4(&mut self) -> Option<u16> {
        let start = self.pos;
        let digits = self.input.get(start..start + 4)?;
        let unit = u16::from_str_radix(digits, 16).ok()?;
        self.pos += 4;
        Some(unit)
    }

    fn read_unicode_escape(&mut self) -> Option<char> {
        let high = self.read_hex4()?;
        if !(0xD800..0xDC00).contains(&high) {
            return Some(char::from_u32(u32::from(high)).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
        // A high surrogate must be followed by `\uXXXX` holding the low half.
        if self.input[self.pos..].starts_with("\\u") {
            self.pos += 2;
            let low = self.read_hex4()?;
            return Some(
                char::decode_utf16([high, low])
                    .next()
                    .and_then(Result::ok)
                    .unwrap_or(char::REPLACEMENT_CHARACTER),
            );
        }
        Some(char::REPLACEMENT_CHARACTER)
    }

    fn read_literal(&mut self) -> Token {
        let start = self.pos;
        let sentinel = self.peek_char() == Some('$');
        while let Some(c) = self.peek_char() {
            match c {
                c if c.is_whitespace() => break,
                ',' | '{' | '}' | '[' | ']' => break,
                ':' if !sentinel => break,
                '"' if sentinel => {
                    // `$strref:"key"` embeds a quoted section.
                    self.next_char();
                    if self.read_quoted().is_none() {
                        return Token::Invalid(String::from("unterminated string in a reference"));
                    }
                }
                _ => {
                    self.next_char();
                }
            }
        }
        if self.pos == start {
            // A lone character no rule accepts; consume it so lexing progresses.
            let c = self.next_char().unwrap_or_default();
            return Token::Invalid(alloc::format!("unexpected character {c:?}"));
        }
        Token::Literal(String::from(&self.input[start..self.pos]))
    }
}

/// Internal reference sentinel, followed by the id.
pub(crate) const INTERNAL_REF: &str = "$iref:";
/// External index reference sentinel, followed by the index.
pub(crate) const EXTERNAL_INDEX_REF: &str = "$eref:";
/// External GUID reference sentinel, followed by the GUID.
pub(crate) const EXTERNAL_GUID_REF: &str = "$guidref:";
/// Legacy external string reference, followed by a quoted key.
pub(crate) const LEGACY_STRING_REF: &str = "$strref:";

/// Entry type of an unquoted literal.
///
/// The rules apply in order: keywords, reference sentinels, 36 characters
/// with a dash at index 8 for GUIDs, then a `.`, an exponent or a non-finite
/// spelling for floats. Everything else is an integer.
pub(crate) fn classify_literal(text: &str) -> EntryType {
    match text {
        "null" => return EntryType::Null,
        "true" | "false" => return EntryType::Boolean,
        "NaN" | "Infinity" | "-Infinity" => return EntryType::FloatingPoint,
        _ => {}
    }
    if text.starts_with(INTERNAL_REF) {
        EntryType::InternalReference
    } else if text.starts_with(EXTERNAL_INDEX_REF) {
        EntryType::ExternalReferenceByIndex
    } else if text.starts_with(EXTERNAL_GUID_REF) {
        EntryType::ExternalReferenceByGuid
    } else if text.starts_with(LEGACY_STRING_REF) {
        EntryType::ExternalReferenceByString
    } else if text.len() == 36 && text.as_bytes()[8] == b'-' {
        EntryType::Guid
    } else if text.contains(['.', 'e', 'E']) {
        EntryType::FloatingPoint
    } else {
        EntryType::Integer
    }
}

/// Appends `text` as a quoted, escaped string.
pub(crate) fn write_quoted(text: &str, out: &mut String) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if u32::from(c) < 0x20 => {
                let _ = core::fmt::Write::write_fmt(out, format_args!("\\u{:04x}", u32::from(c)));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Resolves the quoted section of a legacy `$strref:"key"` literal.
pub(crate) fn unquote(text: &str) -> Option<String> {
    let mut tokens = Tokenizer::new(text);
    match tokens.next()? {
        Token::String(s) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn lex(text: &str) -> Vec<Token> {
        let mut tokens = Tokenizer::new(text);
        core::iter::from_fn(|| tokens.next()).collect()
    }

    #[test]
    fn punctuation_and_values() {
        assert_eq!(
            lex(r#"{ "a": [1, -2.5], "b":null }"#),
            [
                Token::BeginObject,
                Token::String("a".into()),
                Token::Colon,
                Token::BeginArray,
                Token::Literal("1".into()),
                Token::Comma,
                Token::Literal("-2.5".into()),
                Token::EndArray,
                Token::Comma,
                Token::String("b".into()),
                Token::Colon,
                Token::Literal("null".into()),
                Token::EndObject,
            ]
        );
    }

    #[test]
    fn escapes() {
        assert_eq!(
            lex(r#""q\"\\\né😀""#),
            [Token::String("q\"\\\né😀".into())]
        );
        let mut out = String::new();
        write_quoted("a\"b\\\u{1}", &mut out);
        assert_eq!(out, r#""a\"b\\\u0001""#);
        assert_eq!(lex(&out), [Token::String("a\"b\\\u{1}".into())]);
    }

    #[test]
    fn sentinels_keep_colons_and_quotes() {
        assert_eq!(
            lex(r#"$iref:3, $strref:"a,b""#),
            [
                Token::Literal("$iref:3".into()),
                Token::Comma,
                Token::Literal(r#"$strref:"a,b""#.into()),
            ]
        );
        assert_eq!(unquote(r#""a,b""#).as_deref(), Some("a,b"));
    }

    #[test]
    fn unterminated_string() {
        assert!(matches!(lex(r#""abc"#).as_slice(), [Token::Invalid(_)]));
    }

    #[test]
    fn lookahead_does_not_consume() {
        let mut tokens = Tokenizer::new("{ }");
        assert_eq!(tokens.peek(1), Some(&Token::EndObject));
        assert_eq!(tokens.next(), Some(Token::BeginObject));
        assert_eq!(tokens.next(), Some(Token::EndObject));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn literal_inference() {
        assert_eq!(classify_literal("null"), EntryType::Null);
        assert_eq!(classify_literal("false"), EntryType::Boolean);
        assert_eq!(classify_literal("42"), EntryType::Integer);
        assert_eq!(classify_literal("-7"), EntryType::Integer);
        assert_eq!(classify_literal("1.0"), EntryType::FloatingPoint);
        assert_eq!(classify_literal("1e300"), EntryType::FloatingPoint);
        assert_eq!(classify_literal("-Infinity"), EntryType::FloatingPoint);
        assert_eq!(
            classify_literal("67e55044-10b1-426f-9247-bb680e5fe0c8"),
            EntryType::Guid
        );
        assert_eq!(classify_literal("$iref:0"), EntryType::InternalReference);
        assert_eq!(classify_literal("$eref:2"), EntryType::ExternalReferenceByIndex);
        assert_eq!(
            classify_literal("$guidref:67e55044-10b1-426f-9247-bb680e5fe0c8"),
            EntryType::ExternalReferenceByGuid
        );
        assert_eq!(classify_literal(r#"$strref:"k""#), EntryType::ExternalReferenceByString);
    }
}
