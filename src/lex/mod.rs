//! Lexing pass: one left-to-right scan that produces the ordered token
//! list, the per-container child counts and the exact byte size of the
//! final document allocation.
//!
//! Strings keep a span into the source text, no copy and no escape
//! decoding; numbers keep their raw slice and are converted during the
//! parse pass. Commas are structural separators and are consumed silently,
//! like whitespace. Because scope nodes are recycled as containers close,
//! each container's final child count is copied into its begin token at
//! close time; the parse pass reads counts from tokens only.

use memchr::memchr;

use crate::doc::{PairSlot, ValueId, ValueNode};
use crate::error::Error;
use crate::scope::ScopeStack;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Key,
    Str,
    Int,
    Float,
    ObjectBegin,
    ObjectEnd,
    ArrayBegin,
    ArrayEnd,
    Eof,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's text in the source (string content starts
    /// after the opening quote).
    pub start: u32,
    pub len: u32,
    /// Container-begin tokens only: number of direct children, recorded when
    /// the container's scope closed.
    pub children: u32,
}

impl Token {
    fn new(kind: TokenKind, start: usize, len: usize) -> Self {
        Self {
            kind,
            start: start as u32,
            len: len as u32,
            children: 0,
        }
    }

    pub(crate) fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start as usize..(self.start + self.len) as usize]
    }
}

/// Running total of the bytes the parsed document will occupy, broken down
/// by arena buffer. `required_bytes` is the exact single-allocation size the
/// parse pass must consume completely: no slack, no overflow.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SizeTally {
    /// Value nodes: one per scalar and one per container.
    pub values: usize,
    /// Object table slots, summed over all objects' key counts.
    pub pair_slots: usize,
    /// Array element slots, summed over all arrays' lengths.
    pub child_slots: usize,
    /// String payload bytes (keys and string values), one NUL terminator
    /// byte budgeted per string.
    pub text_bytes: usize,
}

impl SizeTally {
    pub fn required_bytes(&self) -> usize {
        self.values * std::mem::size_of::<ValueNode>()
            + self.pair_slots * std::mem::size_of::<PairSlot>()
            + self.child_slots * std::mem::size_of::<ValueId>()
            + self.text_bytes
    }
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

fn is_numeric(byte: u8) -> bool {
    byte.is_ascii_digit() || byte == b'+' || byte == b'-'
}

/// Scans `input` into `tokens` (cleared first) and returns the size tally.
/// The scope stack is used in counting mode and is left drained.
pub(crate) fn lex(input: &str, tokens: &mut Vec<Token>, scopes: &mut ScopeStack) -> Result<SizeTally> {
    tokens.clear();
    scopes.reset();

    let bytes = input.as_bytes();
    let mut tally = SizeTally::default();
    let mut at = 0;

    while at < bytes.len() {
        let byte = bytes[at];
        match byte {
            _ if is_whitespace(byte) || byte == b',' => at += 1,
            b'"' => {
                let content_start = at + 1;
                let close = memchr(b'"', &bytes[content_start..])
                    .ok_or(Error::UnterminatedString { at })?;
                let content_len = close;
                at = content_start + close + 1;

                // A string immediately followed (after whitespace) by ':'
                // is a key, otherwise a string value.
                let mut look = at;
                while look < bytes.len() && is_whitespace(bytes[look]) {
                    look += 1;
                }
                if look < bytes.len() && bytes[look] == b':' {
                    tokens.push(Token::new(TokenKind::Key, content_start, content_len));
                    at = look + 1;
                } else {
                    tokens.push(Token::new(TokenKind::Str, content_start, content_len));
                    tally.values += 1;
                    bump_child(scopes);
                }
                tally.text_bytes += content_len + 1;
            }
            b'{' | b'[' => {
                let is_object = byte == b'{';
                bump_child(scopes);
                let kind = if is_object {
                    TokenKind::ObjectBegin
                } else {
                    TokenKind::ArrayBegin
                };
                scopes.open(tokens.len() as u32, is_object);
                tokens.push(Token::new(kind, at, 1));
                tally.values += 1;
                at += 1;
            }
            b'}' | b']' => {
                let closing_object = byte == b'}';
                let matches_open = scopes
                    .current()
                    .is_some_and(|id| scopes.node(id).is_object == closing_object);
                if !matches_open {
                    return Err(Error::UnbalancedClose { at });
                }
                let node = scopes.close().expect("scope checked above");
                tokens[node.owner as usize].children = node.child_count;
                if closing_object {
                    tally.pair_slots += node.child_count as usize;
                    tokens.push(Token::new(TokenKind::ObjectEnd, at, 1));
                } else {
                    tally.child_slots += node.child_count as usize;
                    tokens.push(Token::new(TokenKind::ArrayEnd, at, 1));
                }
                at += 1;
            }
            _ if is_numeric(byte) => {
                let start = at;
                let mut is_float = false;
                while at < bytes.len() {
                    if is_numeric(bytes[at]) {
                        at += 1;
                    } else if bytes[at] == b'.' && !is_float {
                        is_float = true;
                        at += 1;
                    } else {
                        break;
                    }
                }
                let kind = if is_float {
                    TokenKind::Float
                } else {
                    TokenKind::Int
                };
                tokens.push(Token::new(kind, start, at - start));
                tally.values += 1;
                bump_child(scopes);
            }
            _ => {
                // Tokens only ever start on ASCII, so `at` sits on a char
                // boundary; decode the full character for the report.
                let ch = input[at..]
                    .chars()
                    .next()
                    .expect("offset is inside the input");
                return Err(Error::InvalidCharacter { ch, at });
            }
        }
    }

    let open = scopes.open_count();
    if open > 0 {
        return Err(Error::UnterminatedContainer { open });
    }
    tokens.push(Token::new(TokenKind::Eof, bytes.len(), 0));
    Ok(tally)
}

fn bump_child(scopes: &mut ScopeStack) {
    // Top-level scalars have no scope to count into; the parse pass rejects
    // them as structural errors.
    if let Some(node) = scopes.current_mut() {
        node.child_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_ok(input: &str) -> (Vec<Token>, SizeTally) {
        let mut tokens = Vec::new();
        let mut scopes = ScopeStack::new();
        let tally = lex(input, &mut tokens, &mut scopes).unwrap();
        (tokens, tally)
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|token| token.kind).collect()
    }

    #[rstest::rstest]
    fn test_key_versus_string_value() {
        let (tokens, _) = lex_ok(r#"{"name": "abid"}"#);
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::ObjectBegin,
                TokenKind::Key,
                TokenKind::Str,
                TokenKind::ObjectEnd,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[1].text(r#"{"name": "abid"}"#), "name");
        assert_eq!(tokens[2].text(r#"{"name": "abid"}"#), "abid");
    }

    #[rstest::rstest]
    fn test_key_with_whitespace_before_colon() {
        let (tokens, _) = lex_ok("{\"k\" \n\t: 1}");
        assert_eq!(tokens[1].kind, TokenKind::Key);
    }

    #[rstest::rstest]
    fn test_commas_are_consumed_silently() {
        let (tokens, _) = lex_ok("[1,2,,3,]");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::ArrayBegin,
                TokenKind::Int,
                TokenKind::Int,
                TokenKind::Int,
                TokenKind::ArrayEnd,
                TokenKind::Eof,
            ]
        );
    }

    #[rstest::rstest]
    #[case("[1.5]", TokenKind::Float)]
    #[case("[-2.25]", TokenKind::Float)]
    #[case("[42]", TokenKind::Int)]
    #[case("[-7]", TokenKind::Int)]
    #[case("[+7]", TokenKind::Int)]
    fn test_number_kinds(#[case] input: &str, #[case] expected: TokenKind) {
        let (tokens, _) = lex_ok(input);
        assert_eq!(tokens[1].kind, expected);
    }

    #[rstest::rstest]
    fn test_second_dot_ends_the_number() {
        // "1.2.3" lexes as the float 1.2 followed by a bare '.', which is
        // not a valid token.
        let mut tokens = Vec::new();
        let mut scopes = ScopeStack::new();
        let err = lex("[1.2.3]", &mut tokens, &mut scopes).unwrap_err();
        assert_eq!(err, Error::InvalidCharacter { ch: '.', at: 4 });
    }

    #[rstest::rstest]
    fn test_child_counts_recorded_on_begin_tokens() {
        let (tokens, _) = lex_ok(r#"{"a":1, "b":[1,2,3], "c":{"d":"x"}}"#);
        // Root object: a, b, c.
        assert_eq!(tokens[0].children, 3);
        let array_begin = tokens
            .iter()
            .find(|token| token.kind == TokenKind::ArrayBegin)
            .unwrap();
        assert_eq!(array_begin.children, 3);
        let inner_object = tokens
            .iter()
            .skip(1)
            .find(|token| token.kind == TokenKind::ObjectBegin)
            .unwrap();
        assert_eq!(inner_object.children, 1);
    }

    #[rstest::rstest]
    fn test_tally_counts_every_arena_buffer() {
        let (_, tally) = lex_ok(r#"{"a":"xy", "b":[1,2]}"#);
        // Values: root object, "xy", array, 1, 2.
        assert_eq!(tally.values, 5);
        assert_eq!(tally.pair_slots, 2);
        assert_eq!(tally.child_slots, 2);
        // "a" + "xy" + "b", each with a NUL terminator byte.
        assert_eq!(tally.text_bytes, 7);
        assert_eq!(
            tally.required_bytes(),
            5 * std::mem::size_of::<ValueNode>() + 2 * std::mem::size_of::<PairSlot>() + 2 * 4 + 7
        );
    }

    #[rstest::rstest]
    fn test_unterminated_string() {
        let mut tokens = Vec::new();
        let mut scopes = ScopeStack::new();
        let err = lex(r#"{"x0": "abc"#, &mut tokens, &mut scopes).unwrap_err();
        assert_eq!(err, Error::UnterminatedString { at: 7 });
    }

    #[rstest::rstest]
    #[case("{", 1)]
    #[case("{\"a\":[", 2)]
    #[case("[[[", 3)]
    fn test_unterminated_container(#[case] input: &str, #[case] open: usize) {
        let mut tokens = Vec::new();
        let mut scopes = ScopeStack::new();
        let err = lex(input, &mut tokens, &mut scopes).unwrap_err();
        assert_eq!(err, Error::UnterminatedContainer { open });
    }

    #[rstest::rstest]
    #[case("{]")]
    #[case("[}")]
    #[case("}")]
    #[case("]")]
    fn test_unbalanced_close(#[case] input: &str) {
        let mut tokens = Vec::new();
        let mut scopes = ScopeStack::new();
        let err = lex(input, &mut tokens, &mut scopes).unwrap_err();
        assert!(matches!(err, Error::UnbalancedClose { .. }));
    }

    #[rstest::rstest]
    fn test_invalid_character() {
        let mut tokens = Vec::new();
        let mut scopes = ScopeStack::new();
        let err = lex("[true]", &mut tokens, &mut scopes).unwrap_err();
        assert_eq!(err, Error::InvalidCharacter { ch: 't', at: 1 });
    }

    #[rstest::rstest]
    fn test_invalid_character_reports_full_utf8_char() {
        let mut tokens = Vec::new();
        let mut scopes = ScopeStack::new();
        let err = lex("[é]", &mut tokens, &mut scopes).unwrap_err();
        assert_eq!(err, Error::InvalidCharacter { ch: 'é', at: 1 });
    }

    #[rstest::rstest]
    fn test_empty_input_is_just_eof() {
        let (tokens, tally) = lex_ok("");
        assert_eq!(kinds(&tokens), vec![TokenKind::Eof]);
        assert_eq!(tally, SizeTally::default());
    }
}
