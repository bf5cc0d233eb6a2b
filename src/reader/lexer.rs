// Copyright 2014 Nick Fitzgerald
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Lexical analysis: source text to a flat token vector.
//!
//! Token recognition priority, in order: paren/quote punctuation, a
//! double-quoted string, a float (one or more digits containing at least
//! one `.`), an int (one or more digits), a symbol (starts with a letter or
//! one of `?!#$+-.*^%_/`, continues with alphanumerics or the same
//! specials). `;` begins a line comment.

use crate::error::ReadError;

const SPECIALS: &str = "?!#$+-.*^%_/";

fn is_special(c: char) -> bool {
    SPECIALS.contains(c)
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    LParen,
    RParen,
    Quote,
    Symbol(String),
    Str(String),
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) at: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ReadError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = skip_ignored(bytes, 0);

    while i < bytes.len() {
        let start = i;
        let c = bytes[i] as char;
        let (kind, next) = match c {
            '(' => (TokenKind::LParen, i + 1),
            ')' => (TokenKind::RParen, i + 1),
            '\'' => (TokenKind::Quote, i + 1),
            '"' => {
                let (s, next) = match_string(bytes, i)?;
                (TokenKind::Str(s), next)
            }
            _ => match match_number_or_symbol(bytes, i) {
                Some(pair) => pair,
                None => {
                    return Err(ReadError::UnknownToken {
                        at: start,
                        text: c.to_string(),
                    })
                }
            },
        };
        tokens.push(Token { kind, at: start });
        i = skip_ignored(bytes, next);
    }

    Ok(tokens)
}

fn skip_ignored(bytes: &[u8], mut i: usize) -> usize {
    loop {
        while i < bytes.len() && (bytes[i] as char).is_whitespace() {
            i += 1;
        }
        if i < bytes.len() && bytes[i] as char == ';' {
            while i < bytes.len() && bytes[i] as char != '\n' {
                i += 1;
            }
        } else {
            break;
        }
    }
    i
}

fn match_string(bytes: &[u8], start: usize) -> Result<(String, usize), ReadError> {
    let mut j = start + 1;
    loop {
        if j >= bytes.len() || bytes[j] as char == '\n' {
            return Err(ReadError::UnterminatedString { at: start });
        }
        if bytes[j] as char == '"' {
            break;
        }
        j += 1;
    }
    let text = std::str::from_utf8(&bytes[start + 1..j])
        .unwrap_or_default()
        .to_owned();
    Ok((text, j + 1))
}

fn match_number_or_symbol(bytes: &[u8], start: usize) -> Option<(TokenKind, usize)> {
    let c = bytes[start] as char;
    if c.is_ascii_digit() {
        let mut j = start;
        let mut saw_dot = false;
        while j < bytes.len() {
            let cj = bytes[j] as char;
            if cj.is_ascii_digit() {
                j += 1;
            } else if cj == '.' {
                saw_dot = true;
                j += 1;
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&bytes[start..j]).ok()?;
        if saw_dot {
            text.parse::<f64>().ok().map(|f| (TokenKind::Float(f), j))
        } else {
            text.parse::<i64>().ok().map(|n| (TokenKind::Int(n), j))
        }
    } else if c.is_alphabetic() || is_special(c) {
        let mut j = start + 1;
        while j < bytes.len() {
            let cj = bytes[j] as char;
            if cj.is_alphanumeric() || is_special(cj) {
                j += 1;
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&bytes[start..j]).ok()?.to_owned();
        Some((TokenKind::Symbol(text), j))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_and_atoms() {
        let tokens = tokenize("(+ 1 2.5 'foo \"hi\")").unwrap();
        let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LParen,
                TokenKind::Symbol("+".to_owned()),
                TokenKind::Int(1),
                TokenKind::Float(2.5),
                TokenKind::Quote,
                TokenKind::Symbol("foo".to_owned()),
                TokenKind::Str("hi".to_owned()),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = tokenize("1 ; this is ignored\n2").unwrap();
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert_eq!(
            tokenize("\"abc"),
            Err(ReadError::UnterminatedString { at: 0 })
        );
    }

    #[test]
    fn string_cannot_span_a_newline() {
        assert_eq!(
            tokenize("\"abc\ndef\""),
            Err(ReadError::UnterminatedString { at: 0 })
        );
    }

    #[test]
    fn symbols_allow_special_characters() {
        let tokens = tokenize("set!").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Symbol("set!".to_owned()));
    }
}
