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

//! Recursive-descent construction of heap-allocated S-expressions from a
//! token stream.

use crate::error::{LispError, ReadError};
use crate::heap::Heap;
use crate::value::Value;

use super::lexer::{Token, TokenKind};

pub(crate) struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: &'a [Token]) -> Parser<'a> {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Read every top-level form in the token stream.
    pub(crate) fn read_all(&mut self, heap: &mut Heap) -> Result<Vec<Value>, LispError> {
        let mut forms = Vec::new();
        while self.peek().is_some() {
            forms.push(self.read_form(heap)?);
        }
        Ok(forms)
    }

    fn read_form(&mut self, heap: &mut Heap) -> Result<Value, LispError> {
        let token = self.peek().ok_or(ReadError::UnterminatedList)?;
        match &token.kind {
            TokenKind::LParen => self.read_list(heap),
            TokenKind::RParen => Err(ReadError::UnexpectedCloseParen { at: token.at }.into()),
            TokenKind::Quote => self.read_quote(heap),
            TokenKind::Symbol(s) => {
                let s = s.clone();
                self.pos += 1;
                Ok(heap.alloc_symbol(&s, &mut [])?)
            }
            TokenKind::Str(s) => {
                let s = s.clone();
                self.pos += 1;
                Ok(heap.alloc_string(s, &mut [])?)
            }
            TokenKind::Int(n) => {
                let n = *n;
                self.pos += 1;
                Ok(Value::Int(n))
            }
            TokenKind::Float(x) => {
                let x = *x;
                self.pos += 1;
                Ok(Value::Float(x))
            }
        }
    }

    fn read_list(&mut self, heap: &mut Heap) -> Result<Value, LispError> {
        self.pos += 1; // consume '('
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(ReadError::UnterminatedList.into()),
                Some(t) if matches!(t.kind, TokenKind::RParen) => {
                    self.pos += 1;
                    break;
                }
                _ => items.push(self.read_form(heap)?),
            }
        }
        Ok(build_list(heap, items)?)
    }

    fn read_quote(&mut self, heap: &mut Heap) -> Result<Value, LispError> {
        self.pos += 1; // consume '\''
        let inner = self.read_form(heap)?;
        let mut quote_sym = heap.alloc_symbol("QUOTE", &mut [])?;
        let tail = heap.alloc_pair(inner, Value::Nil, &mut [&mut quote_sym])?;
        Ok(heap.alloc_pair(quote_sym, tail, &mut [])?)
    }
}

/// Cons `items` into a proper, nil-terminated list, right to left.
fn build_list(heap: &mut Heap, items: Vec<Value>) -> Result<Value, LispError> {
    let mut acc = Value::Nil;
    for item in items.into_iter().rev() {
        acc = heap.alloc_pair(item, acc, &mut [])?;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;

    fn read_one(src: &str, heap: &mut Heap) -> Value {
        let tokens = tokenize(src).unwrap();
        let mut forms = Parser::new(&tokens).read_all(heap).unwrap();
        assert_eq!(forms.len(), 1);
        forms.remove(0)
    }

    #[test]
    fn reads_a_proper_list() {
        let mut heap = Heap::new();
        let form = read_one("(+ 1 2)", &mut heap);
        assert_eq!(form.list_len(&heap), Some(3));
    }

    #[test]
    fn quote_sugar_wraps_in_quote_symbol() {
        let mut heap = Heap::new();
        let form = read_one("'(a b)", &mut heap);
        let items = form.to_vec(&heap).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_symbol(&heap), Some("QUOTE".to_owned()));
    }

    #[test]
    fn unmatched_close_paren_is_an_error() {
        let mut heap = Heap::new();
        let tokens = tokenize(")").unwrap();
        let err = Parser::new(&tokens).read_all(&mut heap).unwrap_err();
        assert_eq!(err, ReadError::UnexpectedCloseParen { at: 0 }.into());
    }

    #[test]
    fn unterminated_list_is_an_error() {
        let mut heap = Heap::new();
        let tokens = tokenize("(+ 1 2").unwrap();
        let err = Parser::new(&tokens).read_all(&mut heap).unwrap_err();
        assert_eq!(err, LispError::from(ReadError::UnterminatedList));
    }

    #[test]
    fn multiple_top_level_forms_are_preserved_in_order() {
        let mut heap = Heap::new();
        let tokens = tokenize("(define x 10) (+ x x)").unwrap();
        let forms = Parser::new(&tokens).read_all(&mut heap).unwrap();
        assert_eq!(forms.len(), 2);
    }
}
