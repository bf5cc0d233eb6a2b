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

//! The two-phase reader: [`lexer`] turns source text into a token vector,
//! [`parser`] turns that into heap-allocated S-expressions.

mod lexer;
mod parser;

use crate::error::LispError;
use crate::heap::Heap;
use crate::value::Value;

/// Read every top-level form out of `text`, allocating its S-expressions on
/// `heap`. A malformed top-level form fails the whole read — the reader has
/// no form-boundary recovery.
pub fn read(text: &str, heap: &mut Heap) -> Result<Vec<Value>, LispError> {
    let tokens = lexer::tokenize(text)?;
    parser::Parser::new(&tokens).read_all(heap)
}
