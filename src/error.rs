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

//! Error types for every fallible phase of the interpreter: reading,
//! evaluating, and heap allocation. Each phase gets its own `thiserror` enum;
//! [`LispError`] unifies them at the crate boundary.

use thiserror::Error;

/// Errors produced while lexing or parsing source text into S-expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// A `)` token appeared with no matching `(`.
    #[error("read error: unexpected `)` at byte offset {at}")]
    UnexpectedCloseParen { at: usize },

    /// Input ended while a `(...)` form was still open.
    #[error("read error: unterminated list")]
    UnterminatedList,

    /// A `"` was opened but never closed (or a newline appeared inside it).
    #[error("read error: unterminated string literal starting at byte offset {at}")]
    UnterminatedString { at: usize },

    /// A character sequence matched none of the lexer's token classes.
    #[error("read error: unknown token {text:?} at byte offset {at}")]
    UnknownToken { at: usize, text: String },
}

/// Errors produced while evaluating a form.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The operator position of an application did not evaluate to a
    /// procedure.
    #[error("eval error: not a procedure: {0}")]
    NotAProcedure(String),

    /// A symbol was looked up in operator position (or by `SET!`) and no
    /// frame in the chain binds it.
    #[error("eval error: unbound variable: {0}")]
    UnboundVariable(String),

    /// A lambda was applied to the wrong number of arguments.
    #[error("eval error: arity mismatch: expected {expected}, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    /// A special form was used with the wrong shape, e.g. `(if 1 2)`.
    #[error("eval error: malformed `{form}`: {reason}")]
    MalformedSpecialForm {
        form: &'static str,
        reason: String,
    },
}

/// Errors produced by the heap when it cannot satisfy an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
    /// A collection and subsequent growth still left no room for the
    /// request; the configured `max_capacity` ceiling was reached.
    #[error(
        "heap exhausted: requested {requested} bytes but capacity is capped at {capacity}"
    )]
    Exhausted { requested: usize, capacity: usize },
}

/// The union of every error this crate can produce, for callers that want a
/// single `Result` type across read/eval/heap boundaries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LispError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Heap(#[from] HeapError),
}
