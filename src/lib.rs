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

//! A small Scheme-like Lisp: a reader, a tree-walking evaluator, and a
//! Cheney-style copying garbage collector sitting underneath both.
//!
//! This crate is an embeddable component, not an application: there is no
//! REPL, no CLI, and no file I/O beyond what the embedder hands it as a
//! string. A minimal end-to-end use looks like:
//!
//! ```
//! let mut heap = oxilisp::Heap::new();
//! let env = oxilisp::env_init_default(&mut heap);
//! let results = oxilisp::run("(+ 1 2)", &env, &mut heap);
//! assert_eq!(results, vec![oxilisp::Value::Int(3)]);
//! ```
//!
//! [`run`] is the "report and continue" convenience wrapper described in
//! the crate's error-handling design: a form that fails to read or
//! evaluate logs its error and contributes `NIL` rather than aborting the
//! rest of the program. Embedders that want read/eval errors to propagate
//! should call [`reader::read`] and [`eval::eval`] directly instead.

pub mod environment;
pub mod error;
pub mod eval;
pub mod heap;
mod primitives;
pub mod printer;
pub mod reader;
pub mod value;

use log::warn;

pub use environment::Frame;
pub use error::{EvalError, HeapError, LispError, ReadError};
pub use eval::eval;
pub use heap::{Heap, HeapConfig};
pub use printer::{print, print_to_string};
pub use reader::read;
pub use value::{ProcFn, Value};

/// The empty list.
pub fn nil() -> Value {
    Value::Nil
}

/// A signed machine integer.
pub fn int(n: i64) -> Value {
    Value::Int(n)
}

/// A machine float.
pub fn float(x: f64) -> Value {
    Value::Float(x)
}

/// Allocate a new cons cell.
pub fn cons(car: Value, cdr: Value, heap: &mut Heap) -> Result<Value, LispError> {
    Ok(heap.alloc_pair(car, cdr, &mut [])?)
}

/// Allocate a new string.
pub fn string(s: impl Into<String>, heap: &mut Heap) -> Result<Value, LispError> {
    Ok(heap.alloc_string(s.into(), &mut [])?)
}

/// Intern a symbol, normalizing its name to upper case.
pub fn symbol(s: &str, heap: &mut Heap) -> Result<Value, LispError> {
    Ok(heap.alloc_symbol(s, &mut [])?)
}

/// Wrap a built-in function pointer as a value.
pub fn proc(f: ProcFn) -> Value {
    Value::Proc(f)
}

/// Build a fresh root frame populated with the default built-in procedure
/// table (`CAR`, `CDR`, `+`, `*`). Additional built-ins can be installed
/// afterward with `env.define(name, Value::Proc(f))`.
pub fn env_init_default(heap: &mut Heap) -> Frame {
    let frame = Frame::make(None, 16, heap);
    primitives::install_defaults(&frame);
    frame
}

/// Read and evaluate every top-level form in `text`, in order, under `env`.
/// A form that fails to read or evaluate is logged via the `log` facade and
/// contributes `NIL` to the result instead of aborting the remaining forms
/// — a read failure aborts the whole text (the reader has no per-form
/// recovery), contributing no results at all.
pub fn run(text: &str, env: &Frame, heap: &mut Heap) -> Vec<Value> {
    let mut forms = match reader::read(text, heap) {
        Ok(forms) => forms,
        Err(e) => {
            warn!("read error: {}", e);
            return Vec::new();
        }
    };

    let mut results = Vec::with_capacity(forms.len());
    for i in 0..forms.len() {
        // Evaluating `forms[i]` can allocate and trigger a collection; every
        // form still waiting its turn has to be rooted or its block could be
        // reclaimed before we get to it.
        let (_done, rest) = forms.split_at_mut(i);
        let (current, pending) = rest.split_first_mut().expect("i is in bounds");
        let mut roots: Vec<&mut Value> = pending.iter_mut().collect();
        let value = match eval::eval(*current, env, heap, &mut roots) {
            Ok(value) => value,
            Err(e) => {
                warn!("eval error: {}", e);
                Value::Nil
            }
        };
        results.push(value);
    }
    results
}
