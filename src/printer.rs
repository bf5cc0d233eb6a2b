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

//! Pretty-printing of [`Value`]s to a text sink.
//!
//! This lives apart from `Value`'s own `Display` impl because printing
//! anything block-bearing needs the [`Heap`] to follow pair, string, and
//! symbol references — the `Display` impl in `crate::value` only covers
//! the immediate kinds.

use std::fmt::{self, Write};

use crate::heap::Heap;
use crate::value::Value;

/// Print `value` to `sink`. Proper lists print as `(a b c)`, improper
/// (dotted) lists as `(a b . c)`. `NIL` prints as `NIL`; strings print
/// quoted; symbols print unquoted, already upper case. `LAMBDA` and `PROC`
/// print as opaque handles.
pub fn print<W: Write>(value: Value, heap: &Heap, sink: &mut W) -> fmt::Result {
    match value {
        Value::Nil => write!(sink, "NIL"),
        Value::Int(n) => write!(sink, "{}", n),
        Value::Float(x) => write!(sink, "{}", x),
        Value::Str(block) => write!(sink, "\"{}\"", heap.block_string(block)),
        Value::Symbol(block) => write!(sink, "{}", heap.block_string(block)),
        Value::Proc(p) => write!(sink, "#<procedure {:p}>", p as *const ()),
        Value::Lambda(block) => write!(sink, "#<lambda {}>", heap.lambda_data(block).id),
        Value::Pair(_) => print_list(value, heap, sink),
    }
}

fn print_list<W: Write>(mut cursor: Value, heap: &Heap, sink: &mut W) -> fmt::Result {
    write!(sink, "(")?;
    let mut first = true;
    loop {
        match cursor {
            Value::Pair(block) => {
                if !first {
                    write!(sink, " ")?;
                }
                first = false;
                print(heap.pair_car(block), heap, sink)?;
                cursor = heap.pair_cdr(block);
            }
            Value::Nil => break,
            tail => {
                write!(sink, " . ")?;
                print(tail, heap, sink)?;
                break;
            }
        }
    }
    write!(sink, ")")
}

/// Convenience wrapper returning the printed form as an owned `String`.
pub fn print_to_string(value: Value, heap: &Heap) -> String {
    let mut out = String::new();
    // A `String`'s `Write` impl never fails.
    print(value, heap, &mut out).expect("formatting a String cannot fail");
    out
}
