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

//! The demonstration built-in procedure set: `CAR`, `CDR`, `+`, `*`. This is
//! deliberately the entire default environment's procedure table — the
//! reference this crate is grounded on hard-codes exactly these four in its
//! own default-environment initializer, and the surrounding specification
//! keeps that set rather than growing it, leaving `Frame::define` as the
//! only way an embedder adds more.

use crate::environment::Frame;
use crate::error::EvalError;
use crate::heap::Heap;
use crate::printer;
use crate::value::Value;

fn arity_error(expected: usize, got: usize) -> EvalError {
    EvalError::ArityMismatch { expected, got }
}

fn as_int(v: Value, heap: &Heap) -> Result<i64, EvalError> {
    match v {
        Value::Int(n) => Ok(n),
        other => Err(EvalError::MalformedSpecialForm {
            form: "built-in",
            reason: format!("expected an integer, got {}", printer::print_to_string(other, heap)),
        }),
    }
}

fn car(args: &[Value], heap: &Heap) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(arity_error(1, args.len()));
    }
    args[0].car(heap).ok_or_else(|| EvalError::MalformedSpecialForm {
        form: "CAR",
        reason: format!("expected a pair, got {}", printer::print_to_string(args[0], heap)),
    })
}

fn cdr(args: &[Value], heap: &Heap) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(arity_error(1, args.len()));
    }
    args[0].cdr(heap).ok_or_else(|| EvalError::MalformedSpecialForm {
        form: "CDR",
        reason: format!("expected a pair, got {}", printer::print_to_string(args[0], heap)),
    })
}

fn add(args: &[Value], heap: &Heap) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(arity_error(2, args.len()));
    }
    Ok(Value::Int(as_int(args[0], heap)? + as_int(args[1], heap)?))
}

fn multiply(args: &[Value], heap: &Heap) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(arity_error(2, args.len()));
    }
    Ok(Value::Int(as_int(args[0], heap)? * as_int(args[1], heap)?))
}

/// Populate `frame` with the default built-in procedure table. Called once
/// by [`crate::env_init_default`] on a fresh root frame.
pub fn install_defaults(frame: &Frame) {
    frame.define("CAR", Value::Proc(car));
    frame.define("CDR", Value::Proc(cdr));
    frame.define("+", Value::Proc(add));
    frame.define("*", Value::Proc(multiply));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_two_ints() {
        let heap = Heap::new();
        assert_eq!(add(&[Value::Int(1), Value::Int(2)], &heap), Ok(Value::Int(3)));
    }

    #[test]
    fn multiply_two_ints() {
        let heap = Heap::new();
        assert_eq!(multiply(&[Value::Int(2), Value::Int(3)], &heap), Ok(Value::Int(6)));
    }

    #[test]
    fn add_wrong_arity_is_an_error() {
        let heap = Heap::new();
        assert_eq!(add(&[Value::Int(1)], &heap), Err(arity_error(2, 1)));
    }

    #[test]
    fn car_of_non_pair_is_an_error() {
        let heap = Heap::new();
        assert!(car(&[Value::Int(1)], &heap).is_err());
    }
}
