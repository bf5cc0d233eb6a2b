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

//! The tree-walking evaluator.
//!
//! ## Rooting
//!
//! Every function here that holds a block-bearing `Value` in a plain Rust
//! local *across* a call that can allocate (any recursive `eval`/`apply`, or
//! `heap.alloc_lambda`) must pin that local into the `roots` shadow stack for
//! the duration of that call — otherwise a collection triggered underneath
//! it can reclaim the block out from under the local, leaving it pointing at
//! whatever ended up at that index in the new arena. `roots` always carries
//! everything the *caller* still needs after the current call returns; each
//! function adds its own in-flight locals on top before recursing, the same
//! `extra_roots` convention `heap.rs`'s `alloc_*` methods use.
//!
//! Extracting a piece of a form via `car`/`cdr`/`at_index` never allocates,
//! so a chain of those needs no rooting; only the gap between one of those
//! reads and the next allocating call matters.

use crate::environment::Frame;
use crate::error::{EvalError, LispError};
use crate::heap::{BlockRef, Heap};
use crate::printer;
use crate::value::Value;

/// Evaluate `form` in `env`, possibly allocating into `heap`. `roots` must
/// list every `Value` the caller still needs once this call returns.
pub fn eval(
    form: Value,
    env: &Frame,
    heap: &mut Heap,
    roots: &mut [&mut Value],
) -> Result<Value, LispError> {
    match form {
        Value::Symbol(block) => {
            let name = heap.block_string(block).to_owned();
            Ok(env.get(&name))
        }
        Value::Pair(_) => eval_pair(form, env, heap, roots),
        // NIL, INT, FLOAT, STRING, LAMBDA, and PROC are all self-evaluating.
        other => Ok(other),
    }
}

fn eval_pair(
    form: Value,
    env: &Frame,
    heap: &mut Heap,
    roots: &mut [&mut Value],
) -> Result<Value, LispError> {
    let head = form.car(heap).expect("eval_pair is only called on pairs");
    if let Value::Symbol(block) = head {
        let name = heap.block_string(block).to_owned();
        match name.as_str() {
            "IF" => return eval_if(form, env, heap, roots),
            "QUOTE" => {
                let quoted = form
                    .at_index(heap, 1)
                    .ok_or_else(|| malformed("QUOTE", "expected one operand"))?;
                return Ok(quoted);
            }
            "DEFINE" => return eval_define(form, env, heap, roots),
            "SET!" => return eval_set(form, env, heap, roots),
            "LAMBDA" => return eval_lambda(form, env, heap, roots),
            _ => {}
        }
    }
    eval_application(form, env, heap, roots)
}

fn eval_if(
    form: Value,
    env: &Frame,
    heap: &mut Heap,
    roots: &mut [&mut Value],
) -> Result<Value, LispError> {
    let condition = form
        .at_index(heap, 1)
        .ok_or_else(|| malformed("IF", "missing condition"))?;
    let mut consequent = form
        .at_index(heap, 2)
        .ok_or_else(|| malformed("IF", "missing consequent"))?;
    let mut alternative = form.at_index(heap, 3);

    let truthy = {
        let mut inner_roots: Vec<&mut Value> = Vec::with_capacity(2 + roots.len());
        inner_roots.push(&mut consequent);
        if let Some(alt) = alternative.as_mut() {
            inner_roots.push(alt);
        }
        for r in roots.iter_mut() {
            inner_roots.push(&mut **r);
        }
        eval(condition, env, heap, &mut inner_roots)?.is_truthy()
    };

    if truthy {
        eval(consequent, env, heap, roots)
    } else {
        match alternative {
            Some(alt) => eval(alt, env, heap, roots),
            None => Ok(Value::Nil),
        }
    }
}

fn eval_define(
    form: Value,
    env: &Frame,
    heap: &mut Heap,
    roots: &mut [&mut Value],
) -> Result<Value, LispError> {
    let name_form = form
        .at_index(heap, 1)
        .ok_or_else(|| malformed("DEFINE", "missing name"))?;
    let name = name_form
        .as_symbol(heap)
        .ok_or_else(|| malformed("DEFINE", "name must be a symbol"))?;
    let value_form = form
        .at_index(heap, 2)
        .ok_or_else(|| malformed("DEFINE", "missing value"))?;
    let value = eval(value_form, env, heap, roots)?;
    env.define(&name, value);
    Ok(value)
}

fn eval_set(
    form: Value,
    env: &Frame,
    heap: &mut Heap,
    roots: &mut [&mut Value],
) -> Result<Value, LispError> {
    let name_form = form
        .at_index(heap, 1)
        .ok_or_else(|| malformed("SET!", "missing name"))?;
    let name = name_form
        .as_symbol(heap)
        .ok_or_else(|| malformed("SET!", "name must be a symbol"))?;
    if env.find_defining_frame(&name).is_none() {
        return Err(EvalError::UnboundVariable(name).into());
    }
    let value_form = form
        .at_index(heap, 2)
        .ok_or_else(|| malformed("SET!", "missing value"))?;
    let value = eval(value_form, env, heap, roots)?;
    env.set(&name, value);
    Ok(value)
}

fn eval_lambda(
    form: Value,
    env: &Frame,
    heap: &mut Heap,
    roots: &mut [&mut Value],
) -> Result<Value, LispError> {
    let params = form
        .at_index(heap, 1)
        .ok_or_else(|| malformed("LAMBDA", "missing parameter list"))?;
    let body = form
        .at_index(heap, 2)
        .ok_or_else(|| malformed("LAMBDA", "missing body"))?;
    Ok(heap.alloc_lambda(params, body, env.retain(), roots)?)
}

fn eval_application(
    form: Value,
    env: &Frame,
    heap: &mut Heap,
    roots: &mut [&mut Value],
) -> Result<Value, LispError> {
    let operator_form = form.car(heap).expect("eval_application is only called on pairs");
    // Extract both the operator form and the argument-list head before
    // evaluating anything: once we start calling `eval`, `form`'s own block
    // can move, so nothing after this point may read through `form` again.
    let mut cursor = form.cdr(heap).expect("eval_application is only called on pairs");

    let mut operator = {
        let mut inner_roots: Vec<&mut Value> = Vec::with_capacity(1 + roots.len());
        inner_roots.push(&mut cursor);
        for r in roots.iter_mut() {
            inner_roots.push(&mut **r);
        }
        eval(operator_form, env, heap, &mut inner_roots)?
    };

    let mut args: Vec<Value> = Vec::new();
    loop {
        match cursor {
            Value::Nil => break,
            Value::Pair(block) => {
                let arg_form = heap.pair_car(block);
                let mut next_cursor = heap.pair_cdr(block);
                let value = {
                    let mut inner_roots: Vec<&mut Value> =
                        Vec::with_capacity(2 + args.len() + roots.len());
                    inner_roots.push(&mut operator);
                    inner_roots.push(&mut next_cursor);
                    for a in args.iter_mut() {
                        inner_roots.push(a);
                    }
                    for r in roots.iter_mut() {
                        inner_roots.push(&mut **r);
                    }
                    eval(arg_form, env, heap, &mut inner_roots)?
                };
                args.push(value);
                cursor = next_cursor;
            }
            _ => {
                return Err(malformed("application", "improper argument list"));
            }
        }
    }

    apply(operator, &args, heap, roots)
}

/// Dispatch a procedure call: `PROC` invokes the function pointer directly;
/// `LAMBDA` binds formal parameters to `args` in a fresh frame and
/// evaluates the body there. Anything else is a runtime error. `roots` must
/// list every `Value` the caller still needs once this call returns —
/// `operator` and `args` need no separate rooting here, since a `LAMBDA`'s
/// fields are read out before any allocation and its arguments are copied
/// into the new frame (itself a GC root) before the body is evaluated.
pub fn apply(
    operator: Value,
    args: &[Value],
    heap: &mut Heap,
    roots: &mut [&mut Value],
) -> Result<Value, LispError> {
    match operator {
        Value::Proc(f) => Ok(f(args, heap)?),
        Value::Lambda(block) => apply_lambda(block, args, heap, roots),
        _ => Err(EvalError::NotAProcedure(printer::print_to_string(operator, heap)).into()),
    }
}

fn apply_lambda(
    block: BlockRef,
    args: &[Value],
    heap: &mut Heap,
    roots: &mut [&mut Value],
) -> Result<Value, LispError> {
    let (params, body, captured_env) = {
        let data = heap.lambda_data(block);
        (data.params, data.body, data.env.clone())
    };

    let param_forms = params
        .to_vec(heap)
        .ok_or_else(|| malformed("LAMBDA", "parameter list must be a proper list"))?;
    let param_names = param_forms
        .iter()
        .map(|p| p.as_symbol(heap).ok_or_else(|| malformed("LAMBDA", "parameters must be symbols")))
        .collect::<Result<Vec<_>, _>>()?;

    if param_names.len() != args.len() {
        return Err(EvalError::ArityMismatch {
            expected: param_names.len(),
            got: args.len(),
        }
        .into());
    }

    let frame = Frame::make(Some(captured_env), param_names.len().max(1), heap);
    for (name, value) in param_names.iter().zip(args.iter()) {
        frame.define(name, *value);
    }
    // `frame` is registered with the heap as a GC root as of `Frame::make`,
    // so `args`' values are protected from here on without needing to be
    // threaded through `roots` themselves.
    let result = eval(body, &frame, heap, roots);
    frame.release();
    result
}

fn malformed(form: &'static str, reason: &str) -> LispError {
    EvalError::MalformedSpecialForm {
        form,
        reason: reason.to_owned(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapConfig;
    use crate::reader::read;

    fn eval_src(src: &str) -> Result<Value, LispError> {
        let mut heap = Heap::new();
        let env = Frame::make(None, 16, &mut heap);
        crate::primitives::install_defaults(&env);
        let mut forms = read(src, &mut heap)?;
        let mut result = Value::Nil;
        for i in 0..forms.len() {
            let (_done, rest) = forms.split_at_mut(i);
            let (current, after) = rest.split_first_mut().expect("i is in bounds");
            let mut roots: Vec<&mut Value> = after.iter_mut().collect();
            result = eval(*current, &env, &mut heap, &mut roots)?;
        }
        Ok(result)
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval_src("(+ 1 2)").unwrap(), Value::Int(3));
        assert_eq!(eval_src("(* 3 4)").unwrap(), Value::Int(12));
    }

    #[test]
    fn define_and_reference() {
        assert_eq!(eval_src("(define x 10) (+ x x)").unwrap(), Value::Int(20));
    }

    #[test]
    fn lambda_application() {
        assert_eq!(eval_src("((lambda (x) (* x x)) 5)").unwrap(), Value::Int(25));
    }

    #[test]
    fn if_picks_branch_by_truthiness() {
        assert_eq!(eval_src("(if 0 1 2)").unwrap(), Value::Int(2));
        assert_eq!(eval_src("(if 1 1 2)").unwrap(), Value::Int(1));
    }

    #[test]
    fn closures_capture_their_defining_frame() {
        assert_eq!(
            eval_src("(define f (lambda (x) (lambda (y) (+ x y)))) ((f 3) 4)").unwrap(),
            Value::Int(7)
        );
    }

    #[test]
    fn quote_returns_its_operand_unevaluated() {
        let mut heap = Heap::new();
        let env = Frame::make(None, 16, &mut heap);
        let forms = read("'(a b c)", &mut heap).unwrap();
        let result = eval(forms[0], &env, &mut heap, &mut []).unwrap();
        assert_eq!(printer::print_to_string(result, &heap), "(A B C)");
    }

    #[test]
    fn environment_shadowing() {
        assert_eq!(
            eval_src("(define x 10) ((lambda (x) x) 20) x").unwrap(),
            Value::Int(10)
        );
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let err = eval_src("((lambda (x y) x) 1)").unwrap_err();
        assert_eq!(
            err,
            LispError::from(EvalError::ArityMismatch { expected: 2, got: 1 })
        );
    }

    #[test]
    fn applying_a_non_procedure_is_an_error() {
        assert!(eval_src("(1 2 3)").is_err());
    }

    #[test]
    fn set_on_unbound_variable_is_an_error() {
        assert!(eval_src("(set! nope 1)").is_err());
    }

    #[test]
    fn sibling_operand_allocations_do_not_corrupt_the_first_operand() {
        // Each operand below allocates a closure; with a one-block arena the
        // second operand's allocation forces a collection while the first
        // operand's (unbound, not-yet-applied) lambda is still only reachable
        // through `eval_application`'s local `operator`/`args`. If those
        // aren't rooted, the collection drops the first lambda and `apply`
        // either panics or reads through a stale `BlockRef`.
        let mut heap = Heap::with_config(HeapConfig {
            initial_capacity: 1,
            growth_factor: 2,
            max_capacity: 1 << 16,
        });
        let env = Frame::make(None, 16, &mut heap);
        crate::primitives::install_defaults(&env);
        let forms = read(
            "((lambda (a b) a) (lambda (x) x) (lambda (y) y))",
            &mut heap,
        )
        .unwrap();
        let result = eval(forms[0], &env, &mut heap, &mut []).unwrap();
        assert!(matches!(result, Value::Lambda(_)));
    }
}
