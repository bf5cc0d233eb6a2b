//! Property tests for the invariants that are naturally generative: symbol
//! normalization, reader round-tripping, and GC preservation (forcing a
//! collection on every allocation must not change a program's result).

use proptest::prelude::*;

use oxilisp::{env_init_default, print_to_string, read, run, symbol, Heap, HeapConfig};

fn small_program() -> impl Strategy<Value = String> {
    prop_oneof![
        (0i64..50, 0i64..50).prop_map(|(a, b)| format!("(+ {} {})", a, b)),
        (0i64..50, 0i64..50).prop_map(|(a, b)| format!("(* {} {})", a, b)),
        (0i64..20).prop_map(|n| format!("(define x {}) (+ x x)", n)),
        (0i64..20, 0i64..20)
            .prop_map(|(a, b)| format!("((lambda (x y) (+ x y)) {} {})", a, b)),
        // Two sibling operands that each allocate a closure, so a collection
        // forced mid-application (by an aggressive `HeapConfig`) has to deal
        // with an already-evaluated-but-not-yet-applied operand still only
        // reachable from the evaluator's own locals.
        (0i64..20, 0i64..20).prop_map(|(a, b)| {
            format!(
                "((lambda (p q) p) (lambda (x) (+ x {})) (lambda (y) (+ y {})))",
                a, b
            )
        }),
    ]
}

fn aggressively_collecting_heap() -> Heap {
    Heap::with_config(HeapConfig {
        initial_capacity: 1,
        growth_factor: 2,
        max_capacity: 1 << 20,
    })
}

proptest! {
    #[test]
    fn symbol_normalization_is_case_insensitive(s in "[a-zA-Z][a-zA-Z0-9]{0,8}") {
        let mut heap = Heap::new();
        let lower = symbol(&s.to_lowercase(), &mut heap).unwrap();
        let upper = symbol(&s.to_uppercase(), &mut heap).unwrap();
        prop_assert_eq!(print_to_string(lower, &heap), print_to_string(upper, &heap));
    }

    #[test]
    fn reader_round_trip_on_int_lists(values in proptest::collection::vec(0i64..1000, 0..6)) {
        let src = format!(
            "({})",
            values.iter().map(i64::to_string).collect::<Vec<_>>().join(" ")
        );
        let mut heap = Heap::new();
        let forms = read(&src, &mut heap).unwrap();
        let printed = print_to_string(forms[0], &heap);
        let reread = read(&printed, &mut heap).unwrap();
        prop_assert_eq!(print_to_string(forms[0], &heap), print_to_string(reread[0], &heap));
    }

    #[test]
    fn forcing_collection_on_every_allocation_does_not_change_results(src in small_program()) {
        let baseline = {
            let mut heap = Heap::new();
            let env = env_init_default(&mut heap);
            let results = run(&src, &env, &mut heap);
            results.into_iter().map(|v| print_to_string(v, &heap)).collect::<Vec<_>>()
        };
        let under_pressure = {
            let mut heap = aggressively_collecting_heap();
            let env = env_init_default(&mut heap);
            let results = run(&src, &env, &mut heap);
            results.into_iter().map(|v| print_to_string(v, &heap)).collect::<Vec<_>>()
        };
        prop_assert_eq!(baseline, under_pressure);
    }
}
