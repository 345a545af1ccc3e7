//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check key derivation and backend behavior over
//! generated inputs.

use proptest::prelude::*;
use std::time::Duration;

use crate::cache::{derive_key, CacheBackend, CallArgs, MemoryBackend, KEY_HASH_WIDTH};

// == Test Configuration ==
const TEST_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
/// Generates operation names
fn operation_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,24}"
}

/// Generates argument names
fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}"
}

/// Generates JSON-friendly scalar argument values
#[derive(Debug, Clone)]
enum Scalar {
    Int(i64),
    Text(String),
    Flag(bool),
}

fn scalar_strategy() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        any::<i64>().prop_map(Scalar::Int),
        "[a-zA-Z0-9 -]{0,32}".prop_map(Scalar::Text),
        any::<bool>().prop_map(Scalar::Flag),
    ]
}

fn push_arg(call: CallArgs, value: &Scalar) -> CallArgs {
    let pushed = match value {
        Scalar::Int(v) => call.arg(v),
        Scalar::Text(v) => call.arg(v),
        Scalar::Flag(v) => call.arg(v),
    };
    pushed.unwrap()
}

fn push_kwarg(call: CallArgs, name: &str, value: &Scalar) -> CallArgs {
    let pushed = match value {
        Scalar::Int(v) => call.kwarg(name, v),
        Scalar::Text(v) => call.kwarg(name, v),
        Scalar::Flag(v) => call.kwarg(name, v),
    };
    pushed.unwrap()
}

fn build(args: &[Scalar], kwargs: &[(String, Scalar)]) -> CallArgs {
    let call = args.iter().fold(CallArgs::new(), push_arg);
    kwargs
        .iter()
        .fold(call, |call, (name, value)| push_kwarg(call, name, value))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Supplying keyword arguments in any order yields the same key.
    #[test]
    fn prop_kwarg_order_independent(
        op in operation_strategy(),
        args in prop::collection::vec(scalar_strategy(), 0..4),
        kwargs in prop::collection::btree_map(name_strategy(), scalar_strategy(), 0..6)
    ) {
        let forward: Vec<(String, Scalar)> = kwargs.clone().into_iter().collect();
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = build(&args, &forward);
        let b = build(&args, &reversed);

        prop_assert_eq!(derive_key(&op, &a), derive_key(&op, &b));
    }

    // Keys always have the `{operation}:{16 hex chars}` shape.
    #[test]
    fn prop_key_shape(
        op in operation_strategy(),
        args in prop::collection::vec(scalar_strategy(), 0..4)
    ) {
        let key = derive_key(&op, &build(&args, &[]));
        let (prefix, hash) = key.split_once(':').unwrap();

        prop_assert_eq!(prefix, op.as_str());
        prop_assert_eq!(hash.len(), KEY_HASH_WIDTH);
        prop_assert!(hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    // Distinct integer arguments give distinct keys.
    #[test]
    fn prop_distinct_args_distinct_keys(
        op in operation_strategy(),
        x in any::<i64>(),
        y in any::<i64>()
    ) {
        prop_assume!(x != y);
        let kx = derive_key(&op, &CallArgs::new().arg(&x).unwrap());
        let ky = derive_key(&op, &CallArgs::new().arg(&y).unwrap());
        prop_assert_ne!(kx, ky);
    }

    // A scalar, the same scalar wrapped in a sequence and an absent value
    // all derive different keys.
    #[test]
    fn prop_value_shape_separates_keys(
        op in operation_strategy(),
        x in any::<i64>(),
        xs in prop::collection::vec(any::<i64>(), 0..4)
    ) {
        let key_of = |call: CallArgs| derive_key(&op, &call);

        let scalar = key_of(CallArgs::from_serialize(&x).unwrap());
        let wrapped = key_of(CallArgs::from_serialize(&[x]).unwrap());
        let absent = key_of(CallArgs::from_serialize(&None::<Vec<i64>>).unwrap());
        let present = key_of(CallArgs::from_serialize(&Some(xs)).unwrap());

        prop_assert_ne!(&scalar, &wrapped);
        prop_assert_ne!(&absent, &present);
        prop_assert_ne!(&absent, &scalar);
    }

    // A value written to the in-process backend reads back unchanged.
    #[test]
    fn prop_backend_roundtrip(key in "[a-z:0-9]{1,40}", value in prop::collection::vec(any::<u8>(), 0..256)) {
        let backend = MemoryBackend::new();

        let read = tokio_test::block_on(async {
            backend.setex(&key, TEST_TTL, value.clone()).await.unwrap();
            backend.get(&key).await.unwrap()
        });

        prop_assert_eq!(read, Some(value));
    }

    // The in-process backend never holds more entries than its capacity.
    #[test]
    fn prop_backend_capacity(keys in prop::collection::vec("[a-z]{1,8}", 1..100)) {
        let max_entries = 16;
        let backend = MemoryBackend::with_capacity(max_entries);

        tokio_test::block_on(async {
            for key in &keys {
                backend.setex(key, TEST_TTL, Vec::new()).await.unwrap();
                assert!(backend.len().await <= max_entries);
            }
        });
    }
}
