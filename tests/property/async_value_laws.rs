// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for AsyncValue Composition
//!
//! Functor laws for `map`, order preservation for `join_vec`, and the rule
//! that a failed input fails the whole join without a partial result.

use metal_cluster::frp::{join_all, join_vec, AsyncValue};
use metal_cluster::ProvisionError;
use proptest::prelude::*;

fn resolve<T: Send + Sync + Clone + 'static>(value: &AsyncValue<T>) -> Result<T, ProvisionError> {
    tokio_test::block_on(value.get()).map(|v| (*v).clone())
}

proptest! {
    /// Property: map(id) ≡ id
    #[test]
    fn prop_map_identity(x in any::<i64>()) {
        let value = AsyncValue::constant(x);
        prop_assert_eq!(resolve(&value.map(|v| *v)).unwrap(), x);
    }

    /// Property: map(f).map(g) ≡ map(g ∘ f)
    #[test]
    fn prop_map_composition(x in -1_000_000i64..1_000_000) {
        let f = |v: &i64| v * 3;
        let g = |v: &i64| v - 7;

        let chained = AsyncValue::constant(x).map(f).map(g);
        let composed = AsyncValue::constant(x).map(move |v| g(&f(v)));

        prop_assert_eq!(resolve(&chained).unwrap(), resolve(&composed).unwrap());
    }

    /// Property: join_vec keeps input order
    #[test]
    fn prop_join_vec_preserves_order(values in prop::collection::vec(any::<u32>(), 0..32)) {
        let joined = join_vec(values.iter().copied().map(AsyncValue::constant).collect());
        let resolved: Vec<u32> = tokio_test::block_on(joined.get())
            .unwrap()
            .iter()
            .map(|v| **v)
            .collect();

        prop_assert_eq!(resolved, values);
    }

    /// Property: any failing input fails the join with that input's error
    #[test]
    fn prop_join_fails_with_failed_input(position in 0usize..3, name in "[a-z]{1,12}") {
        let mut inputs = vec![
            AsyncValue::constant(1u32),
            AsyncValue::constant(2u32),
            AsyncValue::constant(3u32),
        ];
        inputs[position] = AsyncValue::failed(ProvisionError::provider(name.clone(), "rejected"));
        let c = inputs.pop().unwrap();
        let b = inputs.pop().unwrap();
        let a = inputs.pop().unwrap();

        let err = tokio_test::block_on(join_all((a, b, c)).get()).unwrap_err();
        prop_assert_eq!(err.failing_resource(), Some(name.as_str()));
    }
}
