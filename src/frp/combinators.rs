// Copyright (c) 2025 - Cowboy AI, Inc.
//! AsyncValue Combinators
//!
//! `map` (on [`AsyncValue`] itself) and `join_all` are the only composition
//! primitives the provisioning graph needs; every derived value is a chain of
//! the two.
//!
//! # Available Combinators
//!
//! - [`join_all`] - resolve a tuple of values of different types
//! - [`join_vec`] - resolve a homogeneous list of values
//!
//! Both fail with the first input failure and never deliver a partial result.
//!
//! # Examples
//!
//! ```rust
//! use metal_cluster::frp::{join_all, AsyncValue};
//!
//! # tokio_test::block_on(async {
//! let cidr = AsyncValue::constant("10.0.0.0/28".to_string());
//! let quantity = AsyncValue::constant(16u32);
//!
//! let summary = join_all((cidr, quantity)).map(|(cidr, quantity)| {
//!     format!("{} holds {}", cidr, quantity)
//! });
//! assert_eq!(*summary.get().await.unwrap(), "10.0.0.0/28 holds 16");
//! # });
//! ```

use std::future::IntoFuture;
use std::sync::Arc;

use super::async_value::AsyncValue;

/// Tuples of [`AsyncValue`]s that can be resolved together
///
/// Implemented for tuples of 2 to 16 values. The joined value keeps each input
/// at its position in the tuple.
pub trait JoinAll {
    /// Tuple of the resolved inputs
    type Output: Send + Sync + 'static;

    /// Resolve once every input has resolved
    fn join_all(self) -> AsyncValue<Self::Output>;
}

macro_rules! impl_join_all {
    ($($value:ident : $ty:ident),+) => {
        impl<$($ty),+> JoinAll for ($(AsyncValue<$ty>,)+)
        where
            $($ty: Send + Sync + 'static,)+
        {
            type Output = ($(Arc<$ty>,)+);

            fn join_all(self) -> AsyncValue<Self::Output> {
                let ($($value,)+) = self;
                AsyncValue::from_future(async move {
                    futures::try_join!($($value.into_future()),+)
                })
            }
        }
    };
}

impl_join_all!(a: A, b: B);
impl_join_all!(a: A, b: B, c: C);
impl_join_all!(a: A, b: B, c: C, d: D);
impl_join_all!(a: A, b: B, c: C, d: D, e: E);
impl_join_all!(a: A, b: B, c: C, d: D, e: E, f: F);
impl_join_all!(a: A, b: B, c: C, d: D, e: E, f: F, g: G);
impl_join_all!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H);
impl_join_all!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H, i: I);
impl_join_all!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H, i: I, j: J);
impl_join_all!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H, i: I, j: J, k: K);
impl_join_all!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H, i: I, j: J, k: K, l: L);
impl_join_all!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H, i: I, j: J, k: K, l: L, m: M);
impl_join_all!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H, i: I, j: J, k: K, l: L, m: M, n: N);
impl_join_all!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H, i: I, j: J, k: K, l: L, m: M, n: N, o: O);
impl_join_all!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H, i: I, j: J, k: K, l: L, m: M, n: N, o: O, p: P);

/// Resolve a tuple of values together
///
/// Convenience wrapper around [`JoinAll::join_all`].
pub fn join_all<J: JoinAll>(values: J) -> AsyncValue<J::Output> {
    values.join_all()
}

/// Resolve a list of values of the same type, preserving order
pub fn join_vec<T>(values: Vec<AsyncValue<T>>) -> AsyncValue<Vec<Arc<T>>>
where
    T: Send + Sync + 'static,
{
    AsyncValue::from_future(async move {
        futures::future::try_join_all(values.into_iter().map(IntoFuture::into_future)).await
    })
}
