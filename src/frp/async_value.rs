// Copyright (c) 2025 - Cowboy AI, Inc.
//! AsyncValue - Write-Once Values Resolved by Remote Side Effects
//!
//! An `AsyncValue<T>` stands for a value that only exists once some remote
//! operation has finished: the CIDR of a reserved block, the id of a device,
//! a generated key. It resolves at most once, to either the value or a
//! [`ProvisionError`], and every reader observes that same outcome.
//!
//! # Mathematical Model
//!
//! ```text
//! AsyncValue<T> ≅ Future<Result<Arc<T>, ProvisionError>>   (memoized)
//! ```
//!
//! # Laws
//!
//! ```text
//! v.map(|x| x) ≡ v
//! v.map(f).map(g) ≡ v.map(|x| g(f(x)))
//! failed(e).map(f) ≡ failed(e)          (f never runs)
//! ```
//!
//! # Sharing
//!
//! Resolved values are held behind `Arc` and handed out by reference: a
//! reserved block read by fifty consumers is stored once. The underlying future
//! is memoized with [`futures::future::Shared`], so a derivation registered
//! with [`AsyncValue::map`] runs exactly once no matter how many consumers read
//! the result.
//!
//! # Example
//!
//! ```rust
//! use metal_cluster::frp::AsyncValue;
//!
//! # tokio_test::block_on(async {
//! let quantity = AsyncValue::constant(16u32);
//! let tink_offset = quantity.map(|q| q - 3);
//!
//! assert_eq!(*tink_offset.get().await.unwrap(), 13);
//! # });
//! ```

use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::errors::{ProvisionError, ProvisionResult};

type SharedOutput<T> = Shared<BoxFuture<'static, ProvisionResult<Arc<T>>>>;

/// A write-once value available after an external operation completes
pub struct AsyncValue<T> {
    inner: SharedOutput<T>,
}

impl<T> Clone for AsyncValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for AsyncValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner.peek() {
            None => "pending",
            Some(Ok(_)) => "resolved",
            Some(Err(_)) => "failed",
        };
        write!(f, "AsyncValue<{}>({})", std::any::type_name::<T>(), state)
    }
}

impl<T: Send + Sync + 'static> AsyncValue<T> {
    /// A value that is already known
    pub fn constant(value: T) -> Self {
        Self::from_shared(futures::future::ready(Ok(Arc::new(value))))
    }

    /// A value whose producer has already failed
    pub fn failed(err: ProvisionError) -> Self {
        Self::from_shared(futures::future::ready(Err(err)))
    }

    /// Wrap the future that eventually produces the value
    ///
    /// The future is not polled until something awaits the value (or a
    /// derivation of it).
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = ProvisionResult<T>> + Send + 'static,
    {
        Self::from_shared(future.map(|result| result.map(Arc::new)))
    }

    fn from_shared<F>(future: F) -> Self
    where
        F: Future<Output = ProvisionResult<Arc<T>>> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// Create an unresolved value together with the handle that resolves it
    ///
    /// Dropping the [`Resolver`] without using it fails the value.
    pub fn promise() -> (Resolver<T>, Self) {
        let (sender, receiver) = oneshot::channel();
        let value = Self::from_future(async move {
            match receiver.await {
                Ok(result) => result,
                Err(_) => Err(ProvisionError::Composition(
                    "promise dropped before it was resolved".to_string(),
                )),
            }
        });
        (Resolver { sender }, value)
    }

    /// Wait for the value
    pub async fn get(&self) -> ProvisionResult<Arc<T>> {
        self.inner.clone().await
    }

    /// The outcome, if the value has already resolved
    pub fn peek(&self) -> Option<ProvisionResult<Arc<T>>> {
        self.inner.peek().cloned()
    }

    /// Whether the value has resolved (successfully or not)
    pub fn is_resolved(&self) -> bool {
        self.inner.peek().is_some()
    }

    /// Derive a value by applying `f` once this one resolves
    ///
    /// A failure of `self` is passed through unchanged and `f` is never
    /// called. `f` runs at most once regardless of how many consumers read the
    /// result.
    pub fn map<U, F>(&self, f: F) -> AsyncValue<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> U + Send + 'static,
    {
        let source = self.inner.clone();
        AsyncValue::from_future(async move {
            let value = source.await?;
            Ok(f(&*value))
        })
    }

    /// Like [`map`](Self::map), for derivations that can themselves fail
    pub fn try_map<U, F>(&self, f: F) -> AsyncValue<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> ProvisionResult<U> + Send + 'static,
    {
        let source = self.inner.clone();
        AsyncValue::from_future(async move {
            let value = source.await?;
            f(&*value)
        })
    }

    /// Completion signal of this value, without its payload
    pub fn completion(&self) -> AsyncValue<()> {
        self.map(|_| ())
    }
}

impl<T: Send + Sync + 'static> IntoFuture for AsyncValue<T> {
    type Output = ProvisionResult<Arc<T>>;
    type IntoFuture = SharedOutput<T>;

    fn into_future(self) -> Self::IntoFuture {
        self.inner
    }
}

/// Write-once handle for an [`AsyncValue::promise`]
pub struct Resolver<T> {
    sender: oneshot::Sender<ProvisionResult<T>>,
}

impl<T> Resolver<T> {
    /// Resolve the value; consumes the handle so it cannot be written twice
    pub fn resolve(self, value: T) {
        // Nobody is listening any more if this fails
        let _ = self.sender.send(Ok(value));
    }

    /// Fail the value
    pub fn reject(self, err: ProvisionError) {
        let _ = self.sender.send(Err(err));
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resolver<{}>", std::any::type_name::<T>())
    }
}
