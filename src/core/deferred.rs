//! A result that is either already known or still being computed
//!
//! Schema validation is synchronous for fully local schemas and asynchronous
//! when remote references must be resolved first. `Deferred` lets every
//! layer (validator, parameter processor, body processor) return the cheap
//! ready form when possible while still supporting suspension.

use futures::future::BoxFuture;
use futures::FutureExt;

pub enum Deferred<T, E> {
    /// The outcome is already known
    Ready(Result<T, E>),
    /// The outcome depends on an in-flight computation
    Pending(BoxFuture<'static, Result<T, E>>),
}

impl<T, E> Deferred<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn ok(value: T) -> Self {
        Deferred::Ready(Ok(value))
    }

    pub fn err(error: E) -> Self {
        Deferred::Ready(Err(error))
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Deferred::Pending(future.boxed())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Deferred::Ready(_))
    }

    pub fn map<U, F>(self, f: F) -> Deferred<U, E>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        match self {
            Deferred::Ready(result) => Deferred::Ready(result.map(f)),
            Deferred::Pending(fut) => Deferred::Pending(fut.map(|r| r.map(f)).boxed()),
        }
    }

    pub fn map_err<E2, F>(self, f: F) -> Deferred<T, E2>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> E2 + Send + 'static,
    {
        match self {
            Deferred::Ready(result) => Deferred::Ready(result.map_err(f)),
            Deferred::Pending(fut) => Deferred::Pending(fut.map(|r| r.map_err(f)).boxed()),
        }
    }

    /// Chain a fallible step onto a successful outcome
    pub fn and_then<U, F>(self, f: F) -> Deferred<U, E>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
    {
        match self {
            Deferred::Ready(result) => Deferred::Ready(result.and_then(f)),
            Deferred::Pending(fut) => Deferred::Pending(fut.map(|r| r.and_then(f)).boxed()),
        }
    }

    /// Wait for the outcome
    pub async fn resolve(self) -> Result<T, E> {
        match self {
            Deferred::Ready(result) => result,
            Deferred::Pending(fut) => fut.await,
        }
    }
}

impl<T, E> std::fmt::Debug for Deferred<T, E>
where
    T: std::fmt::Debug,
    E: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Deferred::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Deferred::Pending(_) => f.write_str("Pending"),
        }
    }
}
