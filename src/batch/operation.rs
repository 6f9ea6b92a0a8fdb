//! Operation seams: the single-item operation and the batch resolver.
//!
//! Both are implemented for plain async closures, so most callers never name
//! these traits. Implement them directly for stateful clients.

use crate::error::BoxError;
use async_trait::async_trait;
use std::future::Future;

/// The wrapped single-item operation.
#[async_trait]
pub trait SingleOperation<P, R>: Send + Sync {
    async fn call(&self, payload: P) -> std::result::Result<R, BoxError>;
}

/// Resolves a whole group at once. Must return exactly one result per payload, in order.
#[async_trait]
pub trait BatchResolver<P, R>: Send + Sync {
    async fn resolve(&self, payloads: Vec<P>) -> std::result::Result<Vec<R>, BoxError>;
}

#[async_trait]
impl<P, R, E, F, Fut> SingleOperation<P, R> for F
where
    F: Fn(P) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
    P: Send + 'static,
    R: Send + 'static,
{
    async fn call(&self, payload: P) -> std::result::Result<R, BoxError> {
        (self)(payload).await.map_err(Into::into)
    }
}

#[async_trait]
impl<P, R, E, F, Fut> BatchResolver<P, R> for F
where
    F: Fn(Vec<P>) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<Vec<R>, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
    P: Send + 'static,
    R: Send + 'static,
{
    async fn resolve(&self, payloads: Vec<P>) -> std::result::Result<Vec<R>, BoxError> {
        (self)(payloads).await.map_err(Into::into)
    }
}

/// A function of several positional arguments, applied to one tuple payload.
///
/// Lets `|user, options| async { .. }` be batched as `(User, Options)` payloads;
/// the resolver then receives `Vec<(User, Options)>`.
pub trait Spread<Args, Fut> {
    fn apply(&self, args: Args) -> Fut;
}

macro_rules! impl_spread {
    ($($arg:ident),+) => {
        impl<F, Fut, $($arg),+> Spread<($($arg,)+), Fut> for F
        where
            F: Fn($($arg),+) -> Fut,
        {
            #[allow(non_snake_case)]
            fn apply(&self, ($($arg,)+): ($($arg,)+)) -> Fut {
                (self)($($arg),+)
            }
        }
    };
}

impl_spread!(A, B);
impl_spread!(A, B, C);
impl_spread!(A, B, C, D);
impl_spread!(A, B, C, D, E);
impl_spread!(A, B, C, D, E, G);
