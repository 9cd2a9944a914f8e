use crate::error::Result;

use futures::future::BoxFuture;
use futures::FutureExt;

use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::Arc;

type BoxedFn<T, R> = dyn Fn(T) -> BoxFuture<'static, Result<R>> + Send + Sync;

/// A named, cloneable async handler. The name is the reference identity
/// exposed through serialization; the function itself never is.
pub struct Executor<T, R = ()> {
    name: Arc<str>,
    f: Arc<BoxedFn<T, R>>,
}

impl<T, R> Executor<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    pub fn from_fn<N, F, Fut>(name: N, f: F) -> Self
    where
        N: AsRef<str>,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        Self {
            name: Arc::from(name.as_ref()),
            f: Arc::new(move |data| f(data).boxed()),
        }
    }

    /// Calls the handler. Whatever the handler returns is passed
    /// through as-is.
    pub async fn call(&self, data: T) -> Result<R> {
        (self.f)(data).await
    }
}

impl<T, R> Executor<T, R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if both executors point to the same function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl<T, R> Clone for Executor<T, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            f: self.f.clone(),
        }
    }
}

impl<T, R> Debug for Executor<T, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Executor {{ name: {:?} }}", self.name)
    }
}
