// ── DataSource capability ──

use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use super::state::LoadError;
use crate::model::Row;

/// Something that can asynchronously produce rows.
///
/// Implemented by the built-in HTTP and listing sources and by hosts that
/// bring their own loaders.
pub trait DataSource: Send + Sync {
    fn load(&self) -> BoxFuture<'_, Result<Vec<Row>, LoadError>>;
}

/// Adapter turning an async closure into a [`DataSource`].
pub struct FnSource<F>(F);

/// Build a [`DataSource`] from a closure returning a future.
///
/// ```ignore
/// registry.register("greeting", source_fn(|| async {
///     Ok(vec![Row::new().with("label", "hello")])
/// }));
/// ```
pub fn source_fn<F, Fut>(f: F) -> FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Row>, LoadError>> + Send + 'static,
{
    FnSource(f)
}

impl<F, Fut> DataSource for FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Row>, LoadError>> + Send + 'static,
{
    fn load(&self) -> BoxFuture<'_, Result<Vec<Row>, LoadError>> {
        (self.0)().boxed()
    }
}
