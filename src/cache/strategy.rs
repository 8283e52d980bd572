//! Strategy Module
//!
//! The caller-supplied description of how to fetch, parse and validate one
//! resource, and when to refresh it in the background.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::error::CacheError;

/// Boxed, sendable future used at the strategy's type-erased seams.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub(crate) type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<Result<T, Failure>> + Send + Sync>;
pub(crate) type Validator<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
pub(crate) type ErrorHook = Arc<dyn Fn(&CacheError) + Send + Sync>;
pub(crate) type ReadySignal = Box<dyn FnOnce() -> BoxFuture<()> + Send>;

/// Which stage of a strategy fetch failed.
pub(crate) enum Failure {
    Fetch(anyhow::Error),
    Parse(anyhow::Error),
}

// == Update Policy ==
/// Whether a durable-store hit should be revalidated in the background.
#[derive(Clone, Default)]
pub enum Update {
    #[default]
    Always,
    Never,
    /// Asked at lookup time
    When(Arc<dyn Fn() -> bool + Send + Sync>),
}

impl Update {
    pub fn is_due(&self) -> bool {
        match self {
            Update::Always => true,
            Update::Never => false,
            Update::When(predicate) => predicate(),
        }
    }
}

impl From<bool> for Update {
    fn from(update: bool) -> Self {
        if update {
            Update::Always
        } else {
            Update::Never
        }
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Always => f.write_str("Always"),
            Update::Never => f.write_str("Never"),
            Update::When(_) => f.write_str("When(..)"),
        }
    }
}

// == Strategy ==
/// How to obtain a value for `id` when the cache cannot answer alone.
///
/// Every optional part has its default filled in at construction: parse is
/// the identity, validate accepts everything, revalidation is always due and
/// errors are logged at debug level.
pub struct Strategy<T> {
    pub(crate) id: String,
    pub(crate) fetch: Fetcher<T>,
    pub(crate) validate: Validator<T>,
    pub(crate) update: Update,
    pub(crate) update_after: Option<ReadySignal>,
    pub(crate) on_error: ErrorHook,
}

impl<T: Send + 'static> Strategy<T> {
    // == Constructors ==
    /// A strategy whose fetch already yields the cached type.
    pub fn new<F, Fut>(id: impl Into<String>, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self::with_parser(id, fetch, |raw: T| Ok(raw))
    }

    /// A strategy whose raw fetch output `R` goes through `parse` first.
    pub fn with_parser<R, F, Fut, P>(id: impl Into<String>, fetch: F, parse: P) -> Self
    where
        R: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        P: Fn(R) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let parse = Arc::new(parse);
        let fetch: Fetcher<T> = Arc::new(move || -> BoxFuture<Result<T, Failure>> {
            let pending = fetch();
            let parse = Arc::clone(&parse);
            Box::pin(async move {
                let raw = pending.await.map_err(Failure::Fetch)?;
                parse(raw).map_err(Failure::Parse)
            })
        });

        Self {
            id: id.into(),
            fetch,
            validate: Arc::new(|_| true),
            update: Update::Always,
            update_after: None,
            on_error: Arc::new(|err| debug!("Unhandled cache error: {}", err)),
        }
    }

    // == Builders ==
    /// Rejects fetched data for which `validate` returns false.
    pub fn validate(mut self, validate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.validate = Arc::new(validate);
        self
    }

    /// Sets the background revalidation policy for durable-store hits.
    pub fn update(mut self, update: impl Into<Update>) -> Self {
        self.update = update.into();
        self
    }

    /// Revalidates only when `predicate` says so at lookup time.
    pub fn update_when(self, predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.update(Update::When(Arc::new(predicate)))
    }

    /// Delays a due revalidation until the future returned by `ready` resolves.
    pub fn update_after<F, Fut>(mut self, ready: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.update_after = Some(Box::new(move || -> BoxFuture<()> { Box::pin(ready()) }));
        self
    }

    /// Called with every error this strategy's lookups end in, including
    /// background revalidations.
    pub fn on_error(mut self, hook: impl Fn(&CacheError) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(hook);
        self
    }
}

impl<T> Strategy<T> {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T> fmt::Debug for Strategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("id", &self.id)
            .field("update", &self.update)
            .field("update_after", &self.update_after.is_some())
            .finish_non_exhaustive()
    }
}
