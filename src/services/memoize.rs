//! Memoization on top of the cache manager.
//!
//! A [`MemoKey`] renders as `prefix:arg1:arg2:k1=v1:k2=v2`. Positional
//! arguments keep their order; keyword arguments are sorted by name, so two
//! calls that differ only in keyword order share an entry.
//!
//! [`Memoized::wrap`] turns a function into a [`MemoizedFn`] whose key is
//! rendered from the exact arguments each call passes to the function.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::models::WriteStrategy;
use crate::services::cache_manager::{CacheManager, CacheValue, SetOptions};

/// Options for [`CacheManager::memoize`].
#[derive(Debug, Clone, Default)]
pub struct MemoizeOptions {
    /// TTL for memoized results; the manager default when `None`.
    pub ttl: Option<Duration>,
    /// Key prefix; the function name when `None`.
    pub key_prefix: Option<String>,
    /// Write strategy; the manager default when `None`.
    pub strategy: Option<WriteStrategy>,
}

impl MemoizeOptions {
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub const fn with_strategy(mut self, strategy: WriteStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Cache key built from a function identity and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoKey {
    prefix: String,
    positional: Vec<String>,
    keyword: BTreeMap<String, String>,
}

impl MemoKey {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            positional: Vec::new(),
            keyword: BTreeMap::new(),
        }
    }

    /// Append a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.positional.push(value.to_string());
        self
    }

    /// Set a keyword argument. Repeating a name replaces the earlier value.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.keyword.insert(name.into(), value.to_string());
        self
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MemoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)?;
        for value in &self.positional {
            write!(f, ":{value}")?;
        }
        for (name, value) in &self.keyword {
            write!(f, ":{name}={value}")?;
        }
        Ok(())
    }
}

/// Arguments that can be rendered into a [`MemoKey`].
pub trait MemoArgs {
    fn extend_key(&self, key: MemoKey) -> MemoKey;
}

impl MemoArgs for () {
    fn extend_key(&self, key: MemoKey) -> MemoKey {
        key
    }
}

macro_rules! impl_memo_args_for_tuple {
    ($($ty:ident $arg:ident),+) => {
        impl<$($ty: fmt::Display),+> MemoArgs for ($($ty,)+) {
            fn extend_key(&self, key: MemoKey) -> MemoKey {
                let ($($arg,)+) = self;
                key$(.arg($arg))+
            }
        }
    };
}

impl_memo_args_for_tuple!(A a);
impl_memo_args_for_tuple!(A a, B b);
impl_memo_args_for_tuple!(A a, B b, C c);
impl_memo_args_for_tuple!(A a, B b, C c, D d);
impl_memo_args_for_tuple!(A a, B b, C c, D d, E e);
impl_memo_args_for_tuple!(A a, B b, C c, D d, E e, G g);

/// Positional arguments plus named arguments of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kwargs<P, T> {
    pub args: P,
    pub kwargs: BTreeMap<String, T>,
}

impl<P, T> Kwargs<P, T> {
    pub const fn new(args: P) -> Self {
        Self {
            args,
            kwargs: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: T) -> Self {
        self.kwargs.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.kwargs.get(name)
    }
}

impl<P: MemoArgs, T: fmt::Display> MemoArgs for Kwargs<P, T> {
    fn extend_key(&self, key: MemoKey) -> MemoKey {
        self.kwargs
            .iter()
            .fold(self.args.extend_key(key), |key, (name, value)| {
                key.kwarg(name.clone(), value)
            })
    }
}

/// A function's view of the cache: builds keys under its prefix and runs
/// the computation only on a miss.
pub struct Memoized<V> {
    manager: Arc<CacheManager<V>>,
    prefix: String,
    options: SetOptions,
}

impl<V: CacheValue> Memoized<V> {
    /// Start a key for one call.
    pub fn key(&self) -> MemoKey {
        MemoKey::new(self.prefix.clone())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Return the cached result for `key`, or await `compute` and cache it.
    pub async fn call<F, Fut>(&self, key: MemoKey, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let key = key.render();
        if let Some(hit) = self.manager.get(&key).await {
            return hit;
        }

        debug!(key = %key, "memoized call miss, computing");
        let value = compute().await;
        self.manager.set_with(key, value.clone(), self.options).await;
        value
    }

    /// Like [`call`](Self::call) for a plain closure.
    pub async fn call_sync<F>(&self, key: MemoKey, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        self.call(key, || std::future::ready(compute())).await
    }

    /// Like [`call`](Self::call) for a fallible computation. Errors are
    /// returned and not cached.
    pub async fn try_call<F, Fut, E>(&self, key: MemoKey, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let key = key.render();
        if let Some(hit) = self.manager.get(&key).await {
            return Ok(hit);
        }

        let value = compute().await?;
        self.manager.set_with(key, value.clone(), self.options).await;
        Ok(value)
    }

    /// Bind `func`, keying every call on the arguments it receives.
    pub fn wrap<F>(self, func: F) -> MemoizedFn<V, F> {
        MemoizedFn { memo: self, func }
    }
}

/// A function whose results are cached under its call arguments.
pub struct MemoizedFn<V, F> {
    memo: Memoized<V>,
    func: F,
}

impl<V: CacheValue, F> MemoizedFn<V, F> {
    pub async fn call<A, Fut>(&self, args: A) -> V
    where
        A: MemoArgs,
        F: Fn(A) -> Fut,
        Fut: Future<Output = V>,
    {
        let key = args.extend_key(self.memo.key());
        self.memo.call(key, || (self.func)(args)).await
    }

    /// For functions returning `Result`; errors are not cached.
    pub async fn try_call<A, Fut, E>(&self, args: A) -> Result<V, E>
    where
        A: MemoArgs,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let key = args.extend_key(self.memo.key());
        self.memo.try_call(key, || (self.func)(args)).await
    }

    pub fn prefix(&self) -> &str {
        self.memo.prefix()
    }
}

impl<V: CacheValue> CacheManager<V> {
    /// Wrap the function `name` so its results are cached.
    pub fn memoize(self: &Arc<Self>, name: &str, options: MemoizeOptions) -> Memoized<V> {
        Memoized {
            manager: Arc::clone(self),
            prefix: options.key_prefix.unwrap_or_else(|| name.to_string()),
            options: SetOptions {
                ttl: options.ttl,
                strategy: options.strategy,
            },
        }
    }
}
