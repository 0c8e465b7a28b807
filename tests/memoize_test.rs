use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use layercache::{CacheManager, Kwargs, MemoKey, MemoizeOptions};

fn counting_add(calls: &AtomicUsize, a: i64, b: i64, x: i64, y: i64) -> i64 {
    calls.fetch_add(1, Ordering::SeqCst);
    a * 1000 + b * 100 + x * 10 + y
}

#[tokio::test]
async fn test_keyword_order_shares_an_entry() {
    let cache: Arc<CacheManager<i64>> = Arc::new(CacheManager::in_memory(100).unwrap());
    let memo = cache.memoize("f", MemoizeOptions::default());
    let calls = AtomicUsize::new(0);

    let first = memo
        .call_sync(memo.key().arg(1).arg(2).kwarg("a", 3).kwarg("b", 4), || {
            counting_add(&calls, 1, 2, 3, 4)
        })
        .await;
    let second = memo
        .call_sync(memo.key().arg(1).arg(2).kwarg("b", 4).kwarg("a", 3), || {
            counting_add(&calls, 1, 2, 3, 4)
        })
        .await;

    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_positional_order_is_significant() {
    let cache: Arc<CacheManager<i64>> = Arc::new(CacheManager::in_memory(100).unwrap());
    let memo = cache.memoize("f", MemoizeOptions::default());
    let calls = AtomicUsize::new(0);

    let forward = memo
        .call_sync(memo.key().arg(1).arg(2), || counting_add(&calls, 1, 2, 0, 0))
        .await;
    let reversed = memo
        .call_sync(memo.key().arg(2).arg(1), || counting_add(&calls, 2, 1, 0, 0))
        .await;

    assert_ne!(forward, reversed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn test_async_computation_is_cached_with_prefix() {
    let cache: Arc<CacheManager<String>> = Arc::new(CacheManager::in_memory(100).unwrap());
    let memo = cache.memoize(
        "load_user",
        MemoizeOptions::default()
            .with_key_prefix("users")
            .with_ttl(Duration::from_secs(30)),
    );
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        let name = memo
            .call(memo.key().arg(7), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                "ada".to_string()
            })
            .await;
        assert_eq!(name, "ada");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.contains_key("users:7"));
    assert_eq!(memo.prefix(), "users");
}

#[tokio::test]
async fn test_errors_are_not_cached() {
    let cache: Arc<CacheManager<u32>> = Arc::new(CacheManager::in_memory(100).unwrap());
    let memo = cache.memoize("parse", MemoizeOptions::default());
    let calls = AtomicUsize::new(0);

    let failed: Result<u32, String> = memo
        .try_call(memo.key().arg("x"), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("not a number".to_string())
        })
        .await;
    assert!(failed.is_err());
    assert!(cache.is_empty());

    let parsed: Result<u32, String> = memo
        .try_call(memo.key().arg("x"), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(5)
        })
        .await;
    assert_eq!(parsed, Ok(5));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_wrapped_function_keys_on_its_arguments() {
    let cache: Arc<CacheManager<i64>> = Arc::new(CacheManager::in_memory(100).unwrap());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let add = cache
        .memoize("add", MemoizeOptions::default())
        .wrap(move |(a, b): (i64, i64)| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { a * 10 + b }
        });

    assert_eq!(add.call((1, 2)).await, 12);
    assert_eq!(add.call((1, 2)).await, 12);
    assert_eq!(add.call((2, 1)).await, 21);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.contains_key("add:1:2"));
    assert!(cache.contains_key("add:2:1"));
}

#[tokio::test]
async fn test_wrapped_function_ignores_keyword_order() {
    let cache: Arc<CacheManager<i64>> = Arc::new(CacheManager::in_memory(100).unwrap());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let scale = cache
        .memoize("scale", MemoizeOptions::default())
        .wrap(move |call: Kwargs<(i64,), i64>| {
            counter.fetch_add(1, Ordering::SeqCst);
            let factor = call.get("factor").copied().unwrap_or(1);
            let offset = call.get("offset").copied().unwrap_or(0);
            async move { call.args.0 * factor + offset }
        });

    let first = scale
        .call(Kwargs::new((3,)).kwarg("factor", 2).kwarg("offset", 1))
        .await;
    let second = scale
        .call(Kwargs::new((3,)).kwarg("offset", 1).kwarg("factor", 2))
        .await;

    assert_eq!(first, 7);
    assert_eq!(second, 7);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.contains_key("scale:3:factor=2:offset=1"));
}

#[tokio::test]
async fn test_wrapped_fallible_function_skips_errors() {
    let cache: Arc<CacheManager<u32>> = Arc::new(CacheManager::in_memory(100).unwrap());
    let parse = cache
        .memoize("parse", MemoizeOptions::default())
        .wrap(|(text,): (String,)| async move { text.parse::<u32>().map_err(|e| e.to_string()) });

    assert!(parse.try_call(("x".to_string(),)).await.is_err());
    assert!(cache.is_empty());
    assert_eq!(parse.try_call(("5".to_string(),)).await, Ok(5));
    assert!(cache.contains_key("parse:5"));
    assert_eq!(parse.prefix(), "parse");
}

#[test]
fn test_key_rendering() {
    let key = MemoKey::new("f").arg(1).arg("two").kwarg("z", 0).kwarg("a", true);
    assert_eq!(key.render(), "f:1:two:a=true:z=0");
    assert_eq!(MemoKey::new("g").to_string(), "g");
}
