use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use file_transmit::cache::{UploadCache, UploadState};
use file_transmit::error::TransmitError;
use file_transmit::media::MediaType;
use file_transmit::request::UploadKey;

fn key(name: &str) -> UploadKey {
    UploadKey {
        payload_digest: name.to_string(),
        url: "https://api.example.com/files/upload".to_string(),
        content_type: MediaType::Json,
    }
}

#[tokio::test]
async fn concurrent_callers_share_one_factory_invocation() {
    let cache = Arc::new(UploadCache::new());
    let invocations = Arc::new(AtomicU32::new(0));

    let callers = (0..3).map(|_| {
        let cache = cache.clone();
        let invocations = invocations.clone();
        async move {
            cache
                .get_or_create(key("shared"), move |_operation| async move {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok("https://cdn.example.com/shared.png".to_string())
                })
                .await
        }
    });
    let results = futures::future::join_all(callers).await;

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result, Ok("https://cdn.example.com/shared.png".to_string()));
    }
}

#[tokio::test]
async fn completed_entry_serves_late_arrivals_without_reupload() {
    let cache = UploadCache::new();
    let invocations = Arc::new(AtomicU32::new(0));

    let first = {
        let invocations = invocations.clone();
        cache
            .get_or_create(key("cached"), move |_operation| async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok("https://cdn.example.com/cached.png".to_string())
            })
            .await
    };
    assert!(first.is_ok());
    assert_eq!(
        cache
            .operation(&key("cached"))
            .map(|operation| operation.state()),
        Some(UploadState::Completed)
    );

    let second = {
        let invocations = invocations.clone();
        cache
            .get_or_create(key("cached"), move |_operation| async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok("https://cdn.example.com/fresh.png".to_string())
            })
            .await
    };

    assert_eq!(second, Ok("https://cdn.example.com/cached.png".to_string()));
    assert_eq!(invocations.load(Ordering::SeqCst), 1, "no second upload");
}

#[tokio::test]
async fn failed_entry_is_evicted_so_retries_are_fresh() {
    let cache = UploadCache::new();
    let invocations = Arc::new(AtomicU32::new(0));

    let first = {
        let invocations = invocations.clone();
        cache
            .get_or_create(key("flaky"), move |_operation| async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(TransmitError::Transport("connection reset".into()))
            })
            .await
    };
    assert!(matches!(first, Err(TransmitError::Transport(_))));
    assert!(
        cache.operation(&key("flaky")).is_none(),
        "failed entry must not linger"
    );

    let second = {
        let invocations = invocations.clone();
        cache
            .get_or_create(key("flaky"), move |_operation| async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok("https://cdn.example.com/flaky.png".to_string())
            })
            .await
    };

    assert_eq!(second, Ok("https://cdn.example.com/flaky.png".to_string()));
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn completed_entry_is_evicted_after_the_grace_window() {
    let cache = UploadCache::with_completed_ttl(Duration::from_millis(50));

    let result = cache
        .get_or_create(key("graced"), |_operation| async {
            Ok("https://cdn.example.com/graced.png".to_string())
        })
        .await;
    assert!(result.is_ok());
    assert!(cache.operation(&key("graced")).is_some());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(
        cache.operation(&key("graced")).is_none(),
        "grace window must evict the completed entry"
    );
}

#[tokio::test]
async fn settled_operations_never_regress() {
    let cache = UploadCache::new();
    cache
        .get_or_create(key("done"), |_operation| async {
            Ok("https://cdn.example.com/done.png".to_string())
        })
        .await
        .expect("upload succeeds");

    let operation = cache.operation(&key("done")).expect("entry retained");
    assert_eq!(operation.state(), UploadState::Completed);

    operation.mark_submitted();
    operation.mark_polling();
    assert_eq!(operation.state(), UploadState::Completed);
}
