//! An in-memory cache of successful API responses, keyed by request path and query.
//!
//! Upstream sites are slow and rate limited on their side, so identical requests within the time
//! to live are answered from memory. A background task evicts expired entries on a fixed interval.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bon::bon;
use tokio::{sync::RwLock, time::Instant};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::{ServerError, ServerResult};

/// Largest response body that will be buffered for caching.
const MAX_CACHED_BODY_BYTES: usize = 4 * 1024 * 1024;

/// A cached response body and when it was stored.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// The serialized JSON body.
    body: Bytes,
    /// When the entry was inserted, used to expire it.
    inserted_at: Instant,
}

/// Successful response bodies shared by every request, expired after a fixed time to live.
pub struct ResponseCache {
    /// Cached bodies by request path and query, shared with the book keeping task.
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,

    /// How long an entry is served for.
    time_to_live: Duration,

    /// Cancels the book keeping task when the cache is dropped.
    drop_guard: DropGuard,

    /// A reference to the tokio task spawned to evict expired entries.
    handle_book_keeping: tokio::task::JoinHandle<()>,
}

#[bon]
impl ResponseCache {
    /// Create a cache and spawn its book keeping task. Must be called within a tokio runtime.
    #[builder]
    pub fn new(time_to_live: Duration, book_keeping_interval: Duration) -> Self {
        let entries: Arc<RwLock<HashMap<String, CacheEntry>>> = Arc::default();

        let cancel_token = CancellationToken::new();
        let drop_guard = cancel_token.clone().drop_guard();

        let handle_book_keeping = tokio::spawn({
            let entries = Arc::clone(&entries);
            let cancel_token = cancel_token.child_token();

            async move {
                loop {
                    tokio::select! {
                        _ = cancel_token.cancelled() => {
                            break;
                        }
                        mut entries = async {
                            tokio::time::sleep(book_keeping_interval).await;
                            entries.write().await
                        } => {
                            let before = entries.len();
                            entries.retain(|_, entry| entry.inserted_at.elapsed() < time_to_live);
                            let evicted = before.saturating_sub(entries.len());
                            if evicted > 0 {
                                tracing::debug!(evicted, remaining = entries.len(), "Evicted expired responses");
                            }
                        }
                    }
                }

                tracing::info!("Cache book keeping task cancelled");
            }
        });

        Self {
            entries,
            time_to_live,
            drop_guard,
            handle_book_keeping,
        }
    }

    /// Fetch a cached body, ignoring entries that have expired but not yet been evicted.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.inserted_at.elapsed() < self.time_to_live)
            .map(|entry| entry.body.clone())
    }

    /// Store a body, replacing any previous entry for the key.
    pub async fn insert(&self, key: String, body: Bytes) {
        let entry = CacheEntry {
            body,
            inserted_at: Instant::now(),
        };
        self.entries.write().await.insert(key, entry);
    }

    /// The number of stored entries, expired or not.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Stop the book keeping task and wait for it to finish.
    #[tracing::instrument(skip(self), ret(level = "trace"))]
    pub async fn gracefully_shutdown(self) -> ServerResult<()> {
        let Self {
            drop_guard,
            handle_book_keeping,
            ..
        } = self;
        drop(drop_guard);

        /// The maximum time to wait for the task to shutdown before we throw an error.
        const ABSOLUTE_TIMEOUT: Duration = Duration::from_secs(10);

        if let Err(e) = tokio::time::timeout(ABSOLUTE_TIMEOUT, handle_book_keeping).await {
            tracing::error!(
                err = (&e as &dyn std::error::Error),
                "Failed to join cache book keeping task"
            );
            return Err(ServerError::Internal(
                "Failed to join cache book keeping task".to_string(),
            ));
        }

        Ok(())
    }
}

/// Shut down a cache shared through an [`Arc`] once the server has released its clones.
///
/// If another reference is still alive the book keeping task cannot be joined. It keeps running
/// until that reference drops, which is logged.
pub async fn shutdown(cache: Arc<ResponseCache>) -> ServerResult<()> {
    match Arc::into_inner(cache) {
        Some(cache) => cache.gracefully_shutdown().await,
        None => {
            tracing::warn!("Response cache is still referenced, skipping graceful shutdown");
            Ok(())
        }
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            entries,
            time_to_live,
            drop_guard,
            handle_book_keeping,
        } = &self;
        f.debug_struct("ResponseCache")
            .field("entries", &entries)
            .field("time_to_live", &time_to_live)
            .field("drop_guard", &drop_guard)
            .field("handle_book_keeping", &handle_book_keeping)
            .finish()
    }
}

/// Middleware answering from the cache when possible and caching successful responses otherwise.
pub async fn cache_responses(
    State(cache): State<Arc<ResponseCache>>,
    request: Request,
    next: Next,
) -> Response {
    let key = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), |pq| pq.as_str().to_string());

    if let Some(body) = cache.get(&key).await {
        tracing::trace!(key = %key, "Cache hit");
        return ([(header::CONTENT_TYPE, "application/json")], body).into_response();
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let body = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            return ServerError::Internal(format!("Failed to buffer response: {e}"))
                .into_response();
        }
    };

    cache.insert(key, body.clone()).await;
    Response::from_parts(parts, Body::from(body))
}
