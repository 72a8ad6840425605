#![allow(dead_code)]

use pagewise::{
    FetchError, KeyChain, Page, PaginationManager, PaginationManagerBuilder, Request, Source,
};
use std::{
    collections::{HashMap, VecDeque},
    num::NonZeroUsize,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

// ============================================================================
// Helpers
// ============================================================================

pub fn size(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

/// Let every spawned task run until it blocks.
///
/// With a paused clock, sleeping only advances time once the runtime is
/// idle, so everything queued before the call has been processed after it.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// A builder with deduplication turned off, for tests that re-trigger the
/// same request on purpose.
pub fn eager<S: Source>(source: S, page_size: usize) -> PaginationManagerBuilder<S> {
    PaginationManager::builder(source)
        .page_size(size(page_size))
        .dedup_window(Duration::ZERO)
}

pub fn values<S: Source>(manager: &PaginationManager<S>) -> Vec<S::Value> {
    manager.output().expect("pipeline failed").values
}

// ============================================================================
// Scripted Source
// ============================================================================

/// A source whose pages are scripted per key.
///
/// Each fetch of a key takes the next scripted page for it; the last page
/// repeats once the script runs out. Keys outside `min..=max` have no
/// neighbors in that direction.
pub struct ScriptedSource {
    refresh_key: i32,
    min: i32,
    max: i32,
    pages: Mutex<HashMap<i32, VecDeque<Vec<&'static str>>>>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(refresh_key: i32, min: i32, max: i32) -> Self {
        Self {
            refresh_key,
            min,
            max,
            pages: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn script(self, key: i32, pages: &[&[&'static str]]) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(key, pages.iter().map(|page| page.to_vec()).collect());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Source for ScriptedSource {
    type Key = i32;
    type Value = &'static str;
    type Error = FetchError;

    fn refresh_key(&self) -> i32 {
        self.refresh_key
    }

    fn key_chain(&self, key: &i32) -> KeyChain<i32> {
        KeyChain::new(
            *key,
            (*key > self.min).then(|| key - 1),
            (*key < self.max).then(|| key + 1),
        )
    }

    async fn fetch(&self, request: &Request<i32>) -> Result<Page<i32, &'static str>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut pages = self.pages.lock().unwrap();
        let script = pages
            .get_mut(request.key())
            .ok_or_else(|| FetchError::permanent(format!("no page for key {}", request.key())))?;
        let values = if script.len() > 1 {
            script.pop_front().unwrap_or_default()
        } else {
            script.front().cloned().unwrap_or_default()
        };
        Ok(Page::new(request.clone(), values))
    }
}
