//! Scripted QR source
//!
//! Answers each fetch from a closure given the URL and the zero-based call
//! index, and records every URL requested.

use gafetes_ingest::qr::{FetchError, QrSource};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&str, usize) -> Result<Vec<u8>, FetchError> + Send + Sync>;

pub struct MockQrSource {
    respond: Responder,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl MockQrSource {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str, usize) -> Result<Vec<u8>, FetchError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Every fetch returns `bytes`
    pub fn serving(bytes: &[u8]) -> Self {
        let bytes = bytes.to_vec();
        Self::new(move |_, _| Ok(bytes.clone()))
    }

    /// Every fetch fails with `error`
    pub fn failing(error: FetchError) -> Self {
        Self::new(move |_, _| Err(error.clone()))
    }

    /// Fetches fail for URLs containing `marker`, succeed otherwise
    pub fn failing_for(marker: &str, bytes: &[u8]) -> Self {
        let marker = marker.to_string();
        let bytes = bytes.to_vec();
        Self::new(move |url, _| {
            if url.contains(&marker) {
                Err(FetchError::Status(503))
            } else {
                Ok(bytes.clone())
            }
        })
    }

    /// While offline, every fetch times out regardless of the responder
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl QrSource for MockQrSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Timeout);
        }
        (self.respond)(url, index)
    }
}
