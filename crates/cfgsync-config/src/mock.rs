//! Scripted remote provider for deterministic testing.
//!
//! Returns queued results first, then the current sticky content, without any
//! network access.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::locator::RemoteDescriptor;
use crate::remote::RemoteProvider;
use cfgsync_core::{CfgError, Result};

/// # Example
/// ```
/// use cfgsync_config::mock::MockProvider;
/// let provider = MockProvider::new().with_content("a: 1\n");
/// provider.queue_error("connection refused");
/// ```
#[derive(Default)]
pub struct MockProvider {
    queued: Mutex<VecDeque<std::result::Result<Vec<u8>, String>>>,
    content: Mutex<Option<Vec<u8>>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(self, content: impl Into<Vec<u8>>) -> Self {
        self.set_content(content);
        self
    }

    /// Replace the content returned once the queue is empty.
    pub fn set_content(&self, content: impl Into<Vec<u8>>) {
        *self.content.lock() = Some(content.into());
    }

    /// Stop returning content; fetches fail until content is set again.
    pub fn clear_content(&self) {
        *self.content.lock() = None;
    }

    pub fn queue_content(&self, content: impl Into<Vec<u8>>) {
        self.queued.lock().push_back(Ok(content.into()));
    }

    pub fn queue_error(&self, reason: impl Into<String>) {
        self.queued.lock().push_back(Err(reason.into()));
    }

    /// Number of fetches served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, descriptor: &RemoteDescriptor) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.queued.lock().pop_front();
        match next {
            Some(Ok(bytes)) => Ok(bytes),
            Some(Err(reason)) => Err(CfgError::unreadable(descriptor.to_string(), reason)),
            None => self
                .content
                .lock()
                .clone()
                .ok_or_else(|| CfgError::unreadable(descriptor.to_string(), "no content")),
        }
    }
}
