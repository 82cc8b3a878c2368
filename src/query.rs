// MIT License - Copyright (c) 2026 Peter Wright
// Serialized panel queries

use std::future::Future;

use tokio::sync::Mutex;

use crate::error::Result;

/// Serializes status queries so that at most one is outstanding against the
/// panel at any time.
///
/// Concurrent callers queue on the internal lock in arrival order
/// (`tokio::sync::Mutex` is FIFO-fair) and each runs its own call once its
/// turn comes, so every caller gets its own result and one caller's failure
/// is its own. Waiting callers are parked futures; no thread ever blocks.
pub struct SerializedQuery {
    gate: Mutex<()>,
}

impl SerializedQuery {
    pub fn new() -> Self {
        Self { gate: Mutex::new(()) }
    }

    /// Run `call` once every earlier caller has finished.
    pub async fn run<T, F, Fut>(&self, call: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _turn = self.gate.lock().await;
        call().await
    }
}

impl Default for SerializedQuery {
    fn default() -> Self {
        Self::new()
    }
}
