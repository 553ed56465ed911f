//! Invalidation subscriber.
//!
//! One per process. A background task holds a dedicated Redis pub/sub
//! connection (pooled connections cannot SUBSCRIBE) on the configured
//! channel and removes each received key from the local L1 store — nothing
//! more: it never re-publishes, never touches the shared store, and never
//! re-populates L1. This is the sole path by which a process learns that
//! another process (or itself — see the loop-back note in `tiered`) wrote
//! or removed a key.

use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::local::LocalStore;

pub struct InvalidationListener {
    redis_url: String,
    channel: String,
    local_store: Arc<LocalStore>,
}

impl InvalidationListener {
    pub fn new(redis_url: String, channel: String, local_store: Arc<LocalStore>) -> Self {
        Self {
            redis_url,
            channel,
            local_store,
        }
    }

    /// Spawn the subscription task. Reconnects with exponential backoff
    /// (1s doubling up to 5 minutes) whenever the connection drops.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            const MAX_BACKOFF: Duration = Duration::from_secs(300);
            let mut backoff = Duration::from_secs(1);

            loop {
                match self.run().await {
                    Ok(()) => {
                        backoff = Duration::from_secs(1);
                    }
                    Err(e) => {
                        error!(
                            error = %e,
                            backoff_secs = backoff.as_secs(),
                            "invalidation listener error, reconnecting"
                        );
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    }
                }
            }
        })
    }

    async fn run(&self) -> Result<(), StoreError> {
        let client = redis::Client::open(self.redis_url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(&self.channel).await?;

        info!(channel = %self.channel, "subscribed to cache invalidation channel");

        let mut stream = pubsub.on_message();
        loop {
            match stream.next().await {
                Some(msg) => match msg.get_payload::<String>() {
                    Ok(key) => {
                        debug!(key = %key, "received cache invalidation");
                        self.local_store.invalidate(&key);
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to read invalidation payload");
                    }
                },
                None => return Err(StoreError::ChannelClosed),
            }
        }
    }
}
