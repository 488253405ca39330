//! HTTP delivery of report documents to the match endpoint.
//!
//! Each submitted document is posted as `application/json`. An attempt
//! succeeds on a 2xx status whose body starts with `ok`; anything else
//! resubmits the same payload as a fresh attempt.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gcrelay_lifecycle::Delivery;
use reqwest::header::CONTENT_TYPE;
use tokio::runtime::Handle;

use crate::config::DeliverySection;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint rejected document: status {status}, body {body:?}")]
    Rejected { status: u16, body: String },
}

struct Inner {
    client: reqwest::Client,
    url: String,
    handle: Handle,
    in_flight: AtomicUsize,
    max_attempts: u32,
    retry_delay: Duration,
}

/// Posts documents on a tokio runtime. Cheap to clone; clones share the
/// in-flight count.
#[derive(Clone)]
pub struct HttpDelivery {
    inner: Arc<Inner>,
}

impl HttpDelivery {
    pub fn new(url: &str, section: &DeliverySection, handle: Handle) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(section.timeout_secs))
            .build()?;
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                url: url.to_string(),
                handle,
                in_flight: AtomicUsize::new(0),
                max_attempts: section.max_attempts,
                retry_delay: Duration::from_millis(section.retry_delay_ms),
            }),
        })
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Wait until every submitted document has completed or been abandoned.
    pub async fn drain(&self) {
        while self.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Delivery for HttpDelivery {
    fn has_destination(&self) -> bool {
        !self.inner.url.is_empty()
    }

    fn submit(&mut self, document: Vec<u8>) {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        spawn_attempt(self.inner.clone(), Arc::new(document), 1);
    }

    fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }
}

/// Run one attempt. The caller has already counted it in flight.
fn spawn_attempt(inner: Arc<Inner>, payload: Arc<Vec<u8>>, attempt: u32) {
    let handle = inner.handle.clone();
    handle.spawn(async move {
        match post_once(&inner.client, &inner.url, &payload).await {
            Ok(()) => {
                tracing::info!(attempt, size = payload.len(), "delivery: document accepted");
            }
            Err(e) if inner.max_attempts != 0 && attempt >= inner.max_attempts => {
                tracing::error!(attempt, "delivery: giving up on document: {e}");
            }
            Err(e) => {
                tracing::warn!(attempt, "delivery: attempt failed, resubmitting: {e}");
                if !inner.retry_delay.is_zero() {
                    tokio::time::sleep(inner.retry_delay).await;
                }
                // Count the new attempt before releasing this one
                inner.in_flight.fetch_add(1, Ordering::SeqCst);
                spawn_attempt(inner.clone(), payload.clone(), attempt + 1);
            }
        }
        inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    });
}

async fn post_once(client: &reqwest::Client, url: &str, payload: &[u8]) -> Result<(), DeliveryError> {
    let resp = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .body(payload.to_vec())
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;
    if status.is_success() && body.starts_with("ok") {
        Ok(())
    } else {
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
