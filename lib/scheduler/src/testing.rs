//! Test doubles shared by the dispatch, pool and scheduler tests.

use crate::cadence::{Cadence, CadenceUnit};
use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::task::{HttpMethod, Task};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use taskhook_core::ServiceId;

/// What the scripted transport does for a URL.
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(u16, &'static str),
    Fail(TransportError),
    Panic,
}

/// An `HttpTransport` that answers from a script and tracks concurrency.
pub struct ScriptedTransport {
    replies: HashMap<String, Reply>,
    fallback: Reply,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn answering(status: u16, body: &'static str) -> Self {
        Self {
            replies: HashMap::new(),
            fallback: Reply::Respond(status, body),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(mut self, url: &str, reply: Reply) -> Self {
        self.replies.insert(url.to_string(), reply);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send_request(
        &self,
        request: &HttpRequest,
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.replies.get(&request.url).unwrap_or(&self.fallback) {
            Reply::Respond(status_code, body) => Ok(HttpResponse {
                status_code: *status_code,
                body: (*body).to_string(),
            }),
            Reply::Fail(error) => Err(error.clone()),
            Reply::Panic => panic!("scripted panic for {}", request.url),
        }
    }
}

pub fn task_due(url: &str, frequency: i64, unit: CadenceUnit, at: DateTime<Utc>) -> Task {
    Task::new(
        ServiceId::new(),
        "scripted",
        url,
        HttpMethod::Post,
        Cadence::new(frequency, unit).unwrap(),
    )
    .unwrap()
    .scheduled_at(at)
}
