//! Task definitions: what to call, how often, and when next.

use crate::cadence::Cadence;
use crate::error::TaskError;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use taskhook_core::{ServiceId, TaskId};

/// HTTP methods a task may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Options,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = TaskError;

    /// Case-insensitive: `post` and `POST` both parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(TaskError::InvalidMethod {
                method: s.to_string(),
            }),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Delete => Self::DELETE,
            HttpMethod::Options => Self::OPTIONS,
        }
    }
}

/// Scheduling status of a task. Only active tasks are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Active,
    Paused,
    Disabled,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Disabled => "disabled",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "disabled" => Ok(Self::Disabled),
            other => Err(TaskError::InvalidStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// A single request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Ordered request headers, applied exactly as stored.
///
/// `Headers::parse` validates names and values so bad input is rejected
/// when a task is written. Rows read back from storage go through
/// `Headers::from_stored` and are only checked again when a request is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(Vec<Header>);

impl Headers {
    /// Validates and wraps `(name, value)` pairs, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns the first invalid header name or value.
    pub fn parse<I, N, V>(pairs: I) -> Result<Self, TaskError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        let mut headers = Vec::new();
        for (name, value) in pairs {
            let header = Header {
                name: name.into(),
                value: value.into(),
            };
            if HeaderName::from_bytes(header.name.as_bytes()).is_err() {
                return Err(TaskError::InvalidHeaderName { name: header.name });
            }
            if HeaderValue::from_str(&header.value).is_err() {
                return Err(TaskError::InvalidHeaderValue { name: header.name });
            }
            headers.push(header);
        }
        Ok(Self(headers))
    }

    /// Wraps headers loaded from storage without validating them.
    #[must_use]
    pub fn from_stored(headers: Vec<Header>) -> Self {
        Self(headers)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A recurring webhook definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Service that owns the task.
    pub service_id: ServiceId,
    pub name: String,
    pub url: String,
    pub method: HttpMethod,
    pub headers: Headers,
    /// Request body, sent as-is.
    pub payload: String,
    #[serde(flatten)]
    pub cadence: Cadence,
    /// Next due time. Only ever advanced by one cadence step at a time.
    pub scheduled_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates an active task, first due one cadence step from now.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::ScheduleOverflow` if the first run is out of range.
    pub fn new(
        service_id: ServiceId,
        name: impl Into<String>,
        url: impl Into<String>,
        method: HttpMethod,
        cadence: Cadence,
    ) -> Result<Self, TaskError> {
        let now = Utc::now();
        Ok(Self {
            id: TaskId::new(),
            service_id,
            name: name.into(),
            url: url.into(),
            method,
            headers: Headers::default(),
            payload: String::new(),
            cadence,
            scheduled_at: cadence.next_after(now)?,
            status: TaskStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Sets the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Overrides the first due time.
    #[must_use]
    pub fn scheduled_at(mut self, scheduled_at: DateTime<Utc>) -> Self {
        self.scheduled_at = scheduled_at;
        self
    }

    /// Whether the selector should pick this task at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Active && self.scheduled_at <= now
    }
}
