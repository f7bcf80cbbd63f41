use crate::cadence::Platform;
use crate::guard::{DuplicatePolicy, Verdict};
use crate::history::{Admission, HistoryStore, HistoryWriteError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Default attempt cap for one theme.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub theme: String,
    pub platform: Platform,
    pub include_emojis: bool,
    /// Content style from the platform's mix, e.g. `breaking_news`.
    pub content_type: Option<String>,
}

impl GenerationRequest {
    pub fn new(theme: impl Into<String>, platform: Platform) -> Self {
        Self {
            theme: theme.into(),
            platform,
            include_emojis: true,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("content generator failed: {0}")]
    Request(String),
    #[error("content generator returned no text")]
    Empty,
    #[error("content generator timed out after {0:?}")]
    Timeout(Duration),
}

/// Produces one candidate post per call.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// An accepted, recorded post.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub content: String,
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub theme: String,
    pub platform: Platform,
    /// 1-based index of the attempt that produced this post.
    pub attempts: usize,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no unique post for theme '{theme}' after {max_attempts} attempts")]
    Exhausted { theme: String, max_attempts: usize },
    #[error("accepted post could not be persisted: {source}")]
    Persist {
        post: Box<Post>,
        #[source]
        source: HistoryWriteError,
    },
}

/// Strips surrounding whitespace and a single pair of wrapping quotes.
fn clean_candidate(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

pub struct UniquePostGenerator {
    store: Arc<HistoryStore>,
    generator: Arc<dyn ContentGenerator>,
    policy: Arc<dyn DuplicatePolicy>,
    attempt_timeout: Duration,
    platform: Platform,
}

impl UniquePostGenerator {
    pub fn new(
        store: Arc<HistoryStore>,
        generator: Arc<dyn ContentGenerator>,
        policy: Arc<dyn DuplicatePolicy>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            policy,
            attempt_timeout,
            platform: Platform::Twitter,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub async fn generate_unique(
        &self,
        theme: &str,
        max_attempts: usize,
    ) -> Result<Post, GenerateError> {
        self.generate_request(GenerationRequest::new(theme, self.platform), max_attempts)
            .await
    }

    /// Requests candidates one at a time until the duplicate policy accepts one
    /// or `max_attempts` generator calls have been made.
    pub async fn generate_request(
        &self,
        request: GenerationRequest,
        max_attempts: usize,
    ) -> Result<Post, GenerateError> {
        for attempt in 1..=max_attempts {
            let candidate = match self.request_candidate(&request).await {
                Ok(candidate) => candidate,
                Err(e) => {
                    warn!(
                        "Generator: attempt {}/{} for '{}' produced nothing: {}",
                        attempt, max_attempts, request.theme, e
                    );
                    continue;
                }
            };

            match self.admit(candidate).await {
                Some(Admission::Accepted(record)) => {
                    info!(
                        "Generator: accepted post for '{}' on attempt {}/{}",
                        request.theme, attempt, max_attempts
                    );
                    return Ok(Self::post_from(record, &request, attempt));
                }
                Some(Admission::AcceptedUnpersisted(record, source)) => {
                    error!(
                        "Generator: post for '{}' accepted but history write failed: {}",
                        request.theme, source
                    );
                    return Err(GenerateError::Persist {
                        post: Box::new(Self::post_from(record, &request, attempt)),
                        source,
                    });
                }
                Some(Admission::Rejected(verdict)) => match verdict {
                    Verdict::NearDuplicate { score } => debug!(
                        "Generator: near-duplicate ({:.2}) for '{}', retrying ({}/{})",
                        score, request.theme, attempt, max_attempts
                    ),
                    _ => debug!(
                        "Generator: exact duplicate for '{}', retrying ({}/{})",
                        request.theme, attempt, max_attempts
                    ),
                },
                None => {}
            }
        }

        warn!(
            "Generator: giving up on '{}' after {} attempts",
            request.theme, max_attempts
        );
        Err(GenerateError::Exhausted {
            theme: request.theme,
            max_attempts,
        })
    }

    async fn request_candidate(
        &self,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        let raw = tokio::time::timeout(self.attempt_timeout, self.generator.generate(request))
            .await
            .map_err(|_| GenerationError::Timeout(self.attempt_timeout))??;

        let candidate = clean_candidate(&raw);
        if candidate.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(candidate)
    }

    /// Check-and-append runs on the blocking pool since backends do file or SQLite I/O.
    ///
    /// Once handed off, the admission runs to completion even if this future is
    /// dropped: the record then lands in history (and on disk) without being
    /// returned to anyone, but the history is never left half-written.
    async fn admit(&self, candidate: String) -> Option<Admission> {
        let store = self.store.clone();
        let policy = self.policy.clone();
        match tokio::task::spawn_blocking(move || store.admit(&candidate, policy.as_ref())).await {
            Ok(admission) => Some(admission),
            Err(e) => {
                error!("Generator: duplicate check task failed: {}", e);
                None
            }
        }
    }

    fn post_from(
        record: crate::history::PostRecord,
        request: &GenerationRequest,
        attempt: usize,
    ) -> Post {
        Post {
            content: record.content,
            hash: record.hash,
            timestamp: record.timestamp,
            theme: request.theme.clone(),
            platform: request.platform,
            attempts: attempt,
        }
    }
}
