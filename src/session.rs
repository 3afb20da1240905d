//! Per-account session operations
//!
//! An [`AccountSession`] owns one account's transport (client, token, retry
//! policy) and implements each endpoint's request/response contract: profile
//! lookup, task catalog merging, task completion dispatch, and statistics.
//! Expected failures come back as typed results; only the task and
//! statistics phases can return an [`Error`](crate::error::Error) and both
//! are handled per account by the orchestrator.

use crate::config::{RetryConfig, RunConfig};
use crate::error::{Error, Result};
use crate::request::{ENDPOINT_NOT_FOUND, Method, RequestOutcome, execute_with_retry};
use crate::transport;
use crate::types::{CompletionOutcome, Profile, Statistics, Task, TaskCategory, TaskStatus};
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

/// Canned feedback pool for the submit-feedback task
const FEEDBACK_MESSAGES: [&str; 4] = [
    "Great platform!",
    "Love the features!",
    "Very user-friendly.",
    "Excellent service!",
];

/// Task catalog entry as the API reports it
#[derive(Debug, Deserialize)]
struct CatalogTask {
    id: String,
    #[serde(default)]
    task_name: Option<String>,
    #[serde(default)]
    task_description: Option<String>,
    #[serde(default)]
    task_type: String,
    #[serde(default)]
    credits_reward: Option<i64>,
    #[serde(default)]
    is_daily: Option<bool>,
    #[serde(default)]
    is_one_time: Option<bool>,
}

/// Availability feed entry; only the id matters
#[derive(Debug, Deserialize)]
struct AvailableTask {
    id: String,
}

/// One account's view of the reward API
pub struct AccountSession {
    client: Client,
    token: String,
    base_url: String,
    ip_lookup_url: String,
    retry: RetryConfig,
    context: String,
}

impl AccountSession {
    /// Build a session for one account
    ///
    /// The client carries the fixed timeout and, when given, the account's
    /// proxy transport. The token is validated as a header value here so
    /// later calls cannot fail on it.
    pub fn new(
        config: &RunConfig,
        token: &str,
        proxy: Option<&str>,
        context: String,
    ) -> Result<Self> {
        transport::auth_headers(token)?;
        let client = transport::build_client(proxy)?;
        Ok(Self {
            client,
            token: token.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ip_lookup_url: config.ip_lookup_url.clone(),
            retry: config.retry.clone(),
            context,
        })
    }

    /// Username synthesized from the token when no profile is available
    fn fallback_username(&self) -> String {
        let prefix: String = self.token.chars().take(8).collect();
        format!("Token_{prefix}...")
    }

    async fn get(&self, path: &str) -> RequestOutcome {
        let headers = match transport::auth_headers(&self.token) {
            Ok(headers) => headers,
            Err(e) => {
                return RequestOutcome::Failure {
                    message: e.to_string(),
                    status: None,
                };
            }
        };
        let url = format!("{}{path}", self.base_url);
        execute_with_retry(&self.client, Method::Get, &url, None, headers, &self.retry).await
    }

    async fn post(&self, path: &str, payload: &Value) -> RequestOutcome {
        let headers = match transport::auth_headers(&self.token) {
            Ok(headers) => headers,
            Err(e) => {
                return RequestOutcome::Failure {
                    message: e.to_string(),
                    status: None,
                };
            }
        };
        let url = format!("{}{path}", self.base_url);
        execute_with_retry(
            &self.client,
            Method::Post,
            &url,
            Some(payload),
            headers,
            &self.retry,
        )
        .await
    }

    /// Fetch the account's display name from its social profiles
    ///
    /// Never fails the run: an empty or malformed response falls back to a
    /// username derived from the first 8 characters of the token.
    pub async fn fetch_profile(&self) -> Profile {
        match self.get("/apis/v2/auth/social-profiles").await {
            RequestOutcome::Success { body } => {
                let display_name = body
                    .pointer("/response/0/display_name")
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty());
                match display_name {
                    Some(name) => Profile {
                        username: name.to_string(),
                    },
                    None => {
                        warn!(
                            account = %self.context,
                            "no social profiles found, using token identifier"
                        );
                        Profile {
                            username: self.fallback_username(),
                        }
                    }
                }
            }
            RequestOutcome::Failure { message, .. } => {
                warn!(account = %self.context, error = %message, "failed to fetch profile");
                Profile {
                    username: self.fallback_username(),
                }
            }
        }
    }

    /// Look up the public IP this account's transport egresses from
    ///
    /// Unauthenticated and purely informational; failures become the
    /// strings `"Unknown"` / `"Error retrieving IP"`.
    pub async fn fetch_public_ip(&self) -> String {
        let outcome = execute_with_retry(
            &self.client,
            Method::Get,
            &self.ip_lookup_url,
            None,
            transport::standard_headers(),
            &self.retry,
        )
        .await;

        match outcome {
            RequestOutcome::Success { body } => body
                .get("ip")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            RequestOutcome::Failure { message, .. } => {
                warn!(account = %self.context, error = %message, "failed to get public IP");
                "Error retrieving IP".to_string()
            }
        }
    }

    /// Fetch and merge the account's task list
    ///
    /// Two calls: the full catalog and the ids still available to this
    /// account. A task is `Pending` iff its id appears in the available set.
    /// Excluded categories (`invite_friend`, `share_post`) are dropped
    /// before the merge. Either call failing is fatal for this account's
    /// task phase.
    pub async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        let catalog = self
            .fetch_task_data("/apis/v2/vibe-credit/tasks?take=100&skip=0", "full task list")
            .await?;
        let catalog: Vec<CatalogTask> = serde_json::from_value(catalog)
            .map_err(|e| Error::TaskFetch(format!("malformed full task list: {e}")))?;

        let available = self
            .fetch_task_data(
                "/apis/v2/vibe-credit/tasks/user-available?take=100&skip=0",
                "user-available tasks",
            )
            .await?;
        let available: Vec<AvailableTask> = serde_json::from_value(available)
            .map_err(|e| Error::TaskFetch(format!("malformed user-available tasks: {e}")))?;
        let available_ids: HashSet<String> =
            available.into_iter().map(|task| task.id).collect();

        let tasks = catalog
            .into_iter()
            .filter(|task| !TaskCategory::from(task.task_type.as_str()).is_excluded())
            .map(|task| {
                let status = if available_ids.contains(&task.id) {
                    TaskStatus::Pending
                } else {
                    TaskStatus::Completed
                };
                Task {
                    status,
                    category: TaskCategory::from(task.task_type.as_str()),
                    name: task.task_name.unwrap_or_else(|| "Unknown Task".to_string()),
                    description: task.task_description.unwrap_or_default(),
                    credits_reward: task.credits_reward.unwrap_or(0),
                    is_daily: task.is_daily.unwrap_or(false),
                    is_one_time: task.is_one_time.unwrap_or(false),
                    id: task.id,
                }
            })
            .collect();
        Ok(tasks)
    }

    /// Fetch one endpoint's `response.data` array
    async fn fetch_task_data(&self, path: &str, what: &str) -> Result<Value> {
        match self.get(path).await {
            RequestOutcome::Success { body } => body
                .pointer("/response/data")
                .cloned()
                .ok_or_else(|| Error::TaskFetch(format!("malformed {what} response"))),
            RequestOutcome::Failure { message, .. } => Err(Error::TaskFetch(format!(
                "failed to fetch {what}: {message}"
            ))),
        }
    }

    /// Attempt to complete one task, dispatching by category
    ///
    /// Unknown and excluded categories are skipped without any network
    /// call. A response body with `success: true`, or a message containing
    /// `"already completed"`, counts as success. A 404 means the endpoint
    /// does not exist and is reported as a skip, not a failure.
    pub async fn complete_task(&self, task: &Task) -> CompletionOutcome {
        let outcome = match &task.category {
            TaskCategory::DailyLogin => self.get("/apis/v2/vibe-credit/tasks/daily-login").await,
            TaskCategory::FollowCryptal => {
                self.get("/apis/v2/vibe-credit/tasks/follow-cryptal").await
            }
            TaskCategory::JoinDiscord => {
                self.get("/apis/v2/vibe-credit/tasks/follow-discord").await
            }
            TaskCategory::JoinWaitlist => {
                let payload = serde_json::json!({
                    "email": synthesized_email(),
                    "first_name": "",
                });
                self.post("/apis/v2/vibe-credit/tasks/waitlist", &payload)
                    .await
            }
            TaskCategory::SubmitFeedback => {
                let payload = serde_json::json!({ "feedback": random_feedback() });
                self.post("/apis/v2/vibe-credit/tasks/feedback", &payload)
                    .await
            }
            unsupported => {
                return CompletionOutcome::Skipped {
                    reason: format!("Skipped: {unsupported} not supported"),
                };
            }
        };

        match outcome {
            RequestOutcome::Success { body } => {
                let succeeded = body.get("success").and_then(Value::as_bool).unwrap_or(false);
                let message = body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if succeeded || message.contains("already completed") {
                    CompletionOutcome::Completed {
                        message: format!("Task \"{}\" completed or already completed", task.name),
                    }
                } else {
                    let reason = if message.is_empty() {
                        "Unknown error"
                    } else {
                        message
                    };
                    CompletionOutcome::Failed {
                        message: format!("Failed: {reason}"),
                    }
                }
            }
            RequestOutcome::Failure {
                status: Some(404), ..
            } => CompletionOutcome::Skipped {
                reason: format!("Skipped: {ENDPOINT_NOT_FOUND}"),
            },
            RequestOutcome::Failure { message, .. } => CompletionOutcome::Failed {
                message: format!("Failed: {message}"),
            },
        }
    }

    /// Fetch aggregate reward statistics
    ///
    /// `total_credits` and `leaderboard_rank` each default to `"N/A"` when
    /// absent from the response.
    pub async fn fetch_statistics(&self) -> Result<Statistics> {
        match self.get("/apis/v2/vibe-credit").await {
            RequestOutcome::Success { body } => {
                let data = body
                    .get("response")
                    .ok_or_else(|| Error::Statistics("malformed statistics response".to_string()))?;
                Ok(Statistics {
                    total_credits: display_value(data.get("total_credits")),
                    leaderboard_rank: display_value(data.get("leaderboard_rank")),
                })
            }
            RequestOutcome::Failure { message, .. } => Err(Error::Statistics(message)),
        }
    }
}

/// Random throwaway email for the waitlist task
fn synthesized_email() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..10000);
    format!("user{n}@gmail.com")
}

/// Random canned feedback message
fn random_feedback() -> &'static str {
    FEEDBACK_MESSAGES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FEEDBACK_MESSAGES[0])
}

/// Render a statistics field for display; absent or non-scalar values
/// become `"N/A"`
fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "N/A".to_string(),
    }
}
