//! Core types and events for cryptal-tasker

use serde::{Deserialize, Serialize};

/// Category of a reward task, as reported by the task catalog
///
/// The API identifies categories by snake_case strings. Supported categories
/// map to a dedicated completion endpoint; `InviteFriend` and `SharePost` are
/// recognized but excluded from processing entirely; anything else falls into
/// `Other` and is skipped without a network call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskCategory {
    /// Daily login check-in
    DailyLogin,
    /// Follow the platform's social account
    FollowCryptal,
    /// Join the platform Discord server
    JoinDiscord,
    /// Join the product waitlist (POST with a synthesized email)
    JoinWaitlist,
    /// Submit product feedback (POST with a canned message)
    SubmitFeedback,
    /// Referral task — excluded from processing
    InviteFriend,
    /// Social sharing task — excluded from processing
    SharePost,
    /// Unknown category string, preserved verbatim
    Other(String),
}

impl TaskCategory {
    /// The category string as the API reports it
    pub fn as_str(&self) -> &str {
        match self {
            TaskCategory::DailyLogin => "daily_login",
            TaskCategory::FollowCryptal => "follow_cryptal",
            TaskCategory::JoinDiscord => "join_discord",
            TaskCategory::JoinWaitlist => "join_waitlist",
            TaskCategory::SubmitFeedback => "submit_feedback",
            TaskCategory::InviteFriend => "invite_friend",
            TaskCategory::SharePost => "share_post",
            TaskCategory::Other(s) => s,
        }
    }

    /// Categories that are dropped from the task list before processing
    pub fn is_excluded(&self) -> bool {
        matches!(self, TaskCategory::InviteFriend | TaskCategory::SharePost)
    }
}

impl From<&str> for TaskCategory {
    fn from(s: &str) -> Self {
        match s {
            "daily_login" => TaskCategory::DailyLogin,
            "follow_cryptal" => TaskCategory::FollowCryptal,
            "join_discord" => TaskCategory::JoinDiscord,
            "join_waitlist" => TaskCategory::JoinWaitlist,
            "submit_feedback" => TaskCategory::SubmitFeedback,
            "invite_friend" => TaskCategory::InviteFriend,
            "share_post" => TaskCategory::SharePost,
            other => TaskCategory::Other(other.to_string()),
        }
    }
}

impl From<String> for TaskCategory {
    fn from(s: String) -> Self {
        TaskCategory::from(s.as_str())
    }
}

impl From<TaskCategory> for String {
    fn from(c: TaskCategory) -> Self {
        c.as_str().to_string()
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Completion state of a task, derived at fetch time
///
/// A task is `Pending` iff its id appears in the user-available id set
/// returned by the availability endpoint; absence means `Completed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Still available to this account
    Pending,
    /// Already completed (or no longer available)
    Completed,
}

/// One reward-eligible task, merged from the catalog and availability feeds
///
/// Constructed fresh each cycle and discarded at the end of it; the only
/// mutation is flipping `status` to `Completed` after a successful
/// completion call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque task identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Task category (drives endpoint dispatch)
    pub category: TaskCategory,
    /// Credit value awarded on completion (0 when absent)
    pub credits_reward: i64,
    /// Whether the task recurs daily
    pub is_daily: bool,
    /// Whether the task can only ever be completed once
    pub is_one_time: bool,
    /// Completion state at fetch time
    pub status: TaskStatus,
}

/// Result of one completion attempt for a single task
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The task was completed (or the API reported it already was)
    Completed {
        /// Human-readable confirmation
        message: String,
    },
    /// The task was skipped — unsupported category or missing endpoint
    Skipped {
        /// Why the task was skipped
        reason: String,
    },
    /// The completion call failed after retries
    Failed {
        /// The failure message from the last attempt
        message: String,
    },
}

/// Minimal profile information for one account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name from the first social profile, or a token-derived fallback
    pub username: String,
}

/// Aggregate reward statistics for one account
///
/// Values are kept as display strings because the API mixes numbers and
/// strings; missing fields default to `"N/A"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Total credits earned
    pub total_credits: String,
    /// Current leaderboard rank
    pub leaderboard_rank: String,
}

/// Per-account tally after one task loop
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTally {
    /// Tasks completed this pass
    pub completed: usize,
    /// Tasks skipped (unsupported or endpoint missing)
    pub skipped: usize,
    /// Total tasks processed (after category exclusion)
    pub total: usize,
}

/// Events emitted during orchestration
///
/// Consumers subscribe via [`Orchestrator::subscribe`](crate::Orchestrator::subscribe)
/// and render these however they like (log lines, tables, progress bars).
/// The orchestrator never blocks on slow consumers.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A full pass over all accounts began
    CycleStarted {
        /// Number of accounts in this cycle
        accounts: usize,
    },
    /// Processing started for one account
    AccountStarted {
        /// 0-based account index
        index: usize,
        /// Total number of accounts
        total: usize,
        /// Resolved username (may be the token-derived fallback)
        username: String,
        /// Public IP seen for this account's transport, or "Unknown"
        ip: String,
    },
    /// The merged task list for one account is known
    TasksFetched {
        /// 0-based account index
        index: usize,
        /// The processed task list (exclusions already applied)
        tasks: Vec<Task>,
    },
    /// One task completed successfully
    TaskCompleted {
        /// 0-based account index
        index: usize,
        /// Task identifier
        task_id: String,
        /// Task display name
        name: String,
    },
    /// One task was skipped
    TaskSkipped {
        /// 0-based account index
        index: usize,
        /// Task identifier
        task_id: String,
        /// Why the task was skipped
        reason: String,
    },
    /// One task failed after retries
    TaskFailed {
        /// 0-based account index
        index: usize,
        /// Task identifier
        task_id: String,
        /// The failure message
        message: String,
    },
    /// The task loop for one account finished
    TasksProcessed {
        /// 0-based account index
        index: usize,
        /// Aggregate counts for the pass
        tally: TaskTally,
    },
    /// Statistics were fetched for one account
    StatisticsFetched {
        /// 0-based account index
        index: usize,
        /// The account's aggregate statistics
        statistics: Statistics,
    },
    /// Processing finished for one account
    AccountFinished {
        /// 0-based account index
        index: usize,
    },
    /// One account failed in an unexpected way (cycle continues)
    AccountFailed {
        /// 0-based account index
        index: usize,
        /// The error message
        error: String,
    },
    /// A full pass over all accounts finished
    CycleFinished,
}
