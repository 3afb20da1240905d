//! Account and cycle orchestration
//!
//! Drives the per-account state machine (profile → tasks → task loop →
//! statistics) strictly sequentially, with fixed pacing delays bounding the
//! request rate. One account's failure never aborts a cycle; one task's
//! failure never aborts its account. The delay primitive is injected via
//! [`Pacer`] so a single cycle can be tested deterministically, and the
//! daily outer loop is just [`run_cycle`](Orchestrator::run_cycle) plus a
//! sleep.

use crate::config::RunConfig;
use crate::error::Result;
use crate::session::AccountSession;
use crate::types::{CompletionOutcome, Event, TaskStatus, TaskTally};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Capacity of the event channel; slow consumers lose old events rather
/// than blocking the orchestrator
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Injectable delay primitive
///
/// Production uses [`TokioPacer`]; tests substitute [`NoopPacer`] so a full
/// cycle runs without real sleeps.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Suspend for the given duration
    async fn pause(&self, delay: Duration);
}

/// Pacer backed by `tokio::time::sleep`
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Pacer that returns immediately; for tests and dry runs
pub struct NoopPacer;

#[async_trait]
impl Pacer for NoopPacer {
    async fn pause(&self, _delay: Duration) {}
}

/// Sequential multi-account orchestrator
///
/// Owns the run configuration (including the proxy list) for the whole run.
/// Accounts are processed one at a time; nothing here runs concurrently.
pub struct Orchestrator {
    config: RunConfig,
    pacer: Arc<dyn Pacer>,
    event_tx: broadcast::Sender<Event>,
}

impl Orchestrator {
    /// Create an orchestrator with real pacing delays
    pub fn new(config: RunConfig) -> Self {
        Self::with_pacer(config, Arc::new(TokioPacer))
    }

    /// Create an orchestrator with a custom delay primitive
    pub fn with_pacer(config: RunConfig, pacer: Arc<dyn Pacer>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            pacer,
            event_tx,
        }
    }

    /// Subscribe to orchestration events
    ///
    /// Each receiver gets every event emitted after subscription. Dropping
    /// all receivers is fine; emission never blocks.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    /// Run one full pass over all accounts
    ///
    /// An empty token list logs an error and does nothing. Each account is
    /// wrapped so an unexpected failure (for example an unusable token) is
    /// logged and the cycle moves on; a fixed pacing delay follows every
    /// account.
    pub async fn run_cycle(&self, tokens: &[String]) {
        if tokens.is_empty() {
            error!("no accounts loaded, skipping cycle");
            return;
        }

        self.emit(Event::CycleStarted {
            accounts: tokens.len(),
        });

        let total = tokens.len();
        for (index, token) in tokens.iter().enumerate() {
            let proxy = self.config.proxy_for_account(index);
            if let Err(e) = self.process_account(token, proxy, index, total).await {
                error!(
                    account = index + 1,
                    total,
                    error = %e,
                    "account processing failed"
                );
                self.emit(Event::AccountFailed {
                    index,
                    error: e.to_string(),
                });
            }
            self.pacer.pause(self.config.pacing.account_delay).await;
        }

        self.emit(Event::CycleFinished);
    }

    /// Run cycles forever, sleeping the configured interval between them
    ///
    /// There is no exit condition; callers wanting shutdown handling should
    /// race this against a signal, see
    /// [`run_until_shutdown`](crate::run_until_shutdown).
    pub async fn run_forever(&self, tokens: &[String]) {
        loop {
            self.run_cycle(tokens).await;
            info!(
                interval_secs = self.config.pacing.cycle_interval.as_secs(),
                "cycle completed, waiting for next cycle"
            );
            self.pacer.pause(self.config.pacing.cycle_interval).await;
        }
    }

    /// Process one account: profile, tasks, task loop, statistics
    ///
    /// A task-fetch failure skips the rest of the account (statistics
    /// included) without being an error; only setup problems propagate to
    /// the caller's catch-all.
    async fn process_account(
        &self,
        token: &str,
        proxy: Option<&str>,
        index: usize,
        total: usize,
    ) -> Result<()> {
        let context = format!("Account {}/{}", index + 1, total);
        info!(account = %context, proxy = proxy.unwrap_or("none"), "starting account processing");

        let session = AccountSession::new(&self.config, token, proxy, context.clone())?;

        let profile = session.fetch_profile().await;
        let ip = session.fetch_public_ip().await;
        info!(account = %context, username = %profile.username, ip = %ip, "account info");
        self.emit(Event::AccountStarted {
            index,
            total,
            username: profile.username,
            ip,
        });

        let mut tasks = match session.fetch_tasks().await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!(account = %context, error = %e, "skipping account, task fetch failed");
                return Ok(());
            }
        };
        self.emit(Event::TasksFetched {
            index,
            tasks: tasks.clone(),
        });

        if tasks.is_empty() {
            info!(account = %context, "no tasks available");
        } else {
            let mut tally = TaskTally {
                total: tasks.len(),
                ..Default::default()
            };

            for task in &mut tasks {
                if task.status == TaskStatus::Pending {
                    match session.complete_task(task).await {
                        CompletionOutcome::Completed { message } => {
                            task.status = TaskStatus::Completed;
                            tally.completed += 1;
                            info!(account = %context, task_id = %task.id, %message, "task verified");
                            self.emit(Event::TaskCompleted {
                                index,
                                task_id: task.id.clone(),
                                name: task.name.clone(),
                            });
                        }
                        CompletionOutcome::Skipped { reason } => {
                            tally.skipped += 1;
                            warn!(account = %context, task_id = %task.id, %reason, "task skipped");
                            self.emit(Event::TaskSkipped {
                                index,
                                task_id: task.id.clone(),
                                reason,
                            });
                        }
                        CompletionOutcome::Failed { message } => {
                            warn!(account = %context, task_id = %task.id, %message, "task failed");
                            self.emit(Event::TaskFailed {
                                index,
                                task_id: task.id.clone(),
                                message,
                            });
                        }
                    }
                }
                self.pacer.pause(self.config.pacing.task_delay).await;
            }

            info!(
                account = %context,
                total = tally.total,
                completed = tally.completed,
                skipped = tally.skipped,
                "processed tasks"
            );
            self.emit(Event::TasksProcessed { index, tally });
        }

        match session.fetch_statistics().await {
            Ok(statistics) => {
                info!(
                    account = %context,
                    total_credits = %statistics.total_credits,
                    leaderboard_rank = %statistics.leaderboard_rank,
                    "account statistics"
                );
                self.emit(Event::StatisticsFetched { index, statistics });
            }
            Err(e) => {
                error!(account = %context, error = %e, "skipping stats due to error");
                return Ok(());
            }
        }

        info!(account = %context, "completed account processing");
        self.emit(Event::AccountFinished { index });
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_orchestrator(server: &MockServer) -> Orchestrator {
        let config = RunConfig {
            base_url: server.uri(),
            ip_lookup_url: format!("{}/ip-lookup", server.uri()),
            retry: RetryConfig {
                max_attempts: 1,
                initial_backoff: Duration::from_millis(1),
                ..Default::default()
            },
            ..Default::default()
        };
        Orchestrator::with_pacer(config, Arc::new(NoopPacer))
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn mount_account_basics(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/apis/v2/auth/social-profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": [{"display_name": "tester"}]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ip-lookup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ip": "198.51.100.7"})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/vibe-credit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"total_credits": 30, "leaderboard_rank": 12}
            })))
            .mount(server)
            .await;
    }

    // -----------------------------------------------------------------------
    // Scenario: 2 tokens, 3-task catalog (invite_friend excluded,
    // daily_login pending, join_discord completed)
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn cycle_processes_pending_tasks_and_never_touches_completed_ones() {
        let server = MockServer::start().await;
        mount_account_basics(&server).await;

        Mock::given(method("GET"))
            .and(path("/apis/v2/vibe-credit/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"data": [
                    {"id": "t1", "task_name": "Invite", "task_type": "invite_friend"},
                    {"id": "t2", "task_name": "Login", "task_type": "daily_login"},
                    {"id": "t3", "task_name": "Discord", "task_type": "join_discord"},
                ]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/vibe-credit/tasks/user-available"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"data": [{"id": "t2"}]}
            })))
            .mount(&server)
            .await;
        // daily_login is pending for both accounts: exactly one call each
        Mock::given(method("GET"))
            .and(path("/apis/v2/vibe-credit/tasks/daily-login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .expect(2)
            .mount(&server)
            .await;
        // join_discord is already completed: its endpoint is never called
        Mock::given(method("GET"))
            .and(path("/apis/v2/vibe-credit/tasks/follow-discord"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .expect(0)
            .mount(&server)
            .await;

        let orchestrator = test_orchestrator(&server);
        let mut rx = orchestrator.subscribe();

        let tokens = vec!["token-one".to_string(), "token-two".to_string()];
        orchestrator.run_cycle(&tokens).await;

        let events = drain(&mut rx);

        // The processed task list has exactly 2 entries (invite_friend dropped)
        let fetched: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::TasksFetched { tasks, .. } => Some(tasks),
                _ => None,
            })
            .collect();
        assert_eq!(fetched.len(), 2, "one TasksFetched per account");
        for tasks in &fetched {
            assert_eq!(tasks.len(), 2);
            assert!(tasks.iter().all(|t| t.id != "t1"));
        }

        // daily_login completed once per account
        let completed: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, Event::TaskCompleted { task_id, .. } if task_id == "t2"))
            .collect();
        assert_eq!(completed.len(), 2);

        // tallies: 1 completed, 0 skipped, 2 total
        for event in &events {
            if let Event::TasksProcessed { tally, .. } = event {
                assert_eq!(*tally, TaskTally { completed: 1, skipped: 0, total: 2 });
            }
        }

        // both accounts finished
        let finished = events
            .iter()
            .filter(|e| matches!(e, Event::AccountFinished { .. }))
            .count();
        assert_eq!(finished, 2);
    }

    // -----------------------------------------------------------------------
    // Empty credential list: zero processing, no panic
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn empty_token_list_performs_no_account_processing() {
        let server = MockServer::start().await;
        let orchestrator = test_orchestrator(&server);
        let mut rx = orchestrator.subscribe();

        orchestrator.run_cycle(&[]).await;

        assert!(drain(&mut rx).is_empty(), "no events for an empty cycle");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Task-fetch failure skips the statistics phase but not the cycle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn task_fetch_failure_skips_statistics_and_continues_the_cycle() {
        let server = MockServer::start().await;
        mount_account_basics(&server).await;

        Mock::given(method("GET"))
            .and(path("/apis/v2/vibe-credit/tasks"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let orchestrator = test_orchestrator(&server);
        let mut rx = orchestrator.subscribe();

        let tokens = vec!["token-one".to_string(), "token-two".to_string()];
        orchestrator.run_cycle(&tokens).await;

        let events = drain(&mut rx);
        assert!(
            !events.iter().any(|e| matches!(e, Event::StatisticsFetched { .. })),
            "statistics must be skipped when the task fetch fails"
        );
        assert!(
            events.iter().any(|e| matches!(e, Event::CycleFinished)),
            "the cycle still runs to completion"
        );
        // Both accounts were attempted
        let started = events
            .iter()
            .filter(|e| matches!(e, Event::AccountStarted { .. }))
            .count();
        assert_eq!(started, 2);
    }

    // -----------------------------------------------------------------------
    // A failed task does not abort the account
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn failed_task_does_not_abort_the_account() {
        let server = MockServer::start().await;
        mount_account_basics(&server).await;

        Mock::given(method("GET"))
            .and(path("/apis/v2/vibe-credit/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"data": [
                    {"id": "bad", "task_name": "Login", "task_type": "daily_login"},
                    {"id": "good", "task_name": "Feedback", "task_type": "submit_feedback"},
                ]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/vibe-credit/tasks/user-available"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"data": [{"id": "bad"}, {"id": "good"}]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/vibe-credit/tasks/daily-login"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/apis/v2/vibe-credit/tasks/feedback"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let orchestrator = test_orchestrator(&server);
        let mut rx = orchestrator.subscribe();

        orchestrator.run_cycle(&["only-token".to_string()]).await;

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(e, Event::TaskFailed { task_id, .. } if task_id == "bad")));
        assert!(events.iter().any(|e| matches!(e, Event::TaskCompleted { task_id, .. } if task_id == "good")));
        for event in &events {
            if let Event::TasksProcessed { tally, .. } = event {
                assert_eq!(*tally, TaskTally { completed: 1, skipped: 0, total: 2 });
            }
        }
        assert!(events.iter().any(|e| matches!(e, Event::AccountFinished { .. })));
    }

    // -----------------------------------------------------------------------
    // Unsupported categories count as skipped in the tally
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn unsupported_pending_task_increments_the_skip_counter() {
        let server = MockServer::start().await;
        mount_account_basics(&server).await;

        Mock::given(method("GET"))
            .and(path("/apis/v2/vibe-credit/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"data": [
                    {"id": "m1", "task_name": "Mystery", "task_type": "watch_video"},
                ]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/vibe-credit/tasks/user-available"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"data": [{"id": "m1"}]}
            })))
            .mount(&server)
            .await;

        let orchestrator = test_orchestrator(&server);
        let mut rx = orchestrator.subscribe();

        orchestrator.run_cycle(&["only-token".to_string()]).await;

        let events = drain(&mut rx);
        assert!(events.iter().any(
            |e| matches!(e, Event::TaskSkipped { reason, .. } if reason.contains("not supported"))
        ));
        for event in &events {
            if let Event::TasksProcessed { tally, .. } = event {
                assert_eq!(*tally, TaskTally { completed: 0, skipped: 1, total: 1 });
            }
        }
    }
}
