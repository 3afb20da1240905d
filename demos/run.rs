//! Minimal runnable wiring for the daily task loop.
//!
//! Loads `tokens.txt` and `proxies.txt` from the working directory, asks
//! whether to route through proxies, prints orchestration events, and runs
//! cycles until Ctrl+C.

use cryptal_tasker::{Event, Orchestrator, RunConfig, credentials, run_until_shutdown};
use std::io::Write;

fn ask_yes_no(question: &str) -> bool {
    print!("{question} (y/n): ");
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    answer.trim().eq_ignore_ascii_case("y")
}

fn render(event: &Event) {
    match event {
        Event::CycleStarted { accounts } => println!("=== cycle started: {accounts} account(s) ==="),
        Event::AccountStarted { index, total, username, ip } => {
            println!("[{}/{}] {} (ip: {})", index + 1, total, username, ip);
        }
        Event::TaskCompleted { name, .. } => println!("  ✔ {name}"),
        Event::TaskSkipped { reason, .. } => println!("  - {reason}"),
        Event::TaskFailed { message, .. } => println!("  ✘ {message}"),
        Event::TasksProcessed { tally, .. } => {
            println!(
                "  processed {} task(s): {} completed, {} skipped",
                tally.total, tally.completed, tally.skipped
            );
        }
        Event::StatisticsFetched { statistics, .. } => {
            println!(
                "  credits: {}, rank: {}",
                statistics.total_credits, statistics.leaderboard_rank
            );
        }
        Event::AccountFailed { index, error } => println!("[{}] failed: {error}", index + 1),
        _ => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cryptal_tasker=info")),
        )
        .init();

    let tokens = credentials::load_tokens("tokens.txt").await?;

    let mut config = RunConfig::default();
    if ask_yes_no("Do you want to use a proxy?") {
        let proxies = credentials::load_proxies("proxies.txt").await;
        if proxies.is_empty() {
            println!("No proxies available, proceeding without proxy.");
        } else {
            config.use_proxy = true;
            config.proxies = proxies;
        }
    }

    let orchestrator = Orchestrator::new(config);
    let mut events = orchestrator.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            render(&event);
        }
    });

    run_until_shutdown(&orchestrator, &tokens).await;
    Ok(())
}
