mod cli;
mod field_selectors;
mod kubernetes;
mod output;
mod parser;
mod planner;
mod types;
mod ui;
mod utils;
mod validator;

use chrono::Local;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use kube::Client;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use cli::Cli;
use output::Layout;
use planner::QueryPlan;
use types::QueryOutcome;
use ui::{App, AppEvent};

const LOG_FILE: &str = "/tmp/kubesql.log";

/// Everything needed to re-run a prepared query
#[derive(Clone)]
struct QueryRunner {
    clients: Arc<Vec<(String, Client)>>,
    namespaces: Arc<Vec<String>>,
    plan: Arc<QueryPlan>,
    concurrency: usize,
}

impl QueryRunner {
    async fn run(&self) -> QueryOutcome {
        kubernetes::execute(&self.clients, &self.namespaces, &self.plan, self.concurrency).await
    }

    /// Run in the background and deliver the outcome as an event.
    fn spawn(&self, tx: mpsc::Sender<AppEvent>) {
        let runner = self.clone();
        tokio::spawn(async move {
            let outcome = runner.run().await;
            let _ = tx.send(AppEvent::Refreshed(outcome)).await;
        });
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.watch && !std::io::stdout().is_terminal() {
        anyhow::bail!("--watch needs an interactive terminal");
    }

    init_tracing(&cli);

    let sql = cli.query_text()?;
    let parsed = parser::parse_sql(&sql)?;
    debug!(
        "Parsed query: namespaces={:?} contexts={:?} filter={:?}",
        parsed.namespaces, parsed.contexts, parsed.filter
    );

    validator::validate_namespaces(&parsed.namespaces)?;
    validator::validate_fields(&parsed.filter)?;
    let plan = planner::build_plan(&parsed.filter)?;
    for target in &plan.selectors {
        debug!("Planned {} with fieldSelector={}", target.kind, target.selector);
    }

    let kubeconfig = kubernetes::load_kubeconfig(cli.kubeconfig.as_deref())?;
    validator::validate_contexts(&kubeconfig, &parsed.contexts)?;
    let clients = kubernetes::connect(&kubeconfig, &parsed.contexts).await?;

    let layout = Layout {
        contexts: parsed.contexts.clone(),
        namespaces: parsed.namespaces.clone(),
        kinds: plan.kinds(),
    };
    let runner = QueryRunner {
        clients: Arc::new(clients),
        namespaces: Arc::new(parsed.namespaces),
        plan: Arc::new(plan),
        concurrency: usize::try_from(cli.concurrency).unwrap_or(usize::MAX),
    };

    if cli.watch {
        run_tui_mode(&cli, sql, parsed.contexts, runner).await
    } else {
        run_once(&cli, &layout, runner).await
    }
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose { "debug" } else { "warn" };
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter))
    };

    if cli.watch {
        // In TUI mode: write logs to a file to avoid corrupting the display
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(LOG_FILE)
        {
            Ok(log_file) => tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file))
                .init(),
            Err(e) => {
                eprintln!("Warning: Could not open {} for logging: {}", LOG_FILE, e);
                tracing_subscriber::fmt()
                    .with_env_filter(env_filter())
                    .with_writer(std::io::sink)
                    .init();
            }
        }
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run_once(cli: &Cli, layout: &Layout, runner: QueryRunner) -> anyhow::Result<()> {
    let outcome = runner.run().await;
    info!("Query matched {} resources", outcome.total());

    println!("{}", output::render(&outcome, layout, &cli.output)?);

    // Failures were already logged; report them through the exit status
    if !outcome.failures.is_empty() {
        anyhow::bail!("{} lookup(s) failed", outcome.failures.len());
    }
    Ok(())
}

async fn run_tui_mode(
    cli: &Cli,
    query: String,
    contexts: Vec<String>,
    runner: QueryRunner,
) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = tui_loop(&mut terminal, cli, App::new(query, contexts), runner).await;

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    cli: &Cli,
    mut app: App,
    runner: QueryRunner,
) -> anyhow::Result<()> {
    // Create event channel
    let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(100);

    // Spawn keyboard event loop
    let event_tx_clone = event_tx.clone();
    tokio::spawn(async move {
        ui::events::event_loop(event_tx_clone).await;
    });

    let period = Duration::from_secs(cli.interval);
    let mut refresh_interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    refresh_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut render_interval = tokio::time::interval(Duration::from_millis(16)); // ~60 FPS
    render_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    app.request_refresh();
    let mut should_quit = false;

    while !should_quit {
        if app.refresh_requested && !app.refreshing {
            app.refresh_requested = false;
            app.refreshing = true;
            runner.spawn(event_tx.clone());
        }

        tokio::select! {
            _ = render_interval.tick() => {
                ui::renderer::render(terminal, &app)?;
            }
            _ = refresh_interval.tick() => {
                if !app.paused {
                    app.request_refresh();
                }
            }
            event = event_rx.recv() => {
                match event {
                    Some(AppEvent::Key(key)) => {
                        should_quit = !ui::events::handle_key_event(&mut app, key);
                        // Render immediately after keyboard input for responsiveness
                        ui::renderer::render(terminal, &app)?;
                    }
                    Some(AppEvent::Refreshed(outcome)) => {
                        debug!(
                            "Refresh #{} matched {} resources",
                            app.refresh_count + 1,
                            outcome.total()
                        );
                        app.apply_outcome(outcome, Local::now());
                    }
                    None => should_quit = true,
                }
            }
        }
    }

    Ok(())
}
