// src/main.rs

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use crossterm::{
    ExecutableCommand,
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::io::stdout;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

mod app;
mod cli;
mod config;
mod core;
mod logging;
mod ui;

use app::{App, AppState};
use cli::Cli;
use config::Settings;
use crate::core::error::ValidationError;
use crate::core::models::BatchReport;
use crate::core::probes::build_registry;
use crate::core::batch::{BatchOrchestrator, BatchRequest};

type BatchOutcome = Result<BatchReport, ValidationError>;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let log_path = logging::initialize_logging(cli.echo_logs())?;

    let settings = cli
        .apply(Settings::load().wrap_err("failed to load settings")?)
        .validated()
        .wrap_err("invalid settings")?;
    let invoker = settings.invoker();
    info!(probes = ?settings.probes, timeout = ?invoker.timeout(), log = %log_path.display(), "Starting.");

    let registry = build_registry(&settings.probes, &settings.probe_settings())?;
    let orchestrator = BatchOrchestrator::new(registry, invoker);

    if cli.is_interactive() {
        run_interactive(orchestrator).await?;
        Ok(ExitCode::SUCCESS)
    } else {
        run_headless(&orchestrator, &cli).await
    }
}

/// Runs one batch from the command line or a JSON body on stdin and prints the
/// report to stdout.
async fn run_headless(orchestrator: &BatchOrchestrator, cli: &Cli) -> Result<ExitCode> {
    let result = if cli.stdin {
        let body = std::io::read_to_string(std::io::stdin()).wrap_err("failed to read batch body from stdin")?;
        orchestrator.run_json(&body).await
    } else {
        orchestrator.run_targets(cli.targets.iter().cloned()).await
    };
    match result {
        Ok(report) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_table(&report));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            if cli.json {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            } else {
                eprintln!("error: {e}");
            }
            Ok(ExitCode::from(2))
        }
    }
}

/// One line per target and probe: `OK` or `FAIL` with the failure message.
fn render_table(report: &BatchReport) -> String {
    let mut out = String::new();
    for target in report.iter() {
        out.push_str(&target.domain);
        out.push('\n');
        if let Some(error) = &target.error {
            out.push_str(&format!("  !       {error}\n"));
        }
        for (kind, outcome) in target.outcomes() {
            match outcome.error_message() {
                None => out.push_str(&format!("  {:<7} OK\n", kind.name())),
                Some(message) => out.push_str(&format!("  {:<7} FAIL  {message}\n", kind.name())),
            }
        }
    }
    out
}

async fn run_interactive(orchestrator: BatchOrchestrator) -> Result<()> {
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;

    let outcome = event_loop(orchestrator).await;

    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    outcome
}

async fn event_loop(orchestrator: BatchOrchestrator) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut app = App::new();
    let (tx, mut rx) = mpsc::channel::<BatchOutcome>(1);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(&mut app, &orchestrator, &tx)?;
        }

        if let Ok(result) = rx.try_recv() {
            app.finish(result);
        }
        app.on_tick();
    }
    Ok(())
}

fn handle_events(app: &mut App, orchestrator: &BatchOrchestrator, tx: &mpsc::Sender<BatchOutcome>) -> Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        match app.state {
            AppState::Disclaimer => match key.code {
                KeyCode::Enter => app.acknowledge_disclaimer(),
                KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                _ => {}
            },
            AppState::Idle => handle_idle_input(app, key.code, orchestrator, tx),
            AppState::Running => {
                if key.code == KeyCode::Char('q') {
                    app.quit();
                }
            }
            AppState::Finished => handle_finished_input(app, key.code),
        }
    }
    Ok(())
}

fn handle_idle_input(app: &mut App, key_code: KeyCode, orchestrator: &BatchOrchestrator, tx: &mpsc::Sender<BatchOutcome>) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => {
            if let Some(request) = app.submit() {
                spawn_batch(orchestrator.clone(), request, tx.clone());
            }
        }
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('n') => app.reset(),
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        KeyCode::PageDown | KeyCode::Char('j') => app.scroll_detail_down(),
        KeyCode::PageUp | KeyCode::Char('k') => app.scroll_detail_up(),
        _ => {}
    }
}

fn spawn_batch(orchestrator: BatchOrchestrator, request: BatchRequest, tx: mpsc::Sender<BatchOutcome>) {
    tokio::spawn(async move {
        let result = orchestrator.run_batch(&request).await;
        if tx.send(result).await.is_err() {
            error!("UI went away before the batch finished.");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ProbeKind, ProbeOutcome, TargetReport};
    use serde_json::json;

    #[test]
    fn table_lists_every_probe_per_target() {
        let mut target = TargetReport::new("example.com");
        target.record(ProbeKind::Ssl, ProbeOutcome::Success(json!({ "valid": true })));
        target.record(ProbeKind::Dns, ProbeOutcome::failure("no records"));
        let degraded = TargetReport::degraded("down.com", [ProbeKind::Ssl], "task aborted");
        let report = BatchReport { results: vec![target, degraded] };

        let table = render_table(&report);

        assert_eq!(
            table,
            "example.com\n  ssl     OK\n  dns     FAIL  no records\n\
             down.com\n  !       task aborted\n  ssl     FAIL  internal error: task aborted\n"
        );
    }
}
