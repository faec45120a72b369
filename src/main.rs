mod app;
mod config;
mod engine;
mod ui;

use anyhow::{Context, Result};
use app::App;
use config::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use engine::Progress;
use psp_connectors::connector::Registry;
use psp_connectors::connectors::register_builtin;
use ratatui::prelude::*;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging() -> Result<()> {
    let path = log_path();
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = match load_config() {
        Some(cfg) => cfg,
        None => {
            let cfg = seed_default(&config_dir()).await?;
            save_config(&cfg)?;
            info!("wrote first-run config with a dummypay connector");
            cfg
        }
    };

    let mut registry = Registry::new();
    register_builtin(&mut registry)?;
    let app = App::install(&registry, &config).await;

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

async fn run_app(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, mut app: App) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Progress>();
    let mut cycles = Vec::new();

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        while let Ok(progress) = rx.try_recv() {
            app.apply(progress);
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Up => app.select_previous(),
                    KeyCode::Down => app.select_next(),
                    KeyCode::Char('r') => {
                        if let Some((cycle, states)) = app.start_cycle() {
                            let tx2 = tx.clone();
                            cycles.push(tokio::spawn(cycle.run(states, tx2)));
                        }
                    }
                    KeyCode::Char('x') => app.reset_states(),
                    _ => {}
                }
            }
        }

        cycles.retain(|h: &tokio::task::JoinHandle<()>| !h.is_finished());
    }

    // Dropping an in-flight fetch is the only cancellation connectors need.
    for h in cycles {
        h.abort();
    }

    Ok(())
}
