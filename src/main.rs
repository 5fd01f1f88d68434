use subex::app::{App, Focus};
use subex::config::Config;
use subex::filters::FilterField;
use subex::logging;
use subex::source::graphql::GraphqlSource;
use subex::source::ChainSource;
use subex::ui;

use anyhow::{bail, Result};
use ratatui::{
    crossterm::{
        event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    },
    prelude::*,
};
use std::io::stdout;
use std::sync::Arc;
use tracing::{info, warn};
use tui_input::backend::crossterm::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    logging::init(&Config::config_dir()?, &config.log_level)?;

    if config.networks.is_empty() {
        bail!(
            "No networks configured. Add a [[networks]] entry with `name` and `api_url` to {:?}",
            Config::config_dir()?.join("config.toml")
        );
    }

    let source = config
        .networks
        .iter()
        .fold(GraphqlSource::new(config.poll_interval()), |source, network| {
            source.with_endpoint(&network.name, &network.api_url)
        });
    info!(networks = config.networks.len(), "starting subex");

    run_tui(config, Arc::new(source)).await
}

async fn run_tui<S: ChainSource>(config: Config, source: Arc<S>) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = App::new(config, source);

    let result = run_event_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn run_event_loop<S: ChainSource>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App<S>,
) -> Result<()> {
    loop {
        // Apply async results before drawing
        app.poll();
        terminal.draw(|frame| ui::draw(frame, app))?;

        // Yield so spawned fetches make progress between frames
        if !event::poll(std::time::Duration::from_millis(50))? {
            tokio::task::yield_now().await;
            continue;
        }

        let ev = event::read()?;
        let Event::Key(key) = &ev else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            app.should_quit = true;
        } else if let Focus::Filter(_) = app.focus {
            // Filter input mode
            match key.code {
                KeyCode::Enter => {
                    app.submit_filter();
                }
                KeyCode::Esc => app.cancel_filter(),
                _ => {
                    app.filter_input.handle_event(&ev);
                }
            }
        } else {
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => app.should_quit = true,
                KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
                KeyCode::Down | KeyCode::Char('j') => app.select_next(),
                KeyCode::Enter => {
                    app.open_selected();
                }
                KeyCode::Backspace | KeyCode::Char('b') => {
                    app.go_back();
                }
                KeyCode::Tab => app.toggle_list(),
                KeyCode::Char('m') => {
                    app.fetch_more();
                }
                KeyCode::Char('p') => {
                    app.edit_filter(FilterField::Pallet);
                }
                KeyCode::Char('c') => {
                    if !app.edit_filter(FilterField::CallName) {
                        app.edit_filter(FilterField::EventName);
                    }
                }
                KeyCode::Char('a') => {
                    app.edit_filter(FilterField::Address);
                }
                KeyCode::Char('x') => {
                    app.clear_filters();
                }
                KeyCode::Char(']') => {
                    app.cycle_pallet(true);
                }
                KeyCode::Char('[') => {
                    app.cycle_pallet(false);
                }
                KeyCode::Char('}') => {
                    app.cycle_member(true);
                }
                KeyCode::Char('{') => {
                    app.cycle_member(false);
                }
                KeyCode::Char('n') => {
                    if let Some(name) = app.cycle_network() {
                        if let Err(e) = app.config.set_default_network(&name) {
                            warn!(error = %e, "failed to remember network");
                        }
                    }
                }
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
