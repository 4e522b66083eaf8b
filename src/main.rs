//! dccmon - DCC Signal Monitor
//!
//! A terminal UI application for decoding and inspecting DCC
//! model-railway packets recovered from raw edge-timing streams.

mod app;
mod decoder;
mod export;
mod packet;
mod signal;
mod storage;
mod ui;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Write};
use std::panic;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, InputMode};
use ui::draw_ui;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Restore the terminal to normal state (for panic handler)
fn restore_terminal_panic() {
    // Disable raw mode first
    let _ = disable_raw_mode();

    // Write escape sequences directly to stdout
    let mut stdout = io::stdout();

    // Leave alternate screen: ESC [ ? 1049 l
    let _ = stdout.write_all(b"\x1b[?1049l");

    // Show cursor: ESC [ ? 25 h
    let _ = stdout.write_all(b"\x1b[?25h");

    let _ = stdout.flush();
}

fn main() -> Result<()> {
    // Check if we have a TTY first
    if !atty::is(atty::Stream::Stdout) {
        eprintln!("Error: dccmon requires a terminal (TTY) to run.");
        eprintln!("Please run this program in a real terminal, not via a script or IDE runner.");
        std::process::exit(1);
    }

    // Set up panic hook to restore terminal on panic
    let default_panic = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        restore_terminal_panic();
        default_panic(panic_info);
    }));

    // Initialize logging to a file (not stdout, which would corrupt TUI)
    let log_file = crate::storage::resolve_config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from(".").join("dccmon"))
        .join("dccmon.log");

    // Create log directory if needed
    if let Some(parent) = log_file.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    // Set up file-based logging
    if let Ok(file) = std::fs::File::create(&log_file) {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "dccmon=info".into()),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    }

    tracing::info!("Starting dccmon v{}", VERSION);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app and run
    let mut app = App::new()?;
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal properly using the terminal's backend
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {err:?}");
        return Err(err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| draw_ui(f, app))?;

        if event::poll(std::time::Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match app.input_mode {
                        InputMode::Normal => match key.code {
                            KeyCode::Char('q') => return Ok(()),
                            KeyCode::Char(':') => {
                                app.input_mode = InputMode::Command;
                                app.command_input.clear();
                            }
                            KeyCode::Char('j') | KeyCode::Down => {
                                app.next_packet();
                            }
                            KeyCode::Char('k') | KeyCode::Up => {
                                app.previous_packet();
                            }
                            KeyCode::Char('g') => {
                                app.play_demo();
                            }
                            KeyCode::Char('l') => {
                                app.open_load_browser();
                            }
                            KeyCode::Char('s') => {
                                app.stop_playback();
                                app.status_message = Some("Playback stopped".to_string());
                            }
                            KeyCode::Char('c') => {
                                app.clear_session();
                            }
                            KeyCode::Char('e') => {
                                app.export_log(None);
                            }
                            KeyCode::Char('h') => {
                                app.input_mode = InputMode::Help;
                                app.overlay_scroll = 0;
                            }
                            KeyCode::Esc => {
                                app.selected_packet = None;
                                app.last_error = None;
                            }
                            _ => {}
                        },

                        InputMode::Command => match key.code {
                            KeyCode::Enter => {
                                let command = app.command_input.clone();
                                app.execute_command(&command)?;
                                if app.quit_requested {
                                    return Ok(());
                                }
                                app.command_input.clear();
                                if app.input_mode == InputMode::Command {
                                    app.input_mode = InputMode::Normal;
                                }
                            }
                            KeyCode::Char(c) => {
                                app.command_input.push(c);
                            }
                            KeyCode::Backspace => {
                                app.command_input.pop();
                            }
                            KeyCode::Esc => {
                                app.command_input.clear();
                                app.input_mode = InputMode::Normal;
                            }
                            _ => {}
                        },

                        InputMode::LoadFileBrowser => {
                            const VISIBLE: usize = 16;
                            match key.code {
                                KeyCode::Esc => {
                                    app.close_load_browser();
                                }
                                KeyCode::Enter => {
                                    app.load_browser_enter();
                                }
                                KeyCode::Up | KeyCode::Char('k') => {
                                    if app.load_browser_selected > 0 {
                                        app.load_browser_selected -= 1;
                                        if app.load_browser_selected < app.load_browser_scroll {
                                            app.load_browser_scroll = app.load_browser_selected;
                                        }
                                    }
                                }
                                KeyCode::Down | KeyCode::Char('j') => {
                                    let max = app.load_browser_entries.len().saturating_sub(1);
                                    if app.load_browser_selected < max {
                                        app.load_browser_selected += 1;
                                        if app.load_browser_selected
                                            >= app.load_browser_scroll + VISIBLE
                                        {
                                            app.load_browser_scroll =
                                                app.load_browser_selected - VISIBLE + 1;
                                        }
                                    }
                                }
                                _ => {}
                            }
                        }

                        InputMode::Help => match key.code {
                            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('h')
                            | KeyCode::Char('q') => {
                                app.input_mode = InputMode::Normal;
                            }
                            KeyCode::Up | KeyCode::Char('k') => {
                                app.overlay_scroll = app.overlay_scroll.saturating_sub(1);
                            }
                            KeyCode::Down | KeyCode::Char('j') => {
                                app.overlay_scroll = app.overlay_scroll.saturating_add(1);
                            }
                            _ => {}
                        },
                    }
                }
            }
        }

        // Pick up feeder events and drain the edge buffer
        app.pump();
    }
}
