mod config;
mod events;
mod server;
mod tui;

use std::io;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tiltrace::{Difficulty, LinkLossSimulation, SessionConfig, TrackKind};

use config::ServerConfig;
use server::RaceHost;
use tui::TuiState;

#[derive(Parser)]
#[command(name = "tiltrace-server")]
#[command(about = "Tilt race base station")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = tiltrace::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = 20, help = "Physics tick in ms")]
    tick_ms: u64,

    #[arg(short, long, default_value = "Random Blocks", help = "Map type")]
    map: String,

    #[arg(short, long, default_value = "Easy")]
    difficulty: String,

    #[arg(long, help = "Seed for reproducible maps")]
    seed: Option<u64>,

    #[arg(long)]
    headless: bool,

    #[arg(long, help = "Keep racing after the last handset leaves")]
    no_auto_stop: bool,

    #[arg(long, default_value_t = 0.0, help = "Inbound frame loss percentage (0-100)")]
    loss_percent: f32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bind_addr = format!("{}:{}", args.bind, args.port);

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let track_kind = TrackKind::from_name(&args.map);
    let difficulty = match args.difficulty.parse::<Difficulty>() {
        Ok(level) => Some(level),
        Err(e) => {
            log::warn!("{}, maps will have no obstructions", e);
            None
        }
    };

    let link_loss = (args.loss_percent > 0.0).then(|| LinkLossSimulation::new(args.loss_percent));

    let config = ServerConfig {
        tick: Duration::from_millis(args.tick_ms),
        track_kind,
        difficulty,
        seed: args.seed,
        link_loss,
        session: SessionConfig {
            auto_stop: !args.no_auto_stop,
            ..Default::default()
        },
    };

    let mut host = RaceHost::new(&bind_addr, config)?;

    if args.headless {
        log::info!("Host listening on {}", host.local_addr());
        host.run();
    } else {
        run_with_tui(&mut host, track_kind, difficulty.unwrap_or(Difficulty::Easy))?;
    }

    Ok(())
}

fn run_with_tui(host: &mut RaceHost, track_kind: TrackKind, difficulty: Difficulty) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let running = host.running();
    let mut tui_state = TuiState::new(track_kind, difficulty);

    tui_state.log_info(format!("Host listening on {}", host.local_addr()));

    while running.load(Ordering::SeqCst) {
        host.tick_once();

        for event in host.drain_events() {
            tui_state.log(event.level(), event.to_string());
        }

        if event::poll(Duration::from_millis(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            running.store(false, Ordering::SeqCst);
                        }
                        KeyCode::Char('t') => tui_state.cycle_track_kind(),
                        KeyCode::Char('d') => tui_state.cycle_difficulty(),
                        KeyCode::Char('n') => {
                            host.new_map(tui_state.track_kind(), Some(tui_state.difficulty()));
                        }
                        KeyCode::Char('s') => host.start_race(),
                        KeyCode::Char('x') => host.stop_race(),
                        KeyCode::PageUp => tui_state.scroll_up(),
                        KeyCode::PageDown => tui_state.scroll_down(),
                        KeyCode::End => tui_state.scroll_to_bottom(),
                        _ => {}
                    }
                }
            }
        }

        let stats = host.stats();
        let snapshot = host.snapshot();
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &stats, &snapshot);
        })?;
    }

    tui_state.log_info("Shutting down...");
    host.shutdown();

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
