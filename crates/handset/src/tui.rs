use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::{Frame, Terminal};

use crate::device::Handset;
use crate::input::TILT_LIMIT;

pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    should_quit: bool,
}

impl Tui {
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            should_quit: false,
        })
    }

    pub fn run(&mut self, handset: &mut Handset) -> io::Result<()> {
        while !self.should_quit {
            handset.update(Instant::now())?;
            self.terminal.draw(|frame| render(frame, handset))?;

            if event::poll(Duration::from_millis(10))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(handset, key.code, key.modifiers);
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, handset: &mut Handset, code: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        let tilt = handset.tilt_mut();
        match code {
            KeyCode::Up | KeyCode::Char('w') => tilt.throttle(1),
            KeyCode::Down | KeyCode::Char('s') => tilt.throttle(-1),
            KeyCode::Left | KeyCode::Char('a') => tilt.steer(-1),
            KeyCode::Right | KeyCode::Char('d') => tilt.steer(1),
            KeyCode::Char(' ') => tilt.level(),
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    pub fn restore_terminal(&mut self) -> io::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            cursor::Show
        )?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}

fn render(frame: &mut Frame, handset: &Handset) {
    let area = frame.area();

    let block = Block::default()
        .title(format!(" Handset {} ", handset.address()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_led(frame, chunks[0], handset);
    render_axis(frame, chunks[1], "Steering", handset.tilt().x);
    render_axis(frame, chunks[2], "Throttle", handset.tilt().y);
    render_link(frame, chunks[3], handset);

    let help = Paragraph::new("↑↓ Throttle  ←→ Steer  Space Level  Q Quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, chunks[5]);
}

fn render_led(frame: &mut Frame, area: Rect, handset: &Handset) {
    let led = handset.led();
    let (text, style) = if led.is_off() {
        ("LED off", Style::default().fg(Color::DarkGray))
    } else {
        (
            "●  LED  ●",
            Style::default()
                .fg(Color::Rgb(led.r, led.g, led.b))
                .add_modifier(Modifier::BOLD),
        )
    };

    let paragraph = Paragraph::new(Line::from(Span::styled(text, style)))
        .alignment(Alignment::Center)
        .block(Block::default().title(" Status ").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_axis(frame: &mut Frame, area: Rect, label: &str, value: i8) {
    let span = 2.0 * TILT_LIMIT as f64;
    let ratio = (value as f64 + TILT_LIMIT as f64) / span;

    let gauge = Gauge::default()
        .block(Block::default().title(format!(" {} ", label)).borders(Borders::ALL))
        .gauge_style(Style::default().fg(if value == 0 { Color::Gray } else { Color::Yellow }))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("{:+}°", value));
    frame.render_widget(gauge, area);
}

fn render_link(frame: &mut Frame, area: Rect, handset: &Handset) {
    let text = format!(
        "Station {}  |  {} frames sent  |  {} commands",
        handset.host(),
        handset.frames_sent(),
        handset.commands_received()
    );
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(Color::White))
        .block(Block::default().title(" Link ").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}
