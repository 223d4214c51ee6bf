use std::collections::VecDeque;

use log::Level;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table};
use tiltrace::{Difficulty, SessionSnapshot, SessionState, TrackKind, VehicleFlags};

use crate::events::format_race_time;
use crate::server::HostStats;

const MAX_LOG_LINES: usize = 500;

struct LogEntry {
    level: Level,
    message: String,
}

/// Control panel selections and the event log.
pub struct TuiState {
    log: VecDeque<LogEntry>,
    scroll: usize,
    track_kind: TrackKind,
    difficulty: Difficulty,
}

impl TuiState {
    pub fn new(track_kind: TrackKind, difficulty: Difficulty) -> Self {
        Self {
            log: VecDeque::new(),
            scroll: 0,
            track_kind,
            difficulty,
        }
    }

    pub fn track_kind(&self) -> TrackKind {
        self.track_kind
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn cycle_track_kind(&mut self) {
        self.track_kind = self.track_kind.next();
    }

    pub fn cycle_difficulty(&mut self) {
        self.difficulty = self.difficulty.next();
    }

    pub fn log(&mut self, level: Level, message: impl Into<String>) {
        if self.log.len() >= MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back(LogEntry {
            level,
            message: message.into(),
        });
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = (self.scroll + 5).min(self.log.len().saturating_sub(1));
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_sub(5);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = 0;
    }
}

pub fn render(frame: &mut Frame, state: &TuiState, stats: &HostStats, snapshot: &SessionSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(10),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(36)])
        .split(chunks[1]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(middle[1]);

    render_header(frame, chunks[0], stats, snapshot);
    render_standings(frame, middle[0], snapshot);
    render_map_panel(frame, side[0], state, stats);
    render_link(frame, side[1], stats);
    render_log(frame, chunks[2], state);
    render_help(frame, chunks[3]);
}

fn render_header(frame: &mut Frame, area: Rect, stats: &HostStats, snapshot: &SessionSnapshot) {
    let title = format!(" Tilt Race Host - Uptime: {} ", format_duration(stats.uptime_secs));

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let state_style = match stats.state {
        SessionState::Started => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        SessionState::Stopped => Style::default().fg(Color::Yellow),
    };

    let line = Line::from(vec![
        Span::styled(stats.state.as_str().to_uppercase(), state_style),
        Span::raw(format!(
            "  |  Race: {}  |  Cars: {}  |  Finished: {}  |  Tick: {}",
            format_race_time(snapshot.race_ms),
            stats.vehicle_count,
            snapshot.finished_count(),
            stats.tick
        )),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_standings(frame: &mut Frame, area: Rect, snapshot: &SessionSnapshot) {
    let header = Row::new(["#", "Car", "Device", "Speed", "Damage", "Distance", "Time"])
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));

    let rows = snapshot.standings().into_iter().enumerate().map(|(place, car)| {
        let status = if car.flags.contains(VehicleFlags::WRECKED) {
            Span::styled("wrecked", Style::default().fg(Color::Red))
        } else if let Some(ms) = car.finish_ms {
            Span::styled(format_race_time(ms), Style::default().fg(Color::Green))
        } else if !car.flags.contains(VehicleFlags::RECENT_ACTIVITY) {
            Span::styled("no signal", Style::default().fg(Color::Yellow))
        } else {
            Span::raw("-")
        };

        let damage_style = if car.flags.contains(VehicleFlags::RECENTLY_DAMAGED) {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        Row::new(vec![
            Cell::from(format!("{}", place + 1)),
            Cell::from("██").style(Style::default().fg(Color::Rgb(car.color.r, car.color.g, car.color.b))),
            Cell::from(car.address.to_string()),
            Cell::from(format!("{:.0}", car.speed)),
            Cell::from(format!("{:.0}", car.damage)).style(damage_style),
            Cell::from(format!("{:.0}", car.distance)),
            Cell::from(status),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(20),
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(" Standings ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );

    frame.render_widget(table, area);
}

fn render_map_panel(frame: &mut Frame, area: Rect, state: &TuiState, stats: &HostStats) {
    let block = Block::default()
        .title(" Map ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let current = match (stats.track_kind, stats.difficulty) {
        (Some(kind), Some(level)) => format!("{} ({})", kind, level),
        (Some(kind), None) => format!("{} (empty)", kind),
        (None, _) => "none".to_string(),
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Current: ", Style::default().fg(Color::Gray)),
            Span::raw(current),
        ]),
        Line::from(vec![
            Span::styled("Type:    ", Style::default().fg(Color::Gray)),
            Span::styled(state.track_kind().name(), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled("Level:   ", Style::default().fg(Color::Gray)),
            Span::styled(state.difficulty().name(), Style::default().fg(Color::White)),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_link(frame: &mut Frame, area: Rect, stats: &HostStats) {
    let block = Block::default()
        .title(" Link ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let link = &stats.link_stats;
    let lines = vec![
        Line::from(vec![
            Span::styled("Frames: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{} sent / {} recv", link.frames_sent, link.frames_received)),
        ]),
        Line::from(vec![
            Span::styled("Bytes: ", Style::default().fg(Color::Gray)),
            Span::raw(format!(
                "{} sent / {} recv",
                format_bytes(link.bytes_sent),
                format_bytes(link.bytes_received)
            )),
        ]),
        Line::from(vec![
            Span::styled("Dropped: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} ({:.1}%)", link.frames_dropped, link.drop_percent()),
                Style::default().fg(if link.drop_percent() > 5.0 {
                    Color::Red
                } else {
                    Color::White
                }),
            ),
        ]),
        Line::from(vec![
            Span::styled("Malformed: ", Style::default().fg(Color::Gray)),
            Span::raw(link.frames_discarded.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Devices: ", Style::default().fg(Color::Gray)),
            Span::raw(link.known_devices.to_string()),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let visible = area.height.saturating_sub(2) as usize;
    let end = state.log.len().saturating_sub(state.scroll);
    let start = end.saturating_sub(visible);

    let items: Vec<ListItem> = state
        .log
        .range(start..end)
        .map(|entry| {
            let color = match entry.level {
                Level::Error => Color::Red,
                Level::Warn => Color::Yellow,
                Level::Info => Color::White,
                Level::Debug | Level::Trace => Color::DarkGray,
            };
            ListItem::new(entry.message.as_str()).style(Style::default().fg(color))
        })
        .collect();

    let title = if state.scroll > 0 {
        format!(" Events (scrolled {}) ", state.scroll)
    } else {
        " Events ".to_string()
    };

    let list = List::new(items).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(list, area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let text = Paragraph::new("t Type  d Difficulty  n New map  s Start  x Stop  PgUp/PgDn Scroll  q Quit")
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );

    frame.render_widget(text, area);
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_bounded() {
        let mut state = TuiState::new(TrackKind::OpenField, Difficulty::Easy);
        for i in 0..MAX_LOG_LINES + 10 {
            state.log_info(format!("line {}", i));
        }
        assert_eq!(state.log.len(), MAX_LOG_LINES);
        assert_eq!(state.log.front().map(|e| e.message.as_str()), Some("line 10"));
    }

    #[test]
    fn selections_cycle() {
        let mut state = TuiState::new(TrackKind::RandomBlocks, Difficulty::Difficult);
        state.cycle_track_kind();
        state.cycle_difficulty();
        assert_eq!(state.track_kind(), TrackKind::RandomMaze);
        assert_eq!(state.difficulty(), Difficulty::Easy);
    }

    #[test]
    fn byte_units() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.0KB");
    }
}
