// Main TUI application
use crate::config::Config;
use crate::countdown::engine::Snapshot;
use crate::countdown::{CountdownEngine, CountdownObserver};
use crate::error::{LeaseError, Result};
use crate::expiry::lease_status;
use crate::models::{AnnotatedLease, LeaseStatus};
use crate::{search, source};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum AppState {
    /// Lease table
    Main,
    /// Help screen
    Help,
    /// Typing a search query
    Search,
}

pub struct App {
    should_quit: bool,
    state: AppState,
    engine: CountdownEngine,
    /// Lease file, used for manual reloads
    source_path: Option<PathBuf>,
    /// Latest snapshot from the engine
    snapshot: Snapshot,
    table_state: TableState,
    /// Applied search query
    query: String,
    /// Search input buffer while in search mode
    query_input: String,
    status_message: Option<String>,
    expiring_threshold_minutes: i64,
}

fn status_color(status: LeaseStatus) -> Color {
    match status {
        LeaseStatus::Active => Color::Green,
        LeaseStatus::Expiring => Color::Yellow,
        LeaseStatus::Expired => Color::Red,
        LeaseStatus::Upcoming => Color::Cyan,
        LeaseStatus::Terminated => Color::DarkGray,
    }
}

impl App {
    pub fn new(config: &Config, file: Option<PathBuf>) -> Result<Self> {
        let source_path = config.source_path(file)?;
        let leases = source::load_leases(&source_path)?;
        let engine = CountdownEngine::with_system_clock(leases, config.tick_interval());

        let mut app = Self::with_engine(engine, config.countdown.expiring_threshold_minutes);
        app.source_path = Some(source_path);
        Ok(app)
    }

    fn with_engine(engine: CountdownEngine, expiring_threshold_minutes: i64) -> Self {
        let snapshot = engine.snapshot();
        let mut table_state = TableState::default();
        if !snapshot.is_empty() {
            table_state.select(Some(0));
        }

        Self {
            should_quit: false,
            state: AppState::Main,
            engine,
            source_path: None,
            snapshot,
            table_state,
            query: String::new(),
            query_input: String::new(),
            status_message: None,
            expiring_threshold_minutes,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode().map_err(LeaseError::Io)?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).map_err(LeaseError::Io)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(LeaseError::Io)?;

        // The observer lives only as long as the event loop
        let observer = self.engine.observe();
        let result = self.run_event_loop(&mut terminal, observer).await;

        // Restore terminal
        disable_raw_mode().map_err(LeaseError::Io)?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen).map_err(LeaseError::Io)?;
        terminal.show_cursor().map_err(LeaseError::Io)?;

        result
    }

    async fn run_event_loop<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        mut observer: CountdownObserver,
    ) -> Result<()> {
        loop {
            if observer.has_changed() {
                self.snapshot = observer.next().await;
                self.clamp_selection();
            }

            terminal.draw(|f| self.ui(f)).map_err(LeaseError::Io)?;

            if event::poll(Duration::from_millis(100)).map_err(LeaseError::Io)? {
                if let Event::Key(key) = event::read().map_err(LeaseError::Io)? {
                    // Only handle key press events, ignore key release
                    if key.kind == KeyEventKind::Press {
                        if key.modifiers.contains(KeyModifiers::CONTROL)
                            && key.code == KeyCode::Char('c')
                        {
                            tracing::info!("Ctrl+C pressed - exiting");
                            self.should_quit = true;
                        } else {
                            self.handle_key(key.code);
                        }
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) {
        match self.state {
            AppState::Main => self.handle_main_key(key),
            AppState::Help => {
                // Any key exits help screen
                self.state = AppState::Main;
            }
            AppState::Search => self.handle_search_key(key),
        }
    }

    fn handle_main_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('?') | KeyCode::F(1) => self.state = AppState::Help,
            KeyCode::Char('/') => {
                self.query_input = self.query.clone();
                self.state = AppState::Search;
            }
            KeyCode::Char('r') => self.reload(),
            KeyCode::Down | KeyCode::Char('j') => self.next_item(),
            KeyCode::Up | KeyCode::Char('k') => self.previous_item(),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => {
                self.query = if self.query_input.trim().is_empty() {
                    String::new()
                } else {
                    self.query_input.clone()
                };
                self.state = AppState::Main;
                self.table_state.select(Some(0));
                self.clamp_selection();
                self.status_message = if self.query.is_empty() {
                    None
                } else {
                    Some(format!("Filtering by \"{}\"", self.query))
                };
            }
            KeyCode::Esc => self.state = AppState::Main,
            KeyCode::Backspace => {
                self.query_input.pop();
            }
            KeyCode::Char(c) => self.query_input.push(c),
            _ => {}
        }
    }

    fn reload(&mut self) {
        let Some(path) = self.source_path.clone() else {
            self.status_message = Some("No lease file to reload".to_string());
            return;
        };

        match source::load_leases(&path) {
            Ok(leases) => {
                let count = leases.len();
                self.engine.set_leases(leases);
                self.status_message = Some(format!("Reloaded {} leases", count));
            }
            Err(e) => {
                tracing::warn!("Reload failed: {}", e);
                self.status_message = Some(format!("Reload failed: {}", e));
            }
        }
    }

    fn visible(&self) -> Vec<&AnnotatedLease> {
        search::filter_annotated(&self.snapshot, &self.query).collect()
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        match self.table_state.selected() {
            _ if len == 0 => self.table_state.select(None),
            Some(i) if i >= len => self.table_state.select(Some(len - 1)),
            None => self.table_state.select(Some(0)),
            _ => {}
        }
    }

    fn next_item(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.table_state.select(Some(i));
    }

    fn previous_item(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    fn ui(&mut self, f: &mut Frame) {
        match self.state {
            AppState::Help => self.draw_help_screen(f),
            AppState::Main | AppState::Search => self.draw_main_screen(f),
        }
    }

    fn draw_main_screen(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(5),    // Lease table
                Constraint::Length(3), // Status / search
                Constraint::Length(1), // Help bar
            ])
            .split(f.area());

        let header = Paragraph::new("leasetimer - Lease Countdowns")
            .style(
                Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::BOLD),
            )
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(header, chunks[0]);

        // Status and countdown cells both come from the snapshot's instant
        let now = self.snapshot.at;
        let threshold = self.expiring_threshold_minutes;
        let visible = self.visible();
        let rows: Vec<Row> = visible
            .iter()
            .map(|annotated| {
                let lease = &annotated.lease;
                let status = lease_status(lease, now, threshold);
                let countdown = &annotated.countdown;
                let countdown_style = if countdown.is_zero() {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                };

                Row::new(vec![
                    Cell::new(lease.display_name()),
                    Cell::new(Span::styled(
                        status.as_str().to_string(),
                        Style::default().fg(status_color(status)),
                    )),
                    Cell::new(lease.end_date().unwrap_or("-").to_string()),
                    Cell::new(Text::from(countdown.days.clone()).alignment(Alignment::Right)),
                    Cell::new(Text::from(countdown.hours.clone()).alignment(Alignment::Right)),
                    Cell::new(Text::from(countdown.minutes.clone()).alignment(Alignment::Right)),
                    Cell::new(Text::from(countdown.seconds.clone()).alignment(Alignment::Right)),
                ])
                .style(countdown_style)
            })
            .collect();
        let total = self.snapshot.len();
        let shown = rows.len();

        let header = Row::new(vec!["Car", "Status", "Ends", "day", "hr", "min", "sec"])
            .style(
                Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::BOLD),
            )
            .bottom_margin(1);

        let title = if shown == total {
            format!("Leases ({})", total)
        } else {
            format!("Leases ({} of {})", shown, total)
        };

        let table = Table::new(
            rows,
            [
                Constraint::Min(20),    // Car
                Constraint::Length(10), // Status
                Constraint::Length(26), // End date
                Constraint::Length(4),  // Days
                Constraint::Length(3),  // Hours
                Constraint::Length(3),  // Minutes
                Constraint::Length(3),  // Seconds
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(table, chunks[1], &mut self.table_state);

        let status_line = if self.state == AppState::Search {
            Line::from(vec![
                Span::styled("/", Style::default().fg(Color::Yellow)),
                Span::raw(self.query_input.clone()),
            ])
        } else {
            Line::from(self.status_message.clone().unwrap_or_default())
        };
        let status = Paragraph::new(status_line).block(Block::default().borders(Borders::ALL));
        f.render_widget(status, chunks[2]);

        let help = Paragraph::new("q: quit  /: search  j/k: move  r: reload  ?: help")
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(help, chunks[3]);
    }

    fn draw_help_screen(&self, f: &mut Frame) {
        let help_text = vec![
            Line::from(Span::styled(
                "leasetimer - Help",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Navigation:"),
            Line::from("  ↑, k        - Move selection up"),
            Line::from("  ↓, j        - Move selection down"),
            Line::from(""),
            Line::from("Leases:"),
            Line::from("  /           - Search by car model or brand (Enter applies)"),
            Line::from("  r           - Reload the lease file"),
            Line::from(""),
            Line::from("General:"),
            Line::from("  q, Esc      - Quit application"),
            Line::from("  ?, F1       - Show this help screen"),
            Line::from(""),
            Line::from(Span::styled(
                "Press any key to return to main screen",
                Style::default().fg(Color::Yellow),
            )),
        ];

        let help = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .style(Style::default().fg(Color::White));
        f.render_widget(help, f.area());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countdown::clock::MockClock;
    use crate::models::LeaseRecord;
    use chrono::{TimeZone, Utc};
    use ratatui::backend::TestBackend;
    use serde_json::json;
    use std::sync::Arc;

    fn app() -> App {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut clock = MockClock::new();
        clock.expect_now().return_const(now);

        let car = |model: &str, brand: &str| json!([{ "modelName": model, "brand": brand }]);
        let leases = vec![
            LeaseRecord::new("2025-06-02T13:01:01Z")
                .with_field("carDetails", car("civic", "honda")),
            LeaseRecord::new("2025-05-01T00:00:00Z")
                .with_field("carDetails", car("corolla", "toyota")),
            LeaseRecord::new("2025-06-01T12:30:00Z")
                .with_field("carDetails", car("city", "honda")),
        ];
        let engine = CountdownEngine::new(leases, Arc::new(clock), Duration::from_secs(1));
        App::with_engine(engine, 60)
    }

    fn render(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| app.ui(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_renders_countdowns() {
        let mut app = app();
        let screen = render(&mut app);
        assert!(screen.contains("Leases (3)"));
        assert!(screen.contains("Honda Civic"));
        assert!(screen.contains("ACTIVE"));
        assert!(screen.contains("EXPIRED"));
        assert!(screen.contains("EXPIRING"));
    }

    #[test]
    fn test_status_follows_snapshot_instant() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let later = now + chrono::Duration::hours(2);
        let mut calls = 0;
        let mut clock = MockClock::new();
        clock.expect_now().returning(move || {
            calls += 1;
            if calls == 1 {
                now
            } else {
                later
            }
        });

        let engine = CountdownEngine::new(
            vec![LeaseRecord::new("2025-06-01T12:30:00Z")],
            Arc::new(clock),
            Duration::from_secs(1),
        );
        let mut app = App::with_engine(engine, 60);
        let screen = render(&mut app);
        assert!(screen.contains("EXPIRING"));
        assert!(!screen.contains("EXPIRED"));
    }

    #[test]
    fn test_search_keeps_trailing_whitespace() {
        let mut app = app();
        app.handle_key(KeyCode::Char('/'));
        for c in "honda ".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.query, "honda ");
        assert!(app.visible().is_empty());

        app.handle_key(KeyCode::Char('/'));
        for _ in 0..6 {
            app.handle_key(KeyCode::Backspace);
        }
        app.handle_key(KeyCode::Char(' '));
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.query, "");
        assert_eq!(app.visible().len(), 3);
    }

    #[test]
    fn test_search_filters_rows() {
        let mut app = app();
        app.handle_key(KeyCode::Char('/'));
        assert_eq!(app.state, AppState::Search);
        for c in "honda".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.state, AppState::Main);
        assert_eq!(app.visible().len(), 2);
        assert!(render(&mut app).contains("Leases (2 of 3)"));
    }

    #[test]
    fn test_search_escape_keeps_previous_query() {
        let mut app = app();
        app.handle_key(KeyCode::Char('/'));
        app.handle_key(KeyCode::Char('x'));
        app.handle_key(KeyCode::Esc);
        assert_eq!(app.state, AppState::Main);
        assert_eq!(app.visible().len(), 3);
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();
        assert_eq!(app.table_state.selected(), Some(0));
        app.handle_key(KeyCode::Up);
        assert_eq!(app.table_state.selected(), Some(2));
        app.handle_key(KeyCode::Char('j'));
        assert_eq!(app.table_state.selected(), Some(0));
    }

    #[test]
    fn test_help_and_quit() {
        let mut app = app();
        app.handle_key(KeyCode::Char('?'));
        assert_eq!(app.state, AppState::Help);
        assert!(render(&mut app).contains("leasetimer - Help"));
        app.handle_key(KeyCode::Char('x'));
        assert_eq!(app.state, AppState::Main);
        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_reload_without_source() {
        let mut app = app();
        app.handle_key(KeyCode::Char('r'));
        assert_eq!(
            app.status_message.as_deref(),
            Some("No lease file to reload")
        );
    }
}
