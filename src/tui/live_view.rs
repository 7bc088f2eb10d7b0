//! Live statistics table for a running benchmark

use crate::bench::{Aggregator, Snapshot};
use crate::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// How long to wait for a key press before redrawing
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Width of the metric label column
const LABEL_WIDTH: u16 = 24;

/// Full-screen view of the aggregated statistics
///
/// The view only ever reads snapshots. Quitting it cancels the whole run.
pub struct LiveView {
    aggregator: Arc<Aggregator>,
    proxy_host: String,
    workers: usize,
    refresh_interval: Duration,
    cancel: CancellationToken,
    snapshot: Snapshot,
    last_refresh: Instant,
    started: Instant,
}

impl LiveView {
    pub fn new(
        aggregator: Arc<Aggregator>,
        proxy_host: impl Into<String>,
        workers: usize,
        refresh_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let snapshot = aggregator.snapshot();
        let now = Instant::now();
        Self {
            aggregator,
            proxy_host: proxy_host.into(),
            workers,
            refresh_interval,
            cancel,
            snapshot,
            last_refresh: now,
            started: now,
        }
    }

    /// Take over the terminal until the user quits or the run is cancelled
    ///
    /// Blocks the calling thread; run it with `spawn_blocking`.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_app(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        while !self.cancel.is_cancelled() {
            if self.last_refresh.elapsed() >= self.refresh_interval {
                self.refresh();
            }

            terminal.draw(|f| self.ui(f))?;

            if event::poll(INPUT_POLL)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press
                        && is_quit_key(key.code, key.modifiers)
                    {
                        self.cancel.cancel();
                    }
                }
            }
        }
        Ok(())
    }

    fn refresh(&mut self) {
        self.snapshot = self.aggregator.snapshot();
        self.last_refresh = Instant::now();
    }

    fn ui(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Min(0),    // Statistics
                Constraint::Length(3), // Status bar
            ])
            .split(f.size());

        let title = Paragraph::new("Rotating Proxy Benchmark")
            .style(Style::default().fg(Color::Cyan))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(chunks[1]);

        let stats = stat_rows(&self.proxy_host, &self.snapshot);
        let widths = [
            Constraint::Length(LABEL_WIDTH),
            Constraint::Length(value_width(&stats)),
        ];
        let rows = stats.into_iter().map(|(metric, value)| {
            Row::new(vec![
                Cell::from(metric).style(Style::default().fg(Color::Cyan)),
                Cell::from(value).style(Style::default().fg(Color::Magenta)),
            ])
        });
        let table = Table::new(rows)
            .header(
                Row::new(vec!["Metric", "Value"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(Block::default().borders(Borders::ALL).title("Statistics"))
            .widths(&widths);
        f.render_widget(table, body[0]);

        let countries: Vec<ListItem> = self
            .snapshot
            .country_distribution()
            .into_iter()
            .map(|share| {
                ListItem::new(format!(
                    "{}: {} ({:.2}%)",
                    share.country, share.count, share.percent
                ))
            })
            .collect();
        let country_list = List::new(countries).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Countries ({})", self.snapshot.countries.len())),
        );
        f.render_widget(country_list, body[1]);

        let status = Paragraph::new(format!(
            "Workers: {} | Elapsed: {}s | Press 'q' to quit",
            self.workers,
            self.started.elapsed().as_secs()
        ))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("Status"));
        f.render_widget(status, chunks[2]);
    }
}

fn is_quit_key(code: KeyCode, modifiers: KeyModifiers) -> bool {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        // Raw mode swallows SIGINT, so Ctrl-C arrives as a key.
        KeyCode::Char('c') => modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Value column width that fits every value and the header
fn value_width(rows: &[(&'static str, String)]) -> u16 {
    let widest = rows
        .iter()
        .map(|(_, value)| value.chars().count())
        .max()
        .unwrap_or(0)
        .max("Value".len());
    u16::try_from(widest).unwrap_or(u16::MAX)
}

/// Metric rows shown in the statistics table, in display order
pub fn stat_rows(proxy_host: &str, snapshot: &Snapshot) -> Vec<(&'static str, String)> {
    vec![
        ("Proxy", proxy_host.to_string()),
        ("Total Requests", snapshot.total_requests.to_string()),
        ("Unique IPs", snapshot.unique_ips.to_string()),
        ("Repeated IPs", snapshot.repeated_ips.to_string()),
        ("Residential Network", snapshot.residential_proxies().to_string()),
        ("Mobile Network", snapshot.mobile_proxies().to_string()),
        ("Datacenter Network", snapshot.datacenter_leaks().to_string()),
        ("Unknown Network", snapshot.unknown_network().to_string()),
        ("Error", snapshot.error_count.to_string()),
        (
            "Average Response Time",
            format!("{:.2} seconds", snapshot.latency.average()),
        ),
        (
            "Lowest Response Time",
            format!("{:.2} seconds", snapshot.latency.lowest()),
        ),
        (
            "Highest Response Time",
            format!("{:.2} seconds", snapshot.latency.highest()),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::{NetworkType, ObservationRecord, Outcome};
    use ratatui::backend::TestBackend;

    fn populated() -> Arc<Aggregator> {
        let agg = Arc::new(Aggregator::new());
        for (ip, latency, network_type) in [
            ("9.9.9.9", 0.5, NetworkType::Hosting),
            ("9.9.9.9", 0.3, NetworkType::Hosting),
            ("8.8.8.8", 1.0, NetworkType::Isp),
        ] {
            agg.record(Outcome::Observed(ObservationRecord {
                ip: ip.to_string(),
                latency,
                country_name: "Germany".to_string(),
                network_type,
            }));
        }
        agg
    }

    #[test]
    fn test_stat_rows() {
        let rows = stat_rows("gate.example.net", &populated().snapshot());
        let labels: Vec<_> = rows.iter().map(|(label, _)| *label).collect();
        assert_eq!(
            labels,
            [
                "Proxy",
                "Total Requests",
                "Unique IPs",
                "Repeated IPs",
                "Residential Network",
                "Mobile Network",
                "Datacenter Network",
                "Unknown Network",
                "Error",
                "Average Response Time",
                "Lowest Response Time",
                "Highest Response Time",
            ]
        );
        assert_eq!(rows[0].1, "gate.example.net");
        assert_eq!(rows[1].1, "3");
        assert_eq!(rows[2].1, "2");
        assert_eq!(rows[3].1, "1");
        assert_eq!(rows[6].1, "1");
        assert_eq!(rows[9].1, "0.60 seconds");
    }

    #[test]
    fn test_value_width_fits_longest_value() {
        let rows = stat_rows("residential.gate.example.net", &populated().snapshot());
        assert_eq!(value_width(&rows), 28);
        assert_eq!(value_width(&[]), 5);
    }

    #[test]
    fn test_quit_keys() {
        assert!(is_quit_key(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(is_quit_key(KeyCode::Esc, KeyModifiers::NONE));
        assert!(is_quit_key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!is_quit_key(KeyCode::Char('c'), KeyModifiers::NONE));
        assert!(!is_quit_key(KeyCode::Enter, KeyModifiers::NONE));
    }

    #[test]
    fn test_render_shows_statistics() {
        let view = LiveView::new(
            populated(),
            "gate.example.net",
            4,
            Duration::from_secs(1),
            CancellationToken::new(),
        );
        let mut terminal = Terminal::new(TestBackend::new(90, 24)).unwrap();
        terminal.draw(|f| view.ui(f)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content.iter().map(|cell| cell.symbol.as_str()).collect();
        assert!(text.contains("Rotating Proxy Benchmark"));
        assert!(text.contains("gate.example.net"));
        assert!(text.contains("Datacenter Network"));
        assert!(text.contains("0.60 seconds"));
        assert!(text.contains("Germany: 2 (100.00%)"));
        assert!(text.contains("Workers: 4"));
    }
}
