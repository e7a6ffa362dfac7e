use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crate::trace::SimulationReport;
use crossterm::{
    cursor,
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, List, ListItem, Paragraph},
};

const MAX_LOG_LINES: usize = 1000;

/// Shared buffer that tracing output is written into while the TUI owns the terminal.
#[derive(Clone)]
pub struct MemoryLogBuffer {
    logs: Arc<Mutex<VecDeque<String>>>,
}

impl Default for MemoryLogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLogBuffer {
    pub fn new() -> Self {
        Self {
            logs: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn push(&self, msg: String) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.push_back(msg);
            if logs.len() > MAX_LOG_LINES {
                logs.pop_front();
            }
        }
    }

    /// The last `n` captured lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        match self.logs.lock() {
            Ok(logs) => logs
                .iter()
                .skip(logs.len().saturating_sub(n))
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl io::Write for MemoryLogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        self.push(s.trim().to_string());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Puts the terminal back on drop, including when the UI loop bails out early.
struct TerminalRestore<W: io::Write> {
    out: W,
    raw_mode: bool,
}

impl<W: io::Write> Drop for TerminalRestore<W> {
    fn drop(&mut self) {
        if self.raw_mode {
            let _ = disable_raw_mode();
        }
        let _ = execute!(
            self.out,
            LeaveAlternateScreen,
            DisableMouseCapture,
            cursor::Show
        );
    }
}

/// Replays finished runs as cwnd/ssthresh charts, one scenario at a time.
pub struct TuiApp {
    reports: Vec<SimulationReport>,
    selected: usize,
    /// Number of samples of the selected trace revealed so far.
    cursor: usize,
    paused: bool,
    logs: Option<MemoryLogBuffer>,
}

impl TuiApp {
    pub fn new(reports: Vec<SimulationReport>, logs: Option<MemoryLogBuffer>) -> Self {
        let mut app = Self {
            reports,
            selected: 0,
            cursor: 0,
            paused: false,
            logs,
        };
        app.select(0);
        app
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let _restore = TerminalRestore {
            out: io::stdout(),
            raw_mode: true,
        };
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(50);
        let mut last_tick = Instant::now();

        loop {
            terminal.draw(|f| self.ui(f))?;

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));

            if crossterm::event::poll(timeout)?
                && let Event::Key(key) = event::read()?
            {
                match key.code {
                    KeyCode::Char('q') => break,
                    KeyCode::Char(' ') => self.paused = !self.paused,
                    KeyCode::Char('s') => self.advance(1),
                    KeyCode::Char('e') => self.advance(usize::MAX),
                    KeyCode::Left => self.select(self.selected.saturating_sub(1)),
                    KeyCode::Right => self.select(self.selected + 1),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                if !self.paused {
                    self.advance(1);
                }
                last_tick = Instant::now();
            }
        }

        Ok(())
    }

    pub fn into_reports(self) -> Vec<SimulationReport> {
        self.reports
    }

    fn select(&mut self, idx: usize) {
        if self.reports.is_empty() {
            return;
        }
        let idx = idx.min(self.reports.len() - 1);
        if idx != self.selected || self.cursor == 0 {
            self.selected = idx;
            self.cursor = 1;
        }
    }

    fn advance(&mut self, ticks: usize) {
        let total = self.current().map(|r| r.samples.len()).unwrap_or(0);
        self.cursor = self.cursor.saturating_add(ticks).min(total);
    }

    fn current(&self) -> Option<&SimulationReport> {
        self.reports.get(self.selected)
    }

    fn ui(&self, f: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Control bar
                Constraint::Min(0),    // Dashboard + chart
                Constraint::Length(8), // Logs
            ])
            .split(f.area());

        self.render_control(f, rows[0]);

        let mid = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .split(rows[1]);
        self.render_dashboard(f, mid[0]);
        self.render_window_history(f, mid[1]);

        self.render_logs(f, rows[2]);
    }

    fn render_control(&self, f: &mut Frame, area: Rect) {
        let status_text = format!(
            "Scenario {}/{} | Status: {} | (q)uit (space)pause/resume (s)tep (e)nd (←/→)scenario",
            self.selected + 1,
            self.reports.len(),
            if self.paused { "PAUSED" } else { "REPLAYING" },
        );
        let status_block = Paragraph::new(status_text)
            .block(Block::default().borders(Borders::ALL).title("Control"));
        f.render_widget(status_block, area);
    }

    fn render_dashboard(&self, f: &mut Frame, area: Rect) {
        let Some(report) = self.current() else {
            let block = Paragraph::new("No runs")
                .block(Block::default().borders(Borders::ALL).title("Dashboard"));
            f.render_widget(block, area);
            return;
        };

        let cfg = &report.config;
        let now = report.samples.get(self.cursor.saturating_sub(1));
        let mut lines = vec![
            Line::from(format!("Loss rate:   {:.2}%", cfg.loss_rate * 100.0)),
            Line::from(format!("RTT:         {} s", cfg.rtt)),
            Line::from(format!("Sim time:    {} s", cfg.sim_time)),
            Line::from(format!("Seed:        {}", cfg.seed)),
            Line::from(""),
            Line::from(format!("Tick:        {}/{}", self.cursor, report.ticks)),
        ];
        if let Some(s) = now {
            lines.push(Line::from(format!("Time:        {:.2} s", s.time)));
            lines.push(Line::from(format!("cwnd:        {:.2}", s.cwnd)));
            lines.push(Line::from(format!("ssthresh:    {:.2}", s.ssthresh)));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(format!("Loss ticks:  {}", report.loss_ticks)));
        lines.push(Line::from(format!(
            "Throughput:  {:.2} MSS/s",
            report.throughput
        )));

        let block =
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Dashboard"));
        f.render_widget(block, area);
    }

    fn render_window_history(&self, f: &mut Frame, area: Rect) {
        let Some(report) = self.current() else {
            return;
        };
        let visible = &report.samples[..self.cursor.min(report.samples.len())];
        if visible.is_empty() {
            let block = Paragraph::new("No window samples yet")
                .block(Block::default().borders(Borders::ALL).title("Window"));
            f.render_widget(block, area);
            return;
        }

        let cwnd_pts = step_points(visible.iter().map(|s| (s.time, s.cwnd)), report.config.rtt);
        let ssthresh_pts = step_points(
            visible.iter().map(|s| (s.time, s.ssthresh)),
            report.config.rtt,
        );
        let (y_min, y_max) = y_bounds(&cwnd_pts, &ssthresh_pts);
        let x_max = report.config.sim_time;

        let datasets = vec![
            Dataset::default()
                .name("cwnd")
                .marker(symbols::Marker::Braille)
                .style(Style::default().fg(Color::Cyan))
                .graph_type(GraphType::Line)
                .data(&cwnd_pts),
            Dataset::default()
                .name("ssthresh")
                .marker(symbols::Marker::Braille)
                .style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::DIM),
                )
                .graph_type(GraphType::Line)
                .data(&ssthresh_pts),
        ];

        let title = format!(
            "TCP Reno: Loss={:.2}%, RTT={}s | Throughput={:.2} MSS/s",
            report.config.loss_rate * 100.0,
            report.config.rtt,
            report.throughput
        );
        let chart = Chart::new(datasets)
            .block(Block::default().borders(Borders::ALL).title(title))
            .x_axis(
                Axis::default()
                    .title("Time (s)")
                    .bounds([0.0, x_max])
                    .labels(vec![
                        Span::raw("0"),
                        Span::raw(format!("{:.1}", x_max / 2.0)),
                        Span::raw(format!("{:.1}", x_max)),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("cwnd")
                    .bounds([y_min, y_max])
                    .labels(vec![
                        Span::raw(format!("{:.0}", y_min)),
                        Span::raw(""),
                        Span::raw(format!("{:.0}", y_max)),
                    ]),
            );

        f.render_widget(chart, area);
    }

    fn render_logs(&self, f: &mut Frame, area: Rect) {
        let rows = area.height.saturating_sub(2) as usize;
        let items: Vec<ListItem> = self
            .logs
            .as_ref()
            .map(|buf| buf.tail(rows))
            .unwrap_or_default()
            .into_iter()
            .map(ListItem::new)
            .collect();
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Log"));
        f.render_widget(list, area);
    }
}

/// Turn per-tick samples into a staircase: each value holds for one RTT.
fn step_points(samples: impl Iterator<Item = (f64, f64)>, rtt: f64) -> Vec<(f64, f64)> {
    let mut pts = Vec::new();
    for (t, v) in samples {
        pts.push((t, v));
        pts.push((t + rtt, v));
    }
    pts
}

fn y_bounds(a: &[(f64, f64)], b: &[(f64, f64)]) -> (f64, f64) {
    let mut y_min = f64::MAX;
    let mut y_max = f64::MIN;
    for &(_, y) in a.iter().chain(b) {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if y_min > y_max {
        return (0.0, 1.0);
    }
    let y_min = y_min.min(0.0);
    if (y_max - y_min).abs() < f64::EPSILON {
        y_max += 1.0;
    }
    (y_min, y_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reno_lab_abstract::SimConfig;

    #[test]
    fn step_points_hold_each_value_for_one_rtt() {
        let pts = step_points([(0.0, 1.0), (0.5, 2.0)].into_iter(), 0.5);
        assert_eq!(pts, vec![(0.0, 1.0), (0.5, 1.0), (0.5, 2.0), (1.0, 2.0)]);
    }

    #[test]
    fn y_bounds_cover_both_series() {
        assert_eq!(y_bounds(&[(0.0, 4.0)], &[(0.0, 64.0)]), (0.0, 64.0));
        assert_eq!(y_bounds(&[], &[]), (0.0, 1.0));
    }

    #[test]
    fn log_buffer_keeps_latest_lines() {
        let buf = MemoryLogBuffer::new();
        for i in 0..(MAX_LOG_LINES + 5) {
            buf.push(format!("line {i}"));
        }
        let tail = buf.tail(2);
        assert_eq!(
            tail,
            vec![
                format!("line {}", MAX_LOG_LINES + 3),
                format!("line {}", MAX_LOG_LINES + 4)
            ]
        );
    }

    #[test]
    fn log_buffer_tail_shorter_than_request() {
        let buf = MemoryLogBuffer::new();
        buf.push("only".to_string());
        assert_eq!(buf.tail(5), vec!["only".to_string()]);
        assert_eq!(MemoryLogBuffer::new().tail(3), Vec::<String>::new());
    }

    #[test]
    fn restore_leaves_alternate_screen_on_drop() {
        let mut out = Vec::new();
        {
            let _restore = TerminalRestore {
                out: &mut out,
                raw_mode: false,
            };
        }
        let written = String::from_utf8(out).unwrap();
        assert!(written.contains("\x1b[?1049l"), "{written:?}");
        assert!(written.contains("\x1b[?25h"), "{written:?}");
    }

    #[test]
    fn replay_cursor_stays_within_trace() {
        let config = SimConfig {
            sim_time: 1.0,
            ..Default::default()
        };
        let reports = crate::batch::run_experiment(&config, &[0.0, 0.5]).unwrap();
        let mut app = TuiApp::new(reports, None);
        assert_eq!(app.cursor, 1);
        app.advance(usize::MAX);
        assert_eq!(app.cursor, 20);
        app.select(5);
        assert_eq!(app.selected, 1);
        assert_eq!(app.cursor, 1);
    }
}
