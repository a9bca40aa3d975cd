//! App state and main loop: input handling, refreshing the monitor, updating history, and drawing.

use std::{
    collections::VecDeque,
    io,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use proctop_agent::{AccountDirectory, Monitor, ProcFs, ResourceReader, SystemAccounts, SystemSummary};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};

use crate::history::{push_capped, HISTORY_CAP};
use crate::ui::{
    cpu::draw_cpu_graph,
    header::draw_header,
    mem::draw_mem,
    processes::{draw_processes, processes_clamp, processes_handle_key, viewport_rows},
};

pub struct App<R = ProcFs, D = SystemAccounts> {
    monitor: Monitor<R, D>,
    interval: Duration,

    // Latest refresh
    summary: Option<SystemSummary>,

    // CPU history in whole percents (0..100)
    cpu_hist: VecDeque<u64>,

    should_quit: bool,

    pub procs_scroll_offset: usize,
    last_procs_area: Option<Rect>,
}

impl<R: ResourceReader, D: AccountDirectory> App<R, D> {
    pub fn new(monitor: Monitor<R, D>, interval: Duration) -> Self {
        Self {
            monitor,
            interval,
            summary: None,
            cpu_hist: VecDeque::with_capacity(HISTORY_CAP),
            should_quit: false,
            procs_scroll_offset: 0,
            last_procs_area: None,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let res = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        while !self.should_quit {
            self.tick();
            terminal.draw(|f| self.draw(f))?;

            // Wait out the interval, but stay responsive to keys
            let deadline = Instant::now() + self.interval;
            while let Some(left) = deadline.checked_duration_since(Instant::now()) {
                if !event::poll(left)? {
                    break;
                }
                if let Event::Key(k) = event::read()? {
                    self.handle_key(k);
                    if self.should_quit {
                        break;
                    }
                    terminal.draw(|f| self.draw(f))?;
                }
            }
        }
        Ok(())
    }

    /// One refresh of the monitor, folded into the chart history.
    pub fn tick(&mut self) {
        let summary = self.monitor.refresh();
        let pct = (summary.cpu_utilization * 100.0).clamp(0.0, 100.0).round() as u64;
        push_capped(&mut self.cpu_hist, pct, HISTORY_CAP);
        self.summary = Some(summary);
        self.clamp_scroll();
    }

    pub fn handle_key(&mut self, k: KeyEvent) {
        if k.kind != KeyEventKind::Press {
            return;
        }
        let ctrl_c = k.code == KeyCode::Char('c') && k.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl_c || matches!(k.code, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc) {
            self.should_quit = true;
            return;
        }
        let page = self.last_procs_area.map(viewport_rows).unwrap_or(1);
        processes_handle_key(&mut self.procs_scroll_offset, k, page);
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        let viewport = self.last_procs_area.map(viewport_rows).unwrap_or(0);
        processes_clamp(
            &mut self.procs_scroll_offset,
            self.monitor.registry().len(),
            viewport,
        );
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();

        // Root rows: header, cpu graph, memory, processes
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Ratio(1, 4),
                Constraint::Length(3),
                Constraint::Min(5),
            ])
            .split(area);

        // Cache for input handlers
        self.last_procs_area = Some(rows[3]);

        let summary = self.summary.as_ref();
        draw_header(f, rows[0], summary);
        draw_cpu_graph(f, rows[1], &self.cpu_hist, summary.map(|s| s.cpu_utilization));
        draw_mem(f, rows[2], summary.map(|s| s.mem_utilization));

        let procs = self.monitor.processes();
        draw_processes(f, rows[3], &procs, self.procs_scroll_offset);
    }
}
