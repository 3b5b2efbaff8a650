use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use subline_core::Editor;
use subline_core::controllers::ListStatus;
use subline_core::timeline::band_label;

use crate::renderer::{self, CELL_WIDTH};

const RULER_ROWS: u16 = 2;
const BAND_ROWS: u16 = 3;

/// Row open for editing: the buffer being typed and the text to restore on Esc.
struct RowEdit {
    original: String,
    buffer: String,
}

pub struct App {
    editor: Editor,
    selected: usize,
    edit: Option<RowEdit>,
    playing: bool,
    message: Option<String>,
    /// Screen rows of the band strip, from the last draw.
    band_area: Rect,
    quit: bool,
}

/// Column within `area` of a mouse cell, or `None` outside it.
fn strip_column(area: Rect, column: u16, row: u16) -> Option<u16> {
    let inside = (area.x..area.x + area.width).contains(&column)
        && (area.y..area.y + area.height).contains(&row);
    inside.then(|| column - area.x)
}

fn format_ms(ms: f64) -> String {
    let tenths = (ms / 100.0).round().max(0.0) as u64;
    format!("{}:{:02}.{}", tenths / 600, (tenths / 10) % 60, tenths % 10)
}

impl App {
    pub fn new(editor: Editor) -> Self {
        Self {
            editor,
            selected: 0,
            edit: None,
            playing: false,
            message: None,
            band_area: Rect::default(),
            quit: false,
        }
    }

    pub fn run(mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        while !self.quit {
            let size = terminal.size()?;
            self.editor
                .clock_mut()
                .set_viewport_width(f64::from(size.width) * CELL_WIDTH);
            self.editor.pump();

            terminal.draw(|frame| self.draw(frame))?;

            if event::poll(Duration::from_millis(50))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key(key),
                    Event::Mouse(mouse) => self.on_mouse(mouse),
                    _ => {}
                }
            }

            let now = Instant::now();
            if self.playing {
                let clock = self.editor.clock_mut();
                clock.advance(now.duration_since(last_tick).as_secs_f64());
                if clock.current_time() >= clock.duration() {
                    self.playing = false;
                }
            }
            last_tick = now;
        }
        Ok(())
    }

    fn report<E: std::fmt::Display>(&mut self, result: Result<(), E>) {
        if let Err(e) = result {
            log::warn!("{e}");
            self.message = Some(e.to_string());
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.edit.is_some() {
            self.on_edit_key(key);
            return;
        }
        self.message = None;
        let clock = self.editor.clock_mut();
        match key.code {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Esc => {
                self.editor.pointer_leave();
            }
            KeyCode::Char(' ') => self.playing = !self.playing,
            KeyCode::Left => {
                let t = clock.current_time() - 1.0;
                clock.set_current_time(t);
            }
            KeyCode::Right => clock.advance(1.0),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let s = (clock.scale() * 1.25).min(8.0);
                clock.set_scale(s);
            }
            KeyCode::Char('-') => {
                let s = (clock.scale() / 1.25).max(0.125);
                clock.set_scale(s);
            }
            KeyCode::Up => self.select(self.selected.saturating_sub(1)),
            KeyCode::Down => self.select(self.selected + 1),
            KeyCode::Enter => self.start_edit(),
            KeyCode::Char('s') => {
                let result = self.editor.save_session();
                self.report(result);
                if self.message.is_none() {
                    self.message = Some("saved".to_string());
                }
            }
            KeyCode::Char('r') => self.cycle_reference_language(),
            KeyCode::Char('v') => self.cycle_reference_version(),
            _ => {}
        }
    }

    fn on_edit_key(&mut self, key: KeyEvent) {
        let Some(edit) = self.edit.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Enter => {
                let text = edit.buffer.clone();
                self.edit = None;
                let result = self.editor.finish_editing(&text).map(|_| ());
                self.report(result);
            }
            KeyCode::Esc => {
                let text = edit.original.clone();
                self.edit = None;
                let result = self.editor.finish_editing(&text).map(|_| ());
                self.report(result);
            }
            KeyCode::Backspace => {
                edit.buffer.pop();
                let text = edit.buffer.clone();
                let result = self.editor.text_changed(&text);
                self.report(result);
            }
            KeyCode::Char(c) => {
                edit.buffer.push(c);
                let text = edit.buffer.clone();
                let result = self.editor.text_changed(&text);
                self.report(result);
            }
            _ => {}
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        let column = strip_column(self.band_area, mouse.column, mouse.row);
        let inside = column.is_some();
        let x = renderer::x_of(column.unwrap_or_default());
        let config = self.editor.timeline().config();
        let y = config.band_top + config.band_height / 2.0;

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if inside => {
                self.editor.pointer_down(x, y);
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if inside {
                    self.editor.pointer_move(x);
                } else {
                    self.editor.pointer_leave();
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let result = self.editor.pointer_up().map(|_| ());
                self.report(result);
            }
            MouseEventKind::ScrollDown => self.editor.clock_mut().advance(0.5),
            MouseEventKind::ScrollUp => {
                let clock = self.editor.clock_mut();
                let t = clock.current_time() - 0.5;
                clock.set_current_time(t);
            }
            _ => {}
        }
    }

    fn select(&mut self, index: usize) {
        let len = self.editor.working().items().len();
        if len == 0 {
            return;
        }
        self.selected = index.min(len - 1);
        if let Some(item) = self.editor.working().item(self.selected) {
            let start = item.start_time / 1000.0;
            self.editor.clock_mut().set_current_time(start);
        }
    }

    fn start_edit(&mut self) {
        match self.editor.start_editing(self.selected) {
            Ok(raw) => {
                self.edit = Some(RowEdit {
                    original: raw.clone(),
                    buffer: raw,
                });
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    fn cycle_reference_language(&mut self) {
        let selector = self.editor.selector();
        let codes: Vec<String> = selector.languages().iter().map(|l| l.code.clone()).collect();
        let current = selector
            .language()
            .and_then(|l| codes.iter().position(|c| *c == l.code));
        let next = current.map_or(0, |i| (i + 1) % codes.len().max(1));
        if let Some(code) = codes.get(next) {
            self.editor.select_reference_language(code);
        }
    }

    fn cycle_reference_version(&mut self) {
        let selector = self.editor.selector();
        let numbers: Vec<u32> = selector.versions().iter().map(|v| v.number).collect();
        let current = selector
            .version()
            .and_then(|n| numbers.iter().position(|v| *v == n));
        let next = current.map_or(0, |i| (i + 1) % numbers.len().max(1));
        if let Some(number) = numbers.get(next) {
            self.editor.select_reference_version(*number);
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [header, ruler, bands, lists, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(RULER_ROWS),
            Constraint::Length(BAND_ROWS),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(area);
        self.band_area = bands;

        let clock = self.editor.clock();
        let title = format!(
            " subline | {:.1}s / {:.1}s | zoom {:.0}% | {} ",
            clock.current_time(),
            clock.duration(),
            clock.scale() * 100.0,
            if self.playing { "playing" } else { "paused" },
        );
        frame.render_widget(
            Paragraph::new(title).style(Style::default().fg(Color::White).bg(Color::DarkGray)),
            header,
        );

        renderer::paint_ruler(frame.buffer_mut(), ruler, self.editor.ruler_commands());
        let band_cmds = self.editor.band_commands();
        renderer::paint_bands(frame.buffer_mut(), bands, &band_cmds);

        let window = self.editor.timeline().window();
        if !window.is_empty() {
            let col = renderer::column_of(window.time_to_x(self.editor.clock().current_time()));
            if let Ok(col) = u16::try_from(col)
                && col < ruler.width
            {
                frame.buffer_mut()[(ruler.x + col, ruler.y)]
                    .set_char('▼')
                    .set_fg(renderer::theme_to_color(subline_protocol::ThemeToken::SelectionHighlight));
            }
        }

        let [left, right] =
            Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(lists);
        self.draw_working(frame, left);
        self.draw_reference(frame, right);

        let line = if let Some(edit) = &self.edit {
            format!(" edit> {}_", edit.buffer)
        } else if let Some(message) = &self.message {
            format!(" {message}")
        } else {
            " ←→ seek  +/- zoom  space play  ↑↓ select  enter edit  s save  r/v reference  q quit"
                .to_string()
        };
        let save = if self.editor.can_save() { " [unsaved]" } else { "" };
        frame.render_widget(
            Paragraph::new(Line::from(format!("{line}{save}")))
                .style(Style::default().fg(Color::Gray)),
            status,
        );
    }

    fn draw_working(&self, frame: &mut Frame, area: Rect) {
        let working = self.editor.working();
        let title = match working.status() {
            ListStatus::Failed(reason) => format!(" Editing: {reason} "),
            status => format!(
                " Editing {} ({status:?}) ",
                working.language_code().unwrap_or("-")
            ),
        };
        let items: Vec<ListItem> = working
            .items()
            .iter()
            .map(|item| {
                ListItem::new(format!(
                    "{} {} {}",
                    format_ms(item.start_time),
                    format_ms(item.end_time),
                    band_label(&item.text)
                ))
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        let mut state = ListState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_reference(&self, frame: &mut Frame, area: Rect) {
        let selector = self.editor.selector();
        let title = format!(
            " Reference {} v{} ",
            selector.language().map_or("-", |l| l.name.as_str()),
            selector.version().map_or("-".to_string(), |v| v.to_string()),
        );
        let items: Vec<ListItem> = self
            .editor
            .reference()
            .items()
            .iter()
            .map(|item| ListItem::new(format!("{} {}", format_ms(item.start_time), band_label(&item.text))))
            .collect();
        frame.render_widget(
            List::new(items).block(Block::default().borders(Borders::ALL).title(title)),
            area,
        );
    }
}
