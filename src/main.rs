use anyhow::{Context, Result};
use category_tree::broadcast::TreeSnapshot;
use category_tree::config::Config;
use category_tree::{seed, CategoryEngine, FlatId};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use std::fs::OpenOptions;
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// What the text prompt is collecting a name for.
#[derive(Debug, Clone, Copy)]
enum Prompt {
    AddTopLevel,
    AddSubcategory(FlatId),
    Rename(FlatId),
}

impl Prompt {
    fn title(&self, app: &App) -> String {
        match self {
            Prompt::AddTopLevel => " Add category ".to_string(),
            Prompt::AddSubcategory(parent) => {
                format!(" Add subcategory for {} ", app.name_of(*parent))
            }
            Prompt::Rename(flat) => format!(" Rename {} ", app.name_of(*flat)),
        }
    }
}

#[derive(Default, Clone, Copy)]
struct UiLayoutState {
    tree_inner_area: Option<Rect>,
    scroll_offset: usize,
}

struct App {
    engine: CategoryEngine,
    tree_rx: Receiver<TreeSnapshot>,
    publications: u64,
    top_level_count: usize,

    cursor: usize,
    prompt: Option<Prompt>,
    input: String,
    status: String,
    ui_layout: UiLayoutState,

    should_quit: bool,
}

impl App {
    fn new(mut engine: CategoryEngine) -> Self {
        let (_, tree_rx) = engine.subscribe_channel();
        Self {
            engine,
            tree_rx,
            publications: 0,
            top_level_count: 0,
            cursor: 0,
            prompt: None,
            input: String::new(),
            status: String::from("Space: check   a: add   s: add sub   r: rename"),
            ui_layout: UiLayoutState::default(),
            should_quit: false,
        }
    }

    fn poll_tree_updates(&mut self) {
        loop {
            match self.tree_rx.try_recv() {
                Ok(tree) => {
                    self.publications += 1;
                    self.top_level_count = tree.len();
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("tree channel disconnected");
                    break;
                }
            }
        }
    }

    fn rows(&self) -> Vec<FlatId> {
        self.engine.visible_rows()
    }

    fn current(&self) -> Option<FlatId> {
        self.rows().get(self.cursor).copied()
    }

    fn name_of(&self, flat: FlatId) -> String {
        self.engine
            .flat_node(flat)
            .map(|n| n.category_name.clone())
            .unwrap_or_default()
    }

    fn clamp_cursor(&mut self) {
        let len = self.rows().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.rows().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self.cursor.saturating_add_signed(delta).min(len - 1);
    }

    /// Put the cursor back on `flat` after the rows were re-derived.
    fn focus(&mut self, flat: FlatId) {
        if let Some(pos) = self.rows().iter().position(|id| *id == flat) {
            self.cursor = pos;
        }
    }

    fn open_prompt(&mut self, prompt: Prompt) {
        self.input = match prompt {
            Prompt::Rename(flat) => self.name_of(flat),
            _ => String::new(),
        };
        self.prompt = Some(prompt);
    }

    fn submit_prompt(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let name = std::mem::take(&mut self.input);
        let result = match prompt {
            Prompt::AddTopLevel => self.engine.add_top_level_category(&name).map(|node| {
                if let Some(flat) = self.engine.flat_for(node) {
                    self.focus(flat);
                }
                format!("Added category {name}")
            }),
            Prompt::AddSubcategory(parent) => self
                .engine
                .add_subcategory(parent, &name)
                .map(|_| format!("Added subcategory {name}")),
            Prompt::Rename(flat) => {
                let nested = self.engine.resolve_nested(flat);
                self.engine.rename_category(flat, &name).map(|()| {
                    if let Some(renamed) = nested.ok().and_then(|n| self.engine.flat_for(n)) {
                        self.focus(renamed);
                    }
                    format!("Renamed to {name}")
                })
            }
        };
        self.status = match result {
            Ok(message) => message,
            Err(err) => format!("Not applied: {err}"),
        };
        self.clamp_cursor();
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
            self.should_quit = true;
            return;
        }

        if self.prompt.is_some() {
            match key.code {
                KeyCode::Enter => self.submit_prompt(),
                KeyCode::Esc => {
                    // A dismissed prompt is simply ignored.
                    self.prompt = None;
                    self.input.clear();
                }
                KeyCode::Backspace => {
                    self.input.pop();
                }
                KeyCode::Char(ch) => self.input.push(ch),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Enter => self.toggle_current_expanded(),
            KeyCode::Left | KeyCode::Char('h') => self.collapse_or_parent(),
            KeyCode::Char(' ') => self.toggle_current_selection(),
            KeyCode::Char('a') => self.open_prompt(Prompt::AddTopLevel),
            KeyCode::Char('s') => {
                if let Some(flat) = self.current() {
                    self.open_prompt(Prompt::AddSubcategory(flat));
                }
            }
            KeyCode::Char('r') => {
                if let Some(flat) = self.current() {
                    self.open_prompt(Prompt::Rename(flat));
                }
            }
            KeyCode::Char('x') => {
                let records = self.engine.toggle_hidden_for_selection();
                let hidden = records.iter().filter(|r| r.is_hidden).count();
                self.status = format!("{hidden} categories hidden");
                self.clamp_cursor();
            }
            KeyCode::Char('H') => {
                let show = !self.engine.show_hidden();
                self.engine.set_show_hidden(show);
                self.status = if show {
                    "Showing hidden categories"
                } else {
                    "Hiding hidden categories"
                }
                .to_string();
                self.clamp_cursor();
            }
            KeyCode::Esc => self.status.clear(),
            _ => {}
        }
    }

    fn on_mouse(&mut self, event: MouseEvent) {
        let Some(area) = self.ui_layout.tree_inner_area else {
            return;
        };
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if point_in_rect(area, event.column, event.row) {
                    let row = self.ui_layout.scroll_offset + usize::from(event.row - area.y);
                    if row < self.rows().len() {
                        self.cursor = row;
                        self.toggle_current_expanded();
                    }
                }
            }
            MouseEventKind::ScrollDown => self.move_cursor(1),
            MouseEventKind::ScrollUp => self.move_cursor(-1),
            _ => {}
        }
    }

    fn toggle_current_expanded(&mut self) {
        if let Some(flat) = self.current() {
            if self.engine.is_expandable(flat) {
                self.engine.toggle_expanded(flat);
            }
        }
    }

    fn collapse_or_parent(&mut self) {
        let Some(flat) = self.current() else {
            return;
        };
        if self.engine.is_expanded(flat) {
            self.engine.toggle_expanded(flat);
            return;
        }
        if let Some(parent) = self.engine.parent_of(flat) {
            self.focus(parent);
        }
    }

    fn toggle_current_selection(&mut self) {
        let Some(flat) = self.current() else {
            return;
        };
        match self.engine.toggle_selection(flat) {
            Ok(true) => self.status = format!("Checked {}", self.name_of(flat)),
            Ok(false) => self.status = format!("Unchecked {}", self.name_of(flat)),
            Err(err) => self.status = err.to_string(),
        }
    }
}

fn point_in_rect(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn row_line(app: &App, flat: FlatId, is_cursor: bool) -> Line<'static> {
    let engine = &app.engine;
    let Some(node) = engine.flat_node(flat) else {
        return Line::default();
    };

    let expander = if !node.expandable {
        "  "
    } else if engine.is_expanded(flat) {
        "▾ "
    } else {
        "▸ "
    };
    let checkbox = if engine.is_selected(flat) {
        "[x] "
    } else if engine.descendants_partially_selected(flat) {
        "[-] "
    } else {
        "[ ] "
    };

    let mut name_style = Style::default().fg(Color::White);
    if node.is_hidden {
        name_style = name_style.fg(Color::DarkGray).add_modifier(Modifier::ITALIC);
    }
    if is_cursor {
        name_style = name_style.add_modifier(Modifier::REVERSED);
    }

    let mut spans = vec![
        Span::raw("  ".repeat(node.level)),
        Span::styled(expander, Style::default().fg(Color::Cyan)),
        Span::styled(checkbox, Style::default().fg(Color::Yellow)),
        Span::styled(node.category_name.clone(), name_style),
    ];
    if node.is_hidden {
        spans.push(Span::styled(" (hidden)", Style::default().fg(Color::DarkGray)));
    }
    Line::from(spans)
}

fn draw_ui(frame: &mut Frame, app: &mut App) {
    let root = frame.area();
    let split = Layout::horizontal([Constraint::Min(30), Constraint::Length(44)]).split(root);
    let left = split[0];
    let right = split[1];

    let tree_block = Block::default()
        .title(" Categories ")
        .borders(Borders::ALL);
    let tree_inner = tree_block.inner(left);
    frame.render_widget(tree_block, left);
    app.ui_layout.tree_inner_area = Some(tree_inner);

    let rows = app.rows();
    let height = usize::from(tree_inner.height).max(1);
    let offset = &mut app.ui_layout.scroll_offset;
    if app.cursor < *offset {
        *offset = app.cursor;
    } else if app.cursor >= *offset + height {
        *offset = app.cursor + 1 - height;
    }
    let offset = *offset;

    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new("No categories. Press a to add one.")
                .style(Style::default().fg(Color::Gray)),
            tree_inner,
        );
    } else {
        let lines: Vec<Line> = rows
            .iter()
            .enumerate()
            .skip(offset)
            .take(height)
            .map(|(i, flat)| row_line(app, *flat, i == app.cursor))
            .collect();
        frame.render_widget(Paragraph::new(lines), tree_inner);
    }

    let right_rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(7),
        Constraint::Min(9),
    ])
    .split(right);

    let (prompt_title, prompt_style) = match app.prompt {
        Some(prompt) => (prompt.title(app), Style::default().fg(Color::Yellow)),
        None => (" Name ".to_string(), Style::default().fg(Color::Gray)),
    };
    frame.render_widget(
        Paragraph::new(app.input.as_str())
            .style(prompt_style)
            .block(Block::default().title(prompt_title).borders(Borders::ALL)),
        right_rows[0],
    );

    let checked = app
        .engine
        .checked_category()
        .map(|flat| app.name_of(flat))
        .unwrap_or_else(|| "(none)".to_string());
    let status_lines = vec![
        Line::from(app.status.clone()),
        Line::from(vec![
            Span::styled("Checked: ", Style::default().fg(Color::Gray)),
            Span::raw(checked),
        ]),
        Line::from(vec![
            Span::styled("Selected: ", Style::default().fg(Color::Gray)),
            Span::raw(app.engine.selected_count().to_string()),
            Span::raw("  "),
            Span::styled("Top level: ", Style::default().fg(Color::Gray)),
            Span::raw(app.top_level_count.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Updates: ", Style::default().fg(Color::Gray)),
            Span::raw(app.publications.to_string()),
            Span::raw("  "),
            Span::styled("Hidden shown: ", Style::default().fg(Color::Gray)),
            Span::raw(if app.engine.show_hidden() { "yes" } else { "no" }),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(status_lines)
            .block(Block::default().title(" Status ").borders(Borders::ALL)),
        right_rows[1],
    );

    let help_lines = vec![
        Line::from("j/k: move   l/Enter: expand   h: collapse"),
        Line::from("Space: check with descendants"),
        Line::from("a: add category   s: add subcategory"),
        Line::from("r: rename"),
        Line::from("x: hide checked, show the rest"),
        Line::from("H: toggle show hidden   q: quit"),
        Line::from("Prompt: Enter to apply, Esc to dismiss"),
    ];
    frame.render_widget(
        Paragraph::new(help_lines)
            .block(Block::default().title(" Controls ").borders(Borders::ALL)),
        right_rows[2],
    );
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    mut app: App,
) -> io::Result<()> {
    loop {
        app.poll_tree_updates();

        terminal.draw(|frame| {
            draw_ui(frame, &mut app);
        })?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                Event::Resize(_, _) => {}
                Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Config) -> Result<()> {
    let log_file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(&config.logging.file)
        .with_context(|| format!("failed to open log file {}", config.logging.file.display()))?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn build_engine(config: &Config) -> Result<CategoryEngine> {
    let seed_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.tree.seed_path.clone());
    let seed = match seed_path {
        Some(path) => seed::load_json(&path)
            .with_context(|| format!("failed to load seed data from {}", path.display()))?,
        None => seed::tree_data(),
    };

    let mut engine = CategoryEngine::new(seed);
    engine.initialize();
    if config.tree.expand_all {
        engine.expand_all();
    }
    if config.tree.show_hidden {
        engine.set_show_hidden(true);
    }
    Ok(engine)
}

fn main() -> Result<()> {
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    };
    init_logging(&config)?;
    info!("category-tree starting");
    if let Some(err) = config_error {
        warn!("falling back to default config: {err}");
    }

    let app = App::new(build_engine(&config)?);

    enable_raw_mode()?;
    crossterm::execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let app_result = run_app(&mut terminal, app);

    // Always restore terminal state, even if the event loop failed
    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    info!("category-tree shutting down");
    app_result.context("terminal event loop failed")
}
