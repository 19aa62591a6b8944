use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Duration;

use camino::Utf8PathBuf;
use crossterm::ExecutableCommand;
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{Installer, spawn_install};
use crate::config::{ConfigLoader, Settings};
use crate::domain::{STORMWORKS_APP_ID, looks_like_workshop_dir};
use crate::form::{Field, Form};
use crate::msg::{Severity, WorkerMsg};
use crate::picker::{DirPicker, default_start_dir};
use crate::source::XmlSource;

/// Worker results are drained on this tick.
const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Modal {
    InitialSetup,
    ConfirmPath { path: Utf8PathBuf, forced: bool },
    ConfirmExit,
    PathRequired,
}

struct PickerSession {
    picker: DirPicker,
    forced: bool,
}

pub struct Window<S: XmlSource + 'static> {
    form: Form,
    installer: Arc<Installer<S>>,
    config: ConfigLoader,
    settings: Settings,
    tx: Sender<WorkerMsg>,
    rx: Receiver<WorkerMsg>,
    modal: Option<Modal>,
    picker: Option<PickerSession>,
    log_scroll: u16,
    quit: bool,
}

impl<S: XmlSource + 'static> Window<S> {
    pub fn new(installer: Installer<S>, config: ConfigLoader) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut form = Form::new("");
        let settings = match config.load() {
            Ok(Some(settings)) => {
                form.info("Configuration loaded.");
                settings
            }
            Ok(None) => {
                form.info("Config file not found. Please set the Steam Workshop Content path.");
                Settings::default()
            }
            Err(err) => {
                form.error(format!("Error: {err}"));
                Settings::default()
            }
        };
        form.set_workshop_dir(settings.workshop_dir());

        let mut window = Self {
            form,
            installer: Arc::new(installer),
            config,
            settings,
            tx,
            rx,
            modal: None,
            picker: None,
            log_scroll: 0,
            quit: false,
        };
        window.ensure_initial_config();
        window
    }

    pub fn run(mut self) -> miette::Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;
        stdout.execute(EnableBracketedPaste).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(DisableBracketedPaste).into_diagnostic()?;
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> miette::Result<()> {
        loop {
            self.drain_worker();
            terminal
                .draw(|frame| draw_ui(frame, self))
                .into_diagnostic()?;
            if self.quit {
                tracing::info!("window closed");
                return Ok(());
            }

            if event::poll(TICK).into_diagnostic()? {
                match event::read().into_diagnostic()? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Paste(text) if self.modal.is_none() && self.picker.is_none() => {
                        self.form.paste(&text)
                    }
                    _ => {}
                }
            }
        }
    }

    fn drain_worker(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(msg) => {
                    if matches!(msg, WorkerMsg::Log(_)) {
                        self.log_scroll = 0;
                    }
                    self.form.apply(msg);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn ensure_initial_config(&mut self) {
        let current = self.form.workshop_dir();
        if current.is_empty() || !std::path::Path::new(current).is_dir() {
            self.modal = Some(Modal::InitialSetup);
        }
    }

    fn open_picker(&mut self, forced: bool) {
        let start = default_start_dir();
        tracing::debug!(start = %start, forced, "opening folder picker");
        self.picker = Some(PickerSession {
            picker: DirPicker::open(&start),
            forced,
        });
    }

    fn choose_folder(&mut self, path: Utf8PathBuf, forced: bool) {
        if looks_like_workshop_dir(&path) {
            self.accept_folder(path);
        } else {
            self.modal = Some(Modal::ConfirmPath { path, forced });
        }
    }

    fn accept_folder(&mut self, path: Utf8PathBuf) {
        self.form.set_workshop_dir(path.as_str());
        self.settings.set_workshop_dir(path.as_str());
        match self.config.save(&self.settings) {
            Ok(()) => self.form.info("Configuration saved."),
            Err(err) => self.form.error(format!("Error: {err}")),
        }
    }

    fn start_install(&mut self) {
        let Some(request) = self.form.begin_install() else {
            return;
        };
        self.log_scroll = 0;
        tracing::info!(item = %request.item_input, url = %request.source_url, "install requested");
        // Detached: the run cannot be cancelled and reports back through the channel.
        let _ = spawn_install(self.installer.clone(), request, self.tx.clone());
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if let Some(modal) = self.modal.take() {
            self.handle_modal_key(modal, key);
            return;
        }
        if let Some(session) = self.picker.take() {
            self.handle_picker_key(session, key);
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => self.quit = true,
            KeyCode::Char('u') if ctrl => self.form.clear_field(),
            KeyCode::Esc => self.quit = true,
            KeyCode::Tab | KeyCode::Down => self.form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.form.focus_prev(),
            KeyCode::F(2) => self.open_picker(false),
            KeyCode::F(5) => self.start_install(),
            KeyCode::PageUp => self.scroll_log(5),
            KeyCode::PageDown => self.scroll_log(-5),
            KeyCode::Enter => match self.form.focus() {
                Field::Browse => self.open_picker(false),
                Field::Install => self.start_install(),
                Field::ItemInput | Field::SourceUrl => self.form.focus_next(),
            },
            KeyCode::Backspace => self.form.backspace(),
            KeyCode::Char(ch) if !ctrl => self.form.input_char(ch),
            _ => {}
        }
    }

    fn handle_modal_key(&mut self, modal: Modal, key: KeyEvent) {
        let yes = matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'));
        let no = matches!(
            key.code,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc
        );
        match modal {
            Modal::InitialSetup => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                    self.open_picker(true);
                } else {
                    self.modal = Some(Modal::InitialSetup);
                }
            }
            Modal::ConfirmPath { path, forced } => {
                if yes {
                    self.accept_folder(path);
                } else if no {
                    self.form.info("Workshop path selection cancelled.");
                    if forced && self.form.workshop_dir().is_empty() {
                        self.modal = Some(Modal::ConfirmExit);
                    }
                } else {
                    self.modal = Some(Modal::ConfirmPath { path, forced });
                }
            }
            Modal::ConfirmExit => {
                if yes {
                    self.quit = true;
                } else if !no {
                    self.modal = Some(Modal::ConfirmExit);
                }
            }
            Modal::PathRequired => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                    self.quit = true;
                } else {
                    self.modal = Some(Modal::PathRequired);
                }
            }
        }
    }

    fn handle_picker_key(&mut self, mut session: PickerSession, key: KeyEvent) {
        match key.code {
            KeyCode::Up => session.picker.move_up(),
            KeyCode::Down => session.picker.move_down(),
            KeyCode::Enter | KeyCode::Right => session.picker.descend(),
            KeyCode::Backspace | KeyCode::Left => session.picker.ascend(),
            KeyCode::Char('s') | KeyCode::Char('S') => {
                let path = session.picker.cwd().to_path_buf();
                tracing::info!(path = %path, "folder selected");
                self.choose_folder(path, session.forced);
                return;
            }
            KeyCode::Esc => {
                if session.forced && self.form.workshop_dir().is_empty() {
                    self.modal = Some(Modal::PathRequired);
                }
                return;
            }
            _ => {}
        }
        self.picker = Some(session);
    }

    fn scroll_log(&mut self, delta: i16) {
        let max_scroll = self.form.log_rows().saturating_sub(1).min(i16::MAX as usize) as i16;
        let next = (self.log_scroll as i16).saturating_add(delta).clamp(0, max_scroll);
        self.log_scroll = next as u16;
    }
}

fn draw_ui<S: XmlSource + 'static>(frame: &mut ratatui::Frame, window: &Window<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_config_panel(frame, window, chunks[0]);
    draw_inputs_panel(frame, window, chunks[1]);
    draw_trigger(frame, &window.form, chunks[2]);
    draw_log(frame, window, chunks[3]);

    let hints = Paragraph::new(Line::from(
        "Tab: next field  Enter: activate  F2: browse  F5: install  PgUp/PgDn: scroll log  Esc: quit",
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hints, chunks[4]);

    if let Some(session) = &window.picker {
        draw_picker(frame, session);
    }
    if let Some(modal) = &window.modal {
        draw_modal(frame, modal);
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn draw_config_panel<S: XmlSource + 'static>(
    frame: &mut ratatui::Frame,
    window: &Window<S>,
    area: Rect,
) {
    let form = &window.form;
    let path = if form.workshop_dir().is_empty() {
        Span::styled("(not set)", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(form.workshop_dir().to_string())
    };
    let line = Line::from(vec![
        Span::styled(
            "Stormworks Workshop Content Path: ",
            Style::default().fg(Color::Gray),
        ),
        path,
        Span::raw("  "),
        Span::styled("[Browse...]", focus_style(form.focus() == Field::Browse)),
    ]);
    let panel = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Configuration"),
    );
    frame.render_widget(panel, area);
}

fn draw_inputs_panel<S: XmlSource + 'static>(
    frame: &mut ratatui::Frame,
    window: &Window<S>,
    area: Rect,
) {
    let form = &window.form;
    let item_label = "Dummy Workshop Item URL/ID: ";
    let url_label = "Vehicle XML Raw URL:        ";
    let lines = vec![
        Line::from(vec![
            Span::styled(item_label, focus_style(form.focus() == Field::ItemInput)),
            Span::raw(form.item_input().to_string()),
        ]),
        Line::from(vec![
            Span::styled(url_label, focus_style(form.focus() == Field::SourceUrl)),
            Span::raw(form.source_url().to_string()),
        ]),
    ];
    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Vehicle Installation"),
    );
    frame.render_widget(panel, area);

    if window.modal.is_none() && window.picker.is_none() && form.focus().is_text() {
        let (row, label, text) = match form.focus() {
            Field::SourceUrl => (1, url_label, form.source_url()),
            _ => (0, item_label, form.item_input()),
        };
        let x = area.x + 1 + (label.len() + text.chars().count()) as u16;
        let x = x.min(area.x + area.width.saturating_sub(2));
        frame.set_cursor_position((x, area.y + 1 + row));
    }
}

fn draw_trigger(frame: &mut ratatui::Frame, form: &Form, area: Rect) {
    let style = if !form.trigger_enabled() {
        Style::default().fg(Color::DarkGray)
    } else if form.focus() == Field::Install {
        Style::default()
            .fg(Color::Black)
            .bg(Color::LightBlue)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::LightBlue)
    };
    let button = Paragraph::new(Line::from(form.trigger_label()))
        .alignment(Alignment::Center)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(button, area);
}

fn draw_log<S: XmlSource + 'static>(frame: &mut ratatui::Frame, window: &Window<S>, area: Rect) {
    let mut lines = Vec::new();
    for line in window.form.log_lines() {
        let style = match line.entry.severity {
            Severity::Error => Style::default().fg(Color::Red),
            Severity::Info => Style::default(),
        };
        for (index, part) in line.parts().enumerate() {
            let stamp = if index == 0 {
                format!("[{}] ", line.stamp)
            } else {
                " ".repeat(line.stamp.len() + 3)
            };
            lines.push(Line::from(vec![
                Span::styled(stamp, Style::default().fg(Color::DarkGray)),
                Span::styled(part.to_string(), style),
            ]));
        }
    }

    // Follow the tail unless the user scrolled back.
    let visible = area.height.saturating_sub(2) as usize;
    let bottom = lines.len().saturating_sub(visible);
    let offset = bottom.saturating_sub(window.log_scroll as usize) as u16;

    let log = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Log"))
        .scroll((offset, 0));
    frame.render_widget(log, area);
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_picker(frame: &mut ratatui::Frame, session: &PickerSession) {
    let area = popup_area(frame.area(), 80, 20);
    frame.render_widget(Clear, area);

    let title = format!("Select Stormworks Workshop Folder ({STORMWORKS_APP_ID})");
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(inner);

    let picker = &session.picker;
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("In: ", Style::default().fg(Color::Gray)),
            Span::styled(picker.cwd().to_string(), Style::default().fg(Color::Cyan)),
        ])),
        chunks[0],
    );

    if let Some(error) = picker.error() {
        frame.render_widget(
            Paragraph::new(error.to_string())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true }),
            chunks[1],
        );
    } else {
        let items = picker
            .entries()
            .iter()
            .map(|name| ListItem::new(format!("{name}/")))
            .collect::<Vec<_>>();
        let list = List::new(items).highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
        let mut state = ListState::default().with_selected(Some(picker.selected()));
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }

    frame.render_widget(
        Paragraph::new("Enter/->: open  Backspace/<-: up  s: select this folder  Esc: cancel")
            .style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

fn draw_modal(frame: &mut ratatui::Frame, modal: &Modal) {
    let (title, body, border): (&str, Vec<String>, Color) = match modal {
        Modal::InitialSetup => (
            "Initial Setup",
            vec![
                "Please select your Stormworks Workshop content folder.".to_string(),
                format!(r"Example: C:\...\Steam\steamapps\workshop\content\{STORMWORKS_APP_ID}"),
                String::new(),
                "Press Enter to browse.".to_string(),
            ],
            Color::Cyan,
        ),
        Modal::ConfirmPath { path, .. } => (
            "Path Confirmation",
            vec![
                "The selected path:".to_string(),
                format!("'{path}'"),
                format!(
                    "doesn't look like the specific Stormworks content folder (e.g., ...{}{STORMWORKS_APP_ID}).",
                    std::path::MAIN_SEPARATOR
                ),
                "Is this correct? (y/n)".to_string(),
            ],
            Color::Yellow,
        ),
        Modal::ConfirmExit => (
            "Exit Application?",
            vec![
                "The workshop path is crucial and was not set. Exit? (y/n)".to_string(),
            ],
            Color::Yellow,
        ),
        Modal::PathRequired => (
            "Path Required",
            vec![
                "Steam Workshop Content path is required to use this tool.".to_string(),
                String::new(),
                "Press Enter to exit.".to_string(),
            ],
            Color::Red,
        ),
    };

    let area = popup_area(frame.area(), 76, body.len() as u16 + 4);
    frame.render_widget(Clear, area);
    let text = Paragraph::new(body.into_iter().map(Line::from).collect::<Vec<_>>())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(border)),
        );
    frame.render_widget(text, area);
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::error::InstallError;

    struct NoNetwork;

    impl XmlSource for NoNetwork {
        fn fetch_text(&self, _url: &str) -> Result<String, InstallError> {
            Err(InstallError::FetchTransport("offline".to_string()))
        }
    }

    fn press(window: &mut Window<NoNetwork>, code: KeyCode) {
        window.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn window_in(temp: &tempfile::TempDir) -> (Window<NoNetwork>, Utf8PathBuf) {
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let config = ConfigLoader::new(Some(root.join("settings.json").as_str()));
        (Window::new(Installer::new(NoNetwork), config), root)
    }

    fn log_has(window: &Window<NoNetwork>, message: &str) -> bool {
        window
            .form
            .log_lines()
            .any(|line| line.entry.message == message)
    }

    #[test]
    fn first_run_declining_odd_folder_offers_exit() {
        let temp = tempfile::tempdir().unwrap();
        let (mut window, root) = window_in(&temp);
        assert_eq!(window.modal, Some(Modal::InitialSetup));
        assert!(log_has(
            &window,
            "Config file not found. Please set the Steam Workshop Content path."
        ));

        press(&mut window, KeyCode::Enter);
        assert!(window.picker.as_ref().is_some_and(|session| session.forced));
        window.picker = Some(PickerSession {
            picker: DirPicker::open(&root),
            forced: true,
        });

        press(&mut window, KeyCode::Char('s'));
        assert_matches::assert_matches!(window.modal, Some(Modal::ConfirmPath { forced: true, .. }));

        press(&mut window, KeyCode::Char('n'));
        assert!(log_has(&window, "Workshop path selection cancelled."));
        assert_eq!(window.modal, Some(Modal::ConfirmExit));

        press(&mut window, KeyCode::Char('y'));
        assert!(window.quit);
    }

    #[test]
    fn selecting_workshop_folder_saves_config() {
        let temp = tempfile::tempdir().unwrap();
        let (mut window, root) = window_in(&temp);
        let content = root.join("573090");
        std::fs::create_dir_all(&content).unwrap();

        window.modal = None;
        window.picker = Some(PickerSession {
            picker: DirPicker::open(&content),
            forced: true,
        });
        press(&mut window, KeyCode::Char('s'));

        assert!(window.modal.is_none());
        assert_eq!(window.form.workshop_dir(), content.as_str());
        assert!(log_has(&window, "Configuration saved."));
        let saved = window.config.load().unwrap().unwrap();
        assert_eq!(saved.workshop_dir(), content.as_str());

        let (reopened, _) = window_in(&temp);
        assert!(reopened.modal.is_none());
        assert_eq!(reopened.form.workshop_dir(), content.as_str());
    }

    #[test]
    fn dismissing_forced_picker_without_path_exits() {
        let temp = tempfile::tempdir().unwrap();
        let (mut window, _) = window_in(&temp);

        press(&mut window, KeyCode::Enter);
        press(&mut window, KeyCode::Esc);
        assert_eq!(window.modal, Some(Modal::PathRequired));
        assert!(!window.quit);

        press(&mut window, KeyCode::Enter);
        assert!(window.quit);
    }

    #[test]
    fn install_key_is_ignored_while_run_in_flight() {
        let temp = tempfile::tempdir().unwrap();
        let (mut window, root) = window_in(&temp);
        window.modal = None;
        window.form.set_workshop_dir(root.as_str());

        press(&mut window, KeyCode::F(5));
        assert!(!window.form.trigger_enabled());
        press(&mut window, KeyCode::F(5));

        let deadline = Instant::now() + Duration::from_secs(5);
        while !window.form.trigger_enabled() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
            window.drain_worker();
        }
        assert!(window.form.trigger_enabled());
        let starts = window
            .form
            .log_lines()
            .filter(|line| line.entry.message == "--- Starting Installation Process ---")
            .count();
        assert_eq!(starts, 1);
        assert!(log_has(&window, "Error: all input fields are required"));
    }

    #[test]
    fn log_scroll_counts_drawn_rows() {
        let temp = tempfile::tempdir().unwrap();
        let (mut window, _root) = window_in(&temp);
        window.modal = None;
        window
            .form
            .error("Error: item folder missing\nsubscribe first\nthen retry");
        assert_eq!(window.form.log_len(), 2);
        assert_eq!(window.form.log_rows(), 4);

        press(&mut window, KeyCode::PageUp);
        press(&mut window, KeyCode::PageUp);
        assert_eq!(window.log_scroll, 3);

        press(&mut window, KeyCode::PageDown);
        assert_eq!(window.log_scroll, 0);
    }
}
