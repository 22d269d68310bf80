use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use richline_config::Config;
use richline_engine::{
    ActiveState, BlockOwner, HostEditor, LineAnnotation, LineRange, ListCommand, ListScope,
    ListTag, RichTextValue, SelectionInspector, ShortcutModifier, ToggleController, active_list_type,
    lookup,
};
use std::{env, io::stdout, path::PathBuf, process};

/// Host-side editing surface: one entry per line, with `Some(tag)` marking
/// membership of a nested list. Unmarked lines sit directly in the root
/// content flow, which the block renders as its root list.
struct EditorPane {
    focused: bool,
    cursor: usize,
    /// Tag of the body element the block renders as; mirrored from the
    /// owner on every render cycle.
    root_tag: ListTag,
    lines: Vec<(String, Option<ListTag>)>,
}

impl EditorPane {
    fn from_text(text: &str, root_tag: ListTag) -> Self {
        let lines: Vec<(String, Option<ListTag>)> = text
            .lines()
            .map(|line| (line.to_string(), None))
            .collect();
        Self {
            focused: true,
            cursor: 0,
            root_tag,
            lines: if lines.is_empty() {
                vec![(String::new(), None)]
            } else {
                lines
            },
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let last = self.lines.len().saturating_sub(1);
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
    }

    /// Byte offset of the cursor's line start within the joined text,
    /// used to hand the block a collapsed selection on the caret line.
    fn cursor_offset(&self) -> usize {
        self.lines[..self.cursor]
            .iter()
            .map(|(line, _)| line.len() + 1)
            .sum()
    }

    /// Rebuild a line-format value from the pane's current state.
    fn rebuild_value(&self) -> RichTextValue {
        let text = self
            .lines
            .iter()
            .map(|(line, _)| line.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let annotations = self
            .lines
            .iter()
            .enumerate()
            .filter_map(|(ix, (_, tag))| {
                tag.map(|tag| LineAnnotation {
                    tag,
                    lines: LineRange::new(ix, ix + 1),
                })
            })
            .collect();
        let mut value = RichTextValue::from_plain_text(&text)
            .with_annotations(annotations)
            .expect("pane lines always map to valid annotations");
        let offset = self.cursor_offset();
        value.set_selection(offset..offset);
        value
    }

    /// Push a committed value's annotations back onto the pane, the host
    /// half of keeping both representations in step.
    fn adopt(&mut self, value: &RichTextValue) {
        for (ix, (_, tag)) in self.lines.iter_mut().enumerate() {
            *tag = value.line_format(ix);
        }
    }
}

impl SelectionInspector for EditorPane {
    fn has_focus(&self) -> bool {
        self.focused
    }

    fn has_selection(&self) -> bool {
        !self.lines.is_empty()
    }

    fn nearest_list(&self) -> Option<ListScope> {
        match self.lines.get(self.cursor).and_then(|(_, tag)| *tag) {
            Some(tag) => Some(ListScope {
                tag,
                at_root: false,
            }),
            // A line in the root content flow: its nearest list is the
            // body element itself.
            None => Some(ListScope {
                tag: self.root_tag,
                at_root: true,
            }),
        }
    }
}

impl HostEditor for EditorPane {
    fn exec_command(&mut self, command: ListCommand) -> bool {
        let Some(entry) = self.lines.get_mut(self.cursor) else {
            return false;
        };
        entry.1 = Some(command.tag());
        true
    }
}

/// The owner of the rich-text block: current value, root tag, and a
/// deferred-resync flag consumed on the next pass of the event loop.
struct ListBlock {
    value: RichTextValue,
    root_tag: ListTag,
    needs_resync: bool,
}

impl BlockOwner for ListBlock {
    fn change_root_tag(&mut self, tag: ListTag) {
        self.root_tag = tag;
    }

    fn resync(&mut self) {
        self.needs_resync = true;
    }

    fn commit(&mut self, value: RichTextValue) {
        self.value = value;
    }
}

struct App {
    editor: EditorPane,
    block: ListBlock,
    controller: ToggleController,
    list_state: ListState,
    status: String,
}

impl App {
    fn new(text: &str, root_tag: ListTag) -> Self {
        let editor = EditorPane::from_text(text, root_tag);
        let value = editor.rebuild_value();
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            editor,
            block: ListBlock {
                value,
                root_tag,
                needs_resync: false,
            },
            controller: ToggleController::new(),
            list_state,
            status: String::new(),
        }
    }

    fn request_list_type(&mut self, tag: ListTag) {
        self.controller
            .request_list_type(&mut self.editor, &mut self.block, tag);
        self.status = format!("requested {}", tag.tag_name());
    }

    fn run_shortcut(&mut self, modifier: ShortcutModifier, character: char) {
        // Bindings only fire while the editing surface holds focus.
        if !self.editor.focused {
            return;
        }
        let Some(action) = lookup(modifier, character) else {
            return;
        };
        let value = self.block.value.clone();
        let root_tag = self.block.root_tag;
        match self
            .controller
            .handle_shortcut(action, &mut self.block, &value, root_tag)
        {
            Ok(()) => {
                // Committed values flow back onto the editing surface.
                self.editor.adopt(&self.block.value);
                self.status = format!("{action:?}");
            }
            Err(e) => self.status = format!("rejected: {e}"),
        }
    }

    /// The render-cycle half of the control flow: consume a pending resync
    /// by rebuilding the value from the mutated editor state, and keep the
    /// cursor selection in step.
    fn settle(&mut self) {
        self.editor.root_tag = self.block.root_tag;
        if self.block.needs_resync {
            self.block.needs_resync = false;
            self.block.value = self.editor.rebuild_value();
        } else {
            let offset = self.editor.cursor_offset();
            self.block.value.set_selection(offset..offset);
        }
        self.list_state.select(Some(self.editor.cursor));
    }

    /// Rendered document lines with their list markers.
    fn rendered_lines(&self) -> Vec<String> {
        let mut root_index = 0usize;
        let mut nested_index = 0usize;
        let mut nested_tag = None;
        let mut out = Vec::with_capacity(self.editor.lines.len());
        for (ix, (text, _)) in self.editor.lines.iter().enumerate() {
            match self.block.value.line_format(ix) {
                Some(tag) => {
                    if nested_tag != Some(tag) {
                        nested_index = 0;
                        nested_tag = Some(tag);
                    }
                    nested_index += 1;
                    out.push(format!("    {} {}", marker(tag, nested_index), text));
                }
                None => {
                    nested_tag = None;
                    root_index += 1;
                    out.push(format!("{} {}", marker(self.block.root_tag, root_index), text));
                }
            }
        }
        out
    }

    fn active_marker(&self, tag: ListTag) -> &'static str {
        match active_list_type(&self.editor, tag, self.block.root_tag) {
            ActiveState::Active => "on",
            ActiveState::Inactive => "off",
            ActiveState::Indeterminate => "?",
        }
    }
}

fn marker(tag: ListTag, index: usize) -> String {
    match tag {
        ListTag::Unordered => "•".to_string(),
        ListTag::Ordered => format!("{index}."),
    }
}

fn main() -> Result<()> {
    // Determine document path from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let document_path;
    let mut root_tag = ListTag::Unordered;

    if args.len() == 2 {
        document_path = PathBuf::from(&args[1]);
    } else if args.len() == 1 {
        match Config::load() {
            Ok(Some(config)) => {
                root_tag = ListTag::from_tag_name(&config.default_list_tag)
                    .unwrap_or(ListTag::Unordered);
                document_path = config.document_path;
            }
            Ok(None) => {
                eprintln!("Error: No document path provided and no config file found");
                eprintln!("Usage: {} <document-path>", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: Failed to load config file: {e}");
                eprintln!("Usage: {} <document-path>", args[0]);
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [document-path]", args[0]);
        process::exit(1);
    };

    let text = std::fs::read_to_string(&document_path)
        .with_context(|| format!("reading document '{}'", document_path.display()))?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app
    let mut app = App::new(&text, root_tag);

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    <B as ratatui::backend::Backend>::Error: Send + Sync + 'static,
{
    loop {
        app.settle();
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                if let KeyCode::Char(c) = key.code {
                    let modifier = if key.modifiers.contains(KeyModifiers::SHIFT) {
                        ShortcutModifier::PrimaryShift
                    } else {
                        ShortcutModifier::Primary
                    };
                    app.run_shortcut(modifier, c.to_ascii_lowercase());
                }
                continue;
            }

            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.editor.move_cursor(1),
                KeyCode::Up | KeyCode::Char('k') => app.editor.move_cursor(-1),
                KeyCode::Tab => app.editor.focused = !app.editor.focused,
                KeyCode::Char('u') => app.request_list_type(ListTag::Unordered),
                KeyCode::Char('o') => app.request_list_type(ListTag::Ordered),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.area());

    // Document panel
    let items: Vec<ListItem> = app
        .rendered_lines()
        .into_iter()
        .map(|line| ListItem::new(vec![Line::from(vec![Span::raw(line)])]))
        .collect();

    let title = format!(
        "richline <{}> {}",
        app.block.root_tag.tag_name(),
        if app.editor.focused { "" } else { "(unfocused)" }
    );
    let document = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));

    f.render_stateful_widget(document, chunks[0], &mut app.list_state);

    // Status and key help
    let status_line = Line::from(vec![
        Span::raw(format!(
            "ul: {} | ol: {} | ",
            app.active_marker(ListTag::Unordered),
            app.active_marker(ListTag::Ordered)
        )),
        Span::raw(app.status.clone()),
    ]);
    let help_line = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("u/o: Toggle list type | "),
        Span::raw("C-]/C-m: Indent | C-[/C-S-m: Outdent | "),
        Span::raw("Tab: Focus | ↑↓: Move"),
    ]);

    let help = Paragraph::new(vec![status_line, help_line]).block(Block::default());
    f.render_widget(help, chunks[1]);
}
