//! Markdown rendering for content pages.
//!
//! Parses markdown with pulldown-cmark and converts it to styled ratatui
//! lines. Long paragraphs are left unwrapped; the content pane's Paragraph
//! widget handles wrapping at render time. Tables are laid out with
//! comfy-table at the given width.

use comfy_table::{ContentArrangement, Table};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::theme::Palette;

/// Renders markdown text into styled lines.
pub fn render_markdown(text: &str, width: usize, palette: &Palette) -> Vec<Line<'static>> {
    if text.is_empty() {
        return vec![Line::default()];
    }

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(text, options);
    let mut renderer = MarkdownRenderer::new(width, *palette);

    for event in parser {
        renderer.process_event(event);
    }

    renderer.finish()
}

/// Simple table buffer using comfy-table for layout.
#[derive(Debug, Clone, Default)]
struct TableBuffer {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    current_row: Vec<String>,
    current_cell: String,
}

impl TableBuffer {
    fn push_cell_text(&mut self, text: &str) {
        self.current_cell.push_str(text);
    }

    fn finish_cell(&mut self) {
        let cell = std::mem::take(&mut self.current_cell);
        self.current_row.push(cell);
    }

    fn finish_row(&mut self, is_header: bool) {
        let row = std::mem::take(&mut self.current_row);
        if is_header {
            self.header = row;
        } else {
            self.rows.push(row);
        }
    }

    /// Lays out the buffered table and returns plain text lines.
    fn render(&self, max_width: usize) -> Vec<String> {
        let mut table = Table::new();
        table.set_width(max_width as u16);
        table.set_content_arrangement(ContentArrangement::Dynamic);

        if !self.header.is_empty() {
            table.set_header(&self.header);
        }
        for row in &self.rows {
            table.add_row(row);
        }

        table.to_string().lines().map(String::from).collect()
    }
}

/// Internal state for markdown rendering.
struct MarkdownRenderer {
    width: usize,
    palette: Palette,
    lines: Vec<Line<'static>>,
    current_spans: Vec<Span<'static>>,
    /// Pending prefix for the next flushed line (list bullets).
    pending_prefix: Option<String>,
    bold_depth: usize,
    italic_depth: usize,
    in_code_block: bool,
    in_blockquote: bool,
    current_heading: Option<HeadingLevel>,
    /// Ordered-list counters; None entries are bullet lists.
    list_stack: Vec<Option<u64>>,
    in_table: bool,
    in_table_head: bool,
    table: TableBuffer,
}

impl MarkdownRenderer {
    fn new(width: usize, palette: Palette) -> Self {
        Self {
            width,
            palette,
            lines: Vec::new(),
            current_spans: Vec::new(),
            pending_prefix: None,
            bold_depth: 0,
            italic_depth: 0,
            in_code_block: false,
            in_blockquote: false,
            current_heading: None,
            list_stack: Vec::new(),
            in_table: false,
            in_table_head: false,
            table: TableBuffer::default(),
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => {
                if self.in_table {
                    self.table.push_cell_text(&code);
                } else {
                    self.current_spans.push(Span::styled(
                        code.to_string(),
                        Style::default().fg(self.palette.code),
                    ));
                }
            }
            Event::SoftBreak => {
                if self.in_table {
                    self.table.push_cell_text(" ");
                } else {
                    self.current_spans.push(Span::raw(" "));
                }
            }
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                let rule = "─".repeat(self.width.clamp(1, 40));
                self.lines
                    .push(Line::styled(rule, Style::default().fg(self.palette.dim)));
                self.blank_line();
            }
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_line();
                self.current_heading = Some(level);
            }
            Tag::Strong => self.bold_depth += 1,
            Tag::Emphasis => self.italic_depth += 1,
            Tag::CodeBlock(kind) => {
                self.flush_line();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind
                    && !lang.is_empty()
                {
                    self.lines.push(Line::styled(
                        format!("  ({lang})"),
                        Style::default().fg(self.palette.dim),
                    ));
                }
            }
            Tag::BlockQuote(_) => self.in_blockquote = true,
            Tag::List(start) => self.list_stack.push(start),
            Tag::Item => {
                self.flush_line();
                let depth = self.list_stack.len().saturating_sub(1);
                let indent = "  ".repeat(depth);
                let marker = match self.list_stack.last_mut() {
                    Some(Some(counter)) => {
                        let marker = format!("{indent}{counter}. ");
                        *counter += 1;
                        marker
                    }
                    _ => format!("{indent}- "),
                };
                self.pending_prefix = Some(marker);
            }
            Tag::Table(_) => {
                self.flush_line();
                self.in_table = true;
                self.table = TableBuffer::default();
            }
            Tag::TableHead => self.in_table_head = true,
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_line();
                if self.list_stack.is_empty() && !self.in_blockquote {
                    self.blank_line();
                }
            }
            TagEnd::Heading(_) => {
                self.flush_line();
                self.current_heading = None;
                self.blank_line();
            }
            TagEnd::Strong => self.bold_depth = self.bold_depth.saturating_sub(1),
            TagEnd::Emphasis => self.italic_depth = self.italic_depth.saturating_sub(1),
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.blank_line();
            }
            TagEnd::BlockQuote(_) => {
                self.flush_line();
                self.in_blockquote = false;
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::TableCell => self.table.finish_cell(),
            TagEnd::TableHead => {
                self.table.finish_row(true);
                self.in_table_head = false;
            }
            TagEnd::TableRow => self.table.finish_row(false),
            TagEnd::Table => {
                for text in self.table.render(self.width) {
                    self.lines
                        .push(Line::styled(text, Style::default().fg(self.palette.fg)));
                }
                self.in_table = false;
                self.blank_line();
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.in_table {
            self.table.push_cell_text(text);
            return;
        }
        if self.in_code_block {
            for line in text.lines() {
                self.lines.push(Line::styled(
                    format!("  {line}"),
                    Style::default().fg(self.palette.code),
                ));
            }
            return;
        }
        self.current_spans
            .push(Span::styled(text.to_string(), self.current_style()));
    }

    fn current_style(&self) -> Style {
        let mut style = Style::default().fg(self.palette.fg);

        if let Some(level) = self.current_heading {
            style = style.add_modifier(Modifier::BOLD);
            if matches!(level, HeadingLevel::H1 | HeadingLevel::H2) {
                style = style.fg(self.palette.accent);
            }
            return style;
        }

        if self.bold_depth > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic_depth > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.in_blockquote {
            style = style.fg(self.palette.dim).add_modifier(Modifier::ITALIC);
        }
        style
    }

    fn flush_line(&mut self) {
        let mut spans = Vec::new();
        if self.in_blockquote && !self.current_spans.is_empty() {
            spans.push(Span::styled(
                "> ".to_string(),
                Style::default().fg(self.palette.dim),
            ));
        }
        if let Some(prefix) = self.pending_prefix.take() {
            spans.push(Span::styled(
                prefix,
                Style::default().fg(self.palette.accent),
            ));
        }
        spans.append(&mut self.current_spans);
        if spans.is_empty() {
            return;
        }
        self.lines.push(Line::from(spans));
    }

    fn blank_line(&mut self) {
        if !matches!(self.lines.last(), Some(line) if line.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_line();
        while matches!(self.lines.last(), Some(line) if line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}
