//! Pure view/render functions for the TUI.
//!
//! Functions here take `&AppState` by immutable reference and draw to a
//! ratatui Frame. Never mutate state, never return effects. Every slot
//! state has a view - a failed or missing page degrades to a labeled
//! fallback, not a blank screen.

use folio_content::Page;
use folio_core::factory::{SlotError, SlotState};
use folio_core::registry::{Skeleton, Surface};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Margin, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::markdown;
use crate::state::AppState;
use crate::text::truncate_with_ellipsis;
use crate::theme::{self, Palette};

/// Width of the navigation panel when visible.
const NAV_PANEL_WIDTH: u16 = 26;

/// Spinner frames for pending indicators.
const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

/// Renders the entire TUI to the frame.
pub fn render(app: &AppState, frame: &mut Frame) {
    let palette = theme::palette(app.nav.dark_mode());
    let area = frame.area();

    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .split(area);

    render_tabs(app, frame, rows[0], &palette);

    let content_area = if app.nav.nav_panel_visible() {
        let cols =
            Layout::horizontal([Constraint::Length(NAV_PANEL_WIDTH), Constraint::Min(0)])
                .split(rows[1]);
        render_nav_panel(app, frame, cols[0], &palette);
        cols[1]
    } else {
        rows[1]
    };
    render_content(app, frame, content_area, &palette);

    render_status(app, frame, rows[2], &palette);
}

fn render_tabs(app: &AppState, frame: &mut Frame, area: Rect, palette: &Palette) {
    let mut spans = vec![Span::styled(
        " folio ",
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD),
    )];

    for category in &app.categories {
        let style = if category == app.nav.active_category() {
            Style::default()
                .fg(palette.selection_fg)
                .bg(palette.selection_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.dim)
        };
        spans.push(Span::styled(format!(" {category} "), style));
        spans.push(Span::raw(" "));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_nav_panel(app: &AppState, frame: &mut Frame, area: Rect, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::RIGHT)
        .border_style(Style::default().fg(palette.border));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width.saturating_sub(1) as usize;
    let mut lines = Vec::new();
    for entry in app.registry.get_by_category(app.nav.active_category()) {
        let meta = entry.metadata();
        let icon = if meta.icon.is_empty() { "·" } else { meta.icon.as_str() };
        let label = truncate_with_ellipsis(&format!("{icon} {}", meta.label), width);
        let style = if entry.id() == app.nav.selected_item_id() {
            Style::default()
                .fg(palette.selection_fg)
                .bg(palette.selection_bg)
        } else {
            Style::default().fg(palette.fg)
        };
        lines.push(Line::styled(format!(" {label}"), style));
    }

    if lines.is_empty() {
        lines.push(Line::styled(
            " (empty category)",
            Style::default().fg(palette.dim),
        ));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_content(app: &AppState, frame: &mut Frame, area: Rect, palette: &Palette) {
    let area = area.inner(Margin {
        horizontal: 1,
        vertical: 0,
    });
    let Some(slot) = &app.slot else {
        return;
    };

    match slot.state() {
        SlotState::Missing => render_not_found(frame, area, palette, slot.id()),
        SlotState::Loading { skeleton } => {
            render_skeleton(frame, area, palette, skeleton, app.spinner_frame);
        }
        SlotState::Ready { content, surface } => {
            render_page(frame, area, palette, &content, surface, app.content_scroll);
        }
        SlotState::Failed { error, fallback } => match fallback {
            Some(page) => render_failed_with_fallback(frame, area, palette, &error, &page, app),
            None => render_failure(frame, area, palette, &error),
        },
    }
}

fn render_page(
    frame: &mut Frame,
    area: Rect,
    palette: &Palette,
    page: &Page,
    surface: Option<Surface>,
    scroll: u16,
) {
    let body_area = if matches!(surface, Some(Surface::Card)) {
        let block = Block::bordered()
            .border_style(Style::default().fg(palette.border))
            .title(Span::styled(
                format!(" {} ", page.title),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .title_bottom(
                Line::styled(
                    format!(" {} · {} words ", page.kind.label(), page.word_count()),
                    Style::default().fg(palette.dim),
                )
                .alignment(Alignment::Right),
            );
        let inner = block.inner(area);
        frame.render_widget(block, area);
        inner
    } else {
        area
    };

    let lines = markdown::render_markdown(&page.body, body_area.width.max(1) as usize, palette);
    let scroll = scroll.min(lines.len() as u16);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        body_area,
    );
}

fn render_not_found(frame: &mut Frame, area: Rect, palette: &Palette, id: &str) {
    let block = Block::bordered()
        .border_style(Style::default().fg(palette.border))
        .title(Span::styled(
            " Not found ",
            Style::default().fg(palette.failure).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        Line::default(),
        Line::styled(
            format!("No page is registered under '{id}'."),
            Style::default().fg(palette.fg),
        ),
        Line::default(),
        Line::styled(
            "Pick another entry from the panel.",
            Style::default().fg(palette.dim),
        ),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn render_failure(frame: &mut Frame, area: Rect, palette: &Palette, error: &SlotError) {
    let block = Block::bordered()
        .border_style(Style::default().fg(palette.failure))
        .title(Span::styled(
            " Load failed ",
            Style::default().fg(palette.failure).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        Line::default(),
        Line::styled(
            format!("'{}' did not load.", error.id),
            Style::default().fg(palette.fg),
        ),
        Line::default(),
        Line::styled(error.message.clone(), Style::default().fg(palette.dim)),
        Line::default(),
        Line::styled(
            "Press r to retry.",
            Style::default().fg(palette.accent),
        ),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn render_failed_with_fallback(
    frame: &mut Frame,
    area: Rect,
    palette: &Palette,
    error: &SlotError,
    page: &Page,
    app: &AppState,
) {
    let rows = Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).split(area);
    frame.render_widget(
        Paragraph::new(Line::styled(
            format!("load failed ({}) - showing fallback, r to retry", error.message),
            Style::default().fg(palette.failure),
        )),
        rows[0],
    );
    render_page(frame, rows[1], palette, page, None, app.content_scroll);
}

fn render_skeleton(
    frame: &mut Frame,
    area: Rect,
    palette: &Palette,
    skeleton: Skeleton,
    spinner_frame: usize,
) {
    let spinner = SPINNER_FRAMES[spinner_frame % SPINNER_FRAMES.len()];
    let dim = Style::default().fg(palette.dim);
    let shade = Style::default().fg(palette.skeleton);
    let width = area.width.saturating_sub(4).max(8) as usize;
    let bar = |n: usize| "░".repeat(n.min(width));

    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("{spinner} "), Style::default().fg(palette.accent)),
            Span::styled("loading…", dim),
        ]),
        Line::default(),
    ];

    match skeleton {
        Skeleton::Paragraph => {
            for portion in [95, 100, 90, 60, 0, 100, 85] {
                lines.push(Line::styled(bar(width * portion / 100), shade));
            }
        }
        Skeleton::List => {
            for _ in 0..5 {
                lines.push(Line::from(vec![
                    Span::styled("· ".to_string(), dim),
                    Span::styled(bar(width / 2), shade),
                ]));
                lines.push(Line::default());
            }
        }
        Skeleton::Code => {
            for portion in [40, 70, 65, 30, 0, 55, 75, 45] {
                lines.push(Line::from(vec![
                    Span::styled("│ ".to_string(), dim),
                    Span::styled(bar(width * portion / 100), shade),
                ]));
            }
        }
        Skeleton::Card => {
            let block = Block::bordered().border_style(shade);
            let inner = block.inner(area);
            frame.render_widget(block, area);
            for portion in [80, 90, 70] {
                lines.push(Line::styled(bar(width * portion / 100), shade));
            }
            frame.render_widget(Paragraph::new(lines), inner);
            return;
        }
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_status(app: &AppState, frame: &mut Frame, area: Rect, palette: &Palette) {
    let selected = app.nav.selected_item_id();
    let label = app
        .registry
        .get_metadata(selected)
        .map_or_else(|| selected.to_string(), |meta| meta.label);
    let breadcrumb = truncate_with_ellipsis(
        &format!("folio ▸ {} ▸ {label}", app.nav.active_category()),
        area.width.saturating_sub(28) as usize,
    );
    frame.render_widget(
        Paragraph::new(Line::styled(
            format!(" {breadcrumb}"),
            Style::default().fg(palette.fg),
        )),
        area,
    );

    let mut right = Vec::new();
    if let Some(category) = &app.preloading {
        let spinner = SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()];
        right.push(Span::styled(
            format!("{spinner} warming {category}  "),
            Style::default().fg(palette.accent),
        ));
    }
    right.push(Span::styled(
        format!(
            "{:.1} fps · {} · q quit ",
            app.status_line.snapshot().fps,
            if app.nav.dark_mode() { "dark" } else { "light" },
        ),
        Style::default().fg(palette.dim),
    ));
    frame.render_widget(
        Paragraph::new(Line::from(right)).alignment(Alignment::Right),
        area,
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use folio_core::bus::EventBus;
    use folio_core::config::Config;
    use folio_core::factory::{ComponentFactory, CreateOptions};
    use folio_core::nav::NavController;
    use folio_core::registry::ComponentRegistry;
    use folio_core::storage::StateStore;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;

    fn test_app() -> AppState {
        let bus = EventBus::new();
        let registry = Arc::new(ComponentRegistry::new());
        folio_content::install(&registry);
        let factory = Arc::new(ComponentFactory::new(Arc::clone(&registry), Arc::clone(&bus)));
        let store = Arc::new(StateStore::in_memory());
        let config = Config::default();
        let nav = NavController::with_defaults(
            folio_content::nav_defaults(&config),
            Arc::clone(&bus),
        );
        AppState::new(
            config,
            nav,
            folio_content::CATEGORIES.map(String::from).to_vec(),
            bus,
            registry,
            factory,
            store,
        )
    }

    fn draw_to_text(app: &AppState) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                if let Some(cell) = buffer.cell((x, y)) {
                    out.push_str(cell.symbol());
                }
            }
            out.push('\n');
        }
        out
    }

    /// The eager landing page renders its content and the chrome shows the
    /// breadcrumb trail.
    #[test]
    fn test_renders_ready_page_and_breadcrumb() {
        let mut app = test_app();
        app.slot = Some(app.factory.create("about-me", &CreateOptions::default()));

        let text = draw_to_text(&app);
        assert!(text.contains("Hello"));
        assert!(text.contains("folio ▸ about ▸ About Me"));
        assert!(text.contains("About Me")); // nav panel entry
    }

    /// Unknown ids render the labeled not-found view, not a blank screen.
    #[test]
    fn test_renders_not_found() {
        let mut app = test_app();
        app.slot = Some(app.factory.create("ghost", &CreateOptions::default()));

        let text = draw_to_text(&app);
        assert!(text.contains("Not found"));
        assert!(text.contains("ghost"));
    }

    /// Hiding the panel removes the entry list but keeps the content.
    #[test]
    fn test_panel_toggle_affects_layout() {
        let mut app = test_app();
        app.slot = Some(app.factory.create("about-me", &CreateOptions::default()));
        app.nav.toggle_nav_panel();

        let text = draw_to_text(&app);
        assert!(text.contains("Hello"));
        assert!(!text.contains("* Colophon"));
    }
}
