//! Built-in catalogue: registers every page the browser ships with.
//!
//! Categories mirror the tab bar: `about`, `leftbrain` (study notes),
//! `rightbrain` (writing), `tools` (generated references). Only the landing
//! page is eager; everything else materializes on demand.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use folio_core::config::{Config, paths};
use folio_core::nav::NavDefaults;
use folio_core::registry::{ComponentMetadata, ComponentRegistry, Skeleton, Surface, loader};

use crate::page::{Page, PageKind};

/// Tab order. `ComponentRegistry::list_categories` is alphabetical, which
/// happens to match, but the UI should not depend on that accident.
pub const CATEGORIES: [&str; 4] = ["about", "leftbrain", "rightbrain", "tools"];

/// Default skeleton shape per category, applied at factory construction.
pub fn category_skeletons() -> [(&'static str, Skeleton); 4] {
    [
        ("about", Skeleton::Paragraph),
        ("leftbrain", Skeleton::Code),
        ("rightbrain", Skeleton::Paragraph),
        ("tools", Skeleton::Card),
    ]
}

/// Navigation defaults derived from config: which tab opens first and which
/// item each tab lands on before the user has visited it.
pub fn nav_defaults(config: &Config) -> NavDefaults {
    let initial_category = if CATEGORIES.contains(&config.default_category.as_str()) {
        config.default_category.clone()
    } else {
        tracing::warn!(
            category = %config.default_category,
            "configured default_category is unknown, using 'about'"
        );
        "about".to_string()
    };

    NavDefaults {
        initial_category,
        default_item_by_category: HashMap::from([
            ("about".to_string(), "about-me".to_string()),
            ("leftbrain".to_string(), "dsa-big-o".to_string()),
            ("rightbrain".to_string(), "music".to_string()),
            ("tools".to_string(), "ascii-table".to_string()),
        ]),
        nav_panel_visible: config.nav_panel_visible,
        dark_mode: config.theme.is_dark(),
    }
}

/// Registers the built-in entries.
pub fn install(registry: &ComponentRegistry<Page>) {
    // about ----------------------------------------------------------------
    registry.register_eager(
        "about-me",
        Page::new("About Me", PageKind::Profile, include_str!("../content/about.md")),
        ComponentMetadata::new("About Me")
            .icon("@")
            .category("about")
            .description("who runs this place"),
    );
    registry.register_deferred(
        "colophon",
        loader(|| async {
            Ok(Page::new(
                "Colophon",
                PageKind::Profile,
                include_str!("../content/colophon.md"),
            ))
        }),
        ComponentMetadata::new("Colophon")
            .icon("*")
            .category("about")
            .description("how this site is made"),
    );

    // leftbrain ------------------------------------------------------------
    register_note(registry, "dsa-big-o", "Big-O Cheatsheet", include_str!("../content/dsa/big_o.md"), "complexity tables");
    register_note(registry, "dsa-arrays", "Arrays & Two Pointers", include_str!("../content/dsa/arrays.md"), "pointer patterns");
    register_note(registry, "dsa-graphs", "Graph Traversal", include_str!("../content/dsa/graphs.md"), "BFS, DFS, toposort");

    // rightbrain -----------------------------------------------------------
    register_essay(registry, "music", "Music", include_str!("../content/writing/music.md"), "bass, metronomes");
    register_essay(
        registry,
        "terminal-gardens",
        "Terminal Gardens",
        include_str!("../content/writing/terminal_gardens.md"),
        "on dotfiles",
    );
    registry.register_deferred(
        "journal",
        journal_loader(paths::folio_home().join("journal.md")),
        ComponentMetadata::new("Journal")
            .icon("~")
            .category("rightbrain")
            .description("local scratch page")
            .loading_placeholder(Skeleton::List)
            .error_fallback(Arc::new(|| {
                Page::new(
                    "Journal",
                    PageKind::Essay,
                    "The journal could not be read.\n\n\
                     Check the permissions of `journal.md` in your Folio home \
                     directory, then press `r` to retry.",
                )
            })),
    );

    // tools ----------------------------------------------------------------
    registry.register_deferred(
        "ascii-table",
        loader(|| async { Ok(ascii_table_page()) }),
        ComponentMetadata::new("ASCII Table")
            .icon("#")
            .category("tools")
            .description("printable characters")
            .surface(Surface::Card),
    );
    registry.register_deferred(
        "ansi-colors",
        loader(|| async { Ok(ansi_colors_page()) }),
        ComponentMetadata::new("ANSI Colors")
            .icon("%")
            .category("tools")
            .description("the sixteen base colors")
            .surface(Surface::Card),
    );
}

fn register_note(
    registry: &ComponentRegistry<Page>,
    id: &str,
    title: &'static str,
    body: &'static str,
    description: &str,
) {
    registry.register_deferred(
        id,
        loader(move || async move { Ok(Page::new(title, PageKind::Note, body)) }),
        ComponentMetadata::new(title)
            .icon("λ")
            .category("leftbrain")
            .description(description),
    );
}

fn register_essay(
    registry: &ComponentRegistry<Page>,
    id: &str,
    title: &'static str,
    body: &'static str,
    description: &str,
) {
    registry.register_deferred(
        id,
        loader(move || async move { Ok(Page::new(title, PageKind::Essay, body)) }),
        ComponentMetadata::new(title)
            .icon("♪")
            .category("rightbrain")
            .description(description),
    );
}

/// Loader for the disk-backed journal page.
///
/// An absent file is a fresh journal, not an error; an unreadable one is.
fn journal_loader(path: PathBuf) -> folio_core::registry::LoaderFn<Page> {
    loader(move || {
        let path = path.clone();
        async move { load_journal(&path).await }
    })
}

async fn load_journal(path: &std::path::Path) -> Result<Page> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(Page::new(
            "Journal",
            PageKind::Essay,
            format!(
                "# Journal\n\nNothing here yet. Write markdown to `{}` and it \
                 shows up on this page.",
                path.display()
            ),
        ));
    }
    let body = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read journal from {}", path.display()))?;
    Ok(Page::new("Journal", PageKind::Essay, body))
}

fn ascii_table_page() -> Page {
    let mut body = String::from(
        "# ASCII Table\n\nPrintable characters, 33 through 126.\n\n\
         | Dec | Hex | Char | Dec | Hex | Char |\n\
         | --- | --- | --- | --- | --- | --- |\n",
    );
    let (low, high) = (33u8, 126u8);
    let half = (high - low).div_ceil(2);
    for offset in 0..=half {
        let a = low + offset;
        let b = a + half + 1;
        body.push_str(&format!("| {a} | 0x{a:02X} | `{}` |", a as char));
        if b <= high {
            body.push_str(&format!(" {b} | 0x{b:02X} | `{}` |\n", b as char));
        } else {
            body.push_str(" | | |\n");
        }
    }
    Page::new("ASCII Table", PageKind::Tool, body)
}

fn ansi_colors_page() -> Page {
    const NAMES: [&str; 8] = [
        "black", "red", "green", "yellow", "blue", "magenta", "cyan", "white",
    ];
    let mut body = String::from(
        "# ANSI Colors\n\nThe sixteen base colors every terminal agrees to \
         disagree about.\n\n| Code | Name | Bright code | Bright name |\n\
         | --- | --- | --- | --- |\n",
    );
    for (i, name) in NAMES.iter().enumerate() {
        body.push_str(&format!(
            "| {} | {name} | {} | bright {name} |\n",
            30 + i,
            90 + i
        ));
    }
    body.push_str("\nForeground escapes: `ESC[<code>m`. Reset with `ESC[0m`.\n");
    Page::new("ANSI Colors", PageKind::Tool, body)
}
