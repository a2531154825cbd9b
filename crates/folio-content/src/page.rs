//! The renderable unit: a titled markdown document.

/// Broad flavor of a page, used for labeling in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Who-am-I material.
    Profile,
    /// Study notes (algorithms, data structures).
    Note,
    /// Creative writing.
    Essay,
    /// Generated reference pages.
    Tool,
}

impl PageKind {
    pub fn label(self) -> &'static str {
        match self {
            PageKind::Profile => "profile",
            PageKind::Note => "note",
            PageKind::Essay => "essay",
            PageKind::Tool => "tool",
        }
    }
}

/// One displayable page. The infrastructure treats this as opaque; only the
/// frontend knows how to draw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub kind: PageKind,
    /// Markdown source of the body.
    pub body: String,
}

impl Page {
    pub fn new(title: impl Into<String>, kind: PageKind, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind,
            body: body.into(),
        }
    }

    /// First non-heading paragraph, for list previews.
    pub fn excerpt(&self) -> Option<&str> {
        self.body
            .split("\n\n")
            .map(str::trim)
            .find(|block| !block.is_empty() && !block.starts_with('#'))
    }

    pub fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }
}
