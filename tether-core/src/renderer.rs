//! Renderer adapter: the bridge's only view of the output surface.
//!
//! Implementors supply the surface primitives; the escaping policy lives in
//! the provided methods so every surface treats interpreter text the same way.

use std::collections::VecDeque;

/// Escape the characters that would let plain text be read as markup.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '>' => out.push_str("&gt;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

// ════════════════════════════════════════════════════════════════════
// Surface trait
// ════════════════════════════════════════════════════════════════════

pub trait Renderer {
    /// Append one markup fragment to the output region.
    fn push_fragment(&mut self, markup: &str);

    /// Replace the whole output region.
    fn replace_page(&mut self, markup: &str);

    /// Replace the cursor-indicator region.
    fn replace_cursor(&mut self, markup: &str);

    /// Replace the live input line.
    fn replace_prompt(&mut self, markup: &str);

    /// Bring the most recent output into view.
    fn scroll_to_end(&mut self);

    /// Show a notice the user has to acknowledge.
    fn alert(&mut self, text: &str);

    fn append_escaped(&mut self, text: &str) {
        self.push_fragment(&html_escape(text));
    }

    fn append_raw(&mut self, markup: &str) {
        self.push_fragment(markup);
    }

    fn set_page(&mut self, markup: &str) {
        self.replace_page(markup);
    }

    fn set_cursor(&mut self, markup: &str) {
        self.replace_cursor(markup);
    }

    fn refresh_prompt(&mut self, text: &str) {
        self.replace_prompt(&html_escape(text));
        self.scroll_to_end();
    }

    fn error_line(&mut self, text: &str) {
        self.append_escaped(&format!("ERROR - {}\n", text));
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn push_fragment(&mut self, markup: &str) {
        (**self).push_fragment(markup)
    }

    fn replace_page(&mut self, markup: &str) {
        (**self).replace_page(markup)
    }

    fn replace_cursor(&mut self, markup: &str) {
        (**self).replace_cursor(markup)
    }

    fn replace_prompt(&mut self, markup: &str) {
        (**self).replace_prompt(markup)
    }

    fn scroll_to_end(&mut self) {
        (**self).scroll_to_end()
    }

    fn alert(&mut self, text: &str) {
        (**self).alert(text)
    }
}

// ════════════════════════════════════════════════════════════════════
// In-memory surface
// ════════════════════════════════════════════════════════════════════

/// Default output cap (~256KB). Oldest fragments are dropped first.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 256 * 1024;

/// A headless surface that records everything it is asked to show.
#[derive(Debug, Clone)]
pub struct Transcript {
    fragments: VecDeque<String>,
    bytes: usize,
    max_bytes: usize,
    cursor: String,
    prompt: String,
    alerts: Vec<String>,
    scrolls: usize,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_OUTPUT_BYTES)
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_bytes: usize) -> Self {
        Self {
            fragments: VecDeque::new(),
            bytes: 0,
            max_bytes,
            cursor: String::new(),
            prompt: String::new(),
            alerts: Vec::new(),
            scrolls: 0,
        }
    }

    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(String::as_str)
    }

    /// The output region as one markup string.
    pub fn page(&self) -> String {
        self.fragments.iter().map(String::as_str).collect()
    }

    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls
    }

    fn trim(&mut self) {
        // Always keep the newest fragment, even when it alone is oversized.
        while self.bytes > self.max_bytes && self.fragments.len() > 1 {
            if let Some(old) = self.fragments.pop_front() {
                self.bytes -= old.len();
            }
        }
    }
}

impl Renderer for Transcript {
    fn push_fragment(&mut self, markup: &str) {
        self.bytes += markup.len();
        self.fragments.push_back(markup.to_string());
        self.trim();
    }

    fn replace_page(&mut self, markup: &str) {
        self.fragments.clear();
        self.bytes = 0;
        if !markup.is_empty() {
            self.push_fragment(markup);
        }
    }

    fn replace_cursor(&mut self, markup: &str) {
        self.cursor = markup.to_string();
    }

    fn replace_prompt(&mut self, markup: &str) {
        self.prompt = markup.to_string();
    }

    fn scroll_to_end(&mut self) {
        self.scrolls += 1;
    }

    fn alert(&mut self, text: &str) {
        self.alerts.push(text.to_string());
    }
}
