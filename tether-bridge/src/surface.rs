//! Terminal rendering surface.
//!
//! The terminal keeps the scrollback; this surface only redraws the live
//! line at the bottom: the unterminated output tail, the cursor region and
//! the prompt. Markup is flattened to text before it hits the terminal.

use crossterm::cursor::{MoveTo, MoveToColumn};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{QueueableCommand, queue};
use std::io::{self, Write};
use tether_core::{Renderer, Transcript};
use tracing::warn;

pub struct TerminalSurface<W: Write> {
    out: W,
    /// Output text after the last newline, still on the live line.
    tail: String,
    cursor: String,
    prompt: String,
    /// Mirror of everything rendered, capped, for inspection and replay.
    record: Transcript,
    write_failed: bool,
}

impl<W: Write> std::fmt::Debug for TerminalSurface<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSurface")
            .field("tail", &self.tail)
            .field("cursor", &self.cursor)
            .field("prompt", &self.prompt)
            .finish()
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, max_output_bytes: usize) -> Self {
        Self {
            out,
            tail: String::new(),
            cursor: String::new(),
            prompt: String::new(),
            record: Transcript::with_limit(max_output_bytes),
            write_failed: false,
        }
    }

    pub fn record(&self) -> &Transcript {
        &self.record
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    /// Run a terminal write and flush, logging the first failure only.
    fn emit(&mut self, write: impl FnOnce(&mut Self) -> io::Result<()>) {
        let result = write(self).and_then(|()| self.out.flush());
        if let Err(e) = result {
            if !self.write_failed {
                warn!("terminal write failed: {}", e);
            }
            self.write_failed = true;
        }
    }

    fn erase_live_line(&mut self) -> io::Result<()> {
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))
    }

    fn draw_live_line(&mut self) -> io::Result<()> {
        let line = format!("{}{}{}", self.tail, self.cursor, self.prompt);
        self.out.queue(Print(line))?;
        Ok(())
    }

    fn write_output(&mut self, text: &str) -> io::Result<()> {
        self.erase_live_line()?;
        let full = format!("{}{}", self.tail, text);
        match full.rfind('\n') {
            Some(at) => {
                self.out.queue(Print(to_crlf(&full[..=at])))?;
                self.tail = full[at + 1..].to_string();
            }
            None => self.tail = full,
        }
        self.draw_live_line()
    }

    fn redraw(&mut self) -> io::Result<()> {
        self.erase_live_line()?;
        self.draw_live_line()
    }
}

impl<W: Write> Renderer for TerminalSurface<W> {
    fn push_fragment(&mut self, markup: &str) {
        self.record.push_fragment(markup);
        let text = markup_to_text(markup);
        self.emit(|s| s.write_output(&text));
    }

    fn replace_page(&mut self, markup: &str) {
        self.record.replace_page(markup);
        let text = markup_to_text(markup);
        self.tail.clear();
        self.emit(|s| {
            queue!(s.out, Clear(ClearType::All), MoveTo(0, 0))?;
            s.write_output(&text)
        });
    }

    fn replace_cursor(&mut self, markup: &str) {
        self.record.replace_cursor(markup);
        self.cursor = markup_to_text(markup);
        self.emit(Self::redraw);
    }

    fn replace_prompt(&mut self, markup: &str) {
        self.record.replace_prompt(markup);
        self.prompt = markup_to_text(markup);
        self.emit(Self::redraw);
    }

    fn scroll_to_end(&mut self) {
        self.record.scroll_to_end();
        self.emit(|_| Ok(()));
    }

    fn alert(&mut self, text: &str) {
        self.record.alert(text);
        let text = strip_controls(&text.replace('\n', " "));
        self.emit(|s| {
            s.erase_live_line()?;
            queue!(
                s.out,
                Print("\x07"),
                SetAttribute(Attribute::Reverse),
                Print(format!(" {} ", text)),
                SetAttribute(Attribute::Reset),
                Print("\r\n")
            )?;
            s.draw_live_line()
        });
    }
}

fn to_crlf(text: &str) -> String {
    text.replace('\n', "\r\n")
}

/// Newline and tab pass; every other C0/C1 control (ESC, CR, BEL, ...) would
/// be read by the terminal as a command.
fn is_control(ch: char) -> bool {
    ch != '\n' && ch != '\t' && ch.is_control()
}

/// Remove every control character except newline and tab.
pub fn strip_controls(text: &str) -> String {
    text.chars().filter(|&c| !is_control(c)).collect()
}

/// Flatten markup to terminal text: tags are dropped (`<br>` becomes a
/// newline), character entities are decoded and control characters are
/// removed, whether literal or written as entities.
pub fn markup_to_text(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some(i) = rest.find(['<', '&']) {
        out.push_str(&strip_controls(&rest[..i]));
        rest = &rest[i..];

        if rest.starts_with('<') {
            match rest.find('>') {
                Some(end) => {
                    let tag = rest[1..end].trim().trim_end_matches('/').trim().to_ascii_lowercase();
                    if tag == "br" {
                        out.push('\n');
                    }
                    rest = &rest[end + 1..];
                }
                None => {
                    out.push_str(&strip_controls(rest));
                    rest = "";
                }
            }
        } else {
            match rest.find(';').and_then(|end| decode_entity(&rest[1..end]).map(|c| (end, c))) {
                Some((end, ch)) => {
                    if !is_control(ch) {
                        out.push(ch);
                    }
                    rest = &rest[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &rest[1..];
                }
            }
        }
    }

    out.push_str(&strip_controls(rest));
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let cp = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(cp)
        }
    }
}
