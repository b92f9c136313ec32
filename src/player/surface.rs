//! Visible side of a page context: caption overlay and alerts

use std::io::Write;

pub trait PageSurface {
    /// Show `text` as the caption for the chunk being played
    fn show_caption(&mut self, text: &str);

    fn hide_caption(&mut self);

    /// User-visible alert
    fn alert(&mut self, message: &str);
}

/// Renders captions on a single terminal line.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    caption_visible: bool,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageSurface for TerminalSurface {
    fn show_caption(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\r\x1b[2K\u{25b6} {}", text);
        let _ = out.flush();
        self.caption_visible = true;
    }

    fn hide_caption(&mut self) {
        if !self.caption_visible {
            return;
        }
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\r\x1b[2K");
        let _ = out.flush();
        self.caption_visible = false;
    }

    fn alert(&mut self, message: &str) {
        self.hide_caption();
        eprintln!("\n[!] {}", message);
    }
}
