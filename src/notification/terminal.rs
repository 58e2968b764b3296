use std::io::{self, Write};

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::{Attribute, Print, SetAttribute, Stylize};
use crossterm::terminal::{Clear, ClearType, SetTitle};

use crate::notification::visual::{Overlay, Surface};

const RULE_WIDTH: usize = 44;

/// Plain text lines of the alarm overlay
pub fn overlay_lines(overlay: &Overlay) -> Vec<String> {
    let rule = "=".repeat(RULE_WIDTH);
    vec![
        rule.clone(),
        format!("  ⏰ {}", overlay.title),
        format!("  {}", overlay.message),
        format!("  at {}", overlay.time),
        String::new(),
        format!(
            "  [stop] dismiss    [snooze] {} more minutes",
            overlay.snooze_minutes
        ),
        rule,
    ]
}

pub const SOUND_PROMPT: &str = "🔇 Sound is blocked. Type `sound` to enable it.";

/// Draws the alarm into the controlling terminal
pub struct TerminalSurface<W: Write> {
    out: W,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout() -> Self {
        TerminalSurface { out: io::stdout() }
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        TerminalSurface { out }
    }

    fn status_line(&mut self, text: String, reverse: bool) -> io::Result<()> {
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        if reverse {
            queue!(
                self.out,
                SetAttribute(Attribute::Reverse),
                Print(text),
                SetAttribute(Attribute::Reset)
            )?;
        } else {
            queue!(self.out, Print(text))?;
        }
        self.out.flush()
    }

    fn write_overlay(&mut self, overlay: &Overlay) -> io::Result<()> {
        let mut lines = overlay_lines(overlay).into_iter();
        queue!(self.out, Print("\r\n"))?;
        if let Some(first) = lines.next() {
            queue!(self.out, Print(first.red()), Print("\r\n"))?;
        }
        for line in lines {
            queue!(self.out, Print(line), Print("\r\n"))?;
        }
        self.out.flush()
    }

    fn write_raw(&mut self, command: impl crossterm::Command) -> io::Result<()> {
        queue!(self.out, command)?;
        self.out.flush()
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn show_overlay(&mut self, overlay: &Overlay) {
        let _ = self.write_overlay(overlay);
    }

    fn hide_overlay(&mut self) {
        let _ = self.status_line("✓ Alarm stopped\r\n".to_string(), false);
    }

    fn set_flash(&mut self, on: bool) {
        let _ = self.status_line(" 🚨 ALARM 🚨 ".to_string(), on);
    }

    fn vibrate(&mut self) {
        let _ = self.write_raw(Print('\u{7}'));
    }

    fn set_title(&mut self, title: &str) {
        let _ = self.write_raw(SetTitle(title));
    }

    fn set_sound_prompt(&mut self, visible: bool) {
        if visible {
            let _ = self.write_raw(Print(format!("\r\n{}\r\n", SOUND_PROMPT.yellow())));
        }
    }
}
