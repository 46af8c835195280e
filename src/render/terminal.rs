use super::{RenderCommand, RenderSink};
use crossterm::{
    cursor::{RestorePosition, SavePosition},
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::{self, IsTerminal, Stdout, Write};

const NOTICE_PREFIX: &str = "🔧 ";
const WARNING_PREFIX: &str = "⚠ ";
const ERROR_PREFIX: &str = "✖ ";

/// Line-oriented terminal renderer.
///
/// A live surface that only grows is extended in place by printing the new
/// suffix. Any other replacement rewinds to the position saved when the
/// surface opened and redraws it, which needs cursor control; without it the
/// replacement is printed on a fresh line.
pub struct TerminalSink<W: Write> {
    out: W,
    printed: String,
    styled: bool,
}

impl TerminalSink<Stdout> {
    pub fn stdout() -> Self {
        let styled = io::stdout().is_terminal();
        Self::new(io::stdout(), styled)
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, styled: bool) -> Self {
        Self {
            out,
            printed: String::new(),
            styled,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Terminate the last live line so following output starts clean.
    pub fn finish(&mut self) {
        let _ = self.end_line().and_then(|_| self.out.flush());
        self.printed.clear();
    }

    fn write(&mut self, command: RenderCommand) -> io::Result<()> {
        match command {
            RenderCommand::ReplaceLive(text) => self.replace_live(text)?,
            RenderCommand::OpenSurface => {
                self.end_line()?;
                self.printed.clear();
                if self.styled {
                    queue!(self.out, SavePosition)?;
                }
            }
            RenderCommand::Notice(text) => self.line(Color::Cyan, NOTICE_PREFIX, &text)?,
            RenderCommand::Warning(text) => self.line(Color::Yellow, WARNING_PREFIX, &text)?,
            RenderCommand::Error(text) => self.line(Color::Red, ERROR_PREFIX, &text)?,
        }
        self.out.flush()
    }

    fn replace_live(&mut self, text: String) -> io::Result<()> {
        if let Some(suffix) = text.strip_prefix(self.printed.as_str()) {
            queue!(self.out, Print(suffix))?;
        } else if self.styled {
            queue!(
                self.out,
                RestorePosition,
                Clear(ClearType::FromCursorDown),
                Print(&text)
            )?;
        } else {
            queue!(self.out, Print("\n"), Print(&text))?;
        }
        self.printed = text;
        Ok(())
    }

    fn line(&mut self, color: Color, prefix: &str, text: &str) -> io::Result<()> {
        self.end_line()?;
        if self.styled {
            queue!(
                self.out,
                SetForegroundColor(color),
                Print(prefix),
                Print(text),
                ResetColor,
                Print("\n")
            )?;
        } else {
            queue!(self.out, Print(prefix), Print(text), Print("\n"))?;
        }
        // Text after a notice belongs to a new surface.
        self.printed.clear();
        Ok(())
    }

    fn end_line(&mut self) -> io::Result<()> {
        if !self.printed.is_empty() && !self.printed.ends_with('\n') {
            queue!(self.out, Print("\n"))?;
        }
        Ok(())
    }
}

impl<W: Write> RenderSink for TerminalSink<W> {
    fn apply(&mut self, command: RenderCommand) {
        let _ = self.write(command);
    }
}
