//! Line-oriented NASM text writer
//!
//! Every emitted line goes through [`AsmWriter`] so the output format stays
//! uniform: directives and labels at column 0, instructions and inline
//! comments indented by four spaces.

use std::fmt::Display;
use std::io::{self, Write};

pub struct AsmWriter<W: Write> {
    out: W,
    comments: bool,
}

impl<W: Write> AsmWriter<W> {
    pub fn new(out: W, comments: bool) -> Self {
        Self { out, comments }
    }

    pub fn section(&mut self, name: &str) -> io::Result<()> {
        writeln!(self.out, "section {}", name)
    }

    pub fn global(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.out, "global {}", label)
    }

    pub fn extern_symbol(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.out, "extern {}", label)
    }

    pub fn label(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.out, "{}:", label)
    }

    /// One 32-bit data cell: `label: dd value`
    pub fn data_word(&mut self, label: &str, value: impl Display) -> io::Result<()> {
        writeln!(self.out, "{}: dd {}", label, value)
    }

    pub fn instr(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.out, "    {}", text)
    }

    /// Indented `;` comment, dropped when comments are disabled
    pub fn comment(&mut self, text: impl Display) -> io::Result<()> {
        if self.comments {
            writeln!(self.out, "    ; {}", text)?;
        }
        Ok(())
    }

    /// Column-0 `;` comment, dropped when comments are disabled
    pub fn header(&mut self, text: impl Display) -> io::Result<()> {
        if self.comments {
            writeln!(self.out, "; {}", text)?;
        }
        Ok(())
    }

    pub fn blank(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Run-wide source of unique local labels (`__L0`, `__L1`, ...)
#[derive(Debug, Default)]
pub struct LabelGenerator {
    next: usize,
}

impl LabelGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> String {
        let label = format!("__L{}", self.next);
        self.next += 1;
        label
    }
}
