//! Terminal rendering of the transcript.

use crate::commands::chat::NO_CONTENT_PLACEHOLDER;
use crate::llm::StreamChunk;
use std::io::{self, Write};

/// Prints streamed answers to stdout as they arrive.
pub struct TranscriptPrinter<W: Write> {
    out: W,
    printed: usize,
}

impl TranscriptPrinter<io::Stdout> {
    pub fn stdout() -> Self {
        TranscriptPrinter::new(io::stdout())
    }
}

impl<W: Write> TranscriptPrinter<W> {
    pub fn new(out: W) -> Self {
        TranscriptPrinter { out, printed: 0 }
    }

    pub fn on_chunk(&mut self, chunk: StreamChunk) {
        if chunk.restart {
            if self.printed > 0 {
                let _ = writeln!(self.out, "\n\n_(stream interrupted; full answer follows)_\n");
            }
            self.printed = 0;
        }
        if !chunk.delta.is_empty() {
            let _ = write!(self.out, "{}", chunk.delta);
            self.printed += chunk.delta.len();
        }
        if chunk.done {
            if self.printed == 0 {
                let _ = write!(self.out, "{}", NO_CONTENT_PLACEHOLDER);
            }
            let _ = writeln!(self.out);
            self.printed = 0;
        }
        let _ = self.out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn speaker(out: &mut impl Write, name: &str) {
    let _ = write!(out, "**{}:** ", name);
    let _ = out.flush();
}
