//! Differential line renderer for streamed command output.
//!
//! Each server line carries a key. In redraw mode the row where a key was
//! first printed is remembered, and a later line with the same key rewrites
//! that row in place: move up, clear, write, move back down. The cursor
//! always returns to the row below the last printed line.

use crossterm::cursor::{MoveDown, MoveToColumn, MoveUp};
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use std::collections::HashMap;
use std::io::{self, Write};
use tracing::trace;

use crate::protocol::{Decoded, Frame, KeyKind};

/// Mid-response interaction the server asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialRequest {
    /// Upload the contents of this local path.
    File(String),
    /// Show this prompt and send back one line.
    Prompt(String),
}

impl SpecialRequest {
    fn from_frame(frame: Frame) -> Option<Self> {
        match frame.kind() {
            KeyKind::FileRequest => Some(SpecialRequest::File(frame.text)),
            KeyKind::PromptRequest => Some(SpecialRequest::Prompt(frame.text)),
            KeyKind::Ephemeral | KeyKind::Addressable => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStep {
    Continue,
    /// The cycle hit its terminator; carries the last special request seen.
    Finished(Option<SpecialRequest>),
}

/// Row bookkeeping for one exchange.
#[derive(Debug, Default)]
pub struct RenderState {
    rows: usize,
    positions: HashMap<String, usize>,
}

impl RenderState {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn row_of(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn tracked_keys(&self) -> usize {
        self.positions.len()
    }
}

pub struct ResponseRenderer<W: Write> {
    out: W,
    redraw: bool,
    state: RenderState,
    pending: Option<SpecialRequest>,
}

impl<W: Write> ResponseRenderer<W> {
    pub fn new(out: W, redraw: bool) -> Self {
        Self {
            out,
            redraw,
            state: RenderState::default(),
            pending: None,
        }
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Account for rows written to the terminal by someone else, such as a
    /// prompt and the answer echoed after it.
    pub fn advance_rows(&mut self, rows: usize) {
        self.state.rows += rows;
    }

    /// Forget every remembered row. Called when an exchange ends.
    pub fn reset(&mut self) {
        self.state = RenderState::default();
        self.pending = None;
    }

    /// Feed one decoded frame.
    ///
    /// On the terminator the pending special request (if any) is handed back
    /// but the row bookkeeping is kept, so lines printed after the special
    /// request is answered can still rewrite earlier rows. Callers decide
    /// when the exchange is over and call [`reset`](Self::reset).
    pub fn consume(&mut self, decoded: Decoded) -> io::Result<RenderStep> {
        match decoded {
            Decoded::EndOfResponse => {
                self.out.flush()?;
                Ok(RenderStep::Finished(self.pending.take()))
            }
            Decoded::Frame(frame) => {
                let kind = frame.kind();
                if kind.is_special() {
                    trace!(target: "beach_console::render", key = %frame.key, "special request pending");
                    self.pending = SpecialRequest::from_frame(frame);
                } else {
                    self.render_line(kind, frame)?;
                }
                Ok(RenderStep::Continue)
            }
        }
    }

    /// Render a complete cycle. Stops at the first terminator; frames after
    /// it are left in the iterator.
    pub fn render_response<I>(&mut self, frames: I) -> io::Result<Option<SpecialRequest>>
    where
        I: IntoIterator<Item = Decoded>,
    {
        for decoded in frames {
            if let RenderStep::Finished(special) = self.consume(decoded)? {
                return Ok(special);
            }
        }
        self.out.flush()?;
        Ok(self.pending.take())
    }

    fn render_line(&mut self, kind: KeyKind, frame: Frame) -> io::Result<()> {
        let remembered = if self.redraw && kind == KeyKind::Addressable {
            self.state.row_of(&frame.key)
        } else {
            None
        };

        match remembered {
            Some(row) => {
                let delta = self.state.rows - row;
                let delta = u16::try_from(delta).unwrap_or(u16::MAX);
                queue!(
                    self.out,
                    MoveUp(delta),
                    MoveToColumn(0),
                    Clear(ClearType::CurrentLine)
                )?;
                self.out.write_all(frame.text.as_bytes())?;
                queue!(self.out, MoveDown(delta), MoveToColumn(0))?;
            }
            None => {
                self.out.write_all(frame.text.as_bytes())?;
                self.out.write_all(b"\r\n")?;
                if self.redraw && kind == KeyKind::Addressable {
                    self.state.positions.insert(frame.key, self.state.rows);
                }
                self.state.rows += 1;
            }
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode;

    fn frames(raw: &[&str]) -> Vec<Decoded> {
        raw.iter()
            .map(|frame| decode(frame.as_bytes()).expect("valid frame"))
            .collect()
    }

    fn render(raw: &[&str], redraw: bool) -> (String, Option<SpecialRequest>, RenderState) {
        let mut renderer = ResponseRenderer::new(Vec::new(), redraw);
        let special = renderer.render_response(frames(raw)).expect("render");
        let state = std::mem::take(&mut renderer.state);
        let out = String::from_utf8(renderer.into_inner()).expect("utf8 output");
        (out, special, state)
    }

    #[test]
    fn distinct_keys_print_once_in_order() {
        let (out, special, state) = render(&["a one", "b two", "c three", ""], true);
        assert_eq!(out, "one\r\ntwo\r\nthree\r\n");
        assert_eq!(special, None);
        assert_eq!(state.rows(), 3);
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn echo_example() {
        let (out, special, _) = render(&["a hi", ""], true);
        assert_eq!(out, "hi\r\n");
        assert_eq!(special, None);
    }

    #[test]
    fn repeated_key_overwrites_in_place() {
        let (out, _, state) = render(&["p 10%", "q other", "p 50%", ""], true);
        assert_eq!(
            out,
            "10%\r\nother\r\n\x1b[2A\x1b[1G\x1b[2K50%\x1b[2B\x1b[1G"
        );
        assert_eq!(state.rows(), 2);
        assert_eq!(state.row_of("p"), Some(0));
    }

    #[test]
    fn most_recent_row_rewrite_moves_one_line() {
        let (out, _, state) = render(&["x a", "x b", "x c", ""], true);
        assert_eq!(
            out,
            "a\r\n\x1b[1A\x1b[1G\x1b[2Kb\x1b[1B\x1b[1G\x1b[1A\x1b[1G\x1b[2Kc\x1b[1B\x1b[1G"
        );
        assert_eq!(state.rows(), 1);
    }

    #[test]
    fn one_shot_mode_prints_duplicates_fresh() {
        let (out, _, state) = render(&["p 10%", "p 50%", ""], false);
        assert_eq!(out, "10%\r\n50%\r\n");
        assert_eq!(state.tracked_keys(), 0);
    }

    #[test]
    fn ephemeral_lines_are_never_tracked() {
        let (out, _, state) = render(&["- note", "- note", "k v", ""], true);
        assert_eq!(out, "note\r\nnote\r\nv\r\n");
        assert_eq!(state.row_of("-"), None);
        assert_eq!(state.row_of("k"), Some(2));
    }

    #[test]
    fn special_key_is_returned_after_draining() {
        let mut renderer = ResponseRenderer::new(Vec::new(), true);
        let mut input = frames(&["x processing", "% /tmp/report.txt", "y tail", "", "z next"]).into_iter();
        let special = renderer.render_response(&mut input).expect("render");
        assert_eq!(special, Some(SpecialRequest::File("/tmp/report.txt".into())));
        // Everything up to the terminator was consumed, including lines after the special key.
        assert_eq!(input.next(), Some(Decoded::Frame(Frame::new("z", "next"))));
        assert_eq!(renderer.into_inner(), b"processing\r\ntail\r\n".to_vec());
    }

    #[test]
    fn last_special_key_wins() {
        let (_, special, _) = render(&["% /a", "? name: ", ""], true);
        assert_eq!(special, Some(SpecialRequest::Prompt("name: ".into())));
    }

    #[test]
    fn rows_survive_special_until_reset() {
        let mut renderer = ResponseRenderer::new(Vec::new(), true);
        let special = renderer
            .render_response(frames(&["x processing", "% /tmp/report.txt", ""]))
            .expect("render");
        assert!(matches!(special, Some(SpecialRequest::File(_))));
        let special = renderer
            .render_response(frames(&["x done", ""]))
            .expect("render");
        assert_eq!(special, None);
        assert_eq!(
            renderer.get_mut().as_slice(),
            b"processing\r\n\x1b[1A\x1b[1G\x1b[2Kdone\x1b[1B\x1b[1G"
        );
        renderer.reset();
        assert_eq!(renderer.state().rows(), 0);
        assert_eq!(renderer.state().row_of("x"), None);
    }

    #[test]
    fn foreign_rows_push_rewrites_further_up() {
        let mut renderer = ResponseRenderer::new(Vec::new(), true);
        renderer
            .render_response(frames(&["x processing", "? name: ", ""]))
            .expect("render");
        renderer.get_mut().extend_from_slice(b"name: alice\r\n");
        renderer.advance_rows(1);
        renderer
            .render_response(frames(&["x done", ""]))
            .expect("render");
        assert_eq!(
            renderer.get_mut().as_slice(),
            b"processing\r\nname: alice\r\n\x1b[2A\x1b[1G\x1b[2Kdone\x1b[2B\x1b[1G"
        );
        assert_eq!(renderer.state().rows(), 2);
    }
}
