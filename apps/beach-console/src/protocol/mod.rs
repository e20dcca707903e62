//! Text frame codec for the command session protocol.
//!
//! Every client request is a single `"<VERB> <payload>"` UTF-8 frame. Every
//! server frame is either `"<key> <text>"` or empty; the empty frame closes
//! the current response cycle.

use std::fmt;

/// Key the server uses to ask for the contents of a local file.
pub const FILE_REQUEST_KEY: &str = "%";
/// Key the server uses to ask the user for one line of input.
pub const PROMPT_REQUEST_KEY: &str = "?";
/// Lines under this key are printed but never tracked for redraw.
pub const EPHEMERAL_KEY: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Option,
    Exec,
    File,
    Reply,
    Comp,
    Error,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Option => "OPTION",
            Verb::Exec => "EXEC",
            Verb::File => "FILE",
            Verb::Reply => "REPLY",
            Verb::Comp => "COMP",
            Verb::Error => "ERROR",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub key: String,
    pub text: String,
}

impl Frame {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }

    pub fn kind(&self) -> KeyKind {
        KeyKind::of(&self.key)
    }
}

/// Classification of a server frame key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    FileRequest,
    PromptRequest,
    Ephemeral,
    Addressable,
}

impl KeyKind {
    pub fn of(key: &str) -> Self {
        match key {
            FILE_REQUEST_KEY => KeyKind::FileRequest,
            PROMPT_REQUEST_KEY => KeyKind::PromptRequest,
            EPHEMERAL_KEY => KeyKind::Ephemeral,
            _ => KeyKind::Addressable,
        }
    }

    pub fn is_special(self) -> bool {
        matches!(self, KeyKind::FileRequest | KeyKind::PromptRequest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Frame(Frame),
    EndOfResponse,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },
    #[error("frame has no key separator: {0:?}")]
    MissingSeparator(String),
}

pub fn encode(verb: Verb, payload: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(verb.as_str().len() + 1 + payload.len());
    buf.extend_from_slice(verb.as_str().as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(payload.as_bytes());
    buf
}

pub fn decode(bytes: &[u8]) -> Result<Decoded, ProtocolError> {
    if bytes.is_empty() {
        return Ok(Decoded::EndOfResponse);
    }
    let text = std::str::from_utf8(bytes).map_err(|err| ProtocolError::InvalidUtf8 {
        valid_up_to: err.valid_up_to(),
    })?;
    match text.split_once(' ') {
        Some((key, rest)) if !key.is_empty() => Ok(Decoded::Frame(Frame::new(key, rest))),
        _ => Err(ProtocolError::MissingSeparator(text.to_owned())),
    }
}
