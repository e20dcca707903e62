use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

pub const WIDTH: &str = "width";
pub const UPLOAD: &str = "upload";
pub const DEBUG: &str = "debug";

const RESERVED: [&str; 3] = [WIDTH, UPLOAD, DEBUG];

pub const DEFAULT_WIDTH: u16 = 80;

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("extra options are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("extra options must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("option name {0:?} must be non-empty and free of '=' and whitespace")]
    InvalidName(String),
}

/// Session options pushed to the server with OPTION frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    width: u16,
    upload: bool,
    debug: bool,
    extra: BTreeMap<String, String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH)
    }
}

impl SessionOptions {
    pub fn new(width: u16) -> Self {
        Self {
            width,
            upload: true,
            debug: false,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_upload(mut self, upload: bool) -> Self {
        self.upload = upload;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Caller-supplied options. Names that collide with built-in options
    /// are ignored.
    pub fn with_extra(mut self, extra: BTreeMap<String, String>) -> Self {
        for (name, value) in extra {
            if RESERVED.contains(&name.as_str()) {
                warn!(target: "beach_console::options", option = %name, "ignoring extra option that shadows a built-in");
                continue;
            }
            self.extra.insert(name, value);
        }
        self
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn set_width(&mut self, width: u16) {
        self.width = width;
    }

    pub fn upload(&self) -> bool {
        self.upload
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Every option in handshake order: built-ins first, then extras by name.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![
            (WIDTH.to_owned(), self.width.to_string()),
            (UPLOAD.to_owned(), flag(self.upload).to_owned()),
            (DEBUG.to_owned(), flag(self.debug).to_owned()),
        ];
        entries.extend(
            self.extra
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        entries
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

pub fn payload(name: &str, value: &str) -> String {
    format!("{name}={value}")
}

/// Parse a JSON object of extra options. Strings are sent verbatim, any
/// other value as its JSON text.
pub fn parse_extra(json: &str) -> Result<BTreeMap<String, String>, OptionsError> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Object(map) = value else {
        return Err(OptionsError::NotAnObject(json_kind(&value)));
    };
    map.into_iter()
        .map(|(name, value)| {
            if name.is_empty() || name.contains('=') || name.contains(char::is_whitespace) {
                return Err(OptionsError::InvalidName(name));
            }
            let value = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            Ok((name, value))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
