/// Candidates from the last COMP exchange, valid only while the input
/// buffer still equals `context`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionCache {
    context: Option<String>,
    prefix: String,
    candidates: Vec<String>,
}

impl CompletionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached candidates for `buffer`, or `None` when the buffer changed.
    pub fn lookup(&self, buffer: &str) -> Option<&[String]> {
        match &self.context {
            Some(context) if context == buffer => Some(&self.candidates),
            _ => None,
        }
    }

    /// Store a COMP response. The first line is the shared prefix and every
    /// following line is a suffix appended to it.
    pub fn populate<I>(&mut self, buffer: &str, mut lines: I) -> &[String]
    where
        I: Iterator<Item = String>,
    {
        let prefix = lines.next().unwrap_or_default();
        self.candidates = lines.map(|suffix| format!("{prefix}{suffix}")).collect();
        self.prefix = prefix;
        self.context = Some(buffer.to_owned());
        &self.candidates
    }

    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}
