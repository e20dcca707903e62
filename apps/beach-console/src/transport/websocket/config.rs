use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use url::Url;

/// Basic-auth credential sent with the WebSocket upgrade request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub user: String,
    pub password: String,
}

impl Credential {
    /// Parses `user:password`. A missing colon means an empty password.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((user, password)) => Self {
                user: user.to_owned(),
                password: password.to_owned(),
            },
            None => Self {
                user: raw.to_owned(),
                password: String::new(),
            },
        }
    }

    pub fn header_value(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.user, self.password));
        format!("Basic {token}")
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for the WebSocket transport
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// The endpoint URL, with any userinfo already moved into `credential`
    pub url: String,
    pub credential: Option<Credential>,
    /// Whether certificates and hostnames are verified for wss:// endpoints
    pub verify_tls: bool,
}

impl WebSocketConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credential: None,
            verify_tls: true,
        }
    }

    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Build the full WebSocket URL. Bare hosts default to ws:// for
    /// loopback and wss:// for everything else.
    pub fn build_url(&self) -> String {
        let url = self.url.trim();
        if url.starts_with("ws://") || url.starts_with("wss://") {
            return url.to_owned();
        }
        if let Some(rest) = url.strip_prefix("http://") {
            return format!("ws://{rest}");
        }
        if let Some(rest) = url.strip_prefix("https://") {
            return format!("wss://{rest}");
        }
        if url.contains("localhost") || url.contains("127.0.0.1") {
            format!("ws://{url}")
        } else {
            format!("wss://{url}")
        }
    }

    /// Moves `user:password@` out of the URL into the credential slot. An
    /// explicit credential wins over one embedded in the URL.
    pub fn split_userinfo(mut self) -> Self {
        let Ok(mut parsed) = Url::parse(&self.build_url()) else {
            return self;
        };
        if parsed.username().is_empty() && parsed.password().is_none() {
            return self;
        }
        let embedded = Credential {
            user: parsed.username().to_owned(),
            password: parsed.password().unwrap_or_default().to_owned(),
        };
        let _ = parsed.set_username("");
        let _ = parsed.set_password(None);
        self.url = parsed.to_string();
        if self.credential.is_none() {
            self.credential = Some(embedded);
        }
        self
    }
}
