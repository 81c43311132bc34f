//! Configuration types for the chat application.
//!
//! Command-line arguments are parsed via `arrrg`; credentials come from the environment or
//! a local `.env` file, loaded once at startup.

use std::env;

use arrrg_derive::CommandLine;

use crate::chat::responder::ResponseMode;
use crate::client::DEFAULT_API_URL;
use crate::error::{Error, Result};
use crate::types::Model;

/// Editor used when neither `VISUAL` nor `EDITOR` is set.
pub const DEFAULT_EDITOR: &str = "vim";

/// Command-line arguments for the colloquy tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Use the lower-cost model tier.
    #[arrrg(flag, "Use the cheaper model (gpt-3.5-turbo instead of gpt-4o)")]
    pub cheap: bool,

    /// Explicit model name; overrides the tier.
    #[arrrg(optional, "Model to use (overrides --cheap)", "MODEL")]
    pub model: Option<String>,

    /// Wait for whole replies instead of streaming them.
    #[arrrg(flag, "Disable streamed responses")]
    pub no_stream: bool,

    /// Exit after the first exchange.
    #[arrrg(flag, "Exit after one exchange")]
    pub terminate: bool,

    /// Base URL of a proxy or alternate service.
    #[arrrg(optional, "Base URL of an OpenAI-compatible proxy", "URL")]
    pub proxy: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing command-line
/// arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// Whether replies are streamed.
    pub response_mode: ResponseMode,

    /// Exit after the first exchange.
    pub terminate: bool,

    /// Base URL given on the command line; takes precedence over the environment.
    pub base_url: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Query to send before the first prompt.
    pub initial_query: Option<String>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gpt-4o
    /// - Streaming: enabled
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::capable(),
            response_mode: ResponseMode::Streaming,
            terminate: false,
            base_url: None,
            use_color: true,
            initial_query: None,
        }
    }

    /// Resolve arguments and the free (positional) words of the command line.
    ///
    /// Positional words are joined with single spaces into the initial query.
    pub fn from_args(args: ChatArgs, free: &[String]) -> Self {
        let query = free.join(" ");
        let query = query.trim();
        let config = Self::from(args);
        if query.is_empty() {
            config
        } else {
            config.with_initial_query(query)
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the response mode.
    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }

    /// Exit after one exchange.
    pub fn with_terminate(mut self, terminate: bool) -> Self {
        self.terminate = terminate;
        self
    }

    /// Sets the base URL override.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the query sent before the first prompt.
    pub fn with_initial_query(mut self, query: impl Into<String>) -> Self {
        self.initial_query = Some(query.into());
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let model = match args.model {
            Some(name) => {
                let Ok(model) = name.parse::<Model>();
                model
            }
            None if args.cheap => Model::cheap(),
            None => Model::capable(),
        };
        let response_mode = if args.no_stream {
            ResponseMode::Blocking
        } else {
            ResponseMode::Streaming
        };

        ChatConfig {
            model,
            response_mode,
            terminate: args.terminate,
            base_url: args.proxy,
            use_color: !args.no_color,
            ..ChatConfig::new()
        }
    }
}

/// Values read from the environment at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// The service API key.
    pub api_key: String,

    /// Base URL from the environment, if any.
    pub base_url: Option<String>,

    /// Command that opens the external editor.
    pub editor: String,
}

impl Credentials {
    /// Load credentials from the process environment, after reading `.env` if one exists.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!(path = %path.display(), "loaded environment file");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build credentials from an arbitrary variable lookup.
    ///
    /// `OPENAI_API_KEY` is required.  The base URL comes from `OPENAI_BASE_URL`, falling back
    /// to `OPENAI_API_BASE`.  The editor is `VISUAL`, then `EDITOR`, then [`DEFAULT_EDITOR`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let api_key = present("OPENAI_API_KEY")
            .ok_or_else(|| Error::config("OPENAI_API_KEY is not set (environment or .env)"))?;
        let base_url = present("OPENAI_BASE_URL").or_else(|| present("OPENAI_API_BASE"));
        let editor = present("VISUAL")
            .or_else(|| present("EDITOR"))
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
        Ok(Self {
            api_key,
            base_url,
            editor,
        })
    }

    /// The base URL to use: the command line wins over the environment, which wins over the
    /// public endpoint.
    pub fn resolve_base_url<'a>(&'a self, config: &'a ChatConfig) -> &'a str {
        config
            .base_url
            .as_deref()
            .or(self.base_url.as_deref())
            .unwrap_or(DEFAULT_API_URL)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("editor", &self.editor)
            .finish()
    }
}
