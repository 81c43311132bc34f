//! Interactive command-line chat with an OpenAI-compatible service.
//!
//! # Usage
//!
//! ```bash
//! colloquy [OPTIONS] [QUERY]...
//! ```
//!
//! # Options
//!
//! - `--cheap` - Use the lower-cost model (gpt-3.5-turbo)
//! - `--model <MODEL>` - Use a specific model
//! - `--no-stream` - Wait for whole replies
//! - `--terminate` - Exit after one exchange
//! - `--proxy <URL>` - Send requests to a proxy or alternate service
//! - `--no-color` - Disable ANSI colors/styles
//!
//! Trailing words are joined into a first query that is answered before the prompt.
//!
//! # Environment
//!
//! `OPENAI_API_KEY` is required.  `OPENAI_BASE_URL` (or `OPENAI_API_BASE`) overrides the
//! endpoint and `VISUAL`/`EDITOR` choose the editor opened by Ctrl-T.  A `.env` file in the
//! working directory is read first.  `RUST_LOG` controls diagnostics on stderr.
//!
//! # Reserved inputs
//!
//! - `exit`, `exit()` - Exit the application
//! - `reset`, `reset()` - Start a new conversation
//! - `multi`, `multi()`, `m` - Enter several lines, finished with Ctrl-D

use std::process::ExitCode;

use arrrg::CommandLine;
use tracing_subscriber::EnvFilter;

use colloquy::OpenAi;
use colloquy::chat::{
    ChatArgs, ChatConfig, ChatRepl, Credentials, Interrupt, PlainTextRenderer, Renderer,
    Responder, TerminalInput, help_text,
};

/// Main entry point for the colloquy application.
#[tokio::main]
async fn main() -> ExitCode {
    let (args, free) = ChatArgs::from_command_line_relaxed("colloquy [OPTIONS] [QUERY]...");
    let config = ChatConfig::from_args(args, &free);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let use_color = config.use_color;
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            PlainTextRenderer::with_color(use_color).print_error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ChatConfig) -> colloquy::Result<()> {
    let credentials = Credentials::load()?;
    let base_url = credentials.resolve_base_url(&config);
    let client = OpenAi::with_base_url(credentials.api_key.clone(), base_url)?;
    tracing::info!(base_url = %client.base_url(), model = %config.model, "starting chat");

    let input = TerminalInput::new(credentials.editor.clone(), config.use_color)?;
    let interrupt = Interrupt::install()?;
    let responder = Responder::new(client, config.model.clone(), config.response_mode);

    if config.initial_query.is_none() {
        println!("colloquy (model: {})", responder.model());
        for line in help_text().lines() {
            println!("    {line}");
        }
        println!();
    }

    let renderer = PlainTextRenderer::with_color(config.use_color);
    let mut repl = ChatRepl::new(responder, input, renderer, config);
    repl.run(&interrupt).await
}
