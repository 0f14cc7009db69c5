mod cli;
mod render;
mod repl;

use cli::{CliError, CliOptions};
use shared::backend::HttpChatBackend;
use shared::chat::RequestController;
use shared::config::{ClientConfig, LogFormat, load_dotenv};
use tracing::{debug, error, info};

const DEFAULT_LOG_FILTER: &str = "assistops_chat=info,shared=info";

#[tokio::main]
async fn main() {
    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print_usage();
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        std::process::exit(1);
    }

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load client config: {err}");
            std::process::exit(1);
        }
    };
    let config = match options.base_url.as_deref() {
        Some(base_url) => match config.with_base_url(base_url) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("invalid --base-url: {err}");
                std::process::exit(2);
            }
        },
        None => config,
    };

    init_tracing(config.log_format);

    let backend = match HttpChatBackend::new(config.http_backend_config()) {
        Ok(backend) => backend,
        Err(err) => {
            error!(error = %err, "failed to initialize chat backend client");
            std::process::exit(1);
        }
    };
    info!(
        api_base_url = %config.api_base_url,
        executing_after_ms = config.timings.executing_after.as_millis() as u64,
        verifying_after_ms = config.timings.verifying_after.as_millis() as u64,
        "starting assistops chat"
    );

    let controller = RequestController::new(backend, config.timings);
    match controller.health().await {
        Ok(health) => debug!(message = %health.message, "backend health probe succeeded"),
        Err(err) => debug!(error = %err, "backend health probe failed"),
    }

    if let Err(err) = repl::Repl::new(controller, options.show_log).run().await {
        error!(error = %err, "terminal session ended with an error");
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .init(),
    }
}

fn print_usage() {
    eprintln!(
        "Usage: cargo run -p assistops-chat -- [--base-url URL] [--show-log]\n\
         \n\
         Options:\n\
         - --base-url URL  Backend origin (overrides ASSISTOPS_API_BASE_URL)\n\
         - --show-log      Print the integrity log after every answer\n\
         - --help          Show this help text\n\
         \n\
         Commands at the prompt:\n\
         - /new     Start a new conversation\n\
         - /log     Toggle the integrity log\n\
         - /retry   Resend the last unanswered query\n\
         - /health  Probe the backend\n\
         - /quit    Exit"
    );
}
