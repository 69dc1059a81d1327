//! OncoLlama terminal entry point.
//!
//! With text (positional or `--file`) runs a single inference and exits;
//! otherwise starts the interactive prompt.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use oncollama::controller::{Controller, JsonDocumentValidator, WidgetKey};
use oncollama::inference::config::{load_app_config, load_dotenv};
use oncollama::inference::{DirPromptTemplates, OpenAiCompatFactory};
use oncollama::terminal::{run_interactive, TerminalUi};

/// Extract structured oncology data from free text with a hosted model.
#[derive(Parser, Debug)]
#[command(name = "oncollama", version)]
struct Args {
    /// Text to run through the model (literal \n, \t and \r are expanded)
    text: Option<String>,

    /// Read the text from a file instead
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Model identifier to select at startup
    #[arg(short, long)]
    model: Option<String>,

    /// Path to endpoints.yaml (searched upward from the working directory by default)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let dotenv = load_dotenv(&cwd);

    let log_filter = args.debug.then_some("oncollama=debug,info");
    let log_path = oncollama::init_tracing(&oncollama::data_dir(), log_filter)
        .context("failed to initialise logging")?;

    match dotenv {
        Ok(Some(path)) => tracing::debug!(path = %path.display(), "loaded .env"),
        Ok(None) => tracing::debug!("no .env file"),
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env"),
    }

    let mut config = load_app_config(&cwd, args.config.as_deref())?;
    if let Some(model) = args.model {
        if !config.endpoints.contains(&model) {
            config.endpoints.insert(0, model.clone());
        }
        config.default_model = Some(model);
    }

    let input = match (&args.text, &args.file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        (None, None) => None,
    };

    let controller = Controller::new(
        Box::new(OpenAiCompatFactory),
        Box::new(DirPromptTemplates::new(&config.prompts_dir)),
        Box::new(JsonDocumentValidator::new(config.required_keys.clone())),
        config.prompt_template.clone(),
    );

    let mut ui = TerminalUi::new(std::io::stdout());
    let state = controller.initialise(&mut ui, &config).await;

    match input {
        Some(text) => {
            controller.on_infer_clicked(&mut ui, &state, &text).await;
            let validated = ui
                .value(WidgetKey::ValidationStatus)
                .is_some_and(|v| v == oncollama::controller::app::VALIDATION_OK_MESSAGE);
            if !validated {
                tracing::info!(log = %log_path.display(), "one-shot run did not validate");
                return Ok(ExitCode::FAILURE);
            }
        }
        None => {
            let stdin = std::io::stdin();
            run_interactive(&controller, &mut ui, state, stdin.lock()).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
