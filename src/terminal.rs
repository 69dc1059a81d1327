//! Terminal front-end.
//!
//! [`TerminalUi`] renders widget updates as labelled lines; [`run_interactive`]
//! reads pasted text and slash commands and forwards them to the controller.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use crate::controller::{AppState, Controller, UiController, WidgetKey, WidgetProps};

pub const HELP: &str = "\
Paste or type text, then use:
  /infer           run inference on the collected text
  /preview         show the text with \\n, \\t and \\r expanded
  /endpoints       list the configured endpoints
  /endpoint <id>   switch endpoint and re-test the connection
  /clear           discard the collected text
  /help            show this message
  /quit            exit";

/// Renders controller updates to a writer.
pub struct TerminalUi<W: Write> {
    out: W,
    values: HashMap<WidgetKey, String>,
    props: HashMap<WidgetKey, WidgetProps>,
}

impl<W: Write> TerminalUi<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            values: HashMap::new(),
            props: HashMap::new(),
        }
    }

    /// Last value set on `key`.
    pub fn value(&self, key: WidgetKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Whether the status indicator is currently on.
    pub fn is_connected(&self) -> bool {
        self.props
            .get(&WidgetKey::StatusIndicator)
            .and_then(|p| p.checked)
            .unwrap_or(false)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn print(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            tracing::warn!(error = %e, "terminal write failed");
        }
    }

    fn render(&mut self, key: WidgetKey, value: &str) {
        let line = match key {
            WidgetKey::StatusText => Some(format!("[status] {value}")),
            WidgetKey::OutputText => Some(format!("[output]\n{value}")),
            WidgetKey::PreviewText => Some(format!("[preview]\n{value}")),
            WidgetKey::ValidationStatus if !value.is_empty() => {
                Some(format!("[validation] {value}"))
            }
            _ => None,
        };
        if let Some(line) = line {
            self.print(&line);
        }
    }
}

impl<W: Write> UiController for TerminalUi<W> {
    fn set_value(&mut self, key: WidgetKey, value: &str) {
        self.values.insert(key, value.to_string());
        self.render(key, value);
    }

    fn configure(&mut self, key: WidgetKey, props: WidgetProps) {
        if key == WidgetKey::EndpointDropdown {
            if let Some(selected) = &props.default_value {
                let line = format!("[endpoint] {selected}");
                self.print(&line);
            }
        }
        self.props.entry(key).or_default().merge(props);
    }
}

/// A line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Infer,
    Preview,
    Endpoints,
    Endpoint(String),
    Clear,
    Help,
    Quit,
    Text(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Text(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name {
            "infer" => Command::Infer,
            "preview" => Command::Preview,
            "endpoints" => Command::Endpoints,
            "endpoint" if !arg.is_empty() => Command::Endpoint(arg.to_string()),
            "endpoint" | "help" => Command::Help,
            "clear" => Command::Clear,
            "quit" | "exit" => Command::Quit,
            _ => Command::Text(line.to_string()),
        }
    }
}

/// Read lines from `input` until `/quit` or end of input.
///
/// Text lines accumulate into one document; commands act on it. Returns the
/// final state.
pub async fn run_interactive<R: BufRead, W: Write>(
    controller: &Controller,
    ui: &mut TerminalUi<W>,
    mut state: AppState,
    input: R,
) -> io::Result<AppState> {
    let mut buffer = String::new();
    ui.print(HELP);

    for line in input.lines() {
        match Command::parse(&line?) {
            Command::Text(text) => {
                buffer.push_str(&text);
                buffer.push('\n');
            }
            Command::Infer => controller.on_infer_clicked(ui, &state, &buffer).await,
            Command::Preview => controller.on_input_changed(ui, &buffer),
            Command::Endpoints => {
                let current = state.model().unwrap_or_default().to_string();
                let listing: Vec<String> = state
                    .endpoints
                    .iter()
                    .map(|e| {
                        let marker = if *e == current { "*" } else { " " };
                        format!("{marker} {e}")
                    })
                    .collect();
                if listing.is_empty() {
                    ui.print("(no endpoints configured)");
                } else {
                    ui.print(&listing.join("\n"));
                }
            }
            Command::Endpoint(id) => {
                state = controller.on_endpoint_changed(ui, &state, &id).await;
            }
            Command::Clear => {
                buffer.clear();
                ui.print("[input cleared]");
            }
            Command::Help => ui.print(HELP),
            Command::Quit => break,
        }
    }

    Ok(state)
}
