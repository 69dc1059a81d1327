//! Event handlers wiring the front-end to the probe, pipeline and validator.
//!
//! Handlers never mutate the controller. State that changes between events
//! (the session and the connection flag) lives in [`AppState`], which the
//! handlers take by reference and return anew.

use crate::inference::client::ClientFactory;
use crate::inference::config::AppConfig;
use crate::inference::pipeline::{self, EMPTY_INPUT_MESSAGE};
use crate::inference::prompts::PromptTemplates;
use crate::inference::types::{ConnectionResult, InferenceResult, Session};

use super::escape::unescape;
use super::ui::{UiController, WidgetKey, WidgetProps, GREEN, RED, WHITE};
use super::validation::OutputValidator;

pub const MISSING_KEY_MESSAGE: &str = "Error: Missing API key in .env";
pub const NO_ENDPOINTS_MESSAGE: &str = "Error: No endpoints in endpoints.yaml";
pub const NOT_CONNECTED_MESSAGE: &str = "Error: Not connected to API";
pub const TESTING_MESSAGE: &str = "Testing connection...";
pub const PROCESSING_MESSAGE: &str = "Processing...";
pub const VALIDATION_OK_MESSAGE: &str = "Output Validation Succeeded";

/// What the controller knows between events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    /// `None` until credentials and an endpoint are available.
    pub session: Option<Session>,
    pub endpoints: Vec<String>,
    pub connected: bool,
}

impl AppState {
    pub fn model(&self) -> Option<&str> {
        self.session.as_ref().map(Session::model)
    }
}

/// Drives one front-end.
pub struct Controller {
    clients: Box<dyn ClientFactory>,
    prompts: Box<dyn PromptTemplates>,
    validator: Box<dyn OutputValidator>,
    template: String,
}

impl Controller {
    pub fn new(
        clients: Box<dyn ClientFactory>,
        prompts: Box<dyn PromptTemplates>,
        validator: Box<dyn OutputValidator>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            clients,
            prompts,
            validator,
            template: template.into(),
        }
    }

    /// Startup: check configuration, select the initial endpoint, probe it.
    pub async fn initialise(&self, ui: &mut dyn UiController, config: &AppConfig) -> AppState {
        let Some(credentials) = config.credentials.clone() else {
            tracing::warn!("no API key configured, inference disabled");
            show_status(ui, MISSING_KEY_MESSAGE, false);
            return AppState::default();
        };

        let Some(model) = config.initial_model() else {
            tracing::warn!(
                config = ?config.source,
                "no endpoints configured, inference disabled"
            );
            show_status(ui, NO_ENDPOINTS_MESSAGE, false);
            return AppState::default();
        };

        ui.configure(
            WidgetKey::EndpointDropdown,
            WidgetProps::choices(config.endpoints.clone(), model),
        );

        tracing::info!(
            config = ?config.source,
            endpoints = config.endpoints.len(),
            model,
            "starting session"
        );
        let session = Session::new(credentials, model);
        let connection = self.probe(ui, &session).await;

        AppState {
            session: Some(session),
            endpoints: config.endpoints.clone(),
            connected: connection.success,
        }
    }

    /// The user picked another endpoint.
    pub async fn on_endpoint_changed(
        &self,
        ui: &mut dyn UiController,
        state: &AppState,
        selected: &str,
    ) -> AppState {
        let Some(current) = &state.session else {
            show_status(ui, MISSING_KEY_MESSAGE, false);
            return state.clone();
        };

        if !state.endpoints.iter().any(|e| e == selected) {
            ui.set_value(
                WidgetKey::StatusText,
                &format!("Error: Unknown endpoint '{selected}'"),
            );
            return state.clone();
        }

        tracing::info!(from = %current.model(), to = %selected, "endpoint changed");
        ui.configure(
            WidgetKey::EndpointDropdown,
            WidgetProps::choices(state.endpoints.clone(), selected),
        );

        let session = current.with_model(selected);
        let connection = self.probe(ui, &session).await;

        AppState {
            session: Some(session),
            endpoints: state.endpoints.clone(),
            connected: connection.success,
        }
    }

    /// The input text changed: refresh the preview.
    pub fn on_input_changed(&self, ui: &mut dyn UiController, input: &str) {
        ui.set_value(WidgetKey::PreviewText, &unescape(input));
    }

    /// The user asked for an inference on `input`.
    pub async fn on_infer_clicked(&self, ui: &mut dyn UiController, state: &AppState, input: &str) {
        let session = match &state.session {
            Some(session) if state.connected => session,
            _ => {
                ui.set_value(WidgetKey::OutputText, NOT_CONNECTED_MESSAGE);
                return;
            }
        };

        let text = unescape(input);
        if text.trim().is_empty() {
            ui.set_value(WidgetKey::OutputText, EMPTY_INPUT_MESSAGE);
            return;
        }

        ui.set_value(WidgetKey::OutputText, PROCESSING_MESSAGE);
        ui.configure(WidgetKey::InferButton, WidgetProps::enabled(false));

        let result = match self.clients.build(session.credentials()) {
            Ok(client) => {
                pipeline::infer(
                    client.as_ref(),
                    self.prompts.as_ref(),
                    &self.template,
                    session,
                    &text,
                )
                .await
            }
            Err(e) => InferenceResult {
                success: false,
                payload: format!("API Error: {e}"),
            },
        };

        ui.set_value(WidgetKey::OutputText, &result.payload);
        ui.configure(WidgetKey::InferButton, WidgetProps::enabled(true));

        if result.success {
            let outcome = self.validator.validate(&result.payload);
            tracing::info!(valid = outcome.is_valid, "output validated");
            if outcome.is_valid {
                ui.set_value(WidgetKey::ValidationStatus, VALIDATION_OK_MESSAGE);
                ui.configure(WidgetKey::ValidationStatus, WidgetProps::color(GREEN));
            } else {
                ui.set_value(
                    WidgetKey::ValidationStatus,
                    &format!("Output Validation Failed: {}", outcome.message),
                );
                ui.configure(WidgetKey::ValidationStatus, WidgetProps::color(RED));
            }
        } else {
            ui.set_value(WidgetKey::ValidationStatus, "");
            ui.configure(WidgetKey::ValidationStatus, WidgetProps::color(WHITE));
        }
    }

    async fn probe(&self, ui: &mut dyn UiController, session: &Session) -> ConnectionResult {
        ui.set_value(WidgetKey::StatusText, TESTING_MESSAGE);

        let connection = match self.clients.build(session.credentials()) {
            Ok(client) => pipeline::probe(client.as_ref(), session).await,
            Err(e) => ConnectionResult {
                success: false,
                message: format!("Connection failed: {e}"),
            },
        };

        show_status(ui, &connection.message, connection.success);
        connection
    }
}

fn show_status(ui: &mut dyn UiController, message: &str, connected: bool) {
    ui.set_value(WidgetKey::StatusText, message);
    ui.configure(WidgetKey::StatusIndicator, WidgetProps::checked(connected));
}
