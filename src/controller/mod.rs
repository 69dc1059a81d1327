//! Controller: the front-end-facing layer.
//!
//! Front-ends (the terminal UI in this crate, or any other) implement
//! [`UiController`] and forward their events to [`Controller`].

pub mod app;
pub mod escape;
pub mod ui;
pub mod validation;

pub use app::{AppState, Controller};
pub use escape::unescape;
pub use ui::{UiController, WidgetKey, WidgetProps};
pub use validation::{JsonDocumentValidator, OutputValidator, ValidationOutcome};
