//! UI capability the controller renders through.
//!
//! Widgets are addressed by [`WidgetKey`]; a front-end maps each key onto
//! whatever it draws (a desktop widget, a terminal line, a test recorder).

use std::fmt;

/// RGB text color.
pub type Rgb = (u8, u8, u8);

pub const GREEN: Rgb = (0, 255, 0);
pub const RED: Rgb = (255, 0, 0);
pub const WHITE: Rgb = (255, 255, 255);

/// Every widget the controller touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKey {
    EndpointDropdown,
    StatusIndicator,
    StatusText,
    PreviewText,
    InferButton,
    OutputText,
    ValidationStatus,
}

impl WidgetKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKey::EndpointDropdown => "endpoint_dropdown",
            WidgetKey::StatusIndicator => "status_indicator",
            WidgetKey::StatusText => "status_text",
            WidgetKey::PreviewText => "preview_text",
            WidgetKey::InferButton => "infer_button",
            WidgetKey::OutputText => "output_text",
            WidgetKey::ValidationStatus => "validation_status",
        }
    }
}

impl fmt::Display for WidgetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial widget configuration; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetProps {
    pub items: Option<Vec<String>>,
    pub default_value: Option<String>,
    pub checked: Option<bool>,
    pub enabled: Option<bool>,
    pub color: Option<Rgb>,
}

impl WidgetProps {
    pub fn checked(value: bool) -> Self {
        Self {
            checked: Some(value),
            ..Default::default()
        }
    }

    pub fn enabled(value: bool) -> Self {
        Self {
            enabled: Some(value),
            ..Default::default()
        }
    }

    pub fn color(value: Rgb) -> Self {
        Self {
            color: Some(value),
            ..Default::default()
        }
    }

    pub fn choices(items: Vec<String>, selected: impl Into<String>) -> Self {
        Self {
            items: Some(items),
            default_value: Some(selected.into()),
            ..Default::default()
        }
    }

    /// Overlay the fields set in `other`.
    pub fn merge(&mut self, other: WidgetProps) {
        if other.items.is_some() {
            self.items = other.items;
        }
        if other.default_value.is_some() {
            self.default_value = other.default_value;
        }
        if other.checked.is_some() {
            self.checked = other.checked;
        }
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
        if other.color.is_some() {
            self.color = other.color;
        }
    }
}

/// Front-end surface driven by the controller.
pub trait UiController {
    fn set_value(&mut self, key: WidgetKey, value: &str);
    fn configure(&mut self, key: WidgetKey, props: WidgetProps);
}
