use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Version stamped on every frame this crate emits.
pub const PROTOCOL_VERSION: u64 = 1;

const VERSION_KEY: &str = "v";

/// Messages posted by the render to its host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderMessage {
    ElementSelected(ElementDescription),
    ClearSelection,
}

/// Messages posted by the host into the render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    UpdateElement(ElementUpdate),
    ClearSelectionRequest,
}

/// Position of an element as element-child indices, starting below the root
/// `html` element. The empty path is the root itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ElementPath(pub Vec<usize>);

impl ElementPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("html")?;
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

/// Style properties the editing panel is allowed to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleProperty {
    Padding,
    Margin,
    BackgroundColor,
    Color,
    FontSize,
}

impl StyleProperty {
    pub const ALL: [StyleProperty; 5] = [
        StyleProperty::Padding,
        StyleProperty::Margin,
        StyleProperty::BackgroundColor,
        StyleProperty::Color,
        StyleProperty::FontSize,
    ];

    pub fn css_name(self) -> &'static str {
        match self {
            StyleProperty::Padding => "padding",
            StyleProperty::Margin => "margin",
            StyleProperty::BackgroundColor => "background-color",
            StyleProperty::Color => "color",
            StyleProperty::FontSize => "font-size",
        }
    }

    pub fn from_css_name(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|property| property.css_name() == lowered)
    }
}

/// Values for the editable style properties. `None` means "not set" in a
/// snapshot and "leave unchanged" in an update; an empty string in an update
/// removes the declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
}

impl StyleValues {
    pub fn get(&self, property: StyleProperty) -> Option<&str> {
        self.slot(property).as_deref()
    }

    pub fn set(&mut self, property: StyleProperty, value: impl Into<String>) {
        *self.slot_mut(property) = Some(value.into());
    }

    pub fn is_empty(&self) -> bool {
        StyleProperty::ALL
            .into_iter()
            .all(|property| self.get(property).is_none())
    }

    /// Set properties in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (StyleProperty, &str)> + '_ {
        StyleProperty::ALL
            .into_iter()
            .filter_map(move |property| self.get(property).map(|value| (property, value)))
    }

    fn slot(&self, property: StyleProperty) -> &Option<String> {
        match property {
            StyleProperty::Padding => &self.padding,
            StyleProperty::Margin => &self.margin,
            StyleProperty::BackgroundColor => &self.background_color,
            StyleProperty::Color => &self.color,
            StyleProperty::FontSize => &self.font_size,
        }
    }

    fn slot_mut(&mut self, property: StyleProperty) -> &mut Option<String> {
        match property {
            StyleProperty::Padding => &mut self.padding,
            StyleProperty::Margin => &mut self.margin,
            StyleProperty::BackgroundColor => &mut self.background_color,
            StyleProperty::Color => &mut self.color,
            StyleProperty::FontSize => &mut self.font_size,
        }
    }
}

/// Value snapshot of the selected element. Carries no handle into the render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescription {
    pub tag_name: String,
    pub path: ElementPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub styles: StyleValues,
}

/// Partial update for the selected element.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub styles: StyleValues,
}

impl ElementUpdate {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.class_name.is_none() && self.styles.is_empty()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_style(mut self, property: StyleProperty, value: impl Into<String>) -> Self {
        self.styles.set(property, value);
        self
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not an object")]
    NotAnObject,
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u64),
}

/// Encode a message as a JSON frame stamped with [`PROTOCOL_VERSION`].
pub fn encode_frame<M: Serialize>(message: &M) -> Result<String, ProtocolError> {
    let mut value = serde_json::to_value(message)?;
    let JsonValue::Object(map) = &mut value else {
        return Err(ProtocolError::NotAnObject);
    };
    map.insert(VERSION_KEY.to_string(), JsonValue::from(PROTOCOL_VERSION));
    Ok(serde_json::to_string(&value)?)
}

/// Decode a JSON frame. Frames without a version are treated as version 1.
pub fn decode_frame<M: DeserializeOwned>(frame: &str) -> Result<M, ProtocolError> {
    let mut value: JsonValue = serde_json::from_str(frame)?;
    let JsonValue::Object(map) = &mut value else {
        return Err(ProtocolError::NotAnObject);
    };
    if let Some(version) = map.remove(VERSION_KEY) {
        let version = version.as_u64().unwrap_or(u64::MAX);
        if version > PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }
    }
    Ok(serde_json::from_value(value)?)
}
