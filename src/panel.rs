use crate::protocol::{ElementDescription, ElementUpdate, StyleProperty, StyleValues};

/// Form model behind the editing panel. Drafts start from the selection
/// snapshot; only fields that differ from it end up in the update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorPanel {
    selection: ElementDescription,
    text: String,
    class_name: String,
    styles: StyleValues,
}

impl EditorPanel {
    pub fn for_selection(selection: &ElementDescription) -> Self {
        Self {
            selection: selection.clone(),
            text: selection.text.clone(),
            class_name: selection.class_name.clone(),
            styles: selection.styles.clone(),
        }
    }

    pub fn selection(&self) -> &ElementDescription {
        &self.selection
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn style(&self, property: StyleProperty) -> &str {
        self.styles.get(property).unwrap_or_default()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_class_name(&mut self, class_name: impl Into<String>) {
        self.class_name = class_name.into();
    }

    pub fn set_style(&mut self, property: StyleProperty, value: impl Into<String>) {
        self.styles.set(property, value);
    }

    pub fn pending_update(&self) -> ElementUpdate {
        let mut update = ElementUpdate::default();
        if self.text != self.selection.text {
            update.text = Some(self.text.clone());
        }
        if self.class_name != self.selection.class_name {
            update.class_name = Some(self.class_name.clone());
        }
        for property in StyleProperty::ALL {
            let draft = self.styles.get(property).unwrap_or_default();
            let original = self.selection.styles.get(property).unwrap_or_default();
            if draft != original {
                update.styles.set(property, draft);
            }
        }
        update
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending_update().is_empty()
    }

    /// Treat the current drafts as the new baseline once they were sent.
    pub fn mark_applied(&mut self) {
        self.selection.text = self.text.clone();
        self.selection.class_name = self.class_name.clone();
        self.selection.styles = self.styles.clone();
    }
}
