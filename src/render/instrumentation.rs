use kuchiki::NodeRef;
use tracing::{debug, trace};

use super::document::{
    add_class, class_list, element_path, get_attribute, remove_attribute, remove_class,
    remove_style_property, set_attribute, set_style_property, set_text_content, style_property,
    tag_name, RenderDocument,
};
use crate::protocol::{
    ElementDescription, ElementPath, ElementUpdate, HostMessage, RenderMessage, StyleProperty,
    StyleValues,
};
use crate::reserved::{marker_selector, SELECTED_ATTRIBUTE, SELECTED_CLASS, SELECTION_OUTLINE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Main,
    Auxiliary,
    Secondary,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub default_prevented: bool,
    pub redraw_requested: bool,
    pub propagation_stopped: bool,
}

/// Click handling result: what the event loop should do, and what to post.
#[derive(Debug, Default)]
pub struct ClickResult {
    pub outcome: DispatchOutcome,
    pub message: Option<RenderMessage>,
}

/// Selection and editing logic living inside the render.
#[derive(Default)]
pub struct Instrumentation {
    selected: Option<NodeRef>,
}

impl Instrumentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&NodeRef> {
        self.selected.as_ref()
    }

    pub fn on_click(
        &mut self,
        document: &RenderDocument,
        target: &NodeRef,
        button: MouseButton,
    ) -> ClickResult {
        if button != MouseButton::Main {
            return ClickResult::default();
        }

        let Some(element) = closest_element(target) else {
            return ClickResult::default();
        };
        let Some(path) = element_path(&element) else {
            return ClickResult::default();
        };
        if path.is_root() {
            trace!(target = "render", "ignoring click on root element");
            return ClickResult::default();
        }

        let default_prevented = triggers_default_action(&element);

        self.clear(document);
        mark_selected(&element);
        self.selected = Some(element.clone());

        let description = describe(&element, path);
        debug!(
            target = "render",
            tag = %description.tag_name,
            path = %description.path,
            "element selected"
        );

        ClickResult {
            outcome: DispatchOutcome {
                default_prevented,
                redraw_requested: true,
                propagation_stopped: true,
            },
            message: Some(RenderMessage::ElementSelected(description)),
        }
    }

    /// Escape deselects and tells the host.
    pub fn on_key(&mut self, document: &RenderDocument, key: &str) -> Option<RenderMessage> {
        if key != "Escape" || self.selected.is_none() {
            return None;
        }
        self.clear(document);
        Some(RenderMessage::ClearSelection)
    }

    /// Apply a host command. Returns whether the document changed.
    pub fn on_host_message(&mut self, document: &RenderDocument, message: HostMessage) -> bool {
        match message {
            HostMessage::ClearSelectionRequest => self.clear(document),
            HostMessage::UpdateElement(update) => self.apply_update(&update),
        }
    }

    /// Strip markers from every marked element, not just the tracked one.
    pub fn clear(&mut self, document: &RenderDocument) -> bool {
        self.selected = None;
        let marked = document.select_all(&marker_selector());
        for element in &marked {
            unmark(element);
        }
        !marked.is_empty()
    }

    /// Drop the selection without touching the document.
    pub fn forget(&mut self) {
        self.selected = None;
    }

    fn apply_update(&mut self, update: &ElementUpdate) -> bool {
        let Some(element) = self.selected.as_ref() else {
            trace!(target = "render", "update without selection ignored");
            return false;
        };
        if update.is_empty() {
            return false;
        }

        if let Some(text) = update.text.as_deref() {
            set_text_content(element, text);
        }

        if let Some(class_name) = update.class_name.as_deref() {
            let mut classes: Vec<&str> = class_name
                .split_whitespace()
                .filter(|class| *class != SELECTED_CLASS)
                .collect();
            classes.push(SELECTED_CLASS);
            set_attribute(element, "class", &classes.join(" "));
        }

        for (property, value) in update.styles.iter() {
            if value.trim().is_empty() {
                remove_style_property(element, property.css_name());
            } else {
                set_style_property(element, property.css_name(), value.trim());
            }
        }

        debug!(target = "render", "applied element update");
        true
    }
}

fn closest_element(node: &NodeRef) -> Option<NodeRef> {
    node.inclusive_ancestors()
        .find(|candidate| candidate.as_element().is_some())
}

fn mark_selected(element: &NodeRef) {
    add_class(element, SELECTED_CLASS);
    set_attribute(element, SELECTED_ATTRIBUTE, "true");
    set_style_property(element, "outline", SELECTION_OUTLINE);
}

pub(crate) fn unmark(element: &NodeRef) {
    remove_class(element, SELECTED_CLASS);
    remove_attribute(element, SELECTED_ATTRIBUTE);
    remove_style_property(element, "outline");
}

/// Links navigate; submit controls inside a form submit it.
fn triggers_default_action(element: &NodeRef) -> bool {
    let inside_form = element
        .inclusive_ancestors()
        .any(|node| tag_name(&node).as_deref() == Some("form"));

    element.inclusive_ancestors().any(|node| {
        let Some(tag) = tag_name(&node) else {
            return false;
        };
        let kind = get_attribute(&node, "type").map(|value| value.trim().to_ascii_lowercase());
        match tag.as_str() {
            "a" | "area" => get_attribute(&node, "href").is_some(),
            "button" => {
                inside_form && !matches!(kind.as_deref(), Some("button") | Some("reset"))
            }
            "input" => inside_form && matches!(kind.as_deref(), Some("submit") | Some("image")),
            _ => false,
        }
    })
}

fn describe(element: &NodeRef, path: ElementPath) -> ElementDescription {
    let mut styles = StyleValues::default();
    for property in StyleProperty::ALL {
        if let Some(value) = style_property(element, property.css_name()) {
            styles.set(property, value);
        }
    }

    let class_name = class_list(element)
        .into_iter()
        .filter(|class| class != SELECTED_CLASS)
        .collect::<Vec<_>>()
        .join(" ");

    ElementDescription {
        tag_name: tag_name(element).unwrap_or_default(),
        path,
        id: get_attribute(element, "id"),
        class_name,
        text: element.text_contents().trim().to_string(),
        styles,
    }
}
