//! Names reserved for editing instrumentation.
//!
//! Generated markup must not use these. Everything carrying one of them is
//! stripped by the serializer, so a collision in generated content would be
//! lost on persistence. The `ai-` names are kept as-is so documents persisted
//! by earlier builds still serialize clean.

/// Class put on the currently selected element.
pub const SELECTED_CLASS: &str = "ai-selected-element";

/// Data attribute put on the currently selected element.
pub const SELECTED_ATTRIBUTE: &str = "data-ai-selected";

/// Id of the injected design-system runtime `<script>`.
pub const RUNTIME_SCRIPT_ID: &str = "ai-preview-runtime";

/// Id of the injected layout reset `<style>`.
pub const RESET_STYLE_ID: &str = "ai-preview-style";

/// Id of the injected instrumentation `<script>`.
pub const INSTRUMENTATION_SCRIPT_ID: &str = "ai-preview-script";

/// Every id the normalizer injects, in injection order.
pub const INJECTED_IDS: &[&str] = &[RUNTIME_SCRIPT_ID, RESET_STYLE_ID, INSTRUMENTATION_SCRIPT_ID];

/// Outline drawn around the selected element.
pub const SELECTION_OUTLINE: &str = "2px solid #6366f1";

/// Selector matching any element carrying a selection marker.
pub fn marker_selector() -> String {
    format!(".{SELECTED_CLASS},[{SELECTED_ATTRIBUTE}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_covers_class_and_attribute() {
        assert_eq!(marker_selector(), ".ai-selected-element,[data-ai-selected]");
    }

    #[test]
    fn injected_ids_are_distinct() {
        let mut ids = INJECTED_IDS.to_vec();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), INJECTED_IDS.len());
    }
}
