use tracing::{debug, trace};

use crate::render::instrumentation::unmark;
use crate::render::{RenderDocument, RenderFrame};
use crate::reserved::{marker_selector, INJECTED_IDS};

/// Clean markup of the mounted render, or `None` when nothing is mounted.
pub fn serialize(render: Option<&mut RenderFrame>) -> Option<String> {
    render?.snapshot()
}

/// Strip every instrumentation artifact from `document` in place, then
/// return the outer markup of its root element.
///
/// Markers are removed unconditionally, whether or not a selection is
/// currently tracked. Each removal is optional: a missing element is fine.
pub fn clean_and_serialize(document: &RenderDocument) -> Option<String> {
    let marked = document.select_all(&marker_selector());
    for element in &marked {
        unmark(element);
    }

    let mut removed = 0;
    for id in INJECTED_IDS {
        match document.element_by_id(id) {
            Some(element) => {
                element.detach();
                removed += 1;
            }
            None => trace!(target = "serialize", %id, "injected element absent"),
        }
    }

    debug!(
        target = "serialize",
        markers = marked.len(),
        injected = removed,
        "document cleaned"
    );
    document.outer_html()
}
