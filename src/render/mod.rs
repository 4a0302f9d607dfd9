//! The isolated render: a parsed document plus, when the document carries the
//! instrumentation script, the selection/editing logic bound to it.

pub mod document;
pub mod instrumentation;

use kuchiki::NodeRef;
use tracing::{debug, warn};

use crate::channel::{Delivery, RenderEndpoint};
use crate::protocol::{ElementPath, RenderMessage};
use crate::reserved::INSTRUMENTATION_SCRIPT_ID;
use crate::serialize::clean_and_serialize;

pub use document::RenderDocument;
pub use instrumentation::{DispatchOutcome, Instrumentation, MouseButton};

/// One mounted document. Not `Send`: nodes are reference counted.
pub struct RenderFrame {
    document: RenderDocument,
    instrumentation: Option<Instrumentation>,
    endpoint: RenderEndpoint,
}

impl RenderFrame {
    pub fn mount(html: &str, endpoint: RenderEndpoint) -> Self {
        let document = RenderDocument::parse(html);
        let instrumentation = document
            .element_by_id(INSTRUMENTATION_SCRIPT_ID)
            .map(|_| Instrumentation::new());
        debug!(
            target = "render",
            instrumented = instrumentation.is_some(),
            "render mounted"
        );
        Self {
            document,
            instrumentation,
            endpoint,
        }
    }

    pub fn document(&self) -> &RenderDocument {
        &self.document
    }

    pub fn is_instrumented(&self) -> bool {
        self.instrumentation.is_some()
    }

    pub fn instrumentation(&self) -> Option<&Instrumentation> {
        self.instrumentation.as_ref()
    }

    /// User click on the element at `path`.
    pub fn click(&mut self, path: &ElementPath, button: MouseButton) -> DispatchOutcome {
        let Some(target) = self.document.resolve_path(path) else {
            warn!(target = "render", %path, "click target not found");
            return DispatchOutcome::default();
        };
        self.dispatch_click(&target, button)
    }

    /// User click on the first element matching `selector`.
    pub fn click_selector(&mut self, selector: &str, button: MouseButton) -> DispatchOutcome {
        let Some(target) = self.document.select_first(selector) else {
            warn!(target = "render", %selector, "click target not found");
            return DispatchOutcome::default();
        };
        self.dispatch_click(&target, button)
    }

    pub fn key_down(&mut self, key: &str) {
        let Some(instrumentation) = self.instrumentation.as_mut() else {
            return;
        };
        if let Some(message) = instrumentation.on_key(&self.document, key) {
            self.post(message);
        }
    }

    /// Process every host message queued so far. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(message) = self.endpoint.inbox.try_next() {
            handled += 1;
            if let Some(instrumentation) = self.instrumentation.as_mut() {
                instrumentation.on_host_message(&self.document, message);
            }
        }
        handled
    }

    /// Strip instrumentation and return the clean markup. Drops the selection.
    pub fn snapshot(&mut self) -> Option<String> {
        let html = clean_and_serialize(&self.document);
        if let Some(instrumentation) = self.instrumentation.as_mut() {
            instrumentation.forget();
        }
        html
    }

    fn dispatch_click(&mut self, target: &NodeRef, button: MouseButton) -> DispatchOutcome {
        let Some(instrumentation) = self.instrumentation.as_mut() else {
            return DispatchOutcome::default();
        };
        let result = instrumentation.on_click(&self.document, target, button);
        if let Some(message) = result.message {
            self.post(message);
        }
        result.outcome
    }

    fn post(&self, message: RenderMessage) {
        if self.endpoint.outbox.post(&message) == Delivery::Dropped {
            debug!(target = "render", "host listener gone; message dropped");
        }
    }
}
