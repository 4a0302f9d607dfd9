use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::channel::{channel, Delivery, Outbox, Subscription};
use crate::normalize::Normalizer;
use crate::panel::EditorPanel;
use crate::protocol::{ElementDescription, ElementUpdate, HostMessage, RenderMessage};
use crate::render::RenderFrame;
use crate::serialize::serialize;

/// Viewport the render surface is laid out at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Phone,
    Tablet,
    #[default]
    Desktop,
}

impl Device {
    /// Width in CSS pixels; `None` fills the available width.
    pub fn viewport_width(self) -> Option<u32> {
        match self {
            Device::Phone => Some(412),
            Device::Tablet => Some(768),
            Device::Desktop => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Read-only previews turn editing off entirely.
    pub show_editor_panel: bool,
    pub device: Device,
    pub normalizer: Normalizer,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            show_editor_panel: true,
            device: Device::Desktop,
            normalizer: Normalizer::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    /// Nothing to show yet; the page renders its loading/empty state.
    Empty,
    Mounted,
}

/// Outcome of a host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Sent,
    /// Nothing to send: the panel had no pending changes.
    Unchanged,
    /// No render is mounted; nothing was sent.
    Unavailable,
    /// The render side is gone; the frame was discarded.
    Dropped,
}

// Field order is drop order: the listener goes before the render.
struct MountedRender {
    subscription: Subscription,
    outbox: Outbox<HostMessage>,
    frame: RenderFrame,
    document: String,
}

/// Owns the mounted render and mediates every message to and from it.
///
/// The host keeps value copies only: a selection is an
/// [`ElementDescription`], never a node.
pub struct HostBridge {
    options: BridgeOptions,
    mounted: Option<MountedRender>,
    selection: Option<ElementDescription>,
    messages_sent: u64,
}

impl HostBridge {
    pub fn new(options: BridgeOptions) -> Self {
        Self {
            options,
            mounted: None,
            selection: None,
            messages_sent: 0,
        }
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    pub fn device(&self) -> Device {
        self.options.device
    }

    pub fn set_device(&mut self, device: Device) {
        self.options.device = device;
    }

    /// Normalize `raw` and mount it, replacing any current render. Empty
    /// markup leaves the bridge in [`PreviewState::Empty`].
    pub fn mount(&mut self, raw: &str) -> PreviewState {
        self.unmount();

        let document = self.options.normalizer.normalize(raw);
        if document.is_empty() {
            debug!(target = "bridge", "nothing to preview");
            return PreviewState::Empty;
        }

        let (host, render) = channel();
        let subscription = Subscription::new(host.inbox);
        let frame = RenderFrame::mount(&document, render);
        info!(
            target = "bridge",
            bytes = document.len(),
            instrumented = frame.is_instrumented(),
            "render mounted"
        );
        self.mounted = Some(MountedRender {
            subscription,
            outbox: host.outbox,
            frame,
            document,
        });
        PreviewState::Mounted
    }

    /// Tear down the render and its subscription. Any selection dies with it.
    pub fn unmount(&mut self) {
        self.selection = None;
        if self.mounted.take().is_some() {
            debug!(target = "bridge", "render unmounted");
        }
    }

    pub fn state(&self) -> PreviewState {
        if self.mounted.is_some() {
            PreviewState::Mounted
        } else {
            PreviewState::Empty
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    /// The normalized document the render was mounted with.
    pub fn document(&self) -> Option<&str> {
        self.mounted.as_ref().map(|mounted| mounted.document.as_str())
    }

    /// The render surface, for delivering user input to it.
    pub fn render_mut(&mut self) -> Option<&mut RenderFrame> {
        self.mounted.as_mut().map(|mounted| &mut mounted.frame)
    }

    pub fn selection(&self) -> Option<&ElementDescription> {
        self.selection.as_ref()
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent
    }

    /// Drain messages from the render. The latest one wins.
    pub fn poll(&mut self) -> usize {
        let Some(mounted) = self.mounted.as_mut() else {
            return 0;
        };
        let mut handled = 0;
        while let Some(message) = mounted.subscription.try_next() {
            handled += 1;
            match message {
                RenderMessage::ElementSelected(description) => {
                    debug!(
                        target = "bridge",
                        tag = %description.tag_name,
                        path = %description.path,
                        "selection received"
                    );
                    self.selection = Some(description);
                }
                RenderMessage::ClearSelection => {
                    debug!(target = "bridge", "selection cleared by render");
                    self.selection = None;
                }
            }
        }
        handled
    }

    /// One event-loop turn: the render handles host commands, then the host
    /// handles render messages.
    pub fn tick(&mut self) -> usize {
        let rendered = self
            .mounted
            .as_mut()
            .map(|mounted| mounted.frame.pump())
            .unwrap_or(0);
        rendered + self.poll()
    }

    /// Clean markup of the current render. Clears the selection.
    pub fn get_snapshot(&mut self) -> Option<String> {
        let mounted = self.mounted.as_mut()?;
        self.selection = None;
        serialize(Some(&mut mounted.frame))
    }

    pub fn request_update(&mut self, update: ElementUpdate) -> Dispatch {
        self.send(HostMessage::UpdateElement(update))
    }

    /// Clears the local selection right away, then asks the render to drop
    /// its markers.
    pub fn request_clear_selection(&mut self) -> Dispatch {
        self.selection = None;
        self.send(HostMessage::ClearSelectionRequest)
    }

    /// Shown only with a mounted render, a held selection and editing enabled.
    pub fn editor_panel(&self) -> Option<EditorPanel> {
        if !self.options.show_editor_panel || self.mounted.is_none() {
            return None;
        }
        self.selection.as_ref().map(EditorPanel::for_selection)
    }

    /// Send the panel's pending changes, if any.
    pub fn apply_panel(&mut self, panel: &mut EditorPanel) -> Dispatch {
        let update = panel.pending_update();
        if update.is_empty() {
            return Dispatch::Unchanged;
        }
        let dispatch = self.request_update(update);
        if dispatch == Dispatch::Sent {
            panel.mark_applied();
        }
        dispatch
    }

    fn send(&mut self, message: HostMessage) -> Dispatch {
        let Some(mounted) = self.mounted.as_ref() else {
            debug!(target = "bridge", "no render mounted; command skipped");
            return Dispatch::Unavailable;
        };
        match mounted.outbox.post(&message) {
            Delivery::Posted => {
                self.messages_sent += 1;
                Dispatch::Sent
            }
            Delivery::Dropped => Dispatch::Dropped,
        }
    }
}

impl Default for HostBridge {
    fn default() -> Self {
        Self::new(BridgeOptions::default())
    }
}
