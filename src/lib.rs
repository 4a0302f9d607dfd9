// Library exports for the binary and integration tests

pub mod api;
pub mod channel;
pub mod config;
pub mod host;
pub mod normalize;
pub mod page;
pub mod panel;
pub mod protocol;
pub mod render;
pub mod reserved;
pub mod serialize;
pub mod server;

// Re-export commonly used types
pub use api::{ApiError, ProjectClient, ProjectPreview, Session, Version};
pub use config::PreviewConfig;
pub use host::{BridgeOptions, Device, Dispatch, HostBridge, PreviewState};
pub use normalize::{normalize, Normalizer};
pub use page::{Notice, PageState, PreviewPage};
pub use panel::EditorPanel;
pub use protocol::{ElementDescription, ElementUpdate, HostMessage, RenderMessage};
pub use serialize::serialize;
