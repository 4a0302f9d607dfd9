use tracing::{error, info};

use crate::api::{ApiError, ProjectClient, Session};
use crate::host::{BridgeOptions, HostBridge, PreviewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message surfaced to the user, e.g. as a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Loading,
    Ready,
}

/// Read-only preview of one project, optionally pinned to a version.
pub struct PreviewPage {
    project_id: String,
    version_id: Option<String>,
    state: PageState,
    notices: Vec<Notice>,
    bridge: HostBridge,
}

impl PreviewPage {
    pub fn new(
        project_id: impl Into<String>,
        version_id: Option<String>,
        options: BridgeOptions,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            version_id,
            state: PageState::Loading,
            notices: Vec::new(),
            bridge: HostBridge::new(options),
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn bridge(&self) -> &HostBridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut HostBridge {
        &mut self.bridge
    }

    /// Fetch and mount the document. Failures become notices and the page
    /// stays loading; nothing is rendered for them.
    pub async fn load(&mut self, client: &ProjectClient, session: Option<&Session>) -> PageState {
        let Some(session) = session else {
            self.fail(&ApiError::Unauthorized("sign in to view this preview".into()));
            return self.state;
        };

        match client.fetch_preview(&self.project_id, session).await {
            Ok(project) => {
                if let Some(version) = self.version_id.as_deref() {
                    if !project.has_version(version) {
                        self.notices.push(Notice::info(format!(
                            "version {version} not found; showing the current code"
                        )));
                    }
                }
                let document = project.document_for(self.version_id.as_deref());
                let mounted = self.bridge.mount(document);
                info!(
                    target = "page",
                    project = %self.project_id,
                    version = self.version_id.as_deref().unwrap_or("current"),
                    empty = mounted == PreviewState::Empty,
                    "preview loaded"
                );
                self.state = PageState::Ready;
            }
            Err(err) => self.fail(&err),
        }
        self.state
    }

    fn fail(&mut self, err: &ApiError) {
        error!(target = "page", project = %self.project_id, error = %err, "failed to load preview");
        self.notices.push(Notice::error(err.user_message()));
    }
}
