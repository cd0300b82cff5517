//! Host web view detection.
//!
//! The host app appends `CastlinkHost/<version>` to its web view's user
//! agent. Outside the host (a desktop browser, a preview) there is nobody to
//! talk to, so the mock backend is the right choice.

/// Marker the host app adds to its user agent.
pub const HOST_MARKER: &str = "CastlinkHost";

/// Which [`CastApi`](crate::CastApi) implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Running inside the host app: use the real bridge.
    Host,
    /// Anywhere else: use the mock client.
    Mock,
}

impl Backend {
    /// Pick a backend from the user agent.
    pub fn detect(user_agent: &str) -> Self {
        if is_host_web_view(user_agent) { Self::Host } else { Self::Mock }
    }
}

/// Whether `user_agent` comes from the host app's web view.
pub fn is_host_web_view(user_agent: &str) -> bool {
    user_agent.contains(HOST_MARKER)
}

/// Host version from `CastlinkHost/<version>`, if the marker carries one.
pub fn host_version(user_agent: &str) -> Option<&str> {
    let start = user_agent.find(HOST_MARKER)? + HOST_MARKER.len();
    let version = user_agent[start..].strip_prefix('/')?;
    let end = version.find(char::is_whitespace).unwrap_or(version.len());
    let version = &version[..end];
    (!version.is_empty()).then_some(version)
}
