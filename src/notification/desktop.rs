use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, info, warn};

/// OS notification permission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Not asked yet
    Default,
    Granted,
    Denied,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Default => "default",
            Permission::Granted => "granted",
            Permission::Denied => "denied",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopNotification {
    pub title: String,
    pub body: String,
    /// Notifications sharing a tag replace each other
    pub tag: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("could not run {program}: {source}")]
    SpawnError {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// The OS notification service
pub trait DesktopBackend {
    fn permission(&self) -> Permission;
    fn request_permission(&mut self) -> Permission;
    fn send(&mut self, notification: &DesktopNotification) -> Result<(), NotifyError>;
}

/// Permission-aware sender for OS notifications
pub struct DesktopChannel {
    backend: Box<dyn DesktopBackend>,
    tag: String,
}

impl DesktopChannel {
    pub fn new(backend: Box<dyn DesktopBackend>, tag: impl Into<String>) -> Self {
        DesktopChannel {
            backend,
            tag: tag.into(),
        }
    }

    pub fn permission(&self) -> Permission {
        self.backend.permission()
    }

    /// Ask for permission if it was never decided. Returns the resulting
    /// state and whether this call is what granted it.
    pub fn ensure_permission(&mut self) -> (Permission, bool) {
        match self.backend.permission() {
            Permission::Default => {
                let result = self.backend.request_permission();
                info!(permission = result.as_str(), "notification permission requested");
                (result, result == Permission::Granted)
            }
            other => (other, false),
        }
    }

    /// Send if allowed. Returns whether a notification went out.
    pub fn notify(&mut self, title: &str, body: &str) -> bool {
        self.notify_inner(title, body, true)
    }

    fn notify_inner(&mut self, title: &str, body: &str, may_request: bool) -> bool {
        match self.backend.permission() {
            Permission::Granted => {
                let notification = DesktopNotification {
                    title: title.to_string(),
                    body: body.to_string(),
                    tag: self.tag.clone(),
                };
                match self.backend.send(&notification) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "desktop notification failed");
                        false
                    }
                }
            }
            Permission::Denied => {
                debug!("desktop notifications denied; skipping");
                false
            }
            Permission::Default if may_request => {
                if self.backend.request_permission() == Permission::Granted {
                    self.notify_inner(title, body, false)
                } else {
                    debug!("desktop notification permission not granted; skipping");
                    false
                }
            }
            Permission::Default => false,
        }
    }
}

/// Desktop notifications through `notify-send`. A missing binary or
/// `desktop = false` in the config counts as denied.
pub struct NotifySendBackend {
    program: Option<PathBuf>,
    enabled: bool,
}

impl NotifySendBackend {
    pub fn detect(enabled: bool) -> Self {
        let program = which::which("notify-send").ok();
        if enabled && program.is_none() {
            debug!("notify-send not found; desktop notifications disabled");
        }
        NotifySendBackend { program, enabled }
    }
}

impl DesktopBackend for NotifySendBackend {
    fn permission(&self) -> Permission {
        if self.enabled && self.program.is_some() {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    fn request_permission(&mut self) -> Permission {
        self.permission()
    }

    fn send(&mut self, notification: &DesktopNotification) -> Result<(), NotifyError> {
        let Some(program) = self.program.as_ref() else {
            return Err(NotifyError::Rejected("notify-send not available".into()));
        };
        let status = Command::new(program)
            .arg("--app-name=TaskFlow")
            .arg("--urgency=critical")
            .arg("--hint")
            .arg(format!(
                "string:x-canonical-private-synchronous:{}",
                notification.tag
            ))
            .arg(&notification.title)
            .arg(&notification.body)
            .status()
            .map_err(|e| NotifyError::SpawnError {
                program: program.clone(),
                source: e,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected(format!("notify-send exited with {}", status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FakeBackend;

    #[test]
    fn denied_never_sends() {
        let backend = FakeBackend::new(Permission::Denied, Permission::Denied);
        let mut channel = DesktopChannel::new(Box::new(backend.clone()), "taskflow-alarm");
        assert!(!channel.notify("t", "b"));
        assert!(!channel.notify("t", "b"));
        assert!(backend.sent().is_empty());
        assert_eq!(backend.requests(), 0);
    }

    #[test]
    fn default_requests_then_sends_once() {
        let backend = FakeBackend::new(Permission::Default, Permission::Granted);
        let mut channel = DesktopChannel::new(Box::new(backend.clone()), "taskflow-alarm");
        assert!(channel.notify("Standup", "Task reminder!"));
        assert_eq!(backend.requests(), 1);
        assert_eq!(
            backend.sent(),
            vec![DesktopNotification {
                title: "Standup".into(),
                body: "Task reminder!".into(),
                tag: "taskflow-alarm".into(),
            }]
        );
    }

    #[test]
    fn default_refused_sends_nothing() {
        let backend = FakeBackend::new(Permission::Default, Permission::Denied);
        let mut channel = DesktopChannel::new(Box::new(backend.clone()), "taskflow-alarm");
        assert!(!channel.notify("t", "b"));
        assert!(backend.sent().is_empty());
        assert_eq!(channel.permission(), Permission::Denied);
    }

    #[test]
    fn ensure_permission_reports_fresh_grant() {
        let backend = FakeBackend::new(Permission::Default, Permission::Granted);
        let mut channel = DesktopChannel::new(Box::new(backend.clone()), "x");
        assert_eq!(channel.ensure_permission(), (Permission::Granted, true));
        assert_eq!(channel.ensure_permission(), (Permission::Granted, false));
    }

    #[test]
    fn disabled_backend_is_denied() {
        let backend = NotifySendBackend::detect(false);
        assert_eq!(backend.permission(), Permission::Denied);
    }
}
