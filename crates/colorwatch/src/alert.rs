//! Alert state and the external notification capability.
//!
//! [`AlertController`] turns the debounced detection result into an on/off
//! alert. It always tracks the applied state (and a title-style indicator);
//! external notifications are shown only when the user opted in and the
//! platform offers an [`AlertSignal`].

use std::io::{IsTerminal, Write};

/// Default notification text.
pub const DEFAULT_MESSAGE: &str = "Target color detected on screen!";

const BASE_TITLE: &str = "colorwatch";
const TITLE_PREFIX: &str = "[DETECTED] ";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AlertError {
    #[error("notifications are not supported in this environment")]
    Unsupported,
    #[error("notification permission was denied")]
    PermissionDenied,
    #[error("failed to show notification: {0}")]
    Show(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Prompt,
}

/// An open notification.
pub trait AlertHandle {
    fn close(&mut self);
}

/// Platform notification provider.
pub trait AlertSignal {
    fn permission(&self) -> Permission;
    fn request_permission(&mut self) -> Permission;
    fn show(&mut self, message: &str) -> Result<Box<dyn AlertHandle>, AlertError>;
}

/// Whether external notifications exist at all.
pub enum AlertCapability {
    Available(Box<dyn AlertSignal>),
    Unavailable,
}

impl AlertCapability {
    /// Terminal bell notifications when stderr is a terminal, nothing
    /// otherwise.
    pub fn detect() -> Self {
        if std::io::stderr().is_terminal() {
            AlertCapability::Available(Box::new(TerminalBell))
        } else {
            AlertCapability::Unavailable
        }
    }
}

/// State of the "notify on detection" toggle. `Requesting` marks a
/// permission request in flight; further enable requests are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertToggle {
    Off,
    Requesting,
    On,
}

pub struct AlertController {
    capability: AlertCapability,
    toggle: AlertToggle,
    applied: Option<bool>,
    open: Option<Box<dyn AlertHandle>>,
}

impl AlertController {
    pub fn new(capability: AlertCapability) -> Self {
        Self {
            capability,
            toggle: AlertToggle::Off,
            applied: None,
            open: None,
        }
    }

    /// Apply a debounced result. Re-applying the current value does nothing,
    /// so each transition into `true` shows at most one notification.
    ///
    /// Returns whether the applied value changed.
    pub fn set_alert(&mut self, is_active: bool) -> bool {
        if self.applied == Some(is_active) {
            return false;
        }
        let previous = self.applied.replace(is_active);

        if is_active {
            log::info!("alert raised");
            if self.toggle == AlertToggle::On {
                if let AlertCapability::Available(signal) = &mut self.capability {
                    match signal.show(DEFAULT_MESSAGE) {
                        Ok(handle) => self.open = Some(handle),
                        Err(e) => log::warn!("{e}"),
                    }
                }
            }
        } else {
            if previous == Some(true) {
                log::info!("alert cleared");
            }
            if let Some(mut handle) = self.open.take() {
                handle.close();
            }
        }
        true
    }

    pub fn is_active(&self) -> bool {
        self.applied == Some(true)
    }

    pub fn has_open_notification(&self) -> bool {
        self.open.is_some()
    }

    /// Window-title style indicator, prefixed while the alert is active.
    pub fn title(&self) -> String {
        if self.is_active() {
            format!("{TITLE_PREFIX}{BASE_TITLE}")
        } else {
            BASE_TITLE.to_string()
        }
    }

    pub fn toggle(&self) -> AlertToggle {
        self.toggle
    }

    pub fn notifications_enabled(&self) -> bool {
        self.toggle == AlertToggle::On
    }

    pub fn capability(&self) -> &AlertCapability {
        &self.capability
    }

    /// Turn notifications on, asking for permission when needed.
    ///
    /// On any error the toggle stays (or reverts to) off.
    pub fn enable_notifications(&mut self) -> Result<(), AlertError> {
        let signal = match &mut self.capability {
            AlertCapability::Available(signal) => signal,
            AlertCapability::Unavailable => {
                self.toggle = AlertToggle::Off;
                return Err(AlertError::Unsupported);
            }
        };
        match self.toggle {
            AlertToggle::On | AlertToggle::Requesting => return Ok(()),
            AlertToggle::Off => {}
        }

        let permission = match signal.permission() {
            Permission::Prompt => {
                self.toggle = AlertToggle::Requesting;
                log::debug!("requesting notification permission");
                signal.request_permission()
            }
            other => other,
        };

        if permission == Permission::Granted {
            self.toggle = AlertToggle::On;
            Ok(())
        } else {
            self.toggle = AlertToggle::Off;
            Err(AlertError::PermissionDenied)
        }
    }

    pub fn disable_notifications(&mut self) {
        self.toggle = AlertToggle::Off;
    }

    /// Restore a persisted toggle without prompting: it only comes back on
    /// when the capability exists and permission is already granted.
    pub fn restore_notifications(&mut self, saved: bool) {
        let granted = match &self.capability {
            AlertCapability::Available(signal) => signal.permission() == Permission::Granted,
            AlertCapability::Unavailable => false,
        };
        self.toggle = if saved && granted {
            AlertToggle::On
        } else {
            AlertToggle::Off
        };
    }
}

/// Rings the terminal bell and prints the message on stderr.
pub struct TerminalBell;

struct TerminalBellHandle;

impl AlertHandle for TerminalBellHandle {
    fn close(&mut self) {
        log::debug!("terminal alert dismissed");
    }
}

impl AlertSignal for TerminalBell {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn show(&mut self, message: &str) -> Result<Box<dyn AlertHandle>, AlertError> {
        let mut stderr = std::io::stderr();
        writeln!(stderr, "\x07{message}").map_err(|e| AlertError::Show(e.to_string()))?;
        Ok(Box::new(TerminalBellHandle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Counters {
        shown: usize,
        closed: usize,
        requests: usize,
    }

    struct FakeSignal {
        permission: Permission,
        answer: Permission,
        counters: Rc<RefCell<Counters>>,
    }

    struct FakeHandle(Rc<RefCell<Counters>>);

    impl AlertHandle for FakeHandle {
        fn close(&mut self) {
            self.0.borrow_mut().closed += 1;
        }
    }

    impl AlertSignal for FakeSignal {
        fn permission(&self) -> Permission {
            self.permission
        }

        fn request_permission(&mut self) -> Permission {
            self.counters.borrow_mut().requests += 1;
            self.permission = self.answer;
            self.answer
        }

        fn show(&mut self, _message: &str) -> Result<Box<dyn AlertHandle>, AlertError> {
            self.counters.borrow_mut().shown += 1;
            Ok(Box::new(FakeHandle(Rc::clone(&self.counters))))
        }
    }

    fn controller(permission: Permission, answer: Permission) -> (AlertController, Rc<RefCell<Counters>>) {
        let counters = Rc::new(RefCell::new(Counters::default()));
        let signal = FakeSignal {
            permission,
            answer,
            counters: Rc::clone(&counters),
        };
        (
            AlertController::new(AlertCapability::Available(Box::new(signal))),
            counters,
        )
    }

    #[test]
    fn repeated_true_shows_once_and_false_closes_once() {
        let (mut alert, counters) = controller(Permission::Granted, Permission::Granted);
        alert.enable_notifications().unwrap();

        assert!(alert.set_alert(true));
        assert!(!alert.set_alert(true));
        assert_eq!(counters.borrow().shown, 1);

        assert!(alert.set_alert(false));
        assert!(!alert.set_alert(false));
        assert_eq!(counters.borrow().closed, 1);
        assert!(!alert.has_open_notification());
    }

    #[test]
    fn state_is_tracked_without_notifications() {
        let (mut alert, counters) = controller(Permission::Granted, Permission::Granted);
        alert.set_alert(true);
        assert!(alert.is_active());
        assert_eq!(alert.title(), "[DETECTED] colorwatch");
        assert_eq!(counters.borrow().shown, 0);
        alert.set_alert(false);
        assert_eq!(alert.title(), "colorwatch");
    }

    #[test]
    fn first_false_is_applied_but_closes_nothing() {
        let (mut alert, counters) = controller(Permission::Granted, Permission::Granted);
        assert!(alert.set_alert(false));
        assert_eq!(counters.borrow().closed, 0);
    }

    #[test]
    fn unsupported_capability_rejects_enable() {
        let mut alert = AlertController::new(AlertCapability::Unavailable);
        assert_eq!(alert.enable_notifications(), Err(AlertError::Unsupported));
        assert_eq!(alert.toggle(), AlertToggle::Off);
        alert.restore_notifications(true);
        assert!(!alert.notifications_enabled());
    }

    #[test]
    fn denied_permission_reverts_toggle() {
        let (mut alert, counters) = controller(Permission::Denied, Permission::Denied);
        assert_eq!(alert.enable_notifications(), Err(AlertError::PermissionDenied));
        assert_eq!(alert.toggle(), AlertToggle::Off);
        assert_eq!(counters.borrow().requests, 0);
    }

    #[test]
    fn prompt_asks_once() {
        let (mut alert, counters) = controller(Permission::Prompt, Permission::Granted);
        alert.enable_notifications().unwrap();
        alert.enable_notifications().unwrap();
        assert!(alert.notifications_enabled());
        assert_eq!(counters.borrow().requests, 1);

        let (mut refused, _) = controller(Permission::Prompt, Permission::Denied);
        assert_eq!(
            refused.enable_notifications(),
            Err(AlertError::PermissionDenied)
        );
        assert_eq!(refused.toggle(), AlertToggle::Off);
    }

    #[test]
    fn restore_requires_granted_permission() {
        let (mut prompt, _) = controller(Permission::Prompt, Permission::Granted);
        prompt.restore_notifications(true);
        assert!(!prompt.notifications_enabled());

        let (mut granted, _) = controller(Permission::Granted, Permission::Granted);
        granted.restore_notifications(true);
        assert!(granted.notifications_enabled());
        granted.restore_notifications(false);
        assert!(!granted.notifications_enabled());
    }
}
