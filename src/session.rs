//! Lifecycle state of one scanning session.
//!
//! Pure state machine, no platform types. The `Scanner` component owns the
//! media stream and timers; this tracks which phase the session is in and
//! suppresses no-op transitions so callbacks fire once per actual change.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    Inactive,
    Initializing,
    Active,
    /// Latched per decode event; the decode loop keeps running.
    Scanning,
    Error,
}

impl ScannerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScannerState::Inactive => "inactive",
            ScannerState::Initializing => "initializing",
            ScannerState::Active => "active",
            ScannerState::Scanning => "scanning",
            ScannerState::Error => "error",
        }
    }
}

impl fmt::Display for ScannerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Camera permission, independent of the scan state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Prompt,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionState::Prompt => "prompt",
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
        }
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct ScanSession {
    state: ScannerState,
    permission: PermissionState,
    last_error: Option<String>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            state: ScannerState::Inactive,
            permission: PermissionState::Prompt,
            last_error: None,
        }
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Move to `next`, returning it when that is an actual transition.
    pub fn set_state(&mut self, next: ScannerState) -> Option<ScannerState> {
        if self.state == next {
            return None;
        }
        self.state = next;
        Some(next)
    }

    pub fn set_permission(&mut self, next: PermissionState) -> Option<PermissionState> {
        if self.permission == next {
            return None;
        }
        self.permission = next;
        Some(next)
    }

    /// Record an unrecoverable failure; carries the translated message.
    pub fn record_error(&mut self, message: String) -> Option<ScannerState> {
        self.last_error = Some(message);
        self.set_state(ScannerState::Error)
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Deactivate. Permission survives across sessions.
    pub fn reset(&mut self) -> Option<ScannerState> {
        self.last_error = None;
        self.set_state(ScannerState::Inactive)
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}
