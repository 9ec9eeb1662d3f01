//! Answers to engine permission prompts.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Permission kinds the engine asks about, carrying the WebView2 values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Unknown,
    Microphone,
    Camera,
    Geolocation,
    Notifications,
    OtherSensors,
    ClipboardRead,
}

impl PermissionKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Microphone,
            2 => Self::Camera,
            3 => Self::Geolocation,
            4 => Self::Notifications,
            5 => Self::OtherSensors,
            6 => Self::ClipboardRead,
            _ => Self::Unknown,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::Microphone => 1,
            Self::Camera => 2,
            Self::Geolocation => 3,
            Self::Notifications => 4,
            Self::OtherSensors => 5,
            Self::ClipboardRead => 6,
        }
    }
}

/// Decision handed back to the engine. `Default` lets it prompt the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    #[default]
    Default,
    Allow,
    Deny,
}

impl PermissionState {
    pub fn code(self) -> i32 {
        match self {
            Self::Default => 0,
            Self::Allow => 1,
            Self::Deny => 2,
        }
    }
}

/// Per-kind decisions with an optional catch-all.
#[derive(Default)]
pub struct PermissionPolicy {
    table: RwLock<HashMap<PermissionKind, PermissionState>>,
    global: RwLock<Option<PermissionState>>,
}

impl PermissionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clipboard reads are allowed; everything else is left to the engine.
    pub fn with_defaults() -> Self {
        let policy = Self::new();
        policy.set(PermissionKind::ClipboardRead, PermissionState::Allow);
        policy
    }

    pub fn set(&self, kind: PermissionKind, state: PermissionState) {
        self.table.write().insert(kind, state);
    }

    /// Decision for kinds without a table entry. `None` removes it.
    pub fn set_global(&self, state: Option<PermissionState>) {
        *self.global.write() = state;
    }

    /// Table entry first, then the global override, then `Default`.
    pub fn decide(&self, kind: PermissionKind) -> PermissionState {
        let state = self
            .table
            .read()
            .get(&kind)
            .copied()
            .or(*self.global.read())
            .unwrap_or_default();
        debug!("Permission {:?} -> {:?}", kind, state);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clipboard_allowed_by_default() {
        let policy = PermissionPolicy::with_defaults();
        assert_eq!(policy.decide(PermissionKind::ClipboardRead), PermissionState::Allow);
        assert_eq!(policy.decide(PermissionKind::Camera), PermissionState::Default);
    }

    #[test]
    fn test_table_beats_global() {
        let policy = PermissionPolicy::with_defaults();
        policy.set(PermissionKind::Camera, PermissionState::Allow);
        policy.set_global(Some(PermissionState::Deny));

        assert_eq!(policy.decide(PermissionKind::Camera), PermissionState::Allow);
        assert_eq!(policy.decide(PermissionKind::ClipboardRead), PermissionState::Allow);
        assert_eq!(policy.decide(PermissionKind::Microphone), PermissionState::Deny);

        policy.set_global(None);
        assert_eq!(policy.decide(PermissionKind::Camera), PermissionState::Allow);
        assert_eq!(policy.decide(PermissionKind::Microphone), PermissionState::Default);
    }

    #[test]
    fn test_kind_codes() {
        for code in 0..7 {
            assert_eq!(PermissionKind::from_code(code).code(), code);
        }
        assert_eq!(PermissionKind::from_code(42), PermissionKind::Unknown);
    }
}
