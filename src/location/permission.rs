//! Location consent gates.
//!
//! Desktop platforms have no OS-level location consent, so the gate is chosen
//! from configuration: always granted, always denied, or an in-app prompt.

use bevy::log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};

/// Capability requested from the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationCapability {
    Coarse,
    Fine,
}

impl LocationCapability {
    pub fn display_name(&self) -> &'static str {
        match self {
            LocationCapability::Coarse => "approximate location",
            LocationCapability::Fine => "precise location",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Configured consent behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionMode {
    /// Ask the user on every location request
    #[default]
    Prompt,
    /// No consent gating (implicitly granted)
    Granted,
    /// Always refuse
    Denied,
}

impl PermissionMode {
    pub fn all() -> &'static [PermissionMode] {
        &[
            PermissionMode::Prompt,
            PermissionMode::Granted,
            PermissionMode::Denied,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PermissionMode::Prompt => "Ask every time",
            PermissionMode::Granted => "Always allow",
            PermissionMode::Denied => "Never allow",
        }
    }
}

/// Consent boundary for reading the device position.
pub trait PermissionGate: Send + Sync {
    /// Request a capability. May block until the user answers.
    fn request(&self, capability: LocationCapability) -> PermissionStatus;
}

/// Gate for platforms without explicit consent.
pub struct ImplicitPermission;

impl PermissionGate for ImplicitPermission {
    fn request(&self, _capability: LocationCapability) -> PermissionStatus {
        PermissionStatus::Granted
    }
}

/// Gate with a decision fixed ahead of time.
pub struct FixedPermission(pub PermissionStatus);

impl PermissionGate for FixedPermission {
    fn request(&self, _capability: LocationCapability) -> PermissionStatus {
        self.0
    }
}

/// A pending consent question, answered by the UI.
pub struct PermissionPrompt {
    pub capability: LocationCapability,
    reply: Sender<PermissionStatus>,
}

impl PermissionPrompt {
    pub fn answer(self, status: PermissionStatus) {
        debug!("Location permission answered: {:?}", status);
        // The requester only goes away if its thread died
        let _ = self.reply.send(status);
    }
}

/// Gate that asks the user through the UI and waits for the answer.
///
/// A prompt that is dropped without an answer counts as denied.
#[derive(Clone)]
pub struct PromptPermission {
    prompts: Sender<PermissionPrompt>,
}

impl PromptPermission {
    /// Create a gate and the receiving end the UI drains prompts from
    pub fn channel() -> (Self, Receiver<PermissionPrompt>) {
        let (prompts, receiver) = mpsc::channel();
        (Self { prompts }, receiver)
    }
}

impl PermissionGate for PromptPermission {
    fn request(&self, capability: LocationCapability) -> PermissionStatus {
        let (reply, answer) = mpsc::channel();

        if self
            .prompts
            .send(PermissionPrompt { capability, reply })
            .is_err()
        {
            warn!("Permission prompt could not be shown, treating as denied");
            return PermissionStatus::Denied;
        }

        answer.recv().unwrap_or(PermissionStatus::Denied)
    }
}
