//! Centralized color theme for the chat screen.
//!
//! Modify values here to change the application's color scheme.

use bevy_egui::egui::Color32;

// ============================================================================
// Status Bar
// ============================================================================

/// Status bar background while the network is reachable
pub const STATUS_ONLINE: Color32 = Color32::from_rgb(46, 125, 50);

/// Status bar background while the network is unreachable
pub const STATUS_OFFLINE: Color32 = Color32::from_rgb(211, 47, 47);

/// Status bar text (both states)
pub const STATUS_TEXT: Color32 = Color32::WHITE;

// ============================================================================
// Messages
// ============================================================================

/// Background behind the message list
pub const CONVERSATION_BACKGROUND: Color32 = Color32::from_rgb(250, 248, 245);

/// Message bubble fill
pub const BUBBLE_FILL: Color32 = Color32::from_rgb(241, 241, 241);

/// Message bubble text
pub const BUBBLE_TEXT: Color32 = Color32::from_rgb(20, 20, 20);

/// Border around map images
pub const MAP_BORDER: Color32 = Color32::from_rgb(200, 200, 200);

// ============================================================================
// Toolbar
// ============================================================================

/// Toolbar button fill
pub const TOOLBAR_BUTTON: Color32 = Color32::LIGHT_GRAY;

/// Toolbar button label
pub const TOOLBAR_TEXT: Color32 = Color32::BLACK;

/// Pick the status bar color for a connectivity state
pub fn status_color(is_connected: bool) -> Color32 {
    if is_connected {
        STATUS_ONLINE
    } else {
        STATUS_OFFLINE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_color() {
        assert_eq!(status_color(true), STATUS_ONLINE);
        assert_eq!(status_color(false), STATUS_OFFLINE);
        assert_ne!(STATUS_ONLINE, STATUS_OFFLINE);
    }
}
