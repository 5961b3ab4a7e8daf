//! Notification presentation.
//!
//! Push payloads carry at most a body text; everything else comes from
//! the fixed visual template in the worker configuration.

use crate::config::NotificationStyle;
use crate::models::Notification;

/// Build the descriptor for a push event. The payload text becomes the
/// body; an absent or empty payload falls back to the default body.
pub(super) fn present(style: &NotificationStyle, payload: Option<&[u8]>) -> Notification {
    let body = payload
        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| style.default_body.clone());

    Notification {
        title: style.title.clone(),
        body,
        icon: style.icon.clone(),
        badge: style.badge.clone(),
        vibrate: style.vibrate.clone(),
        tag: style.tag.clone(),
        require_interaction: true,
    }
}
