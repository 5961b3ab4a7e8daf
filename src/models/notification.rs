use serde::{Deserialize, Serialize};

/// A push notification descriptor, constructed per push event and handed
/// to the platform for display. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub tag: String,
    #[serde(rename = "requireInteraction")]
    pub require_interaction: bool,
}
