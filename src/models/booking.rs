use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Request;

/// A booking form submission as the page posts it.
///
/// The worker never validates or interprets these fields; it only queues
/// the serialized submission for replay when the network is down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSubmission {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(rename = "courseType")]
    pub course_type: String,
    #[serde(rename = "preferredInstructor")]
    pub preferred_instructor: String,
    #[serde(rename = "preferredTimes")]
    pub preferred_times: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "termsAccepted")]
    pub terms_accepted: bool,
}

impl BookingSubmission {
    /// Build the POST request the page would send to the booking endpoint,
    /// in the shape the sync queue stores and replays.
    pub fn to_request(&self, endpoint: &str) -> Result<Request, serde_json::Error> {
        let body = serde_json::to_vec(self)?;
        Ok(Request::post(endpoint, body).with_header("content-type", "application/json"))
    }
}

/// The booking backend's reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingReceipt {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<BookingConfirmation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmation {
    #[serde(rename = "bookingId")]
    pub booking_id: String,
    #[serde(rename = "submissionTime")]
    pub submission_time: DateTime<Utc>,
}
