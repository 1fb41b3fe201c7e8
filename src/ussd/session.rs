use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// # Gateway Session Record
///
/// One USSD dialog as persisted between callbacks. The gateway assigns
/// `session_id` and presents it on every keystroke until the dialog ends; the
/// engine rebuilds its position from `level` each time.
///
/// Records are created at level 0 and never deleted. A terminal (`END`) response
/// simply stops further advancement since the gateway does not reuse the id.
///
/// `version` is bumped by the store on every successful write and must match on
/// the next write, which turns concurrent callbacks for one session into a
/// detectable conflict instead of a lost update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    /// E.164 phone number
    pub phone_number: String,
    /// Persisted encoding of [`super::state::DialogState`]
    pub level: i32,
    /// Last entered, not yet confirmed PIN digits
    #[serde(default)]
    pub pin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    /// Wrong PINs entered at the login prompt during this session
    #[serde(default)]
    pub failed_pin_attempts: u32,
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(session_id: &str, phone_number: &str) -> Self {
        let now = Utc::now();
        SessionRecord {
            session_id: session_id.to_string(),
            phone_number: phone_number.to_string(),
            level: 0,
            pin: String::new(),
            first_name: None,
            last_name: None,
            date_of_birth: None,
            failed_pin_attempts: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Drop the transient PIN once it has been confirmed or abandoned.
    pub fn clear_pending_pin(&mut self) {
        self.pin.clear();
    }

    /// Stored copy of `self` after a committed write.
    pub(crate) fn committed(mut self) -> Self {
        self.version += 1;
        self.updated_at = Utc::now();
        self
    }
}
