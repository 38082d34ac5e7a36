use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Process-wide source of "now". While the override is enabled every calendar
/// and reset computation sees the operator-supplied instant instead of the
/// wall clock, which makes schedule behavior previewable without waiting for
/// real time to pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clock {
    pub use_override: bool,
    #[serde(rename = "overrideInstant")]
    pub override_time: DateTime<Utc>,
}

impl Clock {
    pub fn system() -> Self {
        Clock {
            use_override: false,
            override_time: Utc::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        if self.use_override {
            self.override_time
        } else {
            Utc::now()
        }
    }

    pub fn set_override(&mut self, instant: DateTime<Utc>) {
        self.use_override = true;
        self.override_time = instant;
    }

    pub fn clear_override(&mut self) {
        self.use_override = false;
    }
}
