use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock instant carried on the wire as epoch milliseconds.
///
/// Browser clients send `Date.now()` style values; everything server-side
/// works with [`DateTime<Utc>`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(#[serde(with = "chrono::serde::ts_milliseconds")] pub DateTime<Utc>);

impl Timestamp {
    /// The current instant.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_as_epoch_millis() {
        let dt = Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap();
        let serialized = serde_json::to_string(&Timestamp(dt)).unwrap();
        assert_eq!(serialized, dt.timestamp_millis().to_string());
    }

    #[test]
    fn deserializes_from_epoch_millis() {
        let dt = Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap();
        let json = dt.timestamp_millis().to_string();
        let deserialized: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.0, dt);
    }

    #[test]
    fn ordering_follows_the_clock() {
        let earlier = Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap());
        let later = Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 1).unwrap());
        assert!(earlier < later);
    }
}
