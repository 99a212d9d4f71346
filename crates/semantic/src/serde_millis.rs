//! `Duration` fields travel as integer milliseconds in config files.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Serialize Duration as milliseconds.
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Deserialize Duration from milliseconds.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super")]
        timeout: Duration,
    }

    #[test]
    fn reads_plain_integers() {
        let w: Wrapper = serde_json::from_str(r#"{"timeout":250}"#).unwrap();
        assert_eq!(w.timeout, Duration::from_millis(250));
        assert_eq!(serde_json::to_string(&w).unwrap(), r#"{"timeout":250}"#);
    }
}
