use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Local date and time strings as written into the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    /// `%Y-%m-%d`
    pub date: String,
    /// `%I:%M:%S %p`
    pub time: String,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;

    fn stamp(&self) -> Stamp {
        let now = self.now();
        Stamp {
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%I:%M:%S %p").to_string(),
        }
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow!("unknown timezone '{}': {}", name, e))
}

pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

#[cfg(test)]
pub struct FixedClock {
    at: std::sync::Mutex<DateTime<Tz>>,
}

#[cfg(test)]
impl FixedClock {
    /// `rfc3339` is interpreted as an instant and shown in `tz`.
    pub fn at(rfc3339: &str, tz: Tz) -> Self {
        let instant = DateTime::parse_from_rfc3339(rfc3339)
            .expect("valid rfc3339 timestamp")
            .with_timezone(&tz);
        Self {
            at: std::sync::Mutex::new(instant),
        }
    }

    pub fn set(&self, rfc3339: &str) {
        let mut at = self.at.lock().unwrap_or_else(|e| e.into_inner());
        let tz = at.timezone();
        *at = DateTime::parse_from_rfc3339(rfc3339)
            .expect("valid rfc3339 timestamp")
            .with_timezone(&tz);
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        *self.at.lock().unwrap_or_else(|e| e.into_inner())
    }
}
