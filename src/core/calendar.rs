//! Active-day resolution: which calendar date is currently open for booking.
//!
//! A single daily cutoff decides the rollover. Before the cutoff the active
//! day is today (in the operating timezone); at or after it, tomorrow. The
//! same cutoff is the expiry instant of every reservation made for that day.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::core::BookingResult;
use crate::util::clock::Clock;

/// Cutoff applied when configuration is absent or malformed.
pub const DEFAULT_CUTOFF: CutoffTime = CutoffTime { hour: 21, minute: 0 };

/// Daily time-of-day boundary, `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CutoffTime {
    hour: u32,
    minute: u32,
}

impl CutoffTime {
    /// Build a cutoff from components, rejecting out-of-range values.
    pub const fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self { hour, minute })
    }

    /// Parse a strict `HH:MM` value (`^\d{2}:\d{2}$`, in range).
    pub fn parse(raw: &str) -> Option<Self> {
        let bytes = raw.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return None;
        }
        let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
        if !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let value = |hi: u8, lo: u8| u32::from(hi - b'0') * 10 + u32::from(lo - b'0');
        Self::new(value(digits[0], digits[1]), value(digits[2], digits[3]))
    }

    /// Hour component.
    pub const fn hour(self) -> u32 {
        self.hour
    }

    /// Minute component.
    pub const fn minute(self) -> u32 {
        self.minute
    }

    /// The cutoff as a time of day.
    pub fn as_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl Default for CutoffTime {
    fn default() -> Self {
        DEFAULT_CUTOFF
    }
}

impl fmt::Display for CutoffTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for CutoffTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("`{value}` is not a valid HH:MM cutoff"))
    }
}

impl From<CutoffTime> for String {
    fn from(value: CutoffTime) -> Self {
        value.to_string()
    }
}

/// Canonical weekday names, locale-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekdayName {
    /// Sunday.
    Domingo,
    /// Monday.
    Lunes,
    /// Tuesday.
    Martes,
    /// Wednesday.
    Miercoles,
    /// Thursday.
    Jueves,
    /// Friday.
    Viernes,
    /// Saturday.
    Sabado,
}

/// Weekday table indexed by days since Sunday.
pub const WEEKDAY_TABLE: [WeekdayName; 7] = [
    WeekdayName::Domingo,
    WeekdayName::Lunes,
    WeekdayName::Martes,
    WeekdayName::Miercoles,
    WeekdayName::Jueves,
    WeekdayName::Viernes,
    WeekdayName::Sabado,
];

impl WeekdayName {
    /// Weekday of a calendar date.
    pub fn of(date: NaiveDate) -> Self {
        use chrono::Datelike;
        WEEKDAY_TABLE[date.weekday().num_days_from_sunday() as usize]
    }

    /// Canonical lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Domingo => "domingo",
            Self::Lunes => "lunes",
            Self::Martes => "martes",
            Self::Miercoles => "miercoles",
            Self::Jueves => "jueves",
            Self::Viernes => "viernes",
            Self::Sabado => "sabado",
        }
    }
}

impl fmt::Display for WeekdayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeekdayName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        WEEKDAY_TABLE
            .iter()
            .copied()
            .find(|day| day.as_str() == lowered)
            .ok_or_else(|| format!("unknown weekday `{s}`"))
    }
}

/// The calendar date currently open for booking. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveDay {
    /// Calendar date in the operating timezone.
    pub date: NaiveDate,
    /// Midnight of `date` in the operating timezone; reservations are keyed by it.
    pub midnight: DateTime<Utc>,
    /// Weekday name used to select catalog slots.
    pub weekday: WeekdayName,
    /// Cutoff in force when this value was resolved.
    pub cutoff: CutoffTime,
    /// Cutoff moment of `date`; reservations for this day expire here.
    pub closes_at: DateTime<Utc>,
}

impl ActiveDay {
    /// `YYYY-MM-DD` key used for broadcast rooms and payloads.
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Convert a local wall-clock time to UTC, resolving DST gaps forward.
fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map_or_else(|| Utc.from_utc_datetime(&naive), |t| t.with_timezone(&Utc))
}

/// Midnight of `date` in `tz`.
pub fn midnight_of(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    localize(tz, date.and_time(NaiveTime::MIN))
}

/// The cutoff moment of `date` in `tz`.
pub fn cutoff_moment(date: NaiveDate, tz: Tz, cutoff: CutoffTime) -> DateTime<Utc> {
    localize(tz, date.and_time(cutoff.as_naive_time()))
}

/// Pure active-day rule: at or after the cutoff the active day is tomorrow.
pub fn active_day_at(now: DateTime<Utc>, tz: Tz, cutoff: CutoffTime) -> ActiveDay {
    let local = now.with_timezone(&tz);
    let today = local.date_naive();
    let minutes_now = local.hour() * 60 + local.minute();
    let minutes_cutoff = cutoff.hour() * 60 + cutoff.minute();
    let date = if minutes_now >= minutes_cutoff {
        today.succ_opt().unwrap_or(today)
    } else {
        today
    };

    ActiveDay {
        date,
        midnight: midnight_of(date, tz),
        weekday: WeekdayName::of(date),
        cutoff,
        closes_at: cutoff_moment(date, tz, cutoff),
    }
}

/// Read access to the configured daily cutoff (visual configuration).
#[async_trait]
pub trait CutoffSource: Send + Sync {
    /// Raw stored value, unvalidated. `None` when nothing is configured.
    async fn raw_cutoff(&self) -> BookingResult<Option<String>>;
}

/// Computes the authoritative active day from a clock, timezone and cutoff source.
#[derive(Clone)]
pub struct ActiveDayResolver {
    clock: Arc<dyn Clock>,
    timezone: Tz,
    source: Arc<dyn CutoffSource>,
    fallback: CutoffTime,
}

impl ActiveDayResolver {
    /// Create a resolver.
    pub fn new(
        clock: Arc<dyn Clock>,
        timezone: Tz,
        source: Arc<dyn CutoffSource>,
        fallback: CutoffTime,
    ) -> Self {
        Self {
            clock,
            timezone,
            source,
            fallback,
        }
    }

    /// Operating timezone.
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Current instant from the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Effective cutoff. Never fails; falls back on missing, malformed or unreadable config.
    pub async fn cutoff(&self) -> CutoffTime {
        match self.source.raw_cutoff().await {
            Ok(Some(raw)) => CutoffTime::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(raw = %raw, fallback = %self.fallback, "malformed cutoff, using fallback");
                self.fallback
            }),
            Ok(None) => self.fallback,
            Err(e) => {
                tracing::warn!(error = %e, fallback = %self.fallback, "cutoff source unavailable");
                self.fallback
            }
        }
    }

    /// Resolve the active day for the current instant.
    pub async fn resolve(&self) -> ActiveDay {
        let cutoff = self.cutoff().await;
        active_day_at(self.clock.now(), self.timezone, cutoff)
    }
}
