//! Deadline cutoffs and selection of the last commit authored before one.
//!
//! A deadline is a calendar date in a civil timezone. Work is due at 23:59:00 on that date, local
//! time, plus an optional grace period. The cutoff is resolved to an absolute instant using the
//! UTC offset that the timezone's rules assign to that particular date, so deadlines on either
//! side of a daylight-saving transition come out right.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

/// The timezone deadlines are interpreted in unless another one is given.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Chicago;

/// The hour, minute, and second of the deadline date at which work becomes late.
pub const CUTOFF_HMS: (u32, u32, u32) = (23, 59, 0);

// -------------------------------------------------------------------------------------------------
// DeadlineError
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadlineError {
    /// The date could not be parsed, or does not name a real calendar day
    InvalidDate(String),

    /// The grace period could not be parsed
    InvalidGrace { input: String, reason: String },

    /// The timezone is not a known IANA identifier
    InvalidTimezone(String),
}

impl std::fmt::Display for DeadlineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeadlineError::InvalidDate(s) => {
                write!(f, "invalid date {s:?}: expected YYYY-MM-DD or MM/DD/YYYY")
            }
            DeadlineError::InvalidGrace { input, reason } => {
                write!(f, "invalid grace period {input:?}: {reason}")
            }
            DeadlineError::InvalidTimezone(s) => write!(f, "unknown timezone {s:?}"),
        }
    }
}

impl std::error::Error for DeadlineError {}

pub type Result<T> = std::result::Result<T, DeadlineError>;

// -------------------------------------------------------------------------------------------------
// Deadline
// -------------------------------------------------------------------------------------------------
/// A due date, together with the grace period and timezone used to turn it into a cutoff instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    date: NaiveDate,
    grace: Duration,
    timezone: Tz,
}

impl Deadline {
    /// A deadline on the given date with no grace period, in [`DEFAULT_TIMEZONE`].
    pub fn new(date: NaiveDate) -> Self {
        Deadline {
            date,
            grace: Duration::ZERO,
            timezone: DEFAULT_TIMEZONE,
        }
    }

    /// Parse a deadline date in either `YYYY-MM-DD` or `MM/DD/YYYY` form.
    pub fn parse(date: &str) -> Result<Self> {
        parse_date(date).map(Self::new)
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The nominal due time on the deadline date, without grace, as a wall-clock time.
    pub fn civil_due_time(&self) -> NaiveDateTime {
        due_time_on(self.date)
    }

    /// The absolute instant after which commits are late.
    pub fn cutoff(&self) -> DateTime<Utc> {
        compute_cutoff(self.date, self.grace, self.timezone)
    }

    /// The cutoff rendered in this deadline's timezone, e.g.
    /// `Wed, Sep 10, 2025 11:59 PM CDT (UTC-05:00)`.
    pub fn display_cutoff(&self) -> String {
        format_instant(self.cutoff(), self.timezone)
    }
}

impl std::fmt::Display for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_cutoff())
    }
}

/// Compute the cutoff instant for a deadline on `date`: 23:59:00 local time in `timezone`, plus
/// `grace`.
///
/// The local time is resolved with the offset in effect on `date` itself. When the local time is
/// ambiguous (it occurs twice because clocks were set back), the earlier instant is used. When it
/// does not exist (clocks sprang forward over it), it is interpreted with the offset in effect
/// before the transition.
///
/// The grace period is added to the resolved instant, so the result never decreases as `grace`
/// grows.
pub fn compute_cutoff(date: NaiveDate, grace: Duration, timezone: Tz) -> DateTime<Utc> {
    let base = resolve_local(&timezone, due_time_on(date));
    let grace = TimeDelta::from_std(grace).unwrap_or(TimeDelta::MAX);
    base.checked_add_signed(grace)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn due_time_on(date: NaiveDate) -> NaiveDateTime {
    let (h, m, s) = CUTOFF_HMS;
    date.and_hms_opt(h, m, s)
        .expect("cutoff time of day should be valid")
}

/// Resolve a wall-clock time in `timezone` to an absolute instant.
fn resolve_local(timezone: &Tz, civil: NaiveDateTime) -> DateTime<Utc> {
    match timezone.from_local_datetime(&civil) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _latest) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Inside a gap. A day earlier is safely before the transition.
            let before = timezone
                .offset_from_utc_datetime(&(civil - TimeDelta::days(1)))
                .fix();
            let utc = civil - TimeDelta::seconds(i64::from(before.local_minus_utc()));
            Utc.from_utc_datetime(&utc)
        }
    }
}

/// Render an instant in the given timezone, with its abbreviation and UTC offset.
pub fn format_instant(instant: DateTime<Utc>, timezone: Tz) -> String {
    let local = instant.with_timezone(&timezone);
    let offset = local.offset().fix().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let offset = offset.unsigned_abs();
    format!(
        "{} (UTC{sign}{:02}:{:02})",
        local.format("%a, %b %d, %Y %I:%M %p %Z"),
        offset / 3600,
        (offset % 3600) / 60
    )
}

// -------------------------------------------------------------------------------------------------
// input parsing
// -------------------------------------------------------------------------------------------------
lazy_static! {
    static ref YMD_PATTERN: Regex =
        Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("date regex should compile");
    static ref MDY_PATTERN: Regex =
        Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("date regex should compile");
}

/// Parse a calendar date given as `YYYY-MM-DD` or `MM/DD/YYYY`.
///
/// Month and day may be written with one or two digits. Surrounding whitespace is ignored.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let s = input.trim();
    let invalid = || DeadlineError::InvalidDate(input.to_string());

    let (y, m, d) = if let Some(c) = YMD_PATTERN.captures(s) {
        (c[1].parse::<i32>(), c[2].parse::<u32>(), c[3].parse::<u32>())
    } else if let Some(c) = MDY_PATTERN.captures(s) {
        (c[3].parse(), c[1].parse(), c[2].parse())
    } else {
        return Err(invalid());
    };

    match (y, m, d) {
        (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Parse a grace period.
///
/// A bare integer is a number of seconds. Otherwise the input is a sequence of `<n><unit>`
/// segments, where the unit is one of `d`, `h`, `m`, or `s`, e.g. `5m` or `1h30m`.
pub fn parse_grace(input: &str) -> Result<Duration> {
    let s = input.trim();
    let invalid = |reason: &str| DeadlineError::InvalidGrace {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if s.is_empty() {
        return Err(invalid("grace period cannot be empty"));
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        let secs: u64 = s.parse().map_err(|_| invalid("value is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in s.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'd' | 'h' | 'm' | 's' => {
                if digits.is_empty() {
                    return Err(invalid(&format!("unit '{c}' has no preceding number")));
                }
                let n: u64 = digits.parse().map_err(|_| invalid("value is too large"))?;
                let scale = match c {
                    'd' => 86_400,
                    'h' => 3_600,
                    'm' => 60,
                    _ => 1,
                };
                total = n
                    .checked_mul(scale)
                    .and_then(|v| total.checked_add(v))
                    .ok_or_else(|| invalid("value is too large"))?;
                digits.clear();
            }
            '-' => return Err(invalid("grace period cannot be negative")),
            c if c.is_whitespace() => {}
            c => return Err(invalid(&format!("invalid character '{c}'"))),
        }
    }

    if !digits.is_empty() {
        return Err(invalid("ends with a number without a unit"));
    }

    Ok(Duration::from_secs(total))
}

/// Parse an IANA timezone identifier such as `America/Chicago`.
pub fn parse_timezone(input: &str) -> Result<Tz> {
    input
        .trim()
        .parse::<Tz>()
        .map_err(|_| DeadlineError::InvalidTimezone(input.to_string()))
}

// -------------------------------------------------------------------------------------------------
// commit resolution
// -------------------------------------------------------------------------------------------------
/// A commit and the instant it was authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

impl CommitRecord {
    pub fn new<S: Into<String>>(id: S, timestamp: DateTime<Utc>) -> Self {
        CommitRecord {
            id: id.into(),
            timestamp,
        }
    }
}

/// The outcome of searching a history for the last commit before a cutoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),

    /// No commit in the history was authored before the cutoff
    NotFound,
}

impl Resolution {
    pub fn commit_id(&self) -> Option<&str> {
        match self {
            Resolution::Found(id) => Some(id),
            Resolution::NotFound => None,
        }
    }
}

/// Find the first commit, in the given newest-first order, authored strictly before `cutoff`.
///
/// A commit authored exactly at the cutoff is late.
pub fn find_commit_before<'a, I>(commits: I, cutoff: DateTime<Utc>) -> Resolution
where
    I: IntoIterator<Item = &'a CommitRecord>,
{
    match commits.into_iter().find(|c| c.timestamp < cutoff) {
        Some(c) => Resolution::Found(c.id.clone()),
        None => Resolution::NotFound,
    }
}
