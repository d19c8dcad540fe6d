use anyhow::{bail, Context, Result};
use std::fmt;
use std::str::FromStr;
use time::format_description::OwnedFormatItem;
use time::macros::datetime;
use time::{Date, Duration, Month, PrimitiveDateTime, Time};

/// Calendar/clock truncation unit used to bucket timestamps while searching
/// for an acceptable slot size. Ordered coarse to fine in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum Granularity {
    Year,
    Month,
    Week,
    Day,
    Hours(u8),
}

impl Granularity {
    /// Floor `ts` to the start of its bucket. Mirrors the truncation the
    /// source database applies server-side in the grouped aggregation.
    pub fn truncate(self, ts: PrimitiveDateTime) -> PrimitiveDateTime {
        let midnight = |d: Date| PrimitiveDateTime::new(d, Time::MIDNIGHT);
        match self {
            Granularity::Year => {
                midnight(Date::from_calendar_date(ts.year(), Month::January, 1).unwrap())
            }
            Granularity::Month => {
                midnight(Date::from_calendar_date(ts.year(), ts.month(), 1).unwrap())
            }
            Granularity::Week => {
                // weeks start on Monday
                let back = Duration::days(ts.date().weekday().number_days_from_monday() as i64);
                midnight(ts.date() - back)
            }
            Granularity::Day => midnight(ts.date()),
            Granularity::Hours(n) => {
                assert!((1..24).contains(&n) && 24 % n == 0, "hour count must divide a day");
                let h = ts.hour() - ts.hour() % n;
                PrimitiveDateTime::new(ts.date(), Time::from_hms(h, 0, 0).unwrap())
            }
        }
    }
}

/// Renders the `INTERVAL` argument understood by the source database.
impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Year => write!(f, "1 year"),
            Granularity::Month => write!(f, "1 month"),
            Granularity::Week => write!(f, "1 week"),
            Granularity::Day => write!(f, "1 day"),
            Granularity::Hours(n) => write!(f, "{n} hour"),
        }
    }
}

impl FromStr for Granularity {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (count, unit) = match (parts.next(), parts.next(), parts.next()) {
            (Some(c), Some(u), None) => (c, u),
            _ => return Err(format!("expected \"<count> <unit>\", got {s:?}")),
        };
        let count: u8 = count
            .parse()
            .map_err(|_| format!("invalid interval count in {s:?}"))?;
        match unit {
            "year" if count == 1 => Ok(Granularity::Year),
            "month" if count == 1 => Ok(Granularity::Month),
            "week" if count == 1 => Ok(Granularity::Week),
            "day" if count == 1 => Ok(Granularity::Day),
            "hour" if (1..24).contains(&count) && 24 % count == 0 => Ok(Granularity::Hours(count)),
            "year" | "month" | "week" | "day" => {
                Err(format!("only single-{unit} intervals are supported"))
            }
            "hour" => Err(format!("hour interval in {s:?} must divide a day into whole slots")),
            _ => Err(format!("unknown interval unit {unit:?}")),
        }
    }
}

impl TryFrom<String> for Granularity {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Timestamp text layout shared by configuration, statement text and logs.
/// The format string uses the `time` crate's format-description syntax.
#[derive(Clone, Debug)]
pub struct TimeLayout {
    spec: String,
    format: OwnedFormatItem,
}

impl TimeLayout {
    pub fn new(spec: &str) -> Result<Self> {
        let format = time::format_description::parse_owned::<2>(spec)
            .with_context(|| format!("invalid timestamp layout {spec:?}"))?;
        // Probe once so render() can rely on the layout holding only
        // components a date-time carries (no zone offsets etc.).
        datetime!(2000-01-01 00:00:00)
            .format(&format)
            .with_context(|| format!("timestamp layout {spec:?} needs components beyond date-time"))?;
        Ok(Self {
            spec: spec.to_string(),
            format,
        })
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn parse(&self, text: &str) -> Result<PrimitiveDateTime> {
        PrimitiveDateTime::parse(text, &self.format)
            .with_context(|| format!("parse timestamp {text:?} with layout {:?}", self.spec))
    }

    pub fn render(&self, ts: PrimitiveDateTime) -> String {
        ts.format(&self.format).unwrap()
    }
}

/// Half-open interval `[begin, end)` over the export horizon. Parsed once at
/// startup; the parsed `end` is reused for the final slot of every table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeRange {
    pub begin: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
}

impl TimeRange {
    pub fn new(begin: PrimitiveDateTime, end: PrimitiveDateTime) -> Result<Self> {
        if end <= begin {
            bail!("time range is empty: end {end} is not after begin {begin}");
        }
        Ok(Self { begin, end })
    }

    pub fn parse(begin_text: &str, end_text: &str, layout: &TimeLayout) -> Result<Self> {
        TimeRange::new(layout.parse(begin_text)?, layout.parse(end_text)?)
    }

    pub fn contains(&self, ts: PrimitiveDateTime) -> bool {
        self.begin <= ts && ts < self.end
    }
}
