//! Recurrence rules and occurrence computation.
//!
//! A [`RecurrenceSetting`] pairs a start date with a [`RecurrenceRule`] and answers
//! "when is the next occurrence after this date". Rules serialise to the body of an
//! RFC 5545 `RRULE` (`FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;UNTIL=20261231`), which is
//! how recurrent transactions are persisted.
//!
//! Only the subset of RFC 5545 the application can produce is supported:
//! `FREQ`, `INTERVAL`, `BYDAY`, `UNTIL`, `COUNT` and `WKST=MO`. Occurrences are whole
//! days; time components are truncated.

use crate::errors::{Error, Result};
use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, Weekday};
use std::fmt::{self, Write as _};
use std::str::FromStr;
use tracing::warn;

/// Number of consecutive periods without a candidate date after which iteration
/// gives up. Guards rules like "every 12 months on the 5th Friday" that may never
/// produce another date.
const MAX_EMPTY_PERIODS: u32 = 1_000;

/// How often a rule repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    /// Every `interval` days
    Daily,
    /// Every `interval` weeks
    Weekly,
    /// Every `interval` months
    Monthly,
    /// Every `interval` years
    Yearly,
}

impl Frequency {
    const fn rrule_name(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    const fn unit(self, plural: bool) -> &'static str {
        match (self, plural) {
            (Self::Daily, false) => "day",
            (Self::Daily, true) => "days",
            (Self::Weekly, false) => "week",
            (Self::Weekly, true) => "weeks",
            (Self::Monthly, false) => "month",
            (Self::Monthly, true) => "months",
            (Self::Yearly, false) => "year",
            (Self::Yearly, true) => "years",
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            "YEARLY" => Ok(Self::Yearly),
            other => Err(format!("unsupported frequency {other}")),
        }
    }
}

/// A set of weekdays stored as a bitmask, Monday in bit 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Builds a set from a list of weekdays.
    #[must_use]
    pub fn from_weekdays(days: &[Weekday]) -> Self {
        days.iter().fold(Self::EMPTY, |set, day| set.with(*day))
    }

    /// Builds a set from its raw bitmask. Bits above Sunday are ignored.
    #[must_use]
    pub const fn from_mask(mask: u8) -> Self {
        Self(mask & 0b0111_1111)
    }

    /// Raw bitmask, Monday in bit 0.
    #[must_use]
    pub const fn mask(self) -> u8 {
        self.0
    }

    /// Returns a copy of the set with `day` added.
    #[must_use]
    pub fn with(self, day: Weekday) -> Self {
        Self(self.0 | (1 << day.num_days_from_monday()))
    }

    /// Whether `day` is in the set.
    #[must_use]
    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    /// Whether the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Weekdays in the set, Monday first.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        WEEK.into_iter().filter(move |d| self.contains(*d))
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

const fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn parse_weekday_code(code: &str) -> Option<Weekday> {
    WEEK.into_iter().find(|d| weekday_code(*d) == code)
}

/// Which day of the month a monthly rule lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonthlyMode {
    /// Same day number as the start date; months without that day are skipped
    DayOfMonth,
    /// The `ordinal`-th `weekday` of the month; `-1` is the last one
    Weekday {
        /// 1..=5 counting from the start of the month, -1..=-5 from the end
        ordinal: i8,
        /// Weekday to land on
        weekday: Weekday,
    },
}

impl MonthlyMode {
    /// The "same weekday of the month" mode matching `date`: the 2nd Tuesday for
    /// the 10th of a month starting on Monday, or the last Friday when `date` is
    /// in the final week of its month.
    #[must_use]
    pub fn weekday_of_month_for(date: NaiveDate) -> Self {
        let weekday = date.weekday();
        let is_last = date
            .checked_add_days(Days::new(7))
            .is_none_or(|next| next.month() != date.month());
        let ordinal = if is_last {
            -1
        } else {
            i8::try_from((date.day() - 1) / 7 + 1).unwrap_or(1)
        };
        Self::Weekday { ordinal, weekday }
    }
}

/// When a rule stops producing occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndCondition {
    /// Never ends
    Forever,
    /// Last possible occurrence date, inclusive
    Until(NaiveDate),
    /// Total number of occurrences, counting the first
    Count(u32),
}

/// A repeating schedule, independent of its start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecurrenceRule {
    /// Base repetition unit
    pub frequency: Frequency,
    /// Number of units between repetitions, at least 1
    pub interval: u32,
    /// Selected weekdays for weekly rules; empty means the start's weekday
    pub weekdays: WeekdaySet,
    /// Day selection for monthly rules
    pub monthly_mode: MonthlyMode,
    /// End condition
    pub end: EndCondition,
}

impl RecurrenceRule {
    /// A rule repeating every single unit of `frequency`, forever.
    #[must_use]
    pub const fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            weekdays: WeekdaySet::EMPTY,
            monthly_mode: MonthlyMode::DayOfMonth,
            end: EndCondition::Forever,
        }
    }

    /// The default rule used when a stored rule cannot be read.
    #[must_use]
    pub const fn daily() -> Self {
        Self::new(Frequency::Daily)
    }

    /// Parses an RRULE body such as `FREQ=MONTHLY;BYDAY=-1FR;COUNT=6`.
    ///
    /// A leading `RRULE:` prefix is accepted.
    pub fn parse(input: &str) -> Result<Self> {
        let err = |reason: String| Error::RecurrenceParse {
            rule: input.to_string(),
            reason,
        };

        let body = input.trim();
        let body = body.strip_prefix("RRULE:").unwrap_or(body);

        let mut frequency = None;
        let mut interval = 1u32;
        let mut byday: Option<&str> = None;
        let mut until = None;
        let mut count = None;

        for part in body.split(';').filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| err(format!("malformed part '{part}'")))?;
            match key.to_ascii_uppercase().as_str() {
                "FREQ" => frequency = Some(value.parse::<Frequency>().map_err(err)?),
                "INTERVAL" => {
                    interval = value
                        .parse()
                        .ok()
                        .filter(|i| *i >= 1)
                        .ok_or_else(|| err(format!("invalid interval '{value}'")))?;
                }
                "BYDAY" => byday = Some(value),
                "UNTIL" => until = Some(parse_until(value).ok_or_else(|| {
                    err(format!("invalid UNTIL '{value}'"))
                })?),
                "COUNT" => {
                    count = Some(
                        value
                            .parse::<u32>()
                            .ok()
                            .filter(|c| *c >= 1)
                            .ok_or_else(|| err(format!("invalid COUNT '{value}'")))?,
                    );
                }
                "WKST" if value == "MO" => {}
                other => return Err(err(format!("unsupported part '{other}'"))),
            }
        }

        let frequency = frequency.ok_or_else(|| err("missing FREQ".to_string()))?;
        let end = match (until, count) {
            (Some(_), Some(_)) => {
                return Err(err("UNTIL and COUNT are mutually exclusive".to_string()));
            }
            (Some(date), None) => EndCondition::Until(date),
            (None, Some(n)) => EndCondition::Count(n),
            (None, None) => EndCondition::Forever,
        };

        let mut rule = Self {
            interval,
            end,
            ..Self::new(frequency)
        };

        if let Some(days) = byday {
            match frequency {
                Frequency::Weekly => {
                    for code in days.split(',') {
                        let day = parse_weekday_code(code)
                            .ok_or_else(|| err(format!("invalid weekday '{code}'")))?;
                        rule.weekdays = rule.weekdays.with(day);
                    }
                }
                Frequency::Monthly => {
                    rule.monthly_mode = parse_ordinal_weekday(days)
                        .ok_or_else(|| err(format!("invalid monthly BYDAY '{days}'")))?;
                }
                Frequency::Daily | Frequency::Yearly => {
                    return Err(err("BYDAY is only supported for weekly and monthly rules".to_string()));
                }
            }
        }

        Ok(rule)
    }
}

fn parse_until(value: &str) -> Option<NaiveDate> {
    let date = value.get(..8)?;
    NaiveDate::parse_from_str(date, "%Y%m%d").ok()
}

fn parse_ordinal_weekday(value: &str) -> Option<MonthlyMode> {
    if value.len() < 3 {
        return None;
    }
    let (ordinal, code) = value.split_at(value.len() - 2);
    let ordinal: i8 = ordinal.parse().ok()?;
    if ordinal == 0 || !(-5..=5).contains(&ordinal) {
        return None;
    }
    Some(MonthlyMode::Weekday {
        ordinal,
        weekday: parse_weekday_code(code)?,
    })
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency.rrule_name())?;
        if self.interval > 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        match self.frequency {
            Frequency::Weekly if !self.weekdays.is_empty() => {
                let days: Vec<&str> = self.weekdays.iter().map(weekday_code).collect();
                write!(f, ";BYDAY={}", days.join(","))?;
            }
            Frequency::Monthly => {
                if let MonthlyMode::Weekday { ordinal, weekday } = self.monthly_mode {
                    write!(f, ";BYDAY={ordinal}{}", weekday_code(weekday))?;
                }
            }
            _ => {}
        }
        match self.end {
            EndCondition::Forever => Ok(()),
            EndCondition::Until(date) => write!(f, ";UNTIL={}", date.format("%Y%m%d")),
            EndCondition::Count(n) => write!(f, ";COUNT={n}"),
        }
    }
}

impl FromStr for RecurrenceRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A start date plus the rule that repeats from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceSetting {
    start_date: NaiveDate,
    rule: RecurrenceRule,
}

impl RecurrenceSetting {
    /// A setting repeating every single unit of `frequency` from `start_date`.
    #[must_use]
    pub const fn new(start_date: NaiveDate, frequency: Frequency) -> Self {
        Self {
            start_date,
            rule: RecurrenceRule::new(frequency),
        }
    }

    /// Builds a setting from a stored rule string.
    ///
    /// A malformed rule does not fail: it is logged and replaced by a daily rule,
    /// matching how stored rules have always been read. Use
    /// [`RecurrenceSetting::try_from_rule_string`] to surface the error instead.
    #[must_use]
    pub fn from_rule_string(start_date: NaiveDate, rule: &str) -> Self {
        Self::try_from_rule_string(start_date, rule).unwrap_or_else(|e| {
            warn!("Falling back to a daily recurrence: {e}");
            Self {
                start_date,
                rule: RecurrenceRule::daily(),
            }
        })
    }

    /// Builds a setting from a stored rule string, failing on malformed input.
    pub fn try_from_rule_string(start_date: NaiveDate, rule: &str) -> Result<Self> {
        Ok(Self {
            start_date,
            rule: RecurrenceRule::parse(rule)?,
        })
    }

    /// Starts building a setting with a custom interval, weekday set, monthly
    /// mode or end condition.
    #[must_use]
    pub const fn builder(start_date: NaiveDate, frequency: Frequency) -> RecurrenceSettingBuilder {
        RecurrenceSettingBuilder {
            start_date,
            rule: RecurrenceRule::new(frequency),
        }
    }

    /// The date the schedule starts from.
    #[must_use]
    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// The repeating rule.
    #[must_use]
    pub const fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    /// The rule in RRULE form, suitable for storage.
    #[must_use]
    pub fn rule_string(&self) -> String {
        self.rule.to_string()
    }

    /// Iterates every occurrence in ascending order, starting at the start date.
    #[must_use]
    pub fn occurrences(&self) -> Occurrences {
        Occurrences {
            setting: *self,
            period: 0,
            buffer: Vec::new(),
            yielded: 0,
            empty_periods: 0,
            done: false,
        }
    }

    /// The first occurrence, which is the start date unless the rule skips it.
    #[must_use]
    pub fn first_occurrence(&self) -> Option<NaiveDate> {
        self.occurrences().next()
    }

    /// The first occurrence strictly after `last`, or `None` when the rule is
    /// exhausted before reaching it.
    #[must_use]
    pub fn next_occurrence(&self, last: NaiveDate) -> Option<NaiveDate> {
        self.occurrences().find(|date| *date > last)
    }

    /// Same as [`RecurrenceSetting::next_occurrence`] after truncating `last` to
    /// its date.
    #[must_use]
    pub fn next_occurrence_after(&self, last: NaiveDateTime) -> Option<NaiveDate> {
        self.next_occurrence(last.date())
    }

    /// Human-readable description, e.g.
    /// "Every 2 weeks on Monday, Wednesday, until 2026-12-31".
    #[must_use]
    pub fn describe(&self) -> String {
        let rule = &self.rule;
        let mut text = if rule.interval == 1 {
            format!("Every {}", rule.frequency.unit(false))
        } else {
            format!("Every {} {}", rule.interval, rule.frequency.unit(true))
        };

        match rule.frequency {
            Frequency::Daily => {}
            Frequency::Weekly => {
                let days: Vec<&str> = if rule.weekdays.is_empty() {
                    vec![weekday_name(self.start_date.weekday())]
                } else {
                    rule.weekdays.iter().map(weekday_name).collect()
                };
                let _ = write!(text, " on {}", days.join(", "));
            }
            Frequency::Monthly => match rule.monthly_mode {
                MonthlyMode::DayOfMonth => {
                    let _ = write!(text, " on day {}", self.start_date.day());
                }
                MonthlyMode::Weekday { ordinal, weekday } => {
                    let _ = write!(
                        text,
                        " on the {} {}",
                        ordinal_name(ordinal),
                        weekday_name(weekday)
                    );
                }
            },
            Frequency::Yearly => {
                let _ = write!(text, " on {}", self.start_date.format("%B %-d"));
            }
        }

        match rule.end {
            EndCondition::Forever => {}
            EndCondition::Until(date) => {
                let _ = write!(text, ", until {}", date.format("%Y-%m-%d"));
            }
            EndCondition::Count(1) => text.push_str(", once"),
            EndCondition::Count(n) => {
                let _ = write!(text, ", {n} times");
            }
        }

        text
    }

    /// Candidate dates of the `period`-th repetition, sorted ascending.
    ///
    /// `None` means the calendar ran out (date overflow), which ends iteration.
    fn period_candidates(&self, period: u32) -> Option<Vec<NaiveDate>> {
        let start = self.start_date;
        let step = period.checked_mul(self.rule.interval)?;

        let candidates = match self.rule.frequency {
            Frequency::Daily => vec![start.checked_add_days(Days::new(u64::from(step)))?],
            Frequency::Weekly => {
                let monday = start.checked_sub_days(Days::new(u64::from(
                    start.weekday().num_days_from_monday(),
                )))?;
                let week = monday.checked_add_days(Days::new(u64::from(step) * 7))?;
                let days = if self.rule.weekdays.is_empty() {
                    WeekdaySet::EMPTY.with(start.weekday())
                } else {
                    self.rule.weekdays
                };
                days.iter()
                    .filter_map(|d| {
                        week.checked_add_days(Days::new(u64::from(d.num_days_from_monday())))
                    })
                    .collect()
            }
            Frequency::Monthly => {
                let first = start.with_day(1)?.checked_add_months(Months::new(step))?;
                match self.rule.monthly_mode {
                    MonthlyMode::DayOfMonth => first.with_day(start.day()).into_iter().collect(),
                    MonthlyMode::Weekday { ordinal, weekday } => {
                        nth_weekday_of_month(first, ordinal, weekday)
                            .into_iter()
                            .collect()
                    }
                }
            }
            Frequency::Yearly => {
                let year = start.year().checked_add(i32::try_from(step).ok()?)?;
                if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
                    return None;
                }
                NaiveDate::from_ymd_opt(year, start.month(), start.day())
                    .into_iter()
                    .collect()
            }
        };

        Some(candidates)
    }
}

fn ordinal_name(ordinal: i8) -> String {
    match ordinal {
        -1 => "last".to_string(),
        1 => "first".to_string(),
        2 => "second".to_string(),
        3 => "third".to_string(),
        4 => "fourth".to_string(),
        5 => "fifth".to_string(),
        n if n < 0 => format!("{} from last", ordinal_name(n.saturating_neg())),
        n => format!("{n}th"),
    }
}

/// The `ordinal`-th `weekday` in the month starting at `first`.
fn nth_weekday_of_month(first: NaiveDate, ordinal: i8, weekday: Weekday) -> Option<NaiveDate> {
    if ordinal == 0 {
        return None;
    }
    let month = first.month();
    if ordinal > 0 {
        let offset = (7 + weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
        let days = u64::from(offset) + (u64::from(ordinal.unsigned_abs()) - 1) * 7;
        first
            .checked_add_days(Days::new(days))
            .filter(|d| d.month() == month)
    } else {
        let last = first
            .checked_add_months(Months::new(1))?
            .checked_sub_days(Days::new(1))?;
        let offset = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
        let days = u64::from(offset) + (u64::from(ordinal.unsigned_abs()) - 1) * 7;
        last.checked_sub_days(Days::new(days))
            .filter(|d| d.month() == month)
    }
}

/// Iterator over the occurrences of a [`RecurrenceSetting`].
#[derive(Debug, Clone)]
pub struct Occurrences {
    setting: RecurrenceSetting,
    period: u32,
    /// Pending candidates of the current period, in reverse order
    buffer: Vec<NaiveDate>,
    yielded: u32,
    empty_periods: u32,
    done: bool,
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.done {
            return None;
        }
        if matches!(self.setting.rule.end, EndCondition::Count(n) if self.yielded >= n) {
            self.done = true;
            return None;
        }

        loop {
            if let Some(date) = self.buffer.pop() {
                if date < self.setting.start_date {
                    continue;
                }
                if matches!(self.setting.rule.end, EndCondition::Until(until) if date > until) {
                    self.done = true;
                    return None;
                }
                self.yielded += 1;
                return Some(date);
            }

            if self.empty_periods >= MAX_EMPTY_PERIODS {
                self.done = true;
                return None;
            }

            let Some(mut candidates) = self.setting.period_candidates(self.period) else {
                self.done = true;
                return None;
            };
            self.period = match self.period.checked_add(1) {
                Some(p) => p,
                None => {
                    self.done = true;
                    return None;
                }
            };

            if candidates.is_empty() {
                self.empty_periods += 1;
            } else {
                self.empty_periods = 0;
                candidates.reverse();
                self.buffer = candidates;
            }
        }
    }
}

/// Builder for [`RecurrenceSetting`].
#[derive(Debug, Clone, Copy)]
pub struct RecurrenceSettingBuilder {
    start_date: NaiveDate,
    rule: RecurrenceRule,
}

impl RecurrenceSettingBuilder {
    /// Sets the number of units between repetitions.
    #[must_use]
    pub const fn interval(mut self, interval: u32) -> Self {
        self.rule.interval = interval;
        self
    }

    /// Sets the weekdays a weekly rule lands on.
    #[must_use]
    pub const fn weekdays(mut self, weekdays: WeekdaySet) -> Self {
        self.rule.weekdays = weekdays;
        self
    }

    /// Sets how a monthly rule picks its day.
    #[must_use]
    pub const fn monthly_mode(mut self, mode: MonthlyMode) -> Self {
        self.rule.monthly_mode = mode;
        self
    }

    /// Ends the schedule on `date`, inclusive.
    #[must_use]
    pub const fn until(mut self, date: NaiveDate) -> Self {
        self.rule.end = EndCondition::Until(date);
        self
    }

    /// Ends the schedule after `count` occurrences.
    #[must_use]
    pub const fn occurrences(mut self, count: u32) -> Self {
        self.rule.end = EndCondition::Count(count);
        self
    }

    /// Validates and builds the setting.
    pub fn build(self) -> Result<RecurrenceSetting> {
        let err = |reason: &str| Error::RecurrenceParse {
            rule: self.rule.to_string(),
            reason: reason.to_string(),
        };

        if self.rule.interval == 0 {
            return Err(err("interval must be at least 1"));
        }
        match self.rule.end {
            EndCondition::Count(0) => return Err(err("occurrence count must be at least 1")),
            EndCondition::Until(date) if date < self.start_date => {
                return Err(err("end date is before the start date"));
            }
            _ => {}
        }

        Ok(RecurrenceSetting {
            start_date: self.start_date,
            rule: self.rule,
        })
    }
}
