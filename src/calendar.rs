//! Market trading calendars.
//!
//! The trend aggregator and the probability estimator never hard-code calendar
//! rules; they receive a [`TradingCalendar`]. [`MarketCalendar`] covers the two
//! supported venues:
//!
//! - [`Market::Us`]: NYSE/Nasdaq full-day closures. Saturday holidays close the
//!   Friday before, Sunday holidays the Monday after (New Year's Day on a
//!   Saturday is not observed).
//! - [`Market::Brazil`]: B3 closures, including Carnival and the Easter-based
//!   holidays. No weekend observance.
//!
//! Weeks start on Monday and months are calendar months for both.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Supported venues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    #[default]
    Us,
    Brazil,
}

/// Calendar aggregation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Week,
    Month,
}

// ============================================================
// CALENDAR TRAIT
// ============================================================

/// Trading-day calendar service.
pub trait TradingCalendar: Send + Sync {
    /// Short venue name used in logs.
    fn name(&self) -> &str;

    /// Full-day market closure on a weekday.
    fn is_holiday(&self, date: NaiveDate) -> bool;

    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.is_holiday(date)
    }

    /// Monday of the week containing `date`.
    fn week_start(&self, date: NaiveDate) -> NaiveDate {
        date - Days::new(u64::from(date.weekday().num_days_from_monday()))
    }

    fn month_start(&self, date: NaiveDate) -> NaiveDate {
        date.with_day(1).unwrap_or(date)
    }

    /// Key shared by every date of the same period.
    fn period_start(&self, date: NaiveDate, kind: PeriodKind) -> NaiveDate {
        match kind {
            PeriodKind::Week => self.week_start(date),
            PeriodKind::Month => self.month_start(date),
        }
    }

    /// First trading session strictly after `date`.
    fn next_trading_day(&self, date: NaiveDate) -> NaiveDate {
        date.iter_days()
            .skip(1)
            .find(|d| self.is_trading_day(*d))
            .unwrap_or(date)
    }

    /// Number of trading sessions strictly between `from` and `to`.
    fn sessions_between(&self, from: NaiveDate, to: NaiveDate) -> usize {
        from.iter_days()
            .skip(1)
            .take_while(|d| *d < to)
            .filter(|d| self.is_trading_day(*d))
            .count()
    }
}

/// Trading sessions missing between two consecutive bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionGap {
    /// Date of the bar before the gap
    pub after: NaiveDate,
    /// Date of the bar after the gap
    pub before: NaiveDate,
    pub missing: usize,
}

/// Gaps in an ordered run of bar dates, oldest first.
pub fn session_gaps<C: TradingCalendar + ?Sized>(
    calendar: &C,
    dates: impl IntoIterator<Item = NaiveDate>,
) -> Vec<SessionGap> {
    let mut gaps = Vec::new();
    let mut dates = dates.into_iter();
    let Some(mut prev) = dates.next() else {
        return gaps;
    };
    for date in dates {
        let missing = calendar.sessions_between(prev, date);
        if missing > 0 {
            gaps.push(SessionGap {
                after: prev,
                before: date,
                missing,
            });
        }
        prev = date;
    }
    gaps
}

// ============================================================
// MARKET CALENDAR
// ============================================================

/// Holiday rules for a [`Market`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketCalendar {
    market: Market,
}

impl MarketCalendar {
    pub const fn new(market: Market) -> Self {
        Self { market }
    }

    pub const fn market(&self) -> Market {
        self.market
    }

    /// All full-day closures of `year` that fall on weekdays or are observed on one.
    pub fn holidays(&self, year: i32) -> Vec<NaiveDate> {
        let mut days = match self.market {
            Market::Us => us_holidays(year),
            Market::Brazil => brazil_holidays(year),
        };
        days.sort_unstable();
        days.dedup();
        days
    }
}

impl From<Market> for MarketCalendar {
    fn from(market: Market) -> Self {
        Self::new(market)
    }
}

impl TradingCalendar for MarketCalendar {
    fn name(&self) -> &str {
        match self.market {
            Market::Us => "NYSE",
            Market::Brazil => "B3",
        }
    }

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays(date.year()).contains(&date)
    }
}

fn us_holidays(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(10);

    // New Year's Day falling on Saturday is not moved back into December.
    if let Some(new_year) = ymd(year, 1, 1) {
        if new_year.weekday() == Weekday::Sun {
            days.extend(new_year.succ_opt());
        } else {
            days.push(new_year);
        }
    }

    days.extend(NaiveDate::from_weekday_of_month_opt(year, 1, Weekday::Mon, 3));
    days.extend(NaiveDate::from_weekday_of_month_opt(year, 2, Weekday::Mon, 3));
    days.extend(easter_offset(year, -2));
    days.extend(last_weekday_of_month(year, 5, Weekday::Mon));
    if year >= 2022 {
        days.extend(ymd(year, 6, 19).map(observed));
    }
    days.extend(ymd(year, 7, 4).map(observed));
    days.extend(NaiveDate::from_weekday_of_month_opt(year, 9, Weekday::Mon, 1));
    days.extend(NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Thu, 4));
    days.extend(ymd(year, 12, 25).map(observed));
    days
}

fn brazil_holidays(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(16);

    // Carnival Monday/Tuesday, Good Friday, Corpus Christi
    for offset in [-48, -47, -2, 60] {
        days.extend(easter_offset(year, offset));
    }

    let mut fixed = vec![
        (1, 1),
        (4, 21),
        (5, 1),
        (9, 7),
        (10, 12),
        (11, 2),
        (11, 15),
        (12, 24),
        (12, 25),
        (12, 31),
    ];
    if year >= 2024 {
        fixed.push((11, 20));
    }
    days.extend(fixed.into_iter().filter_map(|(m, d)| ymd(year, m, d)));
    days
}

#[inline]
fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Saturday -> Friday, Sunday -> Monday.
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date.pred_opt().unwrap_or(date),
        Weekday::Sun => date.succ_opt().unwrap_or(date),
        _ => date,
    }
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        ymd(year + 1, 1, 1)?
    } else {
        ymd(year, month + 1, 1)?
    };
    let mut day = first_of_next.pred_opt()?;
    while day.weekday() != weekday {
        day = day.pred_opt()?;
    }
    Some(day)
}

/// Easter Sunday (anonymous Gregorian algorithm).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    ymd(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}

fn easter_offset(year: i32, offset_days: i64) -> Option<NaiveDate> {
    let easter = easter_sunday(year)?;
    let delta = Days::new(offset_days.unsigned_abs());
    if offset_days < 0 {
        easter.checked_sub_days(delta)
    } else {
        easter.checked_add_days(delta)
    }
}

// ============================================================
// TESTS
// ============================================================
