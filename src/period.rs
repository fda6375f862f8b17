use chrono::{Datelike, Local, NaiveDate};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Period {
    pub month: u32,
    pub week: u32,
}

impl Period {
    pub fn current() -> Self {
        month_and_week(Local::now().date_naive())
    }
}

/// Week-of-month where week 1 runs from the 1st up to the first Sunday.
pub fn month_and_week(date: NaiveDate) -> Period {
    let first_weekday = date
        .with_day(1)
        .map(|first| first.weekday().number_from_monday())
        .unwrap_or(1);
    let offset = date.day() + first_weekday - 1;
    Period {
        month: date.month(),
        week: offset.div_ceil(7),
    }
}
