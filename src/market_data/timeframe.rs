use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Lookback window for historical bars.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
    Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum Period {
    #[strum(serialize = "1d")]
    #[serde(rename = "1d")]
    OneDay,
    #[strum(serialize = "5d")]
    #[serde(rename = "5d")]
    FiveDays,
    #[default]
    #[strum(serialize = "1mo")]
    #[serde(rename = "1mo")]
    OneMonth,
    #[strum(serialize = "3mo")]
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[strum(serialize = "6mo")]
    #[serde(rename = "6mo")]
    SixMonths,
    #[strum(serialize = "1y")]
    #[serde(rename = "1y")]
    OneYear,
    #[strum(serialize = "2y")]
    #[serde(rename = "2y")]
    TwoYears,
}

/// Width of one bar.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
    Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum Interval {
    #[strum(serialize = "5m")]
    #[serde(rename = "5m")]
    FiveMinutes,
    #[strum(serialize = "15m")]
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[strum(serialize = "1h")]
    #[serde(rename = "1h")]
    OneHour,
    #[default]
    #[strum(serialize = "1d")]
    #[serde(rename = "1d")]
    OneDay,
    #[strum(serialize = "1wk")]
    #[serde(rename = "1wk")]
    OneWeek,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Period/interval pair chosen in the detail view.
/// No compatibility check between the two; the backend decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Timeframe {
    pub period: Period,
    pub interval: Interval,
}

impl Timeframe {
    pub fn new(period: Period, interval: Interval) -> Self {
        Self { period, interval }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn default_is_one_month_daily() {
        let tf = Timeframe::default();
        assert_eq!(tf.period, Period::OneMonth);
        assert_eq!(tf.interval, Interval::OneDay);
    }

    #[test]
    fn wire_strings_parse_and_display() {
        let periods: Vec<String> = Period::iter().map(|p| p.to_string()).collect();
        assert_eq!(periods, ["1d", "5d", "1mo", "3mo", "6mo", "1y", "2y"]);

        let intervals: Vec<&str> = Interval::iter().map(|i| i.as_str()).collect();
        assert_eq!(intervals, ["5m", "15m", "1h", "1d", "1wk"]);

        assert_eq!("1wk".parse::<Interval>().unwrap(), Interval::OneWeek);
        assert_eq!("3mo".parse::<Period>().unwrap(), Period::ThreeMonths);
        assert!("10y".parse::<Period>().is_err());
    }

    #[test]
    fn serde_uses_wire_strings() {
        let json = serde_json::to_string(&Timeframe::new(Period::OneYear, Interval::OneWeek)).unwrap();
        assert_eq!(json, r#"{"period":"1y","interval":"1wk"}"#);
    }
}
