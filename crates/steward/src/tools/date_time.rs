use chrono::{DateTime, Locale, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use steward_core::tool::{Error as ToolError, Tool, ToolResult};

/// Input of [`DateTimeTool`].
#[derive(Deserialize, JsonSchema)]
pub struct DateTimeParameters {
    #[serde(rename = "timeZone")]
    #[schemars(description = "Time Zone Format")]
    time_zone: String,
    #[schemars(description = "Locale string")]
    locale: String,
}

/// The result of [`format_date_time`], serialized as the tool output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeReport {
    /// The instant rendered in the requested zone and locale.
    pub formatted_date: String,
    /// The requested time zone, exactly as given.
    pub timezone: String,
}

/// Why a date could not be formatted.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DateTimeError {
    /// Not an IANA time zone name.
    #[error("invalid time zone specified: {0}")]
    InvalidTimeZone(String),
    /// No locale data for this tag.
    #[error("incorrect locale information provided: {0}")]
    InvalidLocale(String),
}

/// Formats `now` in `time_zone` with the names and date order of
/// `locale`, e.g. `Friday, March 15, 2024 at 01:30:45 PM` for `en-US` or
/// `Freitag, 15. März 2024, 01:30:45 PM` for `de-DE`.
///
/// `locale` is a BCP 47 tag such as `en-US`, `de-DE` or `zh-Hans-CN`. A
/// bare language such as `fr` picks that language's main region. Locales
/// without their own AM/PM marker fall back to `AM` and `PM`.
pub fn format_date_time(
    now: DateTime<Utc>,
    time_zone: &str,
    locale: &str,
) -> Result<DateTimeReport, DateTimeError> {
    let tz: Tz = time_zone
        .parse()
        .map_err(|_| DateTimeError::InvalidTimeZone(time_zone.to_owned()))?;
    let chrono_locale = parse_locale(locale)
        .ok_or_else(|| DateTimeError::InvalidLocale(locale.to_owned()))?;

    let local = now.with_timezone(&tz);
    let layout = DateLayout::of(chrono_locale);
    let joiner = match layout {
        DateLayout::Cjk => " ",
        _ if locale.starts_with("en") => " at ",
        _ => ", ",
    };

    let date = local.format_localized(layout.pattern(), chrono_locale);
    let time = local.format_localized("%I:%M:%S", chrono_locale);
    let marker = local.format_localized("%p", chrono_locale).to_string();
    let marker = match marker.trim() {
        "" if local.hour() < 12 => "AM",
        "" => "PM",
        marker => marker,
    };

    Ok(DateTimeReport {
        formatted_date: format!("{date}{joiner}{time} {marker}"),
        timezone: time_zone.to_owned(),
    })
}

/// The long date layout of a locale, told apart by where day, month and
/// year land in its short date format (`%x`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DateLayout {
    /// `Friday, March 15, 2024`
    MonthFirst,
    /// `Freitag, 15. März 2024`
    DayFirstDotted,
    /// `vendredi 15 mars 2024`
    DayFirst,
    /// `2024年3月15日星期五`
    Cjk,
}

impl DateLayout {
    fn of(locale: Locale) -> Self {
        // Day, month and year all differ, so each can be found in the
        // rendered short date.
        let sample = match Utc.with_ymd_and_hms(2033, 11, 22, 0, 0, 0).single() {
            Some(sample) => sample.format_localized("%x", locale).to_string(),
            None => return DateLayout::DayFirst,
        };
        let day = sample.find("22");
        let month = sample.find("11");
        let year = sample.find("33");
        match (day, month, year) {
            (Some(d), Some(m), Some(y)) if y < m && m < d => {
                if sample.contains('年') {
                    DateLayout::Cjk
                } else {
                    DateLayout::DayFirst
                }
            }
            (Some(d), Some(m), _) if m < d => DateLayout::MonthFirst,
            _ if sample.contains("22.") => DateLayout::DayFirstDotted,
            _ => DateLayout::DayFirst,
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            DateLayout::MonthFirst => "%A, %B %-d, %Y",
            DateLayout::DayFirstDotted => "%A, %-d. %B %Y",
            DateLayout::DayFirst => "%A %-d %B %Y",
            DateLayout::Cjk => "%Y年%-m月%-d日%A",
        }
    }
}

fn parse_locale(tag: &str) -> Option<Locale> {
    let mut parts = tag.trim().split(['-', '_']).peekable();
    let language = parts.next().filter(|l| !l.is_empty())?.to_ascii_lowercase();
    // Script subtags (`Hans`, `Latn`) have four letters; they do not pick
    // a different locale here.
    if let Some(script) = parts.peek() {
        if script.len() == 4 && script.chars().all(|c| c.is_ascii_alphabetic()) {
            parts.next();
        }
    }
    let region = match parts.next() {
        Some(region) => region.to_ascii_uppercase(),
        None => default_region(&language),
    };
    Locale::try_from(format!("{language}_{region}").as_str()).ok()
}

fn default_region(language: &str) -> String {
    let region = match language {
        "en" => "US",
        "zh" => "CN",
        "ja" => "JP",
        "ko" => "KR",
        "sv" => "SE",
        "da" => "DK",
        "cs" => "CZ",
        "el" => "GR",
        "uk" => "UA",
        "he" => "IL",
        "hi" => "IN",
        other => return other.to_ascii_uppercase(),
    };
    region.to_owned()
}

/// A tool that tells the current date and time in a given zone.
pub struct DateTimeTool {
    parameter_schema: Value,
}

impl DateTimeTool {
    /// Creates a new date/time tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(DateTimeParameters).to_value(),
        }
    }
}

impl Default for DateTimeTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for DateTimeTool {
    type Input = DateTimeParameters;

    fn name(&self) -> &str {
        "todays_date_time"
    }

    fn description(&self) -> &str {
        "Useful to get current day, date and time."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: DateTimeParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move {
            info!("getting today's date and time in {} timezone", input.time_zone);
            let report = format_date_time(Utc::now(), &input.time_zone, &input.locale)
                .map_err(|err| ToolError::invalid_input().with_reason(err.to_string()))?;
            debug!("{report:?}");
            serde_json::to_string(&report).map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })
        }
    }
}
