use chrono::{DateTime, Utc};
use tracker_attributes::{DatetimeSettings, TimeFormat};

/// Translate a `DD-MM-YYYY` style pattern into a chrono format string.
///
/// Recognised tokens: `YYYY`, `YY`, `MMMM`, `MMM`, `MM`, `DD`. Anything else
/// is copied through, with `%` escaped.
fn chrono_pattern(date_format: &str) -> String {
    const TOKENS: [(&str, &str); 6] = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("DD", "%d"),
    ];

    let mut out = String::with_capacity(date_format.len() + 4);
    let mut rest = date_format;
    'outer: while let Some(c) = rest.chars().next() {
        for (token, chrono_token) in TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                out.push_str(chrono_token);
                rest = after;
                continue 'outer;
            }
        }
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Render `at` with the date and/or time parts the settings keep visible.
pub(crate) fn format_datetime(at: DateTime<Utc>, settings: &DatetimeSettings) -> Option<String> {
    let pattern = chrono_pattern(&settings.date_format);
    let date = (!settings.hide_date).then(|| at.format(&pattern).to_string());
    let time = (!settings.hide_time).then(|| match settings.time_format {
        TimeFormat::TwelveHour => at.format("%I:%M %p").to_string(),
        TimeFormat::TwentyFourHour => at.format("%H:%M").to_string(),
    });
    match (date, time) {
        (Some(date), Some(time)) => Some(format!("{date} {time}")),
        (Some(part), None) | (None, Some(part)) => Some(part),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).single().unwrap()
    }

    #[test]
    fn translates_tokens() {
        assert_eq!(chrono_pattern("DD-MM-YYYY"), "%d-%m-%Y");
        assert_eq!(chrono_pattern("MMM DD, YY"), "%b %d, %y");
        assert_eq!(chrono_pattern("100%"), "100%%");
    }

    #[test]
    fn default_settings_show_both_parts() {
        let out = format_datetime(at(), &DatetimeSettings::default());
        assert_eq!(out.as_deref(), Some("09-03-2024 02:05 PM"));
    }

    #[test]
    fn hidden_parts_are_dropped() {
        let settings = DatetimeSettings {
            hide_date: true,
            time_format: TimeFormat::TwentyFourHour,
            ..DatetimeSettings::default()
        };
        assert_eq!(format_datetime(at(), &settings).as_deref(), Some("14:05"));

        let none = DatetimeSettings {
            hide_date: true,
            hide_time: true,
            ..DatetimeSettings::default()
        };
        assert_eq!(format_datetime(at(), &none), None);
    }
}
