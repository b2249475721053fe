//! Display formatting of field values
//!
//! Formatting is chosen from the field alias alone: money-like aliases get
//! US currency, date-like aliases get en-US dates, and free-text aliases get
//! their HTML flattened to plain text. Anything that does not parse is left
//! as it was.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::{Html, Node};
use serde_json::Value;

const MONEY_MARKERS: [&str; 3] = ["amount", "cost", "price"];
const DATE_MARKERS: [&str; 3] = ["date", "created", "modified"];
const TEXT_MARKERS: [&str; 3] = ["description", "comments", "notes"];

/// Format a field value for display based on its alias
pub fn format_field_value(value: &Value, alias: &str) -> Value {
    if is_blank(value) {
        return value.clone();
    }

    let alias = alias.to_lowercase();
    let formatted = if contains_any(&alias, &MONEY_MARKERS) {
        parse_amount(value).map(format_usd)
    } else if contains_any(&alias, &DATE_MARKERS) {
        parse_timestamp(value).map(|timestamp| {
            if alias.contains("time") {
                format_datetime(timestamp)
            } else {
                format_date(timestamp)
            }
        })
    } else if contains_any(&alias, &TEXT_MARKERS) {
        value.as_str().map(strip_html)
    } else {
        None
    };

    formatted.map(Value::String).unwrap_or_else(|| value.clone())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn contains_any(alias: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| alias.contains(marker))
}

fn parse_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    amount.is_finite().then_some(amount)
}

/// Render an amount as `$1,234.50`
pub fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => parse_date_string(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.naive_utc()),
        _ => None,
    }
}

fn parse_date_string(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    ["%Y-%m-%d", "%m/%d/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn format_date(timestamp: NaiveDateTime) -> String {
    timestamp.format("%-m/%-d/%Y").to_string()
}

fn format_datetime(timestamp: NaiveDateTime) -> String {
    timestamp.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// Flatten rich text: `<br>` becomes a newline, other tags are dropped
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::with_capacity(html.len());

    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Text(chunk) => text.push_str(chunk),
            Node::Element(element) if element.name() == "br" => text.push('\n'),
            _ => {}
        }
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_currency_formatting() {
        assert_eq!(format_field_value(&json!(1234.5), "Total_Amount"), json!("$1,234.50"));
        assert_eq!(format_field_value(&json!("1000000"), "Unit_Cost"), json!("$1,000,000.00"));
        assert_eq!(format_field_value(&json!(-42.129), "price"), json!("-$42.13"));
        assert_eq!(format_field_value(&json!(0), "Price"), json!("$0.00"));
        assert_eq!(format_field_value(&json!("n/a"), "Price"), json!("n/a"));
    }

    #[test]
    fn test_date_formatting() {
        assert_eq!(
            format_field_value(&json!("2024-03-05T14:07:09Z"), "Review_Date"),
            json!("3/5/2024")
        );
        assert_eq!(
            format_field_value(&json!("2024-03-05T14:07:09"), "Created_Time"),
            json!("3/5/2024, 2:07:09 PM")
        );
        assert_eq!(format_field_value(&json!("2024-12-25"), "Last_Modified"), json!("12/25/2024"));
        assert_eq!(
            format_field_value(&json!("2024-12-25"), "Date_Time_Logged"),
            json!("12/25/2024, 12:00:00 AM")
        );
        assert_eq!(format_field_value(&json!("soon"), "Due_Date"), json!("soon"));
    }

    #[test]
    fn test_rich_text_flattening() {
        assert_eq!(
            format_field_value(&json!("<p>Line one<br>Line <b>two</b><BR/>three</p> "), "Description"),
            json!("Line one\nLine two\nthree")
        );
        assert_eq!(
            format_field_value(&json!("  plain notes  "), "Notes"),
            json!("plain notes")
        );
        assert_eq!(format_field_value(&json!(7), "Comments"), json!(7));
    }

    #[test]
    fn test_blank_and_unmatched_values_pass_through() {
        assert_eq!(format_field_value(&Value::Null, "Amount"), Value::Null);
        assert_eq!(format_field_value(&json!(""), "Review_Date"), json!(""));
        assert_eq!(format_field_value(&json!("<b>x</b>"), "Title"), json!("<b>x</b>"));
    }

    #[test]
    fn test_money_takes_precedence_over_date() {
        assert_eq!(
            format_field_value(&json!(10), "Amount_Updated_Date"),
            json!("$10.00")
        );
    }
}
