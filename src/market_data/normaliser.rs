// Canonical text forms for persisted tables:
//   dates   m/d/yyyy      -> dd.mm.yyyy
//   numbers free-form     -> 1.234.567,89  ("." thousands, "," decimals, two places)

use chrono::NaiveDate;

use crate::engine::types::Table;

pub const DATE_COLUMN: &str = "Date";
pub const SOURCE_DATE_FORMAT: &str = "%m/%d/%Y";
pub const CANONICAL_DATE_FORMAT: &str = "%d.%m.%Y";
/// Written in place of a number that cannot be read.
pub const INVALID_NUMBER: &str = "Invalid input format";

/// A numeric field as it arrives: already a number, or text to be pulled apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberInput<'a> {
    Native(f64),
    Text(&'a str),
}

impl<'a> NumberInput<'a> {
    /// Plain decimal literals (`-12`, `0.5`, `1234.56`) count as native numbers.
    pub fn classify(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
        let plain = digits.chars().any(|c| c.is_ascii_digit())
            && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
            && digits.matches('.').count() <= 1;

        match trimmed.parse::<f64>() {
            Ok(value) if plain => NumberInput::Native(value),
            _ => NumberInput::Text(raw),
        }
    }
}

/// `m/d/yyyy` -> `dd.mm.yyyy`; anything else comes back unchanged.
pub fn normalise_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw.trim(), SOURCE_DATE_FORMAT) {
        Ok(date) => date.format(CANONICAL_DATE_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}

pub fn normalise_number(raw: &str) -> String {
    let value = match NumberInput::classify(raw) {
        NumberInput::Native(value) => Some(value),
        NumberInput::Text(text) => digit_groups_value(text),
    };
    match value {
        Some(value) if value.is_finite() => render(value),
        _ => INVALID_NUMBER.to_string(),
    }
}

// Split on every non-digit. A last group of at most two digits is the fraction,
// everything before it is the integer part; a longer last group means no fraction.
fn digit_groups_value(text: &str) -> Option<f64> {
    let mut groups: Vec<&str> = text.split(|c: char| !c.is_ascii_digit()).collect();
    let cleaned = match groups.last() {
        Some(last) if last.len() <= 2 => {
            let fraction = groups.pop().unwrap_or_default();
            format!("{}.{}", groups.concat(), fraction)
        }
        _ => groups.concat(),
    };

    let magnitude = cleaned.parse::<f64>().ok()?;
    if text.trim_start().starts_with('-') {
        Some(-magnitude)
    } else {
        Some(magnitude)
    }
}

fn render(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    out.push_str(sign);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out.push(',');
    out.push_str(frac_part);
    out
}

/// Rewrites every cell of `table`: the `Date` column with the date rule, every other
/// column with the number rule. Row order and count are unchanged.
pub fn normalise_table(table: &mut Table) {
    for row in table.rows_mut() {
        for (column, value) in row.iter_mut() {
            *value = if column == DATE_COLUMN {
                normalise_date(value)
            } else {
                normalise_number(value)
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Row;
    use proptest::prelude::*;

    #[test]
    fn test_dates() {
        assert_eq!(normalise_date("03/07/2023"), "07.03.2023");
        assert_eq!(normalise_date("3/7/2023"), "07.03.2023");
        assert_eq!(normalise_date("07.03.2023"), "07.03.2023");
        assert_eq!(normalise_date("not a date"), "not a date");
        assert_eq!(normalise_date(""), "");
    }

    #[test]
    fn test_digit_group_text() {
        assert_eq!(normalise_number("1.234,5"), "1.234,50");
        assert_eq!(normalise_number("23,500.00"), "23.500,00");
        assert_eq!(normalise_number("1,234"), "1.234,00");
        assert_eq!(normalise_number("1 234 567,89"), "1.234.567,89");
        assert_eq!(normalise_number("12,"), "12,00");
    }

    #[test]
    fn test_native_numbers() {
        assert_eq!(normalise_number("12"), "12,00");
        assert_eq!(normalise_number("0.5"), "0,50");
        assert_eq!(normalise_number("-1.234"), "-1,23");
        assert_eq!(normalise_number("1234567.891"), "1.234.567,89");
        assert_eq!(NumberInput::classify("1234.5"), NumberInput::Native(1234.5));
        assert_eq!(NumberInput::classify("1.234,5"), NumberInput::Text("1.234,5"));
    }

    #[test]
    fn test_invalid_numbers() {
        assert_eq!(normalise_number(""), INVALID_NUMBER);
        assert_eq!(normalise_number("n/a"), INVALID_NUMBER);
        assert_eq!(normalise_number(INVALID_NUMBER), INVALID_NUMBER);
    }

    #[test]
    fn test_negative_text_keeps_sign() {
        assert_eq!(normalise_number("-1.234,50"), "-1.234,50");
    }

    #[test]
    fn test_table_rules_per_column() {
        let mut table = Table::default();
        table.push(Row::from_pairs([("Date", "3/7/2023"), ("Max", "1,234.5"), ("Volume", "")]));
        table.push(Row::from_pairs([("Date", "07.03.2023"), ("Max", "1.234,50"), ("Volume", "10")]));

        normalise_table(&mut table);

        let rows = table.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Date"), Some("07.03.2023"));
        assert_eq!(rows[0].get("Max"), Some("1.234,50"));
        assert_eq!(rows[0].get("Volume"), Some(INVALID_NUMBER));
        assert_eq!(rows[1].get("Max"), Some("1.234,50"));
        assert_eq!(rows[1].get("Volume"), Some("10,00"));
    }

    proptest! {
        #[test]
        fn prop_number_canonical_form_is_fixed_point(cents in -10_000_000_000i64..10_000_000_000i64) {
            let once = normalise_number(&format!("{}.{:02}", cents / 100, (cents % 100).abs()));
            prop_assert_eq!(normalise_number(&once), once.clone());
        }

        #[test]
        fn prop_date_canonical_form_is_fixed_point(offset in 0i64..40_000) {
            let date = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap() + chrono::Duration::days(offset);
            let once = normalise_date(&date.format(SOURCE_DATE_FORMAT).to_string());
            prop_assert_eq!(&once, &date.format(CANONICAL_DATE_FORMAT).to_string());
            prop_assert_eq!(normalise_date(&once), once);
        }
    }
}
