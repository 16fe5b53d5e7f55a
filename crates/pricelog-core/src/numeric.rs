//! Lenient numeric parsing for supplier-formatted prices and quantities.
//!
//! Suppliers write `12.50`, `12,50`, `1.234,50 €` and `EUR 1,234.50` for the
//! same kind of field. A leading or trailing currency marker is dropped, as
//! are spaces between digit groups. When both `.` and `,` appear, the
//! right-most one is the decimal separator. Anything else left over (words,
//! exponents, a second number) makes the value unparseable.

const CURRENCY_MARKERS: &[&str] = &["€", "$", "£", "EUR", "USD", "GBP"];

/// Parses a decimal, returning `None` unless the whole input is one number.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let stripped = strip_currency(raw);
    let (sign, body) = match stripped.strip_prefix(|ch: char| ch == '-' || ch == '+') {
        Some(rest) => (&stripped[..1], rest.trim_start()),
        None => ("", stripped),
    };

    let digits = join_digit_groups(body)?;
    if !digits.chars().all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | ','))
        || !digits.chars().any(|ch| ch.is_ascii_digit())
    {
        return None;
    }

    let canonical = match (digits.rfind('.'), digits.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => digits.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => digits.replace(',', ""),
        (None, Some(_)) if digits.matches(',').count() == 1 => digits.replace(',', "."),
        (None, Some(_)) => digits.replace(',', ""),
        (Some(_), None) if digits.matches('.').count() > 1 => digits.replace('.', ""),
        _ => digits,
    };

    format!("{sign}{canonical}")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn strip_currency(raw: &str) -> &str {
    let mut rest = raw.trim();
    loop {
        let before = rest;
        for marker in CURRENCY_MARKERS {
            if let Some(head) = rest.get(..marker.len()) {
                if head.eq_ignore_ascii_case(marker) {
                    rest = rest[marker.len()..].trim_start();
                }
            }
            if let Some(split) = rest.len().checked_sub(marker.len()) {
                if rest.get(split..).is_some_and(|tail| tail.eq_ignore_ascii_case(marker)) {
                    rest = rest[..split].trim_end();
                }
            }
        }
        if rest == before {
            return rest;
        }
    }
}

/// Removes spaces used as thousands separators (`1 234,50`). Every group after
/// the first must start with exactly three digits.
fn join_digit_groups(body: &str) -> Option<String> {
    let mut groups = body.split(char::is_whitespace).filter(|group| !group.is_empty());
    let mut joined = String::from(groups.next()?);
    for group in groups {
        let leading = group.chars().take_while(char::is_ascii_digit).count();
        if leading != 3 || !joined.ends_with(|ch: char| ch.is_ascii_digit()) {
            return None;
        }
        joined.push_str(group);
    }
    Some(joined)
}

/// Price field: unparseable, negative or missing input becomes `0.0`.
pub fn parse_price(raw: Option<&str>) -> f64 {
    raw.and_then(parse_decimal)
        .filter(|value| *value >= 0.0)
        .unwrap_or(0.0)
}

/// Quantity field, truncated toward zero. `None` when not numeric.
pub fn parse_quantity_strict(raw: &str) -> Option<u64> {
    let value = parse_decimal(raw)?;
    if value <= 0.0 {
        return Some(0);
    }
    Some(value.trunc() as u64)
}

/// Quantity field: unparseable or missing input becomes `0`.
pub fn parse_quantity(raw: Option<&str>) -> u64 {
    raw.and_then(parse_quantity_strict).unwrap_or(0)
}
