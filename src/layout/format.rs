//! Value formatting for rendered fields.

/// Format an amount as dollars with thousands separators and two decimals.
///
/// `55000.0` becomes `$55,000.00`. Works on the decimal expansion of the
/// value, so no magnitude is clipped.
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (dollars, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // -0.001 rounds to zero and must not print as "-$0.00".
    let negative = amount < 0.0 && fixed.bytes().any(|b| (b'1'..=b'9').contains(&b));
    if negative {
        format!("-${}.{}", grouped, cents)
    } else {
        format!("${}.{}", grouped, cents)
    }
}

/// Render an identifier with everything but the last four digits masked.
pub fn mask_identifier(suffix: &str) -> String {
    let start = suffix.len().saturating_sub(4);
    let visible = suffix.get(start..).unwrap_or("");
    format!("XXX-XX-{}", visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_grouping() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.5), "$999.50");
        assert_eq!(format_currency(1000.0), "$1,000.00");
        assert_eq!(format_currency(55000.0), "$55,000.00");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
    }

    #[test]
    fn currency_rounds_to_cents() {
        assert_eq!(format_currency(10.006), "$10.01");
        assert_eq!(format_currency(0.004), "$0.00");
    }

    #[test]
    fn negative_currency_keeps_sign() {
        assert_eq!(format_currency(-1500.0), "-$1,500.00");
        assert_eq!(format_currency(-0.001), "$0.00");
    }

    #[test]
    fn large_amounts_are_not_clipped() {
        assert_eq!(format_currency(1.0e13), "$10,000,000,000,000.00");
        assert_eq!(format_currency(1.0e20), "$100,000,000,000,000,000,000.00");
    }

    #[test]
    fn mask_shows_last_four() {
        assert_eq!(mask_identifier("1234"), "XXX-XX-1234");
        assert_eq!(mask_identifier("123456789"), "XXX-XX-6789");
        assert_eq!(mask_identifier(""), "XXX-XX-");
    }
}
