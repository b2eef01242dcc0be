/// Group the integer part of `val` in thousands: 1234567.891 -> 1,234,567.89
pub fn grouped(val: f64, decimals: usize) -> String {
    let negative = val < 0.0;
    let fixed = format!("{:.*}", decimals, val.abs());
    let (int_part, dec_part) = match fixed.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (fixed.as_str(), None),
    };

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    let sign = if negative { "-" } else { "" };
    match dec_part {
        Some(d) => format!("{sign}{with_commas}.{d}"),
        None => format!("{sign}{with_commas}"),
    }
}

/// Market value in lakhs, or a dash when missing.
pub fn lakhs(val: Option<f64>) -> String {
    val.map_or_else(|| "-".to_string(), |v| grouped(v, 2))
}

pub fn pct(val: Option<f64>) -> String {
    val.map_or_else(|| "-".to_string(), |v| format!("{v:.2}%"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_formatting() {
        assert_eq!(grouped(1234.56, 2), "1,234.56");
        assert_eq!(grouped(-500.0, 2), "-500.00");
        assert_eq!(grouped(0.0, 2), "0.00");
        assert_eq!(grouped(1000000.99, 2), "1,000,000.99");
        assert_eq!(grouped(1234567.0, 0), "1,234,567");
    }

    #[test]
    fn test_optional_formatters() {
        assert_eq!(lakhs(Some(50.5)), "50.50");
        assert_eq!(lakhs(None), "-");
        assert_eq!(pct(Some(2.3)), "2.30%");
    }
}
