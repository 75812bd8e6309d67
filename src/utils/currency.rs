//! Rupee formatting helpers. Amounts are `BigDecimal` rupees throughout.

use bigdecimal::BigDecimal;

use crate::models::coursemodel::Price;

/// Groups an integer digit string the Indian way: last three digits, then
/// pairs (`1234567` -> `12,34,567`).
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

/// `₹2,999` for whole rupees, `₹1,00,000.50` otherwise.
pub fn format_inr(amount: &BigDecimal) -> String {
    let rounded = amount.with_scale_round(2, bigdecimal::RoundingMode::HalfUp);
    let text = rounded.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let sign = if rounded < BigDecimal::from(0) { "-" } else { "" };

    if fraction.chars().all(|c| c == '0') {
        format!("{}₹{}", sign, group_indian(whole))
    } else {
        format!("{}₹{}.{}", sign, group_indian(whole), fraction)
    }
}

pub fn format_price(price: &Price) -> String {
    match price {
        Price::Free => "Free".to_string(),
        Price::Paid(amount) => format_inr(amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_format_inr() {
        assert_eq!(format_inr(&BigDecimal::from(999)), "₹999");
        assert_eq!(format_inr(&BigDecimal::from(2999)), "₹2,999");
        assert_eq!(format_inr(&BigDecimal::from(100000)), "₹1,00,000");
        assert_eq!(format_inr(&BigDecimal::from(12345678)), "₹1,23,45,678");
        assert_eq!(
            format_inr(&BigDecimal::from_str("599.998").unwrap()),
            "₹600"
        );
        assert_eq!(
            format_inr(&BigDecimal::from_str("2500.5").unwrap()),
            "₹2,500.50"
        );
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(&Price::Free), "Free");
        assert_eq!(format_price(&Price::Paid(BigDecimal::from(3500))), "₹3,500");
    }
}
