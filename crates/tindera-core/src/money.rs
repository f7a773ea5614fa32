pub fn format_centavos(amount: i64) -> String {
    format!("₱{}.{:02}", amount / 100, amount % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_two_decimal_places() {
        assert_eq!(format_centavos(0), "₱0.00");
        assert_eq!(format_centavos(12050), "₱120.50");
        assert_eq!(format_centavos(9), "₱0.09");
        assert_eq!(format_centavos(20000), "₱200.00");
    }
}
