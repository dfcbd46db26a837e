pub mod table;
pub mod errors;

pub use table::Table;
pub use errors::CorrelateError;

/// Abbreviate an address for display, e.g. `0xd8da6bf2...` becomes `0xd8..045`
pub fn short_label(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 7 {
        return address.to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{}..{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_label() {
        assert_eq!(short_label("0xd8da6bf26964af9d7eed9e03e53415d37aa96045"), "0xd8..045");
        assert_eq!(short_label("0xabc"), "0xabc");
    }
}
