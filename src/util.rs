/// Address without its scheme and trailing slash, for compact labels.
pub fn short_address(address: &str) -> &str {
    let rest = address
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(address);
    let trimmed = rest.trim_end_matches('/');
    if trimmed.is_empty() { rest } else { trimmed }
}

#[cfg(test)]
mod tests {
    use super::short_address;

    #[test]
    fn test_short_address_strips_scheme_and_slash() {
        assert_eq!(short_address("https://alice.example/"), "alice.example");
        assert_eq!(short_address("file:///srv/peers/bob/"), "/srv/peers/bob");
        assert_eq!(short_address("plain-id"), "plain-id");
        assert_eq!(short_address("https:///"), "/");
    }
}
