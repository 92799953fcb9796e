use once_cell::sync::Lazy;
use regex::Regex;

static ANGLE_ADDRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(.+?)>").expect("valid regex"));

pub const UNKNOWN_DOMAIN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSender {
    pub address: String,
    pub domain: String,
}

/// Splits a raw `From` header into address and lowercased domain.
///
/// The first `<...>` pair wins; without one the whole header is taken as the address.
/// A header with no `@` yields the `unknown` domain.
pub fn parse_sender(raw: &str) -> ParsedSender {
    let address = ANGLE_ADDRESS
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str())
        .to_string();

    let domain = match address.rsplit_once('@') {
        Some((_, domain)) => domain.trim().to_lowercase(),
        None => UNKNOWN_DOMAIN.to_string(),
    };

    ParsedSender { address, domain }
}
