/// Port the launcher's local callback server listens on unless told otherwise
pub const DEFAULT_CALLBACK_PORT: u16 = 3000;

pub const MAX_HWID_LEN: usize = 128;

/// Query parameters of the launcher sign-in page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherParams {
    pub port: u16,
    pub hwid: Option<String>,
}

impl Default for LauncherParams {
    fn default() -> Self {
        Self {
            port: DEFAULT_CALLBACK_PORT,
            hwid: None,
        }
    }
}

impl LauncherParams {
    /// Parse and validate a raw query string, with or without the leading `?`.
    ///
    /// Invalid values fall back to defaults rather than failing; only the
    /// first occurrence of each parameter counts.
    pub fn from_query(query: &str) -> Self {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(query.trim_start_matches('?')).unwrap_or_default();

        let first = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };

        Self {
            port: validate_port(first("port")),
            hwid: validate_hwid(first("hwid")),
        }
    }
}

/// Port number in 1..=65535, else the default.
///
/// Leading whitespace, an optional sign and trailing garbage are tolerated
/// the same way a lenient integer prefix parse does (`"8080abc"` is 8080).
pub fn validate_port(raw: Option<&str>) -> u16 {
    raw.and_then(leading_integer)
        .and_then(|port| u16::try_from(port).ok())
        .filter(|port| *port >= 1)
        .unwrap_or(DEFAULT_CALLBACK_PORT)
}

/// Hardware id made only of `[A-Za-z0-9_-]`, at most 128 characters
pub fn validate_hwid(raw: Option<&str>) -> Option<String> {
    let hwid = raw?;

    if hwid.is_empty() || hwid.len() > MAX_HWID_LEN {
        return None;
    }

    if !hwid.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
        return None;
    }

    Some(hwid.to_string())
}

fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    // Leading zeros carry no value; the cap only keeps the parse in range
    let significant = digits.trim_start_matches('0');
    let digits: String = if significant.is_empty() {
        "0".to_string()
    } else {
        significant.chars().take(18).collect()
    };

    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}
