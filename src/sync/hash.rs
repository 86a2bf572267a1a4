/// Cheap fingerprint of an avatar payload.
///
/// Rolling `h = h * 31 + c` over at most `window` UTF-16 code units, wrapped
/// to a signed 32-bit integer and rendered in base 36. Only used to notice
/// that the avatar changed, never for integrity.
pub fn avatar_hash(payload: &str, window: usize) -> String {
    let hash = payload
        .encode_utf16()
        .take(window)
        .fold(0i32, |h, unit| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(unit as i32));

    to_base36(hash)
}

/// Hash of an optional avatar; a missing avatar hashes to the empty string
pub fn optional_avatar_hash(payload: Option<&str>, window: usize) -> String {
    payload.map(|p| avatar_hash(p, window)).unwrap_or_default()
}

fn to_base36(value: i32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let negative = value < 0;
    let mut magnitude = (value as i64).unsigned_abs();
    let mut digits = Vec::new();

    while magnitude > 0 {
        digits.push(DIGITS[(magnitude % 36) as usize]);
        magnitude /= 36;
    }

    if negative {
        digits.push(b'-');
    }

    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
