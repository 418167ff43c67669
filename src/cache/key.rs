//! Cache key derivation.
//!
//! A key is `"{language}_{base36(|h|)}"` where `h` is a 32-bit rolling hash
//! (`h = h * 31 + unit`, wrapping) over the UTF-16 code units of the
//! lowercased, trimmed message. Distinct messages may collide; a false hit
//! is tolerated for conversational responses.

/// Normalize a message for keying: lowercase, then trim.
///
/// Trimming follows the browser front-end's set: Unicode white space plus the
/// byte-order mark, but not U+0085.
pub fn normalize_message(message: &str) -> String {
    message.to_lowercase().trim_matches(is_trimmed).to_string()
}

fn is_trimmed(c: char) -> bool {
    c == '\u{FEFF}' || (c.is_whitespace() && c != '\u{85}')
}

/// Derive the cache key for `(message, language)`.
pub fn generate_cache_key(message: &str, language: &str) -> String {
    let normalized = normalize_message(message);
    format!("{}_{}", language, hash_string(&normalized))
}

/// Popularity-table key: language plus the lowercased, untrimmed message.
pub fn popularity_key(message: &str, language: &str) -> String {
    format!("{}_{}", language, message.to_lowercase())
}

/// Rolling 32-bit hash rendered in base 36.
pub fn hash_string(s: &str) -> String {
    let mut hash: i32 = 0;
    for unit in s.encode_utf16() {
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(i32::from(unit));
    }
    // Widen before abs so i32::MIN stays positive.
    to_base36(i64::from(hash).unsigned_abs())
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
