pub(crate) fn retriable_status(code: u16) -> bool {
    matches!(code, 500 | 502 | 503 | 504 | 429 | 408)
}

pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Decodes a response body, falling back to Latin-1 when it is not UTF-8.
///
/// The `datos` payloads are served as ISO-8859-15 regardless of what the
/// headers claim; every byte maps to the code point of the same value.
pub(crate) fn decode_body(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Parses an AEMET decimal such as `"12,4"` or `"-0,5"`.
pub(crate) fn parse_decimal(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.replace(',', ".").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_relative_and_absolute() {
        assert_eq!(urljoin("https://a/api/", "/x"), "https://a/api/x");
        assert_eq!(urljoin("https://a/api", "x"), "https://a/api/x");
        assert_eq!(urljoin("https://a/api", "https://b/sh/1"), "https://b/sh/1");
    }

    #[test]
    fn latin1_fallback() {
        // "Coruña" in ISO-8859-1
        let bytes = [b'C', b'o', b'r', b'u', 0xF1, b'a'];
        assert_eq!(decode_body(&bytes), "Coruña");
        assert_eq!(decode_body("Coruña".as_bytes()), "Coruña");
    }

    #[test]
    fn decimal_comma() {
        assert_eq!(parse_decimal("12,4"), Some(12.4));
        assert_eq!(parse_decimal(" -0,5 "), Some(-0.5));
        assert_eq!(parse_decimal("Ip"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn retriable() {
        assert!(retriable_status(429));
        assert!(retriable_status(503));
        assert!(!retriable_status(401));
        assert!(!retriable_status(404));
    }
}
