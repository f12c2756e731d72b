use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Decode a listing page body to UTF-8.
///
/// Tries BOM, then the Content-Type charset, then chardetng detection. Malformed
/// sequences become U+FFFD: identifiers live in ASCII markup, so a lossy decode is
/// preferred over rejecting the page.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| {
            content_type
                .and_then(charset_label)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or_else(|| {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        });

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']).to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn honours_content_type_charset() {
        let bytes = b"caf\xe9";
        assert_eq!(
            decode_page(bytes, Some("text/html; charset=\"ISO-8859-1\"")),
            "café"
        );
    }

    #[test]
    fn bom_wins_over_header() {
        let bytes = b"\xEF\xBB\xBFok";
        assert_eq!(decode_page(bytes, Some("text/html; charset=utf-16")), "ok");
    }

    #[test]
    fn plain_ascii_without_hints() {
        assert_eq!(decode_page(b"<a href=\"/x\">", None), "<a href=\"/x\">");
    }
}
