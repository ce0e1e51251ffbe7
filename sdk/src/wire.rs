//! # Wire Codecs
//!
//! The payment API speaks flat XML: a single `<xml>` root whose children are
//! leaf elements, one per field. The login API speaks URL query strings on the
//! way out and JSON on the way back. This module converts between those
//! shapes and [`SigningRecord`]; JSON is left to `serde_json` at the call
//! sites.
//!
//! Parsing keeps every field it sees, modelled or not, because signatures on
//! received messages cover all of them.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::crypto::SigningRecord;
use crate::error::{Result, SdkError};

/// Name of the document root element.
const ROOT: &str = "xml";

/// Render `record` as a flat `<xml>` document. Text is entity-escaped.
pub fn to_xml(record: &SigningRecord) -> String {
    let mut out = String::with_capacity(32 * record.len() + 16);
    out.push('<');
    out.push_str(ROOT);
    out.push('>');
    for (name, value) in record.iter() {
        out.push('<');
        out.push_str(name);
        out.push('>');
        out.push_str(&escape(value));
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
    out.push_str("</");
    out.push_str(ROOT);
    out.push('>');
    out
}

/// Parse a flat XML document into a record.
///
/// Text and CDATA content are both accepted and kept byte-for-byte: field
/// values are signed as received, so nothing is trimmed. Whitespace between
/// elements is ignored. Nested elements below a field, a repeated field, a
/// missing root, anything after the root, or broken markup are
/// [`SdkError::MalformedPayload`].
pub fn from_xml(input: &str) -> Result<SigningRecord> {
    let mut reader = Reader::from_str(input);

    let mut record = SigningRecord::new();
    let mut depth = 0usize;
    let mut field: Option<(String, String)> = None;
    let mut saw_root = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(format!("xml at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(e) => {
                depth += 1;
                match depth {
                    1 if saw_root => return Err(malformed("content after the xml root")),
                    1 => saw_root = true,
                    2 => field = Some((element_name(e.name().as_ref())?, String::new())),
                    _ => return Err(malformed("nested element in flat xml")),
                }
            }
            Event::Empty(e) => match depth {
                1 => insert_field(&mut record, element_name(e.name().as_ref())?, String::new())?,
                0 if saw_root => return Err(malformed("content after the xml root")),
                0 => saw_root = true,
                _ => return Err(malformed("nested element in flat xml")),
            },
            Event::Text(t) => {
                if let Some((_, value)) = field.as_mut() {
                    let text = t.unescape().map_err(|e| malformed(format!("xml text: {e}")))?;
                    value.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some((_, value)) = field.as_mut() {
                    let raw = c.into_inner();
                    let text = std::str::from_utf8(&raw)
                        .map_err(|_| malformed("cdata is not utf-8"))?;
                    value.push_str(text);
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let Some((name, value)) = field.take() {
                        insert_field(&mut record, name, value)?;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            // Declarations, comments and processing instructions carry no fields.
            _ => {}
        }
    }

    if !saw_root {
        return Err(malformed("empty xml document"));
    }
    if depth != 0 {
        return Err(malformed("unterminated xml document"));
    }
    Ok(record)
}

fn insert_field(record: &mut SigningRecord, name: String, value: String) -> Result<()> {
    if record.get(&name).is_some() {
        return Err(malformed(format!("field {name} appears twice")));
    }
    record.insert(name, value);
    Ok(())
}

/// Parse response bytes as UTF-8 flat XML.
pub fn from_xml_bytes(input: &[u8]) -> Result<SigningRecord> {
    let text = std::str::from_utf8(input).map_err(|_| malformed("response is not utf-8"))?;
    from_xml(text)
}

/// Percent-encode `params` as `a=1&b=2`, in the order given.
pub fn encode_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(name, value)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Append `params` to `base` as a query string.
pub fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}{}", encode_query(params))
}

fn element_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|_| malformed("element name is not utf-8"))
}

fn malformed(msg: impl Into<String>) -> SdkError {
    SdkError::MalformedPayload(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIFIED_ORDER_REPLY: &str = r#"<xml>
   <return_code><![CDATA[SUCCESS]]></return_code>
   <return_msg><![CDATA[OK]]></return_msg>
   <appid><![CDATA[wx2421b1c4370ec43b]]></appid>
   <mch_id><![CDATA[10000100]]></mch_id>
   <nonce_str><![CDATA[IITRi8Iabbblz1Jc]]></nonce_str>
   <sign><![CDATA[7921E432F65EB8ED0CE9755F0E86D72F]]></sign>
   <result_code><![CDATA[SUCCESS]]></result_code>
   <prepay_id><![CDATA[wx201411101639507cbf6ffd8b0779950874]]></prepay_id>
   <trade_type><![CDATA[APP]]></trade_type>
</xml>"#;

    #[test]
    fn test_parse_cdata_document() {
        let r = from_xml(UNIFIED_ORDER_REPLY).unwrap();
        assert_eq!(r.len(), 9);
        assert_eq!(r.get("return_code"), Some("SUCCESS"));
        assert_eq!(r.get("prepay_id"), Some("wx201411101639507cbf6ffd8b0779950874"));
        assert_eq!(r.signature(), Some("7921E432F65EB8ED0CE9755F0E86D72F"));
    }

    #[test]
    fn test_parse_plain_text_and_entities() {
        let r = from_xml("<xml><total_fee>100</total_fee><attach>a&amp;b</attach><x/></xml>").unwrap();
        assert_eq!(r.get("total_fee"), Some("100"));
        assert_eq!(r.get("attach"), Some("a&b"));
        assert_eq!(r.get("x"), Some(""));
    }

    #[test]
    fn test_parse_keeps_declaration_out() {
        let r = from_xml(r#"<?xml version="1.0" encoding="UTF-8"?><xml><a>1</a></xml>"#).unwrap();
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_render_escapes_and_round_trips() {
        let record = SigningRecord::new()
            .with("body", "Tea <large> & \"hot\"")
            .with("total_fee", 100);
        let xml = to_xml(&record);
        assert!(xml.starts_with("<xml><body>Tea &lt;large&gt; &amp; "));
        assert_eq!(from_xml(&xml).unwrap(), record);
    }

    #[test]
    fn test_rejects_malformed_documents() {
        for bad in [
            "",
            "not xml",
            "<xml><a><b>1</b></a></xml>",
            "<xml><a>1</a>",
            "<xml><a>1</b></xml>",
            "<xml><a>1</a><a>2</a></xml>",
            "<xml><a/><a>2</a></xml>",
            "<xml><a>1</a></xml><b>2</b>",
            "<xml><a>1</a></xml><xml/>",
        ] {
            assert!(
                matches!(from_xml(bad), Err(SdkError::MalformedPayload(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_field_whitespace_is_preserved() {
        let r = from_xml("<xml>\n  <attach> store 42 </attach>\n  <body><![CDATA[ tea ]]></body>\n</xml>\n")
            .unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r.get("attach"), Some(" store 42 "));
        assert_eq!(r.get("body"), Some(" tea "));
    }

    #[test]
    fn test_signed_record_with_padded_value_verifies_after_parsing() {
        use crate::crypto::{attach_signature, verify_record, SignType};

        let mut record = SigningRecord::new()
            .with("appid", "wx1")
            .with("attach", " store 42 ")
            .with("total_fee", 100);
        attach_signature(&mut record, "key123", SignType::Md5).unwrap();

        let parsed = from_xml(&to_xml(&record)).unwrap();
        assert_eq!(parsed, record);
        assert!(verify_record(&parsed, "key123", SignType::Md5).is_ok());
    }

    #[test]
    fn test_rejects_non_utf8_bytes() {
        assert!(from_xml_bytes(&[0x3c, 0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_query_encoding() {
        assert_eq!(
            encode_query(&[("appid", "wx1"), ("code", "a b&c"), ("grant_type", "authorization_code")]),
            "appid=wx1&code=a%20b%26c&grant_type=authorization_code"
        );
        assert_eq!(with_query("https://h/p", &[("a", "1")]), "https://h/p?a=1");
        assert_eq!(with_query("https://h/p?x=0", &[("a", "1")]), "https://h/p?x=0&a=1");
    }
}
