//! Best-effort JWT payload decoding for human display.
//!
//! Decodes the payload segment of a compact token so the profile page can
//! show what the provider put inside it. No signature verification happens
//! here; verified tokens come from the identity provider adapter. Decoding
//! failures never propagate — the result is always a printable string.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Placeholder for input that is not even token-shaped.
pub const INVALID_TOKEN: &str = "Invalid token";

/// Placeholder for a payload that fails base64, UTF-8, or JSON decoding.
pub const UNDECODABLE_TOKEN: &str = "Unable to decode token";

/// Decode the payload of a compact JWT into pretty-printed JSON.
///
/// Returns `"Invalid token"` when the input is blank or has no `.`
/// delimiter, and `"Unable to decode token"` when the payload segment
/// fails any decoding step.
pub fn decode_jwt(token: &str) -> String {
    if token.trim().is_empty() || !token.contains('.') {
        return INVALID_TOKEN.to_string();
    }

    decode_payload(token).unwrap_or_else(|| UNDECODABLE_TOKEN.to_string())
}

fn decode_payload(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = STANDARD.decode(pad_base64(payload)).ok()?;
    let text = std::str::from_utf8(&bytes).ok()?;
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

/// Pad a base64 segment to a multiple of four characters.
///
/// A remainder of one is never produced by an encoder, so it is passed
/// through unpadded and fails in the decode step.
fn pad_base64(segment: &str) -> String {
    match segment.len() % 4 {
        2 => format!("{segment}=="),
        3 => format!("{segment}="),
        _ => segment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};

    fn token_with_payload(payload: &str) -> String {
        format!("hdr.{}.sig", STANDARD_NO_PAD.encode(payload))
    }

    #[test]
    fn blank_input_is_invalid() {
        assert_eq!(decode_jwt(""), INVALID_TOKEN);
        assert_eq!(decode_jwt("   "), INVALID_TOKEN);
    }

    #[test]
    fn input_without_dot_is_invalid() {
        assert_eq!(decode_jwt("abc"), INVALID_TOKEN);
    }

    #[test]
    fn bad_base64_payload_is_undecodable() {
        assert_eq!(decode_jwt("aaa.!!!.ccc"), UNDECODABLE_TOKEN);
    }

    #[test]
    fn valid_payload_pretty_prints() {
        let token = token_with_payload(r#"{"sub":"123"}"#);
        assert!(decode_jwt(&token).contains("\"sub\": \"123\""));
    }

    #[test]
    fn output_indentation_is_stable() {
        let token = token_with_payload(r#"{"iss":"x"}"#);
        assert_eq!(decode_jwt(&token), "{\n  \"iss\": \"x\"\n}");
    }

    #[test]
    fn non_utf8_payload_is_undecodable() {
        let token = format!("hdr.{}.sig", STANDARD_NO_PAD.encode([0xff, 0xfe, 0x80]));
        assert_eq!(decode_jwt(&token), UNDECODABLE_TOKEN);
    }

    #[test]
    fn non_json_payload_is_undecodable() {
        assert_eq!(decode_jwt(&token_with_payload("not json")), UNDECODABLE_TOKEN);
    }

    #[test]
    fn payload_length_mod_four_of_one_is_undecodable() {
        // 5 characters: falls through unpadded and fails to decode.
        assert_eq!(decode_jwt("hdr.aaaaa.sig"), UNDECODABLE_TOKEN);
    }

    #[test]
    fn only_the_second_segment_is_decoded() {
        let payload = STANDARD_NO_PAD.encode(r#"{"iss":"x"}"#);
        let token = format!("first.{payload}.third.fourth");
        assert_eq!(decode_jwt(&token), "{\n  \"iss\": \"x\"\n}");
    }

    #[test]
    fn empty_payload_segment_is_undecodable() {
        assert_eq!(decode_jwt("hdr..sig"), UNDECODABLE_TOKEN);
    }

    #[test]
    fn standard_alphabet_symbols_decode() {
        // "???" encodes to "Pz8/", exercising the 63rd symbol.
        let encoded = STANDARD_NO_PAD.encode(r#"{"a":"???"}"#);
        assert!(encoded.contains('/'));
        let token = format!("hdr.{encoded}.sig");
        assert_eq!(decode_jwt(&token), "{\n  \"a\": \"???\"\n}");
    }

    #[test]
    fn url_safe_alphabet_symbols_are_undecodable() {
        // The same payload in the URL-safe alphabet ("Pz8_") is rejected.
        let encoded = URL_SAFE_NO_PAD.encode(r#"{"a":"???"}"#);
        assert!(encoded.contains('_'));
        let token = format!("hdr.{encoded}.sig");
        assert_eq!(decode_jwt(&token), UNDECODABLE_TOKEN);
    }

    #[test]
    fn padding_by_remainder() {
        assert_eq!(pad_base64("eyJp"), "eyJp");
        assert_eq!(pad_base64("eyJpc"), "eyJpc");
        assert_eq!(pad_base64("eyJpcw"), "eyJpcw==");
        assert_eq!(pad_base64("eyJpc3M"), "eyJpc3M=");
    }
}
