use time::OffsetDateTime;

/// Decodes hex as found in node responses and build artifacts, the `0x` prefix is optional.
pub fn decode_hex(encoded: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits = encoded
        .strip_prefix("0x")
        .or_else(|| encoded.strip_prefix("0X"))
        .unwrap_or(encoded);

    hex::decode(digits)
}

pub fn encode_hex(data: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(data))
}

pub fn unix_timestamp() -> u64 {
    OffsetDateTime::now_utc().unix_timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_prefix_is_optional() {
        assert_eq!(decode_hex("0x0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert_eq!(decode_hex("0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert!(decode_hex("0xzz").is_err());
        assert_eq!(encode_hex([0xde, 0xad]), "0xdead");
    }
}
