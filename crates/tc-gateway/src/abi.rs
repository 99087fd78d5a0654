//! Minimal ABI codec for the registry method set: 4-byte keccak selectors,
//! 32-byte words for static values, offset/length/payload layout for
//! strings. Covers exactly the types the fixed method list uses.

use crate::GatewayError;
use tc_api_types::AccountAddress;
use tc_crypto::keccak256;

const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(AccountAddress),
    Uint(u128),
    Bool(bool),
    Str(String),
}

/// First four bytes of the keccak-256 of the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

pub fn encode_call(selector: [u8; 4], args: &[AbiValue]) -> Vec<u8> {
    let mut out = selector.to_vec();
    out.extend(encode_arguments(args));
    out
}

/// Head/tail encoding: static values inline, dynamic values as an offset
/// word pointing into the tail section.
pub fn encode_arguments(args: &[AbiValue]) -> Vec<u8> {
    let head_size = args.len() * WORD;
    let mut head = Vec::with_capacity(head_size);
    let mut tail: Vec<u8> = Vec::new();

    for arg in args {
        match arg {
            AbiValue::Address(address) => head.extend_from_slice(&address_word(address)),
            AbiValue::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            AbiValue::Bool(flag) => head.extend_from_slice(&uint_word(u128::from(*flag))),
            AbiValue::Str(text) => {
                head.extend_from_slice(&uint_word((head_size + tail.len()) as u128));
                let bytes = text.as_bytes();
                tail.extend_from_slice(&uint_word(bytes.len() as u128));
                tail.extend_from_slice(bytes);
                tail.resize(tail.len() + padding(bytes.len()), 0);
            }
        }
    }

    head.extend(tail);
    head
}

fn padding(len: usize) -> usize {
    (WORD - len % WORD) % WORD
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0_u8; WORD];
    word[WORD - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: &AccountAddress) -> [u8; WORD] {
    let mut word = [0_u8; WORD];
    word[12..].copy_from_slice(&address.to_bytes());
    word
}

fn word_at(data: &[u8], index: usize) -> Result<&[u8], GatewayError> {
    let start = index * WORD;
    data.get(start..start + WORD)
        .ok_or_else(|| GatewayError::Decode(format!("missing word {index} in {}-byte payload", data.len())))
}

/// Decode a single address return value.
pub fn decode_address(data: &[u8]) -> Result<AccountAddress, GatewayError> {
    decode_address_arg(data, 0)
}

/// Decode a single bool return value.
pub fn decode_bool(data: &[u8]) -> Result<bool, GatewayError> {
    decode_bool_arg(data, 0)
}

pub fn decode_uint(data: &[u8]) -> Result<u128, GatewayError> {
    let word = word_at(data, 0)?;
    if word[..WORD - 16].iter().any(|byte| *byte != 0) {
        return Err(GatewayError::Decode("uint overflows u128".to_owned()));
    }
    let mut bytes = [0_u8; 16];
    bytes.copy_from_slice(&word[WORD - 16..]);
    Ok(u128::from_be_bytes(bytes))
}

/// Decode the address argument at word `index` of an argument section.
pub fn decode_address_arg(data: &[u8], index: usize) -> Result<AccountAddress, GatewayError> {
    let word = word_at(data, index)?;
    if word[..12].iter().any(|byte| *byte != 0) {
        return Err(GatewayError::Decode("address word has nonzero padding".to_owned()));
    }
    let mut bytes = [0_u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Ok(AccountAddress::from_bytes(&bytes))
}

pub fn decode_bool_arg(data: &[u8], index: usize) -> Result<bool, GatewayError> {
    let word = word_at(data, index)?;
    Ok(word.iter().any(|byte| *byte != 0))
}

/// Decode the string argument whose offset word sits at `index`.
pub fn decode_string_arg(data: &[u8], index: usize) -> Result<String, GatewayError> {
    let offset_word = word_at(data, index)?;
    let offset = be_usize(offset_word)?;
    let len_word = data
        .get(offset..offset + WORD)
        .ok_or_else(|| GatewayError::Decode(format!("string offset {offset} out of range")))?;
    let len = be_usize(len_word)?;
    let payload = data
        .get(offset + WORD..offset + WORD + len)
        .ok_or_else(|| GatewayError::Decode(format!("string length {len} out of range")))?;
    String::from_utf8(payload.to_vec())
        .map_err(|err| GatewayError::Decode(format!("string is not utf-8: {err}")))
}

fn be_usize(word: &[u8]) -> Result<usize, GatewayError> {
    if word[..WORD - 8].iter().any(|byte| *byte != 0) {
        return Err(GatewayError::Decode("quantity overflows usize".to_owned()));
    }
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(bytes) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_known_vector() {
        // keccak256("transfer(address,uint256)") starts with a9059cbb.
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn uint_and_bool_encode_right_aligned() {
        let encoded = encode_arguments(&[AbiValue::Uint(1), AbiValue::Bool(true)]);
        assert_eq!(encoded.len(), 64);
        assert_eq!(encoded[31], 1);
        assert_eq!(encoded[63], 1);
        assert!(encoded[..31].iter().all(|byte| *byte == 0));

        assert_eq!(decode_uint(&encoded).unwrap(), 1);
        assert!(decode_bool_arg(&encoded, 1).unwrap());
    }

    #[test]
    fn string_layout_offset_length_payload() {
        let encoded = encode_arguments(&[AbiValue::Str("abc".to_owned())]);
        assert_eq!(encoded.len(), 96);
        // Offset word points just past the one-word head section.
        assert_eq!(decode_uint(&encoded[..32]).unwrap(), 32);
        assert_eq!(decode_uint(&encoded[32..64]).unwrap(), 3);
        assert_eq!(&encoded[64..67], b"abc");
        assert!(encoded[67..].iter().all(|byte| *byte == 0));

        assert_eq!(decode_string_arg(&encoded, 0).unwrap(), "abc");
    }

    #[test]
    fn mixed_static_and_dynamic_arguments() {
        let address =
            AccountAddress::parse("0x00000000000000000000000000000000000000aa").unwrap();
        let encoded = encode_arguments(&[
            AbiValue::Str("serial-1".to_owned()),
            AbiValue::Address(address.clone()),
        ]);
        // Two head words then the string tail.
        assert_eq!(decode_uint(&encoded[..32]).unwrap(), 64);
        assert_eq!(decode_address_arg(&encoded, 1).unwrap(), address);
        assert_eq!(decode_string_arg(&encoded, 0).unwrap(), "serial-1");
    }

    #[test]
    fn address_roundtrip_through_word() {
        let address =
            AccountAddress::parse("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        let encoded = encode_arguments(&[AbiValue::Address(address.clone())]);
        assert_eq!(decode_address(&encoded).unwrap(), address);
    }

    #[test]
    fn truncated_payloads_are_rejected() {
        assert!(decode_address(&[0_u8; 16]).is_err());
        assert!(decode_string_arg(&encode_arguments(&[AbiValue::Uint(4096)]), 0).is_err());
    }
}
