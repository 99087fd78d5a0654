use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid account address: {0}")]
    Address(String),
    #[error("invalid chain id: {0}")]
    ChainId(String),
}

/// Wallet account address, normalized to lowercase hex at construction.
///
/// Two addresses differing only in checksum casing compare equal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AccountAddress(String);

impl AccountAddress {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| ParseError::Address(format!("missing 0x prefix: {trimmed}")))?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseError::Address(format!(
                "expected 40 hex characters: {trimmed}"
            )));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 20 address bytes.
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0_u8; 20];
        let hex = &self.0[2..];
        for (index, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let high = hex_nibble(chunk[0]);
            let low = hex_nibble(chunk[1]);
            out[index] = (high << 4) | low;
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; 20]) -> Self {
        let mut hex = String::with_capacity(42);
        hex.push_str("0x");
        for byte in bytes {
            hex.push_str(&format!("{byte:02x}"));
        }
        Self(hex)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hex_nibble(ascii: u8) -> u8 {
    match ascii {
        b'0'..=b'9' => ascii - b'0',
        b'a'..=b'f' => ascii - b'a' + 10,
        b'A'..=b'F' => ascii - b'A' + 10,
        _ => 0,
    }
}

/// Numeric chain id. Wallets report these either as decimal numbers or
/// 0x-prefixed hex strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim();
        let value = if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            u64::from_str_radix(hex, 16)
        } else {
            trimmed.parse()
        };
        value
            .map(Self)
            .map_err(|err| ParseError::ChainId(format!("{trimmed}: {err}")))
    }

    pub fn as_hex(&self) -> String {
        format!("0x{:x}", self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable error classification surfaced to consumers. The UI maps these
/// short strings to localized text; raw provider payloads stay in the logs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoWalletFound,
    UserRejected,
    AlreadyPending,
    SigningUnavailable,
    NetworkUnknownToWallet,
    RpcUnavailable,
    RoleResolutionFailed,
    TransactionFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoWalletFound => "no_wallet_found",
            ErrorKind::UserRejected => "user_rejected",
            ErrorKind::AlreadyPending => "already_pending",
            ErrorKind::SigningUnavailable => "signing_unavailable",
            ErrorKind::NetworkUnknownToWallet => "network_unknown_to_wallet",
            ErrorKind::RpcUnavailable => "rpc_unavailable",
            ErrorKind::RoleResolutionFailed => "role_resolution_failed",
            ErrorKind::TransactionFailed => "transaction_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Published view of the connection. `account` and `chain_id` are both
/// present iff `status` is `Connected`; the role flags are `false` whenever
/// the session is not connected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ConnectionSnapshot {
    pub status: ConnectionStatus,
    pub account: Option<AccountAddress>,
    pub chain_id: Option<ChainId>,
    pub is_admin: bool,
    pub is_seller: bool,
    pub last_error: Option<ErrorKind>,
    pub persist_intent: bool,
}

impl ConnectionSnapshot {
    pub fn is_connected(&self) -> bool {
        matches!(self.status, ConnectionStatus::Connected)
    }
}

/// Outcome of a network-switch request. Adding an unknown network to the
/// wallet is a UI decision, so the unknown case is reported, not handled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SwitchOutcome {
    Switched,
    NetworkUnknownToWallet,
    Failed,
}

/// Shorten an address for display: `0x1234abcd…ef01`.
pub fn short_address(address: &str) -> String {
    if address.len() <= 14 {
        return address.to_owned();
    }
    format!("{}…{}", &address[..10], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parse_normalizes_case() {
        let mixed = AccountAddress::parse("0xAbCdEf0123456789abcdef0123456789ABCDEF01").unwrap();
        let lower = AccountAddress::parse("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        assert_eq!(mixed, lower);
        assert_eq!(mixed.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn address_parse_rejects_bad_input() {
        assert!(AccountAddress::parse("abcdef0123456789abcdef0123456789abcdef01").is_err());
        assert!(AccountAddress::parse("0x1234").is_err());
        assert!(AccountAddress::parse("0xzzcdef0123456789abcdef0123456789abcdef01").is_err());
    }

    #[test]
    fn address_byte_roundtrip() {
        let address = AccountAddress::parse("0x00ff00ff00ff00ff00ff00ff00ff00ff00ff00ff").unwrap();
        assert_eq!(AccountAddress::from_bytes(&address.to_bytes()), address);
    }

    #[test]
    fn chain_id_parses_decimal_and_hex() {
        assert_eq!(ChainId::parse("17000").unwrap(), ChainId(17000));
        assert_eq!(ChainId::parse("0x4268").unwrap(), ChainId(17000));
        assert_eq!(ChainId(17000).as_hex(), "0x4268");
        assert!(ChainId::parse("not-a-chain").is_err());
    }

    #[test]
    fn short_address_keeps_ends() {
        let shortened = short_address("0xabcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(shortened, "0xabcdef01…ef01");
        assert_eq!(short_address("0x1234"), "0x1234");
    }
}
