//! TRON address handling (base58check, hex-41, validation, serde).

use crate::error::{AppError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::TryInto;
use std::fmt;
use std::str::FromStr;

pub const ADDRESS_HEX_PREFIX: u8 = 0x41;
pub const ADDRESS_BASE58_PREFIX: char = 'T';
pub const ADDRESS_HEX_LEN: usize = 42;
pub const ADDRESS_BYTES_LEN: usize = 21;
pub const ADDRESS_BASE58_LEN: usize = 34;

/// A TRON account or contract address: 21 bytes, 0x41 prefix + 20-byte
/// public-key hash. Both wire encodings (base58check `T...` and hex `41...`)
/// decode to the same payload; conversion between them is lossless.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TronAddress {
    inner: [u8; ADDRESS_BYTES_LEN],
}

impl TronAddress {
    /// Construct from a 20-byte public-key hash, prepending the 0x41 prefix.
    pub fn from_pubkey_hash(hash: &[u8; 20]) -> Self {
        let mut inner = [0u8; ADDRESS_BYTES_LEN];
        inner[0] = ADDRESS_HEX_PREFIX;
        inner[1..].copy_from_slice(hash);
        Self { inner }
    }

    fn from_base58(s: &str) -> Result<Self> {
        let data = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|_| AppError::InvalidAddress(s.to_string()))?;

        if data.len() != ADDRESS_BYTES_LEN || data[0] != ADDRESS_HEX_PREFIX {
            return Err(AppError::InvalidAddress(s.to_string()));
        }

        let inner = data
            .try_into()
            .map_err(|_| AppError::InvalidAddress(s.to_string()))?;
        Ok(Self { inner })
    }

    fn from_hex(s: &str) -> Result<Self> {
        let data = hex::decode(s).map_err(|_| AppError::InvalidAddress(s.to_string()))?;

        if data.len() != ADDRESS_BYTES_LEN || data[0] != ADDRESS_HEX_PREFIX {
            return Err(AppError::InvalidAddress(s.to_string()));
        }

        let inner = data
            .try_into()
            .map_err(|_| AppError::InvalidAddress(s.to_string()))?;
        Ok(Self { inner })
    }

    /// Parse either wire form. Input is trimmed first; anything that does not
    /// decode to a 0x41-prefixed 21-byte payload is rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();

        // Base58 form is case-sensitive per the alphabet; hex is not.
        if s.len() == ADDRESS_BASE58_LEN && s.starts_with(ADDRESS_BASE58_PREFIX) {
            return Self::from_base58(s);
        }
        if s.len() == ADDRESS_HEX_LEN && s.starts_with("41") {
            return Self::from_hex(s);
        }

        Err(AppError::InvalidAddress(input.trim().to_string()))
    }

    /// True iff the input parses as either wire form. Never fails.
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// Canonical user-facing form (base58check, `T...`).
    pub fn to_base58(&self) -> String {
        bs58::encode(self.inner).with_check().into_string()
    }

    /// Canonical node form (lowercase hex, `41...`).
    pub fn to_hex(&self) -> String {
        hex::encode(self.inner)
    }

    /// The 21-byte payload (0x41 + 20).
    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES_LEN] {
        &self.inner
    }

    /// The 20-byte public-key hash without the network prefix.
    pub fn pubkey_hash(&self) -> &[u8] {
        &self.inner[1..]
    }
}

/// Re-encode any valid input as base58, leaving base58 input unchanged.
pub fn to_base58_string(input: &str) -> Result<String> {
    Ok(TronAddress::parse(input)?.to_base58())
}

/// Re-encode any valid input as lowercase hex.
pub fn to_hex_string(input: &str) -> Result<String> {
    Ok(TronAddress::parse(input)?.to_hex())
}

impl fmt::Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TronAddress({} / {})", self.to_base58(), self.to_hex())
    }
}

impl FromStr for TronAddress {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TronAddress {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for TronAddress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<TronAddress, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TronAddress::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE58: &str = "TNPeeaaFB7K9cmo4uQpcU32zGK8G1NYqeL";
    const HEX: &str = "418840e6c55b9ada326d211d818c34a994aeced808";

    #[test]
    fn both_forms_decode_to_same_payload() {
        let a = TronAddress::parse(BASE58).unwrap();
        let b = TronAddress::parse(HEX).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_hex(), HEX);
        assert_eq!(b.to_base58(), BASE58);
    }

    #[test]
    fn round_trip_is_stable() {
        let hex1 = to_hex_string(BASE58).unwrap();
        let b58 = to_base58_string(&hex1).unwrap();
        let hex2 = to_hex_string(&b58).unwrap();
        assert_eq!(hex1, hex2);
        assert_eq!(b58, BASE58);
    }

    #[test]
    fn hex_input_is_case_insensitive() {
        let upper = HEX.to_ascii_uppercase();
        let addr = TronAddress::parse(&upper).unwrap();
        assert_eq!(addr.to_hex(), HEX);
    }

    #[test]
    fn input_is_trimmed() {
        let addr = TronAddress::parse(&format!("  {}  ", BASE58)).unwrap();
        assert_eq!(addr.to_base58(), BASE58);
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in [
            "",
            "   ",
            "foo",
            "0xdeadbeef",
            // wrong prefix byte, right length
            "428840e6c55b9ada326d211d818c34a994aeced808",
            // one hex digit short
            "418840e6c55b9ada326d211d818c34a994aeced80",
        ] {
            assert!(!TronAddress::is_valid(bad), "accepted {:?}", bad);
            assert!(to_base58_string(bad).is_err());
            assert!(to_hex_string(bad).is_err());
        }
    }

    #[test]
    fn checksum_detects_any_payload_corruption() {
        let raw = bs58::decode(BASE58).into_vec().unwrap();
        for i in 0..ADDRESS_BYTES_LEN {
            let mut corrupted = raw.clone();
            corrupted[i] ^= 0x01;
            let reencoded = bs58::encode(corrupted).into_string();
            assert!(
                !TronAddress::is_valid(&reencoded),
                "corruption at byte {} went undetected",
                i
            );
        }
    }

    #[test]
    fn serde_uses_base58() {
        let addr = TronAddress::parse(HEX).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", BASE58));
        let back: TronAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
