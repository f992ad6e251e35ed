//! Typed 20-byte identifiers
//!
//! Account addresses (liquidity providers, pools, fee sinks) and token contract
//! addresses are distinct types so a token can never be passed where a holder is
//! expected. Both render and parse as `0x`-prefixed lowercase hex, which is also
//! their serde form in configuration files.

use crate::common::errors::ValidationError;

/// Macro for generating zero-cost typed 20-byte address wrappers
///
/// # Examples
///
/// ```rust
/// use types::define_typed_address;
///
/// define_typed_address!(
///     /// Router contract address
///     RouterAddress
/// );
///
/// let router: RouterAddress = "0x00000000000000000000000000000000000000aa".parse().unwrap();
/// assert_eq!(router.to_string(), "0x00000000000000000000000000000000000000aa");
/// ```
#[macro_export]
macro_rules! define_typed_address {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(pub [u8; 20]);

        impl $name {
            /// Create a new typed wrapper
            #[inline(always)]
            pub const fn new(inner: [u8; 20]) -> Self {
                Self(inner)
            }

            /// Address with every byte set to `byte`
            #[inline(always)]
            pub const fn repeat_byte(byte: u8) -> Self {
                Self([byte; 20])
            }

            #[inline(always)]
            pub const fn as_bytes(&self) -> &[u8; 20] {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "0x{}", $crate::hex::encode(self.0))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $crate::common::identifiers::parse_address_bytes(s).map(Self)
            }
        }

        impl From<[u8; 20]> for $name {
            #[inline(always)]
            fn from(inner: [u8; 20]) -> Self {
                Self(inner)
            }
        }

        impl From<$name> for [u8; 20] {
            #[inline(always)]
            fn from(wrapper: $name) -> [u8; 20] {
                wrapper.0
            }
        }

        impl $crate::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: $crate::serde::Serializer,
            {
                serializer.collect_str(self)
            }
        }

        impl<'de> $crate::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: $crate::serde::Deserializer<'de>,
            {
                let raw = <String as $crate::serde::Deserialize>::deserialize(deserializer)?;
                raw.parse().map_err($crate::serde::de::Error::custom)
            }
        }
    };
}

/// Parse `0x` + 40 hex characters into raw address bytes
pub fn parse_address_bytes(input: &str) -> Result<[u8; 20], ValidationError> {
    let invalid = || ValidationError::InvalidAddress {
        input: input.to_string(),
    };
    let digits = input.strip_prefix("0x").ok_or_else(invalid)?;
    let mut bytes = [0u8; 20];
    hex::decode_to_slice(digits, &mut bytes).map_err(|_| invalid())?;
    Ok(bytes)
}

define_typed_address!(
    /// Account address: liquidity providers, traders, pools and fee sinks
    Address
);

define_typed_address!(
    /// Token contract address
    ///
    /// Kept apart from [`Address`] so token identities and holders cannot be
    /// swapped at a call site.
    TokenAddress
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_round_trip_display() {
        let raw = "0x2791bca1f2de4661ed88a30c99a7a9449aa84174";
        let token: TokenAddress = raw.parse().unwrap();
        assert_eq!(token.to_string(), raw);
        assert_eq!(token.as_bytes()[0], 0x27);
    }

    #[test]
    fn test_address_parse_rejects_malformed() {
        assert!("2791bca1f2de4661ed88a30c99a7a9449aa84174".parse::<Address>().is_err());
        assert!("0x2791".parse::<Address>().is_err());
        assert!("0xzz91bca1f2de4661ed88a30c99a7a9449aa84174"
            .parse::<Address>()
            .is_err());
    }

    #[test]
    fn test_address_serde_as_hex_string() {
        let addr = Address::repeat_byte(0xab);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0xabababababababababababababababababababab\"");

        let recovered: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered, addr);
    }

    #[test]
    fn test_typed_addresses_are_distinct() {
        fn holder(_: Address) -> &'static str {
            "holder"
        }
        let account = Address::from([1u8; 20]);
        let token = TokenAddress::from([1u8; 20]);
        assert_eq!(holder(account), "holder");
        // holder(token) would not compile
        assert_eq!(account.as_bytes(), token.as_bytes());
    }
}
