use alloy_primitives::{B256, hex};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};

/// Stable identity of a path: sha256 over its tokens and pool ids.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwapPathHash(pub B256);

impl SwapPathHash {
    /// First four bytes, enough to tell paths apart in logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl Display for SwapPathHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for SwapPathHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SwapPathHash({})", self.short())
    }
}

impl From<[u8; 32]> for SwapPathHash {
    fn from(hash: [u8; 32]) -> Self {
        SwapPathHash(B256::from(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_hex() -> eyre::Result<()> {
        let hash = SwapPathHash::from([0xab; 32]);
        let serialized = serde_json::to_string(&hash)?;
        assert_eq!(serialized, format!("\"0x{}\"", "ab".repeat(32)));
        assert_eq!(serde_json::from_str::<SwapPathHash>(&serialized)?, hash);
        assert!(serde_json::from_str::<SwapPathHash>("\"0x0102\"").is_err());
        assert_eq!(hash.short(), "abababab");
        Ok(())
    }
}
