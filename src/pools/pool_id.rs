use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Pool identifier as published by the snapshot source.
///
/// Older pools are identified by their contract address, vault pools by a 32 byte id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PoolId {
    Address(Address),
    B256(B256),
}

impl PoolId {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            PoolId::Address(address) => address.as_slice(),
            PoolId::B256(id) => id.as_slice(),
        }
    }
}

impl Display for PoolId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolId::Address(address) => write!(f, "{address:#x}"),
            PoolId::B256(id) => write!(f, "{id:#x}"),
        }
    }
}

impl From<Address> for PoolId {
    fn from(address: Address) -> Self {
        PoolId::Address(address)
    }
}

impl From<B256> for PoolId {
    fn from(id: B256) -> Self {
        PoolId::B256(id)
    }
}
