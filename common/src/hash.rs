//! Keccak256 hash utilities.

use tiny_keccak::{Hasher, Keccak};
use web3::types::H256;

/// A 32-bit prefix of a standard 256-bit Keccak hash.
///
/// This 32-bit prefix is generally used as the first 4 bytes of transaction
/// data in order to select which Solidity method will be called.
pub type H32 = [u8; 4];

/// Perform a Keccak256 hash of data and return its 32-byte result.
pub fn keccak256<B>(data: B) -> [u8; 32]
where
    B: AsRef<[u8]>,
{
    let mut output = [0u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(data.as_ref());
    hasher.finalize(&mut output);
    output
}

/// Calculate the function selector as defined by the contract ABI. This
/// is definied as the first 4 bytes of the Keccak256 hash of the function
/// signature.
pub fn function_selector<S>(signature: S) -> H32
where
    S: AsRef<str>,
{
    let hash = keccak256(signature.as_ref());
    let mut selector = H32::default();
    selector.copy_from_slice(&hash[0..4]);
    selector
}

/// Calculate the topic hash of an event signature such as
/// `Transfer(address,address,uint256)`. Logs emitted by non-anonymous events
/// carry this value as their first topic.
pub fn topic_hash<S>(signature: S) -> H256
where
    S: AsRef<str>,
{
    H256(keccak256(signature.as_ref()))
}
