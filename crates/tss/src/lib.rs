//! The threshold-signature capability used to sign outbound transactions.
//!
//! The signer only ever asks for signatures over precomputed digests. The threshold protocol
//! itself lives outside this process; [`LocalTssSigner`] stands in for it on development
//! networks and in tests.

mod errors;
mod local;
mod signer;

pub use errors::TssError;
pub use local::LocalTssSigner;
pub use signer::{p2wpkh_address, pubkey_hex, to_ecdsa_signature, TssSigner};
