#![deny(missing_docs, unsafe_code)]

//! Crate for common types shared between the `unionpay` runtime crate and the
//! `unionpay` command line tool.

pub mod abiext;
pub mod bytecode;
pub mod descriptor;
pub mod errors;
pub mod hash;

pub use crate::abiext::{EventExt, FunctionExt};
pub use crate::bytecode::Bytecode;
pub use crate::descriptor::{ContractDescriptor, DeploymentInformation};
pub use ethabi::{self as abi, Contract as Abi};
pub use web3::types::Address;
pub use web3::types::H256 as TransactionHash;
