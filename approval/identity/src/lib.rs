// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT

mod credentials;
mod errors;
mod memory;
mod persistent;
mod signer;

pub use credentials::*;
pub use errors::*;
pub use memory::MemoryCredentialStore;
pub use persistent::PersistentCredentialStore;
pub use signer::*;

pub use rsa::{RsaPrivateKey, RsaPublicKey};
