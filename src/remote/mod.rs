//! The Cryptopus password manager, reached over its JSON:API.

mod client;

pub use client::CryptopusClient;
