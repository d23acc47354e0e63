// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use openssl::error::ErrorStack;

#[derive(thiserror::Error)]
pub enum Error {
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Certificate parse error: {0}")]
    CertParse(String),
    #[error("Unexpected certificate chain length: {0}")]
    ChainLength(usize),
    #[error("Certificate chain verification failed: {0}")]
    ChainVerification(String),
    #[error("Unexpected root in certificate chain")]
    UntrustedRoot,
    #[error("Report signature verification failed")]
    SignatureInvalid,
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unknown status: {0}")]
    UnknownStatus(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Crypto error: {0}")]
    Crypto(#[from] ErrorStack),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}
