// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Intel SGX IAS attestation verification report decoding and validation.
//!
//! This crate provides an API to authenticate and validate Attestation
//! Verification Reports (AVRs) produced by the Intel Attestation Service, so
//! that a relying party can establish trust in a remote SGX enclave.
//!
//! The API allows:
//! * Decoding a CBOR-encoded AVR bundle (report body, certificate chain and
//!   signature)
//! * Cryptographically verifying the report's certificate chain against a
//!   pinned trust root pool and its RSA signature over the report body
//! * Validating the decoded report's fields against the service's
//!   consistency rules before any claim is exposed to the caller

pub mod avr;
