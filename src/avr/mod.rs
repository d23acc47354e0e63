// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The avr module provides an [`AvrBundle`] envelope and an
//! [`AttestationVerificationReport`] object encapsulating the business logic
//! used to authenticate and validate an attestation verification report
//! before any of its claims may be trusted.
//!
//! # Example
//!
//! The following example assumes that `avr-bundle.cbor` holds a CBOR encoded
//! bundle captured from the attestation service and `roots.pem` the pinned
//! trust root pool.
//!
//! ```no_run
//! use chrono::{TimeZone, Utc};
//! use iasavr::avr::{self, AvrBundle};
//!
//! let raw = std::fs::read("avr-bundle.cbor").expect("reading AVR bundle");
//! let bundle = AvrBundle::from_cbor(&raw).expect("decoding AVR bundle");
//!
//! let pem = std::fs::read("roots.pem").expect("reading trust roots");
//! let roots = avr::trust_roots_from_pem(&pem).expect("parsing trust roots");
//!
//! // the reference time anchoring the certificate validity window,
//! // typically the report's own timestamp
//! let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
//!
//! let report = bundle.open(&roots, ts).expect("opening AVR bundle");
//!
//! println!("quote status: {:?}", report.isv_enclave_quote_status);
//! ```

pub use self::bundle::AvrBundle;
pub use self::errors::Error;
pub use self::report::AttestationVerificationReport;
pub use self::report::DecodeQuote;
pub use self::report::QUOTE_LEN;
pub use self::report::TIMESTAMP_FORMAT;
pub use self::status::CrlReason;
pub use self::status::IsvEnclaveQuoteStatus;
pub use self::status::PseManifestStatus;
pub use self::verify::trust_roots_from_pem;
pub use self::verify::unsafe_skip_verify;
pub use self::verify::verify_signature;

mod base64;
mod bundle;
mod errors;
mod report;
mod status;
mod verify;
