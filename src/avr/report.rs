// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::base64;
use super::errors::Error;
use super::status::{CrlReason, IsvEnclaveQuoteStatus, PseManifestStatus};
use super::verify;
use chrono::{DateTime, NaiveDateTime, Utc};
use openssl::x509::X509;
use serde::{Deserialize, Serialize};

/// Length in bytes of the quote structure embedded in a report.
pub const QUOTE_LEN: usize = 432;

/// Format of the report timestamp, suitable for use with
/// `chrono::NaiveDateTime::parse_from_str`.  The fractional part is optional
/// and at most nine digits.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const PSE_MANIFEST_HASH_LEN: usize = 32;
const EPID_PSEUDONYM_LEN: usize = 64 + 64;
const NONCE_MAX_LEN: usize = 32;

/// Decoder for the binary quote structure carried in a report.  The quote
/// format is owned by the caller; this crate validates only its length.
pub trait DecodeQuote {
    type Quote;
    type Error;

    fn decode_quote(&self, body: &[u8]) -> Result<Self::Quote, Self::Error>;
}

/// A decoded and validated attestation verification report.
///
/// Values of this type are only ever produced by
/// [`AttestationVerificationReport::decode`] (or
/// [`AvrBundle::open`](super::AvrBundle::open)), so holding one implies the
/// report passed signature verification (unless explicitly disabled) and the
/// full field consistency policy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttestationVerificationReport {
    pub id: String,
    pub timestamp: String,
    pub version: u32,
    pub isv_enclave_quote_status: IsvEnclaveQuoteStatus,
    #[serde(with = "base64")]
    pub isv_enclave_quote_body: Vec<u8>,
    pub revocation_reason: Option<CrlReason>,
    pub pse_manifest_status: Option<PseManifestStatus>,
    pub pse_manifest_hash: String,
    pub platform_info_blob: String,
    pub nonce: String,
    #[serde(with = "base64")]
    pub epid_pseudonym: Vec<u8>,
}

impl AttestationVerificationReport {
    /// Decode and validate an attestation verification report.
    ///
    /// Unless verification has been disabled with
    /// [`unsafe_skip_verify`](super::unsafe_skip_verify), the certificate
    /// chain and report signature are checked first; `data` is then parsed
    /// as JSON and the field consistency policy applied.  There is no
    /// partially valid result: either every check passes or an error is
    /// returned.
    pub fn decode(
        data: &[u8],
        encoded_signature: &[u8],
        encoded_cert_chain: &[u8],
        trust_roots: &[X509],
        ts: DateTime<Utc>,
    ) -> Result<Self, Error> {
        if !verify::skip_verify() {
            verify::verify_signature(data, encoded_signature, encoded_cert_chain, trust_roots, ts)?;
        }

        // The quote status field deserializes on top of the `FieldMissing`
        // default, so a status absent from the JSON is detectable below.
        let avr: Self =
            serde_json::from_slice(data).map_err(|e| Error::Decode(e.to_string()))?;

        avr.validate()?;

        Ok(avr)
    }

    /// Raw bytes of the enclave quote component.
    pub fn quote_body(&self) -> &[u8] {
        &self.isv_enclave_quote_body
    }

    /// Hand the enclave quote component to `decoder`.
    pub fn quote<D: DecodeQuote>(&self, decoder: &D) -> Result<D::Quote, D::Error> {
        decoder.decode_quote(&self.isv_enclave_quote_body)
    }

    /// The report timestamp parsed under [`TIMESTAMP_FORMAT`].
    pub fn parsed_timestamp(&self) -> Result<NaiveDateTime, Error> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| Error::Validation(format!("invalid timestamp: {e}")))
    }

    fn validate(&self) -> Result<(), Error> {
        if NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT).is_err() {
            return Err(Error::Validation(format!(
                "invalid timestamp: '{}'",
                self.timestamp
            )));
        }

        // TODO: enforce version once version 3 test vectors are available.

        if self.isv_enclave_quote_status == IsvEnclaveQuoteStatus::FieldMissing {
            return Err(Error::Validation(
                "missing isvEnclaveQuoteStatus".to_string(),
            ));
        }

        match self.isv_enclave_quote_body.len() {
            0 | QUOTE_LEN => (),
            _ => {
                return Err(Error::Validation(
                    "invalid isvEnclaveQuoteBody length".to_string(),
                ))
            }
        }

        if self.isv_enclave_quote_status == IsvEnclaveQuoteStatus::GroupRevoked {
            if self.revocation_reason.is_none() {
                return Err(Error::Validation("missing revocationReason".to_string()));
            }
        } else if self.revocation_reason.is_some() {
            return Err(Error::Validation(
                "unexpected revocationReason for quote status".to_string(),
            ));
        }

        if self.pse_manifest_status.is_some() {
            match self.isv_enclave_quote_status {
                IsvEnclaveQuoteStatus::Ok
                | IsvEnclaveQuoteStatus::GroupOutOfDate
                | IsvEnclaveQuoteStatus::ConfigurationNeeded => (),
                _ => return Err(Error::Validation("unexpected pseManifestStatus".to_string())),
            }
        }

        let pse_hash = hex::decode(&self.pse_manifest_hash)
            .map_err(|e| Error::Encoding(format!("failed to decode pseManifestHash: {e}")))?;
        match pse_hash.len() {
            0 | PSE_MANIFEST_HASH_LEN => (),
            _ => {
                return Err(Error::Validation(
                    "invalid pseManifestHash length".to_string(),
                ))
            }
        }

        let pi_blob = hex::decode(&self.platform_info_blob)
            .map_err(|e| Error::Encoding(format!("failed to decode platformInfoBlob: {e}")))?;
        if !pi_blob.is_empty() {
            let mut can_has = matches!(
                self.isv_enclave_quote_status,
                IsvEnclaveQuoteStatus::GroupRevoked
                    | IsvEnclaveQuoteStatus::GroupOutOfDate
                    | IsvEnclaveQuoteStatus::ConfigurationNeeded
            );

            // "one of the following": a manifest status may justify the blob
            // when the quote status does not.
            if !can_has {
                if let Some(pse_status) = self.pse_manifest_status {
                    can_has = matches!(
                        pse_status,
                        PseManifestStatus::OutOfDate
                            | PseManifestStatus::Revoked
                            | PseManifestStatus::RlVersionMismatch
                    );
                }
            }

            if !can_has {
                return Err(Error::Validation("unexpected platformInfoBlob".to_string()));
            }

            // The blob's internals are documented as opaque, leave them be.
        }

        if self.nonce.len() > NONCE_MAX_LEN {
            return Err(Error::Validation("invalid nonce length".to_string()));
        }

        match self.epid_pseudonym.len() {
            0 | EPID_PSEUDONYM_LEN => (),
            _ => {
                return Err(Error::Validation(
                    "invalid epidPseudonym length".to_string(),
                ))
            }
        }

        Ok(())
    }
}
