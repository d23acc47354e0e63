// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use lazy_static::lazy_static;
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

lazy_static! {
    static ref QUOTE_STATUS_FWD_MAP: HashMap<&'static str, IsvEnclaveQuoteStatus> = [
        ("OK", IsvEnclaveQuoteStatus::Ok),
        ("SIGNATURE_INVALID", IsvEnclaveQuoteStatus::SignatureInvalid),
        ("GROUP_REVOKED", IsvEnclaveQuoteStatus::GroupRevoked),
        ("SIGNATURE_REVOKED", IsvEnclaveQuoteStatus::SignatureRevoked),
        ("KEY_REVOKED", IsvEnclaveQuoteStatus::KeyRevoked),
        (
            "SIGRL_VERSION_MISMATCH",
            IsvEnclaveQuoteStatus::SigrlVersionMismatch
        ),
        ("GROUP_OUT_OF_DATE", IsvEnclaveQuoteStatus::GroupOutOfDate),
        (
            "CONFIGURATION_NEEDED",
            IsvEnclaveQuoteStatus::ConfigurationNeeded
        ),
    ]
    .into_iter()
    .collect();
    static ref QUOTE_STATUS_REV_MAP: HashMap<IsvEnclaveQuoteStatus, &'static str> =
        QUOTE_STATUS_FWD_MAP.iter().map(|(s, c)| (*c, *s)).collect();

    static ref PSE_MANIFEST_FWD_MAP: HashMap<&'static str, PseManifestStatus> = [
        ("OK", PseManifestStatus::Ok),
        ("UNKNOWN", PseManifestStatus::Unknown),
        ("INVALID", PseManifestStatus::Invalid),
        ("OUT_OF_DATE", PseManifestStatus::OutOfDate),
        ("REVOKED", PseManifestStatus::Revoked),
        ("RL_VERSION_MISMATCH", PseManifestStatus::RlVersionMismatch),
    ]
    .into_iter()
    .collect();
    static ref PSE_MANIFEST_REV_MAP: HashMap<PseManifestStatus, &'static str> =
        PSE_MANIFEST_FWD_MAP.iter().map(|(s, c)| (*c, *s)).collect();

    static ref CRL_REASON_FWD_MAP: HashMap<&'static str, CrlReason> = [
        ("unspecified", CrlReason::UNSPECIFIED),
        ("keyCompromise", CrlReason::KEY_COMPROMISE),
        ("cACompromise", CrlReason::CA_COMPROMISE),
        ("affiliationChanged", CrlReason::AFFILIATION_CHANGED),
        ("superseded", CrlReason::SUPERSEDED),
        ("cessationOfOperation", CrlReason::CESSATION_OF_OPERATION),
        ("certificateHold", CrlReason::CERTIFICATE_HOLD),
        ("removeFromCRL", CrlReason::REMOVE_FROM_CRL),
        ("privilegeWithdrawn", CrlReason::PRIVILEGE_WITHDRAWN),
        ("aACompromise", CrlReason::AA_COMPROMISE),
    ]
    .into_iter()
    .collect();
    static ref CRL_REASON_REV_MAP: HashMap<CrlReason, &'static str> =
        CRL_REASON_FWD_MAP.iter().map(|(s, c)| (*c, *s)).collect();
}

/// Status of an ISV enclave quote, as reported by the attestation service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IsvEnclaveQuoteStatus {
    /// Reserved marker for a quote status that was absent from the wire
    /// payload.  It has no wire representation and is rejected by
    /// [`IsvEnclaveQuoteStatus::to_wire`]; a decoded report carrying it
    /// fails validation.
    FieldMissing,
    Ok,
    SignatureInvalid,
    GroupRevoked,
    SignatureRevoked,
    KeyRevoked,
    SigrlVersionMismatch,
    GroupOutOfDate,
    ConfigurationNeeded,
}

impl IsvEnclaveQuoteStatus {
    /// Map a wire string to a quote status code.
    pub fn from_wire(s: &str) -> Result<Self, Error> {
        QUOTE_STATUS_FWD_MAP
            .get(s)
            .copied()
            .ok_or_else(|| Error::UnknownStatus(format!("invalid quote status: '{s}'")))
    }

    /// Map a quote status code back to its wire string.  Fails for
    /// [`IsvEnclaveQuoteStatus::FieldMissing`], which must never appear in
    /// serialized output.
    pub fn to_wire(self) -> Result<&'static str, Error> {
        QUOTE_STATUS_REV_MAP
            .get(&self)
            .copied()
            .ok_or_else(|| Error::UnknownStatus(format!("invalid quote status: {self:?}")))
    }
}

impl Default for IsvEnclaveQuoteStatus {
    // The sentinel, so that a field left untouched by the decoder is
    // distinguishable from any value the wire can carry.
    fn default() -> Self {
        Self::FieldMissing
    }
}

impl Serialize for IsvEnclaveQuoteStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = self.to_wire().map_err(ser::Error::custom)?;
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for IsvEnclaveQuoteStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_wire(&s).map_err(de::Error::custom)
    }
}

/// Status of an SGX Platform Service Security Property Descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PseManifestStatus {
    Ok,
    Unknown,
    Invalid,
    OutOfDate,
    Revoked,
    RlVersionMismatch,
}

impl PseManifestStatus {
    /// Map a wire string to a PSE manifest status code.
    pub fn from_wire(s: &str) -> Result<Self, Error> {
        PSE_MANIFEST_FWD_MAP
            .get(s)
            .copied()
            .ok_or_else(|| Error::UnknownStatus(format!("invalid PSE manifest status: '{s}'")))
    }

    /// Map a PSE manifest status code back to its wire string.
    pub fn to_wire(self) -> Result<&'static str, Error> {
        PSE_MANIFEST_REV_MAP
            .get(&self)
            .copied()
            .ok_or_else(|| Error::UnknownStatus(format!("invalid PSE manifest status: {self:?}")))
    }
}

impl Serialize for PseManifestStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = self.to_wire().map_err(ser::Error::custom)?;
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for PseManifestStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_wire(&s).map_err(de::Error::custom)
    }
}

/// Certificate revocation reason code, as specified in RFC 5280 5.3.1.
///
/// The attestation service reports the reason as a bare integer and the code
/// is diagnostic-only, so codes outside the RFC-assigned set decode fine and
/// merely render as a placeholder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrlReason(u32);

impl CrlReason {
    pub const UNSPECIFIED: CrlReason = CrlReason(0);
    pub const KEY_COMPROMISE: CrlReason = CrlReason(1);
    pub const CA_COMPROMISE: CrlReason = CrlReason(2);
    pub const AFFILIATION_CHANGED: CrlReason = CrlReason(3);
    pub const SUPERSEDED: CrlReason = CrlReason(4);
    pub const CESSATION_OF_OPERATION: CrlReason = CrlReason(5);
    pub const CERTIFICATE_HOLD: CrlReason = CrlReason(6);
    // 7 is unassigned.
    pub const REMOVE_FROM_CRL: CrlReason = CrlReason(8);
    pub const PRIVILEGE_WITHDRAWN: CrlReason = CrlReason(9);
    pub const AA_COMPROMISE: CrlReason = CrlReason(10);

    /// Map a reason name to its code.
    pub fn from_wire(s: &str) -> Result<Self, Error> {
        CRL_REASON_FWD_MAP
            .get(s)
            .copied()
            .ok_or_else(|| Error::UnknownStatus(format!("invalid revocation reason: '{s}'")))
    }

    /// Map a reason code back to its name.  Fails for codes outside the
    /// RFC-assigned set.
    pub fn to_wire(self) -> Result<&'static str, Error> {
        CRL_REASON_REV_MAP
            .get(&self)
            .copied()
            .ok_or_else(|| Error::UnknownStatus(format!("invalid revocation reason: {}", self.0)))
    }
}

impl fmt::Display for CrlReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match CRL_REASON_REV_MAP.get(self) {
            Some(s) => f.write_str(s),
            None => write!(f, "[unknown reason ({})]", self.0),
        }
    }
}
