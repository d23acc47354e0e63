// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use super::report::AttestationVerificationReport;
use chrono::{DateTime, Utc};
use openssl::x509::X509;
use serde::{Deserialize, Serialize};

/// A serialized attestation verification report bundled with the additional
/// data required to verify it offline.
///
/// The three fields are opaque until [`AvrBundle::open`] succeeds; the
/// bundle itself performs no validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvrBundle {
    /// Raw report JSON exactly as delivered by the attestation service.
    #[serde(with = "serde_bytes")]
    pub body: Vec<u8>,
    /// URL-escaped, PEM-encoded signing and root certificate pair.
    #[serde(with = "serde_bytes")]
    pub certificate_chain: Vec<u8>,
    /// Base64-encoded RSA signature over `body`.
    #[serde(with = "serde_bytes")]
    pub signature: Vec<u8>,
}

impl AvrBundle {
    pub fn new(body: Vec<u8>, certificate_chain: Vec<u8>, signature: Vec<u8>) -> Self {
        Self {
            body,
            certificate_chain,
            signature,
        }
    }

    /// Serialize the bundle into a CBOR byte vector.
    pub fn to_cbor(&self) -> Result<Vec<u8>, Error> {
        let mut buf: Vec<u8> = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a bundle from a CBOR byte vector.  A corrupt record is
    /// rejected outright, it never yields a partially populated bundle.
    pub fn from_cbor(data: &[u8]) -> Result<Self, Error> {
        ciborium::de::from_reader(data).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode and validate the report contained in the bundle, returning the
    /// attestation verification report iff it is valid.
    pub fn open(
        &self,
        trust_roots: &[X509],
        ts: DateTime<Utc>,
    ) -> Result<AttestationVerificationReport, Error> {
        AttestationVerificationReport::decode(
            &self.body,
            &self.signature,
            &self.certificate_chain,
            trust_roots,
            ts,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciborium::Value;
    use hex_literal::hex;

    #[test]
    fn cbor_round_trip() {
        let bundle = AvrBundle::new(
            b"{\"id\": \"1\"}".to_vec(),
            b"chain".to_vec(),
            b"signature".to_vec(),
        );

        let buf = bundle.to_cbor().unwrap();
        let back = AvrBundle::from_cbor(&buf).unwrap();

        assert_eq!(back, bundle);
    }

    #[test]
    fn cbor_uses_stable_field_tags() {
        let buf = AvrBundle::default().to_cbor().unwrap();

        let v: Value = ciborium::de::from_reader(buf.as_slice()).unwrap();
        let keys: Vec<String> = v
            .as_map()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_text().unwrap().to_string())
            .collect();

        assert_eq!(keys, ["body", "certificate_chain", "signature"]);
    }

    #[test]
    fn from_cbor_rejects_garbage() {
        let r = AvrBundle::from_cbor(b"definitely not cbor");
        assert!(matches!(r, Err(Error::Serialization(_))));

        // a well-formed CBOR integer is still not a bundle
        let r = AvrBundle::from_cbor(&hex!("01"));
        assert!(matches!(r, Err(Error::Serialization(_))));
    }
}
