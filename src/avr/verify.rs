// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::base64;
use super::errors::Error;
use chrono::{DateTime, Utc};
use openssl::hash::MessageDigest;
use openssl::sign::Verifier;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::verify::X509VerifyParam;
use openssl::x509::{X509StoreContext, X509};
use percent_encoding::percent_decode;
use std::sync::atomic::{AtomicBool, Ordering};

static SKIP_VERIFY: AtomicBool = AtomicBool::new(false);

/// Disable report signature and certificate chain verification for the
/// remainder of the process' lifetime.  The switch is one-way: once set it
/// cannot be cleared.  Decoding then proceeds straight to field validation.
///
/// This exists for test and debug environments only; a production relying
/// party must never call it.
pub fn unsafe_skip_verify() {
    SKIP_VERIFY.store(true, Ordering::SeqCst);
}

pub(crate) fn skip_verify() -> bool {
    SKIP_VERIFY.load(Ordering::SeqCst)
}

/// Parse a pool of trust root certificates from concatenated PEM.
pub fn trust_roots_from_pem(pem: &[u8]) -> Result<Vec<X509>, Error> {
    X509::stack_from_pem(pem).map_err(|e| Error::CertParse(e.to_string()))
}

/// Verify the attestation service's signature over the raw report body.
///
/// The URL-escaped certificate chain must contain exactly two PEM
/// certificates, the signing certificate followed by the root it claims to
/// chain to.  The signing certificate is verified against `trust_roots` with
/// `ts` anchoring the validity window, the presented root is required to be
/// the root the verifier actually chained to, and finally the RSA-SHA256
/// signature is checked over the literal `body` bytes.
pub fn verify_signature(
    body: &[u8],
    encoded_signature: &[u8],
    encoded_cert_chain: &[u8],
    trust_roots: &[X509],
    ts: DateTime<Utc>,
) -> Result<(), Error> {
    let pem = unescape_cert_chain(encoded_cert_chain)?;

    let certs = X509::stack_from_pem(&pem).map_err(|e| Error::CertParse(e.to_string()))?;
    if certs.len() != 2 {
        return Err(Error::ChainLength(certs.len()));
    }
    let signing_cert = &certs[0];
    let presented_root = &certs[1];

    let verified_root_der = verify_cert_chain(signing_cert, presented_root, trust_roots, ts)?;
    if verified_root_der != presented_root.to_der()? {
        return Err(Error::UntrustedRoot);
    }

    let signature = base64::decode(encoded_signature)?;

    let pkey = signing_cert.public_key()?;
    let mut verifier = Verifier::new(MessageDigest::sha256(), &pkey)?;
    verifier.update(body)?;
    if !verifier.verify(&signature)? {
        return Err(Error::SignatureInvalid);
    }

    Ok(())
}

// `percent_decode` passes malformed escapes through untouched, whereas the
// wire contract requires rejecting them, so check escapes strictly first.
fn unescape_cert_chain(raw: &[u8]) -> Result<Vec<u8>, Error> {
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            if raw.len() < i + 3
                || !raw[i + 1].is_ascii_hexdigit()
                || !raw[i + 2].is_ascii_hexdigit()
            {
                return Err(Error::Encoding(
                    "malformed %-escape in certificate chain".to_string(),
                ));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    Ok(percent_decode(raw).collect())
}

// Verify the signing certificate against the trust root pool and return the
// DER encoding of the terminal certificate of the chain the verifier built.
fn verify_cert_chain(
    signing_cert: &X509,
    presented_root: &X509,
    trust_roots: &[X509],
    ts: DateTime<Utc>,
) -> Result<Vec<u8>, Error> {
    let mut store = X509StoreBuilder::new()?;
    for root in trust_roots {
        store.add_cert(root.clone())?;
    }
    let mut param = X509VerifyParam::new()?;
    param.set_time(ts.timestamp());
    store.set_param(&param)?;
    let store = store.build();

    let mut untrusted = Stack::new()?;
    untrusted.push(presented_root.clone())?;

    let mut ctx = X509StoreContext::new()?;
    let outcome = ctx.init(&store, signing_cert, &untrusted, |c| {
        if !c.verify_cert()? {
            return Ok(Err(c.error().error_string().to_string()));
        }
        match c.chain().and_then(|chain| chain.iter().last()) {
            Some(cert) => Ok(Ok(cert.to_der()?)),
            None => Ok(Err("verifier produced an empty chain".to_string())),
        }
    })?;

    outcome.map_err(Error::ChainVerification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::base64::{engine::general_purpose, Engine as _};
    use chrono::TimeZone;
    use openssl::asn1::Asn1Time;
    use openssl::bn::BigNum;
    use openssl::pkey::{PKey, Private};
    use openssl::rsa::Rsa;
    use openssl::sign::Signer;
    use openssl::x509::extension::BasicConstraints;
    use openssl::x509::{X509Builder, X509NameBuilder};
    use percent_encoding::{percent_encode, NON_ALPHANUMERIC};

    // 2020-01-01T00:00:00Z, the middle of every test certificate's validity
    // window.
    const REF_UNIX_TIME: i64 = 1_577_836_800;

    fn ref_time() -> DateTime<Utc> {
        Utc.timestamp_opt(REF_UNIX_TIME, 0).unwrap()
    }

    fn rsa_key() -> PKey<Private> {
        PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
    }

    fn make_cert(
        cn: &str,
        serial: u32,
        key: &PKey<Private>,
        issuer: Option<(&X509, &PKey<Private>)>,
        ca: bool,
    ) -> X509 {
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", cn).unwrap();
        let name = name.build();

        let mut b = X509Builder::new().unwrap();
        b.set_version(2).unwrap();
        let serial = BigNum::from_u32(serial).unwrap().to_asn1_integer().unwrap();
        b.set_serial_number(&serial).unwrap();
        b.set_subject_name(&name).unwrap();
        b.set_not_before(&Asn1Time::from_unix(REF_UNIX_TIME - 86_400).unwrap())
            .unwrap();
        b.set_not_after(&Asn1Time::from_unix(REF_UNIX_TIME + 86_400).unwrap())
            .unwrap();
        b.set_pubkey(key).unwrap();
        if ca {
            b.append_extension(BasicConstraints::new().critical().ca().build().unwrap())
                .unwrap();
        }
        match issuer {
            Some((cert, ikey)) => {
                b.set_issuer_name(cert.subject_name()).unwrap();
                b.sign(ikey, MessageDigest::sha256()).unwrap();
            }
            None => {
                b.set_issuer_name(&name).unwrap();
                b.sign(key, MessageDigest::sha256()).unwrap();
            }
        }
        b.build()
    }

    fn escape_chain(certs: &[&X509]) -> Vec<u8> {
        let mut pem = Vec::new();
        for c in certs {
            pem.extend(c.to_pem().unwrap());
        }
        percent_encode(&pem, NON_ALPHANUMERIC).to_string().into_bytes()
    }

    fn sign_body(body: &[u8], key: &PKey<Private>) -> Vec<u8> {
        let mut signer = Signer::new(MessageDigest::sha256(), key).unwrap();
        signer.update(body).unwrap();
        let sig = signer.sign_to_vec().unwrap();
        general_purpose::STANDARD.encode(sig).into_bytes()
    }

    // A root CA, a signing certificate issued by it, and the signing key.
    fn test_chain() -> (X509, X509, PKey<Private>) {
        let root_key = rsa_key();
        let root = make_cert("Test Report Signing CA", 1, &root_key, None, true);
        let signer_key = rsa_key();
        let signer = make_cert(
            "Test Report Signing",
            2,
            &signer_key,
            Some((&root, &root_key)),
            false,
        );
        (root, signer, signer_key)
    }

    #[test]
    fn verification_enabled_by_default() {
        assert!(!skip_verify());
    }

    #[test]
    fn accepts_valid_signature() {
        let (root, signer, signer_key) = test_chain();
        let body = b"{\"id\":\"1\"}";
        let sig = sign_body(body, &signer_key);
        let chain = escape_chain(&[&signer, &root]);

        verify_signature(body, &sig, &chain, &[root.clone()], ref_time()).unwrap();
    }

    #[test]
    fn rejects_tampered_body() {
        let (root, signer, signer_key) = test_chain();
        let body = b"{\"id\":\"1\"}".to_vec();
        let sig = sign_body(&body, &signer_key);
        let chain = escape_chain(&[&signer, &root]);

        let mut tampered = body;
        tampered[1] ^= 0x01;

        let r = verify_signature(&tampered, &sig, &chain, &[root.clone()], ref_time());
        assert!(matches!(r, Err(Error::SignatureInvalid)));
    }

    #[test]
    fn rejects_short_and_long_chains() {
        let (root, signer, signer_key) = test_chain();
        let body = b"body";
        let sig = sign_body(body, &signer_key);

        let one = escape_chain(&[&signer]);
        let r = verify_signature(body, &sig, &one, &[root.clone()], ref_time());
        assert!(matches!(r, Err(Error::ChainLength(1))));

        let three = escape_chain(&[&signer, &root, &root]);
        let r = verify_signature(body, &sig, &three, &[root.clone()], ref_time());
        assert!(matches!(r, Err(Error::ChainLength(3))));
    }

    #[test]
    fn rejects_unrelated_trust_root() {
        let (root, signer, signer_key) = test_chain();
        let body = b"body";
        let sig = sign_body(body, &signer_key);
        let chain = escape_chain(&[&signer, &root]);

        let other_key = rsa_key();
        let other_root = make_cert("Unrelated CA", 9, &other_key, None, true);

        let r = verify_signature(body, &sig, &chain, &[other_root], ref_time());
        assert!(matches!(r, Err(Error::ChainVerification(_))));
    }

    #[test]
    fn rejects_presented_root_that_did_not_verify_the_chain() {
        let (root, signer, signer_key) = test_chain();
        let body = b"body";
        let sig = sign_body(body, &signer_key);

        let other_key = rsa_key();
        let other_root = make_cert("Other Pinned CA", 9, &other_key, None, true);

        // The chain claims `other_root`, yet only `root` can have verified
        // the signing certificate.  Both are pinned, so chain verification
        // itself succeeds.
        let chain = escape_chain(&[&signer, &other_root]);
        let roots = vec![root, other_root];

        let r = verify_signature(body, &sig, &chain, &roots, ref_time());
        assert!(matches!(r, Err(Error::UntrustedRoot)));
    }

    #[test]
    fn rejects_expired_window() {
        let (root, signer, signer_key) = test_chain();
        let body = b"body";
        let sig = sign_body(body, &signer_key);
        let chain = escape_chain(&[&signer, &root]);

        let late = Utc.timestamp_opt(REF_UNIX_TIME + 7 * 86_400, 0).unwrap();
        let r = verify_signature(body, &sig, &chain, &[root.clone()], late);
        assert!(matches!(r, Err(Error::ChainVerification(_))));
    }

    #[test]
    fn rejects_malformed_escape() {
        let r = unescape_cert_chain(b"abc%zzdef");
        assert!(matches!(r, Err(Error::Encoding(_))));

        let r = unescape_cert_chain(b"abc%2");
        assert!(matches!(r, Err(Error::Encoding(_))));
    }

    #[test]
    fn rejects_garbage_pem() {
        let (root, _, signer_key) = test_chain();
        let body = b"body";
        let sig = sign_body(body, &signer_key);

        let r = verify_signature(body, &sig, b"not a pem chain", &[root], ref_time());
        assert!(matches!(r, Err(Error::CertParse(_))));
    }

    #[test]
    fn rejects_malformed_signature_base64() {
        let (root, signer, _) = test_chain();
        let body = b"body";
        let chain = escape_chain(&[&signer, &root]);

        let r = verify_signature(body, b"!!!", &chain, &[root.clone()], ref_time());
        assert!(matches!(r, Err(Error::Encoding(_))));
    }
}
