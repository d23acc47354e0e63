// SPDX-License-Identifier: Apache-2.0

use base64::{self, engine::general_purpose, Engine as _};
use serde::{
    de::{self, Deserializer, Visitor},
    ser::Serializer,
};

use super::errors::Error;

/// decodes bytes from standard base64
pub fn decode(v: impl AsRef<[u8]>) -> Result<Vec<u8>, Error> {
    general_purpose::STANDARD
        .decode(v)
        .map_err(|e| Error::Encoding(e.to_string()))
}

/// serde helper: a `Vec<u8>` carried as standard base64 on the wire
pub fn serialize<S>(v: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&base64::display::Base64Display::new(
        v,
        &general_purpose::STANDARD,
    ))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_str(BytesVisitor {})
}

struct BytesVisitor;

impl<'de> Visitor<'de> for BytesVisitor {
    type Value = Vec<u8>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a base64-encoded string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        general_purpose::STANDARD.decode(v).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_ok() {
        assert_eq!(decode("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn decode_rejects_garbage() {
        let r = decode("!!not base64!!");
        assert!(matches!(r, Err(Error::Encoding(_))));
    }
}
