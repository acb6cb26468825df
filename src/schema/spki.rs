// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal SubjectPublicKeyInfo (RFC 5280) framing.
//!
//! TUF metadata carries RSA and ECDSA public keys as PEM-wrapped
//! SubjectPublicKeyInfo, while the verifier wants the raw key material from
//! the inner BIT STRING. `decode` strips the framing and checks the algorithm
//! identifier; `encode` rebuilds it.

use untrusted::{Input, Reader};

/// 1.2.840.113549.1.1.1 (rsaEncryption); parameters must be NULL.
pub(super) const OID_RSA_ENCRYPTION: &[u8] =
    &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];

/// 1.2.840.10045.2.1 (id-ecPublicKey).
pub(super) const OID_EC_PUBLIC_KEY: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];

/// 1.2.840.10045.3.1.7 (secp256r1), the named-curve parameter.
pub(super) const OID_EC_PARAM_SECP256R1: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];

const TAG_OID: u8 = 0x06;
const TAG_NULL: u8 = 0x05;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_BIT_STRING: u8 = 0x03;

/// Extract the subject public key bytes from a DER SubjectPublicKeyInfo,
/// requiring the algorithm `oid` (with the given OID parameter, or NULL when
/// `params` is `None`).
pub(super) fn decode(oid: &[u8], params: Option<&[u8]>, der: &[u8]) -> Option<Vec<u8>> {
    Input::from(der)
        .read_all((), |spki| {
            let inner = read_tlv(spki, TAG_SEQUENCE)?;
            inner.read_all((), |inner| {
                let algorithm = read_tlv(inner, TAG_SEQUENCE)?;
                algorithm.read_all((), |algorithm| {
                    let actual = read_tlv(algorithm, TAG_OID)?;
                    if actual.as_slice_less_safe() != oid {
                        return Err(());
                    }
                    match params {
                        None => {
                            let null = read_tlv(algorithm, TAG_NULL)?;
                            if null.len() != 0 {
                                return Err(());
                            }
                        }
                        Some(params) => {
                            let actual = read_tlv(algorithm, TAG_OID)?;
                            if actual.as_slice_less_safe() != params {
                                return Err(());
                            }
                        }
                    }
                    Ok(())
                })?;
                let bits = read_tlv(inner, TAG_BIT_STRING)?;
                bits.read_all((), |bits| {
                    let unused = bits.read_byte().map_err(|_| ())?;
                    if unused != 0 {
                        return Err(());
                    }
                    Ok(bits.read_bytes_to_end().as_slice_less_safe().to_vec())
                })
            })
        })
        .ok()
}

/// Wrap subject public key bytes in a DER SubjectPublicKeyInfo with the
/// algorithm `oid` (and OID parameter, or NULL when `params` is `None`).
pub(super) fn encode(oid: &[u8], params: Option<&[u8]>, key: &[u8]) -> Vec<u8> {
    let mut algorithm = tlv(TAG_OID, oid);
    match params {
        None => algorithm.extend_from_slice(&tlv(TAG_NULL, &[])),
        Some(params) => algorithm.extend_from_slice(&tlv(TAG_OID, params)),
    }
    let mut body = tlv(TAG_SEQUENCE, &algorithm);
    let mut bits = vec![0];
    bits.extend_from_slice(key);
    body.extend_from_slice(&tlv(TAG_BIT_STRING, &bits));
    tlv(TAG_SEQUENCE, &body)
}

fn read_tlv<'a>(reader: &mut Reader<'a>, tag: u8) -> Result<Input<'a>, ()> {
    if reader.read_byte().map_err(|_| ())? != tag {
        return Err(());
    }
    let length = read_length(reader)?;
    reader.read_bytes(length).map_err(|_| ())
}

fn read_length(reader: &mut Reader<'_>) -> Result<usize, ()> {
    let first = reader.read_byte().map_err(|_| ())?;
    if first & 0x80 == 0 {
        return Ok(usize::from(first));
    }
    let count = usize::from(first & 0x7f);
    if count == 0 || count > 4 {
        return Err(());
    }
    let mut length = 0usize;
    for _ in 0..count {
        length = (length << 8) | usize::from(reader.read_byte().map_err(|_| ())?);
    }
    Ok(length)
}

fn tlv(tag: u8, contents: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let length = contents.len();
    if length < 0x80 {
        out.push(length as u8);
    } else {
        let mut bytes = Vec::new();
        let mut remaining = length;
        while remaining > 0 {
            bytes.insert(0, (remaining & 0xff) as u8);
            remaining >>= 8;
        }
        out.push(0x80 | bytes.len() as u8);
        out.extend_from_slice(&bytes);
    }
    out.extend_from_slice(contents);
    out
}
