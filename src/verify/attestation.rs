use ciborium::value::Value;

use super::{cbor_bytes, cbor_get_text, cbor_map, cbor_text, parse_cbor_map, VerifyError};

/// Attestation statement of a parsed attestation object. Only `none` and
/// packed *self*-attestation are accepted; trust-chain validation is not
/// this crate's business.
#[derive(Debug)]
pub(crate) enum AttestationStatement {
    None,
    Packed { alg: i64, sig: Vec<u8> },
}

#[derive(Debug)]
pub(crate) struct AttestationObject {
    /// Raw authenticator data bytes; part of the signed payload.
    pub auth_data: Vec<u8>,
    pub statement: AttestationStatement,
}

/// Parse the CBOR attestation object: `{fmt, attStmt, authData}`.
pub(crate) fn parse_attestation_object(raw: &[u8]) -> Result<AttestationObject, VerifyError> {
    let map = parse_cbor_map(raw)?;

    let fmt = cbor_get_text(&map, "fmt")
        .and_then(cbor_text)
        .ok_or_else(|| VerifyError::Malformed("attestation fmt missing".into()))?;
    let auth_data = cbor_get_text(&map, "authData")
        .and_then(cbor_bytes)
        .ok_or_else(|| VerifyError::Malformed("authData missing".into()))?
        .to_vec();
    let att_stmt = cbor_get_text(&map, "attStmt")
        .and_then(cbor_map)
        .ok_or_else(|| VerifyError::Malformed("attStmt missing".into()))?;

    let statement = match fmt {
        "none" => AttestationStatement::None,
        "packed" => {
            // A certificate chain means full attestation, which self-
            // attestation verification would wrongly fail; reject it
            // outright rather than report a misleading Invalid.
            if cbor_get_text(att_stmt, "x5c").is_some() {
                return Err(VerifyError::Malformed(
                    "certificate attestation not supported".into(),
                ));
            }
            let alg = match cbor_get_text(att_stmt, "alg") {
                Some(Value::Integer(i)) => i64::try_from(i128::from(*i))
                    .map_err(|_| VerifyError::Malformed("attStmt alg out of range".into()))?,
                _ => return Err(VerifyError::Malformed("attStmt alg missing".into())),
            };
            let sig = cbor_get_text(att_stmt, "sig")
                .and_then(cbor_bytes)
                .ok_or_else(|| VerifyError::Malformed("attStmt sig missing".into()))?
                .to_vec();
            AttestationStatement::Packed { alg, sig }
        }
        _ => {
            return Err(VerifyError::Malformed(
                "unsupported attestation format".into(),
            ))
        }
    };

    Ok(AttestationObject {
        auth_data,
        statement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(v: Value) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(&v, &mut buf).unwrap();
        buf
    }

    fn tv(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn attestation(fmt: &str, att_stmt: Vec<(Value, Value)>) -> Vec<u8> {
        encode(Value::Map(vec![
            (tv("fmt"), tv(fmt)),
            (tv("attStmt"), Value::Map(att_stmt)),
            (tv("authData"), Value::Bytes(vec![0u8; 37])),
        ]))
    }

    #[test]
    fn test_parse_none_format() {
        let parsed = parse_attestation_object(&attestation("none", vec![])).unwrap();
        assert!(matches!(parsed.statement, AttestationStatement::None));
        assert_eq!(parsed.auth_data.len(), 37);
    }

    #[test]
    fn test_parse_packed_self_attestation() {
        let att_stmt = vec![
            (tv("alg"), Value::Integer((-7i64).into())),
            (tv("sig"), Value::Bytes(vec![0x30, 0x00])),
        ];
        let parsed = parse_attestation_object(&attestation("packed", att_stmt)).unwrap();
        match parsed.statement {
            AttestationStatement::Packed { alg, sig } => {
                assert_eq!(alg, -7);
                assert_eq!(sig, vec![0x30, 0x00]);
            }
            other => panic!("expected packed statement, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_certificate_chain() {
        let att_stmt = vec![
            (tv("alg"), Value::Integer((-7i64).into())),
            (tv("sig"), Value::Bytes(vec![0x30, 0x00])),
            (tv("x5c"), Value::Array(vec![Value::Bytes(vec![0x01])])),
        ];
        let err = parse_attestation_object(&attestation("packed", att_stmt)).unwrap_err();
        assert!(matches!(err, VerifyError::Malformed(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        let err = parse_attestation_object(&attestation("fido-u2f", vec![])).unwrap_err();
        assert!(matches!(err, VerifyError::Malformed(_)));
    }

    #[test]
    fn test_parse_rejects_packed_without_sig() {
        let att_stmt = vec![(tv("alg"), Value::Integer((-7i64).into()))];
        let err = parse_attestation_object(&attestation("packed", att_stmt)).unwrap_err();
        assert!(matches!(err, VerifyError::Malformed(_)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_attestation_object(b"\xff\xff").unwrap_err();
        assert!(matches!(err, VerifyError::Malformed(_)));
    }
}
