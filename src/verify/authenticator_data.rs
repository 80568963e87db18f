use super::VerifyError;

pub(crate) const FLAG_UP: u8 = 0x01;
pub(crate) const FLAG_UV: u8 = 0x04;
pub(crate) const FLAG_AT: u8 = 0x40;
pub(crate) const FLAG_ED: u8 = 0x80;

/// Parsed authenticator data: `rpIdHash(32) || flags(1) || signCount(4)`,
/// followed by attested credential data when the AT flag is set
/// (`aaguid(16) || credIdLen(2) || credId || COSE key`).
#[derive(Debug)]
pub(crate) struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: u8,
    pub sign_count: u32,
    pub attested_credential: Option<AttestedCredential>,
}

#[derive(Debug)]
pub(crate) struct AttestedCredential {
    pub aaguid: [u8; 16],
    pub credential_id: Vec<u8>,
    /// COSE_Key CBOR bytes, stored verbatim as the credential's public key.
    pub public_key: Vec<u8>,
}

impl AuthenticatorData {
    pub fn parse(data: &[u8]) -> Result<Self, VerifyError> {
        if data.len() < 37 {
            return Err(VerifyError::Malformed("authenticator data too short".into()));
        }
        let rp_id_hash: [u8; 32] = data[0..32].try_into().unwrap();
        let flags = data[32];
        let sign_count = u32::from_be_bytes(data[33..37].try_into().unwrap());

        // Extension data would make the COSE key boundary ambiguous.
        if flags & FLAG_ED != 0 {
            return Err(VerifyError::Malformed("extension data not supported".into()));
        }

        let attested_credential = if flags & FLAG_AT != 0 {
            if data.len() < 37 + 16 + 2 {
                return Err(VerifyError::Malformed(
                    "attested credential data truncated".into(),
                ));
            }
            let aaguid: [u8; 16] = data[37..53].try_into().unwrap();
            let cred_id_len = u16::from_be_bytes([data[53], data[54]]) as usize;
            if data.len() < 55 + cred_id_len {
                return Err(VerifyError::Malformed("credential id truncated".into()));
            }
            if cred_id_len == 0 {
                return Err(VerifyError::Malformed("empty credential id".into()));
            }
            let credential_id = data[55..55 + cred_id_len].to_vec();
            let public_key = data[55 + cred_id_len..].to_vec();
            if public_key.is_empty() {
                return Err(VerifyError::Malformed("missing credential public key".into()));
            }
            Some(AttestedCredential {
                aaguid,
                credential_id,
                public_key,
            })
        } else {
            if data.len() != 37 {
                return Err(VerifyError::Malformed(
                    "trailing bytes after authenticator data".into(),
                ));
            }
            None
        };

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential,
        })
    }

    pub fn user_present(&self) -> bool {
        self.flags & FLAG_UP != 0
    }

    pub fn user_verified(&self) -> bool {
        self.flags & FLAG_UV != 0
    }
}
