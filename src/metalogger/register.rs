//! `MLTOMA_REGISTER` — a metalogger announcing itself to the master and
//! asking to resume the changelog stream from a given version.

use chunkstore_abi::message::{MLTOMA_REGISTER, MLTOMA_REGISTER_RVER};

use crate::error::WireError;
use crate::wire::argument::{ArgumentIterator, FieldWriter};
use crate::wire::envelope::Envelope;

/// A decoded registration request. Only `rver == 2` (version-bounded
/// resumption) is modeled; older revisions that registered without a
/// requested version are out of scope here — see spec.md's DESIGN NOTES
/// on legacy compatibility (refuse cleanly rather than half-implement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterRequest {
    pub rver: u8,
    pub want_since_version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    /// A pre-`rver=2` metalogger tried to register; we refuse it
    /// cleanly with `BADSESSIONID` rather than reproduce the fixed-shape
    /// legacy handshake.
    UnsupportedRevision(u8),
    Wire(WireError),
}

impl From<WireError> for RegisterError {
    fn from(e: WireError) -> Self {
        RegisterError::Wire(e)
    }
}

pub fn encode(want_since_version: u64) -> Vec<u8> {
    let mut w = FieldWriter::new();
    w.put_u8(MLTOMA_REGISTER_RVER);
    w.put_u64(want_since_version);
    Envelope::encode_legacy(MLTOMA_REGISTER, &w.into_bytes())
}

pub fn decode(payload: &[u8]) -> Result<RegisterRequest, RegisterError> {
    let mut it = ArgumentIterator::new(payload);
    let rver = it.fetch_u8()?;
    if rver != MLTOMA_REGISTER_RVER {
        return Err(RegisterError::UnsupportedRevision(rver));
    }
    let want_since_version = it.fetch_u64()?;
    Ok(RegisterRequest { rver, want_since_version })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_roundtrips() {
        let packet = encode(42);
        let req = decode(&packet[8..]).unwrap();
        assert_eq!(req, RegisterRequest { rver: 2, want_since_version: 42 });
    }

    #[test]
    fn unsupported_revision_is_rejected() {
        let mut w = FieldWriter::new();
        w.put_u8(0);
        w.put_u64(0);
        let err = decode(&w.into_bytes()).unwrap_err();
        assert_eq!(err, RegisterError::UnsupportedRevision(0));
    }
}
