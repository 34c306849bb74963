//! Owned name/path types, decoded from the encodings `ArgumentIterator`
//! reads off the wire.

use std::fmt;

use crate::error::WireError;
use crate::wire::argument::{ArgumentIterator, FieldWriter};

/// A single path component: `u8`-length-prefixed bytes, no terminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(Vec<u8>);

impl Name {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Name, WireError> {
        let bytes = bytes.into();
        if bytes.len() > u8::MAX as usize {
            return Err(WireError::MalformedString);
        }
        Ok(Name(bytes))
    }

    pub fn decode(it: &mut ArgumentIterator<'_>) -> Result<Name, WireError> {
        Ok(Name(it.fetch_name()?.to_vec()))
    }

    pub fn encode(&self, w: &mut FieldWriter) {
        w.put_name(&self.0);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// A full path: `u32`-length-prefixed bytes, with a trailing NUL on
/// legacy message types only (spec.md §4.1).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path(Vec<u8>);

impl Path {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Path {
        Path(bytes.into())
    }

    pub fn decode(it: &mut ArgumentIterator<'_>, legacy: bool) -> Result<Path, WireError> {
        Ok(Path(it.fetch_path(legacy)?.to_vec()))
    }

    /// `legacy` controls whether a trailing NUL is appended to the
    /// length-prefixed bytes.
    pub fn encode(&self, w: &mut FieldWriter, legacy: bool) {
        let len = self.0.len() + if legacy { 1 } else { 0 };
        w.put_u32(len as u32);
        w.put_bytes(&self.0);
        if legacy {
            w.put_u8(0);
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_roundtrip() {
        let name = Name::new(*b"chunk").unwrap();
        let mut w = FieldWriter::new();
        name.encode(&mut w);
        let bytes = w.into_bytes();
        let mut it = ArgumentIterator::new(&bytes);
        assert_eq!(Name::decode(&mut it).unwrap(), name);
    }

    #[test]
    fn legacy_path_roundtrips_with_nul() {
        let path = Path::new(*b"/a/b");
        let mut w = FieldWriter::new();
        path.encode(&mut w, true);
        let bytes = w.into_bytes();
        let mut it = ArgumentIterator::new(&bytes);
        assert_eq!(Path::decode(&mut it, true).unwrap(), path);
    }

    #[test]
    fn new_path_roundtrips_without_nul() {
        let path = Path::new(*b"/a/b");
        let mut w = FieldWriter::new();
        path.encode(&mut w, false);
        let bytes = w.into_bytes();
        let mut it = ArgumentIterator::new(&bytes);
        assert_eq!(Path::decode(&mut it, false).unwrap(), path);
    }
}
