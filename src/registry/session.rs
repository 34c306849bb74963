//! Master-side client session table, populated by `CLTOMA_FUSE_REGISTER`.
//!
//! Grounded in `MFSCommunication.h`'s `SESFLAG_*` bits (reproduced as
//! `chunkstore_abi::attr::session_flags`); the registry keys sessions by
//! a server-assigned id rather than by connection, since a client may
//! reconnect and resume the same session.

use bitflags::bitflags;
use std::collections::HashMap;

use chunkstore_abi::attr::session_flags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SessionFlags: u8 {
        const READONLY = session_flags::READONLY;
        const DYNAMICIP = session_flags::DYNAMICIP;
        const IGNOREGID = session_flags::IGNOREGID;
        const CANCHANGEQUOTA = session_flags::CANCHANGEQUOTA;
        const MAPALL = session_flags::MAPALL;
    }
}

pub type SessionId = u32;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub flags: SessionFlags,
    /// Chunks this session currently holds a write lock on, so they can
    /// be released by `SessionTable::drop_session`'s caller (the
    /// connection manager's `before_close`) the way spec.md §4.2
    /// requires for an abruptly closed client connection.
    pub locked_chunks: Vec<crate::geometry::ChunkId>,
}

#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<SessionId, Session>,
    next_id: SessionId,
}

impl SessionTable {
    pub fn new() -> SessionTable {
        SessionTable::default()
    }

    pub fn register(&mut self, flags: SessionFlags) -> SessionId {
        self.next_id += 1;
        let id = self.next_id;
        self.sessions.insert(id, Session { id, flags, locked_chunks: Vec::new() });
        id
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Remove a session and return the chunk locks it was holding, for
    /// the caller to release in the registry.
    pub fn drop_session(&mut self, id: SessionId) -> Vec<crate::geometry::ChunkId> {
        self.sessions.remove(&id).map(|s| s.locked_chunks).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_assigns_increasing_ids() {
        let mut table = SessionTable::new();
        let a = table.register(SessionFlags::READONLY);
        let b = table.register(SessionFlags::empty());
        assert_ne!(a, b);
        assert!(table.get(a).unwrap().flags.contains(SessionFlags::READONLY));
    }

    #[test]
    fn drop_session_returns_its_locked_chunks() {
        let mut table = SessionTable::new();
        let id = table.register(SessionFlags::empty());
        table.get_mut(id).unwrap().locked_chunks.push(crate::geometry::ChunkId(7));
        let locks = table.drop_session(id);
        assert_eq!(locks, vec![crate::geometry::ChunkId(7)]);
        assert!(table.get(id).is_none());
    }
}
