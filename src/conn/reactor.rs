//! Generic single-connection reactor loop, dispatching to a role-specific
//! [`PeerRole`] the way spec.md's DESIGN NOTES ask for ("model as a table
//! `Map<MessageType, Handler>`" rather than one giant match per peer
//! pair). One task per connection runs [`run`]; the four peer pairs
//! (master↔CS, master↔client, master↔metalogger, client↔CS) each provide
//! their own `PeerRole` impl.

use log::{debug, warn};
use tokio::time::{sleep_until, Instant};

use crate::conn::connection::{Connection, Mode};
use crate::error::WireError;
use crate::wire::envelope::Envelope;
use crate::wire::NOP_MESSAGE_TYPE;

/// Role-specific behavior plugged into the shared reactor loop.
pub trait PeerRole {
    /// Handle one fully-decoded packet. Errors here kill the connection
    /// after running [`PeerRole::before_close`].
    fn handle_message(
        &mut self,
        conn: &mut Connection,
        envelope: Envelope,
    ) -> Result<(), WireError>;

    /// Run when the connection transitions to [`Mode::Kill`]: release
    /// held resources (open-file references, locked chunks, pending
    /// operations) the way spec.md §4.2 requires.
    fn before_close(&mut self, conn: &mut Connection);

    /// True once this role has nothing left to drain: all write queues
    /// empty and all delayed operations resolved. The reactor won't
    /// report clean shutdown until this holds.
    fn can_exit(&self) -> bool;
}

/// Drive one connection until it is killed (by protocol violation, EOF,
/// idle timeout, or the role's own `before_close`/`can_exit` signals).
pub async fn run<R: PeerRole>(mut conn: Connection, mut role: R) {
    loop {
        if conn.mode() == Mode::Kill {
            break;
        }

        let now = Instant::now();
        if conn.should_kill(now) {
            warn!("connection idle past its timeout, killing");
            conn.kill();
            continue;
        }

        let nop_deadline = next_nop_deadline(&conn, now);

        tokio::select! {
            header = conn.read_header() => {
                match header {
                    Ok(Some(header)) => match conn.read_payload().await {
                        Ok(payload) => match Envelope::decode(header, &payload) {
                            Ok(envelope) => {
                                if let Err(e) = role.handle_message(&mut conn, envelope) {
                                    warn!("protocol violation, killing connection: {e}");
                                    conn.kill();
                                }
                            }
                            Err(e) => {
                                warn!("malformed packet, killing connection: {e}");
                                conn.kill();
                            }
                        },
                        Err(e) => {
                            warn!("short read of payload: {e}");
                            conn.kill();
                        }
                    },
                    Ok(None) => {
                        debug!("peer closed connection cleanly");
                        conn.kill();
                    }
                    Err(e) => {
                        warn!("read error: {e}");
                        conn.kill();
                    }
                }
            }
            _ = sleep_until(nop_deadline) => {
                if conn.should_send_nop(now) {
                    conn.enqueue(Envelope::encode_legacy(NOP_MESSAGE_TYPE, &[]));
                    conn.note_nop_sent();
                }
            }
        }

        if let Err(e) = conn.flush_output().await {
            warn!("write error: {e}");
            conn.kill();
        }
    }

    role.before_close(&mut conn);
}

fn next_nop_deadline(conn: &Connection, now: Instant) -> Instant {
    now + conn.timeout / 2
}
