//! Construction of the two ends of a virtual pipe.

use std::sync::Arc;

use super::pipe_session::PipeSession;
use super::table::SessionTable;
use crate::address::PipeAddress;
use crate::service::ServiceContext;
use crate::transport::BoundEntry;

/// Build and register a linked session pair.
///
/// The local session belongs to `connector` and faces `entry.address()`; the
/// remote session belongs to the acceptor behind `entry` and faces
/// `local_address`. Each names the other as its peer.
pub(crate) fn pair(
    entry: &BoundEntry,
    local_address: PipeAddress,
    connector: &Arc<ServiceContext>,
    table: &Arc<SessionTable>,
) -> (PipeSession, PipeSession) {
    let local_id = table.next_id();
    let remote_id = table.next_id();

    let local = PipeSession::new(
        local_id,
        remote_id,
        local_address,
        entry.address(),
        Arc::clone(connector),
        table,
    );
    let remote = PipeSession::new(
        remote_id,
        local_id,
        entry.address(),
        local_address,
        Arc::clone(entry.service()),
        table,
    );

    table.insert(local.clone());
    table.insert(remote.clone());

    (local, remote)
}
