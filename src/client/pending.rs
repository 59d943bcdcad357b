use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::lock::lock_ignore_poison;
use crate::log_debug;
use crate::{Completion, RequestKind, Response, Result, RpcError, Serial};

/// Attribution tag recorded with each request: who the work is done for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkSource {
    pub uid: u32,
    pub package: String,
}

impl Default for WorkSource {
    fn default() -> Self {
        // ---
        Self {
            uid: 1001,
            package: "com.android.phone".into(),
        }
    }
}

/// A request waiting for its response.
///
/// Owned by the [`RequestTracker`] from submission until it is matched by a
/// response or flushed; either way it is consumed by delivering its outcome.
pub struct PendingRequest {
    serial: Serial,
    kind: RequestKind,
    completion: Completion,
    work_source: WorkSource,
    // insertion order, used to flush oldest first
    seq: u64,
}

impl PendingRequest {
    // ---
    pub fn serial(&self) -> Serial {
        self.serial
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn work_source(&self) -> &WorkSource {
        &self.work_source
    }

    /// Deliver the outcome to the request's completion.
    pub fn complete(self, result: Result<Response>) {
        self.completion.complete(result);
    }

    /// Deliver `error` to the request's completion.
    pub fn fail(self, error: RpcError) {
        self.completion.complete(Err(error));
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("serial", &self.serial)
            .field("kind", &self.kind)
            .field("work_source", &self.work_source)
            .finish_non_exhaustive()
    }
}

struct RequestTable {
    requests: HashMap<Serial, PendingRequest>,
    next_serial: Serial,
    next_seq: u64,
}

impl RequestTable {
    /// Next serial not currently outstanding.
    fn allocate(&mut self) -> Serial {
        // ---
        let mut serial = self.next_serial;
        while self.requests.contains_key(&serial) {
            serial = serial.next();
        }
        self.next_serial = serial.next();
        serial
    }
}

/// Tracks requests waiting for responses
///
/// Maps serials to pending requests. Serials increase monotonically from 1 and
/// wrap back to 1 after `u32::MAX`, skipping any serial still outstanding, so
/// no two outstanding requests ever share a serial.
///
/// All table access goes through one mutex. Completions are never invoked
/// while it is held, so a completion may submit new requests.
pub struct RequestTracker {
    // ---
    table: Mutex<RequestTable>,
}

impl RequestTracker {
    // ---

    /// Create a new empty request tracker
    pub fn new() -> Self {
        // ---
        Self {
            table: Mutex::new(RequestTable {
                requests: HashMap::new(),
                next_serial: Serial::FIRST,
                next_seq: 0,
            }),
        }
    }

    /// Register a new pending request and return its serial.
    pub fn submit(
        &self,
        kind: RequestKind,
        completion: Completion,
        work_source: WorkSource,
    ) -> Serial {
        // ---
        let mut table = lock_ignore_poison(&self.table);

        let serial = table.allocate();
        let seq = table.next_seq;
        table.next_seq += 1;

        table.requests.insert(
            serial,
            PendingRequest {
                serial,
                kind,
                completion,
                work_source,
                seq,
            },
        );
        serial
    }

    /// Remove and return the pending request for `serial`.
    ///
    /// `None` means the response is stale or a duplicate; it is logged and
    /// the table is left untouched.
    pub fn complete(&self, serial: Serial) -> Option<PendingRequest> {
        // ---
        let pending = self.take(serial);

        if pending.is_none() {
            log_debug!("{}", RpcError::StaleResponse(serial));
        }
        pending
    }

    /// Remove `serial` if outstanding, without treating absence as stale.
    pub(crate) fn take(&self, serial: Serial) -> Option<PendingRequest> {
        lock_ignore_poison(&self.table).requests.remove(&serial)
    }

    /// Fail every pending request with `error` and empty the table.
    ///
    /// The table is drained atomically; completions run afterwards, each
    /// exactly once, oldest submission first.
    pub fn flush(&self, error: RpcError) {
        // ---
        let drained = self.drain();
        Self::fail_all(drained, error);
    }

    /// Empty the table, returning its requests oldest first.
    pub(crate) fn drain(&self) -> Vec<PendingRequest> {
        // ---
        let mut drained: Vec<PendingRequest> = {
            let mut table = lock_ignore_poison(&self.table);
            table.requests.drain().map(|(_, pending)| pending).collect()
        };
        drained.sort_by_key(|pending| pending.seq);
        drained
    }

    pub(crate) fn fail_all(requests: Vec<PendingRequest>, error: RpcError) {
        // ---
        if !requests.is_empty() {
            log_debug!("failing {} pending requests: {error}", requests.len());
        }

        for pending in requests {
            log_debug!("{}< {} {error}", pending.serial, pending.kind);
            pending.fail(error.clone());
        }
    }

    /// Whether `serial` is outstanding.
    pub fn contains(&self, serial: Serial) -> bool {
        lock_ignore_poison(&self.table).requests.contains_key(&serial)
    }

    /// Get the number of pending requests
    pub fn len(&self) -> usize {
        // ---
        lock_ignore_poison(&self.table).requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn set_next_serial(&self, serial: Serial) {
        lock_ignore_poison(&self.table).next_serial = serial;
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}
