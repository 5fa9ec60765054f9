//! The audit recorder: a bounded queue in front of an [`AuditSink`].
//!
//! Business operations hand entries off with a synchronous, non-blocking
//! [`AuditRecorder::record`]; a dedicated worker task drains the queue and
//! appends to the sink. A failed append never fails the operation that
//! triggered it, but every failure is logged with its cause.

use std::sync::Arc;

use patron_core::{audit::NewAuditEntry, store::AuditSink};
use tokio::{sync::mpsc, task::JoinHandle};

/// Sending half of the audit queue. Cloning is cheap.
#[derive(Clone)]
pub struct AuditRecorder {
  tx: mpsc::Sender<NewAuditEntry>,
}

impl AuditRecorder {
  /// Spawn the worker task draining into `sink` and return the recorder
  /// handle together with the worker's join handle.
  ///
  /// The worker runs until every recorder clone has been dropped and the
  /// queue is empty; await the join handle on shutdown to flush remaining
  /// entries.
  pub fn spawn<K>(sink: Arc<K>, capacity: usize) -> (Self, JoinHandle<()>)
  where
    K: AuditSink + 'static,
  {
    let (tx, mut rx) = mpsc::channel::<NewAuditEntry>(capacity);

    let worker = tokio::spawn(async move {
      while let Some(entry) = rx.recv().await {
        if let Err(error) = sink.append(entry).await {
          tracing::error!(%error, "failed to append audit entry");
        }
      }
    });

    (Self { tx }, worker)
  }

  /// Queue one entry, fire-and-forget. A full or closed queue drops the
  /// entry and logs it; the caller is never blocked or failed.
  pub fn record(&self, entry: NewAuditEntry) {
    let entity_id = entry.entity_id;
    if let Err(error) = self.tx.try_send(entry) {
      tracing::error!(%error, %entity_id, "audit queue rejected entry");
    }
  }
}
