//! One intake stage per envelope kind.
//!
//! A pump task moves envelopes from the channel stream into an unbounded
//! intake queue; a worker task drains the queue and spawns one processing
//! task per envelope on the run's tracker.

use std::future::Future;

use {
    futures::{StreamExt, stream::BoxStream},
    tokio::{sync::mpsc, task::JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use crate::{dispatch::RunScope, envelope::InboundEnvelope};

pub(crate) struct Stage {
    kind: msghub_protocol::EnvelopeKind,
    intake: CancellationToken,
    ended: CancellationToken,
    pump: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl Stage {
    pub fn spawn<E, P, Fut>(stream: BoxStream<'static, E>, run: &RunScope, process: P) -> Self
    where
        E: InboundEnvelope,
        P: Fn(E) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let intake = CancellationToken::new();
        let ended = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<E>();

        let pump = tokio::spawn({
            let intake = intake.clone();
            let ended_guard = ended.clone().drop_guard();
            let mut stream = stream;
            async move {
                let _ended = ended_guard;
                loop {
                    tokio::select! {
                        biased;
                        () = intake.cancelled() => break,
                        next = stream.next() => match next {
                            Some(envelope) => {
                                if tx.send(envelope).is_err() {
                                    break;
                                }
                            },
                            None => {
                                debug!(kind = %E::KIND, "envelope stream ended");
                                break;
                            },
                        },
                    }
                }
            }
        });

        let tracker = run.tracker.clone();
        let worker = tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                tracker.spawn(process(envelope));
            }
        });

        Self {
            kind: E::KIND,
            intake,
            ended,
            pump,
            worker,
        }
    }

    /// Fires once the pump stops reading, either because the stream ended or
    /// because intake was closed.
    pub fn ended(&self) -> CancellationToken {
        self.ended.clone()
    }

    pub fn cancel_intake(&self) {
        self.intake.cancel();
    }

    /// Stop taking envelopes from the stream, then wait until everything
    /// already queued has been handed to a processing task.
    pub async fn close(self) {
        self.cancel_intake();
        if let Err(e) = self.pump.await {
            warn!(kind = %self.kind, error = %e, "intake pump task failed");
        }
        if let Err(e) = self.worker.await {
            warn!(kind = %self.kind, error = %e, "intake worker task failed");
        }
        debug!(kind = %self.kind, "intake closed");
    }
}
