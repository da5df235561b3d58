//! Receiver group selection and concurrent invocation.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use {
    futures::FutureExt,
    tokio_util::{sync::CancellationToken, task::TaskTracker},
    tracing::debug,
};

use crate::{
    Error,
    context::{self, DispatchContext},
    envelope::InboundEnvelope,
    registry::{Registries, Registry, select_group},
    sender::EnvelopeSender,
};

/// Per-run handles shared by every envelope processed between one `start`
/// and the matching `stop`.
#[derive(Clone)]
pub(crate) struct RunScope {
    /// Handed to receivers and acknowledgment sends; cancelled on stop.
    pub cancel: CancellationToken,
    /// Tracks envelope processing and receiver tasks so stop can drain them.
    pub tracker: TaskTracker,
}

impl RunScope {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }
}

/// Shared state of the dispatch engine.
pub(crate) struct Engine {
    pub registries: Registries,
    pub sender: Arc<dyn EnvelopeSender>,
    pub auto_notify: bool,
}

/// Pick the priority group for `envelope` and run all its receivers
/// concurrently.
///
/// Fails with the first receiver error. Receivers still running at that
/// point are not cancelled: they keep going on the run's tracker and `stop`
/// waits for them.
pub(crate) async fn call_receivers<E: InboundEnvelope>(
    registry: &Registry<E>,
    envelope: &E,
    run: &RunScope,
) -> anyhow::Result<()> {
    let candidates = AssertUnwindSafe(registry.candidates(envelope))
        .catch_unwind()
        .await
        .map_err(|payload| Error::PredicatePanicked {
            kind: E::KIND,
            detail: panic_detail(&*payload),
        })??;
    let group = select_group(candidates).ok_or(Error::NoReceiverGroup { kind: E::KIND })?;

    debug!(
        kind = %E::KIND,
        envelope_id = envelope.id().unwrap_or_default(),
        priority = group.priority,
        receivers = group.registrations.len(),
        "dispatching to receiver group"
    );

    let ctx = DispatchContext::of(envelope);
    let handles: Vec<_> = group
        .registrations
        .iter()
        .map(|registration| {
            let registration = Arc::clone(registration);
            let envelope = envelope.clone();
            let cancel = run.cancel.clone();
            // The factory runs inside the task so a panicking factory is
            // reported like a panicking receiver.
            run.tracker.spawn(context::scope(ctx.clone(), async move {
                let receiver = registration.create_receiver();
                receiver.receive(envelope, cancel).await
            }))
        })
        .collect();

    futures::future::try_join_all(
        handles
            .into_iter()
            .map(|handle| async move { handle.await.map_err(Error::ReceiverTask)? }),
    )
    .await?;

    Ok(())
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|detail| (*detail).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
