use std::{sync::Arc, time::Duration};

use {
    msghub_config::ListenerConfig,
    msghub_protocol::{Command, Message, Notification},
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use crate::{
    channel::ReceiverChannel,
    context,
    dispatch::{Engine, RunScope},
    envelope::InboundEnvelope,
    error::{Error, Result},
    feedback,
    pipeline::Stage,
    receiver::EnvelopeReceiver,
    registry::{ReceiverRegistration, Registries},
    sender::EnvelopeSender,
};

/// Routes envelopes from a [`ReceiverChannel`] to registered receivers.
///
/// Receivers can be added at any time; envelopes already being dispatched
/// keep the registrations they started with. A listener can be started and
/// stopped repeatedly.
pub struct Listener {
    engine: Arc<Engine>,
    drain_timeout: Duration,
    running: Mutex<Option<Running>>,
}

struct Running {
    run: RunScope,
    stages: Vec<Stage>,
}

impl Listener {
    pub fn new(sender: Arc<dyn EnvelopeSender>, config: &ListenerConfig) -> Self {
        Self {
            engine: Arc::new(Engine {
                registries: Registries::new(),
                sender,
                auto_notify: config.auto_notify,
            }),
            drain_timeout: config.drain_timeout(),
            running: Mutex::new(None),
        }
    }

    // ── Registration ────────────────────────────────────────────────────────

    pub fn add_receiver<E: InboundEnvelope>(&self, registration: ReceiverRegistration<E>) {
        self.engine.registries.add(registration);
    }

    /// Register one shared message receiver that accepts every message at the
    /// default priority.
    pub fn add_message_receiver(&self, receiver: Arc<dyn EnvelopeReceiver<Message>>) {
        self.add_receiver(ReceiverRegistration::shared(receiver));
    }

    pub fn add_notification_receiver(&self, receiver: Arc<dyn EnvelopeReceiver<Notification>>) {
        self.add_receiver(ReceiverRegistration::shared(receiver));
    }

    pub fn add_command_receiver(&self, receiver: Arc<dyn EnvelopeReceiver<Command>>) {
        self.add_receiver(ReceiverRegistration::shared(receiver));
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Start consuming the channel's three streams.
    pub async fn start(&self, channel: &dyn ReceiverChannel) -> Result<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(Error::AlreadyStarted);
        }

        let run = RunScope::new();
        let stages = vec![
            Stage::spawn(channel.message_stream(), &run, {
                let (engine, run) = (Arc::clone(&self.engine), run.clone());
                move |message| {
                    let (engine, run) = (Arc::clone(&engine), run.clone());
                    async move { feedback::process_message(&engine, &run, message).await }
                }
            }),
            Stage::spawn(channel.notification_stream(), &run, {
                let (engine, run) = (Arc::clone(&self.engine), run.clone());
                move |notification| {
                    let (engine, run) = (Arc::clone(&engine), run.clone());
                    async move {
                        feedback::process_notification(&engine, &run, notification).await
                    }
                }
            }),
            Stage::spawn(channel.command_stream(), &run, {
                let (engine, run) = (Arc::clone(&self.engine), run.clone());
                move |command| {
                    let (engine, run) = (Arc::clone(&engine), run.clone());
                    async move { feedback::process_command(&engine, &run, command).await }
                }
            }),
        ];

        *running = Some(Running { run, stages });
        info!(auto_notify = self.engine.auto_notify, "listener started");
        Ok(())
    }

    /// Stop consuming and drain.
    ///
    /// Intake closes first, so envelopes already queued still get processed.
    /// In-flight work gets up to the drain timeout to finish; after that the
    /// run's cancellation token fires and `stop` waits for whatever is left.
    ///
    /// Called from a receiver, `stop` returns once intake is closed and the
    /// drain continues in the background, since the caller's own task is part
    /// of the work being drained.
    pub async fn stop(&self) -> Result<()> {
        let mut running = self.running.lock().await;
        let Running { run, stages } = running.take().ok_or(Error::NotStarted)?;
        info!("listener stopping");

        futures::future::join_all(stages.into_iter().map(Stage::close)).await;
        run.tracker.close();

        if context::current().is_some() {
            debug!("stop requested by a receiver, draining in the background");
            tokio::spawn(drain(run, self.drain_timeout));
            return Ok(());
        }
        drain(run, self.drain_timeout).await;
        Ok(())
    }

    /// Wait until every stream of the channel has ended.
    ///
    /// Used with finite channels (replays, tests) to know that all envelopes
    /// were taken in before calling [`stop`](Self::stop).
    pub async fn channel_drained(&self) -> Result<()> {
        let ended: Vec<_> = {
            let running = self.running.lock().await;
            let Running { stages, .. } = running.as_ref().ok_or(Error::NotStarted)?;
            stages.iter().map(Stage::ended).collect()
        };
        futures::future::join_all(ended.iter().map(|token| token.cancelled())).await;
        Ok(())
    }

    pub async fn is_listening(&self) -> bool {
        self.running.lock().await.is_some()
    }
}

async fn drain(run: RunScope, timeout: Duration) {
    if tokio::time::timeout(timeout, run.tracker.wait())
        .await
        .is_err()
    {
        warn!(
            in_flight = run.tracker.len(),
            timeout_secs = timeout.as_secs_f64(),
            "drain timed out, cancelling in-flight receivers"
        );
    }
    run.cancel.cancel();
    run.tracker.wait().await;
    info!("listener stopped");
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(Running { run, stages }) = self.running.get_mut().take() {
            for stage in &stages {
                stage.cancel_intake();
            }
            run.cancel.cancel();
        }
    }
}
