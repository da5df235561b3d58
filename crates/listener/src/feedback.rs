//! Per-kind processing: dispatch one envelope and tell the peer how it went.

#[cfg(feature = "metrics")]
use std::time::Instant;

use {
    msghub_protocol::{Command, Message, Notification, Reason, ReasonError},
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, warn},
};

#[cfg(feature = "metrics")]
use msghub_metrics::{
    counter, feedback as feedback_metrics, gauge, histogram, labels,
    listener as listener_metrics,
};

use crate::{
    context::{self, DispatchContext},
    dispatch::{Engine, RunScope, call_receivers},
    envelope::InboundEnvelope,
};

/// The reason reported to the peer for a failed dispatch.
///
/// A [`ReasonError`] anywhere in the error chain is forwarded as is; any
/// other failure becomes an application error carrying its message.
pub fn reason_for(error: &anyhow::Error) -> Reason {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ReasonError>())
        .map(|e| e.reason.clone())
        .unwrap_or_else(|| Reason::application_error(error.to_string()))
}

// ── Messages ────────────────────────────────────────────────────────────────

/// Acknowledge, dispatch, then report `consumed` or `failed`.
///
/// Messages without an id are dispatched without any notification.
pub(crate) async fn process_message(engine: &Engine, run: &RunScope, message: Message) {
    let ctx = DispatchContext::of(&message);
    context::scope(ctx, async {
        let _timer = Timer::start::<Message>();
        let notify = engine.auto_notify && message.id.is_some();

        if notify {
            send_notification(engine, message.to_received_notification(), &run.cancel).await;
        }

        match call_receivers(&engine.registries.messages, &message, run).await {
            Ok(()) => {
                if notify {
                    send_notification(engine, message.to_consumed_notification(), &run.cancel)
                        .await;
                }
            },
            Err(e) => {
                let reason = reason_for(&e);
                record_failure::<Message>(&reason);
                error!(
                    message_id = message.id.as_deref().unwrap_or_default(),
                    from = ?message.from,
                    code = reason.code,
                    error = %e,
                    "message processing failed"
                );
                if notify {
                    // The run token may already be cancelled by a stop.
                    let failed = message.to_failed_notification(reason);
                    send_notification(engine, failed, &CancellationToken::new()).await;
                }
            },
        }
    })
    .await;
}

// ── Notifications ───────────────────────────────────────────────────────────

/// Dispatch only. Failures are logged and never reported back.
pub(crate) async fn process_notification(
    engine: &Engine,
    run: &RunScope,
    notification: Notification,
) {
    let ctx = DispatchContext::of(&notification);
    context::scope(ctx, async {
        let _timer = Timer::start::<Notification>();
        if let Err(e) = call_receivers(&engine.registries.notifications, &notification, run).await
        {
            let reason = reason_for(&e);
            record_failure::<Notification>(&reason);
            error!(
                notification_id = notification.id.as_deref().unwrap_or_default(),
                event = %notification.event,
                error = %e,
                "notification processing failed"
            );
        }
    })
    .await;
}

// ── Commands ────────────────────────────────────────────────────────────────

/// Dispatch pending commands; answer failures with a failure response.
///
/// Responses (success or failure status) arriving here are ignored.
pub(crate) async fn process_command(engine: &Engine, run: &RunScope, command: Command) {
    if !command.is_pending() {
        #[cfg(feature = "metrics")]
        counter!(listener_metrics::COMMANDS_IGNORED_TOTAL).increment(1);
        debug!(
            command_id = command.id.as_deref().unwrap_or_default(),
            status = ?command.status,
            "ignoring non-pending command"
        );
        return;
    }

    let ctx = DispatchContext::of(&command);
    context::scope(ctx, async {
        let _timer = Timer::start::<Command>();
        let Err(e) = call_receivers(&engine.registries.commands, &command, run).await else {
            return;
        };

        let reason = reason_for(&e);
        record_failure::<Command>(&reason);
        error!(
            command_id = command.id.as_deref().unwrap_or_default(),
            method = ?command.method,
            uri = command.uri.as_deref().unwrap_or_default(),
            code = reason.code,
            error = %e,
            "command processing failed"
        );

        let response = command.to_failure_response(reason);
        match engine
            .sender
            .send_command(response, &CancellationToken::new())
            .await
        {
            Ok(_) => {
                #[cfg(feature = "metrics")]
                counter!(feedback_metrics::COMMAND_FAILURES_SENT_TOTAL).increment(1);
            },
            Err(send_error) => {
                #[cfg(feature = "metrics")]
                counter!(feedback_metrics::SEND_ERRORS_TOTAL, labels::KIND => "command")
                    .increment(1);
                warn!(
                    command_id = command.id.as_deref().unwrap_or_default(),
                    error = %send_error,
                    "failed to send command failure response"
                );
            },
        }
    })
    .await;
}

// ── Helpers ─────────────────────────────────────────────────────────────────

async fn send_notification(
    engine: &Engine,
    notification: Notification,
    cancel: &CancellationToken,
) {
    let event = notification.event;
    let id = notification.id.clone();
    match engine.sender.send_notification(notification, cancel).await {
        Ok(()) => {
            #[cfg(feature = "metrics")]
            counter!(feedback_metrics::NOTIFICATIONS_SENT_TOTAL, labels::EVENT => event.as_str())
                .increment(1);
            debug!(message_id = id.as_deref().unwrap_or_default(), %event, "notification sent");
        },
        Err(e) => {
            #[cfg(feature = "metrics")]
            counter!(feedback_metrics::SEND_ERRORS_TOTAL, labels::KIND => "notification")
                .increment(1);
            warn!(
                message_id = id.as_deref().unwrap_or_default(),
                %event,
                error = %e,
                "failed to send notification"
            );
        },
    }
}

#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
fn record_failure<E: InboundEnvelope>(reason: &Reason) {
    #[cfg(feature = "metrics")]
    counter!(
        listener_metrics::ENVELOPE_FAILURES_TOTAL,
        labels::KIND => E::KIND.as_str(),
        labels::REASON_CODE => reason.code.to_string()
    )
    .increment(1);
}

/// Counts an envelope in flight and records its processing time on drop.
struct Timer {
    #[cfg(feature = "metrics")]
    kind: &'static str,
    #[cfg(feature = "metrics")]
    started: Instant,
}

impl Timer {
    fn start<E: InboundEnvelope>() -> Self {
        #[cfg(feature = "metrics")]
        {
            counter!(listener_metrics::ENVELOPES_RECEIVED_TOTAL, labels::KIND => E::KIND.as_str())
                .increment(1);
            gauge!(listener_metrics::IN_FLIGHT, labels::KIND => E::KIND.as_str()).increment(1.0);
        }
        Self {
            #[cfg(feature = "metrics")]
            kind: E::KIND.as_str(),
            #[cfg(feature = "metrics")]
            started: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        #[cfg(feature = "metrics")]
        {
            gauge!(listener_metrics::IN_FLIGHT, labels::KIND => self.kind).decrement(1.0);
            histogram!(listener_metrics::PROCESSING_DURATION_SECONDS, labels::KIND => self.kind)
                .record(self.started.elapsed().as_secs_f64());
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        anyhow::{Context, anyhow},
        msghub_protocol::reason_codes,
        rstest::rstest,
    };

    #[test]
    fn structured_reason_is_forwarded() {
        let err: anyhow::Error =
            ReasonError::new(reason_codes::VALIDATION_ERROR, "bad state").into();
        assert_eq!(
            reason_for(&err),
            Reason::new(reason_codes::VALIDATION_ERROR, "bad state")
        );
    }

    #[test]
    fn structured_reason_survives_added_context() {
        let err = Err::<(), _>(ReasonError::new(reason_codes::AUTHORIZATION_ERROR, "denied"))
            .context("while checking access")
            .unwrap_err();
        assert_eq!(reason_for(&err).code, reason_codes::AUTHORIZATION_ERROR);
    }

    #[test]
    fn plain_errors_become_application_errors() {
        let reason = reason_for(&anyhow!("boom"));
        assert_eq!(reason, Reason::application_error("boom"));
        assert_eq!(reason.code, reason_codes::APPLICATION_ERROR);
    }

    #[rstest]
    #[case(reason_codes::VALIDATION_ERROR)]
    #[case(reason_codes::ROUTING_ERROR)]
    #[case(reason_codes::COMMAND_PROCESSING_ERROR)]
    fn structured_codes_pass_through(#[case] code: i32) {
        let err: anyhow::Error = ReasonError::new(code, "nope").into();
        assert_eq!(reason_for(&err).code, code);
    }
}
