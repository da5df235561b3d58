#![cfg(feature = "metrics")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    anyhow::anyhow,
    metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter},
    msghub_config::ListenerConfig,
    msghub_listener::{Listener, OutboxSender, loopback, receiver},
    msghub_metrics::{feedback, labels, listener as listener_metrics},
    msghub_protocol::{
        Command, CommandMethod, CommandStatus, Envelope, Message, Node, ReasonError,
        reason_codes,
    },
    tokio_util::sync::CancellationToken,
};

type Recorded = Vec<(String, Vec<(String, String)>, DebugValue)>;

fn collect(snapshotter: &Snapshotter) -> Recorded {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(key, _, _, value)| {
            let labels = key
                .key()
                .labels()
                .map(|label| (label.key().to_owned(), label.value().to_owned()))
                .collect();
            (key.key().name().to_owned(), labels, value)
        })
        .collect()
}

fn find<'a>(recorded: &'a Recorded, name: &str, wanted: &[(&str, &str)]) -> &'a DebugValue {
    recorded
        .iter()
        .find(|(recorded_name, recorded_labels, _)| {
            recorded_name == name
                && wanted.iter().all(|(key, value)| {
                    recorded_labels
                        .iter()
                        .any(|(k, v)| k == key && v == value)
                })
        })
        .map(|(_, _, value)| value)
        .unwrap_or_else(|| panic!("{name} {wanted:?} was not recorded"))
}

/// One failing pending command, one ignored response, one consumed message.
async fn run_traffic() {
    let (sender, mut outbox) = OutboxSender::new();
    let (channel, injector) = loopback();
    let listener = Listener::new(Arc::new(sender), &ListenerConfig::default());
    listener.add_command_receiver(Arc::new(receiver::from_fn(
        |_: Command, _: CancellationToken| async {
            Err::<(), anyhow::Error>(
                ReasonError::new(reason_codes::VALIDATION_ERROR, "bad state").into(),
            )
        },
    )));
    listener.add_message_receiver(Arc::new(receiver::from_fn(
        |_: Message, _: CancellationToken| async { Ok::<(), anyhow::Error>(()) },
    )));
    listener.start(&channel).await.unwrap();

    let alice = Node::new("alice", "msging.net");
    let mut ignored = Command::request(CommandMethod::Get, "/account").with_id("c0");
    ignored.status = CommandStatus::Success;
    injector.send_command(ignored).unwrap();
    injector
        .send_command(
            Command::request(CommandMethod::Set, "/account")
                .with_id("c1")
                .with_from(alice.clone()),
        )
        .unwrap();
    injector
        .send_message(Message::text("hi").with_id("m1").with_from(alice))
        .unwrap();

    let mut outbound = Vec::new();
    while outbound.len() < 3 {
        let envelope = tokio::time::timeout(Duration::from_secs(5), outbox.recv())
            .await
            .unwrap()
            .ok_or_else(|| anyhow!("outbox closed"))
            .unwrap();
        outbound.push(envelope);
    }
    listener.stop().await.unwrap();
    let answered = outbound.iter().any(|envelope| {
        matches!(envelope, Envelope::Command(command) if command.id.as_deref() == Some("c1"))
    });
    assert!(answered);
}

#[test]
fn processing_records_listener_and_feedback_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    metrics::with_local_recorder(&recorder, || runtime.block_on(run_traffic()));
    let recorded = collect(&snapshotter);

    assert!(matches!(
        find(&recorded, listener_metrics::ENVELOPE_FAILURES_TOTAL, &[
            (labels::KIND, "command"),
            (labels::REASON_CODE, "21"),
        ]),
        DebugValue::Counter(1)
    ));
    assert!(matches!(
        find(&recorded, listener_metrics::COMMANDS_IGNORED_TOTAL, &[]),
        DebugValue::Counter(1)
    ));
    assert!(matches!(
        find(&recorded, feedback::COMMAND_FAILURES_SENT_TOTAL, &[]),
        DebugValue::Counter(1)
    ));
    assert!(matches!(
        find(&recorded, feedback::NOTIFICATIONS_SENT_TOTAL, &[(
            labels::EVENT,
            "consumed"
        )]),
        DebugValue::Counter(1)
    ));

    for kind in ["command", "message"] {
        assert!(matches!(
            find(&recorded, listener_metrics::ENVELOPES_RECEIVED_TOTAL, &[(labels::KIND, kind)]),
            DebugValue::Counter(1)
        ));
        match find(&recorded, listener_metrics::IN_FLIGHT, &[(labels::KIND, kind)]) {
            DebugValue::Gauge(in_flight) => assert_eq!(in_flight.into_inner(), 0.0),
            other => panic!("expected a gauge, got {other:?}"),
        }
        assert!(matches!(
            find(&recorded, listener_metrics::PROCESSING_DURATION_SECONDS, &[(
                labels::KIND,
                kind
            )]),
            DebugValue::Histogram(samples) if samples.len() == 1
        ));
    }
}
