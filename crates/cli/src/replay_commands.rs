//! `msghub replay`: run recorded envelopes through a listener wired to a
//! loopback channel and print what it sends back.

use std::{path::Path, sync::Arc};

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    msghub_config::{ListenerConfig, MsghubConfig},
    msghub_listener::{
        EnvelopeReceiver, EnvelopeSender, Listener, LoopbackInjector, OutboxSender,
        ReceiverRegistration, loopback,
    },
    msghub_protocol::{Command, CommandMethod, Envelope, Message},
    tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

const PING_URI: &str = "/ping";

pub async fn replay(file: Option<&Path>, config: &MsghubConfig) -> Result<()> {
    let outbound = match file {
        Some(path) => {
            let input = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            dispatch_all(BufReader::new(input), &config.listener).await?
        },
        None => dispatch_all(BufReader::new(tokio::io::stdin()), &config.listener).await?,
    };

    for envelope in &outbound {
        println!("{}", serde_json::to_string(envelope)?);
    }
    Ok(())
}

/// Feed every envelope read from `input` to a fresh listener and collect
/// the outbound envelopes once it has drained.
async fn dispatch_all<R>(input: R, config: &ListenerConfig) -> Result<Vec<Envelope>>
where
    R: AsyncBufRead + Unpin,
{
    let (outbox_sender, mut outbox) = OutboxSender::new();
    let sender: Arc<dyn EnvelopeSender> = Arc::new(outbox_sender);
    let listener = Listener::new(Arc::clone(&sender), config);

    listener.add_message_receiver(Arc::new(EchoReceiver {
        sender: Arc::clone(&sender),
    }));
    listener.add_receiver(
        ReceiverRegistration::shared(Arc::new(PingReceiver {
            sender: Arc::clone(&sender),
        }) as Arc<dyn EnvelopeReceiver<Command>>)
        .with_filter(|command: &Command| {
            command.method == CommandMethod::Get && command.uri.as_deref() == Some(PING_URI)
        }),
    );

    let (channel, injector) = loopback();
    listener.start(&channel).await?;
    let injected = inject(input, &injector).await;
    drop(injector);

    listener.channel_drained().await?;
    listener.stop().await?;
    let injected = injected?;

    let outbound = outbox.drain();
    info!(injected, outbound = outbound.len(), "replay finished");
    Ok(outbound)
}

/// Parse newline-delimited JSON envelopes; invalid lines are skipped.
async fn inject<R>(input: R, injector: &LoopbackInjector) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut line_number = 0usize;
    let mut injected = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match Envelope::from_json(line) {
            Ok(envelope) => {
                injector.send_envelope(envelope)?;
                injected += 1;
            },
            Err(e) => warn!(line = line_number, error = %e, "skipping invalid envelope"),
        }
    }
    Ok(injected)
}

// ── Demo receivers ──────────────────────────────────────────────────────────

/// Sends every message back to its sender.
struct EchoReceiver {
    sender: Arc<dyn EnvelopeSender>,
}

#[async_trait]
impl EnvelopeReceiver<Message> for EchoReceiver {
    async fn receive(&self, message: Message, cancel: CancellationToken) -> Result<()> {
        let reply = Message {
            id: None,
            from: None,
            to: message.sender().cloned(),
            pp: None,
            ..message
        };
        self.sender.send_message(reply, &cancel).await
    }
}

/// Answers `get /ping` with an empty success response.
struct PingReceiver {
    sender: Arc<dyn EnvelopeSender>,
}

#[async_trait]
impl EnvelopeReceiver<Command> for PingReceiver {
    async fn receive(&self, command: Command, cancel: CancellationToken) -> Result<()> {
        let response = command.to_success_response(
            Some("application/vnd.lime.ping+json".into()),
            Some(serde_json::json!({})),
        );
        self.sender.send_command(response, &cancel).await?;
        Ok(())
    }
}
