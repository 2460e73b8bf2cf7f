use std::sync::Arc;

use backend::{Backend, BackendMessage, ContextKind, MessageType};
use tokio::time::{Instant, MissedTickBehavior};
use transport::events::{
    Event, OutputCategory, OutputEventBody, StoppedEventBody, StoppedReason,
};

use super::{Poller, Session, source_for};
use crate::handles::HandleKey;

fn output_category(kind: MessageType) -> OutputCategory {
    match kind {
        MessageType::Console => OutputCategory::Console,
        MessageType::Stdout => OutputCategory::Stdout,
        MessageType::Stderr => OutputCategory::Stderr,
        MessageType::Telemetry => OutputCategory::Telemetry,
    }
}

impl<B: Backend> Session<B> {
    /// Spawn the poll loop unless it is already running or the session ended.
    pub(super) async fn start_polling(self: &Arc<Self>) {
        let mut poller = self.poller.lock().await;
        if poller.is_some() || self.terminated.is_cancelled() {
            return;
        }

        let period = self.settings.timing.poll_interval();
        let cancel = self.terminated.child_token();
        let token = cancel.clone();
        let session = Arc::clone(self);

        let handle = tokio::spawn(async move {
            tracing::debug!(?period, "poll loop started");
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticks.tick() => session.poll_tick().await,
                }
            }
            tracing::debug!("poll loop stopped");
        });

        *poller = Some(Poller { cancel, handle });
    }

    /// One round of polling: forward queued messages, then look for new
    /// pauses in both contexts.
    pub async fn poll_tick(&self) {
        let server_epoch = self.context(ContextKind::Server).lock().await.epoch();
        let client_epoch = self.context(ContextKind::Client).lock().await.epoch();

        let (messages, server_state, client_state) = tokio::join!(
            self.backend.get_messages(),
            self.backend.get_resume_mode(ContextKind::Server),
            self.backend.get_resume_mode(ContextKind::Client),
        );

        for message in messages.into_iter().flatten() {
            self.forward_message(message).await;
        }

        let observed = [
            (ContextKind::Server, server_state, server_epoch),
            (ContextKind::Client, client_state, client_epoch),
        ];
        for (kind, state, epoch) in observed {
            let Some(state) = state else {
                continue;
            };
            let stopped = self.context(kind).lock().await.observe(state, epoch);
            if stopped {
                self.client.send_event(Event::Stopped(StoppedEventBody {
                    reason: StoppedReason::Breakpoint,
                    thread_id: kind.thread_id(),
                }));
            }
        }
    }

    async fn forward_message(&self, message: BackendMessage) {
        let mut body = OutputEventBody::new(
            output_category(message.kind),
            format!("{}\n", message.message),
        );

        if !message.file.is_empty() {
            let root = self.resource_root.lock().await.clone();
            body.source = Some(source_for(&message.file, root.as_ref()));
            body.line = Some(message.line);
        }
        if let Some(key) = message.var_ref.key() {
            let handle = self
                .handles
                .lock()
                .await
                .create(HandleKey::Table(key.to_string()));
            body.variables_reference = Some(handle);
        }

        self.client.send_event(Event::Output(body));
    }
}
