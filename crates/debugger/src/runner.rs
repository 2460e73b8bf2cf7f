use std::{sync::Arc, time::Duration};

use backend::Backend;
use futures::StreamExt;
use tokio::{sync::mpsc, task::JoinSet};
use transport::{DapTransport, Message, OutgoingMessage};

use crate::{
    client::ClientSender,
    session::{Session, SessionSettings},
};

/// How long in-flight requests may keep running once the session ends.
const REQUEST_GRACE: Duration = Duration::from_secs(2);
/// How long queued messages may take to reach the editor on shutdown.
const WRITER_DRAIN: Duration = Duration::from_secs(2);

/// Serve one editor connection until it disconnects or closes the stream.
///
/// Every request runs in its own task. Responses and events are funneled
/// through a channel to a single writer task.
pub async fn run<T, B>(transport: T, backend: Arc<B>, settings: SessionSettings) -> eyre::Result<()>
where
    T: DapTransport,
    B: Backend,
{
    let (mut reader, mut writer) = transport::split(transport);
    let (tx, mut rx) = mpsc::unbounded_channel::<OutgoingMessage>();

    let writer_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = writer.send(msg).await {
                tracing::warn!(error = %e, "writing to editor failed");
                break;
            }
        }
        tracing::debug!("writer task finished");
    });

    let session = Arc::new(Session::new(backend, ClientSender::new(tx), settings));
    let terminated = session.terminated();
    let mut requests = JoinSet::new();

    loop {
        tokio::select! {
            _ = terminated.cancelled() => {
                tracing::debug!("session terminated");
                break;
            }
            Some(result) = requests.join_next(), if !requests.is_empty() => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "request handler failed");
                }
            }
            msg = reader.next() => match msg {
                Some(Ok(Message::Request(request))) => {
                    requests.spawn(Arc::clone(&session).handle_request(request));
                }
                Some(Ok(Message::Response(response))) => {
                    tracing::debug!(command = %response.command, "ignoring response from editor");
                }
                Some(Ok(Message::Event(event))) => {
                    tracing::debug!(event = %event.event, "ignoring event from editor");
                }
                Some(Err(e)) if e.is_recoverable() => {
                    tracing::warn!(error = ?e, "skipping malformed message from editor");
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "could not decode message from editor");
                    break;
                }
                None => {
                    tracing::info!("editor closed the connection");
                    break;
                }
            },
        }
    }

    // stop a launch that is still probing the debug server
    terminated.cancel();
    let _ = tokio::time::timeout(REQUEST_GRACE, async {
        while requests.join_next().await.is_some() {}
    })
    .await;
    requests.shutdown().await;
    session.shutdown().await;
    drop(session);

    match tokio::time::timeout(WRITER_DRAIN, writer_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "writer task failed"),
        Err(_) => tracing::warn!("timed out flushing messages to the editor"),
    }
    Ok(())
}
