//! The debug session: editor requests in, debug server calls out.

mod poll;

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};

use backend::{Backend, BackendVariable, ContextKind, PendingCommand, ResumeMode};
use eyre::WrapErr;
use serde::de::DeserializeOwned;
use server::BackendProcess;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use transport::{
    Request,
    events::{Event, OutputCategory, OutputEventBody},
    requests::{
        EvaluateArguments, LaunchArguments, ScopesArguments, SetBreakpointsArguments,
        StackTraceArguments, ThreadArguments, VariablesArguments,
    },
    responses::{
        Capabilities, ContinueResponse, EvaluateResponse, ScopesResponse, SetBreakpointsResponse,
        StackTraceResponse, ThreadsResponse, VariablesResponse,
    },
    types::{Breakpoint, Scope, Source, StackFrame, Thread, Variable, VariablesReference},
};

use crate::{
    breakpoints::{BreakpointRegistry, verify_lines},
    client::ClientSender,
    commands::{REQUEST_VARIABLE, parse_expression},
    context::ExecutionContext,
    handles::{HandleKey, VariableHandles},
    paths::{ResourceRoot, basename},
    stack::parse_traceback,
};

/// Everything a session needs besides the backend and the editor connection.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Debug server executable started by `launch`.
    pub executable: PathBuf,
    /// Port passed to the debug server, which must match the backend's.
    pub backend_port: u16,
    pub timing: config::SessionConfig,
}

struct Poller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// State of one debugging session against one debug server.
///
/// Requests are handled concurrently, so all state sits behind its own lock
/// and no state lock is held while waiting for the backend. The only lock
/// held across a backend call is `breakpoint_upload`, which orders uploads
/// of the full breakpoint set.
pub struct Session<B> {
    backend: Arc<B>,
    client: ClientSender,
    settings: SessionSettings,

    server_context: Mutex<ExecutionContext>,
    client_context: Mutex<ExecutionContext>,
    breakpoints: Mutex<BreakpointRegistry>,
    breakpoint_upload: Mutex<()>,
    handles: Mutex<VariableHandles>,
    answer_id: AtomicI64,
    resource_root: Mutex<Option<ResourceRoot>>,
    /// Thread of the last `stackTrace`; `variables` resolves against it.
    current_thread: AtomicI64,

    process: Mutex<Option<BackendProcess>>,
    poller: Mutex<Option<Poller>>,
    terminated: CancellationToken,
}

fn arguments<T: DeserializeOwned>(request: &Request) -> eyre::Result<T> {
    let value = request
        .arguments
        .clone()
        .unwrap_or_else(|| serde_json::json!({}));
    serde_json::from_value(value)
        .wrap_err_with(|| format!("invalid arguments for {}", request.command))
}

/// Editor-facing source for a resource-relative script path.
fn source_for(file: &str, root: Option<&ResourceRoot>) -> Source {
    let path = match root {
        Some(root) => root.resolve(file),
        None => file.to_string(),
    };
    Source::new(basename(file), path)
}

fn stderr(output: impl Into<String>) -> Event {
    Event::Output(OutputEventBody::new(OutputCategory::Stderr, output))
}

impl<B: Backend> Session<B> {
    pub fn new(backend: Arc<B>, client: ClientSender, settings: SessionSettings) -> Self {
        Self {
            backend,
            client,
            settings,
            server_context: Mutex::new(ExecutionContext::new(ContextKind::Server)),
            client_context: Mutex::new(ExecutionContext::new(ContextKind::Client)),
            breakpoints: Mutex::new(BreakpointRegistry::new()),
            breakpoint_upload: Mutex::new(()),
            handles: Mutex::new(VariableHandles::default()),
            answer_id: AtomicI64::new(1),
            resource_root: Mutex::new(None),
            current_thread: AtomicI64::new(ContextKind::Server.thread_id()),
            process: Mutex::new(None),
            poller: Mutex::new(None),
            terminated: CancellationToken::new(),
        }
    }

    fn context(&self, kind: ContextKind) -> &Mutex<ExecutionContext> {
        match kind {
            ContextKind::Server => &self.server_context,
            ContextKind::Client => &self.client_context,
        }
    }

    /// Copy of a context's current state.
    pub async fn context_state(&self, kind: ContextKind) -> ExecutionContext {
        self.context(kind).lock().await.clone()
    }

    /// Cancelled once the editor disconnected.
    pub fn terminated(&self) -> CancellationToken {
        self.terminated.clone()
    }

    pub async fn is_polling(&self) -> bool {
        self.poller.lock().await.is_some()
    }

    pub fn client(&self) -> &ClientSender {
        &self.client
    }

    fn next_answer_id(&self) -> i64 {
        self.answer_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Handle one editor request. Every request gets exactly one response.
    #[tracing::instrument(skip_all, fields(seq = request.seq, command = %request.command))]
    pub async fn handle_request(self: Arc<Self>, request: Request) {
        if self.client.tracing() {
            tracing::info!(arguments = ?request.arguments, "received request");
        }

        let result = match request.command.as_str() {
            "initialize" => self.initialize(&request),
            "launch" => self.launch(&request).await,
            "setBreakpoints" => self.set_breakpoints(&request).await,
            "threads" => self.threads(&request),
            "stackTrace" => self.stack_trace(&request).await,
            "scopes" => self.scopes(&request).await,
            "variables" => self.variables(&request).await,
            "continue" => self.step(&request, ResumeMode::Resume).await,
            "next" => self.step(&request, ResumeMode::StepOver).await,
            "stepIn" => self.step(&request, ResumeMode::StepInto).await,
            "stepOut" => self.step(&request, ResumeMode::StepOut).await,
            "evaluate" => self.evaluate(&request).await,
            "restart" => {
                self.client.respond_empty(&request);
                Ok(())
            }
            "disconnect" => self.disconnect(&request).await,
            other => Err(eyre::eyre!("unsupported command: {other}")),
        };

        if let Err(e) = result {
            let message = format!("{e:#}");
            tracing::warn!(error = %message, "request failed");
            self.client.respond_error(&request, message);
        }
    }

    fn initialize(&self, request: &Request) -> eyre::Result<()> {
        let capabilities = Capabilities {
            supports_restart_request: Some(true),
            ..Default::default()
        };
        self.client.respond(request, &capabilities);
        Ok(())
    }

    async fn launch(self: &Arc<Self>, request: &Request) -> eyre::Result<()> {
        let args: LaunchArguments = arguments(request)?;
        self.client.set_trace(args.trace.unwrap_or(false));

        let process = BackendProcess::spawn(&self.settings.executable, self.settings.backend_port)
            .wrap_err("starting debug server")?;
        tracing::info!(pid = process.id(), serverpath = %args.serverpath.display(), "launched debug server");
        *self.process.lock().await = Some(process);

        if let Err(e) = self.wait_until_ready().await {
            let process = self.process.lock().await.take();
            if let Some(process) = process {
                process.terminate().await;
            }
            return Err(e);
        }

        let root = ResourceRoot::from_server_path(&args.serverpath);
        tracing::debug!(root = root.as_str(), "resolved resource root");
        *self.resource_root.lock().await = Some(root);

        self.start_polling().await;
        self.client.send_event(Event::Initialized);

        let mode = if args.stop_on_entry.unwrap_or(false) {
            ResumeMode::StepInto
        } else {
            ResumeMode::Resume
        };
        for kind in ContextKind::ALL {
            self.resume(kind, mode).await;
        }

        self.client.respond_empty(request);
        Ok(())
    }

    /// Probe the debug server until it answers, the launch timeout passes or
    /// the session ends.
    async fn wait_until_ready(&self) -> eyre::Result<()> {
        let timeout = self.settings.timing.launch_timeout();
        let retry = self.settings.timing.launch_retry_interval();

        let probe = async {
            loop {
                if let Some(info) = self.backend.get_info().await {
                    tracing::debug!(resource = %info.resource_name, "debug server ready");
                    return;
                }
                tracing::trace!("debug server not ready yet");
                tokio::time::sleep(retry).await;
            }
        };

        tokio::select! {
            _ = self.terminated.cancelled() => eyre::bail!("session ended during launch"),
            ready = tokio::time::timeout(timeout, probe) => ready.map_err(|_| {
                eyre::eyre!("debug server did not answer within {}s", timeout.as_secs())
            }),
        }
    }

    async fn set_breakpoints(&self, request: &Request) -> eyre::Result<()> {
        let args: SetBreakpointsArguments = arguments(request)?;
        let path = args
            .source
            .path
            .clone()
            .ok_or_else(|| eyre::eyre!("setBreakpoints needs a source path"))?;
        let requested = args.requested_lines();

        let (lines, read_error) = match tokio::fs::read_to_string(&path).await {
            Ok(source) => (verify_lines(&source, &requested), None),
            Err(e) => {
                let message = format!("could not read {}: {e}", path.display());
                self.client.send_event(stderr(format!("{message}\n")));
                (requested, Some(message))
            }
        };

        let registered = self.breakpoints.lock().await.replace(&path, lines);
        self.upload_breakpoints().await;

        let breakpoints = registered
            .iter()
            .map(|bp| Breakpoint {
                id: Some(bp.id),
                verified: read_error.is_none(),
                message: read_error.clone(),
                source: Some(args.source.clone()),
                line: Some(bp.line),
            })
            .collect();
        self.client
            .respond(request, &SetBreakpointsResponse { breakpoints });
        Ok(())
    }

    /// Send the complete breakpoint set.
    async fn upload_breakpoints(&self) {
        let _upload = self.breakpoint_upload.lock().await;
        let locations = self.breakpoints.lock().await.locations();
        tracing::debug!(count = locations.len(), "uploading breakpoints");
        if !self.backend.set_breakpoints(&locations).await {
            tracing::warn!("debug server did not accept breakpoints");
        }
    }

    fn threads(&self, request: &Request) -> eyre::Result<()> {
        let threads = ContextKind::ALL
            .iter()
            .map(|kind| Thread {
                id: kind.thread_id(),
                name: kind.name().to_string(),
            })
            .collect();
        self.client.respond(request, &ThreadsResponse { threads });
        Ok(())
    }

    async fn stack_trace(&self, request: &Request) -> eyre::Result<()> {
        let args: StackTraceArguments = arguments(request)?;
        let kind = ContextKind::from_thread_id(args.thread_id);
        self.current_thread
            .store(kind.thread_id(), Ordering::SeqCst);

        let traceback = self.context(kind).lock().await.traceback.clone();
        let parsed = parse_traceback(&traceback);
        for line in &parsed.unmatched {
            self.client
                .send_event(stderr(format!("unrecognised traceback line: {line}\n")));
        }

        let root = self.resource_root.lock().await.clone();
        let total_frames = parsed.frames.len();
        let start = args.start_frame.unwrap_or(0).max(0) as usize;
        let levels = match args.levels {
            Some(levels) if levels > 0 => levels as usize,
            _ => total_frames,
        };

        let stack_frames = parsed
            .frames
            .into_iter()
            .enumerate()
            .skip(start)
            .take(levels)
            .map(|(index, frame)| StackFrame {
                id: index as i64,
                name: frame.function,
                source: Some(source_for(&frame.file, root.as_ref())),
                line: frame.line,
                column: 0,
            })
            .collect();

        self.client.respond(
            request,
            &StackTraceResponse {
                stack_frames,
                total_frames,
            },
        );
        Ok(())
    }

    async fn scopes(&self, request: &Request) -> eyre::Result<()> {
        let args: ScopesArguments = arguments(request)?;
        let frame = args.frame_id;

        let scopes = {
            let mut handles = self.handles.lock().await;
            [
                ("Local", HandleKey::Local(frame)),
                ("Upvalues", HandleKey::Upvalue(frame)),
                ("Global", HandleKey::Global(frame)),
            ]
            .into_iter()
            .map(|(name, key)| Scope {
                name: name.to_string(),
                variables_reference: handles.create(key),
                expensive: false,
            })
            .collect()
        };
        self.client.respond(request, &ScopesResponse { scopes });
        Ok(())
    }

    async fn variables(&self, request: &Request) -> eyre::Result<()> {
        let args: VariablesArguments = arguments(request)?;
        let handle = args.variables_reference;
        let kind = ContextKind::from_thread_id(self.current_thread.load(Ordering::SeqCst));

        let key = self.handles.lock().await.get(handle).cloned();
        let entries = match key {
            None => {
                tracing::debug!(handle, "unknown variables reference");
                Vec::new()
            }
            Some(HandleKey::Global(_)) => self.context(kind).lock().await.global_variables.clone(),
            Some(key) => {
                let fetched = self.request_variables(kind, handle, &key).await;
                let mut context = self.context(kind).lock().await;
                match key {
                    HandleKey::Local(_) => context.local_variables = fetched.clone(),
                    HandleKey::Upvalue(_) => context.upvalue_variables = fetched.clone(),
                    _ => {}
                }
                fetched
            }
        };

        let variables = self.protocol_variables(entries).await;
        self.client
            .respond(request, &VariablesResponse { variables });
        Ok(())
    }

    async fn request_variables(
        &self,
        kind: ContextKind,
        handle: VariablesReference,
        key: &HandleKey,
    ) -> Vec<BackendVariable> {
        let command = PendingCommand {
            command: REQUEST_VARIABLE.to_string(),
            args: vec![handle.to_string(), key.to_string()],
            answer_id: self.next_answer_id(),
        };
        self.backend
            .request_variables(kind, &command)
            .await
            .unwrap_or_else(|| {
                tracing::debug!(context = %kind, %key, "no variables from debug server");
                Vec::new()
            })
    }

    /// Expandable entries get a fresh table handle.
    async fn protocol_variables(&self, entries: Vec<BackendVariable>) -> Vec<Variable> {
        let mut handles = self.handles.lock().await;
        entries
            .into_iter()
            .map(|entry| {
                let variables_reference = entry
                    .var_ref
                    .key()
                    .map(|key| handles.create(HandleKey::Table(key.to_string())))
                    .unwrap_or(0);
                Variable {
                    name: entry.name,
                    value: entry.value,
                    r#type: (!entry.kind.is_empty()).then_some(entry.kind),
                    variables_reference,
                }
            })
            .collect()
    }

    async fn step(&self, request: &Request, mode: ResumeMode) -> eyre::Result<()> {
        let args: ThreadArguments = arguments(request)?;
        self.resume(ContextKind::from_thread_id(args.thread_id), mode)
            .await;

        if mode == ResumeMode::Resume {
            self.client.respond(
                request,
                &ContinueResponse {
                    all_threads_continued: false,
                },
            );
        } else {
            self.client.respond_empty(request);
        }
        Ok(())
    }

    /// Ask the debug server to resume `kind` and consider it running. The
    /// local state changes only after the call returns so that a poll racing
    /// this one cannot see the old pause under the new epoch.
    async fn resume(&self, kind: ContextKind, mode: ResumeMode) {
        if !self.backend.set_resume_mode(kind, mode).await {
            tracing::warn!(context = %kind, ?mode, "debug server did not accept resume mode");
        }
        self.context(kind).lock().await.mark_running(mode);
    }

    async fn evaluate(&self, request: &Request) -> eyre::Result<()> {
        let args: EvaluateArguments = arguments(request)?;
        let (command, command_args) = parse_expression(&args.expression);
        let pending = PendingCommand {
            command,
            args: command_args,
            answer_id: self.next_answer_id(),
        };

        let response = match self
            .backend
            .run_command(ContextKind::Server, &pending)
            .await
        {
            Some(answer) => {
                let variables_reference = match answer.var.key() {
                    Some(key) => self
                        .handles
                        .lock()
                        .await
                        .create(HandleKey::Table(key.to_string())),
                    None => 0,
                };
                EvaluateResponse {
                    result: answer.res,
                    variables_reference,
                }
            }
            None => {
                tracing::debug!(command = %pending.command, "no answer to evaluate");
                EvaluateResponse {
                    result: String::new(),
                    variables_reference: 0,
                }
            }
        };
        self.client.respond(request, &response);
        Ok(())
    }

    async fn disconnect(&self, request: &Request) -> eyre::Result<()> {
        self.shutdown().await;
        self.client.respond_empty(request);
        self.terminated.cancel();
        Ok(())
    }

    /// Stop polling and kill the debug server. Safe to call more than once.
    pub async fn shutdown(&self) {
        let poller = self.poller.lock().await.take();
        if let Some(poller) = poller {
            poller.cancel.cancel();
            if let Err(e) = poller.handle.await {
                tracing::warn!(error = %e, "poll loop ended abnormally");
            }
        }

        let process = self.process.lock().await.take();
        if let Some(process) = process {
            process.terminate().await;
        }
    }
}
