use std::time::Duration;

use eyre::WrapErr;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use crate::wire::{
    BackendMessage, BackendVariable, BreakpointLocation, CommandResult, Info, PendingCommand,
    ResumeMode, ResumeModeBody, ResumeState, parse_variables,
};
use crate::{Backend, ContextKind};

/// [`Backend`] talking to a running debug server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// `request_timeout` bounds every single round trip.
    pub fn new(host: &str, port: u16, request_timeout: Duration) -> eyre::Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .wrap_err("building http client")?;

        Ok(Self {
            client,
            base_url: format!("http://{host}:{port}/MTADebug"),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    /// Send and parse the body; any failure is logged and mapped to `None`.
    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, request: RequestBuilder) -> Option<T> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(endpoint, error = %e, "backend unreachable");
                return None;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!(endpoint, %status, "backend returned an error status");
            return None;
        }

        match response.json::<T>().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::debug!(endpoint, error = %e, "could not parse backend response");
                None
            }
        }
    }

    /// POST where only the status matters.
    async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> bool {
        match self.client.post(self.url(endpoint)).json(body).send().await {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                tracing::debug!(endpoint, status = %response.status(), "backend rejected request");
                false
            }
            Err(e) => {
                tracing::debug!(endpoint, error = %e, "backend unreachable");
                false
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Option<T> {
        self.fetch(endpoint, self.client.get(self.url(endpoint)))
            .await
    }

    async fn push_command(
        &self,
        context: ContextKind,
        command: &PendingCommand,
    ) -> Option<serde_json::Value> {
        let endpoint = format!("push_command{}", context.suffix());
        let request = self.client.post(self.url(&endpoint)).json(command);
        self.fetch(&endpoint, request).await
    }
}

impl Backend for HttpBackend {
    async fn get_info(&self) -> Option<Info> {
        self.get("get_info").await
    }

    async fn set_breakpoints(&self, breakpoints: &[BreakpointLocation]) -> bool {
        tracing::debug!(count = breakpoints.len(), "sending breakpoints");
        self.post("set_breakpoints", breakpoints).await
    }

    async fn set_resume_mode(&self, context: ContextKind, mode: ResumeMode) -> bool {
        let endpoint = format!("set_resume_mode{}", context.suffix());
        self.post(&endpoint, &ResumeModeBody { resume_mode: mode })
            .await
    }

    async fn get_resume_mode(&self, context: ContextKind) -> Option<ResumeState> {
        self.get(&format!("get_resume_mode{}", context.suffix()))
            .await
    }

    async fn get_messages(&self) -> Option<Vec<BackendMessage>> {
        self.get("get_messages").await
    }

    async fn request_variables(
        &self,
        context: ContextKind,
        command: &PendingCommand,
    ) -> Option<Vec<BackendVariable>> {
        self.push_command(context, command).await.map(parse_variables)
    }

    async fn run_command(
        &self,
        context: ContextKind,
        command: &PendingCommand,
    ) -> Option<CommandResult> {
        let value = self.push_command(context, command).await?;
        match serde_json::from_value(value) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::debug!(command = %command.command, error = %e, "unexpected command result");
                None
            }
        }
    }
}
