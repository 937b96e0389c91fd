//! Process bridge: an external driver acting as a [`Provider`].
//!
//! Each session gets its own driver process. The driver reads one JSON
//! request per line on stdin and answers with one JSON line on stdout,
//! correlated by `seq`; its stderr is passed through. The driver learns its
//! identity from `ABR_PROVIDER`, `ABR_SESSION`, and `ABR_DEVICE` or
//! `ABR_UDID`.
//!
//! A closed pipe or an unreadable reply ends the session: both surface as
//! [`ProviderError::Fatal`].

pub mod wire;

use std::process::Stdio;
use std::time::Duration;

use abr_core::{DeviceSelector, ElementHandle, FailureKind, LaunchSpec, Provider, ProviderCall, ProviderError, ProviderFactory, ProviderKind, SnapshotRequest};
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use self::wire::{Reply, Request, RequestBody};
use crate::config::Drivers;

/// How long a driver gets to exit on its own after acknowledging shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Starts one driver process per session.
#[derive(Debug, Clone)]
pub struct BridgeFactory {
	drivers: Drivers,
}

impl BridgeFactory {
	pub fn new(drivers: Drivers) -> Self {
		Self { drivers }
	}
}

#[async_trait]
impl ProviderFactory for BridgeFactory {
	async fn launch(&self, session: &str, spec: &LaunchSpec) -> Result<Box<dyn Provider>, ProviderError> {
		let Some((program, args)) = self.drivers.for_kind(spec.kind).split_first() else {
			return Err(ProviderError::fatal(format!("no driver configured for the {} provider", spec.kind)));
		};

		let mut command = Command::new(program);
		command
			.args(args)
			.env("ABR_PROVIDER", spec.kind.as_str())
			.env("ABR_SESSION", session)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true);
		match &spec.device {
			Some(DeviceSelector::Name(name)) => {
				command.env("ABR_DEVICE", name);
			}
			Some(DeviceSelector::Udid(udid)) => {
				command.env("ABR_UDID", udid);
			}
			None => {}
		}

		let mut child = command
			.spawn()
			.map_err(|err| ProviderError::fatal(format!("failed to start driver `{program}`: {err}")))?;
		let stdin = child.stdin.take().ok_or_else(|| ProviderError::fatal("driver stdin unavailable"))?;
		let stdout = child.stdout.take().ok_or_else(|| ProviderError::fatal("driver stdout unavailable"))?;

		info!(target = "abr.bridge", session = %session, provider = %spec.kind, driver = %program, pid = ?child.id(), "driver started");
		Ok(Box::new(BridgeProvider::new(spec.kind, session, stdout, stdin).with_child(child)))
	}
}

/// Provider that forwards every call over a line-oriented pipe pair.
pub struct BridgeProvider<R, W> {
	kind: ProviderKind,
	session: String,
	reader: BufReader<R>,
	writer: W,
	seq: u64,
	child: Option<Child>,
}

impl<R, W> BridgeProvider<R, W>
where
	R: AsyncRead + Unpin + Send,
	W: AsyncWrite + Unpin + Send,
{
	pub fn new(kind: ProviderKind, session: impl Into<String>, reader: R, writer: W) -> Self {
		Self {
			kind,
			session: session.into(),
			reader: BufReader::new(reader),
			writer,
			seq: 0,
			child: None,
		}
	}

	/// Ties the driver process's lifetime to this provider.
	pub fn with_child(mut self, child: Child) -> Self {
		self.child = Some(child);
		self
	}

	async fn exchange(&mut self, body: RequestBody<'_>) -> Result<Value, ProviderError> {
		self.seq += 1;
		let seq = self.seq;
		let name = body.name();

		let mut line = serde_json::to_string(&Request { seq, body }).map_err(|err| ProviderError::fatal(format!("failed to encode request: {err}")))?;
		line.push('\n');
		debug!(target = "abr.bridge", session = %self.session, seq, request = name, "sending");

		self.writer.write_all(line.as_bytes()).await.map_err(lost)?;
		self.writer.flush().await.map_err(lost)?;

		let mut buf = String::new();
		loop {
			buf.clear();
			let read = self.reader.read_line(&mut buf).await.map_err(lost)?;
			if read == 0 {
				return Err(ProviderError::fatal("driver closed its output"));
			}
			let reply = buf.trim();
			if reply.is_empty() {
				continue;
			}

			let reply: Reply = serde_json::from_str(reply).map_err(|err| ProviderError::fatal(format!("unreadable driver reply: {err}")))?;
			if reply.seq < seq {
				warn!(target = "abr.bridge", session = %self.session, seq = reply.seq, expected = seq, "discarding late reply");
				continue;
			}
			if reply.seq > seq {
				return Err(ProviderError::fatal(format!("driver answered seq {} while {seq} was pending", reply.seq)));
			}

			debug!(target = "abr.bridge", session = %self.session, seq, ok = reply.ok, "received");
			return reply.into_result();
		}
	}
}

fn lost(err: std::io::Error) -> ProviderError {
	ProviderError::fatal(format!("driver pipe failed: {err}"))
}

#[async_trait]
impl<R, W> Provider for BridgeProvider<R, W>
where
	R: AsyncRead + Unpin + Send,
	W: AsyncWrite + Unpin + Send,
{
	fn kind(&self) -> ProviderKind {
		self.kind
	}

	async fn call(&mut self, call: ProviderCall) -> Result<Value, ProviderError> {
		self.exchange(RequestBody::Call { call: &call }).await
	}

	async fn snapshot(&mut self, request: SnapshotRequest) -> Result<Vec<ElementHandle>, ProviderError> {
		let value = self.exchange(RequestBody::Snapshot { request: &request }).await?;
		// Drivers may answer with the bare array or wrap it as `{"elements": [...]}`.
		let elements = match value {
			Value::Object(mut object) => object.remove("elements").unwrap_or(Value::Null),
			other => other,
		};
		serde_json::from_value(elements).map_err(|err| ProviderError::failed(FailureKind::Other, format!("malformed snapshot from driver: {err}")))
	}

	async fn shutdown(&mut self) -> Result<(), ProviderError> {
		let acknowledged = self.exchange(RequestBody::Shutdown).await.map(|_| ());

		if let Some(mut child) = self.child.take() {
			match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
				Ok(Ok(status)) => debug!(target = "abr.bridge", session = %self.session, status = %status, "driver exited"),
				Ok(Err(err)) => warn!(target = "abr.bridge", session = %self.session, error = %err, "failed to reap driver"),
				Err(_) => {
					warn!(target = "abr.bridge", session = %self.session, "driver ignored shutdown, killing");
					if let Err(err) = child.kill().await {
						warn!(target = "abr.bridge", session = %self.session, error = %err, "failed to kill driver");
					}
				}
			}
		}

		acknowledged
	}
}
