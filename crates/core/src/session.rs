//! Session actor.
//!
//! Each session runs as one tokio task draining an unbounded queue, so
//! commands for the same browser or device execute strictly one at a time
//! in arrival order. The actor owns the provider, the reference table, and
//! the tab bookkeeping; nothing else touches them.

use std::sync::Arc;

use abr_protocol::{Action, Command, Response, ValidationError};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::dispatch::{Planned, plan};
use crate::error::CommandError;
use crate::provider::{CapabilitySet, LaunchSpec, Provider, ProviderCall, ProviderError, ProviderFactory, ProviderKind};
use crate::refs::{Epoch, ReferenceTable};

/// One queued command and where to send its response.
pub(crate) struct Job {
	pub command: Command,
	pub reply: oneshot::Sender<Response>,
}

/// Point-in-time view of a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
	pub id: String,
	pub provider: ProviderKind,
	/// Whether the provider has been started yet.
	pub launched: bool,
	pub epoch: Epoch,
	pub active_tab: usize,
	pub tabs: usize,
}

/// Known tab layout of a session. Mobile sessions always have one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tabs {
	pub count: usize,
	pub active: usize,
}

impl Tabs {
	fn single() -> Self {
		Self { count: 1, active: 0 }
	}

	fn check(&self, index: usize) -> Result<(), ValidationError> {
		if index < self.count {
			Ok(())
		} else {
			let noun = if self.count == 1 { "tab" } else { "tabs" };
			Err(ValidationError::out_of_range("index", format!("index {index} but session has {} {noun}", self.count)))
		}
	}

	/// Applies a successful provider call. Returns whether the visible page changed.
	fn apply(&mut self, call: &ProviderCall, result: &Value) -> bool {
		match call {
			ProviderCall::TabNew { .. } => {
				self.count += 1;
				self.active = self.count - 1;
				true
			}
			ProviderCall::TabSwitch { index } => {
				let changed = self.active != *index;
				self.active = *index;
				changed
			}
			ProviderCall::TabClose { index } => {
				self.count = self.count.saturating_sub(1);
				let was_active = *index == self.active;
				if *index < self.active {
					self.active -= 1;
				} else if was_active {
					self.active = self.active.min(self.count.saturating_sub(1));
				}
				was_active
			}
			ProviderCall::TabList => {
				if let Some(tabs) = result.get("tabs").and_then(Value::as_array) {
					self.count = tabs.len();
				}
				if let Some(active) = result.get("active").and_then(Value::as_u64) {
					self.active = active as usize;
				}
				false
			}
			ProviderCall::Navigate { .. } | ProviderCall::Back | ProviderCall::Forward | ProviderCall::Reload => true,
			_ => false,
		}
	}
}

/// Removes the session from the router table. Called at most once.
pub(crate) type Detach = Box<dyn FnOnce() + Send>;

pub(crate) struct Session {
	id: String,
	spec: LaunchSpec,
	factory: Arc<dyn ProviderFactory>,
	provider: Option<Box<dyn Provider>>,
	capabilities: CapabilitySet,
	refs: ReferenceTable,
	tabs: Tabs,
	info: Arc<Mutex<SessionInfo>>,
	detach: Option<Detach>,
}

/// How the actor loop continues after a job.
enum Flow {
	Continue,
	/// The session ended; answer whatever is still queued and stop.
	Stop,
}

impl Session {
	pub(crate) fn new(id: String, spec: LaunchSpec, factory: Arc<dyn ProviderFactory>, detach: Detach) -> Self {
		let info = SessionInfo {
			id: id.clone(),
			provider: spec.kind,
			launched: false,
			epoch: Epoch::default(),
			active_tab: 0,
			tabs: 1,
		};
		Self {
			id,
			capabilities: CapabilitySet::for_kind(spec.kind),
			spec,
			factory,
			provider: None,
			refs: ReferenceTable::new(),
			tabs: Tabs::single(),
			info: Arc::new(Mutex::new(info)),
			detach: Some(detach),
		}
	}

	pub(crate) fn info(&self) -> Arc<Mutex<SessionInfo>> {
		Arc::clone(&self.info)
	}

	/// Drains `jobs` until the session closes or every sender is gone.
	pub(crate) async fn run(mut self, mut jobs: mpsc::UnboundedReceiver<Job>) {
		debug!(target = "abr.session", session = %self.id, provider = %self.spec.kind, "session started");

		while let Some(job) = jobs.recv().await {
			let Job { command, reply } = job;
			let (response, flow) = self.handle(command).await;
			let _ = reply.send(response);

			if let Flow::Stop = flow {
				jobs.close();
				while let Some(Job { command, reply }) = jobs.recv().await {
					let _ = reply.send(self.closed_response(&command));
				}
				debug!(target = "abr.session", session = %self.id, "session ended");
				return;
			}
		}

		// Router dropped without closing us.
		self.teardown(true).await;
		debug!(target = "abr.session", session = %self.id, "session dropped");
	}

	async fn handle(&mut self, command: Command) -> (Response, Flow) {
		let id = command.id.clone();
		info!(target = "abr.session", session = %self.id, id = %id, action = %command.kind(), epoch = %self.refs.epoch(), "dispatching");

		match self.execute(&command).await {
			Ok((value, flow)) => (Response::ok(id, value), flow),
			Err(err) => {
				let flow = match &err {
					CommandError::Provider(ProviderError::Fatal(message)) => {
						warn!(target = "abr.session", session = %self.id, id = %id, error = %message, "provider lost, tearing down session");
						self.teardown(false).await;
						Flow::Stop
					}
					CommandError::Launch { message, .. } => {
						warn!(target = "abr.session", session = %self.id, id = %id, error = %message, "provider launch failed");
						self.teardown(false).await;
						Flow::Stop
					}
					other => {
						debug!(target = "abr.session", session = %self.id, id = %id, code = %other.code(), "command failed");
						Flow::Continue
					}
				};
				(Response::failure(id, err.to_error_body()), flow)
			}
		}
	}

	async fn execute(&mut self, command: &Command) -> Result<(Value, Flow), CommandError> {
		if matches!(command.action, Action::Close) {
			let launched = self.provider.is_some();
			self.teardown(true).await;
			return Ok((json!({ "closed": true, "launched": launched }), Flow::Stop));
		}

		// Gate on the configured provider's capabilities before launching,
		// then again against what the launched provider reports.
		let mut planned = plan(&command.action, &self.refs, &self.capabilities, self.spec.kind)?;
		if self.provider.is_none() {
			self.ensure_launched().await?;
			planned = plan(&command.action, &self.refs, &self.capabilities, self.spec.kind)?;
		}
		if let Planned::Call(call) = &mut planned {
			self.check_tabs(&command.action, call)?;
		}

		let value = match planned {
			Planned::Call(call) => {
				let provider = self.provider_mut()?;
				let result = provider.call(call.clone()).await?;
				if self.tabs.apply(&call, &result) {
					self.refs.invalidate();
				}
				result
			}
			Planned::Snapshot(request) => {
				let provider = self.provider_mut()?;
				let elements = provider.snapshot(request).await?;
				let refs = self.refs.issue(elements);
				info!(target = "abr.session", session = %self.id, epoch = %self.refs.epoch(), refs = refs.len(), "snapshot issued");
				json!({ "epoch": self.refs.epoch(), "refs": refs })
			}
			Planned::SingleTab => json!({ "tabs": [{ "index": 0, "active": true }], "active": 0 }),
			Planned::Close => return Ok((json!({ "closed": true }), Flow::Stop)),
		};

		self.sync_info();
		Ok((value, Flow::Continue))
	}

	/// Substitutes the active tab for an omitted `tab_close` index and checks
	/// indices against the known tab count.
	fn check_tabs(&self, action: &Action, call: &mut ProviderCall) -> Result<(), ValidationError> {
		match (action, call) {
			(Action::TabClose(args), ProviderCall::TabClose { index }) => {
				*index = args.index.unwrap_or(self.tabs.active);
				self.tabs.check(*index)
			}
			(_, ProviderCall::TabSwitch { index }) => self.tabs.check(*index),
			_ => Ok(()),
		}
	}

	async fn ensure_launched(&mut self) -> Result<(), CommandError> {
		if self.provider.is_some() {
			return Ok(());
		}

		let provider = self.factory.launch(&self.id, &self.spec).await.map_err(|err| CommandError::Launch {
			provider: self.spec.kind,
			message: err.to_string(),
		})?;
		self.capabilities = provider.capabilities();
		info!(target = "abr.session", session = %self.id, provider = %provider.kind(), capabilities = ?self.capabilities, "provider launched");
		self.provider = Some(provider);
		self.sync_info();
		Ok(())
	}

	fn provider_mut(&mut self) -> Result<&mut Box<dyn Provider>, CommandError> {
		self.provider.as_mut().ok_or_else(|| CommandError::SessionClosed(self.id.clone()))
	}

	/// Drops every ref, releases the provider, and leaves the router table.
	async fn teardown(&mut self, graceful: bool) {
		self.refs.invalidate();
		if let Some(mut provider) = self.provider.take() {
			if graceful {
				if let Err(err) = provider.shutdown().await {
					warn!(target = "abr.session", session = %self.id, error = %err, "provider shutdown failed");
				}
			}
		}
		if let Some(detach) = self.detach.take() {
			detach();
		}
		self.sync_info();
	}

	fn closed_response(&self, command: &Command) -> Response {
		if matches!(command.action, Action::Close) {
			return Response::ok(command.id.clone(), json!({ "closed": false }));
		}
		Response::failure(command.id.clone(), CommandError::SessionClosed(self.id.clone()).to_error_body())
	}

	fn sync_info(&self) {
		let mut info = self.info.lock();
		info.launched = self.provider.is_some();
		info.epoch = self.refs.epoch();
		info.active_tab = self.tabs.active;
		info.tabs = self.tabs.count;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn closing_tab_before_active_shifts_active() {
		let mut tabs = Tabs { count: 3, active: 2 };
		assert!(!tabs.apply(&ProviderCall::TabClose { index: 0 }, &Value::Null));
		assert_eq!(tabs, Tabs { count: 2, active: 1 });
	}

	#[test]
	fn closing_last_active_tab_moves_left() {
		let mut tabs = Tabs { count: 3, active: 2 };
		assert!(tabs.apply(&ProviderCall::TabClose { index: 2 }, &Value::Null));
		assert_eq!(tabs, Tabs { count: 2, active: 1 });
	}

	#[test]
	fn new_tab_becomes_active() {
		let mut tabs = Tabs::single();
		tabs.apply(&ProviderCall::TabNew { url: None }, &Value::Null);
		assert_eq!(tabs, Tabs { count: 2, active: 1 });
	}

	#[test]
	fn tab_list_result_is_authoritative() {
		let mut tabs = Tabs::single();
		tabs.apply(&ProviderCall::TabList, &json!({"tabs": [{}, {}, {}], "active": 2}));
		assert_eq!(tabs, Tabs { count: 3, active: 2 });
	}

	#[test]
	fn out_of_range_names_index() {
		let err = Tabs::single().check(5).unwrap_err();
		assert_eq!(err.field.as_deref(), Some("index"));
		assert_eq!(err.to_string(), "out of range `index`: index 5 but session has 1 tab");
		assert!(Tabs::single().check(0).is_ok());
	}
}
