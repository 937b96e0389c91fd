//! Session router.
//!
//! The router owns the table of live sessions. [`Router::submit`] enqueues
//! a validated command on its session's actor while holding the table lock,
//! so arrival order is queue order; distinct sessions run concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use abr_protocol::{Action, Command, Response};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::CommandError;
use crate::provider::{LaunchSpec, ProviderFactory};
use crate::session::{Job, Session, SessionInfo};

#[derive(Clone)]
struct SessionHandle {
	generation: u64,
	jobs: mpsc::UnboundedSender<Job>,
	info: Arc<Mutex<SessionInfo>>,
}

#[derive(Default)]
struct Table {
	sessions: HashMap<String, SessionHandle>,
	bindings: HashMap<String, LaunchSpec>,
	next_generation: u64,
}

struct Inner {
	factory: Arc<dyn ProviderFactory>,
	default_spec: LaunchSpec,
	table: Mutex<Table>,
}

/// Cheaply cloneable handle to the session table.
#[derive(Clone)]
pub struct Router {
	inner: Arc<Inner>,
}

impl Router {
	/// Sessions without an explicit [`bind`](Self::bind) launch with `default_spec`.
	pub fn new(factory: Arc<dyn ProviderFactory>, default_spec: LaunchSpec) -> Self {
		Self {
			inner: Arc::new(Inner {
				factory,
				default_spec,
				table: Mutex::new(Table::default()),
			}),
		}
	}

	pub fn default_spec(&self) -> &LaunchSpec {
		&self.inner.default_spec
	}

	/// Pins the provider identity a session launches with.
	///
	/// Takes effect the next time the session is created; a live session
	/// keeps the provider it already has.
	pub fn bind(&self, session: impl Into<String>, spec: LaunchSpec) {
		let session = session.into();
		debug!(target = "abr.router", session = %session, provider = %spec.kind, "session bound");
		self.inner.table.lock().bindings.insert(session, spec);
	}

	/// Routes one command and waits for its response.
	pub async fn submit(&self, command: Command) -> Response {
		self.queue(command).await
	}

	/// Enqueues `command` immediately and returns a future for its response.
	///
	/// The command's place in its session queue is fixed when this returns,
	/// before the future is first polled, so callers may spawn the future
	/// without losing arrival order.
	pub fn queue(&self, command: Command) -> impl Future<Output = Response> + Send + use<> {
		let id = command.id.clone();
		let session = command.session.clone();
		let enqueued = self.enqueue(command);

		async move {
			match enqueued {
				Enqueued::Answered(response) => response,
				Enqueued::Queued(reply) => reply
					.await
					.unwrap_or_else(|_| Response::failure(id, CommandError::SessionClosed(session).to_error_body())),
			}
		}
	}

	fn enqueue(&self, command: Command) -> Enqueued {
		let (reply, rx) = oneshot::channel();
		let mut table = self.inner.table.lock();

		let handle = if matches!(command.action, Action::Close) {
			// Removing at enqueue time means later commands start a fresh session
			// while this one drains.
			match table.sessions.remove(&command.session) {
				Some(handle) => handle,
				None => {
					debug!(target = "abr.router", session = %command.session, id = %command.id, "close on unknown session");
					return Enqueued::Answered(Response::ok(command.id, json!({ "closed": false })));
				}
			}
		} else {
			match table.sessions.get(&command.session) {
				Some(handle) => handle.clone(),
				None => {
					let handle = self.spawn(&mut table, &command.session);
					table.sessions.insert(command.session.clone(), handle.clone());
					handle
				}
			}
		};

		match handle.jobs.send(Job { command, reply }) {
			Ok(()) => Enqueued::Queued(rx),
			Err(mpsc::error::SendError(job)) => {
				let body = CommandError::SessionClosed(job.command.session.clone()).to_error_body();
				Enqueued::Answered(Response::failure(job.command.id, body))
			}
		}
	}

	fn spawn(&self, table: &mut Table, session: &str) -> SessionHandle {
		let generation = table.next_generation;
		table.next_generation += 1;

		let spec = table.bindings.get(session).cloned().unwrap_or_else(|| self.inner.default_spec.clone());
		info!(target = "abr.router", session = %session, provider = %spec.kind, "creating session");

		let detach = {
			let inner: Weak<Inner> = Arc::downgrade(&self.inner);
			let session = session.to_string();
			Box::new(move || {
				if let Some(inner) = inner.upgrade() {
					let mut table = inner.table.lock();
					if table.sessions.get(&session).is_some_and(|handle| handle.generation == generation) {
						table.sessions.remove(&session);
						debug!(target = "abr.router", session = %session, "session detached");
					}
				}
			})
		};

		let actor = Session::new(session.to_string(), spec, Arc::clone(&self.inner.factory), detach);
		let info = actor.info();
		let (jobs, rx) = mpsc::unbounded_channel();
		tokio::spawn(actor.run(rx));

		SessionHandle { generation, jobs, info }
	}

	/// Live sessions, sorted by id.
	pub fn sessions(&self) -> Vec<SessionInfo> {
		let table = self.inner.table.lock();
		let mut sessions: Vec<SessionInfo> = table.sessions.values().map(|handle| handle.info.lock().clone()).collect();
		sessions.sort_by(|a, b| a.id.cmp(&b.id));
		sessions
	}

	/// Closes every live session and waits for each to finish.
	pub async fn shutdown(&self) {
		let names: Vec<String> = self.inner.table.lock().sessions.keys().cloned().collect();
		if names.is_empty() {
			return;
		}
		info!(target = "abr.router", sessions = names.len(), "closing all sessions");

		// Enqueue every close before awaiting any, so sessions wind down in parallel.
		let pending: Vec<Enqueued> = names
			.into_iter()
			.map(|session| {
				self.enqueue(Command {
					id: format!("shutdown:{session}"),
					session,
					action: Action::Close,
				})
			})
			.collect();

		for enqueued in pending {
			if let Enqueued::Queued(reply) = enqueued {
				if let Ok(response) = reply.await {
					debug!(target = "abr.router", id = %response.id, success = response.success, "session closed");
				}
			}
		}
	}
}

enum Enqueued {
	Queued(oneshot::Receiver<Response>),
	Answered(Response),
}
