//! Scripted in-memory provider for router and dispatch tests.
//!
//! [`FakeFactory`] hands out [`FakeProvider`]s that record every call they
//! receive and answer from a small script: queued snapshots, per-op
//! failures, an optional call delay, and a simple tab model.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::provider::{LaunchSpec, Provider, ProviderCall, ProviderError, ProviderFactory, ProviderKind, SnapshotRequest};
use crate::refs::ElementHandle;

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
	Launch { session: String, spec: LaunchSpec },
	Call { session: String, call: ProviderCall },
	Snapshot { session: String, request: SnapshotRequest },
	Shutdown { session: String },
}

#[derive(Default)]
struct Script {
	log: Vec<Recorded>,
	launch_failure: Option<String>,
	failures: HashMap<&'static str, ProviderError>,
	snapshots: VecDeque<Vec<ElementHandle>>,
	delay: Option<Duration>,
	in_flight: HashMap<String, usize>,
	peak_per_session: HashMap<String, usize>,
	total_in_flight: usize,
	peak_total: usize,
}

#[derive(Clone, Default)]
pub struct FakeFactory {
	script: Arc<Mutex<Script>>,
}

impl FakeFactory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fail_launch(&self, message: impl Into<String>) {
		self.script.lock().launch_failure = Some(message.into());
	}

	/// Every call whose [`ProviderCall::op`] equals `op` fails with `error`.
	pub fn fail_op(&self, op: &'static str, error: ProviderError) {
		self.script.lock().failures.insert(op, error);
	}

	/// Elements returned by the next snapshot, in discovery order.
	pub fn queue_snapshot(&self, elements: Vec<ElementHandle>) {
		self.script.lock().snapshots.push_back(elements);
	}

	pub fn delay_calls(&self, delay: Duration) {
		self.script.lock().delay = Some(delay);
	}

	pub fn log(&self) -> Vec<Recorded> {
		self.script.lock().log.clone()
	}

	pub fn calls(&self, session: &str) -> Vec<ProviderCall> {
		self.script
			.lock()
			.log
			.iter()
			.filter_map(|entry| match entry {
				Recorded::Call { session: s, call } if s == session => Some(call.clone()),
				_ => None,
			})
			.collect()
	}

	pub fn launches(&self) -> usize {
		self.script.lock().log.iter().filter(|entry| matches!(entry, Recorded::Launch { .. })).count()
	}

	pub fn shutdowns(&self, session: &str) -> usize {
		self.script
			.lock()
			.log
			.iter()
			.filter(|entry| matches!(entry, Recorded::Shutdown { session: s } if s == session))
			.count()
	}

	/// Most calls ever in flight at once against one session.
	pub fn peak_in_flight(&self, session: &str) -> usize {
		self.script.lock().peak_per_session.get(session).copied().unwrap_or_default()
	}

	/// Most calls ever in flight at once across all sessions.
	pub fn peak_total_in_flight(&self) -> usize {
		self.script.lock().peak_total
	}
}

#[async_trait]
impl ProviderFactory for FakeFactory {
	async fn launch(&self, session: &str, spec: &LaunchSpec) -> Result<Box<dyn Provider>, ProviderError> {
		let mut script = self.script.lock();
		if let Some(message) = &script.launch_failure {
			return Err(ProviderError::fatal(message.clone()));
		}
		script.log.push(Recorded::Launch {
			session: session.to_string(),
			spec: spec.clone(),
		});
		Ok(Box::new(FakeProvider {
			session: session.to_string(),
			kind: spec.kind,
			script: Arc::clone(&self.script),
			tabs: 1,
			active: 0,
		}))
	}
}

pub struct FakeProvider {
	session: String,
	kind: ProviderKind,
	script: Arc<Mutex<Script>>,
	tabs: usize,
	active: usize,
}

impl FakeProvider {
	fn enter(&self) -> Option<Duration> {
		let mut script = self.script.lock();
		let current = script.in_flight.entry(self.session.clone()).or_default();
		*current += 1;
		let current = *current;
		let peak = script.peak_per_session.entry(self.session.clone()).or_default();
		*peak = (*peak).max(current);
		script.total_in_flight += 1;
		script.peak_total = script.peak_total.max(script.total_in_flight);
		script.delay
	}

	fn leave(&self) {
		let mut script = self.script.lock();
		if let Some(current) = script.in_flight.get_mut(&self.session) {
			*current -= 1;
		}
		script.total_in_flight -= 1;
	}

	fn tab_list(&self) -> Value {
		let tabs: Vec<Value> = (0..self.tabs).map(|index| json!({ "index": index, "active": index == self.active })).collect();
		json!({ "tabs": tabs, "active": self.active })
	}
}

#[async_trait]
impl Provider for FakeProvider {
	fn kind(&self) -> ProviderKind {
		self.kind
	}

	async fn call(&mut self, call: ProviderCall) -> Result<Value, ProviderError> {
		let delay = self.enter();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		let failure = {
			let mut script = self.script.lock();
			script.log.push(Recorded::Call {
				session: self.session.clone(),
				call: call.clone(),
			});
			script.failures.get(call.op()).cloned()
		};
		self.leave();

		if let Some(error) = failure {
			return Err(error);
		}

		Ok(match call {
			ProviderCall::TabNew { .. } => {
				self.tabs += 1;
				self.active = self.tabs - 1;
				json!({ "index": self.active })
			}
			ProviderCall::TabSwitch { index } => {
				self.active = index;
				json!({ "index": index })
			}
			ProviderCall::TabClose { index } => {
				self.tabs -= 1;
				if index < self.active || self.active >= self.tabs {
					self.active = self.active.saturating_sub(1);
				}
				json!({ "closed": index })
			}
			ProviderCall::TabList => self.tab_list(),
			ProviderCall::Navigate { url, .. } => json!({ "url": url }),
			other => json!({ "op": other.op() }),
		})
	}

	async fn snapshot(&mut self, request: SnapshotRequest) -> Result<Vec<ElementHandle>, ProviderError> {
		let mut script = self.script.lock();
		script.log.push(Recorded::Snapshot {
			session: self.session.clone(),
			request,
		});
		if let Some(error) = script.failures.get("snapshot") {
			return Err(error.clone());
		}
		Ok(script.snapshots.pop_front().unwrap_or_default())
	}

	async fn shutdown(&mut self) -> Result<(), ProviderError> {
		self.script.lock().log.push(Recorded::Shutdown {
			session: self.session.clone(),
		});
		Ok(())
	}
}
