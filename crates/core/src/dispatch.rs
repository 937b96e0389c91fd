//! Maps a validated [`Action`] onto what the session should do with it.
//!
//! Planning is pure: it reads the session's reference table and the
//! provider's capability set, and either rejects the action or returns a
//! [`Planned`] step with every `@e` ref already resolved. The capability
//! check runs before any ref is looked at.

use abr_protocol::Action;
use abr_protocol::command::{GetByLabelArgs, GetByRoleArgs, GetByTextArgs, Subaction};

use crate::error::CommandError;
use crate::provider::{Capability, CapabilitySet, ProviderCall, ProviderKind, SemanticLocator, SnapshotRequest, Target};
use crate::refs::{ReferenceTable, is_ref};

/// What a session does for one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Planned {
	/// Forward to the provider.
	Call(ProviderCall),
	/// Enumerate elements and issue a new epoch of refs.
	Snapshot(SnapshotRequest),
	/// `tab_list` on a provider without tabs; answered with the one implicit tab.
	SingleTab,
	/// Tear the session down.
	Close,
}

pub fn plan(action: &Action, refs: &ReferenceTable, capabilities: &CapabilitySet, provider: ProviderKind) -> Result<Planned, CommandError> {
	let kind = action.kind();
	if matches!(action, Action::TabList) && !capabilities.contains(Capability::Tabs) {
		return Ok(Planned::SingleTab);
	}
	if !capabilities.supports(kind) {
		return Err(CommandError::UnsupportedByProvider { action: kind, provider });
	}

	let target = |selector: &str| -> Result<Target, CommandError> {
		if is_ref(selector) {
			Ok(Target::Element(refs.resolve(selector)?.clone()))
		} else {
			Ok(Target::Selector(selector.to_string()))
		}
	};
	let optional_target = |selector: Option<&String>| selector.map(|s| target(s.as_str())).transpose();

	let call = match action {
		Action::Navigate(args) => ProviderCall::Navigate {
			url: args.url.clone(),
			wait_until: args.wait_until.unwrap_or_default(),
		},
		Action::Back => ProviderCall::Back,
		Action::Forward => ProviderCall::Forward,
		Action::Reload => ProviderCall::Reload,
		Action::Click(args) => ProviderCall::Click {
			target: target(&args.selector)?,
			button: args.button.unwrap_or_default(),
			click_count: args.click_count.unwrap_or(1),
		},
		Action::Type(args) => ProviderCall::Type {
			target: target(&args.selector)?,
			text: args.text.clone(),
			delay_ms: args.delay,
		},
		Action::Fill(args) => ProviderCall::Fill {
			target: target(&args.selector)?,
			value: args.value.clone(),
		},
		Action::Hover(args) => ProviderCall::Hover {
			target: target(&args.selector)?,
		},
		Action::Select(args) => ProviderCall::Select {
			target: target(&args.selector)?,
			values: args.values.clone(),
		},
		Action::Press(args) => ProviderCall::Press {
			key: args.key.clone(),
			target: optional_target(args.selector.as_ref())?,
		},
		Action::GetByRole(GetByRoleArgs {
			role,
			subaction,
			name,
			exact,
			value,
		}) => locate(
			SemanticLocator::Role {
				role: role.clone(),
				name: name.clone(),
				exact: *exact,
			},
			*subaction,
			value,
		),
		Action::GetByText(GetByTextArgs { text, subaction, exact, value }) => locate(
			SemanticLocator::Text {
				text: text.clone(),
				exact: *exact,
			},
			*subaction,
			value,
		),
		Action::GetByLabel(GetByLabelArgs { label, subaction, exact, value }) => locate(
			SemanticLocator::Label {
				label: label.clone(),
				exact: *exact,
			},
			*subaction,
			value,
		),
		Action::Wait(args) => ProviderCall::Wait {
			target: optional_target(args.selector.as_ref())?,
			text: args.text.clone(),
			timeout_ms: args.timeout,
		},
		Action::Screenshot(args) => ProviderCall::Screenshot {
			path: args.path.clone(),
			full_page: args.full_page,
			target: optional_target(args.selector.as_ref())?,
		},
		Action::Snapshot(args) => {
			return Ok(Planned::Snapshot(SnapshotRequest {
				interactive: args.interactive,
				scope: optional_target(args.selector.as_ref())?,
			}));
		}
		Action::Pdf(args) => ProviderCall::Pdf { path: args.path.clone() },
		Action::ScreencastStart(args) => ProviderCall::ScreencastStart { path: args.path.clone() },
		Action::ScreencastStop => ProviderCall::ScreencastStop,
		Action::CookiesGet(args) => ProviderCall::CookiesGet { urls: args.urls.clone() },
		Action::CookiesSet(args) => ProviderCall::CookiesSet {
			cookies: args.cookies.clone(),
		},
		Action::CookiesClear => ProviderCall::CookiesClear,
		Action::StorageGet(args) => ProviderCall::StorageGet {
			area: args.area,
			key: args.key.clone(),
		},
		Action::StorageSet(args) => ProviderCall::StorageSet {
			area: args.area,
			key: args.key.clone(),
			value: args.value.clone(),
		},
		Action::TabNew(args) => ProviderCall::TabNew { url: args.url.clone() },
		Action::TabList => ProviderCall::TabList,
		Action::TabSwitch(args) => ProviderCall::TabSwitch { index: args.index },
		// The session substitutes the active tab before forwarding.
		Action::TabClose(args) => ProviderCall::TabClose {
			index: args.index.unwrap_or_default(),
		},
		Action::Swipe(args) => ProviderCall::Swipe {
			direction: args.direction,
			distance: args.distance,
		},
		Action::Close => return Ok(Planned::Close),
	};

	Ok(Planned::Call(call))
}

fn locate(locator: SemanticLocator, subaction: Subaction, value: &Option<String>) -> ProviderCall {
	ProviderCall::Locate {
		locator,
		subaction,
		value: if subaction.takes_input() { value.clone() } else { None },
	}
}

#[cfg(test)]
mod tests {
	use abr_protocol::parse_command;
	use serde_json::json;

	use super::*;
	use crate::refs::{ElementHandle, RefError};

	fn action(value: serde_json::Value) -> Action {
		parse_command(&value.to_string()).unwrap().action
	}

	fn desktop() -> (CapabilitySet, ProviderKind) {
		(CapabilitySet::for_kind(ProviderKind::Desktop), ProviderKind::Desktop)
	}

	fn mobile() -> (CapabilitySet, ProviderKind) {
		(CapabilitySet::for_kind(ProviderKind::Mobile), ProviderKind::Mobile)
	}

	fn table() -> ReferenceTable {
		let mut table = ReferenceTable::new();
		table.issue(vec![ElementHandle::new("#first"), ElementHandle::new("#second").with_role("button")]);
		table
	}

	#[test]
	fn click_on_ref_resolves_handle() {
		let (caps, kind) = desktop();
		let planned = plan(&action(json!({"id": "1", "action": "click", "selector": "@e2"})), &table(), &caps, kind).unwrap();

		let Planned::Call(ProviderCall::Click { target, click_count, .. }) = planned else {
			panic!("expected click call");
		};
		assert_eq!(target, Target::Element(ElementHandle::new("#second").with_role("button")));
		assert_eq!(click_count, 1);
	}

	#[test]
	fn plain_selector_passes_through() {
		let (caps, kind) = desktop();
		let planned = plan(&action(json!({"id": "1", "action": "hover", "selector": "#menu"})), &table(), &caps, kind).unwrap();
		assert_eq!(
			planned,
			Planned::Call(ProviderCall::Hover {
				target: Target::Selector("#menu".into())
			})
		);
	}

	#[test]
	fn unknown_ref_never_reaches_provider() {
		let (caps, kind) = desktop();
		let err = plan(&action(json!({"id": "1", "action": "fill", "selector": "@e9", "value": "x"})), &table(), &caps, kind).unwrap_err();
		assert!(matches!(err, CommandError::Reference(RefError::Unknown { .. })));
	}

	#[test]
	fn pdf_is_unsupported_on_mobile() {
		let (caps, kind) = mobile();
		let err = plan(&action(json!({"id": "1", "action": "pdf", "path": "out.pdf"})), &table(), &caps, kind).unwrap_err();
		assert_eq!(
			err,
			CommandError::UnsupportedByProvider {
				action: abr_protocol::ActionKind::Pdf,
				provider: ProviderKind::Mobile
			}
		);
	}

	#[test]
	fn tab_new_gated_on_mobile_only() {
		let tab_new = action(json!({"id": "1", "action": "tab_new"}));

		let (caps, kind) = mobile();
		assert!(matches!(plan(&tab_new, &table(), &caps, kind), Err(CommandError::UnsupportedByProvider { .. })));

		let (caps, kind) = desktop();
		assert_eq!(plan(&tab_new, &table(), &caps, kind).unwrap(), Planned::Call(ProviderCall::TabNew { url: None }));
	}

	#[test]
	fn mobile_tab_list_is_answered_locally() {
		let (caps, kind) = mobile();
		assert_eq!(plan(&Action::TabList, &table(), &caps, kind).unwrap(), Planned::SingleTab);
	}

	#[test]
	fn swipe_is_mobile_only() {
		let swipe = action(json!({"id": "1", "action": "swipe", "direction": "up", "distance": 500}));

		let (caps, kind) = desktop();
		assert!(plan(&swipe, &table(), &caps, kind).is_err());

		let (caps, kind) = mobile();
		assert_eq!(
			plan(&swipe, &table(), &caps, kind).unwrap(),
			Planned::Call(ProviderCall::Swipe {
				direction: abr_protocol::command::SwipeDirection::Up,
				distance: Some(500)
			})
		);
	}

	#[test]
	fn semantic_locator_drops_value_for_click() {
		let (caps, kind) = desktop();
		let planned = plan(
			&action(json!({"id": "1", "action": "getbytext", "text": "Submit", "subaction": "click", "value": "ignored"})),
			&table(),
			&caps,
			kind,
		)
		.unwrap();
		let Planned::Call(ProviderCall::Locate { value, .. }) = planned else {
			panic!("expected locate");
		};
		assert_eq!(value, None);
	}

	#[test]
	fn snapshot_scope_may_be_a_ref() {
		let (caps, kind) = desktop();
		let planned = plan(&action(json!({"id": "1", "action": "snapshot", "interactive": true, "selector": "@e1"})), &table(), &caps, kind).unwrap();
		assert_eq!(
			planned,
			Planned::Snapshot(SnapshotRequest {
				interactive: true,
				scope: Some(Target::Element(ElementHandle::new("#first")))
			})
		);
	}

	#[test]
	fn close_plans_teardown() {
		let (caps, kind) = mobile();
		assert_eq!(plan(&Action::Close, &table(), &caps, kind).unwrap(), Planned::Close);
	}
}
