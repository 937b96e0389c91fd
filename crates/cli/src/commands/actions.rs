use abr_protocol::{ActionSchema, schemas};
use serde::Serialize;

use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct ActionEntry {
	name: &'static str,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	aliases: Vec<&'static str>,
	family: String,
	required: Vec<&'static str>,
	optional: Vec<&'static str>,
}

impl From<&ActionSchema> for ActionEntry {
	fn from(schema: &ActionSchema) -> Self {
		Self {
			name: schema.name(),
			aliases: schema.names[1..].to_vec(),
			family: schema.family.to_string(),
			required: schema.required.iter().map(|field| field.name).collect(),
			optional: schema.optional.iter().map(|field| field.name).collect(),
		}
	}
}

#[derive(Debug, Serialize)]
struct Listing {
	actions: Vec<ActionEntry>,
}

pub fn execute(format: OutputFormat) {
	let listing = Listing {
		actions: schemas().iter().map(ActionEntry::from).collect(),
	};

	if format == OutputFormat::Text {
		print!("{}", render_text(&listing));
	} else {
		output::print_value(&listing, format);
	}
}

fn render_text(listing: &Listing) -> String {
	let width = listing.actions.iter().map(|entry| entry.name.len()).max().unwrap_or_default();
	let mut text = String::new();
	for entry in &listing.actions {
		let mut line = format!("{:<width$}  {:<16}  {}", entry.name, entry.family, entry.required.join(", "));
		if !entry.aliases.is_empty() {
			line.push_str(&format!("  (alias: {})", entry.aliases.join(", ")));
		}
		text.push_str(line.trim_end());
		text.push('\n');
	}
	text
}

#[cfg(test)]
mod tests {
	use super::*;

	fn listing() -> Listing {
		Listing {
			actions: schemas().iter().map(ActionEntry::from).collect(),
		}
	}

	#[test]
	fn aliases_hang_off_their_canonical_action() {
		let listing = listing();
		let navigate = listing.actions.iter().find(|entry| entry.name == "navigate").unwrap();
		assert_eq!(navigate.aliases, ["open"]);
		assert_eq!(navigate.required, ["url"]);
		assert!(listing.actions.iter().all(|entry| entry.name != "open"));
	}

	#[test]
	fn text_lists_one_action_per_line() {
		let listing = listing();
		let text = render_text(&listing);
		assert_eq!(text.lines().count(), listing.actions.len());
		assert!(text.lines().any(|line| line.starts_with("click") && line.contains("(alias: tap)")));
	}
}
