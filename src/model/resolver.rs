//! Name decoding and raw-row mapping.
//!
//! Entity names come off the wire wrapped in a protobuf `Any`
//! (`{"typeUrl": "...StringValue", "value": "0a0b4a6f686e..."}`) where the
//! value is the hex of an encoded `StringValue`. Plain strings pass through.

use serde::Deserialize;

use super::entities::{Entity, EntityKind, parse_timestamp};

/// Protobuf field 1, wire type 2 (length-delimited).
const STRING_FIELD_TAG: u8 = 0x0a;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnyValue {
	#[serde(default)]
	#[allow(dead_code)]
	type_url: Option<String>,
	value: String,
}

/// Decode an entity name into its display form.
///
/// Never fails: anything that does not decode is returned trimmed.
pub fn decode_name(raw: &str) -> String {
	let trimmed = raw.trim();
	if !trimmed.starts_with('{') {
		return trimmed.to_string();
	}
	let Ok(any) = serde_json::from_str::<AnyValue>(trimmed) else {
		return trimmed.to_string();
	};
	match hex::decode(any.value.trim()) {
		Ok(bytes) => decode_string_value(&bytes).unwrap_or_else(|| trimmed.to_string()),
		// not hex, the value is already text
		Err(_) => any.value.trim().to_string(),
	}
}

fn decode_string_value(bytes: &[u8]) -> Option<String> {
	let payload = match bytes.split_first() {
		Some((&STRING_FIELD_TAG, rest)) => {
			let (len, used) = read_varint(rest)?;
			rest.get(used..used.checked_add(len)?)?
		}
		_ => bytes,
	};
	let text: String = String::from_utf8_lossy(payload)
		.chars()
		.filter(|c| !c.is_control())
		.collect();
	let text = text.trim();
	(!text.is_empty()).then(|| text.to_string())
}

fn read_varint(bytes: &[u8]) -> Option<(usize, usize)> {
	let mut value = 0usize;
	for (i, &b) in bytes.iter().enumerate().take(5) {
		value |= ((b & 0x7f) as usize) << (7 * i);
		if b & 0x80 == 0 {
			return Some((value, i + 1));
		}
	}
	None
}

/// One row of the search endpoint's response.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRow {
	pub id: String,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub created: Option<String>,
	#[serde(default)]
	pub terminated: Option<String>,
}

/// Map a raw row to a dictionary entity of the given kind.
pub fn resolve_row(row: EntityRow, kind: EntityKind) -> Entity {
	Entity {
		name: decode_name(&row.name),
		created: row.created.as_deref().and_then(parse_timestamp),
		terminated: row.terminated.as_deref().and_then(parse_timestamp),
		id: row.id,
		kind,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn wrap(hex_value: &str) -> String {
		format!(
			r#"{{"typeUrl":"type.googleapis.com/google.protobuf.StringValue","value":"{hex_value}"}}"#
		)
	}

	#[test]
	fn plain_names_pass_through() {
		assert_eq!(decode_name("  Ministry of Finance "), "Ministry of Finance");
	}

	#[test]
	fn decodes_string_value_payload() {
		let mut bytes = vec![STRING_FIELD_TAG, 7];
		bytes.extend_from_slice(b"Finance");
		assert_eq!(decode_name(&wrap(&hex::encode(bytes))), "Finance");
	}

	#[test]
	fn decodes_bare_utf8_hex() {
		let encoded = hex::encode("Health\u{1}");
		assert_eq!(decode_name(&wrap(&encoded)), "Health");
	}

	#[test]
	fn long_names_use_multibyte_length() {
		let name = "x".repeat(200);
		let mut bytes = vec![STRING_FIELD_TAG, 0xc8, 0x01];
		bytes.extend_from_slice(name.as_bytes());
		assert_eq!(decode_name(&wrap(&hex::encode(bytes))), name);
	}

	#[test]
	fn oversized_length_falls_back_to_raw() {
		// varint decodes to 2^32 - 1, far past the payload
		let bytes = [STRING_FIELD_TAG, 0xff, 0xff, 0xff, 0xff, 0x0f, b'A'];
		let raw = wrap(&hex::encode(bytes));
		assert_eq!(decode_name(&raw), raw);
	}

	#[test]
	fn non_hex_value_is_used_verbatim() {
		assert_eq!(decode_name(&wrap("Ministry of Defence")), "Ministry of Defence");
	}

	#[test]
	fn malformed_json_falls_back_to_raw() {
		assert_eq!(decode_name("{not json"), "{not json");
	}

	#[test]
	fn resolve_row_decodes_and_parses() {
		let row = EntityRow {
			id: "dep-1".into(),
			name: "Survey Department".into(),
			created: Some("2019-11-18T00:00:00Z".into()),
			terminated: Some(String::new()),
		};
		let e = resolve_row(row, EntityKind::Department);
		assert_eq!(e.name, "Survey Department");
		assert!(e.created.is_some());
		assert!(e.terminated.is_none());
	}
}
