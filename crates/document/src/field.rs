//! Observable fields and their snapshot values.

use std::sync::Arc;

use bitflags::bitflags;
use chrono::{DateTime, Utc};

use crate::log::LogMessage;
use crate::model::{Status, Version};

/// A document field a consumer can read and subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
	Code,
	HasEdits,
	ShowRaw,
	IsPasted,
	Status,
	IsExecuting,
	SessionStartedAt,
	IsGraphicsPanelOpen,
	HasGraphicsOutput,
	HasTurtleOutput,
	HasCanvasOutput,
	Logs,
	Versions,
}

impl Field {
	pub const ALL: [Field; 13] = [
		Field::Code,
		Field::HasEdits,
		Field::ShowRaw,
		Field::IsPasted,
		Field::Status,
		Field::IsExecuting,
		Field::SessionStartedAt,
		Field::IsGraphicsPanelOpen,
		Field::HasGraphicsOutput,
		Field::HasTurtleOutput,
		Field::HasCanvasOutput,
		Field::Logs,
		Field::Versions,
	];

	/// Sequence fields notify on length changes only.
	pub const fn is_sequence(self) -> bool {
		matches!(self, Field::Logs | Field::Versions)
	}

	pub(crate) const fn bit(self) -> FieldSet {
		match self {
			Field::Code => FieldSet::CODE,
			Field::HasEdits => FieldSet::HAS_EDITS,
			Field::ShowRaw => FieldSet::SHOW_RAW,
			Field::IsPasted => FieldSet::IS_PASTED,
			Field::Status => FieldSet::STATUS,
			Field::IsExecuting => FieldSet::IS_EXECUTING,
			Field::SessionStartedAt => FieldSet::SESSION_STARTED_AT,
			Field::IsGraphicsPanelOpen => FieldSet::GRAPHICS_PANEL_OPEN,
			Field::HasGraphicsOutput => FieldSet::HAS_GRAPHICS_OUTPUT,
			Field::HasTurtleOutput => FieldSet::HAS_TURTLE_OUTPUT,
			Field::HasCanvasOutput => FieldSet::HAS_CANVAS_OUTPUT,
			Field::Logs => FieldSet::LOGS,
			Field::Versions => FieldSet::VERSIONS,
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Field::Code => "code",
			Field::HasEdits => "hasEdits",
			Field::ShowRaw => "showRaw",
			Field::IsPasted => "isPasted",
			Field::Status => "status",
			Field::IsExecuting => "isExecuting",
			Field::SessionStartedAt => "sessionStartedAt",
			Field::IsGraphicsPanelOpen => "isGraphicsPanelOpen",
			Field::HasGraphicsOutput => "hasGraphicsOutput",
			Field::HasTurtleOutput => "hasTurtleOutput",
			Field::HasCanvasOutput => "hasCanvasOutput",
			Field::Logs => "logs",
			Field::Versions => "versions",
		}
	}
}

bitflags! {
	/// Set of fields changed by one atomic action.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
	pub(crate) struct FieldSet: u16 {
		const CODE = 1 << 0;
		const HAS_EDITS = 1 << 1;
		const SHOW_RAW = 1 << 2;
		const IS_PASTED = 1 << 3;
		const STATUS = 1 << 4;
		const IS_EXECUTING = 1 << 5;
		const SESSION_STARTED_AT = 1 << 6;
		const GRAPHICS_PANEL_OPEN = 1 << 7;
		const HAS_GRAPHICS_OUTPUT = 1 << 8;
		const HAS_TURTLE_OUTPUT = 1 << 9;
		const HAS_CANVAS_OUTPUT = 1 << 10;
		const LOGS = 1 << 11;
		const VERSIONS = 1 << 12;
	}
}

impl FieldSet {
	pub(crate) fn contains_field(self, field: Field) -> bool {
		self.contains(field.bit())
	}
}

/// Snapshot of one field as returned by [`Document::read`].
///
/// Sequence snapshots are shared slices; compare them with
/// [`FieldValue::ptr_eq`] to detect a reused snapshot.
///
/// [`Document::read`]: crate::Document::read
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	Text(String),
	Bool(bool),
	Status(Status),
	Timestamp(Option<DateTime<Utc>>),
	Logs(Arc<[LogMessage]>),
	Versions(Arc<[Version]>),
}

impl FieldValue {
	/// Sequence length, or `None` for scalar values.
	pub fn len(&self) -> Option<usize> {
		match self {
			FieldValue::Logs(logs) => Some(logs.len()),
			FieldValue::Versions(versions) => Some(versions.len()),
			_ => None,
		}
	}

	/// True when both values are the same shared sequence snapshot.
	pub fn ptr_eq(&self, other: &FieldValue) -> bool {
		match (self, other) {
			(FieldValue::Logs(a), FieldValue::Logs(b)) => Arc::ptr_eq(a, b),
			(FieldValue::Versions(a), FieldValue::Versions(b)) => Arc::ptr_eq(a, b),
			_ => false,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			FieldValue::Bool(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			FieldValue::Text(text) => Some(text),
			_ => None,
		}
	}

	pub fn as_logs(&self) -> Option<&[LogMessage]> {
		match self {
			FieldValue::Logs(logs) => Some(logs),
			_ => None,
		}
	}

	pub fn as_versions(&self) -> Option<&[Version]> {
		match self {
			FieldValue::Versions(versions) => Some(versions),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_field_has_a_distinct_bit() {
		let mut seen = FieldSet::empty();
		for field in Field::ALL {
			assert!(!seen.intersects(field.bit()), "{} shares a bit", field.as_str());
			seen |= field.bit();
		}
		assert_eq!(seen, FieldSet::all());
	}

	#[test]
	fn only_logs_and_versions_are_sequences() {
		let sequences: Vec<_> = Field::ALL.into_iter().filter(|f| f.is_sequence()).collect();
		assert_eq!(sequences, vec![Field::Logs, Field::Versions]);
	}
}
