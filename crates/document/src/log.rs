//! Log entries produced by execution sessions.

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a log entry delivered by the interpreter's output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
	/// Session started producing output.
	Start,
	Stdout,
	Stderr,
	/// Session finished. The only completion signal.
	Done,
}

impl LogKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Start => "start",
			Self::Stdout => "stdout",
			Self::Stderr => "stderr",
			Self::Done => "done",
		}
	}
}

/// One appended log entry. The timestamp is assigned by the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMessage {
	pub kind: LogKind,
	pub output: String,
	pub timestamp: DateTime<Utc>,
}

/// Output tag announcing turtle drawing on a `stdout` entry.
pub const TURTLE_OUTPUT_TAG: &str = "[[turtle]]";
/// Output tag announcing canvas drawing on a `stdout` entry.
pub const CANVAS_OUTPUT_TAG: &str = "[[canvas]]";

bitflags! {
	/// Graphics surfaces a document's sessions have drawn to.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct GraphicsOutput: u8 {
		const TURTLE = 1 << 0;
		const CANVAS = 1 << 1;
	}
}

impl GraphicsOutput {
	/// Graphics surfaces announced by one log entry.
	pub fn detect(kind: LogKind, output: &str) -> Self {
		if kind != LogKind::Stdout {
			return Self::empty();
		}
		let output = output.trim_start();
		if output.starts_with(TURTLE_OUTPUT_TAG) {
			Self::TURTLE
		} else if output.starts_with(CANVAS_OUTPUT_TAG) {
			Self::CANVAS
		} else {
			Self::empty()
		}
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case(LogKind::Stdout, "[[turtle]] forward 100", GraphicsOutput::TURTLE)]
	#[case(LogKind::Stdout, "  [[canvas]] fillRect", GraphicsOutput::CANVAS)]
	#[case(LogKind::Stdout, "hello [[turtle]]", GraphicsOutput::empty())]
	#[case(LogKind::Stderr, "[[turtle]]", GraphicsOutput::empty())]
	#[case(LogKind::Start, "[[canvas]]", GraphicsOutput::empty())]
	fn detects_tagged_stdout_only(#[case] kind: LogKind, #[case] output: &str, #[case] expected: GraphicsOutput) {
		assert_eq!(GraphicsOutput::detect(kind, output), expected);
	}

	#[test]
	fn log_kind_serializes_lowercase() {
		assert_eq!(serde_json::to_string(&LogKind::Stderr).unwrap(), "\"stderr\"");
	}
}
