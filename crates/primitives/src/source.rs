//! Splitting raw source into its fixed and editable regions.
//!
//! Raw source may carry two marker lines:
//!
//! ```text
//! from turtle import *      <- preamble (fixed, hidden from the editor)
//! ### PRE
//! forward(100)              <- body (editable)
//! ### POST
//! done()                    <- postamble (fixed)
//! ```
//!
//! Both markers are optional. Without markers the whole input is the body.
//! Marker lines are recognized after trimming, and any amount of whitespace
//! may separate `###` from the keyword.

use thiserror::Error;

/// Keyword of the marker line closing the preamble.
pub const PRE_MARKER: &str = "PRE";
/// Keyword of the marker line opening the postamble.
pub const POST_MARKER: &str = "POST";

/// Malformed marker structure. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
	#[error("duplicate `### PRE` marker on line {line} (first on line {first})")]
	DuplicatePre { first: usize, line: usize },
	#[error("duplicate `### POST` marker on line {line} (first on line {first})")]
	DuplicatePost { first: usize, line: usize },
	#[error("`### POST` marker on line {post} precedes `### PRE` marker on line {pre}")]
	PostBeforePre { post: usize, pre: usize },
}

/// The three regions of a raw source, plus the verbatim marker lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceParts {
	pub preamble: String,
	pub body: String,
	pub postamble: String,
	pre_marker: Option<String>,
	post_marker: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Marker {
	Pre,
	Post,
}

fn classify(line: &str) -> Option<Marker> {
	let keyword = line.trim().strip_prefix("###")?.trim();
	match keyword {
		PRE_MARKER => Some(Marker::Pre),
		POST_MARKER => Some(Marker::Post),
		_ => None,
	}
}

/// Splits `raw` into preamble, body and postamble.
pub fn split_source(raw: &str) -> Result<SourceParts, SplitError> {
	let lines: Vec<&str> = raw.split_inclusive('\n').collect();

	let mut pre: Option<usize> = None;
	let mut post: Option<usize> = None;
	for (idx, line) in lines.iter().enumerate() {
		match classify(line) {
			Some(Marker::Pre) => {
				if let Some(first) = pre {
					return Err(SplitError::DuplicatePre { first: first + 1, line: idx + 1 });
				}
				if let Some(post) = post {
					return Err(SplitError::PostBeforePre { post: post + 1, pre: idx + 1 });
				}
				pre = Some(idx);
			}
			Some(Marker::Post) => {
				if let Some(first) = post {
					return Err(SplitError::DuplicatePost { first: first + 1, line: idx + 1 });
				}
				post = Some(idx);
			}
			None => {}
		}
	}

	let body_start = pre.map_or(0, |idx| idx + 1);
	let body_end = post.unwrap_or(lines.len());

	Ok(SourceParts {
		preamble: pre.map(|idx| lines[..idx].concat()).unwrap_or_default(),
		body: lines[body_start..body_end].concat(),
		postamble: post.map(|idx| lines[idx + 1..].concat()).unwrap_or_default(),
		pre_marker: pre.map(|idx| lines[idx].to_string()),
		post_marker: post.map(|idx| lines[idx].to_string()),
	})
}

impl SourceParts {
	/// Rebuilds the raw input this value was split from.
	pub fn reassemble(&self) -> String {
		let mut out = String::with_capacity(self.preamble.len() + self.body.len() + self.postamble.len() + 16);
		out.push_str(&self.preamble);
		if let Some(marker) = &self.pre_marker {
			out.push_str(marker);
		}
		out.push_str(&self.body);
		if let Some(marker) = &self.post_marker {
			out.push_str(marker);
		}
		out.push_str(&self.postamble);
		out
	}

	/// Number of script lines the preamble contributes before the body.
	///
	/// Interpreter-reported line numbers minus this offset are body line numbers.
	pub fn line_offset(&self) -> usize {
		self.preamble.split_inclusive('\n').count()
	}

	/// Executable script with `code` standing in for the body.
	pub fn script_with(&self, code: &str) -> String {
		let mut out = String::with_capacity(self.preamble.len() + code.len() + self.postamble.len() + 1);
		out.push_str(&self.preamble);
		out.push_str(code);
		if !self.postamble.is_empty() && !code.is_empty() && !code.ends_with('\n') {
			out.push('\n');
		}
		out.push_str(&self.postamble);
		out
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;
	use rstest::rstest;

	use super::*;

	#[test]
	fn no_markers_is_all_body() {
		let parts = split_source("print(1)\nprint(2)\n").unwrap();
		assert_eq!(parts.preamble, "");
		assert_eq!(parts.body, "print(1)\nprint(2)\n");
		assert_eq!(parts.postamble, "");
		assert_eq!(parts.line_offset(), 0);
	}

	#[test]
	fn pre_marker_splits_preamble() {
		let parts = split_source("from math import *\nx = 1\n### PRE\nprint(x)\n").unwrap();
		assert_eq!(parts.preamble, "from math import *\nx = 1\n");
		assert_eq!(parts.body, "print(x)\n");
		assert_eq!(parts.line_offset(), 2);
	}

	#[test]
	fn both_markers_split_three_regions() {
		let raw = "setup()\n###   PRE  \nbody()\n  ### POST\nteardown()";
		let parts = split_source(raw).unwrap();
		assert_eq!(parts.preamble, "setup()\n");
		assert_eq!(parts.body, "body()\n");
		assert_eq!(parts.postamble, "teardown()");
		assert_eq!(parts.reassemble(), raw);
	}

	#[test]
	fn post_without_pre_keeps_leading_body() {
		let parts = split_source("a()\n### POST\nb()\n").unwrap();
		assert_eq!(parts.preamble, "");
		assert_eq!(parts.body, "a()\n");
		assert_eq!(parts.postamble, "b()\n");
	}

	#[test]
	fn marker_keyword_must_match_exactly() {
		let parts = split_source("### PREAMBLE\nx\n").unwrap();
		assert_eq!(parts.body, "### PREAMBLE\nx\n");
	}

	#[rstest]
	#[case("### PRE\na\n### PRE\n", SplitError::DuplicatePre { first: 1, line: 3 })]
	#[case("### POST\n### POST\n", SplitError::DuplicatePost { first: 1, line: 2 })]
	#[case("a\n### POST\nb\n### PRE\n", SplitError::PostBeforePre { post: 2, pre: 4 })]
	fn malformed_markers_are_rejected(#[case] raw: &str, #[case] expected: SplitError) {
		assert_eq!(split_source(raw).unwrap_err(), expected);
	}

	#[test]
	fn script_with_edited_body_keeps_fixed_regions() {
		let parts = split_source("pre()\n### PRE\nold()\n### POST\npost()\n").unwrap();
		assert_eq!(parts.script_with("new()"), "pre()\nnew()\npost()\n");
		assert_eq!(parts.script_with("new()\n"), "pre()\nnew()\npost()\n");
	}

	fn line() -> impl Strategy<Value = String> {
		"[a-z0-9 ()=#]{0,12}"
	}

	proptest! {
		#[test]
		fn split_round_trips(pre in prop::collection::vec(line(), 0..4), body in prop::collection::vec(line(), 0..4)) {
			let pre: Vec<String> = pre.into_iter().filter(|l| classify(l).is_none()).collect();
			let body: Vec<String> = body.into_iter().filter(|l| classify(l).is_none()).collect();
			let mut raw = String::new();
			for l in &pre {
				raw.push_str(l);
				raw.push('\n');
			}
			raw.push_str("### PRE\n");
			let body_text: String = body.iter().map(|l| format!("{l}\n")).collect();
			raw.push_str(&body_text);

			let parts = split_source(&raw).unwrap();
			prop_assert_eq!(parts.reassemble(), raw);
			prop_assert_eq!(&parts.body, &body_text);
			prop_assert_eq!(parts.line_offset(), pre.len());
		}
	}
}
