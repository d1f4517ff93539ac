/// Spaces substituted for a tab character.
const TAB_WIDTH: usize = 4;

/// Prepares body text for embedding in a triple-quoted invocation literal.
///
/// Line endings are normalized to `\n`, tabs are expanded, and backslashes
/// and double quotes are escaped so the text cannot terminate the literal early.
/// Sanitizing never adds or removes lines.
pub fn sanitize(code: &str) -> String {
	let normalized = code.replace("\r\n", "\n").replace('\r', "\n");
	let mut out = String::with_capacity(normalized.len() + 8);
	for c in normalized.chars() {
		match c {
			'\\' => out.push_str("\\\\"),
			'"' => out.push_str("\\\""),
			'\t' => out.extend(std::iter::repeat_n(' ', TAB_WIDTH)),
			other => out.push(other),
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	#[test]
	fn plain_code_is_untouched() {
		assert_eq!(sanitize("print('hi')\n"), "print('hi')\n");
	}

	#[test]
	fn escapes_backslashes() {
		assert_eq!(sanitize(r"print('a\nb')"), r"print('a\\nb')");
	}

	#[test]
	fn escapes_double_quotes() {
		assert_eq!(sanitize(r#"s = """doc""""#), r#"s = \"\"\"doc\"\"\""#);
	}

	#[test]
	fn normalizes_line_endings_and_tabs() {
		assert_eq!(sanitize("if x:\r\n\tpass\r"), "if x:\n    pass\n");
	}

	proptest! {
		#[test]
		fn never_contains_triple_quote(code in "[a-z\"\\\\\t\n]{0,40}") {
			prop_assert!(!sanitize(&code).contains("\"\"\""));
		}

		#[test]
		fn preserves_line_count(code in "[a-z\"\\\\ \n]{0,40}") {
			prop_assert_eq!(sanitize(&code).lines().count(), code.lines().count());
		}
	}
}
