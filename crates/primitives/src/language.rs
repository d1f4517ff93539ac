/// Expands an internal short language code to its canonical name.
///
/// Unknown tags pass through unchanged.
pub fn normalize_language(tag: &str) -> &str {
	match tag {
		"py" | "python3" => "python",
		"js" => "javascript",
		"ts" => "typescript",
		other => other,
	}
}
