//! Formatting helpers shared by log statements.

/// Shortens a transaction hash for log output, keeping the first 6 and last
/// 4 characters.
///
/// - `"5A1F2C9D0E6B7A8C9D0E1F2A3B4C5D6E7F8A9B0C1D2E3F4A5B6C7D8E9F0A1B2C"`
///   becomes `"5A1F2C...1B2C"`
/// - identifiers of 12 characters or fewer are returned unchanged
pub fn truncate_hash(hash: &str) -> String {
	if hash.len() <= 12 || !hash.is_ascii() {
		hash.to_string()
	} else {
		format!("{}...{}", &hash[..6], &hash[hash.len() - 4..])
	}
}
