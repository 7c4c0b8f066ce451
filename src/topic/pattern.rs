use std::convert::TryFrom;

use arcstr::{ArcStr, Substr};
use serde::Deserialize;
use thiserror::Error;

/// One level of a parsed topic filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
	/// Literal level, must equal the corresponding topic level exactly
	Literal(Substr),
	/// `+` wildcard, matches exactly one arbitrary topic level
	SingleLevel,
	/// `#` wildcard, matches the rest of the topic (including nothing)
	MultiLevel,
}

/// Error types for topic filter parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicPatternError {
	/// Hash wildcard (#) used not at the end of the pattern
	#[error(
		"invalid topic pattern '{pattern}': # wildcard can only be the last \
		 level"
	)]
	HashPosition { pattern: String },

	/// Wildcard characters (+ or #) mixed with other characters in one level
	#[error("invalid wildcard usage in level '{level}'")]
	WildcardUsage { level: String },

	/// Empty pattern is not valid
	#[error("topic pattern cannot be empty")]
	EmptyPattern,
}

impl TopicPatternError {
	/// Creates a new HashPosition error
	pub fn hash_position(pattern: impl Into<String>) -> Self {
		Self::HashPosition {
			pattern: pattern.into(),
		}
	}

	/// Creates a new WildcardUsage error
	pub fn wildcard_usage(level: impl Into<String>) -> Self {
		Self::WildcardUsage {
			level: level.into(),
		}
	}
}

impl TryFrom<Substr> for PatternSegment {
	type Error = TopicPatternError;

	fn try_from(level: Substr) -> Result<Self, Self::Error> {
		let res = match level.as_str() {
			| "+" => PatternSegment::SingleLevel,
			| "#" => PatternSegment::MultiLevel,
			| _ if level.contains(['+', '#']) => {
				return Err(TopicPatternError::wildcard_usage(level.as_str()));
			}
			| _ => PatternSegment::Literal(level),
		};
		Ok(res)
	}
}

/// A subscription topic filter with `+`/`#` wildcards.
///
/// Patterns are validated when parsed, so matching never fails: an
/// ill-formed pattern is a configuration-load error, not a runtime one.
/// Comparison against concrete topics is structural and level-wise;
/// patterns are never compared against other patterns.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct TopicPattern {
	pattern: ArcStr,
	segments: Vec<PatternSegment>,
}

impl TopicPattern {
	/// Parses and validates a topic filter string.
	pub fn parse(
		pattern: impl Into<ArcStr>,
	) -> Result<Self, TopicPatternError> {
		let pattern = pattern.into();
		if pattern.is_empty() {
			return Err(TopicPatternError::EmptyPattern);
		}

		let segments: Result<Vec<_>, _> = pattern
			.split('/')
			.map(|s| pattern.substr_from(s))
			.map(PatternSegment::try_from)
			.collect();
		let segments = segments?;

		if let Some(hash_pos) = segments
			.iter()
			.position(|s| matches!(*s, PatternSegment::MultiLevel))
		{
			if hash_pos != segments.len() - 1 {
				return Err(TopicPatternError::hash_position(
					pattern.as_str(),
				));
			}
		}
		Ok(Self { pattern, segments })
	}

	/// The filter exactly as configured, suitable for a SUBSCRIBE request.
	pub fn as_str(&self) -> &str {
		&self.pattern
	}

	/// Whether a concrete topic matches this filter.
	///
	/// A literal level must equal the topic level, `+` consumes exactly one
	/// level, and a trailing `#` accepts whatever remains. Without `#` the
	/// level counts must match exactly.
	pub fn matches(&self, topic: &str) -> bool {
		let mut levels = topic.split('/');
		for segment in &self.segments {
			match segment {
				| PatternSegment::Literal(expected) => match levels.next() {
					| Some(level) if level == expected.as_str() => {}
					| _ => return false,
				},
				| PatternSegment::SingleLevel => {
					if levels.next().is_none() {
						return false;
					}
				}
				| PatternSegment::MultiLevel => return true,
			}
		}
		levels.next().is_none()
	}
}

impl PartialEq for TopicPattern {
	fn eq(&self, other: &Self) -> bool {
		self.pattern == other.pattern
	}
}

impl Eq for TopicPattern {}

impl TryFrom<String> for TopicPattern {
	type Error = TopicPatternError;

	fn try_from(pattern: String) -> Result<Self, Self::Error> {
		TopicPattern::parse(pattern)
	}
}

impl std::fmt::Display for TopicPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.pattern)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_simple_literal_pattern() {
		let result = TopicPattern::parse("simple/path").unwrap();
		assert_eq!(
			result.segments,
			vec![
				PatternSegment::Literal(Substr::from("simple")),
				PatternSegment::Literal(Substr::from("path"))
			]
		);
	}

	#[test]
	fn test_pattern_with_plus() {
		let result = TopicPattern::parse("devices/+/status").unwrap();
		assert_eq!(
			result.segments,
			vec![
				PatternSegment::Literal(Substr::from("devices")),
				PatternSegment::SingleLevel,
				PatternSegment::Literal(Substr::from("status"))
			]
		);
	}

	#[test]
	fn test_pattern_with_hash() {
		let result = TopicPattern::parse("sensors/#").unwrap();
		assert_eq!(
			result.segments,
			vec![
				PatternSegment::Literal(Substr::from("sensors")),
				PatternSegment::MultiLevel
			]
		);
	}

	#[test]
	fn test_empty_pattern() {
		let result = TopicPattern::parse("");
		assert_eq!(result.unwrap_err(), TopicPatternError::EmptyPattern);
	}

	#[test]
	fn test_only_wildcards() {
		let plus = TopicPattern::parse("+").unwrap();
		assert_eq!(plus.segments, vec![PatternSegment::SingleLevel]);

		let hash = TopicPattern::parse("#").unwrap();
		assert_eq!(hash.segments, vec![PatternSegment::MultiLevel]);
	}

	#[test]
	fn test_invalid_hash_position() {
		let result = TopicPattern::parse("invalid/#/pattern");
		assert_eq!(
			result.unwrap_err(),
			TopicPatternError::HashPosition {
				pattern: "invalid/#/pattern".to_string()
			}
		);
	}

	#[test]
	fn test_wildcards_mixed_with_characters() {
		let plus = TopicPattern::parse("topic/a+b/subtopic");
		assert!(matches!(
			plus.unwrap_err(),
			TopicPatternError::WildcardUsage { .. }
		));

		let hash = TopicPattern::parse("topic/a#b");
		assert!(matches!(
			hash.unwrap_err(),
			TopicPatternError::WildcardUsage { .. }
		));
	}

	#[test]
	fn test_display_round_trip() {
		let pattern = TopicPattern::parse("devices/+/status/#").unwrap();
		assert_eq!(pattern.to_string(), "devices/+/status/#");
	}

	#[test]
	fn test_deserialize_validates() {
		let ok = parse_pattern_field("pattern = 'alerts/#'");
		assert!(ok.is_ok());

		let bad = parse_pattern_field("pattern = 'alerts/#/x'");
		assert!(bad.is_err());
	}

	fn parse_pattern_field(
		input: &str,
	) -> Result<TopicPattern, toml::de::Error> {
		#[derive(Deserialize)]
		struct Holder {
			pattern: TopicPattern,
		}
		toml::from_str::<Holder>(input).map(|holder| holder.pattern)
	}
}
