//! Matching behavior of topic filters against concrete topics.

use super::pattern::TopicPattern;

fn pattern(s: &str) -> TopicPattern {
	TopicPattern::parse(s).unwrap()
}

#[test]
fn literal_pattern_matches_itself_only() {
	let p = pattern("alerts/disk");
	assert!(p.matches("alerts/disk"));
	assert!(!p.matches("alerts/cpu"));
	assert!(!p.matches("alerts"));
	assert!(!p.matches("alerts/disk/root"));
}

#[test]
fn single_level_wildcard_matches_any_one_level() {
	let p = pattern("a/+/c");
	assert!(p.matches("a/x/c"));
	assert!(p.matches("a/b/c"));
	assert!(p.matches("a//c"));
	assert!(!p.matches("a/b/b/c"));
	assert!(!p.matches("a/c"));
}

#[test]
fn single_level_wildcard_requires_a_level() {
	let p = pattern("sensors/+");
	assert!(p.matches("sensors/kitchen"));
	assert!(!p.matches("sensors"));
	assert!(!p.matches("sensors/kitchen/temp"));
}

#[test]
fn multi_level_wildcard_matches_zero_or_more_levels() {
	let p = pattern("a/#");
	assert!(p.matches("a"));
	assert!(p.matches("a/b"));
	assert!(p.matches("a/b/c"));
	assert!(!p.matches("x/a"));
	assert!(!p.matches("b"));
}

#[test]
fn bare_hash_matches_everything() {
	let p = pattern("#");
	assert!(p.matches("a"));
	assert!(p.matches("a/b/c"));
}

#[test]
fn plus_and_hash_combined() {
	let p = pattern("home/+/device/#");
	assert!(p.matches("home/kitchen/device"));
	assert!(p.matches("home/kitchen/device/lamp/state"));
	assert!(!p.matches("home/device/lamp"));
}

#[test]
fn level_counts_must_match_without_hash() {
	let p = pattern("a/b");
	assert!(p.matches("a/b"));
	assert!(!p.matches("a"));
	assert!(!p.matches("a/b/c"));
}

#[test]
fn empty_levels_are_distinct_levels() {
	let p = pattern("topic//subtopic");
	assert!(p.matches("topic//subtopic"));
	assert!(!p.matches("topic/subtopic"));
}

#[test]
fn unicode_topics_match_by_level() {
	let p = pattern("пристрої/+/статус");
	assert!(p.matches("пристрої/насос/статус"));
	assert!(!p.matches("пристрої/статус"));
}
