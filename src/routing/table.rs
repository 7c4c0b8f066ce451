use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::warn;

use super::error::RouteDefect;
use crate::topic::TopicPattern;

/// Size of the per-topic resolution cache.
const RESOLVE_CACHE_SIZE: usize = 100;

/// One ordered routing rule.
///
/// Rules of the same category stay in the sequence the configuration
/// supplied; that sequence is the resolution priority. The engine never
/// sorts or deduplicates them.
#[derive(Debug, Clone)]
pub struct RoutingRule<V> {
	/// Topic filter the rule applies to
	pub pattern: TopicPattern,
	/// What a match yields for this rule category
	pub value: V,
}

impl<V> RoutingRule<V> {
	/// Creates a rule from a validated pattern and its value.
	pub fn new(pattern: TopicPattern, value: V) -> Self {
		Self { pattern, value }
	}
}

/// Delivery-service identity for one recipient: the destination key and
/// the application token, opaque to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientCredential {
	/// Destination key identifying who receives the notification
	pub user_key: String,
	/// Token of the application sending on their behalf
	pub app_token: String,
}

/// A recipient with its credential already looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
	/// Configured recipient name
	pub name: String,
	/// Credential resolved from the configuration table
	pub credential: RecipientCredential,
}

/// Routing result for one topic.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
	/// No recipient rule matched. The message is dropped, not an error.
	Unrouted,
	/// A recipient rule matched; title and priority resolved independently.
	Routed(Arc<ResolvedRoute>),
}

/// Recipients and notification parameters resolved for one topic.
///
/// `title` and `priority` stay `None` when their rule lists produced no
/// match; the delivery provider then applies its own defaults.
#[derive(Debug)]
pub struct ResolvedRoute {
	/// Everyone the first matching recipient rule selects
	pub recipients: Vec<Recipient>,
	/// Title from the first matching title rule, if any
	pub title: Option<String>,
	/// Priority from the first matching priority rule, if any
	pub priority: Option<i8>,
}

/// Three ordered rule lists plus the credential table.
///
/// Read-only after configuration load. Resolution is memoized per topic;
/// with immutable tables the cached result is always the result a fresh
/// scan would produce.
pub struct RoutingTable {
	recipient_rules: Vec<RoutingRule<Vec<String>>>,
	title_rules: Vec<RoutingRule<String>>,
	priority_rules: Vec<RoutingRule<i8>>,
	credentials: HashMap<String, RecipientCredential>,
	resolve_cache: Mutex<LruCache<String, RouteOutcome>>,
}

impl RoutingTable {
	/// Builds a table from the configured rule lists and credentials.
	pub fn new(
		recipient_rules: Vec<RoutingRule<Vec<String>>>,
		title_rules: Vec<RoutingRule<String>>,
		priority_rules: Vec<RoutingRule<i8>>,
		credentials: HashMap<String, RecipientCredential>,
	) -> Self {
		let cache_size = NonZeroUsize::new(RESOLVE_CACHE_SIZE).unwrap();
		Self {
			recipient_rules,
			title_rules,
			priority_rules,
			credentials,
			resolve_cache: Mutex::new(LruCache::new(cache_size)),
		}
	}

	/// The union of recipient-rule patterns, in configured order.
	///
	/// This is exactly the set of filters the broker session subscribes
	/// to; repeated patterns are collapsed.
	pub fn subscription_patterns(&self) -> Vec<String> {
		let mut patterns = Vec::new();
		for rule in &self.recipient_rules {
			let pattern = rule.pattern.as_str();
			if !patterns.iter().any(|p: &String| p == pattern) {
				patterns.push(pattern.to_string());
			}
		}
		patterns
	}

	/// Recipient names referenced by rules but absent from the credential
	/// table. Not a load error, but worth a startup warning: each will be
	/// skipped at dispatch time.
	pub fn unresolved_recipients(&self) -> Vec<&str> {
		let mut missing = Vec::new();
		for rule in &self.recipient_rules {
			for name in &rule.value {
				if !self.credentials.contains_key(name)
					&& !missing.contains(&name.as_str())
				{
					missing.push(name.as_str());
				}
			}
		}
		missing
	}

	/// Resolve a topic against all three rule categories.
	///
	/// Each category is scanned in configured order and the first matching
	/// rule wins; later matches are ignored, never merged. A missing
	/// recipient-rule match makes the whole resolution `Unrouted`; a
	/// missing title or priority match only leaves that field unset.
	pub fn resolve(&self, topic: &str) -> RouteOutcome {
		{
			let mut cache = self.resolve_cache.lock().unwrap();
			if let Some(outcome) = cache.get(topic) {
				return outcome.clone();
			}
		}

		let outcome = self.resolve_uncached(topic);
		let mut cache = self.resolve_cache.lock().unwrap();
		cache.put(topic.to_string(), outcome.clone());
		outcome
	}

	fn resolve_uncached(&self, topic: &str) -> RouteOutcome {
		let Some(rule) = self
			.recipient_rules
			.iter()
			.find(|rule| rule.pattern.matches(topic))
		else {
			return RouteOutcome::Unrouted;
		};

		let recipients = rule
			.value
			.iter()
			.filter_map(|name| self.materialize_recipient(name, rule, topic))
			.collect();

		let title = self
			.title_rules
			.iter()
			.find(|rule| rule.pattern.matches(topic))
			.map(|rule| rule.value.clone());

		let priority = self
			.priority_rules
			.iter()
			.find(|rule| rule.pattern.matches(topic))
			.map(|rule| rule.value);

		RouteOutcome::Routed(Arc::new(ResolvedRoute {
			recipients,
			title,
			priority,
		}))
	}

	fn materialize_recipient(
		&self,
		name: &str,
		rule: &RoutingRule<Vec<String>>,
		topic: &str,
	) -> Option<Recipient> {
		match self.credentials.get(name) {
			| Some(credential) => Some(Recipient {
				name: name.to_string(),
				credential: credential.clone(),
			}),
			| None => {
				let defect = RouteDefect::unknown_recipient(
					name,
					rule.pattern.as_str(),
				);
				warn!(topic = %topic, defect = %defect, "Skipping recipient");
				None
			}
		}
	}
}
