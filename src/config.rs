//! Bridge configuration loading and validation.
//!
//! Loaded once at startup from a TOML file and immutable afterwards.
//! Rule arrays keep their file order; that order is the routing priority.
//! Topic patterns are validated while deserializing, so an ill-formed
//! wildcard never reaches the matcher.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use rumqttc::QoS;
use serde::Deserialize;
use thiserror::Error;

use crate::connection::{BrokerSettings, WillMessage};
use crate::dispatch::DeliveryTuning;
use crate::routing::{RecipientCredential, RoutingRule, RoutingTable};
use crate::topic::TopicPattern;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "MQTT_PUSH_BRIDGE_CONFIG";
/// Fallback configuration path.
pub const CONFIG_FALLBACK: &str = "/etc/mqtt-push-bridge/config.toml";

/// Errors that can occur during configuration loading, parsing or
/// validation. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
	/// Neither the environment variable nor the fallback path points at a
	/// configuration file.
	#[error(
		"no configuration file found: set {CONFIG_ENV} or create \
		 {CONFIG_FALLBACK}"
	)]
	NotFound,

	/// IO error while accessing the configuration file.
	#[error("IO error while reading configuration: {0}")]
	Io(#[from] std::io::Error),

	/// Failure to parse the TOML configuration file.
	#[error("parse error in configuration: {0}")]
	Parse(#[from] toml::de::Error),

	/// Validation failure after successful parsing.
	#[error("invalid configuration: {0}")]
	Invalid(String),
}

impl ConfigError {
	/// Creates a new Invalid error
	pub fn invalid(reason: impl Into<String>) -> Self {
		Self::Invalid(reason.into())
	}
}

/// Top-level bridge configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
	/// Broker endpoint and authentication
	pub broker: BrokerConfig,
	/// Optional last-will registration
	pub last_will: Option<LastWillConfig>,
	/// Provider-side delivery shaping
	#[serde(default)]
	pub delivery: DeliveryConfig,
	/// The three ordered rule lists
	#[serde(default)]
	pub rules: RulesConfig,
	/// Recipient name to delivery-service identity
	#[serde(default)]
	pub credentials: HashMap<String, CredentialConfig>,
}

/// Broker endpoint and authentication.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
	/// Broker hostname or address
	pub host: String,
	/// Broker port, 1883 when absent
	#[serde(default = "default_port")]
	pub port: u16,
	/// Optional username for the broker session
	pub username: Option<String>,
	/// Optional password, requires a username
	pub password: Option<String>,
	/// Stable client identity for the persistent session
	#[serde(default = "default_client_id")]
	pub client_id: String,
}

/// Optional last-will registration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LastWillConfig {
	/// Topic the broker publishes the will on
	pub topic: String,
	/// Defaults to the client id when absent
	pub payload: Option<String>,
	/// Will QoS level, 0 through 2
	#[serde(default)]
	pub qos: u8,
	/// Whether the broker retains the will message
	#[serde(default)]
	pub retain: bool,
}

/// Provider-side delivery shaping and the enforced send timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DeliveryConfig {
	/// Seconds between provider redelivery attempts
	pub retry_secs: u32,
	/// Seconds until provider redelivery stops
	pub expire_secs: u32,
	/// Attach retry/expiry only to emergency-priority notifications
	pub emergency_only: bool,
	/// Timeout for one delivery-service request
	pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
	fn default() -> Self {
		Self {
			retry_secs: 60,
			expire_secs: 3600,
			emergency_only: false,
			timeout_secs: 30,
		}
	}
}

/// The three ordered rule lists.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
	/// Who gets notified per topic
	#[serde(default)]
	pub recipients: Vec<RecipientRuleConfig>,
	/// Notification title per topic
	#[serde(default)]
	pub titles: Vec<TitleRuleConfig>,
	/// Notification priority per topic
	#[serde(default)]
	pub priorities: Vec<PriorityRuleConfig>,
}

/// One recipient rule: pattern and the recipient names it selects.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipientRuleConfig {
	/// Topic filter the rule applies to
	pub pattern: TopicPattern,
	/// Recipient names, resolved through the credential table
	pub to: Vec<String>,
}

/// One title rule.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TitleRuleConfig {
	/// Topic filter the rule applies to
	pub pattern: TopicPattern,
	/// Notification title for matching topics
	pub title: String,
}

/// One priority rule.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriorityRuleConfig {
	/// Topic filter the rule applies to
	pub pattern: TopicPattern,
	/// Notification priority for matching topics, -2 through 2
	pub priority: i8,
}

/// Delivery-service identity for one recipient name.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialConfig {
	/// Destination key identifying the recipient
	pub user_key: String,
	/// Application token used to send to them
	pub app_token: String,
}

fn default_port() -> u16 {
	1883
}

fn default_client_id() -> String {
	"mqtt-push-bridge".to_string()
}

impl BridgeConfig {
	/// Locates and loads the configuration file.
	pub fn find_and_load() -> Result<Self, ConfigError> {
		let path = Self::config_path()?;
		Self::load(&path)
	}

	/// Determines the configuration file path.
	///
	/// Priority:
	/// 1. `MQTT_PUSH_BRIDGE_CONFIG` environment variable
	/// 2. `/etc/mqtt-push-bridge/config.toml`
	fn config_path() -> Result<PathBuf, ConfigError> {
		if let Ok(path) = env::var(CONFIG_ENV) {
			return Ok(PathBuf::from(path));
		}
		let fallback = Path::new(CONFIG_FALLBACK);
		if fallback.exists() {
			return Ok(fallback.to_path_buf());
		}
		Err(ConfigError::NotFound)
	}

	/// Loads and validates configuration from the specified path.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let raw = fs::read_to_string(path)?;
		Self::parse(&raw)
	}

	/// Parses and validates configuration from a TOML string.
	pub fn parse(raw: &str) -> Result<Self, ConfigError> {
		let config: BridgeConfig = toml::from_str(raw)?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.broker.host.is_empty() {
			return Err(ConfigError::invalid("broker host cannot be empty"));
		}
		if self.broker.client_id.is_empty() {
			return Err(ConfigError::invalid(
				"client_id cannot be empty: the persistent session needs a \
				 stable identity",
			));
		}
		if self.broker.password.is_some() && self.broker.username.is_none() {
			return Err(ConfigError::invalid(
				"password is set but username is not",
			));
		}
		if let Some(will) = &self.last_will {
			if will.qos > 2 {
				return Err(ConfigError::invalid(format!(
					"last-will qos must be 0, 1 or 2, got {}",
					will.qos
				)));
			}
		}
		for rule in &self.rules.priorities {
			if !(-2 ..= 2).contains(&rule.priority) {
				return Err(ConfigError::invalid(format!(
					"priority for '{}' must be between -2 and 2, got {}",
					rule.pattern, rule.priority
				)));
			}
		}
		for rule in &self.rules.recipients {
			if rule.to.is_empty() {
				return Err(ConfigError::invalid(format!(
					"recipient rule for '{}' lists no recipients",
					rule.pattern
				)));
			}
		}
		Ok(())
	}

	/// Builds the immutable routing table.
	pub fn routing_table(&self) -> RoutingTable {
		let recipients = self
			.rules
			.recipients
			.iter()
			.map(|rule| {
				RoutingRule::new(rule.pattern.clone(), rule.to.clone())
			})
			.collect();
		let titles = self
			.rules
			.titles
			.iter()
			.map(|rule| {
				RoutingRule::new(rule.pattern.clone(), rule.title.clone())
			})
			.collect();
		let priorities = self
			.rules
			.priorities
			.iter()
			.map(|rule| RoutingRule::new(rule.pattern.clone(), rule.priority))
			.collect();
		let credentials = self
			.credentials
			.iter()
			.map(|(name, credential)| {
				(
					name.clone(),
					RecipientCredential {
						user_key: credential.user_key.clone(),
						app_token: credential.app_token.clone(),
					},
				)
			})
			.collect();
		RoutingTable::new(recipients, titles, priorities, credentials)
	}

	/// Builds the broker session settings.
	pub fn broker_settings(&self) -> BrokerSettings {
		let credentials = match (&self.broker.username, &self.broker.password)
		{
			| (Some(username), Some(password)) => {
				Some((username.clone(), password.clone()))
			}
			| (Some(username), None) => {
				Some((username.clone(), String::new()))
			}
			| _ => None,
		};
		let last_will = self.last_will.as_ref().map(|will| {
			WillMessage::new(
				will.topic.clone(),
				will.payload
					.clone()
					.unwrap_or_else(|| self.broker.client_id.clone()),
			)
			.qos(qos_from_level(will.qos))
			.retain(will.retain)
		});
		BrokerSettings {
			host: self.broker.host.clone(),
			port: self.broker.port,
			client_id: self.broker.client_id.clone(),
			credentials,
			last_will,
		}
	}

	/// Builds the delivery shaping parameters.
	pub fn delivery_tuning(&self) -> DeliveryTuning {
		DeliveryTuning {
			retry_secs: self.delivery.retry_secs,
			expire_secs: self.delivery.expire_secs,
			emergency_only: self.delivery.emergency_only,
		}
	}

	/// The enforced timeout for one delivery-service request.
	pub fn send_timeout(&self) -> Duration {
		Duration::from_secs(self.delivery.timeout_secs)
	}
}

/// Maps a validated numeric QoS level to the protocol type.
fn qos_from_level(level: u8) -> QoS {
	match level {
		| 1 => QoS::AtLeastOnce,
		| 2 => QoS::ExactlyOnce,
		| _ => QoS::AtMostOnce,
	}
}
