use std::process;

use mqtt_push_bridge::bridge::{Bridge, MessagePipeline};
use mqtt_push_bridge::config::BridgeConfig;
use mqtt_push_bridge::connection::{ConnectionManager, StopReason};
use mqtt_push_bridge::dispatch::{Dispatcher, PushoverClient};
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Exit code for configuration errors and unrecoverable startup failures.
const EXIT_STARTUP_FAILURE: i32 = 2;

/// Offset added to the signal number for the exit status, following the
/// usual shell convention (SIGTERM -> 143, SIGINT -> 130).
const EXIT_SIGNAL_BASE: i32 = 128;

fn init_tracing() {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| "info".into());
	tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_target(true).compact())
		.init();
}

/// Resolves to the number of the first termination signal received.
async fn wait_for_termination(
	mut sigterm: Signal,
	mut sigint: Signal,
) -> i32 {
	tokio::select! {
		_ = sigterm.recv() => SignalKind::terminate().as_raw_value(),
		_ = sigint.recv() => SignalKind::interrupt().as_raw_value(),
	}
}

#[tokio::main]
async fn main() {
	init_tracing();
	info!(
		"Starting mqtt-push-bridge version {}",
		env!("CARGO_PKG_VERSION")
	);

	let config = BridgeConfig::find_and_load().unwrap_or_else(|err| {
		error!(error = %err, "Cannot load configuration");
		process::exit(EXIT_STARTUP_FAILURE);
	});

	let sigterm = signal(SignalKind::terminate()).unwrap_or_else(|err| {
		error!(error = %err, "Cannot install SIGTERM handler");
		process::exit(EXIT_STARTUP_FAILURE);
	});
	let sigint = signal(SignalKind::interrupt()).unwrap_or_else(|err| {
		error!(error = %err, "Cannot install SIGINT handler");
		process::exit(EXIT_STARTUP_FAILURE);
	});

	// The listener task holds the sender for the whole run and publishes
	// the signal number once; the event loop tears the session down
	// before the process exits.
	let (shutdown_tx, shutdown_rx) = watch::channel(None);
	tokio::spawn(async move {
		let signo = wait_for_termination(sigterm, sigint).await;
		let _ = shutdown_tx.send(Some(signo));
	});

	let routing = config.routing_table();
	for name in routing.unresolved_recipients() {
		warn!(
			recipient = %name,
			"Recipient has no credential entry and will be skipped"
		);
	}

	let patterns = routing.subscription_patterns();
	if patterns.is_empty() {
		warn!("No recipient rules configured, the bridge will match nothing");
	}

	let sink = PushoverClient::new(config.send_timeout()).unwrap_or_else(
		|err| {
			error!(error = %err, "Cannot build delivery client");
			process::exit(EXIT_STARTUP_FAILURE);
		},
	);
	let dispatcher = Dispatcher::new(sink, config.delivery_tuning());
	let connection = ConnectionManager::new(
		config.broker_settings(),
		patterns,
		shutdown_rx,
	);
	let bridge =
		Bridge::new(connection, MessagePipeline::new(routing, dispatcher));

	match bridge.run().await {
		| Ok(StopReason::CleanDisconnect) => {
			info!("Session closed by broker, exiting");
		}
		| Ok(StopReason::Signal(signo)) => {
			info!(signal = signo, "Graceful shutdown complete");
			process::exit(EXIT_SIGNAL_BASE + signo);
		}
		| Err(err) => {
			error!(error = %err, "Bridge terminated");
			process::exit(EXIT_STARTUP_FAILURE);
		}
	}
}
