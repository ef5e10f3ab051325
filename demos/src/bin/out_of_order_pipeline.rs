//! Example demonstrating a full resequencing pipeline
//!
//! This example shows how to:
//! 1. Load a `ResequencerConfig` from JSON
//! 2. Start a `Resequencer` that forwards to a custom `SequenceSender`
//! 3. Feed it shuffled messages with one message missing entirely
//! 4. Inspect the engine statistics once the pipeline is stopped

use resequencer_rs::prelude::{
    Resequencer, ResequencerConfig, SendError, SequenceNumberComparator, SequenceSender,
    SequencedMessage,
};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Quote {
    symbol: String,
    price: u64,
}

/// Stands in for a network transport: prints each message as JSON.
struct StdoutTransport;

impl SequenceSender<SequencedMessage<Quote>> for StdoutTransport {
    fn send_sync(&self, element: SequencedMessage<Quote>) -> Result<(), SendError> {
        let line = serde_json::to_string(&element).map_err(|e| SendError::failed(e.to_string()))?;
        info!("-> {}", line);
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = match ResequencerConfig::from_json(
        r#"{"capacity": 8, "timeout_ms": 200, "reader_thread_name": "quote-reader"}"#,
    ) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    let pipeline = match Resequencer::start(&config, SequenceNumberComparator::new(), StdoutTransport)
    {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Failed to start pipeline: {}", e);
            return;
        }
    };
    pipeline.engine().set_last_delivered(SequencedMessage::new(
        0,
        Quote {
            symbol: String::new(),
            price: 0,
        },
    ));

    // message 4 never arrives
    let arrival_order = [2, 1, 3, 6, 5, 8, 7, 9, 10];
    for n in arrival_order {
        let quote = Quote {
            symbol: "BTC/USD".to_string(),
            price: 50_000 + n as u64 * 10,
        };
        info!("<- message {}", n);
        pipeline.process(SequencedMessage::new(n, quote));
        thread::sleep(Duration::from_millis(20));
    }

    info!("Waiting for the gap at 4 to time out");
    thread::sleep(config.timeout() * 2);

    if let Err(e) = pipeline.stop() {
        error!("Pipeline did not stop cleanly: {}", e);
    }

    match serde_json::to_string_pretty(&pipeline.stats()) {
        Ok(stats) => info!("Final statistics:\n{}", stats),
        Err(e) => error!("Failed to serialize statistics: {}", e),
    }
}
