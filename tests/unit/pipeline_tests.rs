//! Integration tests for the engine + reader + sender pipeline.

use resequencer_rs::{
    Resequencer, ResequencerConfig, SendError, SequenceNumberComparator, SequenceReader,
    SequenceSender, SequenceSink, SequencedMessage,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Records payloads; optionally slow, to make the reader lag behind.
#[derive(Clone, Default)]
struct RecordingTransport {
    delivered: Arc<Mutex<Vec<String>>>,
    delay: Duration,
}

impl RecordingTransport {
    fn delivered(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SequenceSender<SequencedMessage<String>> for RecordingTransport {
    fn send_sync(&self, element: SequencedMessage<String>) -> Result<(), SendError> {
        thread::sleep(self.delay);
        self.delivered
            .lock()
            .map_err(|e| SendError::failed(e.to_string()))?
            .push(element.payload);
        Ok(())
    }
}

fn message(n: i64) -> SequencedMessage<String> {
    SequencedMessage::new(n, format!("m{n}"))
}

#[test]
fn config_from_json_builds_a_working_pipeline() {
    let config = ResequencerConfig::from_json(
        r#"{"capacity": 5, "timeout_ms": 40, "reader_thread_name": "json-reader"}"#,
    )
    .expect("config");
    let transport = RecordingTransport::default();
    let pipeline = Resequencer::start(
        &config,
        SequenceNumberComparator::new(),
        transport.clone(),
    )
    .expect("pipeline");
    pipeline.engine().set_last_delivered(message(0));

    for n in [2, 1, 4] {
        pipeline.process(message(n));
    }
    thread::sleep(Duration::from_millis(250));
    pipeline.stop().expect("stop");

    assert_eq!(transport.delivered(), vec!["m1", "m2", "m4"]);
    assert_eq!(pipeline.stats().forced_by_timeout, 1);
}

#[test]
fn slow_transport_still_receives_everything_delivered_before_stop() {
    let transport = RecordingTransport {
        delivered: Arc::default(),
        delay: Duration::from_millis(10),
    };
    let pipeline = Resequencer::start(
        &ResequencerConfig::default(),
        SequenceNumberComparator::new(),
        transport.clone(),
    )
    .expect("pipeline");
    pipeline.engine().set_last_delivered(message(0));

    for n in (1..=20).rev() {
        pipeline.process(message(n));
    }
    assert!(pipeline.reader().queued() > 0);
    pipeline.stop().expect("stop");

    let expected: Vec<String> = (1..=20).map(|n| format!("m{n}")).collect();
    assert_eq!(transport.delivered(), expected);
}

#[test]
fn reader_with_shared_sender() {
    let transport = RecordingTransport::default();
    let shared: Arc<dyn SequenceSender<SequencedMessage<String>>> =
        Arc::new(transport.clone());
    let reader = SequenceReader::with_shared_sender(shared).with_thread_name("shared-reader");
    let queue = reader.queue();
    reader.start().expect("start");

    assert!(queue.offer(message(1)));
    assert!(queue.offer(message(2)));
    reader.stop();
    reader.join().expect("join");

    assert_eq!(transport.delivered(), vec!["m1", "m2"]);
}
