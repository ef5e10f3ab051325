//! A running resequencing pipeline: engine, reader and sender wired
//! together.

use super::comparator::SequenceElementComparator;
use super::config::ResequencerConfig;
use super::engine::{ResequencerEngine, ResequencerStats};
use super::error::ResequencerError;
use super::reader::SequenceReader;
use super::sender::SequenceSender;
use tracing::{debug, info};

/// Accepts elements in any order and hands them to a [`SequenceSender`] in
/// sequence order.
///
/// # Example
///
/// ```
/// use resequencer_rs::{Resequencer, ResequencerConfig, SendError, SequenceNumberComparator};
/// use std::sync::{Arc, Mutex};
///
/// let sent = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&sent);
/// let sender = move |n: i32| -> Result<(), SendError> {
///     sink.lock().map_err(|e| SendError::failed(e.to_string()))?.push(n);
///     Ok(())
/// };
///
/// let pipeline = Resequencer::start(
///     &ResequencerConfig::default(),
///     SequenceNumberComparator::new(),
///     sender,
/// )?;
/// pipeline.engine().set_last_delivered(-1);
/// for n in [0, 2, 1, 3] {
///     pipeline.process(n);
/// }
/// pipeline.stop()?;
///
/// assert_eq!(*sent.lock().unwrap(), vec![0, 1, 2, 3]);
/// # Ok::<(), resequencer_rs::ResequencerError>(())
/// ```
pub struct Resequencer<T, C>
where
    T: Clone + Send + 'static,
    C: SequenceElementComparator<T> + 'static,
{
    engine: ResequencerEngine<T, C>,
    reader: SequenceReader<T>,
}

impl<T, C> Resequencer<T, C>
where
    T: Clone + Send + 'static,
    C: SequenceElementComparator<T> + 'static,
{
    /// Validates `config`, builds the engine and starts the reader thread.
    ///
    /// # Errors
    ///
    /// Returns [`ResequencerError::Config`] for an invalid configuration, and
    /// the engine or reader startup errors otherwise.
    pub fn start<S>(
        config: &ResequencerConfig,
        comparator: C,
        sender: S,
    ) -> Result<Self, ResequencerError>
    where
        S: SequenceSender<T> + 'static,
    {
        config.validate()?;

        let engine = ResequencerEngine::new(comparator, config.capacity)?;
        engine.set_timeout(config.timeout());

        let reader = SequenceReader::new(sender).with_thread_name(&config.reader_thread_name);
        engine.set_out_queue(reader.queue());
        reader.start()?;

        info!(
            "Resequencer started: capacity={}, timeout={}ms, reader='{}'",
            config.capacity, config.timeout_ms, config.reader_thread_name
        );
        Ok(Self { engine, reader })
    }

    /// Hands an element to the engine.
    pub fn process(&self, element: T) {
        self.engine.put(element);
    }

    /// The underlying engine.
    pub fn engine(&self) -> &ResequencerEngine<T, C> {
        &self.engine
    }

    /// The underlying reader.
    pub fn reader(&self) -> &SequenceReader<T> {
        &self.reader
    }

    /// Engine counters.
    pub fn stats(&self) -> ResequencerStats {
        self.engine.stats()
    }

    /// Stops the engine, then the reader, and waits for the reader to send
    /// everything the engine had already delivered.
    ///
    /// # Errors
    ///
    /// Returns [`ResequencerError::ReaderPanicked`] if the reader thread did
    /// not exit cleanly.
    pub fn stop(&self) -> Result<(), ResequencerError> {
        self.engine.stop();
        self.reader.stop();
        self.reader.join()?;
        debug!("Resequencer stopped");
        Ok(())
    }
}
