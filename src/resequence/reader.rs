//! The single consumer forwarding delivered elements to a
//! [`SequenceSender`].
//!
//! The engine delivers into a [`ReaderQueue`]; a dedicated thread drains it
//! and calls [`SequenceSender::send_sync`] one element at a time, so a slow
//! send throttles the reader without ever reordering the elements behind
//! it.

use super::engine::SequenceSink;
use super::error::ResequencerError;
use super::sender::SequenceSender;
use crate::scheduler::panic_message;
use crossbeam::channel::{self, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace};

use super::config::DEFAULT_READER_THREAD_NAME;

/// An entry of the reader queue: either a real element or the stop marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceItem<T> {
    /// An element to forward to the sender.
    Element(T),
    /// Ends the reader loop once everything queued before it was sent.
    Stop,
}

impl<T> SequenceItem<T> {
    /// Returns `true` for the stop marker.
    #[must_use]
    pub fn is_stop(&self) -> bool {
        matches!(self, SequenceItem::Stop)
    }

    /// The carried element, or `None` for the stop marker.
    pub fn into_element(self) -> Option<T> {
        match self {
            SequenceItem::Element(element) => Some(element),
            SequenceItem::Stop => None,
        }
    }
}

/// Producer side of a reader's queue. This is what an engine delivers into.
#[derive(Debug)]
pub struct ReaderQueue<T> {
    sender: Sender<SequenceItem<T>>,
}

impl<T> Clone for ReaderQueue<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: Send> SequenceSink<T> for ReaderQueue<T> {
    fn offer(&self, element: T) -> bool {
        // unbounded: never blocks
        self.sender.send(SequenceItem::Element(element)).is_ok()
    }
}

/// Forwards queued elements to a [`SequenceSender`] on a dedicated thread.
///
/// Send failures and panics are logged and the loop moves on to the next
/// element; nothing is retried. The loop ends on [`stop`](Self::stop),
/// after every element queued before the stop marker has been sent, or when
/// every producer handle of the queue is gone.
pub struct SequenceReader<T>
where
    T: Send + 'static,
{
    sender: Arc<dyn SequenceSender<T>>,
    queue: Sender<SequenceItem<T>>,
    receiver: Mutex<Option<Receiver<SequenceItem<T>>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_name: String,
}

impl<T> SequenceReader<T>
where
    T: Send + 'static,
{
    /// Creates a reader forwarding to `sender`. Nothing runs until
    /// [`start`](Self::start).
    pub fn new<S>(sender: S) -> Self
    where
        S: SequenceSender<T> + 'static,
    {
        Self::with_shared_sender(Arc::new(sender))
    }

    /// Creates a reader forwarding to a sender that is shared with other
    /// owners.
    pub fn with_shared_sender(sender: Arc<dyn SequenceSender<T>>) -> Self {
        let (queue, receiver) = channel::unbounded();
        Self {
            sender,
            queue,
            receiver: Mutex::new(Some(receiver)),
            handle: Mutex::new(None),
            thread_name: DEFAULT_READER_THREAD_NAME.to_string(),
        }
    }

    /// Names the reader thread.
    #[must_use]
    pub fn with_thread_name(mut self, name: &str) -> Self {
        self.thread_name = name.to_string();
        self
    }

    /// A producer handle for the reader's queue.
    #[must_use]
    pub fn queue(&self) -> ReaderQueue<T> {
        ReaderQueue {
            sender: self.queue.clone(),
        }
    }

    /// Spawns the reader thread.
    ///
    /// # Errors
    ///
    /// Returns [`ResequencerError::ReaderAlreadyStarted`] on a second call
    /// and [`ResequencerError::ThreadSpawn`] if the thread cannot be spawned.
    pub fn start(&self) -> Result<(), ResequencerError> {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ResequencerError::ReaderAlreadyStarted)?;

        let sender = Arc::clone(&self.sender);
        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || run_reader(&receiver, sender.as_ref()))
            .map_err(|e| ResequencerError::ThreadSpawn {
                name: self.thread_name.clone(),
                message: e.to_string(),
            })?;

        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        debug!("Sequence reader '{}' started", self.thread_name);
        Ok(())
    }

    /// Queues the stop marker behind every element already queued.
    pub fn stop(&self) {
        // fails only if the reader thread is already gone
        let _ = self.queue.send(SequenceItem::Stop);
    }

    /// Waits for the reader thread to exit. Returns immediately if it was
    /// never started or has already been joined.
    ///
    /// # Errors
    ///
    /// Returns [`ResequencerError::ReaderPanicked`] if the thread panicked.
    pub fn join(&self) -> Result<(), ResequencerError> {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(handle) => handle
                .join()
                .map_err(|payload| ResequencerError::ReaderPanicked {
                    message: panic_message(payload.as_ref()),
                }),
            None => Ok(()),
        }
    }

    /// Returns `true` while the reader thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of items waiting in the queue.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl<T> Drop for SequenceReader<T>
where
    T: Send + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_reader<T>(receiver: &Receiver<SequenceItem<T>>, sender: &dyn SequenceSender<T>) {
    loop {
        match receiver.recv() {
            Ok(SequenceItem::Element(element)) => send_one(sender, element),
            Ok(SequenceItem::Stop) => {
                debug!("Sequence reader received stop marker");
                break;
            }
            Err(_) => {
                debug!("Sequence reader queue disconnected");
                break;
            }
        }
    }
}

fn send_one<T>(sender: &dyn SequenceSender<T>, element: T) {
    match panic::catch_unwind(AssertUnwindSafe(|| sender.send_sync(element))) {
        Ok(Ok(())) => trace!("Element sent"),
        Ok(Err(err)) => error!("Failed to send resequenced element: {}", err),
        Err(payload) => error!(
            "Sequence sender panicked: {}",
            panic_message(payload.as_ref())
        ),
    }
}
