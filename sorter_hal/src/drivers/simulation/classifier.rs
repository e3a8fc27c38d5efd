//! Simulated asynchronous classifier.
//!
//! Two modes:
//! - worker: a background thread answers each request after a fixed latency
//!   using a responder closure
//! - deferred: requests are parked until the test completes them explicitly

use parking_lot::Mutex;
use sorter_common::classify::{Classification, Classifier, ClassifyCallback};
use sorter_common::hal::driver::HalError;
use sorter_common::vision::ImageCrop;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Sender};
use std::time::Duration;
use tracing::{debug, warn};

struct Request {
    top: Option<ImageCrop>,
    bottom: Option<ImageCrop>,
    callback: ClassifyCallback,
}

enum Mode {
    Worker(Mutex<Sender<Request>>),
    Deferred(Mutex<VecDeque<Request>>),
}

pub struct SimulatedClassifier {
    mode: Mode,
}

impl SimulatedClassifier {
    /// Spawn a worker thread answering with `responder` after `latency`.
    ///
    /// # Errors
    /// `HalError::InitFailed` if the worker thread cannot be spawned.
    pub fn spawn<F>(latency: Duration, responder: F) -> Result<Self, HalError>
    where
        F: Fn(Option<&ImageCrop>, Option<&ImageCrop>) -> Classification + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Request>();
        std::thread::Builder::new()
            .name("sim-classifier".to_string())
            .spawn(move || {
                while let Ok(request) = rx.recv() {
                    if !latency.is_zero() {
                        std::thread::sleep(latency);
                    }
                    let result = responder(request.top.as_ref(), request.bottom.as_ref());
                    debug!("sim-classifier: answering {:?}", result.part_id);
                    (request.callback)(result);
                }
            })
            .map_err(|e| HalError::InitFailed(format!("classifier worker: {e}")))?;
        Ok(Self {
            mode: Mode::Worker(Mutex::new(tx)),
        })
    }

    /// Worker answering every request with the same result.
    pub fn fixed(result: Classification, latency: Duration) -> Result<Self, HalError> {
        Self::spawn(latency, move |_, _| result.clone())
    }

    /// Classifier that parks requests until `complete_next`.
    pub fn deferred() -> Self {
        Self {
            mode: Mode::Deferred(Mutex::new(VecDeque::new())),
        }
    }

    /// Number of parked requests (always 0 in worker mode).
    pub fn pending(&self) -> usize {
        match &self.mode {
            Mode::Deferred(queue) => queue.lock().len(),
            Mode::Worker(_) => 0,
        }
    }

    /// Answer the oldest parked request. Returns false if none was parked.
    ///
    /// The callback runs on the calling thread, outside the queue lock.
    pub fn complete_next(&self, result: Classification) -> bool {
        let Mode::Deferred(queue) = &self.mode else {
            return false;
        };
        let next = queue.lock().pop_front();
        match next {
            Some(request) => {
                (request.callback)(result);
                true
            }
            None => false,
        }
    }
}

impl Classifier for SimulatedClassifier {
    fn classify(&self, top: Option<ImageCrop>, bottom: Option<ImageCrop>, callback: ClassifyCallback) {
        let request = Request {
            top,
            bottom,
            callback,
        };
        match &self.mode {
            Mode::Worker(tx) => {
                if let Err(mpsc::SendError(request)) = tx.lock().send(request) {
                    warn!("sim-classifier: worker gone, resolving as unidentified");
                    (request.callback)(Classification::none());
                }
            }
            Mode::Deferred(queue) => queue.lock().push_back(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn crop(width: u32) -> ImageCrop {
        ImageCrop {
            jpeg: vec![],
            width,
            height: 1,
        }
    }

    #[test]
    fn worker_answers_on_its_own_thread() {
        let classifier =
            SimulatedClassifier::fixed(Classification::identified("3001", 0.9), Duration::ZERO)
                .unwrap();
        let (tx, rx) = mpsc::channel();
        let caller = std::thread::current().id();
        classifier.classify(
            Some(crop(1)),
            None,
            Box::new(move |c| tx.send((c, std::thread::current().id())).unwrap()),
        );
        let (result, thread) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(result.part_id.as_deref(), Some("3001"));
        assert_ne!(thread, caller);
    }

    #[test]
    fn responder_sees_crops() {
        let classifier = SimulatedClassifier::spawn(
            Duration::ZERO,
            |top, bottom| match (top, bottom) {
                (Some(t), _) => Classification::identified(t.width.to_string(), 1.0),
                _ => Classification::none(),
            },
        )
        .unwrap();
        let (tx, rx) = mpsc::channel();
        let tx2 = tx.clone();
        classifier.classify(Some(crop(3020)), None, Box::new(move |c| tx.send(c).unwrap()));
        classifier.classify(None, Some(crop(1)), Box::new(move |c| tx2.send(c).unwrap()));

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.part_id.as_deref(), Some("3020"));
        assert_eq!(second, Classification::none());
    }

    #[test]
    fn deferred_requests_complete_in_order() {
        let classifier = SimulatedClassifier::deferred();
        let (tx, rx) = mpsc::channel();
        for i in 0..2 {
            let tx = tx.clone();
            classifier.classify(None, None, Box::new(move |c| tx.send((i, c)).unwrap()));
        }
        assert_eq!(classifier.pending(), 2);

        assert!(classifier.complete_next(Classification::identified("a", 0.5)));
        assert!(classifier.complete_next(Classification::none()));
        assert!(!classifier.complete_next(Classification::none()));

        assert_eq!(rx.try_recv().unwrap().0, 0);
        assert_eq!(rx.try_recv().unwrap().1, Classification::none());
    }
}
