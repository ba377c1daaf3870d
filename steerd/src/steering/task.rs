use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task;

/// Async task handle, aborted when dropped.
#[derive(Debug)]
pub struct Task<T> {
    join_handle: task::JoinHandle<T>,
}

impl<T> Task<T> {
    pub fn spawn<Fut>(future: Fut) -> Task<T>
    where
        Fut: Future<Output = T> + Send + 'static,
        Fut::Output: Send + 'static,
    {
        Task {
            join_handle: task::spawn(future),
        }
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        self.join_handle.abort();
    }
}

/// One-shot or periodic timer. Dropping the handle cancels the timer;
/// the backing task exits when the control channel closes.
#[derive(Debug)]
pub struct Timer {
    tx: UnboundedSender<TimerMessage>,
    duration: Duration,
    last_reset: Arc<Mutex<Instant>>,
}

#[derive(Debug)]
pub enum TimerMessage {
    Refresh,
}

#[derive(PartialEq)]
pub enum TimerType {
    Once,
    Infinite,
}

impl Timer {
    pub fn new<F, Fut>(sec: u64, typ: TimerType, mut cb: F) -> Timer
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let duration = Duration::new(sec, 0);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let last_reset = Arc::new(Mutex::new(Instant::now()));

        let last_reset_clone = last_reset.clone();
        tokio::spawn(async move {
            // Every turn of the loop sleeps a full period, so a control
            // message restarts the countdown.
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {
                        (cb)().await;
                        if typ == TimerType::Once {
                            break;
                        }
                        *last_reset_clone.lock().unwrap() = Instant::now();
                    }
                    message = rx.recv() => {
                        match message {
                            Some(TimerMessage::Refresh) => {
                                *last_reset_clone.lock().unwrap() = Instant::now();
                            }
                            None => break,
                        }
                    }
                }
            }
        });

        Timer {
            tx,
            duration,
            last_reset,
        }
    }

    pub fn once<F, Fut>(sec: u64, cb: F) -> Timer
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        Self::new(sec, TimerType::Once, cb)
    }

    /// Reset the countdown without replacing the timer.
    pub fn refresh(&self) {
        let _ = self.tx.send(TimerMessage::Refresh);
    }

    /// Seconds remaining until the next tick.
    pub fn rem_sec(&self) -> u64 {
        let elapsed = self.last_reset.lock().unwrap().elapsed();
        if elapsed >= self.duration {
            0
        } else {
            (self.duration - elapsed).as_secs()
        }
    }
}
