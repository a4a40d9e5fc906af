use std::{
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::{Duration, Instant},
};

pub struct CollectOutcome<T> {
    /// One slot per expected result, `None` when the result never arrived
    pub results: Vec<Option<T>>,
    pub timed_out: bool,
}

impl<T> CollectOutcome<T> {
    pub fn missing(&self) -> usize {
        self.results.iter().filter(|result| result.is_none()).count()
    }
}

/// Collects `(index, value)` pairs sent by workers until all `expected` values
/// arrived or `timeout` elapsed. After a timeout, values that are already done
/// are still harvested as long as each one arrives within `grace`.
pub fn collect_with_timeout<T>(
    receiver: &Receiver<(usize, T)>,
    expected: usize,
    timeout: Duration,
    grace: Duration,
) -> CollectOutcome<T> {
    let mut results: Vec<Option<T>> = (0..expected).map(|_| None).collect();
    let mut received = 0;
    let mut timed_out = false;
    let deadline = Instant::now() + timeout;

    while received < expected {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok((index, value)) => {
                if let Some(slot) = results.get_mut(index) {
                    if slot.is_none() {
                        received += 1;
                    }
                    *slot = Some(value);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                timed_out = true;
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if timed_out {
        while received < expected {
            match receiver.recv_timeout(grace) {
                Ok((index, value)) => {
                    if let Some(slot) = results.get_mut(index) {
                        if slot.is_none() {
                            received += 1;
                        }
                        *slot = Some(value);
                    }
                }
                Err(_) => break,
            }
        }
    }

    CollectOutcome { results, timed_out }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc, thread};

    use super::*;

    #[test]
    fn test_collects_all_results() {
        let (tx, rx) = mpsc::channel();
        for i in 0..4 {
            let tx = tx.clone();
            thread::spawn(move || tx.send((i, i * 10)).unwrap());
        }

        let outcome = collect_with_timeout(&rx, 4, Duration::from_secs(5), Duration::ZERO);

        assert!(!outcome.timed_out);
        assert_eq!(
            outcome.results,
            vec![Some(0), Some(10), Some(20), Some(30)]
        );
    }

    #[test]
    fn test_times_out_with_partial_results() {
        let (tx, rx) = mpsc::channel();
        tx.send((1, "done")).unwrap();

        let outcome = collect_with_timeout(
            &rx,
            3,
            Duration::from_millis(20),
            Duration::from_millis(5),
        );

        assert!(outcome.timed_out);
        assert_eq!(outcome.missing(), 2);
        assert_eq!(outcome.results[1], Some("done"));
        drop(tx);
    }
}
