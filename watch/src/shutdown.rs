//! One-shot finalization and process signal handling.
use log::{error, info};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::signal;

const RUNNING: u8 = 0;
const FINALIZING: u8 = 1;
const DONE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeState {
    Running,
    Finalizing,
    Done,
}

/// Why the tool is wrapping up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The configured number of blocks has been processed.
    ExperimentComplete,
    /// The process received a termination signal.
    Signal(&'static str),
}

/// Ensures wrap-up runs at most once, whichever trigger fires first.
#[derive(Debug, Clone, Default)]
pub struct FinalizeGuard {
    state: Arc<AtomicU8>,
}

/// Held while wrap-up is in progress. Marks the guard `Done` when dropped.
#[derive(Debug)]
pub struct FinalizeTicket {
    state: Arc<AtomicU8>,
}

impl FinalizeGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move from `Running` to `Finalizing`.
    ///
    /// Only the first caller receives a ticket; every later call returns `None`.
    pub fn try_begin(&self) -> Option<FinalizeTicket> {
        self.state
            .compare_exchange(RUNNING, FINALIZING, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FinalizeTicket {
                state: self.state.clone(),
            })
    }

    pub fn state(&self) -> FinalizeState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => FinalizeState::Running,
            FINALIZING => FinalizeState::Finalizing,
            _ => FinalizeState::Done,
        }
    }
}

impl Drop for FinalizeTicket {
    fn drop(&mut self) {
        self.state.store(DONE, Ordering::Release);
    }
}

/// Resolves when the process receives SIGINT or, on unix, SIGTERM.
pub async fn shutdown_signal() -> ShutdownReason {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let reason = tokio::select! {
        _ = ctrl_c => ShutdownReason::Signal("SIGINT"),
        _ = terminate => ShutdownReason::Signal("SIGTERM"),
    };
    info!("Received {:?}, wrapping up", reason);
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn single_ticket() {
        let guard = FinalizeGuard::new();
        assert_eq!(guard.state(), FinalizeState::Running);

        let ticket = guard.try_begin().unwrap();
        assert_eq!(guard.state(), FinalizeState::Finalizing);
        assert!(guard.try_begin().is_none());

        drop(ticket);
        assert_eq!(guard.state(), FinalizeState::Done);
        assert!(guard.try_begin().is_none());
    }

    #[test]
    fn clones_share_state() {
        let guard = FinalizeGuard::new();
        let other = guard.clone();
        let _ticket = other.try_begin().unwrap();
        assert!(guard.try_begin().is_none());
    }

    #[test]
    fn concurrent_triggers_finalize_once() {
        let guard = FinalizeGuard::new();
        let winners = Arc::new(AtomicUsize::new(0));

        let handles = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let winners = winners.clone();
                thread::spawn(move || {
                    if let Some(ticket) = guard.try_begin() {
                        winners.fetch_add(1, Ordering::SeqCst);
                        drop(ticket);
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(guard.state(), FinalizeState::Done);
    }
}
