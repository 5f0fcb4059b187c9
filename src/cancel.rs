//! Cooperative stop signal shared between the signal watcher and the pump.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, Signal, SignalKind};

/// Exit status used when a second stop signal forces the process down.
const FORCED_EXIT_STATUS: i32 = 130;

/// Cloneable cancellation flag. All clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Something that reports stop requests one at a time.
trait StopRequests {
    async fn next(&mut self) -> io::Result<()>;
}

struct ProcessSignals {
    term: Signal,
    hup: Signal,
}

impl StopRequests for ProcessSignals {
    async fn next(&mut self) -> io::Result<()> {
        tokio::select! {
            res = signal::ctrl_c() => res,
            _ = self.term.recv() => Ok(()),
            _ = self.hup.recv() => Ok(()),
        }
    }
}

/// Raise `token` on the first stop request and return on the second.
async fn escalate<S: StopRequests>(token: &CancellationToken, requests: &mut S) -> io::Result<()> {
    requests.next().await?;
    token.cancel();
    log::info!("Stop requested, finishing current chunk");

    requests.next().await?;
    log::warn!("Second stop request, exiting without waiting for the stream");
    Ok(())
}

/// Wait for SIGINT, SIGTERM or SIGHUP and raise `token`.
///
/// The first signal only sets the flag; the pump notices it at the top of
/// its next iteration. A second signal exits the process, since the pump may
/// be parked in a blocking read that never returns.
pub async fn watch_signals(token: CancellationToken) -> io::Result<()> {
    let mut signals = ProcessSignals {
        term: unix_signal(SignalKind::terminate())?,
        hup: unix_signal(SignalKind::hangup())?,
    };

    escalate(&token, &mut signals).await?;
    std::process::exit(FORCED_EXIT_STATUS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays canned stop requests, then waits forever.
    struct Scripted {
        requests: VecDeque<io::Result<()>>,
        token: CancellationToken,
        flag_seen_before_second: Option<bool>,
    }

    impl StopRequests for Scripted {
        async fn next(&mut self) -> io::Result<()> {
            if self.requests.len() == 1 {
                self.flag_seen_before_second = Some(self.token.is_cancelled());
            }
            match self.requests.pop_front() {
                Some(request) => request,
                None => std::future::pending().await,
            }
        }
    }

    fn scripted(token: &CancellationToken, requests: Vec<io::Result<()>>) -> Scripted {
        Scripted {
            requests: requests.into(),
            token: token.clone(),
            flag_seen_before_second: None,
        }
    }

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_across_threads() {
        let token = CancellationToken::new();
        let remote = token.clone();
        std::thread::spawn(move || remote.cancel()).join().unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn first_request_cancels_and_second_escalates() {
        let token = CancellationToken::new();
        let mut requests = scripted(&token, vec![Ok(()), Ok(())]);

        escalate(&token, &mut requests).await.unwrap();
        assert!(token.is_cancelled());
        assert_eq!(requests.flag_seen_before_second, Some(true));
    }

    #[tokio::test]
    async fn single_request_only_raises_the_flag() {
        let token = CancellationToken::new();
        let mut requests = scripted(&token, vec![Ok(())]);

        let waited = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            escalate(&token, &mut requests),
        )
        .await;
        assert!(waited.is_err());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn watcher_error_leaves_flag_down() {
        let token = CancellationToken::new();
        let mut requests = scripted(&token, vec![Err(io::Error::other("no handler"))]);

        assert!(escalate(&token, &mut requests).await.is_err());
        assert!(!token.is_cancelled());
    }
}
