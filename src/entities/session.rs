use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one search started within a [`SearchSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchToken(u64);

impl SearchToken {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Tracks which search is current so superseded results never render.
#[derive(Debug, Default)]
pub struct SearchSession {
    current: AtomicU64,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new search; every token issued earlier becomes stale.
    pub fn begin(&self) -> SearchToken {
        SearchToken(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, token: SearchToken) -> bool {
        self.current.load(Ordering::Acquire) == token.0
    }

    /// Hands `value` back only if `token` is still the latest search.
    pub fn accept<T>(&self, token: SearchToken, value: T) -> Option<T> {
        self.is_current(token).then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_increase_monotonically() {
        let session = SearchSession::new();
        let a = session.begin();
        let b = session.begin();
        assert!(b > a);
        assert_eq!(b.id(), a.id() + 1);
    }

    #[test]
    fn only_latest_token_is_accepted() {
        let session = SearchSession::new();
        let first = session.begin();
        assert_eq!(session.accept(first, "ibuprofen"), Some("ibuprofen"));

        let second = session.begin();
        assert_eq!(session.accept(first, "stale"), None);
        assert!(!session.is_current(first));
        assert_eq!(session.accept(second, "fresh"), Some("fresh"));
    }

    #[tokio::test]
    async fn stale_result_from_slow_task_is_discarded() {
        use std::sync::Arc;
        use std::time::Duration;

        let session = Arc::new(SearchSession::new());
        let slow_token = session.begin();
        let slow = {
            let session = session.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                session.accept(slow_token, "panadol")
            })
        };

        let fast_token = session.begin();
        assert_eq!(session.accept(fast_token, "brufen"), Some("brufen"));
        assert_eq!(slow.await.unwrap(), None);
    }
}
