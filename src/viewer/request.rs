use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

/// Hands out increasing request ids. Only the latest one is current; results
/// carrying an older id are stale and get dropped by the caller.
#[derive(Clone, Default)]
pub struct RequestCursor {
    latest: Arc<AtomicU64>,
}

impl RequestCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, request_id: u64) -> bool {
        self.latest.load(Ordering::Acquire) == request_id
    }
}

/// At most one refresh in flight. [`RefreshGuard::try_begin`] returns `None`
/// while another refresh holds the guard.
#[derive(Clone, Default)]
pub struct RefreshGuard {
    running: Arc<AtomicBool>,
}

pub struct RefreshTicket {
    running: Arc<AtomicBool>,
}

impl Drop for RefreshTicket {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

impl RefreshGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Option<RefreshTicket> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshTicket {
                running: self.running.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_request_is_current() {
        let cursor = RequestCursor::new();
        let first = cursor.next();
        assert!(cursor.is_current(first));
        let second = cursor.next();
        assert!(!cursor.is_current(first));
        assert!(cursor.is_current(second));
    }

    #[test]
    fn refresh_guard_allows_one_holder() {
        let guard = RefreshGuard::new();
        let ticket = guard.try_begin().expect("first");
        assert!(guard.is_running());
        assert!(guard.try_begin().is_none());
        drop(ticket);
        assert!(!guard.is_running());
        assert!(guard.try_begin().is_some());
    }
}
