use tokio::sync::watch;

/// Process phases, in the only order they may occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Uninitialized,
    Configuring,
    Bound,
    Serving,
    Draining,
    Closed,
}

/// Forward-only phase tracker.
#[derive(Debug)]
pub struct Lifecycle {
    tx: watch::Sender<Phase>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Phase::Uninitialized);
        Self { tx }
    }

    pub fn phase(&self) -> Phase {
        *self.tx.borrow()
    }

    /// Move to `next`. Returns false (and stays put) when `next` is not ahead.
    pub fn advance(&self, next: Phase) -> bool {
        let mut from = None;
        self.tx.send_if_modified(|current| {
            if next > *current {
                from = Some(*current);
                *current = next;
                true
            } else {
                false
            }
        });

        match from {
            Some(from) => {
                tracing::debug!(?from, to = ?next, "Lifecycle transition");
                true
            }
            None => false,
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_only_move_forward() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.phase(), Phase::Uninitialized);

        assert!(lifecycle.advance(Phase::Configuring));
        assert!(lifecycle.advance(Phase::Serving));
        assert!(!lifecycle.advance(Phase::Bound));
        assert!(!lifecycle.advance(Phase::Serving));
        assert_eq!(lifecycle.phase(), Phase::Serving);

        assert!(lifecycle.advance(Phase::Closed));
        assert!(!lifecycle.advance(Phase::Draining));
        assert_eq!(lifecycle.phase(), Phase::Closed);
    }
}
