//! Advisory guard against accidental navigation during a live exam.

const UNLOAD_MESSAGE: &str =
    "Your exam is in progress. Leaving this page will discard the current section.";
const BACK_MESSAGE: &str = "Back navigation is disabled while the exam is running.";

/// Navigation intent reported by the host shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationIntent {
    /// Page unload, tab close or refresh.
    Unload,
    /// History back navigation.
    Back,
}

/// What the host shell should do with an intercepted intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Let the navigation proceed.
    Allow,
    /// Ask the user to confirm leaving, with an advisory message.
    Challenge { message: String },
    /// Swallow the navigation and re-arm the history sentinel.
    Block { message: String },
}

/// Advisory navigation guard for the active exam flow.
///
/// The guard cannot stop a forceful close; it exists so a stray refresh or
/// back press does not silently discard a live section. Host shells map
/// [`GuardDecision`] onto their platform's unload prompt and history stack.
#[derive(Debug, Default)]
pub struct NavigationGuard {
    armed: bool,
    rearm_count: u64,
}

impl NavigationGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the guard for the lifetime of a live section.
    pub fn install(&mut self) {
        if !self.armed {
            self.armed = true;
            tracing::debug!("navigation guard installed");
        }
    }

    /// Disarm the guard; every later intent passes through.
    pub fn uninstall(&mut self) {
        if self.armed {
            self.armed = false;
            tracing::debug!(rearms = self.rearm_count, "navigation guard uninstalled");
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// How often the back sentinel was re-armed while installed.
    #[must_use]
    pub fn rearm_count(&self) -> u64 {
        self.rearm_count
    }

    /// Decide what to do with a navigation intent.
    pub fn decide(&mut self, intent: NavigationIntent) -> GuardDecision {
        if !self.armed {
            return GuardDecision::Allow;
        }
        match intent {
            NavigationIntent::Unload => GuardDecision::Challenge {
                message: UNLOAD_MESSAGE.to_owned(),
            },
            NavigationIntent::Back => {
                self.rearm_count += 1;
                GuardDecision::Block {
                    message: BACK_MESSAGE.to_owned(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disarmed_guard_allows_everything() {
        let mut guard = NavigationGuard::new();
        assert_eq!(guard.decide(NavigationIntent::Unload), GuardDecision::Allow);
        assert_eq!(guard.decide(NavigationIntent::Back), GuardDecision::Allow);
        assert_eq!(guard.rearm_count(), 0);
    }

    #[test]
    fn armed_guard_challenges_unload() {
        let mut guard = NavigationGuard::new();
        guard.install();
        assert!(matches!(
            guard.decide(NavigationIntent::Unload),
            GuardDecision::Challenge { .. }
        ));
    }

    #[test]
    fn armed_guard_blocks_back_and_counts_rearms() {
        let mut guard = NavigationGuard::new();
        guard.install();
        for _ in 0..3 {
            assert!(matches!(
                guard.decide(NavigationIntent::Back),
                GuardDecision::Block { .. }
            ));
        }
        assert_eq!(guard.rearm_count(), 3);
    }

    #[test]
    fn uninstall_lets_navigation_through_again() {
        let mut guard = NavigationGuard::new();
        guard.install();
        guard.decide(NavigationIntent::Back);
        guard.uninstall();
        assert_eq!(guard.decide(NavigationIntent::Back), GuardDecision::Allow);
        assert!(!guard.is_armed());
    }
}
