//! Recency tokens deciding whether a finished job still matters.

use derive_more::Display;

use crate::TRACING_TARGET_RESOLVER;

/// Token minted for every recomputation request.
///
/// Tokens are only ever compared for recency: the most recently minted one
/// is current, every other one is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub struct JobToken(u64);

/// Mints job tokens and tells current ones from stale ones.
#[derive(Debug, Default)]
pub struct JobRaceResolver {
    latest: u64,
}

impl JobRaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a token that supersedes every earlier one.
    pub fn mint(&mut self) -> JobToken {
        self.latest += 1;
        tracing::trace!(target: TRACING_TARGET_RESOLVER, token = self.latest, "Minted job token");
        JobToken(self.latest)
    }

    /// Returns `true` if `token` is the most recently minted one.
    #[inline]
    pub fn is_current(&self, token: JobToken) -> bool {
        token.0 == self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_the_latest_token_is_current() {
        let mut resolver = JobRaceResolver::new();

        let first = resolver.mint();
        assert!(resolver.is_current(first));

        let second = resolver.mint();
        assert!(!resolver.is_current(first));
        assert!(resolver.is_current(second));
        assert!(second > first);
    }
}
