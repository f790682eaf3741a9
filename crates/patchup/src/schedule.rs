//! Check throttling
//!
//! A single RFC 3339 timestamp in `<state-dir>/cktime` records the earliest
//! instant at which the network may be contacted again. Every performed check
//! pushes it to `now + 24h + jitter`, jitter drawn uniformly from `[0, 24h)`
//! so a fleet started at the same moment spreads its checks out.
//!
//! A missing, unreadable or unparseable token means "check now". Only a
//! successfully parsed future timestamp suppresses a check.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use rand::Rng;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::UpdateConfig;
use crate::{CHECK_TOKEN_FILE, DEV_VERSION};

/// Contents of the check token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    /// No token yet, never checked
    Missing,

    /// Token exists but could not be read or parsed
    Invalid(String),

    /// Earliest instant of the next check
    Scheduled(DateTime<Utc>),
}

impl TokenState {
    /// Whether a check is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self {
            TokenState::Scheduled(next) => *next <= now,
            TokenState::Missing | TokenState::Invalid(_) => true,
        }
    }
}

/// Outcome of consulting the scheduler
#[derive(Debug)]
pub enum CheckDecision {
    /// Development builds never check
    DevelopmentBuild,

    /// The token is still in the future
    NotDue { next_check: DateTime<Utc> },

    /// The check was due but the new token could not be persisted
    TokenWriteFailed { path: PathBuf, error: io::Error },

    /// Check now; the token was moved to `next_check`
    Check { next_check: DateTime<Utc> },
}

impl CheckDecision {
    /// Whether the caller should contact the network
    pub fn should_check(&self) -> bool {
        matches!(self, CheckDecision::Check { .. })
    }
}

/// Reads and reschedules the check token
#[derive(Debug, Clone)]
pub struct CheckScheduler {
    state_dir: PathBuf,
    interval: TimeDelta,
    max_jitter: TimeDelta,
}

impl CheckScheduler {
    /// Scheduler with the standard 24h interval and up to 24h of jitter
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            interval: TimeDelta::hours(24),
            max_jitter: TimeDelta::hours(24),
        }
    }

    /// Override the interval and the jitter bound
    pub fn with_interval(mut self, interval: TimeDelta, max_jitter: TimeDelta) -> Self {
        self.interval = interval;
        self.max_jitter = max_jitter;
        self
    }

    /// State directory holding the token
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Path of the check token
    pub fn token_path(&self) -> PathBuf {
        self.state_dir.join(CHECK_TOKEN_FILE)
    }

    /// Read the token without side effects
    pub fn next_check(&self) -> TokenState {
        let path = self.token_path();

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return TokenState::Missing,
            Err(e) => return TokenState::Invalid(e.to_string()),
        };

        match DateTime::parse_from_rfc3339(content.trim()) {
            Ok(next) => TokenState::Scheduled(next.with_timezone(&Utc)),
            Err(e) => TokenState::Invalid(e.to_string()),
        }
    }

    /// Whether to contact the network now, rescheduling the token if so
    pub fn want_check(&self, config: &UpdateConfig) -> bool {
        self.decide(config, Utc::now()).should_check()
    }

    /// Scheduling decision at `now`
    pub fn decide(&self, config: &UpdateConfig, now: DateTime<Utc>) -> CheckDecision {
        if config.current_version() == DEV_VERSION {
            debug!("Development build, never checking for updates");
            return CheckDecision::DevelopmentBuild;
        }

        let token = self.next_check();
        if let TokenState::Invalid(reason) = &token {
            debug!(path = ?self.token_path(), reason = %reason, "Ignoring unusable check token");
        }

        if !config.force_check() {
            if let TokenState::Scheduled(next_check) = token {
                if next_check > now {
                    debug!(next_check = %next_check, "Update check not due yet");
                    return CheckDecision::NotDue { next_check };
                }
            }
        }

        let next_check = now + self.interval + self.jitter();
        match self.write_token(next_check) {
            Ok(()) => {
                debug!(next_check = %next_check, "Rescheduled next update check");
                CheckDecision::Check { next_check }
            }
            Err(error) => {
                let path = self.token_path();
                warn!(
                    path = ?path,
                    error = %error,
                    "Couldn't persist check token, skipping update check"
                );
                CheckDecision::TokenWriteFailed { path, error }
            }
        }
    }

    fn jitter(&self) -> TimeDelta {
        let bound = self.max_jitter.num_seconds();
        if bound <= 0 {
            return TimeDelta::zero();
        }
        TimeDelta::seconds(rand::rng().random_range(0..bound))
    }

    fn write_token(&self, next_check: DateTime<Utc>) -> io::Result<()> {
        fs::write(
            self.token_path(),
            next_check.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(version: &str, force: bool) -> UpdateConfig {
        UpdateConfig::builder("myapp", version)
            .base_url("http://updates.example.com/")
            .force_check(force)
            .build()
            .unwrap()
    }

    #[test]
    fn test_missing_token_checks_now() {
        let temp = TempDir::new().unwrap();
        let scheduler = CheckScheduler::new(temp.path());
        let now = Utc::now();

        assert_eq!(scheduler.next_check(), TokenState::Missing);
        let decision = scheduler.decide(&config("1.0.0", false), now);
        assert!(decision.should_check());

        match scheduler.next_check() {
            TokenState::Scheduled(next) => {
                assert!(next >= now + TimeDelta::hours(24) - TimeDelta::seconds(1));
                assert!(next < now + TimeDelta::hours(48));
            }
            other => panic!("Expected scheduled token, got {:?}", other),
        }
    }

    #[test]
    fn test_future_token_skips_and_is_untouched() {
        let temp = TempDir::new().unwrap();
        let scheduler = CheckScheduler::new(temp.path());
        let now = Utc::now();
        let stored = (now + TimeDelta::hours(30)).to_rfc3339_opts(SecondsFormat::Secs, true);
        fs::write(scheduler.token_path(), &stored).unwrap();

        let decision = scheduler.decide(&config("1.0.0", false), now);
        assert!(matches!(decision, CheckDecision::NotDue { .. }));
        assert_eq!(fs::read_to_string(scheduler.token_path()).unwrap(), stored);
    }

    #[test]
    fn test_past_token_checks() {
        let temp = TempDir::new().unwrap();
        let scheduler = CheckScheduler::new(temp.path());
        let now = Utc::now();
        fs::write(
            scheduler.token_path(),
            (now - TimeDelta::minutes(5)).to_rfc3339(),
        )
        .unwrap();

        assert!(scheduler.decide(&config("1.0.0", false), now).should_check());
    }

    #[test]
    fn test_force_check_ignores_future_token() {
        let temp = TempDir::new().unwrap();
        let scheduler = CheckScheduler::new(temp.path());
        let now = Utc::now();
        fs::write(
            scheduler.token_path(),
            (now + TimeDelta::hours(40)).to_rfc3339(),
        )
        .unwrap();

        assert!(scheduler.decide(&config("1.0.0", true), now).should_check());
    }

    #[test]
    fn test_corrupt_token_checks_now() {
        let temp = TempDir::new().unwrap();
        let scheduler = CheckScheduler::new(temp.path());
        fs::write(scheduler.token_path(), "tomorrow-ish").unwrap();

        assert!(matches!(scheduler.next_check(), TokenState::Invalid(_)));
        assert!(scheduler.want_check(&config("1.0.0", false)));
    }

    #[test]
    fn test_dev_version_never_checks() {
        let temp = TempDir::new().unwrap();
        let scheduler = CheckScheduler::new(temp.path());

        assert!(!scheduler.want_check(&config(DEV_VERSION, false)));
        assert!(!scheduler.want_check(&config(DEV_VERSION, true)));
        assert!(!scheduler.token_path().exists());
    }

    #[test]
    fn test_dev_version_ignores_due_token() {
        let temp = TempDir::new().unwrap();
        let scheduler = CheckScheduler::new(temp.path());
        let now = Utc::now();
        let stored = (now - TimeDelta::hours(3)).to_rfc3339_opts(SecondsFormat::Secs, true);
        fs::write(scheduler.token_path(), &stored).unwrap();

        let decision = scheduler.decide(&config(DEV_VERSION, false), now);
        assert!(matches!(decision, CheckDecision::DevelopmentBuild));
        assert!(!scheduler.want_check(&config(DEV_VERSION, true)));
        assert_eq!(fs::read_to_string(scheduler.token_path()).unwrap(), stored);
    }

    #[test]
    fn test_unwritable_state_dir_does_not_check() {
        let temp = TempDir::new().unwrap();
        let scheduler = CheckScheduler::new(temp.path().join("does-not-exist"));

        let decision = scheduler.decide(&config("1.0.0", false), Utc::now());
        assert!(matches!(decision, CheckDecision::TokenWriteFailed { .. }));
        assert!(!decision.should_check());
    }

    #[test]
    fn test_jitter_spreads_tokens() {
        let temp = TempDir::new().unwrap();
        let scheduler = CheckScheduler::new(temp.path());
        let now = Utc::now();

        let mut tokens = Vec::new();
        for _ in 0..8 {
            let decision = scheduler.decide(&config("1.0.0", true), now);
            match decision {
                CheckDecision::Check { next_check } => tokens.push(next_check),
                other => panic!("Expected check, got {:?}", other),
            }
        }
        tokens.sort();
        tokens.dedup();
        assert!(tokens.len() > 1, "jitter should vary the next check time");
    }

    #[test]
    fn test_zero_jitter_is_exact() {
        let temp = TempDir::new().unwrap();
        let scheduler = CheckScheduler::new(temp.path())
            .with_interval(TimeDelta::hours(1), TimeDelta::zero());
        let now = Utc::now();

        match scheduler.decide(&config("1.0.0", false), now) {
            CheckDecision::Check { next_check } => {
                assert_eq!(next_check, now + TimeDelta::hours(1))
            }
            other => panic!("Expected check, got {:?}", other),
        }
    }
}
