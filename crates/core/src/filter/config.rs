use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::ignore_list::IgnoreList;
use super::policy::InterruptionPolicy;

pub const MAX_BUFFER_TIME_SECS: f64 = 2.0;
pub const DEFAULT_BUFFER_TIME_SECS: f64 = 0.5;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum FilterConfigError {
    #[error("buffer_time must be between 0 and {max} seconds (got {value})")]
    BufferTimeOutOfRange { value: f64, max: f64 },
    #[error("ignore_list cannot be empty when filtering is enabled")]
    EmptyIgnoreList,
}

/// Per-session filter settings. Validate before use; treat as read-only after.
#[derive(Clone)]
pub struct FilterConfig {
    pub enabled: bool,
    pub ignore_list: IgnoreList,
    pub case_sensitive: bool,
    /// Seconds. Reserved for buffered decisions; validated but not consumed.
    pub buffer_time: f64,
    pub custom_policy: Option<Arc<dyn InterruptionPolicy>>,
    pub emit_events: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ignore_list: IgnoreList::default(),
            case_sensitive: false,
            buffer_time: DEFAULT_BUFFER_TIME_SECS,
            custom_policy: None,
            emit_events: true,
        }
    }
}

impl fmt::Debug for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterConfig")
            .field("enabled", &self.enabled)
            .field("ignore_list", &self.ignore_list)
            .field("case_sensitive", &self.case_sensitive)
            .field("buffer_time", &self.buffer_time)
            .field("custom_policy", &self.custom_policy.as_ref().map(|_| "<policy>"))
            .field("emit_events", &self.emit_events)
            .finish()
    }
}

impl FilterConfig {
    pub fn with_custom_policy<P>(mut self, policy: P) -> Self
    where
        P: InterruptionPolicy + 'static,
    {
        self.custom_policy = Some(Arc::new(policy));
        self
    }

    /// Checks bounds and folds the ignore list to lowercase when matching is
    /// case-insensitive. Safe to call repeatedly.
    pub fn validate(&mut self) -> Result<(), FilterConfigError> {
        if !(0.0..=MAX_BUFFER_TIME_SECS).contains(&self.buffer_time) {
            return Err(FilterConfigError::BufferTimeOutOfRange {
                value: self.buffer_time,
                max: MAX_BUFFER_TIME_SECS,
            });
        }

        if self.enabled && self.ignore_list.is_empty() {
            return Err(FilterConfigError::EmptyIgnoreList);
        }

        if !self.case_sensitive {
            self.ignore_list.fold_case();
        }

        Ok(())
    }

    /// `buffer_time` as a duration; zero if the value was never validated.
    pub fn buffer_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.buffer_time).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{FilterConfig, FilterConfigError};
    use crate::filter::ignore_list::IgnoreList;
    use crate::filter::policy::policy_fn;

    #[test]
    fn defaults_match_documented_values() {
        let config = FilterConfig::default();

        assert!(config.enabled);
        assert!(!config.ignore_list.is_empty());
        assert!(!config.case_sensitive);
        assert_eq!(config.buffer_time, 0.5);
        assert!(config.custom_policy.is_none());
        assert!(config.emit_events);
    }

    #[test]
    fn accepts_in_range_buffer_time() {
        let mut config = FilterConfig {
            buffer_time: 1.0,
            ignore_list: IgnoreList::from(["yeah", "ok"]),
            ..FilterConfig::default()
        };

        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.buffer_duration(), Duration::from_secs(1));
    }

    #[test]
    fn rejects_negative_buffer_time() {
        let mut config = FilterConfig { buffer_time: -0.5, ..FilterConfig::default() };

        let error = config.validate().err();
        assert!(matches!(error, Some(FilterConfigError::BufferTimeOutOfRange { .. })));
        assert!(error.map(|e| e.to_string()).unwrap_or_default().contains("buffer_time must be between"));
    }

    #[test]
    fn rejects_excessive_and_nan_buffer_time() {
        for value in [3.0, 2.000_1, f64::NAN, f64::INFINITY] {
            let mut config = FilterConfig { buffer_time: value, ..FilterConfig::default() };
            assert!(config.validate().is_err(), "buffer_time {value} should be rejected");
        }
    }

    #[test]
    fn accepts_boundary_buffer_times() {
        for value in [0.0, 2.0] {
            let mut config = FilterConfig { buffer_time: value, ..FilterConfig::default() };
            assert_eq!(config.validate(), Ok(()));
        }
    }

    #[test]
    fn empty_ignore_list_rejected_only_when_enabled() {
        let mut enabled = FilterConfig { ignore_list: IgnoreList::empty(), ..FilterConfig::default() };
        assert_eq!(enabled.validate(), Err(FilterConfigError::EmptyIgnoreList));

        let mut disabled =
            FilterConfig { enabled: false, ignore_list: IgnoreList::empty(), ..FilterConfig::default() };
        assert_eq!(disabled.validate(), Ok(()));
    }

    #[test]
    fn case_insensitive_validation_folds_ignore_list() {
        let mut config =
            FilterConfig { ignore_list: IgnoreList::from(["YEAH", "Ok", "HMM"]), ..FilterConfig::default() };
        assert_eq!(config.validate(), Ok(()));

        assert!(config.ignore_list.contains("yeah"));
        assert!(config.ignore_list.contains("ok"));
        assert!(config.ignore_list.contains("hmm"));
        assert!(!config.ignore_list.contains("YEAH"));
    }

    #[test]
    fn case_sensitive_validation_preserves_ignore_list() {
        let mut config = FilterConfig {
            ignore_list: IgnoreList::from(["YEAH", "Ok", "HMM"]),
            case_sensitive: true,
            ..FilterConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));

        assert_eq!(config.ignore_list.phrases(), ["YEAH", "Ok", "HMM"]);
    }

    #[test]
    fn validation_is_idempotent() {
        let mut config =
            FilterConfig { ignore_list: IgnoreList::from(["Yeah", "ok"]), ..FilterConfig::default() };
        assert_eq!(config.validate(), Ok(()));
        let first = config.ignore_list.clone();
        assert_eq!(config.validate(), Ok(()));

        assert_eq!(config.ignore_list, first);
    }

    #[test]
    fn debug_output_hides_policy_body() {
        let config = FilterConfig::default().with_custom_policy(policy_fn(|_, _| Ok(false)));
        let debug = format!("{config:?}");

        assert!(debug.contains("<policy>"));
    }
}
