//! Semantic result codes for mutating operations.
//!
//! Native package managers report success, reboots and privilege problems in
//! wildly different ways: exit codes, localized phrases, or both. Each backend
//! describes its conventions as a static [`OutcomeRules`] table and
//! [`OutcomeRules::classify`] folds `{exit code, transcript}` into one
//! [`OperationOutcome`].

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationOutcome {
    Succeeded,
    NeedsRestart,
    NeedsElevation,
    /// Scoop refused a global install/uninstall without admin rights.
    NeedsScoopElevation,
    /// pip could not write to the interpreter's site-packages.
    NeedsPipElevation,
    NoApplicableUpdateFound,
    Failed,
}

impl OperationOutcome {
    /// Whether the requested change was applied (possibly pending a reboot).
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::NeedsRestart)
    }

    pub fn needs_elevation(&self) -> bool {
        matches!(
            self,
            Self::NeedsElevation | Self::NeedsScoopElevation | Self::NeedsPipElevation
        )
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Succeeded => "Operation succeeded",
            Self::NeedsRestart => "Operation succeeded, a restart is required",
            Self::NeedsElevation => "Operation requires administrator rights",
            Self::NeedsScoopElevation => "Scoop requires administrator rights for global apps",
            Self::NeedsPipElevation => {
                "pip could not install for all users, retry with --scope user or as administrator"
            }
            Self::NoApplicableUpdateFound => "No applicable update found",
            Self::Failed => "Operation failed",
        }
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Succeeded => "succeeded",
            Self::NeedsRestart => "needs-restart",
            Self::NeedsElevation => "needs-elevation",
            Self::NeedsScoopElevation => "needs-scoop-elevation",
            Self::NeedsPipElevation => "needs-pip-elevation",
            Self::NoApplicableUpdateFound => "no-applicable-update",
            Self::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// Backend-specific elevation heuristic evaluated before the generic markers.
#[derive(Debug, Clone, Copy)]
pub struct BackendElevationRule {
    pub marker: &'static str,
    /// Any of these in the transcript cancels the rule.
    pub unless: &'static [&'static str],
    /// Only applies when the process exited non-zero.
    pub requires_failure: bool,
    /// Does not apply when the command already ran through the elevation helper.
    pub skip_when_elevated: bool,
    pub outcome: OperationOutcome,
}

/// Ordered classification table for one backend operation.
///
/// Evaluation order, first match wins:
/// 1. success markers / remapped success exit codes
/// 2. restart exit codes
/// 3. elevation: backend rule, exit codes, markers
/// 4. no-applicable-update markers / exit codes
/// 5. exit code 0 => Succeeded, anything else => Failed
#[derive(Debug, Clone, Copy)]
pub struct OutcomeRules {
    pub success_markers: &'static [&'static str],
    pub success_exit_codes: &'static [i32],
    pub restart_exit_codes: &'static [i32],
    pub elevation_exit_codes: &'static [i32],
    pub elevation_markers: &'static [&'static str],
    pub elevation_markers_require_failure: bool,
    pub backend_elevation: Option<BackendElevationRule>,
    pub no_update_markers: &'static [&'static str],
    pub no_update_exit_codes: &'static [i32],
}

impl OutcomeRules {
    /// Exit code only: 0 succeeds, everything else fails.
    pub const EXIT_CODE_ONLY: OutcomeRules = OutcomeRules {
        success_markers: &[],
        success_exit_codes: &[],
        restart_exit_codes: &[],
        elevation_exit_codes: &[],
        elevation_markers: &[],
        elevation_markers_require_failure: false,
        backend_elevation: None,
        no_update_markers: &[],
        no_update_exit_codes: &[],
    };

    pub fn classify(&self, exit_code: Option<i32>, transcript: &str, elevated: bool) -> OperationOutcome {
        let failed = exit_code != Some(0);
        let has = |markers: &[&str]| markers.iter().any(|m| transcript.contains(m));
        let code_in = |codes: &[i32]| exit_code.is_some_and(|code| codes.contains(&code));

        if has(self.success_markers) || code_in(self.success_exit_codes) {
            return OperationOutcome::Succeeded;
        }

        if code_in(self.restart_exit_codes) {
            return OperationOutcome::NeedsRestart;
        }

        if let Some(rule) = &self.backend_elevation
            && transcript.contains(rule.marker)
            && !has(rule.unless)
            && (!rule.requires_failure || failed)
            && !(rule.skip_when_elevated && elevated)
        {
            return rule.outcome;
        }

        if code_in(self.elevation_exit_codes)
            || (has(self.elevation_markers) && (!self.elevation_markers_require_failure || failed))
        {
            return OperationOutcome::NeedsElevation;
        }

        if has(self.no_update_markers) || code_in(self.no_update_exit_codes) {
            return OperationOutcome::NoApplicableUpdateFound;
        }

        if failed {
            OperationOutcome::Failed
        } else {
            OperationOutcome::Succeeded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: OutcomeRules = OutcomeRules {
        success_markers: &["was installed successfully"],
        success_exit_codes: &[1605],
        restart_exit_codes: &[3010],
        elevation_exit_codes: &[740],
        elevation_markers: &["requires elevation"],
        elevation_markers_require_failure: true,
        backend_elevation: Some(BackendElevationRule {
            marker: "-g",
            unless: &["successfully"],
            requires_failure: false,
            skip_when_elevated: true,
            outcome: OperationOutcome::NeedsScoopElevation,
        }),
        no_update_markers: &["Latest versions"],
        no_update_exit_codes: &[],
    };

    #[test]
    fn success_marker_beats_nonzero_exit() {
        assert_eq!(
            RULES.classify(Some(1), "'git' was installed successfully!", false),
            OperationOutcome::Succeeded
        );
    }

    #[test]
    fn remapped_exit_code_is_success() {
        assert_eq!(RULES.classify(Some(1605), "", false), OperationOutcome::Succeeded);
    }

    #[test]
    fn elevation_markers_respect_failure_requirement() {
        assert_eq!(RULES.classify(Some(0), "requires elevation", false), OperationOutcome::Succeeded);
        assert_eq!(
            RULES.classify(Some(5), "requires elevation", false),
            OperationOutcome::NeedsElevation
        );
        assert_eq!(RULES.classify(Some(740), "", false), OperationOutcome::NeedsElevation);
    }

    #[test]
    fn backend_rule_is_skipped_when_already_elevated() {
        let transcript = "ERROR: use -g to install globally";
        assert_eq!(RULES.classify(Some(1), transcript, false), OperationOutcome::NeedsScoopElevation);
        assert_eq!(RULES.classify(Some(1), transcript, true), OperationOutcome::Failed);
    }

    #[test]
    fn missing_exit_code_is_failure() {
        assert_eq!(RULES.classify(None, "", false), OperationOutcome::Failed);
    }

    #[test]
    fn exit_code_only_rules() {
        let rules = OutcomeRules::EXIT_CODE_ONLY;
        assert_eq!(rules.classify(Some(0), "whatever", false), OperationOutcome::Succeeded);
        assert_eq!(rules.classify(Some(2), "", false), OperationOutcome::Failed);
    }

    #[test]
    fn outcome_helpers() {
        assert!(OperationOutcome::NeedsRestart.is_success());
        assert!(!OperationOutcome::NoApplicableUpdateFound.is_success());
        assert!(OperationOutcome::NeedsPipElevation.needs_elevation());
        assert_eq!(OperationOutcome::NoApplicableUpdateFound.to_string(), "no-applicable-update");
    }
}
