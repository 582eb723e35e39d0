use log::{debug, error, warn};

use crate::{FeatureSettings, LoaderProblems};

type Check = Box<dyn Fn(&FeatureSettings) -> bool>;

/// A check a feature wants run against the project before it is built
pub struct ValidationRule {
    /// Shown to the developer when the check fails
    pub message: String,
    /// Errors stop the build, warnings don't
    pub error: bool,
    /// Where to read more about the problem
    pub help_link: Option<String>,
    check: Check,
}

impl ValidationRule {
    /// A warning that is raised when `check` returns false
    pub fn new(message: &str, check: impl Fn(&FeatureSettings) -> bool + 'static) -> Self {
        Self {
            message: message.to_string(),
            error: false,
            help_link: None,
            check: Box::new(check),
        }
    }

    /// Make the rule an error
    pub fn error(mut self) -> Self {
        self.error = true;
        self
    }

    /// Attach a help link
    pub fn help_link(mut self, link: &str) -> Self {
        self.help_link = Some(link.to_string());
        self
    }

    /// Does `settings` pass this rule?
    pub fn passes(&self, settings: &FeatureSettings) -> bool {
        (self.check)(settings)
    }
}

impl std::fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRule")
            .field("message", &self.message)
            .field("error", &self.error)
            .field("help_link", &self.help_link)
            .finish_non_exhaustive()
    }
}

/// A failed validation rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// The feature that raised the issue. Issues found by the crate itself have none.
    pub feature: Option<String>,
    /// What's wrong
    pub message: String,
    /// Does this issue stop the build?
    pub error: bool,
    /// Where to read more about the problem
    pub help_link: Option<String>,
}

impl ValidationIssue {
    fn builtin(feature: Option<&str>, message: String, error: bool) -> Self {
        Self {
            feature: feature.map(str::to_string),
            message,
            error,
            help_link: None,
        }
    }
}

/// Check the project for problems. Enabled features are asked for their rules in dispatch
/// order, then the built-in checks run.
pub fn validate(settings: &FeatureSettings) -> Vec<ValidationIssue> {
    let target = settings.target();
    let mut issues = Vec::new();

    for instance in settings.enabled_features() {
        let mut rules = Vec::new();
        instance.feature().validation_checks(target, &mut rules);
        for rule in rules {
            if rule.passes(settings) {
                continue;
            }
            issues.push(ValidationIssue {
                feature: Some(instance.id().to_string()),
                message: rule.message,
                error: rule.error,
                help_link: rule.help_link,
            });
        }
    }

    let infos = settings.feature_info();
    let problems = LoaderProblems::find(&infos);
    if !problems.conflicting_overrides.is_empty() {
        issues.push(ValidationIssue::builtin(
            None,
            format!(
                "Only one enabled feature may override the OpenXR loader on {target}, found: {}",
                problems.conflicting_overrides.join(", ")
            ),
            true,
        ));
    }
    for &id in &problems.malformed {
        issues.push(ValidationIssue::builtin(
            Some(id),
            format!("Feature {id} declares a custom loader with an invalid API version"),
            false,
        ));
    }

    for set in settings.enabled_sets() {
        for required in &set.required_features {
            if settings.feature(required).is_none() {
                issues.push(ValidationIssue::builtin(
                    None,
                    format!(
                        "Feature set {} requires {required}, which isn't available on {target}",
                        set.id
                    ),
                    true,
                ));
            }
        }
    }

    for issue in &issues {
        if issue.error {
            error!("[HOTHAM_XR_FEATURES] {}", issue.message);
        } else {
            warn!("[HOTHAM_XR_FEATURES] {}", issue.message);
        }
    }
    debug!("[HOTHAM_XR_FEATURES] Validation found {} issue(s) for {target}", issues.len());
    issues
}
