use std::{cmp::Ordering, collections::BTreeSet, sync::Arc};

use log::{debug, error, warn};

use crate::{
    config::TargetConfig,
    feature::Feature,
    loader::{FeatureInfo, LoaderDeclaration},
    BuildTargetGroup, FeatureDescriptor, FeatureError, FeatureResult, FeatureSet,
};

/// One feature, configured for one build target
pub struct FeatureInstance {
    descriptor: Arc<FeatureDescriptor>,
    enabled: bool,
    failed_initialization: bool,
    feature: Box<dyn Feature>,
}

impl FeatureInstance {
    pub(crate) fn new(descriptor: Arc<FeatureDescriptor>, feature: Box<dyn Feature>) -> Self {
        Self {
            descriptor,
            enabled: false,
            failed_initialization: false,
            feature,
        }
    }

    /// The feature's metadata
    pub fn descriptor(&self) -> &FeatureDescriptor {
        &self.descriptor
    }

    /// Shorthand for `descriptor().id`
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Has the feature been switched on?
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Did the feature refuse to initialize in the current OpenXR session?
    pub fn failed_initialization(&self) -> bool {
        self.failed_initialization
    }

    /// Switched on, and hasn't failed to initialize. Only these features receive events.
    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.failed_initialization
    }

    /// The feature's behaviour
    pub fn feature(&self) -> &dyn Feature {
        self.feature.as_ref()
    }

    pub(crate) fn feature_mut(&mut self) -> &mut dyn Feature {
        self.feature.as_mut()
    }

    pub(crate) fn set_failed_initialization(&mut self, failed: bool) {
        self.failed_initialization = failed;
    }

    fn set_enabled_unchecked(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        debug!(
            "[HOTHAM_XR_FEATURES] {} is now {}",
            self.id(),
            if enabled { "enabled" } else { "disabled" }
        );
        self.enabled = enabled;
        self.feature.on_enabled_change(enabled);
    }
}

impl std::fmt::Debug for FeatureInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureInstance")
            .field("id", &self.descriptor.id)
            .field("priority", &self.descriptor.priority)
            .field("enabled", &self.enabled)
            .field("failed_initialization", &self.failed_initialization)
            .finish()
    }
}

/// Dispatch order: priority descending, then display name, then id.
fn dispatch_order(a: &FeatureDescriptor, b: &FeatureDescriptor) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// All of the features for a single build target group.
///
/// Features are kept in dispatch order. While a [`crate::LifecycleDispatcher`] owns the
/// settings, OpenXR is considered to be running and enabled flags can't be changed.
#[derive(Debug)]
pub struct FeatureSettings {
    target: BuildTargetGroup,
    features: Vec<FeatureInstance>,
    feature_sets: Vec<FeatureSet>,
    enabled_feature_sets: BTreeSet<String>,
    runtime_active: bool,
}

impl FeatureSettings {
    /// Empty settings for `target`. Use [`crate::FeatureRegistry::refresh`] to fill them.
    pub fn new(target: BuildTargetGroup) -> Self {
        Self {
            target,
            features: Vec::new(),
            feature_sets: Vec::new(),
            enabled_feature_sets: BTreeSet::new(),
            runtime_active: false,
        }
    }

    /// The build target these settings are for
    pub fn target(&self) -> BuildTargetGroup {
        self.target
    }

    /// Is OpenXR currently running with these settings?
    pub fn runtime_active(&self) -> bool {
        self.runtime_active
    }

    /// Every feature, in dispatch order
    pub fn features(&self) -> &[FeatureInstance] {
        &self.features
    }

    /// Features that will receive events, in dispatch order
    pub fn enabled_features(&self) -> impl Iterator<Item = &FeatureInstance> {
        self.features.iter().filter(|f| f.is_enabled())
    }

    /// Find a feature by id. Ids are compared case-insensitively.
    pub fn feature(&self, id: &str) -> Option<&FeatureInstance> {
        self.position(id).map(|i| &self.features[i])
    }

    /// Find every feature matching one of `ids`, skipping unknown ids
    pub fn features_with_ids<'a>(&'a self, ids: &[&str]) -> Vec<&'a FeatureInstance> {
        ids.iter().filter_map(|id| self.feature(id)).collect()
    }

    /// Feature sets available on this target
    pub fn feature_sets(&self) -> &[FeatureSet] {
        &self.feature_sets
    }

    /// Is the feature set with the given id enabled?
    pub fn feature_set_enabled(&self, id: &str) -> bool {
        self.enabled_feature_sets
            .iter()
            .any(|enabled| enabled.eq_ignore_ascii_case(id))
    }

    /// Switch a feature on or off.
    ///
    /// Fails while OpenXR is running, and when switching off a feature that an enabled
    /// feature set requires.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> FeatureResult<()> {
        let index = self
            .position(id)
            .ok_or_else(|| FeatureError::UnknownFeature(id.to_string()))?;
        if self.features[index].enabled == enabled {
            return Ok(());
        }
        self.check_not_running()?;

        if !enabled {
            if let Some(set) = self.enabled_sets().find(|set| set.requires(id)) {
                return Err(FeatureError::RequiredByFeatureSet {
                    feature: self.features[index].id().to_string(),
                    feature_set: set.id.clone(),
                });
            }
        }

        self.features[index].set_enabled_unchecked(enabled);
        Ok(())
    }

    /// Enable a feature set, switching on all of its required and default features
    pub fn enable_feature_set(&mut self, id: &str) -> FeatureResult<()> {
        self.check_not_running()?;
        let set = self
            .find_feature_set(id)
            .cloned()
            .ok_or_else(|| FeatureError::UnknownFeatureSet(id.to_string()))?;

        self.enable_set_features(&set.required_features);
        self.enable_set_features(&set.default_features);
        self.enabled_feature_sets.insert(set.id);
        Ok(())
    }

    /// Disable a feature set. Its features stay enabled, but may now be switched off.
    pub fn disable_feature_set(&mut self, id: &str) -> FeatureResult<()> {
        self.check_not_running()?;
        let enabled = self
            .enabled_feature_sets
            .iter()
            .find(|enabled| enabled.eq_ignore_ascii_case(id))
            .cloned()
            .ok_or_else(|| FeatureError::UnknownFeatureSet(id.to_string()))?;
        self.enabled_feature_sets.remove(&enabled);
        Ok(())
    }

    /// What the loader arbitrator needs to know about each feature, in dispatch order
    pub fn feature_info(&self) -> Vec<FeatureInfo<'_>> {
        self.features
            .iter()
            .map(|instance| {
                let descriptor = instance.descriptor();
                FeatureInfo {
                    descriptor,
                    enabled: instance.is_enabled(),
                    loader: LoaderDeclaration::for_target(descriptor, self.target),
                }
            })
            .collect()
    }

    /// Apply a stored configuration: exactly the listed features end up enabled, plus the
    /// required features of the listed feature sets.
    pub fn apply_config(&mut self, config: &TargetConfig) -> FeatureResult<()> {
        self.check_not_running()?;

        let mut listed = BTreeSet::new();
        for id in &config.enabled_features {
            match self.position(id) {
                Some(index) => {
                    listed.insert(index);
                }
                None => {
                    warn!("[HOTHAM_XR_FEATURES] Ignoring unknown feature {id} for {}", self.target)
                }
            }
        }

        for (index, instance) in self.features.iter_mut().enumerate() {
            instance.set_enabled_unchecked(listed.contains(&index));
        }

        self.enabled_feature_sets.clear();
        for id in &config.feature_sets {
            let Some(set) = self.find_feature_set(id).cloned() else {
                warn!("[HOTHAM_XR_FEATURES] Ignoring unknown feature set {id} for {}", self.target);
                continue;
            };
            self.enable_set_features(&set.required_features);
            self.enabled_feature_sets.insert(set.id);
        }

        Ok(())
    }

    /// The configuration that would recreate the current state
    pub fn to_config(&self) -> TargetConfig {
        TargetConfig {
            enabled_features: self
                .features
                .iter()
                .filter(|f| f.enabled)
                .map(|f| f.id().to_string())
                .collect(),
            feature_sets: self.enabled_feature_sets.clone(),
        }
    }

    pub(crate) fn insert(&mut self, instance: FeatureInstance) {
        let index = self
            .features
            .binary_search_by(|probe| dispatch_order(probe.descriptor(), instance.descriptor()))
            .unwrap_or_else(|i| i);
        self.features.insert(index, instance);
    }

    pub(crate) fn insert_feature_set(&mut self, set: FeatureSet) {
        self.feature_sets.push(set);
    }

    pub(crate) fn set_runtime_active(&mut self, active: bool) {
        self.runtime_active = active;
    }

    pub(crate) fn features_mut(&mut self) -> &mut [FeatureInstance] {
        &mut self.features
    }

    pub(crate) fn enabled_sets(&self) -> impl Iterator<Item = &FeatureSet> {
        self.feature_sets
            .iter()
            .filter(|set| self.enabled_feature_sets.contains(&set.id))
    }

    fn enable_set_features(&mut self, ids: &[String]) {
        for id in ids {
            match self.position(id) {
                Some(index) => self.features[index].set_enabled_unchecked(true),
                None => warn!(
                    "[HOTHAM_XR_FEATURES] Feature set refers to feature {id}, which isn't available on {}",
                    self.target
                ),
            }
        }
    }

    fn check_not_running(&self) -> FeatureResult<()> {
        if self.runtime_active {
            error!("[HOTHAM_XR_FEATURES] Feature state cannot be changed while OpenXR is running");
            return Err(FeatureError::RuntimeActive);
        }
        Ok(())
    }

    fn find_feature_set(&self, id: &str) -> Option<&FeatureSet> {
        self.feature_sets
            .iter()
            .find(|set| set.id.eq_ignore_ascii_case(id))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.features
            .iter()
            .position(|f| f.id().eq_ignore_ascii_case(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    struct RecordEnabled(Rc<RefCell<Vec<bool>>>);

    impl Feature for RecordEnabled {
        fn on_enabled_change(&mut self, enabled: bool) {
            self.0.borrow_mut().push(enabled);
        }
    }

    fn instance(id: &str, name: &str, priority: i32) -> FeatureInstance {
        let descriptor = FeatureDescriptor::builder(id)
            .name(name)
            .priority(priority)
            .build();
        FeatureInstance::new(Arc::new(descriptor), Box::new(crate::DeclaredFeature))
    }

    fn settings() -> FeatureSettings {
        let mut settings = FeatureSettings::new(BuildTargetGroup::Android);
        settings.insert(instance("com.test.low", "Low", -5));
        settings.insert(instance("com.test.zeta", "Zeta", 10));
        settings.insert(instance("com.test.alpha", "Alpha", 10));
        settings.insert(instance("com.test.high", "High", 100));
        settings.insert_feature_set(FeatureSet {
            id: "com.test.set".into(),
            name: "Test Set".into(),
            description: None,
            build_targets: Default::default(),
            required_features: vec!["com.test.high".into()],
            default_features: vec!["com.test.low".into()],
        });
        settings
    }

    fn ids(settings: &FeatureSettings) -> Vec<&str> {
        settings.features().iter().map(|f| f.id()).collect()
    }

    #[test]
    fn test_features_are_kept_in_dispatch_order() {
        let settings = settings();
        assert_eq!(
            ids(&settings),
            ["com.test.high", "com.test.alpha", "com.test.zeta", "com.test.low"]
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let settings = settings();
        assert_eq!(settings.feature("COM.TEST.HIGH").unwrap().id(), "com.test.high");
        assert!(settings.feature("com.test.missing").is_none());
        let found = settings.features_with_ids(&["com.test.low", "nope", "com.test.alpha"]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id(), "com.test.low");
    }

    #[test]
    fn test_set_enabled_calls_hook_once() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let descriptor = FeatureDescriptor::builder("com.test.recorder").build();
        let mut settings = FeatureSettings::new(BuildTargetGroup::Standalone);
        settings.insert(FeatureInstance::new(
            Arc::new(descriptor),
            Box::new(RecordEnabled(calls.clone())),
        ));

        settings.set_enabled("com.test.recorder", true).unwrap();
        settings.set_enabled("com.test.recorder", true).unwrap();
        settings.set_enabled("com.test.recorder", false).unwrap();
        assert_eq!(*calls.borrow(), [true, false]);

        assert!(matches!(
            settings.set_enabled("com.test.missing", true),
            Err(FeatureError::UnknownFeature(_))
        ));
    }

    #[test]
    fn test_enabled_flags_are_frozen_while_running() {
        let mut settings = settings();
        settings.set_enabled("com.test.low", true).unwrap();
        settings.set_runtime_active(true);

        assert!(matches!(
            settings.set_enabled("com.test.low", false),
            Err(FeatureError::RuntimeActive)
        ));
        // Setting the same value is not a change, so it's allowed
        settings.set_enabled("com.test.low", true).unwrap();
        assert!(settings.feature("com.test.low").unwrap().enabled());
        assert!(matches!(
            settings.enable_feature_set("com.test.set"),
            Err(FeatureError::RuntimeActive)
        ));
    }

    #[test]
    fn test_running_wins_over_feature_set_requirements() {
        let mut settings = settings();
        settings.enable_feature_set("com.test.set").unwrap();
        settings.set_runtime_active(true);
        assert!(matches!(
            settings.set_enabled("com.test.high", false),
            Err(FeatureError::RuntimeActive)
        ));

        settings.set_runtime_active(false);
        assert!(matches!(
            settings.set_enabled("com.test.high", false),
            Err(FeatureError::RequiredByFeatureSet { .. })
        ));
    }

    #[test]
    fn test_feature_set_ids_are_case_insensitive() {
        let mut settings = settings();
        settings.enable_feature_set("Com.Test.Set").unwrap();
        assert!(settings.feature_set_enabled("COM.TEST.SET"));
        assert!(settings.to_config().feature_sets.contains("com.test.set"));

        settings.disable_feature_set("COM.TEST.SET").unwrap();
        assert!(!settings.feature_set_enabled("com.test.set"));
        settings.set_enabled("com.test.high", false).unwrap();
        assert!(matches!(
            settings.disable_feature_set("com.test.set"),
            Err(FeatureError::UnknownFeatureSet(_))
        ));
    }

    #[test]
    fn test_feature_sets() {
        let mut settings = settings();
        settings.enable_feature_set("com.test.set").unwrap();
        assert!(settings.feature_set_enabled("com.test.set"));
        assert!(settings.feature("com.test.high").unwrap().enabled());
        assert!(settings.feature("com.test.low").unwrap().enabled());

        // Default features can be switched off, required ones can't
        settings.set_enabled("com.test.low", false).unwrap();
        assert!(matches!(
            settings.set_enabled("com.test.high", false),
            Err(FeatureError::RequiredByFeatureSet { .. })
        ));

        settings.disable_feature_set("com.test.set").unwrap();
        settings.set_enabled("com.test.high", false).unwrap();
        assert!(matches!(
            settings.enable_feature_set("com.test.nope"),
            Err(FeatureError::UnknownFeatureSet(_))
        ));
    }

    #[test]
    fn test_config_round_trip() {
        let mut settings = settings();
        let config = TargetConfig {
            enabled_features: ["com.test.alpha".to_string(), "com.test.gone".to_string()].into(),
            feature_sets: ["com.test.set".to_string()].into(),
        };
        settings.apply_config(&config).unwrap();

        let enabled: Vec<&str> = settings.enabled_features().map(|f| f.id()).collect();
        // The set's required feature comes along, but not its default one
        assert_eq!(enabled, ["com.test.high", "com.test.alpha"]);

        let stored = settings.to_config();
        assert_eq!(
            stored.enabled_features,
            ["com.test.alpha".to_string(), "com.test.high".to_string()].into()
        );
        assert!(stored.feature_sets.contains("com.test.set"));
    }

    #[test]
    fn test_config_ids_are_case_insensitive() {
        let mut settings = settings();
        let config = TargetConfig {
            enabled_features: ["COM.TEST.ALPHA".to_string()].into(),
            feature_sets: ["Com.Test.Set".to_string()].into(),
        };
        settings.apply_config(&config).unwrap();

        let enabled: Vec<&str> = settings.enabled_features().map(|f| f.id()).collect();
        assert_eq!(enabled, ["com.test.high", "com.test.alpha"]);
        assert!(settings.feature_set_enabled("com.test.set"));

        // Stored ids are the registered ones, whatever the config said
        let stored = settings.to_config();
        assert_eq!(
            stored.enabled_features,
            ["com.test.alpha".to_string(), "com.test.high".to_string()].into()
        );
        assert_eq!(stored.feature_sets, ["com.test.set".to_string()].into());
    }
}
