use std::sync::Arc;

use log::debug;

use crate::{
    feature::{DeclaredFeature, Feature},
    settings::FeatureInstance,
    BuildTargetGroup, FeatureDescriptor, FeatureError, FeatureResult, FeatureSet, FeatureSettings,
};

type FeatureFactory = Box<dyn Fn() -> Box<dyn Feature>>;

struct RegisteredFeature {
    descriptor: Arc<FeatureDescriptor>,
    factory: FeatureFactory,
}

/// Every feature and feature set the application knows about.
///
/// Register features once at startup, then use [`FeatureRegistry::refresh`] to create the
/// per-target instances.
#[derive(Default)]
pub struct FeatureRegistry {
    features: Vec<RegisteredFeature>,
    feature_sets: Vec<FeatureSet>,
}

impl FeatureRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Default::default()
    }

    /// Register a feature. `factory` is called once for every build target the feature is
    /// instantiated on.
    pub fn register<F, T>(&mut self, descriptor: FeatureDescriptor, factory: F) -> FeatureResult<()>
    where
        F: Fn() -> T + 'static,
        T: Feature,
    {
        if self.descriptor(&descriptor.id).is_some() {
            return Err(FeatureError::DuplicateFeature(descriptor.id));
        }

        debug!(
            "[HOTHAM_XR_FEATURES] Registered {} with priority {}",
            descriptor.id, descriptor.priority
        );
        self.features.push(RegisteredFeature {
            descriptor: Arc::new(descriptor),
            factory: Box::new(move || Box::new(factory())),
        });
        Ok(())
    }

    /// Register a feature that has no behaviour of its own
    pub fn register_declared(&mut self, descriptor: FeatureDescriptor) -> FeatureResult<()> {
        self.register(descriptor, || DeclaredFeature)
    }

    /// Register a feature set
    pub fn register_feature_set(&mut self, feature_set: FeatureSet) -> FeatureResult<()> {
        if self
            .feature_sets
            .iter()
            .any(|set| set.id.eq_ignore_ascii_case(&feature_set.id))
        {
            return Err(FeatureError::DuplicateFeatureSet(feature_set.id));
        }
        self.feature_sets.push(feature_set);
        Ok(())
    }

    /// Every registered descriptor, in registration order
    pub fn descriptors(&self) -> impl Iterator<Item = &FeatureDescriptor> {
        self.features.iter().map(|f| f.descriptor.as_ref())
    }

    /// Find a descriptor by id. Ids are compared case-insensitively.
    pub fn descriptor(&self, id: &str) -> Option<&FeatureDescriptor> {
        self.descriptors()
            .find(|descriptor| descriptor.id.eq_ignore_ascii_case(id))
    }

    /// Make sure `settings` has an instance of every registered feature available on its
    /// target. Existing instances are left alone and nothing is ever removed. Returns the
    /// number of instances created.
    pub fn refresh(&self, settings: &mut FeatureSettings) -> usize {
        let target = settings.target();
        let mut created = 0;

        for registered in &self.features {
            let descriptor = &registered.descriptor;
            if !descriptor.supports(target) || settings.feature(&descriptor.id).is_some() {
                continue;
            }
            settings.insert(FeatureInstance::new(
                descriptor.clone(),
                (registered.factory)(),
            ));
            created += 1;
        }

        for set in &self.feature_sets {
            let known = settings
                .feature_sets()
                .iter()
                .any(|existing| existing.id == set.id);
            if set.supports(target) && !known {
                settings.insert_feature_set(set.clone());
            }
        }

        if created > 0 {
            debug!("[HOTHAM_XR_FEATURES] Created {created} feature instance(s) for {target}");
        }
        created
    }

    /// Fresh settings for `target`, with an instance of every feature available there
    pub fn settings_for(&self, target: BuildTargetGroup) -> FeatureSettings {
        let mut settings = FeatureSettings::new(target);
        self.refresh(&mut settings);
        settings
    }
}
