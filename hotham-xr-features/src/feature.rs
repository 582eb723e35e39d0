use anyhow::Result;
use openxr_sys::{
    pfn, EnvironmentBlendMode, FormFactor, Instance, Session, SessionState, Space, SystemId,
    ViewConfigurationType,
};

use crate::{validation::ValidationRule, BuildTargetGroup};

/// The behaviour of an OpenXR feature.
///
/// Every hook has a default that does nothing, so implementors only override what they need.
/// Hooks are only called while the feature is enabled, in feature priority order.
#[allow(unused_variables)]
pub trait Feature: 'static {
    /// Wrap `xrGetInstanceProcAddr`. Return `func` to stay out of the chain, or a function of
    /// your own that intercepts some calls and forwards the rest to `func`.
    fn hook_get_instance_proc_addr(
        &mut self,
        func: pfn::GetInstanceProcAddr,
    ) -> pfn::GetInstanceProcAddr {
        func
    }

    /// Called once the OpenXR instance exists. Return `false` if the feature couldn't
    /// initialize: it will be skipped for the rest of the session.
    fn on_instance_create(&mut self, instance: Instance) -> bool {
        true
    }

    /// The OpenXR system changed
    fn on_system_change(&mut self, system: SystemId) -> Result<()> {
        Ok(())
    }

    /// An OpenXR session was created
    fn on_session_create(&mut self, session: Session) -> Result<()> {
        Ok(())
    }

    /// `xrBeginSession` was called
    fn on_session_begin(&mut self, session: Session) -> Result<()> {
        Ok(())
    }

    /// The application's reference space changed
    fn on_app_space_change(&mut self, space: Space) -> Result<()> {
        Ok(())
    }

    /// The session moved from `old` to `new`
    fn on_session_state_change(&mut self, old: SessionState, new: SessionState) -> Result<()> {
        Ok(())
    }

    /// `xrEndSession` was called
    fn on_session_end(&mut self, session: Session) -> Result<()> {
        Ok(())
    }

    /// The session is exiting
    fn on_session_exiting(&mut self, session: Session) -> Result<()> {
        Ok(())
    }

    /// The session is about to be destroyed
    fn on_session_destroy(&mut self, session: Session) -> Result<()> {
        Ok(())
    }

    /// The instance is about to be destroyed
    fn on_instance_destroy(&mut self, instance: Instance) -> Result<()> {
        Ok(())
    }

    /// The runtime reported that the session will be lost
    fn on_session_loss_pending(&mut self, session: Session) -> Result<()> {
        Ok(())
    }

    /// The runtime reported that the instance will be lost
    fn on_instance_loss_pending(&mut self, instance: Instance) -> Result<()> {
        Ok(())
    }

    /// The configured form factor
    fn on_form_factor_change(&mut self, form_factor: FormFactor) -> Result<()> {
        Ok(())
    }

    /// The configured view configuration type
    fn on_view_configuration_type_change(
        &mut self,
        view_configuration_type: ViewConfigurationType,
    ) -> Result<()> {
        Ok(())
    }

    /// The configured environment blend mode
    fn on_environment_blend_mode_change(&mut self, blend_mode: EnvironmentBlendMode) -> Result<()> {
        Ok(())
    }

    /// Subsystems are being created
    fn on_subsystem_create(&mut self) -> Result<()> {
        Ok(())
    }

    /// Subsystems are being started
    fn on_subsystem_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Subsystems are being stopped
    fn on_subsystem_stop(&mut self) -> Result<()> {
        Ok(())
    }

    /// Subsystems are being destroyed
    fn on_subsystem_destroy(&mut self) -> Result<()> {
        Ok(())
    }

    /// The feature was switched on or off
    fn on_enabled_change(&mut self, enabled: bool) {}

    /// Add project validation rules for `target`
    fn validation_checks(&self, target: BuildTargetGroup, rules: &mut Vec<ValidationRule>) {}
}

/// A feature known only by its descriptor, eg. from a manifest. It has no behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredFeature;

impl Feature for DeclaredFeature {}
