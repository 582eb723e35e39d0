use log::trace;
use openxr_sys::{
    EnvironmentBlendMode, FormFactor, Instance, Session, SessionState, Space, SystemId,
    ViewConfigurationType,
};

use crate::{FeatureError, FeatureResult, LifecycleDispatcher, LifecycleEvent};

/// Events raised by the native OpenXR provider. The numbering must match the provider's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativeEvent {
    SetupConfigValues = 0,
    SystemIdChanged = 1,
    InstanceChanged = 2,
    SessionChanged = 3,
    BeginSession = 4,
    SessionStateChanged = 5,
    ChangedSpaceApp = 6,
    EndSession = 7,
    DestroySession = 8,
    DestroyInstance = 9,
    Idle = 10,
    Ready = 11,
    Synchronized = 12,
    Visible = 13,
    Focused = 14,
    Stopping = 15,
    Exiting = 16,
    LossPending = 17,
    InstanceLossPending = 18,
    RestartRequested = 19,
    RequestRestartLoop = 20,
    RequestGetSystemLoop = 21,
}

impl NativeEvent {
    const ALL: [NativeEvent; 22] = [
        NativeEvent::SetupConfigValues,
        NativeEvent::SystemIdChanged,
        NativeEvent::InstanceChanged,
        NativeEvent::SessionChanged,
        NativeEvent::BeginSession,
        NativeEvent::SessionStateChanged,
        NativeEvent::ChangedSpaceApp,
        NativeEvent::EndSession,
        NativeEvent::DestroySession,
        NativeEvent::DestroyInstance,
        NativeEvent::Idle,
        NativeEvent::Ready,
        NativeEvent::Synchronized,
        NativeEvent::Visible,
        NativeEvent::Focused,
        NativeEvent::Stopping,
        NativeEvent::Exiting,
        NativeEvent::LossPending,
        NativeEvent::InstanceLossPending,
        NativeEvent::RestartRequested,
        NativeEvent::RequestRestartLoop,
        NativeEvent::RequestGetSystemLoop,
    ];
}

impl TryFrom<u32> for NativeEvent {
    type Error = FeatureError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        NativeEvent::ALL
            .get(value as usize)
            .copied()
            .ok_or(FeatureError::UnknownNativeEvent(value))
    }
}

/// Events raised by the OpenXR loader as it manages its subsystems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderEvent {
    SubsystemCreate,
    SubsystemDestroy,
    SubsystemStart,
    SubsystemStop,
}

impl From<LoaderEvent> for LifecycleEvent {
    fn from(event: LoaderEvent) -> Self {
        match event {
            LoaderEvent::SubsystemCreate => LifecycleEvent::SubsystemCreate,
            LoaderEvent::SubsystemDestroy => LifecycleEvent::SubsystemDestroy,
            LoaderEvent::SubsystemStart => LifecycleEvent::SubsystemStart,
            LoaderEvent::SubsystemStop => LifecycleEvent::SubsystemStop,
        }
    }
}

/// State the native provider holds that doesn't fit in an event payload
pub trait NativeConfig {
    /// The configured form factor
    fn form_factor(&self) -> FormFactor;
    /// The configured view configuration type
    fn view_configuration_type(&self) -> ViewConfigurationType;
    /// The configured environment blend mode
    fn environment_blend_mode(&self) -> EnvironmentBlendMode;
    /// The previous and current session state
    fn session_state(&self) -> (SessionState, SessionState);
}

impl LifecycleDispatcher {
    /// Handle an event from the native provider. `payload` carries the raw handle the event
    /// is about, if any.
    pub fn receive_native_event(
        &mut self,
        event: NativeEvent,
        payload: u64,
        config: &impl NativeConfig,
    ) -> FeatureResult<()> {
        let lifecycle_event = match event {
            NativeEvent::SetupConfigValues => {
                trace!("[HOTHAM_XR_FEATURES] Dispatching config values");
                return self.dispatch_each(&[
                    LifecycleEvent::FormFactorChange(config.form_factor()),
                    LifecycleEvent::EnvironmentBlendModeChange(config.environment_blend_mode()),
                    LifecycleEvent::ViewConfigurationTypeChange(config.view_configuration_type()),
                ]);
            }
            NativeEvent::SystemIdChanged => {
                LifecycleEvent::SystemChange(SystemId::from_raw(payload))
            }
            NativeEvent::InstanceChanged => {
                LifecycleEvent::InstanceCreate(Instance::from_raw(payload))
            }
            NativeEvent::SessionChanged => {
                LifecycleEvent::SessionCreate(Session::from_raw(payload))
            }
            NativeEvent::BeginSession => LifecycleEvent::SessionBegin(Session::from_raw(payload)),
            NativeEvent::ChangedSpaceApp => {
                LifecycleEvent::AppSpaceChange(Space::from_raw(payload))
            }
            NativeEvent::SessionStateChanged => {
                let (old, new) = config.session_state();
                LifecycleEvent::SessionStateChange { old, new }
            }
            NativeEvent::EndSession => LifecycleEvent::SessionEnd(Session::from_raw(payload)),
            NativeEvent::Exiting => LifecycleEvent::SessionExiting(Session::from_raw(payload)),
            NativeEvent::DestroySession => {
                LifecycleEvent::SessionDestroy(Session::from_raw(payload))
            }
            NativeEvent::DestroyInstance => {
                LifecycleEvent::InstanceDestroy(Instance::from_raw(payload))
            }
            NativeEvent::LossPending => {
                LifecycleEvent::SessionLossPending(Session::from_raw(payload))
            }
            NativeEvent::InstanceLossPending => {
                LifecycleEvent::InstanceLossPending(Instance::from_raw(payload))
            }
            NativeEvent::Idle
            | NativeEvent::Ready
            | NativeEvent::Synchronized
            | NativeEvent::Visible
            | NativeEvent::Focused
            | NativeEvent::Stopping
            | NativeEvent::RestartRequested
            | NativeEvent::RequestRestartLoop
            | NativeEvent::RequestGetSystemLoop => {
                trace!("[HOTHAM_XR_FEATURES] No feature hook for {event:?}, ignoring");
                return Ok(());
            }
        };

        self.dispatch(lifecycle_event)
    }

    /// Handle an event from the OpenXR loader
    pub fn receive_loader_event(&mut self, event: LoaderEvent) -> FeatureResult<()> {
        self.dispatch(event.into())
    }
}
