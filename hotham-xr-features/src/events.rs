use openxr_sys::{
    EnvironmentBlendMode, FormFactor, Instance, Session, SessionState, Space, SystemId,
    ViewConfigurationType,
};

/// Something that happened to OpenXR that features may want to know about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The instance was created
    InstanceCreate(Instance),
    /// The system changed
    SystemChange(SystemId),
    /// A session was created
    SessionCreate(Session),
    /// `xrBeginSession` was called
    SessionBegin(Session),
    /// The application's reference space changed
    AppSpaceChange(Space),
    /// The session changed state
    SessionStateChange {
        /// The state the session was in
        old: SessionState,
        /// The state the session is in now
        new: SessionState,
    },
    /// `xrEndSession` was called
    SessionEnd(Session),
    /// The session is exiting
    SessionExiting(Session),
    /// The session is about to be destroyed
    SessionDestroy(Session),
    /// The instance is about to be destroyed
    InstanceDestroy(Instance),
    /// The session will be lost
    SessionLossPending(Session),
    /// The instance will be lost
    InstanceLossPending(Instance),
    /// The configured form factor
    FormFactorChange(FormFactor),
    /// The configured view configuration type
    ViewConfigurationTypeChange(ViewConfigurationType),
    /// The configured environment blend mode
    EnvironmentBlendModeChange(EnvironmentBlendMode),
    /// Subsystems are being created
    SubsystemCreate,
    /// Subsystems are being started
    SubsystemStart,
    /// Subsystems are being stopped
    SubsystemStop,
    /// Subsystems are being destroyed
    SubsystemDestroy,
}

impl LifecycleEvent {
    /// Name of the event, for logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::InstanceCreate(_) => "InstanceCreate",
            LifecycleEvent::SystemChange(_) => "SystemChange",
            LifecycleEvent::SessionCreate(_) => "SessionCreate",
            LifecycleEvent::SessionBegin(_) => "SessionBegin",
            LifecycleEvent::AppSpaceChange(_) => "AppSpaceChange",
            LifecycleEvent::SessionStateChange { .. } => "SessionStateChange",
            LifecycleEvent::SessionEnd(_) => "SessionEnd",
            LifecycleEvent::SessionExiting(_) => "SessionExiting",
            LifecycleEvent::SessionDestroy(_) => "SessionDestroy",
            LifecycleEvent::InstanceDestroy(_) => "InstanceDestroy",
            LifecycleEvent::SessionLossPending(_) => "SessionLossPending",
            LifecycleEvent::InstanceLossPending(_) => "InstanceLossPending",
            LifecycleEvent::FormFactorChange(_) => "FormFactorChange",
            LifecycleEvent::ViewConfigurationTypeChange(_) => "ViewConfigurationTypeChange",
            LifecycleEvent::EnvironmentBlendModeChange(_) => "EnvironmentBlendModeChange",
            LifecycleEvent::SubsystemCreate => "SubsystemCreate",
            LifecycleEvent::SubsystemStart => "SubsystemStart",
            LifecycleEvent::SubsystemStop => "SubsystemStop",
            LifecycleEvent::SubsystemDestroy => "SubsystemDestroy",
        }
    }
}
