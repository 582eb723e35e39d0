use anyhow::Result;
use log::{debug, error, info, trace, warn};
use openxr_sys::pfn;

use crate::{Feature, FeatureError, FeatureResult, FeatureSettings, LifecycleEvent};

/// Delivers OpenXR lifecycle events to enabled features, in priority order.
///
/// The dispatcher owns the [`FeatureSettings`] while OpenXR is running, so the set of
/// enabled features can't change underneath it. Call [`LifecycleDispatcher::shutdown`] to get
/// them back.
#[derive(Debug)]
pub struct LifecycleDispatcher {
    settings: FeatureSettings,
    required_feature_failed: bool,
}

impl LifecycleDispatcher {
    /// Take ownership of `settings` for the duration of an OpenXR session
    pub fn new(mut settings: FeatureSettings) -> Self {
        settings.set_runtime_active(true);
        info!(
            "[HOTHAM_XR_FEATURES] Starting OpenXR with {} enabled feature(s) for {}",
            settings.enabled_features().count(),
            settings.target()
        );
        Self {
            settings,
            required_feature_failed: false,
        }
    }

    /// Forget about any failures from a previous attempt to start OpenXR
    pub fn initialize(&mut self) {
        for instance in self.settings.features_mut() {
            instance.set_failed_initialization(false);
        }
        self.required_feature_failed = false;
    }

    /// Deliver `event` to every enabled feature, in order.
    ///
    /// If a feature returns an error the remaining features don't see the event.
    pub fn dispatch(&mut self, event: LifecycleEvent) -> FeatureResult<()> {
        trace!("[HOTHAM_XR_FEATURES] Dispatching {}", event.name());

        if let LifecycleEvent::InstanceCreate(instance) = event {
            for feature in self.settings.features_mut() {
                if !feature.is_enabled() {
                    continue;
                }
                let initialized = feature.feature_mut().on_instance_create(instance);
                if initialized {
                    continue;
                }

                let required = feature.descriptor().required;
                feature.set_failed_initialization(true);
                self.required_feature_failed |= required;
                if required {
                    error!(
                        "[HOTHAM_XR_FEATURES] Required feature {} failed to initialize",
                        feature.id()
                    );
                } else {
                    warn!(
                        "[HOTHAM_XR_FEATURES] Feature {} failed to initialize and will be skipped",
                        feature.id()
                    );
                }
            }
            return Ok(());
        }

        self.dispatch_each(&[event])
    }

    /// Deliver all of `events`, in order, to one feature before moving on to the next.
    ///
    /// Used for native callbacks that a feature expects to see as a group. The first hook error
    /// stops the pass. `InstanceCreate` is never delivered through here.
    pub(crate) fn dispatch_each(&mut self, events: &[LifecycleEvent]) -> FeatureResult<()> {
        for feature in self.settings.features_mut() {
            if !feature.is_enabled() {
                continue;
            }
            for &event in events {
                if let Err(source) = deliver(feature.feature_mut(), event) {
                    error!(
                        "[HOTHAM_XR_FEATURES] {} failed while handling {}: {source:?}",
                        feature.id(),
                        event.name()
                    );
                    return Err(FeatureError::HookFailed {
                        feature: feature.id().to_string(),
                        event: event.name(),
                        source,
                    });
                }
            }
        }

        Ok(())
    }

    /// Did a required feature fail to initialize? If so, OpenXR startup should be abandoned.
    pub fn required_feature_failed(&self) -> bool {
        self.required_feature_failed
    }

    /// Ids of the features that receive events, in the order they receive them
    pub fn dispatch_order(&self) -> Vec<&str> {
        self.settings.enabled_features().map(|f| f.id()).collect()
    }

    /// The settings being dispatched to
    pub fn settings(&self) -> &FeatureSettings {
        &self.settings
    }

    /// Give every enabled feature a chance to wrap `xrGetInstanceProcAddr`.
    ///
    /// The lowest priority feature wraps `func` first, so the highest priority feature's
    /// wrapper is the one the runtime calls.
    pub fn hook_get_instance_proc_addr(
        &mut self,
        func: pfn::GetInstanceProcAddr,
    ) -> pfn::GetInstanceProcAddr {
        let mut func = func;
        for feature in self.settings.features_mut().iter_mut().rev() {
            if feature.is_enabled() {
                debug!("[HOTHAM_XR_FEATURES] Hooking xrGetInstanceProcAddr for {}", feature.id());
                func = feature.feature_mut().hook_get_instance_proc_addr(func);
            }
        }
        func
    }

    /// OpenXR has stopped. Returns the settings, editable again.
    pub fn shutdown(mut self) -> FeatureSettings {
        self.initialize();
        self.settings.set_runtime_active(false);
        info!("[HOTHAM_XR_FEATURES] OpenXR stopped");
        self.settings
    }
}

fn deliver(feature: &mut dyn Feature, event: LifecycleEvent) -> Result<()> {
    match event {
        // Handled by the dispatcher itself
        LifecycleEvent::InstanceCreate(_) => Ok(()),
        LifecycleEvent::SystemChange(system) => feature.on_system_change(system),
        LifecycleEvent::SessionCreate(session) => feature.on_session_create(session),
        LifecycleEvent::SessionBegin(session) => feature.on_session_begin(session),
        LifecycleEvent::AppSpaceChange(space) => feature.on_app_space_change(space),
        LifecycleEvent::SessionStateChange { old, new } => {
            feature.on_session_state_change(old, new)
        }
        LifecycleEvent::SessionEnd(session) => feature.on_session_end(session),
        LifecycleEvent::SessionExiting(session) => feature.on_session_exiting(session),
        LifecycleEvent::SessionDestroy(session) => feature.on_session_destroy(session),
        LifecycleEvent::InstanceDestroy(instance) => feature.on_instance_destroy(instance),
        LifecycleEvent::SessionLossPending(session) => feature.on_session_loss_pending(session),
        LifecycleEvent::InstanceLossPending(instance) => {
            feature.on_instance_loss_pending(instance)
        }
        LifecycleEvent::FormFactorChange(form_factor) => {
            feature.on_form_factor_change(form_factor)
        }
        LifecycleEvent::ViewConfigurationTypeChange(view_configuration_type) => {
            feature.on_view_configuration_type_change(view_configuration_type)
        }
        LifecycleEvent::EnvironmentBlendModeChange(blend_mode) => {
            feature.on_environment_blend_mode_change(blend_mode)
        }
        LifecycleEvent::SubsystemCreate => feature.on_subsystem_create(),
        LifecycleEvent::SubsystemStart => feature.on_subsystem_start(),
        LifecycleEvent::SubsystemStop => feature.on_subsystem_stop(),
        LifecycleEvent::SubsystemDestroy => feature.on_subsystem_destroy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BuildTargetGroup, FeatureDescriptor, FeatureRegistry};
    use anyhow::bail;
    use once_cell::sync::OnceCell;
    use openxr_sys::{Instance, Session, SessionState};
    use std::{cell::RefCell, ffi::c_char, rc::Rc, sync::Mutex};

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
        initializes: bool,
        fails_on_begin: bool,
    }

    impl Feature for Recorder {
        fn on_instance_create(&mut self, _: Instance) -> bool {
            self.log.borrow_mut().push(format!("{}:instance", self.name));
            self.initializes
        }

        fn on_session_begin(&mut self, _: Session) -> Result<()> {
            self.log.borrow_mut().push(format!("{}:begin", self.name));
            if self.fails_on_begin {
                bail!("{} could not begin", self.name);
            }
            Ok(())
        }

        fn on_session_state_change(&mut self, old: SessionState, new: SessionState) -> Result<()> {
            assert_eq!(old, SessionState::READY);
            assert_eq!(new, SessionState::SYNCHRONIZED);
            self.log.borrow_mut().push(format!("{}:state", self.name));
            Ok(())
        }
    }

    struct Setup {
        name: &'static str,
        priority: i32,
        required: bool,
        initializes: bool,
        fails_on_begin: bool,
    }

    fn setup(name: &'static str, priority: i32) -> Setup {
        Setup {
            name,
            priority,
            required: false,
            initializes: true,
            fails_on_begin: false,
        }
    }

    fn dispatcher(setups: Vec<Setup>, log: &Log) -> LifecycleDispatcher {
        let mut registry = FeatureRegistry::new();
        for setup in setups {
            let descriptor = FeatureDescriptor::builder(setup.name)
                .priority(setup.priority)
                .required(setup.required)
                .build();
            let log = log.clone();
            registry
                .register(descriptor, move || Recorder {
                    name: setup.name,
                    log: log.clone(),
                    initializes: setup.initializes,
                    fails_on_begin: setup.fails_on_begin,
                })
                .unwrap();
        }

        let mut settings = registry.settings_for(BuildTargetGroup::Android);
        let ids: Vec<String> = settings.features().iter().map(|f| f.id().to_string()).collect();
        for id in ids {
            settings.set_enabled(&id, true).unwrap();
        }
        LifecycleDispatcher::new(settings)
    }

    #[test]
    fn test_events_follow_priority_order() {
        let log = Log::default();
        let mut dispatcher = dispatcher(vec![setup("a", 5), setup("b", 10), setup("c", 5)], &log);
        assert_eq!(dispatcher.dispatch_order(), ["b", "a", "c"]);

        dispatcher
            .dispatch(LifecycleEvent::SessionBegin(Session::from_raw(1)))
            .unwrap();
        dispatcher
            .dispatch(LifecycleEvent::SessionStateChange {
                old: SessionState::READY,
                new: SessionState::SYNCHRONIZED,
            })
            .unwrap();
        assert_eq!(
            *log.borrow(),
            ["b:begin", "a:begin", "c:begin", "b:state", "a:state", "c:state"]
        );
    }

    #[test]
    fn test_swapping_priorities_reverses_the_order() {
        let events = [
            LifecycleEvent::SessionBegin(Session::from_raw(1)),
            LifecycleEvent::SessionStateChange {
                old: SessionState::READY,
                new: SessionState::SYNCHRONIZED,
            },
        ];

        let log = Log::default();
        let mut before = dispatcher(vec![setup("first", 20), setup("second", 10)], &log);
        assert_eq!(before.dispatch_order(), ["first", "second"]);
        for event in events {
            before.dispatch(event).unwrap();
        }
        assert_eq!(
            *log.borrow(),
            ["first:begin", "second:begin", "first:state", "second:state"]
        );

        let log = Log::default();
        let mut after = dispatcher(vec![setup("first", 10), setup("second", 20)], &log);
        assert_eq!(after.dispatch_order(), ["second", "first"]);
        for event in events {
            after.dispatch(event).unwrap();
        }
        assert_eq!(
            *log.borrow(),
            ["second:begin", "first:begin", "second:state", "first:state"]
        );
    }

    #[test]
    fn test_failed_features_are_skipped() {
        let log = Log::default();
        let mut failing = setup("failing", 10);
        failing.initializes = false;
        let mut dispatcher = dispatcher(vec![failing, setup("working", 1)], &log);
        dispatcher.initialize();

        dispatcher
            .dispatch(LifecycleEvent::InstanceCreate(Instance::from_raw(1)))
            .unwrap();
        assert!(!dispatcher.required_feature_failed());
        assert_eq!(dispatcher.dispatch_order(), ["working"]);
        assert!(dispatcher
            .settings()
            .feature("failing")
            .unwrap()
            .failed_initialization());

        dispatcher
            .dispatch(LifecycleEvent::SessionBegin(Session::from_raw(1)))
            .unwrap();
        assert_eq!(
            *log.borrow(),
            ["failing:instance", "working:instance", "working:begin"]
        );
    }

    #[test]
    fn test_required_feature_failure() {
        let log = Log::default();
        let mut required = setup("required", 0);
        required.required = true;
        required.initializes = false;
        let mut dispatcher = dispatcher(vec![required, setup("other", 0)], &log);

        dispatcher
            .dispatch(LifecycleEvent::InstanceCreate(Instance::from_raw(1)))
            .unwrap();
        assert!(dispatcher.required_feature_failed());

        // A fresh attempt starts clean
        dispatcher.initialize();
        assert!(!dispatcher.required_feature_failed());
        assert_eq!(dispatcher.dispatch_order(), ["other", "required"]);
    }

    #[test]
    fn test_hook_errors_stop_the_pass() {
        let log = Log::default();
        let mut broken = setup("broken", 10);
        broken.fails_on_begin = true;
        let mut dispatcher = dispatcher(vec![broken, setup("after", 1)], &log);

        let result = dispatcher.dispatch(LifecycleEvent::SessionBegin(Session::from_raw(1)));
        match result {
            Err(FeatureError::HookFailed { feature, event, .. }) => {
                assert_eq!(feature, "broken");
                assert_eq!(event, "SessionBegin");
            }
            other => panic!("Expected HookFailed, got {other:?}"),
        }
        assert_eq!(*log.borrow(), ["broken:begin"]);
    }

    #[test]
    fn test_settings_are_locked_until_shutdown() {
        let log = Log::default();
        let dispatcher = dispatcher(vec![setup("a", 0)], &log);
        assert!(dispatcher.settings().runtime_active());

        let mut settings = dispatcher.shutdown();
        assert!(!settings.runtime_active());
        settings.set_enabled("a", false).unwrap();
    }

    static CALLS: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
    static LOW_NEXT: OnceCell<pfn::GetInstanceProcAddr> = OnceCell::new();
    static HIGH_NEXT: OnceCell<pfn::GetInstanceProcAddr> = OnceCell::new();

    unsafe extern "system" fn loader_default(
        _instance: Instance,
        _name: *const c_char,
        _function: *mut Option<pfn::VoidFunction>,
    ) -> openxr_sys::Result {
        CALLS.lock().unwrap().push("loader");
        openxr_sys::Result::SUCCESS
    }

    unsafe extern "system" fn low_hook(
        instance: Instance,
        name: *const c_char,
        function: *mut Option<pfn::VoidFunction>,
    ) -> openxr_sys::Result {
        CALLS.lock().unwrap().push("low");
        (LOW_NEXT.get().unwrap())(instance, name, function)
    }

    unsafe extern "system" fn high_hook(
        instance: Instance,
        name: *const c_char,
        function: *mut Option<pfn::VoidFunction>,
    ) -> openxr_sys::Result {
        CALLS.lock().unwrap().push("high");
        (HIGH_NEXT.get().unwrap())(instance, name, function)
    }

    struct Hooking {
        next: &'static OnceCell<pfn::GetInstanceProcAddr>,
        hook: pfn::GetInstanceProcAddr,
    }

    impl Feature for Hooking {
        fn hook_get_instance_proc_addr(
            &mut self,
            func: pfn::GetInstanceProcAddr,
        ) -> pfn::GetInstanceProcAddr {
            self.next.set(func).unwrap();
            self.hook
        }
    }

    #[test]
    fn test_hook_chain_runs_highest_priority_first() {
        let mut registry = FeatureRegistry::new();
        registry
            .register(FeatureDescriptor::builder("low").priority(10).build(), || {
                Hooking {
                    next: &LOW_NEXT,
                    hook: low_hook,
                }
            })
            .unwrap();
        registry
            .register(FeatureDescriptor::builder("high").priority(20).build(), || {
                Hooking {
                    next: &HIGH_NEXT,
                    hook: high_hook,
                }
            })
            .unwrap();
        registry
            .register_declared(FeatureDescriptor::builder("disabled").priority(30).build())
            .unwrap();

        let mut settings = registry.settings_for(BuildTargetGroup::Standalone);
        settings.set_enabled("low", true).unwrap();
        settings.set_enabled("high", true).unwrap();

        let mut dispatcher = LifecycleDispatcher::new(settings);
        let chain = dispatcher.hook_get_instance_proc_addr(loader_default);

        let name = b"xrCreateSession\0";
        let mut function = None;
        let result = unsafe {
            chain(
                Instance::from_raw(0),
                name.as_ptr() as *const c_char,
                &mut function,
            )
        };
        assert_eq!(result, openxr_sys::Result::SUCCESS);
        assert_eq!(*CALLS.lock().unwrap(), ["high", "low", "loader"]);
    }
}
