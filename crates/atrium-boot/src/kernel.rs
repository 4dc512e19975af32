//! The boot-level state machine.

use crate::events::{BootEvent, EventBus};
use crate::level::BootLevel;
use crate::BootError;
use atrium_instance::{
    ConfigMap, ConnectionHandle, HandlerRegistry, Instance, InstanceError, UserHandle,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Caller-supplied knobs for one boot attempt.
#[derive(Debug, Clone, Default)]
pub struct KernelOptions {
    /// Discovery start point; defaults to the current working directory.
    pub start_path: Option<PathBuf>,
    /// Login target at the final level; empty resolves the admin user.
    pub username: String,
}

/// The error that stopped a boot attempt, kept alongside the level it
/// stopped at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelFailure {
    pub level: BootLevel,
    pub message: String,
}

/// Outcome of the single boot attempt a kernel performs.
///
/// Mutated only by [`Kernel::boot`], cleared only by [`Kernel::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootState {
    attempted: bool,
    highest: Option<BootLevel>,
    last_error: Option<LevelFailure>,
}

impl BootState {
    pub fn attempted(&self) -> bool {
        self.attempted
    }

    /// Highest level reached, `None` before any attempt (and, in theory,
    /// after an attempt that could not even reach the base level).
    pub fn highest(&self) -> Option<BootLevel> {
        self.highest
    }

    pub fn last_error(&self) -> Option<&LevelFailure> {
        self.last_error.as_ref()
    }
}

/// A service bound by the kernel, retrievable by name once booted.
#[derive(Debug)]
pub enum Service<'a> {
    Instance(&'a dyn Instance),
    Config(&'a ConfigMap),
    Connection(&'a ConnectionHandle),
    User(&'a UserHandle),
}

/// Drives one instance handle through the boot levels in order.
///
/// The handle is constructed lazily via discovery and version resolution
/// the first time a level beyond the base is attempted, unless one was
/// bound explicitly with [`Kernel::set_instance`]. A kernel performs a
/// single boot attempt per lifetime; adapt to long-lived services by
/// creating one kernel per attempt rather than sharing one.
pub struct Kernel {
    registry: HandlerRegistry,
    options: KernelOptions,
    state: BootState,
    bus: EventBus,
    instance: Option<Box<dyn Instance>>,
}

impl Kernel {
    pub const NAME: &'static str = "atriumctl";
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    pub fn new(options: KernelOptions) -> Self {
        Self::with_registry(HandlerRegistry::builtin(), options)
    }

    pub fn with_registry(registry: HandlerRegistry, options: KernelOptions) -> Self {
        Self {
            registry,
            options,
            state: BootState::default(),
            bus: EventBus::new(),
            instance: None,
        }
    }

    /// Registers a lifecycle event subscriber; must happen before `boot`
    /// to observe the full sequence.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&BootEvent) + 'static) {
        self.bus.subscribe(subscriber);
    }

    /// Binds an already-resolved handle, skipping discovery.
    pub fn set_instance(&mut self, instance: Box<dyn Instance>) {
        self.instance = Some(instance);
    }

    /// Runs the boot sequence once and returns the highest level reached.
    ///
    /// Idempotent: a second call returns the cached outcome without
    /// re-invoking any level operation. A level failure stops the loop but
    /// is not an error of `boot` itself as long as the base level was
    /// reached; inspect [`Kernel::state`] for the failure.
    pub fn boot(&mut self) -> Result<BootLevel, BootError> {
        if self.state.attempted {
            debug!("boot already attempted, returning cached outcome");
            return match self.state.highest {
                Some(level) => Ok(level),
                None => Err(self.cached_failure()),
            };
        }
        self.state.attempted = true;

        for level in BootLevel::ALL {
            self.bus.publish(&BootEvent::BeforeLevel { level });
            match self.run_level(level) {
                Ok(()) => {
                    debug!(%level, "boot level reached");
                    self.state.highest = Some(level);
                    self.bus.publish(&BootEvent::LevelSucceeded { level });
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(%level, error = %message, "boot stopped");
                    self.state.last_error = Some(LevelFailure {
                        level,
                        message: message.clone(),
                    });
                    self.bus.publish(&BootEvent::LevelFailed {
                        level,
                        error: message,
                    });
                    break;
                }
            }
        }

        match (self.state.highest, &self.state.last_error) {
            (Some(level), None) => {
                info!(%level, "boot complete");
                self.bus.publish(&BootEvent::BootSucceeded { level });
                Ok(level)
            }
            (Some(level), Some(failure)) => {
                let event = BootEvent::BootFailed {
                    level: failure.level,
                    error: failure.message.clone(),
                };
                self.bus.publish(&event);
                Ok(level)
            }
            (None, _) => {
                let failure = self.cached_failure();
                if let BootError::LevelFailed { level, message } = &failure {
                    self.bus.publish(&BootEvent::BootFailed {
                        level: *level,
                        error: message.clone(),
                    });
                }
                Err(failure)
            }
        }
    }

    fn run_level(&mut self, level: BootLevel) -> Result<(), InstanceError> {
        match level {
            // The controller's own setup; nothing instance-specific runs here.
            BootLevel::Tool => Ok(()),
            BootLevel::Root => {
                let instance = self.ensure_instance()?;
                instance.bind_root();
                Ok(())
            }
            BootLevel::Config => {
                let instance = self.ensure_instance()?;
                instance.load_configuration(false)?;
                Ok(())
            }
            BootLevel::Database => {
                let instance = self.ensure_instance()?;
                instance.connect_database()?;
                Ok(())
            }
            BootLevel::Full => {
                let instance = self.ensure_instance()?;
                instance.boot_application()
            }
            BootLevel::Login => {
                let username = self.options.username.clone();
                let instance = self.ensure_instance()?;
                instance.login(&username)?;
                Ok(())
            }
        }
    }

    fn ensure_instance(&mut self) -> Result<&mut Box<dyn Instance>, InstanceError> {
        let handle = match self.instance.take() {
            Some(handle) => handle,
            None => {
                let start = match &self.options.start_path {
                    Some(path) => path.clone(),
                    None => std::env::current_dir()?,
                };
                let handle = self.registry.discover(&start)?;
                info!(root = %handle.path(), family = handle.family(), "instance resolved");
                handle
            }
        };
        Ok(self.instance.insert(handle))
    }

    fn cached_failure(&self) -> BootError {
        match &self.state.last_error {
            Some(failure) => BootError::LevelFailed {
                level: failure.level,
                message: failure.message.clone(),
            },
            None => BootError::LevelFailed {
                level: BootLevel::BASE,
                message: "boot was never attempted".to_owned(),
            },
        }
    }

    /// Highest level reached by the boot attempt, `None` before `boot`.
    pub fn booted_level(&self) -> Option<BootLevel> {
        self.state.highest
    }

    pub fn state(&self) -> &BootState {
        &self.state
    }

    pub fn instance(&self) -> Option<&dyn Instance> {
        self.instance.as_deref()
    }

    pub fn instance_mut(&mut self) -> Option<&mut (dyn Instance + 'static)> {
        self.instance.as_deref_mut()
    }

    /// Named service lookup for downstream commands. Services appear as
    /// their boot level binds them.
    pub fn get(&self, name: &str) -> Option<Service<'_>> {
        match name {
            "instance" => self.instance.as_deref().map(Service::Instance),
            "config" => self
                .instance
                .as_deref()
                .and_then(Instance::configuration)
                .map(Service::Config),
            "database" => self
                .instance
                .as_deref()
                .and_then(Instance::connection)
                .map(Service::Connection),
            "user" => self
                .instance
                .as_deref()
                .and_then(Instance::user)
                .map(Service::User),
            _ => None,
        }
    }

    /// Clears boot state and drops the bound instance. Mainly useful for
    /// functional testing; subscribers stay registered.
    pub fn shutdown(&mut self) {
        self.state = BootState::default();
        self.instance = None;
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("instance", &self.instance.as_deref().map(Instance::family))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_instance::InstancePath;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::rc::Rc;

    fn fixture_root(dir: &Path) -> InstancePath {
        std::fs::create_dir_all(dir.join("bin")).unwrap();
        std::fs::create_dir_all(dir.join("etc")).unwrap();
        std::fs::write(dir.join("bin/atrium-server"), "").unwrap();
        std::fs::write(
            dir.join("release.info"),
            "flavor = enterprise\nversion = 7.0.1\nbuild = 2143\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("etc/atrium.toml"),
            "[database]\ndriver = \"mysql\"\nname = \"atrium\"\nuser = \"svc\"\n\n\
             [users.admin]\nadmin = true\n",
        )
        .unwrap();
        InstancePath::bind(dir).unwrap()
    }

    type CallLog = Rc<RefCell<BTreeMap<&'static str, u32>>>;

    /// Handle with scripted failures and per-operation call counting.
    #[derive(Debug)]
    struct ScriptedInstance {
        path: InstancePath,
        fail_at: Option<BootLevel>,
        calls: CallLog,
        entry_bound: bool,
        config: Option<ConfigMap>,
        connection: Option<ConnectionHandle>,
        user: Option<UserHandle>,
    }

    impl ScriptedInstance {
        fn new(path: InstancePath, fail_at: Option<BootLevel>) -> (Self, CallLog) {
            let calls = CallLog::default();
            let scripted = Self {
                path,
                fail_at,
                calls: Rc::clone(&calls),
                entry_bound: false,
                config: None,
                connection: None,
                user: None,
            };
            (scripted, calls)
        }

        fn record(&self, op: &'static str, level: BootLevel) -> Result<(), InstanceError> {
            *self.calls.borrow_mut().entry(op).or_insert(0) += 1;
            if self.fail_at == Some(level) {
                Err(InstanceError::ConfigurationMissing(format!(
                    "injected failure at {level}"
                )))
            } else {
                Ok(())
            }
        }
    }

    impl Instance for ScriptedInstance {
        fn path(&self) -> &InstancePath {
            &self.path
        }

        fn family(&self) -> &'static str {
            "scripted"
        }

        fn bind_root(&mut self) {
            *self.calls.borrow_mut().entry("bind_root").or_insert(0) += 1;
            self.entry_bound = true;
        }

        fn entry_bound(&self) -> bool {
            self.entry_bound
        }

        fn load_configuration(&mut self, _refresh: bool) -> Result<&ConfigMap, InstanceError> {
            self.record("load_configuration", BootLevel::Config)?;
            Ok(self.config.insert(ConfigMap::default()))
        }

        fn configuration(&self) -> Option<&ConfigMap> {
            self.config.as_ref()
        }

        fn connect_database(&mut self) -> Result<&ConnectionHandle, InstanceError> {
            self.record("connect_database", BootLevel::Database)?;
            Ok(self.connection.insert(ConnectionHandle {
                driver: "mysql".to_owned(),
                dsn: "mysql://scripted".to_owned(),
            }))
        }

        fn connection(&self) -> Option<&ConnectionHandle> {
            self.connection.as_ref()
        }

        fn boot_application(&mut self) -> Result<(), InstanceError> {
            self.record("boot_application", BootLevel::Full)
        }

        fn login(&mut self, username: &str) -> Result<&UserHandle, InstanceError> {
            self.record("login", BootLevel::Login)?;
            Ok(self.user.insert(UserHandle {
                name: if username.is_empty() {
                    "admin".to_owned()
                } else {
                    username.to_owned()
                },
                admin: true,
                display_name: None,
            }))
        }

        fn user(&self) -> Option<&UserHandle> {
            self.user.as_ref()
        }

        fn info(&mut self, _property: &str, _refresh: bool) -> Result<String, InstanceError> {
            Ok("scripted".to_owned())
        }
    }

    fn scripted_kernel(
        root: InstancePath,
        fail_at: Option<BootLevel>,
    ) -> (Kernel, CallLog, Rc<RefCell<Vec<BootEvent>>>) {
        let (instance, calls) = ScriptedInstance::new(root, fail_at);
        let mut kernel = Kernel::new(KernelOptions::default());
        kernel.set_instance(Box::new(instance));

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        kernel.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        (kernel, calls, events)
    }

    #[test]
    fn healthy_boot_reaches_login() {
        let dir = tempfile::tempdir().unwrap();
        let (mut kernel, calls, events) = scripted_kernel(fixture_root(dir.path()), None);

        let level = kernel.boot().unwrap();
        assert_eq!(level, BootLevel::Login);
        assert_eq!(kernel.booted_level(), Some(BootLevel::Login));
        assert!(kernel.state().last_error().is_none());

        let calls = calls.borrow();
        for op in [
            "bind_root",
            "load_configuration",
            "connect_database",
            "boot_application",
            "login",
        ] {
            assert_eq!(calls.get(op), Some(&1), "{op} should run exactly once");
        }

        assert_eq!(
            events.borrow().last(),
            Some(&BootEvent::BootSucceeded {
                level: BootLevel::Login
            })
        );
    }

    #[test]
    fn events_follow_level_order() {
        let dir = tempfile::tempdir().unwrap();
        let (mut kernel, _calls, events) = scripted_kernel(fixture_root(dir.path()), None);
        kernel.boot().unwrap();

        let events = events.borrow();
        // per level: BeforeLevel then LevelSucceeded, then one terminal event
        assert_eq!(events.len(), BootLevel::ALL.len() * 2 + 1);
        for (i, level) in BootLevel::ALL.into_iter().enumerate() {
            assert_eq!(events[2 * i], BootEvent::BeforeLevel { level });
            assert_eq!(events[2 * i + 1], BootEvent::LevelSucceeded { level });
        }
    }

    #[test]
    fn second_boot_returns_cached_outcome_without_rerunning() {
        let dir = tempfile::tempdir().unwrap();
        let (mut kernel, calls, _events) = scripted_kernel(fixture_root(dir.path()), None);

        let first = kernel.boot().unwrap();
        let counts_after_first = calls.borrow().clone();
        let second = kernel.boot().unwrap();

        assert_eq!(first, second);
        assert_eq!(*calls.borrow(), counts_after_first);
    }

    #[test]
    fn failure_at_config_keeps_root_level_and_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let (mut kernel, calls, events) =
            scripted_kernel(fixture_root(dir.path()), Some(BootLevel::Config));

        let level = kernel.boot().unwrap();
        assert_eq!(level, BootLevel::Root);

        let failure = kernel.state().last_error().unwrap();
        assert_eq!(failure.level, BootLevel::Config);
        assert!(failure.message.contains("injected failure"));

        let calls = calls.borrow();
        assert_eq!(calls.get("bind_root"), Some(&1));
        assert_eq!(calls.get("load_configuration"), Some(&1));
        assert_eq!(calls.get("connect_database"), None);
        assert_eq!(calls.get("boot_application"), None);
        assert_eq!(calls.get("login"), None);

        let boot_failed: Vec<_> = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, BootEvent::BootFailed { .. }))
            .cloned()
            .collect();
        assert_eq!(boot_failed.len(), 1);
        assert!(matches!(
            &boot_failed[0],
            BootEvent::BootFailed { level: BootLevel::Config, error } if error.contains("injected")
        ));
    }

    #[test]
    fn discovery_resolves_and_boots_a_real_fixture() {
        let dir = tempfile::tempdir().unwrap();
        fixture_root(dir.path());
        let nested = dir.path().join("modules/accounts");
        std::fs::create_dir_all(&nested).unwrap();

        let mut kernel = Kernel::new(KernelOptions {
            start_path: Some(nested),
            username: String::new(),
        });
        let level = kernel.boot().unwrap();
        assert_eq!(level, BootLevel::Login);

        let instance = kernel.instance().unwrap();
        assert_eq!(instance.family(), "70");
        assert_eq!(instance.user().unwrap().name, "admin");
    }

    #[test]
    fn discovery_failure_stops_at_tool_level() {
        let dir = tempfile::tempdir().unwrap();
        let mut kernel = Kernel::new(KernelOptions {
            start_path: Some(dir.path().to_path_buf()),
            username: String::new(),
        });

        let level = kernel.boot().unwrap();
        assert_eq!(level, BootLevel::Tool);
        let failure = kernel.state().last_error().unwrap();
        assert_eq!(failure.level, BootLevel::Root);
        assert!(failure.message.contains("no Atrium instance root"));
    }

    #[test]
    fn non_directory_path_override_reports_invalid_argument() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("stray.txt");
        std::fs::write(&file, "").unwrap();

        let mut kernel = Kernel::new(KernelOptions {
            start_path: Some(file),
            username: String::new(),
        });
        kernel.boot().unwrap();
        let failure = kernel.state().last_error().unwrap();
        assert!(failure.message.contains("not a directory"));
    }

    #[test]
    fn services_become_available_as_levels_bind_them() {
        let dir = tempfile::tempdir().unwrap();
        let (mut kernel, _calls, _events) = scripted_kernel(fixture_root(dir.path()), None);
        assert!(kernel.get("config").is_none());

        kernel.boot().unwrap();
        assert!(matches!(kernel.get("instance"), Some(Service::Instance(_))));
        assert!(matches!(kernel.get("config"), Some(Service::Config(_))));
        assert!(matches!(
            kernel.get("database"),
            Some(Service::Connection(c)) if c.driver == "mysql"
        ));
        assert!(matches!(
            kernel.get("user"),
            Some(Service::User(u)) if u.name == "admin"
        ));
        assert!(kernel.get("scheduler").is_none());
    }

    #[test]
    fn shutdown_clears_state_and_allows_a_fresh_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let root = fixture_root(dir.path());
        let (mut kernel, calls, _events) = scripted_kernel(root.clone(), None);

        kernel.boot().unwrap();
        kernel.shutdown();
        assert!(!kernel.state().attempted());
        assert_eq!(kernel.booted_level(), None);
        assert!(kernel.instance().is_none());

        let (instance, second_calls) = ScriptedInstance::new(root, None);
        kernel.set_instance(Box::new(instance));
        kernel.boot().unwrap();
        assert_eq!(calls.borrow().get("login"), Some(&1));
        assert_eq!(second_calls.borrow().get("login"), Some(&1));
    }
}
