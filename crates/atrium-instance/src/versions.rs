//! Concrete handlers per Atrium version family.
//!
//! A handler only overrides the lifecycle operations where its family
//! diverges; everything else delegates to the shared [`InstanceState`]
//! behavior. New point releases need no resolver change unless they
//! require divergent behavior, in which case a new handler is registered
//! at the appropriate specificity.

use crate::config::ConfigMap;
use crate::database::ConnectionHandle;
use crate::handle::{Instance, InstanceState};
use crate::locate::InstancePath;
use crate::users::UserHandle;
use crate::InstanceError;

macro_rules! instance_impl {
    ($ty:ty, family: $family:literal, config: $loader:ident) => {
        impl $ty {
            pub fn new(path: InstancePath) -> Self {
                Self {
                    state: InstanceState::new(path),
                }
            }
        }

        impl Instance for $ty {
            fn path(&self) -> &InstancePath {
                self.state.path()
            }

            fn family(&self) -> &'static str {
                $family
            }

            fn bind_root(&mut self) {
                self.state.bind_root();
            }

            fn entry_bound(&self) -> bool {
                self.state.entry_bound()
            }

            fn load_configuration(&mut self, refresh: bool) -> Result<&ConfigMap, InstanceError> {
                self.state.$loader(refresh)
            }

            fn configuration(&self) -> Option<&ConfigMap> {
                self.state.configuration()
            }

            fn connect_database(&mut self) -> Result<&ConnectionHandle, InstanceError> {
                self.state.connect_database()
            }

            fn connection(&self) -> Option<&ConnectionHandle> {
                self.state.connection()
            }

            fn boot_application(&mut self) -> Result<(), InstanceError> {
                self.state.boot_application()
            }

            fn login(&mut self, username: &str) -> Result<&UserHandle, InstanceError> {
                self.state.login(username)
            }

            fn user(&self) -> Option<&UserHandle> {
                self.state.user()
            }

            fn info(&mut self, property: &str, refresh: bool) -> Result<String, InstanceError> {
                self.state.info(property, refresh)
            }
        }
    };
}

/// Legacy 6.x installs: no local configuration override layer.
#[derive(Debug)]
pub struct Atrium6 {
    state: InstanceState,
}

/// The 7.x family baseline.
#[derive(Debug)]
pub struct Atrium7 {
    state: InstanceState,
}

/// 7.0.x point releases; currently no divergence beyond the family id,
/// registered so point-release fixes can land without touching 7.x.
#[derive(Debug)]
pub struct Atrium70 {
    state: InstanceState,
}

instance_impl!(Atrium6, family: "6", config: load_configuration_base);
instance_impl!(Atrium7, family: "7", config: load_configuration);
instance_impl!(Atrium70, family: "70", config: load_configuration);
