//! Shared fixtures for unit tests.

use crate::locate::InstancePath;
use std::path::Path;

/// Writes a complete instance tree (markers, release metadata, config with
/// a database section and an admin account) and binds it.
pub(crate) fn fixture_root(dir: &Path) -> InstancePath {
    std::fs::create_dir_all(dir.join("bin")).unwrap();
    std::fs::create_dir_all(dir.join("etc")).unwrap();
    std::fs::write(dir.join("bin/atrium-server"), "").unwrap();
    std::fs::write(
        dir.join("release.info"),
        "flavor  = enterprise\nversion = 7.0.1\nbuild   = 2143\n",
    )
    .unwrap();
    std::fs::write(
        dir.join("etc/atrium.toml"),
        "[database]\n\
         driver = \"mysql\"\n\
         name = \"atrium\"\n\
         user = \"svc\"\n\
         password = \"secret\"\n\
         \n\
         [users.admin]\n\
         admin = true\n\
         display_name = \"Site Admin\"\n",
    )
    .unwrap();
    InstancePath::bind(dir).unwrap()
}
