use anyhow::{Context, Result};
use cib::backend::cibadmin::{DEFAULT_CIBADMIN, DEFAULT_CRM_MON};
use cib::{MemberPolicy, ReconcileOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

// ============================================================================
// Settings
// ============================================================================

/// Tool locations and reconcile behaviour, read from `config.toml`
///
/// ```toml
/// cibadmin = "/usr/sbin/cibadmin"
/// crm_mon = "/usr/sbin/crm_mon"
/// verify_after_apply = true
/// group_member_policy = "reject"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub cibadmin: String,
    pub crm_mon: String,
    /// Consult crm_mon after a resource changes
    pub verify_after_apply: bool,
    /// What to do with group members a descriptor no longer lists
    pub group_member_policy: MemberPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cibadmin: DEFAULT_CIBADMIN.to_string(),
            crm_mon: DEFAULT_CRM_MON.to_string(),
            verify_after_apply: true,
            group_member_policy: MemberPolicy::Reject,
        }
    }
}

/// Command-line values that take precedence over the settings file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub cibadmin: Option<String>,
    pub crm_mon: Option<String>,
    pub no_verify: bool,
    pub release_removed_members: bool,
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Resolve the settings file and load it
    pub fn load(flag: Option<&Path>) -> Result<Self> {
        let env = std::env::var(paths::ENV_CONFIG).ok();
        let path = paths::config_file(flag, env.as_deref())?;
        Self::load_from(&path)
    }

    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(cibadmin) = &overrides.cibadmin {
            self.cibadmin.clone_from(cibadmin);
        }
        if let Some(crm_mon) = &overrides.crm_mon {
            self.crm_mon.clone_from(crm_mon);
        }
        if overrides.no_verify {
            self.verify_after_apply = false;
        }
        if overrides.release_removed_members {
            self.group_member_policy = MemberPolicy::Release;
        }
        self
    }

    pub fn cibadmin_path(&self) -> PathBuf {
        paths::expand(&self.cibadmin)
    }

    pub fn crm_mon_path(&self) -> PathBuf {
        paths::expand(&self.crm_mon)
    }

    /// Reconcile options for a run; `check` turns on dry-run
    pub fn reconcile_options(&self, check: bool) -> ReconcileOptions {
        ReconcileOptions {
            dry_run: check,
            verify: self.verify_after_apply,
            member_policy: self.group_member_policy,
        }
    }

    /// Client for the configured tools
    pub fn client(&self, check: bool) -> cib::Client {
        cib::Client::new(self.cibadmin_path(), self.crm_mon_path())
            .with_options(self.reconcile_options(check))
    }
}
