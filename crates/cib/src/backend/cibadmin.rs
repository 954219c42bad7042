//! Backend that runs the Pacemaker command line tools.

use crate::backend::{Backend, Query, Section};
use crate::error::{Error, Result};
use crate::xml::Element;
use log::{debug, trace};
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_CIBADMIN: &str = "/usr/sbin/cibadmin";
pub const DEFAULT_CRM_MON: &str = "/usr/sbin/crm_mon";

/// Backend that executes real `cibadmin` and `crm_mon` commands.
///
/// `CIB_file` and the other Pacemaker environment variables are inherited
/// by the child processes, so pointing it at a shadow file just works.
#[derive(Debug, Clone)]
pub struct CibadminBackend {
    cibadmin: PathBuf,
    crm_mon: PathBuf,
}

impl Default for CibadminBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CIBADMIN, DEFAULT_CRM_MON)
    }
}

impl CibadminBackend {
    pub fn new(cibadmin: impl Into<PathBuf>, crm_mon: impl Into<PathBuf>) -> Self {
        Self {
            cibadmin: cibadmin.into(),
            crm_mon: crm_mon.into(),
        }
    }

    /// Run a tool and return stdout, mapping failures by exit code.
    fn run(tool: &Path, args: &[String]) -> Result<String> {
        let name = tool.display().to_string();
        debug!("running {name} {}", args.join(" "));

        let output = Command::new(tool)
            .args(args)
            .output()
            .map_err(|e| Error::from_spawn(&name, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("{name} exited with {:?}: {}", output.status.code(), stderr.trim());
            return Err(Error::from_tool_output(&name, output.status.code(), &stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn cibadmin(&self, args: Vec<String>) -> Result<String> {
        Self::run(&self.cibadmin, &args)
    }
}

/// `--scope S` or `--xpath X` for a query.
fn scope_args(query: &Query) -> Vec<String> {
    match (query, query.to_xpath()) {
        (Query::Section(section), _) => vec!["--scope".into(), section.as_str().into()],
        (_, Some(xpath)) => vec!["--xpath".into(), xpath],
        (_, None) => Vec::new(),
    }
}

impl Backend for CibadminBackend {
    fn query(&self, query: &Query) -> Result<String> {
        let mut args = vec!["--query".to_string()];
        args.extend(scope_args(query));
        self.cibadmin(args)
    }

    fn create(&self, section: Section, fragment: &Element) -> Result<()> {
        let xml = fragment.render();
        trace!("create under {section}: {xml}");
        self.cibadmin(vec![
            "--create".into(),
            "--scope".into(),
            section.as_str().into(),
            "--xml-text".into(),
            xml,
        ])?;
        Ok(())
    }

    fn replace(&self, target: &Query, fragment: &Element) -> Result<()> {
        let xml = fragment.render();
        trace!("replace {target}: {xml}");
        let mut args = vec!["--replace".to_string()];
        args.extend(scope_args(target));
        args.extend(["--xml-text".to_string(), xml]);
        self.cibadmin(args)?;
        Ok(())
    }

    fn delete(&self, fragment: &Element) -> Result<()> {
        let mut target = Element::new(&fragment.name);
        if let Some(id) = fragment.id() {
            target.set_attr("id", id);
        }
        self.cibadmin(vec![
            "--delete".into(),
            "--xml-text".into(),
            target.render(),
        ])?;
        Ok(())
    }

    fn resource_status(&self) -> Result<String> {
        Self::run(
            &self.crm_mon,
            &["--one-shot".to_string(), "--output-as=xml".to_string()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_args() {
        assert_eq!(
            scope_args(&Query::Section(Section::Constraints)),
            vec!["--scope", "constraints"]
        );
        assert_eq!(
            scope_args(&Query::element("primitive", "vip")),
            vec!["--xpath", "//primitive[@id='vip']"]
        );
    }

    #[test]
    fn test_missing_binary_is_tool_unavailable() {
        let backend = CibadminBackend::new("/nonexistent/cibadmin", "/nonexistent/crm_mon");
        let err = backend
            .query(&Query::Section(Section::Resources))
            .unwrap_err();
        assert!(matches!(err, Error::ToolUnavailable { .. }));
        assert!(matches!(
            backend.resource_status(),
            Err(Error::ToolUnavailable { .. })
        ));
    }
}
