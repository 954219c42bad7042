use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

use cib::{
    ColocationParams, GroupParams, LocationParams, OrderParams, OrderSetParams, PrimitiveParams,
    PropertyParams, RawDescriptor, ResourceSets, State,
};
use declarative::Intent;

#[derive(Parser)]
#[command(name = "cibform")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative, idempotent Pacemaker CIB management", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Report what would change without writing to the CIB
    #[arg(long, visible_alias = "dry-run", global = true)]
    pub check: bool,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Settings file (default: ~/.config/cibform/config.toml)
    #[arg(long, env = "CIBFORM_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Path to cibadmin
    #[arg(long, global = true)]
    pub cibadmin: Option<String>,

    /// Path to crm_mon
    #[arg(long, global = true)]
    pub crm_mon: Option<String>,

    /// Do not consult crm_mon after changing a resource
    #[arg(long, global = true)]
    pub no_verify: bool,

    /// Move members a group no longer lists back to the top level
    #[arg(long, global = true)]
    pub release_removed_members: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage a primitive resource, optionally as a clone or master
    Primitive(PrimitiveArgs),

    /// Manage a resource group
    Group(GroupArgs),

    /// Manage a location constraint
    Location(LocationArgs),

    /// Manage a colocation constraint
    Colocation(ColocationArgs),

    /// Manage an order constraint
    Order(OrderArgs),

    /// Manage an ordered-set constraint
    #[command(name = "order-set")]
    OrderSet(OrderSetArgs),

    /// Manage cluster properties (cib-bootstrap-options)
    Property(PropertyArgs),

    /// Manage resource defaults (rsc_defaults-options)
    #[command(name = "resource-defaults")]
    ResourceDefaults(PropertyArgs),

    /// Apply every descriptor in a manifest
    Apply(ManifestArgs),

    /// Preview what apply would change
    Diff(ManifestArgs),

    /// Show current state of every descriptor in a manifest
    Status(ManifestArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Command {
    /// The descriptor a single-object subcommand describes
    pub fn descriptor(&self) -> Option<RawDescriptor> {
        let raw = match self {
            Self::Primitive(args) => RawDescriptor::Primitive(args.params()),
            Self::Group(args) => RawDescriptor::Group(args.params()),
            Self::Location(args) => RawDescriptor::Location(args.params()),
            Self::Colocation(args) => RawDescriptor::Colocation(args.params()),
            Self::Order(args) => RawDescriptor::Order(args.params()),
            Self::OrderSet(args) => RawDescriptor::OrderSet(args.params()),
            Self::Property(args) => RawDescriptor::Property(args.params()),
            Self::ResourceDefaults(args) => RawDescriptor::ResourceDefaults(args.params()),
            Self::Apply(_) | Self::Diff(_) | Self::Status(_) | Self::Completions { .. } => {
                return None;
            }
        };
        Some(raw)
    }
}

// ============================================================================
// States
// ============================================================================

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum StateArg {
    #[default]
    Present,
    Absent,
    Enabled,
    Disabled,
}

impl From<StateArg> for State {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Present => Self::Present,
            StateArg::Absent => Self::Absent,
            StateArg::Enabled => Self::Enabled,
            StateArg::Disabled => Self::Disabled,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum IntentArg {
    #[default]
    Present,
    Absent,
}

impl From<IntentArg> for Intent {
    fn from(arg: IntentArg) -> Self {
        match arg {
            IntentArg::Present => Self::Present,
            IntentArg::Absent => Self::Absent,
        }
    }
}

// ============================================================================
// Resources
// ============================================================================

#[derive(Args)]
pub struct PrimitiveArgs {
    /// Resource id
    pub name: String,

    /// Agent as class:provider:type, class:type, or a bare heartbeat type
    #[arg(short = 't', long = "type")]
    pub agent: Option<String>,

    /// Instance attributes, e.g. "ip=192.168.0.100 cidr_netmask=24"
    #[arg(long)]
    pub params: Option<String>,

    /// Meta attributes of the primitive
    #[arg(long)]
    pub meta: Option<String>,

    /// Operation, e.g. "monitor interval=30s" (repeatable)
    #[arg(long)]
    pub op: Vec<String>,

    /// Wrap in a clone, with optional clone meta attributes
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    pub clone: Option<String>,

    /// Wrap in a master, with optional master meta attributes
    #[arg(long, num_args = 0..=1, default_missing_value = "", conflicts_with = "clone")]
    pub master: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub state: StateArg,

    /// Replace even when nothing differs
    #[arg(long)]
    pub force: bool,
}

impl PrimitiveArgs {
    pub fn params(&self) -> PrimitiveParams {
        PrimitiveParams {
            name: Some(self.name.clone()),
            agent: self.agent.clone(),
            params: self.params.clone(),
            meta: self.meta.clone(),
            op: self.op.clone(),
            clone: self.clone.clone(),
            master: self.master.clone(),
            state: self.state.into(),
            force: self.force,
        }
    }
}

#[derive(Args)]
pub struct GroupArgs {
    /// Group id
    pub name: String,

    /// Member resource ids, in start order
    pub resources: Vec<String>,

    /// Meta attributes of the group
    #[arg(long)]
    pub meta: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub state: StateArg,

    /// Replace even when nothing differs
    #[arg(long)]
    pub force: bool,
}

impl GroupArgs {
    pub fn params(&self) -> GroupParams {
        GroupParams {
            name: Some(self.name.clone()),
            resources: self.resources.clone(),
            meta: self.meta.clone(),
            state: self.state.into(),
            force: self.force,
        }
    }
}

// ============================================================================
// Constraints
// ============================================================================

#[derive(Args)]
pub struct LocationArgs {
    /// Constraint id (derived from resource and node when omitted)
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub resource: Option<String>,

    #[arg(long)]
    pub node: Option<String>,

    /// Integer, INFINITY or -INFINITY
    #[arg(long, allow_hyphen_values = true)]
    pub score: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub state: IntentArg,

    #[arg(long)]
    pub force: bool,
}

impl LocationArgs {
    pub fn params(&self) -> LocationParams {
        LocationParams {
            id: self.id.clone(),
            resource: self.resource.clone(),
            node: self.node.clone(),
            score: self.score.clone(),
            state: self.state.into(),
            force: self.force,
        }
    }
}

#[derive(Args)]
pub struct ColocationArgs {
    #[arg(long)]
    pub id: Option<String>,

    /// Resource placed relative to resource2, optionally "id=Role"
    #[arg(long)]
    pub resource1: Option<String>,

    #[arg(long)]
    pub resource2: Option<String>,

    /// Promoted side of a master/slave colocation
    #[arg(long, conflicts_with_all = ["resource1", "resource2"])]
    pub master: Option<String>,

    #[arg(long, conflicts_with_all = ["resource1", "resource2"])]
    pub slave: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub score: Option<String>,

    /// Extra rsc_colocation attributes
    #[arg(long)]
    pub params: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub state: IntentArg,

    #[arg(long)]
    pub force: bool,
}

impl ColocationArgs {
    pub fn params(&self) -> ColocationParams {
        ColocationParams {
            id: self.id.clone(),
            resource1: self.resource1.clone(),
            resource2: self.resource2.clone(),
            master: self.master.clone(),
            slave: self.slave.clone(),
            score: self.score.clone(),
            params: self.params.clone(),
            state: self.state.into(),
            force: self.force,
        }
    }
}

#[derive(Args)]
pub struct OrderArgs {
    #[arg(long)]
    pub id: Option<String>,

    /// Resource acted on first
    #[arg(long)]
    pub resource1: Option<String>,

    /// start, stop, promote or demote (default: start)
    #[arg(long)]
    pub resource1_action: Option<String>,

    #[arg(long)]
    pub resource2: Option<String>,

    #[arg(long)]
    pub resource2_action: Option<String>,

    /// kind=, symmetrical=, score= and extra attributes
    #[arg(long)]
    pub params: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub state: IntentArg,

    #[arg(long)]
    pub force: bool,
}

impl OrderArgs {
    pub fn params(&self) -> OrderParams {
        OrderParams {
            id: self.id.clone(),
            resource1: self.resource1.clone(),
            resource1_action: self.resource1_action.clone(),
            resource2: self.resource2.clone(),
            resource2_action: self.resource2_action.clone(),
            params: self.params.clone(),
            state: self.state.into(),
            force: self.force,
        }
    }
}

#[derive(Args)]
pub struct OrderSetArgs {
    /// Constraint id
    pub name: String,

    /// One set of space-separated resource ids (repeatable, in order)
    #[arg(long = "set")]
    pub sets: Vec<String>,

    /// Attributes applied to every resource_set, e.g. "sequential=true"
    #[arg(long)]
    pub set_options: Option<String>,

    /// Attributes of the rsc_order, e.g. "kind=Optional"
    #[arg(long)]
    pub params: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub state: IntentArg,

    #[arg(long)]
    pub force: bool,
}

impl OrderSetArgs {
    pub fn params(&self) -> OrderSetParams {
        OrderSetParams {
            name: Some(self.name.clone()),
            resource_sets: ResourceSets::Nested(
                self.sets
                    .iter()
                    .map(|set| set.split_whitespace().map(String::from).collect())
                    .collect(),
            ),
            set_options: self.set_options.clone(),
            params: self.params.clone(),
            state: self.state.into(),
            force: self.force,
        }
    }
}

// ============================================================================
// Properties
// ============================================================================

#[derive(Args)]
pub struct PropertyArgs {
    /// Pairs to set, or names to remove with --state absent
    #[arg(long)]
    pub params: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub state: IntentArg,
}

impl PropertyArgs {
    pub fn params(&self) -> PropertyParams {
        PropertyParams {
            params: self.params.clone(),
            state: self.state.into(),
        }
    }
}

// ============================================================================
// Manifests
// ============================================================================

#[derive(Args)]
pub struct ManifestArgs {
    /// Manifest file (TOML)
    pub manifest: String,

    /// Only this kind or descriptor, e.g. "primitive" or "primitive.vip"
    #[arg(short, long)]
    pub target: Option<String>,

    /// Stop at the first failed descriptor
    #[arg(long)]
    pub fail_fast: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_primitive_flags() {
        let cli = parse(&[
            "cibform",
            "--check",
            "primitive",
            "vip",
            "--type",
            "IPaddr2",
            "--params",
            "ip=10.0.0.1",
            "--op",
            "monitor interval=30s",
            "--op",
            "start timeout=20s",
            "--clone",
        ]);
        assert!(cli.check);
        let Some(RawDescriptor::Primitive(params)) = cli.command.descriptor() else {
            panic!("expected a primitive");
        };
        assert_eq!(params.agent.as_deref(), Some("IPaddr2"));
        assert_eq!(params.op.len(), 2);
        assert_eq!(params.clone.as_deref(), Some(""));
        assert_eq!(params.state, State::Present);
    }

    #[test]
    fn test_negative_score() {
        let cli = parse(&[
            "cibform", "location", "--resource", "vip", "--node", "n1", "--score", "-INFINITY",
        ]);
        let Some(RawDescriptor::Location(params)) = cli.command.descriptor() else {
            panic!("expected a location");
        };
        assert_eq!(params.score.as_deref(), Some("-INFINITY"));
    }

    #[test]
    fn test_order_set_sets() {
        let cli = parse(&[
            "cibform", "order-set", "order-stack", "--set", "fs", "--set", "db web",
        ]);
        let Some(RawDescriptor::OrderSet(params)) = cli.command.descriptor() else {
            panic!("expected an order set");
        };
        assert_eq!(
            params.resource_sets.into_sets(),
            vec![vec!["fs".to_string()], vec!["db".to_string(), "web".to_string()]]
        );
    }

    #[test]
    fn test_master_conflicts_with_resource1() {
        let result = Cli::try_parse_from([
            "cibform", "colocation", "--resource1", "a", "--master", "b",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_manifest_commands_have_no_descriptor() {
        let cli = parse(&["cibform", "apply", "site.toml", "--fail-fast"]);
        assert!(cli.command.descriptor().is_none());
    }
}
