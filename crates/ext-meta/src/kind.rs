//! Extension kind enumeration

use serde::{Deserialize, Serialize};

/// The closed set of extension kinds the host application understands.
///
/// Detection priority between kinds is fixed: hook > server > agent > command.
/// [`ExtensionKind::ALL`] lists the kinds in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    Hook,
    Server,
    Agent,
    Command,
}

impl ExtensionKind {
    /// All kinds, in detection-priority order.
    pub const ALL: [ExtensionKind; 4] = [
        ExtensionKind::Hook,
        ExtensionKind::Server,
        ExtensionKind::Agent,
        ExtensionKind::Command,
    ];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionKind::Hook => "hook",
            ExtensionKind::Server => "server",
            ExtensionKind::Agent => "agent",
            ExtensionKind::Command => "command",
        }
    }

    /// Conventional directory name holding this kind inside a plugin.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ExtensionKind::Hook => "hooks",
            ExtensionKind::Server => "servers",
            ExtensionKind::Agent => "agents",
            ExtensionKind::Command => "commands",
        }
    }

    /// Map a directory name back to a kind, accepting both the plural
    /// convention and the singular form.
    pub fn from_dir_name(dir: &str) -> Option<Self> {
        match dir {
            "hooks" | "hook" => Some(ExtensionKind::Hook),
            "servers" | "server" | "mcp" => Some(ExtensionKind::Server),
            "agents" | "agent" => Some(ExtensionKind::Agent),
            "commands" | "command" => Some(ExtensionKind::Command),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExtensionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hook" => Ok(ExtensionKind::Hook),
            "server" => Ok(ExtensionKind::Server),
            "agent" => Ok(ExtensionKind::Agent),
            "command" => Ok(ExtensionKind::Command),
            other => Err(format!("unknown extension kind: {other}")),
        }
    }
}
