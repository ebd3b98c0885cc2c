//! Module registration descriptors
//!
//! When a module announces itself it submits a [`ModuleDescriptor`]: its name,
//! the queue address it listens on, and the RPCs it understands. The hub
//! persists the descriptor so that actions can later be routed to the module's
//! `set` RPC and new sensors provisioned through its `add` RPC.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The five RPC kinds a module may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcKind {
    List,
    Get,
    Del,
    Add,
    Set,
}

impl RpcKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcKind::List => "list",
            RpcKind::Get => "get",
            RpcKind::Del => "del",
            RpcKind::Add => "add",
            RpcKind::Set => "set",
        }
    }
}

impl fmt::Display for RpcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an RPC kind string that is none of the five known kinds.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown rpc kind '{0}'")]
pub struct UnknownRpcKind(pub String);

impl FromStr for RpcKind {
    type Err = UnknownRpcKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(RpcKind::List),
            "get" => Ok(RpcKind::Get),
            "del" => Ok(RpcKind::Del),
            "add" => Ok(RpcKind::Add),
            "set" => Ok(RpcKind::Set),
            other => Err(UnknownRpcKind(other.to_string())),
        }
    }
}

/// One argument of a module RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcArgDescriptor {
    /// Argument name; dots denote nesting in the outbound structure
    /// (`start.second`).
    pub name: String,

    /// Declared type, free-form text from the module.
    #[serde(rename = "type")]
    pub arg_type: String,

    #[serde(default)]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,
}

/// One RPC a module exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcDescriptor {
    /// Key the module dispatches on when a command arrives on its queue.
    pub key: String,

    #[serde(rename = "type")]
    pub kind: RpcKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,

    #[serde(default)]
    pub args: Vec<RpcArgDescriptor>,
}

/// Registration payload of a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,

    /// Queue address the module receives commands on.
    pub queue: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,

    #[serde(default, alias = "rpc")]
    pub rpcs: Vec<RpcDescriptor>,
}

impl ModuleDescriptor {
    /// The key of the first RPC of the given kind, if the module has one.
    #[must_use]
    pub fn rpc_key(&self, kind: RpcKind) -> Option<&str> {
        self.rpcs
            .iter()
            .find(|rpc| rpc.kind == kind)
            .map(|rpc| rpc.key.as_str())
    }
}
