//! CLI argument definitions for the cpljson client.
//!
//! Named arguments may be repeated; every occurrence is collected in order
//! and the first one is used. Values are kept as raw OS strings and may begin
//! with `-`, so cache identifiers and paths are passed through untouched.
//!
//! Tokens a subcommand does not recognise are not an error. The first such
//! token and everything after it land in a hidden trailing list, which the
//! router scans for the flags it knows, so `meta --cache abc --max-bytes 10`
//! still queries `abc`. Required flags are enforced by the router rather
//! than by clap for the same reason.

use std::ffi::OsString;

use clap::{ArgAction, Parser, Subcommand};

/// Queries the sidecar cache of the CodePlane daemon serving this project.
#[derive(Parser, Debug)]
#[command(name = "cpljson", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CacheCommand,
}

/// Sidecar cache endpoints exposed by the daemon.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CacheCommand {
    /// Lists cache entries recorded for a session and endpoint.
    List {
        /// Session identifier (required).
        #[arg(long, value_name = "S", action = ArgAction::Append, allow_hyphen_values = true)]
        session: Vec<OsString>,
        /// Endpoint whose responses were cached (required).
        #[arg(long, value_name = "E", action = ArgAction::Append, allow_hyphen_values = true)]
        endpoint: Vec<OsString>,
        #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
        rest: Vec<OsString>,
    },
    /// Fetches a slice of a cached payload.
    Slice {
        /// Cache entry identifier (required).
        #[arg(long, value_name = "C", action = ArgAction::Append, allow_hyphen_values = true)]
        cache: Vec<OsString>,
        /// Path within the cached payload.
        #[arg(long, value_name = "P", action = ArgAction::Append, allow_hyphen_values = true)]
        path: Vec<OsString>,
        /// Maximum number of bytes to return.
        #[arg(long, value_name = "N", action = ArgAction::Append, allow_hyphen_values = true)]
        max_bytes: Vec<OsString>,
        /// Byte offset to start from.
        #[arg(long, value_name = "N", action = ArgAction::Append, allow_hyphen_values = true)]
        offset: Vec<OsString>,
        #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
        rest: Vec<OsString>,
    },
    /// Prints metadata for a cache entry.
    Meta {
        /// Cache entry identifier (required).
        #[arg(long, value_name = "C", action = ArgAction::Append, allow_hyphen_values = true)]
        cache: Vec<OsString>,
        #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
        rest: Vec<OsString>,
    },
}

impl CacheCommand {
    /// Subcommand name as typed on the command line.
    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Slice { .. } => "slice",
            Self::Meta { .. } => "meta",
        }
    }
}
