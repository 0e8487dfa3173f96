//! Command modelling for cpljson requests.
//!
//! This module turns parsed subcommands into the endpoint path and query
//! string sent to the daemon, so the runtime in `lib.rs` only deals with IO.
//! Text values are held as raw OS strings and percent-encoded byte-wise when
//! the query is rendered; numeric values are validated up front and inserted
//! verbatim.

use std::ffi::{OsStr, OsString};

use crate::AppError;
use crate::cli::CacheCommand;
use crate::encoding::encode_query_value;

/// Integer literal made of an optional sign followed by ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NumericToken(String);

impl NumericToken {
    fn parse(command: &'static str, flag: &'static str, raw: OsString) -> Result<Self, AppError> {
        let text = match raw.into_string() {
            Ok(text) => text,
            Err(raw) => {
                return Err(AppError::InvalidNumber {
                    command,
                    flag,
                    value: raw.to_string_lossy().into_owned(),
                });
            }
        };
        let unsigned = text
            .strip_prefix('-')
            .or_else(|| text.strip_prefix('+'))
            .unwrap_or(&text);
        if unsigned.is_empty() || !unsigned.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(AppError::InvalidNumber {
                command,
                flag,
                value: text,
            });
        }
        Ok(Self(text))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum QueryValue {
    /// Untrusted bytes, encoded on output.
    Text(OsString),
    Numeric(NumericToken),
}

/// Request for one of the sidecar cache endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DaemonRequest {
    path: &'static str,
    query: Vec<(&'static str, QueryValue)>,
}

impl DaemonRequest {
    fn new(path: &'static str) -> Self {
        Self {
            path,
            query: Vec::new(),
        }
    }

    fn text(mut self, key: &'static str, value: OsString) -> Self {
        self.query.push((key, QueryValue::Text(value)));
        self
    }

    fn numeric(mut self, key: &'static str, value: NumericToken) -> Self {
        self.query.push((key, QueryValue::Numeric(value)));
        self
    }

    /// Renders the request target, encoding every text value.
    pub(crate) fn path_and_query(&self) -> String {
        let mut target = String::from(self.path);
        for (index, (key, value)) in self.query.iter().enumerate() {
            target.push(if index == 0 { '?' } else { '&' });
            target.push_str(key);
            target.push('=');
            match value {
                QueryValue::Text(raw) => {
                    target.push_str(&encode_query_value(raw.as_encoded_bytes()));
                }
                QueryValue::Numeric(token) => target.push_str(&token.0),
            }
        }
        target
    }
}

/// Looks up named arguments for one subcommand.
///
/// Values clap parsed come first in argument order; tokens clap did not
/// recognise follow them, so the first occurrence overall is the first
/// parsed value, or failing that the first `--flag value` pair in the
/// trailing tokens.
struct ArgLookup {
    command: &'static str,
    rest: Vec<OsString>,
}

impl ArgLookup {
    fn optional(&self, parsed: Vec<OsString>, flag: &'static str) -> Option<OsString> {
        let flag = OsStr::new(flag);
        parsed.into_iter().next().or_else(|| {
            self.rest
                .windows(2)
                .find(|pair| pair.first().is_some_and(|name| name.as_os_str() == flag))
                .and_then(|pair| pair.get(1).cloned())
        })
    }

    fn required(&self, parsed: Vec<OsString>, flag: &'static str) -> Result<OsString, AppError> {
        self.optional(parsed, flag).ok_or(AppError::MissingArgument {
            command: self.command,
            flag,
        })
    }

    fn numeric(
        &self,
        parsed: Vec<OsString>,
        flag: &'static str,
    ) -> Result<Option<NumericToken>, AppError> {
        self.optional(parsed, flag)
            .map(|raw| NumericToken::parse(self.command, flag, raw))
            .transpose()
    }
}

impl TryFrom<CacheCommand> for DaemonRequest {
    type Error = AppError;

    fn try_from(command: CacheCommand) -> Result<Self, Self::Error> {
        let name = command.name();
        match command {
            CacheCommand::List {
                session,
                endpoint,
                rest,
            } => {
                let args = ArgLookup { command: name, rest };
                let session = args.required(session, "--session")?;
                let endpoint = args.required(endpoint, "--endpoint")?;
                Ok(Self::new("/sidecar/cache/list")
                    .text("session", session)
                    .text("endpoint", endpoint))
            }
            CacheCommand::Slice {
                cache,
                path,
                max_bytes,
                offset,
                rest,
            } => {
                let args = ArgLookup { command: name, rest };
                let cache = args.required(cache, "--cache")?;
                let path = args.optional(path, "--path");
                let max_bytes = args.numeric(max_bytes, "--max-bytes")?;
                let offset = args.numeric(offset, "--offset")?;
                let mut request = Self::new("/sidecar/cache/slice").text("cache", cache);
                if let Some(path) = path {
                    request = request.text("path", path);
                }
                if let Some(max_bytes) = max_bytes {
                    request = request.numeric("max_bytes", max_bytes);
                }
                if let Some(offset) = offset {
                    request = request.numeric("offset", offset);
                }
                Ok(request)
            }
            CacheCommand::Meta { cache, rest } => {
                let args = ArgLookup { command: name, rest };
                let cache = args.required(cache, "--cache")?;
                Ok(Self::new("/sidecar/cache/meta").text("cache", cache))
            }
        }
    }
}
