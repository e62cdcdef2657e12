//! Reaction policy for validation failures
//!
//! Validation errors (out-of-range values, wrong types, values outside an
//! allowed set) are either returned to the caller or logged and swallowed,
//! depending on the active [`Reaction`]. The policy is per thread and can be
//! seeded from the `DIFFREFINE_REACTION` environment variable.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

/// Environment variable consulted when a thread first reads its policy.
pub const REACTION_ENV_VAR: &str = "DIFFREFINE_REACTION";

/// How validation failures are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    /// Return the error to the caller.
    #[default]
    Raise,

    /// Emit a warning, keep the previous valid value and carry on.
    Log,
}

impl Reaction {
    /// Read the policy from [`REACTION_ENV_VAR`], falling back to `Raise`.
    ///
    /// Unrecognised values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_setting(std::env::var(REACTION_ENV_VAR).ok().as_deref())
    }

    /// Policy for a raw setting value; absent or unrecognised means `Raise`
    pub fn from_setting(raw: Option<&str>) -> Self {
        match raw {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "unrecognised {REACTION_ENV_VAR}, using 'raise'");
                Reaction::Raise
            }),
            None => Reaction::Raise,
        }
    }
}

impl FromStr for Reaction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raise" => Ok(Reaction::Raise),
            "log" | "warn" => Ok(Reaction::Log),
            other => Err(format!("unknown reaction '{other}'")),
        }
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reaction::Raise => write!(f, "raise"),
            Reaction::Log => write!(f, "log"),
        }
    }
}

thread_local! {
    static REACTION: Cell<Reaction> = Cell::new(Reaction::from_env());
}

/// The policy active on the current thread.
pub fn reaction() -> Reaction {
    REACTION.with(Cell::get)
}

/// Replace the policy on the current thread, returning the previous one.
pub fn set_reaction(reaction: Reaction) -> Reaction {
    REACTION.with(|cell| cell.replace(reaction))
}

/// Run `f` with `reaction` active, restoring the previous policy afterwards.
pub fn with_reaction<T>(reaction: Reaction, f: impl FnOnce() -> T) -> T {
    let previous = set_reaction(reaction);
    let out = f();
    set_reaction(previous);
    out
}

/// Surface a validation failure according to the active policy.
///
/// Under `Raise` the error is returned unchanged. Under `Log` it is emitted as
/// a warning and `Ok(())` is returned, so the caller keeps its old state.
pub fn report<E: std::error::Error>(err: E) -> Result<(), E> {
    match reaction() {
        Reaction::Raise => Err(err),
        Reaction::Log => {
            tracing::warn!(error = %err, "validation failed, previous value kept");
            Ok(())
        }
    }
}
