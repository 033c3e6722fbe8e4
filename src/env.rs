//! Configuration read from environment variables.

use tracing::warn;

/// Environment variable which enables verbose logging of derived types.
pub const VERBOSE_VAR: &str = "RELAY_VERBOSE";

/// Environment variable which controls checking of call arity.
pub const CHECK_ARITY_VAR: &str = "RELAY_CHECK_ARITY";

/// Options that control type checking.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckOptions {
    /// Whether to reject calls whose argument count differs from the number
    /// of inputs the operator was registered with.
    pub check_arity: bool,

    /// Whether to log the type derived for each call at `info` level rather
    /// than `debug`.
    pub verbose: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            check_arity: true,
            verbose: false,
        }
    }
}

impl CheckOptions {
    /// Read options from the `RELAY_VERBOSE` and `RELAY_CHECK_ARITY`
    /// environment variables, using the defaults for unset variables.
    pub fn from_env() -> CheckOptions {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CheckOptions {
        let defaults = CheckOptions::default();
        CheckOptions {
            check_arity: flag_from(&lookup, CHECK_ARITY_VAR, defaults.check_arity),
            verbose: flag_from(&lookup, VERBOSE_VAR, defaults.verbose),
        }
    }
}

/// Interpret a string value such as "1" or "no" as a boolean.
///
/// Returns `None` if the value is not recognized.
pub fn str_as_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Return whether a feature flag controlled by an environment variable is
/// enabled.
pub fn env_flag(name: &str, default: bool) -> bool {
    flag_from(|name: &str| std::env::var(name).ok(), name, default)
}

fn flag_from(lookup: impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    let Some(value) = lookup(name) else {
        return default;
    };
    str_as_bool(&value).unwrap_or_else(|| {
        warn!(var = name, value = %value, default, "unrecognized boolean value");
        default
    })
}
