//! Task display names computed from macro expressions such as `${BUILD_VERSION}`.
//!
//! Expansion is delegated to a pluggable [`MacroExpander`], picked per job kind from an
//! [`ExpanderRegistry`]. Every failure of the expansion step is absorbed here: callers get either
//! the expanded name or a [`FallbackReason`], and [`NameResolution::into_name`] always collapses
//! to a plain string.

mod env;

use std::collections::HashMap;
use std::fmt;

use log::warn;
use thiserror::Error;

use crate::host::{Build, Environment, Host, HostError, JobKind};

pub use env::EnvExpander;

/// Failure raised by a macro expansion capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MacroError {
    #[error("I/O failure while expanding macro: {0}")]
    Io(String),

    #[error("Macro evaluation failed: {0}")]
    Evaluation(String),

    #[error("Macro expansion was cancelled")]
    Cancelled,
}

/// Expands a name template against a build's environment.
pub trait MacroExpander: Send + Sync {
    /// Returns the expanded text, or `None` when the expansion yields no value.
    fn expand(&self, template: &str, environment: &Environment) -> Result<Option<String>, MacroError>;
}

/// Macro expanders keyed by job kind, with a default for kinds without their own entry.
pub struct ExpanderRegistry {
    default: Box<dyn MacroExpander>,
    by_kind: HashMap<JobKind, Box<dyn MacroExpander>>,
}

impl ExpanderRegistry {
    pub fn new(default: impl MacroExpander + 'static) -> Self {
        Self {
            default: Box::new(default),
            by_kind: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_expander(mut self, kind: JobKind, expander: impl MacroExpander + 'static) -> Self {
        self.by_kind.insert(kind, Box::new(expander));
        self
    }

    pub fn for_kind(&self, kind: JobKind) -> &dyn MacroExpander {
        self.by_kind
            .get(&kind)
            .map_or(&*self.default, |expander| &**expander)
    }
}

impl Default for ExpanderRegistry {
    fn default() -> Self {
        Self::new(EnvExpander)
    }
}

/// The build a name is evaluated against.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub host: &'a dyn Host,
    pub build: &'a Build,
    pub kind: JobKind,
}

/// Why a template could not be turned into a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The template needs a build but none exists yet.
    NoBuildContext,
    EnvironmentUnavailable(HostError),
    Macro(MacroError),
    EmptyResult,
    AbsentResult,
}

impl FallbackReason {
    /// Returns true when the fallback was caused by a failure rather than missing data.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::EnvironmentUnavailable(_) | Self::Macro(_))
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBuildContext => f.write_str("no build to evaluate against"),
            Self::EnvironmentUnavailable(e) => write!(f, "{e}"),
            Self::Macro(e) => write!(f, "{e}"),
            Self::EmptyResult => f.write_str("expansion produced an empty name"),
            Self::AbsentResult => f.write_str("expansion produced no value"),
        }
    }
}

/// Outcome of evaluating a name template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameResolution {
    Resolved(String),
    Fallback(FallbackReason),
}

impl NameResolution {
    pub fn into_name(self, default_name: &str) -> String {
        match self {
            Self::Resolved(name) => name,
            Self::Fallback(_) => default_name.to_string(),
        }
    }
}

/// Returns true if `template` contains a `${...}` or `$NAME` macro expression.
pub fn has_macro(template: &str) -> bool {
    let bytes = template.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'$'
            && match bytes.get(i + 1) {
                Some(b'{') => template[i + 2..].contains('}'),
                Some(&next) => next.is_ascii_alphabetic() || next == b'_',
                None => false,
            }
    })
}

/// Evaluates task display names through an [`ExpanderRegistry`].
pub struct NameEvaluator<'r> {
    registry: &'r ExpanderRegistry,
}

impl<'r> NameEvaluator<'r> {
    pub fn new(registry: &'r ExpanderRegistry) -> Self {
        Self { registry }
    }

    /// Evaluates `template` against the build in `context`.
    ///
    /// Templates without macro syntax are returned unchanged without consulting the host or the
    /// expander, since there may be no build to expand against.
    pub fn evaluate(&self, template: &str, context: Option<BuildContext<'_>>) -> NameResolution {
        if !has_macro(template) {
            return NameResolution::Resolved(template.to_string());
        }

        let Some(context) = context else {
            return NameResolution::Fallback(FallbackReason::NoBuildContext);
        };

        let environment = match context.host.environment(context.build) {
            Ok(environment) => environment,
            Err(e) => return NameResolution::Fallback(FallbackReason::EnvironmentUnavailable(e)),
        };

        match self.registry.for_kind(context.kind).expand(template, &environment) {
            Ok(Some(name)) if !name.is_empty() => NameResolution::Resolved(name),
            Ok(Some(_)) => NameResolution::Fallback(FallbackReason::EmptyResult),
            Ok(None) => NameResolution::Fallback(FallbackReason::AbsentResult),
            Err(e) => NameResolution::Fallback(FallbackReason::Macro(e)),
        }
    }

    /// Evaluates `template` and collapses any fallback to `default_name`.
    pub fn evaluate_name(
        &self,
        template: &str,
        default_name: &str,
        context: Option<BuildContext<'_>>,
    ) -> String {
        let resolution = self.evaluate(template, context);
        if let NameResolution::Fallback(reason) = &resolution {
            if reason.is_failure() {
                warn!("Using default name '{default_name}' for template '{template}': {reason}");
            }
        }
        resolution.into_name(default_name)
    }
}
