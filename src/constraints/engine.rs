//! Alias bindings and symbolic constraints between parameters
//!
//! Aliases are short names bound to a parameter uid. A constraint names a
//! dependent alias and an expression over aliases; applying the constraint
//! set writes each result into its dependent parameter and marks it
//! constrained, which removes it from the free-parameter list.

use crate::constraints::expression::{EvaluationContext, Expression, ExpressionError};
use crate::parameters::{ParameterError, ParameterRef};
use crate::registry::{RegistryError, UidRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur when registering or applying constraints
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("Alias '{alias}' is not defined")]
    UnknownAlias { alias: String },

    #[error("'{alias}' already has a constraint; use replace_constraint to change it")]
    DuplicateDependent { alias: String },

    #[error("No constraint at index {index} (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Constraint on '{alias}': {source}")]
    Expression {
        alias: String,
        #[source]
        source: ExpressionError,
    },

    #[error("Constraint on '{alias}': {source}")]
    Registry {
        alias: String,
        #[source]
        source: RegistryError,
    },

    #[error("Constraint on '{alias}': {source}")]
    Assignment {
        alias: String,
        #[source]
        source: ParameterError,
    },
}

/// Lifecycle of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintState {
    Idle,
    AliasesRegistered,
    ConstraintsRegistered,
    Applied,
}

/// One registered constraint
#[derive(Debug, Clone)]
pub struct Constraint {
    dependent: String,
    expression: String,
    parsed: Result<Expression, ExpressionError>,
}

impl Constraint {
    fn new(dependent: &str, expression: &str) -> Self {
        Self {
            dependent: dependent.to_string(),
            expression: expression.to_string(),
            parsed: Expression::parse(expression),
        }
    }

    pub fn dependent(&self) -> &str {
        &self.dependent
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether the expression text parsed
    pub fn is_well_formed(&self) -> bool {
        self.parsed.is_ok()
    }
}

/// Outcome of one [`ConstraintEngine::apply`] pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Dependent aliases written, in registration order
    pub applied: Vec<String>,

    /// Constraints that could not be applied; the rest still ran
    pub failures: Vec<ConstraintError>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Alias → parameter bindings plus ordered constraints
#[derive(Debug)]
pub struct ConstraintEngine {
    aliases: BTreeMap<String, String>,
    constraints: Vec<Constraint>,
    state: ConstraintState,
}

impl Default for ConstraintEngine {
    fn default() -> Self {
        Self {
            aliases: BTreeMap::new(),
            constraints: Vec::new(),
            state: ConstraintState::Idle,
        }
    }
}

struct AliasContext<'a> {
    aliases: &'a BTreeMap<String, String>,
    registry: &'a UidRegistry,
}

impl EvaluationContext for AliasContext<'_> {
    fn get_variable(&self, name: &str) -> Result<f64, ExpressionError> {
        let undefined = || ExpressionError::UndefinedVariable {
            name: name.to_string(),
        };
        let uid = self.aliases.get(name).ok_or_else(undefined)?;
        let parameter = self.registry.get(uid).map_err(|_| undefined())?;
        Ok(parameter.value())
    }
}

impl ConstraintEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConstraintState {
        self.state
    }

    /// Bind `alias` to the parameter's current uid
    pub fn set_alias(&mut self, alias: &str, parameter: &ParameterRef) {
        self.aliases.insert(alias.to_string(), parameter.uid());
        if self.state == ConstraintState::Idle {
            self.state = ConstraintState::AliasesRegistered;
        }
    }

    /// Replace all alias bindings
    pub fn set_aliases<'a>(&mut self, aliases: impl IntoIterator<Item = (&'a str, &'a ParameterRef)>) {
        self.aliases.clear();
        for (alias, parameter) in aliases {
            self.set_alias(alias, parameter);
        }
    }

    /// uid bound to `alias`
    pub fn alias_uid(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Follow uid changes after a rename, given as old uid → new uid
    ///
    /// # Returns
    ///
    /// Number of aliases that were rebound
    pub fn retarget(&mut self, moves: &BTreeMap<String, String>) -> usize {
        let mut rebound = 0;
        for uid in self.aliases.values_mut() {
            if let Some(new_uid) = moves.get(uid.as_str()) {
                *uid = new_uid.clone();
                rebound += 1;
            }
        }
        rebound
    }

    /// Register `dependent = expression`
    ///
    /// The expression is parsed now, but a malformed one is only reported
    /// when the constraint is applied, alongside evaluation failures.
    ///
    /// # Returns
    ///
    /// [`ConstraintError::DuplicateDependent`] if `dependent` already has a
    /// constraint; the first registration is kept
    pub fn add_constraint(&mut self, dependent: &str, expression: &str) -> Result<(), ConstraintError> {
        if self.position(dependent).is_some() {
            let err = ConstraintError::DuplicateDependent {
                alias: dependent.to_string(),
            };
            tracing::warn!(error = %err, "constraint rejected");
            return Err(err);
        }

        self.constraints.push(Constraint::new(dependent, expression));
        self.state = ConstraintState::ConstraintsRegistered;
        Ok(())
    }

    /// Register or overwrite the constraint on `dependent`, keeping its
    /// position if it existed
    pub fn replace_constraint(&mut self, dependent: &str, expression: &str) {
        let constraint = Constraint::new(dependent, expression);
        match self.position(dependent) {
            Some(pos) => self.constraints[pos] = constraint,
            None => self.constraints.push(constraint),
        }
        self.state = ConstraintState::ConstraintsRegistered;
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Evaluate every constraint in registration order
    ///
    /// Each expression reads the *current* values of its aliases, so a
    /// dependent written earlier in the pass is visible to later ones.
    /// Failures are collected in the report and do not stop the pass.
    pub fn apply(&mut self, registry: &UidRegistry) -> ApplyReport {
        let mut report = ApplyReport::default();

        for constraint in &self.constraints {
            match Self::apply_one(&self.aliases, constraint, registry) {
                Ok(()) => report.applied.push(constraint.dependent.clone()),
                Err(err) => {
                    tracing::debug!(error = %err, "constraint not applied");
                    report.failures.push(err);
                }
            }
        }

        if !self.constraints.is_empty() {
            self.state = ConstraintState::Applied;
        }
        report
    }

    fn apply_one(
        aliases: &BTreeMap<String, String>,
        constraint: &Constraint,
        registry: &UidRegistry,
    ) -> Result<(), ConstraintError> {
        let alias = &constraint.dependent;
        let expression = constraint
            .parsed
            .as_ref()
            .map_err(|source| ConstraintError::Expression {
                alias: alias.clone(),
                source: source.clone(),
            })?;

        let target = Self::resolve(aliases, alias, registry)?;
        let context = AliasContext { aliases, registry };
        let value = expression
            .evaluate(&context)
            .map_err(|source| ConstraintError::Expression {
                alias: alias.clone(),
                source,
            })?;

        let assignment = |source| ConstraintError::Assignment {
            alias: alias.clone(),
            source,
        };
        let mut parameter = target.borrow_mut();
        // under Log a rejected write keeps the old value, so check first
        parameter.validate_value(value).map_err(assignment)?;
        parameter.set_value(value).map_err(assignment)?;
        parameter.set_constrained(true);
        Ok(())
    }

    /// Remove the constraint at `index` (0-based) and release its dependent
    pub fn remove(&mut self, index: usize, registry: &UidRegistry) -> Result<Constraint, ConstraintError> {
        if index >= self.constraints.len() {
            return Err(ConstraintError::IndexOutOfRange {
                index,
                len: self.constraints.len(),
            });
        }

        let constraint = self.constraints.remove(index);
        match Self::resolve(&self.aliases, &constraint.dependent, registry) {
            Ok(parameter) => parameter.borrow_mut().set_constrained(false),
            Err(err) => tracing::warn!(error = %err, "removed constraint had no live dependent"),
        }
        if self.constraints.is_empty() {
            self.state = if self.aliases.is_empty() {
                ConstraintState::Idle
            } else {
                ConstraintState::AliasesRegistered
            };
        }
        Ok(constraint)
    }

    /// Remove every constraint, releasing all dependents
    pub fn clear(&mut self, registry: &UidRegistry) {
        while !self.constraints.is_empty() {
            let last = self.constraints.len() - 1;
            // index is in range, so only the dependent lookup can fail and
            // that is logged inside remove
            let _ = self.remove(last, registry);
        }
    }

    fn resolve<'r>(
        aliases: &BTreeMap<String, String>,
        alias: &str,
        registry: &'r UidRegistry,
    ) -> Result<&'r ParameterRef, ConstraintError> {
        let uid = aliases.get(alias).ok_or_else(|| ConstraintError::UnknownAlias {
            alias: alias.to_string(),
        })?;
        registry.get(uid).map_err(|source| ConstraintError::Registry {
            alias: alias.to_string(),
            source,
        })
    }

    fn position(&self, dependent: &str) -> Option<usize> {
        self.constraints.iter().position(|c| c.dependent == dependent)
    }
}
