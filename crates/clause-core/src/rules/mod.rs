//! Rule system for conformance checking
//!
//! Every rule is either structural (a tree pattern plus a callback run by the
//! [`MatchFinder`](crate::matcher::MatchFinder)) or symbolic (a
//! [`Checker`] subscribed to program points of the symbolic engine). The
//! [`RuleRegistry`] is filled once at startup and only read afterwards.

pub mod structural;
pub mod symbolic;

use std::collections::{HashMap, HashSet};

use crate::config::RulesConfig;
use crate::diagnostic::{RuleReporter, RuleTag};
use crate::matcher::{MatchResult, Matcher};
use crate::symbolic::{Checker, ProgramPointKind};
use crate::syntax::NodeId;

pub use crate::diagnostic::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    Misra,
    Autosar,
    Cwe,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Misra => "misra",
            RuleCategory::Autosar => "autosar",
            RuleCategory::Cwe => "cwe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMetadata {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: RuleCategory,
    pub severity: Severity,
    /// Classifier copied onto every diagnostic of the rule.
    pub error_kind: Option<&'static str>,
    pub docs_url: Option<&'static str>,
    pub examples: Option<&'static str>,
}

pub trait Rule: Send + Sync {
    fn metadata(&self) -> &RuleMetadata;
}

/// A failure inside one rule's callback. It is logged and isolated; other
/// rules in the run are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("unexpected node shape at node #{}: {message}", .node.index())]
    UnexpectedShape { node: NodeId, message: String },
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("rule '{0}' is registered more than once")]
    DuplicateRule(String),
}

pub trait StructuralRule: Send + Sync {
    /// The pattern, built once when the rule is constructed.
    fn pattern(&self) -> &Matcher;

    fn on_match(
        &self,
        result: &MatchResult<'_>,
        reporter: &mut RuleReporter<'_, '_>,
    ) -> Result<(), RuleError>;
}

pub enum RuleKind {
    Structural(Box<dyn StructuralRule>),
    Symbolic {
        points: Vec<ProgramPointKind>,
        checker: Box<dyn Checker>,
    },
}

impl RuleKind {
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::Structural(_) => "structural",
            RuleKind::Symbolic { .. } => "symbolic",
        }
    }
}

pub struct RegisteredRule {
    metadata: RuleMetadata,
    kind: RuleKind,
}

impl RegisteredRule {
    pub fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }
}

#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<RegisteredRule>,
    ids: HashSet<&'static str>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, metadata: RuleMetadata, kind: RuleKind) -> Result<(), RegistryError> {
        if !self.ids.insert(metadata.id) {
            return Err(RegistryError::DuplicateRule(metadata.id.to_string()));
        }
        self.rules.push(RegisteredRule { metadata, kind });
        Ok(())
    }

    pub fn register_structural<R>(&mut self, rule: R) -> Result<(), RegistryError>
    where
        R: Rule + StructuralRule + 'static,
    {
        let metadata = rule.metadata().clone();
        self.register(metadata, RuleKind::Structural(Box::new(rule)))
    }

    pub fn register_symbolic<R>(&mut self, rule: R, points: &[ProgramPointKind]) -> Result<(), RegistryError>
    where
        R: Rule + Checker + 'static,
    {
        let metadata = rule.metadata().clone();
        self.register(
            metadata,
            RuleKind::Symbolic {
                points: points.to_vec(),
                checker: Box::new(rule),
            },
        )
    }

    pub fn rules(&self) -> impl Iterator<Item = &RegisteredRule> {
        self.rules.iter()
    }

    pub fn get_rule(&self, id: &str) -> Option<&RegisteredRule> {
        self.rules.iter().find(|r| r.metadata.id == id)
    }

    pub fn get_rule_by_name(&self, name: &str) -> Option<&RegisteredRule> {
        self.rules.iter().find(|r| r.metadata.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every registered rule at its default severity.
    pub fn all(&self) -> RuleSet<'_> {
        RuleSet::select(self, &RulesConfig::default())
    }

    pub fn select(&self, config: &RulesConfig) -> RuleSet<'_> {
        RuleSet::select(self, config)
    }

    pub fn is_rule_enabled(&self, id_or_name: &str, config: &RulesConfig) -> bool {
        let Some(rule) = self
            .get_rule(id_or_name)
            .or_else(|| self.get_rule_by_name(id_or_name))
        else {
            return false;
        };
        should_run_rule(&rule.metadata, config)
    }
}

/// A selected rule with its effective severity.
pub struct ActiveRule<'r> {
    rule: &'r RegisteredRule,
    severity: Severity,
}

impl<'r> ActiveRule<'r> {
    pub fn metadata(&self) -> &'r RuleMetadata {
        &self.rule.metadata
    }

    pub fn kind(&self) -> &'r RuleKind {
        &self.rule.kind
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn tag(&self) -> RuleTag<'r> {
        RuleTag {
            id: self.rule.metadata.id,
            severity: self.severity,
            error_kind: self.rule.metadata.error_kind,
        }
    }
}

/// The rules chosen for a run, in registration order.
pub struct RuleSet<'r> {
    rules: Vec<ActiveRule<'r>>,
}

impl<'r> RuleSet<'r> {
    pub fn select(registry: &'r RuleRegistry, config: &RulesConfig) -> Self {
        let overrides: HashMap<&str, Severity> = config
            .severity
            .iter()
            .map(|(rule_ref, value)| (rule_ref.as_str(), (*value).into()))
            .collect();

        let rules = registry
            .rules
            .iter()
            .filter(|rule| should_run_rule(&rule.metadata, config))
            .map(|rule| {
                let severity = overrides
                    .get(rule.metadata.id)
                    .or_else(|| overrides.get(rule.metadata.name))
                    .copied()
                    .unwrap_or(rule.metadata.severity);
                ActiveRule { rule, severity }
            })
            .collect();
        Self { rules }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveRule<'r>> {
        self.rules.iter()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.iter().any(|r| r.metadata().id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn should_run_rule(metadata: &RuleMetadata, config: &RulesConfig) -> bool {
    let matches = |rule_ref: &String| rule_ref == metadata.id || rule_ref == metadata.name;

    if !config.enabled.is_empty() && !config.enabled.iter().any(matches) {
        return false;
    }
    if config.disabled.iter().any(matches) {
        return false;
    }

    let standard_enabled = match metadata.category {
        RuleCategory::Misra => config.misra,
        RuleCategory::Autosar => config.autosar,
        RuleCategory::Cwe => config.cwe,
    };
    standard_enabled.unwrap_or(true)
}

/// All built-in rules.
pub fn create_default_registry() -> Result<RuleRegistry, RegistryError> {
    let mut registry = RuleRegistry::new();

    registry.register_structural(structural::PointerIntegerCast::new())?;
    registry.register_structural(structural::AssignmentAsValue::new())?;
    registry.register_structural(structural::ParameterModified::new())?;
    registry.register_structural(structural::UnionOverlap::new())?;
    registry.register_structural(structural::VirtualMemberPointerCompare::new())?;

    registry.register_symbolic(symbolic::TaintedFormatString::new(), symbolic::TaintedFormatString::POINTS)?;
    registry.register_symbolic(symbolic::PointerCastProvenance::new(), symbolic::PointerCastProvenance::POINTS)?;
    registry.register_symbolic(symbolic::PointerComparison::new(), symbolic::PointerComparison::POINTS)?;
    registry.register_symbolic(symbolic::PointerSubtraction::new(), symbolic::PointerSubtraction::POINTS)?;

    Ok(registry)
}

/// Runs a single structural rule over `tree` and returns its diagnostics.
#[cfg(test)]
pub(crate) fn check_structural<R>(rule: R, tree: &crate::syntax::SyntaxTree) -> Vec<crate::diagnostic::Diagnostic>
where
    R: Rule + StructuralRule + 'static,
{
    let mut registry = RuleRegistry::new();
    registry
        .register_structural(rule)
        .expect("single rule registers");
    let results = crate::diagnostic::ResultsCollection::new();
    crate::analysis::run_rules(tree, &registry.all(), &results);
    results.into_inner()
}

/// Runs a single symbolic rule over `tree` and returns its diagnostics.
#[cfg(test)]
pub(crate) fn check_symbolic<R>(
    rule: R,
    points: &[ProgramPointKind],
    tree: &crate::syntax::SyntaxTree,
) -> Vec<crate::diagnostic::Diagnostic>
where
    R: Rule + Checker + 'static,
{
    let mut registry = RuleRegistry::new();
    registry
        .register_symbolic(rule, points)
        .expect("single rule registers");
    let results = crate::diagnostic::ResultsCollection::new();
    crate::analysis::run_rules(tree, &registry.all(), &results);
    results.into_inner()
}

#[macro_export]
macro_rules! declare_rule {
    (
        $name:ident,
        id = $id:literal,
        name = $rule_name:literal,
        description = $desc:literal,
        category = $cat:ident,
        severity = $sev:ident
        $(, error_kind = $kind:literal)?
        $(, docs_url = $url:literal)?
        $(, examples = $examples:literal)?
        $(, fields { $($field:ident : $fty:ty = $init:expr),* $(,)? })?
    ) => {
        pub struct $name {
            metadata: $crate::rules::RuleMetadata,
            $($($field: $fty,)*)?
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    metadata: $crate::rules::RuleMetadata {
                        id: $id,
                        name: $rule_name,
                        description: $desc,
                        category: $crate::rules::RuleCategory::$cat,
                        severity: $crate::rules::Severity::$sev,
                        error_kind: $crate::declare_rule!(@opt $($kind)?),
                        docs_url: $crate::declare_rule!(@opt $($url)?),
                        examples: $crate::declare_rule!(@opt $($examples)?),
                    },
                    $($($field: $init,)*)?
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $crate::rules::Rule for $name {
            fn metadata(&self) -> &$crate::rules::RuleMetadata {
                &self.metadata
            }
        }
    };
    (@opt $value:literal) => { Some($value) };
    (@opt) => { None };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeverityValue;
    use crate::matcher::dsl::*;

    struct TestRule {
        metadata: RuleMetadata,
        pattern: Matcher,
    }

    impl TestRule {
        fn new(id: &'static str) -> Self {
            Self {
                metadata: RuleMetadata {
                    id,
                    name: "test-rule",
                    description: "A test rule",
                    category: RuleCategory::Misra,
                    severity: Severity::Warning,
                    error_kind: None,
                    docs_url: None,
                    examples: None,
                },
                pattern: call_expr([]),
            }
        }

        fn with_name(mut self, name: &'static str) -> Self {
            self.metadata.name = name;
            self
        }

        fn with_category(mut self, category: RuleCategory) -> Self {
            self.metadata.category = category;
            self
        }
    }

    impl Rule for TestRule {
        fn metadata(&self) -> &RuleMetadata {
            &self.metadata
        }
    }

    impl StructuralRule for TestRule {
        fn pattern(&self) -> &Matcher {
            &self.pattern
        }

        fn on_match(
            &self,
            _result: &MatchResult<'_>,
            _reporter: &mut RuleReporter<'_, '_>,
        ) -> Result<(), RuleError> {
            Ok(())
        }
    }

    struct NoopChecker {
        metadata: RuleMetadata,
    }

    impl Rule for NoopChecker {
        fn metadata(&self) -> &RuleMetadata {
            &self.metadata
        }
    }

    impl Checker for NoopChecker {}

    fn ids(set: &RuleSet<'_>) -> Vec<&'static str> {
        set.iter().map(|r| r.metadata().id).collect()
    }

    #[test]
    fn registry_keeps_registration_order() {
        let mut registry = RuleRegistry::new();
        registry.register_structural(TestRule::new("T001")).unwrap();
        registry.register_structural(TestRule::new("T002")).unwrap();
        registry.register_structural(TestRule::new("T003")).unwrap();

        let rules: Vec<_> = registry.rules().map(|r| r.metadata().id).collect();
        assert_eq!(rules, vec!["T001", "T002", "T003"]);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut registry = RuleRegistry::new();
        registry.register_structural(TestRule::new("T001")).unwrap();

        let err = registry
            .register_symbolic(
                NoopChecker {
                    metadata: TestRule::new("T001").metadata,
                },
                &[ProgramPointKind::PreCall],
            )
            .unwrap_err();

        assert!(matches!(err, RegistryError::DuplicateRule(ref id) if id == "T001"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn rule_kind_is_kept() {
        let mut registry = RuleRegistry::new();
        registry
            .register_symbolic(
                NoopChecker {
                    metadata: TestRule::new("T002").metadata,
                },
                &[ProgramPointKind::PostCast],
            )
            .unwrap();

        let rule = registry.get_rule("T002").unwrap();
        assert_eq!(rule.kind().label(), "symbolic");
        match rule.kind() {
            RuleKind::Symbolic { points, .. } => assert_eq!(points, &[ProgramPointKind::PostCast]),
            RuleKind::Structural(_) => panic!("expected a symbolic rule"),
        }
    }

    #[test]
    fn get_rule_by_name_finds_rule() {
        let mut registry = RuleRegistry::new();
        registry
            .register_structural(TestRule::new("T001").with_name("pointer-cast"))
            .unwrap();

        assert_eq!(registry.get_rule_by_name("pointer-cast").unwrap().metadata().id, "T001");
        assert!(registry.get_rule("UNKNOWN").is_none());
    }

    #[test]
    fn enabled_list_restricts_selection() {
        let mut registry = RuleRegistry::new();
        registry.register_structural(TestRule::new("T001")).unwrap();
        registry.register_structural(TestRule::new("T002")).unwrap();

        let config = RulesConfig {
            enabled: vec!["T002".to_string()],
            ..Default::default()
        };
        assert_eq!(ids(&registry.select(&config)), vec!["T002"]);
    }

    #[test]
    fn disabled_by_id_or_name() {
        let mut registry = RuleRegistry::new();
        registry.register_structural(TestRule::new("T001")).unwrap();
        registry
            .register_structural(TestRule::new("T002").with_name("second"))
            .unwrap();

        let config = RulesConfig {
            disabled: vec!["T001".to_string(), "second".to_string()],
            ..Default::default()
        };
        assert!(registry.select(&config).is_empty());
        assert!(!registry.is_rule_enabled("second", &config));
    }

    #[test]
    fn standard_toggle_disables_category() {
        let mut registry = RuleRegistry::new();
        registry.register_structural(TestRule::new("T001")).unwrap();
        registry
            .register_structural(TestRule::new("T002").with_category(RuleCategory::Autosar))
            .unwrap();

        let config = RulesConfig {
            misra: Some(false),
            ..Default::default()
        };
        assert_eq!(ids(&registry.select(&config)), vec!["T002"]);
    }

    #[test]
    fn severity_override_changes_tag() {
        let mut registry = RuleRegistry::new();
        registry.register_structural(TestRule::new("T001")).unwrap();

        let mut config = RulesConfig::default();
        config.severity.insert("T001".to_string(), SeverityValue::Error);

        let set = registry.select(&config);
        let active = set.iter().next().unwrap();
        assert_eq!(active.severity(), Severity::Error);
        assert_eq!(active.tag().severity, Severity::Error);
        assert_eq!(registry.all().iter().next().unwrap().severity(), Severity::Warning);
    }

    #[test]
    fn default_registry_has_unique_ids() {
        let registry = create_default_registry().unwrap();
        assert_eq!(registry.len(), 9);
        assert!(registry.get_rule("misra-c2012-18.3").is_some());
        assert!(registry.get_rule("cwe-134").is_some());
    }

    #[test]
    fn rule_error_display_names_node() {
        let mut builder = crate::syntax::TreeBuilder::new();
        let node = builder.int_literal(1);
        let err = RuleError::UnexpectedShape {
            node,
            message: "missing operand".into(),
        };
        assert!(err.to_string().contains("missing operand"));
    }
}
