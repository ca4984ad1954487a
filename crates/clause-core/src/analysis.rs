//! Running a rule set over a translation unit

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::Config;
use crate::diagnostic::{Reporter, ResultsCollection};
use crate::matcher::MatchFinder;
use crate::rules::{RegistryError, RuleKind, RuleRegistry, RuleSet, create_default_registry};
use crate::symbolic::{EngineConfig, ExplorationStats, SymbolicEngine};
use crate::syntax::SyntaxTree;

/// What one call to [`run_rules`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub structural_rules: usize,
    pub symbolic_rules: usize,
    /// Structural callbacks invoked.
    pub matches: usize,
    pub reported: usize,
    /// Reports dropped because their (rule, file, line) was already reported.
    pub suppressed: usize,
    /// Structural callbacks that returned an error or panicked.
    pub rule_failures: usize,
    pub exploration: ExplorationStats,
}

/// Installs the selected rules, runs one structural traversal and one
/// symbolic exploration over `tree`, and appends diagnostics to `results`.
pub fn run_rules(tree: &SyntaxTree, rules: &RuleSet<'_>, results: &ResultsCollection) -> RunSummary {
    run_rules_with(tree, rules, results, EngineConfig::default())
}

pub fn run_rules_with(
    tree: &SyntaxTree,
    rules: &RuleSet<'_>,
    results: &ResultsCollection,
    engine_config: EngineConfig,
) -> RunSummary {
    let mut summary = RunSummary::default();
    let mut reporter = Reporter::new(tree, results);
    let failures = Cell::new(0usize);

    {
        let mut finder: MatchFinder<'_, Reporter<'_>> = MatchFinder::new();
        for active in rules.iter() {
            let RuleKind::Structural(rule) = active.kind() else {
                continue;
            };
            let tag = active.tag();
            let failures = &failures;
            finder.register_pattern(rule.pattern(), move |result, reporter| {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    let mut scoped = reporter.scoped(tag);
                    rule.on_match(result, &mut scoped)
                }));
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        failures.set(failures.get() + 1);
                        tracing::warn!(rule = tag.id, error = %err, "rule callback failed");
                    }
                    Err(_) => {
                        failures.set(failures.get() + 1);
                        tracing::warn!(rule = tag.id, "rule callback panicked");
                    }
                }
            });
        }
        summary.structural_rules = finder.len();
        summary.matches = finder.match_tree(tree, &mut reporter);
    }
    summary.rule_failures = failures.get();

    let mut engine = SymbolicEngine::new(engine_config);
    for active in rules.iter() {
        if let RuleKind::Symbolic { points, checker } = active.kind() {
            engine.register(active.tag(), points, &**checker);
        }
    }
    summary.symbolic_rules = engine.len();
    summary.exploration = engine.run(tree, &mut reporter);

    summary.reported = reporter.reported();
    summary.suppressed = reporter.suppressed();
    tracing::debug!(
        structural = summary.structural_rules,
        symbolic = summary.symbolic_rules,
        reported = summary.reported,
        suppressed = summary.suppressed,
        "rules finished"
    );
    summary
}

/// A registry plus configuration, shared by every translation unit of a run.
#[derive(Clone)]
pub struct AnalysisEngine {
    registry: Arc<RuleRegistry>,
    config: Config,
}

impl AnalysisEngine {
    pub fn new(registry: Arc<RuleRegistry>, config: Config) -> Self {
        Self { registry, config }
    }

    /// The built-in rules under `config`.
    pub fn with_config(config: &Config) -> Result<Self, RegistryError> {
        Ok(Self::new(Arc::new(create_default_registry()?), config.clone()))
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rule_set(&self) -> RuleSet<'_> {
        self.registry.select(&self.config.rules)
    }

    pub fn analyze(&self, tree: &SyntaxTree, results: &ResultsCollection) -> RunSummary {
        run_rules_with(tree, &self.rule_set(), results, self.config.analysis.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use crate::diagnostic::RuleReporter;
    use crate::matcher::dsl::*;
    use crate::matcher::{MatchResult, Matcher};
    use crate::rules::{Rule, RuleCategory, RuleError, RuleMetadata, Severity, StructuralRule};
    use crate::syntax::{CastKind, TreeBuilder, TypeInfo};

    fn metadata(id: &'static str) -> RuleMetadata {
        RuleMetadata {
            id,
            name: id,
            description: "test",
            category: RuleCategory::Misra,
            severity: Severity::Warning,
            error_kind: None,
            docs_url: None,
            examples: None,
        }
    }

    /// Reports every cast it sees, or fails in the configured way.
    struct CastRule {
        metadata: RuleMetadata,
        pattern: Matcher,
        behavior: Behavior,
    }

    #[derive(Clone, Copy)]
    enum Behavior {
        Report,
        Fail,
        Panic,
    }

    impl CastRule {
        fn new(id: &'static str, behavior: Behavior) -> Self {
            Self {
                metadata: metadata(id),
                pattern: c_style_cast_expr([]).bind("cast"),
                behavior,
            }
        }
    }

    impl Rule for CastRule {
        fn metadata(&self) -> &RuleMetadata {
            &self.metadata
        }
    }

    impl StructuralRule for CastRule {
        fn pattern(&self) -> &Matcher {
            &self.pattern
        }

        fn on_match(
            &self,
            result: &MatchResult<'_>,
            reporter: &mut RuleReporter<'_, '_>,
        ) -> Result<(), RuleError> {
            match self.behavior {
                Behavior::Report => {
                    reporter.report(result.node, "cast");
                    Ok(())
                }
                Behavior::Fail => Err(RuleError::Other("unsupported".into())),
                Behavior::Panic => panic!("rule bug"),
            }
        }
    }

    fn tree() -> SyntaxTree {
        let mut b = TreeBuilder::new();
        let file = b.add_file("a.c", false);
        b.at(file, 3);
        let lit = b.int_literal(1);
        b.c_cast(CastKind::IntegralCast, lit, TypeInfo::integral("long"));
        b.finish()
    }

    #[test]
    fn failing_rules_do_not_block_others() {
        let mut registry = RuleRegistry::new();
        registry.register_structural(CastRule::new("fail", Behavior::Fail)).unwrap();
        registry.register_structural(CastRule::new("panic", Behavior::Panic)).unwrap();
        registry.register_structural(CastRule::new("ok", Behavior::Report)).unwrap();

        let results = ResultsCollection::new();
        let summary = run_rules(&tree(), &registry.all(), &results);

        let diagnostics = results.into_inner();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule_id, "ok");
        assert_eq!(diagnostics[0].line, 3);
        assert_eq!(summary.rule_failures, 2);
        assert_eq!(summary.matches, 3);
        assert_eq!(summary.structural_rules, 3);
        assert_eq!(summary.symbolic_rules, 0);
    }

    #[test]
    fn unselected_rules_do_not_run() {
        let mut registry = RuleRegistry::new();
        registry.register_structural(CastRule::new("a", Behavior::Report)).unwrap();
        registry.register_structural(CastRule::new("b", Behavior::Report)).unwrap();

        let config = RulesConfig {
            disabled: vec!["a".to_string()],
            ..Default::default()
        };
        let results = ResultsCollection::new();
        run_rules(&tree(), &registry.select(&config), &results);

        let ids: Vec<_> = results.into_inner().into_iter().map(|d| d.rule_id).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<AnalysisEngine>();
    }

    #[test]
    fn engine_applies_config() {
        let mut config = Config::default();
        config.rules.enabled = vec!["misra-c2012-11.4".to_string()];
        let engine = AnalysisEngine::with_config(&config).unwrap();

        assert_eq!(engine.registry().len(), 9);
        assert_eq!(engine.rule_set().len(), 1);
        assert!(engine.rule_set().contains("misra-c2012-11.4"));
    }
}
