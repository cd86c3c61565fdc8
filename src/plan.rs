//! Plans: the validated, topologically ordered output of the planner.

use std::fmt;
use std::fmt::Write as _;

use crate::binding::{AssistedSpec, ElementSource};
use crate::functoid::{AnyArc, Functoid};
use crate::key::Key;

/// A validated execution plan: every step's dependencies appear earlier in
/// the list or are served by the parent locator at production time.
#[derive(Clone)]
pub struct Plan {
    steps: Vec<PlanStep>,
    roots: Vec<Key>,
}

impl Plan {
    pub(crate) fn new(steps: Vec<PlanStep>, roots: Vec<Key>) -> Plan {
        Plan { steps, roots }
    }

    /// The steps, in execution order.
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// The root keys the plan was computed for.
    pub fn roots(&self) -> &[Key] {
        &self.roots
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The step producing `key`, if the plan contains one.
    pub fn step_for(&self, key: &Key) -> Option<&PlanStep> {
        self.steps.iter().find(|s| &s.key == key)
    }

    /// Whether any step invokes an asynchronous functoid.
    pub fn has_async(&self) -> bool {
        self.steps.iter().any(|s| s.action.is_async())
    }

    /// A multi-line rendering of the plan for startup diagnostics.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            let _ = write!(out, "{} <- {}", step.key, step.action.kind_name());
            if !step.deps.is_empty() {
                let deps: Vec<String> = step.deps.iter().map(|d| d.to_string()).collect();
                let _ = write!(out, " [{}]", deps.join(", "));
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plan({} steps, {} roots)", self.steps.len(), self.roots.len())
    }
}

/// One step of a plan: a key, the action producing its value, and the keys
/// the action consumes.
#[derive(Clone)]
pub struct PlanStep {
    pub(crate) key: Key,
    pub(crate) action: StepAction,
    pub(crate) deps: Vec<Key>,
}

impl PlanStep {
    /// The key this step produces.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The keys this step consumes, possibly served by a parent locator.
    pub fn deps(&self) -> &[Key] {
        &self.deps
    }

    /// The action.
    pub fn action(&self) -> &StepAction {
        &self.action
    }
}

impl fmt::Debug for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlanStep({} <- {})", self.key, self.action.kind_name())
    }
}

/// What a plan step does when executed.
#[derive(Clone)]
pub enum StepAction {
    /// Store a pre-built value.
    Instance(AnyArc),
    /// Invoke a functoid with resolved dependency values.
    Invoke(Functoid),
    /// Store the value already produced for another key.
    Alias(Key),
    /// Build every surviving element and store the collection.
    Collect(Vec<ElementPlan>),
    /// Store a curried factory handle.
    Assisted(AssistedSpec),
}

impl StepAction {
    /// Short kind name for summaries and graph exports.
    pub fn kind_name(&self) -> &'static str {
        match self {
            StepAction::Instance(_) => "instance",
            StepAction::Invoke(_) => "invoke",
            StepAction::Alias(_) => "alias",
            StepAction::Collect(_) => "collect",
            StepAction::Assisted(_) => "assisted",
        }
    }

    pub(crate) fn is_async(&self) -> bool {
        match self {
            StepAction::Invoke(f) => f.is_async(),
            StepAction::Collect(elements) => elements.iter().any(|e| e.source.is_async()),
            _ => false,
        }
    }
}

/// One surviving element of a collection step.
#[derive(Clone)]
pub struct ElementPlan {
    pub(crate) source: ElementSource,
    pub(crate) deps: Vec<Key>,
    pub(crate) weak: bool,
}

impl ElementPlan {
    /// The keys this element's construction consumes.
    pub fn deps(&self) -> &[Key] {
        &self.deps
    }

    /// Whether the element may be skipped if construction fails at runtime.
    pub fn is_weak(&self) -> bool {
        self.weak
    }
}
