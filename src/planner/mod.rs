//! The planner: activation-aware resolution of a module into a plan.
//!
//! Planning is purely computational: it never invokes user factories, takes
//! no locks, and holds no state across invocations. Traversal is depth-first
//! from each root; every candidate set is filtered against the base
//! activation and the constraints accumulated along the current path, the
//! most specific survivor wins, and set elements accumulate instead of
//! competing. A second, explicit topological sort orders the collected steps
//! because set accumulation can record them out of post-order.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::axis::Activation;
use crate::binding::{Binding, BindingKind, SetElement};
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::locator::Locator;
use crate::module::Module;
use crate::plan::{ElementPlan, Plan, PlanStep, StepAction};

mod path;

use path::PathActivation;

/// Computes a plan for the given roots, or fails without side effects.
pub(crate) fn plan(
    module: &Module,
    roots: &[Key],
    activation: &Activation,
    parent: Option<&Locator>,
) -> DiResult<Plan> {
    let mut index: HashMap<Key, Vec<&Binding>> = HashMap::new();
    for binding in module.bindings() {
        index.entry(binding.key().clone()).or_default().push(binding);
    }

    let mut traversal = Traversal {
        index,
        activation,
        parent,
        visiting: HashSet::new(),
        visited: HashSet::new(),
        steps: HashMap::new(),
        order: Vec::new(),
        path: Vec::new(),
    };

    for root in roots {
        traversal.visit(root, &PathActivation::default())?;
    }

    let steps = toposort(traversal.steps, &traversal.order);
    Ok(Plan::new(steps, roots.to_vec()))
}

enum Selected<'a> {
    One(&'a Binding),
    Elements(Vec<&'a Binding>),
}

struct Traversal<'a> {
    index: HashMap<Key, Vec<&'a Binding>>,
    activation: &'a Activation,
    parent: Option<&'a Locator>,
    visiting: HashSet<Key>,
    visited: HashSet<Key>,
    steps: HashMap<Key, PlanStep>,
    order: Vec<Key>,
    path: Vec<Key>,
}

struct Checkpoint {
    visited: HashSet<Key>,
    steps: HashMap<Key, PlanStep>,
    order_len: usize,
}

fn recoverable(error: &DiError) -> bool {
    matches!(
        error,
        DiError::MissingDependency { .. } | DiError::AxisConflict { .. }
    )
}

impl<'a> Traversal<'a> {
    fn visit(&mut self, key: &Key, path_activation: &PathActivation) -> DiResult<()> {
        if self.visited.contains(key) {
            return Ok(());
        }
        if self.visiting.contains(key) {
            let start = self.path.iter().position(|k| k == key).unwrap_or(0);
            let mut cycle: Vec<Key> = self.path[start..].to_vec();
            cycle.push(key.clone());
            return Err(DiError::CircularDependency { cycle });
        }

        let candidates: Vec<&'a Binding> = self.index.get(key).cloned().unwrap_or_default();
        if candidates.is_empty() {
            if self.parent.is_some_and(|p| p.has(key)) {
                // Served by an ancestor locator; nothing to plan.
                self.visited.insert(key.clone());
                return Ok(());
            }
            return Err(DiError::MissingDependency {
                key: key.clone(),
                required_by: self.path.last().cloned(),
            });
        }

        let selected = self.select(key, &candidates, path_activation)?;

        self.visiting.insert(key.clone());
        self.path.push(key.clone());
        let outcome = match selected {
            Selected::One(binding) => self.plan_single(key, binding, path_activation),
            Selected::Elements(elements) => self.plan_elements(key, elements, path_activation),
        };
        self.path.pop();
        self.visiting.remove(key);

        let step = outcome?;
        self.steps.insert(key.clone(), step);
        self.order.push(key.clone());
        self.visited.insert(key.clone());
        Ok(())
    }

    fn select(
        &self,
        key: &Key,
        candidates: &[&'a Binding],
        path_activation: &PathActivation,
    ) -> DiResult<Selected<'a>> {
        let base_matched: Vec<&'a Binding> = candidates
            .iter()
            .copied()
            .filter(|b| b.tags().matches(self.activation))
            .collect();
        let valid: Vec<&'a Binding> = base_matched
            .iter()
            .copied()
            .filter(|b| path_activation.admits(b.tags()))
            .collect();

        if valid.is_empty() {
            if let Some(rejected) = base_matched.first() {
                return Err(DiError::AxisConflict {
                    key: key.clone(),
                    required_by: self.path.last().cloned(),
                    constraint: path_activation.describe_rejection(rejected.tags()),
                });
            }
            // No candidate matched the activation; a candidate tagged with a
            // choice the activation contradicts is an axis conflict, while a
            // candidate the activation is merely silent about is missing.
            if let Some(constraint) = candidates
                .iter()
                .find_map(|b| self.activation_contradiction(b.tags()))
            {
                return Err(DiError::AxisConflict {
                    key: key.clone(),
                    required_by: self.path.last().cloned(),
                    constraint,
                });
            }
            return Err(DiError::MissingDependency {
                key: key.clone(),
                required_by: self.path.last().cloned(),
            });
        }

        let element_count = valid.iter().filter(|b| b.is_element()).count();
        if element_count == valid.len() {
            return Ok(Selected::Elements(valid));
        }
        if element_count > 0 {
            // A plain binding and set elements competing for one key has no
            // defined precedence.
            return Err(DiError::ConflictingBindings {
                key: key.clone(),
                bindings: valid.iter().map(|b| b.describe()).collect(),
            });
        }

        let max_specificity = valid
            .iter()
            .map(|b| b.tags().specificity())
            .max()
            .unwrap_or(0);
        let most_specific: Vec<&'a Binding> = valid
            .into_iter()
            .filter(|b| b.tags().specificity() == max_specificity)
            .collect();
        if most_specific.len() == 1 {
            Ok(Selected::One(most_specific[0]))
        } else {
            Err(DiError::ConflictingBindings {
                key: key.clone(),
                bindings: most_specific.iter().map(|b| b.describe()).collect(),
            })
        }
    }

    /// A rendered description when the base activation selects a different
    /// choice than a tag on the same axis.
    fn activation_contradiction(&self, tags: &crate::axis::BindingTags) -> Option<String> {
        for point in tags.points() {
            let axis = point.axis().name();
            if let Some(selected) = self.activation.choice_for(axis) {
                if selected != point.choice() {
                    return Some(format!(
                        "axis {} must be {} but candidate is tagged {}",
                        axis,
                        selected,
                        point.choice()
                    ));
                }
            }
        }
        None
    }

    fn plan_single(
        &mut self,
        key: &Key,
        binding: &Binding,
        path_activation: &PathActivation,
    ) -> DiResult<PlanStep> {
        let mut scope = path_activation.clone();
        scope.constrain(binding.tags());

        let (action, deps) = match binding.kind() {
            BindingKind::Instance(value) => (StepAction::Instance(value.clone()), Vec::new()),
            BindingKind::Construct(functoid) | BindingKind::Factory(functoid) => {
                let deps = functoid.deps().to_vec();
                for dep in &deps {
                    self.visit(dep, &scope)?;
                }
                (StepAction::Invoke(functoid.clone()), deps)
            }
            BindingKind::Alias(target) => {
                self.visit(target, &scope)?;
                (StepAction::Alias(target.clone()), vec![target.clone()])
            }
            // The handle resolves its DI'd tail per call, so the step needs
            // no ordering edges, but the tail keys must still be produced
            // into the locator for those calls to find.
            BindingKind::Assisted(spec) => {
                for dep in &spec.functoid.deps()[spec.runtime_params.len()..] {
                    self.visit(dep, &scope)?;
                }
                (StepAction::Assisted(spec.clone()), Vec::new())
            }
            BindingKind::Element(_) => {
                unreachable!("set elements accumulate and are planned together")
            }
        };

        Ok(PlanStep { key: key.clone(), action, deps })
    }

    fn plan_elements(
        &mut self,
        key: &Key,
        elements: Vec<&Binding>,
        path_activation: &PathActivation,
    ) -> DiResult<PlanStep> {
        let mut plans: Vec<ElementPlan> = Vec::new();
        let mut deps: Vec<Key> = Vec::new();

        for binding in elements {
            let element: &SetElement = match binding.kind() {
                BindingKind::Element(element) => element,
                _ => unreachable!("only elements reach set planning"),
            };
            let mut scope = path_activation.clone();
            scope.constrain(binding.tags());

            let element_deps = element.source.deps();
            let checkpoint = self.checkpoint();
            let failure = element_deps
                .iter()
                .find_map(|dep| self.visit(dep, &scope).err());

            match failure {
                None => {
                    for dep in &element_deps {
                        if !deps.contains(dep) {
                            deps.push(dep.clone());
                        }
                    }
                    plans.push(ElementPlan {
                        source: element.source.clone(),
                        deps: element_deps,
                        weak: element.weak,
                    });
                }
                Some(error) if element.weak && recoverable(&error) => {
                    // Drop the weak element and any steps its subtree added.
                    self.restore(checkpoint);
                }
                Some(error) => return Err(error),
            }
        }

        Ok(PlanStep { key: key.clone(), action: StepAction::Collect(plans), deps })
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            visited: self.visited.clone(),
            steps: self.steps.clone(),
            order_len: self.order.len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.visited = checkpoint.visited;
        self.steps = checkpoint.steps;
        self.order.truncate(checkpoint.order_len);
    }
}

/// Kahn's algorithm over the collected steps, seeded in emission order so
/// the result is deterministic. Dependencies served by a parent locator
/// have no step and impose no edge.
fn toposort(mut steps: HashMap<Key, PlanStep>, order: &[Key]) -> Vec<PlanStep> {
    let mut indegree: HashMap<Key, usize> = HashMap::new();
    let mut dependents: HashMap<Key, Vec<Key>> = HashMap::new();

    for key in order {
        let step = &steps[key];
        let local: HashSet<&Key> = step
            .deps
            .iter()
            .filter(|dep| *dep != key && steps.contains_key(*dep))
            .collect();
        indegree.insert(key.clone(), local.len());
        for dep in local {
            dependents.entry(dep.clone()).or_default().push(key.clone());
        }
    }

    let mut queue: VecDeque<Key> = order
        .iter()
        .filter(|key| indegree[*key] == 0)
        .cloned()
        .collect();
    let mut sorted = Vec::with_capacity(order.len());

    while let Some(key) = queue.pop_front() {
        if let Some(step) = steps.remove(&key) {
            sorted.push(step);
        }
        if let Some(children) = dependents.remove(&key) {
            for child in children {
                let remaining = indegree
                    .get_mut(&child)
                    .expect("dependent key missing from indegree map");
                *remaining -= 1;
                if *remaining == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    debug_assert!(steps.is_empty(), "toposort left steps behind; cycle slipped past traversal");
    sorted
}
