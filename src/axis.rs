//! Configuration axes, activations, and binding tags.
//!
//! An axis is a named dimension with a finite set of choices (environment,
//! storage backend, tenant tier). A produce call picks one choice per axis
//! through an [`Activation`]; bindings opt into axes through [`BindingTags`].
//! The planner then selects, for every key, the most specific binding whose
//! tags match the activation and the constraints accumulated along the
//! dependency path.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named dimension with a finite, non-empty set of choices.
///
/// # Examples
///
/// ```
/// use kiln_di::Axis;
///
/// let env = Axis::new("env", &["prod", "dev", "test"]);
/// let prod = env.point("prod");
/// assert_eq!(prod.choice(), "prod");
/// ```
///
/// # Panics
///
/// `Axis::new` panics when the choice list is empty or contains duplicates;
/// an axis definition is static configuration and a broken one should fail
/// where it is written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Axis {
    name: &'static str,
    choices: Arc<[&'static str]>,
}

impl Axis {
    /// Defines an axis.
    pub fn new(name: &'static str, choices: &[&'static str]) -> Axis {
        assert!(!choices.is_empty(), "axis {} must have at least one choice", name);
        for (i, choice) in choices.iter().enumerate() {
            assert!(
                !choices[..i].contains(choice),
                "axis {} lists choice {} twice",
                name,
                choice
            );
        }
        Axis { name, choices: Arc::from(choices) }
    }

    /// The axis name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// All choices, in declaration order.
    pub fn choices(&self) -> &[&'static str] {
        &self.choices
    }

    /// A point on this axis.
    ///
    /// # Panics
    ///
    /// Panics when `choice` is not one of the axis's choices.
    pub fn point(&self, choice: &'static str) -> AxisPoint {
        assert!(
            self.choices.contains(&choice),
            "axis {} has no choice {}",
            self.name,
            choice
        );
        AxisPoint { axis: self.clone(), choice }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// One chosen value on an axis, validated against the axis's choices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AxisPoint {
    axis: Axis,
    choice: &'static str,
}

impl AxisPoint {
    /// The axis this point belongs to.
    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    /// The chosen value.
    pub fn choice(&self) -> &'static str {
        self.choice
    }
}

impl fmt::Display for AxisPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.axis.name, self.choice)
    }
}

/// The axis choices applied to a whole produce call: at most one per axis.
///
/// # Examples
///
/// ```
/// use kiln_di::{Activation, Axis};
///
/// let env = Axis::new("env", &["prod", "dev"]);
/// let repo = Axis::new("repo", &["postgres", "memory"]);
///
/// let activation = Activation::of([env.point("prod"), repo.point("memory")]);
/// assert_eq!(activation.choice_for("env"), Some("prod"));
/// assert_eq!(activation.choice_for("tenant"), None);
/// ```
///
/// # Panics
///
/// Construction panics when two points on the same axis are supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activation {
    points: HashMap<&'static str, AxisPoint>,
}

impl Activation {
    /// The empty activation: no axis has a chosen value.
    pub fn empty() -> Activation {
        Activation::default()
    }

    /// An activation from a collection of points.
    pub fn of<I: IntoIterator<Item = AxisPoint>>(points: I) -> Activation {
        let mut activation = Activation::empty();
        for point in points {
            activation.insert(point);
        }
        activation
    }

    /// Adds one more point, builder-style.
    pub fn with(mut self, point: AxisPoint) -> Activation {
        self.insert(point);
        self
    }

    fn insert(&mut self, point: AxisPoint) {
        let name = point.axis().name();
        if let Some(existing) = self.points.get(name) {
            panic!(
                "activation already selects {} on axis {}, cannot also select {}",
                existing.choice(),
                name,
                point.choice()
            );
        }
        self.points.insert(name, point);
    }

    /// The chosen value on an axis, if the activation selects one.
    pub fn choice_for(&self, axis_name: &str) -> Option<&'static str> {
        self.points.get(axis_name).map(|p| p.choice())
    }

    /// All points, in no particular order.
    pub fn points(&self) -> impl Iterator<Item = &AxisPoint> {
        self.points.values()
    }

    /// Number of axes with a chosen value.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no axis has a chosen value.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// The axis points attached to one binding.
///
/// Empty tags mean the binding applies everywhere. A tag set matches an
/// activation when the activation selects the tagged choice on every tagged
/// axis; specificity is the number of tags, and the most specific matching
/// binding wins selection.
#[derive(Debug, Clone, Default)]
pub struct BindingTags {
    points: HashMap<&'static str, AxisPoint>,
}

impl BindingTags {
    /// The empty tag set.
    pub fn empty() -> BindingTags {
        BindingTags::default()
    }

    /// Adds a tag.
    ///
    /// # Panics
    ///
    /// Panics when the binding is already tagged on the point's axis.
    pub fn insert(&mut self, point: AxisPoint) {
        let name = point.axis().name();
        if let Some(existing) = self.points.get(name) {
            panic!(
                "binding already tagged {} on axis {}, cannot also tag {}",
                existing.choice(),
                name,
                point.choice()
            );
        }
        self.points.insert(name, point);
    }

    /// Number of tags; the binding's specificity.
    pub fn specificity(&self) -> usize {
        self.points.len()
    }

    /// Whether the tag set is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The tag on an axis, if any.
    pub fn on_axis(&self, axis_name: &str) -> Option<&AxisPoint> {
        self.points.get(axis_name)
    }

    /// All tags, in no particular order.
    pub fn points(&self) -> impl Iterator<Item = &AxisPoint> {
        self.points.values()
    }

    /// Whether the activation selects this tag set's choice on every tagged
    /// axis.
    pub fn matches(&self, activation: &Activation) -> bool {
        self.points
            .values()
            .all(|p| activation.choice_for(p.axis().name()) == Some(p.choice()))
    }

    /// Renders the tags for conflict descriptions, sorted by axis name.
    pub(crate) fn describe(&self) -> String {
        if self.points.is_empty() {
            return "untagged".to_string();
        }
        let mut parts: Vec<String> = self.points.values().map(|p| p.to_string()).collect();
        parts.sort();
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Axis {
        Axis::new("env", &["prod", "dev", "test"])
    }

    #[test]
    fn activation_round_trips_through_points() {
        let activation = Activation::of([env().point("dev")]);
        let rebuilt = Activation::of(activation.points().cloned());
        assert_eq!(activation, rebuilt);
    }

    #[test]
    #[should_panic]
    fn activation_rejects_two_points_on_one_axis() {
        let _ = Activation::of([env().point("prod"), env().point("dev")]);
    }

    #[test]
    #[should_panic]
    fn axis_rejects_unknown_choice() {
        let _ = env().point("staging");
    }

    #[test]
    fn untagged_matches_any_activation() {
        let tags = BindingTags::empty();
        assert!(tags.matches(&Activation::empty()));
        assert!(tags.matches(&Activation::of([env().point("prod")])));
    }

    #[test]
    fn tagged_requires_the_selected_choice() {
        let mut tags = BindingTags::empty();
        tags.insert(env().point("prod"));
        assert!(tags.matches(&Activation::of([env().point("prod")])));
        assert!(!tags.matches(&Activation::of([env().point("dev")])));
        // An activation silent on the axis does not select the choice.
        assert!(!tags.matches(&Activation::empty()));
    }
}
