//! Axis constraints accumulated along one dependency path.

use std::collections::{BTreeMap, BTreeSet};

use crate::axis::BindingTags;

/// The `required`/`forbidden` choice sets a traversal carries down one path.
///
/// Selecting a binding tagged `(axis, choice)` requires `choice` for the
/// subtree below it and forbids the axis's other choices there. A candidate
/// is admitted when, on every axis it is tagged, its choice is required (if
/// anything is) and not forbidden.
#[derive(Clone, Default)]
pub(crate) struct PathActivation {
    required: BTreeMap<&'static str, BTreeSet<&'static str>>,
    forbidden: BTreeMap<&'static str, BTreeSet<&'static str>>,
}

impl PathActivation {
    /// Whether the path constraints admit a candidate with these tags.
    pub(crate) fn admits(&self, tags: &BindingTags) -> bool {
        tags.points().all(|point| {
            let axis = point.axis().name();
            if let Some(required) = self.required.get(axis) {
                if !required.is_empty() && !required.contains(point.choice()) {
                    return false;
                }
            }
            if let Some(forbidden) = self.forbidden.get(axis) {
                if forbidden.contains(point.choice()) {
                    return false;
                }
            }
            true
        })
    }

    /// Records a selected binding's tags: each tagged choice becomes
    /// required and the axis's remaining choices become forbidden.
    pub(crate) fn constrain(&mut self, tags: &BindingTags) {
        for point in tags.points() {
            let axis = point.axis().name();
            self.required.entry(axis).or_default().insert(point.choice());
            let forbidden = self.forbidden.entry(axis).or_default();
            for choice in point.axis().choices() {
                if *choice != point.choice() {
                    forbidden.insert(choice);
                }
            }
        }
    }

    /// Renders why a candidate with these tags was rejected, axis by axis.
    pub(crate) fn describe_rejection(&self, tags: &BindingTags) -> String {
        let mut parts = Vec::new();
        for point in tags.points() {
            let axis = point.axis().name();
            let required_here = self
                .required
                .get(axis)
                .filter(|r| !r.is_empty() && !r.contains(point.choice()));
            let forbidden_here = self
                .forbidden
                .get(axis)
                .filter(|f| f.contains(point.choice()));
            if required_here.is_none() && forbidden_here.is_none() {
                continue;
            }
            let mut part = format!("axis {} ", axis);
            if let Some(required) = required_here {
                let choices: Vec<&str> = required.iter().copied().collect();
                part.push_str(&format!("must be {}", choices.join(" or ")));
            } else {
                part.push_str(&format!("cannot be {}", point.choice()));
            }
            part.push_str(&format!(" but candidate is tagged {}", point.choice()));
            parts.push(part);
        }
        parts.sort();
        if parts.is_empty() {
            "candidate rejected by path constraints".to_string()
        } else {
            parts.join("; ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;

    fn env() -> Axis {
        Axis::new("env", &["prod", "dev", "test"])
    }

    fn tags_for(choice: &'static str) -> BindingTags {
        let mut tags = BindingTags::empty();
        tags.insert(env().point(choice));
        tags
    }

    #[test]
    fn unconstrained_path_admits_everything() {
        let path = PathActivation::default();
        assert!(path.admits(&BindingTags::empty()));
        assert!(path.admits(&tags_for("prod")));
    }

    #[test]
    fn selecting_a_choice_forbids_siblings() {
        let mut path = PathActivation::default();
        path.constrain(&tags_for("test"));
        assert!(path.admits(&tags_for("test")));
        assert!(!path.admits(&tags_for("prod")));
        // Untagged candidates impose nothing and stay admissible.
        assert!(path.admits(&BindingTags::empty()));
    }

    #[test]
    fn rejection_names_the_axis_and_requirement() {
        let mut path = PathActivation::default();
        path.constrain(&tags_for("test"));
        let description = path.describe_rejection(&tags_for("prod"));
        assert!(description.contains("env"));
        assert!(description.contains("test"));
        assert!(description.contains("prod"));
    }
}
