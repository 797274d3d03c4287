//! Conditional edges: route to the next node based on state.
//!
//! A source node has a router that takes the current state and returns a typed
//! label; the label is looked up in the path map registered with it. Label types
//! implement [`RouteLabel`], so the set of possible labels is known when the graph
//! is assembled and `StateGraph::compile` can reject a path map that misses one.
//!
//! **Interaction**: Used by `StateGraph::add_conditional_edges` and the
//! `CompiledStateGraph` run loop to resolve the next node after a node with
//! conditional edges runs.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::AgentError;

/// A finite set of routing labels returned by one router.
///
/// `all()` enumerates every label the router can produce; `as_str()` is the stable
/// name used in logs and in the erased path map.
pub trait RouteLabel: Copy + Debug + Send + Sync + 'static {
    /// Every label this type can take.
    fn all() -> &'static [Self];

    /// Stable label name (e.g. `"plan_found"`).
    fn as_str(&self) -> &'static str;
}

impl RouteLabel for bool {
    fn all() -> &'static [Self] {
        &[true, false]
    }

    fn as_str(&self) -> &'static str {
        if *self {
            "true"
        } else {
            "false"
        }
    }
}

/// Declares a routing label enum together with its [`RouteLabel`] impl.
///
/// ```rust,ignore
/// route_labels! {
///     /// Where the tools node sends control next.
///     pub enum ToolsRoute {
///         Continue => "continue",
///         PlanFound => "plan_found",
///         Root => "root",
///     }
/// }
/// ```
#[macro_export]
macro_rules! route_labels {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $crate::graph::RouteLabel for $name {
            fn all() -> &'static [Self] {
                &[$($name::$variant),+]
            }

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }
    };
}

/// Type-erased router: state in, label name out.
pub type ConditionalRouterFn<S> = Arc<dyn Fn(&S) -> Result<&'static str, AgentError> + Send + Sync>;

/// Conditional edge definition: router plus the path map it was registered with.
///
/// `labels` holds every label the router's label type declares; compile checks that
/// each one has an entry in `path_map`.
#[derive(Clone)]
pub struct ConditionalRouter<S> {
    pub(super) path: ConditionalRouterFn<S>,
    pub(super) path_map: HashMap<&'static str, String>,
    pub(super) labels: Vec<&'static str>,
}

impl<S> ConditionalRouter<S>
where
    S: Send + Sync + 'static,
{
    /// Wraps a typed router and its path map.
    pub fn new<L, F>(router: F, path_map: Vec<(L, String)>) -> Self
    where
        L: RouteLabel,
        F: Fn(&S) -> Result<L, AgentError> + Send + Sync + 'static,
    {
        let path: ConditionalRouterFn<S> = Arc::new(move |s: &S| router(s).map(|l| l.as_str()));
        let path_map = path_map
            .into_iter()
            .map(|(label, target)| (label.as_str(), target))
            .collect();
        Self {
            path,
            path_map,
            labels: L::all().iter().map(|l| l.as_str()).collect(),
        }
    }

    /// Label names declared by the router's label type that have no destination.
    pub(super) fn missing_labels(&self) -> Vec<&'static str> {
        self.labels
            .iter()
            .copied()
            .filter(|l| !self.path_map.contains_key(l))
            .collect()
    }

    /// Resolves the next node id from the current state.
    ///
    /// A label with no path map entry is a misconfiguration and yields `AgentError::Routing`.
    pub fn resolve_next(&self, source: &str, state: &S) -> Result<String, AgentError> {
        let label = (self.path)(state)?;
        self.path_map
            .get(label)
            .cloned()
            .ok_or_else(|| AgentError::Routing {
                node: source.to_string(),
                label: label.to_string(),
            })
    }
}

/// How to determine the next node after a given node runs.
#[derive(Clone)]
pub enum NextEntry<S> {
    /// Single fixed next node (or END).
    Unconditional(String),
    /// Next node is decided by the router from state.
    Conditional(ConditionalRouter<S>),
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::route_labels! {
        enum Parity {
            Even => "even",
            Odd => "odd",
        }
    }

    /// **Scenario**: route_labels! enumerates every variant in declaration order.
    #[test]
    fn route_labels_macro_lists_all_variants() {
        let names: Vec<_> = Parity::all().iter().map(|l| l.as_str()).collect();
        assert_eq!(names, vec!["even", "odd"]);
    }

    /// **Scenario**: A path map covering only one label reports the other as missing.
    #[test]
    fn missing_labels_reports_uncovered_label() {
        let router = ConditionalRouter::<i32>::new(
            |s: &i32| Ok(if s % 2 == 0 { Parity::Even } else { Parity::Odd }),
            vec![(Parity::Even, "a".to_string())],
        );
        assert_eq!(router.missing_labels(), vec!["odd"]);
    }

    /// **Scenario**: resolve_next maps the router's label through the path map.
    #[test]
    fn resolve_next_uses_path_map() {
        let router = ConditionalRouter::<i32>::new(
            |s: &i32| Ok(*s > 0),
            vec![(true, "pos".to_string()), (false, "neg".to_string())],
        );
        assert_eq!(router.resolve_next("src", &3).unwrap(), "pos");
        assert_eq!(router.resolve_next("src", &-3).unwrap(), "neg");
    }

    /// **Scenario**: An uncovered label at run time is a routing error, not a panic.
    #[test]
    fn resolve_next_missing_label_is_routing_error() {
        let router = ConditionalRouter::<i32>::new(
            |_: &i32| Ok(Parity::Odd),
            vec![(Parity::Even, "a".to_string())],
        );
        match router.resolve_next("src", &1) {
            Err(AgentError::Routing { node, label }) => {
                assert_eq!(node, "src");
                assert_eq!(label, "odd");
            }
            other => panic!("expected Routing, got {:?}", other.map(|_| ())),
        }
    }
}
