//! Cycle breaking over the nested-relation graph of one scope.
//!
//! Each root entity is traversed depth-first. An edge into an entity on the
//! active path, or into one already expanded by this traversal, is kept as a
//! by-name reference instead of being entered again. Traversal state lives in
//! [`Traversal`] and never outlives one root.

use std::collections::HashSet;

use tracing::debug;

use crate::resolve::Resolution;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeClass {
    /// First visit of the target in this traversal.
    Expand,
    /// Target is an ancestor on the active path.
    Cycle,
    /// Target was already expanded through another edge.
    Defined,
}

impl EdgeClass {
    pub fn is_reference(self) -> bool {
        !matches!(self, Self::Expand)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionStep {
    /// Hops from the root; the root's own relations are at 1.
    pub depth: u32,
    pub from: String,
    pub relation: String,
    pub target: String,
    pub class: EdgeClass,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionPlan {
    pub root: String,
    pub steps: Vec<ExpansionStep>,
}

impl ExpansionPlan {
    /// Root followed by every expanded entity, in traversal order.
    pub fn expanded(&self) -> Vec<&str> {
        std::iter::once(self.root.as_str())
            .chain(
                self.steps
                    .iter()
                    .filter(|s| s.class == EdgeClass::Expand)
                    .map(|s| s.target.as_str()),
            )
            .collect()
    }

    /// The class of the root's own edge `relation -> target`.
    pub fn root_edge(&self, relation: &str, target: &str) -> Option<EdgeClass> {
        self.steps
            .iter()
            .find(|s| s.depth == 1 && s.relation == relation && s.target == target)
            .map(|s| s.class)
    }
}

struct Traversal<'a> {
    resolution: &'a Resolution,
    path: Vec<&'a str>,
    expanded: HashSet<&'a str>,
    steps: Vec<ExpansionStep>,
}

impl<'a> Traversal<'a> {
    fn visit(&mut self, entity: &'a str, depth: u32) {
        let distance = depth + 1;
        let edges: Vec<(&'a str, &'a str)> = self
            .resolution
            .nested_edges(entity)
            .into_iter()
            .filter(|(relation, _)| self.resolution.policy.reachable(entity, relation, distance))
            .collect();

        for (relation, target) in edges {
            let class = if self.path.contains(&target) {
                EdgeClass::Cycle
            } else if self.expanded.contains(target) {
                EdgeClass::Defined
            } else {
                EdgeClass::Expand
            };

            if class.is_reference() {
                debug!(
                    from = entity,
                    relation,
                    target,
                    ?class,
                    "nested edge kept as reference"
                );
            }

            self.steps.push(ExpansionStep {
                depth: distance,
                from: entity.to_string(),
                relation: relation.to_string(),
                target: target.to_string(),
                class,
            });

            if class == EdgeClass::Expand {
                self.expanded.insert(target);
                self.path.push(target);
                self.visit(target, distance);
                self.path.pop();
            }
        }
    }
}

/// Traverse the nested-relation graph from `root`.
pub fn plan_expansion(resolution: &Resolution, root: &str) -> ExpansionPlan {
    let Some(entity) = resolution.entity(root) else {
        return ExpansionPlan {
            root: root.to_string(),
            steps: Vec::new(),
        };
    };
    let root = entity.name.as_str();

    let mut traversal = Traversal {
        resolution,
        path: vec![root],
        expanded: HashSet::from([root]),
        steps: Vec::new(),
    };
    traversal.visit(root, 0);

    ExpansionPlan {
        root: root.to_string(),
        steps: traversal.steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schema;
    use crate::resolve::resolve;
    use crate::scope::GenerationScope;

    const MESH: &str = r#"
        entity Person {
            id autoincrement
            rel company ForOne Company inverse person
            rel contactInfo HasOne ContactInfo inverse person
            rel contact HasOne Contact inverse person
        }
        entity Company {
            id autoincrement
            rel person HasMany Person inverse company
            rel mainContact ForOne Contact
            rel mailingContact ForOne Contact
        }
        entity Contact {
            id autoincrement
            rel person ForOne Person inverse contact
            rel contactInfo ForOne ContactInfo
        }
        entity ContactInfo {
            id autoincrement
            rel person ForOne Person inverse contactInfo
        }
    "#;

    fn plan(input: &str, scope: &GenerationScope, root: &str) -> ExpansionPlan {
        let schema = parse_schema(input).unwrap();
        let resolution = resolve(&schema, scope);
        plan_expansion(&resolution, root)
    }

    #[test]
    fn test_two_cycle_is_referenced() {
        let plan = plan(MESH, &GenerationScope::models(2), "Company");
        assert_eq!(plan.root_edge("person", "Person"), Some(EdgeClass::Expand));

        let back = plan
            .steps
            .iter()
            .find(|s| s.from == "Person" && s.relation == "company")
            .unwrap();
        assert_eq!(back.class, EdgeClass::Cycle);
        assert_eq!(back.depth, 2);
    }

    #[test]
    fn test_repeated_target_downgraded_not_dropped() {
        let plan = plan(MESH, &GenerationScope::models(1), "Company");
        assert_eq!(plan.root_edge("mainContact", "Contact"), Some(EdgeClass::Expand));
        assert_eq!(plan.root_edge("mailingContact", "Contact"), Some(EdgeClass::Defined));
        assert_eq!(plan.steps.len(), 3);
    }

    #[test]
    fn test_self_relation_is_cycle() {
        let plan = plan(
            "entity Person { id autoincrement rel parent ForOne Person rel child HasMany Person }",
            &GenerationScope::models(5),
            "Person",
        );
        assert_eq!(plan.steps.len(), 2);
        assert!(plan.steps.iter().all(|s| s.class == EdgeClass::Cycle));
        assert_eq!(plan.expanded(), vec!["Person"]);
    }

    #[test]
    fn test_three_way_mesh_terminates_and_expands_once() {
        let plan = plan(MESH, &GenerationScope::models(u32::MAX), "Person");
        let expanded = plan.expanded();
        assert_eq!(expanded, vec!["Person", "Company", "Contact", "ContactInfo"]);

        let mut unique = expanded.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), expanded.len());
    }

    #[test]
    fn test_depth_bounds_traversal() {
        let plan = plan(MESH, &GenerationScope::models(1), "Person");
        assert!(plan.steps.iter().all(|s| s.depth == 1));
        assert_eq!(plan.steps.len(), 3);
    }

    #[test]
    fn test_minimal_scope_follows_allow_list_only() {
        let plan = plan(MESH, &GenerationScope::entities(["Person.company"]), "Person");
        let relations: Vec<(&str, &str)> = plan
            .steps
            .iter()
            .map(|s| (s.from.as_str(), s.relation.as_str()))
            .collect();
        assert_eq!(relations, vec![("Person", "company"), ("Company", "person")]);
        assert_eq!(plan.steps[1].class, EdgeClass::Cycle);
    }
}
