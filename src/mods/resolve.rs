//! Dependency resolution and load ordering
//!
//! Validates every declared dependency edge, then linearizes the required
//! edges with a priority-aware Kahn's sort. The ready queue is keyed by
//! (declared load priority, id), so priority only orders mods that are
//! mutually independent; a dependency always precedes its dependents no
//! matter how the priorities compare.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use tracing::{debug, warn};

use crate::mods::error::DependencyError;
use crate::mods::manifest::DiscoveredMod;

/// Dependency resolver over deduplicated metadata.
pub struct DependencyResolver;

impl DependencyResolver {
    /// Resolve a safe total load order.
    ///
    /// Input ids must already be unique (the pipeline deduplicates first).
    /// Any validation or linearization failure aborts: a partial order is
    /// never returned.
    pub fn resolve(mods: &[DiscoveredMod]) -> Result<Vec<DiscoveredMod>, DependencyError> {
        let by_id: BTreeMap<&str, &DiscoveredMod> = mods
            .iter()
            .map(|m| (m.metadata.id.as_str(), m))
            .collect();
        debug_assert_eq!(by_id.len(), mods.len(), "resolver input must be deduplicated");

        // Validate edges; keep only satisfied required edges for ordering.
        let mut in_degree: BTreeMap<&str, usize> =
            mods.iter().map(|m| (m.metadata.id.as_str(), 0)).collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for module in mods {
            let id = module.metadata.id.as_str();
            for dep in &module.metadata.dependencies {
                if dep.mod_id == id {
                    // Always fatal, even when declared optional.
                    return Err(DependencyError::SelfDependency { id: id.to_string() });
                }
                let Some(target) = by_id.get(dep.mod_id.as_str()) else {
                    if dep.optional {
                        debug!(dependent = id, dependency = %dep.mod_id, "dropping unmet optional dependency");
                        continue;
                    }
                    return Err(DependencyError::Missing {
                        dependent: id.to_string(),
                        dependency: dep.mod_id.clone(),
                    });
                };
                if !dep.constraint.matches(&target.metadata.version) {
                    if dep.optional {
                        warn!(
                            dependent = id,
                            dependency = %dep.mod_id,
                            required = %dep.constraint,
                            found = %target.metadata.version,
                            "dropping optional dependency with unsatisfied version"
                        );
                        continue;
                    }
                    return Err(DependencyError::VersionMismatch {
                        dependent: id.to_string(),
                        dependency: dep.mod_id.clone(),
                        required: dep.constraint.to_string(),
                        found: target.metadata.version.clone(),
                    });
                }
                if dep.optional {
                    // Optional edges never constrain the order.
                    continue;
                }
                *in_degree.get_mut(id).expect("id present") += 1;
                dependents
                    .entry(target.metadata.id.as_str())
                    .or_default()
                    .push(id);
            }
        }

        // Priority-aware Kahn's sort. The heap pops the lowest
        // (priority rank, id) pair, i.e. highest priority first, then
        // ascending lexicographic id.
        let mut ready: BinaryHeap<Reverse<(u8, &str)>> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&id, _)| Reverse((by_id[id].metadata.load_priority.rank(), id)))
            .collect();

        let mut order = Vec::with_capacity(mods.len());
        while let Some(Reverse((_, id))) = ready.pop() {
            order.push(id);
            for &dependent in dependents.get(id).map(Vec::as_slice).unwrap_or_default() {
                let degree = in_degree.get_mut(dependent).expect("id present");
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse((
                        by_id[dependent].metadata.load_priority.rank(),
                        dependent,
                    )));
                }
            }
        }

        if order.len() != mods.len() {
            // The residual set also holds hard dependents downstream of a
            // cycle; peel nodes with no edge back into the residual until
            // only cycle members remain.
            let mut residual: BTreeSet<&str> = in_degree
                .iter()
                .filter(|&(_, &degree)| degree > 0)
                .map(|(&id, _)| id)
                .collect();
            loop {
                let peel: Vec<&str> = residual
                    .iter()
                    .filter(|&&id| {
                        dependents
                            .get(id)
                            .map(Vec::as_slice)
                            .unwrap_or_default()
                            .iter()
                            .all(|dependent| !residual.contains(dependent))
                    })
                    .copied()
                    .collect();
                if peel.is_empty() {
                    break;
                }
                for id in peel {
                    residual.remove(id);
                }
            }
            let participants: Vec<String> = residual.iter().map(|id| id.to_string()).collect();
            return Err(DependencyError::Cycle { participants });
        }

        debug!(order = ?order, "resolved mod load order");
        Ok(order.into_iter().map(|id| (*by_id[id]).clone()).collect())
    }
}
