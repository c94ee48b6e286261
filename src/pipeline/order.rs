//! Pedagogical traversal order over the abstraction graph.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::models::{Abstraction, Relationship, TraversalOrder};

/// Order abstractions so that what others build on comes first.
///
/// An edge `from -> to` reads "from uses to", so `to` is a dependency of
/// `from`. Each step picks the remaining abstraction with the fewest
/// dependencies still unplaced. Ties go to entry points, then to the
/// abstraction used by the most others, then to extraction order. Cycles only
/// shift which node has the fewest pending dependencies, so the loop always
/// places every node exactly once.
pub fn plan_order(abstractions: &[Abstraction], relationships: &[Relationship]) -> TraversalOrder {
    let n = abstractions.len();
    let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    let mut dependents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];

    for rel in relationships {
        if rel.from == rel.to || rel.from >= n || rel.to >= n {
            continue;
        }
        dependencies[rel.from].insert(rel.to);
        dependents[rel.to].insert(rel.from);
    }

    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);

    while order.len() < n {
        let next = (0..n)
            .filter(|&idx| !placed[idx])
            .min_by_key(|&idx| {
                let pending = dependencies[idx].iter().filter(|&&dep| !placed[dep]).count();
                (
                    pending,
                    !abstractions[idx].entry_point,
                    Reverse(dependents[idx].len()),
                    idx,
                )
            });
        let Some(next) = next else {
            break;
        };
        placed[next] = true;
        order.push(next);
    }

    // Each index is placed once, so this cannot fall through
    TraversalOrder::new(order).unwrap_or_else(|_| TraversalOrder::identity(n))
}
