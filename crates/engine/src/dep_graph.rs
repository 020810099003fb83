//! Dependency graph between cells.
//!
//! Tracks references (cells a formula reads) and dependents (cells whose
//! formulas read a given cell) for cycle probing and cache invalidation.
//!
//! # Edge Direction
//!
//! ```text
//! A → B  means  "A's formula references B"
//! ```
//!
//! Walking dependents answers "whose cached value breaks if this cell
//! changes?".

use rustc_hash::{FxHashMap, FxHashSet};

use crate::position::Position;

/// Bidirectional adjacency over cell positions.
///
/// Maintains both directions for O(1) lookups:
/// - `refs[A]` = cells that A's formula references
/// - `deps[B]` = cells whose formulas reference B
///
/// # Invariants
///
/// 1. **Bidirectional consistency:** B ∈ refs[A] iff A ∈ deps[B].
/// 2. **No dangling entries:** empty sets are removed, not stored.
/// 3. **No duplicate edges:** set semantics enforced by FxHashSet.
/// 4. **Atomic updates:** `replace_edges` is the only mutator that touches both maps.
#[derive(Default, Debug, Clone)]
pub struct DepGraph {
    /// References: for each formula cell A, the cells it reads.
    /// A -> {B1, B2, ...}
    refs: FxHashMap<Position, FxHashSet<Position>>,

    /// Dependents: for each referenced cell B, the formula cells reading it.
    /// B -> {A1, A2, ...}
    deps: FxHashMap<Position, FxHashSet<Position>>,
}

impl DepGraph {
    /// Create an empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells referenced by this cell's formula (outgoing edges).
    pub fn references(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.refs
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Cells whose formulas reference this cell (incoming edges).
    pub fn dependents(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.deps
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// True if at least one formula references this cell.
    pub fn is_referenced(&self, cell: Position) -> bool {
        self.deps.contains_key(&cell)
    }

    /// Replace all outgoing edges of a cell atomically.
    ///
    /// This is the primary mutation API. It:
    /// 1. Removes the cell from all its old references' dependent sets
    /// 2. Clears the cell's reference set
    /// 3. Adds the cell to all new references' dependent sets
    /// 4. Stores the cell's new reference set
    ///
    /// Pass an empty set to clear all edges for this cell.
    pub fn replace_edges(&mut self, cell: Position, new_refs: FxHashSet<Position>) {
        // Step 1: Remove old edges
        if let Some(old_refs) = self.refs.remove(&cell) {
            for referenced in old_refs {
                if let Some(dependents) = self.deps.get_mut(&referenced) {
                    dependents.remove(&cell);
                    // Clean up empty entries (invariant: no dangling)
                    if dependents.is_empty() {
                        self.deps.remove(&referenced);
                    }
                }
            }
        }

        // Step 2: Nothing more to do when the new content has no references
        if new_refs.is_empty() {
            return;
        }

        // Step 3: Add new edges
        for referenced in &new_refs {
            self.deps.entry(*referenced).or_default().insert(cell);
        }

        // Step 4: Store new references
        self.refs.insert(cell, new_refs);
    }

    /// Drop all outgoing edges of a cell whose formula went away.
    ///
    /// Convenience wrapper around `replace_edges` with an empty set.
    pub fn clear_cell(&mut self, cell: Position) {
        self.replace_edges(cell, FxHashSet::default());
    }

    /// Would pointing `cell` at `new_refs` close a cycle?
    ///
    /// Walks dependent edges starting from `cell` — the cells that would sit
    /// downstream of the edit — and reports true if the walk reaches any of
    /// the would-be references: such a reference would be both upstream and
    /// downstream of the edited cell at once. The walk includes `cell`
    /// itself, so a self-reference needs no special case. Positions absent
    /// from the graph simply have no dependents to follow.
    ///
    /// Does not modify the graph.
    pub fn would_create_cycle(&self, cell: Position, new_refs: &[Position]) -> bool {
        if new_refs.is_empty() {
            return false;
        }

        let targets: FxHashSet<Position> = new_refs.iter().copied().collect();
        let mut visited = FxHashSet::default();
        let mut stack = vec![cell];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if targets.contains(&current) {
                return true;
            }
            stack.extend(self.dependents(current));
        }

        false
    }

    /// Every cell reachable from `cell` along dependent edges.
    ///
    /// This is the invalidation set for an edit at `cell`; the cell itself
    /// is not included. Acyclicity bounds the walk, and the visited set
    /// keeps diamond shapes linear.
    pub fn transitive_dependents(&self, cell: Position) -> Vec<Position> {
        let mut visited = FxHashSet::default();
        let mut stack: Vec<Position> = self.dependents(cell).collect();
        let mut reached = Vec::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            reached.push(current);
            stack.extend(self.dependents(current));
        }

        reached
    }

    /// Check all invariants. Panics if any are violated.
    ///
    /// Only available in test builds.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        // Invariant 1: Bidirectional consistency (refs → deps)
        for (cell, refs) in &self.refs {
            for referenced in refs {
                assert!(
                    self.deps.get(referenced).map_or(false, |set| set.contains(cell)),
                    "Missing dependent edge: {:?} should have {:?} in dependents",
                    referenced,
                    cell
                );
            }
        }

        // Invariant 1: Bidirectional consistency (deps → refs)
        for (cell, dependents) in &self.deps {
            for dependent in dependents {
                assert!(
                    self.refs.get(dependent).map_or(false, |set| set.contains(cell)),
                    "Missing reference edge: {:?} should have {:?} in references",
                    dependent,
                    cell
                );
            }
        }

        // Invariant 2: No empty sets stored
        for (cell, refs) in &self.refs {
            assert!(!refs.is_empty(), "Empty reference set stored for {:?}", cell);
        }
        for (cell, dependents) in &self.deps {
            assert!(!dependents.is_empty(), "Empty dependent set stored for {:?}", cell);
        }
    }
}
