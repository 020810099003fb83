//! Test harness for sheet operations with structural invariant checking.
//!
//! `SheetHarness` wraps a [`Sheet`] and re-checks the structural invariants
//! after every applied operation:
//!
//! - graph edges mirror each other and match cell contents
//! - every referenced position exists in the cell map
//! - the reference graph is acyclic
//! - failed operations leave texts and edges untouched
//! - the printable rectangle matches a full scan
//!
//! Use it to drive randomized edit scripts without GUI or IO dependencies.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashSet;

use crate::cell::CellContent;
use crate::position::Position;
use crate::sheet::Sheet;

/// Operation to apply to a sheet.
#[derive(Debug, Clone)]
pub enum Op {
    /// Set a cell's content from raw input text.
    Set { pos: Position, text: String },
    /// Clear a cell.
    Clear { pos: Position },
}

/// Snapshot of everything an operation is allowed to change.
type Snapshot = (BTreeMap<Position, String>, BTreeSet<(Position, Position)>);

pub struct SheetHarness {
    sheet: Sheet,
}

impl SheetHarness {
    pub fn new() -> Self {
        Self { sheet: Sheet::new() }
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    /// Apply one operation and re-check every invariant.
    ///
    /// Rejections (syntax errors, cycles, invalid positions) are legal
    /// outcomes; for those the harness additionally asserts that the sheet
    /// is unchanged.
    pub fn apply(&mut self, op: &Op) {
        let before = self.snapshot();

        let result = match op {
            Op::Set { pos, text } => self.sheet.set_cell(*pos, text),
            Op::Clear { pos } => self.sheet.clear_cell(*pos),
        };

        if result.is_err() {
            assert_eq!(
                self.snapshot(),
                before,
                "failed {:?} must leave the sheet unchanged",
                op
            );
        }

        self.check_invariants();
    }

    fn snapshot(&self) -> Snapshot {
        let texts = self
            .sheet
            .iter()
            .map(|(pos, cell)| (pos, cell.text()))
            .collect();
        let edges = self
            .sheet
            .iter()
            .flat_map(|(pos, _)| {
                self.sheet
                    .dep_graph()
                    .references(pos)
                    .map(move |referenced| (pos, referenced))
            })
            .collect();
        (texts, edges)
    }

    /// Assert the structural invariants of the sheet.
    pub fn check_invariants(&self) {
        self.sheet.dep_graph().assert_consistent();

        for (pos, cell) in self.sheet.iter() {
            // Graph edges match the content's references exactly
            let content_refs: FxHashSet<Position> = cell.referenced_cells().into_iter().collect();
            let graph_refs: FxHashSet<Position> = self.sheet.dep_graph().references(pos).collect();
            assert_eq!(
                graph_refs, content_refs,
                "graph edges of {} diverge from its content",
                pos
            );

            if !matches!(cell.content(), CellContent::Formula(_)) {
                assert!(
                    content_refs.is_empty(),
                    "non-formula cell {} has references",
                    pos
                );
            }

            // Every referenced position resolves through the map
            for referenced in cell.referenced_cells() {
                assert!(
                    self.sheet.get_cell(referenced).unwrap().is_some(),
                    "{} references {} which has no cell entry",
                    pos,
                    referenced
                );
            }
        }

        self.assert_acyclic();
        self.assert_printable_size_matches_scan();
    }

    fn assert_acyclic(&self) {
        let mut done: FxHashSet<Position> = FxHashSet::default();

        for (start, _) in self.sheet.iter() {
            if done.contains(&start) {
                continue;
            }
            // Iterative DFS with an explicit on-path set
            let mut on_path: FxHashSet<Position> = FxHashSet::default();
            let mut stack = vec![(start, false)];
            while let Some((current, children_done)) = stack.pop() {
                if children_done {
                    on_path.remove(&current);
                    done.insert(current);
                    continue;
                }
                if done.contains(&current) {
                    continue;
                }
                assert!(
                    on_path.insert(current),
                    "reference cycle through {}",
                    current
                );
                stack.push((current, true));
                for referenced in self.sheet.dep_graph().references(current) {
                    assert!(!on_path.contains(&referenced), "reference cycle through {}", referenced);
                    if !done.contains(&referenced) {
                        stack.push((referenced, false));
                    }
                }
            }
        }
    }

    fn assert_printable_size_matches_scan(&self) {
        let mut rows = 0;
        let mut cols = 0;
        for (pos, cell) in self.sheet.iter() {
            if cell.text().is_empty() {
                continue;
            }
            rows = rows.max(pos.row + 1);
            cols = cols.max(pos.col + 1);
        }
        let size = self.sheet.printable_size();
        assert_eq!((size.rows, size.cols), (rows, cols));
    }
}

impl Default for SheetHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release
    fn config_256() -> ProptestConfig {
        ProptestConfig {
            cases: std::env::var("PROPTEST_CASES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(256),
            failure_persistence: None,
            ..ProptestConfig::default()
        }
    }

    /// Positions drawn from a small block so edits collide and chain.
    fn arb_pos() -> impl Strategy<Value = Position> {
        (0..5i32, 0..5i32).prop_map(|(row, col)| Position::new(row, col))
    }

    /// Input text: formulas over nearby cells, literals, escapes, empties.
    fn arb_text() -> impl Strategy<Value = String> {
        let formula = (arb_pos(), arb_pos(), 0..5u8).prop_map(|(a, b, kind)| match kind {
            0 => format!("={}", a),
            1 => format!("={}+{}", a, b),
            2 => format!("={}*{}-2", a, b),
            3 => format!("=1/{}", a),
            _ => format!("=({}+{})/2", a, b),
        });
        prop_oneof![
            4 => formula,
            2 => r"-?[0-9]{1,3}(\.[0-9]{1,2})?",
            2 => r"[a-z]{1,6}",
            1 => Just(String::new()),
            1 => Just("'=escaped".to_string()),
            1 => Just("=".to_string()),
            1 => Just("=1+".to_string()),
        ]
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            5 => (arb_pos(), arb_text()).prop_map(|(pos, text)| Op::Set { pos, text }),
            1 => arb_pos().prop_map(|pos| Op::Clear { pos }),
        ]
    }

    proptest! {
        #![proptest_config(config_256())]

        #[test]
        fn random_edit_scripts_keep_invariants(ops in proptest::collection::vec(arb_op(), 1..60)) {
            let mut harness = SheetHarness::new();
            for op in &ops {
                harness.apply(op);
            }
        }

        #[test]
        fn values_never_panic(ops in proptest::collection::vec(arb_op(), 1..40)) {
            let mut harness = SheetHarness::new();
            for op in &ops {
                harness.apply(op);
            }
            // Force evaluation of everything that survived
            let positions: Vec<Position> = harness.sheet().iter().map(|(pos, _)| pos).collect();
            for pos in positions {
                let _ = harness.sheet().value(pos).unwrap();
            }
            harness.check_invariants();
        }
    }

    #[test]
    fn scripted_smoke() {
        let mut harness = SheetHarness::new();
        let script = [
            Op::Set { pos: Position::new(0, 0), text: "1".to_string() },
            Op::Set { pos: Position::new(0, 1), text: "=A1+1".to_string() },
            Op::Set { pos: Position::new(0, 2), text: "=B1*2".to_string() },
            // Rejected: would close a cycle
            Op::Set { pos: Position::new(0, 0), text: "=C1".to_string() },
            Op::Clear { pos: Position::new(0, 1) },
            Op::Clear { pos: Position::new(0, 1) },
            Op::Set { pos: Position::new(0, 0), text: String::new() },
        ];
        for op in &script {
            harness.apply(op);
        }
    }
}
