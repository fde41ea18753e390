//! Ordering of a glyph's property computations.

use std::{cmp::Reverse, collections::BinaryHeap, sync::Arc};

use crate::{error::GraphCycleError, graph::CellTable, types::GlyphName};

/// A cached solving order, valid for one graph generation.
#[derive(Debug, Clone)]
pub struct SolvingOrder {
    pub generation: u64,
    pub steps: Result<Arc<[usize]>, GraphCycleError>,
}

/// Orders cells so each follows everything it depends on.
///
/// Kahn's algorithm; among the cells ready at any point the one declared
/// first goes next, which makes the order fully reproducible. Cells left over
/// sit on, or downstream of, a cycle.
pub fn solving_order(glyph: &GlyphName, cells: &CellTable) -> Result<Vec<usize>, GraphCycleError> {
    let n = cells.len();
    let mut pending = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for idx in 0..n {
        for dep in cells.dependencies(idx) {
            pending[idx] += 1;
            dependents[*dep].push(idx);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|idx| pending[*idx] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(idx)) = ready.pop() {
        order.push(idx);
        for dependent in dependents[idx].iter() {
            pending[*dependent] -= 1;
            if pending[*dependent] == 0 {
                ready.push(Reverse(*dependent));
            }
        }
    }

    if order.len() < n {
        return Err(GraphCycleError {
            glyph: glyph.clone(),
            cursors: (0..n)
                .filter(|idx| pending[*idx] > 0)
                .map(|idx| cells.cursor(idx).clone())
                .collect(),
        });
    }
    Ok(order)
}
