//! Glyph instances: a glyph graph plus the state of its last good update.

use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;
use kurbo::{Affine, BezPath, Point};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, GraphCycleError},
    graph::{FontSource, GlyphCells, GlyphGraphBuilder, NodeCells, TransformCells},
    outline::{self, OutlineNode},
    params::{self, GlyphParameters, ParameterVector, UpdateScope},
    solve::{self, SolvingOrder},
    template::GlyphSource,
    transform,
    types::{Codepoint, Cursor, GlyphName},
};

pub const ADVANCE_WIDTH: &str = "advanceWidth";
pub const GLYPH_WIDTH: &str = "glyphWidth";
pub const BASE_SPACING_LEFT: &str = "baseSpacingLeft";
pub const BASE_SPACING_RIGHT: &str = "baseSpacingRight";

#[derive(Debug)]
pub struct ComponentInstance {
    pub id: String,
    pub choices: Vec<GlyphName>,
    pub chosen: GlyphName,
    pub glyph: Box<GlyphInstance>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlyphMetrics {
    pub spacing_left: Option<f64>,
    pub spacing_right: Option<f64>,
    pub base_spacing_left: Option<f64>,
    pub base_spacing_right: Option<f64>,
    pub glyph_width: f64,
    pub advance_width: f64,
}

#[derive(Debug)]
pub struct GlyphInstance {
    name: GlyphName,
    unicode: Option<Codepoint>,
    font: Arc<FontSource>,
    cells: GlyphCells,
    components: Vec<ComponentInstance>,
    /// Values handed down by the glyph this one is a component of
    parent_parameters: IndexMap<String, f64>,
    /// Bumped on every structural change
    generation: u64,
    solving_order: Option<SolvingOrder>,
    /// Cell values of the last successful evaluation
    values: Option<Vec<f64>>,
    /// Whether each contour's outlines get reversed on export, decided once
    reversed: HashMap<usize, bool>,
    outline: BezPath,
    metrics: GlyphMetrics,
}

fn matrix(cells: &TransformCells, values: &[f64]) -> Affine {
    let origin = cells
        .origin
        .map(|[x, y]| Point::new(values[x], values[y]))
        .unwrap_or(Point::ORIGIN);
    let ops: Vec<_> = cells
        .ops
        .iter()
        .map(|(kind, args)| (*kind, args.iter().map(|i| values[*i]).collect::<Vec<_>>()))
        .collect();
    transform::compose(ops.iter().map(|(kind, args)| (*kind, args.as_slice())), origin)
}

fn outline_node(cells: &NodeCells, values: &[f64], point: Point) -> OutlineNode {
    let get = |idx: Option<usize>| idx.map(|i| values[i]);
    OutlineNode {
        point: matrix(&cells.transforms, values) * point,
        dir_in: get(cells.dir_in),
        dir_out: get(cells.dir_out),
        tension_in: get(cells.tension_in),
        tension_out: get(cells.tension_out),
    }
}

impl GlyphInstance {
    pub(crate) fn new(
        font: Arc<FontSource>,
        source: &GlyphSource,
        cells: GlyphCells,
        components: Vec<ComponentInstance>,
    ) -> GlyphInstance {
        GlyphInstance {
            name: source.name.clone(),
            unicode: source.unicode,
            font,
            cells,
            components,
            parent_parameters: IndexMap::new(),
            generation: 0,
            solving_order: None,
            values: None,
            reversed: HashMap::new(),
            outline: BezPath::new(),
            metrics: GlyphMetrics::default(),
        }
    }

    pub fn name(&self) -> &GlyphName {
        &self.name
    }

    pub fn unicode(&self) -> Option<Codepoint> {
        self.unicode
    }

    pub fn source(&self) -> Option<&GlyphSource> {
        self.font.glyph(self.name.as_str())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn components(&self) -> &[ComponentInstance] {
        &self.components
    }

    #[cfg(test)]
    pub(crate) fn cells(&self) -> &GlyphCells {
        &self.cells
    }

    /// The outline as of the last successful update, oriented for export.
    pub fn outline(&self) -> &BezPath {
        &self.outline
    }

    pub fn metrics(&self) -> &GlyphMetrics {
        &self.metrics
    }

    /// True once an update has succeeded.
    pub fn is_computed(&self) -> bool {
        self.values.is_some()
    }

    /// The solving order of the current graph generation.
    pub fn solving_order(&mut self) -> Result<Arc<[usize]>, GraphCycleError> {
        if let Some(cached) = &self.solving_order {
            if cached.generation == self.generation {
                return cached.steps.clone();
            }
        }
        trace!("Solve '{}' at generation {}", self.name, self.generation);
        let steps = solve::solving_order(&self.name, &self.cells.table).map(Arc::from);
        self.solving_order = Some(SolvingOrder {
            generation: self.generation,
            steps: steps.clone(),
        });
        steps
    }

    /// The solving order as cursors, `None` for a glyph with a cycle.
    pub fn solving_order_cursors(&mut self) -> Option<Vec<Cursor>> {
        let steps = self.solving_order().ok()?;
        Some(
            steps
                .iter()
                .map(|idx| self.cells.table.cursor(*idx).clone())
                .collect(),
        )
    }

    /// Swap the nested glyph of a component for another of its choices.
    pub fn change_component(&mut self, id: &str, choice: &GlyphName) -> Result<(), Error> {
        let Some(component) = self.components.iter_mut().find(|c| c.id == id) else {
            return Err(Error::UnknownComponent {
                glyph: self.name.clone(),
                component: id.to_string(),
            });
        };
        if !component.choices.contains(choice) {
            return Err(Error::UnknownComponentChoice {
                glyph: self.name.clone(),
                component: id.to_string(),
                choice: choice.clone(),
            });
        }
        if component.chosen == *choice {
            return Ok(());
        }
        let glyph = GlyphGraphBuilder::nested(&self.font, vec![self.name.clone()]).build(choice)?;
        debug!(
            "'{}' component '{id}': '{}' => '{choice}'",
            self.name, component.chosen
        );
        component.glyph = Box::new(glyph);
        component.chosen = choice.clone();
        self.generation += 1;
        Ok(())
    }

    /// Put every component, nested ones included, back on its default choice.
    pub fn reset_components(&mut self) -> Result<(), Error> {
        let resets: Vec<_> = self
            .components
            .iter()
            .filter_map(|c| {
                let default = c.choices.first()?;
                (*default != c.chosen).then(|| (c.id.clone(), default.clone()))
            })
            .collect();
        for (id, choice) in resets {
            self.change_component(&id, &choice)?;
        }
        for component in self.components.iter_mut() {
            component.glyph.reset_components()?;
        }
        Ok(())
    }

    fn apply_component_choices(&mut self, vector: &ParameterVector) {
        let Some(choices) = self
            .unicode
            .and_then(|u| vector.glyph_component_choice.get(&u))
        else {
            return;
        };
        for (id, choice) in choices {
            if let Err(e) = self.change_component(id, choice) {
                warn!("'{}' ignores a component choice: {e}", self.name);
            }
        }
    }

    /// Recompute the glyph.
    ///
    /// On failure the glyph keeps the geometry of its last successful update
    /// and the error says why; the caller decides whether to log or propagate.
    pub fn update(&mut self, scope: UpdateScope) -> Result<(), Error> {
        let params = params::resolve(scope, &self.name, self.unicode, &self.parent_parameters);
        self.apply_component_choices(scope.vector);

        let order = self.solving_order()?;
        let values = self.evaluate(&order, &params)?;

        for (component, cells) in self.components.iter_mut().zip(self.cells.components.iter()) {
            component.glyph.parent_parameters = cells
                .parameters
                .iter()
                .map(|(name, idx)| (name.clone(), values[*idx]))
                .collect();
            if let Err(e) = component.glyph.update(scope.with_base(&params.values)) {
                warn!(
                    "'{}' component '{}' keeps its previous geometry: {e}",
                    self.name, component.id
                );
            }
        }

        self.values = Some(values);
        self.rebuild(&params);
        Ok(())
    }

    fn evaluate(&self, order: &[usize], params: &GlyphParameters) -> Result<Vec<f64>, Error> {
        let table = &self.cells.table;
        let mut values = vec![f64::NAN; table.len()];
        for idx in order.iter().copied() {
            let cursor = table.cursor(idx);
            let lookup = |name: &str| {
                table
                    .binding(name, idx)
                    .map(|i| values[i])
                    .or_else(|| params.values.get(name).copied())
            };
            let value = table
                .expr(idx)
                .eval(&lookup)
                .map_err(|e| Error::Evaluation {
                    glyph: self.name.clone(),
                    cursor: cursor.clone(),
                    reason: e.to_string(),
                })?
                + params.manual.get(cursor.as_str()).copied().unwrap_or_default();
            if !value.is_finite() {
                return Err(Error::Evaluation {
                    glyph: self.name.clone(),
                    cursor: cursor.clone(),
                    reason: format!("evaluates to {value}"),
                });
            }
            values[idx] = value;
        }
        Ok(values)
    }

    /// Assemble the outline and metrics from the committed values.
    fn rebuild(&mut self, params: &GlyphParameters) {
        let Some(values) = self.values.as_ref() else {
            return;
        };
        let glyph_matrix = matrix(&self.cells.transforms, values);
        let mut outline = BezPath::new();

        for (ci, contour) in self.cells.contours.iter().enumerate() {
            let contour_matrix = glyph_matrix * matrix(&contour.transforms, values);
            let mut paths = if contour.skeleton {
                let side = |s: usize| {
                    contour.nodes.iter().filter_map(move |node| {
                        let [x, y] = node.expanded?[s];
                        Some(outline_node(node, values, Point::new(values[x], values[y])))
                    })
                };
                let left: Vec<_> = side(0).collect();
                let right: Vec<_> = side(1).rev().map(OutlineNode::reversed).collect();
                if contour.closed {
                    vec![outline::path(&left, true), outline::path(&right, true)]
                } else {
                    vec![outline::path(&[left, right].concat(), true)]
                }
            } else {
                let nodes: Vec<_> = contour
                    .nodes
                    .iter()
                    .map(|node| outline_node(node, values, Point::new(values[node.x], values[node.y])))
                    .collect();
                vec![outline::path(&nodes, contour.closed)]
            };
            for path in paths.iter_mut() {
                path.apply_affine(contour_matrix);
            }
            let reversed = *self.reversed.entry(ci).or_insert_with(|| {
                paths
                    .first()
                    .map(|p| !outline::is_clockwise(p))
                    .unwrap_or_default()
            });
            for path in paths {
                let path = if reversed { path.reverse_subpaths() } else { path };
                outline.extend(path.elements().iter().copied());
            }
        }

        for (component, cells) in self.components.iter().zip(self.cells.components.iter()) {
            let mut nested = component.glyph.outline.clone();
            nested.apply_affine(glyph_matrix * matrix(&cells.transforms, values));
            outline.extend(nested.elements().iter().copied());
        }

        let glyph_width = outline::width(&outline);
        let advance_width = self
            .cells
            .properties
            .get(ADVANCE_WIDTH)
            .map(|idx| values[*idx])
            .unwrap_or_else(|| {
                params.spacing_left.unwrap_or_default()
                    + glyph_width
                    + params.spacing_right.unwrap_or_default()
            });
        self.metrics = GlyphMetrics {
            spacing_left: params.spacing_left,
            spacing_right: params.spacing_right,
            base_spacing_left: params.base_spacing_left,
            base_spacing_right: params.base_spacing_right,
            glyph_width,
            advance_width,
        };
        self.outline = outline;
    }

    /// A named metric, or the value of a cell by cursor or property name.
    pub fn property(&self, name: &str) -> Option<f64> {
        let metrics = &self.metrics;
        match name {
            ADVANCE_WIDTH => return self.is_computed().then_some(metrics.advance_width),
            GLYPH_WIDTH => return self.is_computed().then_some(metrics.glyph_width),
            params::SPACING_LEFT => return metrics.spacing_left,
            params::SPACING_RIGHT => return metrics.spacing_right,
            BASE_SPACING_LEFT => return metrics.base_spacing_left,
            BASE_SPACING_RIGHT => return metrics.base_spacing_right,
            _ => (),
        }
        let values = self.values.as_ref()?;
        let table = &self.cells.table;
        table
            .position(name)
            .or_else(|| table.position(&format!("properties.{name}")))
            .map(|idx| values[idx])
    }
}
