//! Construction of the per-glyph property graph from a template.
//!
//! Every computable property of a glyph becomes a cell addressed by its
//! [Cursor]. Formula references become edges between cells; skeleton nodes get
//! generated `expandedTo` cells whose formulas reference the node position and
//! its expansion parameters, so expansion edges fall out of ordinary reference
//! resolution.

use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;
use log::trace;

use crate::{
    error::Error,
    expr::{self, Expr},
    glyph::{ComponentInstance, GlyphInstance},
    template::{
        ComponentSource, ContourSource, ExpandSource, Formula, GlyphSource, PointSource,
        Template, TransformKind, TransformSource,
    },
    transform,
    types::{Cursor, GlyphName},
};

/// The template a glyph graph was built from, indexed by glyph name.
///
/// Every glyph instance keeps a reference to the source it belongs to so
/// component swaps can build new nested instances without a walk up the tree.
#[derive(Debug)]
pub struct FontSource {
    template: Template,
    by_name: HashMap<GlyphName, usize>,
}

impl FontSource {
    pub fn new(template: Template) -> FontSource {
        let by_name = template
            .glyphs
            .values()
            .enumerate()
            .map(|(i, g)| (g.name.clone(), i))
            .collect();
        FontSource { template, by_name }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn glyph(&self, name: &str) -> Option<&GlyphSource> {
        let idx = *self.by_name.get(name)?;
        self.template.glyphs.get_index(idx).map(|(_, g)| g)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Glyph sources in declaration order
    pub fn glyphs(&self) -> impl Iterator<Item = &GlyphSource> {
        self.template.glyphs.values()
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub cursor: Cursor,
    pub formula: String,
    expr: Expr,
    explicit: Vec<String>,
    deps: Vec<usize>,
}

/// The cells of one glyph, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct CellTable {
    cells: Vec<Cell>,
    index: HashMap<Cursor, usize>,
}

impl CellTable {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn position(&self, cursor: &str) -> Option<usize> {
        self.index.get(cursor).copied()
    }

    pub fn cursor(&self, idx: usize) -> &Cursor {
        &self.cells[idx].cursor
    }

    pub(crate) fn expr(&self, idx: usize) -> &Expr {
        &self.cells[idx].expr
    }

    /// Cells `idx` must be computed after, sorted, possibly including `idx` itself.
    pub fn dependencies(&self, idx: usize) -> &[usize] {
        &self.cells[idx].deps
    }

    /// The cell a reference made from cell `current` binds to, if any.
    ///
    /// `thickness` binds to a cell named `thickness`, then to the glyph-local
    /// `parameters.thickness` unless that is the cell being computed.
    /// Anything else is looked up in the merged parameters at evaluation time.
    pub fn binding(&self, name: &str, current: usize) -> Option<usize> {
        if let Some(idx) = self.position(name) {
            return Some(idx);
        }
        self.position(&format!("parameters.{name}"))
            .filter(|idx| *idx != current)
    }

    fn add(&mut self, glyph: &GlyphName, cursor: String, formula: &Formula) -> Result<usize, Error> {
        let text = formula.text();
        let expr = match formula {
            Formula::Constant(value) => Expr::Number(*value),
            _ => expr::parse(&text).map_err(|e| Error::BadFormula {
                glyph: glyph.clone(),
                cursor: Cursor::new(&cursor),
                formula: text.clone(),
                reason: e.to_string(),
            })?,
        };
        let explicit = formula
            .explicit_dependencies()
            .iter()
            .map(|d| normalize_reference(d))
            .collect();
        let idx = self.cells.len();
        let cursor = Cursor::from(cursor);
        self.index.insert(cursor.clone(), idx);
        self.cells.push(Cell {
            cursor,
            formula: text,
            expr,
            explicit,
            deps: Vec::new(),
        });
        Ok(idx)
    }

    fn link(&mut self) {
        for idx in 0..self.cells.len() {
            let cell = &self.cells[idx];
            let mut deps: Vec<usize> = cell
                .expr
                .references()
                .into_iter()
                .filter_map(|r| self.binding(r, idx))
                .collect();
            for prefix in cell.explicit.iter() {
                deps.extend(
                    self.cells
                        .iter()
                        .enumerate()
                        .filter(|(other, c)| *other != idx && c.cursor.starts_with_segments(prefix))
                        .map(|(other, _)| other),
                );
            }
            deps.sort_unstable();
            deps.dedup();
            self.cells[idx].deps = deps;
        }
    }
}

/// `contours[0].nodes[1]` to `contours.0.nodes.1`
fn normalize_reference(reference: &str) -> String {
    reference.replace('[', ".").replace(']', "")
}

/// Cells holding the arguments of a transform list and its origin.
#[derive(Debug, Clone, Default)]
pub(crate) struct TransformCells {
    pub(crate) ops: Vec<(TransformKind, Vec<usize>)>,
    pub(crate) origin: Option<[usize; 2]>,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeCells {
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) dir_in: Option<usize>,
    pub(crate) dir_out: Option<usize>,
    pub(crate) tension_in: Option<usize>,
    pub(crate) tension_out: Option<usize>,
    /// `[side][axis]` of the expanded counterparts, skeleton nodes only
    pub(crate) expanded: Option<[[usize; 2]; 2]>,
    pub(crate) transforms: TransformCells,
}

#[derive(Debug, Clone)]
pub(crate) struct ContourCells {
    pub(crate) skeleton: bool,
    pub(crate) closed: bool,
    pub(crate) nodes: Vec<NodeCells>,
    pub(crate) transforms: TransformCells,
}

#[derive(Debug, Clone)]
pub(crate) struct ComponentCells {
    pub(crate) parameters: Vec<(String, usize)>,
    pub(crate) transforms: TransformCells,
}

/// The structure of one glyph: its cells and where they sit in the geometry.
#[derive(Debug, Clone)]
pub(crate) struct GlyphCells {
    pub(crate) table: CellTable,
    pub(crate) properties: IndexMap<String, usize>,
    pub(crate) contours: Vec<ContourCells>,
    pub(crate) components: Vec<ComponentCells>,
    pub(crate) transforms: TransformCells,
}

/// Builds glyph instances, nested component instances included.
pub struct GlyphGraphBuilder<'a> {
    font: &'a Arc<FontSource>,
    /// Glyphs being built, outermost first, to detect component cycles
    stack: Vec<GlyphName>,
}

impl<'a> GlyphGraphBuilder<'a> {
    pub fn new(font: &'a Arc<FontSource>) -> Self {
        GlyphGraphBuilder {
            font,
            stack: Vec::new(),
        }
    }

    /// A builder for components nested somewhere under `ancestors`.
    pub(crate) fn nested(font: &'a Arc<FontSource>, ancestors: Vec<GlyphName>) -> Self {
        GlyphGraphBuilder {
            font,
            stack: ancestors,
        }
    }

    pub fn build(&mut self, name: &GlyphName) -> Result<GlyphInstance, Error> {
        if self.stack.contains(name) {
            let mut cycle = self.stack.clone();
            cycle.push(name.clone());
            return Err(Error::ComponentCycle(cycle));
        }
        let font = self.font;
        let source = font
            .glyph(name.as_str())
            .ok_or_else(|| Error::UnknownGlyph(name.clone()))?;
        trace!("Build graph of '{name}'");

        let mut cells = GlyphCellsBuilder {
            glyph: name,
            table: CellTable::default(),
        };
        let glyph_cells = cells.glyph(source)?;

        self.stack.push(name.clone());
        let components = source
            .components
            .iter()
            .map(|c| self.component(c))
            .collect::<Result<Vec<_>, _>>();
        self.stack.pop();

        Ok(GlyphInstance::new(
            self.font.clone(),
            source,
            glyph_cells,
            components?,
        ))
    }

    fn component(&mut self, source: &ComponentSource) -> Result<ComponentInstance, Error> {
        let choices = source.base.choices().to_vec();
        let Some(chosen) = choices.first().cloned() else {
            return Err(Error::UnknownComponent {
                glyph: self.stack.last().cloned().unwrap_or(GlyphName::NOTDEF),
                component: source.id.clone(),
            });
        };
        let glyph = self.build(&chosen)?;
        Ok(ComponentInstance {
            id: source.id.clone(),
            choices,
            chosen,
            glyph: Box::new(glyph),
        })
    }
}

struct GlyphCellsBuilder<'a> {
    glyph: &'a GlyphName,
    table: CellTable,
}

impl GlyphCellsBuilder<'_> {
    fn add(&mut self, cursor: String, formula: &Formula) -> Result<usize, Error> {
        self.table.add(self.glyph, cursor, formula)
    }

    fn add_optional(&mut self, cursor: String, formula: Option<&Formula>) -> Result<Option<usize>, Error> {
        formula.map(|f| self.add(cursor, f)).transpose()
    }

    fn glyph(&mut self, source: &GlyphSource) -> Result<GlyphCells, Error> {
        for (name, f) in &source.parameters {
            self.add(format!("parameters.{name}"), f)?;
        }
        let properties = source
            .properties
            .iter()
            .map(|(name, f)| -> Result<_, Error> {
                Ok((name.clone(), self.add(format!("properties.{name}"), f)?))
            })
            .collect::<Result<IndexMap<_, _>, _>>()?;
        let contours = source
            .contours
            .iter()
            .enumerate()
            .map(|(i, c)| self.contour(&format!("contours.{i}"), c))
            .collect::<Result<Vec<_>, _>>()?;
        let components = source
            .components
            .iter()
            .enumerate()
            .map(|(i, c)| self.component(&format!("components.{i}"), c))
            .collect::<Result<Vec<_>, _>>()?;
        let transforms = self.transforms("", &source.transforms, source.transform_origin.as_ref())?;

        let mut table = std::mem::take(&mut self.table);
        table.link();
        Ok(GlyphCells {
            table,
            properties,
            contours,
            components,
            transforms,
        })
    }

    fn contour(&mut self, prefix: &str, source: &ContourSource) -> Result<ContourCells, Error> {
        let nodes = source
            .nodes
            .iter()
            .enumerate()
            .map(|(j, node)| -> Result<NodeCells, Error> {
                let at = format!("{prefix}.nodes.{j}");
                let x = self.add(format!("{at}.x"), &node.x)?;
                let y = self.add(format!("{at}.y"), &node.y)?;
                let dir_in = self.add_optional(format!("{at}.dirIn"), node.dir_in.as_ref())?;
                let dir_out = self.add_optional(format!("{at}.dirOut"), node.dir_out.as_ref())?;
                let tension_in =
                    self.add_optional(format!("{at}.tensionIn"), node.tension_in.as_ref())?;
                let tension_out =
                    self.add_optional(format!("{at}.tensionOut"), node.tension_out.as_ref())?;
                let expanded = if source.skeleton {
                    Some(self.expansion(&at, node.expand.as_ref())?)
                } else {
                    None
                };
                let transforms =
                    self.transforms(&at, &node.transforms, node.transform_origin.as_ref())?;
                Ok(NodeCells {
                    x,
                    y,
                    dir_in,
                    dir_out,
                    tension_in,
                    tension_out,
                    expanded,
                    transforms,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let transforms = self.transforms(prefix, &source.transforms, source.transform_origin.as_ref())?;
        Ok(ContourCells {
            skeleton: source.skeleton,
            closed: source.closed,
            nodes,
            transforms,
        })
    }

    /// Expansion parameters of skeleton node `at` and the two points they produce.
    fn expansion(&mut self, at: &str, expand: Option<&ExpandSource>) -> Result<[[usize; 2]; 2], Error> {
        let flat = ExpandSource {
            width: Formula::Constant(0.0),
            angle: Formula::Constant(0.0),
            distr: Formula::Constant(0.5),
        };
        let expand = expand.unwrap_or(&flat);
        self.add(format!("{at}.expand.width"), &expand.width)?;
        self.add(format!("{at}.expand.angle"), &expand.angle)?;
        self.add(format!("{at}.expand.distr"), &expand.distr)?;

        let offset = |axis: &str, trig: &str, share: &str| {
            Formula::Expression(format!(
                "{at}.{axis} {trig}({at}.expand.angle)) * {at}.expand.width * {share}"
            ))
        };
        let left_share = format!("{at}.expand.distr");
        let right_share = format!("(1 - {at}.expand.distr)");
        Ok([
            [
                self.add(
                    format!("{at}.expandedTo.0.x"),
                    &offset("x", "- cos(rad", &left_share),
                )?,
                self.add(
                    format!("{at}.expandedTo.0.y"),
                    &offset("y", "- sin(rad", &left_share),
                )?,
            ],
            [
                self.add(
                    format!("{at}.expandedTo.1.x"),
                    &offset("x", "+ cos(rad", &right_share),
                )?,
                self.add(
                    format!("{at}.expandedTo.1.y"),
                    &offset("y", "+ sin(rad", &right_share),
                )?,
            ],
        ])
    }

    fn component(&mut self, prefix: &str, source: &ComponentSource) -> Result<ComponentCells, Error> {
        let parameters = source
            .parameters
            .iter()
            .map(|(name, f)| -> Result<_, Error> {
                Ok((
                    name.clone(),
                    self.add(format!("{prefix}.parameters.{name}"), f)?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let transforms = self.transforms(prefix, &source.transforms, source.transform_origin.as_ref())?;
        Ok(ComponentCells {
            parameters,
            transforms,
        })
    }

    fn transforms(
        &mut self,
        prefix: &str,
        ops: &[TransformSource],
        origin: Option<&PointSource>,
    ) -> Result<TransformCells, Error> {
        let at = |rest: String| {
            if prefix.is_empty() {
                rest
            } else {
                format!("{prefix}.{rest}")
            }
        };
        let mut cells = TransformCells::default();
        for (t, op) in ops.iter().enumerate() {
            let args = op.args();
            let (min, max) = transform::arity(op.kind());
            if args.len() < min || args.len() > max {
                return Err(Error::TransformArity {
                    glyph: self.glyph.clone(),
                    kind: format!("{:?}", op.kind()),
                    expected: if min == max { "1" } else { "1 or 2" },
                    actual: args.len(),
                });
            }
            let args = args
                .into_iter()
                .enumerate()
                .map(|(a, f)| self.add(at(format!("transforms.{t}.{a}")), f))
                .collect::<Result<Vec<_>, _>>()?;
            cells.ops.push((op.kind(), args));
        }
        if let Some(origin) = origin {
            cells.origin = Some([
                self.add(at("transformOrigin.x".to_string()), &origin.x)?,
                self.add(at("transformOrigin.y".to_string()), &origin.y)?,
            ]);
        }
        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn font(json: &str) -> Arc<FontSource> {
        Arc::new(FontSource::new(Template::from_json(json).unwrap()))
    }

    fn cursors(table: &CellTable, idxs: &[usize]) -> Vec<String> {
        idxs.iter().map(|i| table.cursor(*i).to_string()).collect()
    }

    #[test]
    fn references_become_edges() {
        let font = font(
            r#"{"glyphs": {"a": {"name": "a", "parameters": {"thickness": "thickness * 2"},
                "contours": [{"nodes": [
                    {"x": "contours[0].nodes[1].x - thickness", "y": 0},
                    {"x": 100, "y": {"_operation": "xHeight", "_dependencies": ["contours.0.nodes.0"]}}
                ]}]}}}"#,
        );
        let glyph = GlyphGraphBuilder::new(&font).build(&"a".into()).unwrap();
        let table = &glyph.cells().table;
        let x0 = table.position("contours.0.nodes.0.x").unwrap();
        let y1 = table.position("contours.0.nodes.1.y").unwrap();
        // the parameter's own formula reads the merged value, not itself
        assert!(table.dependencies(0).is_empty());
        assert_eq!(
            vec!["parameters.thickness", "contours.0.nodes.1.x"],
            cursors(table, table.dependencies(x0))
        );
        assert_eq!(
            vec!["contours.0.nodes.0.x", "contours.0.nodes.0.y"],
            cursors(table, table.dependencies(y1))
        );
    }

    #[test]
    fn skeleton_nodes_expand() {
        let font = font(
            r#"{"glyphs": {"l": {"name": "l", "contours": [{"skeleton": true, "closed": false, "nodes": [
                {"x": 0, "y": 0, "expand": {"width": 10, "angle": 0}},
                {"x": 0, "y": 100, "expand": {"width": 10, "angle": 0}}
            ]}]}}}"#,
        );
        let glyph = GlyphGraphBuilder::new(&font).build(&"l".into()).unwrap();
        let table = &glyph.cells().table;
        let side = table.position("contours.0.nodes.1.expandedTo.1.x").unwrap();
        assert_eq!(
            vec![
                "contours.0.nodes.1.x",
                "contours.0.nodes.1.expand.width",
                "contours.0.nodes.1.expand.angle",
                "contours.0.nodes.1.expand.distr",
            ],
            cursors(table, table.dependencies(side))
        );
    }

    #[test]
    fn bad_formula_is_fatal() {
        let font = font(r#"{"glyphs": {"a": {"name": "a", "properties": {"advanceWidth": "1 +"}}}}"#);
        let err = GlyphGraphBuilder::new(&font).build(&"a".into()).unwrap_err();
        assert!(matches!(err, Error::BadFormula { .. }), "{err:?}");
    }

    #[test]
    fn transform_arity() {
        let font = font(r#"{"glyphs": {"a": {"name": "a", "transforms": [["rotate", 1, 2]]}}}"#);
        let err = GlyphGraphBuilder::new(&font).build(&"a".into()).unwrap_err();
        assert!(
            matches!(err, Error::TransformArity { actual: 2, .. }),
            "{err:?}"
        );
    }

    #[test]
    fn component_cycle() {
        let font = font(
            r#"{"glyphs": {
                "a": {"name": "a", "components": [{"id": "c", "base": "b"}]},
                "b": {"name": "b", "components": [{"id": "c", "base": "a"}]}
            }}"#,
        );
        let err = GlyphGraphBuilder::new(&font).build(&"a".into()).unwrap_err();
        let Error::ComponentCycle(names) = err else {
            panic!("expected a cycle, got {err:?}");
        };
        assert_eq!(vec!["a", "b", "a"], names.iter().map(|n| n.as_str()).collect::<Vec<_>>());
    }

    #[test]
    fn unknown_component_base() {
        let font = font(r#"{"glyphs": {"a": {"name": "a", "components": [{"id": "c", "base": "zz"}]}}}"#);
        let err = GlyphGraphBuilder::new(&font).build(&"a".into()).unwrap_err();
        assert!(matches!(err, Error::UnknownGlyph(name) if name == "zz"));
    }
}
