//! Drawable outlines from evaluated nodes.

use kurbo::{BezPath, Point, Shape, Vec2};

/// An on-curve point with its optional curve handles.
///
/// Directions are in degrees; a segment is curved when either of its ends
/// carries a tension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineNode {
    pub point: Point,
    pub dir_in: Option<f64>,
    pub dir_out: Option<f64>,
    pub tension_in: Option<f64>,
    pub tension_out: Option<f64>,
}

impl OutlineNode {
    pub fn corner(point: Point) -> OutlineNode {
        OutlineNode {
            point,
            dir_in: None,
            dir_out: None,
            tension_in: None,
            tension_out: None,
        }
    }

    /// The same node traversed the other way.
    pub fn reversed(self) -> OutlineNode {
        OutlineNode {
            point: self.point,
            dir_in: self.dir_out.map(|d| d + 180.0),
            dir_out: self.dir_in.map(|d| d + 180.0),
            tension_in: self.tension_out,
            tension_out: self.tension_in,
        }
    }
}

fn unit(degrees: f64) -> Vec2 {
    let radians = degrees.to_radians();
    Vec2::new(radians.cos(), radians.sin())
}

fn segment(path: &mut BezPath, from: &OutlineNode, to: &OutlineNode) {
    if from.tension_out.is_none() && to.tension_in.is_none() {
        path.line_to(to.point);
        return;
    }
    let chord = to.point - from.point;
    let length = chord.hypot() / 3.0;
    let along = chord.atan2().to_degrees();
    let out = unit(from.dir_out.unwrap_or(along)) * from.tension_out.unwrap_or(1.0) * length;
    let into = unit(to.dir_in.unwrap_or(along)) * to.tension_in.unwrap_or(1.0) * length;
    path.curve_to(from.point + out, to.point - into, to.point);
}

/// A path through `nodes`, closed back to the first node if `closed`.
pub fn path(nodes: &[OutlineNode], closed: bool) -> BezPath {
    let mut path = BezPath::new();
    let Some(first) = nodes.first() else {
        return path;
    };
    path.move_to(first.point);
    for pair in nodes.windows(2) {
        segment(&mut path, &pair[0], &pair[1]);
    }
    if closed && nodes.len() > 1 {
        // a straight closing segment is implied by the close
        if let Some(last) = nodes.last() {
            if last.tension_out.is_some() || first.tension_in.is_some() {
                segment(&mut path, last, first);
            }
        }
        path.close_path();
    }
    path
}

/// True if `path` runs clockwise with y pointing up.
pub fn is_clockwise(path: &BezPath) -> bool {
    path.area() < 0.0
}

/// Width of the bounds of `path`, zero for an empty path.
pub fn width(path: &BezPath) -> f64 {
    if path.elements().is_empty() {
        return 0.0;
    }
    path.bounding_box().width()
}

#[cfg(test)]
mod tests {
    use kurbo::PathEl;

    use super::*;

    fn square(clockwise: bool) -> Vec<OutlineNode> {
        let mut points = vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)];
        if !clockwise {
            points.reverse();
        }
        points
            .into_iter()
            .map(|p| OutlineNode::corner(p.into()))
            .collect()
    }

    #[test]
    fn orientation() {
        assert!(is_clockwise(&path(&square(true), true)));
        assert!(!is_clockwise(&path(&square(false), true)));
    }

    #[test]
    fn tension_makes_curves() {
        let mut nodes = square(true);
        nodes[1].tension_out = Some(1.0);
        nodes[1].dir_out = Some(0.0);
        let path = path(&nodes, true);
        let curves = path
            .elements()
            .iter()
            .filter(|el| matches!(el, PathEl::CurveTo(..)))
            .count();
        assert_eq!(1, curves);
        let Some(PathEl::CurveTo(c1, ..)) = path.elements().get(2) else {
            panic!("expected a curve, got {:?}", path.elements());
        };
        assert!((*c1 - Point::new(10.0 / 3.0, 10.0)).hypot() < 1e-9);
    }

    #[test]
    fn reversing_swaps_handles() {
        let node = OutlineNode {
            point: Point::ORIGIN,
            dir_in: Some(90.0),
            dir_out: None,
            tension_in: Some(0.5),
            tension_out: None,
        };
        let reversed = node.reversed();
        assert_eq!(Some(270.0), reversed.dir_out);
        assert_eq!(Some(0.5), reversed.tension_out);
        assert_eq!(None, reversed.tension_in);
    }

    #[test]
    fn empty_path_has_no_width() {
        assert_eq!(0.0, width(&path(&[], true)));
        assert_eq!(10.0, width(&path(&square(true), true)));
    }
}
