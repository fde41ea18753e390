//! Composition of transform-operation lists into matrices.
//!
//! A matrix is always rebuilt from the canonical operation list and assigned to
//! its owner, so repeated updates never compound.

use kurbo::{Affine, Point, Vec2};

use crate::template::TransformKind;

/// Accepted argument counts, as `(min, max)`
pub(crate) fn arity(kind: TransformKind) -> (usize, usize) {
    match kind {
        TransformKind::Scale | TransformKind::Translate => (1, 2),
        _ => (1, 1),
    }
}

fn operation(kind: TransformKind, args: &[f64]) -> Affine {
    let first = args.first().copied().unwrap_or_default();
    match kind {
        TransformKind::Rotate => Affine::rotate(first.to_radians()),
        TransformKind::Scale => {
            Affine::scale_non_uniform(first, args.get(1).copied().unwrap_or(first))
        }
        TransformKind::ScaleX => Affine::scale_non_uniform(first, 1.0),
        TransformKind::ScaleY => Affine::scale_non_uniform(1.0, first),
        TransformKind::SkewX => Affine::new([1.0, 0.0, first.to_radians().tan(), 1.0, 0.0, 0.0]),
        TransformKind::SkewY => Affine::new([1.0, first.to_radians().tan(), 0.0, 1.0, 0.0, 0.0]),
        TransformKind::Translate => {
            Affine::translate((first, args.get(1).copied().unwrap_or_default()))
        }
        TransformKind::TranslateX => Affine::translate((first, 0.0)),
        TransformKind::TranslateY => Affine::translate((0.0, first)),
    }
}

/// Compose `ops` about `origin`.
///
/// Operations read left to right like an SVG transform attribute: the last
/// operation is applied to the geometry first.
pub fn compose<'a>(
    ops: impl IntoIterator<Item = (TransformKind, &'a [f64])>,
    origin: Point,
) -> Affine {
    let to_origin = Vec2::new(origin.x, origin.y);
    let composed = ops
        .into_iter()
        .fold(Affine::IDENTITY, |acc, (kind, args)| acc * operation(kind, args));
    Affine::translate(to_origin) * composed * Affine::translate(-to_origin)
}

#[cfg(test)]
mod tests {
    use kurbo::Point;

    use super::*;

    fn assert_close(expected: Point, actual: Point) {
        assert!(
            (expected - actual).hypot() < 1e-9,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn empty_list_is_identity() {
        let ops: Vec<(TransformKind, &[f64])> = Vec::new();
        assert_eq!(Affine::IDENTITY, compose(ops, Point::new(12.0, 7.0)));
    }

    #[test]
    fn rotate_about_origin() {
        let m = compose([(TransformKind::Rotate, &[90.0][..])], Point::new(10.0, 0.0));
        assert_close(Point::new(10.0, 0.0), m * Point::new(10.0, 0.0));
        assert_close(Point::new(10.0, 10.0), m * Point::new(20.0, 0.0));
    }

    #[test]
    fn last_operation_applies_first() {
        let m = compose(
            [
                (TransformKind::Translate, &[100.0, 0.0][..]),
                (TransformKind::Scale, &[2.0][..]),
            ],
            Point::ORIGIN,
        );
        assert_close(Point::new(102.0, 2.0), m * Point::new(1.0, 1.0));
    }

    #[test]
    fn skew_and_axis_ops() {
        let m = compose([(TransformKind::SkewX, &[45.0][..])], Point::ORIGIN);
        assert_close(Point::new(10.0, 10.0), m * Point::new(0.0, 10.0));
        let m = compose(
            [
                (TransformKind::TranslateY, &[5.0][..]),
                (TransformKind::ScaleX, &[3.0][..]),
            ],
            Point::ORIGIN,
        );
        assert_close(Point::new(3.0, 6.0), m * Point::new(1.0, 1.0));
    }

    #[test]
    fn recomposing_does_not_drift() {
        let ops = [(TransformKind::Rotate, &[10.0][..])];
        let first = compose(ops, Point::new(3.0, 4.0));
        let again = compose(ops, Point::new(3.0, 4.0));
        assert_eq!(first, again);
    }
}
