use dxf2vec_core::document::Document;
use dxf2vec_core::geometry::Bounds2D;

use crate::epsilon::MIN_EPSILON;
use crate::flatten::{FlattenOptions, Flattener, trace};
use crate::tessellate::Sampling;

/// 估算范围时整圆的采样段数。
const EXTENTS_SEGMENTS: usize = 64;

/// 图纸在毫米坐标下的 XY 范围，沿用展平时的块展开与变换。
pub fn drawing_extents(document: &Document, max_block_depth: usize) -> Bounds2D {
    let options = FlattenOptions {
        epsilon: MIN_EPSILON,
        max_block_depth,
    };
    let mut bounds = Bounds2D::empty();
    Flattener::new(document, options).walk(|entity, transform, _style| {
        if let Some(trace) = trace(
            &entity.geometry,
            transform,
            Sampling::Fixed(EXTENTS_SEGMENTS),
        ) {
            for point in trace.points {
                bounds.include_point(point.truncate());
            }
        }
    });
    bounds
}

#[cfg(test)]
mod tests {
    use dxf2vec_core::document::BlockDefinition;
    use dxf2vec_core::document::{Entity, EntityStyle, Line};
    use dxf2vec_core::geometry::{Point3, Vector3};
    use dxf2vec_core::units::Unit;
    use glam::DVec2;

    use super::*;

    #[test]
    fn empty_drawing_has_empty_extents() {
        let extents = drawing_extents(&Document::new(), 64);
        assert!(extents.is_empty());
        assert_eq!(extents.max_dimension(), 0.0);
    }

    #[test]
    fn extents_cover_lines_and_circles() {
        let mut doc = Document::new();
        doc.add_line(Point3::xy(0.0, 0.0), Point3::xy(10.0, 0.0), "0");
        doc.add_circle(Point3::xy(20.0, 0.0), 5.0, "0");
        let extents = drawing_extents(&doc, 64);
        assert!(extents.min().abs_diff_eq(DVec2::new(0.0, -5.0), 1e-9));
        assert!(extents.max().abs_diff_eq(DVec2::new(25.0, 5.0), 1e-9));
        assert!((extents.max_dimension() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn extents_follow_block_transforms_and_units() {
        let mut doc = Document::new();
        doc.set_unit(Unit::Centimeter);
        let child = doc.make_entity(
            EntityStyle::default(),
            Entity::Line(Line {
                start: Point3::xy(0.0, 0.0),
                end: Point3::xy(1.0, 0.0),
            }),
        );
        doc.add_block_definition(BlockDefinition {
            name: "B".to_string(),
            base_point: Point3::xy(0.0, 0.0),
            entities: vec![child],
        });
        doc.add_block_reference("B", Point3::xy(0.0, 0.0), Vector3::new(3.0, 3.0, 1.0), 0.0, "0");
        let extents = drawing_extents(&doc, 64);
        assert!((extents.max_dimension() - 30.0).abs() < 1e-9);
    }
}
