//! 实体展平：深度优先遍历顶层实体，展开块参照，为每个叶子实体生成一条多段线记录。

use glam::DVec3;
use tracing::{debug, warn};
use dxf2vec_core::document::{
    DrawingEntity, Document, Entity, Polyline, ResolvedStyle, Segment,
};
use dxf2vec_core::record::PolylineRecord;

use crate::simplify::douglas_peucker;
use crate::tessellate::{self, Sampling};
use crate::transform::Transform;

pub const DEFAULT_MAX_BLOCK_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlattenOptions {
    /// 离散化与化简容差（毫米）。
    pub epsilon: f64,
    pub max_block_depth: usize,
}

impl FlattenOptions {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            max_block_depth: DEFAULT_MAX_BLOCK_DEPTH,
        }
    }
}

/// 叶子实体变换后的点序列。
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub points: Vec<DVec3>,
    pub closed: bool,
    /// 仅多段线需要再做 Douglas–Peucker 化简。
    pub simplify: bool,
}

pub struct Flattener<'a> {
    document: &'a Document,
    options: FlattenOptions,
}

impl<'a> Flattener<'a> {
    pub fn new(document: &'a Document, options: FlattenOptions) -> Self {
        Self { document, options }
    }

    /// 生成全部记录，顺序与遍历顺序一致。
    pub fn flatten(&self) -> Vec<PolylineRecord> {
        let mut records = Vec::new();
        self.walk(|entity, transform, style| {
            if let Some(record) = self.record(entity, transform, style) {
                records.push(record);
            }
        });
        records
    }

    /// 遍历所有叶子实体（块参照会被展开），并把累积变换与解析后的样式交给 `visit`。
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&'a DrawingEntity, &Transform, ResolvedStyle),
    {
        let root = Transform::identity(self.document.unit());
        let mut chain: Vec<&'a str> = Vec::new();
        for entity in self.document.entities() {
            self.walk_entity(entity, &root, None, &mut chain, &mut visit);
        }
    }

    fn walk_entity<F>(
        &self,
        entity: &'a DrawingEntity,
        transform: &Transform,
        parent: Option<&ResolvedStyle>,
        chain: &mut Vec<&'a str>,
        visit: &mut F,
    ) where
        F: FnMut(&'a DrawingEntity, &Transform, ResolvedStyle),
    {
        let style = self.document.resolve_style(&entity.style, parent);
        let Entity::BlockReference(reference) = &entity.geometry else {
            visit(entity, transform, style);
            return;
        };

        let Some(block) = self.document.block(&reference.name) else {
            warn!(block = %reference.name, entity = entity.id.get(), "块参照指向不存在的块，已跳过");
            return;
        };
        if chain.contains(&block.name.as_str()) {
            warn!(block = %block.name, chain = ?chain, "检测到块的循环引用，已跳过");
            return;
        }
        if chain.len() >= self.options.max_block_depth {
            warn!(
                block = %block.name,
                depth = chain.len(),
                limit = self.options.max_block_depth,
                "块嵌套层数超出上限，已跳过"
            );
            return;
        }

        let nested = transform.nest(reference, block.base_point);
        chain.push(block.name.as_str());
        for child in &block.entities {
            self.walk_entity(child, &nested, Some(&style), chain, visit);
        }
        chain.pop();
    }

    fn record(
        &self,
        entity: &DrawingEntity,
        transform: &Transform,
        style: ResolvedStyle,
    ) -> Option<PolylineRecord> {
        let epsilon = self.options.epsilon;
        let Some(trace) = trace(&entity.geometry, transform, Sampling::Tolerance(epsilon)) else {
            debug!(
                kind = entity.geometry.kind_name(),
                entity = entity.id.get(),
                "实体类型不参与输出"
            );
            return None;
        };

        let points = if trace.simplify {
            douglas_peucker(&trace.points, epsilon)
        } else {
            trace.points
        };
        Some(PolylineRecord::new(
            entity.id.get(),
            style.color.to_int(),
            style.visible,
            trace.closed,
            points.into_iter().map(|point| point.as_vec3()).collect(),
        ))
    }
}

/// 把单个叶子实体转换为点序列；不产生输出的实体返回 `None`。
pub fn trace(entity: &Entity, transform: &Transform, sampling: Sampling) -> Option<Trace> {
    let (points, closed, simplify) = match entity {
        Entity::Line(line) => (
            vec![transform.apply_point(line.start), transform.apply_point(line.end)],
            false,
            false,
        ),
        Entity::Arc(arc) => (tessellate::arc_points(transform, arc, sampling), false, false),
        Entity::Circle(circle) => (
            tessellate::circle_points(transform, circle, sampling),
            true,
            false,
        ),
        Entity::Ellipse(ellipse) => (
            tessellate::ellipse_points(transform, ellipse, sampling),
            ellipse.is_full(),
            false,
        ),
        Entity::Polyline(polyline) => {
            let points = polyline_points(polyline, transform, sampling);
            if points.is_empty() {
                return None;
            }
            (points, polyline.is_closed, true)
        }
        Entity::BlockReference(_) | Entity::Point(_) | Entity::Text(_) => return None,
    };
    Some(Trace {
        points,
        closed,
        simplify,
    })
}

/// 依次拼接子线段与子圆弧的点；闭合时补上首点。相邻重复点只保留一个。
fn polyline_points(polyline: &Polyline, transform: &Transform, sampling: Sampling) -> Vec<DVec3> {
    let mut points = Vec::new();
    for segment in &polyline.segments {
        match segment {
            Segment::Line(line) => {
                push_distinct(&mut points, transform.apply_point(line.start));
                push_distinct(&mut points, transform.apply_point(line.end));
            }
            Segment::Arc(arc) => {
                for point in tessellate::arc_points(transform, arc, sampling) {
                    push_distinct(&mut points, point);
                }
            }
        }
    }
    if polyline.is_closed {
        if let Some(first) = points.first().copied() {
            push_distinct(&mut points, first);
        }
    }
    points
}

#[inline]
fn push_distinct(points: &mut Vec<DVec3>, point: DVec3) {
    if points.last() != Some(&point) {
        points.push(point);
    }
}
