//! 圆弧、圆与椭圆的离散化。
//!
//! 采样点先在实体自身的局部极坐标中计算，再逐点经过 [`Transform`]，
//! 因此非等比缩放会把圆弧正确地拉伸为椭圆弧。

use std::f64::consts::TAU;

use glam::DVec3;
use dxf2vec_core::document::{Arc, Circle, Ellipse};
use dxf2vec_core::geometry::Point3;

use crate::transform::Transform;

/// 单条曲线的分段上限，防止极小容差下分配失控。
pub const MAX_SEGMENTS: usize = 1 << 20;

/// 决定曲线分段数的方式。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampling {
    /// 按距离容差（毫米）计算分段数。
    Tolerance(f64),
    /// 整圆固定分段数，部分圆弧按扫掠角比例折算。用于估算图纸范围。
    Fixed(usize),
}

impl Sampling {
    pub fn arc_segments(self, angle_length: f64, radius: f64) -> usize {
        match self {
            Sampling::Tolerance(epsilon) => arc_segment_count(angle_length, radius, epsilon),
            Sampling::Fixed(full_turn) => {
                clamp_segments((angle_length.abs() / TAU * full_turn as f64).ceil(), 4)
            }
        }
    }

    pub fn circle_segments(self, radius: f64) -> usize {
        match self {
            Sampling::Tolerance(epsilon) => circle_segment_count(TAU * radius.abs(), epsilon),
            Sampling::Fixed(full_turn) => full_turn.max(2),
        }
    }
}

/// 圆弧分段数：max(4, ceil(|扫掠角 × 半径 / ε|))。
pub fn arc_segment_count(angle_length: f64, radius: f64, epsilon: f64) -> usize {
    clamp_segments((angle_length * radius / epsilon).abs().ceil(), 4)
}

/// 整圆分段数：max(2, floor(周长 / ε))。
pub fn circle_segment_count(circumference: f64, epsilon: f64) -> usize {
    clamp_segments((circumference / epsilon).floor(), 2)
}

fn clamp_segments(raw: f64, minimum: usize) -> usize {
    if raw.is_nan() {
        return minimum;
    }
    (raw.min(MAX_SEGMENTS as f64) as usize).max(minimum)
}

/// 圆弧采样，返回 `n + 1` 个点（含两个端点）。
pub fn arc_points(transform: &Transform, arc: &Arc, sampling: Sampling) -> Vec<DVec3> {
    let radius = transform.apply_length(arc.radius);
    let segments = sampling.arc_segments(arc.angle_length, radius);
    let mut step = arc.angle_length / segments as f64;
    if arc.reversed {
        step = -step;
    }
    (0..=segments)
        .map(|index| {
            let angle = arc.start_angle + step * index as f64;
            transform.apply_point(polar(arc.center, arc.radius, angle))
        })
        .collect()
}

/// 整圆采样。末点直接复用首点，保证闭合。
pub fn circle_points(transform: &Transform, circle: &Circle, sampling: Sampling) -> Vec<DVec3> {
    let radius = transform.apply_length(circle.radius);
    let segments = sampling.circle_segments(radius);
    let step = TAU / segments as f64;
    let mut points: Vec<DVec3> = (0..segments)
        .map(|index| transform.apply_point(polar(circle.center, circle.radius, step * index as f64)))
        .collect();
    if let Some(first) = points.first().copied() {
        points.push(first);
    }
    points
}

/// 椭圆（弧）采样，分段数按长半轴计算。完整椭圆的末点复用首点。
pub fn ellipse_points(transform: &Transform, ellipse: &Ellipse, sampling: Sampling) -> Vec<DVec3> {
    let major = ellipse.major_axis.as_vec3();
    let minor = DVec3::new(-major.y, major.x, 0.0) * ellipse.ratio;
    let sweep = ellipse.sweep();
    let radius = transform.apply_length(major.length());
    let segments = sampling.arc_segments(sweep, radius);
    let step = sweep / segments as f64;
    let center = ellipse.center.as_vec3();

    let sample = |parameter: f64| {
        let local = center + major * parameter.cos() + minor * parameter.sin();
        transform.apply_point(Point3::from_vec(local))
    };

    if ellipse.is_full() {
        let mut points: Vec<DVec3> = (0..segments)
            .map(|index| sample(ellipse.start_parameter + step * index as f64))
            .collect();
        if let Some(first) = points.first().copied() {
            points.push(first);
        }
        points
    } else {
        (0..=segments)
            .map(|index| sample(ellipse.start_parameter + step * index as f64))
            .collect()
    }
}

#[inline]
fn polar(center: Point3, radius: f64, angle: f64) -> Point3 {
    let (sin, cos) = angle.sin_cos();
    Point3::new(
        center.x() + radius * cos,
        center.y() + radius * sin,
        center.z(),
    )
}
