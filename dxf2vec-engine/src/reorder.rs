//! 贪心最近邻排序：缩短相邻多段线之间的空行程。
//!
//! 只调整记录顺序、方向（开放记录反转）与起点（闭合记录旋转），
//! 输出始终是输入的一个排列。

use glam::Vec3;
use tracing::debug;
use dxf2vec_core::record::PolylineRecord;

/// 深度约束的容差：候选点 z 不高于当前 z + DEPTH_TOLERANCE 时优先选取。
pub const DEPTH_TOLERANCE: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Entry {
    Start,
    End,
    Interior(usize),
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    record: usize,
    entry: Entry,
    distance: f32,
}

/// 对记录排序，`anchor` 缺省时从原点出发。
pub fn reorder(records: Vec<PolylineRecord>, anchor: Option<Vec3>) -> Vec<PolylineRecord> {
    let total = records.len();
    let mut remaining = records;
    let mut ordered = Vec::with_capacity(total);

    let first = match anchor {
        Some(point) => exact_start(&remaining, point).or_else(|| nearest(&remaining, point, None)),
        None => nearest(&remaining, Vec3::ZERO, None),
    };
    let Some(first) = first else {
        return remaining;
    };
    let mut cursor = place(&mut remaining, first, &mut ordered);

    while !remaining.is_empty() {
        let candidate = nearest(&remaining, cursor, Some(cursor.z + DEPTH_TOLERANCE))
            .or_else(|| nearest(&remaining, cursor, None));
        match candidate {
            Some(candidate) => cursor = place(&mut remaining, candidate, &mut ordered),
            None => {
                debug!(leftovers = remaining.len(), "剩余记录无可用端点，按原顺序追加");
                ordered.append(&mut remaining);
            }
        }
    }

    debug_assert_eq!(ordered.len(), total);
    ordered
}

/// 首点与锚点完全相同的第一条记录。
fn exact_start(records: &[PolylineRecord], anchor: Vec3) -> Option<Candidate> {
    records
        .iter()
        .position(|record| record.first_point() == Some(anchor))
        .map(|record| Candidate {
            record,
            entry: Entry::Start,
            distance: 0.0,
        })
}

/// 线性扫描找最近的候选点，距离相等时保留先遇到的。
fn nearest(records: &[PolylineRecord], from: Vec3, max_depth: Option<f32>) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for (index, record) in records.iter().enumerate() {
        for (entry, point) in entries(record) {
            if max_depth.is_some_and(|limit| point.z > limit) {
                continue;
            }
            let distance = from.distance_squared(point);
            if best.is_none_or(|current| distance < current.distance) {
                best = Some(Candidate {
                    record: index,
                    entry,
                    distance,
                });
            }
        }
    }
    best
}

/// 记录可作为起点的位置：开放记录为首末点，闭合环为除重复末点外的每个点。
fn entries(record: &PolylineRecord) -> Vec<(Entry, Vec3)> {
    let points = &record.points;
    if is_ring(record) {
        let body = &points[..points.len() - 1];
        return body
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let entry = if index == 0 {
                    Entry::Start
                } else {
                    Entry::Interior(index)
                };
                (entry, *point)
            })
            .collect();
    }
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() > 1 => {
            vec![(Entry::Start, *first), (Entry::End, *last)]
        }
        (Some(first), _) => vec![(Entry::Start, *first)],
        _ => Vec::new(),
    }
}

fn is_ring(record: &PolylineRecord) -> bool {
    record.closed && record.points.len() > 2 && record.first_point() == record.last_point()
}

fn place(
    remaining: &mut Vec<PolylineRecord>,
    candidate: Candidate,
    ordered: &mut Vec<PolylineRecord>,
) -> Vec3 {
    let mut record = remaining.remove(candidate.record);
    match candidate.entry {
        Entry::Start => {}
        Entry::End => record.points.reverse(),
        Entry::Interior(index) => rotate_ring(&mut record.points, index),
    }
    let cursor = record.last_point().unwrap_or(Vec3::ZERO);
    ordered.push(record);
    cursor
}

/// 闭合环从 `index` 处重新开始，并补回与新首点相同的末点。
fn rotate_ring(points: &mut Vec<Vec3>, index: usize) {
    points.pop();
    points.rotate_left(index);
    if let Some(first) = points.first().copied() {
        points.push(first);
    }
}
