use glam::DVec3;

/// Douglas–Peucker 折线化简（基于栈的迭代实现），保持原有点序。
///
/// 长度不超过 2 的序列原样返回；结果总以原序列的末点结束。
pub fn douglas_peucker(points: &[DVec3], epsilon: f64) -> Vec<DVec3> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    let mut stack = vec![(0usize, last)];

    while let Some((start, end)) = stack.pop() {
        let (origin, target) = (points[start], points[end]);
        let mut max_distance = 0.0;
        let mut max_index = start;

        for (offset, point) in points[start + 1..end].iter().enumerate() {
            let distance = distance_to_line(*point, origin, target);
            if distance > max_distance {
                max_distance = distance;
                max_index = start + 1 + offset;
            }
        }

        if max_distance > epsilon {
            stack.push((max_index, end));
            stack.push((start, max_index));
        } else {
            keep[start] = true;
            keep[end] = true;
        }
    }

    let mut simplified: Vec<DVec3> = points
        .iter()
        .zip(&keep)
        .filter_map(|(point, kept)| kept.then_some(*point))
        .collect();
    if simplified.last() != Some(&points[last]) {
        simplified.push(points[last]);
    }
    simplified
}

/// 点到直线 (origin, target) 的三维距离。
///
/// 两端点重合时方向退化为零向量，此时返回到 `origin` 的距离，不会产生 NaN。
pub fn distance_to_line(point: DVec3, origin: DVec3, target: DVec3) -> f64 {
    let direction = (target - origin).normalize_or_zero();
    if direction == DVec3::ZERO {
        return point.distance(origin);
    }
    (point - origin).cross(direction).length()
}
