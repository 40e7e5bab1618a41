use glam::DVec3;
use dxf2vec_core::document::BlockReference;
use dxf2vec_core::geometry::Point3;
use dxf2vec_core::units::Unit;

/// 展平过程中累积的变换状态，按值向下传递。
///
/// 点变换顺序：减去块基点 → 图纸单位换算为毫米 → 逐分量缩放 → 绕原点旋转 → 平移到插入点。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub insertion: DVec3,
    pub scale: DVec3,
    pub rotation: f64,
    /// 当前块定义的基点（图纸单位）。
    pub origin: DVec3,
    pub unit: Unit,
}

impl Transform {
    pub fn identity(unit: Unit) -> Self {
        Self {
            insertion: DVec3::ZERO,
            scale: DVec3::ONE,
            rotation: 0.0,
            origin: DVec3::ZERO,
            unit,
        }
    }

    pub fn apply_point(&self, point: Point3) -> DVec3 {
        let local = (point.as_vec3() - self.origin) * self.unit.millimeters_per_unit();
        let scaled = local * normalize_scale(self.scale);
        let (sin, cos) = self.rotation.sin_cos();
        DVec3::new(
            scaled.x * cos - scaled.y * sin,
            scaled.x * sin + scaled.y * cos,
            scaled.z,
        ) + self.insertion
    }

    /// 半径等标量长度：单位换算后乘以 x/y 缩放的平均值。
    pub fn apply_length(&self, length: f64) -> f64 {
        self.unit.to_millimeters(length) * (self.scale.x + self.scale.y) * 0.5
    }

    /// 进入块参照时组合出子变换。
    pub fn nest(&self, reference: &BlockReference, base_point: Point3) -> Self {
        let own_scale = normalize_scale(reference.scale.as_vec3());
        Self {
            insertion: self.apply_point(reference.insert),
            scale: normalize_scale(self.scale * own_scale),
            rotation: self.rotation + reference.rotation,
            origin: base_point.as_vec3(),
            unit: self.unit,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity(Unit::None)
    }
}

#[inline]
fn normalize_scale(scale: DVec3) -> DVec3 {
    if scale.z == 0.0 {
        DVec3::new(scale.x, scale.y, 1.0)
    } else {
        scale
    }
}
