pub mod geometry {
    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 三维点，内部以 `glam::DVec3` 表示。平面实体的 z 默认为 0。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn xy(x: f64, y: f64) -> Self {
            Self(DVec3::new(x, y, 0.0))
        }

        #[inline]
        pub fn from_vec(vec: DVec3) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self::from_vec(value)
        }
    }

    /// 三维向量，用于块参照缩放与椭圆主轴。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn splat(value: f64) -> Self {
            Self(DVec3::splat(value))
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框（仅 XY），用于估算图纸尺寸。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: DVec2,
        max: DVec2,
    }

    impl Bounds2D {
        #[inline]
        pub fn empty() -> Self {
            Self {
                min: DVec2::splat(f64::INFINITY),
                max: DVec2::splat(f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x > self.max.x || self.min.y > self.max.y
        }

        #[inline]
        pub fn min(&self) -> DVec2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> DVec2 {
            self.max
        }

        pub fn include_point(&mut self, point: DVec2) {
            if !point.is_finite() {
                return;
            }
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            self.min = self.min.min(point);
            self.max = self.max.max(point);
        }

        /// 宽高中的较大值；空边界返回 0。
        pub fn max_dimension(&self) -> f64 {
            if self.is_empty() {
                return 0.0;
            }
            let size = self.max - self.min;
            size.x.max(size.y)
        }
    }
}

pub mod units {
    use serde::{Deserialize, Serialize};

    /// 图纸单位，编码与 DXF `$INSUNITS` 一致。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub enum Unit {
        #[default]
        None,
        Inch,
        Foot,
        Mile,
        Millimeter,
        Centimeter,
        Meter,
        Kilometer,
        Microinch,
        Mil,
        Yard,
        Angstrom,
        Nanometer,
        Micron,
        Decimeter,
        Decameter,
        Hectometer,
        Gigameter,
        Astro,
        Lightyear,
        Parsec,
    }

    const ALL_UNITS: [Unit; 21] = [
        Unit::None,
        Unit::Inch,
        Unit::Foot,
        Unit::Mile,
        Unit::Millimeter,
        Unit::Centimeter,
        Unit::Meter,
        Unit::Kilometer,
        Unit::Microinch,
        Unit::Mil,
        Unit::Yard,
        Unit::Angstrom,
        Unit::Nanometer,
        Unit::Micron,
        Unit::Decimeter,
        Unit::Decameter,
        Unit::Hectometer,
        Unit::Gigameter,
        Unit::Astro,
        Unit::Lightyear,
        Unit::Parsec,
    ];

    impl Unit {
        pub fn from_code(code: i32) -> Option<Self> {
            usize::try_from(code)
                .ok()
                .and_then(|index| ALL_UNITS.get(index).copied())
        }

        #[inline]
        pub fn code(self) -> u32 {
            ALL_UNITS
                .iter()
                .position(|unit| *unit == self)
                .map(|index| index as u32)
                .unwrap_or(0)
        }

        /// 每个图纸单位对应的毫米数。无单位图纸按 1:1 处理。
        pub fn millimeters_per_unit(self) -> f64 {
            match self {
                Unit::None | Unit::Millimeter => 1.0,
                Unit::Inch => 25.4,
                Unit::Foot => 304.8,
                Unit::Mile => 1_609_344.0,
                Unit::Centimeter => 10.0,
                Unit::Meter => 1_000.0,
                Unit::Kilometer => 1_000_000.0,
                Unit::Microinch => 25.4e-6,
                Unit::Mil => 0.0254,
                Unit::Yard => 914.4,
                Unit::Angstrom => 1.0e-7,
                Unit::Nanometer => 1.0e-6,
                Unit::Micron => 1.0e-3,
                Unit::Decimeter => 100.0,
                Unit::Decameter => 10_000.0,
                Unit::Hectometer => 100_000.0,
                Unit::Gigameter => 1.0e12,
                Unit::Astro => 1.495_978_707e14,
                Unit::Lightyear => 9.460_730_472_580_8e18,
                Unit::Parsec => 3.085_677_581_491_367e19,
            }
        }

        #[inline]
        pub fn to_millimeters(self, value: f64) -> f64 {
            value * self.millimeters_per_unit()
        }

        pub fn name(self) -> &'static str {
            match self {
                Unit::None => "none",
                Unit::Inch => "inch",
                Unit::Foot => "foot",
                Unit::Mile => "mile",
                Unit::Millimeter => "millimeter",
                Unit::Centimeter => "centimeter",
                Unit::Meter => "meter",
                Unit::Kilometer => "kilometer",
                Unit::Microinch => "microinch",
                Unit::Mil => "mil",
                Unit::Yard => "yard",
                Unit::Angstrom => "angstrom",
                Unit::Nanometer => "nanometer",
                Unit::Micron => "micron",
                Unit::Decimeter => "decimeter",
                Unit::Decameter => "decameter",
                Unit::Hectometer => "hectometer",
                Unit::Gigameter => "gigameter",
                Unit::Astro => "astronomical unit",
                Unit::Lightyear => "lightyear",
                Unit::Parsec => "parsec",
            }
        }
    }
}

pub mod color {
    use serde::{Deserialize, Serialize};

    pub const BY_LAYER_INT: i32 = -1;
    pub const BY_BLOCK_INT: i32 = -2;

    /// 实体颜色：随层、随块、ACI 索引或真彩色（0xRRGGBB）。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub enum Color {
        #[default]
        ByLayer,
        ByBlock,
        Index(u8),
        Rgb(u32),
    }

    impl Color {
        /// 按 DXF 组码 62 的语义构造。负值表示图层关闭，调用方需另行处理可见性。
        pub fn from_aci(raw: i16) -> Self {
            match raw.unsigned_abs() {
                0 => Color::ByBlock,
                256.. => Color::ByLayer,
                index => Color::Index(index as u8),
            }
        }

        /// 输出文件使用的整数颜色：已解析颜色打包为 0xRRGGBB。
        pub fn to_int(self) -> i32 {
            match self {
                Color::ByLayer => BY_LAYER_INT,
                Color::ByBlock => BY_BLOCK_INT,
                Color::Index(index) => aci_to_rgb(index) as i32,
                Color::Rgb(rgb) => (rgb & 0x00FF_FFFF) as i32,
            }
        }
    }

    fn aci_to_rgb(index: u8) -> u32 {
        match index {
            0 | 7 | 255 => 0xFFFFFF,
            1 => 0xFF0000,
            2 => 0xFFFF00,
            3 => 0x00FF00,
            4 => 0x00FFFF,
            5 => 0x0000FF,
            6 => 0xFF00FF,
            8 => 0x808080,
            9 => 0xC0C0C0,
            250 => 0x333333,
            251 => 0x505050,
            252 => 0x696969,
            253 => 0x828282,
            254 => 0xBEBEBE,
            _ => {
                // 10..=249：色相每 10 个索引前进 15°，个位决定明度与饱和度。
                const VALUES: [f64; 5] = [1.0, 0.65, 0.5, 0.3, 0.15];
                let hue = f64::from(index / 10 - 1) * 15.0;
                let shade = index % 10;
                let saturation = if shade % 2 == 0 { 1.0 } else { 0.5 };
                hsv_to_rgb(hue, saturation, VALUES[usize::from(shade / 2)])
            }
        }
    }

    fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> u32 {
        let chroma = value * saturation;
        let sector = hue / 60.0;
        let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
        let (r, g, b) = match sector as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let offset = value - chroma;
        let channel = |c: f64| ((c + offset) * 255.0).round().clamp(0.0, 255.0) as u32;
        (channel(r) << 16) | (channel(g) << 8) | channel(b)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn aci_codes_map_to_special_values() {
            assert_eq!(Color::from_aci(0), Color::ByBlock);
            assert_eq!(Color::from_aci(256), Color::ByLayer);
            assert_eq!(Color::from_aci(-3), Color::Index(3));
            assert_eq!(Color::ByLayer.to_int(), BY_LAYER_INT);
            assert_eq!(Color::ByBlock.to_int(), BY_BLOCK_INT);
        }

        #[test]
        fn standard_palette_is_exact() {
            assert_eq!(Color::Index(1).to_int(), 0xFF0000);
            assert_eq!(Color::Index(5).to_int(), 0x0000FF);
            assert_eq!(Color::Index(10).to_int(), 0xFF0000);
            assert_eq!(Color::Index(11).to_int(), 0xFF8080);
            assert_eq!(Color::Rgb(0x12345678).to_int(), 0x345678);
        }
    }
}

pub mod document {
    use std::collections::HashMap;
    use std::f64::consts::TAU;

    use glam::DVec3;
    use serde::{Deserialize, Serialize};

    use crate::color::Color;
    use crate::geometry::{Point3, Vector3};
    use crate::units::Unit;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EntityId(u32);

    impl EntityId {
        #[inline]
        pub fn new(raw: u32) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u32 {
            self.0
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub color: Color,
        pub is_visible: bool,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                color: Color::Index(7),
                is_visible: true,
            }
        }
    }

    /// 实体的样式属性：所在图层、颜色与自身可见标志。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct EntityStyle {
        pub layer: String,
        pub color: Color,
        pub visible: bool,
    }

    impl EntityStyle {
        pub fn on_layer(layer: impl Into<String>) -> Self {
            Self {
                layer: layer.into(),
                ..Self::default()
            }
        }
    }

    impl Default for EntityStyle {
        fn default() -> Self {
            Self {
                layer: "0".to_string(),
                color: Color::ByLayer,
                visible: true,
            }
        }
    }

    /// 解析随层/随块后的最终样式。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResolvedStyle {
        pub color: Color,
        pub visible: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DrawingEntity {
        pub id: EntityId,
        pub style: EntityStyle,
        pub geometry: Entity,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Arc(Arc),
        Circle(Circle),
        Ellipse(Ellipse),
        Polyline(Polyline),
        BlockReference(BlockReference),
        Point(Point),
        Text(Text),
    }

    impl Entity {
        pub fn kind_name(&self) -> &'static str {
            match self {
                Entity::Line(_) => "LINE",
                Entity::Arc(_) => "ARC",
                Entity::Circle(_) => "CIRCLE",
                Entity::Ellipse(_) => "ELLIPSE",
                Entity::Polyline(_) => "POLYLINE",
                Entity::BlockReference(_) => "INSERT",
                Entity::Point(_) => "POINT",
                Entity::Text(_) => "TEXT",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point3,
        pub end: Point3,
    }

    /// 圆弧：起始角与扫掠角均为弧度。`reversed` 为真时沿顺时针方向扫掠。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point3,
        pub radius: f64,
        pub start_angle: f64,
        pub angle_length: f64,
        pub reversed: bool,
    }

    impl Arc {
        /// 由逆时针的起止角构造，扫掠角落在 (0, 2π]。
        pub fn from_angles(center: Point3, radius: f64, start_angle: f64, end_angle: f64) -> Self {
            let mut sweep = (end_angle - start_angle).rem_euclid(TAU);
            if sweep <= f64::EPSILON {
                sweep = TAU;
            }
            Self {
                center,
                radius,
                start_angle,
                angle_length: sweep,
                reversed: false,
            }
        }

        /// 由多段线顶点与 bulge 值构造。bulge 为 0 或弦长退化时返回 `None`。
        pub fn from_bulge(start: Point3, end: Point3, bulge: f64) -> Option<Self> {
            let chord = end.as_vec3() - start.as_vec3();
            let chord_length = chord.truncate().length();
            if bulge.abs() <= 1e-12 || chord_length <= f64::EPSILON {
                return None;
            }
            let included = 4.0 * bulge.atan();
            let radius = (chord_length / (2.0 * (included / 2.0).sin())).abs();
            let midpoint = (start.as_vec3() + end.as_vec3()) * 0.5;
            let left = DVec3::new(-chord.y, chord.x, 0.0) / chord_length;
            let offset = chord_length * 0.5 * (1.0 - bulge * bulge) / (2.0 * bulge);
            let center = midpoint + left * offset;
            let to_start = start.as_vec3() - center;
            Some(Self {
                center: Point3::from_vec(DVec3::new(center.x, center.y, start.z())),
                radius,
                start_angle: to_start.y.atan2(to_start.x),
                angle_length: included.abs(),
                reversed: bulge < 0.0,
            })
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point3,
        pub radius: f64,
    }

    /// 椭圆实体，记录主轴向量与参数范围（单位为弧度）。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Ellipse {
        pub center: Point3,
        pub major_axis: Vector3,
        pub ratio: f64,
        pub start_parameter: f64,
        pub end_parameter: f64,
    }

    impl Ellipse {
        pub fn sweep(&self) -> f64 {
            let sweep = (self.end_parameter - self.start_parameter).rem_euclid(TAU);
            if sweep <= 1e-9 { TAU } else { sweep }
        }

        #[inline]
        pub fn is_full(&self) -> bool {
            (self.sweep() - TAU).abs() <= 1e-9
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Segment {
        Line(Line),
        Arc(Arc),
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub segments: Vec<Segment>,
        pub is_closed: bool,
    }

    impl Polyline {
        /// 将 `(顶点, bulge)` 序列转换为线段/圆弧子实体。闭合时追加末点到首点的段。
        pub fn from_vertices(vertices: &[(Point3, f64)], is_closed: bool) -> Self {
            let mut segments = Vec::with_capacity(vertices.len());
            let pair_count = if is_closed {
                vertices.len()
            } else {
                vertices.len().saturating_sub(1)
            };
            for index in 0..pair_count {
                let (start, bulge) = vertices[index];
                let (end, _) = vertices[(index + 1) % vertices.len()];
                if start == end {
                    continue;
                }
                match Arc::from_bulge(start, end, bulge) {
                    Some(arc) => segments.push(Segment::Arc(arc)),
                    None => segments.push(Segment::Line(Line { start, end })),
                }
            }
            Self {
                segments,
                is_closed,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct BlockReference {
        pub name: String,
        pub insert: Point3,
        pub scale: Vector3,
        pub rotation: f64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Point {
        pub position: Point3,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Text {
        pub insert: Point3,
        pub content: String,
        pub height: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockDefinition {
        pub name: String,
        pub base_point: Point3,
        pub entities: Vec<DrawingEntity>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Document {
        layers: HashMap<String, Layer>,
        entities: Vec<DrawingEntity>,
        blocks: HashMap<String, BlockDefinition>,
        next_entity_id: u32,
        unit: Unit,
    }

    impl Default for Document {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self {
                layers: HashMap::new(),
                entities: Vec::new(),
                blocks: HashMap::new(),
                next_entity_id: 0,
                unit: Unit::None,
            };
            doc.ensure_layer("0");
            doc
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let key = name.as_ref();
            self.layers
                .entry(key.to_string())
                .or_insert_with(|| Layer::new(key));
        }

        /// 写入（或覆盖）图层表条目。
        pub fn set_layer(&mut self, layer: Layer) {
            self.layers.insert(layer.name.clone(), layer);
        }

        pub fn layer(&self, name: &str) -> Option<&Layer> {
            self.layers.get(name)
        }

        #[inline]
        pub fn unit(&self) -> Unit {
            self.unit
        }

        #[inline]
        pub fn set_unit(&mut self, unit: Unit) {
            self.unit = unit;
        }

        /// 分配新的实体 ID；顶层与块内实体共用同一计数器。
        pub fn next_id(&mut self) -> EntityId {
            let id = EntityId::new(self.next_entity_id);
            self.next_entity_id = self.next_entity_id.wrapping_add(1);
            id
        }

        /// 构造块内实体（分配 ID，但不加入顶层列表）。
        pub fn make_entity(&mut self, style: EntityStyle, geometry: Entity) -> DrawingEntity {
            self.ensure_layer(&style.layer);
            DrawingEntity {
                id: self.next_id(),
                style,
                geometry,
            }
        }

        pub fn add_entity(&mut self, style: EntityStyle, geometry: Entity) -> EntityId {
            let entity = self.make_entity(style, geometry);
            let id = entity.id;
            self.entities.push(entity);
            id
        }

        pub fn add_line(&mut self, start: Point3, end: Point3, layer: impl Into<String>) -> EntityId {
            self.add_entity(
                EntityStyle::on_layer(layer),
                Entity::Line(Line { start, end }),
            )
        }

        pub fn add_circle(
            &mut self,
            center: Point3,
            radius: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(
                EntityStyle::on_layer(layer),
                Entity::Circle(Circle { center, radius }),
            )
        }

        pub fn add_arc(
            &mut self,
            center: Point3,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(
                EntityStyle::on_layer(layer),
                Entity::Arc(Arc::from_angles(center, radius, start_angle, end_angle)),
            )
        }

        pub fn add_polyline<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = Point3>,
        {
            let collected: Vec<(Point3, f64)> =
                vertices.into_iter().map(|point| (point, 0.0)).collect();
            self.add_entity(
                EntityStyle::on_layer(layer),
                Entity::Polyline(Polyline::from_vertices(&collected, is_closed)),
            )
        }

        pub fn add_block_reference(
            &mut self,
            name: impl Into<String>,
            insert: Point3,
            scale: Vector3,
            rotation: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(
                EntityStyle::on_layer(layer),
                Entity::BlockReference(BlockReference {
                    name: name.into(),
                    insert,
                    scale,
                    rotation,
                }),
            )
        }

        pub fn add_block_definition(&mut self, definition: BlockDefinition) {
            self.blocks.insert(definition.name.clone(), definition);
        }

        #[inline]
        pub fn block(&self, name: &str) -> Option<&BlockDefinition> {
            self.blocks.get(name)
        }

        pub fn blocks(&self) -> impl Iterator<Item = &BlockDefinition> {
            self.blocks.values()
        }

        pub fn entities(&self) -> impl Iterator<Item = &DrawingEntity> {
            self.entities.iter()
        }

        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities
                .iter()
                .find(|entity| entity.id == id)
                .map(|entity| &entity.geometry)
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        /// 解析实体样式：随层取图层颜色，随块取外层块参照的颜色；
        /// 图层关闭或外层不可见时实体视为不可见。
        pub fn resolve_style(
            &self,
            style: &EntityStyle,
            parent: Option<&ResolvedStyle>,
        ) -> ResolvedStyle {
            let layer = self.layers.get(&style.layer);
            let color = match style.color {
                Color::ByLayer => layer.map(|layer| layer.color).unwrap_or(Color::Index(7)),
                Color::ByBlock => parent.map(|p| p.color).unwrap_or(Color::Index(7)),
                other => other,
            };
            let visible = style.visible
                && layer.is_none_or(|layer| layer.is_visible)
                && parent.is_none_or(|p| p.visible);
            ResolvedStyle { color, visible }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::f64::consts::{FRAC_PI_2, PI};

        #[test]
        fn document_assigns_sequential_ids() {
            let mut doc = Document::new();
            let line = doc.add_line(Point3::xy(0.0, 0.0), Point3::xy(10.0, 0.0), "0");
            let circle = doc.add_circle(Point3::xy(5.0, 5.0), 2.0, "ANNOT");
            let block_child = doc.make_entity(
                EntityStyle::default(),
                Entity::Line(Line {
                    start: Point3::xy(0.0, 0.0),
                    end: Point3::xy(1.0, 0.0),
                }),
            );
            let arc = doc.add_arc(Point3::xy(0.0, 0.0), 1.0, 0.0, FRAC_PI_2, "GEOM");

            assert_eq!(line.get(), 0);
            assert_eq!(circle.get(), 1);
            assert_eq!(block_child.id.get(), 2);
            assert_eq!(arc.get(), 3);
            assert_eq!(doc.entities().count(), 3);
            assert!(doc.layer("ANNOT").is_some());
            assert!(doc.layer("GEOM").is_some());

            match doc.entity(arc) {
                Some(Entity::Arc(arc)) => {
                    assert!((arc.angle_length - FRAC_PI_2).abs() < 1e-12);
                    assert!(!arc.reversed);
                }
                other => panic!("unexpected entity lookup result: {other:?}"),
            }
        }

        #[test]
        fn arc_from_angles_wraps_sweep() {
            let arc = Arc::from_angles(Point3::xy(0.0, 0.0), 1.0, 3.0 * FRAC_PI_2, FRAC_PI_2);
            assert!((arc.angle_length - PI).abs() < 1e-12);
            let full = Arc::from_angles(Point3::xy(0.0, 0.0), 1.0, 1.0, 1.0);
            assert!((full.angle_length - TAU).abs() < 1e-12);
        }

        #[test]
        fn bulge_one_produces_semicircle() {
            let arc = Arc::from_bulge(Point3::xy(0.0, 0.0), Point3::xy(10.0, 0.0), 1.0)
                .expect("bulge arc");
            assert!((arc.radius - 5.0).abs() < 1e-9);
            assert!((arc.center.x() - 5.0).abs() < 1e-9);
            assert!(arc.center.y().abs() < 1e-9);
            assert!((arc.angle_length - PI).abs() < 1e-9);
            assert!(!arc.reversed);
            assert!((arc.start_angle.abs() - PI).abs() < 1e-9);

            let clockwise = Arc::from_bulge(Point3::xy(0.0, 0.0), Point3::xy(10.0, 0.0), -1.0)
                .expect("negative bulge arc");
            assert!(clockwise.reversed);
            assert!(Arc::from_bulge(Point3::xy(0.0, 0.0), Point3::xy(1.0, 0.0), 0.0).is_none());
        }

        #[test]
        fn closed_polyline_adds_closing_segment() {
            let vertices = [
                (Point3::xy(0.0, 0.0), 0.0),
                (Point3::xy(1.0, 0.0), 0.0),
                (Point3::xy(1.0, 1.0), 0.0),
            ];
            let open = Polyline::from_vertices(&vertices, false);
            let closed = Polyline::from_vertices(&vertices, true);
            assert_eq!(open.segments.len(), 2);
            assert_eq!(closed.segments.len(), 3);
            match &closed.segments[2] {
                Segment::Line(line) => {
                    assert_eq!(line.start, Point3::xy(1.0, 1.0));
                    assert_eq!(line.end, Point3::xy(0.0, 0.0));
                }
                other => panic!("expected closing line, got {other:?}"),
            }
        }

        #[test]
        fn resolve_style_follows_layer_and_block() {
            let mut doc = Document::new();
            doc.set_layer(Layer {
                name: "RED".to_string(),
                color: Color::Index(1),
                is_visible: true,
            });
            doc.set_layer(Layer {
                name: "OFF".to_string(),
                color: Color::Index(3),
                is_visible: false,
            });

            let by_layer = doc.resolve_style(&EntityStyle::on_layer("RED"), None);
            assert_eq!(by_layer.color, Color::Index(1));
            assert!(by_layer.visible);

            let hidden = doc.resolve_style(&EntityStyle::on_layer("OFF"), None);
            assert!(!hidden.visible);

            let parent = ResolvedStyle {
                color: Color::Rgb(0x00AA00),
                visible: false,
            };
            let child_style = EntityStyle {
                layer: "RED".to_string(),
                color: Color::ByBlock,
                visible: true,
            };
            let child = doc.resolve_style(&child_style, Some(&parent));
            assert_eq!(child.color, Color::Rgb(0x00AA00));
            assert!(!child.visible);
        }
    }
}

pub mod record {
    use glam::Vec3;
    use serde::{Deserialize, Serialize};

    /// 输出单元：一条展平后的多段线及其元数据。
    /// 点数不单独存储，写出时始终取 `points.len()`。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PolylineRecord {
        pub id: u32,
        pub color: i32,
        pub visible: bool,
        pub closed: bool,
        pub points: Vec<Vec3>,
    }

    impl PolylineRecord {
        pub fn new(id: u32, color: i32, visible: bool, closed: bool, points: Vec<Vec3>) -> Self {
            Self {
                id,
                color,
                visible,
                closed,
                points,
            }
        }

        #[inline]
        pub fn point_count(&self) -> u32 {
            u32::try_from(self.points.len()).unwrap_or(u32::MAX)
        }

        #[inline]
        pub fn first_point(&self) -> Option<Vec3> {
            self.points.first().copied()
        }

        #[inline]
        pub fn last_point(&self) -> Option<Vec3> {
            self.points.last().copied()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::Bounds2D;
    use crate::units::Unit;
    use glam::DVec2;

    #[test]
    fn unit_codes_round_trip() {
        for code in 0..=20 {
            let unit = Unit::from_code(code).expect("known unit code");
            assert_eq!(unit.code() as i32, code);
        }
        assert!(Unit::from_code(21).is_none());
        assert!(Unit::from_code(-1).is_none());
        assert_eq!(Unit::from_code(4), Some(Unit::Millimeter));
    }

    #[test]
    fn unit_conversion_to_millimeters() {
        assert!((Unit::Inch.to_millimeters(2.0) - 50.8).abs() < 1e-12);
        assert!((Unit::Meter.to_millimeters(1.5) - 1500.0).abs() < 1e-9);
        assert!((Unit::None.to_millimeters(3.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bounds_max_dimension() {
        let mut bounds = Bounds2D::empty();
        assert_eq!(bounds.max_dimension(), 0.0);
        bounds.include_point(DVec2::new(-5.0, 1.0));
        bounds.include_point(DVec2::new(15.0, 4.0));
        bounds.include_point(DVec2::new(f64::NAN, 100.0));
        assert!((bounds.max_dimension() - 20.0).abs() < f64::EPSILON);
    }
}
