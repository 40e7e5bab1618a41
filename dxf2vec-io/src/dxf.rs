use std::f64::consts::TAU;
use std::fmt;

use tracing::{debug, warn};
use dxf2vec_core::color::Color;
use dxf2vec_core::document::{
    Arc, BlockDefinition, BlockReference, Circle, Document, Ellipse, Entity, EntityStyle, Layer,
    Line, Point, Polyline, Text,
};
use dxf2vec_core::geometry::{Point3, Vector3};
use dxf2vec_core::units::Unit;

#[derive(Debug)]
pub(crate) struct DxfError {
    message: String,
}

impl DxfError {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for DxfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

type Parsed = Option<(EntityStyle, Entity)>;

pub(crate) struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    pub(crate) fn parse(mut self) -> Result<Document, DxfError> {
        let mut document = Document::new();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "HEADER" => self.parse_header(&mut document)?,
                        "TABLES" => self.parse_tables(&mut document)?,
                        "BLOCKS" => self.parse_blocks(&mut document)?,
                        "ENTITIES" => self.parse_entities(&mut document)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(document)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }

    fn parse_header(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some((9, name)) if name.trim() == "$INSUNITS" => match self.reader.next_pair()? {
                    Some((70, raw)) => {
                        let code = parse_i32(&raw, "$INSUNITS")?;
                        match Unit::from_code(code) {
                            Some(unit) => document.set_unit(unit),
                            None => warn!(code, "未知的 $INSUNITS 单位编码，按无单位处理"),
                        }
                    }
                    Some(pair) => self.reader.put_back(pair),
                    None => return Err(DxfError::invalid("HEADER 段提前结束")),
                },
                Some(_) => {}
                None => return Err(DxfError::invalid("HEADER 段未找到 ENDSEC 终止标记")),
            }
        }
        Ok(())
    }

    fn parse_tables(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "ENDSEC" => break,
                    "LAYER" => {
                        let fields = self.collect_fields("LAYER")?;
                        if let Some(layer) = fields.layer()? {
                            document.set_layer(layer);
                        }
                    }
                    // TABLE/ENDTAB 及其它表记录的字段会在后续循环中被忽略
                    _ => {}
                },
                Some(_) => {}
                None => return Err(DxfError::invalid("TABLES 段提前结束")),
            }
        }
        Ok(())
    }

    fn parse_blocks(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("BLOCKS 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "BLOCKS 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                "BLOCK" => {
                    if let Some(definition) = self.parse_block_definition(document)? {
                        document.add_block_definition(definition);
                    }
                }
                _ => {
                    // 未预期的条目，直接跳过
                    self.skip_entity_body()?;
                }
            }
        }
        Ok(())
    }

    fn parse_block_definition(
        &mut self,
        document: &mut Document,
    ) -> Result<Option<BlockDefinition>, DxfError> {
        let header = self.collect_fields("BLOCK")?;
        let name = header
            .text(2)
            .ok_or_else(|| DxfError::invalid("BLOCK 缺少名称（组码 2）"))?;
        let base_point = header.point_or_origin(10, "基点")?;
        // 模型/图纸空间布局块不会被 INSERT 引用
        let is_layout = is_layout_block(&name);
        let mut entities = Vec::new();

        loop {
            match self.reader.next_pair()? {
                Some((0, kind)) => match kind.trim() {
                    "ENDBLK" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    "ENDSEC" => {
                        return Err(DxfError::invalid(format!(
                            "BLOCK {name} 未找到 ENDBLK 终止标记"
                        )));
                    }
                    entity_kind => {
                        if let Some((style, geometry)) = self.parse_entity(entity_kind)? {
                            if !is_layout {
                                entities.push(document.make_entity(style, geometry));
                            }
                        }
                    }
                },
                Some((code, value)) => {
                    return Err(DxfError::invalid(format!(
                        "BLOCK {name} 内遇到意外组码 {code}（值 {value}）"
                    )));
                }
                None => {
                    return Err(DxfError::invalid("BLOCK 定义未找到 ENDBLK 终止标记"));
                }
            }
        }

        if is_layout {
            debug!(block = %name, "跳过布局块");
            return Ok(None);
        }

        Ok(Some(BlockDefinition {
            name,
            base_point,
            entities,
        }))
    }

    fn parse_entities(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                kind => {
                    if let Some((style, geometry)) = self.parse_entity(kind)? {
                        document.add_entity(style, geometry);
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_entity(&mut self, kind: &str) -> Result<Parsed, DxfError> {
        match kind {
            "LINE" => self.parse_line().map(Some),
            "ARC" => self.parse_arc().map(Some),
            "CIRCLE" => self.parse_circle().map(Some),
            "ELLIPSE" => self.parse_ellipse().map(Some),
            "LWPOLYLINE" => self.parse_lwpolyline(),
            "POLYLINE" => self.parse_polyline(),
            "INSERT" => self.parse_insert().map(Some),
            "POINT" => self.parse_point().map(Some),
            "TEXT" => self.parse_text().map(Some),
            other => {
                debug!(kind = other, "跳过暂不支持的实体类型");
                self.skip_entity_body()?;
                Ok(None)
            }
        }
    }

    fn collect_fields(&mut self, kind: &str) -> Result<Fields, DxfError> {
        let mut pairs = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(pair) => pairs.push(pair),
                None => return Err(DxfError::invalid(format!("{kind} 未正确结束"))),
            }
        }
        Ok(Fields {
            kind: kind.to_string(),
            pairs,
        })
    }

    fn parse_line(&mut self) -> Result<(EntityStyle, Entity), DxfError> {
        let fields = self.collect_fields("LINE")?;
        let line = Line {
            start: fields.point(10, "起点")?,
            end: fields.point(11, "终点")?,
        };
        Ok((fields.style()?, Entity::Line(line)))
    }

    fn parse_arc(&mut self) -> Result<(EntityStyle, Entity), DxfError> {
        let fields = self.collect_fields("ARC")?;
        let center = fields.point(10, "圆心")?;
        let radius = fields.required_f64(40, "半径")?;
        let start = fields.f64_or(50, 0.0, "起始角")?.to_radians();
        let end = fields.f64_or(51, 360.0, "终止角")?.to_radians();
        Ok((
            fields.style()?,
            Entity::Arc(Arc::from_angles(center, radius, start, end)),
        ))
    }

    fn parse_circle(&mut self) -> Result<(EntityStyle, Entity), DxfError> {
        let fields = self.collect_fields("CIRCLE")?;
        let circle = Circle {
            center: fields.point(10, "圆心")?,
            radius: fields.required_f64(40, "半径")?,
        };
        Ok((fields.style()?, Entity::Circle(circle)))
    }

    fn parse_ellipse(&mut self) -> Result<(EntityStyle, Entity), DxfError> {
        let fields = self.collect_fields("ELLIPSE")?;
        let major = fields.point(11, "主轴端点")?;
        let ellipse = Ellipse {
            center: fields.point(10, "圆心")?,
            major_axis: Vector3::from(major.as_vec3()),
            ratio: fields.required_f64(40, "短长轴比")?,
            start_parameter: fields.f64_or(41, 0.0, "起始参数")?,
            end_parameter: fields.f64_or(42, TAU, "终止参数")?,
        };
        Ok((fields.style()?, Entity::Ellipse(ellipse)))
    }

    fn parse_lwpolyline(&mut self) -> Result<Parsed, DxfError> {
        let fields = self.collect_fields("LWPOLYLINE")?;
        let is_closed = fields.opt_i32(70, "标志")?.unwrap_or(0) & 0x01 == 0x01;
        let elevation = fields.f64_or(38, 0.0, "标高")?;
        let mut vertices: Vec<(Point3, f64)> = Vec::new();
        let mut pending_x: Option<f64> = None;

        for (code, raw) in &fields.pairs {
            match code {
                10 => {
                    let x = parse_f64(raw, "LWPOLYLINE 顶点 X")?;
                    if pending_x.replace(x).is_some() {
                        return Err(DxfError::invalid(
                            "LWPOLYLINE 顶点缺少对应的 Y（组码 20）",
                        ));
                    }
                }
                20 => {
                    let y = parse_f64(raw, "LWPOLYLINE 顶点 Y")?;
                    let x = pending_x.take().ok_or_else(|| {
                        DxfError::invalid("LWPOLYLINE 顶点缺少对应的 X（组码 10）")
                    })?;
                    vertices.push((Point3::new(x, y, elevation), 0.0));
                }
                42 => {
                    let bulge = parse_f64(raw, "LWPOLYLINE 顶点 bulge")?;
                    match vertices.last_mut() {
                        Some(vertex) => vertex.1 = bulge,
                        None => {
                            return Err(DxfError::invalid(
                                "LWPOLYLINE 在定义首个顶点前遇到 bulge（组码 42）",
                            ));
                        }
                    }
                }
                _ => {}
            }
        }

        if pending_x.is_some() {
            return Err(DxfError::invalid(
                "LWPOLYLINE 顶点坐标成对出现（组码 10/20），检测到不完整的顶点",
            ));
        }
        if vertices.is_empty() {
            warn!("LWPOLYLINE 未包含任何顶点，已跳过");
            return Ok(None);
        }

        Ok(Some((
            fields.style()?,
            Entity::Polyline(Polyline::from_vertices(&vertices, is_closed)),
        )))
    }

    /// 旧式 POLYLINE：顶点以 VERTEX 实体跟随，直至 SEQEND。
    fn parse_polyline(&mut self) -> Result<Parsed, DxfError> {
        let header = self.collect_fields("POLYLINE")?;
        let flags = header.opt_i32(70, "标志")?.unwrap_or(0);
        let is_closed = flags & 0x01 != 0;
        let is_mesh = flags & (16 | 64) != 0;
        let mut vertices: Vec<(Point3, f64)> = Vec::new();

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "VERTEX" => {
                        let vertex = self.collect_fields("VERTEX")?;
                        let vertex_flags = vertex.opt_i32(70, "标志")?.unwrap_or(0);
                        // 样条框架控制点不属于实际轮廓
                        if vertex_flags & 16 != 0 {
                            continue;
                        }
                        vertices.push((
                            vertex.point(10, "位置")?,
                            vertex.f64_or(42, 0.0, "bulge")?,
                        ));
                    }
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some((code, value)) => {
                    return Err(DxfError::invalid(format!(
                        "POLYLINE 顶点序列中出现意外组码 {code}（值 {value}）"
                    )));
                }
                None => return Err(DxfError::invalid("POLYLINE 未找到 SEQEND")),
            }
        }

        if is_mesh {
            debug!(flags, "跳过网格类型的 POLYLINE");
            return Ok(None);
        }
        if vertices.is_empty() {
            warn!("POLYLINE 未包含任何顶点，已跳过");
            return Ok(None);
        }

        Ok(Some((
            header.style()?,
            Entity::Polyline(Polyline::from_vertices(&vertices, is_closed)),
        )))
    }

    fn parse_insert(&mut self) -> Result<(EntityStyle, Entity), DxfError> {
        let fields = self.collect_fields("INSERT")?;
        let name = fields
            .text(2)
            .ok_or_else(|| DxfError::invalid("INSERT 缺少块名（组码 2）"))?;
        let reference = BlockReference {
            name,
            insert: fields.point(10, "插入点")?,
            scale: Vector3::new(
                fields.f64_or(41, 1.0, "缩放 X")?,
                fields.f64_or(42, 1.0, "缩放 Y")?,
                fields.f64_or(43, 1.0, "缩放 Z")?,
            ),
            rotation: fields.f64_or(50, 0.0, "旋转角")?.to_radians(),
        };
        if fields.opt_i32(66, "属性标志")?.unwrap_or(0) == 1 {
            self.skip_attributes()?;
        }
        Ok((fields.style()?, Entity::BlockReference(reference)))
    }

    fn skip_attributes(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "ATTRIB" => self.skip_entity_body()?,
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some((code, value)) => {
                    return Err(DxfError::invalid(format!(
                        "INSERT 属性段出现意外组码 {code} 值 {value}"
                    )));
                }
                None => break,
            }
        }
        Ok(())
    }

    fn parse_point(&mut self) -> Result<(EntityStyle, Entity), DxfError> {
        let fields = self.collect_fields("POINT")?;
        let point = Point {
            position: fields.point(10, "位置")?,
        };
        Ok((fields.style()?, Entity::Point(point)))
    }

    fn parse_text(&mut self) -> Result<(EntityStyle, Entity), DxfError> {
        let fields = self.collect_fields("TEXT")?;
        let text = Text {
            insert: fields.point(10, "插入点")?,
            content: fields.raw(1).unwrap_or_default().to_string(),
            height: fields.f64_or(40, 0.0, "字高")?,
        };
        Ok((fields.style()?, Entity::Text(text)))
    }
}

fn is_layout_block(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("*model_space") || lower.starts_with("*paper_space")
}

/// 单个实体（或表记录）的组码集合，保留原始顺序。
struct Fields {
    kind: String,
    pairs: Vec<(i32, String)>,
}

impl Fields {
    fn raw(&self, code: i32) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(candidate, _)| *candidate == code)
            .map(|(_, value)| value.as_str())
    }

    fn text(&self, code: i32) -> Option<String> {
        self.raw(code)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn opt_f64(&self, code: i32, label: &str) -> Result<Option<f64>, DxfError> {
        self.raw(code)
            .map(|raw| parse_f64(raw, &format!("{} {label}", self.kind)))
            .transpose()
    }

    fn f64_or(&self, code: i32, default: f64, label: &str) -> Result<f64, DxfError> {
        Ok(self.opt_f64(code, label)?.unwrap_or(default))
    }

    fn required_f64(&self, code: i32, label: &str) -> Result<f64, DxfError> {
        self.opt_f64(code, label)?.ok_or_else(|| {
            DxfError::invalid(format!("{} 缺少{label}（组码 {code}）", self.kind))
        })
    }

    fn opt_i32(&self, code: i32, label: &str) -> Result<Option<i32>, DxfError> {
        self.raw(code)
            .map(|raw| parse_i32(raw, &format!("{} {label}", self.kind)))
            .transpose()
    }

    fn point(&self, code: i32, label: &str) -> Result<Point3, DxfError> {
        Ok(Point3::new(
            self.required_f64(code, &format!("{label} X"))?,
            self.required_f64(code + 10, &format!("{label} Y"))?,
            self.f64_or(code + 20, 0.0, &format!("{label} Z"))?,
        ))
    }

    fn point_or_origin(&self, code: i32, label: &str) -> Result<Point3, DxfError> {
        Ok(Point3::new(
            self.f64_or(code, 0.0, &format!("{label} X"))?,
            self.f64_or(code + 10, 0.0, &format!("{label} Y"))?,
            self.f64_or(code + 20, 0.0, &format!("{label} Z"))?,
        ))
    }

    fn color(&self) -> Result<Option<Color>, DxfError> {
        if let Some(rgb) = self.opt_i32(420, "真彩色")? {
            return Ok(Some(Color::Rgb(rgb as u32 & 0x00FF_FFFF)));
        }
        Ok(self
            .opt_i32(62, "颜色")?
            .map(|aci| Color::from_aci(i16::try_from(aci).unwrap_or(256))))
    }

    fn style(&self) -> Result<EntityStyle, DxfError> {
        Ok(EntityStyle {
            layer: self.text(8).unwrap_or_else(|| "0".to_string()),
            color: self.color()?.unwrap_or(Color::ByLayer),
            visible: self.opt_i32(60, "可见性")?.unwrap_or(0) == 0,
        })
    }

    /// 图层表记录：组码 62 为负表示图层关闭，组码 70 第 1 位表示冻结。
    fn layer(&self) -> Result<Option<Layer>, DxfError> {
        let Some(name) = self.text(2) else {
            return Ok(None);
        };
        let aci = self.opt_i32(62, "颜色")?.unwrap_or(7);
        let flags = self.opt_i32(70, "标志")?.unwrap_or(0);
        let color = match self.color()? {
            Some(Color::ByLayer) | Some(Color::ByBlock) | None => Color::Index(7),
            Some(color) => color,
        };
        Ok(Some(Layer {
            name,
            color,
            is_visible: aci >= 0 && flags & 0x01 == 0,
        }))
    }
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    /// 读取下一组 (组码, 值)，自动跳过 999 注释。
    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        loop {
            let code_line = match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    line
                }
                None => return Ok(None),
            };
            if code_line.trim().is_empty() {
                continue;
            }

            let value_line = match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    line
                }
                None => {
                    return Err(DxfError::invalid(format!(
                        "文件在第 {} 行结束，缺少与组码对应的值行",
                        self.line_number
                    )));
                }
            };

            let code = code_line.trim().parse::<i32>().map_err(|_| {
                DxfError::invalid(format!(
                    "第 {} 行的组码 \"{}\" 无法解析为整数",
                    self.line_number - 1,
                    code_line.trim()
                ))
            })?;
            if code == 999 {
                continue;
            }
            let value = value_line.trim_end_matches('\r').to_string();
            return Ok(Some((code, value)));
        }
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "不允许连续回退两组 DXF pair");
        self.buffer = Some(pair);
    }
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}
