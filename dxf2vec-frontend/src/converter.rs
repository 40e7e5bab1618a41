use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};
use dxf2vec_core::record::PolylineRecord;
use dxf2vec_engine::{ConversionOutput, Pipeline};
use dxf2vec_io::{DocumentLoader, DxfFacade, VecFile, VecSaver, VecWriter};

use crate::errors::FrontendError;
use crate::request::ConversionRequest;

/// 成功写出的一个 `.vec` 文件。
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedFile {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub records: usize,
    pub points: usize,
}

#[derive(Debug)]
pub struct ConversionFailure {
    /// 出错的输入文件；合并写出失败时为输出文件。
    pub path: PathBuf,
    pub error: FrontendError,
}

/// 批量转换结果；单个文件失败不会中断整个批次。
#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<ConvertedFile>,
    pub failures: Vec<ConversionFailure>,
    /// 因扩展名不是 `.dxf` 而跳过的输入。
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, path: &Path, error: FrontendError) {
        error!(path = %path.display(), error = %error, "转换失败");
        self.failures.push(ConversionFailure {
            path: path.to_path_buf(),
            error,
        });
    }
}

/// 批量驱动：加载 → 流水线 → 写出。加载与写出通过 trait 注入。
pub struct BatchConverter<L = DxfFacade, S = VecWriter> {
    loader: L,
    saver: S,
}

impl BatchConverter {
    pub fn dxf() -> Self {
        Self::new(DxfFacade::new(), VecWriter::new())
    }
}

impl<L: DocumentLoader, S: VecSaver> BatchConverter<L, S> {
    pub fn new(loader: L, saver: S) -> Self {
        Self { loader, saver }
    }

    pub fn run(&self, request: &ConversionRequest) -> Result<BatchReport, FrontendError> {
        let mut report = BatchReport::default();
        let mut inputs = Vec::new();
        for input in &request.inputs {
            if is_dxf(input) {
                inputs.push(input.as_path());
            } else {
                warn!(path = %input.display(), "不是 DXF 文件，已跳过");
                report.skipped.push(input.clone());
            }
        }
        if inputs.is_empty() {
            return Err(FrontendError::NoInputs);
        }

        if let Some(dir) = &request.out_dir {
            fs::create_dir_all(dir).map_err(|source| FrontendError::OutputDirectory {
                path: dir.clone(),
                source,
            })?;
        }

        let pipeline = Pipeline::new(request.pipeline_options());
        match &request.out_file {
            Some(out_file) if inputs.len() > 1 => {
                let output = resolve_out_file(out_file, request.out_dir.as_deref());
                self.convert_merged(&pipeline, request, &inputs, &output, &mut report);
            }
            _ => {
                for input in inputs {
                    let output = match output_path(request, input) {
                        Ok(output) => output,
                        Err(err) => {
                            report.fail(input, err);
                            continue;
                        }
                    };
                    match self.convert_one(&pipeline, request, input, &output) {
                        Ok(converted) => report.converted.push(converted),
                        Err(err) => report.fail(input, err),
                    }
                }
            }
        }

        info!(
            converted = report.converted.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "批量转换结束"
        );
        Ok(report)
    }

    fn convert_one(
        &self,
        pipeline: &Pipeline,
        request: &ConversionRequest,
        input: &Path,
        output: &Path,
    ) -> Result<ConvertedFile, FrontendError> {
        let document = self.loader.load(input)?;
        let ConversionOutput {
            records, unit_code, ..
        } = pipeline.run(&document)?;
        let converted = self.write(records, unit_code, request.paper_scale, output)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            records = converted.records,
            points = converted.points,
            "转换完成"
        );
        Ok(ConvertedFile {
            inputs: vec![input.to_path_buf()],
            ..converted
        })
    }

    /// 多个图纸分别展平后合并，统一排序并写入同一个文件。
    fn convert_merged(
        &self,
        pipeline: &Pipeline,
        request: &ConversionRequest,
        inputs: &[&Path],
        output: &Path,
        report: &mut BatchReport,
    ) {
        let mut records = Vec::new();
        let mut unit_code = None;
        let mut merged = Vec::new();
        for &input in inputs {
            let flattened = self
                .loader
                .load(input)
                .map_err(FrontendError::from)
                .and_then(|document| pipeline.flatten(&document).map_err(FrontendError::from));
            match flattened {
                Ok(flattened) => {
                    unit_code.get_or_insert(flattened.unit_code);
                    records.extend(flattened.records);
                    merged.push(input.to_path_buf());
                }
                Err(err) => report.fail(input, err),
            }
        }

        let Some(unit_code) = unit_code else {
            warn!(output = %output.display(), "没有可合并的图纸，未写出文件");
            return;
        };
        let records = pipeline.reorder(records);
        match self.write(records, unit_code, request.paper_scale, output) {
            Ok(converted) => {
                info!(
                    inputs = merged.len(),
                    output = %output.display(),
                    records = converted.records,
                    points = converted.points,
                    "合并转换完成"
                );
                report.converted.push(ConvertedFile {
                    inputs: merged,
                    ..converted
                });
            }
            Err(err) => report.fail(output, err),
        }
    }

    fn write(
        &self,
        records: Vec<PolylineRecord>,
        unit_code: u32,
        paper_scale: f64,
        output: &Path,
    ) -> Result<ConvertedFile, FrontendError> {
        let file = VecFile::new(records, unit_code, paper_scale);
        self.saver.save(&file, output)?;
        Ok(ConvertedFile {
            inputs: Vec::new(),
            output: output.to_path_buf(),
            records: file.records.len(),
            points: file.total_points(),
        })
    }
}

fn is_dxf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dxf"))
}

/// 相对的输出文件名放到输出目录下。
fn resolve_out_file(out_file: &Path, out_dir: Option<&Path>) -> PathBuf {
    match out_dir {
        Some(dir) if out_file.is_relative() => dir.join(out_file),
        _ => out_file.to_path_buf(),
    }
}

fn output_path(request: &ConversionRequest, input: &Path) -> Result<PathBuf, FrontendError> {
    if let Some(out_file) = &request.out_file {
        return Ok(resolve_out_file(out_file, request.out_dir.as_deref()));
    }
    let stem = input.file_stem().ok_or_else(|| FrontendError::OutputPath {
        input: input.to_path_buf(),
    })?;
    let dir = match &request.out_dir {
        Some(dir) => dir.as_path(),
        None => input.parent().unwrap_or_else(|| Path::new("")),
    };
    let mut name = stem.to_os_string();
    name.push(".vec");
    Ok(dir.join(name))
}
