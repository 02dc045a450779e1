// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use annoconv::{
    ArtifactWriter, ConversionReport, Converter, ConverterConfig, Direction, Error, ProjectType,
    STRATEGIES, SourceDataset, SourceFormat, Task, WriteOptions,
};
use clap::{Args as ClapArgs, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file, layered over the user config file
    #[clap(long, env = "ANNOCONV_CONFIG")]
    config: Option<PathBuf>,

    /// Converter Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Print the converter version.
    Version,
    /// List the supported format, project type and task combinations.
    Strategies,
    /// Convert one or more datasets into canonical annotation documents.
    /// With several inputs each one is written to its own directory named
    /// after the input below the output directory.
    Convert(ConvertArgs),
}

#[derive(ClapArgs, PartialEq, Clone, Debug)]
struct ConvertArgs {
    /// Source format: coco, voc or supervisely
    #[clap(long)]
    format: SourceFormat,

    /// Target project type: vector or pixel
    #[clap(long)]
    project_type: ProjectType,

    /// Conversion task, e.g. object_detection or instance_segmentation
    #[clap(long)]
    task: Task,

    /// Conversion direction
    #[clap(long, default_value = "to-canonical")]
    direction: Direction,

    /// Output directory
    #[clap(long, short)]
    output: PathBuf,

    /// Write compact JSON instead of pretty-printed JSON
    #[clap(long)]
    compact: bool,

    /// Class manifest directory, relative to the output directory
    #[clap(long)]
    classes_dir: Option<String>,

    /// Maximum number of images to read per input
    #[clap(long)]
    max_images: Option<usize>,

    /// Only keep these COCO categories
    #[clap(long, value_delimiter = ',')]
    categories: Vec<String>,

    /// Reject COCO inputs with dangling image or category references
    #[clap(long)]
    strict: bool,

    /// Dataset files or directories
    #[clap(required = true)]
    inputs: Vec<PathBuf>,
}

impl ConvertArgs {
    /// Apply command line overrides on top of the loaded configuration.
    fn apply(&self, mut config: ConverterConfig) -> ConverterConfig {
        if self.compact {
            config.pretty = false;
        }
        if let Some(classes_dir) = &self.classes_dir {
            config.classes_dir = classes_dir.clone();
        }
        if let Some(max_images) = self.max_images {
            config.max_images = max_images;
        }
        if !self.categories.is_empty() {
            config.categories = self.categories.clone();
        }
        if self.strict {
            config.strict = true;
        }
        config
    }
}

/// Output directory for `input`; nested when converting several inputs.
fn output_dir(output: &Path, input: &Path, multiple: bool) -> PathBuf {
    if !multiple {
        return output.to_path_buf();
    }
    let name = if input.is_dir() {
        input.file_name()
    } else {
        input.file_stem()
    };
    match name {
        Some(name) => output.join(name),
        None => output.join("dataset"),
    }
}

/// Output directory of every input; fails when two inputs would share one.
fn output_dirs(output: &Path, inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Error> {
    let multiple = inputs.len() > 1;
    let mut seen = HashMap::new();
    let mut dirs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let dir = output_dir(output, input, multiple);
        if let Some(other) = seen.insert(dir.clone(), input) {
            return Err(Error::InvalidParameters(format!(
                "{} and {} would both be written to {}",
                other.display(),
                input.display(),
                dir.display()
            )));
        }
        dirs.push(dir);
    }
    Ok(dirs)
}

fn convert_input(
    converter: &Converter,
    config: &ConverterConfig,
    input: &Path,
    output: &Path,
) -> Result<ConversionReport, Error> {
    let source = SourceDataset::read(converter.strategy().format, input, &config.read_options())?;
    let conversion = converter.to_canonical(&source)?;
    let summary =
        ArtifactWriter::with_options(WriteOptions::from(config)).write(&conversion, output)?;
    log::debug!("{}: {:?}", input.display(), summary);
    Ok(conversion.report)
}

fn handle_version() -> Result<(), Error> {
    println!("annoconv {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

fn handle_strategies() -> Result<(), Error> {
    for strategy in &STRATEGIES {
        println!("{}", strategy);
    }
    Ok(())
}

fn handle_convert(config: ConverterConfig, args: ConvertArgs) -> Result<(), Error> {
    let converter = Converter::select(args.format, args.project_type, args.task, args.direction)?;
    let config = args.apply(config);
    let outputs = output_dirs(&args.output, &args.inputs)?;

    let bar = ProgressBar::new(args.inputs.len() as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message("Converting");

    let results: Vec<(PathBuf, Result<ConversionReport, Error>)> = args
        .inputs
        .par_iter()
        .zip(outputs)
        .map(|(input, output)| {
            let result = convert_input(&converter, &config, input, &output);
            bar.inc(1);
            (output, result)
        })
        .collect();
    bar.finish_and_clear();

    let mut first_error = None;
    for (input, (output, result)) in args.inputs.iter().zip(results) {
        match result {
            Ok(report) => {
                println!("{} -> {}: {}", input.display(), output.display(), report);
                for warning in &report.warnings {
                    log::debug!("{}", warning);
                }
            }
            Err(err) => {
                log::error!("{}: {}", input.display(), err);
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(feature = "profiling")]
fn init_profiling() {
    use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        log::warn!("Failed to install tracing subscriber: {}", err);
    }
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[cfg(feature = "profiling")]
    init_profiling();

    let args = Args::parse();

    match args.cmd {
        Command::Version => handle_version(),
        Command::Strategies => handle_strategies(),
        Command::Convert(convert) => {
            let config = ConverterConfig::load(args.config.as_deref())?;
            handle_convert(config, convert)
        }
    }
}
