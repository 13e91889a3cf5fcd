use std::io::{BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use schedario_core::config_file::{self, ConfigFile};
use schedario_ingest::{read_volume, write_fragment_cache, VolumeId, VolumeSource};
use schedario_parsing::{DictionaryExtractor, ParsingConfig, ParsingConfigBuilder};
use schedario_reporting::{
    diff_mappings, read_flat_mapping, write_diagnostics, write_mapping, ExportFormat,
};
use tracing_subscriber::EnvFilter;

mod output;

use output::ColorMode;

const DEFAULT_OUTPUT: &str = "schedario.json";

/// Schedario - Build a headword dictionary from scanned dictionary volumes
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Read this config file instead of the default cascade
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, merge and write the dictionary
    Build {
        /// Volume files (.pdf, .txt or .jsonl) in volume order; defaults to
        /// the [[volumes]] of the config file
        volumes: Vec<PathBuf>,

        /// Output JSON path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write every entry field instead of the flat mapping
        #[arg(long)]
        detailed: bool,

        /// Also write all diagnostics as JSON to this path
        #[arg(long)]
        diagnostics: Option<PathBuf>,

        /// Number of individual diagnostics to print
        #[arg(long, default_value_t = 20)]
        show: usize,

        /// Do not compare with the previous output before overwriting it
        #[arg(long)]
        no_diff: bool,
    },

    /// Compare two persisted mappings
    Diff {
        old: PathBuf,
        new: PathBuf,

        /// Only print the counts
        #[arg(long)]
        summary: bool,
    },

    /// Dry run: print the segmented blocks of one volume and how each parses
    Segments {
        volume: PathBuf,

        /// Volume number
        #[arg(long, default_value_t = 1)]
        id: u8,

        /// First dictionary page (1-based)
        #[arg(long)]
        first_page: Option<usize>,

        /// Only show blocks starting on this page
        #[arg(long)]
        page: Option<usize>,
    },

    /// Extract page fragments once and store them as a .jsonl cache
    Cache {
        volume: PathBuf,

        /// Cache file to write
        output: PathBuf,

        /// Volume number
        #[arg(long, default_value_t = 1)]
        id: u8,

        /// First dictionary page (1-based)
        #[arg(long)]
        first_page: Option<usize>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Save it to the platform config directory
        #[arg(long)]
        save: bool,
    },
}

/// One volume to read: its number, file and front-matter offset.
#[derive(Debug, Clone)]
struct VolumeInput {
    id: VolumeId,
    path: PathBuf,
    first_page: usize,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let color = ColorMode(!cli.no_color && std::io::stdout().is_terminal());

    match cli.command {
        Command::Build {
            volumes,
            output,
            detailed,
            diagnostics,
            show,
            no_diff,
        } => build(
            &config,
            volumes,
            output,
            detailed,
            diagnostics,
            show,
            no_diff,
            color,
        ),
        Command::Diff { old, new, summary } => diff(&old, &new, !summary, color),
        Command::Segments {
            volume,
            id,
            first_page,
            page,
        } => segments(&config, &volume, VolumeId(id), first_page, page, color),
        Command::Cache {
            volume,
            output,
            id,
            first_page,
        } => cache(&config, &volume, &output, VolumeId(id), first_page),
        Command::Config { save } => show_config(&config, save),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ConfigFile> {
    match path {
        Some(path) => config_file::load_from_path(path)
            .with_context(|| format!("Cannot read config file {}", path.display())),
        None => Ok(config_file::load_config()),
    }
}

fn parsing_config(config: &ConfigFile) -> anyhow::Result<ParsingConfig> {
    let mut builder = ParsingConfigBuilder::new();
    if let Some(section) = &config.parsing {
        builder = builder.with_config_file(section);
    }
    builder
        .build()
        .context("Invalid pattern in the [parsing] configuration")
}

/// First page of volume `id` as configured, when no flag gives one.
fn configured_first_page(config: &ConfigFile, id: VolumeId) -> Option<usize> {
    config
        .volumes
        .iter()
        .flatten()
        .find(|v| v.id == Some(id.0))
        .and_then(|v| v.first_page)
}

/// Number of the volume at `index` when none is given explicitly.
fn volume_number(index: usize) -> anyhow::Result<VolumeId> {
    u8::try_from(index + 1)
        .map(VolumeId)
        .map_err(|_| anyhow::anyhow!("Too many volumes: at most {} are supported", u8::MAX))
}

/// Volumes from the command line (numbered in order), else from the config.
fn resolve_volumes(config: &ConfigFile, paths: Vec<PathBuf>) -> anyhow::Result<Vec<VolumeInput>> {
    let inputs: Vec<VolumeInput> = if paths.is_empty() {
        config
            .volumes
            .iter()
            .flatten()
            .enumerate()
            .filter_map(|(i, v)| v.path.as_ref().map(|path| (i, v, path)))
            .map(|(i, v, path)| {
                let id = match v.id {
                    Some(id) => VolumeId(id),
                    None => volume_number(i)?,
                };
                Ok(VolumeInput {
                    id,
                    path: PathBuf::from(path),
                    first_page: v.first_page.unwrap_or(1),
                })
            })
            .collect::<anyhow::Result<_>>()?
    } else {
        paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| {
                let id = volume_number(i)?;
                Ok(VolumeInput {
                    id,
                    path,
                    first_page: configured_first_page(config, id).unwrap_or(1),
                })
            })
            .collect::<anyhow::Result<_>>()?
    };

    if inputs.is_empty() {
        anyhow::bail!("No volumes given. Pass volume files or list [[volumes]] in .schedario.toml");
    }
    for input in &inputs {
        if !input.path.exists() {
            anyhow::bail!("Volume file not found: {}", input.path.display());
        }
    }
    Ok(inputs)
}

/// Resolve the output path: flag > SCHEDARIO_OUTPUT > config file > default.
fn resolve_output(config: &ConfigFile, flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var("SCHEDARIO_OUTPUT").ok().map(PathBuf::from))
        .or_else(|| {
            config
                .output
                .as_ref()
                .and_then(|o| o.path.as_ref())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

#[allow(clippy::too_many_arguments)]
fn build(
    config: &ConfigFile,
    volumes: Vec<PathBuf>,
    output: Option<PathBuf>,
    detailed: bool,
    diagnostics_path: Option<PathBuf>,
    show: usize,
    no_diff: bool,
    color: ColorMode,
) -> anyhow::Result<()> {
    let inputs = resolve_volumes(config, volumes)?;
    let output_path = resolve_output(config, output);
    let output_config = config.output.clone().unwrap_or_default();
    let format = if detailed || output_config.detailed.unwrap_or(false) {
        ExportFormat::Detailed
    } else {
        ExportFormat::Flat
    };
    let diagnostics_path =
        diagnostics_path.or_else(|| output_config.diagnostics_path.map(PathBuf::from));

    let extractor = DictionaryExtractor::with_config(parsing_config(config)?);
    let source = inputs.iter().fold(VolumeSource::new(), |source, input| {
        source.with_first_page(input.id, input.first_page)
    });
    let volume_paths: Vec<(VolumeId, PathBuf)> =
        inputs.iter().map(|s| (s.id, s.path.clone())).collect();

    let bar = spinner(format!("Extracting {} volumes...", inputs.len()));
    let result = extractor.build_from_source(&volume_paths, &source);
    bar.finish_and_clear();
    let build = result.context("Dictionary build failed")?;

    let stdout = std::io::stdout();
    let mut w = stdout.lock();
    output::print_build_summary(&mut w, &build, color)?;
    output::print_diagnostics(&mut w, &build.diagnostics, show, color)?;

    if !no_diff && output_path.exists() {
        match read_flat_mapping(&output_path) {
            Ok(previous) => {
                let diff = diff_mappings(&previous, &build.mapping.to_flat());
                write!(w, "Compared with {}: ", output_path.display())?;
                output::print_diff(&mut w, &diff, false, color)?;
            }
            Err(e) => {
                tracing::warn!(path = %output_path.display(), error = %e, "previous output unreadable, not diffing");
            }
        }
    }

    write_mapping(&build.mapping, format, &output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    writeln!(w, "Wrote {}", output_path.display())?;

    if let Some(path) = diagnostics_path {
        write_diagnostics(&build.diagnostics, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        writeln!(w, "Wrote diagnostics to {}", path.display())?;
    }
    Ok(())
}

fn diff(old: &Path, new: &Path, full: bool, color: ColorMode) -> anyhow::Result<()> {
    let old_map =
        read_flat_mapping(old).with_context(|| format!("Failed to read {}", old.display()))?;
    let new_map =
        read_flat_mapping(new).with_context(|| format!("Failed to read {}", new.display()))?;
    let diff = diff_mappings(&old_map, &new_map);

    let stdout = std::io::stdout();
    let mut w = stdout.lock();
    output::print_diff(&mut w, &diff, full, color)?;
    Ok(())
}

fn segments(
    config: &ConfigFile,
    volume: &Path,
    id: VolumeId,
    first_page: Option<usize>,
    page: Option<usize>,
    color: ColorMode,
) -> anyhow::Result<()> {
    if !volume.exists() {
        anyhow::bail!("File not found: {}", volume.display());
    }
    let first_page = first_page
        .or_else(|| configured_first_page(config, id))
        .unwrap_or(1);
    let extractor = DictionaryExtractor::with_config(parsing_config(config)?);

    let pages = read_volume(volume, id, first_page)?;
    let normalized = extractor.normalize(pages);
    let segmentation = extractor.segment(normalized.lines);

    let stdout = std::io::stdout();
    let mut w = stdout.lock();
    writeln!(
        w,
        "DRY RUN: {} ({} pages, {} blocks)\n",
        volume.display(),
        normalized.stats.pages,
        segmentation.blocks.len()
    )?;
    for (i, block) in segmentation.blocks.iter().enumerate() {
        if page.is_some_and(|p| p != block.start_page) {
            continue;
        }
        let parsed = extractor.parse_block(block);
        output::print_block(&mut w, i, block, &parsed, color)?;
    }

    let mut diagnostics = normalized.diagnostics;
    diagnostics.extend(segmentation.diagnostics);
    writeln!(w)?;
    output::print_diagnostics(&mut w, &diagnostics, usize::MAX, color)?;
    Ok(())
}

fn cache(
    config: &ConfigFile,
    volume: &Path,
    output: &Path,
    id: VolumeId,
    first_page: Option<usize>,
) -> anyhow::Result<()> {
    let first_page = first_page
        .or_else(|| configured_first_page(config, id))
        .unwrap_or(1);

    let bar = spinner(format!("Reading {}...", volume.display()));
    let pages = read_volume(volume, id, first_page);
    bar.finish_and_clear();
    let pages = pages.with_context(|| format!("Failed to read {}", volume.display()))?;

    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let written = write_fragment_cache(BufWriter::new(file), &pages)?;
    println!(
        "Cached {} fragments from {} pages to {}",
        written,
        pages.len(),
        output.display()
    );
    Ok(())
}

fn show_config(config: &ConfigFile, save: bool) -> anyhow::Result<()> {
    // Fail on bad patterns before printing or saving them
    parsing_config(config)?;
    print!("{}", toml::to_string_pretty(config)?);
    if save {
        let path = config_file::save_config(config).map_err(anyhow::Error::msg)?;
        eprintln!("Saved config to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use schedario_core::config_file::{OutputConfig, VolumeConfig};

    fn config_with_volumes() -> ConfigFile {
        ConfigFile {
            volumes: Some(vec![
                VolumeConfig {
                    id: Some(1),
                    path: Some("a.pdf".into()),
                    first_page: Some(9),
                },
                VolumeConfig {
                    id: Some(2),
                    path: None,
                    first_page: Some(3),
                },
            ]),
            output: Some(OutputConfig {
                path: Some("from-config.json".into()),
                ..Default::default()
            }),
            parsing: None,
        }
    }

    #[test]
    fn test_configured_first_page() {
        let config = config_with_volumes();
        assert_eq!(configured_first_page(&config, VolumeId(1)), Some(9));
        assert_eq!(configured_first_page(&config, VolumeId(2)), Some(3));
        assert_eq!(configured_first_page(&config, VolumeId(3)), None);
    }

    #[test]
    fn test_output_flag_wins() {
        let config = config_with_volumes();
        assert_eq!(
            resolve_output(&config, Some(PathBuf::from("flag.json"))),
            PathBuf::from("flag.json")
        );
    }

    #[test]
    fn test_missing_volume_file_rejected() {
        let err = resolve_volumes(&ConfigFile::default(), vec![PathBuf::from("/nonexistent/1.pdf")])
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_volume_numbers_stop_at_u8() {
        assert_eq!(volume_number(0).unwrap(), VolumeId(1));
        assert_eq!(volume_number(254).unwrap(), VolumeId(255));
        assert!(volume_number(255).is_err());

        let paths = (0..256)
            .map(|i| PathBuf::from(format!("/nonexistent/{i}.pdf")))
            .collect();
        let err = resolve_volumes(&ConfigFile::default(), paths).unwrap_err();
        assert!(err.to_string().contains("at most 255"));
    }

    #[test]
    fn test_no_volumes_rejected() {
        assert!(resolve_volumes(&ConfigFile::default(), Vec::new()).is_err());
    }

    #[test]
    fn test_cli_parses_build() {
        let cli = Cli::try_parse_from(["schedario", "-vv", "build", "1.pdf", "2.pdf", "--detailed"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Build {
                volumes, detailed, ..
            } => {
                assert_eq!(volumes.len(), 2);
                assert!(detailed);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
