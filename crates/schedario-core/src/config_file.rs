use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub volumes: Option<Vec<VolumeConfig>>,
    pub output: Option<OutputConfig>,
    pub parsing: Option<ParsingSection>,
}

/// One `[[volumes]]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub id: Option<u8>,
    pub path: Option<String>,
    /// 1-based number of the first dictionary page; earlier pages are
    /// front matter and are not read.
    pub first_page: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: Option<String>,
    pub detailed: Option<bool>,
    pub diagnostics_path: Option<String>,
}

/// Heuristic overrides, fed into the parsing config builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingSection {
    /// Extra boilerplate line patterns, appended to the built-in ones.
    pub boilerplate_patterns: Option<Vec<String>>,
    /// Extra strong headword patterns, appended to the built-in rules.
    pub headword_patterns: Option<Vec<String>>,
    /// Replaces the built-in "see" markers.
    pub alias_markers: Option<Vec<String>>,
    /// Replaces the built-in variant separators.
    pub variant_separators: Option<Vec<String>>,
    pub column_bounds: Option<Vec<f32>>,
    /// Baseline distance (fraction of page height) within which text
    /// fragments share a line.
    pub line_tolerance: Option<f32>,
    /// Distance (fraction of page width) from the column edge within which
    /// a line counts as flush left.
    pub indent_tolerance: Option<f32>,
    pub edge_depth: Option<usize>,
    pub min_repeat_pages: Option<usize>,
    pub max_hyphen_gap: Option<usize>,
    pub max_headword_words: Option<usize>,
    pub missing_boundary_lines: Option<usize>,
    pub definition_separator: Option<String>,
    /// Extra qualifier abbreviations (without the dot) and their expansions.
    pub abbreviations: Option<BTreeMap<String, String>>,
}

/// Platform config directory path: `<config_dir>/schedario/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("schedario").join("config.toml"))
}

/// Load config by cascading CWD `.schedario.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".schedario.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

fn pick<S, T>(
    overlay: Option<&S>,
    base: Option<&S>,
    field: impl Fn(&S) -> Option<T>,
) -> Option<T> {
    overlay.and_then(&field).or_else(|| base.and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
///
/// The volume list is taken whole from whichever side defines it.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (bo, oo) = (base.output.as_ref(), overlay.output.as_ref());
    let (bp, op) = (base.parsing.as_ref(), overlay.parsing.as_ref());

    ConfigFile {
        volumes: overlay.volumes.clone().or(base.volumes.clone()),
        output: Some(OutputConfig {
            path: pick(oo, bo, |o| o.path.clone()),
            detailed: pick(oo, bo, |o| o.detailed),
            diagnostics_path: pick(oo, bo, |o| o.diagnostics_path.clone()),
        }),
        parsing: Some(ParsingSection {
            boilerplate_patterns: pick(op, bp, |p| p.boilerplate_patterns.clone()),
            headword_patterns: pick(op, bp, |p| p.headword_patterns.clone()),
            alias_markers: pick(op, bp, |p| p.alias_markers.clone()),
            variant_separators: pick(op, bp, |p| p.variant_separators.clone()),
            column_bounds: pick(op, bp, |p| p.column_bounds.clone()),
            line_tolerance: pick(op, bp, |p| p.line_tolerance),
            indent_tolerance: pick(op, bp, |p| p.indent_tolerance),
            edge_depth: pick(op, bp, |p| p.edge_depth),
            min_repeat_pages: pick(op, bp, |p| p.min_repeat_pages),
            max_hyphen_gap: pick(op, bp, |p| p.max_hyphen_gap),
            max_headword_words: pick(op, bp, |p| p.max_headword_words),
            missing_boundary_lines: pick(op, bp, |p| p.missing_boundary_lines),
            definition_separator: pick(op, bp, |p| p.definition_separator.clone()),
            abbreviations: pick(op, bp, |p| p.abbreviations.clone()),
        }),
    }
}

/// Save the config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volumes_parse_from_toml() {
        let toml_str = r#"
[[volumes]]
id = 1
path = "1.pdf"
first_page = 5

[[volumes]]
id = 2
path = "2.pdf"

[output]
path = "out/schedario.json"
"#;
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        let volumes = parsed.volumes.unwrap();
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].first_page, Some(5));
        assert_eq!(volumes[1].first_page, None);
        assert_eq!(parsed.output.unwrap().path.unwrap(), "out/schedario.json");
    }

    #[test]
    fn parsing_section_absent_deserializes_as_none() {
        let parsed: ConfigFile = toml::from_str("[output]\ndetailed = true\n").unwrap();
        assert!(parsed.parsing.is_none());
    }

    #[test]
    fn merge_overlay_wins_per_field() {
        let base = ConfigFile {
            output: Some(OutputConfig {
                path: Some("/base/out.json".to_string()),
                detailed: Some(true),
                ..Default::default()
            }),
            parsing: Some(ParsingSection {
                max_hyphen_gap: Some(4),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            output: Some(OutputConfig {
                path: Some("/overlay/out.json".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        let output = merged.output.unwrap();
        assert_eq!(output.path.unwrap(), "/overlay/out.json");
        assert_eq!(output.detailed, Some(true));
        assert_eq!(merged.parsing.unwrap().max_hyphen_gap, Some(4));
    }

    #[test]
    fn load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[parsing]\nalias_markers = [\"v.\", \"cfr.\"]\n").unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(
            loaded.parsing.unwrap().alias_markers.unwrap(),
            vec!["v.".to_string(), "cfr.".to_string()]
        );
        assert!(load_from_path(&dir.path().join("missing.toml")).is_none());
    }
}
