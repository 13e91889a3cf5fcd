use std::io::Write;

use owo_colors::OwoColorize;
use schedario_core::{Diagnostics, RawEntryBlock};
use schedario_parsing::{DictionaryBuild, ParsedBlock};
use schedario_reporting::MappingDiff;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print per-volume counters and the totals of a finished build.
pub fn print_build_summary(
    w: &mut dyn Write,
    build: &DictionaryBuild,
    color: ColorMode,
) -> std::io::Result<()> {
    for stats in &build.stats.volumes {
        let volume = stats
            .volume
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string());
        writeln!(
            w,
            "{}: {} pages, {} blocks, {} entries ({} aliases), {} section letters",
            volume,
            stats.normalize.pages,
            stats.blocks,
            stats.entries,
            stats.aliases,
            stats.section_letters
        )?;
        let dropped = format!(
            "  (dropped {} boilerplate and {} running-head lines, rejoined {} hyphenations)",
            stats.normalize.boilerplate_lines,
            stats.normalize.furniture_lines,
            stats.normalize.hyphen_joins
        );
        if color.enabled() {
            writeln!(w, "{}", dropped.dimmed())?;
        } else {
            writeln!(w, "{}", dropped)?;
        }
    }

    let total = format!(
        "{} headwords, {} aliases",
        build.stats.headwords, build.stats.aliases
    );
    if color.enabled() {
        writeln!(w, "{}", total.bold())?;
    } else {
        writeln!(w, "{}", total)?;
    }
    Ok(())
}

/// Print the diagnostic summary, then up to `limit` individual entries.
pub fn print_diagnostics(
    w: &mut dyn Write,
    diagnostics: &Diagnostics,
    limit: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    let summary = diagnostics.summary();
    if summary.total() == 0 {
        if color.enabled() {
            writeln!(w, "{}", "No anomalies recorded".green())?;
        } else {
            writeln!(w, "No anomalies recorded")?;
        }
        return Ok(());
    }

    if color.enabled() {
        writeln!(w, "{} {}", "Diagnostics:".yellow().bold(), summary)?;
    } else {
        writeln!(w, "Diagnostics: {}", summary)?;
    }
    for diagnostic in diagnostics.iter().take(limit) {
        if color.enabled() {
            writeln!(w, "  {} {}", format!("[{}]", diagnostic.kind()).dimmed(), diagnostic)?;
        } else {
            writeln!(w, "  [{}] {}", diagnostic.kind(), diagnostic)?;
        }
    }
    if diagnostics.len() > limit {
        writeln!(w, "  ... and {} more", diagnostics.len() - limit)?;
    }
    Ok(())
}

/// Print a diff summary; with `full`, list every affected headword.
pub fn print_diff(
    w: &mut dyn Write,
    diff: &MappingDiff,
    full: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    if diff.is_empty() {
        writeln!(w, "No changes")?;
        return Ok(());
    }
    if color.enabled() {
        writeln!(
            w,
            "{} added, {} removed, {} changed",
            diff.added.len().green(),
            diff.removed.len().red(),
            diff.changed.len().yellow()
        )?;
    } else {
        writeln!(w, "{}", diff)?;
    }
    if !full {
        return Ok(());
    }

    for (headword, definition) in &diff.added {
        if color.enabled() {
            writeln!(w, "{} {}: {}", "+".green(), headword.bold(), definition)?;
        } else {
            writeln!(w, "+ {}: {}", headword, definition)?;
        }
    }
    for (headword, definition) in &diff.removed {
        if color.enabled() {
            writeln!(w, "{} {}: {}", "-".red(), headword.bold(), definition)?;
        } else {
            writeln!(w, "- {}: {}", headword, definition)?;
        }
    }
    for change in &diff.changed {
        if color.enabled() {
            writeln!(w, "{} {}", "~".yellow(), change.headword.bold())?;
            writeln!(w, "    {}", change.old.dimmed())?;
            writeln!(w, "    {}", change.new)?;
        } else {
            writeln!(w, "~ {}", change.headword)?;
            writeln!(w, "    {}", change.old)?;
            writeln!(w, "    {}", change.new)?;
        }
    }
    Ok(())
}

/// Print one segmented block with the parser's verdict (dry run).
pub fn print_block(
    w: &mut dyn Write,
    index: usize,
    block: &RawEntryBlock,
    parsed: &ParsedBlock,
    color: ColorMode,
) -> std::io::Result<()> {
    let verdict = match parsed {
        ParsedBlock::Entry(entry) if entry.is_alias => format!(
            "alias {} → {}",
            entry.headword,
            entry.alias_target.as_deref().unwrap_or("")
        ),
        ParsedBlock::Entry(entry) => match &entry.qualifier {
            Some(q) => format!("entry {} ({})", entry.headword, q),
            None => format!("entry {}", entry.headword),
        },
        ParsedBlock::SectionLetter(letter) => format!("section {}", letter),
        ParsedBlock::Unparseable(reason) => format!("unparseable: {}", reason),
    };

    if color.enabled() {
        let verdict = match parsed {
            ParsedBlock::Entry(e) if e.is_alias => verdict.cyan().to_string(),
            ParsedBlock::Entry(_) => verdict.green().to_string(),
            ParsedBlock::SectionLetter(_) => verdict.dimmed().to_string(),
            ParsedBlock::Unparseable(_) => verdict.red().to_string(),
        };
        writeln!(
            w,
            "{} {} {}",
            format!("[{}]", index + 1).bold(),
            format!("p.{}", block.start_page).dimmed(),
            verdict
        )?;
    } else {
        writeln!(w, "[{}] p.{} {}", index + 1, block.start_page, verdict)?;
    }
    for line in &block.lines {
        if line.emphasized && color.enabled() {
            writeln!(w, "    {}", line.text.bold())?;
        } else {
            writeln!(w, "    {}", line.text)?;
        }
    }
    Ok(())
}
