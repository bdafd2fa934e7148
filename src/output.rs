//! CLI output formatting for selection requests and palettes.
//!
//! # Information-First Display
//!
//! Output leads with what was decided (strategy, palette, which image fills
//! which slot) and shows the supporting numbers as indented context lines.
//! Every entity follows the same two-level pattern:
//!
//! 1. **Header line**: positional index + identity (+ score)
//! 2. **Context lines**: indented `Source:`, contrast ratios, applied bonuses
//!
//! # Output Format
//!
//! ## Progress
//!
//! ```text
//! Selecting for therapy (3 sections)
//! Retrieved 7 of 8 lookups (1 provider failure) in 42ms
//! Palette calming-blue (harmony 0.82, 2 flagged)
//! hero: 2 selected
//! gallery: 1 selected, 3 placeholders
//! Strategy calming-first (0.0790)
//! Done with 4 warnings
//! ```
//!
//! ## Summary
//!
//! ```text
//! Strategy calming-first (0.0790)
//!     Steps: gentle-welcome → approach → services → reassurance → soft-booking
//!     +0.0300 anxiety_level = high
//!     Runner-up: trust-first (0.0690)
//!
//! Palette calming-blue (harmony 0.82, fit 0.85)
//!     primary #4A90E2  1.84 on white, 11.38 on black
//!     tertiary #F4F4F4  1.04 on white, 20.13 on black  [low contrast]
//!
//! Sections
//! 001 hero (2)
//!     001 s-office 0.671 [calming, cool-tone]
//!         Source: stock / calm office
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::color::AnnotatedPalette;
use crate::config::EngineConfig;
use crate::pipeline::SelectionEvent;
use crate::types::{SelectedAsset, SelectionResult};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

/// Format a selected entry: index, id, composite score and rationale tags.
///
/// ```text
/// 001 s-office 0.671 [calming, cool-tone]
/// 002 placeholder-1f2e3d4c5b6a 0.500 [synthetic]
/// ```
fn entry_line(index: usize, entry: &SelectedAsset) -> String {
    let tags = if entry.rationale_tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", entry.rationale_tags.join(", "))
    };
    format!(
        "{} {} {:.3}{}",
        format_index(index),
        entry.candidate_id,
        entry.composite_score,
        tags
    )
}

// ============================================================================
// Progress events
// ============================================================================

/// Format one progress event as it arrives from the pipeline.
pub fn format_selection_event(event: &SelectionEvent) -> Vec<String> {
    match event {
        SelectionEvent::Started { sector, sections } => vec![format!(
            "Selecting for {} ({})",
            sector,
            plural(*sections, "section", "sections")
        )],
        SelectionEvent::Retrieved {
            lookups,
            found,
            failures,
            elapsed,
        } => {
            let failed = if *failures > 0 {
                format!(
                    " ({})",
                    plural(*failures, "provider failure", "provider failures")
                )
            } else {
                String::new()
            };
            vec![format!(
                "Retrieved {} of {} lookups{} in {}ms",
                found,
                lookups,
                failed,
                elapsed.as_millis()
            )]
        }
        SelectionEvent::PaletteChosen {
            name,
            harmony,
            flagged,
        } => vec![format!(
            "Palette {} (harmony {:.2}, {} flagged)",
            name, harmony, flagged
        )],
        SelectionEvent::SectionRanked {
            section,
            selected,
            placeholders,
        } => {
            if *placeholders > 0 {
                vec![format!(
                    "{}: {} selected, {}",
                    section,
                    selected,
                    plural(*placeholders, "placeholder", "placeholders")
                )]
            } else {
                vec![format!("{}: {} selected", section, selected)]
            }
        }
        SelectionEvent::StrategyChosen { id, score } => {
            vec![format!("Strategy {} ({:.4})", id, score)]
        }
        SelectionEvent::Finished { warnings } => {
            vec![format!("Done with {}", plural(*warnings, "warning", "warnings"))]
        }
    }
}

// ============================================================================
// Palette
// ============================================================================

/// Format an annotated palette: header plus one line per base color.
pub fn format_palette(palette: &AnnotatedPalette) -> Vec<String> {
    let mut lines = vec![format!(
        "Palette {} (harmony {:.2}, fit {:.2})",
        palette.name, palette.harmony, palette.fit_score
    )];
    for swatch in &palette.swatches {
        let flag = if swatch.meets_min_contrast {
            ""
        } else {
            "  [low contrast]"
        };
        lines.push(format!(
            "{}{} {}  {:.2} on white, {:.2} on black{}",
            indent(1),
            swatch.role,
            swatch.base,
            swatch.on_white,
            swatch.on_black,
            flag
        ));
    }
    lines
}

/// Print palette output to stdout.
pub fn print_palette(palette: &AnnotatedPalette) {
    for line in format_palette(palette) {
        println!("{}", line);
    }
}

// ============================================================================
// Selection summary
// ============================================================================

/// Human-readable summary of a selection result.
pub fn format_summary(result: &SelectionResult) -> Vec<String> {
    let mut lines = Vec::new();
    let strategy = &result.strategy;

    lines.push(format!(
        "Strategy {} ({:.4})",
        strategy.chosen.id, strategy.chosen.score
    ));
    lines.push(format!(
        "{}Steps: {}",
        indent(1),
        strategy.chosen.steps.join(" \u{2192} ")
    ));
    for bonus in &strategy.chosen.applied {
        lines.push(format!("{}{:+.4} {}", indent(1), bonus.bonus, bonus.condition));
    }
    for runner_up in &strategy.runners_up {
        lines.push(format!(
            "{}Runner-up: {} ({:.4})",
            indent(1),
            runner_up.id,
            runner_up.score
        ));
    }

    lines.push(String::new());
    lines.extend(format_palette(&result.palette));

    lines.push(String::new());
    lines.push("Sections".to_string());
    for (i, section) in result.sections.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            section.section,
            section.entries.len()
        ));
        for (j, entry) in section.entries.iter().enumerate() {
            lines.push(format!("{}{}", indent(1), entry_line(j + 1, entry)));
            if !entry.synthetic {
                lines.push(format!(
                    "{}Source: {} / {}",
                    indent(2),
                    entry.source,
                    entry.keyword
                ));
                if !entry.alt_text.is_empty() {
                    lines.push(format!("{}{}", indent(2), truncate_desc(&entry.alt_text, 60)));
                }
            }
        }
    }

    let diagnostics = &result.diagnostics;
    if !diagnostics.warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        for warning in &diagnostics.warnings {
            lines.push(format!("{}{}", indent(1), warning));
        }
    }
    if !diagnostics.recommendations.is_empty() {
        lines.push(String::new());
        lines.push("Recommendations".to_string());
        for recommendation in &diagnostics.recommendations {
            lines.push(format!("{}{}", indent(1), recommendation));
        }
    }

    lines
}

/// Print the selection summary to stdout.
pub fn print_summary(result: &SelectionResult) {
    for line in format_summary(result) {
        println!("{}", line);
    }
}

// ============================================================================
// Config check
// ============================================================================

/// Inventory of the loaded tables, shown by `check`.
pub fn format_check_output(config: &EngineConfig) -> Vec<String> {
    let mut lines = vec!["Sectors".to_string()];
    for (i, (id, sector)) in config.sectors.iter().enumerate() {
        let label = if sector.label.is_empty() {
            String::new()
        } else {
            format!(" ({})", sector.label)
        };
        lines.push(format!("{}{} {}{}", indent(1), format_index(i + 1), id, label));
        let names: Vec<&str> = sector.palettes.iter().map(|p| p.name.as_str()).collect();
        lines.push(format!("{}Palettes: {}", indent(2), names.join(", ")));
        if !sector.rubrics.is_empty() {
            let dims: Vec<&str> = sector.rubrics.keys().map(|d| d.as_str()).collect();
            lines.push(format!("{}Rubric overrides: {}", indent(2), dims.join(", ")));
        }
    }

    lines.push(String::new());
    lines.push("Sections".to_string());
    for name in config.sections.keys() {
        lines.push(format!("{}{}", indent(1), name));
    }

    lines.push(String::new());
    lines.push("Providers".to_string());
    for (i, provider) in config.providers.iter().enumerate() {
        lines.push(format!(
            "{}{} {} ({:?}, {})",
            indent(1),
            format_index(i + 1),
            provider.id,
            provider.kind,
            provider.tier
        ));
    }

    lines.push(String::new());
    lines.push("Strategies".to_string());
    for (i, strategy) in config.strategies.iter().enumerate() {
        lines.push(format!(
            "{}{} {} (base {:.3}, {})",
            indent(1),
            format_index(i + 1),
            strategy.id,
            strategy.base_rate,
            plural(strategy.bonuses.len(), "bonus", "bonuses")
        ));
    }
    lines
}

/// Print the config inventory to stdout.
pub fn print_check_output(config: &EngineConfig) {
    for line in format_check_output(config) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
