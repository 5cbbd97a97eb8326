//! Terminal presentation of research sessions.
//!
//! This module provides the phase spinner, colored status lines, paper cards,
//! the analysis block and the publication timeline.

use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::models::{AnalysisResult, Paper, SearchPhase, SearchState};
use crate::utils::YearCount;

/// Get the current terminal width.
pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(100)
}

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Warning,
    Info,
}

/// Print a styled status message to stderr.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => eprintln!("{} {}", icon.green().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => eprintln!("{} {}", icon.cyan().bold(), msg),
    }
}

/// Icon for a research phase.
pub fn phase_icon(phase: SearchPhase) -> &'static str {
    match phase {
        SearchPhase::Idle => "○",
        SearchPhase::GeneratingQuery => "🧠",
        SearchPhase::FetchingPapers => "📡",
        SearchPhase::Analyzing => "⚗️",
        SearchPhase::Success => "✓",
        SearchPhase::Error => "✗",
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Score bands used to color relevance badges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTier {
    High,
    Medium,
    Low,
}

impl ScoreTier {
    /// Band for a score: 8 and above is high, 5 and above is medium
    pub fn of(score: f64) -> Self {
        if score >= 8.0 {
            ScoreTier::High
        } else if score >= 5.0 {
            ScoreTier::Medium
        } else {
            ScoreTier::Low
        }
    }
}

/// Score badge text like `9.5/10`, or `None` for unscored papers
pub fn score_badge(paper: &Paper) -> Option<String> {
    paper
        .score
        .filter(|s| *s > 0.0)
        .map(|s| format!("{}/10", format_score(s)))
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{:.0}", score)
    } else {
        format!("{:.1}", score)
    }
}

fn colored_badge(paper: &Paper) -> String {
    match (score_badge(paper), paper.score) {
        (Some(badge), Some(score)) => match ScoreTier::of(score) {
            ScoreTier::High => format!("★ {}", badge).green().bold().to_string(),
            ScoreTier::Medium => format!("★ {}", badge).yellow().to_string(),
            ScoreTier::Low => format!("★ {}", badge).dimmed().to_string(),
        },
        _ => String::new(),
    }
}

/// Short date for display (the first ten characters of the timestamp)
pub fn short_date(paper: &Paper) -> String {
    paper
        .published_at()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| paper.published.chars().take(10).collect())
}

/// Print a paper as a card.
pub fn print_paper_card(index: usize, paper: &Paper) {
    let width = terminal_width().clamp(40, 120);

    println!();
    println!(
        "{} {} {}",
        format!("{:>2}.", index).dimmed(),
        truncate_with_ellipsis(&paper.title, width.saturating_sub(16))
            .blue()
            .bold(),
        colored_badge(paper)
    );
    println!(
        "    📅 {}  🏷  {}  👥 {}",
        short_date(paper).yellow(),
        paper.primary_category().green(),
        truncate_with_ellipsis(&paper.author_line(), width.saturating_sub(40))
    );
    if let Some(reason) = &paper.reason {
        println!("    {} {}", "Match:".magenta().bold(), reason);
    }
    if !paper.summary.is_empty() {
        println!(
            "    {}",
            truncate_with_ellipsis(paper.summary.trim(), width.saturating_sub(4) * 2).dimmed()
        );
    }
    println!("    🔗 {}", paper.link.cyan());
}

/// Print the analysis block.
pub fn print_analysis(analysis: &AnalysisResult) {
    if analysis.is_empty() {
        return;
    }
    print_section("Analysis");
    if !analysis.summary.is_empty() {
        println!("{}", analysis.summary);
    }
    if !analysis.key_trends.is_empty() {
        println!();
        println!("{}", "Key trends".bold());
        for trend in &analysis.key_trends {
            println!("  • {}", trend);
        }
    }
    if !analysis.suggested_directions.is_empty() {
        println!();
        println!("{}", "Suggested directions".bold());
        for direction in &analysis.suggested_directions {
            println!("  → {}", direction);
        }
    }
}

/// Render timeline bars, the most recent year highlighted.
pub fn timeline_lines(timeline: &[YearCount], max_bar: usize) -> Vec<String> {
    let peak = timeline.iter().map(|y| y.count).max().unwrap_or(0);
    timeline
        .iter()
        .map(|entry| {
            let len = if peak == 0 {
                0
            } else {
                (entry.count * max_bar).div_ceil(peak)
            };
            format!("{} {} {}", entry.year, "█".repeat(len), entry.count)
        })
        .collect()
}

/// Print the publication timeline.
pub fn print_timeline(timeline: &[YearCount]) {
    if timeline.is_empty() {
        return;
    }
    print_section("Publication Timeline");
    let lines = timeline_lines(timeline, 40);
    let last = lines.len() - 1;
    for (i, line) in lines.iter().enumerate() {
        if i == last {
            println!("{}", line.blue().bold());
        } else {
            println!("{}", line.dimmed());
        }
    }
}

/// Truncate text to fit within the specified width using unicode-aware truncation.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width <= 3 {
        return "...".to_string();
    }

    let char_widths: Vec<(char, usize)> = text
        .chars()
        .map(|c| (c, unicode_width::UnicodeWidthChar::width(c).unwrap_or(1)))
        .collect();

    let total_width: usize = char_widths.iter().map(|(_, w)| *w).sum();

    if total_width <= max_width {
        return text.to_string();
    }

    // Find the longest prefix that fits
    let mut current_width = 0;
    let mut end_idx = 0;

    for (i, (_, w)) in char_widths.iter().enumerate() {
        if current_width + w > max_width.saturating_sub(3) {
            break;
        }
        current_width += w;
        end_idx = i + 1;
    }

    if end_idx == 0 {
        return "...".to_string();
    }

    let truncated: String = char_widths[..end_idx].iter().map(|(c, _)| *c).collect();
    format!("{}...", truncated)
}

/// Spinner that follows the phase of a research session
pub struct PhaseSpinner {
    pb: indicatif::ProgressBar,
}

impl PhaseSpinner {
    /// Create a spinner on stderr; hidden when `visible` is false.
    pub fn new(state: &SearchState, visible: bool) -> Self {
        let pb = if visible {
            indicatif::ProgressBar::new_spinner()
        } else {
            indicatif::ProgressBar::hidden()
        };
        if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.enable_steady_tick(Duration::from_millis(100));

        let spinner = Self { pb };
        spinner.update(state);
        spinner
    }

    /// Show the current phase and message.
    pub fn update(&self, state: &SearchState) {
        let message = state.message.as_deref().unwrap_or(state.phase.as_str());
        self.pb
            .set_message(format!("{} {}", phase_icon(state.phase), message));
    }

    /// Finish with success message.
    pub fn finish_with_success(&self, msg: &str) {
        self.finish_styled("{spinner:.green} {msg}", "✓✓", msg);
    }

    /// Finish with error message.
    pub fn finish_with_error(&self, msg: &str) {
        self.finish_styled("{spinner:.red} {msg}", "✗✗", msg);
    }

    /// `ticks` needs at least two characters; the last one is shown once finished.
    fn finish_styled(&self, template: &str, ticks: &str, msg: &str) {
        if let Ok(style) = indicatif::ProgressStyle::with_template(template) {
            self.pb.set_style(style.tick_chars(ticks));
        }
        self.pb.finish_with_message(msg.to_string());
    }
}
