use crate::core::{AnalysisResult, OutlineResult, VideoRecord};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const WRAP_WIDTH: usize = 80;
const TITLE_WIDTH: usize = 48;

/// Compact count: 950, 12.3K, 4.5M.
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Cut to a display width, counting wide (CJK) characters as two columns.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width.saturating_sub(1) {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn pad_to_width(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(pad))
}

pub fn video_table(videos: &[VideoRecord]) -> String {
    let mut lines = vec![format!(
        "{:>3}  {:>9}  {:>7}  {:>7}  {:>6}  {:<10}  {}",
        "#", "RATIO", "VIEWS", "SUBS", "CMTS", "DATE", "TITLE"
    )];

    for (i, video) in videos.iter().enumerate() {
        lines.push(format!(
            "{:>3}  {:>8.2}x  {:>7}  {:>7}  {:>6}  {:<10}  {}  {}",
            i + 1,
            video.efficiency_ratio,
            format_count(video.view_count),
            format_count(video.subscriber_count),
            format_count(video.comment_count),
            video.published_date(),
            pad_to_width(&truncate_to_width(&video.title, TITLE_WIDTH), TITLE_WIDTH),
            video.id,
        ));
    }

    lines.join("\n")
}

fn bullet_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| {
            textwrap::wrap(item, WRAP_WIDTH - 4)
                .into_iter()
                .enumerate()
                .map(|(i, line)| {
                    if i == 0 {
                        format!("  - {line}")
                    } else {
                        format!("    {line}")
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn analysis_text(title: &str, analysis: &AnalysisResult) -> String {
    let mut lines = vec![format!("Analysis: {title}"), String::new(), "Sentiment".to_string()];
    lines.extend(
        textwrap::wrap(&analysis.sentiment, WRAP_WIDTH - 2)
            .into_iter()
            .map(|line| format!("  {line}")),
    );

    lines.push(String::new());
    lines.push("Recommended keywords".to_string());
    lines.extend(
        analysis
            .recommended_keywords
            .iter()
            .enumerate()
            .map(|(i, kw)| format!("  {}. #{kw}", i + 1)),
    );

    for (heading, items) in [
        ("Common keywords", &analysis.common_keywords),
        ("Viewer needs", &analysis.user_needs),
        ("Suggested topics", &analysis.suggested_topics),
    ] {
        lines.push(String::new());
        lines.push(heading.to_string());
        lines.extend(bullet_list(items));
    }

    lines.join("\n")
}

pub fn outline_text(outline: &OutlineResult) -> String {
    let mut lines = vec![format!("Draft: {}", outline.title), String::new(), "Hook".to_string()];
    lines.extend(
        textwrap::wrap(&outline.hook, WRAP_WIDTH - 2)
            .into_iter()
            .map(|line| format!("  {line}")),
    );

    lines.push(String::new());
    lines.push("Chapters".to_string());
    for (i, chapter) in outline.chapters.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, chapter.title));
        lines.extend(
            textwrap::wrap(&chapter.detail, WRAP_WIDTH - 5)
                .into_iter()
                .map(|line| format!("     {line}")),
        );
    }

    lines.push(String::new());
    lines.push("Call to action".to_string());
    lines.extend(
        textwrap::wrap(&outline.cta, WRAP_WIDTH - 2)
            .into_iter()
            .map(|line| format!("  {line}")),
    );

    lines.join("\n")
}
