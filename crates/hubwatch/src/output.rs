//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use hubwatch_core::SecurityState;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Security state, red when alarming, yellow when armed.
pub fn security_label(state: SecurityState, color: bool) -> String {
    let text = state.to_string();
    if !color {
        return text;
    }
    match state {
        SecurityState::Triggered => text.red().bold().to_string(),
        SecurityState::Armed | SecurityState::PartiallyArmed => text.yellow().to_string(),
        SecurityState::NightMode => text.blue().to_string(),
        SecurityState::Disarmed => text.green().to_string(),
    }
}

/// `yes`/`no` with optional coloring; `-` for unknown.
pub fn flag_label(value: Option<bool>, color: bool) -> String {
    match (value, color) {
        (None, _) => "-".into(),
        (Some(true), true) => "yes".green().to_string(),
        (Some(false), true) => "no".dimmed().to_string(),
        (Some(true), false) => "yes".into(),
        (Some(false), false) => "no".into(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views are key/value
/// listings rather than rows.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => id_fn(data),
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Aligned `key: value` lines for detail views.
pub fn detail_lines(pairs: &[(&str, String)]) -> String {
    let width = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    pairs
        .iter()
        .map(|(k, v)| format!("{k:<width$}  {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, Tabled)]
    struct Row {
        id: String,
        name: String,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                id: "S1".into(),
                name: "Home".into(),
            },
            Row {
                id: "S2".into(),
                name: "Cabin".into(),
            },
        ]
    }

    #[test]
    fn plain_emits_one_id_per_line() {
        let out = render_list(
            &OutputFormat::Plain,
            &rows(),
            |r| Row {
                id: r.id.clone(),
                name: r.name.clone(),
            },
            |r| r.id.clone(),
        );
        assert_eq!(out.ok().as_deref(), Some("S1\nS2"));
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_list(
            &OutputFormat::JsonCompact,
            &rows(),
            |r| Row {
                id: r.id.clone(),
                name: r.name.clone(),
            },
            |r| r.id.clone(),
        )
        .unwrap_or_default();
        assert!(!out.contains('\n'));
        assert!(out.starts_with(r#"[{"id":"S1""#));
    }

    #[test]
    fn uncolored_labels_are_plain_text() {
        assert_eq!(security_label(SecurityState::NightMode, false), "night_mode");
        assert_eq!(flag_label(None, false), "-");
        assert_eq!(flag_label(Some(true), false), "yes");
    }

    #[test]
    fn detail_lines_align_keys() {
        let out = detail_lines(&[("ID", "D1".into()), ("Online", "yes".into())]);
        assert_eq!(out, "ID      D1\nOnline  yes");
    }
}
