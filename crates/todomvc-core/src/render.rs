use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::filter::{Visibility, pluralize};
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color()?,
        })
    }

    #[tracing::instrument(skip(self, all, visible))]
    pub fn print_todos(
        &mut self,
        all: &[Task],
        visible: &[&Task],
        visibility: Visibility,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let color = self.color && io::stdout().is_terminal();
        render_todos(&mut out, all, visible, visibility, color)
    }
}

fn render_todos<W: Write>(
    mut writer: W,
    all: &[Task],
    visible: &[&Task],
    visibility: Visibility,
    color: bool,
) -> anyhow::Result<()> {
    if all.is_empty() {
        writeln!(writer, "Nothing to do.")?;
        return Ok(());
    }

    if visible.is_empty() {
        writeln!(writer, "No {visibility} todos.")?;
    } else {
        write_table(&mut writer, todo_headers(), todo_rows(all, visible, color))?;
    }

    let left = crate::filter::remaining(all);
    writeln!(writer)?;
    writeln!(
        writer,
        "{left} {} left (showing {visibility})",
        pluralize(left)
    )?;

    Ok(())
}

fn todo_headers() -> Vec<String> {
    vec!["ID".to_string(), "Done".to_string(), "Title".to_string()]
}

// IDs are positions in the full list so they stay valid across filters.
fn todo_rows(all: &[Task], visible: &[&Task], color: bool) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(visible.len());

    for task in visible {
        let id = all
            .iter()
            .position(|candidate| candidate.uuid == task.uuid)
            .map(|idx| (idx + 1).to_string())
            .unwrap_or_else(|| "-".to_string());
        let id = paint(&id, "33", color);
        let (mark, title) = if task.completed {
            ("[x]".to_string(), paint(&task.title, "90", color))
        } else {
            ("[ ]".to_string(), task.title.clone())
        };
        rows.push(vec![id, mark, title]);
    }

    rows
}

fn paint(text: &str, code: &str, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
