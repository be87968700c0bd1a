use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Left-aligned columns separated by two spaces. Widths count characters,
/// not bytes, so project names outside ASCII line up.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    print_row(&widths, headers);
    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    print_row(&widths, &sep.iter().map(String::as_str).collect::<Vec<_>>());
    for row in &rows {
        print_row(&widths, &row.iter().map(String::as_str).collect::<Vec<_>>());
    }
}

fn print_row(widths: &[usize], cells: &[&str]) {
    let padded: Vec<String> = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let w = widths.get(i).copied().unwrap_or(0);
            format!("{cell:<w$}")
        })
        .collect();
    println!("{}", padded.join("  ").trim_end());
}

/// `s` cut to `max` characters, with an ellipsis when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
