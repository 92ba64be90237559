use relaunch_core::orchestrator::RunReport;
use serde::Serialize;
use std::path::Path;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.len());
            }
        }
    }

    let render = |cells: Vec<String>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", render(headers.iter().map(|h| h.to_string()).collect()));
    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));
    for row in rows {
        println!("{}", render(row));
    }
}

pub fn print_report(report: &RunReport) {
    if !report.operations.is_empty() {
        let rows = report
            .operations
            .iter()
            .enumerate()
            .map(|(i, op)| vec![(i + 1).to_string(), op.to_string()])
            .collect();
        print_table(&["#", "OPERATION"], rows);
        println!();
    }
    println!("{}", report.message());
}

/// Tell the user their shell is still looking at the previous release.
pub fn stale_symlink_warning(link: &Path, pwd: &Path) -> String {
    format!(
        "Your shell entered its current directory through a symlink:\n  {}\n\
         which has now changed. Your shell will not see this change until you run:\n  cd {}\n\
         to traverse the symlink again.",
        link.display(),
        pwd.display()
    )
}
