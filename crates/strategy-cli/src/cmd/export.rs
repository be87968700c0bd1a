use crate::context::{find_project, Context};
use crate::output::print_json;
use anyhow::Context as _;
use chrono::Local;
use std::path::PathBuf;
use strategy_core::export::{export_filename, render_html};
use strategy_core::io::atomic_write;

pub fn run(ctx: &Context, key: &str, output: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let project = ctx.block_on(async {
        let session = ctx.open_session().await?;
        let id = find_project(&session, key)?;
        session
            .snapshot(&id)
            .with_context(|| format!("project '{key}' not found"))
    })?;

    let today = Local::now().date_naive();
    let html = render_html(&project, today);
    let path = output.unwrap_or_else(|| PathBuf::from(export_filename(&project.name, today)));
    atomic_write(&path, html.as_bytes())
        .with_context(|| format!("cannot write {}", path.display()))?;

    if json {
        print_json(&serde_json::json!({
            "project": project.id,
            "path": path.display().to_string(),
            "bytes": html.len(),
        }))?;
    } else {
        println!("Exported '{}' to {}", project.name, path.display());
    }
    Ok(())
}
