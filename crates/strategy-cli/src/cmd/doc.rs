use crate::context::{find_project, Context};
use crate::output::{print_json, print_table, truncate};
use anyhow::Context as _;
use clap::Subcommand;
use std::path::{Path, PathBuf};
use strategy_core::model::{DocumentId, MAX_DOCUMENT_CHARS};

#[derive(Subcommand)]
pub enum DocSubcommand {
    /// Attach a text file as business context
    Add {
        project: String,
        file: PathBuf,
        /// Display name (default: the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// List a project's documents
    List { project: String },
    /// Rename a document
    Rename {
        project: String,
        document: String,
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// Remove a document
    Remove { project: String, document: String },
}

pub fn run(ctx: &Context, subcmd: DocSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        DocSubcommand::Add {
            project,
            file,
            name,
        } => add(ctx, &project, &file, name, json),
        DocSubcommand::List { project } => list(ctx, &project, json),
        DocSubcommand::Rename {
            project,
            document,
            name,
        } => rename(ctx, &project, &document, &name.join(" "), json),
        DocSubcommand::Remove { project, document } => remove(ctx, &project, &document, json),
    }
}

fn add(
    ctx: &Context,
    key: &str,
    file: &Path,
    name: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let name = name.unwrap_or_else(|| {
        file.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string())
    });
    let truncated = content.chars().count() > MAX_DOCUMENT_CHARS;

    let id = ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let project = find_project(&session, key)?;
        let id = session
            .update_project(&project, |p| Ok(p.add_document(name.clone(), &content)))?
            .with_context(|| format!("project '{key}' not found"))?;
        ctx.close_session(&session).await?;
        Ok(id)
    })?;

    if truncated {
        tracing::warn!(
            file = %file.display(),
            "document cut to the first {MAX_DOCUMENT_CHARS} characters"
        );
    }
    if json {
        print_json(&serde_json::json!({ "id": id, "name": name, "truncated": truncated }))?;
    } else {
        println!("Added document '{name}' [{id}]");
    }
    Ok(())
}

fn list(ctx: &Context, key: &str, json: bool) -> anyhow::Result<()> {
    let documents = ctx.block_on(async {
        let session = ctx.open_session().await?;
        let project = find_project(&session, key)?;
        let state = session
            .snapshot(&project)
            .with_context(|| format!("project '{key}' not found"))?;
        Ok(state.documents)
    })?;

    if json {
        return print_json(&documents);
    }
    if documents.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    let rows = documents
        .iter()
        .map(|d| {
            vec![
                d.id.to_string(),
                truncate(&d.name, 40),
                d.content.chars().count().to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "CHARS"], rows);
    Ok(())
}

fn rename(ctx: &Context, key: &str, document: &str, name: &str, json: bool) -> anyhow::Result<()> {
    let id = DocumentId::from(document.trim());
    ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let project = find_project(&session, key)?;
        session.update_project(&project, |p| p.rename_document(&id, name.trim()))?;
        ctx.close_session(&session).await
    })?;

    if json {
        print_json(&serde_json::json!({ "id": id, "name": name.trim() }))?;
    } else {
        println!("Renamed document [{id}] to '{}'", name.trim());
    }
    Ok(())
}

fn remove(ctx: &Context, key: &str, document: &str, json: bool) -> anyhow::Result<()> {
    let id = DocumentId::from(document.trim());
    let removed = ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let project = find_project(&session, key)?;
        let removed = session
            .update_project(&project, |p| p.remove_document(&id))?
            .with_context(|| format!("project '{key}' not found"))?;
        ctx.close_session(&session).await?;
        Ok(removed)
    })?;

    if json {
        print_json(&serde_json::json!({ "id": removed.id, "removed": true }))?;
    } else {
        println!("Removed document '{}' [{}]", removed.name, removed.id);
    }
    Ok(())
}
