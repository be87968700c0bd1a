use crate::context::{find_project, Context};
use crate::output::{print_json, print_table, truncate};
use anyhow::Context as _;
use clap::Subcommand;
use std::path::PathBuf;
use strategy_core::catalog::Framework;
use strategy_core::model::{Origin, ProjectState};

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// List projects, most recently updated first
    List,
    /// Create a project with every framework empty
    Create {
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// Show a project's description, documents and ideas
    Show { project: String },
    /// Rename a project
    Rename {
        project: String,
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// Set the business description used as context for suggestions
    Describe {
        project: String,
        text: Vec<String>,
        /// Read the description from a file instead
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },
    /// Delete a project locally and from the server
    Delete { project: String },
}

pub fn run(ctx: &Context, subcmd: ProjectSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ProjectSubcommand::List => list(ctx, json),
        ProjectSubcommand::Create { name } => create(ctx, &name.join(" "), json),
        ProjectSubcommand::Show { project } => show(ctx, &project, json),
        ProjectSubcommand::Rename { project, name } => rename(ctx, &project, &name.join(" "), json),
        ProjectSubcommand::Describe {
            project,
            text,
            file,
        } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("cannot read {}", path.display()))?,
                None => text.join(" "),
            };
            describe(ctx, &project, &text, json)
        }
        ProjectSubcommand::Delete { project } => delete(ctx, &project, json),
    }
}

fn list(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let summaries = ctx.block_on(async {
        let session = ctx.open_session().await?;
        Ok(session.store().by_recency())
    })?;

    if json {
        return print_json(&summaries);
    }
    if summaries.is_empty() {
        println!("No projects. Create one with `strategy project create <name>`.");
        return Ok(());
    }
    let rows = summaries
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                truncate(&s.name, 40),
                format!("{}/{}", s.selected_count, s.idea_count),
                s.document_count.to_string(),
                s.last_updated.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "SELECTED", "DOCS", "UPDATED"], rows);
    Ok(())
}

fn create(ctx: &Context, name: &str, json: bool) -> anyhow::Result<()> {
    let id = ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let id = session.create_project(name)?;
        ctx.close_session(&session).await?;
        Ok(id)
    })?;

    if json {
        print_json(&serde_json::json!({ "id": id, "name": name.trim() }))?;
    } else {
        println!("Created project '{}' [{id}]", name.trim());
    }
    Ok(())
}

fn show(ctx: &Context, key: &str, json: bool) -> anyhow::Result<()> {
    let project = ctx.block_on(async {
        let session = ctx.open_session().await?;
        let id = find_project(&session, key)?;
        session
            .snapshot(&id)
            .with_context(|| format!("project '{key}' not found"))
    })?;

    if json {
        return print_json(&project);
    }
    print_project(&project);
    Ok(())
}

fn print_project(project: &ProjectState) {
    println!("{} [{}]", project.name, project.id);
    println!(
        "Updated: {}",
        project.last_updated.format("%Y-%m-%d %H:%M UTC")
    );
    if !project.business_description.is_empty() {
        println!();
        println!("{}", project.business_description);
    }
    if !project.documents.is_empty() {
        println!();
        println!("Documents:");
        for doc in &project.documents {
            println!(
                "  {}  {} ({} chars)",
                doc.id,
                doc.name,
                doc.content.chars().count()
            );
        }
    }

    for &framework in Framework::all() {
        println!();
        println!("== {} ==", framework.title());
        for item in project.frameworks.items(framework) {
            println!("  {} ({})", item.title, item.id);
            for (i, idea) in item.ideas.iter().enumerate() {
                let mark = if idea.selected { "x" } else { " " };
                let ai = match idea.origin {
                    Origin::Ai => "  [ai]",
                    Origin::Human => "",
                };
                println!("    {:>2}. [{mark}] {}{ai}", i + 1, idea.text);
            }
            if !item.justification.is_empty() {
                println!("    Why: {}", item.justification);
            }
        }
    }
}

fn rename(ctx: &Context, key: &str, name: &str, json: bool) -> anyhow::Result<()> {
    let id = ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let id = find_project(&session, key)?;
        session.update_project(&id, |p| p.rename(name))?;
        ctx.close_session(&session).await?;
        Ok(id)
    })?;

    if json {
        print_json(&serde_json::json!({ "id": id, "name": name.trim() }))?;
    } else {
        println!("Renamed [{id}] to '{}'", name.trim());
    }
    Ok(())
}

fn describe(ctx: &Context, key: &str, text: &str, json: bool) -> anyhow::Result<()> {
    let id = ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let id = find_project(&session, key)?;
        session.update_project(&id, |p| {
            p.set_business_description(text);
            Ok(())
        })?;
        ctx.close_session(&session).await?;
        Ok(id)
    })?;

    if json {
        print_json(&serde_json::json!({ "id": id, "businessDescription": text }))?;
    } else {
        println!("Updated description of [{id}]");
    }
    Ok(())
}

fn delete(ctx: &Context, key: &str, json: bool) -> anyhow::Result<()> {
    let (id, name) = ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let id = find_project(&session, key)?;
        let name = session
            .snapshot(&id)
            .map(|p| p.name)
            .unwrap_or_default();
        session
            .delete_project(&id)
            .await
            .context("removed locally but the stored copy could not be deleted")?;
        ctx.close_session(&session).await?;
        Ok((id, name))
    })?;

    if json {
        print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
    } else {
        println!("Deleted project '{name}' [{id}]");
    }
    Ok(())
}
