use crate::context::{find_idea, find_project, parse_category, Context};
use crate::output::print_json;
use anyhow::Context as _;
use clap::Subcommand;
use strategy_core::store::Direction;

/// Ideas are addressed by category slug (e.g. `strengths`, `threat-of-new-entry`)
/// and by 1-based position or idea id.
#[derive(Subcommand)]
pub enum IdeaSubcommand {
    /// Add an idea to a category (starts selected)
    Add {
        project: String,
        category: String,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Replace an idea's text
    Edit {
        project: String,
        category: String,
        idea: String,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Flip whether an idea is included in the report
    Toggle {
        project: String,
        category: String,
        idea: String,
    },
    /// Move an idea one place up or down
    Move {
        project: String,
        category: String,
        idea: String,
        /// up or down
        direction: Direction,
    },
    /// Remove an idea
    Remove {
        project: String,
        category: String,
        idea: String,
    },
}

pub fn run(ctx: &Context, subcmd: IdeaSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        IdeaSubcommand::Add {
            project,
            category,
            text,
        } => add(ctx, &project, &category, &text.join(" "), json),
        IdeaSubcommand::Edit {
            project,
            category,
            idea,
            text,
        } => edit(ctx, &project, &category, &idea, &text.join(" "), json),
        IdeaSubcommand::Toggle {
            project,
            category,
            idea,
        } => toggle(ctx, &project, &category, &idea, json),
        IdeaSubcommand::Move {
            project,
            category,
            idea,
            direction,
        } => move_idea(ctx, &project, &category, &idea, direction, json),
        IdeaSubcommand::Remove {
            project,
            category,
            idea,
        } => remove(ctx, &project, &category, &idea, json),
    }
}

fn add(ctx: &Context, key: &str, category: &str, text: &str, json: bool) -> anyhow::Result<()> {
    let category = parse_category(category)?;
    let (project, idea) = ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let project = find_project(&session, key)?;
        let idea = session
            .update_project(&project, |p| p.add_idea(category, text))?
            .with_context(|| format!("project '{key}' not found"))?;
        ctx.close_session(&session).await?;
        Ok((project, idea))
    })?;

    if json {
        print_json(&serde_json::json!({
            "project": project,
            "category": category,
            "id": idea,
            "text": text.trim(),
        }))?;
    } else {
        println!("Added to {category} [{idea}]: {}", text.trim());
    }
    Ok(())
}

fn edit(
    ctx: &Context,
    key: &str,
    category: &str,
    idea_key: &str,
    text: &str,
    json: bool,
) -> anyhow::Result<()> {
    let category = parse_category(category)?;
    let idea = ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let project = find_project(&session, key)?;
        let state = session
            .snapshot(&project)
            .with_context(|| format!("project '{key}' not found"))?;
        let idea = find_idea(&state, category, idea_key)?;
        session.update_project(&project, |p| p.edit_idea(category, &idea, text))?;
        ctx.close_session(&session).await?;
        Ok(idea)
    })?;

    if json {
        print_json(&serde_json::json!({ "id": idea, "text": text.trim() }))?;
    } else {
        println!("Updated [{idea}]: {}", text.trim());
    }
    Ok(())
}

fn toggle(ctx: &Context, key: &str, category: &str, idea_key: &str, json: bool) -> anyhow::Result<()> {
    let category = parse_category(category)?;
    let (idea, selected) = ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let project = find_project(&session, key)?;
        let state = session
            .snapshot(&project)
            .with_context(|| format!("project '{key}' not found"))?;
        let idea = find_idea(&state, category, idea_key)?;
        let selected = session
            .update_project(&project, |p| p.toggle_idea(category, &idea))?
            .unwrap_or_default();
        ctx.close_session(&session).await?;
        Ok((idea, selected))
    })?;

    if json {
        print_json(&serde_json::json!({ "id": idea, "selected": selected }))?;
    } else if selected {
        println!("Selected [{idea}]");
    } else {
        println!("Deselected [{idea}]");
    }
    Ok(())
}

fn move_idea(
    ctx: &Context,
    key: &str,
    category: &str,
    idea_key: &str,
    direction: Direction,
    json: bool,
) -> anyhow::Result<()> {
    let category = parse_category(category)?;
    let (idea, moved) = ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let project = find_project(&session, key)?;
        let state = session
            .snapshot(&project)
            .with_context(|| format!("project '{key}' not found"))?;
        let idea = find_idea(&state, category, idea_key)?;
        let moved = session
            .reorder_idea(&project, category, &idea, direction)?
            .unwrap_or_default();
        ctx.close_session(&session).await?;
        Ok((idea, moved))
    })?;

    if json {
        print_json(&serde_json::json!({
            "id": idea,
            "direction": direction,
            "moved": moved,
        }))?;
    } else if moved {
        println!("Moved [{idea}] {direction}");
    } else {
        let end = match direction {
            Direction::Up => "top",
            Direction::Down => "bottom",
        };
        println!("[{idea}] is already at the {end} of {category}");
    }
    Ok(())
}

fn remove(ctx: &Context, key: &str, category: &str, idea_key: &str, json: bool) -> anyhow::Result<()> {
    let category = parse_category(category)?;
    let removed = ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let project = find_project(&session, key)?;
        let state = session
            .snapshot(&project)
            .with_context(|| format!("project '{key}' not found"))?;
        let idea = find_idea(&state, category, idea_key)?;
        let removed = session
            .update_project(&project, |p| p.remove_idea(category, &idea))?
            .with_context(|| format!("project '{key}' not found"))?;
        ctx.close_session(&session).await?;
        Ok(removed)
    })?;

    if json {
        print_json(&serde_json::json!({ "id": removed.id, "removed": true }))?;
    } else {
        println!("Removed [{}]: {}", removed.id, removed.text);
    }
    Ok(())
}

/// `strategy justify`: the rationale printed under a category in the report.
pub fn justify(
    ctx: &Context,
    key: &str,
    category: &str,
    text: &str,
    json: bool,
) -> anyhow::Result<()> {
    let category = parse_category(category)?;
    let project = ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let project = find_project(&session, key)?;
        session.update_project(&project, |p| {
            p.set_justification(category, text.trim());
            Ok(())
        })?;
        ctx.close_session(&session).await?;
        Ok(project)
    })?;

    if json {
        print_json(&serde_json::json!({
            "project": project,
            "category": category,
            "justification": text.trim(),
        }))?;
    } else {
        println!("Updated {category} justification");
    }
    Ok(())
}
