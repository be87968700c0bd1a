use crate::context::{find_project, parse_category, Context};
use crate::output::print_json;
use anyhow::Context as _;

/// Ask the suggestion service for ideas for one category and add them to the
/// project unselected.
pub fn run(
    ctx: &Context,
    key: &str,
    category: &str,
    focus: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let category = parse_category(category)?;
    if ctx.server.is_none() {
        anyhow::bail!(
            "suggestions need a server; pass --server or run `strategy config set server-url <url>`"
        );
    }

    let ideas = ctx.block_on(async {
        let mut session = ctx.open_session().await?;
        let project = find_project(&session, key)?;
        let added = session
            .request_suggestions(&project, category, focus)
            .await
            .context("suggestion request failed")?;
        let state = session
            .snapshot(&project)
            .with_context(|| format!("project '{key}' not found"))?;
        ctx.close_session(&session).await?;

        let ideas: Vec<_> = state
            .frameworks
            .item(category)
            .map(|item| {
                item.ideas
                    .iter()
                    .filter(|i| added.contains(&i.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(ideas)
    })?;

    if json {
        return print_json(&serde_json::json!({ "category": category, "ideas": ideas }));
    }
    if ideas.is_empty() {
        println!("No suggestions returned for {category}.");
        return Ok(());
    }
    println!("Added {} suggestion(s) to {category}:", ideas.len());
    for idea in &ideas {
        println!("  [{}] {}", idea.id, idea.text);
    }
    println!("Select the ones to keep with `strategy idea toggle`.");
    Ok(())
}
