use crate::output::{print_json, print_table};
use strategy_core::catalog::Framework;

pub fn run(json: bool) -> anyhow::Result<()> {
    if json {
        let frameworks: Vec<_> = Framework::all()
            .iter()
            .map(|f| {
                serde_json::json!({
                    "key": f.as_str(),
                    "title": f.title(),
                    "categories": f
                        .categories()
                        .iter()
                        .map(|c| serde_json::json!({ "id": c.as_str(), "title": c.title() }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        return print_json(&frameworks);
    }

    let rows = Framework::all()
        .iter()
        .flat_map(|f| {
            f.categories()
                .iter()
                .map(move |c| vec![f.title().to_string(), c.as_str().to_string(), c.title().to_string()])
        })
        .collect();
    print_table(&["FRAMEWORK", "CATEGORY", "TITLE"], rows);
    Ok(())
}
