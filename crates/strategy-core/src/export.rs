//! Standalone HTML report of a project's selected ideas.

use crate::catalog::Framework;
use crate::model::{FrameworkItem, ProjectState};
use chrono::NaiveDate;
use std::fmt::Write;

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:2rem auto;max-width:960px;color:#1f2937;line-height:1.5}
h1{margin-bottom:.25rem}
.meta{color:#6b7280;margin-top:0}
.description{white-space:pre-wrap;background:#f9fafb;padding:1rem;border-radius:8px}
h2{margin-top:2.5rem;border-bottom:2px solid #e5e7eb;padding-bottom:.25rem}
.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(280px,1fr));gap:1rem}
.item{border:1px solid #e5e7eb;border-top:4px solid var(--c);border-radius:8px;padding:1rem}
.item h3{margin:0 0 .5rem;color:var(--c)}
.item ul{padding-left:1.25rem;margin:.5rem 0}
.empty{color:#9ca3af;font-style:italic}
.justification{white-space:pre-wrap;border-left:3px solid var(--c);padding-left:.75rem;color:#374151}
";

/// Render the report for `project` as of `date`.
///
/// Only selected ideas appear, in list order. Every framework and category is
/// rendered, including empty ones.
pub fn render_html(project: &ProjectState, date: NaiveDate) -> String {
    let mut out = String::new();
    let title = escape(&project.name);
    // Writing into a String cannot fail.
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, "<html lang=\"en-GB\">\n<head>\n<meta charset=\"utf-8\">");
    let _ = writeln!(out, "<title>{title} - Strategy Report</title>");
    let _ = writeln!(out, "<style>\n{STYLE}</style>\n</head>\n<body>");
    let _ = writeln!(out, "<h1>{title}</h1>");
    let _ = writeln!(
        out,
        "<p class=\"meta\">Strategy report generated {}</p>",
        date.format("%-d %B %Y")
    );

    if !project.business_description.trim().is_empty() {
        let _ = writeln!(out, "<h2>Business Context</h2>");
        let _ = writeln!(
            out,
            "<div class=\"description\">{}</div>",
            escape(project.business_description.trim())
        );
    }

    for &fw in Framework::all() {
        let _ = writeln!(out, "<section>\n<h2>{}</h2>\n<div class=\"grid\">", escape(fw.title()));
        for item in project.frameworks.items(fw) {
            render_item(&mut out, item);
        }
        let _ = writeln!(out, "</div>\n</section>");
    }

    let _ = writeln!(out, "</body>\n</html>");
    out
}

fn render_item(out: &mut String, item: &FrameworkItem) {
    let _ = writeln!(
        out,
        "<div class=\"item\" style=\"--c:{}\">\n<h3>{}</h3>",
        escape(&item.color),
        escape(&item.title)
    );
    let selected: Vec<_> = item.selected_ideas().collect();
    if selected.is_empty() {
        let _ = writeln!(out, "<p class=\"empty\">No ideas selected</p>");
    } else {
        let _ = writeln!(out, "<ul>");
        for idea in selected {
            let _ = writeln!(out, "<li>{}</li>", escape(&idea.text));
        }
        let _ = writeln!(out, "</ul>");
    }
    if !item.justification.trim().is_empty() {
        let _ = writeln!(
            out,
            "<p class=\"justification\">{}</p>",
            escape(item.justification.trim())
        );
    }
    let _ = writeln!(out, "</div>");
}

/// `<slug>-strategy-<YYYY-MM-DD>.html`, the slug being the lowercased name
/// with runs of anything but ASCII letters and digits collapsed to `-`.
pub fn export_filename(name: &str, date: NaiveDate) -> String {
    let mut slug = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "project" } else { slug };
    format!("{slug}-strategy-{}.html", date.format("%Y-%m-%d"))
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use crate::store::ProjectStore;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn filename_slugifies_name() {
        assert_eq!(
            export_filename("Acme & Sons: UK Launch!", date()),
            "acme-sons-uk-launch-strategy-2026-03-14.html"
        );
        assert_eq!(export_filename("***", date()), "project-strategy-2026-03-14.html");
    }

    #[test]
    fn only_selected_ideas_are_rendered() {
        let mut store = ProjectStore::new();
        let id = store.create_project("Acme").unwrap();
        store
            .update_project(&id, |p| {
                p.add_idea(Category::Economic, "Rising interest rates")?;
                p.merge_suggestions(Category::Economic, &["Currency risk".to_string()]);
                p.set_justification(Category::Economic, "Costs are exposed to rates");
                Ok(())
            })
            .unwrap();

        let html = render_html(&store.snapshot(&id).unwrap(), date());
        assert!(html.contains("<li>Rising interest rates</li>"));
        assert!(!html.contains("Currency risk"));
        assert!(html.contains("Costs are exposed to rates"));
        assert!(html.contains("Porter&#39;s Five Forces"));
        assert!(html.contains("14 March 2026"));
    }

    #[test]
    fn user_text_is_escaped() {
        let mut store = ProjectStore::new();
        let id = store.create_project("<script>alert(1)</script>").unwrap();
        store
            .update_project(&id, |p| p.add_idea(Category::Legal, "GDPR & \"cookies\""))
            .unwrap();

        let html = render_html(&store.snapshot(&id).unwrap(), date());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("GDPR &amp; &quot;cookies&quot;"));
    }

    #[test]
    fn every_category_is_rendered() {
        let mut store = ProjectStore::new();
        let id = store.create_project("Empty").unwrap();
        let html = render_html(&store.snapshot(&id).unwrap(), date());
        for category in Category::all() {
            assert!(html.contains(&escape(category.title())), "{category} missing");
        }
    }
}
