//! HTML pages.
//!
//! Pages are assembled from plain strings. Every value that came from a user
//! or from the Treestatus API goes through [`html_escape`].

use treestatus_core::api::encode_path;
use treestatus_core::models::{LogEntry, ReasonCategory, StackEntry, Tree, TreeStatus};

use crate::flash::Flash;

/// Shared page chrome.
pub struct PageContext<'a> {
    pub title: &'a str,
    pub flashes: &'a [Flash],
}

/// Minimal HTML escaping for user-provided strings.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// CSS class for a tree status badge.
pub fn status_badge_class(status: TreeStatus) -> &'static str {
    match status {
        TreeStatus::Open => "badge badge-success",
        TreeStatus::Closed => "badge badge-danger",
        TreeStatus::ApprovalRequired => "badge badge-warning",
    }
}

/// Link to a tree's page, or the bare name when it cannot be addressed.
fn tree_link(name: &str) -> String {
    match encode_path(&["treestatus", name]) {
        Some(href) => format!("<a href=\"{}\">{}</a>", html_escape(&href), html_escape(name)),
        None => html_escape(name),
    }
}

fn badge(status: TreeStatus) -> String {
    format!(
        "<span class=\"{}\">{}</span>",
        status_badge_class(status),
        html_escape(status.as_str())
    )
}

fn layout(ctx: &PageContext<'_>, heading: &str, body: &str) -> String {
    let mut flashes = String::new();
    for flash in ctx.flashes {
        flashes.push_str(&format!(
            "<div class=\"flash flash-{}\">{}</div>\n",
            html_escape(&flash.category),
            html_escape(&flash.message)
        ));
    }

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head><meta charset=\"utf-8\"><title>{title} - {heading}</title></head>\n\
         <body>\n\
         <header><a href=\"/treestatus\">{title}</a></header>\n\
         <main>\n\
         <h1>{heading}</h1>\n\
         {flashes}{body}\
         </main>\n\
         </body>\n\
         </html>\n",
        title = html_escape(ctx.title),
        heading = html_escape(heading),
        flashes = flashes,
        body = body,
    )
}

fn select(name: &str, choices: &[(&str, &str)], selected: Option<&str>, blank: bool) -> String {
    let mut html = format!("<select name=\"{}\">", html_escape(name));
    if blank {
        html.push_str("<option value=\"\"></option>");
    }
    for (value, label) in choices {
        let marker = if selected == Some(*value) { " selected" } else { "" };
        html.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            html_escape(value),
            marker,
            html_escape(label)
        ));
    }
    html.push_str("</select>");
    html
}

fn category_select(selected: Option<ReasonCategory>) -> String {
    select(
        "reason_category",
        &ReasonCategory::to_choices(),
        selected.map(|c| c.as_str()),
        true,
    )
}

// ---------------------------------------------------------------------------
// Trees overview
// ---------------------------------------------------------------------------

/// The main dashboard: every tree, the bulk update form, the new tree form
/// and the recent changes stack.
pub fn trees_page(ctx: &PageContext<'_>, trees: &[Tree], stack: &[StackEntry]) -> String {
    let mut body = String::new();

    body.push_str("<section class=\"trees\">\n");
    if trees.is_empty() {
        body.push_str("<p class=\"empty\">No trees are being tracked.</p>\n");
    } else {
        body.push_str("<form method=\"post\" action=\"/treestatus\">\n<table>\n");
        body.push_str(
            "<thead><tr><th></th><th>Tree</th><th>Status</th><th>Reason</th>\
             <th>Tags</th><th>Message of the day</th></tr></thead>\n<tbody>\n",
        );
        for tree in trees {
            let name = html_escape(&tree.tree);
            body.push_str(&format!(
                "<tr>\
                 <td><input type=\"checkbox\" class=\"tree-select-checkbox\" name=\"trees\" value=\"{name}\"></td>\
                 <td>{link}</td>\
                 <td>{badge}</td>\
                 <td>{reason}</td>\
                 <td>{tags}</td>\
                 <td>{motd}</td>\
                 </tr>\n",
                name = name,
                link = tree_link(&tree.tree),
                badge = badge(tree.status),
                reason = html_escape(&tree.reason),
                tags = html_escape(&tree.tags.join(", ")),
                motd = html_escape(&tree.message_of_the_day),
            ));
        }
        body.push_str("</tbody>\n</table>\n");
        body.push_str(&format!(
            "<fieldset>\n\
             <label>Status {status}</label>\n\
             <label>Reason <input type=\"text\" name=\"reason\"></label>\n\
             <label>Reason Category {category}</label>\n\
             <label><input type=\"checkbox\" name=\"remember_this_change\" value=\"y\" checked> Remember</label>\n\
             <label>Message of the day <input type=\"text\" name=\"message_of_the_day\"></label>\n\
             <button type=\"submit\">Update trees</button>\n\
             </fieldset>\n</form>\n",
            status = select("status", &TreeStatus::to_choices(), None, false),
            category = category_select(None),
        ));
    }
    body.push_str("</section>\n");

    body.push_str(
        "<section class=\"new-tree\">\n<h2>New tree</h2>\n\
         <form method=\"post\" action=\"/treestatus/new_tree\">\n\
         <input type=\"text\" name=\"tree\" required>\n\
         <button type=\"submit\">Add tree</button>\n\
         </form>\n</section>\n",
    );

    body.push_str("<section class=\"recent-changes\">\n<h2>Recent changes</h2>\n");
    if stack.is_empty() {
        body.push_str("<p class=\"empty\">No recent changes.</p>\n");
    }
    for entry in stack {
        body.push_str(&recent_change_form(entry));
    }
    body.push_str("</section>\n");

    layout(ctx, "Trees", &body)
}

fn recent_change_form(entry: &StackEntry) -> String {
    let status = entry.status.map(badge).unwrap_or_default();
    format!(
        "<form class=\"recent-changes-form\" method=\"post\" action=\"/treestatus/stack/{id}\">\n\
         <input type=\"hidden\" name=\"id\" value=\"{id}\">\n\
         <p>{who} changed {trees} {status} at {when}</p>\n\
         <label>Reason <input type=\"text\" name=\"reason\" value=\"{reason}\"></label>\n\
         <label>Reason Category {category}</label>\n\
         <button type=\"submit\" name=\"restore\" value=\"Restore\">Restore</button>\n\
         <button type=\"submit\" name=\"update\" value=\"Update\">Update</button>\n\
         <button type=\"submit\" name=\"discard\" value=\"Discard\">Discard</button>\n\
         </form>\n",
        id = entry.id,
        who = html_escape(&entry.who),
        trees = html_escape(&entry.tree_names().join(", ")),
        status = status,
        when = html_escape(&entry.when),
        reason = html_escape(entry.reason.as_deref().unwrap_or_default()),
        category = category_select(entry.reason_category()),
    )
}

// ---------------------------------------------------------------------------
// Single tree
// ---------------------------------------------------------------------------

/// One tree with its status history. Each log entry can be re-categorised.
pub fn tree_page(ctx: &PageContext<'_>, tree: &Tree, logs: &[LogEntry]) -> String {
    let mut body = format!(
        "<section class=\"tree\">\n\
         <p>Status: {badge}</p>\n\
         <p>Reason: {reason}</p>\n\
         <p>Message of the day: {motd}</p>\n\
         </section>\n\
         <section class=\"logs\">\n<h2>History</h2>\n",
        badge = badge(tree.status),
        reason = html_escape(&tree.reason),
        motd = html_escape(&tree.message_of_the_day),
    );

    if logs.is_empty() {
        body.push_str("<p class=\"empty\">No history recorded.</p>\n");
    }
    for log in logs {
        body.push_str(&format!(
            "<form class=\"log-form\" method=\"post\" action=\"/treestatus/log/{id}\">\n\
             <p>{badge} by {who} at {when}</p>\n\
             <label>Reason <input type=\"text\" name=\"reason\" value=\"{reason}\"></label>\n\
             <label>Reason Category {category}</label>\n\
             <button type=\"submit\">Update</button>\n\
             </form>\n",
            id = log.id,
            badge = badge(log.status),
            who = html_escape(&log.who),
            when = html_escape(&log.when),
            reason = html_escape(&log.reason),
            category = category_select(log.reason_category()),
        ));
    }
    body.push_str("</section>\n");

    layout(ctx, &tree.tree, &body)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error page listing one or more messages.
pub fn error_page(heading: &str, messages: &[String]) -> String {
    let mut body = String::from("<ul class=\"errors\">\n");
    for message in messages {
        body.push_str(&format!("<li>{}</li>\n", html_escape(message)));
    }
    body.push_str("</ul>\n<p><a href=\"/treestatus\">Back to trees</a></p>\n");

    let ctx = PageContext {
        title: "Treestatus",
        flashes: &[],
    };
    layout(&ctx, heading, &body)
}
