use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use crate::error::{StudioError, StudioResult};
use crate::models::{AdvisorPersona, Script, SectionKind};
use crate::tokenizer::{self, Fragment};

pub const RULE_WIDTH: usize = 80;

/// File name for the combined plain-text download.
pub fn text_file_name(advisors: &[&AdvisorPersona], date: NaiveDate) -> String {
    let names: Vec<String> = advisors.iter().map(|advisor| advisor.file_stem()).collect();
    format!("Marketing_Content_{}_{}.txt", names.join("_and_"), date.format("%Y-%m-%d"))
}

pub fn html_file_name(advisor: &AdvisorPersona, date: NaiveDate) -> String {
    format!("{}_Marketing_Content_{}.html", advisor.file_stem(), date.format("%Y-%m-%d"))
}

fn script_of(advisor: &AdvisorPersona) -> StudioResult<&Script> {
    advisor
        .script
        .as_deref()
        .ok_or_else(|| StudioError::NoScript(advisor.name.clone()))
}

/// One advisor's full script as plain text, hyperlinks reduced to labels.
pub fn advisor_text(advisor: &AdvisorPersona, date: NaiveDate) -> StudioResult<String> {
    let script = script_of(advisor)?;
    let focus = advisor.product_focus.as_deref().unwrap_or("Marketing");

    let mut out = format!("=== {} - {} Marketing Content ===\n", advisor.name, focus);
    for section in &script.sections {
        out.push('\n');
        match section.kind {
            SectionKind::Hero => {
                out.push_str(&section.title.to_uppercase());
                out.push('\n');
                for item in &section.content {
                    out.push('\n');
                    out.push_str(&tokenizer::strip_links(item));
                    out.push('\n');
                }
            }
            SectionKind::Body => {
                out.push_str(&section.title);
                out.push_str(":\n");
                for item in &section.content {
                    out.push_str("• ");
                    out.push_str(&tokenizer::strip_links(item));
                    out.push('\n');
                }
            }
            SectionKind::CallToAction => {
                out.push_str(&section.title);
                for item in &section.content {
                    out.push(' ');
                    out.push_str(&tokenizer::strip_links(item));
                }
                out.push('\n');
            }
        }
    }
    out.push_str(&format!("\nGenerated on: {}\n", date.format("%Y-%m-%d")));
    Ok(out)
}

/// Every advisor's text joined by an 80-character rule.
pub fn export_text(advisors: &[&AdvisorPersona], date: NaiveDate) -> StudioResult<String> {
    let blocks = advisors
        .iter()
        .map(|advisor| advisor_text(advisor, date))
        .collect::<StudioResult<Vec<String>>>()?;
    let separator = format!("\n\n{}\n\n", "=".repeat(RULE_WIDTH));
    Ok(blocks.join(&separator))
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

// Escapes plain text but keeps hyperlink markup intact
fn html_fragment(text: &str) -> String {
    tokenizer::fragments(text)
        .into_iter()
        .map(|fragment| match fragment {
            Fragment::Text(plain) => escape_html(plain),
            Fragment::Link(link) => link.to_string(),
        })
        .collect()
}

const HTML_STYLE: &str = "body { font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #374151; background: #f9fafb; padding: 20px; }
        .container { max-width: 900px; margin: 0 auto; background: white; box-shadow: 0 10px 25px rgba(0,0,0,0.1); }
        .header { background: #1e40af; color: white; padding: 40px; }
        .firm-badge { display: inline-block; background: rgba(255,255,255,0.2); padding: 4px 12px; border-radius: 9999px; }
        .content { padding: 40px; }
        .section { margin-bottom: 32px; }
        .footer { background: #f3f4f6; padding: 20px; text-align: center; color: #6b7280; border-top: 1px solid #e5e7eb; }";

/// Standalone HTML page with one advisor's full script.
pub fn export_html(advisor: &AdvisorPersona, date: NaiveDate) -> StudioResult<String> {
    let script = script_of(advisor)?;

    let mut content = String::new();
    for section in &script.sections {
        content.push_str(&format!(
            "            <div class=\"section {}\" id=\"{}\">\n",
            section_class(section.kind),
            escape_html(&section.id)
        ));
        let heading = if section.kind == SectionKind::Hero { "h2" } else { "h3" };
        content.push_str(&format!(
            "                <{}>{}</{}>\n",
            heading,
            escape_html(&section.title),
            heading
        ));
        match section.kind {
            SectionKind::Body => {
                content.push_str("                <ul>\n");
                for item in &section.content {
                    content.push_str(&format!("                    <li>{}</li>\n", html_fragment(item)));
                }
                content.push_str("                </ul>\n");
            }
            SectionKind::Hero | SectionKind::CallToAction => {
                for item in &section.content {
                    content.push_str(&format!("                <p>{}</p>\n", html_fragment(item)));
                }
            }
        }
        content.push_str("            </div>\n");
    }

    let firm = advisor.firm().unwrap_or_default();
    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{name} - Marketing Content</title>
    <style>
        {style}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>Marketing Content</h1>
            <p class="subtitle">Professional Investment Advisory Materials</p>
            <div class="advisor-info">
                <h2>{name}</h2>
                <div class="firm-badge">{firm}</div>
            </div>
        </div>
        <div class="content">
{content}        </div>
        <div class="footer">
            <p>Generated on {date} | Professional Marketing Materials</p>
            <p>This document contains proprietary content for licensed financial advisors</p>
        </div>
    </div>
</body>
</html>
"#,
        name = escape_html(&advisor.name),
        style = HTML_STYLE,
        firm = escape_html(firm),
        content = content,
        date = date.format("%Y-%m-%d"),
    ))
}

fn section_class(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Hero => "hero",
        SectionKind::Body => "body",
        SectionKind::CallToAction => "cta",
    }
}

/// Writes an export into `dir`, creating it if needed.
pub fn write_export(dir: &Path, file_name: &str, body: &str) -> StudioResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    fs::write(&path, body)?;
    info!("Wrote export to {}", path.display());
    Ok(path)
}
