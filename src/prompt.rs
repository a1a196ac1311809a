//! Prompt construction: the article block and `$name` template substitution.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{DigestError, Result};
use crate::fetcher::Article;

/// Summaries are cut to this many characters in the prompt.
pub const SUMMARY_EXCERPT_CHARS: usize = 500;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\$(?:(?P<escaped>\$)|(?P<named>[_A-Za-z][_A-Za-z0-9]*)|\{(?P<braced>[_A-Za-z][_A-Za-z0-9]*)\}|(?P<invalid>))",
        )
        .expect("placeholder pattern is valid")
    })
}

/// Template text with `$name` / `${name}` placeholders; `$$` is a literal `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Replace every placeholder with its value from `values`.
    ///
    /// Fails on a placeholder with no value and on a `$` that starts no
    /// valid placeholder.
    pub fn substitute(&self, values: &HashMap<&str, &str>) -> Result<String> {
        let mut rendered = String::with_capacity(self.source.len());
        let mut last = 0;

        for caps in placeholder_pattern().captures_iter(&self.source) {
            let whole = caps.get(0).expect("group 0 always participates");
            rendered.push_str(&self.source[last..whole.start()]);
            last = whole.end();

            if caps.name("escaped").is_some() {
                rendered.push('$');
                continue;
            }

            if let Some(name) = caps.name("named").or_else(|| caps.name("braced")) {
                let value = values.get(name.as_str()).ok_or_else(|| {
                    DigestError::Template(format!("undefined placeholder '{}'", name.as_str()))
                })?;
                rendered.push_str(value);
                continue;
            }

            let (line, column) = line_and_column(&self.source, whole.start());
            return Err(DigestError::Template(format!(
                "invalid placeholder in template: line {}, col {}",
                line, column
            )));
        }

        rendered.push_str(&self.source[last..]);
        Ok(rendered)
    }
}

fn line_and_column(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.chars().rev().take_while(|&c| c != '\n').count() + 1;
    (line, column)
}

/// Compact, numbered representation of the articles for the LLM prompt.
pub fn build_articles_block(articles: &[Article]) -> String {
    articles
        .iter()
        .enumerate()
        .map(|(idx, a)| {
            let excerpt: String = a.summary.chars().take(SUMMARY_EXCERPT_CHARS).collect();
            format!(
                "{}. Title: {}\n   Source: {}\n   Published: {}\n   URL: {}\n   Summary/Excerpt: {}\n",
                idx + 1,
                a.title,
                a.source,
                a.published,
                a.link,
                excerpt
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_llm_prompt(
    articles: &[Article],
    template: &PromptTemplate,
    today: &str,
) -> Result<String> {
    let articles_block = build_articles_block(articles);
    let values = HashMap::from([("today", today), ("articles_block", articles_block.as_str())]);
    template.substitute(&values)
}
