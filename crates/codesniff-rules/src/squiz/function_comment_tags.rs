//! Sniff for the tags of a function's doc comment.
//!
//! Works from the tag list the doc-comment sub-lexer attaches to the
//! comment's opening token, so it never re-parses comment text.
//!
//! # Configuration
//!
//! - `requiredTags`: tags every function comment must carry (default: none)
//! - `tagOrder`: relative order of the listed tags (default: `@param`,
//!   `@return`, `@throws`). Tags not in the list may appear anywhere.

use codesniff_core::{PropertyValue, Sniff, SniffContext, SniffError, TokenKind, TokenizerFamily};

/// Sniff code for function-comment-tags.
pub const CODE: &str = "Squiz.Commenting.FunctionCommentTags";

/// Checks required tags and tag order in function comments.
#[derive(Debug, Clone)]
pub struct FunctionCommentTags {
    required_tags: Vec<String>,
    tag_order: Vec<String>,
}

impl Default for FunctionCommentTags {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionCommentTags {
    /// Creates the sniff with the default order and no required tags.
    #[must_use]
    pub fn new() -> Self {
        Self {
            required_tags: Vec::new(),
            tag_order: vec!["@param".into(), "@return".into(), "@throws".into()],
        }
    }

    /// Sets the required tags.
    #[must_use]
    pub fn required_tags(mut self, tags: &[&str]) -> Self {
        self.required_tags = tags.iter().map(|t| normalize(t)).collect();
        self
    }
}

fn normalize(tag: &str) -> String {
    if tag.starts_with('@') {
        tag.to_string()
    } else {
        format!("@{tag}")
    }
}

/// Returns true if the comment opened at `opener` documents a function.
fn documents_function(ctx: &SniffContext<'_>, opener: usize) -> bool {
    let tokens = ctx.tokens();
    let Some(closer) = tokens[opener].comment_closer else {
        return false;
    };
    ctx.file()
        .next_significant(closer + 1)
        .is_some_and(|next| tokens[next].kind == TokenKind::Function)
}

impl Sniff for FunctionCommentTags {
    fn register(&self) -> Vec<TokenKind> {
        vec![TokenKind::DocCommentOpen]
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Php, TokenizerFamily::Js]
    }

    fn description(&self) -> &'static str {
        "Function comments must carry the required tags in the standard order"
    }

    fn set_property(&mut self, name: &str, value: &PropertyValue) -> Result<(), SniffError> {
        let tags = value.as_list().iter().map(|t| normalize(t)).collect();
        match name {
            "requiredTags" => self.required_tags = tags,
            "tagOrder" => self.tag_order = tags,
            _ => {
                return Err(SniffError::UnknownProperty {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
        if !documents_function(ctx, pos) {
            return Ok(());
        }
        let tokens = ctx.tokens();
        let tags = &tokens[pos].comment_tags;

        for required in &self.required_tags {
            let present = tags.iter().any(|&t| tokens[t].text == *required);
            if !present {
                ctx.add_error(
                    pos,
                    "Missing %s tag in function comment",
                    "MissingTag",
                    &[required.as_str()],
                );
            }
        }

        // Highest order index seen so far, with the tag that set it.
        let mut furthest: Option<(usize, &str)> = None;
        for &tag in tags {
            let name = tokens[tag].text.as_str();
            let Some(rank) = self.tag_order.iter().position(|t| t == name) else {
                continue;
            };
            match furthest {
                Some((seen, before)) if rank < seen => {
                    ctx.add_error(tag, "Tag %s must come before %s", "TagOrder", &[name, before]);
                }
                Some((seen, _)) if rank == seen => {}
                _ => furthest = Some((rank, name)),
            }
        }
        Ok(())
    }
}
