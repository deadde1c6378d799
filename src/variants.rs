//! Variant Resolver: enumerates the forms ("versions") a page encodes and
//! scopes markup to one form for extraction.

use crate::config::DEFAULT_MAX_VARIANTS;
use crate::error::ConfigError;
use crate::markup::{self, strip_markup};
use crate::models::VariantKey;
use std::borrow::Cow;

#[derive(Debug, Clone)]
pub struct VariantResolver {
    template: String,
    prefix: String,
    max_variants: usize,
}

impl VariantResolver {
    pub fn new(template: &str, prefix: &str) -> Self {
        Self {
            template: template.to_string(),
            prefix: prefix.to_string(),
            max_variants: DEFAULT_MAX_VARIANTS,
        }
    }

    /// Upper bound on probed `{prefix}N` parameters.
    pub fn with_max_variants(mut self, max_variants: usize) -> Result<Self, ConfigError> {
        if max_variants == 0 {
            return Err(ConfigError::ZeroVariantBound);
        }
        self.max_variants = max_variants;
        Ok(self)
    }

    pub fn max_variants(&self) -> usize {
        self.max_variants
    }

    /// Keys of `{prefix}1..={bound}` present on the first matching template,
    /// in index order. A page without any yields the single base key.
    pub fn resolve(&self, markup: &str) -> Vec<VariantKey> {
        let Some(template) = markup::find_template(markup, &self.template) else {
            return vec![VariantKey::base()];
        };

        let keys: Vec<VariantKey> = (1..=self.max_variants)
            .filter_map(|index| {
                let value = template.param(&format!("{}{}", self.prefix, index))?;
                let label = match strip_markup(value) {
                    label if label.is_empty() => index.to_string(),
                    label => label,
                };
                Some(VariantKey { index, label })
            })
            .collect();

        if keys.is_empty() {
            vec![VariantKey::base()]
        } else {
            keys
        }
    }

    /// True when the template carries a form beyond the bound. Those forms are
    /// dropped by `resolve`.
    pub fn is_truncated(&self, markup: &str) -> bool {
        let Some(template) = markup::find_template(markup, &self.template) else {
            return false;
        };
        let overflow = format!("{}{}", self.prefix, self.max_variants + 1);
        template.param(&overflow).is_some()
    }
}

/// Markup as seen by one variant: every template parameter `<stem><N>` for
/// the variant's index `N` is restated as `<stem>` ahead of the original
/// markup, so first-match extraction picks the variant's own value. The base
/// form sees the markup unchanged.
pub fn scope_markup<'a>(markup: &'a str, key: &VariantKey) -> Cow<'a, str> {
    if key.index == 0 {
        return Cow::Borrowed(markup);
    }

    let suffix = key.index.to_string();
    let mut overrides = String::new();
    for template in markup::all_templates(markup) {
        for (name, value) in &template.params {
            let Some(stem) = name.strip_suffix(suffix.as_str()) else {
                continue;
            };
            if stem.is_empty() || stem.ends_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            overrides.push('|');
            overrides.push_str(stem);
            overrides.push_str(" = ");
            overrides.push_str(&value.replace('\n', " "));
            overrides.push('\n');
        }
    }

    if overrides.is_empty() {
        Cow::Borrowed(markup)
    } else {
        overrides.push_str(markup);
        Cow::Owned(overrides)
    }
}
