//! `{{var}}` substitution and the variable set fed into it.

use std::collections::BTreeMap;

use postwave_catalog::{group, Product};

/// Variable set for one job. String values only — everything renders
/// into text anyway.
pub type VarMap = BTreeMap<String, String>;

/// Replace `{{name}}` placeholders with variable values.
///
/// Placeholder names are `[A-Za-z0-9_]+` with optional surrounding
/// whitespace inside the braces. A placeholder naming an absent
/// variable renders as the empty string. Anything that does not parse
/// as a placeholder (`{{`, stray braces, bad names) is left verbatim.
pub fn substitute(text: &str, vars: &VarMap) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        match parse_placeholder(after_open) {
            Some((name, consumed)) => {
                if let Some(value) = vars.get(name) {
                    out.push_str(value);
                }
                rest = &after_open[consumed..];
            }
            None => {
                // Not a well-formed placeholder — emit the braces verbatim.
                out.push_str("{{");
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse `  name  }}` at the start of `s`. Returns the name and how many
/// bytes were consumed (through the closing braces).
fn parse_placeholder(s: &str) -> Option<(&str, usize)> {
    let inner_len = s.find("}}")?;
    let inner = &s[..inner_len];
    let name = inner.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name, inner_len + 2))
}

fn set(vars: &mut VarMap, key: &str, value: impl Into<String>) {
    let value = value.into();
    if !value.is_empty() {
        vars.insert(key.to_string(), value);
    }
}

/// Build the substitution variable set for one job.
///
/// Token params are copied verbatim (case-sensitive), then normalized
/// aliases and product-derived variables are layered on top.
pub fn build_vars(
    directive_name: &str,
    params: &BTreeMap<String, String>,
    product: Option<&Product>,
    collection_title: Option<&str>,
) -> VarMap {
    let mut vars = VarMap::new();
    set(&mut vars, "function_name", directive_name);

    for (k, v) in params {
        set(&mut vars, k, v.clone());
    }

    // Normalized aliases for the parameter vocabulary.
    let param = |key: &str| params.get(key).cloned().unwrap_or_default();
    set(&mut vars, "vendor_name", param("vendorName"));
    set(&mut vars, "price_threshold", {
        let max = param("maxPrice");
        if max.is_empty() { param("minPrice") } else { max }
    });
    set(&mut vars, "n", {
        ["index", "limit", "topN", "sampleK", "n"]
            .iter()
            .map(|k| param(k))
            .find(|v| !v.is_empty())
            .unwrap_or_default()
    });

    if let Some(name) = collection_title.or(params.get("collectionName").map(String::as_str)) {
        set(&mut vars, "collection_name", name);
    }

    if let Some(p) = product {
        set(&mut vars, "product_id", p.id.clone());
        set(&mut vars, "product_title", p.title.clone());
        set(&mut vars, "description", p.description.clone());
        if let Some(price) = p.selling_price {
            set(&mut vars, "selling_price", format_price(price));
        }
        if let Some(price) = p.original_price {
            set(&mut vars, "original_price", format_price(price));
        }
        set(&mut vars, "vendor", p.vendor.clone());
        set(&mut vars, "product_url", p.url.clone());
        set(
            &mut vars,
            "product_cover_url",
            p.best_image().unwrap_or_default(),
        );
        for slot in 0..postwave_catalog::MAX_IMAGE_SLOTS {
            if let Some(url) = p.image_slot(slot) {
                set(&mut vars, &format!("image_url_{}", slot + 1), url);
            }
        }
        set(&mut vars, "keywords", p.keywords.clone());
        set(&mut vars, "message", p.message.clone());
        set(&mut vars, "sku", p.sku.clone());
        if let Some(dt) = p.created_at {
            set(&mut vars, "created_date", dt.format("%Y-%m-%d").to_string());
        }
        if let Some(dt) = p.updated_at {
            set(
                &mut vars,
                "last_updated_date",
                dt.format("%Y-%m-%d").to_string(),
            );
        }
        set(&mut vars, "sales_last_7_days", p.sales_7d.to_string());
        set(&mut vars, "sales_last_30_days", p.sales_30d.to_string());
        set(&mut vars, "variant_options", p.variant_options.clone());

        if let Some(code) = group::extract_sku_from_title(&p.title) {
            set(&mut vars, "sku_code", code);
        }
    }

    // A message param beats a product message field.
    if let Some(msg) = params.get("message") {
        set(&mut vars, "message", msg.clone());
    }

    vars
}

fn format_price(price: f64) -> String {
    if (price.fract()).abs() < f64::EPSILON {
        format!("{price:.0}")
    } else {
        format!("{price:.2}")
    }
}
