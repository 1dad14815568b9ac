//! Helper function catalog available to every blueprint template
//!
//! The same helpers are bound for path templates and content templates.
//! Blueprint authors depend on these names, so additions bump
//! [`HELPER_CATALOG_VERSION`] and removals are breaking changes.

use handlebars::{
    handlebars_helper, Context, Handlebars, Helper, HelperDef, RenderContext, RenderError,
    RenderErrorReason, ScopedJson,
};
use serde_json::{Map, Value};

/// Version of the published helper catalog
pub const HELPER_CATALOG_VERSION: u32 = 1;

/// Helpers registered by this module, in addition to the Handlebars built-ins
/// (`if`, `unless`, `each`, `with`, `lookup`, `eq`, `ne`, `gt`, `gte`, `lt`,
/// `lte`, `and`, `or`, `not`, `len`)
///
/// The value being operated on always comes last, so `{{hasPrefix "v" tag}}`
/// reads like `{{trimPrefix "v" tag}}`.
///
/// | Helper | Arguments |
/// |---|---|
/// | `upper`, `lower`, `title`, `snake`, `kebab`, `camel`, `pascal`, `trim` | `s` |
/// | `trimPrefix`, `hasPrefix` | `prefix s` |
/// | `trimSuffix`, `hasSuffix` | `suffix s` |
/// | `replace` | `from to s` |
/// | `contains` | `needle haystack` (string, list or map) |
/// | `quote` | `value` |
/// | `repeat` | `count s` (output capped at [`MAX_REPEAT_LEN`] bytes) |
/// | `split` | `sep s` |
/// | `join` | `sep list` |
/// | `first`, `last`, `sortAlpha` | `list` |
/// | `keys` | `map` |
/// | `has` | `key container` (map key or list element) |
/// | `list` | `items...` |
/// | `default` | `fallback value` (value may be undefined) |
/// | `empty` | `value` (may be undefined) |
/// | `coalesce` | `values...` |
/// | `ternary` | `yes no condition` (condition may be undefined) |
pub const HELPER_CATALOG: &[&str] = &[
    // strings
    "upper",
    "lower",
    "title",
    "snake",
    "kebab",
    "camel",
    "pascal",
    "trim",
    "trimPrefix",
    "trimSuffix",
    "replace",
    "hasPrefix",
    "hasSuffix",
    "contains",
    "quote",
    "repeat",
    "split",
    // lists and maps
    "join",
    "first",
    "last",
    "keys",
    "has",
    "sortAlpha",
    "list",
    // defaults and conditionals
    "default",
    "empty",
    "coalesce",
    "ternary",
];

/// Longest string `repeat` will build
pub const MAX_REPEAT_LEN: usize = 1 << 20;

handlebars_helper!(upper: |s: str| s.to_uppercase());
handlebars_helper!(lower: |s: str| s.to_lowercase());
handlebars_helper!(title: |s: str| title_case(s));
handlebars_helper!(snake: |s: str| words(s).join("_"));
handlebars_helper!(kebab: |s: str| words(s).join("-"));
handlebars_helper!(camel: |s: str| camel_case(s));
handlebars_helper!(pascal: |s: str| pascal_case(s));
handlebars_helper!(trim: |s: str| s.trim().to_string());
handlebars_helper!(trim_prefix: |prefix: str, s: str| s.strip_prefix(prefix).unwrap_or(s).to_string());
handlebars_helper!(trim_suffix: |suffix: str, s: str| s.strip_suffix(suffix).unwrap_or(s).to_string());
handlebars_helper!(replace: |from: str, to: str, s: str| s.replace(from, to));
handlebars_helper!(has_prefix: |prefix: str, s: str| s.starts_with(prefix));
handlebars_helper!(has_suffix: |suffix: str, s: str| s.ends_with(suffix));
handlebars_helper!(contains: |needle: Json, haystack: Json| contains_value(haystack, needle));
handlebars_helper!(quote: |v: Json| format!("{:?}", display(v)));
handlebars_helper!(split: |sep: str, s: str| s.split(sep).map(str::to_string).collect::<Vec<_>>());

handlebars_helper!(join: |sep: str, items: Json| join_values(items, sep));
handlebars_helper!(first: |items: Json| items.as_array().and_then(|a| a.first()).cloned().unwrap_or(Value::Null));
handlebars_helper!(last: |items: Json| items.as_array().and_then(|a| a.last()).cloned().unwrap_or(Value::Null));
handlebars_helper!(keys: |map: Json| sorted_keys(map));
handlebars_helper!(has: |key: Json, container: Json| has_key(container, key));
handlebars_helper!(sort_alpha: |items: Json| sort_alpha_values(items));
handlebars_helper!(list: |*args| Value::Array(args.iter().map(|v| (*v).clone()).collect()));

// Declared parameters are required, and strict mode rejects undefined ones.
// Arguments that may be undefined are read through `*args`, where they are null.
handlebars_helper!(default: |fallback: Json, *args| match args.get(1) {
    Some(value) if !is_empty(value) => (*value).clone(),
    _ => fallback.clone(),
});
handlebars_helper!(empty: |*args| args.first().map_or(true, |v| is_empty(v)));
handlebars_helper!(coalesce: |*args| args.iter().find(|v| !is_empty(v)).map(|v| (*v).clone()).unwrap_or(Value::Null));
handlebars_helper!(ternary: |yes: Json, no: Json, *args| if args.get(2).map_or(true, |v| is_empty(v)) { no.clone() } else { yes.clone() });

/// `repeat count s`, refusing to build strings longer than [`MAX_REPEAT_LEN`]
pub struct RepeatHelper;

impl HelperDef for RepeatHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let count = h
            .param(0)
            .and_then(|p| p.value().as_u64())
            .ok_or(RenderErrorReason::InvalidParamType("repeat count must be a non-negative integer"))?;
        let s = h
            .param(1)
            .and_then(|p| p.value().as_str())
            .ok_or(RenderErrorReason::InvalidParamType("repeat expects a string to repeat"))?;

        let count = usize::try_from(count)
            .ok()
            .filter(|n| n.checked_mul(s.len()).is_some_and(|len| len <= MAX_REPEAT_LEN))
            .ok_or_else(|| {
                RenderErrorReason::Other(format!(
                    "repeat of {} x {} bytes exceeds {} bytes",
                    count,
                    s.len(),
                    MAX_REPEAT_LEN
                ))
            })?;
        Ok(ScopedJson::Derived(Value::String(s.repeat(count))))
    }
}

/// Bind the full catalog into a Handlebars registry
pub fn register(hbs: &mut Handlebars<'_>) {
    hbs.register_helper("upper", Box::new(upper));
    hbs.register_helper("lower", Box::new(lower));
    hbs.register_helper("title", Box::new(title));
    hbs.register_helper("snake", Box::new(snake));
    hbs.register_helper("kebab", Box::new(kebab));
    hbs.register_helper("camel", Box::new(camel));
    hbs.register_helper("pascal", Box::new(pascal));
    hbs.register_helper("trim", Box::new(trim));
    hbs.register_helper("trimPrefix", Box::new(trim_prefix));
    hbs.register_helper("trimSuffix", Box::new(trim_suffix));
    hbs.register_helper("replace", Box::new(replace));
    hbs.register_helper("hasPrefix", Box::new(has_prefix));
    hbs.register_helper("hasSuffix", Box::new(has_suffix));
    hbs.register_helper("contains", Box::new(contains));
    hbs.register_helper("quote", Box::new(quote));
    hbs.register_helper("repeat", Box::new(RepeatHelper));
    hbs.register_helper("split", Box::new(split));

    hbs.register_helper("join", Box::new(join));
    hbs.register_helper("first", Box::new(first));
    hbs.register_helper("last", Box::new(last));
    hbs.register_helper("keys", Box::new(keys));
    hbs.register_helper("has", Box::new(has));
    hbs.register_helper("sortAlpha", Box::new(sort_alpha));
    hbs.register_helper("list", Box::new(list));

    hbs.register_helper("default", Box::new(default));
    hbs.register_helper("empty", Box::new(empty));
    hbs.register_helper("coalesce", Box::new(coalesce));
    hbs.register_helper("ternary", Box::new(ternary));
}

/// Null, false, zero, and empty strings/arrays/objects count as empty
fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Render a value the way it would appear in template output
fn display(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn contains_value(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => s.contains(&display(needle)),
        Value::Array(items) => items.contains(needle),
        Value::Object(map) => map.contains_key(&display(needle)),
        _ => false,
    }
}

fn has_key(container: &Value, key: &Value) -> bool {
    match container {
        Value::Object(map) => map.contains_key(&display(key)),
        Value::Array(items) => items.contains(key),
        _ => false,
    }
}

fn join_values(items: &Value, sep: &str) -> String {
    match items {
        Value::Array(a) => a.iter().map(display).collect::<Vec<_>>().join(sep),
        other => display(other),
    }
}

fn sorted_keys(map: &Value) -> Vec<String> {
    // `keys` is taken by the helper struct
    let mut names: Vec<String> = map
        .as_object()
        .map(Map::keys)
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    names.sort();
    names
}

fn sort_alpha_values(items: &Value) -> Vec<String> {
    let mut out: Vec<String> = items
        .as_array()
        .map(|a| a.iter().map(display).collect())
        .unwrap_or_default();
    out.sort();
    out
}

/// Split an identifier into lowercase words at separators and case boundaries
///
/// `"HTTPServer_v2"` becomes `["http", "server", "v2"]`.
fn words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower) {
                out.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(head) => head.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn pascal_case(s: &str) -> String {
    words(s).iter().map(|w| capitalize(w)).collect()
}

fn camel_case(s: &str) -> String {
    let words = words(s);
    let mut out = String::new();
    for (i, w) in words.iter().enumerate() {
        if i == 0 {
            out.push_str(w);
        } else {
            out.push_str(&capitalize(w));
        }
    }
    out
}

/// Capitalize the first letter of each whitespace-separated word
fn title_case(s: &str) -> String {
    s.split(' ').map(capitalize).collect::<Vec<_>>().join(" ")
}
