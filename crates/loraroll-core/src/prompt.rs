//! Prompt injection
//!
//! Stateless, purely textual mutation of comma-separated prompt token
//! lists. The freshly weighted reference token goes first, surviving
//! LoRA tokens follow, then the activation text, then the original plain
//! tokens in order.

use crate::models::LoraEntry;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// `<lora:name:weight>` — weight part optional
static LORA_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<lora:([^:>]+)(?::([^>]*))?>$").expect("valid regex"));

/// Prefix that marks a token as a LoRA reference even when malformed
const LORA_TOKEN_PREFIX: &str = "<lora:";

/// Format a weighted reference token: `<lora:name:0.8>`
pub fn format_reference(name: &str, weight: f64) -> String {
    format!("<lora:{}:{}>", name, weight)
}

/// Extract the referenced LoRA name from a token, if well-formed
pub fn parse_reference(token: &str) -> Option<&str> {
    LORA_TOKEN_RE
        .captures(token)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Resolve the injection weight.
///
/// Zero means "unset" at every level, matching the sidecar convention:
/// override, then the sidecar's preferred weight, then the default
/// multiplier.
pub fn resolve_weight(override_weight: f64, preferred: Option<f64>, default_multiplier: f64) -> f64 {
    if override_weight != 0.0 {
        return override_weight;
    }
    match preferred {
        Some(w) if w != 0.0 => w,
        _ => default_multiplier,
    }
}

/// One mutated prompt pair plus what was injected into it
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionOutcome {
    pub prompt: String,
    pub negative_prompt: String,
    pub lora_name: String,
    pub weight: f64,
}

/// Inject a weighted reference and activation text into a positive prompt.
///
/// Existing LoRA tokens are pulled to the front and de-duplicated by
/// referenced name; a stale reference to the selected LoRA is dropped in
/// favor of the fresh token. Plain tokens keep their original order.
pub fn inject(prompt: &str, entry: &LoraEntry, weight: f64) -> String {
    let token = format_reference(&entry.name, weight);
    let activation = entry.activation_text.trim();

    if prompt.trim().is_empty() {
        if activation.is_empty() {
            return token;
        }
        return format!("{}, {}", token, activation);
    }

    let mut lora_parts: Vec<&str> = Vec::new();
    let mut plain_parts: Vec<&str> = Vec::new();
    let mut seen_names: HashSet<&str> = HashSet::new();

    for part in prompt.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if part.starts_with(LORA_TOKEN_PREFIX) {
            if let Some(name) = parse_reference(part) {
                if name == entry.name {
                    // Superseded by the freshly weighted token
                    continue;
                }
                if !seen_names.insert(name) {
                    continue;
                }
            }
            lora_parts.push(part);
        } else {
            plain_parts.push(part);
        }
    }

    let mut parts: Vec<&str> = Vec::with_capacity(2 + lora_parts.len() + plain_parts.len());
    parts.push(&token);
    parts.extend(lora_parts);
    if !activation.is_empty() {
        parts.push(activation);
    }
    parts.extend(plain_parts);

    parts.join(", ")
}

/// Append a LoRA's negative text to the negative prompt
pub fn inject_negative(negative_prompt: &str, negative_text: Option<&str>) -> String {
    let addition = negative_text.map(str::trim).unwrap_or_default();
    if addition.is_empty() {
        return negative_prompt.to_string();
    }
    if negative_prompt.trim().is_empty() {
        return addition.to_string();
    }
    format!("{}, {}", negative_prompt, addition)
}

/// Mutate one prompt pair with a selected entry at a resolved weight
pub fn inject_pair(
    prompt: &str,
    negative_prompt: &str,
    entry: &LoraEntry,
    weight: f64,
) -> InjectionOutcome {
    InjectionOutcome {
        prompt: inject(prompt, entry, weight),
        negative_prompt: inject_negative(negative_prompt, entry.negative_text.as_deref()),
        lora_name: entry.name.clone(),
        weight,
    }
}

/// Produce one outcome per batch image.
///
/// The host applies the same selection to every image of a run, so the
/// mutation is identical; it is still materialized per image the way the
/// host expects its prompt arrays.
pub fn inject_batch(
    prompt: &str,
    negative_prompt: &str,
    entry: &LoraEntry,
    weight: f64,
    count: usize,
) -> Vec<InjectionOutcome> {
    let outcome = inject_pair(prompt, negative_prompt, entry, weight);
    std::iter::repeat(outcome).take(count.max(1)).collect()
}
