use crate::error::GrepError;
use crate::models::{
    InvocationScope, ScopeFilter, SearchRequest, DEFAULT_MAX_RESULTS, MAX_RESULTS_LIMIT,
};
use serde_json::Value;

impl SearchRequest {
    pub fn new<I, S>(
        patterns: I,
        knowledge_base_ids: Vec<String>,
        max_results: Option<i64>,
        invocation: &InvocationScope,
    ) -> Result<Self, GrepError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| pattern.as_ref().trim().to_string())
            .filter(|pattern| !pattern.is_empty())
            .collect::<Vec<_>>();
        if patterns.is_empty() {
            return Err(missing_pattern());
        }

        let knowledge_base_ids = knowledge_base_ids
            .into_iter()
            .filter(|id| !id.is_empty())
            .collect();

        Ok(Self {
            patterns,
            scope: resolve_scope(knowledge_base_ids, invocation),
            max_results: max_results.map_or(DEFAULT_MAX_RESULTS, clamp_max_results),
            count_only: false,
        })
    }

    pub fn from_args(args: &Value, invocation: &InvocationScope) -> Result<Self, GrepError> {
        let patterns = parse_patterns(args.get("pattern"))?;
        let max_results = parse_max_results(args.get("max_results"));
        let knowledge_base_ids = parse_string_list(args.get("knowledge_base_ids"));
        let count_only = args
            .get("count_only")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(Self {
            patterns,
            scope: resolve_scope(knowledge_base_ids, invocation),
            max_results,
            count_only,
        })
    }
}

pub fn parse_patterns(raw: Option<&Value>) -> Result<Vec<String>, GrepError> {
    let mut patterns = raw
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|pattern| !pattern.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if patterns.is_empty() {
        if let Some(single) = raw.and_then(Value::as_str).map(str::trim) {
            if !single.is_empty() {
                patterns.push(single.to_string());
            }
        }
    }

    if patterns.is_empty() {
        return Err(missing_pattern());
    }
    Ok(patterns)
}

pub fn parse_max_results(raw: Option<&Value>) -> usize {
    match raw.and_then(Value::as_f64) {
        Some(value) => clamp_max_results(value.trunc() as i64),
        None => DEFAULT_MAX_RESULTS,
    }
}

fn clamp_max_results(value: i64) -> usize {
    value.clamp(1, MAX_RESULTS_LIMIT as i64) as usize
}

fn parse_string_list(raw: Option<&Value>) -> Vec<String> {
    raw.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn resolve_scope(knowledge_base_ids: Vec<String>, invocation: &InvocationScope) -> ScopeFilter {
    let knowledge_base_ids = if knowledge_base_ids.is_empty() {
        invocation.allowed_knowledge_base_ids.clone()
    } else {
        knowledge_base_ids
    };

    ScopeFilter {
        knowledge_base_ids,
        knowledge_ids: invocation.knowledge_ids.clone(),
    }
}

fn missing_pattern() -> GrepError {
    GrepError::InvalidArgument(
        "pattern parameter is required and must contain at least one non-empty pattern"
            .to_string(),
    )
}
