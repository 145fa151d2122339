//! Method-call registry
//!
//! The closed set of method shapes the translator understands. Each entry
//! fixes whether a target is allowed and how many arguments the call takes;
//! anything not registered here is rejected.

use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownMethod {
    /// Named query parameter → `{name:Type}`
    GetParameter,
    DictGet,
    DictGetOrDefault,
    DictHas,
    /// JSON subcolumn access
    JsonPath,
    /// `has(array, x)` or `position(string, x) > 0`
    Contains,
    /// `notEmpty(array)`
    Any,
    /// `length(x)` with a target, `count()` / `countIf(p)` without
    Count,
    StartsWith,
    EndsWith,
    ToLower,
    ToUpper,
    /// Aggregate without a target, `array*` function with one
    Sum,
    Min,
    Max,
    Average,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRule {
    Required,
    Forbidden,
    Optional,
}

#[derive(Debug, Clone, Copy)]
pub struct MethodSpec {
    pub method: KnownMethod,
    pub target: TargetRule,
    pub min_args: usize,
    pub max_args: usize,
}

/// Look up a method by name (case-insensitive)
pub fn get_method_spec(name: &str) -> Option<MethodSpec> {
    METHOD_SPECS.get(name.to_lowercase().as_str()).copied()
}

pub fn supported_methods() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = METHOD_SPECS.keys().copied().collect();
    names.sort_unstable();
    names
}

static METHOD_SPECS: LazyLock<HashMap<&'static str, MethodSpec>> = LazyLock::new(|| {
    use KnownMethod::*;
    use TargetRule::*;

    let spec = |method, target, min_args, max_args| MethodSpec {
        method,
        target,
        min_args,
        max_args,
    };

    let mut m = HashMap::new();

    // ===== PARAMETERS =====
    // GetParameter("tenant") or GetParameter("tenant", "UInt32")
    m.insert("getparameter", spec(GetParameter, Forbidden, 1, 2));
    m.insert("getvalue", spec(GetParameter, Forbidden, 1, 2));

    // ===== DICTIONARIES =====
    // DictGet("dict", "attr", key)
    m.insert("dictget", spec(DictGet, Forbidden, 3, 3));
    // DictGetOrDefault("dict", "attr", key, default)
    m.insert("dictgetordefault", spec(DictGetOrDefault, Forbidden, 4, 4));
    // DictHas("dict", key)
    m.insert("dicthas", spec(DictHas, Forbidden, 2, 2));

    // ===== JSON =====
    // x.Payload.JsonPath("items[0].name")
    m.insert("jsonpath", spec(JsonPath, Required, 1, 1));

    // ===== COLLECTIONS AND STRINGS =====
    m.insert("contains", spec(Contains, Required, 1, 1));
    m.insert("any", spec(Any, Required, 0, 0));
    m.insert("length", spec(Count, Required, 0, 0));
    m.insert("count", spec(Count, Optional, 0, 1));
    m.insert("countall", spec(Count, Forbidden, 0, 1));
    m.insert("startswith", spec(StartsWith, Required, 1, 1));
    m.insert("endswith", spec(EndsWith, Required, 1, 1));
    m.insert("tolower", spec(ToLower, Required, 0, 0));
    m.insert("toupper", spec(ToUpper, Required, 0, 0));

    // ===== AGGREGATION =====
    m.insert("sum", spec(Sum, Optional, 0, 1));
    m.insert("min", spec(Min, Optional, 0, 1));
    m.insert("max", spec(Max, Optional, 0, 1));
    m.insert("average", spec(Average, Optional, 0, 1));

    m
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(get_method_spec("DictGet").unwrap().method, KnownMethod::DictGet);
        assert_eq!(get_method_spec("dictget").unwrap().max_args, 3);
    }

    #[test]
    fn test_unknown_method() {
        assert!(get_method_spec("Reverse").is_none());
    }

    #[test]
    fn test_aliases_share_method() {
        assert_eq!(
            get_method_spec("GetValue").unwrap().method,
            get_method_spec("GetParameter").unwrap().method
        );
        assert_eq!(get_method_spec("Length").unwrap().method, KnownMethod::Count);
    }

    #[test]
    fn test_supported_methods_sorted() {
        let names = supported_methods();
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
        assert!(names.contains(&"jsonpath"));
    }
}
