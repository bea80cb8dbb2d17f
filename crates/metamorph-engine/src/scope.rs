//! Transformation scopes: how many attempts a run makes and which nodes they
//! target.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use metamorph_types::{MetamorphError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TransformationScope {
    /// `count` attempts, each against a random class.
    #[default]
    Global,
    /// `count × methods` attempts, each against a random class.
    PerMethod,
    /// `count × classes` attempts, each against a random class.
    PerClass,
    /// `count` attempts for every method, round-robin.
    PerMethodEach,
    /// `count` attempts for every class, round-robin.
    PerClassEach,
}

impl TransformationScope {
    pub const ALL: [TransformationScope; 5] = [
        TransformationScope::Global,
        TransformationScope::PerMethod,
        TransformationScope::PerClass,
        TransformationScope::PerMethodEach,
        TransformationScope::PerClassEach,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransformationScope::Global => "global",
            TransformationScope::PerMethod => "perMethod",
            TransformationScope::PerClass => "perClass",
            TransformationScope::PerMethodEach => "perMethodEach",
            TransformationScope::PerClassEach => "perClassEach",
        }
    }

    /// Total attempts for a run over `classes` classes and `methods` methods.
    pub fn target_count(self, count: usize, classes: usize, methods: usize) -> usize {
        match self {
            TransformationScope::Global => count,
            TransformationScope::PerMethod | TransformationScope::PerMethodEach => {
                count.saturating_mul(methods)
            }
            TransformationScope::PerClass | TransformationScope::PerClassEach => {
                count.saturating_mul(classes)
            }
        }
    }

    /// Round-robin scopes visit their nodes in order instead of drawing them.
    pub fn is_round_robin(self) -> bool {
        matches!(
            self,
            TransformationScope::PerMethodEach | TransformationScope::PerClassEach
        )
    }
}

impl fmt::Display for TransformationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `perMethodEach`, `per_method_each`, `per-method-each`, ... in any case.
impl FromStr for TransformationScope {
    type Err = MetamorphError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        TransformationScope::ALL
            .into_iter()
            .find(|scope| scope.as_str().to_ascii_lowercase() == wanted)
            .ok_or_else(|| MetamorphError::UnknownScope(s.to_string()))
    }
}

impl TryFrom<String> for TransformationScope {
    type Error = MetamorphError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TransformationScope> for String {
    fn from(scope: TransformationScope) -> Self {
        scope.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_count_formula() {
        use TransformationScope::*;
        assert_eq!(Global.target_count(5, 2, 7), 5);
        assert_eq!(PerMethod.target_count(5, 2, 7), 35);
        assert_eq!(PerMethodEach.target_count(5, 2, 7), 35);
        assert_eq!(PerClass.target_count(5, 2, 7), 10);
        assert_eq!(PerClassEach.target_count(5, 2, 7), 10);
        assert_eq!(PerClassEach.target_count(0, 2, 7), 0);
    }

    #[test]
    fn parse_is_lenient_about_case_and_separators() {
        assert_eq!("global".parse::<TransformationScope>().unwrap(), TransformationScope::Global);
        assert_eq!(
            "perClassEach".parse::<TransformationScope>().unwrap(),
            TransformationScope::PerClassEach
        );
        assert_eq!(
            "per_method".parse::<TransformationScope>().unwrap(),
            TransformationScope::PerMethod
        );
        assert_eq!(
            " PER-METHOD-EACH ".parse::<TransformationScope>().unwrap(),
            TransformationScope::PerMethodEach
        );
    }

    #[test]
    fn unknown_scope_is_fatal() {
        let err = "perPackage".parse::<TransformationScope>().unwrap_err();
        assert!(matches!(err, MetamorphError::UnknownScope(ref s) if s == "perPackage"));
        assert!(err.is_configuration());
    }

    #[test]
    fn serde_uses_camel_case_names() {
        let json = serde_json::to_string(&TransformationScope::PerMethodEach).unwrap();
        assert_eq!(json, "\"perMethodEach\"");
        let back: TransformationScope = serde_json::from_str("\"per_class\"").unwrap();
        assert_eq!(back, TransformationScope::PerClass);
        assert!(serde_json::from_str::<TransformationScope>("\"nowhere\"").is_err());
    }

    #[test]
    fn round_robin_scopes() {
        assert!(TransformationScope::PerClassEach.is_round_robin());
        assert!(TransformationScope::PerMethodEach.is_round_robin());
        assert!(!TransformationScope::PerClass.is_round_robin());
    }
}
