use std::fmt;
use std::str::FromStr;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// HTTP verbs the fuzzer knows how to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    /// Default method set, in the order candidates are generated.
    pub const ALL: [Method; 5] = [Method::Get, Method::Post, Method::Put, Method::Delete, Method::Patch];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            _ => Err(ConfigError::UnknownMethod(s.to_string())),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

/// One (path, method) pair to probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub path: String,
    pub method: Method,
}

/// Cartesian product of a wordlist and a method set.
///
/// Nothing is materialised up front: `iter()` walks the product lazily and can
/// be called again to restart from the first candidate.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    paths: Vec<String>,
    methods: Vec<Method>,
}

impl CandidateSet {
    pub fn generate<I, S>(paths: I, methods: &[Method]) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // Drop repeated wordlist entries, first occurrence keeps its position
        let mut seen = AHashSet::new();
        let paths: Vec<String> = paths
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| seen.insert(p.clone()))
            .collect();
        if paths.is_empty() {
            return Err(ConfigError::EmptyWordlist);
        }

        // Collapse repeated verbs, first occurrence keeps its position
        let mut unique = Vec::with_capacity(methods.len());
        for m in methods {
            if !unique.contains(m) {
                unique.push(*m);
            }
        }
        if unique.is_empty() {
            return Err(ConfigError::EmptyMethods);
        }

        Ok(Self { paths, methods: unique })
    }

    /// Path-major iteration: every method for the first path, then the next path.
    pub fn iter(&self) -> impl Iterator<Item = Candidate> + '_ {
        self.paths.iter().flat_map(move |path| {
            self.methods.iter().map(move |method| Candidate {
                path: path.clone(),
                method: *method,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len() * self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_size_and_order() {
        let set = CandidateSet::generate(["admin", "api/v1/users"], &[Method::Get, Method::Post]).unwrap();
        assert_eq!(set.len(), 4);

        let got: Vec<(String, Method)> = set.iter().map(|c| (c.path, c.method)).collect();
        assert_eq!(
            got,
            vec![
                ("admin".to_string(), Method::Get),
                ("admin".to_string(), Method::Post),
                ("api/v1/users".to_string(), Method::Get),
                ("api/v1/users".to_string(), Method::Post),
            ]
        );
    }

    #[test]
    fn test_iter_is_restartable() {
        let set = CandidateSet::generate(vec!["a".to_string(), "b".to_string()], &Method::ALL).unwrap();
        assert_eq!(set.iter().count(), 10);
        assert_eq!(set.iter().count(), 10);
        assert_eq!(set.iter().next(), Some(Candidate { path: "a".into(), method: Method::Get }));
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let empty: Vec<String> = Vec::new();
        assert!(matches!(CandidateSet::generate(empty, &Method::ALL), Err(ConfigError::EmptyWordlist)));
        assert!(matches!(CandidateSet::generate(["x"], &[]), Err(ConfigError::EmptyMethods)));
    }

    #[test]
    fn test_duplicate_methods_collapsed() {
        let set = CandidateSet::generate(["x"], &[Method::Post, Method::Get, Method::Post]).unwrap();
        assert_eq!(set.methods(), &[Method::Post, Method::Get]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_repeated_paths_collapsed() {
        let set = CandidateSet::generate(["admin", "api", "admin", "api", "admin"], &[Method::Get, Method::Put]).unwrap();
        assert_eq!(set.len(), 4);
        let paths: Vec<String> = set.iter().map(|c| c.path).collect();
        assert_eq!(paths, vec!["admin", "admin", "api", "api"]);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("patch".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!(" Delete ".parse::<Method>().unwrap(), Method::Delete);
        assert!(matches!("TRACE".parse::<Method>(), Err(ConfigError::UnknownMethod(_))));
        assert_eq!(Method::Put.to_string(), "PUT");
        assert_eq!(reqwest::Method::from(Method::Get), reqwest::Method::GET);
    }
}
