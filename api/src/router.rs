use std::collections::HashMap;

use http::Method;

/// Every operation the API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Health,
    CreateUser,
    GetUser,
    Hello,
    UploadFile,
    DownloadFile,
    ListFiles,
    DeleteFile,
    NightlyEmail,
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("route {method} {template} is already registered")]
    Duplicate { method: Method, template: String },
    #[error("route {method} {template} overlaps {existing} with as many literal segments")]
    Ambiguous {
        method: Method,
        template: String,
        existing: String,
    },
    #[error("invalid route template {0:?}")]
    InvalidTemplate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Param(_), Segment::Param(_)) => true,
            _ => false,
        }
    }

    fn overlaps(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            _ => true,
        }
    }
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    template: String,
    segments: Vec<Segment>,
    operation: Operation,
}

fn literals(segments: &[Segment]) -> usize {
    segments
        .iter()
        .filter(|s| matches!(s, Segment::Literal(_)))
        .count()
}

impl Route {
    fn literals(&self) -> usize {
        literals(&self.segments)
    }

    fn shares_path_with(&self, segments: &[Segment]) -> bool {
        self.segments.len() == segments.len()
            && self.segments.iter().zip(segments).all(|(a, b)| a.overlaps(b))
    }

    fn matches(&self, parts: &[&str]) -> Option<HashMap<String, String>> {
        if self.segments.len() != parts.len() {
            return None;
        }
        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

/// Result of resolving a request against the table.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    pub operation: Operation,
    pub params: HashMap<String, String>,
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|part| !part.is_empty()).collect()
}

fn parse(template: &str) -> Result<Vec<Segment>, RouteError> {
    split(template)
        .into_iter()
        .map(|part| match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            Some("") => Err(RouteError::InvalidTemplate(template.to_string())),
            Some(name) => Ok(Segment::Param(name.to_string())),
            None if part.contains(['{', '}']) => {
                Err(RouteError::InvalidTemplate(template.to_string()))
            }
            None => Ok(Segment::Literal(part.to_string())),
        })
        .collect()
}

/// Static (method, path template) table, built once at cold start.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// The table of every route the API serves.
    pub fn standard() -> Result<RouteTable, RouteError> {
        let mut table = RouteTable::default();
        table.register(Method::GET, "/health", Operation::Health)?;
        table.register(Method::POST, "/users", Operation::CreateUser)?;
        table.register(Method::GET, "/users/{id}", Operation::GetUser)?;
        table.register(Method::GET, "/hello", Operation::Hello)?;
        table.register(Method::POST, "/files", Operation::UploadFile)?;
        table.register(Method::GET, "/files", Operation::ListFiles)?;
        table.register(Method::GET, "/files/{id}", Operation::DownloadFile)?;
        table.register(Method::DELETE, "/files/{id}", Operation::DeleteFile)?;
        table.register(Method::POST, "/tasks/nightly-email", Operation::NightlyEmail)?;
        Ok(table)
    }

    /// Add a route. Templates differing only in placeholder names count as
    /// the same route. Two templates that can match the same path must differ
    /// in their number of literal segments.
    pub fn register(
        &mut self,
        method: Method,
        template: &str,
        operation: Operation,
    ) -> Result<(), RouteError> {
        let segments = parse(template)?;

        let duplicate = self.routes.iter().any(|route| {
            route.method == method
                && route.segments.len() == segments.len()
                && route
                    .segments
                    .iter()
                    .zip(&segments)
                    .all(|(a, b)| a.same_shape(b))
        });
        if duplicate {
            return Err(RouteError::Duplicate {
                method,
                template: template.to_string(),
            });
        }

        let count = literals(&segments);
        let ambiguous = self.routes.iter().find(|route| {
            route.method == method
                && route.literals() == count
                && route.shares_path_with(&segments)
        });
        if let Some(existing) = ambiguous {
            return Err(RouteError::Ambiguous {
                method,
                template: template.to_string(),
                existing: existing.template.clone(),
            });
        }

        self.routes.push(Route {
            method,
            template: template.to_string(),
            segments,
            operation,
        });
        Ok(())
    }

    /// Find the route for `method` and `path`. When several templates match,
    /// the one with the most literal segments wins; registration keeps that
    /// winner unique.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let parts = split(path);

        self.routes
            .iter()
            .filter(|route| &route.method == method)
            .filter_map(|route| route.matches(&parts).map(|params| (route, params)))
            .max_by_key(|(route, _)| route.literals())
            .map(|(route, params)| RouteMatch {
                operation: route.operation,
                params,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_resolve_literal_and_parameter_routes() {
        let table = RouteTable::standard().unwrap();

        let hello = table.resolve(&Method::GET, "/hello").unwrap();
        assert_eq!(hello.operation, Operation::Hello);
        assert!(hello.params.is_empty());

        let user = table.resolve(&Method::GET, "/users/42").unwrap();
        assert_eq!(user.operation, Operation::GetUser);
        assert_eq!(user.params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_should_match_on_method() {
        let table = RouteTable::standard().unwrap();

        assert_eq!(
            table.resolve(&Method::DELETE, "/files/abc").unwrap().operation,
            Operation::DeleteFile
        );
        assert_eq!(
            table.resolve(&Method::GET, "/files/abc").unwrap().operation,
            Operation::DownloadFile
        );
        assert!(table.resolve(&Method::PUT, "/files/abc").is_none());
        assert!(table.resolve(&Method::DELETE, "/files").is_none());
    }

    #[test]
    fn test_should_ignore_trailing_slash() {
        let table = RouteTable::standard().unwrap();

        assert_eq!(
            table.resolve(&Method::GET, "/health/").unwrap().operation,
            Operation::Health
        );
    }

    #[test]
    fn test_should_not_match_unknown_paths() {
        let table = RouteTable::standard().unwrap();

        assert!(table.resolve(&Method::GET, "/unknown").is_none());
        assert!(table.resolve(&Method::GET, "/users/1/extra").is_none());
        assert!(table.resolve(&Method::GET, "/").is_none());
    }

    #[test]
    fn test_should_prefer_literal_segments() {
        let mut table = RouteTable::default();
        table.register(Method::GET, "/users/{id}", Operation::GetUser).unwrap();
        table.register(Method::GET, "/users/me", Operation::Health).unwrap();

        assert_eq!(
            table.resolve(&Method::GET, "/users/me").unwrap().operation,
            Operation::Health
        );
        assert_eq!(
            table.resolve(&Method::GET, "/users/7").unwrap().operation,
            Operation::GetUser
        );
    }

    #[test]
    fn test_should_reject_duplicate_routes() {
        let mut table = RouteTable::default();
        table.register(Method::GET, "/files/{id}", Operation::DownloadFile).unwrap();

        let err = table
            .register(Method::GET, "/files/{file_id}", Operation::DownloadFile)
            .unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { .. }));

        assert!(table.register(Method::DELETE, "/files/{id}", Operation::DeleteFile).is_ok());
        assert_eq!(
            table.resolve(&Method::DELETE, "/files/abc").unwrap().operation,
            Operation::DeleteFile
        );
    }

    #[test]
    fn test_should_reject_overlapping_routes_with_equal_literals() {
        let mut table = RouteTable::default();
        table.register(Method::GET, "/a/{x}", Operation::Health).unwrap();

        let err = table.register(Method::GET, "/{y}/b", Operation::Hello).unwrap_err();
        assert!(matches!(
            err,
            RouteError::Ambiguous { ref existing, .. } if existing == "/a/{x}"
        ));

        // disjoint literals, a different method or more literals are fine
        assert!(table.register(Method::GET, "/{y}/c/d", Operation::Hello).is_ok());
        assert!(table.register(Method::POST, "/{y}/b", Operation::Hello).is_ok());
        assert!(table.register(Method::GET, "/a/b", Operation::Hello).is_ok());
        assert_eq!(
            table.resolve(&Method::GET, "/a/b").unwrap().operation,
            Operation::Hello
        );
        assert_eq!(
            table.resolve(&Method::GET, "/a/z").unwrap().operation,
            Operation::Health
        );
    }

    #[test]
    fn test_should_reject_malformed_templates() {
        let mut table = RouteTable::default();

        assert!(table.register(Method::GET, "/files/{}", Operation::ListFiles).is_err());
        assert!(table.register(Method::GET, "/files/{id", Operation::ListFiles).is_err());
    }
}
