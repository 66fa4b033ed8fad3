use serde::{Deserialize, Serialize};

use crate::model::CanonicalPath;
use crate::query::filter::Filter;

/// Whether a fragment establishes a new traversal position (path) or only
/// restricts the current candidate set (filter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FragmentKind {
    Path,
    Filter,
}

/// One step of a query: an OR of AND-groups of filters
///
/// The fragment matches an element if any inner group's filters all match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFragment {
    pub kind: FragmentKind,
    pub branches: Vec<Vec<Filter>>,
}

impl QueryFragment {
    pub fn path(filters: Vec<Filter>) -> Self {
        Self {
            kind: FragmentKind::Path,
            branches: vec![filters],
        }
    }

    pub fn filter(filters: Vec<Filter>) -> Self {
        Self {
            kind: FragmentKind::Filter,
            branches: vec![filters],
        }
    }
}

/// A backend-independent description of a traversal: an ordered sequence of
/// filter fragments
///
/// Queries are built, composed and handed to the backend for evaluation;
/// the core never interprets them itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    fragments: Vec<QueryFragment>,
}

impl Query {
    pub fn empty() -> Self {
        Self {
            fragments: Vec::new(),
        }
    }

    /// Start a pure path-navigation query (structural descent)
    pub fn path() -> QueryBuilder {
        QueryBuilder {
            fragments: Vec::new(),
            kind: FragmentKind::Path,
        }
    }

    /// Start a filter query (restricts candidates without moving position)
    pub fn filter() -> QueryBuilder {
        QueryBuilder {
            fragments: Vec::new(),
            kind: FragmentKind::Filter,
        }
    }

    /// A query resolving directly to one known path
    ///
    /// Used to re-resolve a just-created entity without a second full
    /// traversal.
    pub fn to(path: &CanonicalPath) -> Self {
        Self {
            fragments: vec![QueryFragment::path(vec![Filter::at(path.clone())])],
        }
    }

    /// Continue this query with further fragments
    pub fn extend(&self, kind: FragmentKind) -> QueryBuilder {
        QueryBuilder {
            fragments: self.fragments.clone(),
            kind,
        }
    }

    /// This query followed by all fragments of `other`
    pub fn append(&self, other: &Query) -> Self {
        let mut fragments = self.fragments.clone();
        fragments.extend(other.fragments.iter().cloned());
        Self { fragments }
    }

    pub fn fragments(&self) -> &[QueryFragment] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, fragment) in self.fragments.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            let branches: Vec<String> = fragment
                .branches
                .iter()
                .map(|group| {
                    group
                        .iter()
                        .map(Filter::to_string)
                        .collect::<Vec<_>>()
                        .join(" & ")
                })
                .collect();
            write!(f, "[{}]", branches.join(" | "))?;
        }
        Ok(())
    }
}

/// Builds one query by appending fragments in order
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    fragments: Vec<QueryFragment>,
    kind: FragmentKind,
}

impl QueryBuilder {
    /// Append a fragment holding a single filter
    pub fn with(self, filter: Filter) -> Self {
        self.with_all(vec![filter])
    }

    /// Append a fragment whose filters must all match
    pub fn with_all(mut self, filters: Vec<Filter>) -> Self {
        self.fragments.push(QueryFragment {
            kind: self.kind,
            branches: vec![filters],
        });
        self
    }

    /// Append a fragment matching if any inner group's filters all match
    /// (an OR of AND-groups)
    pub fn where_all(mut self, groups: Vec<Vec<Filter>>) -> Self {
        self.fragments.push(QueryFragment {
            kind: self.kind,
            branches: groups,
        });
        self
    }

    pub fn get(self) -> Query {
        Query {
            fragments: self.fragments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, ElementKind};

    #[test]
    fn test_builder_appends_fragments_in_order() {
        let query = Query::path()
            .with(Filter::kind(ElementKind::Tenant))
            .with(Filter::id("acme"))
            .get();
        assert_eq!(query.fragments().len(), 2);
        assert_eq!(query.fragments()[0].kind, FragmentKind::Path);
    }

    #[test]
    fn test_where_all_builds_or_of_and_groups() {
        let query = Query::filter()
            .where_all(vec![
                vec![
                    Filter::kind(ElementKind::Resource),
                    Filter::id("web-1"),
                ],
                vec![Filter::kind(ElementKind::Metric)],
            ])
            .get();
        assert_eq!(query.fragments().len(), 1);
        assert_eq!(query.fragments()[0].branches.len(), 2);
    }

    #[test]
    fn test_to_resolves_one_path() {
        let path = CanonicalPath::of_tenant("acme");
        let query = Query::to(&path);
        assert_eq!(query.fragments().len(), 1);
        assert_eq!(
            query.fragments()[0].branches[0],
            vec![Filter::at(path)]
        );
    }

    #[test]
    fn test_append_concatenates() {
        let a = Query::path().with(Filter::kind(ElementKind::Tenant)).get();
        let b = Query::path()
            .with(Filter::related_by("contains", Direction::Outgoing))
            .get();
        let combined = a.append(&b);
        assert_eq!(combined.fragments().len(), 2);
        // neither input is mutated
        assert_eq!(a.fragments().len(), 1);
        assert_eq!(b.fragments().len(), 1);
    }
}
