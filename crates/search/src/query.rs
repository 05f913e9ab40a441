//! Query representation and URL parameter handling.
//!
//! A [`Query`] is the raw `resource` + query-string pair as received. It
//! parses into typed parameter instances plus result options (`_count`,
//! `_offset`, `_sort`, `_include`, `_revinclude`, `_summary`).

use url::form_urlencoded;

use crate::error::{SearchError, SearchResult};
use crate::params::{param_info, SearchParamInfo};

pub const COUNT_PARAM: &str = "_count";
pub const OFFSET_PARAM: &str = "_offset";
pub const SORT_PARAM: &str = "_sort";
pub const INCLUDE_PARAM: &str = "_include";
pub const REVINCLUDE_PARAM: &str = "_revinclude";
pub const SUMMARY_PARAM: &str = "_summary";
pub const ELEMENTS_PARAM: &str = "_elements";
pub const CONTAINED_PARAM: &str = "_contained";
pub const CONTAINED_TYPE_PARAM: &str = "_containedType";

pub const DEFAULT_COUNT: usize = 100;

/// One search request against a resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub resource: String,
    pub query: String,
}

impl Query {
    pub fn new(resource: impl Into<String>, query: impl Into<String>) -> Self {
        Query {
            resource: resource.into(),
            query: query.into(),
        }
    }

    /// Canonical form used as the count-cache key.
    pub fn canonical(&self) -> String {
        format!("{}?{}", self.resource, self.query)
    }

    /// Decoded key/value pairs in order.
    pub fn params(&self) -> QueryParams {
        QueryParams::from_query(&self.query)
    }

    /// A copy of this query with the result-shaping parameters removed;
    /// used by FindIDs so conditional operations match on criteria only.
    pub fn without_result_params(&self) -> Query {
        let filtered: Vec<(String, String)> = self
            .params()
            .0
            .into_iter()
            .filter(|(key, _)| {
                !matches!(
                    key.as_str(),
                    INCLUDE_PARAM
                        | REVINCLUDE_PARAM
                        | SUMMARY_PARAM
                        | ELEMENTS_PARAM
                        | CONTAINED_PARAM
                        | CONTAINED_TYPE_PARAM
                )
            })
            .collect();
        Query {
            resource: self.resource.clone(),
            query: QueryParams(filtered).encode(),
        }
    }

    /// Whether paging links may be generated for this query.
    pub fn supports_paging(&self) -> bool {
        !self
            .params()
            .0
            .iter()
            .any(|(key, value)| key == SUMMARY_PARAM && value == "count")
    }

    /// Parses the query string into typed parameters and options.
    pub fn parse(&self) -> SearchResult<ParsedQuery> {
        let mut parsed = ParsedQuery {
            resource: self.resource.clone(),
            params: Vec::new(),
            options: QueryOptions::default(),
        };

        for (raw_key, raw_value) in self.params().0 {
            self.parse_pair(&raw_key, &raw_value, &mut parsed)?;
        }
        Ok(parsed)
    }

    fn parse_pair(&self, key: &str, value: &str, out: &mut ParsedQuery) -> SearchResult<()> {
        // _has:Type:field:param reverse chains
        if let Some(rest) = key.strip_prefix("_has:") {
            let mut pieces = rest.splitn(3, ':');
            let (target, ref_param, param) = match (pieces.next(), pieces.next(), pieces.next()) {
                (Some(t), Some(r), Some(p)) if !t.is_empty() && !r.is_empty() && !p.is_empty() => {
                    (t, r, p)
                }
                _ => {
                    return Err(SearchError::InvalidValue {
                        name: key.to_string(),
                    });
                }
            };
            out.params.push(ParamInstance::ReverseChained {
                target_resource: target.to_string(),
                ref_param: ref_param.to_string(),
                param: param.to_string(),
                values: split_values(value),
            });
            return Ok(());
        }

        let (name, modifier) = match key.split_once(':') {
            Some((name, modifier)) => (name, Some(modifier.to_string())),
            None => (key, None),
        };

        match name {
            COUNT_PARAM => {
                out.options.count = match value.parse::<i64>() {
                    Ok(n) if n >= 1 => n as usize,
                    _ => DEFAULT_COUNT,
                };
                return Ok(());
            }
            OFFSET_PARAM => {
                out.options.offset = value.parse::<i64>().ok().filter(|n| *n >= 0).unwrap_or(0) as usize;
                return Ok(());
            }
            SORT_PARAM => {
                let descending = modifier.as_deref() == Some("desc");
                for field in value.split(',').filter(|f| !f.is_empty()) {
                    out.options.sorts.push(SortDirective {
                        param: field.to_string(),
                        descending,
                    });
                }
                return Ok(());
            }
            INCLUDE_PARAM => {
                out.options.includes.push(IncludeDirective::parse(value, key)?);
                return Ok(());
            }
            REVINCLUDE_PARAM => {
                out.options.rev_includes.push(IncludeDirective::parse(value, key)?);
                return Ok(());
            }
            SUMMARY_PARAM => {
                out.options.summary = Some(value.to_string());
                return Ok(());
            }
            ELEMENTS_PARAM => {
                // accepted but not applied; responses always carry full bodies
                tracing::debug!(value, "_elements ignored");
                return Ok(());
            }
            CONTAINED_PARAM | CONTAINED_TYPE_PARAM => {
                return Err(SearchError::Unsupported {
                    name: name.to_string(),
                });
            }
            "_id" | "_tag" => {
                out.params.push(ParamInstance::Special {
                    name: name.to_string(),
                    values: split_values(value),
                });
                return Ok(());
            }
            _ if name.starts_with('_') => {
                return Err(SearchError::Unsupported {
                    name: name.to_string(),
                });
            }
            _ => {}
        }

        // chained parameter: param[:Type].subparam
        if let Some((head, subparam)) = name.split_once('.') {
            let info = self.lookup(head)?;
            out.params.push(ParamInstance::Chained {
                info,
                target_modifier: modifier,
                subparam: subparam.to_string(),
                values: split_values(value),
            });
            return Ok(());
        }
        if let Some(modifier_text) = &modifier {
            // a :Type modifier followed by a chain, e.g. message:MessageHeader.destination-uri
            if let Some((target, subparam)) = modifier_text.split_once('.') {
                let info = self.lookup(name)?;
                out.params.push(ParamInstance::Chained {
                    info,
                    target_modifier: Some(target.to_string()),
                    subparam: subparam.to_string(),
                    values: split_values(value),
                });
                return Ok(());
            }
        }

        let info = self.lookup(name)?;
        out.params.push(ParamInstance::Simple {
            info,
            modifier,
            values: split_values(value),
        });
        Ok(())
    }

    fn lookup(&self, name: &str) -> SearchResult<&'static SearchParamInfo> {
        param_info(&self.resource, name).ok_or_else(|| SearchError::UnknownParameter {
            resource: self.resource.clone(),
            name: name.to_string(),
        })
    }
}

fn split_values(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

/// A fully parsed query.
#[derive(Debug)]
pub struct ParsedQuery {
    pub resource: String,
    pub params: Vec<ParamInstance>,
    pub options: QueryOptions,
}

/// One parsed search parameter occurrence.
#[derive(Debug)]
pub enum ParamInstance {
    Simple {
        info: &'static SearchParamInfo,
        modifier: Option<String>,
        values: Vec<String>,
    },
    /// `param.subparam=value` or `param:Type.subparam=value`.
    Chained {
        info: &'static SearchParamInfo,
        target_modifier: Option<String>,
        subparam: String,
        values: Vec<String>,
    },
    /// `_has:Target:refParam:param=value`.
    ReverseChained {
        target_resource: String,
        ref_param: String,
        param: String,
        values: Vec<String>,
    },
    /// `_id` and `_tag`.
    Special { name: String, values: Vec<String> },
}

/// Result-shaping options.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub count: usize,
    pub offset: usize,
    pub sorts: Vec<SortDirective>,
    pub includes: Vec<IncludeDirective>,
    pub rev_includes: Vec<IncludeDirective>,
    pub summary: Option<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            count: DEFAULT_COUNT,
            offset: 0,
            sorts: Vec::new(),
            includes: Vec::new(),
            rev_includes: Vec::new(),
            summary: None,
        }
    }
}

impl QueryOptions {
    pub fn count_only(&self) -> bool {
        self.summary.as_deref() == Some("count")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDirective {
    pub param: String,
    pub descending: bool,
}

/// `_include=Resource:param[:Target]`, or `*` for every reference param.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeDirective {
    Wildcard,
    Named {
        resource: String,
        param: String,
        target: Option<String>,
    },
}

impl IncludeDirective {
    fn parse(value: &str, key: &str) -> SearchResult<IncludeDirective> {
        if value == "*" {
            return Ok(IncludeDirective::Wildcard);
        }
        let mut pieces = value.splitn(3, ':');
        match (pieces.next(), pieces.next()) {
            (Some(resource), Some(param)) if !resource.is_empty() && !param.is_empty() => {
                Ok(IncludeDirective::Named {
                    resource: resource.to_string(),
                    param: param.to_string(),
                    target: pieces.next().map(str::to_string),
                })
            }
            _ => Err(SearchError::InvalidValue {
                name: key.to_string(),
            }),
        }
    }
}

/// Ordered, decoded query parameters with re-encoding support (used when
/// rewriting `_offset`/`_count` for paging links).
#[derive(Debug, Clone, Default)]
pub struct QueryParams(pub Vec<(String, String)>);

impl QueryParams {
    pub fn from_query(query: &str) -> QueryParams {
        QueryParams(
            form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replaces every occurrence of `key` (or appends when absent).
    pub fn set(&mut self, key: &str, value: &str) {
        self.0.retain(|(k, _)| k != key);
        self.0.push((key.to_string(), value.to_string()));
    }

    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.0 {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let query = Query::new("Encounter", "type=http://www.ama-assn.org/go/cpt|99201");
        let parsed = query.parse().unwrap();
        assert_eq!(parsed.options.count, 100);
        assert_eq!(parsed.options.offset, 0);
        assert_eq!(parsed.params.len(), 1);
    }

    #[test]
    fn count_and_offset() {
        let parsed = Query::new("Encounter", "_count=2&_offset=1").parse().unwrap();
        assert_eq!(parsed.options.count, 2);
        assert_eq!(parsed.options.offset, 1);

        // invalid values fall back to defaults
        let parsed = Query::new("Encounter", "_count=-5&_offset=-1").parse().unwrap();
        assert_eq!(parsed.options.count, 100);
        assert_eq!(parsed.options.offset, 0);
    }

    #[test]
    fn includes_parse() {
        let parsed = Query::new(
            "Observation",
            "code=http://loinc.org|17856-6&_include=Observation:subject&_include=Observation:context",
        )
        .parse()
        .unwrap();
        assert_eq!(parsed.options.includes.len(), 2);
        assert_eq!(
            parsed.options.includes[0],
            IncludeDirective::Named {
                resource: "Observation".to_string(),
                param: "subject".to_string(),
                target: None,
            }
        );
    }

    #[test]
    fn include_with_target_type() {
        let parsed = Query::new("Condition", "_include=Condition:asserter:Patient")
            .parse()
            .unwrap();
        assert_eq!(
            parsed.options.includes[0],
            IncludeDirective::Named {
                resource: "Condition".to_string(),
                param: "asserter".to_string(),
                target: Some("Patient".to_string()),
            }
        );
    }

    #[test]
    fn sort_directives() {
        let parsed = Query::new("Condition", "_sort=patient&_sort:desc=code").parse().unwrap();
        assert_eq!(
            parsed.options.sorts,
            vec![
                SortDirective { param: "patient".to_string(), descending: false },
                SortDirective { param: "code".to_string(), descending: true },
            ]
        );
    }

    #[test]
    fn reverse_chain_parses() {
        let parsed = Query::new("Patient", "_has:Observation:subject:code=1234-5")
            .parse()
            .unwrap();
        match &parsed.params[0] {
            ParamInstance::ReverseChained {
                target_resource,
                ref_param,
                param,
                values,
            } => {
                assert_eq!(target_resource, "Observation");
                assert_eq!(ref_param, "subject");
                assert_eq!(param, "code");
                assert_eq!(values, &vec!["1234-5".to_string()]);
            }
            other => panic!("expected reverse chain, got {other:?}"),
        }
    }

    #[test]
    fn chain_with_type_modifier() {
        let parsed = Query::new("Bundle", "message:MessageHeader.destination-uri=http://acme.com/ehr/fhir")
            .parse()
            .unwrap();
        match &parsed.params[0] {
            ParamInstance::Chained {
                info,
                target_modifier,
                subparam,
                ..
            } => {
                assert_eq!(info.name, "message");
                assert_eq!(target_modifier.as_deref(), Some("MessageHeader"));
                assert_eq!(subparam, "destination-uri");
            }
            other => panic!("expected chain, got {other:?}"),
        }
    }

    #[test]
    fn unknown_parameter_errors() {
        let err = Query::new("Condition", "abatement=2012").parse().unwrap_err();
        assert!(matches!(err, SearchError::UnknownParameter { .. }));
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn unsupported_parameters_error() {
        assert!(matches!(
            Query::new("Condition", "_contained=true").parse().unwrap_err(),
            SearchError::Unsupported { .. }
        ));
        assert!(matches!(
            Query::new("Condition", "_text=diabetes").parse().unwrap_err(),
            SearchError::Unsupported { .. }
        ));
    }

    #[test]
    fn result_params_are_stripped_for_find_ids() {
        let query = Query::new(
            "Patient",
            "gender=male&_include=Patient:organization&_summary=count&_count=5",
        );
        let stripped = query.without_result_params();
        let params = stripped.params();
        assert_eq!(params.get("gender"), Some("male"));
        assert_eq!(params.get("_count"), Some("5"));
        assert!(params.get("_include").is_none());
        assert!(params.get("_summary").is_none());
    }

    #[test]
    fn query_params_set_and_encode() {
        let mut params = QueryParams::from_query("gender=male&_count=10");
        params.set("_offset", "20");
        params.set("_count", "10");
        let encoded = params.encode();
        assert!(encoded.contains("gender=male"));
        assert!(encoded.contains("_offset=20"));
    }
}
