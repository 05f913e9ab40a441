//! Translation of parsed queries into MongoDB filters and pipelines.
//!
//! Plain parameters compile to a single filter document. Chained and
//! reverse-chained parameters compile to an aggregation pipeline: one
//! `$match` for the plain criteria, one `$lookup` per reference path, and a
//! final `$match` over the looked-up documents. Searches against message
//! bundles are rewritten to address the first entry's resource inline.

use bson::{doc, Bson, Document};

use meridian_model::literal::{DateLiteral, NumberLiteral};
use meridian_model::registry::collection_name;

use crate::error::{SearchError, SearchResult};
use crate::params::{param_info, strip_markers, ParamKind, PathType, SearchParamInfo, SearchPath};
use crate::query::{ParamInstance, ParsedQuery, Query, QueryOptions, SortDirective};

/// Compiler settings mirrored from the server configuration.
#[derive(Debug, Clone, Copy)]
pub struct CompilerConfig {
    /// Match strings and tokens with anchored case-insensitive regexes
    /// instead of exact equality.
    pub enable_ci_searches: bool,
    /// Force exact matching for token parameters even when CI searches are
    /// on.
    pub token_parameters_case_sensitive: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            enable_ci_searches: true,
            token_parameters_case_sensitive: false,
        }
    }
}

/// A compiled query: either a pure filter or an aggregation pipeline.
#[derive(Debug)]
pub struct BsonQuery {
    pub resource: String,
    pub filter: Option<Document>,
    pub pipeline: Option<Vec<Document>>,
    pub options: QueryOptions,
}

impl BsonQuery {
    pub fn uses_pipeline(&self) -> bool {
        self.pipeline.is_some()
    }
}

/// Stateless query-object builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryCompiler {
    pub config: CompilerConfig,
}

impl QueryCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        QueryCompiler { config }
    }

    /// Compiles the non-join criteria of a query into a filter document.
    /// Chained and reverse-chained parameters are left to [`convert`].
    pub fn create_query_object(&self, query: &Query) -> SearchResult<Document> {
        let parsed = query.parse()?;
        self.base_filter(&parsed)
    }

    /// Compiles a query fully, producing a filter or a pipeline.
    pub fn convert(&self, query: &Query) -> SearchResult<BsonQuery> {
        let parsed = query.parse()?;
        let base = self.base_filter(&parsed)?;

        let mut lookups: Vec<Document> = Vec::new();
        let mut final_match = Document::new();
        let mut counter = 0usize;

        for param in &parsed.params {
            match param {
                ParamInstance::Chained {
                    info,
                    target_modifier,
                    subparam,
                    values,
                } if info.inline_prefix.is_none() => {
                    let clause = self.compile_chain(
                        info,
                        target_modifier.as_deref(),
                        subparam,
                        values,
                        &mut lookups,
                        &mut counter,
                    )?;
                    merge_into(&mut final_match, clause);
                }
                ParamInstance::ReverseChained {
                    target_resource,
                    ref_param,
                    param,
                    values,
                } => {
                    let clause = self.compile_reverse_chain(
                        target_resource,
                        ref_param,
                        param,
                        values,
                        &mut lookups,
                        &mut counter,
                    )?;
                    merge_into(&mut final_match, clause);
                }
                _ => {}
            }
        }

        if lookups.is_empty() {
            return Ok(BsonQuery {
                resource: parsed.resource,
                filter: Some(base),
                pipeline: None,
                options: parsed.options,
            });
        }

        let mut pipeline = Vec::with_capacity(lookups.len() + 2);
        pipeline.push(doc! {"$match": base});
        pipeline.extend(lookups);
        pipeline.push(doc! {"$match": final_match});

        Ok(BsonQuery {
            resource: parsed.resource,
            filter: None,
            pipeline: Some(pipeline),
            options: parsed.options,
        })
    }

    /// Sort specification for the stored paths of each `_sort` parameter.
    /// Paths that land in parallel arrays after the first are dropped so the
    /// request does not fail.
    pub fn sort_document(&self, resource: &str, sorts: &[SortDirective]) -> SearchResult<Document> {
        let mut out = Document::new();
        let mut have_array_path = false;
        for directive in sorts {
            let direction = if directive.descending { -1 } else { 1 };
            if directive.param == "_id" {
                out.insert("_id", direction);
                continue;
            }
            let info = param_info(resource, &directive.param).ok_or_else(|| {
                SearchError::UnknownParameter {
                    resource: resource.to_string(),
                    name: directive.param.clone(),
                }
            })?;
            for path in info.paths {
                let has_marker = path.path.contains("[]");
                if has_marker && have_array_path {
                    tracing::debug!(param = directive.param, path = path.path, "dropping parallel-array sort path");
                    continue;
                }
                have_array_path |= has_marker;
                out.insert(strip_markers(path.path), direction);
            }
        }
        Ok(out)
    }

    fn base_filter(&self, parsed: &ParsedQuery) -> SearchResult<Document> {
        let mut result = Document::new();
        for param in &parsed.params {
            match param {
                ParamInstance::Simple {
                    info,
                    modifier,
                    values,
                } => {
                    let filter = self.compile_simple(info, modifier.as_deref(), values)?;
                    merge_into(&mut result, filter);
                }
                ParamInstance::Special { name, values } => {
                    let filter = self.compile_special(name, values)?;
                    merge_into(&mut result, filter);
                }
                ParamInstance::Chained {
                    info,
                    target_modifier,
                    subparam,
                    values,
                } if info.inline_prefix.is_some() => {
                    let filter = self.compile_inline_chain(
                        info,
                        target_modifier.as_deref(),
                        subparam,
                        values,
                    )?;
                    merge_into(&mut result, filter);
                }
                _ => {}
            }
        }
        Ok(result)
    }

    fn compile_special(&self, name: &str, values: &[String]) -> SearchResult<Document> {
        match name {
            "_id" => {
                let clauses = values
                    .iter()
                    .map(|v| doc! {"_id": v.as_str()})
                    .collect::<Vec<_>>();
                Ok(or_of(clauses))
            }
            "_tag" => {
                let clauses = values
                    .iter()
                    .map(|v| {
                        self.token_clause(
                            &SearchPath {
                                path: "meta.[]tag",
                                datatype: PathType::Coding,
                            },
                            v,
                            name,
                        )
                    })
                    .collect::<SearchResult<Vec<_>>>()?;
                Ok(or_of(clauses))
            }
            other => Err(SearchError::Unsupported {
                name: other.to_string(),
            }),
        }
    }

    fn compile_simple(
        &self,
        info: &SearchParamInfo,
        modifier: Option<&str>,
        values: &[String],
    ) -> SearchResult<Document> {
        if let Some(modifier) = modifier {
            return self.compile_with_modifier(info, modifier, values);
        }

        // message-style parameters address the first entry of the bundle
        if info.inline_prefix.is_some() {
            return self.compile_inline_reference(info, None, values);
        }

        let clauses = values
            .iter()
            .map(|value| self.compile_single_value(info, value))
            .collect::<SearchResult<Vec<_>>>()?;
        Ok(or_of(clauses))
    }

    fn compile_with_modifier(
        &self,
        info: &SearchParamInfo,
        modifier: &str,
        values: &[String],
    ) -> SearchResult<Document> {
        if modifier == "missing" {
            let clauses = info
                .paths
                .iter()
                .map(|path| {
                    let dotted = strip_markers(path.path);
                    match values.first().map(String::as_str) {
                        Some("true") => Ok(doc! {dotted: Bson::Null}),
                        Some("false") => Ok(doc! {dotted: {"$ne": Bson::Null}}),
                        _ => Err(SearchError::InvalidValue {
                            name: info.name.to_string(),
                        }),
                    }
                })
                .collect::<SearchResult<Vec<_>>>()?;
            return Ok(or_of(clauses));
        }

        // :Type restricts a reference parameter's target
        if info.kind == ParamKind::Reference && modifier.chars().next().is_some_and(|c| c.is_uppercase()) {
            if !info.targets.contains(&modifier) {
                return Err(SearchError::InvalidModifier {
                    name: info.name.to_string(),
                    modifier: modifier.to_string(),
                });
            }
            if info.inline_prefix.is_some() {
                return self.compile_inline_reference(info, Some(modifier), values);
            }
            let clauses = values
                .iter()
                .map(|value| self.reference_clauses(info, Some(modifier), value))
                .collect::<SearchResult<Vec<_>>>()?;
            return Ok(or_of(clauses));
        }

        Err(SearchError::InvalidModifier {
            name: info.name.to_string(),
            modifier: modifier.to_string(),
        })
    }

    fn compile_single_value(&self, info: &SearchParamInfo, value: &str) -> SearchResult<Document> {
        match info.kind {
            ParamKind::Token => {
                let clauses = info
                    .paths
                    .iter()
                    .map(|path| self.token_clause(path, value, info.name))
                    .collect::<SearchResult<Vec<_>>>()?;
                Ok(or_of(clauses))
            }
            ParamKind::String => {
                let mut clauses = Vec::new();
                for path in info.paths {
                    clauses.extend(self.string_clauses(path, value));
                }
                Ok(or_of(clauses))
            }
            ParamKind::Number => {
                let path = &info.paths[0];
                let clauses = self.number_clauses(path, value, info.name)?;
                Ok(or_of(clauses))
            }
            ParamKind::Date => {
                let mut clauses = Vec::new();
                for path in info.paths {
                    clauses.extend(self.date_clauses(path, value, info.name)?);
                }
                Ok(or_of(clauses))
            }
            ParamKind::Reference => self.reference_clauses(info, None, value),
            ParamKind::Quantity => {
                let path = &info.paths[0];
                self.quantity_clause(path, value, info.name)
            }
            ParamKind::Uri => {
                let clauses = info
                    .paths
                    .iter()
                    .map(|path| doc! {strip_markers(path.path): value})
                    .collect::<Vec<_>>();
                Ok(or_of(clauses))
            }
        }
    }

    // ---- token ----

    fn token_clause(&self, path: &SearchPath, value: &str, name: &str) -> SearchResult<Document> {
        let (system, code) = match value.split_once('|') {
            Some((system, code)) => (Some(system), code),
            None => (None, value),
        };

        let criteria = match path.datatype {
            PathType::CodeableConcept | PathType::Coding => {
                self.system_code_criteria(system, code, "code")
            }
            PathType::Identifier => self.system_code_criteria(system, code, "value"),
            PathType::ContactPoint => {
                let mut criteria = Document::new();
                criteria.insert("value", self.token_value(code));
                criteria
            }
            PathType::Code | PathType::String => {
                return Ok(build_bson(path.path, single_criteria("", self.token_value(code))));
            }
            PathType::Boolean => {
                let parsed = match code {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(SearchError::InvalidValue {
                            name: name.to_string(),
                        });
                    }
                };
                return Ok(build_bson(path.path, single_criteria("", Bson::Boolean(parsed))));
            }
            PathType::Uri => {
                return Ok(build_bson(path.path, single_criteria("", Bson::String(code.to_string()))));
            }
            _ => {
                return Err(SearchError::InvalidValue {
                    name: name.to_string(),
                });
            }
        };

        Ok(build_bson(path.path, criteria))
    }

    fn system_code_criteria(&self, system: Option<&str>, code: &str, code_key: &str) -> Document {
        let mut criteria = Document::new();
        match system {
            Some("") => {
                // |code form: the system element must be absent
                criteria.insert(code_key, self.token_value(code));
                criteria.insert("system", doc! {"$exists": false});
            }
            Some(system) => {
                criteria.insert("system", self.token_value(system));
                criteria.insert(code_key, self.token_value(code));
            }
            None => {
                criteria.insert(code_key, self.token_value(code));
            }
        }
        criteria
    }

    fn token_value(&self, text: &str) -> Bson {
        if self.config.enable_ci_searches && !self.config.token_parameters_case_sensitive {
            anchored_regex(text)
        } else {
            Bson::String(text.to_string())
        }
    }

    // ---- string ----

    fn string_clauses(&self, path: &SearchPath, value: &str) -> Vec<Document> {
        let subpaths: &[&str] = match path.datatype {
            PathType::HumanName => &["text", "family", "given"],
            PathType::Address => &["text", "line", "city", "state", "postalCode", "country"],
            _ => &[],
        };

        if subpaths.is_empty() {
            return vec![build_bson(path.path, single_criteria("", self.string_value(value)))];
        }
        subpaths
            .iter()
            .map(|sub| build_bson(path.path, single_criteria(sub, self.string_value(value))))
            .collect()
    }

    fn string_value(&self, text: &str) -> Bson {
        if self.config.enable_ci_searches {
            left_anchored_regex(text)
        } else {
            Bson::String(text.to_string())
        }
    }

    // ---- number ----

    fn number_clauses(&self, path: &SearchPath, value: &str, name: &str) -> SearchResult<Vec<Document>> {
        let (prefix, number) = split_prefix(value);
        let literal = NumberLiteral::parse(number).map_err(|_| SearchError::InvalidValue {
            name: name.to_string(),
        })?;

        let criteria = match prefix {
            Prefix::Eq => vec![doc! {"$gte": literal.range_low_incl(), "$lt": literal.range_high_excl()}],
            Prefix::Lt => vec![doc! {"$lt": literal.value()}],
            Prefix::Gt => vec![doc! {"$gt": literal.value()}],
            Prefix::Le => vec![doc! {"$lte": literal.range_high_excl()}],
            Prefix::Ge => vec![doc! {"$gte": literal.range_low_incl()}],
            Prefix::Ne => {
                return Ok(vec![
                    build_bson(path.path, doc! {"$lt": literal.range_low_incl()}),
                    build_bson(path.path, doc! {"$gte": literal.range_high_excl()}),
                ]);
            }
            _ => {
                return Err(SearchError::InvalidValue {
                    name: name.to_string(),
                });
            }
        };

        Ok(criteria
            .into_iter()
            .map(|c| build_bson(path.path, c))
            .collect())
    }

    // ---- date ----

    fn date_clauses(&self, path: &SearchPath, value: &str, name: &str) -> SearchResult<Vec<Document>> {
        let (prefix, date_text) = split_prefix(value);
        let literal = DateLiteral::parse(date_text).map_err(|_| SearchError::InvalidValue {
            name: name.to_string(),
        })?;
        let lo = Bson::DateTime(literal.range_low_incl().into());
        let hi = Bson::DateTime(literal.range_high_excl().into());
        let dotted = strip_markers(path.path);

        let invalid = || SearchError::InvalidValue {
            name: name.to_string(),
        };

        let clauses = match path.datatype {
            PathType::Date => match prefix {
                Prefix::Eq => vec![build_bson(
                    path.path,
                    doc! {"__from": {"$gte": lo}, "__to": {"$lte": hi}},
                )],
                Prefix::Gt => vec![build_bson(path.path, doc! {"__to": {"$gt": hi}})],
                Prefix::Sa => vec![build_bson(path.path, doc! {"__from": {"$gt": hi}})],
                Prefix::Lt => vec![build_bson(path.path, doc! {"__from": {"$lt": lo}})],
                Prefix::Eb => vec![build_bson(path.path, doc! {"__to": {"$lt": lo}})],
                Prefix::Ge => vec![
                    build_bson(path.path, doc! {"__to": {"$gte": hi}}),
                    build_bson(path.path, doc! {"__from": {"$gte": lo}}),
                ],
                Prefix::Le => vec![
                    build_bson(path.path, doc! {"__from": {"$lte": lo}}),
                    build_bson(path.path, doc! {"__to": {"$lte": hi}}),
                ],
                Prefix::Ne | Prefix::Ap => return Err(invalid()),
            },
            PathType::Period => {
                let missing_start = doc! {dotted.as_str(): {"$ne": Bson::Null}, format!("{dotted}.start"): Bson::Null};
                let missing_end = doc! {dotted.as_str(): {"$ne": Bson::Null}, format!("{dotted}.end"): Bson::Null};
                match prefix {
                    Prefix::Eq => vec![build_bson(
                        path.path,
                        doc! {"start.__from": {"$gte": lo}, "end.__to": {"$lte": hi}},
                    )],
                    Prefix::Gt => vec![
                        build_bson(path.path, doc! {"end.__to": {"$gt": hi}}),
                        missing_end,
                    ],
                    Prefix::Sa => vec![build_bson(path.path, doc! {"start.__from": {"$gt": hi}})],
                    Prefix::Lt => vec![
                        build_bson(path.path, doc! {"start.__from": {"$lt": lo}}),
                        missing_start,
                    ],
                    Prefix::Eb => vec![build_bson(path.path, doc! {"end.__to": {"$lt": lo}})],
                    Prefix::Ge => vec![
                        build_bson(path.path, doc! {"end.__to": {"$gte": hi}}),
                        build_bson(path.path, doc! {"start.__from": {"$gte": lo}}),
                        missing_end,
                    ],
                    Prefix::Le => vec![
                        build_bson(path.path, doc! {"start.__from": {"$lte": lo}}),
                        build_bson(path.path, doc! {"end.__to": {"$lte": hi}}),
                        missing_start,
                    ],
                    Prefix::Ne | Prefix::Ap => return Err(invalid()),
                }
            }
            PathType::Instant => {
                let criteria = match prefix {
                    Prefix::Eq => doc! {"$gte": lo, "$lt": hi},
                    Prefix::Gt | Prefix::Sa => doc! {"$gte": hi},
                    Prefix::Lt | Prefix::Eb => doc! {"$lt": lo},
                    Prefix::Ge => doc! {"$gte": lo},
                    Prefix::Le => doc! {"$lt": hi},
                    Prefix::Ne | Prefix::Ap => return Err(invalid()),
                };
                vec![build_bson(path.path, criteria)]
            }
            _ => return Err(invalid()),
        };
        Ok(clauses)
    }

    // ---- reference ----

    fn reference_clauses(
        &self,
        info: &SearchParamInfo,
        target_override: Option<&str>,
        value: &str,
    ) -> SearchResult<Document> {
        let mut clauses = Vec::new();
        for path in info.paths {
            if value.starts_with("http://") || value.starts_with("https://") {
                // absolute URL: exact match on the reference text
                clauses.push(build_bson(
                    path.path,
                    single_criteria("reference", self.token_value(value)),
                ));
                continue;
            }

            if let Some((type_name, id)) = value.split_once('/') {
                clauses.push(build_bson(
                    path.path,
                    doc! {"reference__id": id, "reference__type": type_name},
                ));
                continue;
            }

            // bare id: target type comes from the declaration
            let targets: Vec<&str> = match target_override {
                Some(t) => vec![t],
                None => info.targets.to_vec(),
            };
            if targets.is_empty() {
                return Err(SearchError::InvalidValue {
                    name: info.name.to_string(),
                });
            }
            for target in targets {
                clauses.push(build_bson(
                    path.path,
                    doc! {"reference__id": value, "reference__type": target},
                ));
            }
        }
        Ok(or_of(clauses))
    }

    // ---- quantity ----

    fn quantity_clause(&self, path: &SearchPath, value: &str, name: &str) -> SearchResult<Document> {
        let mut pieces = value.splitn(3, '|');
        let number_text = pieces.next().unwrap_or_default();
        let system = pieces.next().unwrap_or_default();
        let code = pieces.next().unwrap_or_default();

        // a quantity search without a system is declined
        if system.is_empty() || code.is_empty() {
            return Err(SearchError::InvalidValue {
                name: name.to_string(),
            });
        }

        let (prefix, number_text) = split_prefix(number_text);
        let literal = NumberLiteral::parse(number_text).map_err(|_| SearchError::InvalidValue {
            name: name.to_string(),
        })?;

        let mut criteria = Document::new();
        match prefix {
            Prefix::Eq => {
                criteria.insert("value.__from", doc! {"$gte": literal.range_low_incl()});
                criteria.insert("value.__to", doc! {"$lte": literal.range_high_excl()});
            }
            Prefix::Lt => {
                criteria.insert("value.__from", doc! {"$lt": literal.value()});
            }
            Prefix::Gt => {
                criteria.insert("value.__to", doc! {"$gt": literal.value()});
            }
            Prefix::Le => {
                criteria.insert("value.__from", doc! {"$lte": literal.range_high_excl()});
            }
            Prefix::Ge => {
                criteria.insert("value.__to", doc! {"$gte": literal.range_low_incl()});
            }
            _ => {
                return Err(SearchError::InvalidValue {
                    name: name.to_string(),
                });
            }
        }
        criteria.insert("code", self.token_value(code));
        criteria.insert("system", self.token_value(system));

        Ok(build_bson(path.path, criteria))
    }

    // ---- chains ----

    fn chain_target<'a>(
        &self,
        info: &'a SearchParamInfo,
        target_modifier: Option<&'a str>,
    ) -> SearchResult<&'a str> {
        if let Some(target) = target_modifier {
            if !info.targets.contains(&target) {
                return Err(SearchError::InvalidModifier {
                    name: info.name.to_string(),
                    modifier: target.to_string(),
                });
            }
            return Ok(target);
        }
        info.targets
            .first()
            .copied()
            .ok_or_else(|| SearchError::InvalidValue {
                name: info.name.to_string(),
            })
    }

    fn compile_chain(
        &self,
        info: &SearchParamInfo,
        target_modifier: Option<&str>,
        subparam: &str,
        values: &[String],
        lookups: &mut Vec<Document>,
        counter: &mut usize,
    ) -> SearchResult<Document> {
        let target = self.chain_target(info, target_modifier)?;
        let inner_info = param_info(target, subparam).ok_or_else(|| SearchError::UnknownParameter {
            resource: target.to_string(),
            name: subparam.to_string(),
        })?;

        let mut aliases = Vec::with_capacity(info.paths.len());
        for path in info.paths {
            let alias = format!("_lookup{counter}");
            *counter += 1;
            lookups.push(doc! {"$lookup": {
                "from": collection_name(target),
                "localField": format!("{}.reference__id", strip_markers(path.path)),
                "foreignField": "_id",
                "as": alias.as_str(),
            }});
            aliases.push(alias);
        }

        self.chained_match(inner_info, values, &aliases)
    }

    fn compile_reverse_chain(
        &self,
        target_resource: &str,
        ref_param: &str,
        param: &str,
        values: &[String],
        lookups: &mut Vec<Document>,
        counter: &mut usize,
    ) -> SearchResult<Document> {
        let ref_info = param_info(target_resource, ref_param).ok_or_else(|| {
            SearchError::UnknownParameter {
                resource: target_resource.to_string(),
                name: ref_param.to_string(),
            }
        })?;
        if ref_info.kind != ParamKind::Reference {
            return Err(SearchError::InvalidValue {
                name: format!("_has:{target_resource}:{ref_param}:{param}"),
            });
        }
        let inner_info = param_info(target_resource, param).ok_or_else(|| {
            SearchError::UnknownParameter {
                resource: target_resource.to_string(),
                name: param.to_string(),
            }
        })?;

        let mut aliases = Vec::with_capacity(ref_info.paths.len());
        for path in ref_info.paths {
            let alias = format!("_lookup{counter}");
            *counter += 1;
            lookups.push(doc! {"$lookup": {
                "from": collection_name(target_resource),
                "localField": "_id",
                "foreignField": format!("{}.reference__id", strip_markers(path.path)),
                "as": alias.as_str(),
            }});
            aliases.push(alias);
        }

        self.chained_match(inner_info, values, &aliases)
    }

    /// The final `$match` for a chained search: an OR over comma-separated
    /// values, each an OR over the reference paths.
    fn chained_match(
        &self,
        inner_info: &SearchParamInfo,
        values: &[String],
        aliases: &[String],
    ) -> SearchResult<Document> {
        let mut value_clauses = Vec::with_capacity(values.len());
        for value in values {
            let inner = self.compile_single_value(inner_info, value)?;
            let per_alias = aliases
                .iter()
                .map(|alias| prefix_filter(&inner, &format!("{alias}.")))
                .collect::<Vec<_>>();
            value_clauses.push(or_of(per_alias));
        }
        Ok(or_of(value_clauses))
    }

    // ---- bundle inline parameters ----

    fn compile_inline_reference(
        &self,
        info: &SearchParamInfo,
        target_override: Option<&str>,
        values: &[String],
    ) -> SearchResult<Document> {
        let prefix = info.inline_prefix.expect("inline parameter");
        let target = self.chain_target(info, target_override)?;
        let clauses = values
            .iter()
            .map(|id| {
                doc! {
                    format!("{prefix}.resourceType"): target,
                    format!("{prefix}._id"): id.as_str(),
                }
            })
            .collect::<Vec<_>>();
        Ok(or_of(clauses))
    }

    fn compile_inline_chain(
        &self,
        info: &SearchParamInfo,
        target_modifier: Option<&str>,
        subparam: &str,
        values: &[String],
    ) -> SearchResult<Document> {
        let prefix = info.inline_prefix.expect("inline parameter");
        let target = self.chain_target(info, target_modifier)?;
        let inner_info = param_info(target, subparam).ok_or_else(|| SearchError::UnknownParameter {
            resource: target.to_string(),
            name: subparam.to_string(),
        })?;

        let mut clauses = Vec::with_capacity(values.len());
        for value in values {
            let inner = self.compile_single_value(inner_info, value)?;
            let mut clause = doc! {format!("{prefix}.resourceType"): target};
            merge_into(&mut clause, prefix_filter(&inner, &format!("{prefix}.")));
            clauses.push(clause);
        }
        Ok(or_of(clauses))
    }
}

// ---- shared construction helpers ----

/// Value prefixes of number/date/quantity parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Sa,
    Eb,
    Ap,
}

fn split_prefix(value: &str) -> (Prefix, &str) {
    if value.len() < 2 {
        return (Prefix::Eq, value);
    }
    let (head, rest) = value.split_at(2);
    let prefix = match head {
        "eq" => Prefix::Eq,
        "ne" => Prefix::Ne,
        "gt" => Prefix::Gt,
        "lt" => Prefix::Lt,
        "ge" => Prefix::Ge,
        "le" => Prefix::Le,
        "sa" => Prefix::Sa,
        "eb" => Prefix::Eb,
        "ap" => Prefix::Ap,
        _ => return (Prefix::Eq, value),
    };
    (prefix, rest)
}

fn anchored_regex(text: &str) -> Bson {
    Bson::RegularExpression(bson::Regex {
        pattern: format!("^{}$", regex::escape(text)),
        options: "i".to_string(),
    })
}

fn left_anchored_regex(text: &str) -> Bson {
    Bson::RegularExpression(bson::Regex {
        pattern: format!("^{}", regex::escape(text)),
        options: "i".to_string(),
    })
}

/// A criteria document holding one field (or, with an empty key, a direct
/// value for the path itself).
fn single_criteria(key: &str, value: Bson) -> Document {
    let mut criteria = Document::new();
    criteria.insert(key.to_string(), value);
    criteria
}

/// Builds the filter for a registry path and a criteria document.
///
/// Paths carry `[]` markers on array segments. Multi-field criteria on an
/// array path fold into `$elemMatch` anchored at the last array segment;
/// single-field criteria flatten into a dotted path, which matches through
/// arrays natively.
fn build_bson(path: &str, criteria: Document) -> Document {
    let segments: Vec<&str> = path.split('.').collect();
    let dotted = strip_markers(path);

    if criteria.len() == 1 {
        let (key, value) = criteria.into_iter().next().unwrap();
        if key.is_empty() {
            return single_criteria(&dotted, value);
        }
        if key.starts_with('$') {
            let mut inner = Document::new();
            inner.insert(key, value);
            return single_criteria(&dotted, Bson::Document(inner));
        }
        return single_criteria(&format!("{dotted}.{key}"), value);
    }

    let last_marker = segments.iter().rposition(|s| s.starts_with("[]"));
    match last_marker {
        None => {
            let all_operators = criteria.keys().all(|k| k.starts_with('$'));
            if all_operators {
                return single_criteria(&dotted, Bson::Document(criteria));
            }
            let mut out = Document::new();
            for (key, value) in criteria {
                out.insert(format!("{dotted}.{key}"), value);
            }
            out
        }
        Some(idx) => {
            let anchor = segments[..=idx]
                .iter()
                .map(|s| s.strip_prefix("[]").unwrap_or(s))
                .collect::<Vec<_>>()
                .join(".");
            let remainder = segments[idx + 1..]
                .iter()
                .map(|s| s.strip_prefix("[]").unwrap_or(s))
                .collect::<Vec<_>>()
                .join(".");

            let inner = if remainder.is_empty() {
                criteria
            } else if criteria.keys().all(|k| k.starts_with('$')) {
                let mut inner = Document::new();
                inner.insert(remainder, Bson::Document(criteria));
                inner
            } else {
                let mut inner = Document::new();
                for (key, value) in criteria {
                    inner.insert(format!("{remainder}.{key}"), value);
                }
                inner
            };

            let mut out = Document::new();
            out.insert(anchor, doc! {"$elemMatch": inner});
            out
        }
    }
}

/// Single clause stays bare; multiple clauses OR together.
fn or_of(mut clauses: Vec<Document>) -> Document {
    match clauses.len() {
        0 => Document::new(),
        1 => clauses.remove(0),
        _ => doc! {"$or": clauses},
    }
}

/// Merges one parameter's filter into the accumulated query object. A key
/// collision (typically two `$or` groups) pushes the newcomer into `$and`.
fn merge_into(result: &mut Document, addition: Document) {
    for (key, value) in addition {
        if !result.contains_key(&key) {
            result.insert(key, value);
            continue;
        }
        if key == "$and" {
            if let (Some(Bson::Array(existing)), Bson::Array(incoming)) =
                (result.get_mut("$and"), value)
            {
                existing.extend(incoming);
                continue;
            }
            unreachable!("$and is always an array");
        }
        let mut wrapped = Document::new();
        wrapped.insert(key, value);
        match result.get_mut("$and") {
            Some(Bson::Array(list)) => list.push(Bson::Document(wrapped)),
            _ => {
                result.insert("$and", vec![Bson::Document(wrapped)]);
            }
        }
    }
}

/// Prefixes every path key of a filter (recursing through `$or`/`$and`) so
/// it applies to a looked-up document.
fn prefix_filter(filter: &Document, prefix: &str) -> Document {
    let mut out = Document::new();
    for (key, value) in filter {
        if key.starts_with('$') {
            match value {
                Bson::Array(items) => {
                    let prefixed = items
                        .iter()
                        .map(|item| match item {
                            Bson::Document(doc) => Bson::Document(prefix_filter(doc, prefix)),
                            other => other.clone(),
                        })
                        .collect::<Vec<_>>();
                    out.insert(key.clone(), Bson::Array(prefixed));
                }
                other => {
                    out.insert(key.clone(), other.clone());
                }
            }
        } else {
            out.insert(format!("{prefix}{key}"), value.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler() -> QueryCompiler {
        QueryCompiler::default()
    }

    fn regex(pattern: &str) -> Bson {
        Bson::RegularExpression(bson::Regex {
            pattern: pattern.to_string(),
            options: "i".to_string(),
        })
    }

    #[test]
    fn token_by_system_and_code() {
        let o = compiler()
            .create_query_object(&Query::new("Condition", "code=http://snomed.info/sct|123641001"))
            .unwrap();
        assert_eq!(
            o,
            doc! {
                "code.coding": {
                    "$elemMatch": {
                        "system": regex("^http://snomed\\.info/sct$"),
                        "code": regex("^123641001$"),
                    }
                }
            }
        );
    }

    #[test]
    fn token_by_code_only_flattens() {
        let o = compiler()
            .create_query_object(&Query::new("Condition", "code=123641001"))
            .unwrap();
        assert_eq!(o, doc! {"code.coding.code": regex("^123641001$")});
    }

    #[test]
    fn token_on_nested_array_coding() {
        let o = compiler()
            .create_query_object(&Query::new("ImagingStudy", "bodysite=http://snomed.info/sct|67734004"))
            .unwrap();
        assert_eq!(
            o,
            doc! {
                "series": {
                    "$elemMatch": {
                        "bodySite.system": regex("^http://snomed\\.info/sct$"),
                        "bodySite.code": regex("^67734004$"),
                    }
                }
            }
        );
    }

    #[test]
    fn token_on_identifier() {
        let o = compiler()
            .create_query_object(&Query::new("Encounter", "identifier=http://acme.com|1"))
            .unwrap();
        assert_eq!(
            o,
            doc! {
                "identifier": {
                    "$elemMatch": {
                        "system": regex("^http://acme\\.com$"),
                        "value": regex("^1$"),
                    }
                }
            }
        );
    }

    #[test]
    fn token_boolean() {
        let o = compiler()
            .create_query_object(&Query::new("Immunization", "notgiven=false"))
            .unwrap();
        assert_eq!(o, doc! {"notGiven": false});

        let err = compiler()
            .create_query_object(&Query::new("Immunization", "notgiven=maybe"))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidValue { .. }));
    }

    #[test]
    fn token_case_sensitive_mode_is_exact() {
        let compiler = QueryCompiler::new(CompilerConfig {
            enable_ci_searches: true,
            token_parameters_case_sensitive: true,
        });
        let o = compiler
            .create_query_object(&Query::new("Condition", "code=http://snomed.info/sct|123"))
            .unwrap();
        assert_eq!(
            o,
            doc! {
                "code.coding": {
                    "$elemMatch": {"system": "http://snomed.info/sct", "code": "123"}
                }
            }
        );
    }

    #[test]
    fn reference_by_bare_id() {
        let o = compiler()
            .create_query_object(&Query::new("Condition", "patient=4954037118555241963"))
            .unwrap();
        assert_eq!(
            o,
            doc! {
                "subject.reference__id": "4954037118555241963",
                "subject.reference__type": "Patient",
            }
        );
    }

    #[test]
    fn reference_by_type_and_id() {
        let o = compiler()
            .create_query_object(&Query::new("Condition", "patient=Patient/4954037118555241963"))
            .unwrap();
        assert_eq!(
            o,
            doc! {
                "subject.reference__id": "4954037118555241963",
                "subject.reference__type": "Patient",
            }
        );
    }

    #[test]
    fn reference_by_absolute_url() {
        let o = compiler()
            .create_query_object(&Query::new("Condition", "patient=http://acme.com/Patient/123456789"))
            .unwrap();
        assert_eq!(
            o,
            doc! {"subject.reference": regex("^http://acme\\.com/Patient/123456789$")}
        );
    }

    #[test]
    fn bundle_message_matches_first_entry() {
        let o = compiler()
            .create_query_object(&Query::new("Bundle", "message=4954037118555241963"))
            .unwrap();
        assert_eq!(
            o,
            doc! {
                "entry.0.resource.resourceType": "MessageHeader",
                "entry.0.resource._id": "4954037118555241963",
            }
        );
    }

    #[test]
    fn bundle_message_chain_inlines() {
        let o = compiler()
            .create_query_object(&Query::new("Bundle", "message.destination-uri=http://acme.com/ehr/fhir"))
            .unwrap();
        assert_eq!(
            o,
            doc! {
                "entry.0.resource.resourceType": "MessageHeader",
                "entry.0.resource.destination.endpoint": "http://acme.com/ehr/fhir",
            }
        );

        // with an explicit type modifier
        let o = compiler()
            .create_query_object(&Query::new(
                "Bundle",
                "message:MessageHeader.destination-uri=http://acme.com/ehr/fhir",
            ))
            .unwrap();
        assert_eq!(
            o,
            doc! {
                "entry.0.resource.resourceType": "MessageHeader",
                "entry.0.resource.destination.endpoint": "http://acme.com/ehr/fhir",
            }
        );
    }

    #[test]
    fn chained_search_builds_pipeline() {
        let q = compiler()
            .convert(&Query::new("Condition", "patient.gender=male"))
            .unwrap();
        assert!(q.uses_pipeline());
        assert_eq!(
            q.pipeline.unwrap(),
            vec![
                doc! {"$match": {}},
                doc! {"$lookup": {
                    "from": "patients",
                    "localField": "subject.reference__id",
                    "foreignField": "_id",
                    "as": "_lookup0",
                }},
                doc! {"$match": {"_lookup0.gender": regex("^male$")}},
            ]
        );
    }

    #[test]
    fn chained_search_with_or_values() {
        let q = compiler()
            .convert(&Query::new("Condition", "patient.gender=foo,bar"))
            .unwrap();
        assert_eq!(
            q.pipeline.unwrap()[2],
            doc! {"$match": {
                "$or": [
                    {"_lookup0.gender": regex("^foo$")},
                    {"_lookup0.gender": regex("^bar$")},
                ]
            }}
        );
    }

    #[test]
    fn chained_search_with_multiple_reference_paths() {
        let q = compiler()
            .convert(&Query::new("AuditEvent", "patient.gender=male"))
            .unwrap();
        assert_eq!(
            q.pipeline.unwrap(),
            vec![
                doc! {"$match": {}},
                doc! {"$lookup": {
                    "from": "patients",
                    "localField": "agent.reference.reference__id",
                    "foreignField": "_id",
                    "as": "_lookup0",
                }},
                doc! {"$lookup": {
                    "from": "patients",
                    "localField": "entity.reference.reference__id",
                    "foreignField": "_id",
                    "as": "_lookup1",
                }},
                doc! {"$match": {
                    "$or": [
                        {"_lookup0.gender": regex("^male$")},
                        {"_lookup1.gender": regex("^male$")},
                    ]
                }},
            ]
        );
    }

    #[test]
    fn chained_search_multiple_paths_and_values_nest_ors() {
        let q = compiler()
            .convert(&Query::new("AuditEvent", "patient.gender=foo,bar"))
            .unwrap();
        assert_eq!(
            q.pipeline.unwrap()[3],
            doc! {"$match": {
                "$or": [
                    {"$or": [
                        {"_lookup0.gender": regex("^foo$")},
                        {"_lookup1.gender": regex("^foo$")},
                    ]},
                    {"$or": [
                        {"_lookup0.gender": regex("^bar$")},
                        {"_lookup1.gender": regex("^bar$")},
                    ]},
                ]
            }}
        );
    }

    #[test]
    fn reverse_chain_builds_pipeline() {
        let q = compiler()
            .convert(&Query::new("Patient", "_has:Observation:subject:code=1234-5"))
            .unwrap();
        assert_eq!(
            q.pipeline.unwrap(),
            vec![
                doc! {"$match": {}},
                doc! {"$lookup": {
                    "from": "observations",
                    "localField": "_id",
                    "foreignField": "subject.reference__id",
                    "as": "_lookup0",
                }},
                doc! {"$match": {"_lookup0.code.coding.code": regex("^1234-5$")}},
            ]
        );
    }

    #[test]
    fn reverse_chain_with_multiple_reference_paths() {
        let q = compiler()
            .convert(&Query::new("Patient", "_has:AuditEvent:patient:outcome=foo"))
            .unwrap();
        let pipeline = q.pipeline.unwrap();
        assert_eq!(pipeline.len(), 4);
        assert_eq!(
            pipeline[1],
            doc! {"$lookup": {
                "from": "auditevents",
                "localField": "_id",
                "foreignField": "agent.reference.reference__id",
                "as": "_lookup0",
            }}
        );
        assert_eq!(
            pipeline[3],
            doc! {"$match": {
                "$or": [
                    {"_lookup0.outcome": regex("^foo$")},
                    {"_lookup1.outcome": regex("^foo$")},
                ]
            }}
        );
    }

    #[test]
    fn number_equality_uses_half_ulp_range() {
        let o = compiler()
            .create_query_object(&Query::new("Immunization", "dose-sequence=1"))
            .unwrap();
        assert_eq!(
            o,
            doc! {
                "vaccinationProtocol": {
                    "$elemMatch": {"doseSequence": {"$gte": 0.5, "$lt": 1.5}}
                }
            }
        );
    }

    #[test]
    fn number_prefixes() {
        let compiler = compiler();
        assert_eq!(
            compiler
                .create_query_object(&Query::new("Immunization", "dose-sequence=lt2"))
                .unwrap(),
            doc! {"vaccinationProtocol.doseSequence": {"$lt": 2.0}}
        );
        assert_eq!(
            compiler
                .create_query_object(&Query::new("Immunization", "dose-sequence=ge0"))
                .unwrap(),
            doc! {"vaccinationProtocol.doseSequence": {"$gte": -0.5}}
        );
        assert_eq!(
            compiler
                .create_query_object(&Query::new("Immunization", "dose-sequence=le2"))
                .unwrap(),
            doc! {"vaccinationProtocol.doseSequence": {"$lte": 2.5}}
        );
        assert_eq!(
            compiler
                .create_query_object(&Query::new("Immunization", "dose-sequence=ne0"))
                .unwrap(),
            doc! {"$or": [
                {"vaccinationProtocol.doseSequence": {"$lt": -0.5}},
                {"vaccinationProtocol.doseSequence": {"$gte": 0.5}},
            ]}
        );
    }

    #[test]
    fn number_rejects_date_prefixes() {
        let err = compiler()
            .create_query_object(&Query::new("Immunization", "dose-sequence=sa1"))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidValue { .. }));
    }

    #[test]
    fn string_search_is_left_anchored() {
        let o = compiler()
            .create_query_object(&Query::new("Device", "manufacturer=Acme"))
            .unwrap();
        assert_eq!(o, doc! {"manufacturer": regex("^Acme")});
    }

    #[test]
    fn human_name_fans_out() {
        let o = compiler()
            .create_query_object(&Query::new("Patient", "name=Peters"))
            .unwrap();
        assert_eq!(
            o,
            doc! {"$or": [
                {"name.text": regex("^Peters")},
                {"name.family": regex("^Peters")},
                {"name.given": regex("^Peters")},
            ]}
        );
    }

    #[test]
    fn address_fans_out() {
        let o = compiler()
            .create_query_object(&Query::new("Patient", "address=AK"))
            .unwrap();
        assert_eq!(
            o,
            doc! {"$or": [
                {"address.text": regex("^AK")},
                {"address.line": regex("^AK")},
                {"address.city": regex("^AK")},
                {"address.state": regex("^AK")},
                {"address.postalCode": regex("^AK")},
                {"address.country": regex("^AK")},
            ]}
        );
    }

    #[test]
    fn date_equality_on_datetime_and_period_paths() {
        let o = compiler()
            .create_query_object(&Query::new("Condition", "onset-date=2012-03-01T07:00-05:00"))
            .unwrap();
        let or = o.get_array("$or").unwrap();
        assert_eq!(or.len(), 2);
        let dt = or[0].as_document().unwrap();
        assert!(dt.get_document("onsetDateTime.__from").unwrap().contains_key("$gte"));
        assert!(dt.get_document("onsetDateTime.__to").unwrap().contains_key("$lte"));
        let period = or[1].as_document().unwrap();
        assert!(period
            .get_document("onsetPeriod.start.__from")
            .unwrap()
            .contains_key("$gte"));
        assert!(period
            .get_document("onsetPeriod.end.__to")
            .unwrap()
            .contains_key("$lte"));
    }

    #[test]
    fn date_gt_includes_open_ended_periods() {
        let o = compiler()
            .create_query_object(&Query::new("Condition", "onset-date=gt2012-03-01T07:00"))
            .unwrap();
        let or = o.get_array("$or").unwrap();
        assert_eq!(or.len(), 3);
        assert!(or[0]
            .as_document()
            .unwrap()
            .get_document("onsetDateTime.__to")
            .unwrap()
            .contains_key("$gt"));
        assert!(or[1]
            .as_document()
            .unwrap()
            .get_document("onsetPeriod.end.__to")
            .unwrap()
            .contains_key("$gt"));
        assert_eq!(
            or[2].as_document().unwrap(),
            &doc! {"onsetPeriod": {"$ne": Bson::Null}, "onsetPeriod.end": Bson::Null}
        );
    }

    #[test]
    fn date_sa_has_no_open_period_clause() {
        let o = compiler()
            .create_query_object(&Query::new("Encounter", "date=sa2012-11-01T08:45"))
            .unwrap();
        assert!(o
            .get_document("period.start.__from")
            .unwrap()
            .contains_key("$gt"));
    }

    #[test]
    fn date_rejects_unsupported_prefix() {
        let err = compiler()
            .create_query_object(&Query::new("Condition", "onset-date=ap2012"))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidValue { .. }));
    }

    #[test]
    fn quantity_requires_system() {
        let err = compiler()
            .create_query_object(&Query::new("Observation", "value-quantity=185||lbs"))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidValue { .. }));
    }

    #[test]
    fn quantity_with_system_and_code() {
        let o = compiler()
            .create_query_object(&Query::new(
                "Observation",
                "value-quantity=185|http://unitsofmeasure.org|[lb_av]",
            ))
            .unwrap();
        assert_eq!(
            o,
            doc! {
                "valueQuantity.value.__from": {"$gte": 184.5},
                "valueQuantity.value.__to": {"$lte": 185.5},
                "valueQuantity.code": regex("^\\[lb_av\\]$"),
                "valueQuantity.system": regex("^http://unitsofmeasure\\.org$"),
            }
        );
    }

    #[test]
    fn uri_matches_exactly() {
        let o = compiler()
            .create_query_object(&Query::new(
                "Subscription",
                "url=https://biliwatch.com/customers/mount-auburn-miu/on-result",
            ))
            .unwrap();
        assert_eq!(
            o,
            doc! {"channel.endpoint": "https://biliwatch.com/customers/mount-auburn-miu/on-result"}
        );
    }

    #[test]
    fn id_is_a_direct_key_match() {
        let o = compiler()
            .create_query_object(&Query::new("Condition", "_id=123456789"))
            .unwrap();
        assert_eq!(o, doc! {"_id": "123456789"});
    }

    #[test]
    fn tag_matches_meta_tags() {
        let o = compiler()
            .create_query_object(&Query::new("Condition", "_tag=foo|bar"))
            .unwrap();
        assert_eq!(
            o,
            doc! {
                "meta.tag": {
                    "$elemMatch": {"system": regex("^foo$"), "code": regex("^bar$")}
                }
            }
        );
    }

    #[test]
    fn multiple_values_or_together() {
        let o = compiler()
            .create_query_object(&Query::new(
                "Condition",
                "code=http://hl7.org/fhir/sid/icd-9|428.0,http://snomed.info/sct|981000124106",
            ))
            .unwrap();
        let or = o.get_array("$or").unwrap();
        assert_eq!(or.len(), 2);
    }

    #[test]
    fn colliding_or_groups_nest_under_and() {
        let o = compiler()
            .create_query_object(&Query::new(
                "Condition",
                "patient=a,b&code=http://x|1,http://y|2",
            ))
            .unwrap();
        assert!(o.get_array("$or").is_ok());
        let and = o.get_array("$and").unwrap();
        assert_eq!(and.len(), 1);
        assert!(and[0].as_document().unwrap().get_array("$or").is_ok());
    }

    #[test]
    fn unsupported_modifier_is_an_error() {
        let err = compiler()
            .create_query_object(&Query::new("Condition", "code:text=headache"))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidModifier { .. }));
    }

    #[test]
    fn missing_modifier_matches_nullability() {
        let o = compiler()
            .create_query_object(&Query::new("Patient", "gender:missing=true"))
            .unwrap();
        assert_eq!(o, doc! {"gender": Bson::Null});

        let o = compiler()
            .create_query_object(&Query::new("Patient", "gender:missing=false"))
            .unwrap();
        assert_eq!(o, doc! {"gender": {"$ne": Bson::Null}});
    }

    #[test]
    fn sort_resolves_paths_and_drops_parallel_arrays() {
        let compiler = compiler();
        let sorts = vec![
            SortDirective { param: "family".to_string(), descending: false },
            SortDirective { param: "given".to_string(), descending: false },
        ];
        let sort = compiler.sort_document("Patient", &sorts).unwrap();
        assert_eq!(sort, doc! {"name.family": 1});

        let sorts = vec![SortDirective { param: "code".to_string(), descending: true }];
        let sort = compiler.sort_document("Condition", &sorts).unwrap();
        assert_eq!(sort, doc! {"code.coding": -1});
    }

    #[test]
    fn build_bson_array_folding() {
        let b = build_bson("a.[]b.c.d.e", doc! {"x": 1, "y": 2});
        assert_eq!(
            b,
            doc! {"a.b": {"$elemMatch": {"c.d.e.x": 1, "c.d.e.y": 2}}}
        );

        let b = build_bson("a.[]b.[]c.d.e", doc! {"x": 1, "y": 2});
        assert_eq!(
            b,
            doc! {"a.b.c": {"$elemMatch": {"d.e.x": 1, "d.e.y": 2}}}
        );

        let b = build_bson("a.[]b.[]c.d.[]e", doc! {"x": 1, "y": 2});
        assert_eq!(
            b,
            doc! {"a.b.c.d.e": {"$elemMatch": {"x": 1, "y": 2}}}
        );
    }
}
