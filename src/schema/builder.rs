//! Pure construction of organization and metric snapshots
//!
//! There is no storage here: the builder takes the previous immutable
//! snapshots plus a list of pending changes and assembles brand-new
//! snapshots, or fails with zero side effects. `build_new_org` /
//! `build_update` are the only points that validate names, mint canonical
//! ids, and bump versions.

use super::{MetricMetadata, OrgMetadata, TimestampPattern};
use crate::naming::{NameGenerator, StopWordValidator};
use crate::schema::FieldType;
use crate::{Error, Result};
use std::collections::BTreeMap;

/// A new typed field to add to a metric.
#[derive(Debug, Clone)]
pub struct FieldDraft {
    name: String,
    ty: FieldType,
    aliases: Vec<String>,
}

impl FieldDraft {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            aliases: Vec::new(),
        }
    }

    /// Construct from a type name, going through the alias table
    /// ("VARCHAR" -> String, "BIGINT" -> Long).
    pub fn typed(name: impl Into<String>, type_name: &str) -> Result<Self> {
        Ok(Self::new(name, FieldType::parse(type_name)?))
    }

    /// Add an extra alias alongside the display name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

/// One pending change to a metric's field registry.
#[derive(Debug, Clone)]
pub enum FieldChange {
    /// Add a new typed field
    Create(FieldDraft),
    /// Append an alias to an existing field (addressed by any current alias)
    AddAlias { field: String, alias: String },
    /// Replace the display name, demoting the old one to a plain alias
    SetDisplayName { field: String, name: String },
    /// Hide the field; it stays live in the physical schema
    SoftDelete { field: String },
    /// Remove the field from the physical schema irreversibly
    HardDelete { field: String },
}

/// Accumulated pending changes for one metric.
///
/// Create drafts require a display name; update drafts bind to an existing
/// metric through the alias given to [`OrgChange::UpdateMetric`] and never
/// require one.
#[derive(Debug, Clone, Default)]
pub struct MetricDraft {
    display_name: Option<String>,
    new_aliases: Vec<String>,
    replace_display_name: Option<String>,
    fields: Vec<FieldChange>,
    timestamp_patterns: Option<Vec<TimestampPattern>>,
    timestamp_aliases: Option<Vec<String>>,
}

impl MetricDraft {
    /// Start a create-path draft with its display name.
    pub fn create(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            ..Self::default()
        }
    }

    /// Start an update-path draft.
    pub fn update() -> Self {
        Self::default()
    }

    /// Append an alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.new_aliases.push(alias.into());
        self
    }

    /// Explicitly replace the display name, demoting the current one.
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.replace_display_name = Some(name.into());
        self
    }

    /// Add a new typed field.
    pub fn field(mut self, draft: FieldDraft) -> Self {
        self.fields.push(FieldChange::Create(draft));
        self
    }

    pub fn with_bool(self, name: impl Into<String>) -> Self {
        self.field(FieldDraft::new(name, FieldType::Bool))
    }

    pub fn with_int(self, name: impl Into<String>) -> Self {
        self.field(FieldDraft::new(name, FieldType::Int))
    }

    pub fn with_long(self, name: impl Into<String>) -> Self {
        self.field(FieldDraft::new(name, FieldType::Long))
    }

    pub fn with_float(self, name: impl Into<String>) -> Self {
        self.field(FieldDraft::new(name, FieldType::Float))
    }

    pub fn with_double(self, name: impl Into<String>) -> Self {
        self.field(FieldDraft::new(name, FieldType::Double))
    }

    pub fn with_bytes(self, name: impl Into<String>) -> Self {
        self.field(FieldDraft::new(name, FieldType::Bytes))
    }

    pub fn with_string(self, name: impl Into<String>) -> Self {
        self.field(FieldDraft::new(name, FieldType::String))
    }

    /// Append an alias to an existing field.
    pub fn field_alias(mut self, field: impl Into<String>, alias: impl Into<String>) -> Self {
        self.fields.push(FieldChange::AddAlias {
            field: field.into(),
            alias: alias.into(),
        });
        self
    }

    /// Replace an existing field's display name.
    pub fn rename_field(mut self, field: impl Into<String>, name: impl Into<String>) -> Self {
        self.fields.push(FieldChange::SetDisplayName {
            field: field.into(),
            name: name.into(),
        });
        self
    }

    /// Soft-delete (hide) a field.
    pub fn soft_delete(mut self, field: impl Into<String>) -> Self {
        self.fields.push(FieldChange::SoftDelete {
            field: field.into(),
        });
        self
    }

    /// Hard-delete a field from the physical schema.
    pub fn hard_delete(mut self, field: impl Into<String>) -> Self {
        self.fields.push(FieldChange::HardDelete {
            field: field.into(),
        });
        self
    }

    /// Replace the metric-level timestamp patterns.
    pub fn timestamp_patterns(mut self, patterns: Vec<TimestampPattern>) -> Self {
        self.timestamp_patterns = Some(patterns);
        self
    }

    /// Replace the field aliases that may carry the record timestamp.
    pub fn timestamp_aliases(mut self, aliases: Vec<String>) -> Self {
        self.timestamp_aliases = Some(aliases);
        self
    }
}

/// One pending change to an organization.
#[derive(Debug, Clone)]
pub enum OrgChange {
    CreateMetric(MetricDraft),
    UpdateMetric { alias: String, draft: MetricDraft },
    /// Tombstone the metric: its alias list is cleared, the canonical id
    /// stays in the registry forever.
    DeleteMetric { alias: String },
    SetTimestampPatterns(Vec<TimestampPattern>),
    SetMetricKeyFields(Vec<String>),
}

/// A metric update paired with the snapshot it was built from, so the store
/// layer can CAS on the previous version.
#[derive(Debug, Clone)]
pub struct MetricUpdate {
    pub previous: MetricMetadata,
    pub next: MetricMetadata,
}

/// Everything one build produced: the next org snapshot plus the metric
/// snapshots to create or update.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub org: OrgMetadata,
    pub created: Vec<MetricMetadata>,
    pub updated: Vec<MetricUpdate>,
}

/// Pure schema construction: naming and uniqueness invariants live here.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    names: NameGenerator,
    validator: StopWordValidator,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validator(validator: StopWordValidator) -> Self {
        Self {
            names: NameGenerator::new(),
            validator,
        }
    }

    /// Build a brand-new organization at version 0.
    pub fn build_new_org(
        &self,
        org_id: &str,
        changes: Vec<OrgChange>,
        now_millis: i64,
    ) -> Result<BuildOutput> {
        let org = OrgMetadata::new(org_id);
        let mut out = self.apply(org, &BTreeMap::new(), changes, now_millis)?;
        out.org.version = 0;
        // A fresh org has nothing to update, only creations
        debug_assert!(out.updated.is_empty());
        Ok(out)
    }

    /// Build the next version of an existing organization.
    ///
    /// `metrics` holds the current snapshot of every metric the changes may
    /// reference, keyed by canonical id. The org version bumps by exactly 1.
    pub fn build_update(
        &self,
        org: &OrgMetadata,
        metrics: &BTreeMap<String, MetricMetadata>,
        changes: Vec<OrgChange>,
        now_millis: i64,
    ) -> Result<BuildOutput> {
        let mut out = self.apply(org.clone(), metrics, changes, now_millis)?;
        out.org.version = org.version + 1;
        Ok(out)
    }

    fn apply(
        &self,
        mut org: OrgMetadata,
        metrics: &BTreeMap<String, MetricMetadata>,
        changes: Vec<OrgChange>,
        now_millis: i64,
    ) -> Result<BuildOutput> {
        // Stop-word screening first, over every new user-visible name the
        // change set introduces, reporting all offenders together.
        self.validator
            .validate_all(new_names(&changes).iter().map(|s| s.as_str()))?;

        let mut created: Vec<MetricMetadata> = Vec::new();
        let mut updated: Vec<MetricUpdate> = Vec::new();

        for change in changes {
            match change {
                OrgChange::CreateMetric(draft) => {
                    let metric = self.create_metric(&mut org, draft, now_millis)?;
                    created.push(metric);
                }
                OrgChange::UpdateMetric { alias, draft } => {
                    let canonical = org
                        .resolve_metric(&alias)
                        .ok_or_else(|| Error::NotFound(format!("metric alias '{}'", alias)))?
                        .to_string();
                    // An earlier change in the same batch may have created or
                    // updated it; fold into that entry so each metric gets
                    // exactly one version bump and one CAS write per commit
                    if let Some(pos) = created.iter().position(|m| m.canonical_id == canonical) {
                        let base = created[pos].clone();
                        let next =
                            self.update_metric(&mut org, &canonical, base, draft, now_millis)?;
                        created[pos] = next;
                    } else if let Some(pos) = updated
                        .iter()
                        .position(|u| u.next.canonical_id == canonical)
                    {
                        let base = updated[pos].next.clone();
                        let next =
                            self.update_metric(&mut org, &canonical, base, draft, now_millis)?;
                        updated[pos].next = next;
                    } else {
                        let previous = metrics.get(&canonical).ok_or_else(|| {
                            Error::NotFound(format!("metric metadata for canonical id '{}'", canonical))
                        })?;
                        let mut next = self.update_metric(
                            &mut org,
                            &canonical,
                            previous.clone(),
                            draft,
                            now_millis,
                        )?;
                        next.version = previous.version + 1;
                        updated.push(MetricUpdate {
                            previous: previous.clone(),
                            next,
                        });
                    }
                }
                OrgChange::DeleteMetric { alias } => {
                    let canonical = org
                        .resolve_metric(&alias)
                        .ok_or_else(|| Error::NotFound(format!("metric alias '{}'", alias)))?
                        .to_string();
                    // Tombstone: clear the alias list, keep the key forever
                    org.metric_registry.insert(canonical, Vec::new());
                }
                OrgChange::SetTimestampPatterns(patterns) => {
                    org.timestamp_patterns = patterns;
                }
                OrgChange::SetMetricKeyFields(fields) => {
                    org.metric_key_fields = fields;
                }
            }
        }

        Ok(BuildOutput {
            org,
            created,
            updated,
        })
    }

    fn create_metric(
        &self,
        org: &mut OrgMetadata,
        draft: MetricDraft,
        now_millis: i64,
    ) -> Result<MetricMetadata> {
        let display_name = draft.display_name.clone().ok_or_else(|| {
            Error::Config("metric create requires a display name before build".to_string())
        })?;

        let canonical = self
            .names
            .unused_id(
                |g| g.metric_id(),
                &|candidate| org.metric_registry.contains_key(candidate),
            )
            .ok_or_else(|| {
                Error::Internal("exhausted canonical metric id attempts".to_string())
            })?;

        let mut aliases = vec![display_name];
        aliases.extend(draft.new_aliases.iter().cloned());
        for alias in &aliases {
            if org.alias_in_use(alias) {
                return Err(Error::AlreadyExists(format!(
                    "metric alias '{}' in org '{}'",
                    alias, org.org_id
                )));
            }
        }
        if has_duplicates(&aliases) {
            return Err(Error::AlreadyExists(format!(
                "duplicate alias within metric '{}'",
                aliases[0]
            )));
        }

        org.metric_registry.insert(canonical.clone(), aliases);

        let mut metric = MetricMetadata::new(org.org_id.clone(), canonical.clone());
        self.apply_field_changes(&mut metric, &draft.fields, now_millis)?;
        if let Some(patterns) = draft.timestamp_patterns {
            metric.timestamp_patterns = patterns;
        }
        if let Some(ts_aliases) = draft.timestamp_aliases {
            metric.timestamp_aliases = ts_aliases;
        }

        // Explicit display-name replace on the create path demotes the name
        // the draft was opened with
        if let Some(name) = draft.replace_display_name {
            self.replace_metric_display_name(org, &canonical, name)?;
        }

        Ok(metric)
    }

    fn update_metric(
        &self,
        org: &mut OrgMetadata,
        canonical: &str,
        base: MetricMetadata,
        draft: MetricDraft,
        now_millis: i64,
    ) -> Result<MetricMetadata> {
        // Update path: withName-style calls append
        let mut appends = draft.new_aliases.clone();
        if let Some(name) = draft.display_name.clone() {
            appends.insert(0, name);
        }
        for alias in appends {
            if org.alias_in_use(&alias) {
                return Err(Error::AlreadyExists(format!(
                    "metric alias '{}' in org '{}'",
                    alias, org.org_id
                )));
            }
            org.metric_registry
                .get_mut(canonical)
                .ok_or_else(|| Error::NotFound(format!("canonical metric id '{}'", canonical)))?
                .push(alias);
        }

        if let Some(name) = draft.replace_display_name {
            self.replace_metric_display_name(org, canonical, name)?;
        }

        let mut metric = base;
        self.apply_field_changes(&mut metric, &draft.fields, now_millis)?;
        if let Some(patterns) = draft.timestamp_patterns {
            metric.timestamp_patterns = patterns;
        }
        if let Some(ts_aliases) = draft.timestamp_aliases {
            metric.timestamp_aliases = ts_aliases;
        }
        Ok(metric)
    }

    fn replace_metric_display_name(
        &self,
        org: &mut OrgMetadata,
        canonical: &str,
        name: String,
    ) -> Result<()> {
        match org.resolve_metric(&name) {
            Some(owner) if owner == canonical => {
                // Promoting an existing alias of the same metric
                let aliases = org
                    .metric_registry
                    .get_mut(canonical)
                    .ok_or_else(|| Error::NotFound(format!("canonical metric id '{}'", canonical)))?;
                aliases.retain(|a| a != &name);
                aliases.insert(0, name);
            }
            Some(_) => {
                return Err(Error::AlreadyExists(format!(
                    "metric alias '{}' in org '{}'",
                    name, org.org_id
                )));
            }
            None => {
                let aliases = org
                    .metric_registry
                    .get_mut(canonical)
                    .ok_or_else(|| Error::NotFound(format!("canonical metric id '{}'", canonical)))?;
                // Old display name stays on as a plain alias
                aliases.insert(0, name);
            }
        }
        Ok(())
    }

    fn apply_field_changes(
        &self,
        metric: &mut MetricMetadata,
        changes: &[FieldChange],
        now_millis: i64,
    ) -> Result<()> {
        for change in changes {
            match change {
                FieldChange::Create(draft) => {
                    let canonical = self
                        .names
                        .unused_id(
                            |g| g.field_id(),
                            &|candidate| metric.field_registry.contains_key(candidate),
                        )
                        .ok_or_else(|| {
                            Error::Internal("exhausted canonical field id attempts".to_string())
                        })?;

                    let mut aliases = vec![draft.name.clone()];
                    aliases.extend(draft.aliases.iter().cloned());
                    for alias in &aliases {
                        if metric.alias_in_use(alias) {
                            return Err(Error::AlreadyExists(format!(
                                "field alias '{}' in metric '{}'",
                                alias, metric.canonical_id
                            )));
                        }
                    }
                    if has_duplicates(&aliases) {
                        return Err(Error::AlreadyExists(format!(
                            "duplicate alias within field '{}'",
                            draft.name
                        )));
                    }

                    metric.field_registry.insert(canonical.clone(), aliases);
                    metric.physical_schema.insert(canonical, draft.ty);
                }
                FieldChange::AddAlias { field, alias } => {
                    let canonical = self.resolve_field(metric, field)?;
                    if metric.alias_in_use(alias) {
                        return Err(Error::AlreadyExists(format!(
                            "field alias '{}' in metric '{}'",
                            alias, metric.canonical_id
                        )));
                    }
                    metric
                        .field_registry
                        .get_mut(&canonical)
                        .ok_or_else(|| Error::NotFound(format!("canonical field id '{}'", canonical)))?
                        .push(alias.clone());
                }
                FieldChange::SetDisplayName { field, name } => {
                    let canonical = self.resolve_field(metric, field)?;
                    match metric.resolve_field(name).map(str::to_string) {
                        Some(owner) if owner == canonical => {
                            let aliases = metric.field_registry.get_mut(&canonical).ok_or_else(
                                || Error::NotFound(format!("canonical field id '{}'", canonical)),
                            )?;
                            aliases.retain(|a| a != name);
                            aliases.insert(0, name.clone());
                        }
                        Some(_) => {
                            return Err(Error::AlreadyExists(format!(
                                "field alias '{}' in metric '{}'",
                                name, metric.canonical_id
                            )));
                        }
                        None => {
                            let aliases = metric.field_registry.get_mut(&canonical).ok_or_else(
                                || Error::NotFound(format!("canonical field id '{}'", canonical)),
                            )?;
                            aliases.insert(0, name.clone());
                        }
                    }
                }
                FieldChange::SoftDelete { field } => {
                    let canonical = self.resolve_field(metric, field)?;
                    metric.hidden_fields.insert(canonical, now_millis);
                }
                FieldChange::HardDelete { field } => {
                    let canonical = self.resolve_field(metric, field)?;
                    // Tombstone keeps the canonical id unusable forever
                    metric.field_registry.insert(canonical.clone(), Vec::new());
                    metric.physical_schema.remove(&canonical);
                    metric.hidden_fields.remove(&canonical);
                }
            }
        }
        Ok(())
    }

    fn resolve_field(&self, metric: &MetricMetadata, alias: &str) -> Result<String> {
        metric
            .resolve_field(alias)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "field alias '{}' in metric '{}'",
                    alias, metric.canonical_id
                ))
            })
    }
}

/// Every new user-visible name a change set introduces, for stop-word
/// screening.
fn new_names(changes: &[OrgChange]) -> Vec<String> {
    let mut names = Vec::new();
    for change in changes {
        let draft = match change {
            OrgChange::CreateMetric(draft) => draft,
            OrgChange::UpdateMetric { draft, .. } => draft,
            _ => continue,
        };
        names.extend(draft.display_name.iter().cloned());
        names.extend(draft.new_aliases.iter().cloned());
        names.extend(draft.replace_display_name.iter().cloned());
        for field in &draft.fields {
            match field {
                FieldChange::Create(f) => {
                    names.push(f.name.clone());
                    names.extend(f.aliases.iter().cloned());
                }
                FieldChange::AddAlias { alias, .. } => names.push(alias.clone()),
                FieldChange::SetDisplayName { name, .. } => names.push(name.clone()),
                _ => {}
            }
        }
    }
    names
}

fn has_duplicates(names: &[String]) -> bool {
    let mut seen = std::collections::HashSet::new();
    names.iter().any(|n| !seen.insert(n.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_acme() -> BuildOutput {
        let builder = SchemaBuilder::new();
        builder
            .build_new_org(
                "acme",
                vec![OrgChange::CreateMetric(
                    MetricDraft::create("pageview")
                        .alias("pv")
                        .field(FieldDraft::new("url", FieldType::String).alias("u"))
                        .with_long("count"),
                )],
                0,
            )
            .unwrap()
    }

    fn metrics_by_id(out: &BuildOutput) -> BTreeMap<String, MetricMetadata> {
        out.created
            .iter()
            .chain(out.updated.iter().map(|u| &u.next))
            .map(|m| (m.canonical_id.clone(), m.clone()))
            .collect()
    }

    #[test]
    fn test_new_org_mints_canonical_ids() {
        let out = build_acme();
        assert_eq!(out.org.version, 0);
        assert_eq!(out.created.len(), 1);

        let metric = &out.created[0];
        assert!(metric.canonical_id.starts_with("_m"));
        assert_eq!(out.org.resolve_metric("pageview"), Some(metric.canonical_id.as_str()));
        assert_eq!(out.org.resolve_metric("pv"), Some(metric.canonical_id.as_str()));

        let url = metric.resolve_field("url").unwrap();
        assert!(url.starts_with("_f"));
        assert_eq!(metric.resolve_field("u"), Some(url));
        assert_eq!(metric.declared_type(url), Some(FieldType::String));
    }

    #[test]
    fn test_create_requires_display_name() {
        let builder = SchemaBuilder::new();
        let err = builder
            .build_new_org(
                "acme",
                vec![OrgChange::CreateMetric(MetricDraft::update())],
                0,
            )
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_org_wide_alias_collision_fails() {
        let builder = SchemaBuilder::new();
        let err = builder
            .build_new_org(
                "acme",
                vec![
                    OrgChange::CreateMetric(MetricDraft::create("pageview")),
                    OrgChange::CreateMetric(MetricDraft::create("click").alias("pageview")),
                ],
                0,
            )
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[test]
    fn test_field_alias_collision_fails() {
        let builder = SchemaBuilder::new();
        let err = builder
            .build_new_org(
                "acme",
                vec![OrgChange::CreateMetric(
                    MetricDraft::create("pageview")
                        .with_string("url")
                        .field(FieldDraft::new("path", FieldType::String).alias("url")),
                )],
                0,
            )
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[test]
    fn test_stop_words_collected_across_whole_build() {
        let builder = SchemaBuilder::new();
        let err = builder
            .build_new_org(
                "acme",
                vec![OrgChange::CreateMetric(
                    MetricDraft::create("pageview")
                        .with_string("_f1")
                        .with_long("_m2"),
                )],
                0,
            )
            .unwrap_err();
        match err {
            Error::ReservedName(names) => {
                assert_eq!(names, vec!["_f1".to_string(), "_m2".to_string()]);
            }
            e => panic!("expected ReservedName, got: {:?}", e),
        }
    }

    #[test]
    fn test_base_member_field_name_rejected() {
        // A field named after a base sub-record member could never receive a
        // value at encode time, so the build must refuse it outright
        let builder = SchemaBuilder::new();
        let err = builder
            .build_new_org(
                "acme",
                vec![OrgChange::CreateMetric(
                    MetricDraft::create("pageview").with_long("timestamp"),
                )],
                0,
            )
            .unwrap_err();
        match err {
            Error::ReservedName(names) => assert_eq!(names, vec!["timestamp".to_string()]),
            e => panic!("expected ReservedName, got: {:?}", e),
        }
    }

    #[test]
    fn test_rename_keeps_canonical_and_demotes_old_display() {
        let out = build_acme();
        let builder = SchemaBuilder::new();
        let canonical = out.created[0].canonical_id.clone();

        let next = builder
            .build_update(
                &out.org,
                &metrics_by_id(&out),
                vec![OrgChange::UpdateMetric {
                    alias: "pv".to_string(),
                    draft: MetricDraft::update().display_name("page_view"),
                }],
                0,
            )
            .unwrap();

        assert_eq!(next.org.version, 1);
        assert_eq!(next.org.resolve_metric("page_view"), Some(canonical.as_str()));
        // Old display name survives as a plain alias
        assert_eq!(next.org.resolve_metric("pageview"), Some(canonical.as_str()));
        assert_eq!(next.org.metric_display_name(&canonical), Some("page_view"));
    }

    #[test]
    fn test_update_unknown_alias_is_not_found() {
        let out = build_acme();
        let builder = SchemaBuilder::new();
        let err = builder
            .build_update(
                &out.org,
                &metrics_by_id(&out),
                vec![OrgChange::UpdateMetric {
                    alias: "nope".to_string(),
                    draft: MetricDraft::update().alias("n"),
                }],
                0,
            )
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_delete_metric_leaves_tombstone() {
        let out = build_acme();
        let builder = SchemaBuilder::new();
        let canonical = out.created[0].canonical_id.clone();

        let next = builder
            .build_update(
                &out.org,
                &metrics_by_id(&out),
                vec![OrgChange::DeleteMetric {
                    alias: "pageview".to_string(),
                }],
                0,
            )
            .unwrap();

        assert!(next.org.is_tombstoned(&canonical));
        assert_eq!(next.org.resolve_metric("pageview"), None);
        // Key survives so the id is never reused
        assert!(next.org.metric_registry.contains_key(&canonical));
    }

    #[test]
    fn test_soft_delete_keeps_field_live() {
        let out = build_acme();
        let builder = SchemaBuilder::new();

        let next = builder
            .build_update(
                &out.org,
                &metrics_by_id(&out),
                vec![OrgChange::UpdateMetric {
                    alias: "pageview".to_string(),
                    draft: MetricDraft::update().soft_delete("url"),
                }],
                1234,
            )
            .unwrap();

        let metric = &next.updated[0].next;
        let canonical = metric.resolve_field("url").unwrap().to_string();
        assert!(metric.is_hidden(&canonical));
        assert_eq!(metric.hidden_fields[&canonical], 1234);
        assert_eq!(metric.declared_type(&canonical), Some(FieldType::String));
        assert_eq!(metric.version, 1);
    }

    #[test]
    fn test_hard_delete_removes_from_physical_schema() {
        let out = build_acme();
        let builder = SchemaBuilder::new();
        let canonical = out.created[0].resolve_field("url").unwrap().to_string();

        let next = builder
            .build_update(
                &out.org,
                &metrics_by_id(&out),
                vec![OrgChange::UpdateMetric {
                    alias: "pageview".to_string(),
                    draft: MetricDraft::update().hard_delete("url"),
                }],
                0,
            )
            .unwrap();

        let metric = &next.updated[0].next;
        assert_eq!(metric.resolve_field("url"), None);
        assert_eq!(metric.declared_type(&canonical), None);
        // Tombstone stays so the canonical id is never minted again
        assert!(metric.field_registry.contains_key(&canonical));
    }

    #[test]
    fn test_two_updates_to_same_metric_fold_into_one() {
        let out = build_acme();
        let builder = SchemaBuilder::new();
        let next = builder
            .build_update(
                &out.org,
                &metrics_by_id(&out),
                vec![
                    OrgChange::UpdateMetric {
                        alias: "pageview".to_string(),
                        draft: MetricDraft::update().display_name("page_view"),
                    },
                    OrgChange::UpdateMetric {
                        alias: "page_view".to_string(),
                        draft: MetricDraft::update().rename_field("url", "page_url"),
                    },
                ],
                0,
            )
            .unwrap();

        // One CAS write, one version bump, both changes present
        assert_eq!(next.updated.len(), 1);
        let metric = &next.updated[0].next;
        assert_eq!(metric.version, 1);
        assert!(metric.resolve_field("page_url").is_some());
        assert_eq!(
            next.org.metric_display_name(&metric.canonical_id),
            Some("page_view")
        );
    }

    #[test]
    fn test_version_bumps_by_exactly_one() {
        let out = build_acme();
        let builder = SchemaBuilder::new();
        let next = builder
            .build_update(
                &out.org,
                &metrics_by_id(&out),
                vec![OrgChange::SetMetricKeyFields(vec!["metrictype".to_string()])],
                0,
            )
            .unwrap();
        assert_eq!(next.org.version, out.org.version + 1);
    }

    #[test]
    fn test_failed_build_has_no_partial_output() {
        let out = build_acme();
        let builder = SchemaBuilder::new();
        // Second change collides; the whole build must fail
        let err = builder
            .build_update(
                &out.org,
                &metrics_by_id(&out),
                vec![
                    OrgChange::CreateMetric(MetricDraft::create("click")),
                    OrgChange::CreateMetric(MetricDraft::create("pv")),
                ],
                0,
            )
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        // Original snapshot untouched
        assert_eq!(out.org.resolve_metric("click"), None);
    }
}
