//! Logical-to-physical record encoding and back

use super::{BaseFields, EncodedRecord, FieldSlot, LogicalRecord, TimestampResolver};
use crate::clock::Clock;
use crate::naming::StopWordValidator;
use crate::schema::{
    value_to_string, FieldValue, BASE_ALIAS_NAME, BASE_WRITE_TIME, METRIC_TYPE_FIELD,
    ORG_KEY_FIELD, TIMESTAMP_FIELD,
};
use crate::store::StoreClerk;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Encodes logical records against one org's committed schemas and
/// translates physical records back into alias-addressable form.
///
/// The encoder never retries internally; every failure is per-record and
/// the caller decides skip/dead-letter/retry.
pub struct RecordEncoder {
    clerk: StoreClerk,
    resolver: TimestampResolver,
    validator: StopWordValidator,
    clock: Arc<dyn Clock>,
}

impl RecordEncoder {
    pub fn new(clerk: StoreClerk, clock: Arc<dyn Clock>) -> Self {
        Self {
            clerk,
            resolver: TimestampResolver::new(),
            validator: StopWordValidator::new(),
            clock,
        }
    }

    pub fn with_validator(mut self, validator: StopWordValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn clerk(&self) -> &StoreClerk {
        &self.clerk
    }

    /// Encode one logical record against its metric's physical schema.
    pub fn encode(&self, record: &LogicalRecord) -> Result<EncodedRecord> {
        // Preconditions, before any schema lookup
        let org_id = record
            .get(ORG_KEY_FIELD)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                Error::MalformedRecord(format!("record is missing an org id under '{}'", ORG_KEY_FIELD))
            })?;
        if org_id != self.clerk.org().org_id {
            return Err(Error::NotFound(format!("organization '{}'", org_id)));
        }

        let (metric_key, alias) = self.metric_value(record)?;
        let metric = self.clerk.metric(&alias)?;

        let timestamp_key = self.resolver.timestamp_key(record, metric);
        let reserved = [ORG_KEY_FIELD, metric_key.as_str(), timestamp_key];

        // Stop-word screening over every candidate user key, all offenders
        // reported together; nothing partial escapes on failure.
        self.validator.validate_all(
            record
                .keys()
                .map(|k| k.as_str())
                .filter(|k| !reserved.contains(k)),
        )?;

        // One nullable slot per known canonical field
        let mut fields: BTreeMap<String, Option<FieldSlot>> = metric
            .physical_schema
            .keys()
            .map(|canonical| (canonical.clone(), None))
            .collect();
        let mut unknown_fields = BTreeMap::new();

        for (key, value) in record {
            if reserved.contains(&key.as_str()) {
                continue;
            }
            match metric
                .resolve_field(key)
                .and_then(|canonical| metric.declared_type(canonical).map(|ty| (canonical, ty)))
            {
                Some((canonical, ty)) => {
                    let coerced = FieldValue::coerce(value, ty)?;
                    fields.insert(
                        canonical.to_string(),
                        Some(FieldSlot {
                            display_name: key.clone(),
                            value: coerced,
                        }),
                    );
                }
                None => {
                    // Unresolved input is captured, never dropped
                    unknown_fields.insert(key.clone(), value_to_string(value));
                }
            }
        }

        let timestamp = self
            .resolver
            .resolve(record, metric, self.clerk.org())?;

        debug!(
            org_id,
            metric = metric.canonical_id,
            alias_name = alias,
            unknown = unknown_fields.len(),
            "encoded record"
        );

        Ok(EncodedRecord {
            org_id: org_id.to_string(),
            metric_canonical_id: metric.canonical_id.clone(),
            base: BaseFields {
                timestamp,
                write_time: self.clock.now_millis(),
                alias_name: alias,
                unknown_fields,
            },
            fields,
        })
    }

    /// Rebuild an alias-addressable logical view of an encoded record.
    ///
    /// Base fields pass through untranslated; unknown fields come back
    /// verbatim as strings. Each populated slot keys on the alias it was
    /// encoded under, provided the metric's alias map still owns it,
    /// falling back to the field's current display name after a rename.
    pub fn translate(&self, encoded: &EncodedRecord) -> Result<LogicalRecord> {
        let metric = self.clerk.metric_by_canonical(&encoded.metric_canonical_id)?;

        let mut out = LogicalRecord::new();
        out.insert(
            TIMESTAMP_FIELD.to_string(),
            serde_json::json!(encoded.base.timestamp),
        );
        out.insert(
            BASE_WRITE_TIME.to_string(),
            serde_json::json!(encoded.base.write_time),
        );
        out.insert(
            BASE_ALIAS_NAME.to_string(),
            serde_json::Value::String(encoded.base.alias_name.clone()),
        );
        for (key, value) in &encoded.base.unknown_fields {
            out.insert(key.clone(), serde_json::Value::String(value.clone()));
        }

        for (canonical, slot) in &encoded.fields {
            let Some(slot) = slot else { continue };
            let key = match metric.resolve_field(&slot.display_name) {
                Some(owner) if owner == canonical => slot.display_name.clone(),
                _ => metric
                    .field_display_name(canonical)
                    .unwrap_or(slot.display_name.as_str())
                    .to_string(),
            };
            out.insert(key, slot.value.to_json());
        }

        Ok(out)
    }

    /// The metric alias carried by the record, with the key that supplied
    /// it. Org-configured metric-key candidates are checked in declared
    /// order before the default metric-type field.
    fn metric_value(&self, record: &LogicalRecord) -> Result<(String, String)> {
        let candidates = self
            .clerk
            .metric_key_fields()
            .iter()
            .map(|s| s.as_str())
            .chain(std::iter::once(METRIC_TYPE_FIELD));

        for key in candidates {
            if let Some(value) = record.get(key).and_then(|v| v.as_str()) {
                return Ok((key.to_string(), value.to_string()));
            }
        }
        Err(Error::MalformedRecord(format!(
            "record is missing a metric value under '{}'",
            METRIC_TYPE_FIELD
        )))
    }
}
