//! Full document encoding
//!
//! # Format
//!
//! ```text
//! document   [class name: text][field count: varint]
//!            ([name: text][tag: byte | 0xFF][value])*count
//! ```
//!
//! Tombstoned fields are skipped. A null tag carries no value bytes. The
//! empty class name stands for "no class".
//!
//! Field types resolve in order: the type the entry was set or decoded with,
//! the schema's declared type, the type inferred from the value. Collection
//! element types come from the schema's linked type when declared and are
//! inferred per element otherwise.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use docwire_core::{
    Document, EmbeddedList, EmbeddedMap, EmbeddedSet, Error, FieldEntry, LinkList, LinkMap,
    LinkSet, Result, TypeTag, Value,
};

use crate::links::{read_link, read_link_bag, read_record_id, write_link, write_link_bag};
use crate::tags::{read_tag, write_tag};
use crate::wire::{WireReader, WireWriter};
use crate::DocumentCodec;

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// Resolved type of a field: its tag and, for collections, the element tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldType {
    pub tag: Option<TypeTag>,
    pub linked: Option<TypeTag>,
}

fn unsupported(value: &Value, tag: TypeTag) -> Error {
    Error::UnsupportedType(format!("{} value cannot be written as {}", value.type_name(), tag))
}

impl DocumentCodec {
    pub(crate) fn field_type(&self, doc: &Document, name: &str, entry: &FieldEntry) -> FieldType {
        let declared = self.schema.resolve(doc.class_name(), name);
        let tag = entry
            .declared_type()
            .or(declared.map(|d| d.tag))
            .or_else(|| entry.value().map(Value::type_tag));
        FieldType {
            tag,
            linked: declared.and_then(|d| d.linked),
        }
    }

    pub(crate) fn write_document(&self, w: &mut WireWriter, doc: &Document) -> Result<()> {
        w.write_text(doc.class_name().unwrap_or(""));
        w.write_len(doc.len());
        for (name, entry) in doc.fields() {
            w.write_text(name);
            let field_type = self.field_type(doc, name, entry);
            self.write_field_value(w, entry.value(), field_type)?;
        }
        Ok(())
    }

    /// Tag plus payload; null values get the null tag only.
    pub(crate) fn write_field_value(
        &self,
        w: &mut WireWriter,
        value: Option<&Value>,
        field_type: FieldType,
    ) -> Result<()> {
        match (value, field_type.tag) {
            (Some(value), Some(tag)) => {
                write_tag(w, Some(tag));
                self.write_value(w, value, tag, field_type.linked)
            }
            _ => {
                write_tag(w, None);
                Ok(())
            }
        }
    }

    /// Collection element: tag from `linked` when given, inferred otherwise.
    pub(crate) fn write_element(
        &self,
        w: &mut WireWriter,
        element: &Option<Value>,
        linked: Option<TypeTag>,
    ) -> Result<()> {
        match element {
            Some(value) => {
                let tag = linked.unwrap_or_else(|| value.type_tag());
                write_tag(w, Some(tag));
                self.write_value(w, value, tag, None)
            }
            None => {
                write_tag(w, None);
                Ok(())
            }
        }
    }

    pub(crate) fn write_value(
        &self,
        w: &mut WireWriter,
        value: &Value,
        tag: TypeTag,
        linked: Option<TypeTag>,
    ) -> Result<()> {
        match (tag, value) {
            (TypeTag::Integer, _) => {
                let v = value.as_i64().ok_or_else(|| unsupported(value, tag))?;
                i32::try_from(v).map_err(|_| unsupported(value, tag))?;
                w.write_varint(v);
            }
            (TypeTag::Short, _) => {
                let v = value.as_i64().ok_or_else(|| unsupported(value, tag))?;
                i16::try_from(v).map_err(|_| unsupported(value, tag))?;
                w.write_varint(v);
            }
            (TypeTag::Long, _) => {
                let v = value.as_i64().ok_or_else(|| unsupported(value, tag))?;
                w.write_varint(v);
            }
            (TypeTag::String, Value::String(s)) => w.write_text(s),
            (TypeTag::Double, Value::Double(v)) => w.write_f64(*v),
            (TypeTag::Double, Value::Float(v)) => w.write_f64(f64::from(*v)),
            (TypeTag::Float, Value::Float(v)) => w.write_f32(*v),
            (TypeTag::Byte, Value::Byte(v)) => w.write_u8(*v),
            (TypeTag::Boolean, Value::Boolean(v)) => w.write_bool(*v),
            (TypeTag::DateTime, Value::DateTime(ms) | Value::Date(ms)) => w.write_varint(*ms),
            (TypeTag::Date, Value::Date(ms) | Value::DateTime(ms)) => {
                let days = self.date_to_days(*ms)?;
                w.write_varint(days);
            }
            (TypeTag::Decimal, Value::Decimal(d)) => w.write_decimal(*d),
            (TypeTag::Binary, Value::Binary(bytes)) => w.write_bytes(bytes),
            (TypeTag::Embedded, Value::Embedded(doc)) => self.write_document(w, doc)?,
            (TypeTag::EmbeddedList, Value::EmbeddedList(list)) => {
                w.write_len(list.len());
                for element in list {
                    self.write_element(w, element, linked)?;
                }
            }
            (TypeTag::EmbeddedSet, Value::EmbeddedSet(set)) => {
                w.write_len(set.len());
                for element in set {
                    self.write_element(w, element, linked)?;
                }
            }
            (TypeTag::EmbeddedMap, Value::EmbeddedMap(map)) => {
                w.write_len(map.len());
                for (key, element) in map {
                    w.write_text(key);
                    self.write_element(w, element, linked)?;
                }
            }
            (TypeTag::Link, Value::Link(rid)) => write_link(w, Some(*rid)),
            (TypeTag::LinkList, Value::LinkList(list)) => {
                w.write_len(list.len());
                for link in list {
                    write_link(w, *link);
                }
            }
            (TypeTag::LinkSet, Value::LinkSet(set)) => {
                w.write_len(set.len());
                for link in set {
                    write_link(w, *link);
                }
            }
            (TypeTag::LinkMap, Value::LinkMap(map)) => {
                w.write_len(map.len());
                for (key, link) in map {
                    w.write_text(key);
                    write_link(w, *link);
                }
            }
            (TypeTag::LinkBag, Value::LinkBag(bag)) => write_link_bag(
                w,
                bag,
                self.config.link_bag_threshold,
                self.sync_registry.as_ref(),
            )?,
            (TypeTag::Custom, Value::Custom(custom)) => {
                w.write_text(custom.type_key());
                w.write_bytes(&custom.to_stream());
            }
            _ => return Err(unsupported(value, tag)),
        }
        Ok(())
    }

    pub(crate) fn read_document(&self, r: &mut WireReader<'_>) -> Result<Document> {
        let class_name = r.read_text()?;
        let mut doc = if class_name.is_empty() {
            Document::new()
        } else {
            Document::with_class(class_name)
        };
        let count = r.read_len()?;
        for _ in 0..count {
            let name_at = r.position();
            let name = r.read_text()?;
            if doc.entry(&name).is_some() {
                return Err(Error::malformed(
                    name_at,
                    format!("duplicate field '{}'", name),
                ));
            }
            let tag = read_tag(r)?;
            let value = match tag {
                Some(tag) => Some(self.read_value(r, tag)?),
                None => None,
            };
            doc.load_field(name, value, tag);
        }
        Ok(doc)
    }

    pub(crate) fn read_element(&self, r: &mut WireReader<'_>) -> Result<Option<Value>> {
        match read_tag(r)? {
            Some(tag) => Ok(Some(self.read_value(r, tag)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn read_value(&self, r: &mut WireReader<'_>, tag: TypeTag) -> Result<Value> {
        let value = match tag {
            TypeTag::Integer => Value::Integer(r.read_i32_varint()?),
            TypeTag::Short => Value::Short(r.read_i16_varint()?),
            TypeTag::Long => Value::Long(r.read_varint()?),
            TypeTag::String => Value::String(r.read_text()?),
            TypeTag::Double => Value::Double(r.read_f64()?),
            TypeTag::Float => Value::Float(r.read_f32()?),
            TypeTag::Byte => Value::Byte(r.read_u8()?),
            TypeTag::Boolean => Value::Boolean(r.read_bool()?),
            TypeTag::DateTime => Value::DateTime(r.read_varint()?),
            TypeTag::Date => {
                let start = r.position();
                let days = r.read_varint()?;
                Value::Date(self.days_to_date(days).map_err(|detail| Error::malformed(start, detail))?)
            }
            TypeTag::Decimal => Value::Decimal(r.read_decimal()?),
            TypeTag::Binary => Value::Binary(r.read_bytes()?),
            TypeTag::Embedded => Value::Embedded(self.read_document(r)?),
            TypeTag::EmbeddedList => {
                let count = r.read_len()?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read_element(r)?);
                }
                Value::EmbeddedList(EmbeddedList::from_items(items))
            }
            TypeTag::EmbeddedSet => {
                let count = r.read_len()?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read_element(r)?);
                }
                Value::EmbeddedSet(EmbeddedSet::from_items(items))
            }
            TypeTag::EmbeddedMap => {
                let count = r.read_len()?;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let key = r.read_text()?;
                    entries.push((key, self.read_element(r)?));
                }
                Value::EmbeddedMap(EmbeddedMap::from_entries(entries))
            }
            TypeTag::Link => Value::Link(read_record_id(r)?),
            TypeTag::LinkList => {
                let count = r.read_len()?;
                let mut links = Vec::with_capacity(count);
                for _ in 0..count {
                    links.push(read_link(r)?);
                }
                Value::LinkList(LinkList::from_items(links))
            }
            TypeTag::LinkSet => {
                let count = r.read_len()?;
                let mut links = Vec::with_capacity(count);
                for _ in 0..count {
                    links.push(read_link(r)?);
                }
                Value::LinkSet(LinkSet::from_items(links))
            }
            TypeTag::LinkMap => {
                let count = r.read_len()?;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let key = r.read_text()?;
                    entries.push((key, read_link(r)?));
                }
                Value::LinkMap(LinkMap::from_entries(entries))
            }
            TypeTag::LinkBag => Value::LinkBag(read_link_bag(r)?),
            TypeTag::Custom => {
                let type_key = r.read_text()?;
                let payload = r.read_bytes()?;
                Value::Custom(self.custom_types.instantiate(&type_key, &payload)?)
            }
        };
        Ok(value)
    }

    /// Days since 1970-01-01 of the calendar date of `millis` in the database time zone.
    pub(crate) fn date_to_days(&self, millis: i64) -> Result<i64> {
        let instant = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
            Error::UnsupportedType(format!("date {} ms is out of range", millis))
        })?;
        let date = instant.with_timezone(&self.time_zone).date_naive();
        Ok(i64::from(date.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE)
    }

    /// Epoch millis of midnight, in the database time zone, `days` after 1970-01-01.
    pub(crate) fn days_to_date(&self, days: i64) -> std::result::Result<i64, String> {
        let out_of_range = || format!("date {} days is out of range", days);
        let days_from_ce = days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(|d| i32::try_from(d).ok())
            .ok_or_else(out_of_range)?;
        let midnight = NaiveDate::from_num_days_from_ce_opt(days_from_ce)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or_else(out_of_range)?;
        self.time_zone
            .from_local_datetime(&midnight)
            .single()
            .map(|dt| dt.timestamp_millis())
            .ok_or_else(out_of_range)
    }
}
