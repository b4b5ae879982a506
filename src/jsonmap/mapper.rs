//! Schema-driven mapping between JSON text and application storage.
//!
//! A [`Mapper`] owns one memory strategy and drives the two symmetric
//! operations: `serialize` walks a schema and prints the resulting document
//! tree, `parse` builds a tree from text and copies matching values into
//! the schema's bound storage. The tree only lives for the duration of one
//! call; by the time either operation returns, all strategy memory is back
//! where it came from (or, for an arena, ready to be reset by the next
//! call).

use crate::jsonmap::doc::{parse, print, Document, NodeRef, Value};
use crate::jsonmap::error::Error;
use crate::jsonmap::mem::hooks::Hooks;
use crate::jsonmap::mem::MemoryContext;
use crate::jsonmap::schema::{Field, Slot};
use crate::jsonmap::types::{Format, ParseMode};

/// Mapping engine bound to one memory strategy.
///
/// Construct one per concurrent JSON workload; instances are independent
/// and hold no global state.
pub struct Mapper<'b> {
    mem: MemoryContext<'b>,
}

impl<'b> Mapper<'b> {
    /// Runs all document allocations through a first-fit pool carved out
    /// of `buf`. Suited to long-lived mappers: freed blocks are reused and
    /// coalesced between operations.
    pub fn pool(buf: &'b mut [u8]) -> Result<Self, Error> {
        log::trace!("mapper using pool strategy ({} bytes)", buf.len());
        Ok(Self {
            mem: MemoryContext::pool(buf)?,
        })
    }

    /// Runs all document allocations through a bump arena carved out of
    /// `buf`. Cheapest strategy; the whole arena is recycled at the start
    /// of each operation.
    pub fn arena(buf: &'b mut [u8]) -> Result<Self, Error> {
        log::trace!("mapper using arena strategy ({} bytes)", buf.len());
        Ok(Self {
            mem: MemoryContext::arena(buf)?,
        })
    }

    /// Runs all document allocations through the global allocator.
    #[cfg(feature = "heap")]
    pub fn heap() -> Self {
        log::trace!("mapper using heap strategy");
        Self {
            mem: MemoryContext::heap(),
        }
    }

    /// Runs all document allocations through application-supplied hook
    /// functions. Fails with [`Error::MissingHook`] unless both hooks are
    /// present.
    pub fn hooks(hooks: Hooks) -> Result<Self, Error> {
        log::trace!("mapper using custom hook strategy");
        Ok(Self {
            mem: MemoryContext::hooks(hooks)?,
        })
    }

    /// Renders the schema's current storage values as JSON text into `out`.
    ///
    /// The root is an object keyed by the fields' names, except when the
    /// schema is a single unnamed array or object field, which then becomes
    /// the document root itself.
    pub fn serialize<'o>(
        &mut self,
        fields: &[Field<'_>],
        out: &'o mut [u8],
        format: Format,
    ) -> Result<&'o str, Error> {
        let mut doc = Document::new(&mut self.mem);
        let root = build_root(&mut doc, fields)?;
        doc.set_root(root);
        let len = print::print_document(&doc, root, out, format)?;
        // The printer emits complete UTF-8 sequences only.
        core::str::from_utf8(&out[..len]).map_err(|_| Error::BufferTooSmall)
    }

    /// Parses `text` and copies values into the schema's bound storage.
    ///
    /// Every field's updated flag is cleared first and set again only if
    /// the document supplied a matching value. In strict mode a missing
    /// named field aborts with [`Error::MissingField`]; storage written by
    /// earlier fields keeps its new values. The root-schema rules of
    /// [`serialize`](Self::serialize) apply here as well: an empty schema
    /// or a lone unnamed leaf field is [`Error::InvalidSchema`].
    pub fn parse(
        &mut self,
        text: &str,
        fields: &mut [Field<'_>],
        mode: ParseMode,
    ) -> Result<(), Error> {
        check_root(fields)?;
        clear_updated(fields);
        let doc = parse::parse_document(&mut self.mem, text)?;
        let root = doc.root().ok_or(Error::Malformed)?;
        from_document(&doc, root, fields, mode)
    }
}

/// Root-schema validity, shared by both operations: a schema must not be
/// empty, and an unnamed root field is only meaningful for containers.
fn check_root(fields: &[Field<'_>]) -> Result<(), Error> {
    match fields {
        [] => Err(Error::InvalidSchema),
        [only]
            if only.name().is_empty()
                && !matches!(only.slot(), Slot::Array { .. } | Slot::Object(_)) =>
        {
            Err(Error::InvalidSchema)
        }
        _ => Ok(()),
    }
}

fn build_root(doc: &mut Document<'_, '_>, fields: &[Field<'_>]) -> Result<NodeRef, Error> {
    check_root(fields)?;
    // A single unnamed container field stands in for the whole document,
    // so its text round-trips without an extra wrapper object.
    if let [only] = fields {
        if only.name().is_empty() {
            return build_field(doc, only);
        }
    }
    let root = doc.create_object()?;
    if let Err(e) = build_members(doc, root, fields, true) {
        doc.delete(root);
        return Err(e);
    }
    Ok(root)
}

fn build_members(
    doc: &mut Document<'_, '_>,
    parent: NodeRef,
    fields: &[Field<'_>],
    named: bool,
) -> Result<(), Error> {
    for field in fields {
        let node = build_field(doc, field)?;
        if named {
            if field.name().is_empty() {
                doc.delete(node);
                return Err(Error::InvalidSchema);
            }
            if let Err(e) = doc.set_key(node, field.name()) {
                doc.delete(node);
                return Err(e);
            }
        }
        doc.attach(parent, node);
    }
    Ok(())
}

fn build_field(doc: &mut Document<'_, '_>, field: &Field<'_>) -> Result<NodeRef, Error> {
    match field.slot() {
        Slot::Null(_) => doc.create_null(),
        Slot::Bool(value) => doc.create_bool(**value),
        Slot::Number(value) => doc.create_number(**value),
        Slot::Str(storage) => doc.create_string(storage.as_str()),
        Slot::Object(children) => {
            let node = doc.create_object()?;
            if let Err(e) = build_members(doc, node, children, true) {
                doc.delete(node);
                return Err(e);
            }
            Ok(node)
        }
        Slot::Array { children, len } => {
            let node = doc.create_array()?;
            // `len` trails the last parse, so a parsed-then-serialized
            // array keeps the element count it actually received.
            let take = (*len).min(children.len());
            if let Err(e) = build_members(doc, node, &children[..take], false) {
                doc.delete(node);
                return Err(e);
            }
            Ok(node)
        }
    }
}

fn from_document(
    doc: &Document<'_, '_>,
    container: NodeRef,
    fields: &mut [Field<'_>],
    mode: ParseMode,
) -> Result<(), Error> {
    for field in fields.iter_mut() {
        let target = if field.name().is_empty() {
            // Unnamed fields alias the container itself (array elements,
            // document-root wrappers).
            Some(container)
        } else {
            doc.lookup(container, field.name())
        };
        let Some(target) = target else {
            if mode == ParseMode::Strict {
                log::debug!("required field {:?} missing from document", field.name());
                return Err(Error::MissingField);
            }
            continue;
        };
        apply(doc, target, field, mode)?;
    }
    Ok(())
}

fn apply(
    doc: &Document<'_, '_>,
    target: NodeRef,
    field: &mut Field<'_>,
    mode: ParseMode,
) -> Result<(), Error> {
    let updated = match (field.slot_mut(), doc.value(target)) {
        (Slot::Null(storage), Value::Null) => {
            **storage = 0;
            true
        }
        (Slot::Bool(storage), Value::Bool(value)) => {
            **storage = *value;
            true
        }
        (Slot::Number(storage), Value::Number(value)) => {
            **storage = *value;
            true
        }
        (Slot::Str(storage), Value::Str(value)) => {
            storage.set(value.as_str());
            true
        }
        (Slot::Object(children), Value::Object(_)) => {
            from_document(doc, target, children, mode)?;
            true
        }
        (Slot::Array { children, len }, Value::Array(_)) => {
            let actual = doc.child_count(target);
            if actual > children.len() && mode == ParseMode::Strict {
                log::debug!(
                    "array {:?} holds {} elements, schema allows {}",
                    field_name_for_log(target, doc),
                    actual,
                    children.len()
                );
                return Err(Error::TooManyElements);
            }
            let take = actual.min(children.len());
            let mut element = doc.first_child(target);
            for child in children.iter_mut().take(take) {
                let Some(node) = element else { break };
                apply(doc, node, child, mode)?;
                element = doc.next(node);
            }
            *len = take;
            true
        }
        // A present value of the wrong kind is tolerated in both modes;
        // the storage keeps its previous contents.
        _ => false,
    };
    field.set_updated(updated);
    Ok(())
}

fn field_name_for_log<'d>(node: NodeRef, doc: &'d Document<'_, '_>) -> &'d str {
    doc.key(node).unwrap_or("")
}

fn clear_updated(fields: &mut [Field<'_>]) {
    for field in fields.iter_mut() {
        field.set_updated(false);
        match field.slot_mut() {
            Slot::Object(children) => clear_updated(children),
            Slot::Array { children, .. } => clear_updated(children),
            _ => {}
        }
    }
}
