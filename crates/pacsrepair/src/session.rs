//! Analyst edit sessions with an append-only audit trail

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::xml::{Document, Element};

/// Element the default editable fields hang off
pub const TRANSACTION_ANCHOR: &str = "CdtTrfTxInf";

/// Fields an analyst may change without re-running repair, relative to
/// [`TRANSACTION_ANCHOR`]
pub const DEFAULT_EDITABLE_FIELDS: [&str; 3] = ["RmtInf/Ustrd", "ChrgBr", "PmtTpInf/Purp/Cd"];

/// System the edited values belong to
const SOURCE: &str = "MX";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("field {path} is not editable")]
    NotEditable { path: String },

    #[error("cannot set {path}: no <{ancestor}> element in the message")]
    MissingAncestor { path: String, ancestor: String },

    #[error("no edit of {path} left to revert")]
    NothingToRevert { path: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Edit,
    Revert,
}

/// One confirmed change
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub session_id: Uuid,
    pub actor: String,
    pub role: String,
    pub field: String,
    pub source: String,
    pub action: AuditAction,
    pub old_value: String,
    pub new_value: String,
    pub justification: String,
    pub reverted: bool,
}

/// An editable field: a child path below the first `anchor` element.
///
/// Missing elements along `path` are created on write, so a field can be
/// filled in even when the message never carried it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EditableField {
    pub anchor: String,
    pub path: String,
}

impl EditableField {
    pub fn new(anchor: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            path: path.into(),
        }
    }

    /// A field below [`TRANSACTION_ANCHOR`]
    pub fn transaction(path: impl Into<String>) -> Self {
        Self::new(TRANSACTION_ANCHOR, path)
    }

    fn segments(&self) -> Vec<&str> {
        self.path
            .split('/')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect()
    }

    fn resolve<'a>(&self, root: &'a Element) -> Option<&'a Element> {
        root.find_first(&self.anchor)?.child_path(&self.path)
    }
}

/// Append-only list of entries
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
    }

    /// Latest edit of `field` not cancelled by a later revert
    fn last_live_edit(&self, field: &str) -> Option<&AuditEntry> {
        let mut pending_reverts = 0usize;
        for entry in self.entries.iter().rev().filter(|e| e.field == field) {
            match entry.action {
                AuditAction::Revert => pending_reverts += 1,
                AuditAction::Edit if pending_reverts > 0 => pending_reverts -= 1,
                AuditAction::Edit => return Some(entry),
            }
        }
        None
    }
}

/// One analyst working on one document
#[derive(Clone, Debug)]
pub struct Session {
    id: Uuid,
    actor: String,
    role: String,
    document: Document,
    editable: Vec<EditableField>,
    audit: AuditLog,
}

impl Session {
    pub fn new(document: Document, actor: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.into(),
            role: role.into(),
            document,
            editable: DEFAULT_EDITABLE_FIELDS
                .into_iter()
                .map(EditableField::transaction)
                .collect(),
            audit: AuditLog::default(),
        }
    }

    /// Replace the editable field list
    #[must_use]
    pub fn with_editable_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = EditableField>,
    {
        self.editable = fields.into_iter().collect();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn editable_fields(&self) -> &[EditableField] {
        &self.editable
    }

    pub fn editable_field(&self, path: &str) -> Option<&EditableField> {
        self.editable.iter().find(|field| field.path == path)
    }

    pub fn is_editable(&self, path: &str) -> bool {
        self.editable_field(path).is_some()
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Trimmed text at `path`, `None` when it doesn't resolve.
    ///
    /// Editable fields resolve below their anchor; any other path is looked
    /// up from its first segment.
    pub fn field_value(&self, path: &str) -> Option<String> {
        let root = &self.document.root;
        let element = match self.editable_field(path) {
            Some(field) => field.resolve(root),
            None => root.find_path(path),
        };
        element.map(|element| element.text().trim().to_string())
    }

    /// Set an editable field and log the change.
    ///
    /// Writing the current value again logs nothing and returns `None`.
    #[instrument(skip(self, new_value, justification), fields(session = %self.id))]
    pub fn edit_field(
        &mut self,
        path: &str,
        new_value: &str,
        justification: &str,
    ) -> Result<Option<AuditEntry>, EditError> {
        let field = self
            .editable_field(path)
            .cloned()
            .ok_or_else(|| EditError::NotEditable {
                path: path.to_string(),
            })?;
        let old_value = self.field_value(path).unwrap_or_default();
        if old_value == new_value {
            return Ok(None);
        }
        self.write(&field, new_value)?;
        info!(field = path, anchor = %field.anchor, "field edited");
        let entry = self.entry(path, AuditAction::Edit, old_value, new_value, justification);
        self.audit.push(entry.clone());
        Ok(Some(entry))
    }

    /// Restore the value in place before the latest un-reverted edit of `path`
    #[instrument(skip(self), fields(session = %self.id))]
    pub fn revert_last(&mut self, path: &str) -> Result<AuditEntry, EditError> {
        let edit = self
            .audit
            .last_live_edit(path)
            .ok_or_else(|| EditError::NothingToRevert {
                path: path.to_string(),
            })?;
        let restored = edit.old_value.clone();
        let justification = format!("revert of edit made {}", edit.timestamp);

        let field = self
            .editable_field(path)
            .cloned()
            .ok_or_else(|| EditError::NotEditable {
                path: path.to_string(),
            })?;

        let current = self.field_value(path).unwrap_or_default();
        self.write(&field, &restored)?;
        info!(field = path, "edit reverted");
        let mut entry = self.entry(path, AuditAction::Revert, current, &restored, &justification);
        entry.reverted = true;
        self.audit.push(entry.clone());
        Ok(entry)
    }

    fn write(&mut self, field: &EditableField, value: &str) -> Result<(), EditError> {
        let segments = field.segments();
        if segments.is_empty() {
            return Err(EditError::NotEditable {
                path: field.path.clone(),
            });
        }
        let target = self
            .document
            .root
            .find_first_mut(&field.anchor)
            .and_then(|anchor| anchor.find_or_create_path(&segments))
            .ok_or_else(|| EditError::MissingAncestor {
                path: field.path.clone(),
                ancestor: field.anchor.clone(),
            })?;
        target.set_text(value);
        Ok(())
    }

    fn entry(
        &self,
        field: &str,
        action: AuditAction,
        old_value: String,
        new_value: &str,
        justification: &str,
    ) -> AuditEntry {
        AuditEntry {
            timestamp: OffsetDateTime::now_utc(),
            session_id: self.id,
            actor: self.actor.clone(),
            role: self.role.clone(),
            field: field.to_string(),
            source: SOURCE.to_string(),
            action,
            old_value,
            new_value: new_value.to_string(),
            justification: justification.to_string(),
            reverted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::{find_missing_fields, MissingField};

    fn session() -> Result<Session, crate::Error> {
        let doc = crate::parse(
            "<Document><CdtTrfTxInf><ChrgBr>SHAR</ChrgBr>\
             <RmtInf><Ustrd>Invoice 330</Ustrd></RmtInf></CdtTrfTxInf></Document>",
        )?;
        Ok(Session::new(doc, "daniel@example.com", "Analyst"))
    }

    #[test]
    fn test_edit_is_logged() -> Result<(), Box<dyn std::error::Error>> {
        let mut session = session()?;
        let entry = session
            .edit_field("ChrgBr", "DEBT", "customer request")?
            .ok_or("expected an audit entry")?;
        assert_eq!(entry.old_value, "SHAR");
        assert_eq!(entry.new_value, "DEBT");
        assert_eq!(entry.action, AuditAction::Edit);
        assert_eq!(entry.source, "MX");
        assert!(!entry.reverted);
        assert_eq!(session.field_value("ChrgBr").as_deref(), Some("DEBT"));
        assert_eq!(session.audit().entries(), &[entry]);
        Ok(())
    }

    #[test]
    fn test_unchanged_value_not_logged() -> Result<(), Box<dyn std::error::Error>> {
        let mut session = session()?;
        assert!(session.edit_field("ChrgBr", "SHAR", "")?.is_none());
        assert!(session.audit().is_empty());
        Ok(())
    }

    #[test]
    fn test_absent_purpose_code_is_created() -> Result<(), Box<dyn std::error::Error>> {
        let doc = crate::parse(include_str!("../tests/fixtures/valid/business_message.xml"))?;
        assert!(find_missing_fields(&doc).contains(&MissingField::PurposeCode));
        let mut session = Session::new(doc, "daniel@example.com", "Analyst");
        assert_eq!(session.field_value("PmtTpInf/Purp/Cd"), None);

        let entry = session
            .edit_field("PmtTpInf/Purp/Cd", "GDDS", "goods payment")?
            .ok_or("expected an audit entry")?;
        assert_eq!(entry.old_value, "");
        assert_eq!(session.field_value("PmtTpInf/Purp/Cd").as_deref(), Some("GDDS"));
        assert_eq!(
            session.document().root.text_at("CdtTrfTxInf/PmtTpInf/Purp/Cd"),
            "GDDS"
        );
        assert!(!find_missing_fields(session.document()).contains(&MissingField::PurposeCode));

        session.edit_field("PmtTpInf/Purp/Cd", "SALA", "salary")?;
        assert_eq!(session.document().root.find_all_path("Purp").len(), 1);
        session.revert_last("PmtTpInf/Purp/Cd")?;
        assert_eq!(session.field_value("PmtTpInf/Purp/Cd").as_deref(), Some("GDDS"));
        Ok(())
    }

    #[test]
    fn test_rejects_locked_and_unanchored_fields() -> Result<(), crate::Error> {
        let mut session = session()?;
        assert_eq!(
            session.edit_field("Dbtr/Nm", "X", "").map(|_| ()),
            Err(EditError::NotEditable {
                path: "Dbtr/Nm".to_string()
            })
        );

        let doc = crate::parse("<AppHdr><BizMsgIdr>MSG-1</BizMsgIdr></AppHdr>")?;
        let mut header_only = Session::new(doc, "daniel@example.com", "Analyst");
        assert_eq!(
            header_only.edit_field("PmtTpInf/Purp/Cd", "GDDS", "").map(|_| ()),
            Err(EditError::MissingAncestor {
                path: "PmtTpInf/Purp/Cd".to_string(),
                ancestor: "CdtTrfTxInf".to_string(),
            })
        );
        assert!(session.audit().is_empty());
        assert!(header_only.audit().is_empty());
        Ok(())
    }

    #[test]
    fn test_custom_anchor() -> Result<(), Box<dyn std::error::Error>> {
        let doc = crate::parse("<AppHdr><BizMsgIdr>MSG-1</BizMsgIdr></AppHdr>")?;
        let mut session = Session::new(doc, "ops", "Supervisor")
            .with_editable_fields([EditableField::new("AppHdr", "BizMsgIdr")]);
        assert!(!session.is_editable("ChrgBr"));
        session.edit_field("BizMsgIdr", "MSG-2", "resend")?;
        assert_eq!(session.document().root.text_at("AppHdr/BizMsgIdr"), "MSG-2");
        Ok(())
    }

    #[test]
    fn test_revert_restores_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let mut session = session()?;
        session.edit_field("ChrgBr", "DEBT", "first")?;
        session.edit_field("ChrgBr", "CRED", "second")?;

        let revert = session.revert_last("ChrgBr")?;
        assert!(revert.reverted);
        assert_eq!(revert.old_value, "CRED");
        assert_eq!(revert.new_value, "DEBT");
        assert_eq!(session.field_value("ChrgBr").as_deref(), Some("DEBT"));

        session.revert_last("ChrgBr")?;
        assert_eq!(session.field_value("ChrgBr").as_deref(), Some("SHAR"));
        assert_eq!(
            session.revert_last("ChrgBr").map(|_| ()),
            Err(EditError::NothingToRevert {
                path: "ChrgBr".to_string()
            })
        );
        assert_eq!(session.audit().len(), 4);
        Ok(())
    }

    #[test]
    fn test_audit_serializes_as_array() -> Result<(), Box<dyn std::error::Error>> {
        let mut session = session()?;
        session.edit_field("RmtInf/Ustrd", "Invoice 331", "typo")?;
        let json = serde_json::to_value(session.audit())?;
        let first = json.get(0).ok_or("expected one entry")?;
        assert_eq!(first.get("action"), Some(&serde_json::json!("edit")));
        assert_eq!(first.get("field"), Some(&serde_json::json!("RmtInf/Ustrd")));
        assert!(first.get("timestamp").and_then(|t| t.as_str()).is_some());
        Ok(())
    }
}
