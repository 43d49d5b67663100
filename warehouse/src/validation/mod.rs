//! Offline consistency checks over the documents a model already holds.

use crate::model::Model;
use crate::schema::ID_PATH;
use crate::value::{Map, Value};
use std::collections::HashSet;

/// Problems found in a single stored document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentIssues {
    pub id: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl DocumentIssues {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Result of checking every document of one model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub model: String,
    pub checked: usize,
    /// Only documents with at least one error or warning.
    pub documents: Vec<DocumentIssues>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.documents.iter().all(DocumentIssues::is_ok)
    }

    pub fn has_warnings(&self) -> bool {
        self.documents.iter().any(DocumentIssues::has_warnings)
    }

    pub fn error_count(&self) -> usize {
        self.documents.iter().map(|d| d.errors.len()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.documents.iter().map(|d| d.warnings.len()).sum()
    }
}

/// Re-run the schema's getter and setter stacks over a copy of every stored
/// document. Setter failures are errors; undeclared fields and references to
/// missing documents are warnings. Nothing is written back.
pub fn validate_model(model: &Model) -> ValidationReport {
    let schema = model.schema();
    let declared: HashSet<&str> = schema
        .paths()
        .map(|(name, _)| name.split('.').next().unwrap_or(name))
        .collect();
    let check_undeclared = declared.iter().any(|name| *name != ID_PATH);

    let docs = model.to_array();
    let mut report = ValidationReport {
        model: model.name().to_string(),
        checked: docs.len(),
        documents: Vec::new(),
    };

    for doc in &docs {
        let mut issues = DocumentIssues {
            id: doc.id().unwrap_or_default().to_string(),
            ..Default::default()
        };

        let mut fields = doc.to_object();
        schema.apply_getters(&mut fields);
        if let Err(e) = schema.apply_setters(&mut fields) {
            issues.errors.push(e.to_string());
        }

        if check_undeclared {
            for key in doc.fields().keys() {
                if !declared.contains(key.as_str()) {
                    issues
                        .warnings
                        .push(format!("Field '{key}' is not declared in the schema"));
                }
            }
        }

        check_references(model, doc.fields(), &mut issues);

        if !issues.errors.is_empty() || !issues.warnings.is_empty() {
            log::debug!(
                "{}/{}: {} error(s), {} warning(s)",
                report.model,
                issues.id,
                issues.errors.len(),
                issues.warnings.len()
            );
            report.documents.push(issues);
        }
    }

    report
}

fn check_references(model: &Model, fields: &Map, issues: &mut DocumentIssues) {
    let Some(db) = model.database() else {
        return;
    };
    for (path, ty) in model.schema().paths() {
        let Some(target) = ty.reference_target() else {
            continue;
        };
        let ids: Vec<&str> = match crate::value::get_path(fields, path) {
            Some(Value::String(id)) => vec![id.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => continue,
        };
        let Ok(target_model) = db.get(target) else {
            issues
                .warnings
                .push(format!("Field '{path}' references unknown model '{target}'"));
            continue;
        };
        for id in ids {
            if target_model.find_by_id(id).is_none() {
                issues
                    .warnings
                    .push(format!("Field '{path}' references missing {target} '{id}'"));
            }
        }
    }
}
