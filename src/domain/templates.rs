//! Built-in agreement templates and their field schemas.

use std::collections::BTreeMap;

/// A document template definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    /// Stable identifier (e.g. "TPL-NDA-V2")
    pub id: &'static str,

    /// Short alias accepted on input (e.g. "NDA")
    pub alias: &'static str,

    /// Display name
    pub name: &'static str,

    /// Document heading
    pub title: &'static str,

    /// Overlay text used when the document is watermarked in-body
    pub watermark_text: &'static str,

    /// Field schema with default values, in display order
    pub fields: &'static [(&'static str, &'static str)],
}

pub const TEMPLATES: [Template; 3] = [
    Template {
        id: "TPL-NDA-V2",
        alias: "NDA",
        name: "Non-Disclosure Agreement",
        title: "Mutual Non-Disclosure Agreement",
        watermark_text: "CONFIDENTIAL",
        fields: &[
            ("partyA", "Acme Global Inc."),
            ("partyB", "Strategic Partners LLC"),
            ("governingLaw", "California"),
            ("termYears", "3"),
        ],
    },
    Template {
        id: "TPL-SVC-V1",
        alias: "SVC",
        name: "Master Service Agreement",
        title: "Master Service Agreement",
        watermark_text: "CONFIDENTIAL",
        fields: &[
            ("clientName", "Future Corp"),
            ("projectScope", "API Integration Phase 1"),
            ("billingRate", "$250/hr"),
            ("effectiveDate", "2026-05-12"),
        ],
    },
    Template {
        id: "TPL-EMP-V4",
        alias: "EMP",
        name: "Employment Offer",
        title: "Offer of Employment",
        watermark_text: "DRAFT OFFER",
        fields: &[
            ("candidateName", "Jane Doe"),
            ("position", "Senior Engineer"),
            ("salary", "$180,000"),
            ("equity", "0.05%"),
        ],
    },
];

impl Template {
    /// Default field values keyed by field name
    pub fn default_fields(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn matches(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id) || self.alias.eq_ignore_ascii_case(id)
    }
}

/// Look up a template by id or alias
pub fn find_template(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.matches(id.trim()))
}
