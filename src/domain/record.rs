//! Complaint record document and the form inputs it is assembled from.
//!
//! The JSON layout (camelCase keys) is what gets pinned to the content store
//! and what investigators read back.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::content_id::ContentId;

/// Complaint category from the fixed set offered by the filing form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComplaintType {
    Noise,
    Traffic,
    Suspicious,
    Harassment,
    Vandalism,
    Domestic,
    Theft,
    Fraud,
    Fire,
    /// Filed directly by an officer from a call transcript
    Emergency,
    Other,
}

impl ComplaintType {
    pub const ALL: [ComplaintType; 11] = [
        ComplaintType::Noise,
        ComplaintType::Traffic,
        ComplaintType::Suspicious,
        ComplaintType::Harassment,
        ComplaintType::Vandalism,
        ComplaintType::Domestic,
        ComplaintType::Theft,
        ComplaintType::Fraud,
        ComplaintType::Fire,
        ComplaintType::Emergency,
        ComplaintType::Other,
    ];

    /// Short identifier used by form controls
    pub fn id(&self) -> &'static str {
        match self {
            ComplaintType::Noise => "noise",
            ComplaintType::Traffic => "traffic",
            ComplaintType::Suspicious => "suspicious",
            ComplaintType::Harassment => "harassment",
            ComplaintType::Vandalism => "vandalism",
            ComplaintType::Domestic => "domestic",
            ComplaintType::Theft => "theft",
            ComplaintType::Fraud => "fraud",
            ComplaintType::Fire => "fire",
            ComplaintType::Emergency => "emergency",
            ComplaintType::Other => "other",
        }
    }

    /// Display label; this is what the record stores
    pub fn label(&self) -> &'static str {
        match self {
            ComplaintType::Noise => "Noise Complaint",
            ComplaintType::Traffic => "Traffic Violation",
            ComplaintType::Suspicious => "Suspicious Activity",
            ComplaintType::Harassment => "Harassment",
            ComplaintType::Vandalism => "Vandalism",
            ComplaintType::Domestic => "Domestic Dispute",
            ComplaintType::Theft => "Theft",
            ComplaintType::Fraud => "Fraud",
            ComplaintType::Fire => "Fire Emergency",
            ComplaintType::Emergency => "Emergency",
            ComplaintType::Other => "Other",
        }
    }
}

/// Unknown complaint category
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown complaint type: {0}")]
pub struct UnknownComplaintType(pub String);

impl FromStr for ComplaintType {
    type Err = UnknownComplaintType;

    /// Accepts either the id or the label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.id().eq_ignore_ascii_case(needle) || t.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownComplaintType(s.to_string()))
    }
}

impl TryFrom<String> for ComplaintType {
    type Error = UnknownComplaintType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComplaintType> for String {
    fn from(t: ComplaintType) -> Self {
        t.label().to_string()
    }
}

impl fmt::Display for ComplaintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Triage priority derived from the complaint narrative
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    Critical,
}

impl Priority {
    const CRITICAL_KEYWORDS: [&'static str; 3] = ["murder", "death", "accident"];
    const MEDIUM_KEYWORDS: [&'static str; 3] = ["robbery", "fight", "theft"];

    /// Keyword triage over free text.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if Self::CRITICAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
            Priority::Critical
        } else if Self::MEDIUM_KEYWORDS.iter().any(|k| lower.contains(k)) {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low Priority",
            Priority::Medium => "Medium Priority",
            Priority::Critical => "Critical",
        }
    }
}

/// Evidence file pinned to the content store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceFile {
    pub name: String,
    /// Older documents used `ipfsHash`
    #[serde(alias = "ipfsHash")]
    pub content_id: ContentId,
    /// Gateway link derived from `content_id`; informational only
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    #[serde(default)]
    pub files: Vec<EvidenceFile>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Witness {
    pub name: String,
    pub contact: String,
    pub statement: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub email: String,
}

/// Canonical complaint document pinned to the content store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintRecord {
    pub complaint_type: ComplaintType,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub evidence: Evidence,
    #[serde(default)]
    pub witnesses: Vec<Witness>,
    #[serde(default)]
    pub contact_info: ContactInfo,
    /// Assigned once at assembly time
    pub timestamp: DateTime<Utc>,
}

impl ComplaintRecord {
    /// Build a record from form inputs, stamped with `timestamp`.
    pub fn from_form(form: ComplaintForm, files: Vec<EvidenceFile>, timestamp: DateTime<Utc>) -> Self {
        Self {
            complaint_type: form.complaint_type,
            description: form.description,
            location: form.location,
            evidence: Evidence {
                files,
                description: form.evidence_description,
            },
            witnesses: form.witnesses,
            contact_info: ContactInfo { email: form.email },
            timestamp,
        }
    }

    pub fn priority(&self) -> Priority {
        Priority::classify(&self.description)
    }

    /// Case-insensitive search over type label, description and location.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.complaint_type.label().to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.location.to_lowercase().contains(&query)
    }

    /// Serialize to the JSON document pinned to the store.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Form inputs collected by the filing wizard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplaintForm {
    pub complaint_type: ComplaintType,
    pub description: String,
    pub location: String,
    pub evidence_description: String,
    pub witnesses: Vec<Witness>,
    pub email: String,
}

impl ComplaintForm {
    pub fn new(
        complaint_type: ComplaintType,
        description: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            complaint_type,
            description: description.into(),
            location: location.into(),
            evidence_description: String::new(),
            witnesses: Vec::new(),
            email: String::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_evidence_description(mut self, description: impl Into<String>) -> Self {
        self.evidence_description = description.into();
        self
    }

    pub fn with_witness(mut self, witness: Witness) -> Self {
        self.witnesses.push(witness);
        self
    }

    /// Check the inputs a record cannot be built without.
    pub fn validate(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("description must not be empty".to_string());
        }
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(format!("invalid contact email: {}", self.email));
        }
        Ok(())
    }
}

/// Evidence file awaiting upload
#[derive(Debug, Clone)]
pub struct EvidenceBlob {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl EvidenceBlob {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> ComplaintRecord {
        let form = ComplaintForm::new(
            ComplaintType::Theft,
            "Bicycle stolen outside the library",
            "No.36, south alley, chennai",
        )
        .with_email("citizen@example.com");
        ComplaintRecord::from_form(form, Vec::new(), Utc::now())
    }

    #[test]
    fn test_complaint_type_parses_id_and_label() {
        assert_eq!("noise".parse::<ComplaintType>().unwrap(), ComplaintType::Noise);
        assert_eq!(
            "traffic violation".parse::<ComplaintType>().unwrap(),
            ComplaintType::Traffic
        );
        assert_eq!(
            "Fire Emergency".parse::<ComplaintType>().unwrap(),
            ComplaintType::Fire
        );
        assert!("arson".parse::<ComplaintType>().is_err());
    }

    #[test]
    fn test_record_json_layout() {
        let record = sample_record();
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["complaintType"], "Theft");
        assert_eq!(value["contactInfo"]["email"], "citizen@example.com");
        assert!(value["evidence"]["files"].as_array().unwrap().is_empty());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_record_accepts_legacy_evidence_key() {
        let value = json!({
            "complaintType": "Vandalism",
            "description": "Graffiti on the wall",
            "location": "Main road",
            "evidence": {
                "files": [{
                    "name": "photo.jpg",
                    "ipfsHash": "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
                    "url": "https://ipfs.io/ipfs/QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
                }],
                "description": "one photo"
            },
            "contactInfo": { "email": "a@b.c" },
            "timestamp": "2024-03-01T10:15:30.000Z"
        });

        let record: ComplaintRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.complaint_type, ComplaintType::Vandalism);
        assert_eq!(record.evidence.files.len(), 1);
        assert!(record.witnesses.is_empty());
    }

    #[test]
    fn test_priority_classification() {
        assert_eq!(Priority::classify("Road ACCIDENT near bridge"), Priority::Critical);
        assert_eq!(Priority::classify("a fight broke out"), Priority::Medium);
        assert_eq!(Priority::classify("loud music at night"), Priority::Low);
        assert!(Priority::Critical > Priority::Medium);
    }

    #[test]
    fn test_search_matches() {
        let record = sample_record();
        assert!(record.matches(""));
        assert!(record.matches("theft"));
        assert!(record.matches("LIBRARY"));
        assert!(record.matches("chennai"));
        assert!(!record.matches("coimbatore"));
    }

    #[test]
    fn test_form_validation() {
        let form = ComplaintForm::new(ComplaintType::Other, "   ", "somewhere");
        assert!(form.validate().is_err());

        let form = ComplaintForm::new(ComplaintType::Other, "details", "somewhere")
            .with_email("not-an-email");
        assert!(form.validate().is_err());

        let form = ComplaintForm::new(ComplaintType::Other, "details", "somewhere");
        assert!(form.validate().is_ok());
    }
}
