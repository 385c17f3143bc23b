use serde_json::{json, Value};

/// The closed set of logical collections the store knows about.
///
/// Lock acquisition for multi-collection transactions must follow the
/// declaration order here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Invitations,
    Audit,
    Records,
    TrialLimits,
    Fingerprints,
    Analytics,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Users,
        Collection::Invitations,
        Collection::Audit,
        Collection::Records,
        Collection::TrialLimits,
        Collection::Fingerprints,
        Collection::Analytics,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Users => "users.json",
            Collection::Invitations => "invitations.json",
            Collection::Audit => "audit.json",
            Collection::Records => "records.json",
            Collection::TrialLimits => "trial-limits.json",
            Collection::Fingerprints => "fingerprints.json",
            Collection::Analytics => "analytics.json",
        }
    }

    /// Documented default: record lists are sequences, keyed data is a mapping.
    pub fn default_value(self) -> Value {
        match self {
            Collection::Users
            | Collection::Invitations
            | Collection::Audit
            | Collection::Records => json!([]),
            Collection::TrialLimits | Collection::Fingerprints => json!({}),
            Collection::Analytics => json!({ "dailyUsage": {} }),
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}
