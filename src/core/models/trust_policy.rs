use serde::Deserialize;

/// How much validation a recipient key gets before it is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrustPolicy {
    /// Encrypt to the key without any validation.
    #[default]
    Always,
    /// Require the key's self-signatures to verify.
    Verified,
}

impl std::fmt::Display for TrustPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustPolicy::Always => f.write_str("always"),
            TrustPolicy::Verified => f.write_str("verified"),
        }
    }
}
