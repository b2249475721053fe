//! Level lookup and ContentAPI endpoint resolution
//!
//! An application's records live under `/contentapi/{alias}` where the alias
//! belongs to one of its levels. When the level list has no match, the
//! resolver falls back to probing slugs derived from the application name.

use crate::app::metadata::MetadataApi;
use crate::app::models::{content_path, LevelMapping};

/// One way of finding a ContentAPI endpoint, tried in order
#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidate {
    /// Endpoint known from level metadata
    Known(String),
    /// Endpoint that must answer a one-record probe
    Probe(String),
}

/// Resolves application names against a list of level mappings
#[derive(Debug, Clone, Default)]
pub struct LevelResolver {
    levels: Vec<LevelMapping>,
}

impl LevelResolver {
    pub fn new(levels: Vec<LevelMapping>) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &[LevelMapping] {
        &self.levels
    }

    /// Find the level for an application name or alias
    ///
    /// An exact case-insensitive match on module name or alias wins; failing
    /// that, the first level where either side contains the other.
    pub fn find_level_mapping(&self, name_or_alias: &str) -> Option<&LevelMapping> {
        let needle = name_or_alias.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let exact = self.levels.iter().find(|level| {
            level.module_name.to_lowercase() == needle || level.alias.to_lowercase() == needle
        });
        if exact.is_some() {
            return exact;
        }

        self.levels.iter().find(|level| {
            let module_name = level.module_name.to_lowercase();
            let alias = level.alias.to_lowercase();
            module_name.contains(&needle)
                || needle.contains(&module_name)
                || alias.contains(&needle)
                || needle.contains(&alias)
        })
    }

    /// Resolve the ContentAPI path for an application
    ///
    /// Returns `None` when neither level metadata nor any probe finds it.
    pub async fn resolve_content_endpoint(
        &self,
        api: &MetadataApi,
        application: &str,
    ) -> Option<String> {
        for candidate in self.candidates(application) {
            match candidate {
                Candidate::Known(path) => {
                    tracing::debug!("Resolved '{}' from level metadata: {}", application, path);
                    return Some(path);
                }
                Candidate::Probe(path) => {
                    if api.probe(&path).await {
                        tracing::info!("Resolved '{}' by probing: {}", application, path);
                        return Some(path);
                    }
                }
            }
        }

        tracing::warn!("No ContentAPI endpoint found for '{}'", application);
        None
    }

    fn candidates(&self, application: &str) -> Vec<Candidate> {
        if let Some(level) = self.find_level_mapping(application) {
            return vec![Candidate::Known(level.content_path())];
        }

        name_slugs(application)
            .iter()
            .map(|slug| Candidate::Probe(content_path(slug)))
            .collect()
    }
}

/// Slugs tried when probing for an application's endpoint
///
/// Spaces become underscores, then are removed; each form is tried as
/// written and lowercased. Duplicates are dropped, order is kept.
pub fn name_slugs(application: &str) -> Vec<String> {
    let name = application.trim();
    let underscored = name.replace(' ', "_");
    let joined = name.replace(' ', "");

    let mut slugs: Vec<String> = Vec::with_capacity(4);
    for slug in [
        underscored.clone(),
        joined.clone(),
        underscored.to_lowercase(),
        joined.to_lowercase(),
    ] {
        if !slug.is_empty() && !slugs.contains(&slug) {
            slugs.push(slug);
        }
    }
    slugs
}
