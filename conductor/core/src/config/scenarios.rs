//! Scenario and model catalogues
//!
//! A scenario is a named system prompt. The built-in set can be extended (or
//! overridden by name) from the `[scenarios]` table of the config file.

/// Models offered when the config file does not list any
pub const DEFAULT_MODELS: &[&str] = &[
    "gpt-5.1",
    "gpt-5.1-codex",
    "gemini-3-pro-preview",
    "claude-opus-4-5-20251101-thinking",
    "claude-opus-4-5-20251101",
    "claude-haiku-4-5-20251001",
];

/// Scenario selected when nothing else is configured
pub const DEFAULT_SCENARIO: &str = "Coding assistant";

const BUILTIN_SCENARIOS: &[(&str, &str)] = &[
    (
        "Coding assistant",
        "You are a professional senior programmer.\n\
         - Only answer programming-related questions\n\
         - Code first, keep explanations concise\n\
         - Follow best practices and design patterns\n\
         - Consider edge cases and error handling",
    ),
    ("General assistant", "You are a helpful assistant."),
    (
        "Chinese/English translator",
        "You are a professional Chinese and English language expert. \
         Give both the Chinese and the English translation, \
         with each translation in its own paragraph.",
    ),
];

/// A named system prompt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scenario {
    /// Display name, also the lookup key
    pub name: String,
    /// System prompt sent with every request in this scenario
    pub system_prompt: String,
}

/// Ordered scenario list
///
/// Order is insertion order, which is also the order surfaces cycle through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
}

impl Default for ScenarioCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ScenarioCatalog {
    /// Catalogue with no scenarios
    #[must_use]
    pub fn empty() -> Self {
        Self {
            scenarios: Vec::new(),
        }
    }

    /// The three built-in scenarios
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for (name, prompt) in BUILTIN_SCENARIOS {
            catalog.insert(*name, *prompt);
        }
        catalog
    }

    /// Add a scenario, replacing the prompt of an existing one with the same name
    pub fn insert(&mut self, name: impl Into<String>, system_prompt: impl Into<String>) {
        let name = name.into();
        let system_prompt = system_prompt.into();
        match self.scenarios.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.system_prompt = system_prompt,
            None => self.scenarios.push(Scenario {
                name,
                system_prompt,
            }),
        }
    }

    /// System prompt for a scenario name.
    ///
    /// A scenario whose prompt is blank does not resolve.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.usable()
            .find(|s| s.name == name)
            .map(|s| s.system_prompt.as_str())
    }

    fn usable(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios
            .iter()
            .filter(|s| !s.system_prompt.trim().is_empty())
    }

    /// Whether a scenario with this name exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Names of the scenarios that resolve, in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.usable().map(|s| s.name.as_str())
    }

    /// Number of scenarios
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether the catalogue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// The scenario after `current`, wrapping around.
    ///
    /// Falls back to the first scenario when `current` is unknown.
    #[must_use]
    pub fn next_after(&self, current: &str) -> Option<&str> {
        let names: Vec<&str> = self.names().collect();
        next_in(&names, current)
    }
}

/// Cycle helper shared by the scenario and model lists
pub(crate) fn next_in<'a>(items: &[&'a str], current: &str) -> Option<&'a str> {
    if items.is_empty() {
        return None;
    }
    let next = items
        .iter()
        .position(|item| *item == current)
        .map_or(0, |idx| (idx + 1) % items.len());
    Some(items[next])
}
