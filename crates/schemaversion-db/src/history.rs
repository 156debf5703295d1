use schemaversion_common::{Error, Result, Version};
use serde::{Deserialize, Serialize};

/// A single versioned schema change.
///
/// The base step of a history carries no SQL. A later step with no up SQL is a
/// marker: applying it only advances the recorded version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStep {
    pub version: Version,
    #[serde(default)]
    pub up: Option<String>,
    #[serde(default)]
    pub down: Option<String>,
}

impl MigrationStep {
    pub fn base(version: Version) -> Self {
        Self {
            version,
            up: None,
            down: None,
        }
    }

    pub fn new(version: Version, up: impl Into<String>) -> Self {
        Self {
            version,
            up: Some(up.into()),
            down: None,
        }
    }

    pub fn with_down(mut self, down: impl Into<String>) -> Self {
        self.down = Some(down.into());
        self
    }

    pub fn up_sql(&self) -> Option<&str> {
        non_blank(self.up.as_deref())
    }

    pub fn down_sql(&self) -> Option<&str> {
        non_blank(self.down.as_deref())
    }

    /// A step can be reverted when it has down SQL, or when it never changed
    /// anything on the way up.
    pub fn is_reversible(&self) -> bool {
        self.down_sql().is_some() || self.up_sql().is_none()
    }
}

fn non_blank(sql: Option<&str>) -> Option<&str> {
    sql.filter(|s| !s.trim().is_empty())
}

/// The complete catalog of known steps, sorted ascending and unique by version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationHistory {
    steps: Vec<MigrationStep>,
}

impl MigrationHistory {
    pub fn new(steps: impl IntoIterator<Item = MigrationStep>) -> Result<Self> {
        let mut steps: Vec<MigrationStep> = steps.into_iter().collect();
        if steps.is_empty() {
            return Err(Error::History(
                "history must contain at least the base version".into(),
            ));
        }

        steps.sort_by_key(|s| s.version);
        if let Some(pair) = steps.windows(2).find(|w| w[0].version == w[1].version) {
            return Err(Error::History(format!(
                "duplicate version {} in history",
                pair[0].version
            )));
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, version: Version) -> Option<&MigrationStep> {
        self.steps
            .binary_search_by_key(&version, |s| s.version)
            .ok()
            .map(|idx| &self.steps[idx])
    }

    pub fn contains(&self, version: Version) -> bool {
        self.get(version).is_some()
    }

    pub fn base_version(&self) -> Version {
        self.steps[0].version
    }

    pub fn latest_version(&self) -> Version {
        self.steps[self.steps.len() - 1].version
    }

    /// Steps with `current < version <= target`, ascending. Empty when
    /// `target <= current`.
    pub fn pending_up(
        &self,
        current: Version,
        target: Version,
    ) -> impl Iterator<Item = &MigrationStep> {
        self.steps
            .iter()
            .skip_while(move |s| s.version <= current)
            .take_while(move |s| s.version <= target)
    }

    /// Steps with `target < version <= current`, descending, each paired with
    /// the version recorded once it has been reverted. Empty when
    /// `target >= current`.
    pub fn pending_down(
        &self,
        current: Version,
        target: Version,
    ) -> impl Iterator<Item = (&MigrationStep, Version)> {
        self.steps
            .windows(2)
            .rev()
            .skip_while(move |w| w[1].version > current)
            .take_while(move |w| w[1].version > target)
            .map(|w| (&w[1], w[0].version))
    }
}

impl TryFrom<Vec<MigrationStep>> for MigrationHistory {
    type Error = Error;

    fn try_from(steps: Vec<MigrationStep>) -> Result<Self> {
        Self::new(steps)
    }
}
