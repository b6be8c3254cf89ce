use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum Gender {
    #[strum(serialize = "M")]
    Male,
    #[strum(serialize = "F")]
    Female,
}

/// One row of the roster. Names are the identity; friend and conflict
/// lists are kept exactly as declared and resolved later by `Roster`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub name: String,
    pub gender: Gender,
    pub good_language: bool,
    pub teacher_child: bool,
    pub lively: bool,
    pub special_needs: bool,
    pub friends: Vec<String>,
    pub conflicts: Vec<String>,
}

impl Student {
    pub fn new(name: impl Into<String>, gender: Gender) -> Self {
        Self {
            name: name.into(),
            gender,
            good_language: false,
            teacher_child: false,
            lively: false,
            special_needs: false,
            friends: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn is_boy(&self) -> bool {
        self.gender == Gender::Male
    }

    pub fn is_girl(&self) -> bool {
        self.gender == Gender::Female
    }

    pub fn has_trait(&self) -> bool {
        self.lively || self.special_needs
    }

    // Builder-style helpers, mostly for fixtures
    pub fn with_language(mut self, good: bool) -> Self {
        self.good_language = good;
        self
    }

    pub fn with_teacher_child(mut self, flag: bool) -> Self {
        self.teacher_child = flag;
        self
    }

    pub fn with_lively(mut self, flag: bool) -> Self {
        self.lively = flag;
        self
    }

    pub fn with_special_needs(mut self, flag: bool) -> Self {
        self.special_needs = flag;
        self
    }

    pub fn with_friends<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.friends = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_conflicts<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflicts = names.into_iter().map(Into::into).collect();
        self
    }
}
