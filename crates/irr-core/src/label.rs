//! Annotation labels and the construct classes they belong to.
//!
//! Labels, construct classes, stream roles and session conditions are closed
//! enumerations. The class → labels grouping is a static table, so there is
//! no mutable registry anywhere in the crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error for strings that do not name a known enumeration value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnknownName {
    #[error("unknown label: {0}")]
    Label(String),

    #[error("unknown construct class: {0}")]
    ConstructClass(String),

    #[error("unknown stream role: {0}")]
    StreamRole(String),

    #[error("unknown condition: {0}")]
    Condition(String),
}

/// A single categorical annotation value.
///
/// Every label except [`Label::MissingData`] belongs to exactly one
/// [`ConstructClass`]. The derived ordering follows declaration order and is
/// used wherever a deterministic label order is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    // Task engagement
    GoalOriented,
    Aimless,
    AdultSeeking,
    NoPlay,
    // Social engagement
    Solitary,
    Onlooker,
    Parallel,
    Associative,
    Cooperative,
    // Social attitude
    Prosocial,
    Adversarial,
    Assertive,
    Frustrated,
    Passive,
    /// No annotation covers the queried instant.
    MissingData,
}

impl Label {
    /// String representation used in annotation files and exports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GoalOriented => "goaloriented",
            Self::Aimless => "aimless",
            Self::AdultSeeking => "adultseeking",
            Self::NoPlay => "noplay",
            Self::Solitary => "solitary",
            Self::Onlooker => "onlooker",
            Self::Parallel => "parallel",
            Self::Associative => "associative",
            Self::Cooperative => "cooperative",
            Self::Prosocial => "prosocial",
            Self::Adversarial => "adversarial",
            Self::Assertive => "assertive",
            Self::Frustrated => "frustrated",
            Self::Passive => "passive",
            Self::MissingData => "missingdata",
        }
    }

    /// The construct class this label belongs to, `None` for `MissingData`.
    pub fn construct_class(&self) -> Option<ConstructClass> {
        ConstructClass::ALL
            .into_iter()
            .find(|class| class.labels().contains(self))
    }

    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::MissingData)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "goaloriented" => Ok(Self::GoalOriented),
            "aimless" => Ok(Self::Aimless),
            "adultseeking" => Ok(Self::AdultSeeking),
            "noplay" => Ok(Self::NoPlay),
            "solitary" => Ok(Self::Solitary),
            "onlooker" => Ok(Self::Onlooker),
            "parallel" => Ok(Self::Parallel),
            "associative" => Ok(Self::Associative),
            "cooperative" => Ok(Self::Cooperative),
            "prosocial" => Ok(Self::Prosocial),
            "adversarial" => Ok(Self::Adversarial),
            "assertive" => Ok(Self::Assertive),
            "frustrated" => Ok(Self::Frustrated),
            "passive" => Ok(Self::Passive),
            "missingdata" => Ok(Self::MissingData),
            _ => Err(UnknownName::Label(s.to_string())),
        }
    }
}

/// Generates string-backed serde impls that go through `Display`/`FromStr`.
macro_rules! serde_via_str {
    ($name:ident) => {
        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_via_str!(Label);
serde_via_str!(ConstructClass);
serde_via_str!(StreamRole);
serde_via_str!(Condition);

/// One of the three mutually exclusive annotation taxonomies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstructClass {
    TaskEngagement,
    SocialEngagement,
    SocialAttitude,
}

const TASK_ENGAGEMENT: [Label; 4] = [
    Label::GoalOriented,
    Label::Aimless,
    Label::AdultSeeking,
    Label::NoPlay,
];

const SOCIAL_ENGAGEMENT: [Label; 5] = [
    Label::Solitary,
    Label::Onlooker,
    Label::Parallel,
    Label::Associative,
    Label::Cooperative,
];

const SOCIAL_ATTITUDE: [Label; 5] = [
    Label::Prosocial,
    Label::Adversarial,
    Label::Assertive,
    Label::Frustrated,
    Label::Passive,
];

impl ConstructClass {
    /// All classes in canonical order.
    pub const ALL: [Self; 3] = [
        Self::TaskEngagement,
        Self::SocialEngagement,
        Self::SocialAttitude,
    ];

    /// The ordered label set of this class.
    pub const fn labels(&self) -> &'static [Label] {
        match self {
            Self::TaskEngagement => &TASK_ENGAGEMENT,
            Self::SocialEngagement => &SOCIAL_ENGAGEMENT,
            Self::SocialAttitude => &SOCIAL_ATTITUDE,
        }
    }

    pub fn contains(&self, label: Label) -> bool {
        self.labels().contains(&label)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TaskEngagement => "task_engagement",
            Self::SocialEngagement => "social_engagement",
            Self::SocialAttitude => "social_attitude",
        }
    }
}

impl fmt::Display for ConstructClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConstructClass {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task_engagement" => Ok(Self::TaskEngagement),
            "social_engagement" => Ok(Self::SocialEngagement),
            "social_attitude" => Ok(Self::SocialAttitude),
            _ => Err(UnknownName::ConstructClass(s.to_string())),
        }
    }
}

/// Which child an event stream describes.
///
/// Surfaced externally by the color each child wore during the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StreamRole {
    Primary,
    Secondary,
}

impl StreamRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "purple",
            Self::Secondary => "yellow",
        }
    }
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamRole {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purple" | "primary" => Ok(Self::Primary),
            "yellow" | "secondary" => Ok(Self::Secondary),
            _ => Err(UnknownName::StreamRole(s.to_string())),
        }
    }
}

/// Session condition: whether both children were human and annotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Condition {
    /// Two children, both streams annotated.
    #[default]
    TwoStream,
    /// One child with a robot partner; only the primary stream exists.
    OneStream,
}

impl Condition {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TwoStream => "childchild",
            Self::OneStream => "childrobot",
        }
    }

    /// Stream roles annotated under this condition, primary first.
    pub const fn roles(&self) -> &'static [StreamRole] {
        match self {
            Self::TwoStream => &[StreamRole::Primary, StreamRole::Secondary],
            Self::OneStream => &[StreamRole::Primary],
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "childchild" => Ok(Self::TwoStream),
            "childrobot" => Ok(Self::OneStream),
            _ => Err(UnknownName::Condition(s.to_string())),
        }
    }
}
