//! Transient user-facing notifications.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every view reports outcomes (upload done, delete failed, login rejected)
//! as a `Notice` instead of printing. The CLI decides how to render them.

/// Visual weight of a notice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoticeVariant {
    #[default]
    Default,
    /// Failure the user should act on.
    Destructive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: Option<String>,
    pub variant: NoticeVariant,
}

impl Notice {
    #[must_use]
    pub fn info(title: impl Into<String>) -> Self {
        Self { title: title.into(), description: None, variant: NoticeVariant::Default }
    }

    #[must_use]
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: title.into(), description: Some(description.into()), variant: NoticeVariant::Destructive }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.variant == NoticeVariant::Destructive
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.title, description),
            None => f.write_str(&self.title),
        }
    }
}
