use serde::{Deserialize, Serialize};

/// Inline annotation attached to a contiguous run of inline content.
///
/// Marks of the same type exclude each other (a run is either linked to one
/// href or not linked at all), with the exception of [`Mark::Comment`]: a run
/// may belong to several comment threads at once, so comment marks only
/// exclude a comment mark carrying the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Link {
        href: String,
    },
    #[serde(rename_all = "camelCase")]
    Comment {
        comment_id: String,
    },
    #[serde(rename_all = "camelCase")]
    TextStyle {
        font_family: String,
    },
}

impl Mark {
    pub fn comment(id: impl Into<String>) -> Self {
        Mark::Comment {
            comment_id: id.into(),
        }
    }

    pub fn link(href: impl Into<String>) -> Self {
        Mark::Link { href: href.into() }
    }

    /// Rank used to keep mark sets in a canonical order
    fn rank(&self) -> u8 {
        match self {
            Mark::Link { .. } => 0,
            Mark::Bold => 1,
            Mark::Italic => 2,
            Mark::Underline => 3,
            Mark::Strike => 4,
            Mark::Code => 5,
            Mark::TextStyle { .. } => 6,
            Mark::Comment { .. } => 7,
        }
    }

    /// Whether adding `self` to a set removes `other` from it
    pub fn excludes(&self, other: &Mark) -> bool {
        match (self, other) {
            (Mark::Comment { comment_id: a }, Mark::Comment { comment_id: b }) => a == b,
            _ => self.rank() == other.rank(),
        }
    }

    /// Inclusive marks extend to text typed at their end boundary.
    pub fn is_inclusive(&self) -> bool {
        !matches!(self, Mark::Link { .. } | Mark::Comment { .. })
    }

    pub fn comment_id(&self) -> Option<&str> {
        match self {
            Mark::Comment { comment_id } => Some(comment_id),
            _ => None,
        }
    }

    fn sort_key(&self) -> (u8, &str) {
        let attr = match self {
            Mark::Link { href } => href.as_str(),
            Mark::Comment { comment_id } => comment_id.as_str(),
            Mark::TextStyle { font_family } => font_family.as_str(),
            _ => "",
        };
        (self.rank(), attr)
    }
}

/// Add a mark to a set, replacing any mark it excludes. Keeps the set sorted.
pub fn add_to_set(set: &[Mark], mark: &Mark) -> Vec<Mark> {
    let mut out: Vec<Mark> = set.iter().filter(|m| !mark.excludes(m)).cloned().collect();
    out.push(mark.clone());
    out.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    out
}

pub fn remove_from_set(set: &[Mark], mark: &Mark) -> Vec<Mark> {
    set.iter().filter(|m| *m != mark).cloned().collect()
}

/// Normalize an arbitrary list of marks into a canonical set.
pub fn normalize_set(marks: impl IntoIterator<Item = Mark>) -> Vec<Mark> {
    marks
        .into_iter()
        .fold(Vec::new(), |set, mark| add_to_set(&set, &mark))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_marks_stack() {
        let set = add_to_set(&[], &Mark::comment("a"));
        let set = add_to_set(&set, &Mark::comment("b"));
        let set = add_to_set(&set, &Mark::Bold);

        assert_eq!(
            set,
            vec![Mark::Bold, Mark::comment("a"), Mark::comment("b")]
        );
    }

    #[test]
    fn same_type_marks_replace_each_other() {
        let set = add_to_set(&[], &Mark::link("https://a.example"));
        let set = add_to_set(&set, &Mark::link("https://b.example"));

        assert_eq!(set, vec![Mark::link("https://b.example")]);
    }

    #[test]
    fn duplicate_comment_id_is_not_doubled() {
        let set = add_to_set(&[Mark::comment("a")], &Mark::comment("a"));
        assert_eq!(set, vec![Mark::comment("a")]);
    }

    #[test]
    fn comment_and_link_are_not_inclusive() {
        assert!(!Mark::comment("a").is_inclusive());
        assert!(!Mark::link("x").is_inclusive());
        assert!(Mark::Bold.is_inclusive());
    }

    #[test]
    fn normalize_orders_marks() {
        let set = normalize_set([Mark::comment("z"), Mark::Italic, Mark::Bold]);
        assert_eq!(set, vec![Mark::Bold, Mark::Italic, Mark::comment("z")]);
    }
}
