//! Include/exclude selection of archive entry names.
//!
//! An entry is selected when it matches at least one include pattern and no
//! exclude pattern. Matching is anchored to the whole slash-delimited name:
//! `*` and `?` never cross `/`, while a `**` segment spans any number of
//! directories. Evaluation is a plain disjunction on each side, so pattern
//! order never changes the result.
//!
//! Names follow shell rules for hidden files: a path segment starting with
//! `.` is only matched by a pattern segment that itself starts with a literal
//! `.`. Neither `*` nor `**` reaches `.env` or `.git/config` on its own.

use globset::{GlobBuilder, GlobMatcher};

#[derive(Debug, thiserror::Error)]
#[error("invalid glob pattern '{pattern}': {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    source: globset::Error,
}

#[derive(Debug, Clone)]
enum Segment {
    /// `**`: zero or more whole path segments, none of them hidden.
    AnyDepth,
    Glob {
        matcher: GlobMatcher,
        leading_dot: bool,
    },
}

impl Segment {
    fn matches(&self, name_segment: &str) -> bool {
        match self {
            Self::AnyDepth => false,
            Self::Glob {
                matcher,
                leading_dot,
            } => {
                (*leading_dot || !name_segment.starts_with('.')) && matcher.is_match(name_segment)
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    segments: Vec<Segment>,
}

impl CompiledPattern {
    fn compile(pattern: &str) -> Result<Self, PatternError> {
        let segments = pattern
            .split('/')
            .map(|segment| {
                if segment == "**" {
                    return Ok(Segment::AnyDepth);
                }
                let matcher = GlobBuilder::new(segment)
                    .literal_separator(true)
                    .backslash_escape(true)
                    .build()
                    .map_err(|source| PatternError {
                        pattern: pattern.to_string(),
                        source,
                    })?
                    .compile_matcher();
                Ok(Segment::Glob {
                    matcher,
                    leading_dot: segment.starts_with('.'),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    fn is_match(&self, name_segments: &[&str]) -> bool {
        match_segments(&self.segments, name_segments)
    }
}

fn match_segments(pattern: &[Segment], name: &[&str]) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            for consumed in 0..=name.len() {
                if match_segments(rest, &name[consumed..]) {
                    return true;
                }
                if name.get(consumed).is_some_and(|segment| segment.starts_with('.')) {
                    return false;
                }
            }
            false
        }
        Some((segment, rest)) => match name.split_first() {
            Some((head, tail)) => segment.matches(head) && match_segments(rest, tail),
            None => false,
        },
    }
}

#[derive(Debug, Clone)]
pub struct PatternFilter {
    include: Vec<CompiledPattern>,
    exclude: Vec<CompiledPattern>,
}

impl PatternFilter {
    pub fn new<I, E>(include: I, exclude: E) -> Result<Self, PatternError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Ok(Self {
            include: compile_all(include)?,
            exclude: compile_all(exclude)?,
        })
    }

    pub fn is_selected(&self, entry_name: &str) -> bool {
        let segments: Vec<&str> = entry_name.split('/').collect();
        self.include.iter().any(|pattern| pattern.is_match(&segments))
            && !self.exclude.iter().any(|pattern| pattern.is_match(&segments))
    }
}

/// One-shot form of [`PatternFilter::is_selected`].
pub fn selected(
    entry_name: &str,
    include_patterns: &[String],
    exclude_patterns: &[String],
) -> Result<bool, PatternError> {
    Ok(PatternFilter::new(include_patterns, exclude_patterns)?.is_selected(entry_name))
}

fn compile_all<P>(patterns: P) -> Result<Vec<CompiledPattern>, PatternError>
where
    P: IntoIterator,
    P::Item: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|pattern| CompiledPattern::compile(pattern.as_ref()))
        .collect()
}
