//! Shell-style file-name patterns.
//!
//! Supports `*`, `?`, `[abc]`, `[a-z]`, `[!abc]` and `{a,b}` alternation.
//! Patterns are matched against a file *name*, never against the folder it
//! lives in. Several patterns may be combined; a name matches if any of them
//! does.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fmt;
use std::str::FromStr;

/// A compiled set of wildcard patterns.
///
/// # Examples
///
/// ```
/// use dsfind_catalog::Pattern;
///
/// let pattern = Pattern::new(["*.vmdk", "*.iso"]).unwrap();
/// assert!(pattern.is_match("web-flat.VMDK"));
/// assert!(pattern.is_match("install.iso"));
/// assert!(!pattern.is_match("web.vmx"));
/// ```
#[derive(Debug, Clone)]
pub struct Pattern {
    globs: Vec<String>,
    case_sensitive: bool,
    set: GlobSet,
}

impl Pattern {
    /// Compile case-insensitive patterns.
    pub fn new<I>(globs: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::build(globs.into_iter().map(Into::into).collect(), false)
    }

    /// Compile case-sensitive patterns.
    pub fn case_sensitive<I>(globs: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::build(globs.into_iter().map(Into::into).collect(), true)
    }

    fn build(globs: Vec<String>, case_sensitive: bool) -> Result<Self> {
        if globs.is_empty() {
            exn::bail!(ErrorKind::InvalidPattern("no patterns given".to_string()));
        }
        let mut builder = GlobSetBuilder::new();
        for glob in &globs {
            if glob.is_empty() {
                exn::bail!(ErrorKind::InvalidPattern("empty pattern".to_string()));
            }
            let compiled = GlobBuilder::new(glob)
                .case_insensitive(!case_sensitive)
                .build()
                .or_raise(|| ErrorKind::InvalidPattern(glob.clone()))?;
            builder.add(compiled);
        }
        let set = builder.build().or_raise(|| ErrorKind::InvalidPattern(globs.join(", ")))?;
        Ok(Self { globs, case_sensitive, set })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.set.is_match(name)
    }

    pub fn globs(&self) -> &[String] {
        &self.globs
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.globs.join(", "))
    }
}

impl FromStr for Pattern {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::new(s.split(',').map(str::trim).filter(|glob| !glob.is_empty()))
    }
}
