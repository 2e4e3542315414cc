// Pomace
// Copyright (c) 2024-2026 The Pomace Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A path-component-aware wildcard matcher, built for matching entries inside archive and disk
//! image containers where the path separator is whatever convention that container uses
//! (`/`, `:`, or none at all) rather than the host OS's own separator.
//!
//! `*` matches any run of characters within a single component; `?` matches exactly one
//! character within a component; `\` escapes the character that follows it, including a
//! separator, so an escaped separator stays inside the component it appears in rather than
//! splitting the pattern there.

use std::cell::Cell;

use regex_lite::Regex;

use crate::errors::{invalid_argument, Result};

/// Matches a path, component by component, against a compiled wildcard pattern.
///
/// A `Glob` is built once from a pattern string and a set of separator characters, then matched
/// against any number of candidate paths. [`Glob::has_matched`] tracks whether any call to
/// [`Glob::matches`] has ever succeeded, which callers use to flag patterns that never matched
/// anything over a batch of paths.
pub struct Glob {
    components: Vec<Regex>,
    has_matched: Cell<bool>,
}

impl Glob {
    /// Compiles `pattern` into a `Glob`. The pattern is split into components on any character
    /// in `separators`; a backslash escapes the character following it (including a separator,
    /// `*`, `?`, or another backslash), keeping it out of the split and matched literally.
    ///
    /// An empty pattern compiles to a single component that matches only the empty string.
    pub fn new(pattern: &str, separators: &str, case_sensitive: bool) -> Result<Glob> {
        if pattern.is_empty() {
            return Ok(Glob { components: vec![compile_component("", case_sensitive)?], has_matched: Cell::new(false) });
        }

        let mut components = Vec::new();
        let mut current = String::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '\\' {
                current.push('\\');
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if separators.contains(c) {
                components.push(compile_component(&current, case_sensitive)?);
                current.clear();
            } else {
                current.push(c);
            }
        }
        components.push(compile_component(&current, case_sensitive)?);

        Ok(Glob { components, has_matched: Cell::new(false) })
    }

    /// Matches `path` against this glob's compiled components.
    ///
    /// `separator` is the single character that splits `path` into components (pass `'\0'` to
    /// treat the whole path as one component, the "no separator" sentinel). A single trailing
    /// separator is trimmed first, to tolerate archive "directory" entries that store a name
    /// ending in the separator.
    ///
    /// If `prefix_ok` is `true`, `path` may have more components than the pattern as long as
    /// every pattern component matches; otherwise the component counts must match exactly.
    pub fn matches(&self, path: &str, separator: char, prefix_ok: bool) -> bool {
        let trimmed = path.strip_suffix(separator).unwrap_or(path);

        let path_components: Vec<&str> =
            if separator == '\0' { vec![trimmed] } else { trimmed.split(separator).collect() };

        if path_components.len() < self.components.len() {
            return false;
        }
        if !prefix_ok && path_components.len() != self.components.len() {
            return false;
        }

        let matched = self
            .components
            .iter()
            .zip(path_components.iter())
            .all(|(regex, component)| regex.is_match(component));

        if matched {
            self.has_matched.set(true);
        }
        matched
    }

    /// Returns `true` if [`Glob::matches`] has ever returned `true` for this instance.
    pub fn has_matched(&self) -> bool {
        self.has_matched.get()
    }
}

/// Compiles one already-split pattern component (escapes preserved as `\X` pairs) into an
/// anchored regex.
fn compile_component(component: &str, case_sensitive: bool) -> Result<Regex> {
    let mut source = String::from("^");
    if !case_sensitive {
        source.push_str("(?i)");
    }

    let mut chars = component.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => source.push_str(&regex_lite::escape(&escaped.to_string())),
                None => return invalid_argument("glob: trailing escape character with nothing to escape"),
            },
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            _ => source.push_str(&regex_lite::escape(&c.to_string())),
        }
    }
    source.push('$');

    Regex::new(&source).map_err(|_| crate::errors::Error::InvalidArgument("glob: failed to compile pattern component"))
}
