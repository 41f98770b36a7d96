//! Cypress spec scanner
//!
//! Extracts test case definitions from annotated Cypress specs. Every `describe`
//! opens a user story and every `it` a test case inside it. `TBCS_AUTID` and
//! `TBCS_DESCRIPTION` fill in the test case metadata, and each `cy.log` becomes
//! a test step.

use crate::model::{Epic, TestCaseDefinition, UserStory};
use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Spec files are matched by this file name suffix unless told otherwise
pub const DEFAULT_SPEC_SUFFIX: &str = "spec.js";

/// Epic that imported user stories are created in unless told otherwise
pub const DEFAULT_EPIC: &str = "Cypress-Tests";

/// User stories found in one spec file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFile {
    pub path: PathBuf,
    pub user_stories: Vec<UserStory>,
}

pub struct CypressParser {
    quoted: Regex,
    meta: Regex,
}

impl CypressParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            quoted: Regex::new(r"\('(.*?)'")?,
            meta: Regex::new(r"^(TBCS_AUTID|TBCS_DESCRIPTION)\('(.*)'\)")?,
        })
    }

    /// First single-quoted argument of a call, or the whole line
    fn name_of(&self, line: &str) -> String {
        self.quoted
            .captures(line)
            .and_then(|c| c.get(1))
            .map_or_else(|| line.to_string(), |m| m.as_str().to_string())
    }

    fn meta_of(&self, line: &str) -> String {
        self.meta
            .captures(line)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }

    /// Parse the content of one spec file.
    ///
    /// Test cases that appear before any `describe` go into a user story named
    /// `fallback_story` and keep their bare `it` name.
    pub fn parse(&self, content: &str, fallback_story: &str) -> Vec<UserStory> {
        let mut stories: Vec<UserStory> = Vec::new();
        let mut described = false;

        for line in content.lines() {
            let line = line.trim_start();

            if line.starts_with("describe(") {
                stories.push(UserStory::new(&self.name_of(line)));
                described = true;
                continue;
            }
            if line.starts_with("it(") {
                if stories.is_empty() {
                    stories.push(UserStory::new(fallback_story));
                }
                let Some(story) = stories.last_mut() else {
                    continue;
                };
                let name = if described {
                    format!("{} {}", story.name, self.name_of(line))
                } else {
                    self.name_of(line)
                };
                story.test_cases.push(TestCaseDefinition::new("", &name));
                continue;
            }

            let Some(current) = stories.last_mut().and_then(|s| s.test_cases.last_mut()) else {
                continue;
            };
            if line.starts_with("TBCS_AUTID") {
                current.external_id = self.meta_of(line);
            } else if line.starts_with("TBCS_DESCRIPTION") {
                current.description = Some(self.meta_of(line));
            } else if line.starts_with("TBCS_CATEGORY") {
                continue;
            } else if line.starts_with("cy.log(") {
                current.test_steps.push(self.name_of(line));
            }
        }

        stories
    }

    pub fn parse_file(&self, path: &Path) -> Result<SpecFile> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read spec: {}", path.display()))?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(SpecFile {
            path: path.to_path_buf(),
            user_stories: self.parse(&content, &stem),
        })
    }
}

/// Parse every file under `dir` whose name ends with `suffix`, in path order
pub fn scan_specs(dir: &Path, suffix: &str) -> Result<Vec<SpecFile>> {
    let parser = CypressParser::new()?;

    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().ends_with(suffix))
        .map(|e| e.into_path())
        .collect();
    paths.sort();

    let mut specs = Vec::with_capacity(paths.len());
    for path in paths {
        log::debug!("Scanning {}", path.display());
        specs.push(parser.parse_file(&path)?);
    }
    Ok(specs)
}

/// One epic named `epic_name` holding the user stories of every spec under `dir`
pub fn scan_epic(dir: &Path, suffix: &str, epic_name: &str) -> Result<Epic> {
    let mut epic = Epic::new(epic_name);
    for spec in scan_specs(dir, suffix)? {
        epic.user_stories.extend(spec.user_stories);
    }
    Ok(epic)
}
