//! Batch rename: apply a name pattern (literal text, a `{counter}`,
//! `{date}`, or `{ext}` token, or a find/replace rule) across a set of
//! entries and preview the result, including conflicts, before anything
//! touches disk.

use chrono::Local;
use regex::Regex;

use crate::error::Result;
use crate::path::Path;

#[derive(Debug, Clone)]
pub enum RenameToken {
    Text(String),
    Counter { start: u32, padding: usize },
    Date { format: String },
    OriginalName,
    Extension,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenamePreview {
    pub original: Path,
    pub new_name: String,
    pub has_conflict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchRenameError {
    #[error("no files selected")]
    NoFiles,
    #[error("invalid regex pattern: {0}")]
    InvalidPattern(String),
}

/// Either a token pattern (`"{name}_{counter}{ext}"`) or a find/replace
/// rule, applied to every file in `files` to produce a preview.
pub struct BatchRename {
    files: Vec<Path>,
    tokens: Vec<RenameToken>,
    find_replace: Option<(Regex, String)>,
    counter_start: u32,
    counter_padding: usize,
}

impl BatchRename {
    pub fn new(files: Vec<Path>) -> Self {
        Self {
            files,
            tokens: vec![RenameToken::OriginalName],
            find_replace: None,
            counter_start: 1,
            counter_padding: 2,
        }
    }

    pub fn set_pattern(&mut self, tokens: Vec<RenameToken>) {
        self.tokens = tokens;
        self.find_replace = None;
    }

    pub fn set_find_replace(
        &mut self,
        find: &str,
        replace: &str,
        use_regex: bool,
        case_insensitive: bool,
    ) -> std::result::Result<(), BatchRenameError> {
        let pattern = if use_regex { find.to_string() } else { regex::escape(find) };
        let regex = regex::RegexBuilder::new(&pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| BatchRenameError::InvalidPattern(e.to_string()))?;
        self.find_replace = Some((regex, replace.to_string()));
        Ok(())
    }

    pub fn set_counter_start(&mut self, start: u32, padding: usize) {
        self.counter_start = start;
        self.counter_padding = padding;
    }

    fn render_name(&self, original_path: &Path, index: u32) -> String {
        if let Some((regex, replacement)) = &self.find_replace {
            return regex.replace_all(&original_path.name(), replacement.as_str()).to_string();
        }

        let name = original_path.name();
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
            _ => (name.clone(), String::new()),
        };
        let counter_value = self.counter_start + index;

        self.tokens
            .iter()
            .map(|token| match token {
                RenameToken::Text(text) => text.clone(),
                RenameToken::OriginalName => stem.clone(),
                RenameToken::Extension => ext.clone(),
                RenameToken::Counter { start, padding } => {
                    format!("{:0width$}", start + index, width = (*padding).max(self.counter_padding))
                }
                RenameToken::Date { format } => Local::now().format(format).to_string(),
            })
            .collect::<Vec<_>>()
            .join("")
            .replace("{counter}", &format!("{:0width$}", counter_value, width = self.counter_padding))
    }

    pub fn preview(&self) -> std::result::Result<Vec<RenamePreview>, BatchRenameError> {
        if self.files.is_empty() {
            return Err(BatchRenameError::NoFiles);
        }

        let mut new_names: Vec<String> = Vec::with_capacity(self.files.len());
        for (index, file) in self.files.iter().enumerate() {
            new_names.push(self.render_name(file, index as u32));
        }

        let previews = self
            .files
            .iter()
            .zip(new_names.iter())
            .map(|(original, new_name)| {
                let conflict_count = new_names.iter().filter(|n| *n == new_name).count();
                RenamePreview {
                    original: original.clone(),
                    new_name: new_name.clone(),
                    has_conflict: conflict_count > 1,
                }
            })
            .collect();
        Ok(previews)
    }

    /// Applies the previewed renames. Aborts before touching anything if
    /// any pair would conflict.
    pub fn apply(&self) -> std::result::Result<(), BatchRenameError> {
        let previews = self.preview()?;
        if previews.iter().any(|p| p.has_conflict) {
            return Err(BatchRenameError::InvalidPattern("renamed names collide".to_string()));
        }
        for preview in previews {
            let dest = preview.original.parent().unwrap_or_else(|| preview.original.clone()).join(&preview.new_name);
            apply_one(&preview.original, &dest).map_err(|e| BatchRenameError::InvalidPattern(e.to_string()))?;
        }
        Ok(())
    }
}

fn apply_one(original: &Path, dest: &Path) -> Result<()> {
    original.rename(dest)
}
