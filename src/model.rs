use crate::error::{AuthorstatError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::rc::Rc;

/// File suffixes (including the dot) that count as source files. Changes to
/// anything else are dropped during parsing.
pub const ALLOWED_FILE_TYPES: [&str; 5] = [".py", ".html", ".js", ".css", ".rb"];
pub const ENFORCE_FILE_TYPES: bool = true;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub path: String,
    pub name: String,
    pub file_type: String,
}

impl File {
    /// Build a `File` from a normalized (trimmed) path. Rejects paths whose
    /// suffix is not in [`ALLOWED_FILE_TYPES`] while enforcement is on.
    pub fn new(path: &str) -> Result<Self> {
        let file_type = match path.rfind('.') {
            Some(idx) => path[idx..].to_string(),
            None => String::new(),
        };
        if ENFORCE_FILE_TYPES && !ALLOWED_FILE_TYPES.contains(&file_type.as_str()) {
            return Err(AuthorstatError::InvalidFileType(path.to_string()));
        }
        let name = match path.rfind('/') {
            Some(idx) => path[idx + 1..].to_string(),
            None => path.to_string(),
        };
        Ok(Self {
            path: path.to_string(),
            name,
            file_type,
        })
    }

    /// A file is a test file when its basename leads with "test" or follows
    /// the `*spec.rb` convention.
    pub fn is_test(&self) -> bool {
        let head: String = self.name.chars().take(4).collect();
        head.contains("test") || self.name.contains("spec.rb")
    }
}

#[derive(Debug, Clone)]
pub struct FileChange {
    pub file: Rc<File>,
    pub additions: u64,
    pub deletions: u64,
}

impl FileChange {
    /// Raw delta fields come straight from the log; non-numeric values
    /// (binary-file markers such as `-`) map to a zero/zero change.
    pub fn new(file: Rc<File>, additions: &str, deletions: &str) -> Self {
        let (additions, deletions) = match (additions.trim().parse(), deletions.trim().parse()) {
            (Ok(a), Ok(d)) => (a, d),
            _ => (0, 0),
        };
        Self {
            file,
            additions,
            deletions,
        }
    }

    pub fn changes(&self) -> u64 {
        self.additions + self.deletions
    }

    pub fn new_lines(&self) -> u64 {
        self.additions.saturating_sub(self.deletions)
    }
}

#[derive(Debug, Clone)]
pub struct Commit {
    pub short_hash: String,
    pub author_time: DateTime<Utc>,
    pub commit_email: String,
    pub commit_time: DateTime<Utc>,
    pub branch: String,
    pub comment: String,
    pub file_changes: Vec<FileChange>,
}

impl Commit {
    pub fn number_of_changes(&self) -> u64 {
        self.file_changes.iter().map(FileChange::changes).sum()
    }

    pub fn number_of_new_lines(&self) -> u64 {
        self.file_changes.iter().map(FileChange::new_lines).sum()
    }

    pub fn number_of_deletions(&self) -> u64 {
        self.file_changes.iter().map(|fc| fc.deletions).sum()
    }

    pub fn number_of_test_new_lines(&self) -> u64 {
        self.file_changes
            .iter()
            .filter(|fc| fc.file.is_test())
            .map(FileChange::new_lines)
            .sum()
    }

    pub fn is_merge_commit(&self) -> bool {
        self.comment.contains("Merge branch")
    }
}

/// An author is identified by its obfuscated email and owns nothing but the
/// positions of its commits in the container's newest-first sequence.
/// Immutable after parse; derived metrics live in freestanding
/// [`crate::stats::AuthorStats`] records.
#[derive(Debug, Clone)]
pub struct Author {
    pub email: String,
    pub commit_ids: Vec<usize>,
}

/// Half-open aggregation window `[from, to)`. Both bounds absent means the
/// all-time window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn bounded(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn with_from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        if let Some(from) = self.from {
            if timestamp < &from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if timestamp >= &to {
                return false;
            }
        }
        true
    }

    pub fn is_all_time(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Everything one parse produced: deduplicated author and file registries
/// plus the flat, insertion-ordered commit and file-change sequences.
/// Read-only after construction.
#[derive(Debug)]
pub struct DataContainer {
    commits: Vec<Commit>,
    authors: Vec<Author>,
    author_index: HashMap<String, usize>,
    files: Vec<Rc<File>>,
    file_index: HashMap<String, Rc<File>>,
    file_changes: Vec<FileChange>,
}

impl DataContainer {
    /// The log is expected newest-first, but downstream cadence clustering
    /// and window derivation depend on it, so the ordering is enforced here:
    /// commits are stably sorted by commit-time descending and every
    /// author's commit positions are remapped to match.
    pub fn new(
        commits: Vec<Commit>,
        mut authors: Vec<Author>,
        author_index: HashMap<String, usize>,
        files: Vec<Rc<File>>,
        file_index: HashMap<String, Rc<File>>,
        file_changes: Vec<FileChange>,
    ) -> Self {
        let mut order: Vec<usize> = (0..commits.len()).collect();
        order.sort_by(|&a, &b| commits[b].commit_time.cmp(&commits[a].commit_time));

        let mut remap = vec![0usize; commits.len()];
        for (new_idx, &old_idx) in order.iter().enumerate() {
            remap[old_idx] = new_idx;
        }

        let mut slots: Vec<Option<Commit>> = commits.into_iter().map(Some).collect();
        let commits: Vec<Commit> = order.iter().filter_map(|&i| slots[i].take()).collect();

        for author in &mut authors {
            for id in &mut author.commit_ids {
                *id = remap[*id];
            }
            // ascending positions == newest-first within the author
            author.commit_ids.sort_unstable();
        }

        Self {
            commits,
            authors,
            author_index,
            files,
            file_index,
            file_changes,
        }
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    pub fn files(&self) -> &[Rc<File>] {
        &self.files
    }

    pub fn file_changes(&self) -> &[FileChange] {
        &self.file_changes
    }

    pub fn author_by_email(&self, email: &str) -> Option<&Author> {
        self.author_index.get(email).map(|&idx| &self.authors[idx])
    }

    pub fn file_by_path(&self, path: &str) -> Option<&Rc<File>> {
        self.file_index.get(path)
    }

    /// The author's commits, newest-first.
    pub fn commits_of<'a>(&'a self, author: &Author) -> Vec<&'a Commit> {
        author.commit_ids.iter().map(|&id| &self.commits[id]).collect()
    }
}
