use crate::error::{AuthorstatError, Result};
use crate::model::{Author, Commit, DataContainer, File, FileChange};
use crate::util::{epoch_to_datetime, obfuscate_email};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Reader state. Transitions are driven by single-line lookahead on the
/// `start` / `startcomment` / `end` marker prefixes; `FileChanges` is the
/// initial and default state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FileChanges,
    Summary,
    Comment,
}

/// One-pass parser for the record-delimited git log export:
///
/// ```text
/// start
/// <hash>;<author_email>;<author_ts>;<committer_email>;<committer_ts>;<branch>
/// startcomment
/// <message lines>
/// end
/// <additions>\t<deletions>\t<path>
/// ```
///
/// The format is trusted: a file change with a disallowed extension is the
/// only recoverable fault (that change is dropped, the commit kept).
/// Anything else malformed fails the whole parse.
pub struct LogParser {
    state: State,
    commits: Vec<Commit>,
    authors: Vec<Author>,
    author_index: HashMap<String, usize>,
    files: Vec<Rc<File>>,
    file_index: HashMap<String, Rc<File>>,
    file_changes: Vec<FileChange>,
}

impl LogParser {
    fn new() -> Self {
        Self {
            state: State::FileChanges,
            commits: Vec::new(),
            authors: Vec::new(),
            author_index: HashMap::new(),
            files: Vec::new(),
            file_index: HashMap::new(),
            file_changes: Vec::new(),
        }
    }

    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<DataContainer> {
        let text = fs::read_to_string(path)?;
        Self::parse_str(&text)
    }

    pub fn parse_str(input: &str) -> Result<DataContainer> {
        let mut parser = Self::new();
        for line in input.lines() {
            parser.process_line(line.trim_end_matches('\r'))?;
        }
        Ok(parser.finish())
    }

    fn process_line(&mut self, line: &str) -> Result<()> {
        // blank separator lines are legal everywhere
        if line.len() <= 1 {
            return Ok(());
        }

        match self.state {
            State::FileChanges => {
                if line.starts_with("start") {
                    self.state = State::Summary;
                } else {
                    self.read_file_change(line)?;
                }
            }
            State::Summary => {
                if line.starts_with("startcomment") {
                    self.state = State::Comment;
                } else {
                    self.read_summary(line)?;
                }
            }
            State::Comment => {
                if line.starts_with("end") {
                    self.state = State::FileChanges;
                } else {
                    self.read_comment(line)?;
                }
            }
        }
        Ok(())
    }

    /// `hash;author_email;author_ts;committer_email;committer_ts;branch`,
    /// extra fields ignored. Both emails are obfuscated before use.
    fn read_summary(&mut self, line: &str) -> Result<()> {
        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() < 6 {
            return Err(AuthorstatError::Parse(format!(
                "summary line has {} fields, expected 6: {line:?}",
                fields.len()
            )));
        }

        let author_email = obfuscate_email(fields[1]);
        let commit = Commit {
            short_hash: fields[0].to_string(),
            author_time: epoch_to_datetime(fields[2])?,
            commit_email: obfuscate_email(fields[3]),
            commit_time: epoch_to_datetime(fields[4])?,
            branch: fields[5].to_string(),
            comment: String::new(),
            file_changes: Vec::new(),
        };

        let commit_id = self.commits.len();
        self.commits.push(commit);

        let author_id = match self.author_index.get(&author_email) {
            Some(&id) => id,
            None => {
                let id = self.authors.len();
                self.authors.push(Author {
                    email: author_email.clone(),
                    commit_ids: Vec::new(),
                });
                self.author_index.insert(author_email, id);
                id
            }
        };
        self.authors[author_id].commit_ids.push(commit_id);

        Ok(())
    }

    fn read_comment(&mut self, line: &str) -> Result<()> {
        let commit = self.commits.last_mut().ok_or_else(|| {
            AuthorstatError::Parse(format!("comment line before any commit: {line:?}"))
        })?;
        commit.comment.push_str(line);
        commit.comment.push(' ');
        Ok(())
    }

    /// `additions\tdeletions\tpath`. A path rejected by the extension
    /// allow-list drops just this change.
    fn read_file_change(&mut self, line: &str) -> Result<()> {
        let mut parts = line.splitn(3, '\t');
        let (additions, deletions, path) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(d), Some(p)) => (a, d, p),
            _ => {
                return Err(AuthorstatError::Parse(format!(
                    "malformed file change line: {line:?}"
                )))
            }
        };

        let file = match self.file_index.get(path) {
            Some(file) => Rc::clone(file),
            None => match File::new(path) {
                Ok(file) => {
                    let file = Rc::new(file);
                    self.file_index.insert(path.to_string(), Rc::clone(&file));
                    self.files.push(Rc::clone(&file));
                    file
                }
                Err(AuthorstatError::InvalidFileType(_)) => return Ok(()),
                Err(err) => return Err(err),
            },
        };

        let change = FileChange::new(file, additions, deletions);
        self.file_changes.push(change.clone());

        let commit = self.commits.last_mut().ok_or_else(|| {
            AuthorstatError::Parse(format!("file change before any commit: {line:?}"))
        })?;
        commit.file_changes.push(change);

        Ok(())
    }

    fn finish(self) -> DataContainer {
        DataContainer::new(
            self.commits,
            self.authors,
            self.author_index,
            self.files,
            self.file_index,
            self.file_changes,
        )
    }
}
