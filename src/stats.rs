use crate::model::{Commit, DataContainer, TimeWindow};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub const SCHEMA_VERSION: u32 = 1;

/// Fixed length of one aggregation window in the windowed series.
pub const QUARTAL_DAYS: i64 = 90;

/// Two commits whose author-times are closer than this belong to the same
/// working session.
const SESSION_GAP_HOURS: i64 = 8;

/// A session never stretches further than this from its first (newest)
/// commit, even when the gap rule alone would keep joining.
const SESSION_SPAN_HOURS: i64 = 18;

/// Per-author metrics for one window. Freestanding record: authors stay
/// immutable and every window gets its own copy, so windows are independent
/// of each other.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorStats {
    pub author: String,
    pub commit_number: u64,
    pub all_new_lines: u64,
    pub all_deleted_lines: u64,
    pub commits_per_day: f64,
    pub files_per_commit: f64,
    pub lines_per_commit: f64,
    pub commits_under_25: f64,
    pub commits_above_500: f64,
    pub test_line_ratio: f64,
    pub merge_commits: u64,
    pub test_new_lines: u64,
}

/// Project-level rollup over the window's qualifying authors. Derived from
/// the already-computed per-author records, never from raw commits.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStats {
    pub time_from: Option<DateTime<Utc>>,
    pub time_to: Option<DateTime<Utc>>,
    pub authors: u64,
    pub commit_number: u64,
    pub all_new_lines: u64,
    pub all_deleted_lines: u64,
    pub commits_per_day: f64,
    pub files_per_commit: f64,
    pub lines_per_commit: f64,
    pub commits_under_25: f64,
    pub commits_above_500: f64,
    pub test_line_ratio: f64,
    pub merge_commits: u64,
    pub test_new_lines: u64,
}

/// One window's full result set. `project` is `None` exactly when no author
/// has a commit in the window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowReport {
    pub time_from: Option<DateTime<Utc>>,
    pub time_to: Option<DateTime<Utc>>,
    pub authors: Vec<AuthorStats>,
    pub project: Option<ProjectStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub log_path: String,
    pub all_time: WindowReport,
    pub quartals: Vec<WindowReport>,
}

pub struct StatsEngine<'a> {
    data: &'a DataContainer,
}

impl<'a> StatsEngine<'a> {
    pub fn new(data: &'a DataContainer) -> Self {
        Self { data }
    }

    /// Compute one window: a metrics record per author with at least one
    /// commit in the window (filtered by commit-time), plus the project
    /// rollup. Authors without qualifying commits are excluded entirely.
    pub fn window_stats(&self, window: &TimeWindow) -> WindowReport {
        let mut authors = Vec::new();
        for author in self.data.authors() {
            let commits: Vec<&Commit> = self
                .data
                .commits_of(author)
                .into_iter()
                .filter(|c| window.contains(&c.commit_time))
                .collect();
            if commits.is_empty() {
                continue;
            }
            authors.push(author_stats(&author.email, &commits));
        }

        let project = if authors.is_empty() {
            None
        } else {
            Some(project_rollup(&authors, window))
        };

        WindowReport {
            time_from: window.from,
            time_to: window.to,
            authors,
            project,
        }
    }

    pub fn all_time(&self) -> WindowReport {
        self.window_stats(&TimeWindow::all_time())
    }

    /// Segment the project's span into fixed 90-day windows, oldest first.
    /// The span runs from the oldest commit-time (last element) to the
    /// newest (first element); a step starting at or past the span's end
    /// terminates the series.
    pub fn quartal_series(&self) -> Vec<WindowReport> {
        let commits = self.data.commits();
        let (newest, oldest) = match (commits.first(), commits.last()) {
            (Some(n), Some(o)) => (n.commit_time, o.commit_time),
            _ => return Vec::new(),
        };

        let step = Duration::days(QUARTAL_DAYS);
        let mut series = Vec::new();
        let mut start = oldest;
        while start < newest {
            series.push(self.window_stats(&TimeWindow::bounded(start, start + step)));
            start = start + step;
        }
        series
    }

    pub fn report(&self, log_path: &str) -> StatsOutput {
        StatsOutput {
            version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            log_path: log_path.to_string(),
            all_time: self.all_time(),
            quartals: self.quartal_series(),
        }
    }
}

fn author_stats(email: &str, commits: &[&Commit]) -> AuthorStats {
    let commit_number = commits.len() as u64;
    let all_new_lines: u64 = commits.iter().map(|c| c.number_of_new_lines()).sum();
    let all_deleted_lines: u64 = commits.iter().map(|c| c.number_of_deletions()).sum();
    let test_new_lines: u64 = commits.iter().map(|c| c.number_of_test_new_lines()).sum();
    let total_files: u64 = commits.iter().map(|c| c.file_changes.len() as u64).sum();
    let merge_commits = commits.iter().filter(|c| c.is_merge_commit()).count() as u64;

    AuthorStats {
        author: email.to_string(),
        commit_number,
        all_new_lines,
        all_deleted_lines,
        commits_per_day: commits_per_day(commits),
        files_per_commit: total_files as f64 / commit_number as f64,
        lines_per_commit: all_new_lines as f64 / commit_number as f64,
        commits_under_25: fraction_below(commits, 25),
        commits_above_500: fraction_below(commits, 500),
        test_line_ratio: ratio(test_new_lines, all_new_lines),
        merge_commits,
        test_new_lines,
    }
}

/// Fraction of commits whose total change count is strictly below the
/// threshold. Both size buckets use this predicate (the `commits_above_500`
/// field name is historical; it carries the below-500 fraction).
fn fraction_below(commits: &[&Commit], threshold: u64) -> f64 {
    let below = commits
        .iter()
        .filter(|c| c.number_of_changes() < threshold)
        .count();
    below as f64 / commits.len() as f64
}

/// 0 when the numerator is 0, which also covers the zero-denominator case
/// (test lines are a subset of all new lines).
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if numerator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Average commits per working session. Commits walk newest-first; a commit
/// joins the current session when the gap to the previous commit is under
/// 8 hours and the distance from the session's start stays under 18 hours,
/// otherwise it opens a new session. The result is commits / sessions.
///
/// Precondition: `commits` is non-empty (guarded by the qualification
/// filter in `window_stats`).
fn commits_per_day(commits: &[&Commit]) -> f64 {
    debug_assert!(!commits.is_empty());

    let gap_limit = Duration::hours(SESSION_GAP_HOURS);
    let span_limit = Duration::hours(SESSION_SPAN_HOURS);

    let mut sessions: u64 = 1;
    let mut session_start = commits[0].author_time;
    let mut previous = commits[0].author_time;

    for commit in commits {
        let t = commit.author_time;
        if previous - t >= gap_limit || session_start - t >= span_limit {
            sessions += 1;
            session_start = t;
        }
        previous = t;
    }

    commits.len() as f64 / sessions as f64
}

fn project_rollup(authors: &[AuthorStats], window: &TimeWindow) -> ProjectStats {
    let num_authors = authors.len() as u64;
    let commit_number: u64 = authors.iter().map(|a| a.commit_number).sum();
    let all_new_lines: u64 = authors.iter().map(|a| a.all_new_lines).sum();
    let all_deleted_lines: u64 = authors.iter().map(|a| a.all_deleted_lines).sum();
    let test_new_lines: u64 = authors.iter().map(|a| a.test_new_lines).sum();
    let merge_commits: u64 = authors.iter().map(|a| a.merge_commits).sum();
    let commits_per_day: f64 = authors.iter().map(|a| a.commits_per_day).sum();
    let commits_under_25: f64 = authors.iter().map(|a| a.commits_under_25).sum();
    let commits_above_500: f64 = authors.iter().map(|a| a.commits_above_500).sum();
    let files_per_commit: f64 =
        authors.iter().map(|a| a.files_per_commit).sum::<f64>() / num_authors as f64;

    ProjectStats {
        time_from: window.from,
        time_to: window.to,
        authors: num_authors,
        commit_number,
        all_new_lines,
        all_deleted_lines,
        commits_per_day,
        files_per_commit,
        lines_per_commit: all_new_lines as f64 / commit_number as f64,
        commits_under_25,
        commits_above_500,
        test_line_ratio: ratio(test_new_lines, all_new_lines),
        merge_commits,
        test_new_lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::LogParser;
    use pretty_assertions::assert_eq;

    const BASE: i64 = 1_600_000_000;
    const HOUR: i64 = 3_600;
    const DAY: i64 = 86_400;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn commit_block(hash: &str, email: &str, time: i64, msg: &str, changes: &[&str]) -> String {
        let mut lines = vec![
            "start".to_string(),
            format!("{hash};{email};{time};{email};{time};main"),
            "startcomment".to_string(),
            msg.to_string(),
            "end".to_string(),
        ];
        lines.extend(changes.iter().map(|c| c.to_string()));
        lines.join("\n")
    }

    fn parse(blocks: &[String]) -> DataContainer {
        LogParser::parse_str(&blocks.join("\n")).unwrap()
    }

    #[test]
    fn single_commit_end_to_end() {
        let data = parse(&[commit_block(
            "abc123",
            "a@b.com",
            1_000_000_000,
            "Fix bug",
            &["10\t2\tsrc/app.py"],
        )]);
        let report = StatsEngine::new(&data).all_time();

        assert_eq!(report.authors.len(), 1);
        let stats = &report.authors[0];
        assert_eq!(stats.author, "a@bcom");
        assert_eq!(stats.commit_number, 1);
        assert_eq!(stats.all_new_lines, 8);
        assert_eq!(stats.all_deleted_lines, 2);
        assert_eq!(stats.files_per_commit, 1.0);
        assert_eq!(stats.lines_per_commit, 8.0);
        assert_eq!(stats.test_line_ratio, 0.0);
        assert_eq!(stats.merge_commits, 0);
        assert_eq!(stats.commits_per_day, 1.0);
        // 12 changed lines: below both thresholds
        assert_eq!(stats.commits_under_25, 1.0);
        assert_eq!(stats.commits_above_500, 1.0);
    }

    #[test]
    fn two_close_commits_form_one_session() {
        let data = parse(&[
            commit_block("b", "a@b.com", BASE + 2 * HOUR, "second", &["1\t0\tsrc/app.py"]),
            commit_block("a", "a@b.com", BASE, "first", &["1\t0\tsrc/app.py"]),
        ]);
        let report = StatsEngine::new(&data).all_time();
        assert_eq!(report.authors[0].commits_per_day, 2.0);
    }

    #[test]
    fn thirty_hour_gap_splits_sessions() {
        let data = parse(&[
            commit_block("b", "a@b.com", BASE + 30 * HOUR, "second", &["1\t0\tsrc/app.py"]),
            commit_block("a", "a@b.com", BASE, "first", &["1\t0\tsrc/app.py"]),
        ]);
        let report = StatsEngine::new(&data).all_time();
        assert_eq!(report.authors[0].commits_per_day, 1.0);
    }

    #[test]
    fn span_cap_truncates_a_marathon_session() {
        // 7h gaps would chain forever under the gap rule alone; the 18h
        // span cap cuts the session after the third commit.
        let data = parse(&[
            commit_block("d", "a@b.com", BASE + 21 * HOUR, "d", &["1\t0\tsrc/app.py"]),
            commit_block("c", "a@b.com", BASE + 14 * HOUR, "c", &["1\t0\tsrc/app.py"]),
            commit_block("b", "a@b.com", BASE + 7 * HOUR, "b", &["1\t0\tsrc/app.py"]),
            commit_block("a", "a@b.com", BASE, "a", &["1\t0\tsrc/app.py"]),
        ]);
        let report = StatsEngine::new(&data).all_time();
        // two sessions: {d, c, b} and {a}... the walk is newest-first, so
        // the cap fires on `a` (21h from `d`): 4 commits / 2 sessions
        assert_eq!(report.authors[0].commits_per_day, 2.0);
    }

    #[test]
    fn exact_eight_hour_gap_starts_a_new_session() {
        let data = parse(&[
            commit_block("b", "a@b.com", BASE + 8 * HOUR, "b", &["1\t0\tsrc/app.py"]),
            commit_block("a", "a@b.com", BASE, "a", &["1\t0\tsrc/app.py"]),
        ]);
        let report = StatsEngine::new(&data).all_time();
        assert_eq!(report.authors[0].commits_per_day, 1.0);
    }

    #[test]
    fn test_line_ratio_counts_test_new_lines() {
        let data = parse(&[commit_block(
            "abc",
            "a@b.com",
            BASE,
            "add coverage",
            &["10\t2\tsrc/app.py", "4\t0\ttests/test_app.py"],
        )]);
        let report = StatsEngine::new(&data).all_time();
        let stats = &report.authors[0];
        assert_eq!(stats.all_new_lines, 12);
        assert_eq!(stats.test_new_lines, 4);
        assert!((stats.test_line_ratio - 4.0 / 12.0).abs() < 1e-9);
        assert!(stats.test_line_ratio >= 0.0 && stats.test_line_ratio <= 1.0);
    }

    #[test]
    fn merge_commits_are_counted() {
        let data = parse(&[
            commit_block("b", "a@b.com", BASE + HOUR, "Merge branch 'dev'", &[]),
            commit_block("a", "a@b.com", BASE, "work", &["1\t0\tsrc/app.py"]),
        ]);
        let report = StatsEngine::new(&data).all_time();
        assert_eq!(report.authors[0].merge_commits, 1);
    }

    #[test]
    fn size_buckets_are_fractions_with_strict_thresholds() {
        let data = parse(&[
            // 600 changed lines: in neither bucket
            commit_block("b", "a@b.com", BASE + HOUR, "big", &["600\t0\tsrc/app.py"]),
            // 12 changed lines: in both buckets
            commit_block("a", "a@b.com", BASE, "small", &["10\t2\tsrc/app.py"]),
        ]);
        let report = StatsEngine::new(&data).all_time();
        let stats = &report.authors[0];
        assert_eq!(stats.commits_under_25, 0.5);
        assert_eq!(stats.commits_above_500, 0.5);
    }

    #[test]
    fn authors_outside_the_window_are_excluded() {
        let data = parse(&[
            commit_block("b", "late@example.com", BASE + 10 * DAY, "late", &["1\t0\tsrc/app.py"]),
            commit_block("a", "early@example.com", BASE, "early", &["1\t0\tsrc/app.py"]),
        ]);
        let engine = StatsEngine::new(&data);

        let window = TimeWindow::bounded(ts(BASE), ts(BASE + DAY));
        let report = engine.window_stats(&window);
        assert_eq!(report.authors.len(), 1);
        assert_eq!(report.authors[0].author, "earcom");
        assert_eq!(report.project.as_ref().unwrap().authors, 1);
    }

    #[test]
    fn empty_window_has_no_project_rollup() {
        let data = parse(&[commit_block("a", "a@b.com", BASE, "only", &["1\t0\tsrc/app.py"])]);
        let engine = StatsEngine::new(&data);
        let report = engine.window_stats(&TimeWindow::bounded(ts(0), ts(1)));
        assert!(report.authors.is_empty());
        assert!(report.project.is_none());
    }

    #[test]
    fn window_bounds_are_half_open() {
        let data = parse(&[commit_block("a", "a@b.com", BASE, "edge", &["1\t0\tsrc/app.py"])]);
        let engine = StatsEngine::new(&data);

        let hit = engine.window_stats(&TimeWindow::bounded(ts(BASE), ts(BASE + 1)));
        assert_eq!(hit.authors.len(), 1);

        let miss = engine.window_stats(&TimeWindow::bounded(ts(BASE - DAY), ts(BASE)));
        assert!(miss.authors.is_empty());
    }

    #[test]
    fn project_rollup_derives_from_author_records() {
        let data = parse(&[
            commit_block("c", "bob@other.org", BASE + 2 * HOUR, "three", &["6\t0\tsrc/app.py"]),
            commit_block(
                "b",
                "alice@example.com",
                BASE + HOUR,
                "two",
                &["4\t0\tsrc/app.py", "2\t0\ttests/test_app.py"],
            ),
            commit_block("a", "alice@example.com", BASE, "one", &["8\t0\tsrc/app.py"]),
        ]);
        let report = StatsEngine::new(&data).all_time();
        let project = report.project.unwrap();

        assert_eq!(project.authors, 2);
        assert_eq!(project.commit_number, 3);
        assert_eq!(project.all_new_lines, 20);
        assert_eq!(project.test_new_lines, 2);
        // alice: 3 files / 2 commits, bob: 1 file / 1 commit -> mean of 1.5 and 1.0
        assert!((project.files_per_commit - 1.25).abs() < 1e-9);
        // summed new lines over summed commits
        assert!((project.lines_per_commit - 20.0 / 3.0).abs() < 1e-9);
        assert!((project.test_line_ratio - 2.0 / 20.0).abs() < 1e-9);
        // per-author sessions: alice 1 (commits 1h apart), bob 1
        assert_eq!(project.commits_per_day, 3.0);
    }

    #[test]
    fn commits_per_day_times_sessions_recovers_commit_count() {
        let data = parse(&[
            commit_block("c", "a@b.com", BASE + 40 * HOUR, "c", &["1\t0\tsrc/app.py"]),
            commit_block("b", "a@b.com", BASE + 2 * HOUR, "b", &["1\t0\tsrc/app.py"]),
            commit_block("a", "a@b.com", BASE, "a", &["1\t0\tsrc/app.py"]),
        ]);
        let report = StatsEngine::new(&data).all_time();
        let stats = &report.authors[0];
        // two sessions: {c} and {b, a}
        assert_eq!(stats.commits_per_day * 2.0, stats.commit_number as f64);
    }

    #[test]
    fn quartal_series_segments_the_project_span() {
        let data = parse(&[
            commit_block("new", "a@b.com", BASE + 100 * DAY, "newest", &["1\t0\tsrc/app.py"]),
            commit_block("mid", "a@b.com", BASE + 50 * DAY, "middle", &["1\t0\tsrc/app.py"]),
            commit_block("old", "a@b.com", BASE, "oldest", &["1\t0\tsrc/app.py"]),
        ]);
        let series = StatsEngine::new(&data).quartal_series();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].time_from, Some(ts(BASE)));
        assert_eq!(series[0].time_to, Some(ts(BASE + 90 * DAY)));
        assert_eq!(series[0].project.as_ref().unwrap().commit_number, 2);
        assert_eq!(series[1].time_from, Some(ts(BASE + 90 * DAY)));
        assert_eq!(series[1].project.as_ref().unwrap().commit_number, 1);
    }

    #[test]
    fn quartal_series_of_empty_container_is_empty() {
        let data = LogParser::parse_str("").unwrap();
        assert!(StatsEngine::new(&data).quartal_series().is_empty());
    }

    #[test]
    fn report_envelope_carries_all_windows() {
        let data = parse(&[
            commit_block("b", "a@b.com", BASE + 100 * DAY, "b", &["1\t0\tsrc/app.py"]),
            commit_block("a", "a@b.com", BASE, "a", &["1\t0\tsrc/app.py"]),
        ]);
        let output = StatsEngine::new(&data).report("project.log");
        assert_eq!(output.version, SCHEMA_VERSION);
        assert_eq!(output.log_path, "project.log");
        assert!(output.all_time.time_from.is_none());
        assert_eq!(output.all_time.project.as_ref().unwrap().commit_number, 2);
        assert_eq!(output.quartals.len(), 2);
    }
}
