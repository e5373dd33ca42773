//! Ready-made policies.

use std::collections::HashMap;
use std::path::Path;

use graft_store::Commit;
use graft_types::ObjectId;
use tracing::debug;

use crate::context::Context;
use crate::entry::Entry;
use crate::error::{RewriteError, RewriteResult};
use crate::policy::RewritePolicy;

/// Drops files by path or by name.
///
/// A pattern without `/` matches any file with that name. A pattern with `/`
/// matches one full path and needs a path-sensitive engine. Directories are
/// never matched directly; a directory whose files are all dropped
/// disappears on its own.
///
/// The decision looks at names only, so an in-place run never reads a blob.
#[derive(Clone, Debug, Default)]
pub struct PathFilter {
    patterns: Vec<String>,
}

impl PathFilter {
    /// A filter for the given patterns. Leading and trailing `/` are ignored.
    pub fn new(patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.into().trim_matches('/').to_owned())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Returns `true` if some pattern needs full paths to match.
    pub fn needs_path_sensitivity(&self) -> bool {
        self.patterns.iter().any(|p| p.contains('/'))
    }

    /// Returns `true` if some pattern matches `entry`.
    pub fn drops(&self, entry: &Entry) -> bool {
        self.patterns.iter().any(|pattern| {
            if pattern.contains('/') {
                entry.path_context.is_some() && entry.path() == *pattern
            } else {
                entry.name == *pattern
            }
        })
    }
}

impl RewritePolicy for PathFilter {
    fn drops_entry(&self, entry: &Entry, c: &Context) -> bool {
        let dropped = self.drops(entry);
        if dropped {
            debug!(path = %entry.path(), context = %c, "dropped file");
        }
        dropped
    }
}

/// Prefixes commit messages with the Subversion revision they were
/// imported from.
///
/// Built from two logs of an svn-to-git import: the progress log, with
/// lines `progress SVN r<N> branch master = :<mark>`, and the marks file,
/// with lines `:<mark> <commit-id>`. Other lines are ignored. Commits with
/// no known revision keep their message unchanged.
#[derive(Clone, Debug, Default)]
pub struct RevisionAnnotator {
    revisions: HashMap<ObjectId, u64>,
}

impl RevisionAnnotator {
    /// An annotator over a ready commit-to-revision table.
    pub fn from_revisions(revisions: HashMap<ObjectId, u64>) -> Self {
        Self { revisions }
    }

    /// Read both logs from disk.
    pub fn from_files(svn_log: &Path, marks: &Path) -> RewriteResult<Self> {
        let svn_log = std::fs::read_to_string(svn_log)?;
        let marks = std::fs::read_to_string(marks)?;
        Self::parse(&svn_log, &marks)
    }

    /// Join the progress log and the marks file on their mark numbers.
    pub fn parse(svn_log: &str, marks: &str) -> RewriteResult<Self> {
        let objects: HashMap<&str, &str> = marks.lines().filter_map(parse_mark_line).collect();

        let mut revisions = HashMap::new();
        for (revision, mark) in svn_log.lines().filter_map(parse_progress_line) {
            let Some(hex) = objects.get(mark) else {
                debug!(revision, mark, "revision has no marked object");
                continue;
            };
            let id = ObjectId::from_hex(hex)
                .map_err(|e| RewriteError::Config(format!("mark :{mark}: {e}")))?;
            revisions.insert(id, revision);
        }
        debug!(revisions = revisions.len(), "loaded svn revisions");
        Ok(Self { revisions })
    }

    /// Subversion revision a source commit was imported from.
    pub fn revision_of(&self, commit: &ObjectId) -> Option<u64> {
        self.revisions.get(commit).copied()
    }

    /// Number of annotated commits.
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

impl RewritePolicy for RevisionAnnotator {
    fn rewrite_commit_message(
        &self,
        message: &str,
        id: &ObjectId,
        _commit: &Commit,
        _c: &Context,
    ) -> String {
        match self.revision_of(id) {
            Some(revision) => format!("svn:r{revision} {message}"),
            None => message.to_owned(),
        }
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `progress SVN r<N> branch master = :<mark>`
fn parse_progress_line(line: &str) -> Option<(u64, &str)> {
    let rest = line.strip_prefix("progress SVN r")?;
    let (revision, mark) = rest.split_once(" branch master = :")?;
    let mark = mark.trim_end();
    if !all_digits(mark) {
        return None;
    }
    Some((revision.parse().ok()?, mark))
}

/// `:<mark> <object>`
fn parse_mark_line(line: &str) -> Option<(&str, &str)> {
    let (mark, object) = line.strip_prefix(':')?.split_once(' ')?;
    let object = object.trim_end();
    let word = !object.is_empty() && object.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    (all_digits(mark) && word).then_some((mark, object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_store::{EntryMode, Person};
    use std::io::Write;

    fn file(name: &str, parent: Option<&str>) -> Entry {
        Entry::new(
            EntryMode::Regular,
            name,
            ObjectId::from_hash([1; 32]),
            parent.map(str::to_owned),
        )
    }

    // -----------------------------------------------------------------------
    // PathFilter
    // -----------------------------------------------------------------------

    #[test]
    fn name_pattern_matches_anywhere() {
        let filter = PathFilter::new(["secrets.txt"]);
        assert!(!filter.needs_path_sensitivity());
        assert!(filter.drops(&file("secrets.txt", None)));
        assert!(filter.drops(&file("secrets.txt", Some("deep/dir"))));
        assert!(!filter.drops(&file("readme.md", None)));
    }

    #[test]
    fn path_pattern_needs_context() {
        let filter = PathFilter::new(["/config/prod.env"]);
        assert!(filter.needs_path_sensitivity());
        assert!(filter.drops(&file("prod.env", Some("config"))));
        assert!(!filter.drops(&file("prod.env", Some("other"))));
        assert!(!filter.drops(&file("prod.env", None)));
    }

    #[test]
    fn filter_decides_without_content() {
        let filter = PathFilter::new(["x"]);
        let c = Context::root();
        assert!(filter.drops_entry(&file("x", None), &c));
        assert!(!filter.drops_entry(&file("y", None), &c));
        assert!(!filter.rewrites_blob_content());
        assert!(!PathFilter::default().drops_entry(&file("x", None), &c));
    }

    // -----------------------------------------------------------------------
    // RevisionAnnotator
    // -----------------------------------------------------------------------

    fn commit() -> Commit {
        let who = Person::new("a", "a@example.com", 0, 0);
        Commit {
            tree: ObjectId::from_hash([2; 32]),
            parents: vec![],
            author: who.clone(),
            committer: who,
            message: String::new(),
        }
    }

    #[test]
    fn joins_logs_on_marks() {
        let a = ObjectId::from_hash([0xaa; 32]);
        let b = ObjectId::from_hash([0xbb; 32]);
        let svn_log = "\
progress SVN r10 branch master = :1
progress SVN r11 branch trunk = :2
progress SVN r12 branch master = :2
progress SVN r13 branch master = :9
noise
";
        let marks = format!(":1 {}\n:2 {}\nnot a mark\n", a.to_hex(), b.to_hex());
        let annotator = RevisionAnnotator::parse(svn_log, &marks).unwrap();
        assert_eq!(annotator.len(), 2);
        assert_eq!(annotator.revision_of(&a), Some(10));
        assert_eq!(annotator.revision_of(&b), Some(12));

        let c = Context::root();
        assert_eq!(annotator.rewrite_commit_message("msg", &a, &commit(), &c), "svn:r10 msg");
        let other = ObjectId::from_hash([0xcc; 32]);
        assert_eq!(annotator.rewrite_commit_message("msg", &other, &commit(), &c), "msg");
    }

    #[test]
    fn bad_object_id_is_config_error() {
        let err = RevisionAnnotator::parse("progress SVN r1 branch master = :1\n", ":1 nothex\n")
            .unwrap_err();
        assert!(matches!(err, RewriteError::Config(_)));
    }

    #[test]
    fn reads_files() {
        let id = ObjectId::from_hash([7; 32]);
        let mut log = tempfile::NamedTempFile::new().unwrap();
        writeln!(log, "progress SVN r42 branch master = :5").unwrap();
        let mut marks = tempfile::NamedTempFile::new().unwrap();
        writeln!(marks, ":5 {}", id.to_hex()).unwrap();

        let annotator = RevisionAnnotator::from_files(log.path(), marks.path()).unwrap();
        assert_eq!(annotator.revision_of(&id), Some(42));
    }
}
