//! The batch driver: load, rewrite, and store documents in parallel.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;
use derive_more::Debug;

use crate::dom::{Document, ParseError};
use crate::rules::{self, Page, Rule};
use crate::site::Site;
use crate::storage::{DocumentSink, DocumentSource, LoadError};
use crate::upsert::{Change, RuleError};

/// Applies an ordered rule list to documents and persists what changed.
#[derive(Debug)]
pub struct Pipeline {
    site: Arc<Site>,
    #[debug(ignore)]
    rules: Vec<Box<dyn Rule>>,
    dry_run: bool,
    max_failures: Option<usize>,
}

/// What the rules did to one document.
#[derive(Debug, Default)]
pub struct Report {
    pub applied: Vec<(&'static str, Change)>,
    /// Rules that could not run, e.g. for lack of an insertion point.
    pub skipped: Vec<(&'static str, RuleError)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Parse,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub id: String,
    pub stage: Stage,
    pub error: String,
}

#[derive(Debug)]
pub enum Outcome {
    Unchanged,
    /// `written` is `false` in a dry run.
    Changed { written: bool, report: Report },
    Failed(Failure),
    /// Never attempted: the batch stopped early.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub processed: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<Failure>,
}

impl Pipeline {
    /// A pipeline running the standard rules configured by `site`.
    pub fn new(site: Site) -> Self {
        let rules = rules::standard(&site);
        Pipeline::with_rules(site, rules)
    }

    pub fn with_rules(site: Site, rules: Vec<Box<dyn Rule>>) -> Self {
        Pipeline { site: Arc::new(site), rules, dry_run: false, max_failures: None }
    }

    /// Report changes without storing anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Stop starting new documents once `max` of them have failed.
    pub fn max_failures(mut self, max: Option<usize>) -> Self {
        self.max_failures = max;
        self
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn rules(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.name())
    }

    /// Runs every rule over `markup`, the document at `path`. Returns the
    /// input unchanged, byte for byte, if no rule changed anything.
    pub fn rewrite(&self, markup: &str, path: &str) -> Result<(String, Report), ParseError> {
        let mut doc = Document::parse(markup)?;
        if !doc.parse_errors().is_empty() {
            log::debug!("{path}: parser recovered from {} errors", doc.parse_errors().len());
        }

        let page = Page::new(&self.site, path);
        let mut report = Report::default();
        for rule in &self.rules {
            match rule.apply(&mut doc, &page) {
                Ok(change) => {
                    for note in &change.notes {
                        log::debug!("{path}: {}: {note}", rule.name());
                    }

                    report.applied.push((rule.name(), change));
                }
                Err(e) => {
                    log::warn!("{path}: rule skipped: {e}");
                    report.skipped.push((rule.name(), e));
                }
            }
        }

        match report.changed() {
            true => Ok((doc.serialize(), report)),
            false => Ok((markup.to_string(), report)),
        }
    }

    /// Loads, rewrites and, if anything changed, stores document `id`.
    pub fn process<S, K>(&self, source: &S, sink: &K, id: &str) -> Outcome
        where S: DocumentSource + ?Sized, K: DocumentSink + ?Sized
    {
        let loaded = match source.load(id) {
            Ok(loaded) => loaded,
            Err(LoadError::Parse { error, .. }) => return Failure::new(id, Stage::Parse, error).into(),
            Err(e) => return Failure::new(id, Stage::Load, e).into(),
        };

        let (markup, report) = match self.rewrite(&loaded.markup, &loaded.relative_path) {
            Ok(rewritten) => rewritten,
            Err(e) => return Failure::new(id, Stage::Parse, e).into(),
        };

        if report.ambiguous() {
            log::info!("{id}: some rules matched more than one element; the first was used");
        }

        if !report.changed() {
            return Outcome::Unchanged;
        }

        if self.dry_run {
            log::info!("{id}: would write ({} changes)", report.notes().count());
            return Outcome::Changed { written: false, report };
        }

        match sink.store(id, &markup) {
            Ok(true) => {
                log::info!("{id}: written ({} changes)", report.notes().count());
                Outcome::Changed { written: true, report }
            }
            Ok(false) => Outcome::Unchanged,
            Err(e) => Failure::new(id, Stage::Store, e).into(),
        }
    }

    /// Processes every document in `ids` in parallel. Failures are contained
    /// to their document; once `max_failures` is reached no new documents
    /// are started.
    pub fn run<S, K, I>(&self, source: &S, sink: &K, ids: &[I]) -> Summary
        where S: DocumentSource + ?Sized,
              K: DocumentSink + ?Sized,
              I: AsRef<str> + Sync
    {
        let stop = AtomicBool::new(false);
        let failed = AtomicUsize::new(0);
        let outcomes: Vec<Outcome> = ids.par_iter()
            .map(|id| {
                if stop.load(Ordering::Acquire) {
                    return Outcome::Skipped;
                }

                let outcome = self.process(source, sink, id.as_ref());
                if let Outcome::Failed(failure) = &outcome {
                    log::error!("{failure}");
                    let count = failed.fetch_add(1, Ordering::AcqRel) + 1;
                    if self.max_failures.map_or(false, |max| count >= max) {
                        stop.store(true, Ordering::Release);
                    }
                }

                outcome
            })
            .collect();

        outcomes.into_iter().collect()
    }
}

impl Report {
    pub fn changed(&self) -> bool {
        self.applied.iter().any(|(_, change)| change.changed)
    }

    pub fn ambiguous(&self) -> bool {
        self.applied.iter().any(|(_, change)| change.ambiguous)
    }

    /// Every edit made, with the rule that made it.
    pub fn notes(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.applied.iter()
            .flat_map(|(rule, change)| change.notes.iter().map(move |note| (*rule, note.as_str())))
    }
}

impl Failure {
    pub fn new<E: fmt::Display>(id: &str, stage: Stage, error: E) -> Self {
        Failure { id: id.to_string(), stage, error: error.to_string() }
    }
}

impl From<Failure> for Outcome {
    fn from(failure: Failure) -> Self {
        Outcome::Failed(failure)
    }
}

impl Summary {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Unchanged => {
                self.processed += 1;
                self.unchanged += 1;
            }
            Outcome::Changed { .. } => {
                self.processed += 1;
                self.changed += 1;
            }
            Outcome::Failed(failure) => {
                self.failed += 1;
                self.failures.push(failure);
            }
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

impl FromIterator<Outcome> for Summary {
    fn from_iter<T: IntoIterator<Item = Outcome>>(iter: T) -> Self {
        let mut summary = Summary::default();
        iter.into_iter().for_each(|outcome| summary.record(outcome));
        summary
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Load => write!(f, "load"),
            Stage::Parse => write!(f, "parse"),
            Stage::Store => write!(f, "store"),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} failed: {}", self.id, self.stage, self.error)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} processed ({} changed, {} unchanged), {} failed",
            self.processed, self.changed, self.unchanged, self.failed)?;

        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySite;
    use crate::rules::test_support::{site, BARE};

    fn documents(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("post-{i}.html")).collect()
    }

    fn memory_site(ids: &[String]) -> MemorySite {
        MemorySite::with(ids.iter().map(|id| (id.clone(), BARE)))
    }

    #[test]
    fn second_run_changes_nothing() {
        let ids = documents(4);
        let memory = memory_site(&ids);
        let pipeline = Pipeline::new(site());

        let first = pipeline.run(&memory, &memory, &ids);
        assert_eq!((first.processed, first.changed, first.failed), (4, 4, 0));
        assert_eq!(memory.writes(), 4);

        let second = pipeline.run(&memory, &memory, &ids);
        assert_eq!((second.processed, second.changed, second.unchanged), (4, 0, 4));
        assert_eq!(memory.writes(), 4);
    }

    #[test]
    fn one_malformed_document_fails_alone() {
        let ids = documents(5);
        let memory = memory_site(&ids);
        memory.insert("post-2.html", "<html><body>\0binary");

        let summary = Pipeline::new(site()).run(&memory, &memory, &ids);
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].id, "post-2.html");
        assert_eq!(summary.failures[0].stage, Stage::Parse);
        assert_eq!(memory.get("post-2.html").unwrap(), "<html><body>\0binary");
    }

    #[test]
    fn deeply_nested_documents_do_not_abort_the_batch() {
        let ids = documents(3);
        let memory = memory_site(&ids);
        let depth = 60_000;
        let deep = format!("<html><head></head><body>{}deep</body></html>", "<span>".repeat(depth));
        memory.insert("post-1.html", deep);

        let summary = Pipeline::new(site()).run(&memory, &memory, &ids);
        assert_eq!((summary.processed, summary.changed, summary.failed), (3, 3, 0));

        let written = memory.get("post-1.html").unwrap();
        assert!(written.contains("<title>Post 1 | Example</title>"));
        assert_eq!(written.matches("</span>").count(), depth);
    }

    #[test]
    fn load_failures_are_reported() {
        let memory = MemorySite::with([("bad.html", vec![b'<', b'p', b'>', 0xff])]);
        let ids = ["missing.html", "bad.html"];
        let summary = Pipeline::new(site()).run(&memory, &memory, &ids);
        let stages: Vec<_> = summary.failures.iter().map(|f| f.stage).collect();
        assert_eq!(stages, [Stage::Load, Stage::Parse]);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let ids = documents(2);
        let memory = memory_site(&ids);
        let summary = Pipeline::new(site()).dry_run(true).run(&memory, &memory, &ids);
        assert_eq!(summary.changed, 2);
        assert_eq!(memory.writes(), 0);
        assert_eq!(memory.get("post-0.html").unwrap(), BARE);
    }

    #[test]
    fn max_failures_stops_the_batch() {
        let ids = documents(64);
        let memory = MemorySite::with(ids.iter().map(|id| (id.clone(), "<p>\0</p>")));
        let summary = Pipeline::new(site()).max_failures(Some(1)).run(&memory, &memory, &ids);
        assert!(summary.failed >= 1);
        assert_eq!(summary.failed + summary.skipped, 64);
        assert_eq!(summary.processed, 0);
    }

    #[test]
    fn rules_without_an_anchor_are_skipped() {
        let mut site = site();
        site.rules.dark_mode = true;
        let pipeline = Pipeline::new(site);
        let html = "<html><head><title>x</title></head><body><p>No metadata here.</p></body></html>";
        let (markup, report) = pipeline.rewrite(html, "post.html").unwrap();

        assert!(report.changed());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "dark-mode");
        assert!(markup.contains("rel=\"canonical\""));
        assert!(!markup.contains("theme-switch-wrapper"));
    }

    #[test]
    fn ambiguous_matches_are_reported() {
        let pipeline = Pipeline::new(site());
        let html = concat!(
            "<html><head><link rel=\"canonical\" href=\"/a\"><link rel=\"canonical\" href=\"/b\"></head>",
            "<body><p>Two canonical links.</p></body></html>",
        );

        let (markup, report) = pipeline.rewrite(html, "post.html").unwrap();
        assert!(report.ambiguous());
        assert!(markup.contains("<link rel=\"canonical\" href=\"https://example.com/post.html\"><link rel=\"canonical\" href=\"/b\">"));

        let (_, report) = pipeline.rewrite(&markup, "post.html").unwrap();
        assert!(report.ambiguous() && !report.changed());
    }

    #[test]
    fn unchanged_markup_is_returned_verbatim() {
        let pipeline = Pipeline::with_rules(site(), vec![]);
        let html = "<P CLASS=x>odd   <b>markup</P>";
        let (markup, report) = pipeline.rewrite(html, "a.html").unwrap();
        assert!(!report.changed());
        assert_eq!(markup, html);
    }

    #[test]
    fn summary_display() {
        let mut summary = Summary { processed: 3, changed: 1, unchanged: 2, failed: 1, ..Default::default() };
        assert_eq!(summary.to_string(), "3 processed (1 changed, 2 unchanged), 1 failed");

        summary.skipped = 4;
        assert!(summary.to_string().ends_with("1 failed, 4 skipped"));
    }
}
