//! Query front end over a data directory of tables.
//!
//! A table `t` is stored as `t.tbl` (a [`RecordFile`]) with an optional
//! secondary index `t.idx` (a [`BTreeIndex`] keyed on the tuple key).

use crate::btree::BTreeIndex;
use crate::error::{IndexError, Result};
use crate::query::plan::{plan, AccessPath, KeyRange};
use crate::query::{parse_statement, Condition, SelectTarget, Statement};
use crate::record::RecordFile;
use crate::storage::OpenMode;
use crate::Config;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Shell prompt
pub const PROMPT: &str = "bptree> ";

/// Result of one executed statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A `SELECT` matched this many tuples
    Selected(usize),
    /// A `LOAD` appended this many tuples
    Loaded(usize),
    Quit,
}

/// Executes parsed statements against the tables in a data directory
pub struct SqlEngine {
    config: Config,
}

impl SqlEngine {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path of a table's record file
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.config.data_dir.join(format!("{}.tbl", table))
    }

    /// Path of a table's index file
    pub fn index_path(&self, table: &str) -> PathBuf {
        self.config.data_dir.join(format!("{}.idx", table))
    }

    /// Open a table's index for reading
    pub fn open_index(&self, table: &str) -> Result<BTreeIndex> {
        let path = self.index_path(table);
        if !path.exists() {
            return Err(IndexError::NoSuchTable(format!("{} (no index)", table)));
        }
        BTreeIndex::open(&path, OpenMode::Read, self.config.btree_config, false)
    }

    /// Parse and run one command line
    pub fn execute_line(&self, line: &str, out: &mut dyn Write) -> Result<Outcome> {
        let statement = parse_statement(line)?;
        self.execute(&statement, out)
    }

    pub fn execute(&self, statement: &Statement, out: &mut dyn Write) -> Result<Outcome> {
        match statement {
            Statement::Select {
                target,
                table,
                conditions,
            } => self
                .select(*target, table, conditions, out)
                .map(Outcome::Selected),
            Statement::Load {
                table,
                file,
                with_index,
            } => self.load(table, file, *with_index).map(Outcome::Loaded),
            Statement::Quit => Ok(Outcome::Quit),
        }
    }

    /// Read commands from `input` until end of input or `QUIT`.
    ///
    /// A failing statement is reported on `out` and the loop continues.
    pub fn run<R: BufRead, W: Write>(&self, input: R, out: &mut W, prompt: bool) -> Result<()> {
        if prompt {
            write!(out, "{}", PROMPT)?;
            out.flush()?;
        }

        for line in input.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                match self.execute_line(&line, out) {
                    Ok(Outcome::Quit) => return Ok(()),
                    Ok(Outcome::Loaded(rows)) => writeln!(out, "Loaded {} tuples", rows)?,
                    Ok(Outcome::Selected(_)) => {}
                    Err(e) => {
                        warn!(statement = %line.trim(), error = %e, "statement failed");
                        writeln!(out, "Error: {}", e)?;
                    }
                }
            }
            if prompt {
                write!(out, "{}", PROMPT)?;
                out.flush()?;
            }
        }
        Ok(())
    }

    /// Append every line of `loadfile` to `table`, indexing the keys when
    /// `with_index` is set. Returns the number of tuples loaded.
    pub fn load(&self, table: &str, loadfile: &Path, with_index: bool) -> Result<usize> {
        let file = File::open(loadfile).map_err(|source| IndexError::FileOpenFailed {
            path: loadfile.to_path_buf(),
            source,
        })?;

        let sync = self.config.sync_on_write;
        let mut records = RecordFile::open(&self.table_path(table), OpenMode::Write, sync)?;
        let mut index = if with_index {
            Some(BTreeIndex::open(
                &self.index_path(table),
                OpenMode::Write,
                self.config.btree_config,
                sync,
            )?)
        } else {
            None
        };

        let mut rows = 0;
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = parse_load_line(&line).map_err(|reason| {
                IndexError::InvalidFileFormat {
                    line: lineno + 1,
                    reason,
                }
            })?;

            let rid = records.append(key, &value)?;
            if let Some(index) = index.as_mut() {
                index.insert(key, rid)?;
            }
            rows += 1;
        }

        records.close()?;
        if let Some(index) = index {
            index.close()?;
        }
        info!(table, rows, with_index, "loaded table");
        Ok(rows)
    }

    /// Print the tuples of `table` satisfying every condition and return
    /// how many matched
    pub fn select(
        &self,
        target: SelectTarget,
        table: &str,
        conditions: &[Condition],
        out: &mut dyn Write,
    ) -> Result<usize> {
        let table_path = self.table_path(table);
        if !table_path.exists() {
            return Err(IndexError::NoSuchTable(table.to_string()));
        }

        let access = plan(conditions, self.index_path(table).exists());
        debug!(table, ?access, "planned select");

        let count = match access {
            AccessPath::Empty => 0,
            AccessPath::TableScan => {
                let records = RecordFile::open(&table_path, OpenMode::Read, false)?;
                let mut count = 0;
                for record in records.iter() {
                    let (_, key, value) = record?;
                    if conditions.iter().all(|c| c.matches(key, &value)) {
                        emit(target, key, &value, out)?;
                        count += 1;
                    }
                }
                count
            }
            AccessPath::IndexRange(range) => {
                let records = RecordFile::open(&table_path, OpenMode::Read, false)?;
                let index = self.open_index(table)?;
                Self::select_range(&index, &records, range, target, conditions, out)?
            }
        };

        if target == SelectTarget::Count {
            writeln!(out, "{}", count)?;
        }
        Ok(count)
    }

    fn select_range(
        index: &BTreeIndex,
        records: &RecordFile,
        range: KeyRange,
        target: SelectTarget,
        conditions: &[Condition],
        out: &mut dyn Write,
    ) -> Result<usize> {
        let Some(start) = range.first_key() else {
            return Ok(0);
        };

        let (mut cursor, _) = index.locate(start)?;
        let mut count = 0;
        while let Some(entry) = index.read_forward(&mut cursor)? {
            if range.is_past(entry.key) {
                break;
            }
            let (key, value) = records.read(entry.rid)?;
            if conditions.iter().all(|c| c.matches(key, &value)) {
                emit(target, key, &value, out)?;
                count += 1;
            }
        }
        Ok(count)
    }
}

fn emit(target: SelectTarget, key: i32, value: &str, out: &mut dyn Write) -> Result<()> {
    match target {
        SelectTarget::Key => writeln!(out, "{}", key)?,
        SelectTarget::Value => writeln!(out, "{}", value)?,
        SelectTarget::All => writeln!(out, "{} '{}'", key, value)?,
        SelectTarget::Count => {}
    }
    Ok(())
}

/// Parse one load-file line of the form `key, value`.
///
/// Leading blanks are skipped. The value may be wrapped in `'` or `"`, in
/// which case it ends at the matching quote; otherwise it runs to the end of
/// the line. Nothing after the comma yields an empty value.
pub fn parse_load_line(line: &str) -> std::result::Result<(i32, String), String> {
    let (key_text, rest) = line
        .split_once(',')
        .ok_or_else(|| "missing ',' between key and value".to_string())?;

    let key_text = key_text.trim_matches(|c: char| c == ' ' || c == '\t');
    let key = key_text
        .parse::<i32>()
        .map_err(|_| format!("key '{}' is not a 32-bit integer", key_text))?;

    let rest = rest.trim_start_matches(|c: char| c == ' ' || c == '\t');
    let value = match rest.chars().next() {
        Some(quote @ ('\'' | '"')) => {
            let inner = &rest[1..];
            match inner.find(quote) {
                Some(end) => &inner[..end],
                None => inner,
            }
        }
        _ => rest,
    };
    Ok((key, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Comparator;
    use std::io::Cursor;
    use tempfile::{tempdir, TempDir};

    fn engine_with(lines: &[&str]) -> Result<(TempDir, SqlEngine, PathBuf)> {
        let dir = tempdir()?;
        let loadfile = dir.path().join("movie.del");
        std::fs::write(&loadfile, lines.join("\n"))?;
        let engine = SqlEngine::new(Config::new(dir.path()));
        Ok((dir, engine, loadfile))
    }

    fn run_select(engine: &SqlEngine, text: &str) -> Result<(usize, String)> {
        let mut out: Vec<u8> = Vec::new();
        match engine.execute_line(text, &mut out)? {
            Outcome::Selected(n) => Ok((n, String::from_utf8(out).unwrap())),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_parse_load_line() {
        assert_eq!(parse_load_line("1,abc"), Ok((1, "abc".to_string())));
        assert_eq!(
            parse_load_line("  \t42 ,  'Die Hard' trailing"),
            Ok((42, "Die Hard".to_string()))
        );
        assert_eq!(
            parse_load_line("7, \"It's On\""),
            Ok((7, "It's On".to_string()))
        );
        assert_eq!(parse_load_line("-3,"), Ok((-3, String::new())));
        assert_eq!(parse_load_line("9, 'unterminated"), Ok((9, "unterminated".to_string())));
        assert!(parse_load_line("no comma here").is_err());
        assert!(parse_load_line("abc, value").is_err());
    }

    #[test]
    fn test_load_and_select_scan() -> Result<()> {
        let (_dir, engine, loadfile) = engine_with(&["3, 'c'", "1, 'a'", "2, 'b'"])?;
        assert_eq!(engine.load("movie", &loadfile, false)?, 3);
        assert!(engine.table_path("movie").exists());
        assert!(!engine.index_path("movie").exists());

        let (n, out) = run_select(&engine, "SELECT * FROM movie")?;
        assert_eq!(n, 3);
        assert_eq!(out, "3 'c'\n1 'a'\n2 'b'\n");

        let (n, out) = run_select(&engine, "SELECT value FROM movie WHERE key <> 1")?;
        assert_eq!(n, 2);
        assert_eq!(out, "c\nb\n");

        let (n, out) = run_select(&engine, "SELECT COUNT(*) FROM movie WHERE value >= 'b'")?;
        assert_eq!(n, 2);
        assert_eq!(out, "2\n");
        Ok(())
    }

    #[test]
    fn test_index_path_matches_scan() -> Result<()> {
        let lines: Vec<String> = (0..500)
            .map(|k| (k * 7919) % 1000)
            .map(|k| format!("{}, 'title {}'", k, k % 10))
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (dir, engine, loadfile) = engine_with(&refs)?;
        engine.load("indexed", &loadfile, true)?;
        engine.load("plain", &loadfile, false)?;
        assert!(dir.path().join("indexed.idx").exists());

        for conditions in [
            "key = 500",
            "key > 100 AND key <= 300",
            "key >= 990",
            "key < 20 AND value = 'title 4'",
            "key > 200 AND key < 100",
            "key = 1 AND key = 2",
        ] {
            let (n_idx, out_idx) =
                run_select(&engine, &format!("SELECT key FROM indexed WHERE {}", conditions))?;
            let (n_scan, out_scan) =
                run_select(&engine, &format!("SELECT key FROM plain WHERE {}", conditions))?;
            assert_eq!(n_idx, n_scan, "{}", conditions);

            let mut scan_keys: Vec<&str> = out_scan.lines().collect();
            scan_keys.sort_by_key(|k| k.parse::<i32>().unwrap_or_default());
            let idx_keys: Vec<&str> = out_idx.lines().collect();
            assert_eq!(idx_keys, scan_keys, "{}", conditions);
        }
        Ok(())
    }

    #[test]
    fn test_index_select_is_key_ordered() -> Result<()> {
        let (_dir, engine, loadfile) = engine_with(&["30, x", "10, y", "20, z"])?;
        engine.load("t", &loadfile, true)?;
        let (n, out) = run_select(&engine, "SELECT * FROM t WHERE key >= 0")?;
        assert_eq!(n, 3);
        assert_eq!(out, "10 'y'\n20 'z'\n30 'x'\n");
        Ok(())
    }

    #[test]
    fn test_select_missing_table() -> Result<()> {
        let (_dir, engine, _) = engine_with(&[])?;
        let mut out: Vec<u8> = Vec::new();
        let result = engine.select(SelectTarget::Key, "nope", &[], &mut out);
        assert!(matches!(result, Err(IndexError::NoSuchTable(_))));
        Ok(())
    }

    #[test]
    fn test_load_bad_line_reports_line_number() -> Result<()> {
        let (_dir, engine, loadfile) = engine_with(&["1, a", "", "oops"])?;
        match engine.load("t", &loadfile, true) {
            Err(IndexError::InvalidFileFormat { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_contradiction_does_not_read_table() -> Result<()> {
        let (_dir, engine, loadfile) = engine_with(&["1, a"])?;
        engine.load("t", &loadfile, false)?;
        let mut out: Vec<u8> = Vec::new();
        let conditions = [
            Condition::value(Comparator::Eq, "a"),
            Condition::value(Comparator::Eq, "b"),
        ];
        assert_eq!(engine.select(SelectTarget::Count, "t", &conditions, &mut out)?, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "0\n");
        Ok(())
    }

    #[test]
    fn test_run_shell_continues_after_error() -> Result<()> {
        let (_dir, engine, loadfile) = engine_with(&["5, five", "6, six"])?;
        let script = [
            format!("LOAD t FROM '{}' WITH INDEX", loadfile.display()),
            "SELECT bogus".to_string(),
            String::new(),
            "SELECT key FROM t WHERE key = 6".to_string(),
            "QUIT".to_string(),
            "SELECT * FROM t".to_string(),
        ]
        .join("\n");
        let mut out: Vec<u8> = Vec::new();
        engine.run(Cursor::new(script), &mut out, false)?;
        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out.lines().collect::<Vec<_>>(),
            vec!["Loaded 2 tuples", "Error: parse error: unknown column 'bogus'", "6"]
        );
        Ok(())
    }
}
