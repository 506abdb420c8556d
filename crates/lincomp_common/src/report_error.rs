use ansi_term::Color;
use std::io;
use std::path::{Path, PathBuf};
use textwrap::{Options, WordSplitter};

use crate::file_cache::FileCache;

/// An error that knows how to present itself to a user on a terminal.
pub trait Reportable {
    fn report(&self, dest: &mut impl io::Write, files: &FileCache) -> io::Result<()>;

    fn exit_status(&self) -> i32;
}

#[derive(Clone, Debug)]
struct SourceLines<'a> {
    content: &'a str,
    starts: Vec<usize>,
}

impl<'a> SourceLines<'a> {
    fn new(content: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        SourceLines { content, starts }
    }

    fn count(&self) -> usize {
        self.starts.len()
    }

    /// Zero-based line and column of a byte offset.
    fn position(&self, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        (line, offset - self.starts[line])
    }

    fn line(&self, line: usize) -> &'a str {
        let start = self.starts[line];
        let end = self
            .starts
            .get(line + 1)
            .map_or(self.content.len(), |next| next - 1);
        self.content[start..end].trim_end_matches('\r')
    }
}

fn gutter_width(src: &SourceLines) -> usize {
    src.count().to_string().len()
}

fn write_snippet(
    dest: &mut impl io::Write,
    src: &SourceLines,
    lo: usize,
    hi: usize,
) -> io::Result<()> {
    let gutter_style = Color::Blue.bold();
    let marker_style = Color::Red.bold();
    let width = gutter_width(src);

    let (lo_line, lo_col) = src.position(lo);
    // `hi` is exclusive, so the last highlighted character is the one before it.
    let (hi_line, hi_col) = src.position(hi.max(lo + 1) - 1);

    let empty_gutter = gutter_style.paint(format!(" {:>width$} |", "", width = width));
    writeln!(dest, "{}", empty_gutter)?;

    for line in lo_line..=hi_line {
        let content = src.line(line);
        writeln!(
            dest,
            "{} {}",
            gutter_style.paint(format!(" {:>width$} |", line + 1, width = width)),
            content
        )?;

        let start = if line == lo_line { lo_col } else { 0 };
        let end = if line == hi_line {
            hi_col + 1
        } else {
            content.len()
        };
        if end > start {
            writeln!(
                dest,
                "{} {:start$}{}",
                empty_gutter,
                "",
                marker_style.paint("^".repeat(end - start)),
                start = start
            )?;
        }
    }

    Ok(())
}

#[derive(Clone, Copy, Debug)]
pub struct Report<'a> {
    pub path: Option<&'a Path>,
    pub span: Option<(usize, usize)>,
    pub title: &'a str,
    pub message: Option<&'a str>,
}

const TITLE_WIDTH: usize = 60;
const MESSAGE_WIDTH: usize = 60;

pub fn report_error(
    dest: &mut impl io::Write,
    files: &FileCache,
    report: Report,
) -> io::Result<()> {
    let title_style = Color::Red.bold();
    let path_style = Color::Yellow.normal();

    let heading = format!("-- {} ", report.title);
    writeln!(
        dest,
        "\n{}{}",
        title_style.paint(&heading),
        title_style.paint("-".repeat(TITLE_WIDTH.saturating_sub(heading.len())))
    )?;

    if let Some(path) = report.path {
        match report.span {
            Some((lo, hi)) => {
                let src = SourceLines::new(files.read_cached(path)?);
                let (line, col) = src.position(lo);
                writeln!(
                    dest,
                    "{}\n",
                    path_style.paint(format!("{}:{}:{}", path.display(), line + 1, col + 1))
                )?;
                write_snippet(dest, &src, lo, hi)?;
            }
            None => writeln!(dest, "{}", path_style.paint(path.display().to_string()))?,
        }
    }

    if let Some(message) = report.message {
        writeln!(dest)?;
        let options = Options::new(MESSAGE_WIDTH).word_splitter(WordSplitter::NoHyphenation);
        for paragraph in message.lines() {
            if paragraph.trim().is_empty() {
                writeln!(dest)?;
                continue;
            }
            for line in textwrap::wrap(paragraph, &options) {
                writeln!(dest, "{}", line)?;
            }
        }
    }

    writeln!(dest)
}

/// An error annotated with where in the problem source it arose.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Locate<E> {
    pub path: Option<PathBuf>,
    pub span: Option<(usize, usize)>,
    pub error: E,
}

impl<E> From<E> for Locate<E> {
    fn from(error: E) -> Self {
        Locate {
            path: None,
            span: None,
            error,
        }
    }
}

// Curried so they slot into `map_err`. The innermost location wins.

pub fn locate_path<'a, E>(
    path: &'a (impl AsRef<Path> + ?Sized),
) -> impl FnOnce(Locate<E>) -> Locate<E> + 'a {
    move |err| Locate {
        path: err.path.or_else(|| Some(path.as_ref().to_owned())),
        ..err
    }
}

pub fn locate_span<E>(lo: usize, hi: usize) -> impl FnOnce(Locate<E>) -> Locate<E> {
    move |err| Locate {
        span: err.span.or(Some((lo, hi))),
        ..err
    }
}

impl<E> Locate<E> {
    pub fn report_with<Title, Msg>(
        &self,
        dest: &mut impl io::Write,
        files: &FileCache,
        describe: impl FnOnce(&E) -> (Title, Msg),
    ) -> io::Result<()>
    where
        Title: AsRef<str>,
        Msg: AsRef<str>,
    {
        let (title, message) = describe(&self.error);
        report_error(
            dest,
            files,
            Report {
                path: self.path.as_deref(),
                span: self.span,
                title: title.as_ref(),
                message: Some(message.as_ref()),
            },
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_positions() {
        let src = SourceLines::new("scalar a;\r\nmatrix X;\n");
        assert_eq!(src.count(), 3);
        assert_eq!(src.position(0), (0, 0));
        assert_eq!(src.position(11), (1, 0));
        assert_eq!(src.position(18), (1, 7));
        assert_eq!(src.line(0), "scalar a;");
        assert_eq!(src.line(1), "matrix X;");
        assert_eq!(src.line(2), "");
    }

    #[test]
    fn test_report_quotes_source() {
        let mut files = FileCache::new();
        files.insert("virtual.lin", "matrix X;\noutput X + Y;\n");

        let err: Locate<&str> = Locate::from("undeclared");
        let err = locate_span(21, 22)(locate_path("virtual.lin")(err));

        let mut out = Vec::new();
        err.report_with(&mut out, &files, |e| ("Undeclared Name", format!("'Y' is {}", e)))
            .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("virtual.lin:2:12"));
        assert!(out.contains("output X + Y;"));
        assert!(out.contains("'Y' is undeclared"));
    }
}
