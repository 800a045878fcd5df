//! `open()`: validate the arguments, then stack the layers.
//!
//! ```text
//!   mode   buffering   result
//!   ----   ---------   ----------------------------------------------
//!   *b     0           FileIO
//!   rb     != 0        BufferedReader<FileIO>
//!   wb/ab  != 0        BufferedWriter<FileIO>
//!   *b+    != 0        BufferedRandom<FileIO>
//!   text   != 0        TextIOWrapper over the matching buffered layer
//! ```
//!
//! Every argument is checked before the file system is touched.

use std::path::Path;

use super::base::IoBase;
use super::buffered::{BufferedRandom, BufferedReader, BufferedWriter};
use super::file_io::FileIO;
use super::mode::FileMode;
use super::text::{Encoding, Errors, Newline, TextIOWrapper, TextOptions};
use crate::config::IoConfig;
use crate::error::{IoError, IoResult};

/// Optional arguments of [`open_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    /// `0` unbuffered (binary only), `1` line buffered (text only), `> 1` the
    /// buffer size, negative for the configured default.
    pub buffering: i64,
    pub encoding: Option<String>,
    pub errors: Option<String>,
    pub newline: Option<String>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            buffering: -1,
            encoding: None,
            errors: None,
            newline: None,
        }
    }
}

impl OpenOptions {
    pub fn buffering(mut self, buffering: i64) -> Self {
        self.buffering = buffering;
        self
    }

    pub fn encoding(mut self, encoding: &str) -> Self {
        self.encoding = Some(encoding.to_string());
        self
    }

    pub fn errors(mut self, errors: &str) -> Self {
        self.errors = Some(errors.to_string());
        self
    }

    pub fn newline(mut self, newline: &str) -> Self {
        self.newline = Some(newline.to_string());
        self
    }
}

/// The stream stack `open()` produced.
#[derive(Debug)]
pub enum OpenStream {
    Raw(FileIO),
    Reader(BufferedReader<FileIO>),
    Writer(BufferedWriter<FileIO>),
    Random(BufferedRandom<FileIO>),
    TextReader(TextIOWrapper<BufferedReader<FileIO>>),
    TextWriter(TextIOWrapper<BufferedWriter<FileIO>>),
    TextRandom(TextIOWrapper<BufferedRandom<FileIO>>),
}

impl OpenStream {
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            OpenStream::TextReader(_) | OpenStream::TextWriter(_) | OpenStream::TextRandom(_)
        )
    }

    pub fn closed(&self) -> bool {
        match self {
            OpenStream::Raw(f) => f.closed(),
            OpenStream::Reader(f) => f.closed(),
            OpenStream::Writer(f) => f.closed(),
            OpenStream::Random(f) => f.closed(),
            OpenStream::TextReader(f) => f.closed(),
            OpenStream::TextWriter(f) => f.closed(),
            OpenStream::TextRandom(f) => f.closed(),
        }
    }

    pub fn close(&mut self) -> IoResult<()> {
        match self {
            OpenStream::Raw(f) => f.close(),
            OpenStream::Reader(f) => f.close(),
            OpenStream::Writer(f) => f.close(),
            OpenStream::Random(f) => f.close(),
            OpenStream::TextReader(f) => f.close(),
            OpenStream::TextWriter(f) => f.close(),
            OpenStream::TextRandom(f) => f.close(),
        }
    }
}

/// Open `path` with default options and configuration.
pub fn open<P: AsRef<Path>>(path: P, mode: &str) -> IoResult<OpenStream> {
    open_with(path, mode, &OpenOptions::default(), &IoConfig::default())
}

pub fn open_with<P: AsRef<Path>>(
    path: P,
    mode: &str,
    options: &OpenOptions,
    config: &IoConfig,
) -> IoResult<OpenStream> {
    let mode = FileMode::parse(mode)?;

    let text = if mode.binary {
        for (given, what) in [
            (&options.encoding, "an encoding"),
            (&options.errors, "an errors"),
            (&options.newline, "a newline"),
        ] {
            if given.is_some() {
                return Err(IoError::value(format!(
                    "binary mode doesn't take {what} argument"
                )));
            }
        }
        None
    } else {
        if options.buffering == 0 {
            return Err(IoError::value("can't have unbuffered text I/O"));
        }
        Some(text_options(options, config)?)
    };

    let buffer_size = match options.buffering {
        n if n > 1 => usize::try_from(n)
            .map_err(|_| IoError::Overflow("buffer size out of range".to_string()))?,
        1 if mode.binary => {
            log::warn!("line buffering (buffering=1) isn't supported in binary mode");
            config.buffer_size
        }
        _ => config.buffer_size,
    };

    let raw = FileIO::open(path, mode)?;
    if options.buffering == 0 {
        return Ok(OpenStream::Raw(raw));
    }

    let stream = match (mode.update, mode.write, text) {
        (true, _, None) => OpenStream::Random(BufferedRandom::with_capacity(raw, buffer_size)?),
        (true, _, Some(text)) => OpenStream::TextRandom(TextIOWrapper::with_options(
            BufferedRandom::with_capacity(raw, buffer_size)?,
            text,
        )?),
        (false, true, None) => OpenStream::Writer(BufferedWriter::with_capacity(raw, buffer_size)?),
        (false, true, Some(text)) => OpenStream::TextWriter(TextIOWrapper::with_options(
            BufferedWriter::with_capacity(raw, buffer_size)?,
            text,
        )?),
        (false, false, None) => OpenStream::Reader(BufferedReader::with_capacity(raw, buffer_size)?),
        (false, false, Some(text)) => OpenStream::TextReader(TextIOWrapper::with_options(
            BufferedReader::with_capacity(raw, buffer_size)?,
            text,
        )?),
    };
    Ok(stream)
}

fn text_options(options: &OpenOptions, config: &IoConfig) -> IoResult<TextOptions> {
    let mut text = TextOptions::from_config(config);
    if let Some(name) = options.encoding.as_deref() {
        text.encoding = Encoding::lookup(name)?;
    }
    if let Some(name) = options.errors.as_deref() {
        text.errors = Errors::lookup(name)?;
    }
    text.newline = Newline::from_arg(options.newline.as_deref())?;
    text.line_buffering = options.buffering == 1;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::io::base::{BufferedIo, Whence};
    use std::fs;
    use tempfile::tempdir;

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    #[test]
    fn test_rejects_before_touching_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never");
        for mode in ["rw", "rr", "q", "tb", "+", "wbt"] {
            let err = open(&path, mode).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValueError, "{mode}");
        }
        let err = open_with(&path, "w", &OpenOptions::default().buffering(0), &IoConfig::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "can't have unbuffered text I/O");
        let err = open_with(&path, "wb", &OpenOptions::default().newline("\n"), &IoConfig::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "binary mode doesn't take a newline argument");
        let err = open_with(&path, "w", &OpenOptions::default().encoding("klingon"), &IoConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LookupError);
        let err = open_with(&path, "w", &OpenOptions::default().newline("x"), &IoConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueError);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_is_os_error() {
        let dir = tempdir().unwrap();
        let err = open(dir.path().join("missing"), "rb").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OSError);
    }

    // ------------------------------------------------------------------------
    // Layer selection
    // ------------------------------------------------------------------------

    #[test]
    fn test_layer_selection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        let config = IoConfig::default();
        let unbuffered = OpenOptions::default().buffering(0);

        assert!(matches!(open_with(&path, "wb", &unbuffered, &config).unwrap(), OpenStream::Raw(_)));
        assert!(matches!(open(&path, "wb").unwrap(), OpenStream::Writer(_)));
        assert!(matches!(open(&path, "ab").unwrap(), OpenStream::Writer(_)));
        assert!(matches!(open(&path, "rb").unwrap(), OpenStream::Reader(_)));
        assert!(matches!(open(&path, "rb+").unwrap(), OpenStream::Random(_)));
        assert!(matches!(open(&path, "r").unwrap(), OpenStream::TextReader(_)));
        assert!(matches!(open(&path, "w").unwrap(), OpenStream::TextWriter(_)));
        let stream = open(&path, "r+").unwrap();
        assert!(matches!(stream, OpenStream::TextRandom(_)));
        assert!(stream.is_text());
    }

    #[test]
    fn test_buffer_size_from_arguments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        let config = IoConfig {
            buffer_size: 100,
            ..IoConfig::default()
        };
        let OpenStream::Writer(w) = open_with(&path, "wb", &OpenOptions::default(), &config).unwrap()
        else {
            panic!("expected a buffered writer");
        };
        assert_eq!(w.buffer_size(), 100);
        let OpenStream::Writer(w) =
            open_with(&path, "wb", &OpenOptions::default().buffering(16), &config).unwrap()
        else {
            panic!("expected a buffered writer");
        };
        assert_eq!(w.buffer_size(), 16);
    }

    // ------------------------------------------------------------------------
    // Text round trips
    // ------------------------------------------------------------------------

    #[test]
    fn test_text_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let options = OpenOptions::default().encoding("utf-16").newline("\r\n");

        let OpenStream::TextWriter(mut w) =
            open_with(&path, "w", &options, &IoConfig::default()).unwrap()
        else {
            panic!("expected a text writer");
        };
        w.write("héllo\nwörld\n").unwrap();
        w.close().unwrap();
        let raw = fs::read(&path).unwrap();
        assert_eq!(&raw[..2], b"\xff\xfe");

        let OpenStream::TextReader(mut r) =
            open_with(&path, "r", &options, &IoConfig::default()).unwrap()
        else {
            panic!("expected a text reader");
        };
        assert_eq!(r.readlines(None).unwrap(), ["héllo\r\n", "wörld\r\n"]);
    }

    #[test]
    fn test_append_does_not_repeat_bom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let options = OpenOptions::default().encoding("utf-16");
        for line in ["a\n", "b\n"] {
            let mut stream = open_with(&path, "a", &options, &IoConfig::default()).unwrap();
            let OpenStream::TextWriter(w) = &mut stream else {
                panic!("expected a text writer");
            };
            w.write(line).unwrap();
            stream.close().unwrap();
            assert!(stream.closed());
        }
        let raw = fs::read(&path).unwrap();
        assert_eq!(raw.windows(2).filter(|w| *w == b"\xff\xfe").count(), 1);
    }

    #[test]
    fn test_line_buffering_reaches_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lines");
        let OpenStream::TextWriter(mut w) =
            open_with(&path, "w", &OpenOptions::default().buffering(1), &IoConfig::default())
                .unwrap()
        else {
            panic!("expected a text writer");
        };
        assert!(w.line_buffering());
        w.write("no newline").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"");
        w.write("\n").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"no newline\n");
    }

    #[test]
    fn test_binary_update_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data");
        fs::write(&path, b"0123456789").unwrap();
        let OpenStream::Random(mut f) = open(&path, "rb+").unwrap() else {
            panic!("expected a random-access stream");
        };
        assert_eq!(BufferedIo::read(&mut f, Some(3)).unwrap(), b"012");
        BufferedIo::write(&mut f, b"xy").unwrap().into_result().unwrap();
        f.seek(0, Whence::Start).unwrap();
        assert_eq!(BufferedIo::read(&mut f, None).unwrap(), b"012xy56789");
    }
}
