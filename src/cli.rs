use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "zipseek")]
#[command(version)]
#[command(about = "Tail-first ZIP/ZIP64 reader for local files and HTTP URLs", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipseek release.zip -x '*.pdb'  extract everything except debug symbols\n  \
  zipseek -p logs.zip app.log     stream one entry to stdout\n  \
  zipseek -t backup.zip           check every entry's CRC-32\n  \
  zipseek -l https://example.com/archive.zip   list files from remote ZIP\n\n\
Set RUST_LOG=debug to trace the trailer search and directory scan.")]
pub struct Cli {
    /// Archive path, or an http(s) URL read with Range requests
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Entry names or glob patterns to select (default: every entry)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List entry names
    #[arg(short = 'l')]
    pub list: bool,

    /// Verbose listing with sizes, ratio, dates and method
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Write selected entries to stdout and print nothing else
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Test archive files (extract to memory and check CRC-32)
    #[arg(short = 't')]
    pub test: bool,

    /// Display the archive comment only
    #[arg(short = 'z')]
    pub comment: bool,

    /// Directory to extract into (default: current directory)
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Skip entries matching these names or patterns
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Keep existing files
    #[arg(short = 'n', conflicts_with = "overwrite")]
    pub never_overwrite: bool,

    /// Replace existing files without asking
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Drop directory components and extract flat
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Fewer messages; -qq also silences the test summary
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    /// `-qq`: also suppress the summary lines of `-t`.
    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Whether `name` is selected by the FILES arguments and not excluded by `-x`.
    pub fn selects(&self, name: &str) -> bool {
        if !self.files.is_empty() && !self.files.iter().any(|f| matches_name(f, name)) {
            return false;
        }
        !self
            .exclude
            .iter()
            .any(|x| name.contains(x.as_str()) || glob_match(x, name))
    }
}

/// A pattern with wildcards is globbed against the full name; a plain one
/// must equal the full name or its last component.
fn matches_name(pattern: &str, name: &str) -> bool {
    if pattern.contains(['*', '?']) {
        return glob_match(pattern, name);
    }
    let basename = name.rsplit('/').next().unwrap_or(name);
    name == pattern || basename == pattern
}

/// `*` matches any run of characters (including `/`), `?` exactly one.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    // Iterative matcher with single-star backtracking.
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some(c) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
